use std::sync::Arc;

use color_eyre::Result;
use owo_colors::OwoColorize;
use popcorn_core::snapshot::DETAILS_CACHE;
use popcorn_core::{DetailsFetcher, DetailsView};
use popcorn_models::MovieDetails;
use serde_json::json;

use super::AppContext;
use crate::output::Output;

pub async fn run_details(id: String, refresh: bool, output: &Output) -> Result<()> {
    let ctx = AppContext::init()?;
    let provider = ctx.provider()?;
    let cache_store = ctx.cache_store()?;

    let details_cache = cache_store.load(DETAILS_CACHE, ctx.config.cache.max_details_entries);
    let fetcher = Arc::new(DetailsFetcher::new(provider, details_cache));

    let view = if refresh {
        let cancel = fetcher.request_token();
        match fetcher.refresh(&id, &cancel).await {
            Ok(details) => DetailsView {
                details: Some(details),
                ..DetailsView::default()
            },
            Err(err) if err.is_canceled() => fetcher.snapshot(),
            Err(err) => DetailsView {
                error: Some(err.to_string()),
                ..DetailsView::default()
            },
        }
    } else {
        fetcher.view(&id).await
    };

    if let Some(message) = &view.error {
        output.error(message);
        output.info("Run again with --refresh to retry past the cache");
        return Ok(());
    }

    if view.is_fetching {
        output.info("Showing cached details; refreshing...");
    }
    if let Some(details) = &view.details {
        if output.shows_human_data() {
            print_card(details);
        }
    }

    if view.is_fetching {
        fetcher.quiesce().await;
        let settled = fetcher.snapshot();
        if let Some(message) = &settled.error {
            output.warn(format!("Refresh failed: {}", message));
        } else if settled.details != view.details {
            output.info("Details changed after refresh:");
            if let Some(details) = &settled.details {
                if output.shows_human_data() {
                    print_card(details);
                }
            }
        }
    }

    let settled = fetcher.snapshot();
    let shown = settled.details.as_ref().or(view.details.as_ref());

    if let Some(details) = shown {
        output.payload(&json!({
            "imdb_id": details.imdb_id,
            "title": details.title,
            "year": details.year,
            "released": details.released,
            "runtime_minutes": details.runtime_minutes(),
            "imdb_rating": details.imdb_rating_value(),
            "genre": details.genre,
            "director": details.director,
            "actors": details.actors,
            "plot": details.plot,
            "poster": details.poster,
        }));

        let mut recent = ctx.recently_viewed();
        recent
            .record(&details.summary())
            .map_err(|e| color_eyre::eyre::eyre!("{}", e))?;
    }

    fetcher
        .save_cache(&cache_store, DETAILS_CACHE)
        .map_err(|e| color_eyre::eyre::eyre!("{}", e))?;

    Ok(())
}

pub fn print_card(details: &MovieDetails) {
    println!();
    println!("{} ({})", details.title.bold(), details.year);
    println!(
        "{} • {} min • ⭐ {}",
        details.released,
        details.runtime_minutes(),
        details.imdb_rating
    );
    println!("{}", details.genre.dimmed());
    println!();
    println!("{}", details.plot);
    println!();
    println!("Starring {}", details.actors);
    println!("Directed by {}", details.director);
    println!();
}
