use std::sync::Arc;

use color_eyre::eyre::eyre;
use color_eyre::Result;
use dialoguer::{theme::ColorfulTheme, Input, Select};
use popcorn_core::snapshot::{DETAILS_CACHE, SEARCH_CACHE};
use popcorn_core::{DetailsFetcher, MovieSearcher};
use popcorn_models::WatchedMovie;

use super::AppContext;
use crate::commands::details::print_card;
use crate::output::Output;

/// Interactive loop: search, pick a result, read details, rate, add.
pub async fn run_browse(output: &Output) -> Result<()> {
    if !output.is_human() {
        return Err(eyre!("browse is interactive; it only supports --output human"));
    }

    let ctx = AppContext::init()?;
    let provider = ctx.provider()?;
    let cache_store = ctx.cache_store()?;

    let searcher = MovieSearcher::with_min_query_len(
        provider.clone(),
        cache_store.load(SEARCH_CACHE, ctx.config.cache.max_search_entries),
        ctx.config.cache.min_query_len,
    );
    let fetcher = Arc::new(DetailsFetcher::new(
        provider,
        cache_store.load(DETAILS_CACHE, ctx.config.cache.max_details_entries),
    ));
    let mut watched = ctx.watched_store();
    let mut recent = ctx.recently_viewed();
    let theme = ColorfulTheme::default();

    loop {
        let query: String = Input::with_theme(&theme)
            .with_prompt("Search (empty to quit)")
            .allow_empty(true)
            .interact_text()?;
        if query.trim().is_empty() {
            break;
        }
        if query.trim().chars().count() < ctx.config.cache.min_query_len {
            output.info(format!(
                "Type at least {} characters to search",
                ctx.config.cache.min_query_len
            ));
            continue;
        }

        searcher.search(&query, 1, false).await;
        searcher.quiesce().await;
        let view = searcher.snapshot();

        if let Some(message) = &view.error {
            output.error(message);
            continue;
        }
        if view.movies.is_empty() {
            output.info(format!("No results for {:?}", query));
            continue;
        }

        // Warm the details cache for the leading results while the user picks.
        for movie in view.movies.iter().take(ctx.config.cache.prefetch_count) {
            fetcher.prefetch(&movie.imdb_id);
        }

        let items: Vec<String> = view
            .movies
            .iter()
            .map(|m| format!("{} ({})", m.title, m.year))
            .collect();
        let selection = Select::with_theme(&theme)
            .with_prompt(format!("{} results", view.total_results))
            .items(&items)
            .default(0)
            .interact_opt()?;
        let Some(index) = selection else {
            continue;
        };
        let picked = &view.movies[index];

        fetcher.view(&picked.imdb_id).await;
        fetcher.quiesce().await;
        let details_view = fetcher.snapshot();

        let Some(details) = details_view.details else {
            output.error(
                details_view
                    .error
                    .unwrap_or_else(|| "No details available".to_string()),
            );
            continue;
        };

        print_card(&details);
        recent.record(&details.summary()).map_err(|e| eyre!("{}", e))?;

        if let Some(existing) = watched.get(&details.imdb_id) {
            output.info(format!(
                "Already in your watched list (rated {}/10)",
                existing.user_rating
            ));
        }

        let rating: String = Input::with_theme(&theme)
            .with_prompt("Your rating 1-10 (empty to skip)")
            .allow_empty(true)
            .interact_text()?;
        let rating = rating.trim();
        if rating.is_empty() {
            continue;
        }
        let rating: u8 = match rating.parse() {
            Ok(rating) if (1..=10).contains(&rating) => rating,
            _ => {
                output.warn("Ratings are 1-10; skipped");
                continue;
            }
        };

        let entry = watched
            .add(WatchedMovie::from_details(&details, rating))
            .map_err(|e| eyre!("{}", e))?;
        output.success(format!("Added {} rated {}/10", entry.title, entry.user_rating));
    }

    searcher
        .save_cache(&cache_store, SEARCH_CACHE)
        .map_err(|e| eyre!("{}", e))?;
    fetcher
        .save_cache(&cache_store, DETAILS_CACHE)
        .map_err(|e| eyre!("{}", e))?;

    Ok(())
}
