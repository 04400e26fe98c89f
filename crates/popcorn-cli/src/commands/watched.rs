use std::sync::Arc;

use color_eyre::eyre::eyre;
use color_eyre::Result;
use comfy_table::{presets::UTF8_FULL, Cell, ContentArrangement, Table};
use popcorn_core::snapshot::DETAILS_CACHE;
use popcorn_core::storage::KeyValueStorage;
use popcorn_core::{visible, DetailsFetcher, RemovedWatched, WatchedSummary};
use popcorn_models::{WatchedMovie, WatchedPatch};
use serde_json::json;
use tracing::warn;

use super::{AppContext, PENDING_UNDO_KEY};
use crate::output::Output;
use crate::WatchedCommands;

pub async fn run_watched(cmd: WatchedCommands, output: &Output) -> Result<()> {
    let ctx = AppContext::init()?;

    match cmd {
        WatchedCommands::List {
            filter,
            sort,
            title,
        } => {
            let store = ctx.watched_store();
            let shown = visible(store.list(), filter, &title, sort);

            if output.shows_human_data() {
                if shown.is_empty() {
                    println!("Nothing to show");
                } else {
                    print_watched_table(&shown);
                }
                if shown.len() != store.len() {
                    println!("{} of {} movies", shown.len(), store.len());
                }
            }
            output.payload(&json!({
                "total": store.len(),
                "shown": shown.len(),
                "movies": watched_json(&shown),
            }));
            Ok(())
        }

        WatchedCommands::Add { id, rating } => {
            let rating = rating.unwrap_or(0);
            validate_rating(rating, true)?;

            let provider = ctx.provider()?;
            let cache_store = ctx.cache_store()?;
            let details_cache =
                cache_store.load(DETAILS_CACHE, ctx.config.cache.max_details_entries);
            let fetcher = Arc::new(DetailsFetcher::new(provider, details_cache));

            let cancel = fetcher.request_token();
            fetcher
                .ensure_fetched(&id, &cancel)
                .await
                .map_err(|e| eyre!("{}", e))?;
            let details = fetcher
                .cached(&id)
                .ok_or_else(|| eyre!("No details available for {}", id))?;

            let mut store = ctx.watched_store();
            let entry = store
                .add(WatchedMovie::from_details(&details, rating))
                .map_err(|e| eyre!("{}", e))?;

            output.success(format!(
                "Added {} ({}){}",
                entry.title,
                entry.year,
                if entry.user_rating > 0 {
                    format!(" rated {}/10", entry.user_rating)
                } else {
                    String::new()
                }
            ));
            output.payload(&json!({ "added": watched_json(std::slice::from_ref(entry)) }));

            fetcher
                .save_cache(&cache_store, DETAILS_CACHE)
                .map_err(|e| eyre!("{}", e))?;
            Ok(())
        }

        WatchedCommands::Rate { id, rating } => {
            validate_rating(rating, false)?;
            let mut store = ctx.watched_store();
            match store
                .update(&id, WatchedPatch::rating(rating))
                .map_err(|e| eyre!("{}", e))?
            {
                Some(entry) => {
                    output.success(format!("Rated {} {}/10", entry.title, entry.user_rating));
                    Ok(())
                }
                None => {
                    output.error(format!(
                        "{} is not in the watched list. Add it with `popcorn watched add {}`",
                        id, id
                    ));
                    Ok(())
                }
            }
        }

        WatchedCommands::Remove { id } => {
            let mut store = ctx.watched_store();
            match store.remove(&id).map_err(|e| eyre!("{}", e))? {
                Some(removed) => {
                    let title = removed.entry.title.clone();
                    let token = serde_json::to_string(&removed)?;
                    ctx.storage
                        .set(PENDING_UNDO_KEY, &token)
                        .map_err(|e| eyre!("{}", e))?;
                    output.success(format!(
                        "Removed {}. Run `popcorn watched undo` within {}s to restore it.",
                        title, ctx.config.watched.undo_window_secs
                    ));
                    Ok(())
                }
                None => {
                    output.warn(format!("{} is not in the watched list", id));
                    Ok(())
                }
            }
        }

        WatchedCommands::Undo => {
            let raw = ctx.storage.get(PENDING_UNDO_KEY).map_err(|e| eyre!("{}", e))?;
            let removed: RemovedWatched = match raw.as_deref().map(serde_json::from_str) {
                Some(Ok(removed)) => removed,
                Some(Err(err)) => {
                    warn!("Pending undo token is corrupted: {}", err);
                    ctx.storage.remove(PENDING_UNDO_KEY).map_err(|e| eyre!("{}", e))?;
                    output.warn("Nothing to undo");
                    return Ok(());
                }
                None => {
                    output.warn("Nothing to undo");
                    return Ok(());
                }
            };

            let title = removed.entry.title.clone();
            let mut store = ctx.watched_store();
            let restored = store.undo(removed).map_err(|e| eyre!("{}", e))?;
            ctx.storage.remove(PENDING_UNDO_KEY).map_err(|e| eyre!("{}", e))?;

            if restored {
                output.success(format!("Restored {}", title));
            } else {
                output.warn("Undo window elapsed (or the movie was re-added); nothing restored");
            }
            Ok(())
        }

        WatchedCommands::Summary => {
            let store = ctx.watched_store();
            let summary = WatchedSummary::from_list(store.list());

            if output.shows_human_data() {
                println!("#️⃣  {} movies", summary.count);
                println!("⭐ {:.1} average IMDb rating", summary.avg_imdb_rating);
                println!("🌟 {:.1} average rating of yours", summary.avg_user_rating);
                println!("⏳ {:.0} min average runtime", summary.avg_runtime);
            }
            output.payload(&json!({
                "count": summary.count,
                "avg_imdb_rating": summary.avg_imdb_rating,
                "avg_user_rating": summary.avg_user_rating,
                "avg_runtime": summary.avg_runtime,
            }));
            Ok(())
        }
    }
}

fn validate_rating(rating: u8, zero_allowed: bool) -> Result<()> {
    let valid = rating <= 10 && (zero_allowed || rating >= 1);
    if !valid {
        return Err(eyre!("Rating must be between 1 and 10"));
    }
    Ok(())
}

fn print_watched_table(movies: &[WatchedMovie]) {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(vec!["Id", "Title", "Year", "⭐ IMDb", "🌟 Yours", "Min"]);
    for movie in movies {
        table.add_row(vec![
            Cell::new(&movie.imdb_id),
            Cell::new(&movie.title),
            Cell::new(&movie.year),
            Cell::new(format!("{:.1}", movie.imdb_rating)),
            Cell::new(if movie.user_rating > 0 {
                movie.user_rating.to_string()
            } else {
                "-".to_string()
            }),
            Cell::new(movie.runtime_minutes),
        ]);
    }
    println!("{}", table);
}

fn watched_json(movies: &[WatchedMovie]) -> Vec<serde_json::Value> {
    movies
        .iter()
        .map(|m| {
            json!({
                "imdb_id": m.imdb_id,
                "title": m.title,
                "year": m.year,
                "imdb_rating": m.imdb_rating,
                "user_rating": m.user_rating,
                "runtime_minutes": m.runtime_minutes,
                "rating_change_count": m.rating_change_count,
                "created_at": m.created_at,
                "updated_at": m.updated_at,
            })
        })
        .collect()
}
