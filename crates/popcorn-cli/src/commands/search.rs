use std::sync::Arc;
use std::time::Duration;

use color_eyre::Result;
use comfy_table::{presets::UTF8_FULL, Cell, ContentArrangement, Table};
use indicatif::ProgressBar;
use popcorn_core::snapshot::{DETAILS_CACHE, SEARCH_CACHE};
use popcorn_core::{DetailsFetcher, MovieSearcher, SearchView};
use serde_json::json;

use super::AppContext;
use crate::output::Output;

pub async fn run_search(
    query: String,
    page: u32,
    refresh: bool,
    no_prefetch: bool,
    output: &Output,
) -> Result<()> {
    let ctx = AppContext::init()?;

    if query.trim().chars().count() < ctx.config.cache.min_query_len {
        output.info(format!(
            "Type at least {} characters to search",
            ctx.config.cache.min_query_len
        ));
        output.payload(&json!({ "movies": [], "total_results": 0 }));
        return Ok(());
    }

    let provider = ctx.provider()?;
    let cache_store = ctx.cache_store()?;

    let search_cache = cache_store.load(SEARCH_CACHE, ctx.config.cache.max_search_entries);
    let searcher = MovieSearcher::with_min_query_len(
        provider.clone(),
        search_cache,
        ctx.config.cache.min_query_len,
    );

    let view = searcher.search(&query, page, refresh).await;

    if let Some(message) = &view.error {
        output.error(message);
        output.info("Run again with --refresh to retry past the cache");
        return Ok(());
    }

    if view.is_fetching {
        output.info("Showing cached results; refreshing...");
    }
    if output.shows_human_data() {
        print_results(&query, page, &view);
    }

    // Let the background revalidation settle and surface what changed.
    if view.is_fetching {
        searcher.quiesce().await;
        let refreshed = searcher.snapshot();
        if let Some(message) = &refreshed.error {
            output.warn(format!("Refresh failed: {}", message));
        } else if refreshed.movies != view.movies || refreshed.total_results != view.total_results
        {
            output.info("Results changed after refresh:");
            if output.shows_human_data() {
                print_results(&query, page, &refreshed);
            }
        }
    }

    let settled = searcher.snapshot();
    output.payload(&json!({
        "query": query,
        "page": page,
        "total_results": settled.total_results,
        "movies": settled.movies.iter().map(|m| json!({
            "imdb_id": m.imdb_id,
            "title": m.title,
            "year": m.year,
            "poster": m.poster,
        })).collect::<Vec<_>>(),
        "error": settled.error,
    }));

    searcher
        .save_cache(&cache_store, SEARCH_CACHE)
        .map_err(|e| color_eyre::eyre::eyre!("{}", e))?;

    if !no_prefetch && !settled.movies.is_empty() {
        let details_cache = cache_store.load(DETAILS_CACHE, ctx.config.cache.max_details_entries);
        let fetcher = Arc::new(DetailsFetcher::new(provider, details_cache));

        let ids: Vec<String> = settled
            .movies
            .iter()
            .take(ctx.config.cache.prefetch_count)
            .map(|m| m.imdb_id.clone())
            .collect();

        let bar = if output.shows_human_data() {
            let bar = ProgressBar::new_spinner();
            bar.set_message(format!("Prefetching details for {} results", ids.len()));
            bar.enable_steady_tick(Duration::from_millis(80));
            Some(bar)
        } else {
            None
        };

        for id in &ids {
            fetcher.prefetch(id);
        }
        fetcher.quiesce().await;

        if let Some(bar) = bar {
            bar.finish_and_clear();
        }

        fetcher
            .save_cache(&cache_store, DETAILS_CACHE)
            .map_err(|e| color_eyre::eyre::eyre!("{}", e))?;
    }

    Ok(())
}

fn print_results(query: &str, page: u32, view: &SearchView) {
    if view.movies.is_empty() {
        println!("No results for {:?}", query);
        return;
    }

    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(vec!["Id", "Title", "Year"]);
    for movie in &view.movies {
        table.add_row(vec![
            Cell::new(&movie.imdb_id),
            Cell::new(&movie.title),
            Cell::new(&movie.year),
        ]);
    }
    println!("{}", table);
    println!(
        "{} results for {:?} (page {})",
        view.total_results, query, page
    );
}
