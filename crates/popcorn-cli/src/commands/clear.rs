use color_eyre::eyre::eyre;
use color_eyre::Result;
use popcorn_core::storage::KeyValueStorage;
use std::fs;

use super::{AppContext, PENDING_UNDO_KEY};
use crate::output::Output;

pub async fn run_clear(
    all: bool,
    cache: bool,
    watched: bool,
    credentials: bool,
    output: &Output,
) -> Result<()> {
    let ctx = AppContext::init()?;

    if all {
        clear_cache(&ctx, output)?;
        clear_watched(&ctx, output)?;
        clear_credentials(&ctx, output)?;
        output.success("All cache, watched data, and credentials cleared");
        return Ok(());
    }

    let mut cleared_anything = false;

    if cache {
        clear_cache(&ctx, output)?;
        cleared_anything = true;
    }

    if watched {
        clear_watched(&ctx, output)?;
        cleared_anything = true;
    }

    if credentials {
        clear_credentials(&ctx, output)?;
        cleared_anything = true;
    }

    if !cleared_anything {
        output.warn("No clear option specified. Use --cache, --watched, --credentials, or --all");
        output.println("\nExample: popcorn clear --cache");
    }

    Ok(())
}

fn clear_cache(ctx: &AppContext, output: &Output) -> Result<()> {
    let cache_store = ctx.cache_store()?;
    cache_store.clear().map_err(|e| eyre!("{}", e))?;
    output.success(format!(
        "Cleared cache snapshots: {}",
        ctx.paths.cache_dir().display()
    ));
    Ok(())
}

fn clear_watched(ctx: &AppContext, output: &Output) -> Result<()> {
    let mut store = ctx.watched_store();
    let count = store.len();
    store.clear().map_err(|e| eyre!("{}", e))?;
    ctx.storage
        .remove(PENDING_UNDO_KEY)
        .map_err(|e| eyre!("{}", e))?;

    let mut recent = ctx.recently_viewed();
    recent.clear().map_err(|e| eyre!("{}", e))?;

    output.success(format!(
        "Cleared watched list ({} entries) and recently-viewed history",
        count
    ));
    Ok(())
}

fn clear_credentials(ctx: &AppContext, output: &Output) -> Result<()> {
    let credentials_file = ctx.paths.credentials_file();

    if credentials_file.exists() {
        fs::remove_file(&credentials_file).map_err(|e| {
            eyre!(
                "Failed to remove credentials file at {}: {}",
                credentials_file.display(),
                e
            )
        })?;
        output.success(format!("Cleared credentials: {}", credentials_file.display()));
    } else {
        output.info("No credentials file found to clear");
    }

    Ok(())
}
