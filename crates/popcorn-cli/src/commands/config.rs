use color_eyre::eyre::eyre;
use color_eyre::Result;
use dialoguer::{theme::ColorfulTheme, Input};
use popcorn_config::CredentialStore;
use popcorn_core::storage::{KeyValueStorage, THEME_KEY};
use serde_json::json;

use super::AppContext;
use crate::output::Output;
use crate::ConfigCommands;

pub async fn run_config(cmd: ConfigCommands, output: &Output) -> Result<()> {
    let ctx = AppContext::init()?;

    match cmd {
        ConfigCommands::Show => {
            let mut credentials = CredentialStore::new(ctx.paths.credentials_file());
            credentials
                .load()
                .map_err(|e| eyre!("Failed to load credentials: {}", e))?;
            let api_key = credentials.api_key().map(|key| mask(key));
            let theme = current_theme(&ctx)?;

            if output.is_human() {
                println!("Config file:  {}", ctx.paths.config_file().display());
                println!("Data dir:     {}", ctx.paths.data_dir().display());
                println!();
                println!("API base URL: {}", ctx.config.api.base_url);
                println!(
                    "API key:      {}",
                    api_key.as_deref().unwrap_or("(not set)")
                );
                println!("Theme:        {}", theme.as_deref().unwrap_or("(not set)"));
                println!();
                println!(
                    "Cache:        {} search / {} details entries, min query length {}",
                    ctx.config.cache.max_search_entries,
                    ctx.config.cache.max_details_entries,
                    ctx.config.cache.min_query_len
                );
                println!(
                    "Prefetch:     first {} results",
                    ctx.config.cache.prefetch_count
                );
                println!(
                    "Undo window:  {}s",
                    ctx.config.watched.undo_window_secs
                );
            }
            output.payload(&json!({
                "config_file": ctx.paths.config_file(),
                "base_url": ctx.config.api.base_url,
                "api_key": api_key,
                "theme": theme,
                "cache": {
                    "max_search_entries": ctx.config.cache.max_search_entries,
                    "max_details_entries": ctx.config.cache.max_details_entries,
                    "min_query_len": ctx.config.cache.min_query_len,
                    "prefetch_count": ctx.config.cache.prefetch_count,
                },
                "undo_window_secs": ctx.config.watched.undo_window_secs,
            }));
            Ok(())
        }

        ConfigCommands::SetKey { key } => {
            let key = match key {
                Some(key) => key,
                None => Input::with_theme(&ColorfulTheme::default())
                    .with_prompt("API key")
                    .interact_text()?,
            };
            let key = key.trim().to_string();
            if key.is_empty() {
                return Err(eyre!("API key cannot be empty"));
            }

            let mut credentials = CredentialStore::new(ctx.paths.credentials_file());
            credentials
                .load()
                .map_err(|e| eyre!("Failed to load credentials: {}", e))?;
            credentials.set_api_key(key);
            credentials
                .save()
                .map_err(|e| eyre!("Failed to save credentials: {}", e))?;

            output.success("API key saved");
            Ok(())
        }

        ConfigCommands::Theme { value } => match value {
            None => {
                let theme = current_theme(&ctx)?;
                match theme {
                    Some(theme) => output.info(format!("Theme: {}", theme)),
                    None => output.info("Theme: (not set)"),
                }
                Ok(())
            }
            Some(value) => {
                if value != "light" && value != "dark" {
                    return Err(eyre!("Theme must be 'light' or 'dark'"));
                }
                ctx.storage
                    .set(THEME_KEY, &serde_json::to_string(&value)?)
                    .map_err(|e| eyre!("{}", e))?;
                output.success(format!("Theme set to {}", value));
                Ok(())
            }
        },
    }
}

fn current_theme(ctx: &AppContext) -> Result<Option<String>> {
    let raw = ctx.storage.get(THEME_KEY).map_err(|e| eyre!("{}", e))?;
    // A corrupt preference just counts as unset.
    Ok(raw.and_then(|raw| serde_json::from_str(&raw).ok()))
}

fn mask(key: &str) -> String {
    if key.len() <= 4 {
        "*".repeat(key.len())
    } else {
        format!("{}{}", "*".repeat(key.len() - 4), &key[key.len() - 4..])
    }
}
