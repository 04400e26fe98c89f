use clap::{ArgAction, Parser, Subcommand};
use commands::{browse, clear, config, details, recent, search, watched};
use popcorn_core::{WatchedFilter, WatchedSort};
use std::path::PathBuf;

mod commands;
mod logging;
mod output;

#[derive(Parser)]
#[command(name = "popcorn")]
#[command(about = "popcorn - search, browse, and rate movies from your terminal")]
#[command(version)]
struct Cli {
    /// Enable verbose output (use multiple times for more verbosity: -v, -vv)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Output format
    #[arg(long, global = true, default_value = "human", value_enum)]
    output: output::OutputFormat,

    /// Write logs to this file (rotated daily) instead of stderr
    #[arg(long, global = true, value_name = "PATH")]
    log_file: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Search movies by title
    #[command(long_about = "Search movies by title. Cached result pages are shown immediately and refreshed in the background; details for the leading results are prefetched so opening them is instant.")]
    Search {
        /// Title query (at least 3 characters)
        query: String,

        /// Result page (1-based)
        #[arg(long, default_value_t = 1)]
        page: u32,

        /// Bypass the cache and fetch fresh results
        #[arg(long, action = ArgAction::SetTrue)]
        refresh: bool,

        /// Skip prefetching details for the leading results
        #[arg(long, action = ArgAction::SetTrue)]
        no_prefetch: bool,
    },

    /// Show full details for a movie
    #[command(long_about = "Show full metadata for a movie by its id. Cached details are shown immediately and revalidated in the background. The movie is recorded in the recently-viewed list.")]
    Details {
        /// Movie id (e.g. tt1375666)
        id: String,

        /// Bypass the cache and fetch fresh details
        #[arg(long, action = ArgAction::SetTrue)]
        refresh: bool,
    },

    /// Manage the watched list
    Watched {
        #[command(subcommand)]
        cmd: WatchedCommands,
    },

    /// Show or clear the recently-viewed list
    Recent {
        /// Clear the recently-viewed list
        #[arg(long, action = ArgAction::SetTrue)]
        clear: bool,
    },

    /// Interactive search-and-rate session
    #[command(long_about = "Interactive loop: search, pick a result, read its details, rate it, and add it to the watched list.")]
    Browse,

    /// Configure the API key and preferences
    Config {
        #[command(subcommand)]
        cmd: ConfigCommands,
    },

    /// Clear cached data
    #[command(long_about = "Clear cached data or stored state. Use --cache for the result caches, --watched for the watched list, --credentials for the API key, or --all for everything.")]
    Clear {
        /// Clear everything
        #[arg(long, action = ArgAction::SetTrue, conflicts_with_all = ["cache", "watched", "credentials"])]
        all: bool,

        /// Clear the search and details caches
        #[arg(long, action = ArgAction::SetTrue)]
        cache: bool,

        /// Clear the watched list (and any pending undo)
        #[arg(long, action = ArgAction::SetTrue)]
        watched: bool,

        /// Clear the stored API key
        #[arg(long, action = ArgAction::SetTrue)]
        credentials: bool,
    },
}

#[derive(Subcommand)]
enum WatchedCommands {
    /// List watched movies
    List {
        /// Filter: all, rated, or unrated
        #[arg(long, default_value_t = WatchedFilter::All)]
        filter: WatchedFilter,

        /// Sort mode, e.g. date-desc, user-rating-desc, title-asc
        #[arg(long, default_value_t = WatchedSort::DateDesc)]
        sort: WatchedSort,

        /// Case-insensitive title substring filter
        #[arg(long, default_value = "")]
        title: String,
    },

    /// Add a movie to the watched list (fetches its details first)
    Add {
        /// Movie id (e.g. tt1375666)
        id: String,

        /// Your rating, 1-10 (omit to add unrated)
        #[arg(long)]
        rating: Option<u8>,
    },

    /// Rate (or re-rate) a watched movie
    Rate {
        /// Movie id
        id: String,

        /// Your rating, 1-10
        rating: u8,
    },

    /// Remove a movie from the watched list
    Remove {
        /// Movie id
        id: String,
    },

    /// Restore the most recently removed movie, if the undo window is open
    Undo,

    /// Show averages over the watched list
    Summary,
}

#[derive(Subcommand)]
enum ConfigCommands {
    /// Show current configuration (masks the API key)
    Show,

    /// Store the API key
    SetKey {
        /// API key (prompts when omitted)
        #[arg(long)]
        key: Option<String>,
    },

    /// Show or set the theme preference (light or dark)
    Theme {
        /// New theme; omit to show the current one
        value: Option<String>,
    },
}

#[tokio::main]
async fn main() -> color_eyre::Result<()> {
    color_eyre::install()?;

    let cli = Cli::parse();

    logging::init_logging(cli.verbose, cli.quiet, cli.log_file.clone())
        .map_err(|e| color_eyre::eyre::eyre!("{}", e))?;

    let output = output::Output::new(cli.output, cli.quiet);

    match cli.command {
        Commands::Search {
            query,
            page,
            refresh,
            no_prefetch,
        } => search::run_search(query, page, refresh, no_prefetch, &output).await,
        Commands::Details { id, refresh } => details::run_details(id, refresh, &output).await,
        Commands::Watched { cmd } => watched::run_watched(cmd, &output).await,
        Commands::Recent { clear } => recent::run_recent(clear, &output).await,
        Commands::Browse => browse::run_browse(&output).await,
        Commands::Config { cmd } => config::run_config(cmd, &output).await,
        Commands::Clear {
            all,
            cache,
            watched,
            credentials,
        } => clear::run_clear(all, cache, watched, credentials, &output).await,
    }
}
