//! # Change Tracker CLI (`ctrack`)
//!
//! The `ctrack` binary is the primary interface for Change Tracker. It
//! initializes the database, ingests page captures, and renders diff
//! reports, activity calendars, keyword histories, and change listings.
//!
//! ## Usage
//!
//! ```bash
//! ctrack --config ./config/ctrack.toml <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `ctrack init` | Create the SQLite database and tables |
//! | `ctrack ingest <file>` | Store captures from a JSON file and record changes |
//! | `ctrack competitors` | List tracked competitors |
//! | `ctrack pages <competitor>` | List a competitor's pages |
//! | `ctrack dates <competitor> <url>` | List capture times of a page |
//! | `ctrack diff <competitor> <url>` | Compare two captures |
//! | `ctrack calendar <competitor>` | Yearly change activity heatmap |
//! | `ctrack keywords <competitor> <url> [keyword]` | Keyword occurrence history |
//! | `ctrack changes` | List recorded change events |
//!
//! Logs go to stderr; set `RUST_LOG` to override `[logging] filter`.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

use change_tracker::{browse, calendar, changes, config, diff_cmd, history, ingest, migrate};

/// Change Tracker: snapshot diffs and activity calendars for competitor pages.
///
/// All commands accept a `--config` flag pointing to a TOML configuration
/// file. See `config/ctrack.example.toml` for a full example.
#[derive(Parser)]
#[command(
    name = "ctrack",
    about = "Change Tracker: snapshot diffs and activity calendars for competitor pages",
    version
)]
struct Cli {
    /// Path to configuration file (TOML).
    #[arg(long, global = true, default_value = "./config/ctrack.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize the database schema.
    ///
    /// Idempotent; running it multiple times is safe.
    Init,

    /// Ingest page captures from a JSON file.
    ///
    /// The file holds an array of objects with `competitor`, `url`,
    /// `captured_at` and optional `title`, `h1`, `description`, `content`,
    /// `keywords_found`. Each new capture is compared with the previous
    /// capture of the same page and differences are recorded as changes.
    Ingest {
        /// Path to the JSON file.
        file: PathBuf,
    },

    /// List competitors with stored captures.
    Competitors,

    /// List the pages of a competitor.
    Pages { competitor: String },

    /// List capture times of a page.
    Dates { competitor: String, url: String },

    /// Compare two captures of a page.
    ///
    /// Defaults to the two most recent captures.
    Diff {
        competitor: String,
        url: String,
        /// Older capture: `YYYY-MM-DD HH:MM:SS`, or `YYYY-MM-DD` for the last capture that day.
        #[arg(long)]
        from: Option<String>,
        /// Newer capture, same formats as `--from`.
        #[arg(long)]
        to: Option<String>,
        /// Print the report as JSON.
        #[arg(long)]
        json: bool,
    },

    /// Show a yearly activity calendar of recorded changes.
    Calendar {
        competitor: String,
        /// Restrict to one page URL.
        #[arg(long)]
        page: Option<String>,
        /// Calendar year. Defaults to the latest year with changes.
        #[arg(long)]
        year: Option<i32>,
        /// Lay days out as Monday-first week columns.
        #[arg(long)]
        weeks: bool,
        #[arg(long)]
        json: bool,
    },

    /// Show a keyword's occurrence history, or the latest keyword ledger.
    Keywords {
        competitor: String,
        url: String,
        keyword: Option<String>,
        #[arg(long)]
        json: bool,
    },

    /// List recorded change events.
    Changes {
        #[arg(long)]
        competitor: Option<String>,
        #[arg(long)]
        url: Option<String>,
        /// Only changes on or after this date (YYYY-MM-DD).
        #[arg(long)]
        since: Option<String>,
        /// Only changes on or before this date (YYYY-MM-DD).
        #[arg(long)]
        until: Option<String>,
        #[arg(long)]
        json: bool,
    },
}

fn init_tracing(filter: &str) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(filter));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let cfg = config::load_config(&cli.config)?;
    init_tracing(&cfg.logging.filter);

    match cli.command {
        Commands::Init => {
            migrate::run_migrations(&cfg).await?;
            println!("Database initialized successfully.");
        }
        Commands::Ingest { file } => {
            ingest::run_ingest(&cfg, &file).await?;
        }
        Commands::Competitors => {
            browse::list_competitors(&cfg).await?;
        }
        Commands::Pages { competitor } => {
            browse::list_pages(&cfg, &competitor).await?;
        }
        Commands::Dates { competitor, url } => {
            browse::list_dates(&cfg, &competitor, &url).await?;
        }
        Commands::Diff {
            competitor,
            url,
            from,
            to,
            json,
        } => {
            diff_cmd::run_diff(
                &cfg,
                &competitor,
                &url,
                from.as_deref(),
                to.as_deref(),
                json,
            )
            .await?;
        }
        Commands::Calendar {
            competitor,
            page,
            year,
            weeks,
            json,
        } => {
            calendar::run_calendar(&cfg, &competitor, page.as_deref(), year, weeks, json).await?;
        }
        Commands::Keywords {
            competitor,
            url,
            keyword,
            json,
        } => {
            history::run_keywords(&cfg, &competitor, &url, keyword.as_deref(), json).await?;
        }
        Commands::Changes {
            competitor,
            url,
            since,
            until,
            json,
        } => {
            let filter = changes::build_filter(
                competitor.as_deref(),
                url.as_deref(),
                since.as_deref(),
                until.as_deref(),
            )?;
            changes::run_changes(&cfg, &filter, json).await?;
        }
    }

    Ok(())
}
