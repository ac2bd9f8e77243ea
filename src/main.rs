mod commands;
mod config;
mod fetch;
mod refresh;
mod render;
mod search;

use std::time::Duration;

use anyhow::Result;
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use crate::config::SettingsOverrides;

#[derive(Parser)]
#[command(name = "weekcal")]
#[command(about = "Show the coming week of an ICS calendar, recurring events included")]
struct Cli {
    /// Log debug output to stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the seven days starting today
    Week {
        /// Calendar URL or file path (defaults to the calendar_url preference)
        #[arg(long)]
        url: Option<String>,

        /// IANA time zone that decides event days (e.g. "Europe/Berlin")
        #[arg(long)]
        tz: Option<String>,

        /// First day of the week to show (YYYY-MM-DD)
        #[arg(long)]
        date: Option<NaiveDate>,

        /// Upper bound on generated instances per recurring event
        #[arg(long)]
        max_iterations: Option<u32>,

        /// Print the week as JSON
        #[arg(long)]
        json: bool,
    },
    /// Keep the week on screen, refreshing periodically
    Watch {
        /// Seconds between refreshes
        #[arg(long, default_value_t = 300)]
        interval: u64,

        /// IANA time zone that decides event days
        #[arg(long)]
        tz: Option<String>,
    },
    /// Read or change stored preferences
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
    /// Search the web, or open a URL, with the preferred search engine
    Search {
        #[arg(required = true)]
        query: Vec<String>,

        /// Search engine to use instead of the stored preference
        #[arg(short, long)]
        engine: Option<String>,

        /// Open the result in the browser
        #[arg(long)]
        open: bool,
    },
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Show all preferences
    List,
    /// Print one preference
    Get { key: String },
    /// Store a preference (calendar_url, search_engine, timezone, max_iterations)
    Set { key: String, value: String },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match cli.command {
        Commands::Week {
            url,
            tz,
            date,
            max_iterations,
            json,
        } => {
            let overrides = SettingsOverrides {
                calendar_url: url,
                timezone: tz,
                max_iterations,
                search_engine: None,
            };
            commands::week::run(overrides, date, json).await
        }
        Commands::Watch { interval, tz } => {
            if interval == 0 {
                anyhow::bail!("--interval must be at least 1 second");
            }
            let overrides = SettingsOverrides {
                timezone: tz,
                ..Default::default()
            };
            commands::watch::run(Duration::from_secs(interval), overrides).await
        }
        Commands::Config { action } => match action {
            ConfigAction::List => commands::config::list(),
            ConfigAction::Get { key } => commands::config::get(&key),
            ConfigAction::Set { key, value } => commands::config::set(&key, &value),
        },
        Commands::Search {
            query,
            engine,
            open,
        } => commands::search::run(&query, engine, open),
    }
}

/// Log to stderr; RUST_LOG wins unless --verbose is given.
fn init_tracing(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}
