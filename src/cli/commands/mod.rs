//! CLI commands implementation.
//!
//! This module contains the CLI parser and dispatches to command-specific modules.

mod discover;
mod enrich;
mod helpers;
mod init;
mod jobs;
mod locations;
mod sites;
mod stats;

use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand};

use crate::config::Settings;

#[derive(Parser)]
#[command(name = "jobscout")]
#[command(about = "Discover, enrich and track job postings from career sites")]
#[command(version)]
pub struct Cli {
    /// Config file path (defaults to ./jobscout.toml when present)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Data directory (overrides config file)
    #[arg(long, global = true, env = "JOBSCOUT_DATA_DIR")]
    data_dir: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

/// Check if verbose mode is enabled (for early logging setup).
pub fn is_verbose() -> bool {
    std::env::args().any(|arg| arg == "-v" || arg == "--verbose")
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize the data directory and database
    Init,

    /// List configured career sites
    Sites {
        /// Sites file (defaults to <data_dir>/sites.txt)
        #[arg(long)]
        file: Option<PathBuf>,
    },

    /// Search every site, store new postings and enrich them
    Discover {
        /// Search term (defaults to the configured term)
        term: Option<String>,
        /// Run a single cycle and exit
        #[arg(long)]
        once: bool,
        /// Seconds between cycles
        #[arg(long)]
        interval: Option<u64>,
        /// Result pages visited per site
        #[arg(long)]
        max_pages: Option<usize>,
        /// Consecutive known postings that end a site visit
        #[arg(long)]
        duplicate_threshold: Option<usize>,
        /// Sites file (defaults to <data_dir>/sites.txt)
        #[arg(long)]
        sites: Option<PathBuf>,
    },

    /// Enrich stored postings still at "discovered"
    Enrich {
        /// Concurrent jobs per batch
        #[arg(short, long)]
        batch_size: Option<usize>,
        /// Maximum jobs per cycle (0 = all pending)
        #[arg(short, long, default_value = "0")]
        limit: usize,
        /// Run a single cycle and exit
        #[arg(long)]
        once: bool,
        /// Seconds between cycles
        #[arg(long)]
        interval: Option<u64>,
    },

    /// Re-validate stored locations that have no country code
    Locations {
        /// Maximum postings to check (0 = all)
        #[arg(short, long, default_value = "0")]
        limit: usize,
    },

    /// Inspect and update stored postings
    Jobs {
        #[command(subcommand)]
        command: JobsCommands,
    },

    /// Show posting counts per status
    Stats,
}

#[derive(Subcommand)]
enum JobsCommands {
    /// List postings, newest first
    List {
        /// Only this status
        #[arg(short, long)]
        status: Option<String>,
        /// Location substring
        #[arg(long)]
        location: Option<String>,
        /// Only postings found through this site URL
        #[arg(long)]
        source: Option<String>,
        /// Maximum rows
        #[arg(short, long, default_value = "50")]
        limit: i64,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show one posting
    Show {
        /// Posting ID
        id: String,
    },
    /// Move a posting forward in its lifecycle
    SetStatus {
        /// Posting ID
        id: String,
        /// New status (enriched, scraped, interested, applied, rejected)
        status: String,
    },
}

pub async fn run() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut settings =
        Settings::load(cli.config.as_deref()).context("failed to load configuration")?;
    if let Some(data_dir) = cli.data_dir {
        settings = Settings {
            database: data_dir.join(crate::config::DATABASE_FILENAME),
            sites_file: data_dir.join(crate::config::SITES_FILENAME),
            data_dir,
            ..settings
        };
    }

    match cli.command {
        Commands::Init => init::cmd_init(&settings).await,
        Commands::Sites { file } => sites::cmd_sites(&settings, file).await,
        Commands::Discover {
            term,
            once,
            interval,
            max_pages,
            duplicate_threshold,
            sites,
        } => {
            if let Some(sites) = sites {
                settings.sites_file = sites;
            }
            if let Some(max_pages) = max_pages {
                settings.pipeline.max_pages = max_pages;
            }
            if let Some(threshold) = duplicate_threshold {
                settings.pipeline.duplicate_threshold = threshold;
            }
            if let Some(interval) = interval {
                settings.pipeline.cycle_interval_secs = interval;
            }
            let term = term.unwrap_or_else(|| settings.search_term.clone());
            discover::cmd_discover(&settings, &term, once).await
        }
        Commands::Enrich {
            batch_size,
            limit,
            once,
            interval,
        } => {
            if let Some(batch_size) = batch_size {
                settings.pipeline.batch_size = batch_size;
            }
            if let Some(interval) = interval {
                settings.pipeline.cycle_interval_secs = interval;
            }
            enrich::cmd_enrich(&settings, limit, once).await
        }
        Commands::Locations { limit } => locations::cmd_locations(&settings, limit).await,
        Commands::Jobs { command } => match command {
            JobsCommands::List {
                status,
                location,
                source,
                limit,
                json,
            } => {
                jobs::cmd_jobs_list(&settings, status.as_deref(), location, source, limit, json)
                    .await
            }
            JobsCommands::Show { id } => jobs::cmd_jobs_show(&settings, &id).await,
            JobsCommands::SetStatus { id, status } => {
                jobs::cmd_jobs_set_status(&settings, &id, &status).await
            }
        },
        Commands::Stats => stats::cmd_stats(&settings).await,
    }
}
