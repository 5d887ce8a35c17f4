//! SPR Ingest - Data loading tool

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use spr_common::logging::{init_logging, LogConfig, LogLevel};
use spr_ingest::commands;
use spr_server::config::Config;
use spr_store::LookupStore;

#[derive(Parser, Debug)]
#[command(name = "spr-ingest")]
#[command(author, version, about = "SPR data loading tool")]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Load a bulk dump into the lookup store
    Load {
        #[command(subcommand)]
        table: LoadTable,
    },

    /// Rebuild the blocking index from a metadata dump
    Index {
        /// Metadata dump (JSONL or JSON array; plain, .gz, .xz or .tar.gz)
        #[arg(short, long)]
        input: PathBuf,
    },

    /// Run one incremental update against the Crossref change feed
    Update {
        /// Seed from yesterday instead of the stored watermark
        #[arg(long)]
        daily: bool,
    },

    /// Print the entry counts of every lookup database
    Sizes,
}

/// Lookup-table families and the dumps that feed them
#[derive(Subcommand, Debug)]
enum LoadTable {
    /// Crossref metadata dump (JSONL or JSON array; plain, .gz, .xz or .tar.gz)
    Crossref {
        #[arg(short, long)]
        input: PathBuf,
    },

    /// PMID/PMC/DOI mapping (CSV, optionally gzipped)
    Pmid {
        #[arg(short, long)]
        input: PathBuf,
    },

    /// ISTEX identifier bundles (JSONL, optionally gzipped)
    Istex {
        #[arg(short, long)]
        input: PathBuf,
    },

    /// HAL metadata records (JSONL, optionally gzipped)
    Hal {
        #[arg(short, long)]
        input: PathBuf,
    },

    /// Unpaywall open-access links (JSONL, optionally gzipped)
    Oa {
        #[arg(short, long)]
        input: PathBuf,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging based on verbose flag
    let log_level = if cli.verbose {
        LogLevel::Debug
    } else {
        LogLevel::Info
    };

    let log_config = LogConfig::builder()
        .level(log_level)
        .log_file_prefix("spr-ingest".to_string())
        .build();

    // Merge with environment variables (they take precedence)
    let log_config = LogConfig::from_env().unwrap_or(log_config);

    init_logging(&log_config)?;

    let config = Config::load()?;

    match cli.command {
        Command::Load { table } => {
            let store = LookupStore::open(&config.store)?;
            match table {
                LoadTable::Crossref { input } => {
                    commands::load_crossref(&config, &store, &input)?;
                },
                LoadTable::Pmid { input } => commands::load_pmid(&config, &store, &input)?,
                LoadTable::Istex { input } => commands::load_istex(&config, &store, &input)?,
                LoadTable::Hal { input } => commands::load_hal(&config, &store, &input)?,
                LoadTable::Oa { input } => commands::load_oa(&config, &store, &input)?,
            }
        },
        Command::Index { input } => commands::index(&config, &input).await?,
        Command::Update { daily } => {
            let store = LookupStore::open(&config.store)?;
            commands::update(&config, store, daily).await?;
        },
        Command::Sizes => {
            let store = LookupStore::open(&config.store)?;
            commands::sizes(&store)?;
        },
    }

    Ok(())
}
