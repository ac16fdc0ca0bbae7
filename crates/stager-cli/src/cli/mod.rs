//! CLI for the Stager asset fetcher.

mod commands;

use anyhow::Result;
use clap::{Parser, Subcommand};
use stager_core::config;
use std::path::PathBuf;

use commands::{run_config_path, run_fetch};

/// Top-level CLI for the Stager asset fetcher.
#[derive(Debug, Parser)]
#[command(name = "stager")]
#[command(about = "Stager: concurrency-limited background asset fetcher", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: CliCommand,
}

#[derive(Debug, Subcommand)]
pub enum CliCommand {
    /// Fetch one or more sources, optionally unpacking them after transfer.
    Fetch {
        /// HTTP/HTTPS URLs to fetch. A duplicate URL is enqueued only once.
        #[arg(required = true)]
        sources: Vec<String>,

        /// Extract each fetched archive into the destination directory.
        #[arg(long)]
        unpack: bool,

        /// Destination directory (defaults to stage_dir from config, then
        /// the current directory).
        #[arg(long, value_name = "DIR")]
        dest: Option<PathBuf>,

        /// Run up to N transfers concurrently (defaults to the configured
        /// ceiling).
        #[arg(long, value_name = "N")]
        jobs: Option<usize>,
    },

    /// Print the path of the configuration file.
    ConfigPath,
}

impl CliCommand {
    pub async fn run_from_args() -> Result<()> {
        let cli = Cli::parse();
        let cfg = config::load_or_init()?;
        tracing::debug!("loaded config: {:?}", cfg);

        match cli.command {
            CliCommand::Fetch {
                sources,
                unpack,
                dest,
                jobs,
            } => run_fetch(&cfg, &sources, dest, unpack, jobs).await?,
            CliCommand::ConfigPath => run_config_path()?,
        }

        Ok(())
    }
}
