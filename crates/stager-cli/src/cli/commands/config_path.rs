//! `stager config-path` – print where the configuration lives.

use anyhow::Result;
use stager_core::config;

pub fn run_config_path() -> Result<()> {
    println!("{}", config::config_path()?.display());
    Ok(())
}
