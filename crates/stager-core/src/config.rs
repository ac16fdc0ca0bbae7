use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;

fn default_unpack_tool() -> PathBuf {
    PathBuf::from("tar")
}

/// Global configuration loaded from `~/.config/stager/config.toml`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StagerConfig {
    /// Maximum number of transfers in flight at once (the concurrency
    /// ceiling). Unpacking runs outside this limit.
    pub max_concurrent_transfers: usize,
    /// Extraction tool for jobs that request unpacking. Resolved via PATH
    /// when not absolute.
    #[serde(default = "default_unpack_tool")]
    pub unpack_tool: PathBuf,
    /// Default directory fetched assets are staged into (None = current dir).
    #[serde(default)]
    pub stage_dir: Option<PathBuf>,
}

impl Default for StagerConfig {
    fn default() -> Self {
        Self {
            max_concurrent_transfers: 3,
            unpack_tool: default_unpack_tool(),
            stage_dir: None,
        }
    }
}

pub fn config_path() -> Result<PathBuf> {
    let xdg_dirs = xdg::BaseDirectories::with_prefix("stager")?;
    Ok(xdg_dirs.place_config_file("config.toml")?)
}

/// Load configuration from disk, creating a default file if none exists.
pub fn load_or_init() -> Result<StagerConfig> {
    let path = config_path()?;
    if !path.exists() {
        let default_cfg = StagerConfig::default();
        let toml = toml::to_string_pretty(&default_cfg)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&path, toml)?;
        tracing::info!("created default config at {}", path.display());
        return Ok(default_cfg);
    }

    let data = fs::read_to_string(&path)?;
    let cfg: StagerConfig = toml::from_str(&data)?;
    Ok(cfg)
}
