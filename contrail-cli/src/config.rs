//! Store location resolution
//!
//! Priority order:
//! 1. Command-line argument (handled by clap, highest)
//! 2. CONTRAIL_STORE environment variable (handled by clap)
//! 3. `store` key in the user config file (`~/.config/contrail/config.toml`)
//! 4. Compiled default under the platform data directory

use anyhow::{Context, Result};
use std::path::PathBuf;

pub fn resolve_store_path(cli_arg: Option<PathBuf>) -> Result<PathBuf> {
    if let Some(path) = cli_arg {
        return Ok(path);
    }

    if let Some(config_path) = config_file_path() {
        if config_path.exists() {
            let content = std::fs::read_to_string(&config_path)
                .with_context(|| format!("failed to read {}", config_path.display()))?;
            let config: toml::Value = toml::from_str(&content)
                .with_context(|| format!("invalid TOML in {}", config_path.display()))?;
            if let Some(store) = config.get("store").and_then(|v| v.as_str()) {
                return Ok(PathBuf::from(store));
            }
        }
    }

    Ok(default_store_path())
}

fn config_file_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("contrail").join("config.toml"))
}

fn default_store_path() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("contrail")
        .join("signals.db")
}
