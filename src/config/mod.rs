// src/config/mod.rs
mod models;
mod probes;

pub use models::*;
pub use probes::{build_client_factory, build_probe, build_registry};

use anyhow::{Context, Result};
use std::path::Path;

/// Load configuration from a file (YAML or JSON)
pub async fn load_config<P: AsRef<Path>>(path: P) -> Result<Config> {
    let path = path.as_ref();
    let contents = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("Failed to read config file {}", path.display()))?;
    
    let config = parse_config(&contents, path.extension().and_then(|s| s.to_str()))?;
    config.validate()?;
    Ok(config)
}

/// Parse configuration text; `yaml`/`yml` extensions select YAML, anything else JSON.
pub fn parse_config(contents: &str, extension: Option<&str>) -> Result<Config> {
    let config: Config = if matches!(extension, Some("yaml") | Some("yml")) {
        serde_yaml::from_str(contents).context("Failed to parse YAML config")?
    } else {
        serde_json::from_str(contents).context("Failed to parse JSON config")?
    };
    Ok(config)
}
