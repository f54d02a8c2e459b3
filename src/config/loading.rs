//! Configuration loading from TOML files

use anyhow::Result;

use super::types::{Config, NodeConfig};

/// Load configuration from a TOML file
///
/// The loaded configuration is validated before being returned, so a
/// successfully loaded `Config` is always safe to hand to
/// [`Cluster::connect`](crate::Cluster::connect).
pub fn load_config(config_path: &str) -> Result<Config> {
    let config_content = std::fs::read_to_string(config_path)
        .map_err(|e| anyhow::anyhow!("Failed to read config file '{}': {}", config_path, e))?;

    let config: Config = toml::from_str(&config_content)
        .map_err(|e| anyhow::anyhow!("Failed to parse config file '{}': {}", config_path, e))?;

    config.validate()?;

    Ok(config)
}

/// Create a default configuration for examples/testing
#[must_use]
pub fn create_default_config() -> Config {
    Config {
        nodes: vec![
            NodeConfig::builder("kv1.example.com", 11210)
                .name("kv-node-1")
                .build()
                .expect("static defaults are valid"),
        ],
        ..Default::default()
    }
}
