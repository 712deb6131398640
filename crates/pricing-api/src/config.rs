//! Server configuration

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::PathBuf;

/// Settings for the HTTP process, read from `PRICING_*` variables.
///
/// Pipeline paths (model, metrics) come from the YAML document at
/// `config_path`, shared with the CLI.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Bind address
    #[serde(default = "default_host")]
    pub host: String,

    /// HTTP port
    #[serde(default = "default_port")]
    pub port: u16,

    /// Pipeline configuration file
    #[serde(default = "default_config_path")]
    pub config_path: PathBuf,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8000
}

fn default_config_path() -> PathBuf {
    PathBuf::from(pricing_lib::config::DEFAULT_CONFIG_PATH)
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            config_path: default_config_path(),
        }
    }
}

impl ServerConfig {
    /// Load configuration from environment
    pub fn load() -> Result<Self> {
        let config = config::Config::builder()
            .add_source(config::Environment::with_prefix("PRICING").try_parsing(true))
            .build()?;

        config
            .try_deserialize()
            .context("invalid PRICING_* server configuration")
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
