//! Monitor configuration file

use std::path::Path;

use anyhow::{Context, Result};
use oscline_server::ServerConfig;
use serde::{Deserialize, Serialize};

/// Contents of the `--config` TOML file
///
/// ```toml
/// tick_ms = 16
///
/// [server]
/// port = 9000
/// buffer_size = 8192
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MonitorConfig {
    pub server: ServerConfig,
    /// Interval between deferred-callback drains
    pub tick_ms: u64,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            tick_ms: 16,
        }
    }
}

impl MonitorConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("reading config {}", path.display()))?;
        Self::parse(&text).with_context(|| format!("parsing config {}", path.display()))
    }

    pub fn parse(text: &str) -> Result<Self> {
        Ok(toml::from_str(text)?)
    }
}
