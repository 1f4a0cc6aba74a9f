//! Server configuration

use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use tracing::info;

use crate::error::ConfigError;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub sync: SyncConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Address the HTTP/WebSocket listener binds to
    #[serde(default = "default_listen")]
    pub listen: SocketAddr,

    /// Directory served under /static
    #[serde(default = "default_static_dir")]
    pub static_dir: PathBuf,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncConfig {
    /// Site label used when minting identifiers for clients that send none
    #[serde(default = "default_site")]
    pub site: String,

    /// Per-participant queue of pending outbound messages
    #[serde(default = "default_outbox_capacity")]
    pub outbox_capacity: usize,

    /// Tell the originator when its operation is dropped
    #[serde(default)]
    pub notify_rejections: bool,
}

// Defaults
fn default_listen() -> SocketAddr { SocketAddr::from(([0, 0, 0, 0], 8080)) }
fn default_static_dir() -> PathBuf { PathBuf::from("static") }
fn default_site() -> String { "local".to_string() }
fn default_outbox_capacity() -> usize { 256 }

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen: default_listen(),
            static_dir: default_static_dir(),
        }
    }
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            site: default_site(),
            outbox_capacity: default_outbox_capacity(),
            notify_rejections: false,
        }
    }
}

impl Config {
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(content)?)
    }

    /// Load `path`, falling back to defaults when the file does not exist.
    pub fn load_or_default(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            info!(path = %path.display(), "Config file not found, using defaults");
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_toml(&content)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.sync.site.trim().is_empty() {
            return Err(ConfigError::Invalid("sync.site must not be empty".into()));
        }
        if self.sync.outbox_capacity == 0 {
            return Err(ConfigError::Invalid(
                "sync.outbox_capacity must be at least 1".into(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_file_uses_defaults() {
        let config = Config::from_toml("").unwrap();
        assert_eq!(config.server.listen, default_listen());
        assert_eq!(config.sync.site, "local");
        assert_eq!(config.sync.outbox_capacity, 256);
        assert!(!config.sync.notify_rejections);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_blank_site() {
        let mut config = Config::default();
        config.sync.site = "  ".into();
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn test_validate_rejects_zero_capacity() {
        let mut config = Config::default();
        config.sync.outbox_capacity = 0;
        assert!(config.validate().is_err());
    }
}
