//! Proxy configuration, loaded from a YAML file.

use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::{fs, path};

#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("YAML parsing error: {0}")]
    YamlParse(#[from] serde_yaml::Error),
}

/// Runtime configuration. Every field has a default matching the original
/// deployment, so a partial file (or none at all) is fine.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProxyConfig {
    /// Address the proxy listens on.
    pub listen: SocketAddr,
    /// Base URL of the key/value origin.
    pub origin: String,
    /// Redis connection URI.
    pub redis_uri: String,
    /// Namespace prefix for all cache keys in Redis.
    pub key_prefix: String,
}

impl Default for ProxyConfig {
    fn default() -> Self {
        Self {
            listen: SocketAddr::from(([0, 0, 0, 0], 8400)),
            origin: "http://localhost:8100".to_string(),
            redis_uri: "redis://localhost:6379".to_string(),
            key_prefix: "riak_cache".to_string(),
        }
    }
}

impl ProxyConfig {
    /// Read configuration from a YAML file.
    pub fn from_file(
        config_file_path: impl AsRef<path::Path>,
    ) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(config_file_path)?;
        Ok(serde_yaml::from_str(&content)?)
    }
}
