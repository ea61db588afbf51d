//! Catalog client configuration

use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;
use tracing::info;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),
}

/// Configuration for [`CatalogClient`](crate::CatalogClient).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CatalogConfig {
    /// Base URL of the catalog service.
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// Client version sent with every request (`livecommonversion`) for
    /// service-side compatibility negotiation.
    #[serde(default = "default_client_version")]
    pub client_version: String,
    /// Stable user identifier. Only its one-way hash ever leaves the host
    /// (as the `nonce` of identity-bearing requests).
    #[serde(default)]
    pub user_id: String,
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            client_version: default_client_version(),
            user_id: String::new(),
        }
    }
}

fn default_base_url() -> String {
    "https://manager.keywarden.dev/api".to_string()
}

fn default_client_version() -> String {
    env!("CARGO_PKG_VERSION").to_string()
}

/// Load configuration from a TOML file, falling back to defaults when the
/// file does not exist.
pub fn load_config(path: &Path) -> Result<CatalogConfig, ConfigError> {
    if path.exists() {
        let content = std::fs::read_to_string(path)?;
        let config: CatalogConfig = toml::from_str(&content)?;
        info!(path = %path.display(), "Loaded catalog configuration");
        Ok(config)
    } else {
        info!(
            path = %path.display(),
            "Catalog configuration file not found, using defaults"
        );
        Ok(CatalogConfig::default())
    }
}
