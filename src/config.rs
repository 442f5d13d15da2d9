//! Configuration management.
//!
//! Handles loading configuration from TOML files and environment variables:
//! runner defaults, catalog file locations, and named database connections.

use crate::adapter::DEFAULT_MAX_ROWS;
use crate::db::DatabaseBackend;
use crate::error::{CatalogError, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;
use url::Url;

/// Main configuration structure.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    /// Runner defaults.
    #[serde(default)]
    pub runner: RunnerConfig,

    /// Catalog files loaded at startup.
    #[serde(default)]
    pub catalogs: Vec<CatalogSource>,

    /// Named database connections.
    #[serde(default)]
    pub connections: HashMap<String, ConnectionConfig>,
}

/// Runner defaults applied when the caller does not override them.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunnerConfig {
    /// Query timeout in seconds.
    #[serde(default = "default_timeout_secs")]
    pub default_timeout_secs: u64,

    /// Maximum rows kept from a single result.
    #[serde(default = "default_max_rows")]
    pub max_rows: usize,
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_max_rows() -> usize {
    DEFAULT_MAX_ROWS
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            default_timeout_secs: default_timeout_secs(),
            max_rows: default_max_rows(),
        }
    }
}

impl RunnerConfig {
    pub fn default_timeout(&self) -> Duration {
        Duration::from_secs(self.default_timeout_secs)
    }
}

/// A catalog file reference.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CatalogSource {
    /// Path to the catalog; relative paths resolve against the config file's directory.
    pub path: PathBuf,
}

/// Database connection configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ConnectionConfig {
    /// Connection URL, e.g. `postgres://user@host:5432/yelp` or `sqlite::memory:`.
    pub url: String,
}

impl ConnectionConfig {
    /// Creates a connection config from a URL, checking that the scheme is supported.
    pub fn from_url(url: &str) -> Result<Self> {
        let config = Self {
            url: url.to_string(),
        };
        config.backend()?;
        Ok(config)
    }

    /// The backend selected by the URL scheme.
    pub fn backend(&self) -> Result<DatabaseBackend> {
        let parsed = Url::parse(&self.url)
            .map_err(|e| CatalogError::config(format!("Invalid connection URL: {e}")))?;

        DatabaseBackend::parse(parsed.scheme()).ok_or_else(|| {
            CatalogError::config(format!(
                "Invalid scheme '{}'. Expected 'postgres', 'postgresql' or 'sqlite'",
                parsed.scheme()
            ))
        })
    }

    /// Returns a display-safe string (no password) for logs and messages.
    pub fn display_string(&self) -> String {
        match Url::parse(&self.url) {
            Ok(mut url) => {
                if url.password().is_some() {
                    // Fails only for URLs that cannot carry credentials
                    let _ = url.set_password(Some("****"));
                }
                url.to_string()
            }
            Err(_) => "<invalid url>".to_string(),
        }
    }
}

impl Config {
    /// Returns the default config file path for the current platform.
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("query-catalog")
            .join("config.toml")
    }

    /// Loads configuration from a TOML file. A missing file yields defaults.
    ///
    /// Relative catalog paths are resolved against the file's directory.
    pub fn load_from_file(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path)
            .map_err(|e| CatalogError::config(format!("Failed to read config file: {e}")))?;

        let mut config = Self::parse_toml(&content, path)?;
        if let Some(base) = path.parent() {
            for catalog in &mut config.catalogs {
                if catalog.path.is_relative() {
                    catalog.path = base.join(&catalog.path);
                }
            }
        }
        Ok(config)
    }

    /// Parses configuration from a TOML string.
    fn parse_toml(content: &str, path: &Path) -> Result<Self> {
        toml::from_str(content).map_err(|e| {
            CatalogError::config(format!(
                "Configuration error in {}:\n  {}",
                path.display(),
                e
            ))
        })
    }

    /// Gets a named connection, or the default connection if name is None.
    pub fn get_connection(&self, name: Option<&str>) -> Option<&ConnectionConfig> {
        let key = name.unwrap_or("default");
        self.connections.get(key)
    }

    /// Catalog file paths in configuration order.
    pub fn catalog_paths(&self) -> Vec<PathBuf> {
        self.catalogs.iter().map(|c| c.path.clone()).collect()
    }
}
