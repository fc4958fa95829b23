//! Configuration Storage
//!
//! This module reads the persistent TOML configuration file. Connection
//! settings live in a `[mysql]` table:
//!
//! ```toml
//! [mysql]
//! host = "localhost"
//! port = 3306
//! user = "admin"
//! password = "secret"
//! dbname = "shop"
//! ```

use crate::config::ConfigProvider;
use crate::error::{ManagerError, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Configuration file name
const CONFIG_FILE: &str = "config.toml";

/// Persistent configuration data
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Connection and tool settings
    #[serde(default)]
    pub mysql: toml::Table,
}

impl Config {
    /// Create a new empty configuration
    pub fn new() -> Self {
        Self::default()
    }

    /// Get the configuration directory path
    pub fn config_dir() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| {
                ManagerError::Io(std::io::Error::new(
                    std::io::ErrorKind::NotFound,
                    "Could not find configuration directory",
                ))
            })?
            .join("mysql-manager");

        Ok(config_dir)
    }

    /// Get the configuration file path
    pub fn config_file() -> Result<PathBuf> {
        Ok(Self::config_dir()?.join(CONFIG_FILE))
    }

    /// Load the default configuration file, empty when it does not exist
    pub fn load() -> Result<Self> {
        let config_file = Self::config_file()?;

        if !config_file.exists() {
            return Ok(Self::new());
        }

        Self::load_from(&config_file)
    }

    /// Load configuration from an explicit path
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|e| {
            ManagerError::Config(format!(
                "Failed to read config file {}: {}",
                path.display(),
                e
            ))
        })?;

        Self::parse(&content)
    }

    /// Parse configuration text
    pub fn parse(content: &str) -> Result<Self> {
        toml::from_str(content)
            .map_err(|e| ManagerError::Config(format!("Failed to parse config file: {}", e)))
    }
}

impl ConfigProvider for Config {
    fn value(&self, key: &str) -> Option<String> {
        match self.mysql.get(key)? {
            toml::Value::String(s) => Some(s.clone()),
            toml::Value::Integer(i) => Some(i.to_string()),
            toml::Value::Float(f) => Some(f.to_string()),
            toml::Value::Boolean(b) => Some(b.to_string()),
            _ => None,
        }
    }
}
