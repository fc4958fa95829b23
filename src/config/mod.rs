//! Configuration module
//!
//! Connection parameters are read from an explicitly supplied
//! [`ConfigProvider`]. Providers exist for plain maps, environment variables
//! and the TOML config file, and can be layered.

pub mod storage;

use crate::error::{ManagerError, Result};
use std::collections::HashMap;
use std::path::PathBuf;

/// Default server host
pub const DEFAULT_HOST: &str = "localhost";

/// Default MySQL port
pub const DEFAULT_PORT: u16 = 3306;

/// Recognised configuration keys
pub mod keys {
    pub const HOST: &str = "host";
    pub const PORT: &str = "port";
    pub const USER: &str = "user";
    pub const PASSWORD: &str = "password";
    pub const DBNAME: &str = "dbname";
    pub const TMPDIR: &str = "tmpdir";
    pub const DUMP_COMMAND: &str = "dump_command";
    pub const RESTORE_COMMAND: &str = "restore_command";
}

/// Source of configuration values
pub trait ConfigProvider {
    /// Look up a single key, `None` when the provider does not set it
    fn value(&self, key: &str) -> Option<String>;
}

impl ConfigProvider for HashMap<String, String> {
    fn value(&self, key: &str) -> Option<String> {
        self.get(key).cloned()
    }
}

impl<P: ConfigProvider + ?Sized> ConfigProvider for &P {
    fn value(&self, key: &str) -> Option<String> {
        (**self).value(key)
    }
}

/// Reads `<PREFIX><KEY>` environment variables, e.g. `MYSQL_MANAGER_HOST`
#[derive(Debug, Clone)]
pub struct EnvConfig {
    prefix: String,
}

impl EnvConfig {
    /// Environment provider with a custom variable prefix
    pub fn with_prefix(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
        }
    }

    fn variable(&self, key: &str) -> String {
        format!("{}{}", self.prefix, key.to_uppercase())
    }
}

impl Default for EnvConfig {
    fn default() -> Self {
        Self::with_prefix("MYSQL_MANAGER_")
    }
}

impl ConfigProvider for EnvConfig {
    fn value(&self, key: &str) -> Option<String> {
        std::env::var(self.variable(key)).ok()
    }
}

/// Provider stack; the first provider holding a key wins
#[derive(Default)]
pub struct LayeredConfig {
    layers: Vec<Box<dyn ConfigProvider>>,
}

impl LayeredConfig {
    /// Create an empty stack
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a provider with lower priority than the ones already added
    pub fn with(mut self, provider: impl ConfigProvider + 'static) -> Self {
        self.layers.push(Box::new(provider));
        self
    }
}

impl ConfigProvider for LayeredConfig {
    fn value(&self, key: &str) -> Option<String> {
        self.layers.iter().find_map(|layer| layer.value(key))
    }
}

/// Connection parameters for one session
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionParams {
    /// Server host
    pub host: String,
    /// Server port
    pub port: u16,
    /// Login user, required by connect
    pub username: Option<String>,
    /// Login password, required by connect
    pub password: Option<String>,
    /// Default database opened on connect
    pub database: Option<String>,
    /// Directory for generated dump files, system temp dir when unset
    pub temp_dir: Option<PathBuf>,
}

impl Default for ConnectionParams {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            username: None,
            password: None,
            database: None,
            temp_dir: None,
        }
    }
}

impl ConnectionParams {
    /// Parameters with explicit credentials and defaults for the rest
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: Some(username.into()),
            password: Some(password.into()),
            ..Self::default()
        }
    }

    /// Set the host
    pub fn with_host(mut self, host: impl Into<String>) -> Self {
        self.host = host.into();
        self
    }

    /// Set the port
    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    /// Set the default database
    pub fn with_database(mut self, database: impl Into<String>) -> Self {
        self.database = Some(database.into());
        self
    }

    /// Set the directory used for generated dump files
    pub fn with_temp_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.temp_dir = Some(dir.into());
        self
    }

    /// Build parameters from a provider.
    ///
    /// Missing credentials are accepted here and rejected by `connect`. An
    /// unparseable port is rejected immediately.
    pub fn from_config(config: &dyn ConfigProvider) -> Result<Self> {
        let host = non_empty(config.value(keys::HOST)).unwrap_or_else(|| DEFAULT_HOST.to_string());
        let port = match non_empty(config.value(keys::PORT)) {
            Some(raw) => raw.trim().parse::<u16>().map_err(|_| {
                ManagerError::Config(format!("invalid port '{}'", raw))
            })?,
            None => DEFAULT_PORT,
        };

        Ok(Self {
            host,
            port,
            username: config.value(keys::USER),
            password: config.value(keys::PASSWORD),
            database: non_empty(config.value(keys::DBNAME)),
            temp_dir: non_empty(config.value(keys::TMPDIR)).map(PathBuf::from),
        })
    }

    /// Username and password when both are set and non-empty
    pub fn credentials(&self) -> Option<(&str, &str)> {
        match (self.username.as_deref(), self.password.as_deref()) {
            (Some(user), Some(password)) if !user.is_empty() && !password.is_empty() => {
                Some((user, password))
            }
            _ => None,
        }
    }

    /// Directory for generated dump files
    pub fn temp_dir(&self) -> PathBuf {
        self.temp_dir.clone().unwrap_or_else(std::env::temp_dir)
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn map(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_defaults_from_empty_config() {
        let params = ConnectionParams::from_config(&HashMap::<String, String>::new()).unwrap();
        assert_eq!(params.host, "localhost");
        assert_eq!(params.port, 3306);
        assert!(params.username.is_none());
        assert!(params.credentials().is_none());
    }

    #[test]
    fn test_from_map() {
        let config = map(&[
            ("host", "db.internal"),
            ("port", "3307"),
            ("user", "admin"),
            ("password", "s3cret"),
            ("dbname", "shop"),
        ]);
        let params = ConnectionParams::from_config(&config).unwrap();
        assert_eq!(params.host, "db.internal");
        assert_eq!(params.port, 3307);
        assert_eq!(params.credentials(), Some(("admin", "s3cret")));
        assert_eq!(params.database.as_deref(), Some("shop"));
    }

    #[test]
    fn test_invalid_port() {
        let config = map(&[("port", "localhost")]);
        let err = ConnectionParams::from_config(&config).unwrap_err();
        assert!(matches!(err, ManagerError::Config(_)));
    }

    #[test]
    fn test_empty_password_is_not_a_credential() {
        let params = ConnectionParams::new("root", "");
        assert!(params.credentials().is_none());
    }

    #[test]
    fn test_layered_first_wins() {
        let layered = LayeredConfig::new()
            .with(map(&[("host", "override")]))
            .with(map(&[("host", "base"), ("user", "root")]));
        assert_eq!(layered.value("host").as_deref(), Some("override"));
        assert_eq!(layered.value("user").as_deref(), Some("root"));
        assert_eq!(layered.value("password"), None);
    }

    #[test]
    fn test_env_variable_name() {
        let env = EnvConfig::default();
        assert_eq!(env.variable("dbname"), "MYSQL_MANAGER_DBNAME");
    }
}
