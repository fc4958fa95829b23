//! Logging setup
//!
//! Installs a `tracing-subscriber` formatter on stderr so log lines do not
//! mix with REPL output. The filter comes from `MYSQL_MANAGER_LOG`, then
//! `RUST_LOG`, then a build-dependent default.

use tracing_subscriber::EnvFilter;

/// Environment variable holding the log filter
pub const LOG_ENV: &str = "MYSQL_MANAGER_LOG";

/// Install the global subscriber.
///
/// Returns `false` when a subscriber was already installed.
pub fn init_logging(filter: Option<&str>) -> bool {
    tracing_subscriber::fmt()
        .with_env_filter(build_env_filter(filter))
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init()
        .is_ok()
}

/// Build the environment filter from an explicit filter or the environment
fn build_env_filter(custom_filter: Option<&str>) -> EnvFilter {
    if let Some(filter) = custom_filter {
        return EnvFilter::try_new(filter).unwrap_or_else(|_| EnvFilter::new(default_log_filter()));
    }

    EnvFilter::try_from_env(LOG_ENV)
        .or_else(|_| EnvFilter::try_from_default_env())
        .unwrap_or_else(|_| EnvFilter::new(default_log_filter()))
}

/// Default filter for the current build type
pub fn default_log_filter() -> &'static str {
    #[cfg(debug_assertions)]
    {
        "debug,sqlx=warn"
    }
    #[cfg(not(debug_assertions))]
    {
        "warn,mysql_manager=info,sqlx=warn"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_custom_filter_falls_back() {
        // must not panic
        let _ = build_env_filter(Some("not a [valid filter"));
        let _ = build_env_filter(Some("mysql_manager=trace"));
    }

    #[test]
    fn test_default_filter_quiets_sqlx() {
        assert!(default_log_filter().contains("sqlx=warn"));
    }
}
