// mysql-manager: administrative REPL for MySQL servers
//
// Usage: mysql-manager [config.toml]

use anyhow::{Context, Result};
use mysql_manager::cli::Repl;
use mysql_manager::config::storage;
use mysql_manager::config::{EnvConfig, LayeredConfig};
use mysql_manager::database::DatabaseManager;
use mysql_manager::logging;
use std::path::PathBuf;

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();
    logging::init_logging(None);

    let file_config = match std::env::args().nth(1).map(PathBuf::from) {
        Some(path) => storage::Config::load_from(&path)
            .with_context(|| format!("loading {}", path.display()))?,
        None => storage::Config::load().context("loading default config file")?,
    };

    let provider = LayeredConfig::new()
        .with(EnvConfig::default())
        .with(file_config);
    let manager = DatabaseManager::from_config(&provider)
        .context("reading connection settings")?;

    let mut repl = Repl::new(manager)?;
    repl.run().await?;

    Ok(())
}
