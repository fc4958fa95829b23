//! Database Manager
//!
//! This module implements the DatabaseManager struct: one administrative
//! session holding a connection handle and the current database, with
//! operations to list, create, export, import, copy and grant on databases.

use crate::config::{ConfigProvider, ConnectionParams};
use crate::database::connection::{
    quote_identifier, Connector, DatabaseDriver, MySqlConnector, UTF8_CHARSET,
};
use crate::database::dump::{CredentialsFile, DumpTools, ProcessLauncher, TokioLauncher};
use crate::database::row::Row;
use crate::error::{ManagerError, Result};
use serde_json::Value;
use std::path::{Path, PathBuf};
use tempfile::TempPath;
use tracing::{debug, error, info, warn};

/// Server-owned catalogs hidden from [`DatabaseManager::list_databases`]
pub const SYSTEM_DATABASES: [&str; 3] = ["mysql", "information_schema", "performance_schema"];

/// Default grantee host
pub const DEFAULT_GRANT_HOST: &str = "localhost";

const DUMP_FILE_PREFIX: &str = "mysql-manager-dump";

/// Result of [`DatabaseManager::run_query`]
#[derive(Debug, Clone, PartialEq)]
pub enum QueryOutcome {
    /// Statement ran; rows were not requested
    Completed {
        /// Rows changed by the statement
        rows_affected: u64,
    },
    /// Every row the statement produced, in server order
    Rows(Vec<Row>),
}

impl QueryOutcome {
    /// The rows, empty for [`QueryOutcome::Completed`]
    pub fn into_rows(self) -> Vec<Row> {
        match self {
            QueryOutcome::Completed { .. } => Vec::new(),
            QueryOutcome::Rows(rows) => rows,
        }
    }
}

/// Database Manager
///
/// One administrative session. It owns at most one live connection and the
/// name of the current database; operations take `&mut self` and run to
/// completion one at a time.
pub struct DatabaseManager {
    params: ConnectionParams,
    tools: DumpTools,
    connector: Box<dyn Connector>,
    launcher: Box<dyn ProcessLauncher>,
    driver: Option<Box<dyn DatabaseDriver>>,
    database: Option<String>,
}

impl DatabaseManager {
    /// Creates a manager using the `sqlx` driver and the system tools.
    ///
    /// Nothing is contacted until [`DatabaseManager::connect`].
    ///
    /// # Example
    /// ```no_run
    /// use mysql_manager::config::ConnectionParams;
    /// use mysql_manager::database::manager::DatabaseManager;
    ///
    /// #[tokio::main]
    /// async fn main() -> Result<(), Box<dyn std::error::Error>> {
    ///     let mut manager = DatabaseManager::new(ConnectionParams::new("admin", "secret"));
    ///     manager.connect().await?;
    ///     manager.copy_database("shop", "shop_staging").await?;
    ///     Ok(())
    /// }
    /// ```
    pub fn new(params: ConnectionParams) -> Self {
        Self::with_collaborators(params, Box::new(MySqlConnector), Box::new(TokioLauncher))
    }

    /// Creates a manager with explicit driver and process collaborators
    pub fn with_collaborators(
        params: ConnectionParams,
        connector: Box<dyn Connector>,
        launcher: Box<dyn ProcessLauncher>,
    ) -> Self {
        let database = params.database.clone();
        Self {
            params,
            tools: DumpTools::default(),
            connector,
            launcher,
            driver: None,
            database,
        }
    }

    /// Creates a manager from a configuration provider
    pub fn from_config(config: &dyn ConfigProvider) -> Result<Self> {
        let params = ConnectionParams::from_config(config)?;
        Ok(Self::new(params).with_tools(DumpTools::from_config(config)))
    }

    /// Replace the dump / restore executables
    pub fn with_tools(mut self, tools: DumpTools) -> Self {
        self.tools = tools;
        self
    }

    /// Connection parameters
    pub fn params(&self) -> &ConnectionParams {
        &self.params
    }

    /// Name of the current database
    pub fn current_database(&self) -> Option<&str> {
        self.database.as_deref()
    }

    /// Whether a connection has been opened
    pub fn is_connected(&self) -> bool {
        self.driver.is_some()
    }

    /// Open the connection.
    ///
    /// Fails with `Config` before contacting the server when username or
    /// password is missing. Replaces any previous connection.
    pub async fn connect(&mut self) -> Result<()> {
        if self.params.credentials().is_none() {
            error!("Username or password missing");
            return Err(ManagerError::Config("username or password missing".to_string()));
        }

        let params = &self.params;
        let mut driver = self.connector.connect(params).await.map_err(|e| {
            error!(
                host = %params.host,
                port = params.port,
                username = params.username.as_deref().unwrap_or_default(),
                error = %e,
                "MySQL connection failed"
            );
            ManagerError::Connection(format!(
                "failed to connect to {}:{} as {} ({})",
                params.host,
                params.port,
                params.username.as_deref().unwrap_or_default(),
                e
            ))
        })?;

        driver.set_charset(UTF8_CHARSET).await.map_err(|e| {
            error!(host = %params.host, error = %e, "Failed to set session charset");
            ManagerError::Connection(format!("failed to set charset {}: {}", UTF8_CHARSET, e))
        })?;

        info!(host = %params.host, port = params.port, "Connected");
        self.driver = Some(driver);
        self.database = self.params.database.clone();
        Ok(())
    }

    /// Switch the current database
    pub async fn select_database(&mut self, name: &str) -> Result<()> {
        let selected = self.driver_mut()?.select_database(name).await;
        match selected {
            Ok(()) => {
                debug!(database = name, "Database selected");
                self.database = Some(name.to_string());
                Ok(())
            }
            Err(e) if e.is_unknown_database() => {
                error!(database = name, error = %e, "Database not found");
                Err(ManagerError::NotFound(format!("database {}", name)))
            }
            Err(e) => {
                error!(database = name, error = %e, "Failed to select database");
                Err(ManagerError::query(format!("USE {}", quote_identifier(name)), e))
            }
        }
    }

    /// Names of all non-system databases, in server order
    pub async fn list_databases(&mut self) -> Result<Vec<String>> {
        const STATEMENT: &str = "SHOW DATABASES";

        let rows = self.driver_mut()?.fetch_all(STATEMENT).await.map_err(|e| {
            error!(error = %e, "Query failed, unable to fetch databases");
            ManagerError::query(STATEMENT, e)
        })?;

        Ok(rows
            .iter()
            .filter_map(|row| match row.get_index(0) {
                Some(Value::String(name)) => Some(name.clone()),
                _ => None,
            })
            .filter(|name| !SYSTEM_DATABASES.contains(&name.as_str()))
            .collect())
    }

    /// Create a database; the server decides whether the name is acceptable
    pub async fn create_database(&mut self, name: &str) -> Result<()> {
        let statement = format!("CREATE DATABASE {}", quote_identifier(name));
        self.driver_mut()?.execute(&statement).await.map_err(|e| {
            error!(database = name, statement = %statement, error = %e, "Query failed, unable to create database");
            ManagerError::query(statement.as_str(), e)
        })?;

        info!(database = name, "Database created");
        Ok(())
    }

    /// Dump the current database.
    ///
    /// Writes to `target`, or to a fresh file in the temp directory when no
    /// target is given. Returns the path written.
    pub async fn export_database(&mut self, target: Option<&Path>) -> Result<PathBuf> {
        let database = self.require_database("export")?.to_string();

        let (path, generated) = match target {
            Some(path) => (path.to_path_buf(), None),
            None => {
                let temp = self.temp_dump_file().map_err(|e| {
                    error!(error = %e, "Export failed, cannot create temporary file");
                    ManagerError::Export(format!("cannot create temporary file: {}", e))
                })?;
                (temp.to_path_buf(), Some(temp))
            }
        };

        let credentials = self.credentials_file().map_err(|e| {
            error!(database = %database, error = %e, "Export failed, cannot write credentials");
            ManagerError::Export(format!("cannot write credentials file: {}", e))
        })?;
        let invocation = self.tools.dump(&self.params, &credentials, &database, &path);
        debug!(program = %invocation.program, args = ?invocation.args, "Running dump");

        let failure = match self.launcher.run(&invocation).await {
            Ok(outcome) if outcome.success() => None,
            Ok(outcome) => Some(outcome.describe()),
            Err(e) => Some(format!("cannot run {}: {}", invocation.program, e)),
        };
        if let Some(reason) = failure {
            error!(database = %database, reason = %reason, "Export failed");
            // a generated file is dropped, and so removed, here
            return Err(ManagerError::Export(format!("database {}: {}", database, reason)));
        }

        if let Some(temp) = generated {
            temp.keep().map_err(|e| {
                ManagerError::Export(format!("cannot keep dump file: {}", e.error))
            })?;
        }

        info!(database = %database, path = %path.display(), "Database exported");
        Ok(path)
    }

    /// Restore a dump file into the current database
    pub async fn import_database(&mut self, path: &Path) -> Result<()> {
        let database = self.require_database("import")?.to_string();

        if !path.exists() {
            error!(database = %database, path = %path.display(), "Import failed, dump file does not exist");
            return Err(ManagerError::NotFound(format!(
                "dump file {}",
                path.display()
            )));
        }

        let credentials = self.credentials_file().map_err(|e| {
            error!(database = %database, error = %e, "Import failed, cannot write credentials");
            ManagerError::Import(format!("cannot write credentials file: {}", e))
        })?;
        let invocation = self.tools.restore(&self.params, &credentials, &database, path);
        debug!(program = %invocation.program, args = ?invocation.args, "Running restore");

        let failure = match self.launcher.run(&invocation).await {
            Ok(outcome) if outcome.success() => None,
            Ok(outcome) => Some(outcome.describe()),
            Err(e) => Some(format!("cannot run {}: {}", invocation.program, e)),
        };
        if let Some(reason) = failure {
            error!(database = %database, reason = %reason, "Import failed");
            return Err(ManagerError::Import(format!("database {}: {}", database, reason)));
        }

        info!(database = %database, path = %path.display(), "Database imported");
        Ok(())
    }

    /// Copy `from` into `to`, creating `to` when it does not exist.
    ///
    /// The intermediate dump file is removed on every path out of this call.
    /// The first failing step aborts the copy.
    pub async fn copy_database(&mut self, from: &str, to: &str) -> Result<()> {
        self.select_database(from).await?;

        let dump = self.temp_dump_file().map_err(|e| {
            error!(error = %e, "Copy failed, cannot create temporary file");
            ManagerError::Export(format!("cannot create temporary file: {}", e))
        })?;
        self.export_database(Some(&*dump)).await?;

        match self.select_database(to).await {
            Ok(()) => {}
            Err(ManagerError::NotFound(_)) => {
                self.create_database(to).await?;
                self.select_database(to).await?;
            }
            Err(e) => return Err(e),
        }

        let imported = self.import_database(&dump).await;
        remove_dump_file(dump);

        if imported.is_ok() {
            info!(from, to, "Database copied");
        }
        imported
    }

    /// Grant every privilege on the current database.
    ///
    /// `user` and `host` are inserted into the statement as given; callers
    /// must only pass trusted values.
    pub async fn grant_all_privileges(&mut self, user: &str, host: Option<&str>) -> Result<()> {
        let database = self.require_database("grant privileges")?;
        let statement = format!(
            "GRANT ALL PRIVILEGES ON {}.* TO {}@{}",
            quote_identifier(database),
            user,
            host.unwrap_or(DEFAULT_GRANT_HOST)
        );
        let database = database.to_string();

        self.driver_mut()?.execute(&statement).await.map_err(|e| {
            error!(
                database = %database,
                statement = %statement,
                error = %e,
                "Query failed, unable to grant privileges"
            );
            ManagerError::query(statement.as_str(), e)
        })?;

        info!(database = %database, user, "Privileges granted");
        Ok(())
    }

    /// Run arbitrary SQL, returning all rows when `want_rows` is set
    pub async fn run_query(&mut self, text: &str, want_rows: bool) -> Result<QueryOutcome> {
        let database = self.database.clone().unwrap_or_default();
        let driver = self.driver_mut()?;

        let result = if want_rows {
            driver.fetch_all(text).await.map(QueryOutcome::Rows)
        } else {
            driver
                .execute(text)
                .await
                .map(|rows_affected| QueryOutcome::Completed { rows_affected })
        };

        result.map_err(|e| {
            error!(
                database = %database,
                query = %text,
                error = %e,
                "Query failed"
            );
            ManagerError::query(text, e)
        })
    }

    fn driver_mut(&mut self) -> Result<&mut Box<dyn DatabaseDriver>> {
        self.driver.as_mut().ok_or_else(|| {
            error!("Operation requires a connection, not connected");
            ManagerError::State("not connected".to_string())
        })
    }

    fn require_database(&self, operation: &str) -> Result<&str> {
        if self.driver.is_none() {
            error!(operation, "Not connected");
            return Err(ManagerError::State(format!("cannot {}, not connected", operation)));
        }
        self.database.as_deref().ok_or_else(|| {
            error!(operation, "Database not set");
            ManagerError::State(format!("cannot {}, database not set", operation))
        })
    }

    fn temp_dump_file(&self) -> std::io::Result<TempPath> {
        let file = tempfile::Builder::new()
            .prefix(DUMP_FILE_PREFIX)
            .suffix(".sql")
            .tempfile_in(self.params.temp_dir())?;
        Ok(file.into_temp_path())
    }

    fn credentials_file(&self) -> std::io::Result<CredentialsFile> {
        let (user, password) = self.params.credentials().ok_or_else(|| {
            std::io::Error::new(std::io::ErrorKind::InvalidInput, "username or password missing")
        })?;
        CredentialsFile::create_in(&self.params.temp_dir(), user, password)
    }
}

fn remove_dump_file(dump: TempPath) {
    let path = dump.to_path_buf();
    if let Err(e) = dump.close() {
        warn!(path = %path.display(), error = %e, "Failed to remove temporary dump file");
    }
}
