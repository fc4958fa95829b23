//! Database connection abstraction
//!
//! The session manager talks to the server through two traits: a
//! [`Connector`] that opens connections and a [`DatabaseDriver`] that runs
//! statements on one open connection. The production implementation sits on
//! a single `sqlx` MySQL connection.

use crate::config::ConnectionParams;
use crate::database::row::{column_value, Row};
use async_trait::async_trait;
use serde_json::Value;
use sqlx::mysql::{MySqlConnectOptions, MySqlConnection, MySqlDatabaseError, MySqlRow};
use sqlx::{Column, Connection, Executor, Row as _, TypeInfo, ValueRef};
use thiserror::Error;

/// Session character set applied after connecting
pub const UTF8_CHARSET: &str = "utf8mb4";

/// MySQL `ER_BAD_DB_ERROR`: unknown database
pub const ER_BAD_DB_ERROR: u16 = 1049;

/// Result type for driver calls
pub type DriverResult<T> = std::result::Result<T, DriverError>;

/// Error reported by a driver
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{message}")]
pub struct DriverError {
    /// Server or client error text
    pub message: String,
    /// MySQL error number when the server produced one
    pub code: Option<u16>,
}

impl DriverError {
    /// Error without a server error number
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            code: None,
        }
    }

    /// Error carrying a MySQL error number
    pub fn with_code(message: impl Into<String>, code: u16) -> Self {
        Self {
            message: message.into(),
            code: Some(code),
        }
    }

    /// True only when the server answered with "unknown database"
    pub fn is_unknown_database(&self) -> bool {
        self.code == Some(ER_BAD_DB_ERROR)
    }
}

impl From<sqlx::Error> for DriverError {
    fn from(err: sqlx::Error) -> Self {
        let code = err
            .as_database_error()
            .and_then(|db| db.try_downcast_ref::<MySqlDatabaseError>())
            .map(|db| db.number());
        Self {
            message: err.to_string(),
            code,
        }
    }
}

/// Opens connections to a server
#[async_trait]
pub trait Connector: Send + Sync {
    /// Open a connection with the given parameters
    async fn connect(&self, params: &ConnectionParams) -> DriverResult<Box<dyn DatabaseDriver>>;
}

/// One open connection
#[async_trait]
pub trait DatabaseDriver: Send {
    /// Set the session character set
    async fn set_charset(&mut self, charset: &str) -> DriverResult<()>;

    /// Make `name` the default database of the connection
    async fn select_database(&mut self, name: &str) -> DriverResult<()>;

    /// Run a statement, returning the affected row count
    async fn execute(&mut self, sql: &str) -> DriverResult<u64>;

    /// Run a statement and collect every row
    async fn fetch_all(&mut self, sql: &str) -> DriverResult<Vec<Row>>;
}

/// Quote a MySQL identifier with backticks
pub fn quote_identifier(name: &str) -> String {
    format!("`{}`", name.replace('`', "``"))
}

/// Connector backed by `sqlx`
#[derive(Debug, Default, Clone, Copy)]
pub struct MySqlConnector;

#[async_trait]
impl Connector for MySqlConnector {
    async fn connect(&self, params: &ConnectionParams) -> DriverResult<Box<dyn DatabaseDriver>> {
        let mut options = MySqlConnectOptions::new()
            .host(&params.host)
            .port(params.port)
            .charset(UTF8_CHARSET);
        if let Some(username) = &params.username {
            options = options.username(username);
        }
        if let Some(password) = &params.password {
            options = options.password(password);
        }
        if let Some(database) = &params.database {
            options = options.database(database);
        }

        let conn = MySqlConnection::connect_with(&options).await?;
        Ok(Box::new(MySqlDriver { conn }))
    }
}

/// Driver over one `sqlx` MySQL connection.
///
/// Statements go through the text protocol so `USE`, `GRANT` and other
/// statements that cannot be prepared work as typed.
pub struct MySqlDriver {
    conn: MySqlConnection,
}

#[async_trait]
impl DatabaseDriver for MySqlDriver {
    async fn set_charset(&mut self, charset: &str) -> DriverResult<()> {
        let sql = format!("SET NAMES {}", charset);
        self.conn.execute(sqlx::raw_sql(&sql)).await?;
        Ok(())
    }

    async fn select_database(&mut self, name: &str) -> DriverResult<()> {
        let sql = format!("USE {}", quote_identifier(name));
        self.conn.execute(sqlx::raw_sql(&sql)).await?;
        Ok(())
    }

    async fn execute(&mut self, sql: &str) -> DriverResult<u64> {
        let result = self.conn.execute(sqlx::raw_sql(sql)).await?;
        Ok(result.rows_affected())
    }

    async fn fetch_all(&mut self, sql: &str) -> DriverResult<Vec<Row>> {
        let rows = self.conn.fetch_all(sqlx::raw_sql(sql)).await?;
        Ok(rows.iter().map(convert_row).collect())
    }
}

fn convert_row(row: &MySqlRow) -> Row {
    let mut out = Row::new();
    for column in row.columns() {
        let index = column.ordinal();
        let is_null = row.try_get_raw(index).map_or(true, |raw| raw.is_null());
        let value = if is_null {
            Value::Null
        } else {
            match row.try_get_unchecked::<Vec<u8>, _>(index) {
                Ok(bytes) => column_value(column.type_info().name(), &bytes),
                Err(_) => Value::Null,
            }
        };
        out.push(column.name(), value);
    }
    out
}
