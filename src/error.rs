//! Error types for mysql-manager
//!
//! Every session operation returns [`Result`]. Failures are logged where they
//! are detected and then handed back to the caller as one of these variants.

use thiserror::Error;

/// Result type alias for mysql-manager
pub type Result<T> = std::result::Result<T, ManagerError>;

/// Main error type for mysql-manager
#[derive(Error, Debug)]
pub enum ManagerError {
    /// Missing credentials or malformed configuration values
    #[error("Configuration error: {0}")]
    Config(String),

    /// The driver could not open a connection
    #[error("Connection error: {0}")]
    Connection(String),

    /// Unknown database or missing dump file
    #[error("Not found: {0}")]
    NotFound(String),

    /// A statement was rejected by the server
    #[error("Query failed ({statement}): {message}")]
    Query {
        /// The statement text that failed
        statement: String,
        /// Driver error message
        message: String,
    },

    /// Operation needs a connection or a selected database
    #[error("Invalid state: {0}")]
    State(String),

    /// The dump utility could not be launched or exited non-zero
    #[error("Export failed: {0}")]
    Export(String),

    /// The restore utility could not be launched or exited non-zero
    #[error("Import failed: {0}")]
    Import(String),

    /// IO-related errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Command syntax errors in the REPL
    #[error("Invalid syntax for {command}, expected: {expected}")]
    InvalidCommandSyntax {
        /// The command as typed
        command: String,
        /// Usage string
        expected: String,
    },

    /// Unknown `/` command
    #[error("Unknown command: {0} (type /help for a list)")]
    UnknownCommand(String),

    /// Line editor failures
    #[error("Readline error: {0}")]
    Readline(String),
}

impl ManagerError {
    /// Build a query error from a statement and the driver's message
    pub fn query(statement: impl Into<String>, message: impl std::fmt::Display) -> Self {
        ManagerError::Query {
            statement: statement.into(),
            message: message.to_string(),
        }
    }

    /// Short category name, used by the REPL
    pub fn kind(&self) -> &'static str {
        match self {
            ManagerError::Config(_) => "config",
            ManagerError::Connection(_) => "connection",
            ManagerError::NotFound(_) => "not-found",
            ManagerError::Query { .. } => "query",
            ManagerError::State(_) => "state",
            ManagerError::Export(_) => "export",
            ManagerError::Import(_) => "import",
            ManagerError::Io(_) => "io",
            ManagerError::InvalidCommandSyntax { .. }
            | ManagerError::UnknownCommand(_)
            | ManagerError::Readline(_) => "cli",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_query_error_display_includes_statement() {
        let err = ManagerError::query("CREATE DATABASE x", "database exists");
        let text = err.to_string();
        assert!(text.contains("CREATE DATABASE x"));
        assert!(text.contains("database exists"));
        assert_eq!(err.kind(), "query");
    }
}
