//! Database module
//!
//! This module provides the driver abstraction, the dump/restore process
//! plumbing and the session manager built on top of them.

pub mod connection;
pub mod dump;
pub mod manager;
pub mod row;

// Re-exports
pub use connection::{Connector, DatabaseDriver, DriverError, MySqlConnector};
pub use dump::{DumpTools, Invocation, ProcessLauncher, ProcessOutcome, TokioLauncher};
pub use manager::{DatabaseManager, QueryOutcome};
pub use row::Row;
