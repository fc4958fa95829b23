//! mysql-manager Library
//!
//! This is the library interface for mysql-manager.
//! The main binary is in src/main.rs.

pub mod cli;
pub mod config;
pub mod database;
pub mod error;
pub mod logging;
