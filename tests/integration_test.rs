//! Integration test for mysql-manager
//!
//! Tests command parsing, configuration layering and command handling on a
//! session that has not been connected.

use mysql_manager::cli::commands::{handle_command, Command, CommandType};
use mysql_manager::config::storage::Config;
use mysql_manager::config::{ConfigProvider, ConnectionParams, LayeredConfig};
use mysql_manager::database::manager::DatabaseManager;
use mysql_manager::error::ManagerError;
use std::collections::HashMap;

#[tokio::test]
async fn test_command_parsing() {
    let cmd = Command::parse("/connect").unwrap();
    assert_eq!(cmd.command_type, CommandType::Connect);

    let cmd = Command::parse("/databases").unwrap();
    assert_eq!(cmd.command_type, CommandType::Databases);

    let cmd = Command::parse("/copy shop shop_copy").unwrap();
    assert!(matches!(cmd.command_type, CommandType::Copy { .. }));

    let cmd = Command::parse("SHOW TABLES").unwrap();
    assert!(matches!(cmd.command_type, CommandType::Query { .. }));
}

#[tokio::test]
async fn test_layered_configuration() {
    let file = Config::parse(
        r#"
        [mysql]
        host = "db.internal"
        port = 3307
        user = "admin"
        password = "from-file"
        "#,
    )
    .unwrap();

    let mut overrides = HashMap::new();
    overrides.insert("password".to_string(), "from-override".to_string());
    overrides.insert("dbname".to_string(), "shop".to_string());

    let layered = LayeredConfig::new().with(overrides).with(file);
    assert_eq!(layered.value("password").as_deref(), Some("from-override"));

    let manager = DatabaseManager::from_config(&layered).unwrap();
    let params = manager.params();
    assert_eq!(params.host, "db.internal");
    assert_eq!(params.port, 3307);
    assert_eq!(params.credentials(), Some(("admin", "from-override")));
    assert_eq!(manager.current_database(), Some("shop"));
    assert!(!manager.is_connected());
}

#[tokio::test]
async fn test_connect_without_credentials_fails_fast() {
    let mut manager = DatabaseManager::new(ConnectionParams::default());
    let cmd = Command::parse("/connect").unwrap();
    let err = handle_command(&cmd, &mut manager).await.unwrap_err();
    assert!(matches!(err, ManagerError::Config(_)));
}

#[tokio::test]
async fn test_commands_on_disconnected_session() {
    let mut manager = DatabaseManager::new(ConnectionParams::new("admin", "secret"));

    for input in ["/databases", "/use shop", "/export", "/copy a b", "SELECT 1"] {
        let cmd = Command::parse(input).unwrap();
        let err = handle_command(&cmd, &mut manager).await.unwrap_err();
        assert!(matches!(err, ManagerError::State(_)), "{input}: {err}");
    }

    let status = handle_command(&Command::parse("/status").unwrap(), &mut manager)
        .await
        .unwrap();
    assert!(status.contains("localhost:3306"));
    assert!(status.contains("(none)"));
}
