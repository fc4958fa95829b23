//! Command handlers for CLI
//!
//! This module implements all `/` commands of the mysql-manager REPL. Input
//! without a leading `/` is sent to the server as SQL.

use crate::database::manager::{DatabaseManager, QueryOutcome};
use crate::database::row::{display_value, Row};
use crate::error::{ManagerError, Result};
use comfy_table::presets::UTF8_FULL;
use comfy_table::{ContentArrangement, Table};
use std::path::{Path, PathBuf};

/// Command types
#[derive(Debug, Clone, PartialEq)]
pub enum CommandType {
    /// Open the connection
    Connect,
    /// List non-system databases
    Databases,
    /// Select the current database
    Use { name: String },
    /// Create a database
    Create { name: String },
    /// Dump the current database
    Export { path: Option<PathBuf> },
    /// Restore a dump into the current database
    Import { path: PathBuf },
    /// Copy one database into another
    Copy { from: String, to: String },
    /// Grant all privileges on the current database
    Grant { user: String, host: Option<String> },
    /// Show session status
    Status,
    /// Show help message
    Help,
    /// Exit the application
    Quit,
    /// Raw SQL
    Query { text: String },
}

/// Parsed command
#[derive(Debug, Clone)]
pub struct Command {
    /// The type of command
    pub command_type: CommandType,
}

impl Command {
    /// Parse a command from user input
    pub fn parse(input: &str) -> Result<Self> {
        let input = input.trim();

        if !input.starts_with('/') {
            return Ok(Command {
                command_type: CommandType::Query {
                    text: input.to_string(),
                },
            });
        }

        let parts: Vec<&str> = input.split_whitespace().collect();
        let cmd = parts[0];
        let args = &parts[1..];

        let command_type = match cmd {
            "/connect" => CommandType::Connect,
            "/databases" | "/dbs" => CommandType::Databases,
            "/use" => CommandType::Use {
                name: single_arg(cmd, args, "/use <database>")?,
            },
            "/create" => CommandType::Create {
                name: single_arg(cmd, args, "/create <database>")?,
            },
            "/export" => match args {
                [] => CommandType::Export { path: None },
                [path] => CommandType::Export {
                    path: Some(PathBuf::from(path)),
                },
                _ => return Err(syntax(cmd, "/export [path]")),
            },
            "/import" => CommandType::Import {
                path: PathBuf::from(single_arg(cmd, args, "/import <path>")?),
            },
            "/copy" => match args {
                [from, to] => CommandType::Copy {
                    from: from.to_string(),
                    to: to.to_string(),
                },
                _ => return Err(syntax(cmd, "/copy <from> <to>")),
            },
            "/grant" => match args {
                [user] => CommandType::Grant {
                    user: user.to_string(),
                    host: None,
                },
                [user, host] => CommandType::Grant {
                    user: user.to_string(),
                    host: Some(host.to_string()),
                },
                _ => return Err(syntax(cmd, "/grant <user> [host]")),
            },
            "/status" => CommandType::Status,
            "/help" => CommandType::Help,
            "/quit" | "/exit" => CommandType::Quit,
            _ => return Err(ManagerError::UnknownCommand(cmd.to_string())),
        };

        Ok(Command { command_type })
    }
}

fn single_arg(cmd: &str, args: &[&str], expected: &str) -> Result<String> {
    match args {
        [value] => Ok(value.to_string()),
        _ => Err(syntax(cmd, expected)),
    }
}

fn syntax(cmd: &str, expected: &str) -> ManagerError {
    ManagerError::InvalidCommandSyntax {
        command: cmd.to_string(),
        expected: expected.to_string(),
    }
}

/// Names offered by the REPL completer
pub const COMMAND_NAMES: &[&str] = &[
    "/connect",
    "/databases",
    "/use",
    "/create",
    "/export",
    "/import",
    "/copy",
    "/grant",
    "/status",
    "/help",
    "/quit",
    "/exit",
];

const HELP: &str = r#"
mysql-manager Commands

Session:
  /connect                 Connect using the configured host, port and credentials
  /status                  Show connection and current database
  /use <database>          Select the current database

Databases:
  /databases               List databases (system catalogs hidden)
  /create <database>       Create a database
  /export [path]           Dump the current database (temp file if no path)
  /import <path>           Restore a dump into the current database
  /copy <from> <to>        Copy a database, creating the target if needed
  /grant <user> [host]     Grant all privileges on the current database

Other:
  /help                    Show this help message
  /quit, /exit             Exit

Anything not starting with / is sent to the server as SQL.
"#;

/// Handle a command and return the result message
pub async fn handle_command(command: &Command, manager: &mut DatabaseManager) -> Result<String> {
    match &command.command_type {
        CommandType::Connect => {
            manager.connect().await?;
            let params = manager.params();
            Ok(format!("✓ Connected to {}:{}", params.host, params.port))
        }
        CommandType::Databases => {
            let names = manager.list_databases().await?;
            if names.is_empty() {
                return Ok("No databases".to_string());
            }
            Ok(names.join("\n"))
        }
        CommandType::Use { name } => {
            manager.select_database(name).await?;
            Ok(format!("✓ Using database {}", name))
        }
        CommandType::Create { name } => {
            manager.create_database(name).await?;
            Ok(format!("✓ Created database {}", name))
        }
        CommandType::Export { path } => {
            let target = path.as_deref().map(expand_home);
            let written = manager.export_database(target.as_deref()).await?;
            Ok(format!("✓ Exported to {}", written.display()))
        }
        CommandType::Import { path } => {
            let source = expand_home(path);
            manager.import_database(&source).await?;
            Ok(format!("✓ Imported {}", source.display()))
        }
        CommandType::Copy { from, to } => {
            manager.copy_database(from, to).await?;
            Ok(format!("✓ Copied {} to {}", from, to))
        }
        CommandType::Grant { user, host } => {
            manager.grant_all_privileges(user, host.as_deref()).await?;
            Ok(format!("✓ Granted all privileges to {}", user))
        }
        CommandType::Status => Ok(status(manager)),
        CommandType::Help => Ok(HELP.to_string()),
        CommandType::Quit => Ok("Goodbye!".to_string()),
        CommandType::Query { text } => match manager.run_query(text, true).await? {
            QueryOutcome::Rows(rows) if !rows.is_empty() => Ok(format_rows(&rows)),
            QueryOutcome::Rows(_) => Ok("Query OK, no rows returned".to_string()),
            QueryOutcome::Completed { rows_affected } => {
                Ok(format!("Query OK, {} rows affected", rows_affected))
            }
        },
    }
}

fn status(manager: &DatabaseManager) -> String {
    let params = manager.params();
    format!(
        "Server:    {}:{}\nConnected: {}\nDatabase:  {}",
        params.host,
        params.port,
        if manager.is_connected() { "yes" } else { "no" },
        manager.current_database().unwrap_or("(none)")
    )
}

/// Render rows as a table using the first row's columns as header
pub fn format_rows(rows: &[Row]) -> String {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic);

    if let Some(first) = rows.first() {
        table.set_header(first.columns().iter().cloned().collect::<Vec<_>>());
    }
    for row in rows {
        table.add_row(row.values().iter().map(display_value).collect::<Vec<_>>());
    }

    let count = rows.len();
    format!(
        "{}\n{} row{}",
        table,
        count,
        if count == 1 { "" } else { "s" }
    )
}

/// Format an error for display
pub fn format_error(error: &ManagerError) -> String {
    format!("Error [{}]: {}", error.kind(), error)
}

/// Expand a leading `~/` in a user-supplied path
pub fn expand_home(path: &Path) -> PathBuf {
    match (path.strip_prefix("~"), dirs::home_dir()) {
        (Ok(rest), Some(home)) => home.join(rest),
        _ => path.to_path_buf(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_connect_command() {
        let cmd = Command::parse("/connect").unwrap();
        assert_eq!(cmd.command_type, CommandType::Connect);
    }

    #[test]
    fn test_parse_use_command() {
        let cmd = Command::parse("/use shop").unwrap();
        assert_eq!(
            cmd.command_type,
            CommandType::Use {
                name: "shop".to_string()
            }
        );
    }

    #[test]
    fn test_parse_export_optional_path() {
        assert_eq!(
            Command::parse("/export").unwrap().command_type,
            CommandType::Export { path: None }
        );
        assert_eq!(
            Command::parse("/export /tmp/shop.sql").unwrap().command_type,
            CommandType::Export {
                path: Some(PathBuf::from("/tmp/shop.sql"))
            }
        );
    }

    #[test]
    fn test_parse_copy_command() {
        let cmd = Command::parse("/copy shop shop_staging").unwrap();
        assert_eq!(
            cmd.command_type,
            CommandType::Copy {
                from: "shop".to_string(),
                to: "shop_staging".to_string()
            }
        );
    }

    #[test]
    fn test_parse_grant_command() {
        let cmd = Command::parse("/grant 'app' '%'").unwrap();
        assert_eq!(
            cmd.command_type,
            CommandType::Grant {
                user: "'app'".to_string(),
                host: Some("'%'".to_string())
            }
        );
        let cmd = Command::parse("/grant app").unwrap();
        assert_eq!(
            cmd.command_type,
            CommandType::Grant {
                user: "app".to_string(),
                host: None
            }
        );
    }

    #[test]
    fn test_parse_quit_command() {
        let cmd1 = Command::parse("/quit").unwrap();
        assert_eq!(cmd1.command_type, CommandType::Quit);

        let cmd2 = Command::parse("/exit").unwrap();
        assert_eq!(cmd2.command_type, CommandType::Quit);
    }

    #[test]
    fn test_parse_query() {
        let cmd = Command::parse("SELECT * FROM users").unwrap();
        assert_eq!(
            cmd.command_type,
            CommandType::Query {
                text: "SELECT * FROM users".to_string()
            }
        );
    }

    #[test]
    fn test_parse_invalid_command() {
        let result = Command::parse("/index");
        assert!(matches!(result, Err(ManagerError::UnknownCommand(_))));
    }

    #[test]
    fn test_parse_missing_args() {
        assert!(Command::parse("/use").is_err());
        assert!(Command::parse("/copy shop").is_err());
        assert!(Command::parse("/import").is_err());
        assert!(Command::parse("/grant a b c").is_err());
    }

    #[test]
    fn test_format_rows() {
        let rows = vec![
            Row::new().with("id", 1).with("name", "alice"),
            Row::new().with("id", 2).with("name", serde_json::Value::Null),
        ];
        let out = format_rows(&rows);
        assert!(out.contains("name"));
        assert!(out.contains("alice"));
        assert!(out.contains("NULL"));
        assert!(out.ends_with("2 rows"));
    }

    #[test]
    fn test_expand_home_leaves_absolute_paths() {
        assert_eq!(expand_home(Path::new("/tmp/x.sql")), PathBuf::from("/tmp/x.sql"));
    }
}
