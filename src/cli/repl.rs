//! REPL implementation
//!
//! This module implements the interactive Read-Eval-Print Loop for
//! mysql-manager.

use crate::cli::commands::{self, format_error, Command, CommandType, COMMAND_NAMES};
use crate::database::manager::DatabaseManager;
use crate::error::{ManagerError, Result};
use rustyline::completion::Completer;
use rustyline::error::ReadlineError;
use rustyline::highlight::Highlighter;
use rustyline::hint::Hinter;
use rustyline::history::DefaultHistory;
use rustyline::validate::Validator;
use rustyline::Context;
use rustyline::Helper;
use rustyline::{CompletionType, Config, Editor};
use std::path::PathBuf;

/// `/` command completer
struct CommandCompleter;

impl Completer for CommandCompleter {
    type Candidate = String;

    fn complete(
        &self,
        line: &str,
        _pos: usize,
        _ctx: &Context<'_>,
    ) -> std::result::Result<(usize, Vec<String>), ReadlineError> {
        if line.starts_with('/') && !line.contains(' ') {
            let matches: Vec<String> = COMMAND_NAMES
                .iter()
                .filter(|cmd| cmd.starts_with(line))
                .map(|s| s.to_string())
                .collect();
            Ok((0, matches))
        } else {
            Ok((0, vec![]))
        }
    }
}

impl Hinter for CommandCompleter {
    type Hint = String;
}

impl Highlighter for CommandCompleter {}

impl Validator for CommandCompleter {}

impl Helper for CommandCompleter {}

/// mysql-manager REPL
pub struct Repl {
    /// The rustyline editor
    editor: Editor<CommandCompleter, DefaultHistory>,
    /// Whether the REPL should continue running
    running: bool,
    /// The session driven by this REPL
    manager: DatabaseManager,
    history_path: PathBuf,
}

impl Repl {
    /// Create a new REPL instance
    pub fn new(manager: DatabaseManager) -> Result<Self> {
        let config = Config::builder()
            .history_ignore_space(true)
            .completion_type(CompletionType::List)
            .auto_add_history(true)
            .build();

        let mut editor = Editor::<CommandCompleter, DefaultHistory>::with_config(config)
            .map_err(|e| ManagerError::Readline(format!("Failed to initialize editor: {}", e)))?;

        editor.set_helper(Some(CommandCompleter));

        let history_path = history_path();
        if let Err(e) = editor.load_history(&history_path) {
            tracing::debug!(path = %history_path.display(), error = %e, "No history loaded");
        }

        Ok(Self {
            editor,
            running: true,
            manager,
            history_path,
        })
    }

    /// Run the REPL loop
    pub async fn run(&mut self) -> Result<()> {
        self.print_welcome();

        while self.running {
            let prompt = match self.manager.current_database() {
                Some(db) => format!("mysql:{}> ", db),
                None => "mysql> ".to_string(),
            };

            match self.editor.readline(&prompt) {
                Ok(line) => {
                    let line = line.trim();

                    if line.is_empty() {
                        continue;
                    }

                    match Command::parse(line) {
                        Ok(command) => {
                            self.handle_command(command).await;
                        }
                        Err(e) => {
                            println!("{}", format_error(&e));
                        }
                    }
                }
                Err(ReadlineError::Interrupted) => {
                    println!("^C");
                    continue;
                }
                Err(ReadlineError::Eof) => {
                    println!();
                    self.running = false;
                }
                Err(err) => {
                    println!("Error: {:?}", err);
                    self.running = false;
                }
            }
        }

        self.save_history();
        Ok(())
    }

    fn print_welcome(&self) {
        let params = self.manager.params();
        println!();
        println!("mysql-manager v{}", env!("CARGO_PKG_VERSION"));
        println!("Server {}:{}", params.host, params.port);
        println!();
        println!("Type /connect to open the connection, or /help for more information.");
        println!();
    }

    /// Handle a command
    async fn handle_command(&mut self, command: Command) {
        if command.command_type == CommandType::Quit {
            self.running = false;
        }

        match commands::handle_command(&command, &mut self.manager).await {
            Ok(msg) => {
                println!("{}", msg);
            }
            Err(e) => {
                println!("{}", format_error(&e));
            }
        }
    }

    fn save_history(&mut self) {
        if let Some(parent) = self.history_path.parent() {
            if let Err(e) = std::fs::create_dir_all(parent) {
                tracing::debug!(path = %parent.display(), error = %e, "History directory not created");
            }
        }
        if let Err(e) = self.editor.save_history(&self.history_path) {
            tracing::debug!(path = %self.history_path.display(), error = %e, "History not saved");
        }
    }
}

fn history_path() -> PathBuf {
    dirs::home_dir()
        .map(|p| p.join(".mysql-manager").join("history"))
        .unwrap_or_else(|| ".mysql-manager-history".into())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ConnectionParams;

    #[test]
    fn test_repl_creation() {
        let manager = DatabaseManager::new(ConnectionParams::default());
        let repl = Repl::new(manager);
        assert!(repl.is_ok());
        let repl = repl.unwrap();
        assert!(repl.running);
        assert!(!repl.manager.is_connected());
    }

    #[test]
    fn test_save_history_survives_unwritable_directory() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("not-a-dir");
        std::fs::write(&blocker, "file").unwrap();

        let manager = DatabaseManager::new(ConnectionParams::default());
        let mut repl = Repl::new(manager).unwrap();
        repl.history_path = blocker.join("history");
        repl.save_history();

        assert!(blocker.is_file());
        assert!(!repl.history_path.exists());
    }

    #[test]
    fn test_completer_only_completes_command_names() {
        let completer = CommandCompleter;
        let history = DefaultHistory::new();
        let ctx = Context::new(&history);
        let (_, matches) = completer.complete("/co", 3, &ctx).unwrap();
        assert_eq!(matches, vec!["/connect".to_string(), "/copy".to_string()]);

        let (_, matches) = completer.complete("SELECT", 6, &ctx).unwrap();
        assert!(matches.is_empty());
    }
}
