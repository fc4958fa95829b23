//! Dump and restore processes
//!
//! Export and import shell out to the MySQL client tools. Commands are built
//! as argument vectors and never pass through a shell. Credentials are written
//! to a private temporary option file handed over with
//! `--defaults-extra-file`, so they never appear on a command line.

use crate::config::{keys, ConfigProvider, ConnectionParams};
use async_trait::async_trait;
use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use tempfile::NamedTempFile;
use tokio::process::Command;

/// Default dump executable
pub const DEFAULT_DUMP_COMMAND: &str = "mysqldump";

/// Default restore executable
pub const DEFAULT_RESTORE_COMMAND: &str = "mysql";

/// A process to run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    /// Executable name or path
    pub program: String,
    /// Arguments, passed as-is
    pub args: Vec<String>,
    /// File fed to the process as stdin
    pub stdin: Option<PathBuf>,
    /// File receiving the process stdout
    pub stdout: Option<PathBuf>,
}

impl Invocation {
    /// Invocation without redirections
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            stdin: None,
            stdout: None,
        }
    }

    /// Append an argument
    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    /// Read stdin from `path`
    pub fn stdin_from(mut self, path: impl Into<PathBuf>) -> Self {
        self.stdin = Some(path.into());
        self
    }

    /// Write stdout to `path`
    pub fn stdout_to(mut self, path: impl Into<PathBuf>) -> Self {
        self.stdout = Some(path.into());
        self
    }
}

/// How a finished process ended
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProcessOutcome {
    /// Exit code, `None` when terminated by a signal
    pub status: Option<i32>,
    /// Captured stderr
    pub stderr: String,
}

impl ProcessOutcome {
    pub fn success(&self) -> bool {
        self.status == Some(0)
    }

    /// Human-readable exit description
    pub fn describe(&self) -> String {
        let status = match self.status {
            Some(code) => format!("exit code {}", code),
            None => "terminated by signal".to_string(),
        };
        let stderr = self.stderr.trim();
        if stderr.is_empty() {
            status
        } else {
            format!("{}: {}", status, stderr)
        }
    }
}

/// Runs external processes to completion
#[async_trait]
pub trait ProcessLauncher: Send + Sync {
    /// Run the invocation and wait for it to exit.
    ///
    /// An `Err` means the process could not be started or its redirections
    /// could not be opened.
    async fn run(&self, invocation: &Invocation) -> std::io::Result<ProcessOutcome>;
}

/// Launcher backed by `tokio::process`
#[derive(Debug, Default, Clone, Copy)]
pub struct TokioLauncher;

#[async_trait]
impl ProcessLauncher for TokioLauncher {
    async fn run(&self, invocation: &Invocation) -> std::io::Result<ProcessOutcome> {
        let stdin = match &invocation.stdin {
            Some(path) => Stdio::from(File::open(path)?),
            None => Stdio::null(),
        };
        let stdout = match &invocation.stdout {
            Some(path) => Stdio::from(File::create(path)?),
            None => Stdio::null(),
        };

        let child = Command::new(&invocation.program)
            .args(&invocation.args)
            .stdin(stdin)
            .stdout(stdout)
            .stderr(Stdio::piped())
            .spawn()?;

        let output = child.wait_with_output().await?;
        Ok(ProcessOutcome {
            status: output.status.code(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        })
    }
}

/// Private option file holding the client credentials.
///
/// The file is created with owner-only permissions and removed on drop.
pub struct CredentialsFile {
    file: NamedTempFile,
}

impl CredentialsFile {
    /// Write a `[client]` section for `user` / `password` into `dir`
    pub fn create_in(dir: &Path, user: &str, password: &str) -> std::io::Result<Self> {
        let mut file = tempfile::Builder::new()
            .prefix("mysql-manager-client")
            .suffix(".cnf")
            .tempfile_in(dir)?;
        file.write_all(option_file_contents(user, password).as_bytes())?;
        file.flush()?;
        Ok(Self { file })
    }

    pub fn path(&self) -> &Path {
        self.file.path()
    }

    /// `--defaults-extra-file=<path>` argument
    pub fn argument(&self) -> String {
        format!("--defaults-extra-file={}", self.path().display())
    }
}

/// Contents of a MySQL option file carrying the credentials
pub fn option_file_contents(user: &str, password: &str) -> String {
    format!(
        "[client]\nuser=\"{}\"\npassword=\"{}\"\n",
        escape_option_value(user),
        escape_option_value(password)
    )
}

fn escape_option_value(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '"' => out.push_str("\\\""),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            c => out.push(c),
        }
    }
    out
}

/// Names of the dump and restore executables
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DumpTools {
    /// Dump utility, `mysqldump` by default
    pub dump_program: String,
    /// Restore utility, `mysql` by default
    pub restore_program: String,
}

impl Default for DumpTools {
    fn default() -> Self {
        Self {
            dump_program: DEFAULT_DUMP_COMMAND.to_string(),
            restore_program: DEFAULT_RESTORE_COMMAND.to_string(),
        }
    }
}

impl DumpTools {
    /// Read `dump_command` / `restore_command` overrides
    pub fn from_config(config: &dyn ConfigProvider) -> Self {
        let defaults = Self::default();
        Self {
            dump_program: config
                .value(keys::DUMP_COMMAND)
                .filter(|v| !v.trim().is_empty())
                .unwrap_or(defaults.dump_program),
            restore_program: config
                .value(keys::RESTORE_COMMAND)
                .filter(|v| !v.trim().is_empty())
                .unwrap_or(defaults.restore_program),
        }
    }

    /// Dump `database` into `target`
    pub fn dump(
        &self,
        params: &ConnectionParams,
        credentials: &CredentialsFile,
        database: &str,
        target: &Path,
    ) -> Invocation {
        // the option file argument must come first
        Invocation::new(&self.dump_program)
            .arg(credentials.argument())
            .arg(format!("--host={}", params.host))
            .arg(format!("--port={}", params.port))
            .arg(database)
            .stdout_to(target)
    }

    /// Restore `source` into `database`
    pub fn restore(
        &self,
        params: &ConnectionParams,
        credentials: &CredentialsFile,
        database: &str,
        source: &Path,
    ) -> Invocation {
        Invocation::new(&self.restore_program)
            .arg(credentials.argument())
            .arg(format!("--host={}", params.host))
            .arg(format!("--port={}", params.port))
            .arg(format!("--database={}", database))
            .stdin_from(source)
    }
}
