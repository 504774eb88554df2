//! # orakit
//!
//! Pure Rust library for driving Oracle's command-line tools.
//!
//! This crate provides functionality for:
//! - Addressing an instance (bequeath or EZConnect) without putting
//!   passwords in argv
//! - Building SQL*Plus and RMAN scripts from validated, quoted values
//! - Classifying tool output into connection and execution failures
//! - Retrying transient failures
//! - Discovering running instances from their pmon processes
//!
//! ## Example
//!
//! ```no_run
//! use orakit::backend::cli::{CliBackend, Launcher};
//! use orakit::{Client, ConnectTarget, OracleEnv, SqlScript};
//! use std::sync::Arc;
//!
//! let backend = Arc::new(CliBackend::new(Launcher::become_user("oracle")));
//! let env = OracleEnv {
//!     oracle_sid: Some("ORCL".into()),
//!     ..Default::default()
//! };
//! let client = Client::new(backend, ConnectTarget::local("ORCL"), env);
//!
//! let users = client.query("SELECT username FROM dba_users").unwrap();
//! client
//!     .execute(&SqlScript::new().sql("ALTER USER APP ACCOUNT UNLOCK"))
//!     .unwrap();
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod backend;
pub mod error;
pub mod instances;
pub mod output;
pub mod quote;
pub mod retry;
pub mod script;
pub mod types;

pub use error::{Error, ErrorCategory, Result};
pub use script::{RmanScript, SqlScript, Statement};
pub use types::{
    CommandOutput, ConnectTarget, ConnectionType, DEFAULT_PORT, OracleEnv, RetryConfig, Tool,
};

use backend::Backend;
use std::sync::Arc;

/// High-level client for one Oracle target.
///
/// The client renders scripts for its target, hands them to the backend
/// and classifies the output.
#[derive(Clone)]
pub struct Client {
    backend: Arc<dyn Backend>,
    target: ConnectTarget,
    env: OracleEnv,
}

impl std::fmt::Debug for Client {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Client")
            .field("target", &self.target.display_name())
            .field("env", &self.env)
            .finish_non_exhaustive()
    }
}

impl Client {
    /// Create a client for `target`.
    pub fn new(backend: Arc<dyn Backend>, target: ConnectTarget, env: OracleEnv) -> Self {
        Self {
            backend,
            target,
            env,
        }
    }

    /// The connection target.
    pub fn target(&self) -> &ConnectTarget {
        &self.target
    }

    /// The child process environment.
    pub fn env(&self) -> &OracleEnv {
        &self.env
    }

    // =========================================================================
    // SQL*Plus
    // =========================================================================

    /// Run a single query and return its rows.
    pub fn query(&self, sql: &str) -> Result<Vec<String>> {
        let stdout = self.execute(&SqlScript::query(sql))?;
        Ok(output::rows(&stdout))
    }

    /// Run a query whose select list is joined with
    /// [`output::FIELD_SEPARATOR`] and split each row into `columns` fields.
    pub fn query_fields(&self, sql: &str, columns: usize) -> Result<Vec<Vec<String>>> {
        Ok(self
            .query(sql)?
            .iter()
            .map(|row| output::fields(row, columns))
            .collect())
    }

    /// Whether a query returns at least one row.
    pub fn exists(&self, sql: &str) -> Result<bool> {
        Ok(!self.query(sql)?.is_empty())
    }

    /// Run a script and return its stdout.
    pub fn execute(&self, script: &SqlScript) -> Result<String> {
        self.execute_tolerating(script, &[]).map(|(stdout, _)| stdout)
    }

    /// Run a script, tolerating the given error codes.
    ///
    /// Returns stdout and the tolerated codes that were reported.
    pub fn execute_tolerating(
        &self,
        script: &SqlScript,
        tolerated: &[&str],
    ) -> Result<(String, Vec<String>)> {
        let text = script.render(&self.target);
        self.run(Tool::Sqlplus, &text, tolerated)
    }

    // =========================================================================
    // RMAN
    // =========================================================================

    /// Run an RMAN script and return its output.
    pub fn rman(&self, script: &RmanScript) -> Result<String> {
        let text = script.render(&self.target);
        self.run(Tool::Rman, &text, &[]).map(|(stdout, _)| stdout)
    }

    /// Run an RMAN script, retrying connection and execution failures.
    pub fn rman_with_retry(&self, script: &RmanScript, config: &RetryConfig) -> Result<String> {
        retry::with_retry(config, Some(&retry::LogCallback), || self.rman(script))
    }

    // =========================================================================
    // Instances
    // =========================================================================

    /// SIDs of the running instances on this host.
    pub fn running_instances(&self) -> Result<Vec<String>> {
        self.backend.running_instances()
    }

    /// Whether the instance `sid` has a running pmon process.
    pub fn is_running(&self, sid: &str) -> Result<bool> {
        Ok(self
            .running_instances()?
            .iter()
            .any(|s| s.eq_ignore_ascii_case(sid)))
    }

    fn run(&self, tool: Tool, script: &str, tolerated: &[&str]) -> Result<(String, Vec<String>)> {
        if log::log_enabled!(log::Level::Debug) {
            log::debug!("{} script:\n{}", tool, self.redact(script));
        }
        let out = self.backend.run(tool, script, &self.env)?;
        match output::classify(tool, &out, tolerated) {
            Ok(seen) => Ok((out.stdout, seen)),
            Err(e) => Err(self.redact_error(e)),
        }
    }

    /// Mask the target's password in `text`.
    pub fn redact(&self, text: &str) -> String {
        self.target
            .secrets()
            .iter()
            .filter(|s| !s.is_empty())
            .fold(text.to_string(), |acc, s| acc.replace(s.as_str(), "********"))
    }

    fn redact_error(&self, error: Error) -> Error {
        match error {
            Error::Connection { message, output } => Error::Connection {
                message: self.redact(&message),
                output: self.redact(&output),
            },
            Error::Execution { message, output } => Error::Execution {
                message: self.redact(&message),
                output: self.redact(&output),
            },
            other => other,
        }
    }
}
