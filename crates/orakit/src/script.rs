//! Builders for the scripts piped to sqlplus and rman.

use crate::types::ConnectTarget;

/// One unit of a SQL*Plus script.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Statement {
    /// SQL statement, terminated with `;`
    Sql(String),
    /// PL/SQL block, terminated with a `/` line
    Plsql(String),
    /// SQL*Plus command such as `STARTUP`, no terminator
    Command(String),
}

impl Statement {
    /// Text as it appears in the script.
    pub fn render(&self) -> String {
        match self {
            Self::Sql(s) => format!("{};", s),
            Self::Plsql(s) => format!("{}\n/", s),
            Self::Command(s) => s.clone(),
        }
    }
}

const SQLPLUS_SETTINGS: &[&str] = &[
    "SET DEFINE OFF",
    "SET HEADING OFF",
    "SET FEEDBACK OFF",
    "SET PAGESIZE 0",
    "SET LINESIZE 32767",
    "SET LONG 32767",
    "SET TRIMOUT ON",
    "SET TRIMSPOOL ON",
    "SET VERIFY OFF",
    "SET ECHO OFF",
    "SET TAB OFF",
    "SET SQLBLANKLINES ON",
    "WHENEVER OSERROR EXIT FAILURE",
];

/// A SQL*Plus script.
///
/// Rendering prepends output settings and the `CONNECT` command, so the
/// password travels on stdin and never in argv.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SqlScript {
    statements: Vec<Statement>,
    exit_on_error: bool,
}

impl Default for SqlScript {
    fn default() -> Self {
        Self::new()
    }
}

impl SqlScript {
    /// Empty script that exits on the first SQL error.
    pub fn new() -> Self {
        Self {
            statements: Vec::new(),
            exit_on_error: true,
        }
    }

    /// Script with a single query.
    pub fn query(sql: impl Into<String>) -> Self {
        Self::new().sql(sql)
    }

    /// Append a SQL statement (trailing `;` is optional).
    pub fn sql(mut self, sql: impl Into<String>) -> Self {
        self.push(Statement::Sql(trim_terminator(sql.into())));
        self
    }

    /// Append a PL/SQL block.
    pub fn plsql(mut self, block: impl Into<String>) -> Self {
        self.push(Statement::Plsql(block.into()));
        self
    }

    /// Append a SQL*Plus command.
    pub fn command(mut self, command: impl Into<String>) -> Self {
        self.push(Statement::Command(command.into()));
        self
    }

    /// Append a statement.
    pub fn push(&mut self, statement: Statement) {
        self.statements.push(statement);
    }

    /// Keep going after SQL errors; failures are still classified from the
    /// output markers.
    pub fn continue_on_error(mut self) -> Self {
        self.exit_on_error = false;
        self
    }

    /// Statements in order.
    pub fn statements(&self) -> &[Statement] {
        &self.statements
    }

    /// Whether the script contains no statement.
    pub fn is_empty(&self) -> bool {
        self.statements.is_empty()
    }

    /// Full script text for `target`.
    pub fn render(&self, target: &ConnectTarget) -> String {
        let mut lines: Vec<String> = SQLPLUS_SETTINGS.iter().map(|s| (*s).to_string()).collect();
        if self.exit_on_error {
            lines.push("WHENEVER SQLERROR EXIT SQL.SQLCODE".to_string());
        }
        lines.push(format!("CONNECT {}", target.sqlplus_connect()));
        lines.extend(self.statements.iter().map(Statement::render));
        lines.push("EXIT".to_string());
        lines.join("\n") + "\n"
    }
}

fn trim_terminator(sql: String) -> String {
    let trimmed = sql.trim_end();
    trimmed.strip_suffix(';').unwrap_or(trimmed).to_string()
}

/// An RMAN script.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RmanScript {
    commands: Vec<String>,
}

impl RmanScript {
    /// Empty script.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a command (trailing `;` is optional).
    pub fn command(mut self, command: impl Into<String>) -> Self {
        self.commands.push(trim_terminator(command.into()));
        self
    }

    /// Commands in order, without terminators.
    pub fn commands(&self) -> &[String] {
        &self.commands
    }

    /// Full script text for `target`.
    pub fn render(&self, target: &ConnectTarget) -> String {
        let mut lines = vec![target.rman_connect()];
        lines.extend(self.commands.iter().map(|c| format!("{};", c)));
        lines.push("EXIT;".to_string());
        lines.join("\n") + "\n"
    }
}
