//! Core types for addressing an Oracle instance and running its tools.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

/// Default listener port.
pub const DEFAULT_PORT: u16 = 1521;

/// Administrative privilege used when connecting.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConnectionType {
    /// AS SYSDBA
    #[default]
    Sysdba,
    /// AS SYSOPER
    Sysoper,
    /// AS SYSBACKUP
    Sysbackup,
    /// AS SYSDG
    Sysdg,
    /// AS SYSKM
    Syskm,
    /// Plain session, no administrative privilege
    Normal,
}

impl ConnectionType {
    /// Parse from a string (case-insensitive).
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "sysdba" => Some(Self::Sysdba),
            "sysoper" => Some(Self::Sysoper),
            "sysbackup" => Some(Self::Sysbackup),
            "sysdg" => Some(Self::Sysdg),
            "syskm" => Some(Self::Syskm),
            "normal" => Some(Self::Normal),
            _ => None,
        }
    }

    /// Suffix appended to a connect string, e.g. `" AS SYSDBA"`.
    pub fn clause(&self) -> &'static str {
        match self {
            Self::Sysdba => " AS SYSDBA",
            Self::Sysoper => " AS SYSOPER",
            Self::Sysbackup => " AS SYSBACKUP",
            Self::Sysdg => " AS SYSDG",
            Self::Syskm => " AS SYSKM",
            Self::Normal => "",
        }
    }
}

impl fmt::Display for ConnectionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Sysdba => "sysdba",
            Self::Sysoper => "sysoper",
            Self::Sysbackup => "sysbackup",
            Self::Sysdg => "sysdg",
            Self::Syskm => "syskm",
            Self::Normal => "normal",
        };
        write!(f, "{}", s)
    }
}

/// Where and as whom to connect.
///
/// Without credentials the connection is a local bequeath connection
/// (`/ AS SYSDBA`) selected by `ORACLE_SID`. With credentials and a service
/// name it is an EZConnect descriptor `//host:port/service`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectTarget {
    /// Instance SID, used for bequeath connections and pmon probes
    pub sid: Option<String>,
    /// Listener service name
    pub service_name: Option<String>,
    /// Listener host (defaults to localhost when a service is given)
    pub host: Option<String>,
    /// Listener port
    pub port: u16,
    /// Database account
    pub user: Option<String>,
    /// Database password
    #[serde(skip_serializing)]
    pub password: Option<String>,
    /// Administrative privilege
    pub connection_type: ConnectionType,
}

impl Default for ConnectTarget {
    fn default() -> Self {
        Self {
            sid: None,
            service_name: None,
            host: None,
            port: DEFAULT_PORT,
            user: None,
            password: None,
            connection_type: ConnectionType::default(),
        }
    }
}

impl ConnectTarget {
    /// Local bequeath connection to `sid`.
    pub fn local(sid: impl Into<String>) -> Self {
        Self {
            sid: Some(sid.into()),
            ..Default::default()
        }
    }

    /// Check the target can be rendered safely.
    pub fn validate(&self) -> Result<()> {
        match (&self.user, &self.password) {
            (Some(_), None) => return Err(Error::validation("password is required with user")),
            (None, Some(_)) => return Err(Error::validation("user is required with password")),
            _ => {}
        }
        if let Some(user) = &self.user {
            crate::quote::identifier(user, "user")?;
        }
        if let Some(password) = &self.password {
            crate::quote::password(password)?;
        }
        if let Some(sid) = &self.sid {
            crate::quote::identifier(sid, "sid")?;
        }
        if let Some(service) = &self.service_name {
            check_net_name(service, "service_name")?;
        }
        if let Some(host) = &self.host {
            check_net_name(host, "host")?;
        }
        if self.port == 0 {
            return Err(Error::validation("port must be between 1 and 65535"));
        }
        Ok(())
    }

    /// Whether a password-authenticated connection will be used.
    pub fn has_credentials(&self) -> bool {
        self.user.is_some() && self.password.is_some()
    }

    /// EZConnect descriptor, when addressing through the listener.
    pub fn descriptor(&self) -> Option<String> {
        if !self.has_credentials() {
            return None;
        }
        self.service_name.as_ref().map(|service| {
            let host = self.host.as_deref().unwrap_or("localhost");
            format!("//{}:{}/{}", host, self.port, service)
        })
    }

    /// Argument of the SQL*Plus `CONNECT` command.
    pub fn sqlplus_connect(&self) -> String {
        let privilege = self.connection_type.clause();
        match (&self.user, &self.password) {
            (Some(user), Some(password)) => {
                let at = self
                    .descriptor()
                    .map(|d| format!("@{}", d))
                    .unwrap_or_default();
                format!("{}/\"{}\"{}{}", user, password, at, privilege)
            }
            _ => format!("/{}", privilege),
        }
    }

    /// RMAN `CONNECT TARGET` command.
    pub fn rman_connect(&self) -> String {
        match (&self.user, &self.password) {
            (Some(user), Some(password)) => {
                let at = self
                    .descriptor()
                    .map(|d| format!("@{}", d))
                    .unwrap_or_default();
                let privilege = match self.connection_type {
                    ConnectionType::Sysbackup => " AS SYSBACKUP",
                    _ => "",
                };
                format!("CONNECT TARGET \"{}/{}{}{}\";", user, password, at, privilege)
            }
            _ => "CONNECT TARGET /;".to_string(),
        }
    }

    /// Values that must be masked in logs.
    pub fn secrets(&self) -> Vec<String> {
        self.password.iter().cloned().collect()
    }

    /// Short name for messages.
    pub fn display_name(&self) -> String {
        match (&self.service_name, &self.sid) {
            (Some(service), _) if self.has_credentials() => service.clone(),
            (_, Some(sid)) => sid.clone(),
            _ => "the default instance".to_string(),
        }
    }
}

fn check_net_name(value: &str, what: &str) -> Result<()> {
    let ok = !value.is_empty()
        && value
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_'));
    if ok {
        Ok(())
    } else {
        Err(Error::validation(format!(
            "{} '{}' may only contain letters, digits, '.', '-' and '_'",
            what, value
        )))
    }
}

/// Environment for the child process.
///
/// Built explicitly and handed to the backend; the parent's environment is
/// never modified.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OracleEnv {
    /// ORACLE_SID
    pub oracle_sid: Option<String>,
    /// ORACLE_HOME
    pub oracle_home: Option<PathBuf>,
    /// ORACLE_BASE
    pub oracle_base: Option<PathBuf>,
}

impl OracleEnv {
    /// Variables to set on the child, in a stable order.
    pub fn vars(&self) -> Vec<(&'static str, String)> {
        let mut vars = Vec::new();
        if let Some(sid) = &self.oracle_sid {
            vars.push(("ORACLE_SID", sid.clone()));
        }
        if let Some(home) = &self.oracle_home {
            vars.push(("ORACLE_HOME", home.display().to_string()));
        }
        if let Some(base) = &self.oracle_base {
            vars.push(("ORACLE_BASE", base.display().to_string()));
        }
        vars
    }

    /// Path of a tool, inside ORACLE_HOME when one is set.
    pub fn tool_path(&self, tool: Tool) -> PathBuf {
        match &self.oracle_home {
            Some(home) => home.join("bin").join(tool.program()),
            None => PathBuf::from(tool.program()),
        }
    }
}

/// Oracle command-line tool.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Tool {
    /// SQL*Plus
    Sqlplus,
    /// Recovery Manager
    Rman,
}

impl Tool {
    /// Executable name.
    pub fn program(&self) -> &'static str {
        match self {
            Self::Sqlplus => "sqlplus",
            Self::Rman => "rman",
        }
    }

    /// Fixed arguments; the script always arrives on stdin.
    pub fn args(&self) -> &'static [&'static str] {
        match self {
            Self::Sqlplus => &["-s", "-L", "/nolog"],
            Self::Rman => &[],
        }
    }
}

impl fmt::Display for Tool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.program())
    }
}

/// Captured result of one tool invocation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandOutput {
    /// Standard output
    pub stdout: String,
    /// Standard error
    pub stderr: String,
    /// Exit code, `None` when killed by a signal
    pub code: Option<i32>,
}

impl CommandOutput {
    /// Successful output with the given stdout.
    pub fn ok(stdout: impl Into<String>) -> Self {
        Self {
            stdout: stdout.into(),
            stderr: String::new(),
            code: Some(0),
        }
    }

    /// Failed output with the given stdout and exit code.
    pub fn failed(stdout: impl Into<String>, code: i32) -> Self {
        Self {
            stdout: stdout.into(),
            stderr: String::new(),
            code: Some(code),
        }
    }

    /// Whether the process exited with status 0.
    pub fn success(&self) -> bool {
        self.code == Some(0)
    }

    /// stdout followed by stderr.
    pub fn combined(&self) -> String {
        if self.stderr.is_empty() {
            self.stdout.clone()
        } else if self.stdout.is_empty() {
            self.stderr.clone()
        } else {
            format!("{}\n{}", self.stdout, self.stderr)
        }
    }
}

/// Configuration for retry behavior.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Maximum number of attempts
    pub max_attempts: u32,
    /// Base delay between retries
    pub base_delay: Duration,
    /// Multiplier for exponential backoff
    pub backoff_factor: f64,
    /// Maximum delay between retries
    pub max_delay: Duration,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_secs(10),
            backoff_factor: 1.0,
            max_delay: Duration::from_secs(300),
        }
    }
}

impl RetryConfig {
    /// Create a new retry config with custom settings.
    pub fn new(max_attempts: u32, base_delay: Duration, backoff_factor: f64) -> Self {
        Self {
            max_attempts,
            base_delay,
            backoff_factor,
            max_delay: Duration::from_secs(300),
        }
    }

    /// Calculate the delay for a given attempt number (0-indexed).
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let delay = self.base_delay.as_secs_f64() * self.backoff_factor.powi(attempt as i32);
        let capped = delay.min(self.max_delay.as_secs_f64());
        Duration::from_secs_f64(capped)
    }

    /// Create a config that never retries.
    pub fn no_retry() -> Self {
        Self {
            max_attempts: 1,
            ..Default::default()
        }
    }
}
