//! Settings loaded from `config.toml`
//!
//! Every section is optional; a missing file yields the defaults. Modules
//! receive the settings explicitly and never read the process environment
//! for connection defaults.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::r#become::BecomeConfig;
use crate::paths;

/// Top-level settings
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub connection: ConnectionDefaults,
    pub oracle: OracleConfig,
    #[serde(rename = "become")]
    pub elevation: BecomeConfig,
    pub restore: RestoreConfig,
}

/// Connection coordinates used when a request leaves them out
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConnectionDefaults {
    pub sid: Option<String>,
    pub service_name: Option<String>,
    pub host: Option<String>,
    pub port: Option<u16>,
    pub connection_type: Option<String>,
}

/// Oracle software location
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OracleConfig {
    pub home: Option<String>,
    pub base: Option<String>,
}

impl OracleConfig {
    /// Expanded `ORACLE_HOME`
    pub fn home_path(&self) -> Option<PathBuf> {
        self.home.as_deref().map(paths::expand)
    }

    /// Expanded `ORACLE_BASE`
    pub fn base_path(&self) -> Option<PathBuf> {
        self.base.as_deref().map(paths::expand)
    }
}

/// Retry policy for RMAN restores
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RestoreConfig {
    pub attempts: u32,
    pub delay_secs: u64,
}

impl Default for RestoreConfig {
    fn default() -> Self {
        Self {
            attempts: 3,
            delay_secs: 10,
        }
    }
}

impl RestoreConfig {
    pub fn retry_config(&self) -> orakit::RetryConfig {
        orakit::RetryConfig::new(self.attempts, Duration::from_secs(self.delay_secs), 1.0)
    }
}

impl Settings {
    /// Load settings from `path`, or from the default location
    ///
    /// An explicitly named file must exist; the default one may be missing.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::load_from(path),
            None => {
                let path = paths::config_file()?;
                if path.exists() {
                    Self::load_from(&path)
                } else {
                    log::debug!("No settings at {}, using defaults", path.display());
                    Ok(Self::default())
                }
            }
        }
    }

    /// Load settings from a specific file
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Could not read {}", path.display()))?;
        toml::from_str(&content).with_context(|| format!("Invalid settings in {}", path.display()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_defaults() {
        let settings = Settings::default();
        assert!(settings.elevation.enabled);
        assert_eq!(settings.elevation.user, "oracle");
        assert_eq!(settings.restore.attempts, 3);
        assert_eq!(settings.restore.delay_secs, 10);
        assert!(settings.connection.sid.is_none());
    }

    #[test]
    fn test_load_partial_file() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("config.toml");
        fs::write(
            &path,
            r#"
[connection]
sid = "ORCL"

[oracle]
home = "/u01/app/oracle/product/19c/dbhome_1"

[become]
user = "oradb"

[restore]
attempts = 5
"#,
        )
        .unwrap();

        let settings = Settings::load(Some(&path)).unwrap();
        assert_eq!(settings.connection.sid.as_deref(), Some("ORCL"));
        assert_eq!(
            settings.oracle.home_path(),
            Some(PathBuf::from("/u01/app/oracle/product/19c/dbhome_1"))
        );
        assert!(settings.elevation.enabled);
        assert_eq!(settings.elevation.user, "oradb");
        assert_eq!(settings.restore.attempts, 5);
        assert_eq!(settings.restore.delay_secs, 10);
    }

    #[test]
    fn test_explicit_missing_file_fails() {
        let temp = TempDir::new().unwrap();
        let err = Settings::load(Some(&temp.path().join("nope.toml"))).unwrap_err();
        assert!(err.to_string().contains("Could not read"));
    }

    #[test]
    fn test_invalid_file_fails() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("config.toml");
        fs::write(&path, "[restore]\nattempts = \"many\"\n").unwrap();
        assert!(Settings::load_from(&path).is_err());
    }

    #[test]
    fn test_restore_retry_config() {
        let retry = RestoreConfig::default().retry_config();
        assert_eq!(retry.max_attempts, 3);
        assert_eq!(retry.base_delay, Duration::from_secs(10));
    }
}
