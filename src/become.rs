//! Privilege elevation to the Oracle software owner
//!
//! The Oracle tools run as the account that owns the installation. When
//! elevation is enabled every tool invocation goes through
//! `sudo -n -u <user>`; nothing is elevated for the whole process and no
//! password is ever prompted for.

use orakit::backend::cli::Launcher;
use serde::{Deserialize, Serialize};

/// Configuration for elevation (`[become]` in config.toml)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BecomeConfig {
    /// Run the tools through sudo
    pub enabled: bool,

    /// OS account owning the Oracle installation
    pub user: String,
}

impl Default for BecomeConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            user: "oracle".to_string(),
        }
    }
}

impl BecomeConfig {
    /// Launcher honouring this configuration
    pub fn launcher(&self) -> Launcher {
        if self.enabled {
            Launcher::become_user(&self.user)
        } else {
            Launcher::direct()
        }
    }

    /// Fail unless the configured account exists on this host
    ///
    /// A no-op when elevation is disabled.
    pub fn verify(&self) -> orakit::Result<()> {
        if !self.enabled {
            return Ok(());
        }
        if account_exists(&self.user) {
            Ok(())
        } else {
            Err(orakit::Error::Become {
                user: self.user.clone(),
                message: format!(
                    "OS user '{}' does not exist on this host; set become.user or install Oracle first",
                    self.user
                ),
            })
        }
    }
}

/// Check whether an OS account exists
#[cfg(unix)]
pub fn account_exists(user: &str) -> bool {
    use std::ffi::CString;

    let Ok(c_user) = CString::new(user) else {
        return false;
    };

    // SAFETY: c_user is a valid NUL-terminated string; the returned record
    // is only tested for null and never dereferenced.
    unsafe { !libc::getpwnam(c_user.as_ptr()).is_null() }
}

#[cfg(not(unix))]
pub fn account_exists(_user: &str) -> bool {
    false
}
