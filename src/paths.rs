//! Centralized path resolution for oractl
//!
//! # Environment Variables
//!
//! - `ORACTL_CONFIG_DIR` - Override config directory (e.g., `~/dotfiles/oractl`)
//!
//! # Path Resolution Priority
//!
//! For config_dir():
//! 1. `ORACTL_CONFIG_DIR` environment variable
//! 2. `XDG_CONFIG_HOME/oractl` (if set)
//! 3. `~/.config/oractl`

use anyhow::{Context, Result};
use std::path::PathBuf;

/// Environment variable for config directory override
pub const ENV_CONFIG_DIR: &str = "ORACTL_CONFIG_DIR";

/// Name of the settings file inside the config directory
pub const CONFIG_FILE: &str = "config.toml";

/// Get the oractl config directory path
pub fn config_dir() -> Result<PathBuf> {
    // 1. Check environment variable override
    if let Ok(dir) = std::env::var(ENV_CONFIG_DIR) {
        let path = expand(&dir);
        log::debug!(
            "Using config dir from {}: {}",
            ENV_CONFIG_DIR,
            path.display()
        );
        return Ok(path);
    }

    // 2. Check XDG_CONFIG_HOME
    if let Ok(xdg_config) = std::env::var("XDG_CONFIG_HOME")
        && !xdg_config.is_empty()
    {
        let path = PathBuf::from(xdg_config).join("oractl");
        log::debug!("Using XDG_CONFIG_HOME: {}", path.display());
        return Ok(path);
    }

    // 3. Default: ~/.config/oractl
    let home = dirs::home_dir().context("Could not determine home directory")?;
    let path = home.join(".config").join("oractl");
    log::debug!("Using default config dir: {}", path.display());
    Ok(path)
}

/// Path of the settings file
pub fn config_file() -> Result<PathBuf> {
    Ok(config_dir()?.join(CONFIG_FILE))
}

/// Expand ~ and environment variables in a path string.
///
/// All path-valued settings go through this function.
pub fn expand(path: &str) -> PathBuf {
    let expanded = shellexpand::full(path).unwrap_or(std::borrow::Cow::Borrowed(path));
    PathBuf::from(expanded.as_ref())
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::env;

    /// Helper to run a test with temporary env var
    ///
    /// # Safety
    /// This function uses unsafe env::set_var/remove_var which can cause issues
    /// if other threads read environment variables concurrently.
    /// Only use in single-threaded test contexts.
    fn with_env_var<F, R>(key: &str, value: &str, f: F) -> R
    where
        F: FnOnce() -> R,
    {
        let original = env::var(key).ok();
        // SAFETY: Tests run in isolation and don't read env vars concurrently
        unsafe { env::set_var(key, value) };
        let result = f();
        match original {
            // SAFETY: Tests run in isolation
            Some(v) => unsafe { env::set_var(key, v) },
            None => unsafe { env::remove_var(key) },
        }
        result
    }

    #[test]
    fn test_config_dir_env_override() {
        with_env_var(ENV_CONFIG_DIR, "/custom/oractl/config", || {
            let result = config_dir().unwrap();
            assert_eq!(result, PathBuf::from("/custom/oractl/config"));
            assert_eq!(
                config_file().unwrap(),
                PathBuf::from("/custom/oractl/config/config.toml")
            );
        });
    }

    #[test]
    fn test_config_dir_env_override_with_tilde() {
        let home = dirs::home_dir().unwrap();
        let expected = home.join("dotfiles").join("oractl-tilde-test");
        with_env_var(ENV_CONFIG_DIR, "~/dotfiles/oractl-tilde-test", || {
            let result = config_dir().unwrap();
            assert_eq!(result, expected);
        });
    }

    #[test]
    fn test_expand_with_tilde() {
        let result = expand("~/oracle/dbs");
        let home = dirs::home_dir().unwrap();
        assert_eq!(result, home.join("oracle").join("dbs"));
    }

    #[test]
    fn test_expand_absolute() {
        let result = expand("/u01/app/oracle");
        assert_eq!(result, PathBuf::from("/u01/app/oracle"));
    }

    #[test]
    fn test_expand_unknown_env_var_unchanged() {
        let result = expand("/path/$NONEXISTENT_ORACTL_VAR_12345/file");
        assert_eq!(
            result,
            PathBuf::from("/path/$NONEXISTENT_ORACTL_VAR_12345/file")
        );
    }
}
