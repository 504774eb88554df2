//! Retry logic with backoff for transient errors.

use crate::error::{Error, Result};
use crate::types::RetryConfig;
use std::thread;

/// Callback trait for retry progress notifications.
pub trait RetryCallback {
    /// Called when an operation is being retried.
    ///
    /// # Arguments
    /// * `attempt` - Current attempt number (1-indexed)
    /// * `max_attempts` - Maximum number of attempts
    /// * `error` - The error that triggered the retry
    /// * `delay_secs` - Seconds until next attempt
    fn on_retry(&self, attempt: u32, max_attempts: u32, error: &Error, delay_secs: u64);
}

/// Callback that reports retries through the `log` facade.
pub struct LogCallback;

impl RetryCallback for LogCallback {
    fn on_retry(&self, attempt: u32, max_attempts: u32, error: &Error, delay_secs: u64) {
        log::warn!(
            "Attempt {}/{} failed: {}. Retrying in {}s...",
            attempt,
            max_attempts,
            error,
            delay_secs
        );
    }
}

/// Execute an operation with retry logic.
///
/// Retries the operation while it returns a retryable error, sleeping
/// between attempts. Returns the last error once attempts are exhausted.
pub fn with_retry<T, F>(
    config: &RetryConfig,
    callback: Option<&dyn RetryCallback>,
    mut operation: F,
) -> Result<T>
where
    F: FnMut() -> Result<T>,
{
    let mut attempt = 0;
    loop {
        match operation() {
            Ok(result) => return Ok(result),
            Err(e) if !e.is_retryable() => return Err(e),
            Err(e) if attempt + 1 >= config.max_attempts.max(1) => return Err(e),
            Err(e) => {
                let delay = config.delay_for_attempt(attempt);
                if let Some(cb) = callback {
                    cb.on_retry(attempt + 1, config.max_attempts, &e, delay.as_secs());
                }
                thread::sleep(delay);
                attempt += 1;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;
    use std::time::Duration;

    fn fast(max_attempts: u32) -> RetryConfig {
        RetryConfig {
            max_attempts,
            base_delay: Duration::from_millis(1),
            backoff_factor: 1.0,
            max_delay: Duration::from_millis(10),
        }
    }

    fn rman_failure() -> Error {
        Error::Execution {
            message: "RMAN-03002: failure of restore command".to_string(),
            output: String::new(),
        }
    }

    #[test]
    fn test_with_retry_success_first_try() {
        let result = with_retry(&RetryConfig::no_retry(), None, || Ok::<_, Error>(42));
        assert_eq!(result.unwrap(), 42);
    }

    #[test]
    fn test_with_retry_validation_error_not_retried() {
        let attempts = Cell::new(0);
        let result: Result<()> = with_retry(&fast(3), None, || {
            attempts.set(attempts.get() + 1);
            Err(Error::validation("name is required"))
        });

        assert!(result.is_err());
        assert_eq!(attempts.get(), 1);
    }

    #[test]
    fn test_with_retry_eventual_success() {
        let attempts = Cell::new(0);
        let result = with_retry(&fast(3), None, || {
            let current = attempts.get();
            attempts.set(current + 1);
            if current < 2 { Err(rman_failure()) } else { Ok(42) }
        });

        assert_eq!(result.unwrap(), 42);
        assert_eq!(attempts.get(), 3);
    }

    #[test]
    fn test_with_retry_all_attempts_fail() {
        let attempts = Cell::new(0);
        let result: Result<()> = with_retry(&fast(3), None, || {
            attempts.set(attempts.get() + 1);
            Err(rman_failure())
        });

        assert!(matches!(result, Err(Error::Execution { .. })));
        assert_eq!(attempts.get(), 3);
    }

    #[test]
    fn test_callback_invoked_between_attempts() {
        struct Counting(Cell<u32>);
        impl RetryCallback for Counting {
            fn on_retry(&self, _: u32, _: u32, _: &Error, _: u64) {
                self.0.set(self.0.get() + 1);
            }
        }

        let callback = Counting(Cell::new(0));
        let _: Result<()> = with_retry(&fast(3), Some(&callback), || Err(rman_failure()));

        assert_eq!(callback.0.get(), 2);
    }
}
