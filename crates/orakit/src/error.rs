//! Error types for Oracle CLI operations.
//!
//! Errors are categorized so callers can decide whether to retry and how
//! to report the failure. Every error raised after a tool ran carries the
//! captured output so an operator can diagnose it.

use thiserror::Error;

/// Categories of errors, mirrored in module results.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// Bad or missing input, raised before any subprocess runs
    Validation,
    /// Target unreachable or credentials rejected
    Connection,
    /// The tool ran but the database reported a failure
    Execution,
    /// Local environment problem (tool missing, OS account, IO)
    Environment,
}

impl ErrorCategory {
    /// Whether an operation failing this way is worth retrying.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Connection | Self::Execution)
    }

    /// Short machine-readable name used in results.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Validation => "validation",
            Self::Connection => "connection",
            Self::Execution => "execution",
            Self::Environment => "environment",
        }
    }

    /// Get actionable advice for resolving this error category.
    pub fn advice(&self) -> &'static str {
        match self {
            Self::Validation => "Fix the module arguments and run again",
            Self::Connection => "Check that the instance is up and the credentials are valid",
            Self::Execution => "Inspect the captured tool output for the Oracle error",
            Self::Environment => "Check ORACLE_HOME and that the oracle OS account exists",
        }
    }
}

/// Errors that can occur while driving sqlplus or rman.
#[derive(Debug, Error)]
pub enum Error {
    /// Invalid or missing input
    #[error("{message}")]
    Validation {
        /// What was wrong with the input
        message: String,
    },

    /// Could not connect or authenticate
    #[error("connection failed: {message}")]
    Connection {
        /// First error line reported by the tool
        message: String,
        /// Full captured output
        output: String,
    },

    /// The database rejected a command
    #[error("execution failed: {message}")]
    Execution {
        /// First error line reported by the tool
        message: String,
        /// Full captured output
        output: String,
    },

    /// sqlplus or rman could not be started
    #[error("{tool} not found; set oracle.home or add it to PATH")]
    ToolNotFound {
        /// Program that could not be executed
        tool: String,
    },

    /// The OS account used for elevation is unusable
    #[error("cannot run as OS user {user}: {message}")]
    Become {
        /// Target OS account
        user: String,
        /// Reason
        message: String,
    },

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Other error
    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Shorthand for a validation error.
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }

    /// Get the error category.
    pub fn category(&self) -> ErrorCategory {
        match self {
            Error::Validation { .. } => ErrorCategory::Validation,
            Error::Connection { .. } => ErrorCategory::Connection,
            Error::Execution { .. } => ErrorCategory::Execution,
            Error::ToolNotFound { .. } | Error::Become { .. } | Error::Io(_) | Error::Other(_) => {
                ErrorCategory::Environment
            }
        }
    }

    /// Whether this error is worth retrying.
    pub fn is_retryable(&self) -> bool {
        self.category().is_retryable()
    }

    /// Captured tool output, if the tool ran.
    pub fn output(&self) -> Option<&str> {
        match self {
            Error::Connection { output, .. } | Error::Execution { output, .. } => Some(output),
            _ => None,
        }
    }
}

/// Result type for Oracle CLI operations.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retryable_categories() {
        assert!(ErrorCategory::Connection.is_retryable());
        assert!(ErrorCategory::Execution.is_retryable());
        assert!(!ErrorCategory::Validation.is_retryable());
        assert!(!ErrorCategory::Environment.is_retryable());
    }

    #[test]
    fn test_category_of_variants() {
        assert_eq!(
            Error::validation("missing username").category(),
            ErrorCategory::Validation
        );
        assert_eq!(
            Error::ToolNotFound {
                tool: "sqlplus".into()
            }
            .category(),
            ErrorCategory::Environment
        );
    }

    #[test]
    fn test_output_is_exposed() {
        let err = Error::Execution {
            message: "ORA-00942: table or view does not exist".into(),
            output: "full output".into(),
        };
        assert_eq!(err.output(), Some("full output"));
        assert_eq!(
            err.to_string(),
            "execution failed: ORA-00942: table or view does not exist"
        );
    }
}
