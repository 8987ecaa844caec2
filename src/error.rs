//! Error types for the client.
//!
//! Driver errors are preserved as sources rather than flattened into strings,
//! so callers can still match on the underlying `sqlx::Error` when they need
//! to. Only two situations get their own kinds: pool setup failure (fatal,
//! configure-time only) and acquire giving up after its bounded retry budget.

use std::time::Duration;

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors surfaced by the client.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The configuration failed validation before any connection was tried.
    #[error("invalid configuration: {0}")]
    Config(String),

    /// The connection pool could not be created (bad credentials,
    /// unreachable host). Raised only at configure time.
    #[error("failed to set up connection pool: {0}")]
    Setup(#[source] sqlx::Error),

    /// Acquiring a pooled connection exceeded the configured retry budget.
    #[error("pool acquire timed out after {attempts} attempt(s) over {waited:?}")]
    AcquireTimeout {
        /// Total time spent waiting across all attempts.
        waited: Duration,
        /// Number of acquire attempts made.
        attempts: u32,
    },

    /// The statement could not be built: invalid identifier, placeholder and
    /// parameter counts out of step, empty statement, or an unbindable
    /// parameter value.
    #[error("invalid statement: {0}")]
    Statement(String),

    /// The statement failed during execution. Never retried; the driver
    /// error is available as the source.
    #[error("statement execution failed: {0}")]
    Execute(#[source] sqlx::Error),
}

impl Error {
    /// Build a `Statement` error from anything printable.
    pub(crate) fn statement(msg: impl Into<String>) -> Self {
        Self::Statement(msg.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_statement_error_message() {
        let err = Error::statement("bad identifier `1abc`");
        assert_eq!(
            err.to_string(),
            "invalid statement: bad identifier `1abc`"
        );
    }

    #[test]
    fn test_acquire_timeout_message() {
        let err = Error::AcquireTimeout {
            waited: Duration::from_millis(1500),
            attempts: 3,
        };
        let msg = err.to_string();
        assert!(msg.contains("3 attempt"));
    }
}
