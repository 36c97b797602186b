//! Harness error types for typed error handling.
//!
//! This module provides structured errors for the verification harness,
//! separating the one fatal condition (missing server binary) from the
//! per-test-case failures that are absorbed into the pass/fail aggregate.

use std::path::PathBuf;
use std::time::Duration;

/// Result type for harness operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Harness errors with structured context.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum Error {
    /// The server binary does not exist at the expected path.
    ///
    /// This is the single unrecoverable error: no test can proceed
    /// without a server to drive, so it aborts the entire run.
    #[error("server binary not found at {path:?}")]
    ServerBinaryMissing { path: PathBuf },

    /// No response arrived within the per-request bound.
    #[error("no response within {timeout:?}")]
    Timeout { timeout: Duration },

    /// Connection-level failure while driving a request.
    #[error("transport failure: {reason}")]
    Transport { reason: String },

    /// HTTP client failure in CLIENT transport mode.
    #[error("client request failed: {0}")]
    Client(#[from] reqwest::Error),

    /// IO error with context.
    #[error("IO error in {context}: {source}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },
}

impl Error {
    /// Create an IO error with context.
    pub fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            context: context.into(),
            source,
        }
    }

    /// Create a transport error from any connection-level failure.
    pub fn transport(reason: impl Into<String>) -> Self {
        Self::Transport {
            reason: reason.into(),
        }
    }

    /// True for failures that downgrade a single test case without
    /// aborting the group or the run.
    #[must_use]
    pub fn is_case_local(&self) -> bool {
        !matches!(self, Self::ServerBinaryMissing { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_binary_is_fatal() {
        let err = Error::ServerBinaryMissing {
            path: PathBuf::from("bin/server"),
        };
        assert!(!err.is_case_local());
    }

    #[test]
    fn timeout_is_case_local() {
        let err = Error::Timeout {
            timeout: Duration::from_millis(1500),
        };
        assert!(err.is_case_local());
        assert!(err.to_string().contains("1.5s"));
    }
}
