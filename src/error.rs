//! Error types for audioflow
//!
//! This module provides the error taxonomy used across the crate:
//! - A single [`Error`] enum with kind-specific payloads (offending field, exit code,
//!   captured stderr, failing stage)
//! - A closed [`ErrorKind`] classification used by the retry policy
//! - [`classify`] for recovering the kind from any wrapped error chain
//! - Machine-readable error codes and a serializable [`ErrorDetail`] for diagnostics

use crate::types::Stage;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

/// Result type alias for audioflow operations
pub type Result<T> = std::result::Result<T, Error>;

/// Boxed underlying cause carried by [`Error::Processing`]
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Maximum number of stderr characters rendered by `Display`
const STDERR_DISPLAY_LIMIT: usize = 200;

/// Main error type for audioflow
///
/// Each variant carries the context needed to diagnose the failure. Use
/// [`Error::kind`] to decide retryability instead of matching on variants directly.
#[derive(Debug, Error)]
pub enum Error {
    /// The caller supplied a bad request (empty path, non-positive bitrate, missing input)
    #[error("invalid {field} ({value:?}): {message}")]
    Validation {
        /// The offending field (e.g., "input_path", "bitrate")
        field: String,
        /// The rejected value, rendered as text
        value: String,
        /// Human-readable reason
        message: String,
    },

    /// An external tool exited unsuccessfully or could not be started
    #[error("{message} (exit={exit_code:?}, stderr={:?})", truncate(.stderr, STDERR_DISPLAY_LIMIT))]
    Execution {
        /// Human-readable summary (e.g., "ffmpeg execution failed")
        message: String,
        /// Argument tokens passed to the tool
        args: Vec<String>,
        /// Exit code, `None` if the process never started or was killed by a signal
        exit_code: Option<i32>,
        /// Captured diagnostic output
        stderr: String,
        /// Spawn/wait failure, if any
        #[source]
        source: Option<std::io::Error>,
    },

    /// An internal pipeline step failed outside of a tool invocation
    #[error("{message} (stage={stage})")]
    Processing {
        /// The pipeline stage that failed
        stage: Stage,
        /// Human-readable reason
        message: String,
        /// Underlying cause
        #[source]
        source: Option<BoxError>,
    },

    /// The per-job deadline elapsed
    #[error("operation timed out after {0:?}")]
    Timeout(Duration),

    /// The ambient cancellation signal fired
    #[error("operation canceled")]
    Canceled,

    /// Configuration error with context about which setting is invalid
    #[error("configuration error: {message}")]
    Config {
        /// Human-readable error message describing the configuration issue
        message: String,
        /// The configuration key that caused the error (e.g., "workers")
        key: Option<String>,
    },

    /// I/O error from a storage collaborator
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Closed classification of failures, used for retry decisions
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// Bad caller input, never retried
    Validation,
    /// External tool failure, retryable
    Execution,
    /// Internal step failure, retryable
    Processing,
    /// Deadline elapsed, never retried
    Timeout,
    /// Caller gave up, never retried
    Canceled,
}

impl ErrorKind {
    /// Whether failures of this kind are worth another attempt
    pub fn is_retryable(self) -> bool {
        matches!(self, ErrorKind::Execution | ErrorKind::Processing)
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            ErrorKind::Validation => "validation",
            ErrorKind::Execution => "execution",
            ErrorKind::Processing => "processing",
            ErrorKind::Timeout => "timeout",
            ErrorKind::Canceled => "canceled",
        };
        f.write_str(name)
    }
}

impl Error {
    /// Create a validation error for `field`
    pub fn validation(
        field: impl Into<String>,
        value: impl std::fmt::Display,
        message: impl Into<String>,
    ) -> Self {
        Error::Validation {
            field: field.into(),
            value: value.to_string(),
            message: message.into(),
        }
    }

    /// Create a processing error for `stage` wrapping `source`
    pub fn processing<E>(stage: Stage, message: impl Into<String>, source: E) -> Self
    where
        E: Into<BoxError>,
    {
        Error::Processing {
            stage,
            message: message.into(),
            source: Some(source.into()),
        }
    }

    /// Classify this error
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::Validation { .. } | Error::Config { .. } => ErrorKind::Validation,
            Error::Execution { .. } => ErrorKind::Execution,
            Error::Processing { .. } | Error::Io(_) => ErrorKind::Processing,
            Error::Timeout(_) => ErrorKind::Timeout,
            Error::Canceled => ErrorKind::Canceled,
        }
    }

    /// The wrapped underlying cause, if any
    pub fn cause(&self) -> Option<&(dyn std::error::Error + 'static)> {
        std::error::Error::source(self)
    }

    /// Get the machine-readable error code
    pub fn error_code(&self) -> &'static str {
        match self {
            Error::Validation { .. } => "validation_error",
            Error::Execution { .. } => "execution_error",
            Error::Processing { .. } => "processing_error",
            Error::Timeout(_) => "timeout",
            Error::Canceled => "canceled",
            Error::Config { .. } => "config_error",
            Error::Io(_) => "io_error",
        }
    }

    /// Structured, serializable view of this error
    pub fn detail(&self) -> ErrorDetail {
        let details = match self {
            Error::Validation { field, value, .. } => Some(serde_json::json!({
                "field": field,
                "value": value,
            })),
            Error::Execution {
                args,
                exit_code,
                stderr,
                ..
            } => Some(serde_json::json!({
                "args": args,
                "exit_code": exit_code,
                "stderr": stderr,
            })),
            Error::Processing { stage, .. } => Some(serde_json::json!({
                "stage": stage,
            })),
            Error::Timeout(after) => Some(serde_json::json!({
                "timeout_ms": u64::try_from(after.as_millis()).unwrap_or(u64::MAX),
            })),
            Error::Config { key: Some(key), .. } => Some(serde_json::json!({
                "key": key,
            })),
            Error::Config { key: None, .. } | Error::Canceled | Error::Io(_) => None,
        };

        ErrorDetail {
            code: self.error_code().to_string(),
            kind: self.kind(),
            message: self.to_string(),
            details,
        }
    }
}

/// Classify an arbitrary error by walking its source chain
///
/// Returns the kind of the first [`Error`] found in the chain, or `None` if the chain
/// contains no audioflow error.
pub fn classify(err: &(dyn std::error::Error + 'static)) -> Option<ErrorKind> {
    let mut current = Some(err);
    while let Some(e) = current {
        if let Some(ours) = e.downcast_ref::<Error>() {
            return Some(ours.kind());
        }
        current = e.source();
    }
    None
}

/// Detailed error information for diagnostics and logs
///
/// # Example JSON
///
/// ```json
/// {
///   "code": "validation_error",
///   "kind": "validation",
///   "message": "invalid bitrate (\"-1\"): bitrate must be positive",
///   "details": { "field": "bitrate", "value": "-1" }
/// }
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorDetail {
    /// Machine-readable error code (e.g., "validation_error")
    pub code: String,
    /// Classification of the failure
    pub kind: ErrorKind,
    /// Human-readable error message
    pub message: String,
    /// Kind-specific context (field/value, exit code/stderr, stage)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

fn truncate(s: &str, limit: usize) -> String {
    match s.char_indices().nth(limit) {
        Some((idx, _)) => format!("{}...", &s[..idx]),
        None => s.to_string(),
    }
}
