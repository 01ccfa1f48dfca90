//! Retry logic with exponential backoff
//!
//! This module provides configurable retry logic for transient failures. Failures whose
//! kind is not retryable (validation, timeout, cancellation) are returned after the
//! first attempt. Backoff waits observe the cancellation token and return
//! [`Error::Canceled`] immediately when it fires.
//!
//! # Example
//!
//! ```no_run
//! use audioflow::retry::{IsRetryable, retry_with_backoff};
//! use audioflow::config::RetryConfig;
//! use audioflow::Error;
//! use tokio_util::sync::CancellationToken;
//!
//! #[derive(Debug)]
//! enum MyError {
//!     Transient,
//!     Permanent,
//!     Canceled,
//! }
//!
//! impl std::fmt::Display for MyError {
//!     fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
//!         write!(f, "{:?}", self)
//!     }
//! }
//!
//! impl IsRetryable for MyError {
//!     fn is_retryable(&self) -> bool {
//!         matches!(self, MyError::Transient)
//!     }
//! }
//!
//! impl From<Error> for MyError {
//!     fn from(_: Error) -> Self {
//!         MyError::Canceled
//!     }
//! }
//!
//! # async fn example() -> Result<(), MyError> {
//! let config = RetryConfig::default();
//! let cancel = CancellationToken::new();
//! retry_with_backoff(&config, &cancel, || async {
//!     // Your operation here
//!     Ok::<_, MyError>(())
//! }).await?;
//! # Ok(())
//! # }
//! ```

use crate::config::RetryConfig;
use crate::error::Error;
use rand::Rng;
use std::future::Future;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Trait for errors that can be classified as retryable or not
///
/// Transient failures (tool crashed, I/O hiccup) should return `true`.
/// Permanent failures (bad input, caller gave up) should return `false`.
pub trait IsRetryable {
    /// Returns true if the error is transient and the operation should be retried
    fn is_retryable(&self) -> bool;
}

impl IsRetryable for Error {
    fn is_retryable(&self) -> bool {
        self.kind().is_retryable()
    }
}

/// Execute an async operation with exponential backoff retry logic
///
/// # Arguments
///
/// * `config` - Retry configuration (max attempts, delays, backoff multiplier, jitter)
/// * `cancel` - Ambient cancellation signal, checked before each attempt and during waits
/// * `operation` - Async closure that returns `Result<T, E>` where E implements IsRetryable
///
/// # Returns
///
/// Returns the successful result, the first non-retryable error, the cancellation
/// error, or the last error after all attempts are exhausted.
pub async fn retry_with_backoff<F, Fut, T, E>(
    config: &RetryConfig,
    cancel: &CancellationToken,
    mut operation: F,
) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: IsRetryable + std::fmt::Display + From<Error>,
{
    let max_attempts = config.max_attempts.max(1);
    let mut attempt = 0;
    let mut delay = config.initial_delay.min(config.max_delay);

    loop {
        if cancel.is_cancelled() {
            return Err(Error::Canceled.into());
        }
        attempt += 1;

        match operation().await {
            Ok(result) => {
                if attempt > 1 {
                    tracing::info!(attempts = attempt, "Operation succeeded after retry");
                }
                return Ok(result);
            }
            Err(e) if e.is_retryable() && attempt < max_attempts => {
                let wait = if config.jitter {
                    add_jitter(delay)
                } else {
                    delay
                };

                tracing::warn!(
                    error = %e,
                    attempt = attempt,
                    max_attempts = max_attempts,
                    delay_ms = wait.as_millis(),
                    "Operation failed, retrying"
                );

                tokio::select! {
                    biased;
                    _ = cancel.cancelled() => {
                        tracing::debug!(attempt = attempt, "Retry backoff interrupted by cancellation");
                        return Err(Error::Canceled.into());
                    }
                    _ = tokio::time::sleep(wait) => {}
                }

                delay = scale(delay, config.backoff_multiplier, config.max_delay)
                    .min(config.max_delay);
            }
            Err(e) => {
                if e.is_retryable() {
                    tracing::error!(
                        error = %e,
                        attempts = attempt,
                        "Operation failed after all retry attempts exhausted"
                    );
                } else {
                    tracing::error!(
                        error = %e,
                        "Operation failed with non-retryable error"
                    );
                }
                return Err(e);
            }
        }
    }
}

/// Add random jitter to a delay to prevent thundering herd
///
/// The actual delay will be between `delay` and `2 * delay`.
fn add_jitter(delay: Duration) -> Duration {
    let mut rng = rand::thread_rng();
    let jitter_factor: f64 = rng.gen_range(0.0..=1.0);
    scale(delay, 1.0 + jitter_factor, Duration::MAX)
}

/// `delay * factor`, or `saturated` if the product does not fit in a `Duration`
fn scale(delay: Duration, factor: f64, saturated: Duration) -> Duration {
    Duration::try_from_secs_f64(delay.as_secs_f64() * factor).unwrap_or(saturated)
}
