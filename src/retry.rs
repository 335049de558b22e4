//! Retry logic with exponential backoff
//!
//! Used by the image retriever to ride out transient failures of a single page
//! fetch. The pipeline stages themselves are never retried.
//!
//! # Example
//!
//! ```no_run
//! use segment_dl::retry::{IsRetryable, fetch_with_retry};
//! use segment_dl::config::RetryConfig;
//!
//! #[derive(Debug)]
//! enum MyError {
//!     Transient,
//!     Permanent,
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
//! # async fn example() -> Result<(), MyError> {
//! let config = RetryConfig::default();
//! fetch_with_retry(&config, || async { Ok::<_, MyError>(()) }).await?;
//! # Ok(())
//! # }
//! ```

use crate::config::RetryConfig;
use crate::error::RetrievalError;
use rand::Rng;
use std::future::Future;
use std::time::Duration;

/// Trait for errors that can be classified as retryable or not
pub trait IsRetryable {
    /// Returns true if the error is transient and the operation should be retried
    fn is_retryable(&self) -> bool;
}

impl IsRetryable for RetrievalError {
    fn is_retryable(&self) -> bool {
        match self {
            // Transport failures: timeouts, refused or reset connections, truncated bodies
            RetrievalError::Fetch { .. } => true,
            RetrievalError::Status { status, .. } => *status == 429 || *status >= 500,
            RetrievalError::Write { .. } | RetrievalError::DuplicatePosition { .. } => false,
        }
    }
}

/// Execute an async operation with exponential backoff retry logic
///
/// `config.max_attempts` counts retries after the first try. Returns the
/// first success or the last error.
pub async fn fetch_with_retry<F, Fut, T, E>(config: &RetryConfig, mut operation: F) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: IsRetryable + std::fmt::Display,
{
    let mut attempt = 0;
    let mut delay = config.initial_delay;

    loop {
        match operation().await {
            Ok(result) => {
                if attempt > 0 {
                    tracing::info!(attempts = attempt + 1, "Fetch succeeded after retry");
                }
                return Ok(result);
            }
            Err(e) if e.is_retryable() && attempt < config.max_attempts => {
                attempt += 1;

                tracing::warn!(
                    error = %e,
                    attempt = attempt,
                    max_attempts = config.max_attempts,
                    delay_ms = delay.as_millis(),
                    "Fetch failed, retrying"
                );

                let wait = if config.jitter {
                    add_jitter(delay)
                } else {
                    delay
                };
                tokio::time::sleep(wait).await;

                delay =
                    Duration::try_from_secs_f64(delay.as_secs_f64() * config.backoff_multiplier)
                        .map_or(config.max_delay, |next| next.min(config.max_delay));
            }
            Err(e) => {
                if e.is_retryable() {
                    tracing::error!(
                        error = %e,
                        attempts = attempt + 1,
                        "Fetch failed after all retry attempts exhausted"
                    );
                } else {
                    tracing::debug!(error = %e, "Fetch failed with non-retryable error");
                }
                return Err(e);
            }
        }
    }
}

/// Random delay between `delay` and `2 * delay`
fn add_jitter(delay: Duration) -> Duration {
    let mut rng = rand::thread_rng();
    let jitter_factor: f64 = rng.gen_range(0.0..=1.0);
    Duration::from_secs_f64(delay.as_secs_f64() * (1.0 + jitter_factor))
}
