//! Conflict retry with jittered backoff.
//!
//! Property writes race against concurrent edits on the server, which answers
//! with `409 Conflict`. [`RestClient::retry_execute`] resends the same request
//! after a random pause drawn from [`ConflictRetry`]'s wait range.

use rand::Rng;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::client::RestClient;
use crate::error::{Error, Result};
use crate::request::EndpointRequest;
use crate::response::Exchange;

// Retry settings

/// Default lower bound of the wait range in milliseconds
pub const WAIT_RANGE_MIN_DEFAULT_MS: u64 = 200;

/// Default upper bound of the wait range in milliseconds
pub const WAIT_RANGE_MAX_DEFAULT_MS: u64 = 1000;

/// Default number of retries after the first conflict
pub const RETRY_LIMIT_DEFAULT: u32 = 3;

/// Retry policy for `409 Conflict` responses.
///
/// `min_wait <= max_wait` always holds. `max_attempts` counts retries, so a
/// request is sent at most `max_attempts + 1` times.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConflictRetry {
    min_wait: Duration,
    max_wait: Duration,
    max_attempts: u32,
}

impl ConflictRetry {
    /// Create a policy with the default 200..=1000 ms range and 3 retries.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            min_wait: Duration::from_millis(WAIT_RANGE_MIN_DEFAULT_MS),
            max_wait: Duration::from_millis(WAIT_RANGE_MAX_DEFAULT_MS),
            max_attempts: RETRY_LIMIT_DEFAULT,
        }
    }

    /// Create a policy that fails on the first conflict.
    #[must_use]
    pub const fn no_retry() -> Self {
        Self::new().with_max_attempts(0)
    }

    /// Create a policy from raw caller values.
    ///
    /// Negative values fall back to their defaults and a reversed range is
    /// swapped.
    #[must_use]
    pub fn from_millis(min_wait_ms: i64, max_wait_ms: i64, max_attempts: i64) -> Self {
        let min = non_negative(min_wait_ms, "min wait", WAIT_RANGE_MIN_DEFAULT_MS);
        let max = non_negative(max_wait_ms, "max wait", WAIT_RANGE_MAX_DEFAULT_MS);
        let attempts = u32::try_from(max_attempts).unwrap_or_else(|_| {
            if max_attempts < 0 {
                debug!(max_attempts, "negative retry limit, using default");
                RETRY_LIMIT_DEFAULT
            } else {
                u32::MAX
            }
        });

        Self::new()
            .with_wait_range(Duration::from_millis(min), Duration::from_millis(max))
            .with_max_attempts(attempts)
    }

    /// Set the wait range; a reversed range is swapped.
    #[must_use]
    pub const fn with_wait_range(mut self, min: Duration, max: Duration) -> Self {
        if max.as_nanos() < min.as_nanos() {
            self.min_wait = max;
            self.max_wait = min;
        } else {
            self.min_wait = min;
            self.max_wait = max;
        }
        self
    }

    /// Set the number of retries.
    #[must_use]
    pub const fn with_max_attempts(mut self, attempts: u32) -> Self {
        self.max_attempts = attempts;
        self
    }

    /// Lower bound of the wait range.
    #[must_use]
    pub const fn min_wait(&self) -> Duration {
        self.min_wait
    }

    /// Upper bound of the wait range.
    #[must_use]
    pub const fn max_wait(&self) -> Duration {
        self.max_wait
    }

    /// Number of retries.
    #[must_use]
    pub const fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Draw a pause uniformly from `[min_wait, max_wait]`, millisecond granularity.
    #[must_use]
    pub fn jitter(&self) -> Duration {
        let min = duration_millis(self.min_wait);
        let max = duration_millis(self.max_wait);
        Duration::from_millis(rand::thread_rng().gen_range(min..=max))
    }
}

impl Default for ConflictRetry {
    fn default() -> Self {
        Self::new()
    }
}

fn non_negative(value: i64, what: &str, default: u64) -> u64 {
    u64::try_from(value).unwrap_or_else(|_| {
        debug!(value, what, default, "negative retry setting, using default");
        default
    })
}

fn duration_millis(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}

impl RestClient {
    /// Send `request`, resending it while the server answers `409 Conflict`.
    ///
    /// Attempts are strictly sequential; each exchange is fully drained before
    /// the pause that precedes the next one. `label` only affects logging.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Request`] for a non-conflict status of 300 or greater,
    /// or for the last conflict once the retries are exhausted.
    pub async fn retry_execute(
        &self,
        request: &EndpointRequest,
        label: Option<&str>,
        policy: &ConflictRetry,
    ) -> Result<Exchange> {
        let mut conflicts: u32 = 0;
        loop {
            let exchange = self.send(request).await?;
            let status = exchange.status().as_u16();

            if status == 409 {
                conflicts += 1;
                if conflicts > policy.max_attempts() {
                    if policy.max_attempts() > 0 {
                        if let Some(label) = label {
                            warn!(label, attempts = conflicts, "reached retry limit");
                        }
                    }
                    return Err(exchange.into_error());
                }

                let pause = policy.jitter();
                if let Some(label) = label {
                    info!(label, attempt = conflicts, ?pause, "retrying after conflict");
                }
                tokio::time::sleep(pause).await;
                continue;
            }

            if status > 299 {
                return Err(exchange.into_error());
            }
            return Ok(exchange);
        }
    }
}
