//! Bounded polling for asynchronous server-side work.
//!
//! Both waits share one loop: check the deadline, send, classify, pause. The
//! deadline bounds the number of iterations; a single slow request may still
//! run past it.

use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, warn};

use crate::client::{check_status, RestClient};
use crate::error::{Error, Result};
use crate::request::EndpointRequest;
use crate::response::Exchange;

/// Pause between two polls.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(1000);

/// Budget for waiting on a newly created resource.
pub const EXISTENCE_TIMEOUT: Duration = Duration::from_secs(10 * 60);

/// Interval and overall budget of one poll loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollConfig {
    /// Pause between polls
    pub interval: Duration,

    /// Overall budget, measured from the start of the loop
    pub timeout: Duration,
}

impl PollConfig {
    /// Poll every second for at most `timeout`.
    #[must_use]
    pub const fn new(timeout: Duration) -> Self {
        Self {
            interval: DEFAULT_POLL_INTERVAL,
            timeout,
        }
    }

    /// Settings used while waiting for a resource to appear.
    #[must_use]
    pub const fn existence() -> Self {
        Self::new(EXISTENCE_TIMEOUT)
    }

    /// Poll every second for at most `minutes`, saturating at `u64::MAX` seconds.
    #[must_use]
    pub const fn with_timeout_minutes(minutes: u64) -> Self {
        Self::new(Duration::from_secs(minutes.saturating_mul(60)))
    }

    /// Override the pause between polls.
    #[must_use]
    pub const fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }
}

impl Default for PollConfig {
    fn default() -> Self {
        Self::existence()
    }
}

/// Outcome of one poll iteration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PollStatus<T> {
    /// Not there yet; pause and poll again
    Pending,
    /// Terminal success
    Ready(T),
}

impl RestClient {
    /// Resend `request` until `step` reports [`PollStatus::Ready`].
    ///
    /// `step` sees the raw send outcome, including transport failures, and
    /// decides whether to keep polling or to stop with an error.
    ///
    /// # Errors
    ///
    /// Returns [`Error::PollTimeout`] naming `what` once the budget is spent,
    /// or whatever error `step` returns.
    pub async fn poll_until<T, F>(
        &self,
        request: &EndpointRequest,
        config: PollConfig,
        what: &str,
        mut step: F,
    ) -> Result<T>
    where
        F: FnMut(Result<Exchange>) -> Result<PollStatus<T>>,
    {
        let start = Instant::now();
        let mut polls: u32 = 0;
        loop {
            if start.elapsed() > config.timeout {
                warn!(what, polls, timeout = ?config.timeout, "gave up waiting");
                return Err(Error::PollTimeout(what.to_string()));
            }

            polls += 1;
            let outcome = self.send(request).await;
            if let PollStatus::Ready(value) = step(outcome)? {
                debug!(what, polls, "poll finished");
                return Ok(value);
            }

            tokio::time::sleep(config.interval).await;
        }
    }

    /// Poll `request` until the server stops answering `404 Not Found`.
    ///
    /// Transport failures count as "not yet available".
    ///
    /// # Errors
    ///
    /// Returns [`Error::PollTimeout`] when the budget is spent and
    /// [`Error::Request`] for any final status other than 2xx.
    pub async fn wait_for_existence(
        &self,
        request: &EndpointRequest,
        config: PollConfig,
        what: &str,
    ) -> Result<()> {
        self.poll_until(request, config, what, |outcome| match outcome {
            Ok(exchange) if exchange.status().as_u16() == 404 => {
                debug!(what, "not found yet");
                Ok(PollStatus::Pending)
            }
            Ok(exchange) => check_status(exchange).map(|_| PollStatus::Ready(())),
            Err(err) if err.is_transient() => {
                warn!(what, error = %err, "ignoring transport failure while polling");
                Ok(PollStatus::Pending)
            }
            Err(err) => Err(err),
        })
        .await
    }

    /// Poll `request` until `decode` extracts a terminal value.
    ///
    /// Every response must be a success and `decode` must understand it;
    /// failures of either kind end the loop.
    ///
    /// # Errors
    ///
    /// Returns [`Error::PollTimeout`] when the budget is spent,
    /// [`Error::Request`] for a status of 300 or greater, or any error from
    /// `decode`.
    pub async fn wait_for_completion<T, F>(
        &self,
        request: &EndpointRequest,
        config: PollConfig,
        what: &str,
        mut decode: F,
    ) -> Result<T>
    where
        F: FnMut(&Exchange) -> Result<Option<T>>,
    {
        self.poll_until(request, config, what, |outcome| {
            let exchange = check_status(outcome?)?;
            Ok(decode(&exchange)?.map_or(PollStatus::Pending, PollStatus::Ready))
        })
        .await
    }
}
