//! # Condition Poller
//!
//! Repeatedly fetches a resource until a success or failure predicate holds,
//! the deadline passes, or the caller cancels.
//!
//! The first fetch happens immediately; later fetches are spaced by the poll
//! interval plus a random jitter so concurrent imports do not hit the API
//! server in lockstep. Transport errors are retried until the deadline; any
//! other client error ends the poll.

use crate::error::{ClientError, ImportError, OperationError};
use rand::Rng;
use serde::Serialize;
use std::future::Future;
use std::time::Duration;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace};

/// Cadence and deadline for one poll
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PollSettings {
    pub interval: Duration,
    pub timeout: Duration,
    /// Maximum extra delay, as a fraction of `interval` (0.0 disables jitter)
    pub jitter: f64,
}

impl PollSettings {
    #[must_use]
    pub fn new(interval: Duration, timeout: Duration) -> Self {
        Self {
            interval,
            timeout,
            jitter: 0.0,
        }
    }

    #[must_use]
    pub fn with_jitter(mut self, jitter: f64) -> Self {
        self.jitter = jitter.clamp(0.0, 1.0);
        self
    }

    fn next_delay(&self) -> Duration {
        if self.jitter <= 0.0 {
            return self.interval;
        }
        let extra = rand::thread_rng().gen_range(0.0..=self.jitter);
        self.interval + self.interval.mul_f64(extra)
    }
}

/// Why a poll ended without success
#[derive(Debug, Clone, PartialEq)]
pub enum PollError<T> {
    /// The failure predicate held for this status
    Failed(T),
    /// Neither predicate held before the deadline
    Timeout { waited: Duration, last: Option<T> },
    /// The caller cancelled; not a success and not a failure
    Cancelled { last: Option<T> },
    /// A non-transient client error ended the poll
    Client { error: ClientError, last: Option<T> },
}

impl<T> PollError<T> {
    /// Last status observed before the poll ended
    #[must_use]
    pub fn last(&self) -> Option<&T> {
        match self {
            PollError::Failed(status) => Some(status),
            PollError::Timeout { last, .. }
            | PollError::Cancelled { last }
            | PollError::Client { last, .. } => last.as_ref(),
        }
    }
}

impl<T: Serialize> PollError<T> {
    /// Classify as an [`OperationError`], building the error for a failed
    /// status with `on_failure`
    pub fn into_operation_error(
        self,
        on_failure: impl FnOnce(&T) -> ImportError,
    ) -> OperationError {
        let last_status = self.last().and_then(|s| serde_json::to_value(s).ok());
        let error = match self {
            PollError::Failed(status) => on_failure(&status),
            PollError::Timeout { waited, .. } => ImportError::Timeout { waited },
            PollError::Cancelled { .. } => ImportError::Cancelled,
            PollError::Client { error, .. } => error.into(),
        };
        OperationError::with_status(error, last_status)
    }
}

/// Poll `fetch` until `is_success` or `is_failure` holds
///
/// `is_failure` is checked first, so a status matching both counts as failed.
pub async fn poll_until<T, F, Fut, S, X>(
    mut fetch: F,
    is_success: S,
    is_failure: X,
    settings: &PollSettings,
    cancel: &CancellationToken,
) -> Result<T, PollError<T>>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, ClientError>>,
    S: Fn(&T) -> bool,
    X: Fn(&T) -> bool,
{
    let start = Instant::now();
    let deadline = start + settings.timeout;
    let mut last = None;
    let mut attempt: u32 = 0;

    loop {
        if cancel.is_cancelled() {
            return Err(PollError::Cancelled { last });
        }
        attempt += 1;
        // The deadline also bounds a fetch that never answers
        let result = tokio::select! {
            biased;
            () = cancel.cancelled() => return Err(PollError::Cancelled { last }),
            result = fetch() => result,
            () = tokio::time::sleep_until(deadline) => {
                debug!(attempt, "poll fetch outlived the deadline");
                return Err(PollError::Timeout {
                    waited: start.elapsed(),
                    last,
                });
            }
        };

        match result {
            Ok(status) => {
                if is_failure(&status) {
                    debug!(attempt, "poll reached failure state");
                    return Err(PollError::Failed(status));
                }
                if is_success(&status) {
                    debug!(attempt, elapsed = ?start.elapsed(), "poll reached success state");
                    return Ok(status);
                }
                trace!(attempt, "poll condition not yet met");
                last = Some(status);
            }
            Err(err) if err.is_transient() => {
                // Expected while the API server is busy; the deadline bounds it
                debug!(attempt, error = %err, "poll fetch failed, retrying");
            }
            Err(error) => return Err(PollError::Client { error, last }),
        }

        let now = Instant::now();
        if now >= deadline {
            return Err(PollError::Timeout {
                waited: now - start,
                last,
            });
        }

        let delay = settings.next_delay().min(deadline - now);
        tokio::select! {
            biased;
            () = cancel.cancelled() => return Err(PollError::Cancelled { last }),
            () = tokio::time::sleep(delay) => {}
        }
    }
}
