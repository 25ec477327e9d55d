//! Bounded condition polling
//!
//! A generic fixed-delay retry executor shared by the readiness and
//! termination pollers. Checks distinguish "done" from "not yet" explicitly
//! instead of abusing errors for control flow; only genuinely unrecoverable
//! conditions surface as fatal.

use std::future::Future;
use std::time::Duration;

use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// Outcome of a single poll check
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PollState {
    /// The awaited condition holds; stop polling.
    Done,
    /// The condition does not hold yet; retry after the configured delay.
    Retry(String),
}

/// Terminal result of a poll that did not complete
#[derive(Debug, Error)]
pub enum PollError {
    /// The attempt cap was reached. Carries only the last reason.
    #[error("condition not met after {attempts} attempts, last: {last}")]
    Exhausted { attempts: u32, last: String },

    /// The cancellation token fired while checking or waiting.
    #[error("polling cancelled")]
    Cancelled,

    /// The check reported an unrecoverable error.
    #[error(transparent)]
    Fatal(#[from] anyhow::Error),
}

/// Fixed delay and attempt cap for a poll
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PollPolicy {
    /// Delay between attempts
    pub delay: Duration,
    /// Total attempts (1 = no retry)
    pub max_attempts: u32,
}

impl Default for PollPolicy {
    fn default() -> Self {
        // 60 attempts at 5s puts a ~5 minute ceiling on each poll.
        Self {
            delay: Duration::from_secs(5),
            max_attempts: 60,
        }
    }
}

/// Repeatedly invoke `check` until it reports [`PollState::Done`]
///
/// The first check runs immediately. On [`PollState::Retry`] the fixed delay
/// elapses before the next attempt, racing the cancellation token; the token
/// firing unblocks the wait at once. Exhaustion returns the last retry
/// reason rather than escalating; callers decide whether that is fatal.
pub async fn poll_until<F, Fut>(
    policy: &PollPolicy,
    cancel: &CancellationToken,
    mut check: F,
) -> Result<(), PollError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<PollState, anyhow::Error>>,
{
    let max_attempts = policy.max_attempts.max(1);
    let mut last = String::from("condition never checked");

    for attempt in 1..=max_attempts {
        if cancel.is_cancelled() {
            return Err(PollError::Cancelled);
        }
        match check().await {
            Ok(PollState::Done) => return Ok(()),
            Ok(PollState::Retry(reason)) => {
                debug!(attempt, reason = %reason, "condition not met");
                last = reason;
            }
            Err(e) => return Err(PollError::Fatal(e)),
        }
        if attempt == max_attempts {
            break;
        }
        tokio::select! {
            _ = tokio::time::sleep(policy.delay) => {}
            _ = cancel.cancelled() => return Err(PollError::Cancelled),
        }
    }

    Err(PollError::Exhausted {
        attempts: max_attempts,
        last,
    })
}
