//! Bounded retry around read-modify-write units that may hit a version
//! conflict.
//!
//! The wrapped operation must be safe to re-run from scratch: every attempt
//! re-reads the document, recomputes, and writes with the version it just
//! read.

use crate::error::{McError, CONFLICT_MESSAGE};
use std::time::Duration;

pub const DEFAULT_MAX_RETRIES: u32 = 3;
pub const DEFAULT_BASE_DELAY: Duration = Duration::from_millis(100);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Retries after the first attempt. Total calls are `max_retries + 1`.
    pub max_retries: u32,
    /// Delay before retry `n` is `base_delay * n`.
    pub base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: DEFAULT_MAX_RETRIES,
            base_delay: DEFAULT_BASE_DELAY,
        }
    }
}

impl RetryPolicy {
    pub fn new(max_retries: u32, base_delay: Duration) -> Self {
        Self {
            max_retries,
            base_delay,
        }
    }

    /// No retries: the first conflict propagates.
    #[cfg(test)]
    pub(crate) fn none() -> Self {
        Self::new(0, Duration::ZERO)
    }

    pub fn delay_for(&self, attempt: u32) -> Duration {
        self.base_delay.saturating_mul(attempt)
    }
}

// ---------------------------------------------------------------------------
// Conflict classification
// ---------------------------------------------------------------------------

/// Errors the retry helper knows how to classify.
pub trait Conflict {
    fn is_conflict(&self) -> bool;
}

impl Conflict for McError {
    fn is_conflict(&self) -> bool {
        McError::is_conflict(self)
    }
}

impl Conflict for anyhow::Error {
    fn is_conflict(&self) -> bool {
        if let Some(e) = self.downcast_ref::<McError>() {
            return e.is_conflict();
        }
        self.chain().any(|cause| {
            let msg = cause.to_string();
            msg.contains(CONFLICT_MESSAGE) || msg.contains("409 Conflict")
        })
    }
}

// ---------------------------------------------------------------------------
// Sleeping
// ---------------------------------------------------------------------------

pub trait Sleeper {
    fn sleep(&self, duration: Duration);
}

pub struct ThreadSleeper;

impl Sleeper for ThreadSleeper {
    fn sleep(&self, duration: Duration) {
        std::thread::sleep(duration);
    }
}

// ---------------------------------------------------------------------------
// with_retry
// ---------------------------------------------------------------------------

/// Run `op`, retrying on conflict with linear backoff.
pub fn with_retry<T, E, F>(policy: &RetryPolicy, op: F) -> Result<T, E>
where
    E: Conflict + std::fmt::Display,
    F: FnMut() -> Result<T, E>,
{
    with_retry_using(policy, &ThreadSleeper, op)
}

pub fn with_retry_using<T, E, F, S>(policy: &RetryPolicy, sleeper: &S, mut op: F) -> Result<T, E>
where
    E: Conflict + std::fmt::Display,
    F: FnMut() -> Result<T, E>,
    S: Sleeper + ?Sized,
{
    let mut attempt = 0;
    loop {
        match op() {
            Ok(value) => return Ok(value),
            Err(e) if e.is_conflict() && attempt < policy.max_retries => {
                attempt += 1;
                let delay = policy.delay_for(attempt);
                tracing::debug!(attempt, ?delay, "version conflict, retrying: {e}");
                sleeper.sleep(delay);
            }
            Err(e) => {
                if e.is_conflict() {
                    tracing::warn!(
                        retries = policy.max_retries,
                        "giving up after repeated version conflicts: {e}"
                    );
                }
                return Err(e);
            }
        }
    }
}
