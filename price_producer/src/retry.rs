//! Bounded retry with linear backoff.
//!
//! Attempt `n` (1-based) that fails is followed by a wait of `base * n` before the next
//! one, including after the final attempt. The wait goes through a [`Sleeper`] so tests
//! can check the schedule without waiting.

use crate::shutdown::{Sleeper, Wake};
use log::warn;
use std::fmt::Display;
use std::time::Duration;

/// Retry limits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Backoff {
    /// Total attempts, at least 1.
    pub max_attempts: u32,
    /// Delay unit; attempt `n` waits `base * n` after failing.
    pub base: Duration,
}

impl Backoff {
    /// Broker connect policy: 5 attempts, 5 s base.
    pub const BROKER_CONNECT: Backoff = Backoff {
        max_attempts: 5,
        base: Duration::from_secs(5),
    };

    /// Wait after failed attempt number `attempt`.
    pub fn delay_for(&self, attempt: u32) -> Duration {
        self.base * attempt
    }
}

/// Why [`retry`] gave up.
#[derive(Debug, Clone, PartialEq)]
pub enum RetryError<E> {
    /// Every attempt failed; holds the attempt count and the last error.
    Exhausted {
        /// Attempts made.
        attempts: u32,
        /// Error from the last attempt.
        last: E,
    },
    /// A stop was requested while waiting between attempts.
    Interrupted {
        /// Attempts made.
        attempts: u32,
        /// Error from the last attempt.
        last: E,
    },
}

/// Run `op` until it succeeds or `policy` is exhausted. `op` receives the 1-based
/// attempt number.
pub fn retry<T, E, F>(policy: Backoff, sleeper: &dyn Sleeper, mut op: F) -> Result<T, RetryError<E>>
where
    E: Display,
    F: FnMut(u32) -> Result<T, E>,
{
    let max_attempts = policy.max_attempts.max(1);
    let mut attempt = 1;
    loop {
        let err = match op(attempt) {
            Ok(value) => return Ok(value),
            Err(err) => err,
        };
        let delay = policy.delay_for(attempt);
        warn!(
            "Attempt {}/{} failed: {}. Retrying in {}s",
            attempt,
            max_attempts,
            err,
            delay.as_secs()
        );
        if sleeper.sleep(delay) == Wake::Stopped {
            return Err(RetryError::Interrupted {
                attempts: attempt,
                last: err,
            });
        }
        if attempt >= max_attempts {
            return Err(RetryError::Exhausted {
                attempts: attempt,
                last: err,
            });
        }
        attempt += 1;
    }
}
