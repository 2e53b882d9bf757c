//! Baseline refresh policy.
//!
//! Once per cycle the driver asks [`RefreshPolicy::maybe_refresh`] whether the baselines
//! are due for a feed fetch. The window is measured on the monotonic clock from the last
//! *successful* fetch only: a failed attempt leaves the window untouched, so the next
//! cycle simply checks again against the old timestamp.

use crate::feed::FeedAdapter;
use crate::model::baseline::BaselineStore;
use chrono::{DateTime, Utc};
use log::{debug, info, warn};
use price_common::Instrument;
use std::time::{Duration, Instant};

/// Result of one refresh check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshOutcome {
    /// Still inside the refresh window; the feed was not called.
    Skipped,
    /// The feed answered and this many baselines were overwritten.
    Refreshed(usize),
    /// The feed was called but nothing usable came back.
    Unavailable,
}

impl RefreshOutcome {
    /// `true` only for [`RefreshOutcome::Refreshed`].
    pub fn is_live(&self) -> bool {
        matches!(self, RefreshOutcome::Refreshed(_))
    }
}

/// Staleness window around a [`FeedAdapter`].
pub struct RefreshPolicy {
    feed: Box<dyn FeedAdapter>,
    interval: Duration,
    last_success: Option<Instant>,
    last_success_at: Option<DateTime<Utc>>,
}

impl RefreshPolicy {
    /// Create a policy that calls `feed` at most once per `interval` after a success.
    pub fn new(feed: Box<dyn FeedAdapter>, interval: Duration) -> Self {
        Self {
            feed,
            interval,
            last_success: None,
            last_success_at: None,
        }
    }

    /// Refresh `store` from the feed if the window since the last success has elapsed.
    ///
    /// An adapter answer in which every entry is rejected counts as unavailable.
    pub fn maybe_refresh(&mut self, now: Instant, store: &mut BaselineStore) -> RefreshOutcome {
        if let Some(last) = self.last_success {
            let elapsed = now.saturating_duration_since(last);
            if elapsed < self.interval {
                debug!(
                    "Skipping feed refresh, next one due in {}s",
                    (self.interval - elapsed).as_secs()
                );
                return RefreshOutcome::Skipped;
            }
        }

        let instruments: Vec<Instrument> = store.instruments().collect();
        let observed = match self.feed.fetch(&instruments) {
            Some(prices) if !prices.is_empty() => prices,
            _ => {
                warn!("Price feed unavailable, keeping current baselines");
                return RefreshOutcome::Unavailable;
            }
        };

        let applied = store.apply_refresh(&observed);
        if applied == 0 {
            warn!("Price feed returned no usable prices, keeping current baselines");
            return RefreshOutcome::Unavailable;
        }

        self.last_success = Some(now);
        self.last_success_at = Some(Utc::now());
        info!("Refreshed {} baselines from the price feed", applied);
        RefreshOutcome::Refreshed(applied)
    }

    /// Wall-clock time of the last successful refresh, for reporting.
    pub fn last_success_at(&self) -> Option<DateTime<Utc>> {
        self.last_success_at
    }

    /// Configured minimum time between successful fetches.
    pub fn interval(&self) -> Duration {
        self.interval
    }
}
