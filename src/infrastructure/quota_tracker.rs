use std::time::Duration;

use chrono::{DateTime, Utc};

use crate::RateLimitSnapshot;

/// Tracks the provider-reported request budget for one crawl run.
///
/// The tracker only records authoritative values and computes wait
/// durations against a caller-supplied clock; suspending is the caller's
/// job. A provider that never reports quota never triggers throttling.
#[derive(Debug)]
pub struct QuotaTracker {
    remaining: Option<i32>,
    reset_at: Option<DateTime<Utc>>,
    safety_margin: Duration,
}

impl QuotaTracker {
    /// The margin added past the reset instant before resuming requests.
    pub const DEFAULT_SAFETY_MARGIN: Duration = Duration::from_secs(10);

    /// Creates a new `QuotaTracker` with the given safety margin.
    pub fn new(safety_margin: Duration) -> Self {
        Self {
            remaining: None,
            reset_at: None,
            safety_margin,
        }
    }

    /// Records the latest authoritative quota values from the provider.
    pub fn observe(&mut self, remaining: i32, reset_at: DateTime<Utc>) {
        self.remaining = Some(remaining);
        self.reset_at = Some(reset_at);
    }

    /// Records the quota values carried by a response.
    pub fn observe_snapshot(&mut self, snapshot: &RateLimitSnapshot) {
        self.observe(snapshot.remaining, snapshot.reset_at);
    }

    /// Whether the next request should pause until the quota resets.
    pub fn should_throttle(&self, low_water_mark: i32) -> bool {
        match self.remaining {
            Some(remaining) => remaining < low_water_mark,
            None => false,
        }
    }

    /// Time until the observed reset instant plus the safety margin, zero
    /// when the reset has already passed or was never observed.
    pub fn wait_duration(&self, now: DateTime<Utc>) -> Duration {
        match self.reset_at {
            Some(reset_at) if reset_at > now => {
                (reset_at - now).to_std().unwrap_or_default() + self.safety_margin
            }
            _ => Duration::ZERO,
        }
    }
}

impl Default for QuotaTracker {
    fn default() -> Self {
        Self::new(Self::DEFAULT_SAFETY_MARGIN)
    }
}
