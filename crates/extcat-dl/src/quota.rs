//! Bookkeeping for the remote API quota.
//!
//! The tracker never performs I/O; the client feeds it response headers (or a quota-status
//! body) and asks it whether the next request should wait first.

use std::time::{Duration, SystemTime, UNIX_EPOCH};

use ureq::http::HeaderMap;

use crate::github::RateLimitStatus;

pub const RATE_LIMIT_REMAINING: &str = "x-ratelimit-remaining";
pub const RATE_LIMIT_RESET: &str = "x-ratelimit-reset";

/// Remaining quota below which requests are preceded by a quota-status check.
pub const LOW_WATER_MARK: u64 = 10;

/// Last observed quota. `None` means nothing has been observed yet.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct QuotaState {
    pub remaining: Option<u64>,
    pub reset_at: Option<u64>,
}

impl QuotaState {
    pub fn new(remaining: u64, reset_at: u64) -> Self {
        Self {
            remaining: Some(remaining),
            reset_at: Some(reset_at),
        }
    }

    /// Time left until the quota window refills, measured from `now` (unix seconds).
    ///
    /// Zero when the reset time is unknown or already passed.
    pub fn until_reset(&self, now: u64) -> Duration {
        let reset_at = self.reset_at.unwrap_or(0);
        Duration::from_secs(reset_at.saturating_sub(now))
    }
}

#[derive(Debug, Clone)]
pub struct QuotaTracker {
    state: QuotaState,
    low_water_mark: u64,
}

impl Default for QuotaTracker {
    fn default() -> Self {
        Self::new(LOW_WATER_MARK)
    }
}

impl QuotaTracker {
    pub fn new(low_water_mark: u64) -> Self {
        Self {
            state: QuotaState::default(),
            low_water_mark,
        }
    }

    pub fn state(&self) -> QuotaState {
        self.state
    }

    pub fn set_state(&mut self, state: QuotaState) {
        self.state = state;
    }

    pub fn low_water_mark(&self) -> u64 {
        self.low_water_mark
    }

    /// Records the rate-limit headers of a response.
    ///
    /// Missing or unparsable headers are recorded as `0`, so a response without quota
    /// information makes the next request confirm the quota first.
    pub fn observe(&mut self, headers: &HeaderMap) {
        self.state = QuotaState::new(
            header_u64(headers, RATE_LIMIT_REMAINING).unwrap_or(0),
            header_u64(headers, RATE_LIMIT_RESET).unwrap_or(0),
        );
    }

    /// Records the `core` section of a quota-status response.
    pub fn observe_status(&mut self, status: &RateLimitStatus) {
        self.state = QuotaState::new(status.remaining, status.reset);
    }

    pub fn should_preemptively_throttle(&self) -> bool {
        self.state
            .remaining
            .is_some_and(|remaining| remaining < self.low_water_mark)
    }

    pub fn is_low(&self, remaining: u64) -> bool {
        remaining < self.low_water_mark
    }
}

/// Reads a header as an unsigned integer.
pub fn header_u64(headers: &HeaderMap, name: &str) -> Option<u64> {
    headers
        .get(name)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.trim().parse().ok())
}

/// Current unix time in seconds.
pub fn now_unix() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}
