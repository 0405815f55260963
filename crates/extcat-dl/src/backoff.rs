use std::time::Duration;

pub const DEFAULT_BASE: Duration = Duration::from_secs(5);
pub const DEFAULT_CAP: Duration = Duration::from_secs(60);

/// Capped exponential backoff: `min(2^attempt * base, cap)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Backoff {
    pub base: Duration,
    pub cap: Duration,
}

impl Default for Backoff {
    fn default() -> Self {
        Self {
            base: DEFAULT_BASE,
            cap: DEFAULT_CAP,
        }
    }
}

impl Backoff {
    pub fn new(base: Duration, cap: Duration) -> Self {
        Self {
            base,
            cap,
        }
    }

    /// Delay to apply after the zero-based `attempt` failed.
    pub fn delay_for(&self, attempt: u32) -> Duration {
        2u32.checked_pow(attempt)
            .and_then(|factor| self.base.checked_mul(factor))
            .map_or(self.cap, |delay| delay.min(self.cap))
    }
}

/// Wait before retrying after a transport failure: `2^(attempt + 1)` seconds.
pub fn transport_retry_delay(attempt: u32) -> Duration {
    Duration::from_secs(2u64.saturating_pow(attempt.saturating_add(1)))
}
