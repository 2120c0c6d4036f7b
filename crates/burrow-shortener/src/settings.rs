use std::time::Duration;
use typed_builder::TypedBuilder;

pub const DEFAULT_ALLOCATION_ATTEMPTS: u32 = 5;
pub const DEFAULT_CREATE_ATTEMPTS: u32 = 3;
pub const DEFAULT_CLICK_ATTEMPTS: u32 = 5;

/// Backoff schedule for optimistic writes that lose a versionstamp check.
///
/// Attempt `n` (zero-based) waits `initial_backoff * multiplier^n`, capped at
/// `max_backoff`, before the next read-modify-write round. A policy with
/// `max_attempts == 1` never retries.
#[derive(Debug, Clone, PartialEq, Eq, TypedBuilder)]
pub struct RetryPolicy {
    #[builder(default = DEFAULT_CLICK_ATTEMPTS)]
    pub max_attempts: u32,
    #[builder(default = Duration::from_millis(10))]
    pub initial_backoff: Duration,
    #[builder(default = Duration::from_millis(200))]
    pub max_backoff: Duration,
    #[builder(default = 2)]
    pub multiplier: u32,
}

impl RetryPolicy {
    /// A policy that makes exactly one attempt.
    pub fn no_retry() -> Self {
        Self::builder().max_attempts(1).build()
    }

    /// Delay to wait after the given failed attempt.
    pub fn backoff_duration(&self, attempt: u32) -> Duration {
        let factor = self.multiplier.saturating_pow(attempt);
        self.initial_backoff
            .saturating_mul(factor)
            .min(self.max_backoff)
    }

    pub(crate) fn attempts(&self) -> u32 {
        self.max_attempts.max(1)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::builder().build()
    }
}

/// Tuning knobs for [`ShortenerService`](crate::ShortenerService).
#[derive(Debug, Clone, TypedBuilder)]
pub struct ShortenerSettings {
    /// Candidate codes tried by the allocator before giving up.
    #[builder(default = DEFAULT_ALLOCATION_ATTEMPTS)]
    pub allocation_attempts: u32,
    /// Allocate-then-create rounds before a lost create race is reported.
    #[builder(default = DEFAULT_CREATE_ATTEMPTS)]
    pub create_attempts: u32,
    #[builder(default)]
    pub click_retry: RetryPolicy,
}

impl Default for ShortenerSettings {
    fn default() -> Self {
        Self::builder().build()
    }
}
