//! Request pacing and retry budgets.
//!
//! Every page visit is followed by a randomized, uniformly distributed
//! pause so the crawl never settles into a machine-regular rhythm.
//! Ranges are per call site and fixed; only tests swap them for
//! [`Pacing::immediate`].

use std::time::Duration;

use rand::Rng;
use tracing::debug;

/// Uniform delay range in milliseconds (inclusive)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DelayRange {
    pub min_ms: u64,
    pub max_ms: u64,
}

impl DelayRange {
    pub const fn millis(min_ms: u64, max_ms: u64) -> Self {
        Self { min_ms, max_ms }
    }

    pub const ZERO: Self = Self::millis(0, 0);

    /// Draw a delay uniformly from the range
    pub fn sample(&self) -> Duration {
        if self.max_ms <= self.min_ms {
            return Duration::from_millis(self.min_ms);
        }
        Duration::from_millis(rand::rng().random_range(self.min_ms..=self.max_ms))
    }

    /// Sleep for a freshly sampled delay
    pub async fn wait(&self) {
        let delay = self.sample();
        if delay.is_zero() {
            return;
        }
        debug!(delay_ms = delay.as_millis() as u64, "Pacing");
        tokio::time::sleep(delay).await;
    }
}

/// Bounded attempts with a randomized pause between them
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Maximum number of attempts (including first try)
    pub max_attempts: u32,

    /// Pause before each retry
    pub backoff: DelayRange,
}

impl RetryPolicy {
    pub const fn new(max_attempts: u32, backoff: DelayRange) -> Self {
        Self {
            max_attempts,
            backoff,
        }
    }

    /// Check if we should retry based on attempt count (1-indexed)
    pub fn should_retry(&self, attempt: u32) -> bool {
        attempt < self.max_attempts
    }
}

/// Delays applied between page visits and retries
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pacing {
    /// After a class page loads, so the player's requests show up in telemetry
    pub page_settle: DelayRange,

    /// After each class, before the next page visit
    pub between_classes: DelayRange,

    /// Opening a course page
    pub course_retry: RetryPolicy,

    /// Fetching a class video
    pub video_retry: RetryPolicy,
}

impl Default for Pacing {
    fn default() -> Self {
        Self {
            page_settle: DelayRange::millis(2_500, 4_500),
            between_classes: DelayRange::millis(2_100, 5_900),
            course_retry: RetryPolicy::new(3, DelayRange::millis(5_000, 10_000)),
            video_retry: RetryPolicy::new(3, DelayRange::millis(3_100, 7_700)),
        }
    }
}

impl Pacing {
    /// Same attempt budgets, no waiting
    pub fn immediate() -> Self {
        let defaults = Self::default();
        Self {
            page_settle: DelayRange::ZERO,
            between_classes: DelayRange::ZERO,
            course_retry: RetryPolicy::new(defaults.course_retry.max_attempts, DelayRange::ZERO),
            video_retry: RetryPolicy::new(defaults.video_retry.max_attempts, DelayRange::ZERO),
        }
    }
}

/// Ceilings for waiting on pages and elements
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageTimeouts {
    /// Class and origin pages reaching `readyState == complete`
    pub page_load: Duration,

    /// Course pages reaching `readyState == complete`
    pub course_load: Duration,

    /// Class listing marker on a course page
    pub class_listing: Duration,

    /// Course anchors on a learning-path page
    pub course_listing: Duration,

    /// Each logged-in profile marker
    pub profile_marker: Duration,
}

impl Default for PageTimeouts {
    fn default() -> Self {
        Self {
            page_load: Duration::from_secs(30),
            course_load: Duration::from_secs(60),
            class_listing: Duration::from_secs(30),
            course_listing: Duration::from_secs(20),
            profile_marker: Duration::from_secs(20),
        }
    }
}
