use chrono::{DateTime, Duration, Utc};
use parking_lot::Mutex;
use tokio::time::Instant;

/// Source of the current time for deadline comparisons.
pub trait Clock: Send + Sync {
    /// Current wall-clock time.
    fn now(&self) -> DateTime<Utc>;
}

/// System wall clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Wall time anchored once and advanced by the tokio monotonic clock.
///
/// Follows paused/advanced tokio time, so it never steps backwards and can
/// be driven deterministically in tests.
#[derive(Debug, Clone)]
pub struct MonotonicClock {
    anchor_wall: DateTime<Utc>,
    anchor: Instant,
}

impl MonotonicClock {
    /// Anchor at the current system time.
    pub fn new() -> Self {
        Self::anchored_at(Utc::now())
    }

    /// Anchor at an explicit wall time.
    pub fn anchored_at(anchor_wall: DateTime<Utc>) -> Self {
        Self {
            anchor_wall,
            anchor: Instant::now(),
        }
    }
}

impl Default for MonotonicClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for MonotonicClock {
    fn now(&self) -> DateTime<Utc> {
        let elapsed = Duration::from_std(self.anchor.elapsed()).unwrap_or_else(|_| Duration::zero());
        self.anchor_wall + elapsed
    }
}

/// Manually driven clock.
#[derive(Debug)]
pub struct ManualClock {
    now: Mutex<DateTime<Utc>>,
}

impl ManualClock {
    /// Start at the given instant.
    pub fn new(now: DateTime<Utc>) -> Self {
        Self {
            now: Mutex::new(now),
        }
    }

    /// Jump to an absolute time. Going backwards is allowed.
    pub fn set(&self, now: DateTime<Utc>) {
        *self.now.lock() = now;
    }

    /// Move forward by `delta`.
    pub fn advance(&self, delta: Duration) {
        let mut now = self.now.lock();
        *now = *now + delta;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock()
    }
}
