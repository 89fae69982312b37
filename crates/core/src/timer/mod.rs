//! Offer and session countdowns.

/// Wall-clock sources used to evaluate deadlines.
pub mod clock;
/// Pure countdown state machine.
pub mod offer;
/// Tokio task that ticks an [`OfferTimer`] once per period.
pub mod runner;

pub use clock::{Clock, ManualClock, MonotonicClock, SystemClock};
pub use offer::{
    format_remaining, OfferTimer, TimerEvent, TimerSource, TimerState, TimerStatus,
    DEFAULT_EXPIRING_THRESHOLD_SECS,
};
pub use runner::{TimerHandle, TimerSettings, TimerUpdate};
