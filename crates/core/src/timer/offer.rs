#![allow(missing_docs)]

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::seconds_until;

/// Remaining seconds at or below which a deadline counts as expiring soon.
pub const DEFAULT_EXPIRING_THRESHOLD_SECS: u64 = 180;

/// Three-way classification of a running countdown.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TimerStatus {
    /// More than the threshold remains.
    Active(u64),
    /// `0 < remaining <= threshold`.
    ExpiringSoon(u64),
    /// Deadline reached.
    Expired,
}

impl TimerStatus {
    /// Seconds left, zero once expired.
    pub fn remaining(self) -> u64 {
        match self {
            TimerStatus::Active(secs) | TimerStatus::ExpiringSoon(secs) => secs,
            TimerStatus::Expired => 0,
        }
    }

    pub fn is_expired(self) -> bool {
        matches!(self, TimerStatus::Expired)
    }
}

/// Coarse state derived from an optional deadline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TimerState {
    NoDeadline,
    Active(u64),
    Expired,
}

/// Edge notifications emitted by [`OfferTimer::tick`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerEvent {
    /// Entered the warning band.
    ExpiringSoon,
    /// Reached the deadline. Reported once per deadline.
    Expired,
}

/// What a countdown is attached to. Only affects the messages shown.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TimerSource {
    /// A supplier counter-offer.
    Offer,
    /// A hotel search session.
    Session,
    /// A booking hold on an accepted price.
    PriceHold,
}

impl TimerSource {
    pub fn label(self) -> &'static str {
        match self {
            TimerSource::Offer => "Offer",
            TimerSource::Session => "Session",
            TimerSource::PriceHold => "Price hold",
        }
    }

    /// User-facing line for the given status.
    pub fn message(self, status: TimerStatus) -> String {
        match (self, status) {
            (TimerSource::Offer, TimerStatus::Expired) => {
                "Offer expired. Enter a new price to keep bargaining.".to_string()
            }
            (TimerSource::Session, TimerStatus::Expired) => {
                "Session expired. Refresh to see current prices.".to_string()
            }
            (TimerSource::PriceHold, TimerStatus::Expired) => {
                "Price hold expired. The price is no longer guaranteed.".to_string()
            }
            (TimerSource::Session, TimerStatus::ExpiringSoon(secs)) => {
                format!("Session expiring soon: {} left", format_remaining(secs))
            }
            (source, TimerStatus::ExpiringSoon(secs)) | (source, TimerStatus::Active(secs)) => {
                format!("{} expires in {}", source.label(), format_remaining(secs))
            }
        }
    }
}

impl fmt::Display for TimerSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// `M:SS` rendering of a second count.
pub fn format_remaining(secs: u64) -> String {
    format!("{}:{:02}", secs / 60, secs % 60)
}

/// Countdown towards an absolute deadline.
///
/// Pure state: callers feed it the current time through [`OfferTimer::tick`].
/// Remaining time never increases between resets and the expiry event is
/// reported at most once per deadline.
#[derive(Debug, Clone)]
pub struct OfferTimer {
    expires_at: Option<DateTime<Utc>>,
    threshold: u64,
    source: TimerSource,
    remaining: u64,
    warned: bool,
    expired_reported: bool,
}

impl OfferTimer {
    /// Build a timer and classify it against `now` straight away.
    pub fn new(
        expires_at: Option<DateTime<Utc>>,
        threshold: u64,
        source: TimerSource,
        now: DateTime<Utc>,
    ) -> Self {
        let mut timer = Self {
            expires_at: None,
            threshold,
            source,
            remaining: 0,
            warned: false,
            expired_reported: false,
        };
        timer.reset(expires_at, now);
        timer
    }

    /// Replace the deadline and rearm the once-only notifications.
    ///
    /// `None` stops the countdown entirely.
    pub fn reset(&mut self, expires_at: Option<DateTime<Utc>>, now: DateTime<Utc>) {
        self.expires_at = expires_at;
        self.remaining = expires_at
            .map(|deadline| seconds_until(deadline, now))
            .unwrap_or(0);
        self.warned = false;
        self.expired_reported = false;
    }

    /// Recompute remaining time and report at most one edge.
    pub fn tick(&mut self, now: DateTime<Utc>) -> Option<TimerEvent> {
        let deadline = self.expires_at?;
        self.remaining = self.remaining.min(seconds_until(deadline, now));

        match self.status() {
            TimerStatus::Expired => {
                if self.expired_reported {
                    None
                } else {
                    self.expired_reported = true;
                    Some(TimerEvent::Expired)
                }
            }
            TimerStatus::ExpiringSoon(_) if !self.warned => {
                self.warned = true;
                Some(TimerEvent::ExpiringSoon)
            }
            _ => None,
        }
    }

    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        self.expires_at
    }

    pub fn source(&self) -> TimerSource {
        self.source
    }

    pub fn threshold(&self) -> u64 {
        self.threshold
    }

    /// Seconds left as of the last reset or tick.
    pub fn remaining(&self) -> u64 {
        self.remaining
    }

    /// Three-way status. A timer without a deadline reports `Expired`;
    /// check [`OfferTimer::is_running`] or [`OfferTimer::state`] first.
    pub fn status(&self) -> TimerStatus {
        if self.remaining == 0 {
            TimerStatus::Expired
        } else if self.remaining <= self.threshold {
            TimerStatus::ExpiringSoon(self.remaining)
        } else {
            TimerStatus::Active(self.remaining)
        }
    }

    pub fn state(&self) -> TimerState {
        match self.expires_at {
            None => TimerState::NoDeadline,
            Some(_) if self.remaining == 0 => TimerState::Expired,
            Some(_) => TimerState::Active(self.remaining),
        }
    }

    /// True while a deadline is set and has not yet been reached.
    pub fn is_running(&self) -> bool {
        matches!(self.state(), TimerState::Active(_))
    }

    /// Display line for the current status, `None` without a deadline.
    pub fn message(&self) -> Option<String> {
        self.expires_at?;
        Some(self.source.message(self.status()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn timer_at(offset_secs: i64, now: DateTime<Utc>) -> OfferTimer {
        OfferTimer::new(
            Some(now + Duration::seconds(offset_secs)),
            DEFAULT_EXPIRING_THRESHOLD_SECS,
            TimerSource::Offer,
            now,
        )
    }

    #[test]
    fn past_or_present_deadline_expires_once() {
        let now = Utc::now();
        for offset in [-3600, -1, 0] {
            let mut timer = timer_at(offset, now);
            assert_eq!(timer.status(), TimerStatus::Expired);
            assert_eq!(timer.state(), TimerState::Expired);

            let mut expired = 0;
            for step in 0..5 {
                if timer.tick(now + Duration::seconds(step)) == Some(TimerEvent::Expired) {
                    expired += 1;
                }
            }
            assert_eq!(expired, 1, "offset {offset}");
        }
    }

    #[test]
    fn crosses_threshold_before_expiring() {
        let now = Utc::now();
        let mut timer = timer_at(182, now);
        assert_eq!(timer.status(), TimerStatus::Active(182));

        assert_eq!(timer.tick(now + Duration::seconds(1)), None);
        assert_eq!(timer.status(), TimerStatus::Active(181));

        assert_eq!(
            timer.tick(now + Duration::seconds(2)),
            Some(TimerEvent::ExpiringSoon)
        );
        assert_eq!(timer.status(), TimerStatus::ExpiringSoon(180));

        let mut seen_expiring = false;
        let mut expirations = 0;
        for step in 3..=190 {
            let event = timer.tick(now + Duration::seconds(step));
            if let TimerStatus::ExpiringSoon(_) = timer.status() {
                seen_expiring = true;
            }
            assert_ne!(event, Some(TimerEvent::ExpiringSoon));
            if event == Some(TimerEvent::Expired) {
                expirations += 1;
                assert_eq!(step, 182);
            }
        }
        assert!(seen_expiring);
        assert_eq!(expirations, 1);
        assert_eq!(timer.remaining(), 0);
    }

    #[test]
    fn remaining_never_increases_when_clock_steps_back() {
        let now = Utc::now();
        let mut timer = timer_at(200, now);
        timer.tick(now + Duration::seconds(50));
        assert_eq!(timer.remaining(), 150);
        timer.tick(now);
        assert_eq!(timer.remaining(), 150);
    }

    #[test]
    fn expired_is_terminal_until_reset() {
        let now = Utc::now();
        let mut timer = timer_at(1, now);
        assert_eq!(
            timer.tick(now + Duration::seconds(1)),
            Some(TimerEvent::Expired)
        );
        assert_eq!(timer.tick(now - Duration::seconds(30)), None);
        assert_eq!(timer.status(), TimerStatus::Expired);

        let later = now + Duration::seconds(2);
        timer.reset(Some(later + Duration::seconds(500)), later);
        assert_eq!(timer.status(), TimerStatus::Active(500));
        timer.reset(Some(later + Duration::seconds(90)), later);
        assert_eq!(timer.status(), TimerStatus::ExpiringSoon(90));
        assert_eq!(
            timer.tick(later + Duration::seconds(90)),
            Some(TimerEvent::Expired)
        );
    }

    #[test]
    fn missing_deadline_never_ticks() {
        let now = Utc::now();
        let mut timer = OfferTimer::new(None, 180, TimerSource::Session, now);
        assert_eq!(timer.state(), TimerState::NoDeadline);
        assert!(!timer.is_running());
        assert_eq!(timer.tick(now), None);
        assert_eq!(timer.message(), None);
    }

    #[test]
    fn messages_follow_source() {
        assert_eq!(
            TimerSource::Offer.message(TimerStatus::Active(75)),
            "Offer expires in 1:15"
        );
        assert_eq!(
            TimerSource::Session.message(TimerStatus::ExpiringSoon(9)),
            "Session expiring soon: 0:09 left"
        );
        assert!(TimerSource::PriceHold
            .message(TimerStatus::Expired)
            .starts_with("Price hold expired"));
    }
}
