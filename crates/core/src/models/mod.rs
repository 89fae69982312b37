//! Shared domain models.

use std::{fmt, num::NonZeroU64};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A positive price in whole currency units.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Price(NonZeroU64);

impl Price {
    /// Build a price from whole units, rejecting zero.
    pub fn new(units: u64) -> Option<Self> {
        NonZeroU64::new(units).map(Self)
    }

    /// Round a raw amount to whole units.
    ///
    /// Halves round upwards (`2500.5` becomes `2501`). Non-finite, zero,
    /// negative and sub-half amounts yield `None`.
    pub fn from_amount(amount: f64) -> Option<Self> {
        if !amount.is_finite() || amount <= 0.0 {
            return None;
        }
        let rounded = (amount + 0.5).floor();
        if rounded >= u64::MAX as f64 {
            return None;
        }
        Self::new(rounded as u64)
    }

    /// Whole units.
    pub fn get(self) -> u64 {
        self.0.get()
    }

    /// Render with a currency symbol and thousands separators, e.g. `₹12,500`.
    pub fn format_with(self, symbol: &str) -> String {
        let digits = self.get().to_string();
        let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
        for (idx, ch) in digits.chars().enumerate() {
            if idx > 0 && (digits.len() - idx) % 3 == 0 {
                grouped.push(',');
            }
            grouped.push(ch);
        }
        format!("{symbol}{grouped}")
    }
}

impl fmt::Display for Price {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One bargaining cycle: the user's target and the supplier's answer.
///
/// The deadline is only meaningful while a counter-offer is present.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NegotiationRound {
    /// Last target price submitted by the user.
    pub target_price: Option<Price>,
    /// Last counter-offer returned by the backend.
    pub counter_offer: Option<Price>,
    /// Absolute time at which the counter-offer lapses.
    pub counter_offer_deadline: Option<DateTime<Utc>>,
}

impl NegotiationRound {
    /// Empty round with nothing submitted.
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a fresh round, dropping the previous target and offer.
    pub fn begin(&mut self) {
        self.target_price = None;
        self.clear_offer();
    }

    /// Record the price the user just submitted.
    pub fn record_target(&mut self, price: Price) {
        self.target_price = Some(price);
    }

    /// Record a counter-offer together with its deadline.
    pub fn record_counter_offer(&mut self, offer: Price, deadline: DateTime<Utc>) {
        self.counter_offer = Some(offer);
        self.counter_offer_deadline = Some(deadline);
    }

    /// Forget the standing counter-offer.
    pub fn clear_offer(&mut self) {
        self.counter_offer = None;
        self.counter_offer_deadline = None;
    }

    /// Whole seconds left on the counter-offer, floored at zero.
    ///
    /// `None` when there is no offer or no deadline attached to it.
    pub fn seconds_left(&self, now: DateTime<Utc>) -> Option<u64> {
        self.counter_offer?;
        let deadline = self.counter_offer_deadline?;
        Some(seconds_until(deadline, now))
    }

    /// True while a counter-offer exists and its deadline has not passed.
    pub fn offer_is_open(&self, now: DateTime<Utc>) -> bool {
        self.seconds_left(now).map(|secs| secs > 0).unwrap_or(false)
    }
}

/// `max(0, floor((deadline - now) / 1s))`.
pub fn seconds_until(deadline: DateTime<Utc>, now: DateTime<Utc>) -> u64 {
    let millis = (deadline - now).num_milliseconds();
    if millis <= 0 {
        0
    } else {
        (millis / 1000) as u64
    }
}
