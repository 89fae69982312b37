//! Reuse-or-enter-new price control for a negotiation round.
//!
//! [`RoundInput`] owns the input mode and the free-text buffer. User
//! operations return an optional [`RoundAction`] for the embedding flow to
//! act on; `None` means nothing fires.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::models::Price;

/// Keystrokes past this many digits are ignored. Pasted text is kept whole.
const MAX_BUFFER_DIGITS: usize = 12;

/// Whether the footer offers the previous target or a text field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum InputMode {
    Reuse,
    New,
}

/// Values supplied by the negotiation flow on every render.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct RoundProps {
    /// Previous round's target price.
    pub last_target: Option<f64>,
    /// Standing counter-offer.
    pub last_offer: Option<f64>,
    /// Seconds left on the standing counter-offer.
    pub last_offer_seconds_left: Option<u64>,
    /// Suppresses every interaction.
    pub disabled: bool,
}

impl RoundProps {
    fn accept_visible(&self) -> bool {
        self.last_offer.is_some() && self.last_offer_seconds_left.map(|s| s > 0).unwrap_or(false)
    }
}

/// Outcome of a user action.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoundAction {
    /// Submit this target price.
    Send(Price),
    /// Take the standing counter-offer.
    AcceptPrevious,
}

/// State for the price entry footer.
#[derive(Debug, Clone)]
pub struct RoundInput {
    props: RoundProps,
    mode: InputMode,
    buffer: String,
}

impl RoundInput {
    pub fn new(props: RoundProps) -> Self {
        let mut input = Self {
            props,
            mode: InputMode::New,
            buffer: String::new(),
        };
        if let Some(price) = reuse_price(&props) {
            input.seed(price);
        }
        input
    }

    /// Apply fresh props from the parent.
    ///
    /// A newly arrived target switches back to reuse mode and reseeds the
    /// buffer. Anything else keeps the current mode and typed text.
    pub fn set_props(&mut self, props: RoundProps) {
        let target_changed = props.last_target != self.props.last_target;
        self.props = props;
        if target_changed {
            if let Some(price) = reuse_price(&props) {
                self.seed(price);
            }
        }
    }

    fn seed(&mut self, price: Price) {
        self.mode = InputMode::Reuse;
        self.buffer = price.to_string();
    }

    pub fn props(&self) -> &RoundProps {
        &self.props
    }

    pub fn mode(&self) -> InputMode {
        self.mode
    }

    /// Current digits-only text.
    pub fn buffer(&self) -> &str {
        &self.buffer
    }

    pub fn is_disabled(&self) -> bool {
        self.props.disabled
    }

    /// Rounded previous target, if the reuse button can fire.
    pub fn reuse_price(&self) -> Option<Price> {
        reuse_price(&self.props)
    }

    pub fn can_reuse(&self) -> bool {
        !self.props.disabled && self.reuse_price().is_some()
    }

    /// Whether the accept-previous-offer affordance is shown.
    pub fn can_accept_previous(&self) -> bool {
        !self.props.disabled && self.props.accept_visible()
    }

    /// Leave reuse mode for free-text entry. The buffer is kept.
    pub fn enter_new_mode(&mut self) {
        if self.props.disabled {
            return;
        }
        self.mode = InputMode::New;
    }

    /// Replace the buffer, keeping only ASCII digits.
    pub fn set_text(&mut self, text: &str) {
        if self.props.disabled {
            return;
        }
        self.buffer = sanitize_digits(text);
    }

    pub fn push_char(&mut self, ch: char) {
        if self.props.disabled || !ch.is_ascii_digit() {
            return;
        }
        if self.buffer.len() < MAX_BUFFER_DIGITS {
            self.buffer.push(ch);
        }
    }

    pub fn backspace(&mut self) {
        if self.props.disabled {
            return;
        }
        self.buffer.pop();
    }

    pub fn clear(&mut self) {
        if self.props.disabled {
            return;
        }
        self.buffer.clear();
    }

    /// Submit the typed price. Empty, zero and unparseable text is ignored.
    pub fn submit(&mut self) -> Option<RoundAction> {
        if self.props.disabled || self.mode != InputMode::New {
            return None;
        }
        let price = self.buffer.parse::<u64>().ok().and_then(Price::new);
        match price {
            Some(price) => {
                debug!(%price, "round input submitted");
                Some(RoundAction::Send(price))
            }
            None => {
                debug!(buffer = %self.buffer, "round input rejected");
                None
            }
        }
    }

    /// Resend the previous target unchanged.
    pub fn reuse(&mut self) -> Option<RoundAction> {
        if self.props.disabled {
            return None;
        }
        let price = self.reuse_price()?;
        debug!(%price, "round input reused previous target");
        Some(RoundAction::Send(price))
    }

    /// Take the standing counter-offer while its window is open.
    pub fn accept_previous(&mut self) -> Option<RoundAction> {
        if !self.can_accept_previous() {
            return None;
        }
        Some(RoundAction::AcceptPrevious)
    }
}

fn reuse_price(props: &RoundProps) -> Option<Price> {
    props.last_target.and_then(Price::from_amount)
}

/// Strip everything that is not an ASCII digit.
pub fn sanitize_digits(text: &str) -> String {
    text.chars()
        .filter(|ch| ch.is_ascii_digit())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn price(units: u64) -> Price {
        Price::new(units).unwrap()
    }

    #[test]
    fn strips_non_digits() {
        let mut input = RoundInput::new(RoundProps::default());
        input.set_text("12a3b");
        assert_eq!(input.buffer(), "123");

        input.set_text("₹ 1,500.00");
        assert_eq!(input.buffer(), "150000");

        input.clear();
        for ch in "9x8-7".chars() {
            input.push_char(ch);
        }
        assert_eq!(input.buffer(), "987");
    }

    #[test]
    fn rejects_empty_zero_and_overflow() {
        let mut input = RoundInput::new(RoundProps::default());
        assert_eq!(input.mode(), InputMode::New);
        assert_eq!(input.submit(), None);

        input.set_text("0");
        assert_eq!(input.submit(), None);
        input.set_text("-50");
        assert_eq!(input.buffer(), "50");
        input.set_text("000");
        assert_eq!(input.submit(), None);

        input.set_text("1500");
        assert_eq!(input.submit(), Some(RoundAction::Send(price(1500))));
    }

    #[test]
    fn oversized_paste_is_kept_and_refused() {
        let mut input = RoundInput::new(RoundProps::default());
        input.set_text("123456789012345678901");
        assert_eq!(input.buffer(), "123456789012345678901");
        assert_eq!(input.submit(), None);

        input.set_text("1234567890123");
        assert_eq!(input.buffer(), "1234567890123");
        assert_eq!(input.submit(), Some(RoundAction::Send(price(1_234_567_890_123))));
    }

    #[test]
    fn typing_stops_at_digit_cap() {
        let mut input = RoundInput::new(RoundProps::default());
        for ch in "1234567890123".chars() {
            input.push_char(ch);
        }
        assert_eq!(input.buffer(), "123456789012");
    }

    #[test]
    fn reuse_rounds_previous_target() {
        let mut input = RoundInput::new(RoundProps {
            last_target: Some(2500.7),
            ..RoundProps::default()
        });
        assert_eq!(input.mode(), InputMode::Reuse);
        assert_eq!(input.buffer(), "2501");
        assert_eq!(input.reuse(), Some(RoundAction::Send(price(2501))));
        // Submit only applies to free-text entry.
        assert_eq!(input.submit(), None);
    }

    #[test]
    fn new_mode_keeps_buffer() {
        let mut input = RoundInput::new(RoundProps {
            last_target: Some(1200.0),
            ..RoundProps::default()
        });
        input.enter_new_mode();
        assert_eq!(input.mode(), InputMode::New);
        assert_eq!(input.buffer(), "1200");
        input.backspace();
        input.push_char('5');
        assert_eq!(input.submit(), Some(RoundAction::Send(price(1205))));
    }

    #[test]
    fn accept_previous_requires_open_offer() {
        let mut input = RoundInput::new(RoundProps {
            last_offer: Some(900.0),
            last_offer_seconds_left: Some(0),
            ..RoundProps::default()
        });
        assert!(!input.can_accept_previous());
        assert_eq!(input.accept_previous(), None);

        input.set_props(RoundProps {
            last_offer: None,
            last_offer_seconds_left: Some(12),
            ..RoundProps::default()
        });
        assert_eq!(input.accept_previous(), None);

        input.set_props(RoundProps {
            last_offer: Some(900.0),
            last_offer_seconds_left: Some(12),
            ..RoundProps::default()
        });
        assert!(input.can_accept_previous());
        assert_eq!(input.accept_previous(), Some(RoundAction::AcceptPrevious));
    }

    #[test]
    fn disabled_blocks_everything() {
        let mut input = RoundInput::new(RoundProps {
            last_target: None,
            last_offer: Some(900.0),
            last_offer_seconds_left: Some(20),
            disabled: true,
        });
        input.set_text("100");
        input.push_char('1');
        assert_eq!(input.buffer(), "");
        assert!(!input.can_reuse());
        assert_eq!(input.reuse(), None);
        assert_eq!(input.submit(), None);
        assert_eq!(input.accept_previous(), None);
    }

    #[test]
    fn new_target_from_parent_switches_to_reuse() {
        let mut input = RoundInput::new(RoundProps::default());
        assert_eq!(input.mode(), InputMode::New);
        input.set_text("1000");
        assert_eq!(input.submit(), Some(RoundAction::Send(price(1000))));

        input.set_props(RoundProps {
            last_target: Some(1000.0),
            ..RoundProps::default()
        });
        assert_eq!(input.mode(), InputMode::Reuse);
        assert_eq!(input.buffer(), "1000");

        input.enter_new_mode();
        input.set_props(RoundProps {
            last_target: Some(1000.0),
            disabled: true,
            ..RoundProps::default()
        });
        assert_eq!(input.mode(), InputMode::New);
    }
}
