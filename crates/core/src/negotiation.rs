//! The negotiation flow that owns rounds, offers and the final deal.
//!
//! [`Negotiation`] is the single source of truth for target prices and
//! counter-offers. It hands read-only [`RoundProps`] to the price input and
//! deadlines to the countdowns, and reacts to what they report back.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::{
    error::BargainError,
    models::{seconds_until, NegotiationRound, Price},
    round::RoundProps,
};

/// The item being bargained for.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Product {
    /// Display name.
    pub name: String,
    /// Listed price; bids must be strictly below it.
    pub base_price: Price,
    /// Symbol used when rendering prices.
    pub currency_symbol: String,
}

impl Product {
    /// Render a price in this product's currency.
    pub fn format(&self, price: Price) -> String {
        price.format_with(&self.currency_symbol)
    }
}

/// Tunables for a negotiation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NegotiationSettings {
    /// Number of bargaining rounds offered.
    pub total_rounds: u32,
    /// How long a counter-offer stays open.
    pub offer_window: Duration,
    /// How long an accepted price is held.
    pub hold_duration: Duration,
    /// Rounding step for suggested prices.
    pub suggestion_step: u64,
}

impl Default for NegotiationSettings {
    fn default() -> Self {
        Self {
            total_rounds: 2,
            offer_window: Duration::seconds(30),
            hold_duration: Duration::minutes(15),
            suggestion_step: 10,
        }
    }
}

/// Where the current round stands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RoundPhase {
    /// Waiting for the user to bid.
    Idle,
    /// Bid sent, waiting for the supplier.
    SubmittingBid,
    /// Counter-offer on the table.
    ReceivedCounter,
    /// Deal booked or attempts used up.
    Completed,
}

/// Which price to book in the final round.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PriceChoice {
    /// The price locked in the first round.
    Safe,
    /// The final round's counter-offer.
    Final,
}

/// Bid forwarded to the bargaining backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct OfferRequest {
    /// 1-based round number.
    pub round: u32,
    /// User's target price.
    pub target: Price,
    /// Listed price.
    pub base_price: Price,
}

/// An accepted price with its booking hold.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Deal {
    /// Price the user will pay.
    pub price: Price,
    /// Listed price at the time of acceptance.
    pub base_price: Price,
    /// Round in which the deal was struck.
    pub round: u32,
    /// Final-round selection, when one was made.
    pub choice: Option<PriceChoice>,
    /// When the user accepted.
    pub accepted_at: DateTime<Utc>,
    /// When the price hold lapses.
    pub hold_expires_at: DateTime<Utc>,
}

impl Deal {
    /// Amount saved against the listed price.
    pub fn savings(&self) -> u64 {
        self.base_price.get().saturating_sub(self.price.get())
    }
}

/// Result of accepting the counter-offer on the table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Acceptance {
    /// Early-round acceptance: price locked, next round opened.
    SafeDealLocked(Price),
    /// Final acceptance: booking hold created.
    Booked(Deal),
}

/// Result of declining the counter-offer on the table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decline {
    /// Moved on to this round.
    NextRound(u32),
    /// No rounds left; the negotiation ended without a deal.
    Exhausted,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct StandingOffer {
    price: Price,
    deadline: DateTime<Utc>,
}

/// Multi-round price negotiation for a single product.
#[derive(Debug, Clone)]
pub struct Negotiation {
    product: Product,
    settings: NegotiationSettings,
    round: u32,
    phase: RoundPhase,
    current: NegotiationRound,
    last_target: Option<Price>,
    previous_offer: Option<StandingOffer>,
    safe_deal: Option<Price>,
    selection: Option<PriceChoice>,
    deal: Option<Deal>,
}

impl Negotiation {
    /// Start at round one with nothing submitted.
    pub fn new(product: Product, settings: NegotiationSettings) -> Self {
        let settings = NegotiationSettings {
            total_rounds: settings.total_rounds.max(1),
            ..settings
        };
        Self {
            product,
            settings,
            round: 1,
            phase: RoundPhase::Idle,
            current: NegotiationRound::new(),
            last_target: None,
            previous_offer: None,
            safe_deal: None,
            selection: None,
            deal: None,
        }
    }

    /// Product under negotiation.
    pub fn product(&self) -> &Product {
        &self.product
    }

    /// Active settings.
    pub fn settings(&self) -> &NegotiationSettings {
        &self.settings
    }

    /// Current 1-based round.
    pub fn round(&self) -> u32 {
        self.round
    }

    /// Rounds available in total.
    pub fn total_rounds(&self) -> u32 {
        self.settings.total_rounds
    }

    /// Whether this is the last round.
    pub fn is_final_round(&self) -> bool {
        self.round >= self.settings.total_rounds
    }

    /// Current phase.
    pub fn phase(&self) -> RoundPhase {
        self.phase
    }

    /// Target and counter-offer of the current round.
    pub fn current(&self) -> &NegotiationRound {
        &self.current
    }

    /// Last submitted target, kept across rounds for reuse.
    pub fn last_target(&self) -> Option<Price> {
        self.last_target
    }

    /// Price locked in an earlier round.
    pub fn safe_deal(&self) -> Option<Price> {
        self.safe_deal
    }

    /// Final-round selection.
    pub fn selection(&self) -> Option<PriceChoice> {
        self.selection
    }

    /// Booked deal, once accepted.
    pub fn deal(&self) -> Option<&Deal> {
        self.deal.as_ref()
    }

    /// Counter-offer on the table.
    pub fn counter_offer(&self) -> Option<Price> {
        self.current.counter_offer
    }

    /// Deadline of the counter-offer on the table.
    pub fn offer_deadline(&self) -> Option<DateTime<Utc>> {
        self.current.counter_offer?;
        self.current.counter_offer_deadline
    }

    /// Declined offer that can still be taken, with its deadline.
    pub fn previous_offer(&self) -> Option<(Price, DateTime<Utc>)> {
        self.previous_offer.map(|offer| (offer.price, offer.deadline))
    }

    /// Send a bid. Bidding while a counter-offer is shown replaces it.
    pub fn submit(&mut self, price: Price, now: DateTime<Utc>) -> Result<OfferRequest, BargainError> {
        match self.phase {
            RoundPhase::Completed => return Err(BargainError::Completed),
            RoundPhase::SubmittingBid => return Err(BargainError::AlreadySubmitting),
            RoundPhase::Idle | RoundPhase::ReceivedCounter => {}
        }
        if price >= self.product.base_price {
            return Err(BargainError::OfferTooHigh {
                offer: price,
                base: self.product.base_price,
            });
        }

        self.prune_previous(now);
        self.current.clear_offer();
        self.current.record_target(price);
        self.last_target = Some(price);
        self.phase = RoundPhase::SubmittingBid;
        info!(round = self.round, %price, "bid submitted");

        Ok(OfferRequest {
            round: self.round,
            target: price,
            base_price: self.product.base_price,
        })
    }

    /// Record the supplier's answer and open the offer window.
    ///
    /// Returns the deadline of the new counter-offer.
    pub fn receive_counter(
        &mut self,
        counter: Price,
        now: DateTime<Utc>,
    ) -> Result<DateTime<Utc>, BargainError> {
        if self.phase != RoundPhase::SubmittingBid {
            return Err(BargainError::NotAwaitingOffer);
        }
        let deadline = now + self.settings.offer_window;
        self.current.record_counter_offer(counter, deadline);
        self.phase = RoundPhase::ReceivedCounter;
        info!(round = self.round, %counter, %deadline, "counter-offer received");
        Ok(deadline)
    }

    /// The backend failed; let the user bid again.
    pub fn counter_failed(&mut self) {
        if self.phase == RoundPhase::SubmittingBid {
            self.phase = RoundPhase::Idle;
        }
    }

    /// Choose between the safe deal and the final offer.
    pub fn select(&mut self, choice: PriceChoice) -> Result<(), BargainError> {
        if self.phase == RoundPhase::Completed {
            return Err(BargainError::Completed);
        }
        if self.phase != RoundPhase::ReceivedCounter
            || !self.is_final_round()
            || self.safe_deal.is_none()
        {
            return Err(BargainError::SelectionUnavailable);
        }
        self.selection = Some(choice);
        Ok(())
    }

    /// Accept the counter-offer on the table.
    ///
    /// The deadline is re-checked against `now`, so an accept racing the
    /// offer's expiry is refused rather than honoured.
    pub fn accept(&mut self, now: DateTime<Utc>) -> Result<Acceptance, BargainError> {
        if self.phase == RoundPhase::Completed {
            return Err(BargainError::Completed);
        }
        if self.phase != RoundPhase::ReceivedCounter {
            return Err(BargainError::NoOffer);
        }
        let counter = self.current.counter_offer.ok_or(BargainError::NoOffer)?;
        if !self.current.offer_is_open(now) {
            self.expire(now);
            return Err(BargainError::OfferExpired);
        }

        if !self.is_final_round() {
            info!(round = self.round, %counter, "safe deal locked");
            self.safe_deal = Some(counter);
            self.advance_round();
            return Ok(Acceptance::SafeDealLocked(counter));
        }

        let price = match (self.selection, self.safe_deal) {
            (Some(PriceChoice::Safe), Some(safe)) => safe,
            _ => counter,
        };
        let choice = self.selection;
        Ok(Acceptance::Booked(self.book(price, choice, now)))
    }

    /// Take a previously declined offer whose window is still open.
    pub fn accept_previous(&mut self, now: DateTime<Utc>) -> Result<Deal, BargainError> {
        if self.phase == RoundPhase::Completed {
            return Err(BargainError::Completed);
        }
        let offer = self.previous_offer.ok_or(BargainError::NoOffer)?;
        if seconds_until(offer.deadline, now) == 0 {
            self.previous_offer = None;
            return Err(BargainError::OfferExpired);
        }
        Ok(self.book(offer.price, None, now))
    }

    /// Turn down the counter-offer on the table and move on.
    ///
    /// An offer that is still open is kept as the previous offer until its
    /// own deadline passes. The first round's offer also becomes the safe
    /// deal. A lapsed offer is withdrawn instead and nothing advances.
    pub fn decline(&mut self, now: DateTime<Utc>) -> Result<Decline, BargainError> {
        if self.phase == RoundPhase::Completed {
            return Err(BargainError::Completed);
        }
        if self.phase != RoundPhase::ReceivedCounter {
            return Err(BargainError::NoOffer);
        }
        if self.expire(now) {
            return Err(BargainError::OfferExpired);
        }
        if let (Some(price), Some(deadline)) =
            (self.current.counter_offer, self.current.counter_offer_deadline)
        {
            if seconds_until(deadline, now) > 0 {
                self.previous_offer = Some(StandingOffer { price, deadline });
            }
            if self.round == 1 {
                self.safe_deal = Some(price);
            }
        }

        if self.is_final_round() {
            info!(round = self.round, "all rounds used");
            self.current.clear_offer();
            self.previous_offer = None;
            self.phase = RoundPhase::Completed;
            return Ok(Decline::Exhausted);
        }
        self.advance_round();
        Ok(Decline::NextRound(self.round))
    }

    /// Drop the counter-offer if its deadline has passed.
    ///
    /// Returns `true` when an offer was withdrawn. The round stays open for
    /// another bid.
    pub fn expire(&mut self, now: DateTime<Utc>) -> bool {
        self.prune_previous(now);
        if self.phase != RoundPhase::ReceivedCounter || self.current.offer_is_open(now) {
            return false;
        }
        debug!(round = self.round, "counter-offer expired");
        self.current.clear_offer();
        self.selection = None;
        self.phase = RoundPhase::Idle;
        true
    }

    /// Seconds left on the previous offer, `None` once it is gone.
    pub fn previous_offer_seconds_left(&self, now: DateTime<Utc>) -> Option<u64> {
        self.previous_offer
            .map(|offer| seconds_until(offer.deadline, now))
            .filter(|secs| *secs > 0)
    }

    /// Inputs for the price entry control. Stale previous offers are
    /// withheld.
    pub fn round_props(&self, now: DateTime<Utc>) -> RoundProps {
        let seconds_left = self.previous_offer_seconds_left(now);
        RoundProps {
            last_target: self.last_target.map(|price| price.get() as f64),
            last_offer: seconds_left
                .and(self.previous_offer)
                .map(|offer| offer.price.get() as f64),
            last_offer_seconds_left: seconds_left,
            disabled: matches!(
                self.phase,
                RoundPhase::SubmittingBid | RoundPhase::Completed
            ),
        }
    }

    /// Suggested bids for the current round, never below `floor` nor above
    /// the supplier's latest price.
    pub fn suggestions(&self, floor: Price) -> Vec<Price> {
        if self.phase == RoundPhase::Completed {
            return Vec::new();
        }
        let Some(supplier) = self
            .current
            .counter_offer
            .or(self.safe_deal)
            .or(self.previous_offer.map(|offer| offer.price))
        else {
            return Vec::new();
        };

        let supplier = supplier.get() as f64;
        let user = self
            .last_target
            .map(|price| price.get() as f64)
            .unwrap_or(supplier);
        let floor = floor.get() as f64;
        let step = self.settings.suggestion_step.max(1) as f64;
        let snap = |value: f64| ((value / step).round() * step).max(floor).min(supplier);

        let candidates = match self.round {
            1 => vec![supplier * 0.92, supplier * 0.88, supplier * 0.85],
            2 => vec![
                (user + supplier) / 2.0,
                supplier * 0.94,
                floor + 0.3 * (supplier - floor),
            ],
            _ => vec![(user.min(supplier) + floor) / 2.0, supplier * 0.97],
        };

        let mut suggestions = Vec::with_capacity(candidates.len());
        for value in candidates.into_iter().map(snap) {
            if value < floor || value > supplier {
                continue;
            }
            if let Some(price) = Price::from_amount(value) {
                if !suggestions.contains(&price) {
                    suggestions.push(price);
                }
            }
        }
        suggestions
    }

    fn book(&mut self, price: Price, choice: Option<PriceChoice>, now: DateTime<Utc>) -> Deal {
        let deal = Deal {
            price,
            base_price: self.product.base_price,
            round: self.round,
            choice,
            accepted_at: now,
            hold_expires_at: now + self.settings.hold_duration,
        };
        info!(
            round = self.round,
            %price,
            savings = deal.savings(),
            hold_expires_at = %deal.hold_expires_at,
            "deal booked"
        );
        self.current.clear_offer();
        self.previous_offer = None;
        self.deal = Some(deal.clone());
        self.phase = RoundPhase::Completed;
        deal
    }

    fn advance_round(&mut self) {
        self.round += 1;
        self.current.begin();
        self.selection = None;
        self.phase = RoundPhase::Idle;
        debug!(round = self.round, "round started");
    }

    fn prune_previous(&mut self, now: DateTime<Utc>) {
        if let Some(offer) = self.previous_offer {
            if seconds_until(offer.deadline, now) == 0 {
                self.previous_offer = None;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::round::{InputMode, RoundAction, RoundInput};
    use crate::timer::{OfferTimer, TimerSource, TimerState};

    fn price(units: u64) -> Price {
        Price::new(units).unwrap()
    }

    fn negotiation(base: u64) -> Negotiation {
        Negotiation::new(
            Product {
                name: "Taj Palace, Deluxe Room".to_string(),
                base_price: price(base),
                currency_symbol: "₹".to_string(),
            },
            NegotiationSettings::default(),
        )
    }

    #[test]
    fn rejects_bids_at_or_above_base() {
        let mut flow = negotiation(10_000);
        let now = Utc::now();
        assert_eq!(
            flow.submit(price(10_000), now),
            Err(BargainError::OfferTooHigh {
                offer: price(10_000),
                base: price(10_000)
            })
        );
        assert_eq!(flow.phase(), RoundPhase::Idle);
        assert_eq!(flow.last_target(), None);
    }

    #[test]
    fn one_bid_in_flight_at_a_time() {
        let mut flow = negotiation(10_000);
        let now = Utc::now();
        flow.submit(price(8_000), now).unwrap();
        assert_eq!(
            flow.submit(price(8_100), now),
            Err(BargainError::AlreadySubmitting)
        );
        assert!(flow.round_props(now).disabled);

        flow.counter_failed();
        assert_eq!(flow.phase(), RoundPhase::Idle);
        assert_eq!(flow.last_target(), Some(price(8_000)));
    }

    #[test]
    fn first_acceptance_locks_safe_deal_then_final_selection_books() {
        let mut flow = negotiation(10_000);
        let now = Utc::now();

        let request = flow.submit(price(8_000), now).unwrap();
        assert_eq!(request.round, 1);
        flow.receive_counter(price(8_600), now).unwrap();
        assert_eq!(
            flow.accept(now + Duration::seconds(5)),
            Ok(Acceptance::SafeDealLocked(price(8_600)))
        );
        assert_eq!(flow.round(), 2);
        assert_eq!(flow.phase(), RoundPhase::Idle);
        assert_eq!(flow.current().target_price, None);
        assert_eq!(flow.last_target(), Some(price(8_000)));

        flow.submit(price(7_500), now).unwrap();
        flow.receive_counter(price(8_900), now).unwrap();
        flow.select(PriceChoice::Safe).unwrap();
        let Ok(Acceptance::Booked(deal)) = flow.accept(now + Duration::seconds(1)) else {
            panic!("expected a booking");
        };
        assert_eq!(deal.price, price(8_600));
        assert_eq!(deal.savings(), 1_400);
        assert_eq!(deal.choice, Some(PriceChoice::Safe));
        assert_eq!(deal.hold_expires_at, now + Duration::seconds(1) + Duration::minutes(15));
        assert_eq!(flow.phase(), RoundPhase::Completed);
        assert_eq!(flow.submit(price(5_000), now), Err(BargainError::Completed));
    }

    #[test]
    fn selection_only_in_final_round() {
        let mut flow = negotiation(10_000);
        let now = Utc::now();
        flow.submit(price(8_000), now).unwrap();
        flow.receive_counter(price(8_600), now).unwrap();
        assert_eq!(
            flow.select(PriceChoice::Final),
            Err(BargainError::SelectionUnavailable)
        );
    }

    #[test]
    fn accept_after_deadline_is_refused() {
        let mut flow = negotiation(10_000);
        let now = Utc::now();
        flow.submit(price(8_000), now).unwrap();
        let deadline = flow.receive_counter(price(8_600), now).unwrap();
        assert_eq!(flow.accept(deadline), Err(BargainError::OfferExpired));
        assert_eq!(flow.phase(), RoundPhase::Idle);
        assert_eq!(flow.counter_offer(), None);
        assert_eq!(flow.round(), 1);
    }

    #[test]
    fn declined_offer_stays_acceptable_until_its_deadline() {
        let mut flow = negotiation(10_000);
        let now = Utc::now();
        flow.submit(price(8_000), now).unwrap();
        flow.receive_counter(price(8_600), now).unwrap();

        let later = now + Duration::seconds(10);
        assert_eq!(flow.decline(later), Ok(Decline::NextRound(2)));
        assert_eq!(flow.safe_deal(), Some(price(8_600)));

        let props = flow.round_props(later);
        assert_eq!(props.last_offer, Some(8_600.0));
        assert_eq!(props.last_offer_seconds_left, Some(20));
        assert_eq!(props.last_target, Some(8_000.0));

        let lapsed = now + Duration::seconds(30);
        let props = flow.round_props(lapsed);
        assert_eq!(props.last_offer, None);
        assert_eq!(props.last_offer_seconds_left, None);
        assert_eq!(flow.accept_previous(lapsed), Err(BargainError::OfferExpired));
    }

    #[test]
    fn accept_previous_books_declined_price() {
        let mut flow = negotiation(10_000);
        let now = Utc::now();
        flow.submit(price(8_000), now).unwrap();
        flow.receive_counter(price(8_600), now).unwrap();
        flow.decline(now).unwrap();

        let deal = flow.accept_previous(now + Duration::seconds(29)).unwrap();
        assert_eq!(deal.price, price(8_600));
        assert_eq!(deal.round, 2);
        assert_eq!(flow.phase(), RoundPhase::Completed);
    }

    #[test]
    fn declining_final_round_exhausts() {
        let mut flow = negotiation(10_000);
        let now = Utc::now();
        flow.submit(price(8_000), now).unwrap();
        flow.receive_counter(price(8_600), now).unwrap();
        flow.decline(now).unwrap();
        flow.submit(price(7_800), now).unwrap();
        flow.receive_counter(price(8_800), now).unwrap();
        assert_eq!(flow.decline(now), Ok(Decline::Exhausted));
        assert_eq!(flow.phase(), RoundPhase::Completed);
        assert!(flow.deal().is_none());
        assert!(flow.round_props(now).disabled);
    }

    #[test]
    fn lapsed_offer_cannot_be_declined_into_a_safe_deal() {
        let mut flow = negotiation(10_000);
        let now = Utc::now();
        flow.submit(price(8_000), now).unwrap();
        let deadline = flow.receive_counter(price(8_600), now).unwrap();

        assert_eq!(flow.decline(deadline), Err(BargainError::OfferExpired));
        assert_eq!(flow.safe_deal(), None);
        assert_eq!(flow.previous_offer(), None);
        assert_eq!(flow.round(), 1);
        assert_eq!(flow.phase(), RoundPhase::Idle);
        assert_eq!(flow.counter_offer(), None);
    }

    #[test]
    fn expiry_reopens_the_round() {
        let mut flow = negotiation(10_000);
        let now = Utc::now();
        flow.submit(price(8_000), now).unwrap();
        flow.receive_counter(price(8_600), now).unwrap();
        assert!(!flow.expire(now + Duration::seconds(29)));
        assert!(flow.expire(now + Duration::seconds(30)));
        assert_eq!(flow.phase(), RoundPhase::Idle);
        assert_eq!(flow.offer_deadline(), None);
        assert!(flow.submit(price(8_200), now + Duration::seconds(31)).is_ok());
    }

    #[test]
    fn suggestions_follow_round() {
        let mut flow = negotiation(12_000);
        let now = Utc::now();
        assert!(flow.suggestions(price(7_000)).is_empty());

        flow.submit(price(8_000), now).unwrap();
        flow.receive_counter(price(10_000), now).unwrap();
        assert_eq!(
            flow.suggestions(price(7_000)),
            vec![price(9_200), price(8_800), price(8_500)]
        );
        assert_eq!(flow.suggestions(price(9_000)), vec![price(9_200), price(9_000)]);

        flow.accept(now).unwrap();
        // Round two suggests around the locked safe deal.
        assert_eq!(
            flow.suggestions(price(7_000)),
            vec![price(9_000), price(9_400), price(7_900)]
        );
    }

    #[test]
    fn first_bid_round_trip_through_input_and_timer() {
        let now = Utc::now();
        let mut flow = negotiation(5_000);
        let mut input = RoundInput::new(flow.round_props(now));
        let timer = OfferTimer::new(
            Some(now + Duration::seconds(200)),
            180,
            TimerSource::Session,
            now,
        );
        assert_eq!(input.mode(), InputMode::New);
        assert_eq!(timer.state(), TimerState::Active(200));

        input.set_text("1000");
        assert_eq!(input.buffer(), "1000");
        let Some(RoundAction::Send(bid)) = input.submit() else {
            panic!("expected a bid");
        };
        assert_eq!(bid, price(1_000));
        flow.submit(bid, now).unwrap();

        input.set_props(flow.round_props(now));
        assert_eq!(input.mode(), InputMode::Reuse);
        assert_eq!(input.buffer(), "1000");
    }
}
