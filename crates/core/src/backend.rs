//! Seam to the supplier bargaining service.

use parking_lot::Mutex;
use rand::{rngs::StdRng, Rng, SeedableRng};
use tracing::debug;

use crate::{error::BargainError, models::Price, negotiation::OfferRequest};

/// Chance that the supplier simply matches the bid.
const EXACT_MATCH_CHANCE: f64 = 0.1;

/// Something that answers a bid with a counter-offer.
pub trait BargainBackend: Send + Sync {
    /// Counter-offer for the given bid.
    fn counter_offer(&self, request: &OfferRequest) -> Result<Price, BargainError>;
}

/// Offline supplier used for demos and tests.
///
/// Counters by adding back part of the gap between bid and listed price:
/// 30% in the first round, 40% or 60% in the second, and 20% or 80% after
/// that. Occasionally matches the bid outright.
pub struct SimulatedBackend {
    rng: Mutex<StdRng>,
    match_chance: f64,
}

impl SimulatedBackend {
    /// Backend seeded from system entropy.
    pub fn new() -> Self {
        Self {
            rng: Mutex::new(StdRng::from_entropy()),
            match_chance: EXACT_MATCH_CHANCE,
        }
    }

    /// Reproducible backend.
    pub fn with_seed(seed: u64) -> Self {
        Self {
            rng: Mutex::new(StdRng::seed_from_u64(seed)),
            match_chance: EXACT_MATCH_CHANCE,
        }
    }

    /// Override the exact-match probability (clamped to `0..=1`).
    pub fn match_chance(mut self, chance: f64) -> Self {
        self.match_chance = chance.clamp(0.0, 1.0);
        self
    }

    fn gap_factor(&self, round: u32) -> f64 {
        let mut rng = self.rng.lock();
        match round {
            0 | 1 => 0.3,
            2 => {
                if rng.gen_bool(0.5) {
                    0.4
                } else {
                    0.6
                }
            }
            _ => {
                if rng.gen_bool(0.7) {
                    0.2
                } else {
                    0.8
                }
            }
        }
    }
}

impl Default for SimulatedBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl BargainBackend for SimulatedBackend {
    fn counter_offer(&self, request: &OfferRequest) -> Result<Price, BargainError> {
        let target = request.target.get();
        let base = request.base_price.get();
        if target >= base {
            return Ok(request.base_price);
        }

        if self.rng.lock().gen_bool(self.match_chance) {
            debug!(round = request.round, %request.target, "supplier matched bid");
            return Ok(request.target);
        }

        let factor = self.gap_factor(request.round);
        let gap = (base - target) as f64;
        let counter = Price::from_amount(target as f64 + gap * factor)
            .map(|price| price.get().clamp(target, base))
            .and_then(Price::new)
            .ok_or_else(|| BargainError::Backend("counter-offer out of range".to_string()))?;
        debug!(round = request.round, %request.target, %counter, factor, "supplier countered");
        Ok(counter)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(round: u32, target: u64, base: u64) -> OfferRequest {
        OfferRequest {
            round,
            target: Price::new(target).unwrap(),
            base_price: Price::new(base).unwrap(),
        }
    }

    #[test]
    fn first_round_adds_back_thirty_percent() {
        let backend = SimulatedBackend::with_seed(7).match_chance(0.0);
        let counter = backend.counter_offer(&request(1, 8000, 10000)).unwrap();
        assert_eq!(counter.get(), 8600);
    }

    #[test]
    fn later_rounds_stay_between_bid_and_base() {
        let backend = SimulatedBackend::with_seed(42).match_chance(0.0);
        for round in 2..=4 {
            for _ in 0..50 {
                let counter = backend.counter_offer(&request(round, 7000, 10000)).unwrap();
                assert!((7000..=10000).contains(&counter.get()));
                assert!(matches!(counter.get(), 7600 | 8200 | 8800 | 9400), "{counter}");
            }
        }
    }

    #[test]
    fn exact_match_returns_bid() {
        let backend = SimulatedBackend::with_seed(1).match_chance(1.0);
        let counter = backend.counter_offer(&request(2, 4321, 5000)).unwrap();
        assert_eq!(counter.get(), 4321);
    }

    #[test]
    fn bid_at_or_above_base_gets_base() {
        let backend = SimulatedBackend::with_seed(1);
        let counter = backend.counter_offer(&request(1, 5000, 5000)).unwrap();
        assert_eq!(counter.get(), 5000);
    }
}
