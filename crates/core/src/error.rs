//! Errors raised by the negotiation flow.

use thiserror::Error;

use crate::models::Price;

/// Why a negotiation step was refused.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BargainError {
    /// The bid is not below the listed price.
    #[error("offer {offer} is not below the current price {base}")]
    OfferTooHigh {
        /// Submitted price.
        offer: Price,
        /// Listed price.
        base: Price,
    },
    /// A bid is already with the supplier.
    #[error("a price is already being checked")]
    AlreadySubmitting,
    /// A counter-offer arrived while no bid was outstanding.
    #[error("no counter-offer was requested")]
    NotAwaitingOffer,
    /// There is no standing offer to act on.
    #[error("there is no offer to accept")]
    NoOffer,
    /// The offer window closed before the action landed.
    #[error("the offer has expired")]
    OfferExpired,
    /// Safe/final selection outside the final round.
    #[error("price selection is only available in the final round")]
    SelectionUnavailable,
    /// The negotiation already ended.
    #[error("negotiation already completed")]
    Completed,
    /// The bargaining backend failed.
    #[error("bargaining backend error: {0}")]
    Backend(String),
}
