#![warn(clippy::all, missing_docs)]

//! Core negotiation logic for the bargain terminal client.
//!
//! This crate hosts the price models, the round input and countdown state
//! machines, the multi-round negotiation flow, the bargaining backend seam
//! and configuration handling used by the terminal UI.

pub mod backend;
pub mod config;
pub mod error;
pub mod models;
pub mod negotiation;
pub mod round;
pub mod timer;

pub use backend::{BargainBackend, SimulatedBackend};
pub use config::AppConfig;
pub use error::BargainError;
pub use models::{NegotiationRound, Price};
pub use negotiation::{
    Acceptance, Deal, Decline, Negotiation, NegotiationSettings, OfferRequest, PriceChoice,
    Product, RoundPhase,
};
pub use round::{InputMode, RoundAction, RoundInput, RoundProps};
pub use timer::{
    Clock, ManualClock, MonotonicClock, OfferTimer, SystemClock, TimerEvent, TimerHandle,
    TimerSettings, TimerSource, TimerState, TimerStatus, TimerUpdate,
};
