#![allow(missing_docs)]

//! Per-round price entry.

pub mod input;

pub use input::{InputMode, RoundAction, RoundInput, RoundProps};
