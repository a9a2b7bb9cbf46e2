//! Binary-outcome prediction market engine and service state.

pub mod math;
pub mod state;
pub mod types;
