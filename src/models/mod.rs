//! Core data models for emulike.
//!
//! Epistemic mapping:
//! - K_i (Knowledge): Concrete types with compile-time guarantees
//! - B_i (Beliefs): Wrapped in Result/Option
//! - I^R (Resolvable): Settings and run configuration
//! - I^B (Bounded): Error variants with fallback strategies

mod config;
mod error;
mod stats;

pub use config::*;
pub use error::*;
pub use stats::*;
