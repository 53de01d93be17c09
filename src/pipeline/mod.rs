//! Pipeline module - configuration driven sample generation.

mod sample;

pub use sample::*;
