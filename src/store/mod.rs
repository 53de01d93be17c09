//! Storage module for sample data.
//!
//! Provides:
//! - `read_array` / `write_array` / `append_row`: plain-text array codec
//! - `resolve_names`: column names from the header comment
//! - `SampleStore`: canonical sample folder layout with resumable writes

mod array;
mod layout;

pub use array::*;
pub use layout::*;
