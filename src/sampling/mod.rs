//! Sampling collaborators: where to sample x and what to evaluate there.

mod function;
mod spacing;

pub use function::*;
pub use spacing::*;
