//! emulike - Resumable sample generation for emulator training.
//!
//! ## Architecture
//!
//! A [`Sample`] is an (x, y) dataset produced by sampling an expensive
//! function:
//! - **Spacing**: decides every x row up front (grid, random, latin hypercube)
//! - **Sampled function**: evaluates y one row at a time, reusing a model
//!   built by a single bootstrap call
//!
//! ## Storage
//!
//! A sample folder holds `x_sample.txt`, `y_sample.txt` and `settings.toml`.
//! x and the settings are written before the first evaluation and every y row
//! is appended as soon as it is known, so an interrupted run is completed
//! with [`Sample::resume`].
//!
//! ## Epistemic Design
//!
//! - K_i (Knowledge): Compile-time enforced invariants (types, enums)
//! - B_i (Beliefs): Runtime fallible operations (Result, Option)
//! - I^R (Resolvable): User-configurable parameters
//! - I^B (Bounded): Interrupted runs (incremental writes, resume)

pub mod models;
pub mod pipeline;
pub mod sample;
pub mod sampling;
pub mod store;

// Re-exports for convenience
pub use models::{EmulikeError, FileNames, Result, SampleConfig, SampleStats, Settings};
pub use pipeline::SamplePipeline;
pub use sample::{LoadOptions, Rescaled, Sample, Scaler, ScalerKind, TrainTestSplit};
pub use sampling::{Bootstrap, FunctionKind, Model, SampledFunction, Spacing};
pub use store::{Columns, SampleStore};
