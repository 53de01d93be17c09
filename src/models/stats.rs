//! Run statistics.

use serde::{Deserialize, Serialize};

/// Statistics for a sample pipeline run.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SampleStats {
    /// Samples in the folder at the end of the run
    pub total_samples: usize,

    /// Samples already evaluated by a previous run
    pub already_done: usize,

    /// Samples evaluated by this run
    pub computed: usize,

    /// Number of x variables
    pub n_x: usize,

    /// Number of y variables
    pub n_y: usize,

    /// Total runtime in seconds
    pub runtime_secs: f64,

    /// Samples per hour throughput
    pub throughput_per_hour: f64,
}

impl SampleStats {
    /// Calculate derived stats.
    pub fn finalize(&mut self) {
        self.computed = self.total_samples.saturating_sub(self.already_done);
        if self.runtime_secs > 0.0 {
            self.throughput_per_hour = self.computed as f64 / self.runtime_secs * 3600.0;
        }
    }
}
