//! Sample pipeline: configuration file → sample folder.
//!
//! Pipeline flow:
//! SampleConfig → fresh folder → generate (x up front, y row by row)
//! SampleConfig → existing folder → load → resume the pending rows

use crate::models::{Result, SampleConfig, SampleStats};
use crate::sample::{LoadOptions, Sample};
use std::path::Path;
use std::time::Instant;
use tracing::{info, warn};

/// Pipeline generating or resuming the sample described by a configuration.
pub struct SamplePipeline {
    config: SampleConfig,
}

impl SamplePipeline {
    /// Create a new pipeline from configuration.
    pub fn new(config: SampleConfig) -> Self {
        Self { config }
    }

    /// Create a new pipeline from a configuration file.
    pub fn from_file(path: &Path) -> Result<Self> {
        Ok(Self::new(SampleConfig::from_file(path)?))
    }

    /// Run the pipeline.
    ///
    /// A fresh run refuses a non-empty output folder. With `resume`, the
    /// folder is loaded and its pending rows evaluated; the stored settings
    /// win over the configured ones.
    pub fn run(&self, resume: bool) -> Result<(Sample, SampleStats)> {
        let start = Instant::now();
        let output = self.config.output_dir();
        let mut sample = Sample::new().with_files(self.config.files.clone());

        let already_done = if resume {
            sample.load(&output, &LoadOptions::default())?;
            if sample
                .settings()
                .is_some_and(|stored| stored != &self.config.sample)
            {
                warn!(
                    path = %output.display(),
                    "Configured settings differ from the stored ones, resuming with the stored settings"
                );
            }

            let already_done = sample.n_samples();
            info!(
                path = %output.display(),
                already_done,
                pending = sample.pending(),
                "Resuming sample pipeline"
            );
            sample.resume(true)?;
            already_done
        } else {
            info!(
                path = %output.display(),
                sampled_function = %self.config.sample.sampled_function,
                n_samples = self.config.sample.n_samples,
                "Starting sample pipeline"
            );
            sample.generate(self.config.sample.clone(), Some(&output))?;
            0
        };

        let mut stats = SampleStats {
            total_samples: sample.n_samples(),
            already_done,
            n_x: sample.n_x(),
            n_y: sample.n_y(),
            runtime_secs: start.elapsed().as_secs_f64(),
            ..Default::default()
        };
        stats.finalize();

        info!(
            total = stats.total_samples,
            computed = stats.computed,
            throughput = format!("{:.0}/hr", stats.throughput_per_hour),
            "Sample pipeline complete"
        );

        Ok((sample, stats))
    }
}
