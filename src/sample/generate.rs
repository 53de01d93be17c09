//! Sample generation and resume.
//!
//! Generation flow:
//! Settings → x (all rows, persisted once) → bootstrap on x[0] → y row by row (appended)
//!
//! Epistemic foundation:
//! - K_i: x is fully known and on disk before the first evaluation
//! - K_i: Each y row is appended as soon as it is computed
//! - B_i: A run may die at any row → the y file is a valid prefix
//! - I^R: Resume rebuilds the model from x[0] and evaluates the pending rows

use super::{Sample, column_ranges};
use crate::models::{EmulikeError, Result, Settings};
use crate::sampling::{FunctionKind, Model, SampledFunction, Spacing};
use crate::store::SampleStore;
use indicatif::{ProgressBar, ProgressStyle};
use ndarray::{Array1, Array2, ArrayView1, Axis, s};
use std::path::Path;
use std::time::Instant;
use tracing::{info, warn};

impl Sample {
    /// Generate a sample with a built-in sampled function.
    ///
    /// With `output`, the run is persisted incrementally into that folder,
    /// which must be missing or empty.
    pub fn generate(&mut self, settings: Settings, output: Option<&Path>) -> Result<&mut Self> {
        let function: FunctionKind = settings.sampled_function.parse()?;
        self.generate_with(settings, &function, output)
    }

    /// Generate a sample with any sampled function.
    ///
    /// The function name replaces `settings.sampled_function` in the stored
    /// record.
    pub fn generate_with(
        &mut self,
        mut settings: Settings,
        function: &dyn SampledFunction,
        output: Option<&Path>,
    ) -> Result<&mut Self> {
        let spacing: Spacing = settings.spacing.parse()?;
        settings.sampled_function = function.name().to_string();

        info!(
            sampled_function = %settings.sampled_function,
            n_samples = settings.n_samples,
            spacing = %spacing,
            "Generating sample"
        );

        // x is built before the folder exists, so bad parameters leave nothing behind
        let x_names = settings.varying_names();
        let x = spacing.generate(&settings.params, &x_names, settings.n_samples, settings.seed)?;

        let store = output
            .map(|dir| SampleStore::fresh(dir, self.files.clone()))
            .transpose()?;
        if let Some(store) = &store {
            store.write_settings(&settings)?;
            store.write_x(x.view(), Some(&x_names))?;
        }

        *self = Sample {
            x: Array2::zeros((0, x.ncols())),
            y: Array2::zeros((0, 0)),
            x_names: Some(x_names),
            settings: Some(settings),
            path: store.as_ref().map(|store| store.dir().to_path_buf()),
            files: self.files.clone(),
            pending_x: x,
            ..Default::default()
        };

        self.evaluate_pending(function, store.as_ref())?;
        Ok(self)
    }

    /// Resume a partially generated sample with its built-in sampled function.
    ///
    /// The sample must have been loaded from a sample folder with settings.
    pub fn resume(&mut self, save_incrementally: bool) -> Result<&mut Self> {
        let settings = self
            .settings
            .as_ref()
            .ok_or_else(|| EmulikeError::NotResumable("no settings loaded".to_string()))?;
        let function: FunctionKind = settings.sampled_function.parse()?;
        self.resume_with(&function, save_incrementally)
    }

    /// Resume a partially generated sample with any sampled function.
    pub fn resume_with(
        &mut self,
        function: &dyn SampledFunction,
        save_incrementally: bool,
    ) -> Result<&mut Self> {
        let Some(path) = self.path.clone() else {
            return Err(EmulikeError::NotResumable(
                "sample was not loaded from a sample folder".to_string(),
            ));
        };
        let settings = self
            .settings
            .as_ref()
            .ok_or_else(|| EmulikeError::NotResumable("no settings loaded".to_string()))?;

        if settings.sampled_function != function.name() {
            warn!(
                stored = %settings.sampled_function,
                given = function.name(),
                "Resuming with a different sampled function"
            );
        }

        let remaining = settings.n_samples.saturating_sub(self.n_samples());
        info!(
            sampled_function = function.name(),
            done = self.n_samples(),
            missing = remaining,
            spacing = %settings.spacing,
            "Resuming sample"
        );
        if remaining == 0 {
            info!("Sample complete, nothing to resume");
            return Ok(self);
        }
        if remaining != self.pending() {
            return Err(EmulikeError::InconsistentSample(format!(
                "{remaining} samples missing but {} x rows pending",
                self.pending()
            )));
        }

        let store = if save_incrementally {
            Some(SampleStore::existing(&path, self.files.clone())?)
        } else {
            None
        };

        self.split = None;
        self.rescaled = None;
        self.evaluate_pending(function, store.as_ref())?;
        Ok(self)
    }

    /// Evaluate every pending x row, moving each to `x` with its y.
    ///
    /// Rows that were not evaluated stay pending, also on failure.
    fn evaluate_pending(
        &mut self,
        function: &dyn SampledFunction,
        store: Option<&SampleStore>,
    ) -> Result<()> {
        let start = Instant::now();
        let pending = std::mem::take(&mut self.pending_x);
        let mut consumed = 0;

        let outcome = self.evaluate_rows(function, store, &pending, &mut consumed);
        self.pending_x = pending.slice(s![consumed.., ..]).to_owned();
        self.x_ranges = column_ranges(&self.x);
        outcome?;

        info!(
            n_samples = self.n_samples(),
            n_x = self.n_x(),
            n_y = self.n_y(),
            runtime_secs = format!("{:.1}", start.elapsed().as_secs_f64()),
            "Sample complete"
        );
        Ok(())
    }

    /// Bootstrap the model on the first x row, then evaluate `pending`.
    ///
    /// If no y row exists yet, the bootstrap output is y[0] and establishes
    /// the y file header. Each row reaches the store before it is kept in
    /// memory, so memory never runs ahead of the y file.
    fn evaluate_rows(
        &mut self,
        function: &dyn SampledFunction,
        store: Option<&SampleStore>,
        pending: &Array2<f64>,
        consumed: &mut usize,
    ) -> Result<()> {
        if pending.nrows() == 0 {
            return Ok(());
        }

        let name = function.name().to_string();
        let x_names = self.x_names.clone().unwrap_or_default();
        let params = self
            .settings
            .as_ref()
            .map(|settings| settings.params.clone())
            .unwrap_or_default();

        let first = if self.x.nrows() > 0 {
            self.x.row(0)
        } else {
            pending.row(0)
        };
        let boot = function
            .bootstrap(first, &x_names, &params)
            .map_err(|e| evaluation_error(&name, 0, e))?;
        let mut model: Box<dyn Model> = boot.model;

        if self.y.nrows() == 0 {
            let y_names = match boot.y_names {
                Some(names) if names.len() != boot.y.len() => {
                    warn!(
                        names = names.len(),
                        values = boot.y.len(),
                        "Sampled function names do not match its output, y names unknown"
                    );
                    None
                }
                names => names,
            };
            if let Some(store) = store {
                store.write_y(boot.y.view().insert_axis(Axis(0)), y_names.as_deref())?;
            }
            self.y = Array2::zeros((0, boot.y.len()));
            self.y_names = y_names;
            self.push_pair(pending.row(0), &boot.y)?;
            *consumed = 1;
        }

        let pb = progress_bar(self.n_samples() + pending.nrows() - *consumed, self.n_samples());
        for x_row in pending.slice(s![*consumed.., ..]).axis_iter(Axis(0)) {
            let row = self.n_samples();
            let step = model
                .evaluate(x_row)
                .map_err(|e| evaluation_error(&name, row, e))
                .and_then(|y_row| check_width(&y_row, self.n_y(), &name, row).map(|_| y_row));
            let y_row = match step {
                Ok(y_row) => y_row,
                Err(e) => {
                    pb.abandon_with_message(format!("Failed at row {row}"));
                    return Err(e);
                }
            };

            if let Some(store) = store {
                store.append_y(y_row.view())?;
            }
            self.push_pair(x_row, &y_row)?;
            *consumed += 1;
            pb.inc(1);
        }

        pb.finish_with_message(format!("Done! {} samples", self.n_samples()));
        Ok(())
    }

    /// Push one (x, y) row.
    fn push_pair(&mut self, x_row: ArrayView1<f64>, y_row: &Array1<f64>) -> Result<()> {
        self.x
            .push_row(x_row)
            .and_then(|_| self.y.push_row(y_row.view()))
            .map_err(|e| EmulikeError::InconsistentSample(e.to_string()))
    }
}

fn check_width(y_row: &Array1<f64>, n_y: usize, function: &str, row: usize) -> Result<()> {
    if y_row.len() != n_y {
        return Err(EmulikeError::Evaluation {
            function: function.to_string(),
            row,
            message: format!("returned {} values, expected {n_y}", y_row.len()),
        });
    }
    Ok(())
}

fn evaluation_error(function: &str, row: usize, error: EmulikeError) -> EmulikeError {
    match error {
        EmulikeError::Evaluation { .. } => error,
        other => EmulikeError::Evaluation {
            function: function.to_string(),
            row,
            message: other.to_string(),
        },
    }
}

fn progress_bar(total: usize, done: usize) -> ProgressBar {
    let pb = ProgressBar::new(total as u64);
    if let Ok(style) = ProgressStyle::default_bar()
        .template("[{elapsed_precise}] {bar:40.cyan/blue} {pos}/{len} ({percent}%) {msg}")
    {
        pb.set_style(style.progress_chars("##-"));
    }
    pb.set_position(done as u64);
    pb
}
