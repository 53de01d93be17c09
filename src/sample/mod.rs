//! Samples: (x, y) datasets plus the record of how they were produced.
//!
//! A sample is populated by [`Sample::load`] or [`Sample::generate`], can be
//! completed with [`Sample::resume`], combined with [`Sample::join`] and
//! prepared for training with [`Sample::train_test_split`] and
//! [`Sample::rescale`].
//!
//! Epistemic foundation:
//! - K_i: `x.rows == y.rows` after every operation; counts are derived, never stored
//! - K_i: Names, when known, have one entry per column
//! - B_i: Names and settings may be unrecoverable from storage → Option
//! - I^B: A partially generated folder keeps its unevaluated x rows as pending

mod generate;
mod scaler;
mod split;

pub use scaler::*;
pub use split::*;

use crate::models::{EmulikeError, FileNames, Result, Settings};
use crate::store::{Columns, SampleStore, read_array};
use ndarray::{Array2, Axis, concatenate};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Options for [`Sample::load`].
#[derive(Debug, Clone, Default)]
pub struct LoadOptions {
    /// Separate y file; `path` is then the x file
    pub path_y: Option<PathBuf>,
    /// x columns (default depends on the layout)
    pub columns_x: Option<Columns>,
    /// y columns (default depends on the layout)
    pub columns_y: Option<Columns>,
    /// Drop rows where any y value is NaN or infinite
    pub remove_non_finite: bool,
}

/// An (x, y) dataset.
#[derive(Debug, Clone, Default)]
pub struct Sample {
    /// Independent variables, one row per sample
    x: Array2<f64>,
    /// Dependent variables, one row per sample
    y: Array2<f64>,
    /// Names of the x columns
    x_names: Option<Vec<String>>,
    /// Names of the y columns
    y_names: Option<Vec<String>>,
    /// Per-column (min, max) of x, over the rows kept by the non-finite filter
    x_ranges: Vec<(f64, f64)>,
    /// How the sample was generated
    settings: Option<Settings>,
    /// Sample folder backing this sample
    path: Option<PathBuf>,
    /// File names used inside sample folders
    files: FileNames,
    /// x rows of a partial run still waiting for their y
    pending_x: Array2<f64>,
    /// Train/test partition
    split: Option<TrainTestSplit>,
    /// Rescaled partition and fitted scalers
    rescaled: Option<Rescaled>,
}

impl Sample {
    /// Create an empty sample.
    pub fn new() -> Self {
        Self::default()
    }

    /// Use custom file names for sample folders.
    pub fn with_files(mut self, files: FileNames) -> Self {
        self.files = files;
        self
    }

    /// Attach a settings record, saved along with the data.
    pub fn with_settings(mut self, settings: Settings) -> Self {
        self.settings = Some(settings);
        self
    }

    /// Build a sample from in-memory arrays.
    pub fn from_arrays(
        x: Array2<f64>,
        y: Array2<f64>,
        x_names: Option<Vec<String>>,
        y_names: Option<Vec<String>>,
    ) -> Result<Self> {
        check_rows(x.nrows(), y.nrows())?;
        check_names("x", x_names.as_deref(), x.ncols())?;
        check_names("y", y_names.as_deref(), y.ncols())?;

        let x_ranges = column_ranges(&x);
        Ok(Self {
            x,
            y,
            x_names,
            y_names,
            x_ranges,
            ..Default::default()
        })
    }

    /// Get x.
    pub fn x(&self) -> &Array2<f64> {
        &self.x
    }

    /// Get y.
    pub fn y(&self) -> &Array2<f64> {
        &self.y
    }

    /// Get the x names, if known.
    pub fn x_names(&self) -> Option<&[String]> {
        self.x_names.as_deref()
    }

    /// Get the y names, if known.
    pub fn y_names(&self) -> Option<&[String]> {
        self.y_names.as_deref()
    }

    /// Number of samples.
    pub fn n_samples(&self) -> usize {
        self.x.nrows()
    }

    /// Number of x variables.
    pub fn n_x(&self) -> usize {
        self.x.ncols()
    }

    /// Number of y variables.
    pub fn n_y(&self) -> usize {
        self.y.ncols()
    }

    /// Per-column (min, max) of x.
    ///
    /// Computed after `remove_non_finite`, so dropped rows do not widen the
    /// ranges. Pending rows are not included.
    pub fn x_ranges(&self) -> &[(f64, f64)] {
        &self.x_ranges
    }

    /// Get the generation settings, if known.
    pub fn settings(&self) -> Option<&Settings> {
        self.settings.as_ref()
    }

    /// Get the backing sample folder, if any.
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Get the file names used for sample folders.
    pub fn files(&self) -> &FileNames {
        &self.files
    }

    /// Number of x rows still waiting for their y.
    pub fn pending(&self) -> usize {
        self.pending_x.nrows()
    }

    /// Get the train/test partition, if split.
    pub fn split(&self) -> Option<&TrainTestSplit> {
        self.split.as_ref()
    }

    /// Get the rescaled partition, if rescaled.
    pub fn rescaled(&self) -> Option<&Rescaled> {
        self.rescaled.as_ref()
    }

    /// Load a sample from disk.
    ///
    /// `path` is classified in this order:
    /// 1. with `options.path_y`: x file and y file, all columns by default;
    /// 2. a folder: canonical layout, all columns by default, settings loaded
    ///    and the folder remembered for [`Sample::resume`];
    /// 3. a file: combined table, x = all columns but the last, y = the last.
    ///
    /// Anything else fails with `InvalidPath`.
    pub fn load(&mut self, path: &Path, options: &LoadOptions) -> Result<&mut Self> {
        info!(path = %path.display(), "Loading sample");

        let mut settings = None;
        let mut store = None;

        let (path_x, path_y, default_x, default_y) = if let Some(path_y) = &options.path_y {
            (path.to_path_buf(), path_y.clone(), Columns::All, Columns::All)
        } else if path.is_dir() {
            let folder = SampleStore::existing(path, self.files.clone())?;
            settings = folder.read_settings();
            let paths = (folder.x_path(), folder.y_path(), Columns::All, Columns::All);
            store = Some(folder);
            paths
        } else if path.is_file() {
            (
                path.to_path_buf(),
                path.to_path_buf(),
                Columns::AllButLast,
                Columns::Last,
            )
        } else {
            return Err(EmulikeError::InvalidPath(path.to_path_buf()));
        };

        let columns_x = options.columns_x.as_ref().unwrap_or(&default_x);
        let columns_y = options.columns_y.as_ref().unwrap_or(&default_y);

        let (mut x, x_names) = read_array(&path_x, columns_x)?;
        let (mut y, y_names) = if store.as_ref().is_some_and(|store| !store.has_y()) {
            // Run interrupted before its first y row
            debug!(path = %path_y.display(), "No y file yet");
            (Array2::zeros((0, 0)), None)
        } else {
            read_array(&path_y, columns_y)?
        };

        let mut pending_x = Array2::zeros((0, x.ncols()));
        if store.is_some() && y.nrows() < x.nrows() {
            pending_x = x.slice_axis(Axis(0), (y.nrows()..).into()).to_owned();
            x = x.slice_axis(Axis(0), (..y.nrows()).into()).to_owned();
        }
        check_rows(x.nrows(), y.nrows())?;

        if options.remove_non_finite {
            let keep: Vec<usize> = y
                .axis_iter(Axis(0))
                .enumerate()
                .filter(|(_, row)| row.iter().all(|v| v.is_finite()))
                .map(|(i, _)| i)
                .collect();
            info!(removed = y.nrows() - keep.len(), "Removing non finite data from sample");
            x = x.select(Axis(0), &keep);
            y = y.select(Axis(0), &keep);
        }

        let x_ranges = column_ranges(&x);
        *self = Self {
            x,
            y,
            x_names,
            y_names,
            x_ranges,
            settings,
            path: store.map(|store| store.dir().to_path_buf()),
            files: self.files.clone(),
            pending_x,
            split: None,
            rescaled: None,
        };

        info!(
            x_from = %path_x.display(),
            y_from = %path_y.display(),
            n_samples = self.n_samples(),
            n_x = self.n_x(),
            n_y = self.n_y(),
            pending = self.pending(),
            "Loaded sample"
        );
        Ok(self)
    }

    /// Save the sample into a folder using the canonical layout.
    ///
    /// Pending x rows are written too, so a partial sample stays resumable
    /// from its new location.
    pub fn save(&mut self, dir: &Path) -> Result<()> {
        info!(path = %dir.display(), "Saving sample");
        let store = SampleStore::new(dir, self.files.clone())?;

        if let Some(settings) = &self.settings {
            store.write_settings(settings)?;
        }

        if self.pending_x.nrows() > 0 {
            let full_x = concatenate(Axis(0), &[self.x.view(), self.pending_x.view()])
                .map_err(|e| EmulikeError::InconsistentSample(e.to_string()))?;
            store.write_x(full_x.view(), self.x_names.as_deref())?;
        } else {
            store.write_x(self.x.view(), self.x_names.as_deref())?;
        }
        store.write_y(self.y.view(), self.y_names.as_deref())?;

        self.path = Some(dir.to_path_buf());
        Ok(())
    }

    /// Join samples into a new one.
    ///
    /// Every sample must have the same number of x and y variables. Rows are
    /// concatenated in input order. Names are taken from the first sample.
    pub fn join(samples: &[Sample]) -> Result<Sample> {
        let first = samples
            .first()
            .ok_or_else(|| EmulikeError::InvalidInput("no samples to join".to_string()))?;

        if let Some(other) = samples.iter().find(|s| s.n_x() != first.n_x()) {
            return Err(EmulikeError::IncompatibleSample(format!(
                "different number of x variables ({} and {})",
                first.n_x(),
                other.n_x()
            )));
        }
        if let Some(other) = samples.iter().find(|s| s.n_y() != first.n_y()) {
            return Err(EmulikeError::IncompatibleSample(format!(
                "different number of y variables ({} and {})",
                first.n_y(),
                other.n_y()
            )));
        }

        let xs: Vec<_> = samples.iter().map(|s| s.x.view()).collect();
        let ys: Vec<_> = samples.iter().map(|s| s.y.view()).collect();
        let x = concatenate(Axis(0), &xs)
            .map_err(|e| EmulikeError::InconsistentSample(e.to_string()))?;
        let y = concatenate(Axis(0), &ys)
            .map_err(|e| EmulikeError::InconsistentSample(e.to_string()))?;

        info!(
            samples = samples.len(),
            n_samples = x.nrows(),
            "Joined samples"
        );

        let x_ranges = column_ranges(&x);
        Ok(Sample {
            x,
            y,
            x_names: first.x_names.clone(),
            y_names: first.y_names.clone(),
            x_ranges,
            files: first.files.clone(),
            ..Default::default()
        })
    }
}

fn check_rows(x_rows: usize, y_rows: usize) -> Result<()> {
    if x_rows != y_rows {
        return Err(EmulikeError::InconsistentSample(format!(
            "x has {x_rows} rows but y has {y_rows}"
        )));
    }
    Ok(())
}

fn check_names(axis: &str, names: Option<&[String]>, n_columns: usize) -> Result<()> {
    match names {
        Some(names) if names.len() != n_columns => Err(EmulikeError::InconsistentSample(format!(
            "{} {axis} names for {n_columns} {axis} columns",
            names.len()
        ))),
        _ => Ok(()),
    }
}

/// Per-column (min, max); NaN values are ignored.
pub(crate) fn column_ranges(x: &Array2<f64>) -> Vec<(f64, f64)> {
    x.axis_iter(Axis(1))
        .map(|col| {
            col.iter()
                .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &v| {
                    (lo.min(v), hi.max(v))
                })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::arr2;
    use std::fs;
    use tempfile::TempDir;

    fn names(list: &[&str]) -> Option<Vec<String>> {
        Some(list.iter().map(|s| s.to_string()).collect())
    }

    fn sample(x: Array2<f64>, y: Array2<f64>) -> Sample {
        Sample::from_arrays(x, y, None, None).unwrap()
    }

    #[test]
    fn test_load_folder() {
        let temp_dir = TempDir::new().unwrap();
        fs::write(
            temp_dir.path().join("x_sample.txt"),
            "# a\tb\n1.0 5.0\n3.0 4.0\n2.0 6.0\n",
        )
        .unwrap();
        fs::write(temp_dir.path().join("y_sample.txt"), "# c\n0.1\n0.2\n0.3\n").unwrap();

        let mut s = Sample::new();
        s.load(temp_dir.path(), &LoadOptions::default()).unwrap();

        assert_eq!(s.n_samples(), 3);
        assert_eq!(s.n_x(), 2);
        assert_eq!(s.n_y(), 1);
        assert_eq!(s.x_names().unwrap(), ["a", "b"]);
        assert_eq!(s.y_names().unwrap(), ["c"]);
        assert_eq!(s.x_ranges(), &[(1.0, 3.0), (4.0, 6.0)]);
        assert_eq!(s.path(), Some(temp_dir.path()));
        // No settings file: not fatal
        assert!(s.settings().is_none());
        assert_eq!(s.pending(), 0);
    }

    #[test]
    fn test_load_combined_file() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("xy_sample.txt");
        fs::write(&path, "1 2 3\n4 5 6\n7 8 9\n").unwrap();

        let mut s = Sample::new();
        s.load(&path, &LoadOptions::default()).unwrap();

        assert_eq!(s.x(), &arr2(&[[1.0, 2.0], [4.0, 5.0], [7.0, 8.0]]));
        assert_eq!(s.y(), &arr2(&[[3.0], [6.0], [9.0]]));
        assert!(s.x_names().is_none());
        assert!(s.y_names().is_none());
        assert!(s.path().is_none());
    }

    #[test]
    fn test_load_file_pair_with_columns() {
        let temp_dir = TempDir::new().unwrap();
        let path_x = temp_dir.path().join("inputs.dat");
        let path_y = temp_dir.path().join("outputs.dat");
        fs::write(&path_x, "# a\tb\tc\n1 2 3\n4 5 6\n").unwrap();
        fs::write(&path_y, "# p\tq\n10 20\n30 40\n").unwrap();

        let options = LoadOptions {
            path_y: Some(path_y),
            columns_x: Some(Columns::List(vec![0, 2])),
            columns_y: Some(Columns::Last),
            ..Default::default()
        };
        let mut s = Sample::new();
        s.load(&path_x, &options).unwrap();

        assert_eq!(s.x(), &arr2(&[[1.0, 3.0], [4.0, 6.0]]));
        assert_eq!(s.x_names().unwrap(), ["a", "c"]);
        assert_eq!(s.y(), &arr2(&[[20.0], [40.0]]));
        assert_eq!(s.y_names().unwrap(), ["q"]);
        assert!(s.path().is_none());
    }

    #[test]
    fn test_load_invalid_path() {
        let temp_dir = TempDir::new().unwrap();
        let err = Sample::new()
            .load(&temp_dir.path().join("nowhere"), &LoadOptions::default())
            .unwrap_err();
        assert!(matches!(err, EmulikeError::InvalidPath(_)));
    }

    #[test]
    fn test_load_mismatched_file_pair() {
        let temp_dir = TempDir::new().unwrap();
        let path_x = temp_dir.path().join("x.txt");
        let path_y = temp_dir.path().join("y.txt");
        fs::write(&path_x, "1\n2\n3\n").unwrap();
        fs::write(&path_y, "1\n2\n").unwrap();

        let options = LoadOptions {
            path_y: Some(path_y),
            ..Default::default()
        };
        let err = Sample::new().load(&path_x, &options).unwrap_err();
        assert!(matches!(err, EmulikeError::InconsistentSample(_)));
    }

    #[test]
    fn test_remove_non_finite() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("xy.txt");
        fs::write(&path, "1 10 0.5\n2 20 nan\n3 30 inf\n4 40 1.5\n").unwrap();

        let mut s = Sample::new();
        s.load(&path, &LoadOptions::default()).unwrap();
        assert_eq!(s.n_samples(), 4);

        let options = LoadOptions {
            remove_non_finite: true,
            ..Default::default()
        };
        s.load(&path, &options).unwrap();
        assert_eq!(s.n_samples(), 2);
        assert_eq!(s.x(), &arr2(&[[1.0, 10.0], [4.0, 40.0]]));
        assert_eq!(s.y(), &arr2(&[[0.5], [1.5]]));
        assert_eq!(s.x_ranges(), &[(1.0, 4.0), (10.0, 40.0)]);
    }

    #[test]
    fn test_remove_non_finite_checks_every_y_column() {
        let temp_dir = TempDir::new().unwrap();
        let path_x = temp_dir.path().join("x.txt");
        let path_y = temp_dir.path().join("y.txt");
        fs::write(&path_x, "1\n2\n3\n").unwrap();
        fs::write(&path_y, "1 nan\n2 2\n-inf 3\n").unwrap();

        let options = LoadOptions {
            path_y: Some(path_y),
            remove_non_finite: true,
            ..Default::default()
        };
        let mut s = Sample::new();
        s.load(&path_x, &options).unwrap();
        assert_eq!(s.x(), &arr2(&[[2.0]]));
        assert_eq!(s.y(), &arr2(&[[2.0, 2.0]]));
        // Dropped rows do not widen the ranges
        assert_eq!(s.x_ranges(), &[(2.0, 2.0)]);
    }

    #[test]
    fn test_partial_folder_keeps_pending_rows() {
        let temp_dir = TempDir::new().unwrap();
        fs::write(temp_dir.path().join("x_sample.txt"), "# a\n1\n2\n3\n4\n").unwrap();
        fs::write(temp_dir.path().join("y_sample.txt"), "# y\n10\n20\n").unwrap();

        let mut s = Sample::new();
        s.load(temp_dir.path(), &LoadOptions::default()).unwrap();
        assert_eq!(s.n_samples(), 2);
        assert_eq!(s.pending(), 2);
        assert_eq!(s.x(), &arr2(&[[1.0], [2.0]]));
    }

    #[test]
    fn test_folder_without_y_file() {
        let temp_dir = TempDir::new().unwrap();
        fs::write(temp_dir.path().join("x_sample.txt"), "# a\n1\n2\n").unwrap();

        let mut s = Sample::new();
        s.load(temp_dir.path(), &LoadOptions::default()).unwrap();
        assert_eq!(s.n_samples(), 0);
        assert_eq!(s.pending(), 2);
        assert!(s.y_names().is_none());
        assert_eq!(s.path(), Some(temp_dir.path()));
    }

    #[test]
    fn test_save_load_round_trip() {
        let temp_dir = TempDir::new().unwrap();
        let dir = temp_dir.path().join("saved");
        let x = arr2(&[[0.1, 0.2], [1e-12, -3.5], [7.0, 1.0 / 7.0]]);
        let y = arr2(&[[1.0, f64::MAX], [2.0, f64::MIN_POSITIVE], [3.0, -0.0]]);

        let mut original =
            Sample::from_arrays(x.clone(), y.clone(), names(&["a", "b"]), names(&["p", "q"]))
                .unwrap();
        original.save(&dir).unwrap();
        assert_eq!(original.path(), Some(dir.as_path()));

        let mut loaded = Sample::new();
        loaded.load(&dir, &LoadOptions::default()).unwrap();
        assert_eq!(loaded.x(), &x);
        assert_eq!(loaded.y(), &y);
        assert_eq!(loaded.x_names(), original.x_names());
        assert_eq!(loaded.y_names(), original.y_names());
    }

    #[test]
    fn test_save_with_unknown_names() {
        let temp_dir = TempDir::new().unwrap();
        let mut original = sample(arr2(&[[1.0], [2.0]]), arr2(&[[3.0], [4.0]]));
        original.save(temp_dir.path()).unwrap();

        let mut loaded = Sample::new();
        loaded.load(temp_dir.path(), &LoadOptions::default()).unwrap();
        assert!(loaded.x_names().is_none());
        assert!(loaded.y_names().is_none());
        assert_eq!(loaded.y(), original.y());
    }

    #[test]
    fn test_from_arrays_validates() {
        assert!(Sample::from_arrays(arr2(&[[1.0]]), arr2(&[[1.0], [2.0]]), None, None).is_err());
        assert!(
            Sample::from_arrays(arr2(&[[1.0, 2.0]]), arr2(&[[1.0]]), names(&["a"]), None).is_err()
        );
    }

    #[test]
    fn test_join() {
        let a = Sample::from_arrays(
            arr2(&[[1.0, 2.0]]),
            arr2(&[[10.0]]),
            names(&["a", "b"]),
            names(&["y"]),
        )
        .unwrap();
        let b = sample(arr2(&[[3.0, -4.0], [5.0, 6.0]]), arr2(&[[30.0], [50.0]]));

        let joined = Sample::join(&[a, b]).unwrap();
        assert_eq!(joined.n_samples(), 3);
        assert_eq!(joined.x(), &arr2(&[[1.0, 2.0], [3.0, -4.0], [5.0, 6.0]]));
        assert_eq!(joined.y(), &arr2(&[[10.0], [30.0], [50.0]]));
        assert_eq!(joined.x_names().unwrap(), ["a", "b"]);
        assert_eq!(joined.x_ranges(), &[(1.0, 5.0), (-4.0, 6.0)]);
        assert!(joined.settings().is_none());
        assert!(joined.path().is_none());
    }

    #[test]
    fn test_join_is_associative() {
        let a = sample(arr2(&[[1.0], [2.0]]), arr2(&[[1.0, 1.5], [2.0, 2.5]]));
        let b = sample(arr2(&[[3.0]]), arr2(&[[3.0, 3.5]]));
        let c = sample(arr2(&[[4.0], [5.0]]), arr2(&[[4.0, 4.5], [5.0, 5.5]]));

        let ab = Sample::join(&[a.clone(), b.clone()]).unwrap();
        let nested = Sample::join(&[ab, c.clone()]).unwrap();
        let flat = Sample::join(&[a, b, c]).unwrap();

        assert_eq!(nested.x(), flat.x());
        assert_eq!(nested.y(), flat.y());
        assert_eq!(nested.n_samples(), 5);
    }

    #[test]
    fn test_join_incompatible() {
        let a = sample(arr2(&[[1.0, 2.0]]), arr2(&[[1.0]]));
        let b = sample(arr2(&[[1.0]]), arr2(&[[1.0]]));
        let c = sample(arr2(&[[1.0, 2.0]]), arr2(&[[1.0, 2.0]]));

        assert!(matches!(
            Sample::join(&[a.clone(), b]),
            Err(EmulikeError::IncompatibleSample(_))
        ));
        assert!(matches!(
            Sample::join(&[a, c]),
            Err(EmulikeError::IncompatibleSample(_))
        ));
        assert!(matches!(
            Sample::join(&[]),
            Err(EmulikeError::InvalidInput(_))
        ));
    }
}
