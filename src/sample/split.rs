//! Train/test partition and rescaling of a sample.
//!
//! Epistemic foundation:
//! - K_i: A row's x and y always land in the same partition at the same index
//! - K_i: The partition depends only on the seed and the number of rows
//! - K_i: Scalers only ever see the training rows

use super::{Sample, Scaler, ScalerKind};
use crate::models::{EmulikeError, Result};
use ndarray::{Array2, Axis};
use rand::SeedableRng;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use tracing::{debug, info};

/// Rows of a sample partitioned into train and test.
#[derive(Debug, Clone)]
pub struct TrainTestSplit {
    pub x_train: Array2<f64>,
    pub x_test: Array2<f64>,
    pub y_train: Array2<f64>,
    pub y_test: Array2<f64>,
    /// Original row index of every training row
    pub train_indices: Vec<usize>,
    /// Original row index of every test row
    pub test_indices: Vec<usize>,
}

/// Rescaled train/test partition with the scalers fitted on it.
#[derive(Debug, Clone)]
pub struct Rescaled {
    pub x_scaler: Scaler,
    pub y_scaler: Scaler,
    pub x_train_scaled: Array2<f64>,
    pub x_test_scaled: Array2<f64>,
    pub y_train_scaled: Array2<f64>,
    pub y_test_scaled: Array2<f64>,
}

impl Sample {
    /// Split the rows into train and test.
    ///
    /// `floor(frac_train * n_samples)` rows go to train, the others to test.
    /// Both partitions must end up non-empty. Any previous rescaling is
    /// dropped.
    pub fn train_test_split(&mut self, frac_train: f64, seed: u64) -> Result<&TrainTestSplit> {
        if !(frac_train > 0.0 && frac_train < 1.0) {
            return Err(EmulikeError::InvalidInput(format!(
                "training fraction must lie in (0, 1), got {frac_train}"
            )));
        }

        let n = self.n_samples();
        let n_train = (frac_train * n as f64).floor() as usize;
        if n_train == 0 || n_train == n {
            return Err(EmulikeError::InvalidInput(format!(
                "training fraction {frac_train} of {n} samples leaves an empty partition"
            )));
        }

        let mut indices: Vec<usize> = (0..n).collect();
        let mut rng = StdRng::seed_from_u64(seed);
        indices.shuffle(&mut rng);
        let test_indices = indices.split_off(n_train);
        let train_indices = indices;

        info!(
            frac_train,
            seed,
            n_train = train_indices.len(),
            n_test = test_indices.len(),
            "Splitting training and testing samples"
        );

        let split = TrainTestSplit {
            x_train: self.x.select(Axis(0), &train_indices),
            x_test: self.x.select(Axis(0), &test_indices),
            y_train: self.y.select(Axis(0), &train_indices),
            y_test: self.y.select(Axis(0), &test_indices),
            train_indices,
            test_indices,
        };

        self.rescaled = None;
        Ok(self.split.insert(split))
    }

    /// Rescale the train/test partition.
    ///
    /// Each scaler is fitted on the training rows only, then applied to both
    /// partitions.
    pub fn rescale(&mut self, rescale_x: &str, rescale_y: &str) -> Result<&Rescaled> {
        let split = self.split.as_ref().ok_or(EmulikeError::NotSplit)?;
        let kind_x: ScalerKind = rescale_x.parse()?;
        let kind_y: ScalerKind = rescale_y.parse()?;

        info!(x = %kind_x, y = %kind_y, "Rescaling x and y");
        let x_scaler = Scaler::fit(kind_x, &split.x_train)?;
        let y_scaler = Scaler::fit(kind_y, &split.y_train)?;

        let rescaled = Rescaled {
            x_train_scaled: x_scaler.transform(&split.x_train)?,
            x_test_scaled: x_scaler.transform(&split.x_test)?,
            y_train_scaled: y_scaler.transform(&split.y_train)?,
            y_test_scaled: y_scaler.transform(&split.y_test)?,
            x_scaler,
            y_scaler,
        };
        debug!(
            x_train = ?super::column_ranges(&rescaled.x_train_scaled),
            x_test = ?super::column_ranges(&rescaled.x_test_scaled),
            "Rescaled bounds"
        );

        Ok(self.rescaled.insert(rescaled))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Row i is x = (i, 2i), y = (10i).
    fn sample(n: usize) -> Sample {
        let x = Array2::from_shape_fn((n, 2), |(i, j)| (i * (j + 1)) as f64);
        let y = Array2::from_shape_fn((n, 1), |(i, _)| (10 * i) as f64);
        Sample::from_arrays(x, y, None, None).unwrap()
    }

    #[test]
    fn test_split_keeps_pairs_and_partitions_rows() {
        let mut s = sample(10);
        let split = s.train_test_split(0.75, 1).unwrap().clone();

        assert_eq!(split.x_train.nrows(), 7);
        assert_eq!(split.x_test.nrows(), 3);
        assert_eq!(split.y_train.nrows(), 7);
        assert_eq!(split.y_test.nrows(), 3);

        for (x, y) in [(&split.x_train, &split.y_train), (&split.x_test, &split.y_test)] {
            for (xr, yr) in x.axis_iter(Axis(0)).zip(y.axis_iter(Axis(0))) {
                assert_eq!(xr[1], 2.0 * xr[0]);
                assert_eq!(yr[0], 10.0 * xr[0]);
            }
        }

        let mut all: Vec<usize> = split
            .train_indices
            .iter()
            .chain(&split.test_indices)
            .copied()
            .collect();
        all.sort_unstable();
        assert_eq!(all, (0..10).collect::<Vec<_>>());
        for (row, &i) in split.train_indices.iter().enumerate() {
            assert_eq!(split.x_train[[row, 0]], i as f64);
        }
    }

    #[test]
    fn test_split_is_deterministic() {
        let mut a = sample(20);
        let mut b = sample(20);
        let mut c = sample(20);

        let ia = a.train_test_split(0.5, 7).unwrap().train_indices.clone();
        let ib = b.train_test_split(0.5, 7).unwrap().train_indices.clone();
        let ic = c.train_test_split(0.5, 8).unwrap().train_indices.clone();
        assert_eq!(ia, ib);
        assert_ne!(ia, ic);
    }

    #[test]
    fn test_split_rejects_bad_fractions() {
        let mut s = sample(4);
        for frac in [0.0, 1.0, -0.5, 1.5, f64::NAN, 0.1] {
            assert!(
                matches!(s.train_test_split(frac, 0), Err(EmulikeError::InvalidInput(_))),
                "fraction {frac}"
            );
        }
        assert!(s.split().is_none());
    }

    #[test]
    fn test_rescale_requires_split() {
        let mut s = sample(4);
        assert!(matches!(s.rescale("standard", "none"), Err(EmulikeError::NotSplit)));
    }

    #[test]
    fn test_rescale_fits_on_train_only() {
        let mut s = sample(10);
        let split = s.train_test_split(0.6, 3).unwrap().clone();
        let rescaled = s.rescale("minmax", "standard").unwrap().clone();

        let expected = Scaler::fit(ScalerKind::MinMax, &split.x_train).unwrap();
        assert_eq!(rescaled.x_scaler, expected);
        assert!(
            rescaled
                .x_train_scaled
                .iter()
                .all(|&v| (0.0..=1.0).contains(&v))
        );
        assert_eq!(
            rescaled.x_test_scaled,
            expected.transform(&split.x_test).unwrap()
        );

        // Refitting on the same training rows gives the same scalers
        let again = s.rescale("minmax", "standard").unwrap();
        assert_eq!(again.x_scaler, rescaled.x_scaler);
        assert_eq!(again.y_scaler, rescaled.y_scaler);
    }

    #[test]
    fn test_resplit_drops_rescaling() {
        let mut s = sample(6);
        s.train_test_split(0.5, 0).unwrap();
        s.rescale("none", "none").unwrap();
        assert!(s.rescaled().is_some());

        s.train_test_split(0.5, 1).unwrap();
        assert!(s.rescaled().is_none());
        assert!(matches!(
            s.rescale("log", "none"),
            Err(EmulikeError::UnknownVariant { kind: "scaler", .. })
        ));
    }
}
