//! Column-wise affine scalers fitted on training data.
//!
//! Every scaler maps a column `c` to `(c - shift) / scale`, so fitting only
//! has to decide the two vectors and the inverse is always available.
//!
//! K_i: A fitted scaler is plain data and never refits implicitly.

use super::column_ranges;
use crate::models::{EmulikeError, Result};
use ndarray::{Array1, Array2, Axis};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Scales smaller than this are treated as constant columns.
const MIN_SCALE: f64 = 1e-12;

/// Available scalers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScalerKind {
    /// Identity
    None,
    /// Zero mean, unit (population) standard deviation
    Standard,
    /// Onto [0, 1]
    MinMax,
    /// Onto [-1, 1]
    MinMaxSymmetric,
}

impl ScalerKind {
    /// Identifier used in configuration.
    pub fn name(&self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Standard => "standard",
            Self::MinMax => "minmax",
            Self::MinMaxSymmetric => "minmax_symmetric",
        }
    }
}

impl FromStr for ScalerKind {
    type Err = EmulikeError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "none" | "None" | "identity" => Ok(Self::None),
            "standard" | "StandardScaler" => Ok(Self::Standard),
            "minmax" | "MinMaxScaler" => Ok(Self::MinMax),
            "minmax_symmetric" | "MinMaxScalerPlusMinus1" => Ok(Self::MinMaxSymmetric),
            other => Err(EmulikeError::unknown("scaler", other)),
        }
    }
}

impl fmt::Display for ScalerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A fitted scaler.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Scaler {
    pub kind: ScalerKind,
    /// Subtracted from each column
    pub shift: Vec<f64>,
    /// Divides each column after the shift; never zero
    pub scale: Vec<f64>,
}

impl Scaler {
    /// Fit a scaler on `data`, one row per sample.
    pub fn fit(kind: ScalerKind, data: &Array2<f64>) -> Result<Self> {
        if data.nrows() == 0 {
            return Err(EmulikeError::InvalidInput(
                "can not fit a scaler on an empty array".to_string(),
            ));
        }

        let n = data.ncols();
        let (shift, scale): (Vec<f64>, Vec<f64>) = match kind {
            ScalerKind::None => (vec![0.0; n], vec![1.0; n]),
            ScalerKind::Standard => {
                let mean = data
                    .mean_axis(Axis(0))
                    .ok_or_else(|| EmulikeError::InvalidInput("no rows to average".to_string()))?;
                let std = data.std_axis(Axis(0), 0.0);
                (mean.to_vec(), std.iter().map(|&s| sanitize(s)).collect())
            }
            ScalerKind::MinMax => column_ranges(data)
                .into_iter()
                .map(|(lo, hi)| (lo, sanitize(hi - lo)))
                .unzip(),
            ScalerKind::MinMaxSymmetric => column_ranges(data)
                .into_iter()
                .map(|(lo, hi)| (0.5 * (lo + hi), sanitize(0.5 * (hi - lo))))
                .unzip(),
        };

        Ok(Self { kind, shift, scale })
    }

    /// Number of columns the scaler was fitted on.
    pub fn n_columns(&self) -> usize {
        self.shift.len()
    }

    /// Scale `data`.
    pub fn transform(&self, data: &Array2<f64>) -> Result<Array2<f64>> {
        self.check_columns(data)?;
        let shift = Array1::from_vec(self.shift.clone());
        let scale = Array1::from_vec(self.scale.clone());
        Ok((data - &shift) / &scale)
    }

    /// Map scaled data back to the original units.
    pub fn inverse_transform(&self, data: &Array2<f64>) -> Result<Array2<f64>> {
        self.check_columns(data)?;
        let shift = Array1::from_vec(self.shift.clone());
        let scale = Array1::from_vec(self.scale.clone());
        Ok(data * &scale + &shift)
    }

    fn check_columns(&self, data: &Array2<f64>) -> Result<()> {
        if data.ncols() != self.n_columns() {
            return Err(EmulikeError::InvalidInput(format!(
                "{} scaler fitted on {} columns, got {}",
                self.kind,
                self.n_columns(),
                data.ncols()
            )));
        }
        Ok(())
    }
}

// Constant columns are only shifted
fn sanitize(scale: f64) -> f64 {
    if scale.is_finite() && scale.abs() > MIN_SCALE {
        scale
    } else {
        1.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::arr2;

    fn data() -> Array2<f64> {
        arr2(&[[1.0, 10.0, 5.0], [3.0, 20.0, 5.0], [5.0, 60.0, 5.0]])
    }

    fn assert_close(a: &Array2<f64>, b: &Array2<f64>) {
        assert_eq!(a.dim(), b.dim());
        for (x, y) in a.iter().zip(b.iter()) {
            assert!((x - y).abs() < 1e-9, "{a} != {b}");
        }
    }

    #[test]
    fn test_from_str() {
        assert_eq!("StandardScaler".parse::<ScalerKind>().unwrap(), ScalerKind::Standard);
        assert_eq!("None".parse::<ScalerKind>().unwrap(), ScalerKind::None);
        assert!(matches!(
            "log".parse::<ScalerKind>(),
            Err(EmulikeError::UnknownVariant { kind: "scaler", .. })
        ));
    }

    #[test]
    fn test_standard() {
        let scaler = Scaler::fit(ScalerKind::Standard, &data()).unwrap();
        let scaled = scaler.transform(&data()).unwrap();

        let mean = scaled.mean_axis(Axis(0)).unwrap();
        assert!(mean.iter().all(|m| m.abs() < 1e-12));
        let std = scaled.std_axis(Axis(0), 0.0);
        assert!((std[0] - 1.0).abs() < 1e-12);
        assert!((std[1] - 1.0).abs() < 1e-12);
        // Constant column is centered but not divided by zero
        assert_eq!(scaler.scale[2], 1.0);
        assert!(scaled.column(2).iter().all(|&v| v == 0.0));
    }

    #[test]
    fn test_minmax_variants() {
        let scaled = Scaler::fit(ScalerKind::MinMax, &data())
            .unwrap()
            .transform(&data())
            .unwrap();
        assert_close(
            &scaled,
            &arr2(&[[0.0, 0.0, 0.0], [0.5, 0.2, 0.0], [1.0, 1.0, 0.0]]),
        );

        let scaled = Scaler::fit(ScalerKind::MinMaxSymmetric, &data())
            .unwrap()
            .transform(&data())
            .unwrap();
        assert_close(
            &scaled,
            &arr2(&[[-1.0, -1.0, 0.0], [0.0, -0.6, 0.0], [1.0, 1.0, 0.0]]),
        );
    }

    #[test]
    fn test_inverse_transform() {
        for kind in [
            ScalerKind::None,
            ScalerKind::Standard,
            ScalerKind::MinMax,
            ScalerKind::MinMaxSymmetric,
        ] {
            let scaler = Scaler::fit(kind, &data()).unwrap();
            let back = scaler
                .inverse_transform(&scaler.transform(&data()).unwrap())
                .unwrap();
            assert_close(&back, &data());
        }
    }

    #[test]
    fn test_refit_is_idempotent() {
        let a = Scaler::fit(ScalerKind::Standard, &data()).unwrap();
        let b = Scaler::fit(ScalerKind::Standard, &data()).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_rejects_bad_input() {
        assert!(Scaler::fit(ScalerKind::MinMax, &Array2::zeros((0, 2))).is_err());

        let scaler = Scaler::fit(ScalerKind::MinMax, &data()).unwrap();
        assert!(scaler.transform(&arr2(&[[1.0, 2.0]])).is_err());
    }

    #[test]
    fn test_serializes() {
        let scaler = Scaler::fit(ScalerKind::MinMaxSymmetric, &data()).unwrap();
        let document = toml::to_string(&scaler).unwrap();
        assert!(document.contains("kind = \"minmax_symmetric\""));
        assert_eq!(toml::from_str::<Scaler>(&document).unwrap(), scaler);
    }
}
