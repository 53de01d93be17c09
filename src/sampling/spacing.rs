//! Spacing strategies choosing where x is sampled.
//!
//! K_i: The whole x matrix is produced up front, before any evaluation.

use crate::models::{ConfigError, EmulikeError, Params, Prior, Result, prior_of};
use ndarray::Array2;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use std::fmt;
use std::str::FromStr;
use tracing::debug;

/// Available spacings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Spacing {
    /// Regular grid, same number of points along every varying parameter
    Grid,
    /// Independent uniform draws within each prior
    Random,
    /// Latin hypercube: one point per stratum along every parameter
    LatinHypercube,
}

impl Spacing {
    /// Identifier used in settings files.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Grid => "grid",
            Self::Random => "random",
            Self::LatinHypercube => "latin_hypercube",
        }
    }

    /// Generate the `n_samples × names.len()` x matrix.
    ///
    /// Columns follow `names`; each one is drawn within the prior declared
    /// for it in `params`. `seed` only matters for randomized spacings.
    pub fn generate(
        &self,
        params: &Params,
        names: &[String],
        n_samples: usize,
        seed: Option<u64>,
    ) -> Result<Array2<f64>> {
        if n_samples == 0 {
            return Err(EmulikeError::InvalidInput(
                "number of samples must be positive".to_string(),
            ));
        }
        if names.is_empty() {
            return Err(EmulikeError::InvalidInput(
                "no varying parameter (no entry declares a prior)".to_string(),
            ));
        }

        let priors = names
            .iter()
            .map(|name| prior_of(params, name))
            .collect::<std::result::Result<Vec<_>, ConfigError>>()?;

        let mut rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        };

        debug!(spacing = self.name(), n_samples, n_x = priors.len(), "Generating x");
        match self {
            Self::Grid => grid(&priors, n_samples),
            Self::Random => Ok(random(&priors, n_samples, &mut rng)),
            Self::LatinHypercube => Ok(latin_hypercube(&priors, n_samples, &mut rng)),
        }
    }
}

impl FromStr for Spacing {
    type Err = EmulikeError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "grid" => Ok(Self::Grid),
            "random" | "uniform" => Ok(Self::Random),
            "latin_hypercube" | "lhs" => Ok(Self::LatinHypercube),
            other => Err(EmulikeError::unknown("spacing", other)),
        }
    }
}

impl fmt::Display for Spacing {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

fn linspace(prior: &Prior, points: usize) -> Vec<f64> {
    if points == 1 {
        return vec![prior.min];
    }
    (0..points)
        .map(|i| prior.min + prior.width() * i as f64 / (points - 1) as f64)
        .collect()
}

fn grid(priors: &[Prior], n_samples: usize) -> Result<Array2<f64>> {
    let dims = priors.len();
    let per_dim = (n_samples as f64).powf(1.0 / dims as f64).round() as usize;
    if per_dim.checked_pow(dims as u32) != Some(n_samples) {
        return Err(EmulikeError::InvalidInput(format!(
            "grid spacing needs a number of samples equal to k^{dims}, got {n_samples}"
        )));
    }

    let axes: Vec<Vec<f64>> = priors.iter().map(|p| linspace(p, per_dim)).collect();
    // Last parameter varies fastest
    Ok(Array2::from_shape_fn((n_samples, dims), |(row, col)| {
        let stride = per_dim.pow((dims - 1 - col) as u32);
        axes[col][(row / stride) % per_dim]
    }))
}

fn random(priors: &[Prior], n_samples: usize, rng: &mut StdRng) -> Array2<f64> {
    Array2::from_shape_fn((n_samples, priors.len()), |(_, col)| {
        priors[col].min + priors[col].width() * rng.random::<f64>()
    })
}

fn latin_hypercube(priors: &[Prior], n_samples: usize, rng: &mut StdRng) -> Array2<f64> {
    let mut x = Array2::zeros((n_samples, priors.len()));
    let mut strata: Vec<usize> = (0..n_samples).collect();

    for (col, prior) in priors.iter().enumerate() {
        strata.shuffle(rng);
        for (row, &stratum) in strata.iter().enumerate() {
            let u = (stratum as f64 + rng.random::<f64>()) / n_samples as f64;
            x[[row, col]] = prior.min + prior.width() * u;
        }
    }
    x
}
