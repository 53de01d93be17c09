//! Sampled functions: the expensive functions an emulator approximates.
//!
//! Epistemic foundation:
//! - K_i: The first call (bootstrap) pays any one-time setup cost and returns
//!   a reusable model
//! - K_i: The model is never persisted; a resumed run rebuilds it from the
//!   first x row
//! - B_i: Every evaluation may fail → Result

use crate::models::{ConfigError, EmulikeError, Params, Result, fixed_value};
use ndarray::{Array1, ArrayView1, arr1};
use std::fmt;
use std::str::FromStr;

/// Reusable state of a sampled function, built once per run.
pub trait Model {
    /// Evaluate one x row.
    fn evaluate(&mut self, x: ArrayView1<f64>) -> Result<Array1<f64>>;
}

/// Output of the bootstrap call.
pub struct Bootstrap {
    /// y row for the bootstrap x
    pub y: Array1<f64>,
    /// Names of the y columns, if the function knows them
    pub y_names: Option<Vec<String>>,
    /// Model to reuse for every later row
    pub model: Box<dyn Model>,
}

impl fmt::Debug for Bootstrap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Bootstrap")
            .field("y", &self.y)
            .field("y_names", &self.y_names)
            .finish_non_exhaustive()
    }
}

/// A function that can be sampled row by row.
pub trait SampledFunction {
    /// Identifier stored in the sample settings.
    fn name(&self) -> &str;

    /// Evaluate the first row and build the model reused for the others.
    ///
    /// `x_names` are the varying parameters (the x columns); `params` holds
    /// every parameter, fixed ones included.
    fn bootstrap(&self, x: ArrayView1<f64>, x_names: &[String], params: &Params)
    -> Result<Bootstrap>;
}

/// Built-in analytic functions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FunctionKind {
    /// `y = offset + slope * sum(x)`
    Linear,
    /// `y = offset + sum((x - center)^2)`
    Quadratic,
    /// Gaussian likelihood: `chi2 = sum(((x - mean) / sigma)^2)`, `loglike = -chi2 / 2`
    Gaussian,
}

impl FunctionKind {
    /// Identifier used in settings files.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Linear => "linear",
            Self::Quadratic => "quadratic",
            Self::Gaussian => "gaussian",
        }
    }
}

impl FromStr for FunctionKind {
    type Err = EmulikeError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "linear" => Ok(Self::Linear),
            "quadratic" => Ok(Self::Quadratic),
            "gaussian" => Ok(Self::Gaussian),
            other => Err(EmulikeError::unknown("sampled function", other)),
        }
    }
}

impl fmt::Display for FunctionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl SampledFunction for FunctionKind {
    fn name(&self) -> &str {
        FunctionKind::name(self)
    }

    fn bootstrap(
        &self,
        x: ArrayView1<f64>,
        x_names: &[String],
        params: &Params,
    ) -> Result<Bootstrap> {
        let n_x = x_names.len();
        let fixed = |name: &str, default: f64| fixed_value(params, name).unwrap_or(default);

        let (mut model, y_names): (Box<dyn Model>, Vec<&str>) = match self {
            Self::Linear => (
                Box::new(Linear {
                    n_x,
                    offset: fixed("offset", 0.0),
                    slope: fixed("slope", 1.0),
                }),
                vec!["y"],
            ),
            Self::Quadratic => (
                Box::new(Quadratic {
                    n_x,
                    offset: fixed("offset", 0.0),
                    center: fixed("center", 0.0),
                }),
                vec!["y"],
            ),
            Self::Gaussian => {
                let sigma = fixed("sigma", 1.0);
                if sigma <= 0.0 {
                    return Err(ConfigError::InvalidParam {
                        name: "sigma".to_string(),
                        reason: format!("must be positive, got {sigma}"),
                    }
                    .into());
                }
                (
                    Box::new(Gaussian {
                        n_x,
                        mean: fixed("mean", 0.0),
                        sigma,
                    }),
                    vec!["loglike", "chi2"],
                )
            }
        };

        let y = model.evaluate(x)?;
        Ok(Bootstrap {
            y,
            y_names: Some(y_names.into_iter().map(String::from).collect()),
            model,
        })
    }
}

fn check_len(x: &ArrayView1<f64>, n_x: usize) -> Result<()> {
    if x.len() != n_x {
        return Err(EmulikeError::InvalidInput(format!(
            "expected {n_x} x values, got {}",
            x.len()
        )));
    }
    Ok(())
}

struct Linear {
    n_x: usize,
    offset: f64,
    slope: f64,
}

impl Model for Linear {
    fn evaluate(&mut self, x: ArrayView1<f64>) -> Result<Array1<f64>> {
        check_len(&x, self.n_x)?;
        Ok(arr1(&[self.offset + self.slope * x.sum()]))
    }
}

struct Quadratic {
    n_x: usize,
    offset: f64,
    center: f64,
}

impl Model for Quadratic {
    fn evaluate(&mut self, x: ArrayView1<f64>) -> Result<Array1<f64>> {
        check_len(&x, self.n_x)?;
        let sum: f64 = x.iter().map(|v| (v - self.center).powi(2)).sum();
        Ok(arr1(&[self.offset + sum]))
    }
}

struct Gaussian {
    n_x: usize,
    mean: f64,
    sigma: f64,
}

impl Model for Gaussian {
    fn evaluate(&mut self, x: ArrayView1<f64>) -> Result<Array1<f64>> {
        check_len(&x, self.n_x)?;
        let chi2: f64 = x.iter().map(|v| ((v - self.mean) / self.sigma).powi(2)).sum();
        Ok(arr1(&[-0.5 * chi2, chi2]))
    }
}
