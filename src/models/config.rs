//! Configuration models for emulike.
//!
//! All I^R (resolvable ignorance) is parameterized here.
//! The user resolves these unknowns at runtime via TOML files: the run
//! configuration of the sample pipeline and the settings record stored
//! next to every generated sample.

use regex::{Captures, Regex};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Parameters passed to a sampled function, in declaration order.
///
/// Entries that are tables with a `prior` key vary across the sample and
/// become x columns; every other entry is held fixed.
pub type Params = toml::Table;

/// Header written on top of every persisted settings file.
pub const SETTINGS_HEADER: &str = "# Settings used to generate this sample. Do not edit by hand.";

/// Record of how a sample was generated.
///
/// K_i: Persisted next to the data and required to resume a run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Settings {
    /// Identifier of the sampled function
    pub sampled_function: String,

    /// Total number of samples requested
    pub n_samples: usize,

    /// Identifier of the spacing strategy for x
    pub spacing: String,

    /// Seed for randomized spacings (fresh entropy if absent)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seed: Option<u64>,

    /// Fixed and varying parameters
    #[serde(default)]
    pub params: Params,
}

impl Settings {
    /// Build a settings record.
    pub fn new(
        params: Params,
        sampled_function: impl Into<String>,
        n_samples: usize,
        spacing: impl Into<String>,
    ) -> Self {
        Self {
            sampled_function: sampled_function.into(),
            n_samples,
            spacing: spacing.into(),
            seed: None,
            params,
        }
    }

    /// Set the spacing seed.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Names of the varying parameters, in declaration order.
    pub fn varying_names(&self) -> Vec<String> {
        self.params
            .iter()
            .filter(|(_, value)| is_varying(value))
            .map(|(name, _)| name.clone())
            .collect()
    }

    /// Load settings from a TOML file.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::FileRead {
            path: path.to_owned(),
            source: e,
        })?;

        toml::from_str(&content).map_err(|e| ConfigError::Parse {
            path: path.to_owned(),
            source: e,
        })
    }

    /// Render the settings document, header included.
    pub fn to_document(&self) -> Result<String, ConfigError> {
        let body = toml::to_string_pretty(self).map_err(ConfigError::Serialize)?;
        Ok(format!("{SETTINGS_HEADER}\n{body}"))
    }
}

/// Prior range of a varying parameter.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Prior {
    pub min: f64,
    pub max: f64,
}

impl Prior {
    /// Width of the range.
    pub fn width(&self) -> f64 {
        self.max - self.min
    }
}

/// Check whether a parameter entry declares a prior.
pub fn is_varying(value: &toml::Value) -> bool {
    value
        .as_table()
        .is_some_and(|table| table.contains_key("prior"))
}

/// Extract the prior of a varying parameter.
pub fn prior_of(params: &Params, name: &str) -> Result<Prior, ConfigError> {
    let prior = params
        .get(name)
        .and_then(|value| value.as_table())
        .and_then(|table| table.get("prior"))
        .ok_or_else(|| ConfigError::InvalidParam {
            name: name.to_string(),
            reason: "missing prior".to_string(),
        })?;

    let prior: Prior = prior
        .clone()
        .try_into()
        .map_err(|e: toml::de::Error| ConfigError::InvalidParam {
            name: name.to_string(),
            reason: e.message().to_string(),
        })?;

    if !(prior.min.is_finite() && prior.max.is_finite()) || prior.min > prior.max {
        return Err(ConfigError::InvalidParam {
            name: name.to_string(),
            reason: format!("prior range [{}, {}] is not valid", prior.min, prior.max),
        });
    }
    Ok(prior)
}

/// Numeric value of a fixed parameter, if present.
pub fn fixed_value(params: &Params, name: &str) -> Option<f64> {
    match params.get(name)? {
        toml::Value::Float(v) => Some(*v),
        toml::Value::Integer(v) => Some(*v as f64),
        _ => None,
    }
}

/// File names of the canonical sample folder.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileNames {
    /// x array file
    #[serde(default = "default_x_file")]
    pub x: String,

    /// y array file
    #[serde(default = "default_y_file")]
    pub y: String,

    /// Settings file
    #[serde(default = "default_settings_file")]
    pub settings: String,
}

fn default_x_file() -> String {
    "x_sample.txt".to_string()
}

fn default_y_file() -> String {
    "y_sample.txt".to_string()
}

fn default_settings_file() -> String {
    "settings.toml".to_string()
}

impl Default for FileNames {
    fn default() -> Self {
        Self {
            x: default_x_file(),
            y: default_y_file(),
            settings: default_settings_file(),
        }
    }
}

/// Run configuration of the sample pipeline.
///
/// ```toml
/// output = "${SAMPLES}/planck_lcdm"
///
/// [sample]
/// sampled_function = "gaussian"
/// n_samples = 1000
/// spacing = "latin_hypercube"
/// seed = 42
///
/// [sample.params]
/// sigma = 0.3
/// omega_b = { prior = { min = 0.02, max = 0.025 } }
/// h = { prior = { min = 0.6, max = 0.8 } }
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SampleConfig {
    /// Output folder (supports ${VAR} expansion)
    pub output: PathBuf,

    /// File names inside the output folder
    #[serde(default)]
    pub files: FileNames,

    /// Generation settings
    pub sample: Settings,
}

impl SampleConfig {
    /// Load configuration from a TOML file.
    ///
    /// B_i(file exists) → Result
    /// B_i(file is valid TOML) → Result
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::FileRead {
            path: path.to_owned(),
            source: e,
        })?;

        toml::from_str(&content).map_err(|e| ConfigError::Parse {
            path: path.to_owned(),
            source: e,
        })
    }

    /// Output folder with environment variables expanded.
    pub fn output_dir(&self) -> PathBuf {
        expand_output_path(&self.output)
    }
}

/// Substitute `${VAR}` placeholders in an output path.
///
/// Unset variables keep their placeholder, so the folder name shows what was
/// missing.
fn expand_output_path(path: &Path) -> PathBuf {
    let raw = path.to_string_lossy();
    let Ok(placeholder) = Regex::new(r"\$\{([^}]+)\}") else {
        return path.to_path_buf();
    };

    let expanded = placeholder.replace_all(&raw, |caps: &Captures| {
        std::env::var(&caps[1]).unwrap_or_else(|_| caps[0].to_string())
    });
    PathBuf::from(expanded.as_ref())
}

/// Configuration errors.
///
/// Epistemic origin:
/// - B_i falsified: File not found, parse error
/// - I^B materialized: Missing or malformed parameter entries
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    FileRead {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse config file {path}: {source}")]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },

    #[error("Failed to serialize settings: {0}")]
    Serialize(toml::ser::Error),

    #[error("Invalid parameter '{name}': {reason}")]
    InvalidParam { name: String, reason: String },
}
