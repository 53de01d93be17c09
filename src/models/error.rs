//! Error types for emulike.
//!
//! Epistemic taxonomy:
//! - B_i falsified: Expected failures (bad path, incompatible samples, unknown ids)
//! - I^B materialized: Infrastructure failures (filesystem, evaluation)
//! - K_i violated: Internal invariant violations (inconsistent on-disk state)

use std::path::PathBuf;
use thiserror::Error;

/// Top-level error type for emulike.
#[derive(Debug, Error)]
pub enum EmulikeError {
    // ═══════════════════════════════════════════════════════════════════
    // B_i FALSIFIED — Belief proven wrong (expected failures)
    // ═══════════════════════════════════════════════════════════════════

    #[error("Configuration error: {0}")]
    Config(#[from] super::ConfigError),

    #[error("Invalid sample path {0:?}: not a file pair, a sample folder or a combined file")]
    InvalidPath(PathBuf),

    #[error("Samples can not be joined: {0}")]
    IncompatibleSample(String),

    #[error("Unknown {kind}: '{name}'")]
    UnknownVariant { kind: &'static str, name: String },

    #[error("Output folder {0:?} is not empty, refusing to overwrite it (resume instead)")]
    OutputNotEmpty(PathBuf),

    #[error("Sample can not be resumed: {0}")]
    NotResumable(String),

    #[error("Sample has not been split into train and test yet")]
    NotSplit,

    #[error("Invalid column selection: {0}")]
    InvalidColumns(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Parse error in {path:?} at line {line}: {message}")]
    Parse {
        path: PathBuf,
        line: usize,
        message: String,
    },

    // ═══════════════════════════════════════════════════════════════════
    // I^B MATERIALIZED — Bounded ignorance became known-bad
    // ═══════════════════════════════════════════════════════════════════

    #[error("Sampled function '{function}' failed at row {row}: {message}")]
    Evaluation {
        function: String,
        row: usize,
        message: String,
    },

    #[error("IO error: {context}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },

    // ═══════════════════════════════════════════════════════════════════
    // K_i VIOLATED — Invariant broken (corrupted or foreign data)
    // ═══════════════════════════════════════════════════════════════════

    #[error("Inconsistent sample: {0}")]
    InconsistentSample(String),
}

impl EmulikeError {
    /// Create an IO error with context.
    pub fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            context: context.into(),
            source,
        }
    }

    /// Create an unknown-identifier error for a registry.
    pub fn unknown(kind: &'static str, name: impl Into<String>) -> Self {
        Self::UnknownVariant {
            kind,
            name: name.into(),
        }
    }

    /// Check if the on-disk sample this error came from can still be resumed.
    ///
    /// Evaluation and I/O failures during generation leave the x file and a
    /// prefix of the y file behind, which `Sample::resume` picks up.
    pub fn is_resumable(&self) -> bool {
        matches!(self, Self::Evaluation { .. } | Self::Io { .. })
    }
}

/// Result type alias for emulike.
pub type Result<T> = std::result::Result<T, EmulikeError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unknown_variant_message() {
        let err = EmulikeError::unknown("spacing", "hexagonal");
        assert_eq!(err.to_string(), "Unknown spacing: 'hexagonal'");
    }

    #[test]
    fn test_resumable_errors() {
        let eval = EmulikeError::Evaluation {
            function: "linear".to_string(),
            row: 3,
            message: "diverged".to_string(),
        };
        assert!(eval.is_resumable());
        assert!(!EmulikeError::NotSplit.is_resumable());
    }
}
