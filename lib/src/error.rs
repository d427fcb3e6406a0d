//! Error types shared by training, persistence and serving.

use std::path::PathBuf;

/// Error type for every fallible operation in the crate.
///
/// Variants map onto the failure classes of the system: training data
/// problems abort a training run, a missing artifact aborts service startup,
/// and input/metrics errors are reported per request without affecting the
/// service.
#[derive(Debug, thiserror::Error)]
pub enum PerfError {
    /// Degenerate or malformed training data.
    #[error("Training data error: {0}")]
    TrainingData(String),
    /// No trained artifact exists at the expected location.
    #[error("Model artifact not found at {}. Run training first", path.display())]
    ArtifactNotFound { path: PathBuf },
    /// An artifact exists but was written by an incompatible encoder/model version.
    #[error("Incompatible artifact: {0}")]
    IncompatibleArtifact(String),
    /// Malformed prediction request.
    #[error("Invalid input: {0}")]
    InvalidInput(String),
    /// Metrics requested before any training run completed.
    #[error("Metrics file not found at {}. Run training first", path.display())]
    MetricsUnavailable { path: PathBuf },
    /// Invalid configuration value.
    #[error("Invalid configuration: {0}")]
    Config(String),
    /// Serialization or deserialization failure.
    #[error("Serialization error: {0}")]
    Serialization(String),
    /// I/O failure during file operations.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    /// CSV reading or writing failure.
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
}

impl PerfError {
    /// HTTP-equivalent status class for this error.
    ///
    /// Input problems are the caller's fault (400), missing artifacts or
    /// metrics are "not found" (404), everything else is a server error.
    pub fn status_code(&self) -> u16 {
        match self {
            PerfError::InvalidInput(_) => 400,
            PerfError::ArtifactNotFound { .. } | PerfError::MetricsUnavailable { .. } => 404,
            _ => 500,
        }
    }
}

impl From<bincode::Error> for PerfError {
    fn from(err: bincode::Error) -> Self {
        PerfError::Serialization(err.to_string())
    }
}

impl From<serde_json::Error> for PerfError {
    fn from(err: serde_json::Error) -> Self {
        PerfError::Serialization(err.to_string())
    }
}

impl From<toml::de::Error> for PerfError {
    fn from(err: toml::de::Error) -> Self {
        PerfError::Config(err.to_string())
    }
}

/// Crate-wide result alias.
pub type Result<T> = std::result::Result<T, PerfError>;
