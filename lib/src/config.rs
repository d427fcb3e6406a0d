//! Runtime settings, read from an optional TOML file.
//!
//! Every key has a default, so an empty file (or no file) is valid:
//!
//! ```toml
//! log_level = "info"
//!
//! [training]
//! seed = 42
//! test_size = 0.2
//! folds = 5
//! data_path = "fitness_data.csv"
//!
//! [model]
//! n_estimators = 200
//! max_depth = 5
//! learning_rate = 0.1
//! reg_lambda = 1.0
//! min_child_weight = 1.0
//! subsample = 1.0
//!
//! [store]
//! dir = "."
//!
//! [server]
//! host = "0.0.0.0"
//! port = 5001
//! ```

use crate::error::{PerfError, Result};
use crate::model::BoostingParams;
use crate::trainer::TrainingConfig;
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::{Path, PathBuf};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TrainingSettings {
    pub seed: u64,
    pub test_size: f64,
    pub folds: usize,
    /// Dataset CSV read by `train` and written by `generate`.
    pub data_path: PathBuf,
}

impl Default for TrainingSettings {
    fn default() -> Self {
        Self {
            seed: 42,
            test_size: 0.2,
            folds: 5,
            data_path: PathBuf::from("fitness_data.csv"),
        }
    }
}

/// Model hyperparameters; the seed comes from `[training]`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ModelSettings {
    pub n_estimators: usize,
    pub max_depth: usize,
    pub learning_rate: f64,
    pub reg_lambda: f64,
    pub min_child_weight: f64,
    pub subsample: f64,
}

impl Default for ModelSettings {
    fn default() -> Self {
        let p = BoostingParams::default();
        Self {
            n_estimators: p.n_estimators,
            max_depth: p.max_depth,
            learning_rate: p.learning_rate,
            reg_lambda: p.reg_lambda,
            min_child_weight: p.min_child_weight,
            subsample: p.subsample,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct StoreSettings {
    /// Directory holding the artifact and metrics files.
    pub dir: PathBuf,
}

impl Default for StoreSettings {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("."),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ServerSettings {
    /// IP address to bind.
    pub host: String,
    pub port: u16,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 5001,
        }
    }
}

impl ServerSettings {
    pub fn addr(&self) -> Result<SocketAddr> {
        format!("{}:{}", self.host, self.port)
            .parse()
            .map_err(|e| PerfError::Config(format!("invalid server address {}: {}", self.host, e)))
    }
}

/// All settings of the `workout-perf` binary.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Settings {
    pub log_level: String,
    pub training: TrainingSettings,
    pub model: ModelSettings,
    pub store: StoreSettings,
    pub server: ServerSettings,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            training: TrainingSettings::default(),
            model: ModelSettings::default(),
            store: StoreSettings::default(),
            server: ServerSettings::default(),
        }
    }
}

impl Settings {
    /// Parse settings from TOML text. Values are not validated.
    pub fn from_toml_str(text: &str) -> Result<Self> {
        Ok(toml::from_str(text)?)
    }

    /// Read settings from `path`, or the defaults when `path` is `None`.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        match path {
            None => Ok(Self::default()),
            Some(path) => {
                let text = std::fs::read_to_string(path).map_err(|e| {
                    PerfError::Config(format!("cannot read {}: {}", path.display(), e))
                })?;
                Self::from_toml_str(&text)
            }
        }
    }

    pub fn boosting_params(&self) -> BoostingParams {
        BoostingParams {
            n_estimators: self.model.n_estimators,
            max_depth: self.model.max_depth,
            learning_rate: self.model.learning_rate,
            reg_lambda: self.model.reg_lambda,
            min_child_weight: self.model.min_child_weight,
            subsample: self.model.subsample,
            seed: self.training.seed,
        }
    }

    pub fn training_config(&self) -> TrainingConfig {
        TrainingConfig {
            seed: self.training.seed,
            test_size: self.training.test_size,
            folds: self.training.folds,
            boosting: self.boosting_params(),
        }
    }

    /// Reject out-of-range values.
    pub fn validate(&self) -> Result<()> {
        self.training_config().validate()?;
        self.server.addr()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let s = Settings::default();
        assert_eq!(s.training.seed, 42);
        assert_eq!(s.training.test_size, 0.2);
        assert_eq!(s.training.folds, 5);
        assert_eq!(s.model.n_estimators, 200);
        assert_eq!(s.model.max_depth, 5);
        assert_eq!(s.server.port, 5001);
        assert_eq!(s.store.dir, PathBuf::from("."));
        assert!(s.validate().is_ok());
    }

    #[test]
    fn test_empty_toml_is_default() {
        assert_eq!(Settings::from_toml_str("").unwrap(), Settings::default());
    }

    #[test]
    fn test_partial_toml() {
        let s = Settings::from_toml_str(
            r#"
            log_level = "debug"
            [training]
            seed = 7
            [model]
            n_estimators = 50
            [server]
            port = 8080
            "#,
        )
        .unwrap();
        assert_eq!(s.log_level, "debug");
        assert_eq!(s.training.seed, 7);
        assert_eq!(s.training.test_size, 0.2);
        assert_eq!(s.model.n_estimators, 50);
        assert_eq!(s.model.max_depth, 5);
        assert_eq!(s.server.port, 8080);
        assert_eq!(s.training_config().boosting.seed, 7);
    }

    #[test]
    fn test_unknown_key_rejected() {
        let err = Settings::from_toml_str("[training]\nsed = 1\n").unwrap_err();
        assert!(matches!(err, PerfError::Config(_)));
    }

    #[test]
    fn test_validate_rejects_out_of_range() {
        let mut s = Settings::default();
        s.training.test_size = 1.0;
        assert!(s.validate().is_err());

        let mut s = Settings::default();
        s.training.folds = 1;
        assert!(s.validate().is_err());

        let mut s = Settings::default();
        s.model.learning_rate = 0.0;
        assert!(s.validate().is_err());

        let mut s = Settings::default();
        s.model.subsample = 0.0;
        assert!(s.validate().is_err());

        let mut s = Settings::default();
        s.server.host = "not an ip".to_string();
        assert!(s.validate().is_err());
    }

    #[test]
    fn test_load_file() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("perf.toml");
        std::fs::write(&path, "[store]\ndir = \"models\"\n").unwrap();
        let s = Settings::load(Some(&path)).unwrap();
        assert_eq!(s.store.dir, PathBuf::from("models"));
        assert!(Settings::load(Some(&tmp.path().join("missing.toml"))).is_err());
        assert_eq!(Settings::load(None).unwrap(), Settings::default());
    }
}
