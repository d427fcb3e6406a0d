//! # workout-perf
//!
//! Predicts a workout performance score from four observed features
//! (workout type, duration, calorie intake, sleep hours) with a
//! gradient-boosted tree ensemble.
//!
//! ## Core Design Principles
//!
//! - **Stateful Type Safety**: models, encoders and the prediction service
//!   carry their state in the type (`Unfitted`/`Fitted`, `Unready`/`Ready`).
//!   An unfitted model has no `predict`; an unready service answers nothing.
//! - **One Encoding**: the encoder fitted at training time is persisted with
//!   the model as a single versioned artifact, and serving applies exactly
//!   that encoder.
//! - **Reproducibility**: the split, the folds and the model are all seeded;
//!   the same data and seed produce the same artifact and metrics.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use workout_perf::dataset::{synthetic, WorkoutRecord};
//! use workout_perf::service::PredictionService;
//! use workout_perf::store::ArtifactStore;
//! use workout_perf::trainer::{TrainingConfig, TrainingPipeline};
//!
//! # fn main() -> workout_perf::Result<()> {
//! let data = synthetic::generate(500, 42)?;
//! let outcome = TrainingPipeline::new(TrainingConfig::default())?.run(&data)?;
//!
//! let store = ArtifactStore::new("models");
//! store.save(&outcome.artifact, &outcome.report)?;
//!
//! let service = PredictionService::new(store).load()?;
//! let score = service.predict_record(&WorkoutRecord::new("run", 45, 2200, 7.0)?);
//! println!("predicted performance: {score:.2}");
//! # Ok(())
//! # }
//! ```
//!
//! ## Module Structure
//!
//! - `dataset`: workout records, CSV datasets, synthetic data
//! - `preprocessing`: the feature encoder
//! - `loss`: boosting objectives
//! - `model`: regression trees and the boosted ensemble
//! - `metrics`: RMSE, MAE, R² and the persisted report
//! - `trainer`: split, fit, evaluate, cross-validate
//! - `artifact`: the versioned encoder + model unit
//! - `store`: artifact and metrics persistence
//! - `service`: the prediction service
//! - `http`: the HTTP transport

/// The versioned encoder + model unit.
pub mod artifact;

/// Runtime settings.
pub mod config;

/// Workout records and labeled datasets.
pub mod dataset;

pub mod error;

/// HTTP routes over the prediction service.
pub mod http;

pub mod logging;

/// Boosting objectives.
pub mod loss;

/// Regression evaluation metrics.
pub mod metrics;

/// Regression models with compile-time state safety.
pub mod model;

/// Feature encoding.
pub mod preprocessing;

/// Parameter serialization.
pub mod serialization;

pub mod service;

/// Artifact and metrics persistence.
pub mod store;

/// Training pipeline.
pub mod trainer;

pub use error::{PerfError, Result};
