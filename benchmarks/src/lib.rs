//! Shared fixtures for the workout-perf benchmarks.
//!
//! Everything is generated from the synthetic data generator with fixed
//! seeds, so benches need no files on disk.

use workout_perf::artifact::FittedArtifact;
use workout_perf::dataset::{synthetic, Dataset, WorkoutRecord};
use workout_perf::model::BoostingParams;
use workout_perf::trainer::{TrainingConfig, TrainingPipeline};

/// Seed used by every fixture.
pub const SEED: u64 = 42;

/// Synthetic dataset of `rows` rows.
pub fn dataset(rows: usize) -> workout_perf::Result<Dataset> {
    synthetic::generate(rows, SEED)
}

/// Artifact fitted on all `rows` synthetic rows with `n_estimators` trees.
pub fn trained_artifact(rows: usize, n_estimators: usize) -> workout_perf::Result<FittedArtifact> {
    let config = TrainingConfig::default()
        .with_seed(SEED)
        .with_boosting(BoostingParams::default().with_n_estimators(n_estimators));
    TrainingPipeline::new(config)?.fit(&dataset(rows)?)
}

/// `n` prediction requests cycling through the generator's workout types.
pub fn request_records(n: usize) -> Vec<WorkoutRecord> {
    (0..n)
        .map(|i| WorkoutRecord {
            workout_type: synthetic::WORKOUT_TYPES[i % synthetic::WORKOUT_TYPES.len()].to_string(),
            duration_minutes: 15 + (i % 76) as u32,
            calories_intake: 1400 + (i % 1801) as u32,
            sleep_hours: 4.5 + (i % 46) as f64 * 0.1,
        })
        .collect()
}

/// Truth/prediction pair of length `n` with a constant offset.
pub fn offset_pair(n: usize) -> (Vec<f64>, Vec<f64>) {
    let y_true: Vec<f64> = (0..n).map(|i| i as f64 * 0.1).collect();
    let y_pred: Vec<f64> = y_true.iter().map(|v| v + 0.5).collect();
    (y_true, y_pred)
}
