//! Feature encoding for workout records.
//!
//! Output layout (width `3 + |vocabulary|`):
//!
//! ```text
//! [duration_minutes, calories_intake, sleep_hours, onehot(workout_type)...]
//! ```
//!
//! Numeric fields pass through unscaled; the model is tree-based and
//! invariant to monotone rescaling. The one-hot block follows the fitted
//! vocabulary, which is sorted lexicographically and persisted as an explicit
//! list so column meaning cannot drift between processes. A workout type
//! outside the vocabulary encodes to an all-zero block.

use crate::dataset::WorkoutRecord;
use crate::error::{PerfError, Result};
use crate::preprocessing::traits::{FittedTransformer, Transformer};
use ndarray::ArrayViewMut1;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Version of the encoded layout. Bump whenever the column layout changes.
pub const ENCODER_VERSION: u32 = 1;

/// Names of the passthrough numeric columns, in output order.
pub const NUMERIC_FEATURES: [&str; 3] = ["duration_minutes", "calories_intake", "sleep_hours"];

/// Unfitted feature encoder.
///
/// Has no hyperparameters; every call to [`Transformer::fit`] produces an
/// independent [`FittedFeatureEncoder`].
#[derive(Clone, Debug, Default)]
pub struct FeatureEncoder;

impl FeatureEncoder {
    /// Create a new encoder.
    pub fn new() -> Self {
        Self
    }
}

/// Serializable parameters for a fitted encoder.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FeatureEncoderParams {
    /// Sorted, de-duplicated workout types seen during fit.
    pub vocabulary: Vec<String>,
}

/// Fitted encoder ready for inference.
#[derive(Clone, Debug, PartialEq)]
pub struct FittedFeatureEncoder {
    vocabulary: Vec<String>,
}

impl FittedFeatureEncoder {
    /// Workout types known to the encoder, in one-hot column order.
    pub fn vocabulary(&self) -> &[String] {
        &self.vocabulary
    }

    /// Column of `workout_type` within the one-hot block, if known.
    pub fn category_index(&self, workout_type: &str) -> Option<usize> {
        self.vocabulary
            .binary_search_by(|c| c.as_str().cmp(workout_type))
            .ok()
    }
}

impl Transformer for FeatureEncoder {
    type Sample = WorkoutRecord;
    type Params = FeatureEncoderParams;
    type Fitted = FittedFeatureEncoder;

    fn fit(&self, data: &[WorkoutRecord]) -> Result<FittedFeatureEncoder> {
        if data.is_empty() {
            return Err(PerfError::TrainingData(
                "Cannot fit FeatureEncoder on empty data".to_string(),
            ));
        }

        let vocabulary: Vec<String> = data
            .iter()
            .map(|r| r.workout_type.clone())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();

        Ok(FittedFeatureEncoder { vocabulary })
    }
}

impl FittedTransformer for FittedFeatureEncoder {
    type Sample = WorkoutRecord;
    type Params = FeatureEncoderParams;

    fn n_features_out(&self) -> usize {
        NUMERIC_FEATURES.len() + self.vocabulary.len()
    }

    fn feature_names(&self) -> Vec<String> {
        NUMERIC_FEATURES
            .iter()
            .map(|s| s.to_string())
            .chain(self.vocabulary.iter().map(|c| format!("workout_type={}", c)))
            .collect()
    }

    fn transform_into(&self, sample: &WorkoutRecord, mut out: ArrayViewMut1<'_, f64>) {
        out[0] = sample.duration_minutes as f64;
        out[1] = sample.calories_intake as f64;
        out[2] = sample.sleep_hours;
        // Unknown categories leave the block at zero.
        if let Some(idx) = self.category_index(&sample.workout_type) {
            out[NUMERIC_FEATURES.len() + idx] = 1.0;
        }
    }

    fn extract_params(&self) -> FeatureEncoderParams {
        FeatureEncoderParams {
            vocabulary: self.vocabulary.clone(),
        }
    }

    fn from_params(params: FeatureEncoderParams) -> Result<Self> {
        let sorted_unique = params.vocabulary.windows(2).all(|w| w[0] < w[1]);
        if !sorted_unique {
            return Err(PerfError::IncompatibleArtifact(
                "encoder vocabulary must be sorted and unique".to_string(),
            ));
        }
        Ok(Self {
            vocabulary: params.vocabulary,
        })
    }
}
