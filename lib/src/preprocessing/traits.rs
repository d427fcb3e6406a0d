//! Core traits for preprocessing transformers.
//!
//! This module defines the two central traits:
//! - [`Transformer`]: Used during fitting; has hyperparameters and learns from data.
//! - [`FittedTransformer`]: After fitting; frozen, ready for inference and serialization.

use crate::error::Result;
use crate::serialization::SerializableParams;
use ndarray::{Array1, Array2, ArrayViewMut1};

/// Trait for unfitted transformers.
///
/// A transformer learns parameters from training samples and produces a
/// [`FittedTransformer`] that applies them. The unfitted value itself is
/// never used for transformation, so it cannot leak state between fits.
///
/// # Example
/// ```ignore
/// use workout_perf::preprocessing::{FeatureEncoder, Transformer, FittedTransformer};
///
/// let fitted = FeatureEncoder::new().fit(dataset.features())?;
/// let x = fitted.transform_batch(dataset.features());
/// ```
pub trait Transformer: Clone {
    /// Type of a single raw sample.
    type Sample;
    /// Serializable representation of learned parameters.
    type Params: SerializableParams;
    /// The fitted transformer type ready for inference.
    type Fitted: FittedTransformer<Sample = Self::Sample, Params = Self::Params>;

    /// Fit the transformer to the training samples.
    ///
    /// # Errors
    /// Returns [`PerfError::TrainingData`](crate::error::PerfError::TrainingData)
    /// if the samples cannot be fitted (e.g. there are none).
    fn fit(&self, data: &[Self::Sample]) -> Result<Self::Fitted>;

    /// Fit the transformer and transform the same samples in one step.
    fn fit_transform(&self, data: &[Self::Sample]) -> Result<Array2<f64>> {
        let fitted = self.fit(data)?;
        Ok(fitted.transform_batch(data))
    }
}

/// Trait for fitted transformers ready for inference.
///
/// # Guarantees
/// - The output width (`n_features_out`) is fixed at fit time and never changes.
/// - `extract_params()` + `from_params()` is a round-trip.
/// - `transform` is total: every well-formed sample maps to a vector.
pub trait FittedTransformer: Clone + Sized {
    /// Type of a single raw sample.
    type Sample;
    /// Serializable representation of learned parameters.
    type Params: SerializableParams;

    /// Width of every output vector.
    fn n_features_out(&self) -> usize;

    /// Names of the output columns, in output order.
    fn feature_names(&self) -> Vec<String>;

    /// Write the encoding of `sample` into `out`, which has length
    /// [`Self::n_features_out`] and is zero-initialised.
    fn transform_into(&self, sample: &Self::Sample, out: ArrayViewMut1<'_, f64>);

    /// Transform a single sample.
    fn transform(&self, sample: &Self::Sample) -> Array1<f64> {
        let mut out = Array1::zeros(self.n_features_out());
        self.transform_into(sample, out.view_mut());
        out
    }

    /// Transform a batch of samples into a `(n_samples, n_features_out)` matrix.
    fn transform_batch(&self, samples: &[Self::Sample]) -> Array2<f64> {
        let mut out = Array2::zeros((samples.len(), self.n_features_out()));
        for (sample, row) in samples.iter().zip(out.rows_mut()) {
            self.transform_into(sample, row);
        }
        out
    }

    /// Extract learned parameters as a serializable representation.
    fn extract_params(&self) -> Self::Params;

    /// Reconstruct a fitted transformer from parameters.
    fn from_params(params: Self::Params) -> Result<Self>;
}
