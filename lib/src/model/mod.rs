//! Regression models with compile-time training state.
//!
//! A model type is parameterised by a state marker:
//! - [`Unfitted`]: carries hyperparameters, implements [`TrainableModel`].
//! - [`Fitted`]: carries learned parameters only, implements [`InferenceModel`].
//!
//! `predict` simply does not exist on an unfitted model, and a fitted model
//! cannot be trained further.

use crate::error::Result;
use crate::serialization::SerializableParams;
use ndarray::{Array1, ArrayView1, ArrayView2};

pub mod gbdt;
pub mod state;
pub mod tree;

pub use gbdt::{
    BoostingParams, GradientBoosting, GradientBoostingParams, GradientBoostingRegressor,
    MODEL_VERSION,
};
pub use state::{Fitted, Unfitted};
pub use tree::{RegressionTree, TreeNode};

/// A model that can be fitted on a feature matrix and label vector.
pub trait TrainableModel {
    /// The inference-only model produced by fitting.
    type Output: InferenceModel;

    /// Fit on `x` with shape `(n_samples, n_features)` and labels `y`.
    ///
    /// Fitting never mutates `self`; calling it twice yields two
    /// independent fitted models.
    fn fit(&self, x: ArrayView2<'_, f64>, y: ArrayView1<'_, f64>) -> Result<Self::Output>;
}

/// A fitted, immutable model.
pub trait InferenceModel: Sized {
    /// Serializable representation of the learned parameters.
    type Params: SerializableParams;

    /// Number of input features expected per row.
    fn n_features(&self) -> usize;

    /// Predict a single row.
    fn predict(&self, x: ArrayView1<'_, f64>) -> f64;

    /// Predict every row of `x`.
    fn predict_batch(&self, x: ArrayView2<'_, f64>) -> Array1<f64> {
        x.rows().into_iter().map(|row| self.predict(row)).collect()
    }

    /// Extract learned parameters.
    fn extract_params(&self) -> Self::Params;

    /// Rebuild a fitted model from parameters.
    fn from_params(params: Self::Params) -> Result<Self>;
}
