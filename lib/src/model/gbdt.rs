//! Gradient-boosted regression trees.
//!
//! - [`GradientBoostingRegressor`] = `GradientBoosting<Unfitted>`: hyperparameters only.
//! - `GradientBoosting<Fitted>`: base score plus an additive ensemble of trees.
//!
//! Training minimises squared error by Newton boosting: every round computes
//! per-row gradients at the current prediction, grows one depth-limited tree
//! on them by exact greedy search, and adds its (shrunk) output to the
//! prediction. Given the same rows in the same order and the same seed, the
//! ensemble is identical bit for bit.

use crate::error::{PerfError, Result};
use crate::loss::{Objective, SquaredError};
use crate::model::state::{Fitted, Unfitted};
use crate::model::tree::{presort, RegressionTree, TreeBuilder, TreeParams};
use crate::model::{InferenceModel, TrainableModel};
use ndarray::{ArrayView1, ArrayView2};
use rand::SeedableRng;
use rand_xoshiro::Xoshiro256PlusPlus;
use serde::{Deserialize, Serialize};
use std::marker::PhantomData;
use tracing::{debug, trace};

/// Version of the serialized ensemble layout.
pub const MODEL_VERSION: u32 = 1;

/// Boosting hyperparameters.
///
/// Defaults:
/// - `n_estimators`: 200
/// - `max_depth`: 5
/// - `learning_rate`: 0.1
/// - `reg_lambda`: 1.0
/// - `min_child_weight`: 1.0
/// - `subsample`: 1.0
/// - `seed`: 42
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BoostingParams {
    /// Number of boosting rounds (trees).
    pub n_estimators: usize,
    /// Maximum depth of each tree.
    pub max_depth: usize,
    /// Shrinkage applied to every tree's output.
    pub learning_rate: f64,
    /// L2 regularization on leaf weights.
    pub reg_lambda: f64,
    /// Minimum hessian sum per child.
    pub min_child_weight: f64,
    /// Fraction of rows sampled (without replacement) per tree.
    pub subsample: f64,
    /// Seed for row subsampling.
    pub seed: u64,
}

impl Default for BoostingParams {
    fn default() -> Self {
        Self {
            n_estimators: 200,
            max_depth: 5,
            learning_rate: 0.1,
            reg_lambda: 1.0,
            min_child_weight: 1.0,
            subsample: 1.0,
            seed: 42,
        }
    }
}

impl BoostingParams {
    pub fn with_n_estimators(mut self, n: usize) -> Self {
        self.n_estimators = n;
        self
    }

    pub fn with_max_depth(mut self, depth: usize) -> Self {
        self.max_depth = depth;
        self
    }

    pub fn with_learning_rate(mut self, rate: f64) -> Self {
        self.learning_rate = rate;
        self
    }

    pub fn with_subsample(mut self, fraction: f64) -> Self {
        self.subsample = fraction;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Reject values that make boosting ill-defined.
    pub fn validate(&self) -> Result<()> {
        if self.n_estimators == 0 {
            return Err(PerfError::Config("n_estimators must be at least 1".into()));
        }
        if self.max_depth == 0 {
            return Err(PerfError::Config("max_depth must be at least 1".into()));
        }
        if !(self.learning_rate.is_finite() && self.learning_rate > 0.0) {
            return Err(PerfError::Config(format!(
                "learning_rate must be positive, got {}",
                self.learning_rate
            )));
        }
        if !(self.reg_lambda.is_finite() && self.reg_lambda >= 0.0) {
            return Err(PerfError::Config(format!(
                "reg_lambda must be non-negative, got {}",
                self.reg_lambda
            )));
        }
        if !(self.min_child_weight.is_finite() && self.min_child_weight >= 0.0) {
            return Err(PerfError::Config(format!(
                "min_child_weight must be non-negative, got {}",
                self.min_child_weight
            )));
        }
        if !(self.subsample > 0.0 && self.subsample <= 1.0) {
            return Err(PerfError::Config(format!(
                "subsample must be in (0, 1], got {}",
                self.subsample
            )));
        }
        Ok(())
    }

    fn tree_params(&self) -> TreeParams {
        TreeParams {
            max_depth: self.max_depth,
            learning_rate: self.learning_rate,
            reg_lambda: self.reg_lambda,
            min_child_weight: self.min_child_weight,
        }
    }
}

/// Gradient-boosted tree ensemble with its training state in the type.
#[derive(Clone, Debug, PartialEq)]
pub struct GradientBoosting<S> {
    params: BoostingParams,
    base_score: f64,
    n_features: usize,
    trees: Vec<RegressionTree>,
    _state: PhantomData<S>,
}

/// Alias for an **unfitted** boosting regressor.
pub type GradientBoostingRegressor = GradientBoosting<Unfitted>;

impl<S> GradientBoosting<S> {
    /// Hyperparameters this model was (or will be) trained with.
    pub fn params(&self) -> &BoostingParams {
        &self.params
    }
}

impl GradientBoosting<Unfitted> {
    /// Create an untrained regressor.
    pub fn new(params: BoostingParams) -> Self {
        Self {
            params,
            base_score: 0.0,
            n_features: 0,
            trees: Vec::new(),
            _state: PhantomData,
        }
    }
}

impl Default for GradientBoosting<Unfitted> {
    fn default() -> Self {
        Self::new(BoostingParams::default())
    }
}

impl GradientBoosting<Fitted> {
    /// Constant prediction the ensemble starts from.
    pub fn base_score(&self) -> f64 {
        self.base_score
    }

    /// Trees in boosting order.
    pub fn trees(&self) -> &[RegressionTree] {
        &self.trees
    }
}

/// Serializable parameters of a fitted ensemble.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct GradientBoostingParams {
    pub params: BoostingParams,
    pub base_score: f64,
    pub n_features: usize,
    pub trees: Vec<RegressionTree>,
}

fn check_training_data(x: ArrayView2<'_, f64>, y: ArrayView1<'_, f64>) -> Result<()> {
    if x.nrows() == 0 {
        return Err(PerfError::TrainingData("cannot fit on empty data".into()));
    }
    if x.nrows() != y.len() {
        return Err(PerfError::TrainingData(format!(
            "x has {} rows but y has {} labels",
            x.nrows(),
            y.len()
        )));
    }
    if x.ncols() == 0 {
        return Err(PerfError::TrainingData("x has no feature columns".into()));
    }
    if x.iter().chain(y.iter()).any(|v| !v.is_finite()) {
        return Err(PerfError::TrainingData(
            "features and labels must be finite".into(),
        ));
    }
    let first = y[0];
    if y.iter().all(|&v| v == first) {
        return Err(PerfError::TrainingData(
            "fewer than 2 distinct label values; regression is degenerate".into(),
        ));
    }
    Ok(())
}

/// Rows kept for one tree, or `None` when every row is used.
fn sample_rows(n: usize, subsample: f64, rng: &mut Xoshiro256PlusPlus) -> Option<Vec<bool>> {
    if subsample >= 1.0 {
        return None;
    }
    let amount = ((n as f64 * subsample).ceil() as usize).clamp(1, n);
    let mut mask = vec![false; n];
    for i in rand::seq::index::sample(rng, n, amount).into_iter() {
        mask[i] = true;
    }
    Some(mask)
}

impl TrainableModel for GradientBoosting<Unfitted> {
    type Output = GradientBoosting<Fitted>;

    fn fit(&self, x: ArrayView2<'_, f64>, y: ArrayView1<'_, f64>) -> Result<Self::Output> {
        self.params.validate()?;
        check_training_data(x, y)?;

        let objective = SquaredError;
        let n = x.nrows();
        let base_score = objective.base_score(y);
        let mut predictions = vec![base_score; n];
        let mut grad = vec![0.0; n];
        let mut hess = vec![0.0; n];

        let presorted = presort(x);
        let mut rng = Xoshiro256PlusPlus::seed_from_u64(self.params.seed);
        let tree_params = self.params.tree_params();
        let mut trees = Vec::with_capacity(self.params.n_estimators);

        for round in 0..self.params.n_estimators {
            objective.gradients(&predictions, y, &mut grad, &mut hess);

            let sorted = match sample_rows(n, self.params.subsample, &mut rng) {
                None => presorted.clone(),
                Some(mask) => presorted
                    .iter()
                    .map(|list| list.iter().copied().filter(|&r| mask[r]).collect())
                    .collect(),
            };

            let tree = TreeBuilder {
                x,
                grad: &grad,
                hess: &hess,
                params: tree_params,
            }
            .build(sorted);

            for (p, row) in predictions.iter_mut().zip(x.rows()) {
                *p += tree.predict(row);
            }
            trees.push(tree);

            if round % 50 == 0 {
                trace!(round, loss = objective.loss(&predictions, y), "boosting round");
            }
        }

        debug!(
            n_rows = n,
            n_features = x.ncols(),
            n_trees = trees.len(),
            train_loss = objective.loss(&predictions, y),
            "fitted gradient boosting ensemble"
        );

        Ok(GradientBoosting {
            params: self.params.clone(),
            base_score,
            n_features: x.ncols(),
            trees,
            _state: PhantomData,
        })
    }
}

impl InferenceModel for GradientBoosting<Fitted> {
    type Params = GradientBoostingParams;

    fn n_features(&self) -> usize {
        self.n_features
    }

    fn predict(&self, x: ArrayView1<'_, f64>) -> f64 {
        self.trees
            .iter()
            .fold(self.base_score, |acc, tree| acc + tree.predict(x))
    }

    fn extract_params(&self) -> GradientBoostingParams {
        GradientBoostingParams {
            params: self.params.clone(),
            base_score: self.base_score,
            n_features: self.n_features,
            trees: self.trees.clone(),
        }
    }

    fn from_params(params: GradientBoostingParams) -> Result<Self> {
        if !params.base_score.is_finite() {
            return Err(PerfError::IncompatibleArtifact(
                "non-finite base score".to_string(),
            ));
        }
        for tree in &params.trees {
            tree.validate(params.n_features)?;
        }
        Ok(Self {
            params: params.params,
            base_score: params.base_score,
            n_features: params.n_features,
            trees: params.trees,
            _state: PhantomData,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use ndarray::{array, Array1, Array2};

    /// y = 2·x0 + (x1 > 0.5 ? 3 : 0) over a small grid.
    fn toy_data() -> (Array2<f64>, Array1<f64>) {
        let mut rows = Vec::new();
        let mut y = Vec::new();
        for i in 0..40 {
            let x0 = (i % 10) as f64;
            let x1 = if i % 3 == 0 { 1.0 } else { 0.0 };
            rows.extend_from_slice(&[x0, x1]);
            y.push(2.0 * x0 + if x1 > 0.5 { 3.0 } else { 0.0 });
        }
        (
            Array2::from_shape_vec((40, 2), rows).unwrap(),
            Array1::from_vec(y),
        )
    }

    fn small_params() -> BoostingParams {
        BoostingParams::default()
            .with_n_estimators(100)
            .with_max_depth(3)
            .with_learning_rate(0.3)
    }

    #[test]
    fn test_fit_reduces_error() {
        let (x, y) = toy_data();
        let model = GradientBoostingRegressor::new(small_params())
            .fit(x.view(), y.view())
            .unwrap();
        let preds = model.predict_batch(x.view());
        let mse: f64 = preds
            .iter()
            .zip(y.iter())
            .map(|(p, t)| (p - t).powi(2))
            .sum::<f64>()
            / y.len() as f64;
        assert!(mse < 0.1, "mse = {}", mse);
        assert_eq!(model.trees().len(), 100);
        assert_eq!(model.n_features(), 2);
    }

    #[test]
    fn test_base_score_is_label_mean() {
        let (x, y) = toy_data();
        let model = GradientBoostingRegressor::new(small_params())
            .fit(x.view(), y.view())
            .unwrap();
        assert_abs_diff_eq!(model.base_score(), y.mean().unwrap(), epsilon = 1e-12);
    }

    #[test]
    fn test_fit_is_deterministic() {
        let (x, y) = toy_data();
        let params = small_params().with_subsample(0.7).with_seed(9);
        let a = GradientBoostingRegressor::new(params.clone())
            .fit(x.view(), y.view())
            .unwrap();
        let b = GradientBoostingRegressor::new(params)
            .fit(x.view(), y.view())
            .unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_seed_changes_subsampled_ensemble() {
        let (x, y) = toy_data();
        let a = GradientBoostingRegressor::new(small_params().with_subsample(0.5).with_seed(1))
            .fit(x.view(), y.view())
            .unwrap();
        let b = GradientBoostingRegressor::new(small_params().with_subsample(0.5).with_seed(2))
            .fit(x.view(), y.view())
            .unwrap();
        assert_ne!(a.trees(), b.trees());
    }

    #[test]
    fn test_single_distinct_label_fails() {
        let x = array![[1.0], [2.0], [3.0]];
        let y = array![4.0, 4.0, 4.0];
        let err = GradientBoostingRegressor::default()
            .fit(x.view(), y.view())
            .unwrap_err();
        assert!(matches!(err, PerfError::TrainingData(_)));
    }

    #[test]
    fn test_length_mismatch_fails() {
        let x = array![[1.0], [2.0]];
        let y = array![1.0];
        assert!(GradientBoostingRegressor::default()
            .fit(x.view(), y.view())
            .is_err());
    }

    #[test]
    fn test_empty_fails() {
        let x = Array2::<f64>::zeros((0, 3));
        let y = Array1::<f64>::zeros(0);
        assert!(GradientBoostingRegressor::default()
            .fit(x.view(), y.view())
            .is_err());
    }

    #[test]
    fn test_non_finite_fails() {
        let x = array![[1.0], [f64::INFINITY]];
        let y = array![1.0, 2.0];
        assert!(GradientBoostingRegressor::default()
            .fit(x.view(), y.view())
            .is_err());
    }

    #[test]
    fn test_invalid_params_rejected() {
        assert!(BoostingParams::default().with_n_estimators(0).validate().is_err());
        assert!(BoostingParams::default().with_max_depth(0).validate().is_err());
        assert!(BoostingParams::default().with_learning_rate(0.0).validate().is_err());
        assert!(BoostingParams::default().with_subsample(1.5).validate().is_err());
        assert!(BoostingParams::default().validate().is_ok());
    }

    #[test]
    fn test_params_round_trip_gives_identical_predictions() {
        let (x, y) = toy_data();
        let model = GradientBoostingRegressor::new(small_params())
            .fit(x.view(), y.view())
            .unwrap();
        let restored = GradientBoosting::<Fitted>::from_params(model.extract_params()).unwrap();
        let a = model.predict_batch(x.view());
        let b = restored.predict_batch(x.view());
        assert_eq!(a, b);
    }

    #[test]
    fn test_from_params_rejects_nan_base_score() {
        let params = GradientBoostingParams {
            params: BoostingParams::default(),
            base_score: f64::NAN,
            n_features: 1,
            trees: vec![],
        };
        assert!(GradientBoosting::<Fitted>::from_params(params).is_err());
    }
}
