//! Training pipeline: split, fit, evaluate, cross-validate.
//!
//! [`TrainingPipeline::run`] is the whole training job:
//!
//! 1. Shuffle-split the dataset into train/test with the configured seed.
//! 2. Fit a fresh encoder and model on the training rows only.
//! 3. Score the held-out rows.
//! 4. Run k-fold cross-validation over the entire dataset, fitting a fresh
//!    encoder and model inside every fold.
//!
//! The artifact from step 2 is what gets persisted; the folds only
//! contribute the `CV_*` metrics.

pub mod split;

pub use split::{train_test_split, KFold, Split};

use crate::artifact::FittedArtifact;
use crate::dataset::Dataset;
use crate::error::{PerfError, Result};
use crate::metrics::{CrossValidationScores, Metrics, MetricsReport, RegressionMetrics};
use crate::model::{BoostingParams, GradientBoostingRegressor, TrainableModel};
use crate::preprocessing::{FeatureEncoder, FittedTransformer, Transformer};
use ndarray::ArrayView1;
use tracing::{debug, info, warn};

/// Options of one training run.
///
/// Defaults:
/// - `seed`: 42
/// - `test_size`: 0.2
/// - `folds`: 5
/// - `boosting`: [`BoostingParams::default`]
#[derive(Clone, Debug, PartialEq)]
pub struct TrainingConfig {
    /// Seed for the train/test shuffle and for the model.
    pub seed: u64,
    /// Fraction of rows held out for evaluation, in `(0, 1)`.
    pub test_size: f64,
    /// Number of cross-validation folds.
    pub folds: usize,
    pub boosting: BoostingParams,
}

impl Default for TrainingConfig {
    fn default() -> Self {
        Self {
            seed: 42,
            test_size: 0.2,
            folds: 5,
            boosting: BoostingParams::default(),
        }
    }
}

impl TrainingConfig {
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    pub fn with_test_size(mut self, test_size: f64) -> Self {
        self.test_size = test_size;
        self
    }

    pub fn with_folds(mut self, folds: usize) -> Self {
        self.folds = folds;
        self
    }

    pub fn with_boosting(mut self, boosting: BoostingParams) -> Self {
        self.boosting = boosting;
        self
    }

    pub fn validate(&self) -> Result<()> {
        if !(self.test_size > 0.0 && self.test_size < 1.0) {
            return Err(PerfError::Config(format!(
                "test_size must be in (0, 1), got {}",
                self.test_size
            )));
        }
        KFold::new(self.folds)?;
        self.boosting.validate()
    }
}

/// Everything a training run produces.
#[derive(Clone, Debug)]
pub struct TrainingOutcome {
    /// Encoder and model fitted on the training partition.
    pub artifact: FittedArtifact,
    pub holdout: RegressionMetrics,
    pub cv: CrossValidationScores,
    pub report: MetricsReport,
}

/// Score an artifact against labeled rows.
pub fn evaluate(artifact: &FittedArtifact, data: &Dataset) -> Result<RegressionMetrics> {
    let predictions = artifact.predict_batch(data.features()).to_vec();
    Metrics::calculate_all(data.labels(), &predictions)
}

/// Composes the encoder and the model into a reproducible training job.
#[derive(Clone, Debug)]
pub struct TrainingPipeline {
    config: TrainingConfig,
}

impl TrainingPipeline {
    /// # Errors
    /// [`PerfError::Config`] if any option is out of range.
    pub fn new(config: TrainingConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    fn boosting(&self) -> BoostingParams {
        self.config.boosting.clone().with_seed(self.config.seed)
    }

    /// Fit a fresh encoder and model on every row of `data`.
    pub fn fit(&self, data: &Dataset) -> Result<FittedArtifact> {
        let encoder = FeatureEncoder::new().fit(data.features())?;
        let x = encoder.transform_batch(data.features());
        let y = ArrayView1::from(data.labels());
        let model = GradientBoostingRegressor::new(self.boosting()).fit(x.view(), y)?;
        FittedArtifact::new(encoder, model)
    }

    /// k-fold cross-validation over the whole dataset.
    pub fn cross_validate(&self, data: &Dataset) -> Result<CrossValidationScores> {
        let folds = KFold::new(self.config.folds)?.split(data.len())?;
        let mut scores = CrossValidationScores::default();
        for (i, fold) in folds.iter().enumerate() {
            let artifact = self.fit(&data.subset(&fold.train))?;
            let metrics = evaluate(&artifact, &data.subset(&fold.test))?;
            debug!(
                fold = i,
                train_rows = fold.train.len(),
                rmse = metrics.rmse,
                r2 = metrics.r_squared,
                "cross-validation fold"
            );
            scores.push(&metrics);
        }
        Ok(scores)
    }

    /// Full training job: holdout fit and evaluation plus cross-validation.
    pub fn run(&self, data: &Dataset) -> Result<TrainingOutcome> {
        if data.len() < self.config.folds {
            return Err(PerfError::TrainingData(format!(
                "dataset has {} rows; at least {} are required",
                data.len(),
                self.config.folds
            )));
        }

        let split = train_test_split(data.len(), self.config.test_size, self.config.seed)?;
        let train = data.subset(&split.train);
        let test = data.subset(&split.test);
        info!(
            train_rows = train.len(),
            test_rows = test.len(),
            seed = self.config.seed,
            "training holdout model"
        );

        let artifact = self.fit(&train)?;
        let holdout = evaluate(&artifact, &test)?;
        info!(
            rmse = holdout.rmse,
            mae = holdout.mae,
            r2 = holdout.r_squared,
            "holdout evaluation"
        );

        let cv = self.cross_validate(data)?;
        let report = MetricsReport::new(&holdout, &cv);
        info!(
            folds = cv.n_folds(),
            cv_rmse = report.cv_rmse,
            cv_r2 = report.cv_r2,
            "cross-validation"
        );
        if !report.is_finite() {
            warn!(?report, "metrics report contains non-finite values");
        }

        Ok(TrainingOutcome {
            artifact,
            holdout,
            cv,
            report,
        })
    }
}
