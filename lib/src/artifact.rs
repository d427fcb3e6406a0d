//! The frozen encoder + model unit that training produces and serving loads.
//!
//! On disk an artifact is a bincode blob of [`ArtifactParams`]. The three
//! version tags lead the blob and are decoded and checked on their own before
//! the body is touched, so an artifact written by an incompatible build is
//! reported as such instead of as a garbled decode.

use crate::dataset::WorkoutRecord;
use crate::error::{PerfError, Result};
use crate::model::{Fitted, GradientBoosting, GradientBoostingParams, InferenceModel, MODEL_VERSION};
use crate::preprocessing::{
    FeatureEncoderParams, FittedFeatureEncoder, FittedTransformer, ENCODER_VERSION,
};
use crate::serialization::SerializableParams;
use ndarray::{Array1, Array2};
use serde::{Deserialize, Serialize};

/// Version of the artifact envelope itself.
pub const FORMAT_VERSION: u32 = 1;

/// Immutable fitted encoder and model.
///
/// Constructed once per training run (or once per load) and never mutated
/// afterwards; serving shares it behind an `Arc`.
#[derive(Clone, Debug, PartialEq)]
pub struct FittedArtifact {
    encoder: FittedFeatureEncoder,
    model: GradientBoosting<Fitted>,
}

/// Persisted form of a [`FittedArtifact`].
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ArtifactParams {
    pub format_version: u32,
    pub encoder_version: u32,
    pub model_version: u32,
    pub encoder: FeatureEncoderParams,
    pub model: GradientBoostingParams,
}

/// Leading fields of [`ArtifactParams`]; bincode decodes a prefix and ignores the rest.
#[derive(Deserialize)]
struct ArtifactHeader {
    format_version: u32,
    encoder_version: u32,
    model_version: u32,
}

fn check_version(what: &str, found: u32, expected: u32) -> Result<()> {
    if found != expected {
        return Err(PerfError::IncompatibleArtifact(format!(
            "{} version {} (expected {})",
            what, found, expected
        )));
    }
    Ok(())
}

impl FittedArtifact {
    /// Pair an encoder with a model trained on its output.
    ///
    /// # Errors
    /// [`PerfError::IncompatibleArtifact`] if the encoder output width differs
    /// from the model's input width.
    pub fn new(encoder: FittedFeatureEncoder, model: GradientBoosting<Fitted>) -> Result<Self> {
        if encoder.n_features_out() != model.n_features() {
            return Err(PerfError::IncompatibleArtifact(format!(
                "encoder produces {} features but model expects {}",
                encoder.n_features_out(),
                model.n_features()
            )));
        }
        Ok(Self { encoder, model })
    }

    pub fn encoder(&self) -> &FittedFeatureEncoder {
        &self.encoder
    }

    pub fn model(&self) -> &GradientBoosting<Fitted> {
        &self.model
    }

    /// Encode one record and predict its performance.
    pub fn predict(&self, record: &WorkoutRecord) -> f64 {
        let x = self.encoder.transform(record);
        self.model.predict(x.view())
    }

    /// Predict every record, in order.
    pub fn predict_batch(&self, records: &[WorkoutRecord]) -> Array1<f64> {
        let x: Array2<f64> = self.encoder.transform_batch(records);
        self.model.predict_batch(x.view())
    }

    pub fn extract_params(&self) -> ArtifactParams {
        ArtifactParams {
            format_version: FORMAT_VERSION,
            encoder_version: ENCODER_VERSION,
            model_version: MODEL_VERSION,
            encoder: self.encoder.extract_params(),
            model: self.model.extract_params(),
        }
    }

    /// Rebuild from parameters, checking every version tag.
    pub fn from_params(params: ArtifactParams) -> Result<Self> {
        check_version("format", params.format_version, FORMAT_VERSION)?;
        check_version("encoder", params.encoder_version, ENCODER_VERSION)?;
        check_version("model", params.model_version, MODEL_VERSION)?;
        let encoder = FittedFeatureEncoder::from_params(params.encoder)?;
        let model = GradientBoosting::<Fitted>::from_params(params.model)?;
        Self::new(encoder, model)
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        Ok(self.extract_params().to_bytes()?)
    }

    /// Decode an artifact blob.
    ///
    /// # Errors
    /// [`PerfError::IncompatibleArtifact`] on a version mismatch,
    /// [`PerfError::Serialization`] if the blob cannot be decoded.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let header: ArtifactHeader = bincode::deserialize(bytes)?;
        check_version("format", header.format_version, FORMAT_VERSION)?;
        check_version("encoder", header.encoder_version, ENCODER_VERSION)?;
        check_version("model", header.model_version, MODEL_VERSION)?;
        Self::from_params(ArtifactParams::from_bytes(bytes)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{BoostingParams, GradientBoostingRegressor, TrainableModel};
    use crate::preprocessing::{FeatureEncoder, Transformer};

    fn records() -> (Vec<WorkoutRecord>, Vec<f64>) {
        let types = ["run", "yoga", "hiit"];
        let mut x = Vec::new();
        let mut y = Vec::new();
        for i in 0..30u32 {
            let t = types[(i % 3) as usize];
            let d = 20 + i * 2;
            x.push(WorkoutRecord::new(t, d, 2000 + i * 10, 6.0 + (i % 4) as f64 * 0.5).unwrap());
            y.push(10.0 + 0.1 * d as f64 + if t == "hiit" { 4.0 } else { 0.0 });
        }
        (x, y)
    }

    fn fitted() -> FittedArtifact {
        let (x, y) = records();
        let encoder = FeatureEncoder::new().fit(&x).unwrap();
        let xm = encoder.transform_batch(&x);
        let model = GradientBoostingRegressor::new(BoostingParams::default().with_n_estimators(20))
            .fit(xm.view(), ndarray::ArrayView1::from(&y[..]))
            .unwrap();
        FittedArtifact::new(encoder, model).unwrap()
    }

    #[test]
    fn test_bytes_round_trip_bit_identical() {
        let artifact = fitted();
        let restored = FittedArtifact::from_bytes(&artifact.to_bytes().unwrap()).unwrap();
        let (x, _) = records();
        let a = artifact.predict_batch(&x);
        let b = restored.predict_batch(&x);
        for (p, q) in a.iter().zip(b.iter()) {
            assert_eq!(p.to_bits(), q.to_bits());
        }
    }

    #[test]
    fn test_predict_unseen_type() {
        let artifact = fitted();
        let p = artifact.predict(&WorkoutRecord::new("swim", 40, 2100, 7.0).unwrap());
        assert!(p.is_finite());
    }

    #[test]
    fn test_predict_matches_batch() {
        let artifact = fitted();
        let (x, _) = records();
        let batch = artifact.predict_batch(&x);
        assert_eq!(artifact.predict(&x[4]), batch[4]);
    }

    #[test]
    fn test_version_mismatch_rejected() {
        let mut params = fitted().extract_params();
        params.model_version = MODEL_VERSION + 1;
        let bytes = params.to_bytes().unwrap();
        let err = FittedArtifact::from_bytes(&bytes).unwrap_err();
        assert!(matches!(err, PerfError::IncompatibleArtifact(ref m) if m.contains("model")));
    }

    #[test]
    fn test_encoder_version_mismatch_rejected() {
        let mut params = fitted().extract_params();
        params.encoder_version = 0;
        let err = FittedArtifact::from_params(params).unwrap_err();
        assert!(matches!(err, PerfError::IncompatibleArtifact(_)));
    }

    #[test]
    fn test_width_mismatch_rejected() {
        let artifact = fitted();
        let narrow = FeatureEncoder::new()
            .fit(&[WorkoutRecord::new("run", 30, 2000, 7.0).unwrap()])
            .unwrap();
        let err = FittedArtifact::new(narrow, artifact.model().clone()).unwrap_err();
        assert!(matches!(err, PerfError::IncompatibleArtifact(_)));
    }

    #[test]
    fn test_bare_component_blobs_are_not_artifacts() {
        let artifact = fitted();
        let encoder_only = artifact.encoder().extract_params().to_bytes().unwrap();
        assert!(FittedArtifact::from_bytes(&encoder_only).is_err());
        let model_only = artifact.model().extract_params().to_bytes().unwrap();
        assert!(FittedArtifact::from_bytes(&model_only).is_err());
    }

    #[test]
    fn test_garbage_bytes_rejected() {
        assert!(FittedArtifact::from_bytes(&[1, 2, 3]).is_err());
    }
}
