//! Prediction service over one loaded artifact.
//!
//! The service has two states encoded in its type:
//!
//! - `PredictionService<Unready>`: knows where the store is, can do nothing
//!   but [`load`](PredictionService::load).
//! - `PredictionService<Ready>`: holds the loaded artifact and answers
//!   health, predict and metrics requests.
//!
//! `load` consumes the unready value, so a service that failed to load can
//! never answer a request, and a ready service can never be reloaded or
//! retrained in place. The artifact sits behind an `Arc` and is only read;
//! cloning a ready service is cheap and shares it.

use crate::artifact::FittedArtifact;
use crate::dataset::WorkoutRecord;
use crate::error::{PerfError, Result};
use crate::store::ArtifactStore;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::info;

/// Fields every prediction request must carry.
pub const REQUIRED_FIELDS: [&str; 4] = [
    "workout_type",
    "duration_minutes",
    "calories_intake",
    "sleep_hours",
];

/// Marker: no artifact loaded yet.
#[derive(Clone, Copy, Debug, Default)]
pub struct Unready;

/// State of a service that has loaded its artifact.
#[derive(Clone, Debug)]
pub struct Ready {
    artifact: Arc<FittedArtifact>,
}

/// Serves predictions from the artifact in an [`ArtifactStore`].
#[derive(Clone, Debug)]
pub struct PredictionService<S> {
    store: ArtifactStore,
    state: S,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub message: String,
    pub endpoints: Vec<String>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PredictResponse {
    /// The request body, echoed back unchanged.
    pub input: Value,
    pub predicted_performance: f64,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}

impl From<&PerfError> for ErrorResponse {
    fn from(err: &PerfError) -> Self {
        Self {
            error: err.to_string(),
        }
    }
}

impl PredictionService<Unready> {
    pub fn new(store: ArtifactStore) -> Self {
        Self {
            store,
            state: Unready,
        }
    }

    /// Load the artifact and become ready.
    ///
    /// # Errors
    /// [`PerfError::ArtifactNotFound`] if training has not run yet, or any
    /// load error of [`ArtifactStore::load`]. A failed load leaves no
    /// service behind.
    pub fn load(self) -> Result<PredictionService<Ready>> {
        let artifact = self.store.load()?;
        info!(dir = %self.store.dir().display(), "prediction service ready");
        Ok(PredictionService {
            store: self.store,
            state: Ready {
                artifact: Arc::new(artifact),
            },
        })
    }
}

fn positive_u32(obj: &Map<String, Value>, field: &str) -> Result<u32> {
    obj.get(field)
        .and_then(Value::as_u64)
        .and_then(|v| u32::try_from(v).ok())
        .filter(|&v| v > 0)
        .ok_or_else(|| PerfError::InvalidInput(format!("{} must be a positive integer", field)))
}

/// Extract a record from a request body.
///
/// The body must be a JSON object with every field in [`REQUIRED_FIELDS`];
/// other fields are ignored.
pub fn parse_record(body: &Value) -> Result<WorkoutRecord> {
    let obj = match body {
        Value::Object(obj) if !obj.is_empty() => obj,
        Value::Object(_) | Value::Null => {
            return Err(PerfError::InvalidInput("No input data provided".to_string()))
        }
        _ => {
            return Err(PerfError::InvalidInput(
                "request body must be a JSON object".to_string(),
            ))
        }
    };

    let missing: Vec<&str> = REQUIRED_FIELDS
        .iter()
        .copied()
        .filter(|f| obj.get(*f).map_or(true, Value::is_null))
        .collect();
    if !missing.is_empty() {
        return Err(PerfError::InvalidInput(format!(
            "missing required field(s): {}",
            missing.join(", ")
        )));
    }

    let workout_type = obj
        .get("workout_type")
        .and_then(Value::as_str)
        .ok_or_else(|| PerfError::InvalidInput("workout_type must be a string".to_string()))?;
    let duration = positive_u32(obj, "duration_minutes")?;
    let calories = positive_u32(obj, "calories_intake")?;
    let sleep = obj
        .get("sleep_hours")
        .and_then(Value::as_f64)
        .ok_or_else(|| PerfError::InvalidInput("sleep_hours must be a number".to_string()))?;

    WorkoutRecord::new(workout_type, duration, calories, sleep)
}

impl PredictionService<Ready> {
    pub fn health(&self) -> HealthResponse {
        HealthResponse {
            status: "ok".to_string(),
            message: "Fitness Prediction API is running".to_string(),
            endpoints: vec!["/predict".to_string(), "/metrics".to_string()],
        }
    }

    /// Predict one already validated record.
    pub fn predict_record(&self, record: &WorkoutRecord) -> f64 {
        self.state.artifact.predict(record)
    }

    /// Validate a raw request body and predict it.
    ///
    /// # Errors
    /// [`PerfError::InvalidInput`] for a missing, mistyped or out-of-domain
    /// field. The service is unaffected.
    pub fn predict(&self, body: &Value) -> Result<PredictResponse> {
        let record = parse_record(body)?;
        Ok(PredictResponse {
            input: body.clone(),
            predicted_performance: self.predict_record(&record),
        })
    }

    /// Metrics of the training run, read from the store on every call.
    ///
    /// # Errors
    /// [`PerfError::MetricsUnavailable`] if no metrics were written.
    pub fn metrics(&self) -> Result<BTreeMap<String, f64>> {
        self.store.load_metrics_map()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_record_valid() {
        let body = json!({
            "workout_type": "run",
            "duration_minutes": 45,
            "calories_intake": 2200,
            "sleep_hours": 7.0,
            "note": "ignored"
        });
        let r = parse_record(&body).unwrap();
        assert_eq!(r, WorkoutRecord::new("run", 45, 2200, 7.0).unwrap());
    }

    #[test]
    fn test_parse_record_integer_sleep() {
        let body = json!({
            "workout_type": "yoga",
            "duration_minutes": 30,
            "calories_intake": 1800,
            "sleep_hours": 8
        });
        assert_eq!(parse_record(&body).unwrap().sleep_hours, 8.0);
    }

    #[test]
    fn test_parse_record_lists_missing_fields() {
        let body = json!({"workout_type": "run", "duration_minutes": 45});
        match parse_record(&body).unwrap_err() {
            PerfError::InvalidInput(msg) => {
                assert!(msg.contains("calories_intake"));
                assert!(msg.contains("sleep_hours"));
                assert!(!msg.contains("workout_type"));
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn test_parse_record_null_field_counts_as_missing() {
        let body = json!({
            "workout_type": null,
            "duration_minutes": 45,
            "calories_intake": 2200,
            "sleep_hours": 7.0
        });
        let err = parse_record(&body).unwrap_err();
        assert!(matches!(err, PerfError::InvalidInput(ref m) if m.contains("workout_type")));
    }

    #[test]
    fn test_parse_record_empty_body() {
        assert!(matches!(
            parse_record(&json!({})).unwrap_err(),
            PerfError::InvalidInput(_)
        ));
        assert!(parse_record(&Value::Null).is_err());
        assert!(parse_record(&json!([1, 2])).is_err());
    }

    #[test]
    fn test_parse_record_rejects_bad_types() {
        let base = json!({
            "workout_type": "run",
            "duration_minutes": 45,
            "calories_intake": 2200,
            "sleep_hours": 7.0
        });
        for (field, bad) in [
            ("workout_type", json!(3)),
            ("duration_minutes", json!("45")),
            ("duration_minutes", json!(-5)),
            ("duration_minutes", json!(0)),
            ("calories_intake", json!(22.5)),
            ("sleep_hours", json!("seven")),
            ("sleep_hours", json!(0.0)),
        ] {
            let mut body = base.clone();
            body[field] = bad;
            let err = parse_record(&body).unwrap_err();
            assert_eq!(err.status_code(), 400, "{} should be rejected", field);
        }
    }

    #[test]
    fn test_load_without_artifact_fails() {
        let tmp = tempfile::tempdir().unwrap();
        let err = PredictionService::new(ArtifactStore::new(tmp.path()))
            .load()
            .unwrap_err();
        assert!(matches!(err, PerfError::ArtifactNotFound { .. }));
    }

    #[test]
    fn test_error_response_from_error() {
        let err = PerfError::InvalidInput("missing required field(s): sleep_hours".to_string());
        let resp = ErrorResponse::from(&err);
        assert!(resp.error.contains("sleep_hours"));
    }
}
