//! Regression metrics and the persisted metrics report.

use crate::error::{PerfError, Result};
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeMap;
use std::fmt::Write as _;

/// Metrics for evaluating regression models.
///
/// Every function requires equal-length inputs and returns
/// [`PerfError::InvalidInput`] otherwise. Empty input yields `NaN`.
pub struct Metrics;

fn check_lengths(y_true: &[f64], y_pred: &[f64]) -> Result<()> {
    if y_true.len() != y_pred.len() {
        return Err(PerfError::InvalidInput(format!(
            "y_true has {} values but y_pred has {}",
            y_true.len(),
            y_pred.len()
        )));
    }
    Ok(())
}

impl Metrics {
    /// Mean Squared Error: `mean((y_true - y_pred)^2)`.
    pub fn mse(y_true: &[f64], y_pred: &[f64]) -> Result<f64> {
        check_lengths(y_true, y_pred)?;
        if y_true.is_empty() {
            return Ok(f64::NAN);
        }
        let sum_sq: f64 = y_true
            .iter()
            .zip(y_pred.iter())
            .map(|(&t, &p)| (t - p).powi(2))
            .sum();
        Ok(sum_sq / y_true.len() as f64)
    }

    /// Root Mean Squared Error, in the units of the target.
    pub fn rmse(y_true: &[f64], y_pred: &[f64]) -> Result<f64> {
        Ok(Self::mse(y_true, y_pred)?.sqrt())
    }

    /// Mean Absolute Error: `mean(|y_true - y_pred|)`.
    pub fn mae(y_true: &[f64], y_pred: &[f64]) -> Result<f64> {
        check_lengths(y_true, y_pred)?;
        if y_true.is_empty() {
            return Ok(f64::NAN);
        }
        let sum_abs: f64 = y_true
            .iter()
            .zip(y_pred.iter())
            .map(|(&t, &p)| (t - p).abs())
            .sum();
        Ok(sum_abs / y_true.len() as f64)
    }

    /// Coefficient of determination.
    ///
    /// R² = 1 - (SS_res / SS_tot)
    ///
    /// where:
    /// - SS_res = sum((y_true - y_pred)^2)
    /// - SS_tot = sum((y_true - mean(y_true))^2)
    ///
    /// At most 1; negative when the model is worse than predicting the mean.
    /// Undefined (`NaN`) when the truth has zero variance, which includes a
    /// single row.
    pub fn r_squared(y_true: &[f64], y_pred: &[f64]) -> Result<f64> {
        check_lengths(y_true, y_pred)?;
        if y_true.is_empty() {
            return Ok(f64::NAN);
        }

        let mean_true = y_true.iter().sum::<f64>() / y_true.len() as f64;
        let ss_res: f64 = y_true
            .iter()
            .zip(y_pred.iter())
            .map(|(&t, &p)| (t - p).powi(2))
            .sum();
        let ss_tot: f64 = y_true.iter().map(|&t| (t - mean_true).powi(2)).sum();

        if ss_tot == 0.0 {
            return Ok(f64::NAN);
        }
        Ok(1.0 - ss_res / ss_tot)
    }

    /// Calculate all metrics at once.
    pub fn calculate_all(y_true: &[f64], y_pred: &[f64]) -> Result<RegressionMetrics> {
        let mse = Self::mse(y_true, y_pred)?;
        Ok(RegressionMetrics {
            mse,
            rmse: mse.sqrt(),
            mae: Self::mae(y_true, y_pred)?,
            r_squared: Self::r_squared(y_true, y_pred)?,
        })
    }
}

/// Holdout metrics of a single evaluation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RegressionMetrics {
    pub mse: f64,
    pub rmse: f64,
    pub mae: f64,
    pub r_squared: f64,
}

/// Per-fold cross-validation scores.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CrossValidationScores {
    pub fold_rmse: Vec<f64>,
    pub fold_r2: Vec<f64>,
}

fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return f64::NAN;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

impl CrossValidationScores {
    /// Record the scores of one fold.
    pub fn push(&mut self, fold: &RegressionMetrics) {
        self.fold_rmse.push(fold.rmse);
        self.fold_r2.push(fold.r_squared);
    }

    pub fn n_folds(&self) -> usize {
        self.fold_rmse.len()
    }

    /// Arithmetic mean of the per-fold RMSE.
    pub fn mean_rmse(&self) -> f64 {
        mean(&self.fold_rmse)
    }

    /// Arithmetic mean of the per-fold R².
    pub fn mean_r2(&self) -> f64 {
        mean(&self.fold_r2)
    }
}

/// Keys of the persisted report, in file order.
pub const METRIC_KEYS: [&str; 5] = ["RMSE", "MAE", "R2", "CV_RMSE", "CV_R2"];

/// JSON has no NaN; a non-finite value is written as `null` and read back as NaN.
fn nan_if_null<'de, D: Deserializer<'de>>(d: D) -> std::result::Result<f64, D::Error> {
    Ok(Option::<f64>::deserialize(d)?.unwrap_or(f64::NAN))
}

/// The five numbers produced by a training run.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MetricsReport {
    #[serde(rename = "RMSE", deserialize_with = "nan_if_null")]
    pub rmse: f64,
    #[serde(rename = "MAE", deserialize_with = "nan_if_null")]
    pub mae: f64,
    #[serde(rename = "R2", deserialize_with = "nan_if_null")]
    pub r2: f64,
    #[serde(rename = "CV_RMSE", deserialize_with = "nan_if_null")]
    pub cv_rmse: f64,
    #[serde(rename = "CV_R2", deserialize_with = "nan_if_null")]
    pub cv_r2: f64,
}

impl MetricsReport {
    /// Combine holdout metrics with cross-validated means.
    pub fn new(holdout: &RegressionMetrics, cv: &CrossValidationScores) -> Self {
        Self {
            rmse: holdout.rmse,
            mae: holdout.mae,
            r2: holdout.r_squared,
            cv_rmse: cv.mean_rmse(),
            cv_r2: cv.mean_r2(),
        }
    }

    fn values(&self) -> [f64; 5] {
        [self.rmse, self.mae, self.r2, self.cv_rmse, self.cv_r2]
    }

    /// Whether all five values are finite.
    pub fn is_finite(&self) -> bool {
        self.values().iter().all(|v| v.is_finite())
    }

    /// Copy with every value rounded to `decimals` places.
    pub fn rounded(&self, decimals: i32) -> Self {
        let factor = 10f64.powi(decimals);
        let round = |v: f64| (v * factor).round() / factor;
        Self {
            rmse: round(self.rmse),
            mae: round(self.mae),
            r2: round(self.r2),
            cv_rmse: round(self.cv_rmse),
            cv_r2: round(self.cv_r2),
        }
    }

    /// Report as a `key -> value` mapping.
    pub fn to_map(&self) -> BTreeMap<String, f64> {
        METRIC_KEYS
            .iter()
            .zip(self.values())
            .map(|(k, v)| (k.to_string(), v))
            .collect()
    }

    /// Rebuild a report from a mapping; every key must be present.
    pub fn from_map(map: &BTreeMap<String, f64>) -> Result<Self> {
        let get = |key: &str| {
            map.get(key)
                .copied()
                .ok_or_else(|| PerfError::Serialization(format!("metrics missing key {}", key)))
        };
        Ok(Self {
            rmse: get("RMSE")?,
            mae: get("MAE")?,
            r2: get("R2")?,
            cv_rmse: get("CV_RMSE")?,
            cv_r2: get("CV_R2")?,
        })
    }

    /// `KEY: value` lines in [`METRIC_KEYS`] order.
    pub fn to_text(&self) -> String {
        let mut out = String::new();
        for (key, value) in METRIC_KEYS.iter().zip(self.values()) {
            let _ = writeln!(out, "{}: {}", key, value);
        }
        out
    }

    /// Parse the `KEY: value` form.
    ///
    /// Blank lines are ignored. Unknown keys, duplicate keys, unparsable
    /// values and missing keys are all errors.
    pub fn from_text(text: &str) -> Result<Self> {
        let mut map = BTreeMap::new();
        for (i, line) in text.lines().enumerate() {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            let malformed = || PerfError::Serialization(format!("metrics line {}: {:?}", i + 1, line));
            let (key, value) = line.split_once(':').ok_or_else(malformed)?;
            let key = key.trim();
            if !METRIC_KEYS.contains(&key) {
                return Err(malformed());
            }
            let value: f64 = value.trim().parse().map_err(|_| malformed())?;
            if map.insert(key.to_string(), value).is_some() {
                return Err(PerfError::Serialization(format!(
                    "metrics line {}: duplicate key {}",
                    i + 1,
                    key
                )));
            }
        }
        Self::from_map(&map)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn test_mse_perfect() {
        let y = [1.0, 2.0, 3.0, 4.0];
        assert_abs_diff_eq!(Metrics::mse(&y, &y).unwrap(), 0.0);
    }

    #[test]
    fn test_mse_and_mae_offset() {
        let y_true = [1.0, 2.0, 3.0, 4.0];
        let y_pred = [2.0, 3.0, 4.0, 5.0];
        assert_abs_diff_eq!(Metrics::mse(&y_true, &y_pred).unwrap(), 1.0);
        assert_abs_diff_eq!(Metrics::rmse(&y_true, &y_pred).unwrap(), 1.0);
        assert_abs_diff_eq!(Metrics::mae(&y_true, &y_pred).unwrap(), 1.0);
    }

    #[test]
    fn test_rmse_is_sqrt_mse() {
        let y_true = [0.0, 0.0];
        let y_pred = [3.0, 1.0];
        assert_abs_diff_eq!(Metrics::rmse(&y_true, &y_pred).unwrap(), 5.0f64.sqrt());
    }

    #[test]
    fn test_r_squared_perfect_and_mean() {
        let y = [1.0, 2.0, 3.0, 4.0];
        assert_abs_diff_eq!(Metrics::r_squared(&y, &y).unwrap(), 1.0);
        let mean_pred = [2.5; 4];
        assert_abs_diff_eq!(Metrics::r_squared(&y, &mean_pred).unwrap(), 0.0);
    }

    #[test]
    fn test_r_squared_can_be_negative() {
        let y_true = [1.0, 2.0, 3.0];
        let y_pred = [3.0, 2.0, 1.0];
        assert!(Metrics::r_squared(&y_true, &y_pred).unwrap() < 0.0);
    }

    #[test]
    fn test_r_squared_zero_variance_is_nan() {
        let y = [2.0, 2.0, 2.0];
        assert!(Metrics::r_squared(&y, &y).unwrap().is_nan());
        assert!(Metrics::r_squared(&[5.0], &[4.0]).unwrap().is_nan());
    }

    #[test]
    fn test_empty_is_nan() {
        let m = Metrics::calculate_all(&[], &[]).unwrap();
        assert!(m.mse.is_nan() && m.rmse.is_nan() && m.mae.is_nan() && m.r_squared.is_nan());
    }

    #[test]
    fn test_length_mismatch_errors() {
        let err = Metrics::mse(&[1.0, 2.0], &[1.0]).unwrap_err();
        assert!(matches!(err, PerfError::InvalidInput(_)));
        assert!(Metrics::calculate_all(&[1.0], &[]).is_err());
    }

    #[test]
    fn test_cv_means() {
        let mut cv = CrossValidationScores::default();
        for (rmse, r2) in [(1.0, 0.5), (2.0, 0.7), (3.0, 0.9)] {
            cv.push(&RegressionMetrics {
                mse: rmse * rmse,
                rmse,
                mae: 0.0,
                r_squared: r2,
            });
        }
        assert_eq!(cv.n_folds(), 3);
        assert_abs_diff_eq!(cv.mean_rmse(), 2.0);
        assert_abs_diff_eq!(cv.mean_r2(), 0.7, epsilon = 1e-12);
        assert!(CrossValidationScores::default().mean_rmse().is_nan());
    }

    fn report() -> MetricsReport {
        MetricsReport {
            rmse: 1.23456,
            mae: 0.98765,
            r2: 0.8123,
            cv_rmse: 1.5,
            cv_r2: 0.7777,
        }
    }

    #[test]
    fn test_rounded() {
        let r = report().rounded(3);
        assert_eq!(r.rmse, 1.235);
        assert_eq!(r.mae, 0.988);
        assert_eq!(r.cv_r2, 0.778);
    }

    #[test]
    fn test_text_format_order() {
        let text = report().rounded(3).to_text();
        let keys: Vec<&str> = text
            .lines()
            .map(|l| l.split(':').next().unwrap())
            .collect();
        assert_eq!(keys, METRIC_KEYS);
        assert!(text.starts_with("RMSE: 1.235\n"));
    }

    #[test]
    fn test_text_parse_back() {
        let r = report().rounded(3);
        assert_eq!(MetricsReport::from_text(&r.to_text()).unwrap(), r);
    }

    #[test]
    fn test_text_rejects_malformed() {
        assert!(MetricsReport::from_text("RMSE 1.0\n").is_err());
        assert!(MetricsReport::from_text("RMSE: abc\n").is_err());
        assert!(MetricsReport::from_text("RMSE: 1\nRMSE: 2\n").is_err());
        assert!(MetricsReport::from_text("RMSE: 1\nMAE: 1\n").is_err());
        assert!(MetricsReport::from_text("RMSE: 1\nMAE: 1\nR2: 1\nCV_RMSE: 1\nCV_R2: 1\nX: 1\n").is_err());
    }

    #[test]
    fn test_json_keys() {
        let json = serde_json::to_value(report()).unwrap();
        let obj = json.as_object().unwrap();
        for key in METRIC_KEYS {
            assert!(obj.contains_key(key), "missing {}", key);
        }
    }

    #[test]
    fn test_json_nan_reads_back_as_nan() {
        let mut r = report();
        r.r2 = f64::NAN;
        let json = serde_json::to_string(&r).unwrap();
        let back: MetricsReport = serde_json::from_str(&json).unwrap();
        assert!(back.r2.is_nan());
        assert!(!back.is_finite());
        assert_eq!(back.rmse, r.rmse);
    }

    #[test]
    fn test_map_round_trip() {
        let r = report();
        let map = r.to_map();
        assert_eq!(map.len(), 5);
        assert_eq!(MetricsReport::from_map(&map).unwrap(), r);
    }
}
