//! Workout records and the labeled dataset they are trained on.
//!
//! # Core Concepts
//!
//! - **WorkoutRecord**: the four observed features of one session. This is
//!   also exactly what a prediction request carries.
//! - **Dataset**: an ordered collection of `(record, performance)` pairs,
//!   loaded from CSV with columns
//!   `date, workout_type, duration_minutes, calories_intake, sleep_hours, performance`.
//!
//! Row order is significant: splitting and cross-validation are defined in
//! terms of row positions, so the same file always yields the same folds.
//!
//! # Example
//!
//! ```rust
//! use workout_perf::dataset::{Dataset, WorkoutRecord};
//!
//! let x = vec![
//!     WorkoutRecord::new("run", 45, 2200, 7.0).unwrap(),
//!     WorkoutRecord::new("yoga", 30, 1800, 8.5).unwrap(),
//! ];
//! let y = vec![16.1, 12.4];
//! let dataset = Dataset::new(x, y).unwrap();
//! assert_eq!(dataset.len(), 2);
//! ```

use crate::error::{PerfError, Result};
use serde::{Deserialize, Serialize};

pub mod memory;
pub mod synthetic;

pub use self::memory::{ColumnRange, Dataset, DatasetSummary};

/// Observed features of a single workout session.
///
/// The label (`performance`) is not part of this type; a
/// prediction request and a training row share the same feature shape.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct WorkoutRecord {
    /// Categorical workout type (e.g. `run`, `yoga`). Any non-empty string is
    /// accepted; types unseen during training encode to an all-zero block.
    pub workout_type: String,
    /// Session length in minutes.
    pub duration_minutes: u32,
    /// Daily calorie intake in kcal.
    pub calories_intake: u32,
    /// Hours slept the night before.
    pub sleep_hours: f64,
}

impl WorkoutRecord {
    /// Build a record, checking that every field is in its valid domain.
    ///
    /// # Errors
    /// Returns [`PerfError::InvalidInput`] for an empty workout type,
    /// a zero duration or calorie intake, or a non-positive/non-finite
    /// sleep duration.
    pub fn new(
        workout_type: impl Into<String>,
        duration_minutes: u32,
        calories_intake: u32,
        sleep_hours: f64,
    ) -> Result<Self> {
        let record = Self {
            workout_type: workout_type.into(),
            duration_minutes,
            calories_intake,
            sleep_hours,
        };
        record.validate()?;
        Ok(record)
    }

    /// Check the field domains of an already constructed record.
    pub fn validate(&self) -> Result<()> {
        if self.workout_type.trim().is_empty() {
            return Err(PerfError::InvalidInput(
                "workout_type must be a non-empty string".to_string(),
            ));
        }
        if self.duration_minutes == 0 {
            return Err(PerfError::InvalidInput(
                "duration_minutes must be a positive integer".to_string(),
            ));
        }
        if self.calories_intake == 0 {
            return Err(PerfError::InvalidInput(
                "calories_intake must be a positive integer".to_string(),
            ));
        }
        if !self.sleep_hours.is_finite() || self.sleep_hours <= 0.0 {
            return Err(PerfError::InvalidInput(format!(
                "sleep_hours must be a positive number, got {}",
                self.sleep_hours
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_valid() {
        let r = WorkoutRecord::new("run", 45, 2200, 7.0).unwrap();
        assert_eq!(r.workout_type, "run");
        assert_eq!(r.duration_minutes, 45);
    }

    #[test]
    fn test_record_rejects_empty_type() {
        let err = WorkoutRecord::new("  ", 45, 2200, 7.0).unwrap_err();
        assert!(matches!(err, PerfError::InvalidInput(_)));
    }

    #[test]
    fn test_record_rejects_zero_duration() {
        assert!(WorkoutRecord::new("run", 0, 2200, 7.0).is_err());
    }

    #[test]
    fn test_record_rejects_zero_calories() {
        assert!(WorkoutRecord::new("run", 30, 0, 7.0).is_err());
    }

    #[test]
    fn test_record_rejects_bad_sleep() {
        assert!(WorkoutRecord::new("run", 30, 2000, 0.0).is_err());
        assert!(WorkoutRecord::new("run", 30, 2000, -1.0).is_err());
        assert!(WorkoutRecord::new("run", 30, 2000, f64::NAN).is_err());
    }
}
