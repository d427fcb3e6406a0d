//! Seeded synthetic fitness log generator.
//!
//! Produces rows with the training schema where
//! `performance = 10 + 0.08·duration + 0.6·(sleep − 6) + type_bonus + N(0, 1.5)`.
//! Calorie intake is drawn independently and carries no signal.

use crate::dataset::{Dataset, WorkoutRecord};
use crate::error::{PerfError, Result};
use rand::{Rng, SeedableRng};
use rand_distr::{Distribution, Normal};
use rand_xoshiro::Xoshiro256PlusPlus;
use time::macros::{date, format_description};
use time::Duration;

/// Default number of generated rows.
pub const DEFAULT_ROWS: usize = 500;

/// Workout types the generator draws from.
pub const WORKOUT_TYPES: [&str; 5] = ["run", "strength", "cycle", "hiit", "yoga"];

/// Dates cycle over this many days starting 2025-01-01.
const DATE_SPAN_DAYS: usize = 90;
const NOISE_STD: f64 = 1.5;

fn type_bonus(workout_type: &str) -> f64 {
    match workout_type {
        "run" => 3.0,
        "strength" => 4.0,
        "cycle" => 2.5,
        "hiit" => 4.5,
        "yoga" => 0.5,
        _ => 0.0,
    }
}

fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    (value * factor).round() / factor
}

/// Generate `rows` synthetic labeled records, deterministically for `seed`.
pub fn generate(rows: usize, seed: u64) -> Result<Dataset> {
    let mut rng = Xoshiro256PlusPlus::seed_from_u64(seed);
    let noise = Normal::new(0.0, NOISE_STD).map_err(|e| PerfError::Config(e.to_string()))?;
    let start = date!(2025 - 01 - 01);
    let fmt = format_description!("[year]-[month]-[day]");

    let mut dates = Vec::with_capacity(rows);
    let mut x = Vec::with_capacity(rows);
    let mut y = Vec::with_capacity(rows);

    for i in 0..rows {
        let workout_type = WORKOUT_TYPES[rng.gen_range(0..WORKOUT_TYPES.len())];
        let duration: u32 = rng.gen_range(15..=90);
        let calories: u32 = rng.gen_range(1400..=3200);
        let sleep = round_to(rng.gen_range(4.5..=9.0), 1);

        let performance = 10.0
            + 0.08 * duration as f64
            + 0.6 * (sleep - 6.0)
            + type_bonus(workout_type)
            + noise.sample(&mut rng);

        let day = start + Duration::days((i % DATE_SPAN_DAYS) as i64);
        dates.push(
            day.format(&fmt)
                .map_err(|e| PerfError::Serialization(e.to_string()))?,
        );
        x.push(WorkoutRecord {
            workout_type: workout_type.to_string(),
            duration_minutes: duration,
            calories_intake: calories,
            sleep_hours: sleep,
        });
        y.push(round_to(performance, 2));
    }

    Dataset::with_dates(dates, x, y)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_is_deterministic() {
        let a = generate(50, 7).unwrap();
        let b = generate(50, 7).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_generate_different_seeds_differ() {
        let a = generate(50, 1).unwrap();
        let b = generate(50, 2).unwrap();
        assert_ne!(a.labels(), b.labels());
    }

    #[test]
    fn test_generate_ranges() {
        let ds = generate(DEFAULT_ROWS, 42).unwrap();
        assert_eq!(ds.len(), DEFAULT_ROWS);
        let s = ds.summary().unwrap();
        assert!(s.duration_minutes.min >= 15.0 && s.duration_minutes.max <= 90.0);
        assert!(s.calories_intake.min >= 1400.0 && s.calories_intake.max <= 3200.0);
        assert!(s.sleep_hours.min >= 4.5 && s.sleep_hours.max <= 9.0);
        for r in ds.features() {
            assert!(WORKOUT_TYPES.contains(&r.workout_type.as_str()));
        }
    }

    #[test]
    fn test_generate_dates_cycle() {
        let ds = generate(95, 3).unwrap();
        assert_eq!(ds.dates()[0], "2025-01-01");
        assert_eq!(ds.dates()[31], "2025-02-01");
        assert_eq!(ds.dates()[89], "2025-03-31");
        assert_eq!(ds.dates()[90], "2025-01-01");
    }

    #[test]
    fn test_generate_has_label_variance() {
        let ds = generate(20, 11).unwrap();
        let labels = ds.labels();
        assert!(labels.iter().any(|&v| v != labels[0]));
    }
}
