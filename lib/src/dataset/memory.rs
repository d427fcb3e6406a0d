use crate::dataset::WorkoutRecord;
use crate::error::{PerfError, Result};
use csv::{ReaderBuilder, WriterBuilder};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufReader, Read, Write};
use std::path::Path;
use tracing::debug;

/// One CSV row as stored on disk.
#[derive(Debug, Serialize, Deserialize)]
struct CsvRow {
    date: String,
    workout_type: String,
    duration_minutes: u32,
    calories_intake: u32,
    sleep_hours: f64,
    performance: f64,
}

/// In-memory labeled dataset: features `x`, labels `y`, and the session
/// dates carried through from the source file.
#[derive(Clone, Debug, PartialEq)]
pub struct Dataset {
    dates: Vec<String>,
    x: Vec<WorkoutRecord>,
    y: Vec<f64>,
}

/// Observed `[min, max]` of one numeric column.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct ColumnRange {
    pub min: f64,
    pub max: f64,
}

impl ColumnRange {
    fn of(values: impl Iterator<Item = f64>) -> Option<Self> {
        values.fold(None, |acc, v| match acc {
            None => Some(Self { min: v, max: v }),
            Some(r) => Some(Self {
                min: r.min.min(v),
                max: r.max.max(v),
            }),
        })
    }

    /// Whether `value` lies within the range widened by `margin` on both ends.
    pub fn contains_with_margin(&self, value: f64, margin: f64) -> bool {
        value >= self.min - margin && value <= self.max + margin
    }
}

/// Per-column ranges of a dataset.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct DatasetSummary {
    pub rows: usize,
    pub duration_minutes: ColumnRange,
    pub calories_intake: ColumnRange,
    pub sleep_hours: ColumnRange,
    pub performance: ColumnRange,
}

impl Dataset {
    /// Create a dataset from features and labels.
    ///
    /// # Errors
    /// Returns [`PerfError::TrainingData`] if lengths differ, a record is
    /// invalid, or a label is not finite.
    pub fn new(x: Vec<WorkoutRecord>, y: Vec<f64>) -> Result<Self> {
        let dates = vec![String::new(); x.len()];
        Self::with_dates(dates, x, y)
    }

    /// Create a dataset that also carries a date per row.
    pub fn with_dates(dates: Vec<String>, x: Vec<WorkoutRecord>, y: Vec<f64>) -> Result<Self> {
        if x.len() != y.len() || dates.len() != x.len() {
            return Err(PerfError::TrainingData(format!(
                "x, y and dates must have same length (got {}, {}, {})",
                x.len(),
                y.len(),
                dates.len()
            )));
        }
        for (i, (record, &label)) in x.iter().zip(y.iter()).enumerate() {
            record
                .validate()
                .map_err(|e| PerfError::TrainingData(format!("row {}: {}", i, e)))?;
            if !label.is_finite() {
                return Err(PerfError::TrainingData(format!(
                    "row {}: performance must be finite, got {}",
                    i, label
                )));
            }
        }
        Ok(Self { dates, x, y })
    }

    /// Load a dataset from a CSV file with a header row.
    pub fn from_csv_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path)?;
        let dataset = Self::from_csv_reader(BufReader::new(file))?;
        debug!(path = %path.display(), rows = dataset.len(), "loaded dataset");
        Ok(dataset)
    }

    /// Load a dataset from any CSV source with a header row.
    ///
    /// Rows with missing or non-numeric values fail the whole load; nothing
    /// is silently defaulted.
    pub fn from_csv_reader<R: Read>(reader: R) -> Result<Self> {
        let mut rdr = ReaderBuilder::new().trim(csv::Trim::All).from_reader(reader);

        let mut dates = Vec::new();
        let mut x = Vec::new();
        let mut y = Vec::new();

        for (i, result) in rdr.deserialize::<CsvRow>().enumerate() {
            // Header occupies line 1.
            let row = result.map_err(|e| PerfError::TrainingData(format!("line {}: {}", i + 2, e)))?;
            dates.push(row.date);
            x.push(WorkoutRecord {
                workout_type: row.workout_type,
                duration_minutes: row.duration_minutes,
                calories_intake: row.calories_intake,
                sleep_hours: row.sleep_hours,
            });
            y.push(row.performance);
        }

        Self::with_dates(dates, x, y)
    }

    /// Write the dataset as CSV with the canonical header.
    pub fn write_csv<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let file = File::create(path)?;
        self.write_csv_to(file)
    }

    /// Write the dataset as CSV to any writer.
    pub fn write_csv_to<W: Write>(&self, writer: W) -> Result<()> {
        let mut wtr = WriterBuilder::new().from_writer(writer);
        for ((date, record), &performance) in self.dates.iter().zip(&self.x).zip(&self.y) {
            wtr.serialize(CsvRow {
                date: date.clone(),
                workout_type: record.workout_type.clone(),
                duration_minutes: record.duration_minutes,
                calories_intake: record.calories_intake,
                sleep_hours: record.sleep_hours,
                performance,
            })?;
        }
        wtr.flush()?;
        Ok(())
    }

    /// Number of rows.
    pub fn len(&self) -> usize {
        self.x.len()
    }

    /// Whether the dataset has no rows.
    pub fn is_empty(&self) -> bool {
        self.x.is_empty()
    }

    /// Feature records in row order.
    pub fn features(&self) -> &[WorkoutRecord] {
        &self.x
    }

    /// Labels in row order.
    pub fn labels(&self) -> &[f64] {
        &self.y
    }

    /// Session dates in row order (empty strings when unknown).
    pub fn dates(&self) -> &[String] {
        &self.dates
    }

    /// Select rows by position, in the order given.
    ///
    /// # Panics
    /// Panics if an index is out of bounds.
    pub fn subset(&self, indices: &[usize]) -> Self {
        Self {
            dates: indices.iter().map(|&i| self.dates[i].clone()).collect(),
            x: indices.iter().map(|&i| self.x[i].clone()).collect(),
            y: indices.iter().map(|&i| self.y[i]).collect(),
        }
    }

    /// Min/max of every numeric column, or `None` for an empty dataset.
    pub fn summary(&self) -> Option<DatasetSummary> {
        Some(DatasetSummary {
            rows: self.len(),
            duration_minutes: ColumnRange::of(self.x.iter().map(|r| r.duration_minutes as f64))?,
            calories_intake: ColumnRange::of(self.x.iter().map(|r| r.calories_intake as f64))?,
            sleep_hours: ColumnRange::of(self.x.iter().map(|r| r.sleep_hours))?,
            performance: ColumnRange::of(self.y.iter().copied())?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CSV: &str = "\
date,workout_type,duration_minutes,calories_intake,sleep_hours,performance
2025-01-01,run,45,2200,7.0,16.5
2025-01-02,yoga,30,1800,8.5,12.25
2025-01-03,hiit,20,2500,6.0,17.0
";

    #[test]
    fn test_from_csv_reader() {
        let ds = Dataset::from_csv_reader(CSV.as_bytes()).unwrap();
        assert_eq!(ds.len(), 3);
        assert_eq!(ds.features()[1].workout_type, "yoga");
        assert_eq!(ds.labels(), &[16.5, 12.25, 17.0]);
        assert_eq!(ds.dates()[2], "2025-01-03");
    }

    #[test]
    fn test_from_csv_rejects_non_numeric() {
        let bad = "date,workout_type,duration_minutes,calories_intake,sleep_hours,performance\n\
                   2025-01-01,run,forty,2200,7.0,16.5\n";
        let err = Dataset::from_csv_reader(bad.as_bytes()).unwrap_err();
        assert!(matches!(err, PerfError::TrainingData(ref m) if m.contains("line 2")));
    }

    #[test]
    fn test_from_csv_rejects_missing_column() {
        let bad = "date,workout_type,duration_minutes,calories_intake,sleep_hours\n\
                   2025-01-01,run,40,2200,7.0\n";
        assert!(Dataset::from_csv_reader(bad.as_bytes()).is_err());
    }

    #[test]
    fn test_csv_write_then_read() {
        let ds = Dataset::from_csv_reader(CSV.as_bytes()).unwrap();
        let mut buf = Vec::new();
        ds.write_csv_to(&mut buf).unwrap();
        let text = String::from_utf8(buf).unwrap();
        assert!(text.starts_with(
            "date,workout_type,duration_minutes,calories_intake,sleep_hours,performance"
        ));
        let reloaded = Dataset::from_csv_reader(text.as_bytes()).unwrap();
        assert_eq!(reloaded, ds);
    }

    #[test]
    fn test_new_length_mismatch() {
        let x = vec![WorkoutRecord::new("run", 10, 2000, 7.0).unwrap()];
        assert!(Dataset::new(x, vec![]).is_err());
    }

    #[test]
    fn test_new_rejects_nan_label() {
        let x = vec![WorkoutRecord::new("run", 10, 2000, 7.0).unwrap()];
        assert!(Dataset::new(x, vec![f64::NAN]).is_err());
    }

    #[test]
    fn test_subset_preserves_given_order() {
        let ds = Dataset::from_csv_reader(CSV.as_bytes()).unwrap();
        let sub = ds.subset(&[2, 0]);
        assert_eq!(sub.labels(), &[17.0, 16.5]);
        assert_eq!(sub.features()[0].workout_type, "hiit");
    }

    #[test]
    fn test_summary() {
        let ds = Dataset::from_csv_reader(CSV.as_bytes()).unwrap();
        let s = ds.summary().unwrap();
        assert_eq!(s.rows, 3);
        assert_eq!(s.duration_minutes, ColumnRange { min: 20.0, max: 45.0 });
        assert_eq!(s.performance.min, 12.25);
        assert!(s.performance.contains_with_margin(18.0, 1.0));
        assert!(!s.performance.contains_with_margin(18.5, 1.0));
    }

    #[test]
    fn test_summary_empty() {
        let ds = Dataset::new(vec![], vec![]).unwrap();
        assert!(ds.summary().is_none());
    }
}
