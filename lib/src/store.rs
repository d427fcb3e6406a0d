//! Filesystem store for the trained artifact and its metrics.
//!
//! Layout of a store directory:
//!
//! ```text
//! fitness_pipeline.bin   versioned bincode artifact
//! model_metrics.json     {"RMSE": .., "MAE": .., "R2": .., "CV_RMSE": .., "CV_R2": ..}
//! model_metrics.txt      the same values as `KEY: value` lines
//! ```
//!
//! Every file is written to a temporary file in the same directory and then
//! renamed over the target, so readers see either the previous or the new
//! content, never a partial write. Metrics are written before the artifact:
//! once a new artifact is visible, its metrics are too. A save that fails
//! part way leaves the previous artifact and metrics in place.

use crate::artifact::FittedArtifact;
use crate::error::{PerfError, Result};
use crate::metrics::MetricsReport;
use std::collections::BTreeMap;
use std::fs;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use tracing::{debug, info, warn};

pub const ARTIFACT_FILE: &str = "fitness_pipeline.bin";
pub const METRICS_JSON_FILE: &str = "model_metrics.json";
pub const METRICS_TEXT_FILE: &str = "model_metrics.txt";

/// Decimal places kept in persisted metrics.
const METRICS_DECIMALS: i32 = 3;

/// Persists and retrieves the artifact and metrics of one model.
#[derive(Clone, Debug)]
pub struct ArtifactStore {
    dir: PathBuf,
}

fn read_optional(path: &Path) -> Result<Option<Vec<u8>>> {
    match fs::read(path) {
        Ok(bytes) => Ok(Some(bytes)),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e.into()),
    }
}

impl ArtifactStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn artifact_path(&self) -> PathBuf {
        self.dir.join(ARTIFACT_FILE)
    }

    pub fn metrics_json_path(&self) -> PathBuf {
        self.dir.join(METRICS_JSON_FILE)
    }

    pub fn metrics_text_path(&self) -> PathBuf {
        self.dir.join(METRICS_TEXT_FILE)
    }

    /// Write `bytes` to a temporary file in the store directory.
    fn stage(&self, bytes: &[u8]) -> Result<NamedTempFile> {
        let mut tmp = NamedTempFile::new_in(&self.dir)?;
        tmp.write_all(bytes)?;
        tmp.as_file().sync_all()?;
        Ok(tmp)
    }

    /// Rename a staged file over `name`.
    fn commit(&self, tmp: NamedTempFile, name: &str) -> Result<()> {
        let target = self.dir.join(name);
        tmp.persist(&target).map_err(|e| PerfError::Io(e.error))?;
        debug!(path = %target.display(), "replaced file");
        Ok(())
    }

    /// Put back the content `name` had before a failed save.
    fn restore(&self, name: &str, previous: Option<Vec<u8>>) -> Result<()> {
        match previous {
            Some(bytes) => self.commit(self.stage(&bytes)?, name),
            None => match fs::remove_file(self.dir.join(name)) {
                Err(e) if e.kind() != ErrorKind::NotFound => Err(e.into()),
                _ => Ok(()),
            },
        }
    }

    /// Persist an artifact together with its metrics.
    ///
    /// All three files are staged before any of them is replaced. Metrics go
    /// in first and the artifact last; if a replacement fails, the metrics
    /// files are returned to their previous content, so metrics on disk
    /// always belong to the artifact on disk.
    ///
    /// Metrics are rounded to three decimals on disk.
    pub fn save(&self, artifact: &FittedArtifact, report: &MetricsReport) -> Result<()> {
        fs::create_dir_all(&self.dir)?;

        let rounded = report.rounded(METRICS_DECIMALS);
        let staged = [
            (METRICS_JSON_FILE, self.stage(&serde_json::to_vec_pretty(&rounded)?)?),
            (METRICS_TEXT_FILE, self.stage(rounded.to_text().as_bytes())?),
            (ARTIFACT_FILE, self.stage(&artifact.to_bytes()?)?),
        ];
        let previous = [
            (METRICS_JSON_FILE, read_optional(&self.metrics_json_path())?),
            (METRICS_TEXT_FILE, read_optional(&self.metrics_text_path())?),
        ];

        for (name, tmp) in staged {
            if let Err(err) = self.commit(tmp, name) {
                warn!(file = name, error = %err, "save failed, restoring previous metrics");
                for (metrics_name, bytes) in previous {
                    if let Err(e) = self.restore(metrics_name, bytes) {
                        warn!(file = metrics_name, error = %e, "could not restore metrics file");
                    }
                }
                return Err(err);
            }
        }

        info!(dir = %self.dir.display(), "saved artifact and metrics");
        Ok(())
    }

    /// Load the artifact.
    ///
    /// # Errors
    /// [`PerfError::ArtifactNotFound`] if no artifact has been saved;
    /// [`PerfError::IncompatibleArtifact`] if it was written by an
    /// incompatible version.
    pub fn load(&self) -> Result<FittedArtifact> {
        let path = self.artifact_path();
        let bytes = read_optional(&path)?.ok_or(PerfError::ArtifactNotFound { path: path.clone() })?;
        let artifact = FittedArtifact::from_bytes(&bytes)?;
        info!(
            path = %path.display(),
            trees = artifact.model().trees().len(),
            workout_types = artifact.encoder().vocabulary().len(),
            "loaded artifact"
        );
        Ok(artifact)
    }

    /// Load the persisted metrics.
    ///
    /// The JSON file is authoritative; the text file is read only when the
    /// JSON file is missing or cannot be parsed.
    ///
    /// # Errors
    /// [`PerfError::MetricsUnavailable`] if neither file exists.
    pub fn load_metrics(&self) -> Result<MetricsReport> {
        let json_path = self.metrics_json_path();
        let mut json_error = None;
        if let Some(bytes) = read_optional(&json_path)? {
            match serde_json::from_slice::<MetricsReport>(&bytes) {
                Ok(report) => return Ok(report),
                Err(e) => {
                    warn!(path = %json_path.display(), error = %e, "unreadable metrics json");
                    json_error = Some(e);
                }
            }
        }

        match read_optional(&self.metrics_text_path())? {
            Some(bytes) => {
                let text = String::from_utf8(bytes)
                    .map_err(|e| PerfError::Serialization(e.to_string()))?;
                MetricsReport::from_text(&text)
            }
            None => Err(match json_error {
                Some(e) => e.into(),
                None => PerfError::MetricsUnavailable { path: json_path },
            }),
        }
    }

    /// Persisted metrics as a `key -> value` mapping.
    pub fn load_metrics_map(&self) -> Result<BTreeMap<String, f64>> {
        Ok(self.load_metrics()?.to_map())
    }
}
