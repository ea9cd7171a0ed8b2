// Run summary types

use crate::error::{ErrorKind, WatermarkError};
use serde::{Serialize, Serializer};
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// One file that could not be watermarked.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FailureRecord {
    pub path: PathBuf,
    pub kind: ErrorKind,
    pub message: String,
}

impl FailureRecord {
    pub fn new(path: impl Into<PathBuf>, kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            kind,
            message: message.into(),
        }
    }

    pub fn from_error(path: &Path, error: &WatermarkError) -> Self {
        Self::new(path, error.kind(), error.to_string())
    }
}

/// What happened to a single input file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FileStatus {
    /// Watermarked copy written to this path
    Written(PathBuf),
    Failed(FailureRecord),
    /// Not started because the run was cancelled
    Cancelled,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileOutcome {
    pub path: PathBuf,
    pub status: FileStatus,
}

impl FileOutcome {
    pub fn written(path: impl Into<PathBuf>, output: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            status: FileStatus::Written(output.into()),
        }
    }

    pub fn failed(record: FailureRecord) -> Self {
        Self {
            path: record.path.clone(),
            status: FileStatus::Failed(record),
        }
    }

    pub fn cancelled(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            status: FileStatus::Cancelled,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self.status, FileStatus::Written(_))
    }
}

/// Aggregate result of a batch run.
///
/// `skipped` counts walked files that were not images or could not be read,
/// plus images left untouched after cancellation.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RunSummary {
    pub processed: usize,
    pub skipped: usize,
    pub failed: usize,
    pub failures: Vec<FailureRecord>,
    pub written: Vec<PathBuf>,
    pub cancelled: bool,
    #[serde(rename = "elapsed_ms", serialize_with = "serialize_millis")]
    pub elapsed: Duration,
}

impl RunSummary {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold one file outcome into the totals.
    pub fn record(&mut self, outcome: FileOutcome) {
        match outcome.status {
            FileStatus::Written(output) => {
                self.processed += 1;
                self.written.push(output);
            }
            FileStatus::Failed(record) => {
                self.failed += 1;
                self.failures.push(record);
            }
            FileStatus::Cancelled => {
                self.skipped += 1;
                self.cancelled = true;
            }
        }
    }

    pub fn record_skipped(&mut self) {
        self.skipped += 1;
    }

    /// Number of files accounted for.
    pub fn total(&self) -> usize {
        self.processed + self.skipped + self.failed
    }

    pub fn has_failures(&self) -> bool {
        self.failed > 0
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}

fn serialize_millis<S: Serializer>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_u64(u64::try_from(duration.as_millis()).unwrap_or(u64::MAX))
}

impl fmt::Display for RunSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Processed: {}", self.processed)?;
        writeln!(f, "Skipped:   {}", self.skipped)?;
        writeln!(f, "Failed:    {}", self.failed)?;
        for failure in &self.failures {
            writeln!(
                f,
                "  {} [{}] {}",
                failure.path.display(),
                failure.kind,
                failure.message
            )?;
        }
        write!(f, "Elapsed:   {:.2}s", self.elapsed.as_secs_f64())?;
        if self.cancelled {
            write!(f, "\nRun cancelled; remaining files were skipped")?;
        }
        Ok(())
    }
}
