//! Per-record outcome tracking and bounded-concurrency execution

use std::fmt;
use std::path::PathBuf;

use futures::StreamExt;

use crate::{Error, Result};

/// A record that could not be turned into audio
#[derive(Debug)]
pub struct RecordFailure {
    /// Human-readable record label (its key text)
    pub record: String,
    /// What went wrong
    pub error: Error,
}

/// Summary of one processor run
#[derive(Debug, Default)]
pub struct RunReport {
    /// Files written
    pub written: Vec<PathBuf>,
    /// Records that produced no audio (everything ignorable)
    pub skipped: Vec<String>,
    /// Records that failed
    pub failures: Vec<RecordFailure>,
}

impl RunReport {
    /// True when no record failed
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.failures.is_empty()
    }

    /// Total number of records seen
    #[must_use]
    pub fn total(&self) -> usize {
        self.written.len() + self.skipped.len() + self.failures.len()
    }

    fn record(&mut self, label: String, outcome: Result<Option<PathBuf>>) {
        match outcome {
            Ok(Some(path)) => self.written.push(path),
            Ok(None) => {
                tracing::warn!(record = %label, "record produced no audio");
                self.skipped.push(label);
            }
            Err(error) => {
                tracing::error!(record = %label, error = %error, "record failed");
                self.failures.push(RecordFailure {
                    record: label,
                    error,
                });
            }
        }
    }
}

impl fmt::Display for RunReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} written, {} skipped, {} failed",
            self.written.len(),
            self.skipped.len(),
            self.failures.len()
        )
    }
}

/// Process `records` with at most `jobs` in flight
///
/// Each record yields `(label, outcome)`. Without `fail_fast` every failure is
/// collected into the report; with it the first failure aborts the run and
/// in-flight records are dropped.
///
/// # Errors
///
/// Only in `fail_fast` mode: the first record error.
pub async fn run_records<T, F, Fut>(
    records: Vec<T>,
    jobs: usize,
    fail_fast: bool,
    process: F,
) -> Result<RunReport>
where
    F: Fn(T) -> Fut,
    Fut: Future<Output = (String, Result<Option<PathBuf>>)>,
{
    let mut report = RunReport::default();
    let mut outcomes = futures::stream::iter(records.into_iter().map(process))
        .buffer_unordered(jobs.max(1));

    while let Some((label, outcome)) = outcomes.next().await {
        if fail_fast {
            if let Err(error) = outcome {
                tracing::error!(record = %label, error = %error, "aborting run");
                return Err(error);
            }
        }
        report.record(label, outcome);
    }

    Ok(report)
}
