//! Indicator submission
//!
//! The ingestion side is reached through `IndicatorSubmitter`. A submitter
//! is opened for a known number of indicators and wrapped in a
//! `SubmissionScope`, which flushes it when released and also when dropped
//! on an error path.
//!
//! `BatchFileSubmitter` groups request bodies into batches and appends each
//! batch as one `{"value": [...]}` JSON line to a submissions file, the same
//! shape as a batch upload request to the ingestion API.

use crate::configuration::Configuration;
use crate::errors::{RelayError, Result};
use crate::event_processing::RequestBody;
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

pub trait IndicatorSubmitter {
    /// Accept one request body for submission
    fn handle_indicator(&mut self, body: RequestBody) -> Result<()>;

    /// Submit anything still buffered
    fn flush(&mut self) -> Result<()>;
}

/// Holds a submitter for the duration of a run and guarantees it is flushed
/// on every exit path.
pub struct SubmissionScope<S: IndicatorSubmitter> {
    submitter: Option<S>,
    handled: usize,
}

impl<S: IndicatorSubmitter> SubmissionScope<S> {
    /// Open a submitter sized for `total_indicators`
    pub fn acquire<F>(total_indicators: usize, open: F) -> Result<Self>
    where
        F: FnOnce(usize) -> Result<S>,
    {
        let submitter = open(total_indicators)?;
        Ok(Self {
            submitter: Some(submitter),
            handled: 0,
        })
    }

    pub fn submit(&mut self, body: RequestBody) -> Result<()> {
        let submitter = self
            .submitter
            .as_mut()
            .ok_or_else(|| RelayError::Submission {
                message: "Submission scope already released".to_string(),
            })?;
        submitter.handle_indicator(body)?;
        self.handled += 1;
        Ok(())
    }

    pub fn handled(&self) -> usize {
        self.handled
    }

    /// Flush and hand back the submitter
    pub fn release(mut self) -> Result<S> {
        let mut submitter = self
            .submitter
            .take()
            .ok_or_else(|| RelayError::Submission {
                message: "Submission scope already released".to_string(),
            })?;
        submitter.flush()?;
        Ok(submitter)
    }
}

impl<S: IndicatorSubmitter> Drop for SubmissionScope<S> {
    fn drop(&mut self) {
        if let Some(mut submitter) = self.submitter.take() {
            if let Err(e) = submitter.flush() {
                warn!("Failed to flush pending indicators: {}", e);
            }
        }
    }
}

#[derive(Serialize)]
struct OutgoingBatch<'a> {
    value: &'a [RequestBody],
}

#[derive(Deserialize)]
struct SubmittedBatch {
    value: Vec<Value>,
}

pub struct BatchFileSubmitter {
    path: PathBuf,
    batch_size: usize,
    verbose: bool,
    total: usize,
    submitted: usize,
    pending: Vec<RequestBody>,
}

impl BatchFileSubmitter {
    pub fn open(config: &Configuration, total_indicators: usize) -> Result<Self> {
        let path = config.output.submissions_file.clone();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|e| RelayError::Submission {
                message: format!("Failed to create {}: {}", parent.display(), e),
            })?;
        }

        info!(
            "Submitting {} indicators to {} in batches of {}",
            total_indicators,
            path.display(),
            config.output.batch_size
        );

        Ok(Self {
            path,
            batch_size: config.output.batch_size,
            verbose: config.is_verbose(),
            total: total_indicators,
            submitted: 0,
            pending: Vec::with_capacity(config.output.batch_size.min(total_indicators)),
        })
    }

    pub fn submitted(&self) -> usize {
        self.submitted
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn write_batch(&self) -> Result<()> {
        let line = serde_json::to_string(&OutgoingBatch {
            value: &self.pending,
        })
        .map_err(|e| RelayError::Submission {
            message: format!("Failed to serialize batch: {}", e),
        })?;

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .map_err(|e| RelayError::Submission {
                message: format!("Failed to open {}: {}", self.path.display(), e),
            })?;
        writeln!(file, "{}", line).map_err(|e| RelayError::Submission {
            message: format!("Failed to write {}: {}", self.path.display(), e),
        })
    }
}

impl IndicatorSubmitter for BatchFileSubmitter {
    fn handle_indicator(&mut self, body: RequestBody) -> Result<()> {
        if self.verbose {
            info!("Queued indicator: {}", Value::Object(body.fields().clone()));
        } else {
            debug!("Queued indicator: {}", Value::Object(body.fields().clone()));
        }

        self.pending.push(body);
        if self.pending.len() >= self.batch_size {
            self.flush()?;
        }
        Ok(())
    }

    fn flush(&mut self) -> Result<()> {
        if self.pending.is_empty() {
            return Ok(());
        }

        self.write_batch()?;
        self.submitted += self.pending.len();
        self.pending.clear();
        info!("Submitted {}/{} indicators", self.submitted, self.total);
        Ok(())
    }
}

/// Every indicator recorded in a submissions file, in submission order.
///
/// A missing file means nothing has been submitted yet.
pub fn list_submitted<P: AsRef<Path>>(path: P) -> Result<Vec<Value>> {
    let path = path.as_ref();
    if !path.exists() {
        warn!("No submissions recorded at {}", path.display());
        return Ok(Vec::new());
    }

    let content = fs::read_to_string(path).map_err(|e| RelayError::Submission {
        message: format!("Failed to read {}: {}", path.display(), e),
    })?;

    let mut indicators = Vec::new();
    for (number, line) in content.lines().enumerate() {
        if line.trim().is_empty() {
            continue;
        }
        let batch: SubmittedBatch =
            serde_json::from_str(line).map_err(|e| RelayError::Submission {
                message: format!("Malformed batch on line {}: {}", number + 1, e),
            })?;
        indicators.extend(batch.value);
    }
    Ok(indicators)
}
