// Background jobs: run a comparison operation off the caller's thread.
//
// A submitted operation runs on tokio's blocking pool (the work itself fans
// out on the engine's rayon pool). The caller gets a JobHandle back right
// away and can poll its status, cancel it, or await its result. Results
// arrive through a oneshot channel, so the caller is never handed a partial
// table.

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::{Arc, Mutex, RwLock};

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::oneshot;
use tracing::{error, info};

use crate::corpus::Document;
use crate::error::OperationError;
use crate::pipeline::{FilteredMatch, PercentageMatch, Rationalization, Rationalizer, ReferenceMatch};
use crate::progress::{CancelToken, NoProgress, ProgressObserver};

/// An operation a job can run.
#[derive(Debug, Clone)]
pub enum Operation {
    Rationalize { documents: Vec<Document> },
    PercentageMatch { documents: Vec<Document> },
    FilteredPercentageMatch { documents: Vec<Document>, min_score: f64 },
    ReferenceMatch { reference: Document, documents: Vec<Document> },
}

impl Operation {
    pub fn name(&self) -> &'static str {
        match self {
            Operation::Rationalize { .. } => "rationalize",
            Operation::PercentageMatch { .. } => "percentage match",
            Operation::FilteredPercentageMatch { .. } => "filtered percentage match",
            Operation::ReferenceMatch { .. } => "reference match",
        }
    }

    fn document_count(&self) -> usize {
        match self {
            Operation::Rationalize { documents }
            | Operation::PercentageMatch { documents }
            | Operation::FilteredPercentageMatch { documents, .. } => documents.len(),
            Operation::ReferenceMatch { documents, .. } => documents.len() + 1,
        }
    }
}

/// What a finished job hands back.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum JobOutput {
    Rationalization(Rationalization),
    PercentageMatch(PercentageMatch),
    FilteredMatch(FilteredMatch),
    ReferenceMatch(ReferenceMatch),
}

/// Live status of a background job.
#[derive(Debug, Clone, Default, Serialize)]
pub struct JobStatus {
    /// True while the job is in progress.
    pub running: bool,
    pub started_at: Option<DateTime<Utc>>,
    pub finished_at: Option<DateTime<Utc>>,
    /// Human-readable progress message updated as stages advance.
    pub progress_message: String,
    /// Error message if the job failed or was cancelled.
    pub last_error: Option<String>,
}

/// Submits operations against one shared engine.
#[derive(Clone)]
pub struct JobRunner {
    engine: Arc<Rationalizer>,
}

impl JobRunner {
    pub fn new(engine: Arc<Rationalizer>) -> Self {
        Self { engine }
    }

    pub fn engine(&self) -> &Arc<Rationalizer> {
        &self.engine
    }

    /// Start `operation` in the background. Must be called from within a
    /// tokio runtime.
    pub fn submit(&self, operation: Operation) -> JobHandle {
        self.submit_with_progress(operation, Arc::new(NoProgress))
    }

    /// Like `submit`, also forwarding progress to `observer`.
    pub fn submit_with_progress(
        &self,
        operation: Operation,
        observer: Arc<dyn ProgressObserver>,
    ) -> JobHandle {
        let status = Arc::new(RwLock::new(JobStatus {
            running: true,
            started_at: Some(Utc::now()),
            progress_message: format!("Starting {}…", operation.name()),
            ..JobStatus::default()
        }));
        let cancel = CancelToken::new();
        let (done_tx, done_rx) = oneshot::channel();

        let engine = Arc::clone(&self.engine);
        let job_status = Arc::clone(&status);
        let job_cancel = cancel.clone();

        tokio::task::spawn_blocking(move || {
            let name = operation.name();
            info!(operation = name, documents = operation.document_count(), "Job started");

            let reporter = StatusReporter::new(Arc::clone(&job_status), observer);
            let result = panic::catch_unwind(AssertUnwindSafe(|| {
                run(&engine, operation, &job_cancel, &reporter)
            }))
            .unwrap_or_else(|payload| Err(OperationError::Job(panic_message(payload))));

            {
                let mut s = write_status(&job_status);
                s.running = false;
                s.finished_at = Some(Utc::now());
                match &result {
                    Ok(_) => {
                        s.last_error = None;
                        s.progress_message = format!("Completed {name}");
                    }
                    Err(OperationError::Cancelled) => {
                        s.last_error = Some(OperationError::Cancelled.to_string());
                        s.progress_message = format!("Cancelled {name}");
                    }
                    Err(e) => {
                        error!(operation = name, error = %e, "Background job failed");
                        s.last_error = Some(e.to_string());
                        s.progress_message = format!("{name} failed, see logs");
                    }
                }
            }

            // The receiver may already be gone; the status above still records the outcome
            let _ = done_tx.send(result);
        });

        JobHandle {
            status,
            cancel,
            done: done_rx,
        }
    }
}

fn run(
    engine: &Rationalizer,
    operation: Operation,
    cancel: &CancelToken,
    progress: &dyn ProgressObserver,
) -> Result<JobOutput, OperationError> {
    match operation {
        Operation::Rationalize { documents } => engine
            .rationalize_with(&documents, cancel, progress)
            .map(JobOutput::Rationalization),
        Operation::PercentageMatch { documents } => engine
            .percentage_match_with(&documents, cancel, progress)
            .map(JobOutput::PercentageMatch),
        Operation::FilteredPercentageMatch {
            documents,
            min_score,
        } => engine
            .filtered_percentage_match_with(&documents, min_score, cancel, progress)
            .map(JobOutput::FilteredMatch),
        Operation::ReferenceMatch {
            reference,
            documents,
        } => engine
            .reference_match_with(&reference, &documents, cancel, progress)
            .map(JobOutput::ReferenceMatch),
    }
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        format!("job panicked: {s}")
    } else if let Some(s) = payload.downcast_ref::<String>() {
        format!("job panicked: {s}")
    } else {
        "job panicked".to_string()
    }
}

fn write_status(status: &RwLock<JobStatus>) -> std::sync::RwLockWriteGuard<'_, JobStatus> {
    status.write().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Caller's side of a running job.
pub struct JobHandle {
    status: Arc<RwLock<JobStatus>>,
    cancel: CancelToken,
    done: oneshot::Receiver<Result<JobOutput, OperationError>>,
}

impl JobHandle {
    /// Snapshot of the current status.
    pub fn status(&self) -> JobStatus {
        self.status
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    /// Ask the job to stop at its next document or row-chunk boundary.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    /// A token that cancels this job, usable after `wait` consumed the handle.
    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    /// Wait for the job to finish and take its result.
    pub async fn wait(self) -> Result<JobOutput, OperationError> {
        self.done
            .await
            .map_err(|_| OperationError::Job("job ended without reporting a result".to_string()))?
    }
}

/// Mirrors pipeline progress into the job status, then forwards it.
struct StatusReporter {
    status: Arc<RwLock<JobStatus>>,
    inner: Arc<dyn ProgressObserver>,
    stage: Mutex<StageProgress>,
}

#[derive(Default)]
struct StageProgress {
    name: String,
    done: usize,
    total: usize,
}

impl StatusReporter {
    fn new(status: Arc<RwLock<JobStatus>>, inner: Arc<dyn ProgressObserver>) -> Self {
        Self {
            status,
            inner,
            stage: Mutex::new(StageProgress::default()),
        }
    }

    fn publish(&self, stage: &StageProgress) {
        write_status(&self.status).progress_message =
            format!("{} {}/{}", stage.name, stage.done, stage.total);
    }
}

impl ProgressObserver for StatusReporter {
    fn stage(&self, name: &str, total: usize) {
        let mut stage = self.stage.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        *stage = StageProgress {
            name: name.to_string(),
            done: 0,
            total,
        };
        self.publish(&stage);
        self.inner.stage(name, total);
    }

    fn advance(&self, units: usize) {
        let mut stage = self.stage.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        stage.done = (stage.done + units).min(stage.total);
        self.publish(&stage);
        self.inner.advance(units);
    }

    fn finish(&self) {
        self.inner.finish();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_panic_message_keeps_payload() {
        let payload: Box<dyn Any + Send> = Box::new("boom");
        assert_eq!(panic_message(payload), "job panicked: boom");
        let payload: Box<dyn Any + Send> = Box::new(String::from("bang"));
        assert_eq!(panic_message(payload), "job panicked: bang");
    }

    #[test]
    fn test_status_reporter_formats_stage() {
        let status = Arc::new(RwLock::new(JobStatus::default()));
        let reporter = StatusReporter::new(Arc::clone(&status), Arc::new(NoProgress));

        reporter.stage("Segmenting", 4);
        reporter.advance(1);
        reporter.advance(1);
        assert_eq!(status.read().unwrap().progress_message, "Segmenting 2/4");
    }

    #[test]
    fn test_operation_names() {
        let op = Operation::FilteredPercentageMatch {
            documents: Vec::new(),
            min_score: 90.0,
        };
        assert_eq!(op.name(), "filtered percentage match");
        assert_eq!(op.document_count(), 0);

        let op = Operation::ReferenceMatch {
            reference: Document::new(0, "template.pdf", std::time::SystemTime::UNIX_EPOCH),
            documents: Vec::new(),
        };
        assert_eq!(op.name(), "reference match");
        assert_eq!(op.document_count(), 1);
    }
}
