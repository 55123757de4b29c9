//! Concurrent processing of many files.
//!
//! Each file runs on the blocking pool under a per-document timeout; the
//! number of files in flight is bounded by a semaphore. A failed or timed-out
//! file is reported and the rest continue. A timed-out file is never stored:
//! its worker finishes in the background and records the document as failed.

use super::{Cancellation, DocumentPipeline, PipelineError, PipelineResult, StoreReport};
use crate::storage::ChunkStore;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;
use tokio::task::JoinError;

#[derive(Debug, Clone)]
pub struct BatchOptions {
    pub concurrency: usize,
    pub document_timeout: Duration,
    pub max_file_size: u64,
    pub schemas: Vec<String>,
}

impl Default for BatchOptions {
    fn default() -> Self {
        Self {
            concurrency: num_cpus::get().max(1),
            document_timeout: Duration::from_secs(300),
            max_file_size: 50 * 1024 * 1024,
            schemas: Vec::new(),
        }
    }
}

#[derive(Debug)]
pub enum FileOutcome {
    Stored(StoreReport),
    Failed { path: PathBuf, error: PipelineError },
}

impl FileOutcome {
    pub fn is_stored(&self) -> bool {
        matches!(self, FileOutcome::Stored(_))
    }
}

/// Outcomes in input order.
#[derive(Debug, Default)]
pub struct BatchReport {
    pub outcomes: Vec<FileOutcome>,
}

impl BatchReport {
    pub fn stored(&self) -> usize {
        self.outcomes.iter().filter(|o| o.is_stored()).count()
    }

    pub fn failed(&self) -> usize {
        self.outcomes.len() - self.stored()
    }
}

/// Ingest `paths` into `store`.
pub async fn process_files(
    pipeline: Arc<DocumentPipeline>,
    store: Arc<dyn ChunkStore>,
    paths: Vec<PathBuf>,
    options: BatchOptions,
) -> BatchReport {
    let semaphore = Arc::new(Semaphore::new(options.concurrency.max(1)));
    let schemas = Arc::new(options.schemas);
    let mut handles = Vec::with_capacity(paths.len());

    for path in paths {
        let semaphore = semaphore.clone();
        let pipeline = pipeline.clone();
        let store = store.clone();
        let schemas = schemas.clone();
        let timeout = options.document_timeout;
        let max_file_size = options.max_file_size;

        handles.push(tokio::spawn(async move {
            let permit = match semaphore.acquire_owned().await {
                Ok(permit) => permit,
                Err(e) => {
                    return FileOutcome::Failed {
                        path,
                        error: PipelineError::Task(e.to_string()),
                    };
                }
            };

            let cancel = Arc::new(Cancellation::new());
            let task_cancel = cancel.clone();
            let task_path = path.clone();
            // Blocking work cannot be aborted; the permit is held until it really ends.
            let mut work = tokio::task::spawn_blocking(move || {
                let _permit = permit;
                pipeline.ingest_file_cancellable(
                    store.as_ref(),
                    &task_path,
                    max_file_size,
                    &schemas[..],
                    &task_cancel,
                )
            });

            match tokio::time::timeout(timeout, &mut work).await {
                Ok(joined) => outcome(path, joined),
                Err(_) if cancel.cancel() => FileOutcome::Failed {
                    error: PipelineError::Timeout {
                        path: path.clone(),
                        secs: timeout.as_secs(),
                    },
                    path,
                },
                // Storage had already begun, so its result stands.
                Err(_) => outcome(path, work.await),
            }
        }));
    }

    let mut report = BatchReport::default();
    for handle in handles {
        match handle.await {
            Ok(outcome) => {
                match &outcome {
                    FileOutcome::Stored(stored) => tracing::info!(
                        target: "pipeline",
                        "stored {} ({} chunks, {} rejected)",
                        stored.filename,
                        stored.stored_chunks,
                        stored.rejected.len()
                    ),
                    FileOutcome::Failed { path, error } => {
                        tracing::warn!(target: "pipeline", "failed {}: {error}", path.display())
                    }
                }
                report.outcomes.push(outcome);
            }
            Err(e) => tracing::error!(target: "pipeline", "batch worker panicked: {e}"),
        }
    }

    report
}

fn outcome(path: PathBuf, joined: Result<PipelineResult<StoreReport>, JoinError>) -> FileOutcome {
    match joined {
        Ok(Ok(report)) => FileOutcome::Stored(report),
        Ok(Err(error)) => FileOutcome::Failed { path, error },
        Err(join_error) => FileOutcome::Failed {
            path,
            error: PipelineError::Task(join_error.to_string()),
        },
    }
}
