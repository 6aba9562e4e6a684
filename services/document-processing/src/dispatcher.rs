//! Parallel Dispatcher
//!
//! One task per source file on a bounded pool. Each task decodes its own
//! document and runs the page pipeline on a blocking thread, then hands an
//! immutable [`ProcessedFile`] back. Only the coordinating task touches the
//! accumulators, in the order tasks complete.
//!
//! A blocking thread cannot be cancelled, so a timed-out file keeps its pool
//! slot until the thread really returns: the slot is a semaphore permit owned
//! by the blocking closure, not the async task.

use std::sync::Arc;
use std::time::{Duration, Instant};

use integra_models::{FailurePolicy, Progress};
use integra_utils::{ProcessingConfig, StatementError, StatementResult};
use serde::Serialize;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use tokio::task::JoinSet;
use tracing::{info, warn};

use crate::assembler::UnitAssembler;
use crate::pdf::PdfBackend;
use crate::pdf_processor::{PdfProcessor, ProcessedFile};

/// An uploaded statement.
#[derive(Debug, Clone)]
pub struct SourceFile {
    pub name: String,
    pub bytes: Vec<u8>,
}

impl SourceFile {
    pub fn new(name: impl Into<String>, bytes: impl Into<Vec<u8>>) -> Self {
        Self {
            name: name.into(),
            bytes: bytes.into(),
        }
    }
}

/// A file left out of the run under [`FailurePolicy::SkipFile`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SkippedFile {
    pub file_name: String,
    pub code: String,
    pub reason: String,
}

/// Progress observer, called on the coordinating task after every file.
pub type ProgressFn<'a> = &'a (dyn Fn(Progress) + Send + Sync);

/// Everything the coordinator gathered from the worker tasks.
pub struct DispatchOutcome<D> {
    /// Decoded documents indexed by submission position; `None` for skipped files.
    pub arena: Vec<Option<Arc<D>>>,
    pub assembler: UnitAssembler,
    pub skipped: Vec<SkippedFile>,
    pub files_processed: usize,
    pub highlight_count: usize,
    pub mask_count: usize,
    pub unit_name_count: usize,
    pub warnings: Vec<String>,
}

type TaskOutput<D> = (usize, String, StatementResult<(Arc<D>, ProcessedFile)>);

#[derive(Debug, Clone)]
pub struct Dispatcher {
    max_workers: usize,
    task_timeout: Option<Duration>,
    failure_policy: FailurePolicy,
}

impl Dispatcher {
    pub fn new(config: &ProcessingConfig) -> Self {
        Self {
            max_workers: config.worker_count(),
            task_timeout: config.task_timeout(),
            failure_policy: config.failure_policy,
        }
    }

    pub async fn run<B: PdfBackend>(
        &self,
        backend: Arc<B>,
        processor: Arc<PdfProcessor>,
        files: Vec<SourceFile>,
        on_progress: Option<ProgressFn<'_>>,
    ) -> StatementResult<DispatchOutcome<B::Document>> {
        let total = files.len();
        let started = Instant::now();

        let mut outcome = DispatchOutcome {
            arena: (0..total).map(|_| None).collect(),
            assembler: UnitAssembler::new(processor.units()),
            skipped: Vec::new(),
            files_processed: 0,
            highlight_count: 0,
            mask_count: 0,
            unit_name_count: 0,
            warnings: Vec::new(),
        };

        let slots = Arc::new(Semaphore::new(self.max_workers));
        let mut pending = files.into_iter().enumerate();
        let mut tasks: JoinSet<TaskOutput<B::Document>> = JoinSet::new();
        let mut completed = 0;

        loop {
            while tasks.len() < self.max_workers {
                let Some((file_index, file)) = pending.next() else {
                    break;
                };
                let permit = Arc::clone(&slots)
                    .acquire_owned()
                    .await
                    .map_err(|e| StatementError::internal(format!("Worker pool closed: {}", e)))?;
                tasks.spawn(process_file(
                    Arc::clone(&backend),
                    Arc::clone(&processor),
                    file_index,
                    file,
                    self.task_timeout,
                    permit,
                ));
            }

            let Some(joined) = tasks.join_next().await else {
                break;
            };
            let (file_index, file_name, result) =
                joined.map_err(|e| StatementError::internal(format!("Worker task failed: {}", e)))?;
            completed += 1;

            match result {
                Ok((document, processed)) => {
                    outcome.files_processed += 1;
                    outcome.highlight_count += processed.highlight_count;
                    outcome.mask_count += processed.mask_count;
                    outcome.unit_name_count += processed.unit_name_count;
                    outcome.warnings.extend(processed.page_warnings.iter().cloned());
                    outcome.arena[file_index] = Some(document);
                    outcome.assembler.absorb(processed);
                }
                Err(error) => {
                    if self.failure_policy == FailurePolicy::AbortRun || !error.is_file_scoped() {
                        warn!(file = %file_name, error = %error, "Aborting run");
                        tasks.abort_all();
                        return Err(error);
                    }

                    warn!(file = %file_name, error = %error, "Skipping file");
                    outcome.skipped.push(SkippedFile {
                        file_name,
                        code: error.error_code().to_string(),
                        reason: error.to_string(),
                    });
                }
            }

            let progress = Progress::estimate(completed, total, started.elapsed());
            info!(
                files_completed = progress.files_completed,
                files_total = progress.files_total,
                elapsed_ms = progress.elapsed.as_millis() as u64,
                remaining_ms = progress.estimated_remaining.as_millis() as u64,
                "File completed"
            );
            if let Some(callback) = on_progress {
                callback(progress);
            }
        }

        Ok(outcome)
    }
}

async fn process_file<B: PdfBackend>(
    backend: Arc<B>,
    processor: Arc<PdfProcessor>,
    file_index: usize,
    file: SourceFile,
    timeout: Option<Duration>,
    permit: OwnedSemaphorePermit,
) -> TaskOutput<B::Document> {
    let name = file.name.clone();

    let handle = tokio::task::spawn_blocking(move || -> StatementResult<(Arc<B::Document>, ProcessedFile)> {
        let _permit = permit;
        let document = backend.open(&file.name, &file.bytes)?;
        let processed = processor.process(file_index, &file.name, &document);
        Ok((Arc::new(document), processed))
    });

    let joined = match timeout {
        Some(limit) => match tokio::time::timeout(limit, handle).await {
            Ok(joined) => joined,
            // the thread runs on holding its permit; its result is discarded
            Err(_) => {
                let error = StatementError::task_timeout(&name, limit.as_secs());
                return (file_index, name, Err(error));
            }
        },
        None => handle.await,
    };

    let result = joined.unwrap_or_else(|e| {
        Err(StatementError::document_open(&name, format!("processing panicked: {}", e)))
    });
    (file_index, name, result)
}
