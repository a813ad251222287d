//! Worker pool dispatch and result marshaling.
//!
//! Candidate files are partitioned into ordered batches and drawn from a
//! shared queue by up to `max_processes` workers. Each worker runs the same
//! per-file algorithm as the sequential strategy with its own errors
//! manager and its own token arena, so no mutable state is shared across
//! workers. Everything a worker tells the coordinator travels as a
//! JSON-serialized value message — results, statuses, and faults are
//! reconstructed from data, never passed as live objects.
//!
//! The coordinator owns the dispatch table keyed by [`WorkerIdentifier`].
//! Workers that go silent past the configured timeout are terminated
//! (cancel flag plus abandonment) and their in-flight file is reported as a
//! [`WorkerError`]; late messages from a terminated worker are dropped.

use crossbeam::channel::{Receiver, RecvTimeoutError, Sender, unbounded};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use anyhow::{Context, Result};

use crate::cache::CacheManager;
use crate::diff::Differ;
use crate::error::{Error, ErrorsManager, WorkerError};
use crate::events::{EventSink, FileProcessedEvent, FileProcessedStatus};
use crate::fixer::FixerEntry;
use crate::lint::Linter;
use crate::runner::{
    CandidateFile, FileFixResult, FixContext, PendingFile, RunAggregate, panic_message,
    process_file,
};

use super::config::ParallelConfig;
use super::error::ParallelisationError;
use super::identifier::WorkerIdentifier;

// conventional exit-style codes carried in marshaled faults
const TIMEOUT_CODE: i32 = 124;
const PANIC_CODE: i32 = 70;
const IO_FAULT_CODE: i32 = 74;

/// Wire message from a worker to the coordinator.
#[derive(Debug, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub(crate) enum WorkerMessage {
    /// The worker is about to process `path`.
    Claim { worker: WorkerIdentifier, path: String },
    /// Per-file outcome plus the errors reported while producing it.
    Processed {
        worker: WorkerIdentifier,
        path: String,
        status: FileProcessedStatus,
        result: Option<FileFixResult>,
        new_hash: Option<String>,
        errors: Vec<Error>,
    },
    /// Value-typed remote fault. The worker stops after sending this.
    Fault { worker: WorkerIdentifier, error: WorkerError },
    /// The worker drained the batch queue (or gave up) and exited.
    Finished { worker: WorkerIdentifier },
}

impl WorkerMessage {
    fn worker(&self) -> &WorkerIdentifier {
        match self {
            Self::Claim { worker, .. }
            | Self::Processed { worker, .. }
            | Self::Fault { worker, .. }
            | Self::Finished { worker } => worker,
        }
    }
}

/// Per-worker bookkeeping in the dispatch table.
#[derive(Debug, Default)]
struct WorkerSlot {
    in_flight: Option<String>,
    finished: bool,
}

/// Immutable collaborators shared with every worker.
pub(crate) struct WorkerContext {
    pub fixers: Arc<Vec<FixerEntry>>,
    pub linter: Arc<dyn Linter>,
    pub differ: Arc<dyn Differ>,
    pub dry_run: bool,
}

impl Clone for WorkerContext {
    fn clone(&self) -> Self {
        Self {
            fixers: Arc::clone(&self.fixers),
            linter: Arc::clone(&self.linter),
            differ: Arc::clone(&self.differ),
            dry_run: self.dry_run,
        }
    }
}

pub(crate) fn run(
    config: &ParallelConfig,
    context: WorkerContext,
    files: Vec<PendingFile>,
    event_sink: Option<Arc<dyn EventSink>>,
    cache: &mut dyn CacheManager,
    errors: &mut ErrorsManager,
) -> Result<RunAggregate> {
    let mut aggregate = RunAggregate::new();
    if files.is_empty() {
        return Ok(aggregate);
    }

    let batches = into_batches(files, config.files_per_process());
    let worker_count = config.max_processes().min(batches.len()).max(1);
    tracing::debug!(workers = worker_count, batches = batches.len(), "starting worker pool");

    let (job_tx, job_rx) = unbounded::<Vec<PendingFile>>();
    for batch in batches {
        let _ = job_tx.send(batch);
    }
    drop(job_tx);

    let (message_tx, message_rx) = unbounded::<String>();
    let cancel = Arc::new(AtomicBool::new(false));

    let mut table: HashMap<WorkerIdentifier, WorkerSlot> = HashMap::new();
    let mut handles = Vec::with_capacity(worker_count);

    for _ in 0..worker_count {
        let identifier = WorkerIdentifier::random();
        table.insert(identifier.clone(), WorkerSlot::default());

        let handle = std::thread::Builder::new()
            .name(identifier.to_string())
            .spawn({
                let identifier = identifier.clone();
                let context = context.clone();
                let jobs = job_rx.clone();
                let messages = message_tx.clone();
                let cancel = Arc::clone(&cancel);
                move || worker_main(identifier, context, &jobs, &messages, &cancel)
            })
            .context("failed to spawn worker thread")?;
        handles.push((identifier, handle));
    }
    drop(job_rx);
    drop(message_tx);

    let mut active = worker_count;
    let mut terminated: HashSet<WorkerIdentifier> = HashSet::new();

    while active > 0 {
        match message_rx.recv_timeout(config.timeout()) {
            Ok(raw) => {
                let message: WorkerMessage = serde_json::from_str(&raw)
                    .map_err(|e| anyhow::anyhow!("malformed worker message: {e}"))?;
                if terminated.contains(message.worker()) {
                    continue;
                }
                let slot = lookup(&mut table, message.worker())?;

                match message {
                    WorkerMessage::Claim { path, .. } => slot.in_flight = Some(path),
                    WorkerMessage::Processed {
                        path,
                        status,
                        result,
                        new_hash,
                        errors: reported,
                        ..
                    } => {
                        slot.in_flight = None;
                        for error in reported {
                            errors.report(error);
                        }
                        if let Some(hash) = new_hash {
                            cache.set_file_hash(&path, &hash);
                        }
                        if let Some(sink) = &event_sink {
                            let applied = result
                                .as_ref()
                                .map(|r| r.applied_fixers.clone())
                                .unwrap_or_default();
                            sink.dispatch(&FileProcessedEvent::new(status, path.clone(), applied));
                        }
                        if let Some(result) = result {
                            // keys are disjoint by construction: each file
                            // belongs to exactly one batch
                            aggregate.insert(path, result);
                        }
                    }
                    WorkerMessage::Fault { worker, error } => {
                        slot.in_flight = None;
                        tracing::warn!(worker = %worker, message = %error.message, "worker fault");
                        errors.report(error);
                    }
                    WorkerMessage::Finished { .. } => {
                        slot.finished = true;
                        active -= 1;
                    }
                }
            }
            Err(RecvTimeoutError::Timeout) => {
                // every still-active worker went silent for a full window
                cancel.store(true, Ordering::Relaxed);
                for (identifier, slot) in &table {
                    if slot.finished {
                        continue;
                    }
                    tracing::warn!(worker = %identifier, "terminating silent worker");
                    errors.report(timeout_error(
                        identifier,
                        slot.in_flight.as_deref(),
                        config.process_timeout(),
                    ));
                    terminated.insert(identifier.clone());
                }
                break;
            }
            Err(RecvTimeoutError::Disconnected) => break,
        }
    }

    cancel.store(true, Ordering::Relaxed);
    for (identifier, handle) in handles {
        let finished = table.get(&identifier).map(|slot| slot.finished).unwrap_or(false);
        if finished {
            let _ = handle.join();
        }
        // a terminated worker's handle is dropped, not joined: it will exit
        // on its own at the next cancel check or failed send
    }

    Ok(aggregate)
}

fn lookup<'a>(
    table: &'a mut HashMap<WorkerIdentifier, WorkerSlot>,
    worker: &WorkerIdentifier,
) -> Result<&'a mut WorkerSlot, ParallelisationError> {
    table
        .get_mut(worker)
        .ok_or_else(|| ParallelisationError::for_unknown_identifier(worker.as_str()))
}

fn worker_main(
    identifier: WorkerIdentifier,
    context: WorkerContext,
    jobs: &Receiver<Vec<PendingFile>>,
    messages: &Sender<String>,
    cancel: &AtomicBool,
) {
    while let Ok(batch) = jobs.recv() {
        for file in batch {
            if cancel.load(Ordering::Relaxed) {
                return;
            }
            let claim = WorkerMessage::Claim {
                worker: identifier.clone(),
                path: file.relative_path.clone(),
            };
            if send(messages, &claim).is_err() {
                return;
            }

            let mut local_errors = ErrorsManager::new();
            let prelint = context.linter.lint_source(&file.content);
            let candidate = CandidateFile {
                path: file.path,
                relative_path: file.relative_path,
                content: file.content,
                prelint,
            };
            let fix_context = FixContext {
                fixers: context.fixers.as_slice(),
                linter: context.linter.as_ref(),
                differ: context.differ.as_ref(),
                dry_run: context.dry_run,
            };

            let outcome = catch_unwind(AssertUnwindSafe(|| {
                process_file(&fix_context, &candidate, &mut local_errors)
            }));

            let message = match outcome {
                Ok(Ok(outcome)) => WorkerMessage::Processed {
                    worker: identifier.clone(),
                    path: candidate.relative_path.clone(),
                    status: outcome.status,
                    result: outcome.result,
                    new_hash: outcome.new_hash,
                    errors: local_errors.pop_all_errors(),
                },
                // write-time I/O fault: fatal for this worker, marshaled as
                // a value so sibling workers keep running
                Ok(Err(fatal)) => WorkerMessage::Fault {
                    worker: identifier.clone(),
                    error: WorkerError {
                        message: format!("{fatal:#}"),
                        code: IO_FAULT_CODE,
                        origin_file: file!().to_string(),
                        origin_line: line!(),
                    },
                },
                Err(panic) => WorkerMessage::Fault {
                    worker: identifier.clone(),
                    error: WorkerError {
                        message: panic_message(panic.as_ref()),
                        code: PANIC_CODE,
                        origin_file: file!().to_string(),
                        origin_line: line!(),
                    },
                },
            };

            let fault = matches!(message, WorkerMessage::Fault { .. });
            if send(messages, &message).is_err() {
                return;
            }
            if fault {
                let _ = send(messages, &WorkerMessage::Finished { worker: identifier });
                return;
            }
        }
    }

    let _ = send(messages, &WorkerMessage::Finished { worker: identifier });
}

fn send(messages: &Sender<String>, message: &WorkerMessage) -> Result<(), ()> {
    let raw = serde_json::to_string(message).map_err(|_| ())?;
    messages.send(raw).map_err(|_| ())
}

fn timeout_error(worker: &WorkerIdentifier, in_flight: Option<&str>, seconds: u64) -> WorkerError {
    let message = match in_flight {
        Some(path) => format!("timeout: {worker} exceeded {seconds}s while processing {path}"),
        None => format!("timeout: {worker} exceeded {seconds}s"),
    };
    WorkerError {
        message,
        code: TIMEOUT_CODE,
        origin_file: file!().to_string(),
        origin_line: line!(),
    }
}

fn into_batches(files: Vec<PendingFile>, size: usize) -> Vec<Vec<PendingFile>> {
    let mut batches = Vec::new();
    let mut iter = files.into_iter();
    loop {
        let batch: Vec<PendingFile> = iter.by_ref().take(size).collect();
        if batch.is_empty() {
            return batches;
        }
        batches.push(batch);
    }
}
