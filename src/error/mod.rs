//! Error taxonomy and collection for fix runs.
//!
//! Every fault raised while fixing a file is classified and reported into an
//! [`ErrorsManager`] instead of aborting the run; one file's failure never
//! takes the remaining files with it. The only faults that escape a run are
//! physical I/O failures at write time, which indicate an environment
//! problem rather than a content problem.

use serde::{Deserialize, Serialize};

/// Classification of a per-file error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ErrorKind {
    /// The input failed linting before any fixer ran.
    Invalid,
    /// The output failed linting after fixing, or a parse fault occurred
    /// mid-fix.
    Lint,
    /// Any other uncaught fault during fixing.
    Exception,
}

/// A per-file error reported during a run.
///
/// Value-typed and serializable so it can cross the worker boundary as data.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Error {
    pub kind: ErrorKind,
    /// Path of the file that could not be processed, relative to the run
    /// root.
    pub source_path: String,
    /// Message of the underlying fault.
    pub cause: String,
    /// Fixers that had been applied when the error was produced. Only
    /// populated for post-fix lint failures, where it is diagnostic context
    /// for the change set that was abandoned.
    pub applied_fixers: Vec<String>,
    /// The diff that would have been written, when one had already been
    /// computed.
    pub diff: Option<String>,
}

impl Error {
    pub fn new(
        kind: ErrorKind,
        source_path: impl Into<String>,
        cause: impl std::fmt::Display,
    ) -> Self {
        Self {
            kind,
            source_path: source_path.into(),
            cause: cause.to_string(),
            applied_fixers: Vec::new(),
            diff: None,
        }
    }

    /// Lint error that carries the applied-fixer list and the diff that
    /// would have been written, for diagnostics.
    pub fn lint_with_context(
        source_path: impl Into<String>,
        cause: impl std::fmt::Display,
        applied_fixers: Vec<String>,
        diff: String,
    ) -> Self {
        Self {
            kind: ErrorKind::Lint,
            source_path: source_path.into(),
            cause: cause.to_string(),
            applied_fixers,
            diff: Some(diff),
        }
    }
}

/// A fault marshaled back from a parallel worker.
///
/// Carries no live fault object, only the data the coordinator needs to
/// reconstruct it: message, code, and the origin location inside the worker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkerError {
    pub message: String,
    pub code: i32,
    pub origin_file: String,
    pub origin_line: u32,
}

/// Anything reportable into an [`ErrorsManager`].
#[derive(Debug, Clone)]
pub enum RunError {
    File(Error),
    Worker(WorkerError),
}

impl From<Error> for RunError {
    fn from(error: Error) -> Self {
        Self::File(error)
    }
}

impl From<WorkerError> for RunError {
    fn from(error: WorkerError) -> Self {
        Self::Worker(error)
    }
}

/// Manager of errors that occur during fixing.
///
/// Append-only; reporting is O(1) and never fails. Each worker owns its own
/// manager and the coordinator merges them, so no instance is ever shared
/// across threads.
#[derive(Debug, Default)]
pub struct ErrorsManager {
    errors: Vec<Error>,
    worker_errors: Vec<WorkerError>,
}

impl ErrorsManager {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn report(&mut self, error: impl Into<RunError>) {
        match error.into() {
            RunError::File(error) => self.errors.push(error),
            RunError::Worker(error) => self.worker_errors.push(error),
        }
    }

    /// Errors reported during linting before fixing.
    pub fn invalid_errors(&self) -> Vec<&Error> {
        self.of_kind(ErrorKind::Invalid)
    }

    /// Errors reported during fixing.
    pub fn exception_errors(&self) -> Vec<&Error> {
        self.of_kind(ErrorKind::Exception)
    }

    /// Errors reported during linting after fixing.
    pub fn lint_errors(&self) -> Vec<&Error> {
        self.of_kind(ErrorKind::Lint)
    }

    /// Faults reported by parallel workers, including timeouts.
    pub fn worker_errors(&self) -> &[WorkerError] {
        &self.worker_errors
    }

    /// Returns and clears the classified (non-worker) error list. Used once
    /// per run to finalize reporting.
    pub fn pop_all_errors(&mut self) -> Vec<Error> {
        std::mem::take(&mut self.errors)
    }

    /// True iff no classified errors and no worker errors were reported.
    pub fn is_empty(&self) -> bool {
        self.errors.is_empty() && self.worker_errors.is_empty()
    }

    fn of_kind(&self, kind: ErrorKind) -> Vec<&Error> {
        self.errors.iter().filter(|e| e.kind == kind).collect()
    }
}
