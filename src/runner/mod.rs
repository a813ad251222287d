//! Run orchestration.
//!
//! The [`Runner`] iterates candidate files, drives the per-file fix
//! algorithm, and aggregates a path→result map. Each file goes through a
//! strict linear sequence: pre-lint gate, parse, ordered fixer application,
//! idempotence check by content hash, post-fix re-lint, guarded write,
//! cache update, completion event. A file that cannot be processed is
//! reported into the errors manager and the run moves on; only physical
//! write failures abort a sequential run.

pub mod parallel;

use anyhow::{Context, Result, bail};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::cache::CacheManager;
use crate::diff::Differ;
use crate::error::{Error, ErrorKind, ErrorsManager};
use crate::events::{EventSink, FileProcessedEvent, FileProcessedStatus};
use crate::fixer::{FixError, FixerEntry};
use crate::lint::{Linter, LintingResult};
use crate::tokens::{TokenStream, code_hash};

use self::parallel::ParallelConfig;
use self::parallel::coordinator::{self, WorkerContext};

/// Per-file fix outcome, produced only when output content differs from
/// input.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileFixResult {
    /// Names of the fixers that modified the stream, in application order.
    pub applied_fixers: Vec<String>,
    pub diff: String,
}

/// Aggregate run result keyed by path relative to the run root.
///
/// Insertion order equals processing order in sequential runs; parallel
/// runs guarantee only that keys are unique.
pub type RunAggregate = IndexMap<String, FileFixResult>;

/// Run-level configuration.
#[derive(Debug, Clone)]
pub struct RunnerConfig {
    /// Compute results and report errors without writing anything back.
    pub dry_run: bool,
    /// Halt sequential iteration after the first file that produces a fix
    /// result. This triggers on the first produced result, not the first
    /// error; callers that want fail-fast-on-error must inspect the errors
    /// manager themselves.
    pub stop_on_violation: bool,
    pub parallel: ParallelConfig,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            dry_run: false,
            stop_on_violation: false,
            parallel: ParallelConfig::sequential(),
        }
    }
}

/// A candidate that passed the cache filter; content already read.
#[derive(Debug)]
pub(crate) struct PendingFile {
    pub path: PathBuf,
    pub relative_path: String,
    pub content: String,
}

/// A pending file plus its precomputed lint outcome.
#[derive(Debug)]
pub(crate) struct CandidateFile {
    pub path: PathBuf,
    pub relative_path: String,
    pub content: String,
    pub prelint: LintingResult,
}

/// Everything the per-file algorithm needs besides the file itself.
pub(crate) struct FixContext<'a> {
    pub fixers: &'a [FixerEntry],
    pub linter: &'a dyn Linter,
    pub differ: &'a dyn Differ,
    pub dry_run: bool,
}

/// What happened to one file.
#[derive(Debug)]
pub(crate) struct FileOutcome {
    pub status: FileProcessedStatus,
    pub result: Option<FileFixResult>,
    /// Final content hash to record in the cache; `None` when the file was
    /// abandoned before reaching a stable state.
    pub new_hash: Option<String>,
}

impl FileOutcome {
    fn abandoned(status: FileProcessedStatus) -> Self {
        Self { status, result: None, new_hash: None }
    }
}

/// The orchestrator.
pub struct Runner {
    config: RunnerConfig,
    root: PathBuf,
    files: Vec<PathBuf>,
    fixers: Arc<Vec<FixerEntry>>,
    differ: Arc<dyn Differ>,
    event_sink: Option<Arc<dyn EventSink>>,
    errors: ErrorsManager,
    linter: Arc<dyn Linter>,
    cache: Box<dyn CacheManager>,
}

impl Runner {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        config: RunnerConfig,
        root: impl Into<PathBuf>,
        files: Vec<PathBuf>,
        fixers: Vec<FixerEntry>,
        differ: Arc<dyn Differ>,
        event_sink: Option<Arc<dyn EventSink>>,
        linter: Arc<dyn Linter>,
        cache: Box<dyn CacheManager>,
    ) -> Self {
        Self {
            config,
            root: root.into(),
            files,
            fixers: Arc::new(fixers),
            differ,
            event_sink,
            errors: ErrorsManager::new(),
            linter,
            cache,
        }
    }

    /// Run the configured strategy over all candidate files.
    pub fn fix(&mut self) -> Result<RunAggregate> {
        tracing::debug!(
            files = self.files.len(),
            workers = self.config.parallel.max_processes(),
            dry_run = self.config.dry_run,
            "starting fix run"
        );

        if self.config.parallel.max_processes() > 1 {
            self.fix_parallel()
        } else {
            self.fix_sequential()
        }
    }

    /// Errors collected so far.
    pub fn errors(&self) -> &ErrorsManager {
        &self.errors
    }

    pub fn errors_mut(&mut self) -> &mut ErrorsManager {
        &mut self.errors
    }

    fn fix_sequential(&mut self) -> Result<RunAggregate> {
        let mut changed = RunAggregate::new();
        let files = self.files.clone();

        for path in &files {
            let Some(pending) = self.load_pending(path) else {
                continue;
            };
            let prelint = self.linter.lint_source(&pending.content);
            let candidate = CandidateFile {
                path: pending.path,
                relative_path: pending.relative_path,
                content: pending.content,
                prelint,
            };

            let fixers = Arc::clone(&self.fixers);
            let linter = Arc::clone(&self.linter);
            let differ = Arc::clone(&self.differ);
            let context = FixContext {
                fixers: fixers.as_slice(),
                linter: linter.as_ref(),
                differ: differ.as_ref(),
                dry_run: self.config.dry_run,
            };

            let outcome = process_file(&context, &candidate, &mut self.errors)?;

            if let Some(hash) = &outcome.new_hash {
                self.cache.set_file_hash(&candidate.relative_path, hash);
            }
            let applied = outcome
                .result
                .as_ref()
                .map(|result| result.applied_fixers.clone())
                .unwrap_or_default();
            self.dispatch(FileProcessedEvent::new(
                outcome.status,
                candidate.relative_path.clone(),
                applied,
            ));

            if let Some(result) = outcome.result {
                changed.insert(candidate.relative_path, result);
                if self.config.stop_on_violation {
                    break;
                }
            }
        }

        Ok(changed)
    }

    fn fix_parallel(&mut self) -> Result<RunAggregate> {
        let files = self.files.clone();
        let mut pending = Vec::with_capacity(files.len());
        for path in &files {
            if let Some(file) = self.load_pending(path) {
                pending.push(file);
            }
        }

        let context = WorkerContext {
            fixers: Arc::clone(&self.fixers),
            linter: Arc::clone(&self.linter),
            differ: Arc::clone(&self.differ),
            dry_run: self.config.dry_run,
        };

        coordinator::run(
            &self.config.parallel,
            context,
            pending,
            self.event_sink.clone(),
            self.cache.as_mut(),
            &mut self.errors,
        )
    }

    /// Read a file once and filter it through the skip cache. Read failures
    /// are reported as exception errors, not propagated.
    fn load_pending(&mut self, path: &Path) -> Option<PendingFile> {
        let relative_path = self.relative_name(path);
        let content = match std::fs::read_to_string(path) {
            Ok(content) => content,
            Err(read_error) => {
                self.errors.report(Error::new(
                    ErrorKind::Exception,
                    &relative_path,
                    format!("failed to read file: {read_error}"),
                ));
                return None;
            }
        };

        if !self.cache.needs_fixing(&relative_path, &content) {
            tracing::trace!(file = %relative_path, "unchanged since last run, skipped");
            return None;
        }

        Some(PendingFile { path: path.to_path_buf(), relative_path, content })
    }

    fn relative_name(&self, path: &Path) -> String {
        path.strip_prefix(&self.root)
            .unwrap_or(path)
            .display()
            .to_string()
    }

    fn dispatch(&self, event: FileProcessedEvent) {
        if let Some(sink) = &self.event_sink {
            sink.dispatch(&event);
        }
    }
}

/// The per-file algorithm. The token stream created here is the file's
/// arena: nothing outlives the returned outcome.
///
/// Errors that belong to the file go into `errors` and the function still
/// returns `Ok`; an `Err` means a physical write failure.
pub(crate) fn process_file(
    context: &FixContext<'_>,
    file: &CandidateFile,
    errors: &mut ErrorsManager,
) -> Result<FileOutcome> {
    let name = &file.relative_path;

    if let Err(lint_error) = &file.prelint {
        errors.report(Error::new(ErrorKind::Invalid, name, lint_error));
        return Ok(FileOutcome::abandoned(FileProcessedStatus::Invalid));
    }

    let old = &file.content;
    let mut tokens = TokenStream::parse(old);
    let old_hash = tokens.content_hash();
    let mut applied_fixers: Vec<String> = Vec::new();

    for entry in context.fixers {
        let fixer = entry.fixer();
        // trusted fixers are pre-filtered upstream; only externally
        // supplied ones are asked before getting a mutable stream
        if entry.must_check() && (!fixer.supports(&file.path) || !fixer.is_candidate(&tokens)) {
            continue;
        }

        let attempt = catch_unwind(AssertUnwindSafe(|| fixer.fix(&file.path, &mut tokens)));
        match attempt {
            Ok(Ok(())) => {
                if tokens.is_changed() {
                    tokens.compact();
                    tokens.clear_changed();
                    applied_fixers.push(fixer.name().to_string());
                }
            }
            Ok(Err(FixError::Parse(message))) => {
                errors.report(Error::new(ErrorKind::Lint, name, message));
                return Ok(FileOutcome::abandoned(FileProcessedStatus::Lint));
            }
            Ok(Err(FixError::Other(cause))) => {
                errors.report(Error::new(ErrorKind::Exception, name, format!("{cause:#}")));
                return Ok(FileOutcome::abandoned(FileProcessedStatus::Exception));
            }
            Err(panic) => {
                errors.report(Error::new(
                    ErrorKind::Exception,
                    name,
                    panic_message(panic.as_ref()),
                ));
                return Ok(FileOutcome::abandoned(FileProcessedStatus::Exception));
            }
        }
    }

    // regenerating the code is only worth it if something claims to have
    // changed
    let new = if applied_fixers.is_empty() {
        None
    } else {
        Some(tokens.render())
    };
    let new_hash = new.as_deref().map_or_else(|| old_hash.clone(), code_hash);

    let mut fix_result = None;

    // the applied list alone is not a change signal: one fixer may revert
    // the work of another and both mark the stream changed, so the hashes
    // decide
    if old_hash != new_hash {
        if let Some(new) = new {
            let diff = context.differ.diff(old, &new, &file.path);

            if let Err(lint_error) = context.linter.lint_source(&new) {
                errors.report(Error::lint_with_context(
                    name,
                    lint_error,
                    applied_fixers,
                    diff,
                ));
                return Ok(FileOutcome::abandoned(FileProcessedStatus::Lint));
            }

            if !context.dry_run {
                commit(&file.path, &new)?;
            }

            fix_result = Some(FileFixResult { applied_fixers, diff });
        }
    }

    let status = if fix_result.is_some() {
        FileProcessedStatus::Fixed
    } else {
        FileProcessedStatus::NoChanges
    };

    Ok(FileOutcome { status, result: fix_result, new_hash: Some(new_hash) })
}

/// Physical write, re-validating the preconditions immediately before the
/// syscall. A violation is an environment failure, not a content problem,
/// and aborts the run instead of becoming a per-file error.
fn commit(path: &Path, content: &str) -> Result<()> {
    if !path.exists() {
        bail!("failed to write file {}: it no longer exists", path.display());
    }
    if path.is_dir() {
        bail!(
            "cannot write file {}: the location exists as a directory",
            path.display()
        );
    }
    let metadata = std::fs::metadata(path)
        .with_context(|| format!("cannot stat file {}", path.display()))?;
    if metadata.permissions().readonly() {
        bail!("cannot write file {}: it is not writable", path.display());
    }

    std::fs::write(path, content)
        .with_context(|| format!("failed to write file {}", path.display()))
}

pub(crate) fn panic_message(panic: &(dyn std::any::Any + Send)) -> String {
    if let Some(message) = panic.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = panic.downcast_ref::<String>() {
        message.clone()
    } else {
        "fixer panicked".to_string()
    }
}
