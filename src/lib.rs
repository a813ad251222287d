//! # Restyle - source-code style fixing engine
//!
//! The execution engine of a style-correction tool: given a set of input
//! files and an ordered list of rewrite rules ("fixers"), it applies the
//! rules to each file's parsed representation, verifies the result stays
//! syntactically valid before and after rewriting, computes a diff,
//! persists the new content, and tracks errors — on a single thread or
//! fanned out across a worker pool.
//!
//! ## Features
//!
//! - **Safety gating**: code that fails to lint is never written
//! - **Idempotence detection**: content hashes decide whether anything
//!   really changed, even when rules fight each other
//! - **Partial-failure isolation**: one bad file never aborts the run
//! - **Skip cache**: unchanged files are skipped while the configuration
//!   signature matches
//! - **Parallel execution**: batched worker pool with per-worker timeouts
//!   and structured error marshaling
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use restyle::diff::UnifiedDiffer;
//! use restyle::fixer::{FixerEntry, NoEmptyBlockFixer};
//! use restyle::lint::TokenLinter;
//! use restyle::{NullCacheManager, Runner, RunnerConfig};
//!
//! let files = restyle::finder::FileFinder::new("src").with_extensions(&["php"]).find();
//! let mut runner = Runner::new(
//!     RunnerConfig::default(),
//!     "src",
//!     files,
//!     vec![FixerEntry::trusted(NoEmptyBlockFixer::new())],
//!     Arc::new(UnifiedDiffer::new()),
//!     None,
//!     Arc::new(TokenLinter),
//!     Box::new(NullCacheManager),
//! );
//! let changed = runner.fix()?;
//! # Ok::<(), anyhow::Error>(())
//! ```

pub mod cache;
pub mod diff;
pub mod error;
pub mod events;
pub mod finder;
pub mod fixer;
pub mod lint;
pub mod runner;
pub mod tokens;

pub use cache::{CacheManager, ConfigSignature, FileCacheManager, NullCacheManager};
pub use error::{Error, ErrorKind, ErrorsManager, WorkerError};
pub use runner::parallel::{ParallelConfig, ParallelisationError, WorkerIdentifier};
pub use runner::{FileFixResult, RunAggregate, Runner, RunnerConfig};

/// Result type alias for engine operations
pub type Result<T> = anyhow::Result<T>;

/// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
pub const PKG_NAME: &str = env!("CARGO_PKG_NAME");
pub const PKG_DESCRIPTION: &str = env!("CARGO_PKG_DESCRIPTION");
