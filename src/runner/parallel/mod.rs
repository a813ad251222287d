//! Parallel execution model.
//!
//! This module owns the execution parameters, the worker/coordinator wire
//! protocol, and the structured faults that cross the worker boundary. The
//! coordinator partitions candidate files into ordered batches, feeds them
//! to a pool of workers, and merges each worker's path→result map and error
//! list back into the run — result keys are disjoint because every file is
//! assigned to exactly one batch.
//!
//! Workers are isolated by ownership: each one runs the per-file algorithm
//! with its own errors manager and its own token arena, and everything it
//! reports travels as a serialized value message. A worker that exceeds the
//! configured timeout is terminated and its in-flight file surfaces as a
//! worker error instead of being silently dropped.

pub mod config;
pub(crate) mod coordinator;
pub mod error;
pub mod identifier;

pub use config::{DEFAULT_FILES_PER_PROCESS, DEFAULT_PROCESS_TIMEOUT, ParallelConfig};
pub use error::ParallelisationError;
pub use identifier::WorkerIdentifier;
