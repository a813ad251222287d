//! Structured faults for the parallel execution model.

use thiserror::Error;

use crate::error::WorkerError;

/// Common error for everything related to parallelisation.
///
/// Distinguishes programming-level faults (an identifier missing from the
/// active dispatch table) from runtime faults reported by a worker. Values
/// are built in one step by the named constructors and never mutated
/// afterwards.
#[derive(Debug, Error)]
pub enum ParallelisationError {
    #[error("invalid parallelisation configuration: only positive integers are allowed")]
    InvalidConfig,

    #[error("unknown worker identifier: {0}")]
    UnknownIdentifier(String),

    /// A remote fault re-hydrated from the value data a worker marshaled
    /// back: message, code, and origin location.
    #[error("worker fault: {message} (code {code}, at {origin_file}:{origin_line})")]
    WorkerFault {
        message: String,
        code: i32,
        origin_file: String,
        origin_line: u32,
    },
}

impl ParallelisationError {
    pub fn for_unknown_identifier(identifier: impl Into<String>) -> Self {
        Self::UnknownIdentifier(identifier.into())
    }

    pub fn for_worker_error(error: &WorkerError) -> Self {
        Self::WorkerFault {
            message: error.message.clone(),
            code: error.code,
            origin_file: error.origin_file.clone(),
            origin_line: error.origin_line,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_identifier_names_the_culprit() {
        let error = ParallelisationError::for_unknown_identifier("restyle_worker_bogus");
        assert_eq!(
            error.to_string(),
            "unknown worker identifier: restyle_worker_bogus"
        );
    }

    #[test]
    fn worker_fault_is_rebuilt_from_value_data() {
        let remote = WorkerError {
            message: "fixer panicked".to_string(),
            code: 70,
            origin_file: "coordinator.rs".to_string(),
            origin_line: 42,
        };
        let error = ParallelisationError::for_worker_error(&remote);
        assert_eq!(
            error.to_string(),
            "worker fault: fixer panicked (code 70, at coordinator.rs:42)"
        );
    }
}
