//! Worker identity within a run's dispatch table.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::error::ParallelisationError;

const IDENTIFIER_PREFIX: &str = "restyle_worker_";

/// Opaque identifier of one worker in the active dispatch table.
///
/// The coordinator mints one per worker before spawning it; every wire
/// message carries the sender's identifier so the coordinator can look the
/// worker up. A message with an identifier the table does not know is a
/// programming-level fault.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct WorkerIdentifier(String);

impl WorkerIdentifier {
    pub fn random() -> Self {
        Self(format!("{IDENTIFIER_PREFIX}{}", Uuid::new_v4()))
    }

    /// Parse an identifier received from the outside, rejecting strings
    /// this engine could not have minted.
    pub fn from_raw(raw: &str) -> Result<Self, ParallelisationError> {
        if raw.starts_with(IDENTIFIER_PREFIX) {
            Ok(Self(raw.to_string()))
        } else {
            Err(ParallelisationError::for_unknown_identifier(raw))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for WorkerIdentifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}
