//! Per-file processing events.
//!
//! The engine emits exactly one event per candidate file, after its fate is
//! decided. Event dispatch is optional: a run without a sink skips it
//! entirely.

use serde::{Deserialize, Serialize};
use std::sync::Mutex;

/// Terminal status of one file's processing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FileProcessedStatus {
    /// Input failed linting; no fixer ran.
    Invalid,
    /// A parse fault mid-fix, or output that failed linting.
    Lint,
    /// Any other fault during fixing.
    Exception,
    /// A fix result was produced (and written, unless dry-run).
    Fixed,
    /// Nothing changed.
    NoChanges,
}

/// Event emitted after the engine finishes handling one file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileProcessedEvent {
    pub status: FileProcessedStatus,
    pub relative_path: String,
    pub applied_fixers: Vec<String>,
}

impl FileProcessedEvent {
    pub fn new(
        status: FileProcessedStatus,
        relative_path: impl Into<String>,
        applied_fixers: Vec<String>,
    ) -> Self {
        Self { status, relative_path: relative_path.into(), applied_fixers }
    }
}

/// Receives per-file events. Implementations must tolerate dispatch from
/// the coordinator thread while workers are running.
pub trait EventSink: Send + Sync {
    fn dispatch(&self, event: &FileProcessedEvent);
}

/// Sink that records every event, for reporting and tests.
#[derive(Debug, Default)]
pub struct RecordingSink {
    events: Mutex<Vec<FileProcessedEvent>>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<FileProcessedEvent> {
        self.events.lock().expect("event sink poisoned").clone()
    }

    /// Statuses in dispatch order.
    pub fn statuses(&self) -> Vec<FileProcessedStatus> {
        self.events().iter().map(|event| event.status).collect()
    }
}

impl EventSink for RecordingSink {
    fn dispatch(&self, event: &FileProcessedEvent) {
        self.events.lock().expect("event sink poisoned").push(event.clone());
    }
}
