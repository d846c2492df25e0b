//! Batch run state tracking
//!
//! Progress state threaded through one run. It is owned by the run that
//! drives it and never shared between runs.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::error::Error;
use crate::store::UserId;

// ─────────────────────────────────────────────────────────────────
// Run State
// ─────────────────────────────────────────────────────────────────

/// Lifecycle of a batch run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum RunState {
    /// Plan built, no chunk started
    Planned,
    /// Executing chunk `chunk` (1-based) of `of`
    Running { chunk: usize, of: usize },
    /// Every chunk was attempted
    Completed,
    /// Stopped after a failed chunk under the halt policy
    Halted,
    /// The membership query failed before any chunk ran
    Aborted,
}

impl RunState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, RunState::Completed | RunState::Halted | RunState::Aborted)
    }
}

impl Default for RunState {
    fn default() -> Self {
        RunState::Planned
    }
}

impl std::fmt::Display for RunState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RunState::Planned => write!(f, "planned"),
            RunState::Running { chunk, of } => write!(f, "running ({}/{})", chunk, of),
            RunState::Completed => write!(f, "completed"),
            RunState::Halted => write!(f, "halted"),
            RunState::Aborted => write!(f, "aborted"),
        }
    }
}

// ─────────────────────────────────────────────────────────────────
// Failures & Progress
// ─────────────────────────────────────────────────────────────────

/// A chunk operation that did not finish.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChunkFailure {
    /// Zero-based chunk index
    pub chunk: usize,

    /// User whose save failed; `None` when the chunk's load failed
    pub user_id: Option<UserId>,

    /// Error code (e.g. "E400")
    pub code: String,

    pub message: String,
}

impl ChunkFailure {
    pub fn new(chunk: usize, user_id: Option<UserId>, error: &Error) -> Self {
        Self {
            chunk,
            user_id,
            code: error.code().as_str(),
            message: error.to_string(),
        }
    }
}

/// Snapshot of a run's progress for display.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Progress {
    pub processed: usize,
    pub total: usize,
    pub chunks_done: usize,
    pub chunks: usize,
    pub percentage: f32,
    pub message: String,
}

// ─────────────────────────────────────────────────────────────────
// Batch Context
// ─────────────────────────────────────────────────────────────────

/// Mutable progress state of one run
#[derive(Debug, Clone, Default)]
pub struct BatchContext {
    pub state: RunState,

    /// Users in the plan
    pub total: usize,

    /// Ids handled so far, whether saved, missing or failed
    pub processed: usize,

    /// Users re-saved successfully
    pub saved: usize,

    /// Ids that no longer resolved when their chunk loaded
    pub missing: usize,

    /// Chunks attempted so far
    pub chunks_done: usize,

    pub chunks: usize,

    pub failures: Vec<ChunkFailure>,

    /// Free-form scratch space for drivers
    pub sandbox: HashMap<String, serde_json::Value>,

    pub started_at: Option<DateTime<Utc>>,

    pub finished_at: Option<DateTime<Utc>>,
}

impl BatchContext {
    pub fn new(total: usize, chunks: usize) -> Self {
        Self {
            total,
            chunks,
            ..Default::default()
        }
    }

    /// Mark the start of the chunk at zero-based `index`.
    pub fn mark_running(&mut self, index: usize) {
        if self.started_at.is_none() {
            self.started_at = Some(Utc::now());
        }
        self.state = RunState::Running {
            chunk: index + 1,
            of: self.chunks,
        };
    }

    /// Record the result of a chunk of `size` ids.
    pub fn record_chunk(&mut self, size: usize, saved: usize, missing: usize) {
        self.processed += size;
        self.saved += saved;
        self.missing += missing;
        self.chunks_done += 1;
    }

    /// One-based chunk currently executing, if any.
    pub fn current_chunk(&self) -> Option<usize> {
        match self.state {
            RunState::Running { chunk, .. } => Some(chunk),
            _ => None,
        }
    }

    pub fn record_failure(&mut self, failure: ChunkFailure) {
        self.failures.push(failure);
    }

    pub fn mark_completed(&mut self) {
        self.finish(RunState::Completed);
    }

    pub fn mark_halted(&mut self) {
        self.finish(RunState::Halted);
    }

    fn finish(&mut self, state: RunState) {
        let now = Utc::now();
        self.started_at.get_or_insert(now);
        self.finished_at = Some(now);
        self.state = state;
    }

    /// Wall-clock duration in milliseconds, up to now if still running.
    pub fn elapsed_ms(&self) -> u64 {
        match (self.started_at, self.finished_at) {
            (Some(start), Some(end)) => (end - start).num_milliseconds().max(0) as u64,
            (Some(start), None) => (Utc::now() - start).num_milliseconds().max(0) as u64,
            _ => 0,
        }
    }

    pub fn progress(&self) -> Progress {
        let percentage = if self.total == 0 {
            100.0
        } else {
            (self.processed as f32 / self.total as f32) * 100.0
        };

        Progress {
            processed: self.processed,
            total: self.total,
            chunks_done: self.chunks_done,
            chunks: self.chunks,
            percentage,
            message: format!(
                "Processed {} of {} users ({} of {} chunks)",
                self.processed, self.total, self.chunks_done, self.chunks
            ),
        }
    }
}

// ─────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────
