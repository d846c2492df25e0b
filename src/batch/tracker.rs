//! Run history tracking
//!
//! Keeps summaries of recently finished runs so a host can show the outcome
//! of the last resync of each persona.

use std::collections::{HashMap, VecDeque};

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::Serialize;
use uuid::Uuid;

use crate::persona::PersonaId;

use super::context::RunState;
use super::run::BatchReport;

/// Summary of a finished run
#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    pub run_id: Uuid,
    pub persona_id: PersonaId,
    pub state: RunState,
    pub saved: usize,
    pub failures: usize,
    pub recorded_at: DateTime<Utc>,
}

impl From<&BatchReport> for RunSummary {
    fn from(report: &BatchReport) -> Self {
        Self {
            run_id: report.run_id,
            persona_id: report.persona_id.clone(),
            state: report.state,
            saved: report.saved,
            failures: report.failures.len(),
            recorded_at: Utc::now(),
        }
    }
}

/// Summaries kept by default before the oldest are dropped
pub const DEFAULT_RUN_RETENTION: usize = 100;

#[derive(Default)]
struct History {
    runs: HashMap<Uuid, RunSummary>,

    /// Run ids, oldest first
    order: VecDeque<Uuid>,
}

impl History {
    fn truncate(&mut self, keep_count: usize) {
        while self.order.len() > keep_count {
            if let Some(id) = self.order.pop_front() {
                self.runs.remove(&id);
            }
        }
    }
}

/// Tracks recently finished runs
pub struct RunTracker {
    history: RwLock<History>,

    /// Summaries kept before the oldest are dropped
    retention: usize,

    /// Completed run count (since startup)
    completed_count: RwLock<u64>,

    /// Aborted or halted run count (since startup)
    unfinished_count: RwLock<u64>,

    /// Failed chunk operations across all runs
    failure_count: RwLock<u64>,
}

impl RunTracker {
    pub fn new() -> Self {
        Self::with_retention(DEFAULT_RUN_RETENTION)
    }

    /// Tracker keeping at most `retention` summaries (at least one).
    pub fn with_retention(retention: usize) -> Self {
        Self {
            history: RwLock::new(History::default()),
            retention: retention.max(1),
            completed_count: RwLock::new(0),
            unfinished_count: RwLock::new(0),
            failure_count: RwLock::new(0),
        }
    }

    pub fn retention(&self) -> usize {
        self.retention
    }

    /// Record a finished run, dropping the oldest summaries past the retention.
    pub fn record(&self, report: &BatchReport) {
        let summary = RunSummary::from(report);

        match summary.state {
            RunState::Completed => *self.completed_count.write() += 1,
            RunState::Halted | RunState::Aborted => *self.unfinished_count.write() += 1,
            RunState::Planned | RunState::Running { .. } => {}
        }
        *self.failure_count.write() += summary.failures as u64;

        let mut history = self.history.write();
        if history.runs.insert(summary.run_id, summary.clone()).is_none() {
            history.order.push_back(summary.run_id);
        }
        history.truncate(self.retention);
    }

    pub fn get(&self, run_id: &Uuid) -> Option<RunSummary> {
        self.history.read().runs.get(run_id).cloned()
    }

    /// Most recent run recorded for `persona_id`.
    pub fn last_for(&self, persona_id: &str) -> Option<RunSummary> {
        let history = self.history.read();
        history
            .order
            .iter()
            .rev()
            .filter_map(|id| history.runs.get(id))
            .find(|r| r.persona_id == persona_id)
            .cloned()
    }

    pub fn len(&self) -> usize {
        self.history.read().runs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.history.read().runs.is_empty()
    }

    pub fn total_completed(&self) -> u64 {
        *self.completed_count.read()
    }

    pub fn total_unfinished(&self) -> u64 {
        *self.unfinished_count.read()
    }

    pub fn total_failures(&self) -> u64 {
        *self.failure_count.read()
    }

    /// Drop the oldest summaries, keeping the last `keep_count`.
    pub fn cleanup_old_runs(&self, keep_count: usize) {
        self.history.write().truncate(keep_count);
    }
}

impl Default for RunTracker {
    fn default() -> Self {
        Self::new()
    }
}

// ─────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────
