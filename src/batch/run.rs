//! Batch run execution
//!
//! `BatchRun` is the progress-tracked stepper: each call to [`BatchRun::step`]
//! executes exactly one chunk operation. Drivers decide whether to yield
//! between steps or run straight through.

use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::error::Error;
use crate::persona::PersonaId;
use crate::store::{UserId, UserStore};

use super::context::{BatchContext, ChunkFailure, Progress, RunState};
use super::plan::{BatchPlan, ChunkOperation};

// ─────────────────────────────────────────────────────────────────
// Failure Policy
// ─────────────────────────────────────────────────────────────────

/// What a run does after a chunk operation fails
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailurePolicy {
    /// Keep going and report every failure at the end
    #[default]
    Continue,
    /// Stop after the first failed chunk
    Halt,
}

impl std::str::FromStr for FailurePolicy {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "continue" => Ok(FailurePolicy::Continue),
            "halt" => Ok(FailurePolicy::Halt),
            _ => Err(format!("Unknown failure policy '{}'. Valid: continue, halt", s)),
        }
    }
}

// ─────────────────────────────────────────────────────────────────
// Chunk Operation
// ─────────────────────────────────────────────────────────────────

struct ChunkResult {
    saved: usize,
    missing: usize,
    failure: Option<(Option<UserId>, Error)>,
}

/// Load the chunk's users and re-save each one, in plan order.
///
/// Ids that no longer resolve are counted as missing. The first save error
/// ends the operation.
async fn process_chunk(store: &dyn UserStore, op: &ChunkOperation) -> ChunkResult {
    let users = match store.load_users(&op.user_ids).await {
        Ok(users) => users,
        Err(e) => {
            return ChunkResult {
                saved: 0,
                missing: 0,
                failure: Some((None, e)),
            }
        }
    };

    let missing = op.user_ids.iter().filter(|id| !users.contains_key(id)).count();
    let mut saved = 0;

    for uid in &op.user_ids {
        let Some(user) = users.get(uid) else {
            continue;
        };
        if let Err(e) = store.save_user(user).await {
            return ChunkResult {
                saved,
                missing,
                failure: Some((Some(*uid), e)),
            };
        }
        saved += 1;
    }

    ChunkResult {
        saved,
        missing,
        failure: None,
    }
}

// ─────────────────────────────────────────────────────────────────
// Batch Run
// ─────────────────────────────────────────────────────────────────

/// Result of a single step
#[derive(Debug, Clone, PartialEq)]
pub enum StepOutcome {
    /// More chunks remain
    Continue(Progress),
    /// The run reached a terminal state
    Finished(Progress),
}

impl StepOutcome {
    pub fn progress(&self) -> &Progress {
        match self {
            StepOutcome::Continue(p) | StepOutcome::Finished(p) => p,
        }
    }

    pub fn is_finished(&self) -> bool {
        matches!(self, StepOutcome::Finished(_))
    }
}

/// One execution of a batch plan against a user store
pub struct BatchRun {
    id: Uuid,
    plan: BatchPlan,
    context: BatchContext,
    store: Arc<dyn UserStore>,
    policy: FailurePolicy,
    next: usize,
}

impl BatchRun {
    pub fn new(plan: BatchPlan, store: Arc<dyn UserStore>) -> Self {
        let context = BatchContext::new(plan.total_users(), plan.len());
        Self {
            id: Uuid::new_v4(),
            plan,
            context,
            store,
            policy: FailurePolicy::default(),
            next: 0,
        }
    }

    pub fn with_failure_policy(mut self, policy: FailurePolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn plan(&self) -> &BatchPlan {
        &self.plan
    }

    pub fn context(&self) -> &BatchContext {
        &self.context
    }

    /// Mutable access for driver scratch data.
    pub fn context_mut(&mut self) -> &mut BatchContext {
        &mut self.context
    }

    pub fn state(&self) -> RunState {
        self.context.state
    }

    pub fn is_finished(&self) -> bool {
        self.context.state.is_terminal()
    }

    /// Execute the next chunk operation.
    pub async fn step(&mut self) -> StepOutcome {
        if self.is_finished() {
            return StepOutcome::Finished(self.context.progress());
        }

        let Some(op) = self.plan.operation(self.next).cloned() else {
            self.context.mark_completed();
            return StepOutcome::Finished(self.context.progress());
        };

        self.context.mark_running(op.index);
        debug!(
            run_id = %self.id,
            chunk = op.index + 1,
            of = self.plan.len(),
            size = op.len(),
            "Processing chunk"
        );

        let result = process_chunk(self.store.as_ref(), &op).await;
        self.context.record_chunk(op.len(), result.saved, result.missing);
        self.next += 1;

        if let Some((user_id, error)) = result.failure {
            warn!(
                run_id = %self.id,
                chunk = op.index + 1,
                uid = ?user_id,
                error = %error.format_for_log(),
                "Chunk operation failed"
            );
            self.context.record_failure(ChunkFailure::new(op.index, user_id, &error));

            if self.policy == FailurePolicy::Halt {
                self.context.mark_halted();
                return StepOutcome::Finished(self.context.progress());
            }
        }

        if self.next >= self.plan.len() {
            self.context.mark_completed();
            return StepOutcome::Finished(self.context.progress());
        }

        StepOutcome::Continue(self.context.progress())
    }

    /// Run every remaining chunk without yielding.
    pub async fn run_to_completion(mut self) -> BatchReport {
        while !self.step().await.is_finished() {}
        self.finish()
    }

    /// Consume the run into its report.
    pub fn finish(self) -> BatchReport {
        let report = BatchReport {
            run_id: self.id,
            persona_id: self.plan.persona_id().to_string(),
            state: self.context.state,
            total_users: self.context.total,
            chunks: self.context.chunks,
            chunks_done: self.context.chunks_done,
            saved: self.context.saved,
            missing: self.context.missing,
            elapsed_ms: self.context.elapsed_ms(),
            started_at: self.context.started_at,
            finished_at: self.context.finished_at,
            failures: self.context.failures,
        };

        info!(
            run_id = %report.run_id,
            persona = %report.persona_id,
            state = %report.state,
            saved = report.saved,
            missing = report.missing,
            failures = report.failures.len(),
            elapsed_ms = report.elapsed_ms,
            "Batch run finished"
        );
        report
    }
}

// ─────────────────────────────────────────────────────────────────
// Batch Report
// ─────────────────────────────────────────────────────────────────

/// Aggregate outcome of a run
#[derive(Debug, Clone, Serialize)]
pub struct BatchReport {
    pub run_id: Uuid,
    pub persona_id: PersonaId,
    pub state: RunState,
    pub total_users: usize,
    pub chunks: usize,
    pub chunks_done: usize,
    pub saved: usize,
    pub missing: usize,
    pub failures: Vec<ChunkFailure>,
    pub started_at: Option<DateTime<Utc>>,
    pub finished_at: Option<DateTime<Utc>>,
    pub elapsed_ms: u64,
}

impl BatchReport {
    /// Report of a run with nothing to do.
    pub fn empty(persona_id: impl Into<PersonaId>) -> Self {
        let now = Utc::now();
        Self {
            run_id: Uuid::new_v4(),
            persona_id: persona_id.into(),
            state: RunState::Completed,
            total_users: 0,
            chunks: 0,
            chunks_done: 0,
            saved: 0,
            missing: 0,
            failures: Vec::new(),
            started_at: Some(now),
            finished_at: Some(now),
            elapsed_ms: 0,
        }
    }

    /// Report of a run whose membership query failed.
    pub fn aborted(persona_id: impl Into<PersonaId>, error: &Error) -> Self {
        let mut report = Self::empty(persona_id);
        report.state = RunState::Aborted;
        report.failures.push(ChunkFailure {
            chunk: 0,
            user_id: None,
            code: error.code().as_str(),
            message: error.to_string(),
        });
        report
    }

    /// Completed with no failures.
    pub fn is_success(&self) -> bool {
        self.state == RunState::Completed && self.failures.is_empty()
    }

    /// Zero-based indices of chunks that failed.
    pub fn failed_chunks(&self) -> Vec<usize> {
        let mut chunks: Vec<usize> = self.failures.iter().map(|f| f.chunk).collect();
        chunks.dedup();
        chunks
    }

    /// One-line summary for logs and status messages.
    pub fn summary(&self) -> String {
        format!(
            "Persona '{}' {}: {} saved, {} missing, {} failed chunk(s) of {}",
            self.persona_id,
            self.state,
            self.saved,
            self.missing,
            self.failed_chunks().len(),
            self.chunks
        )
    }
}

impl fmt::Display for BatchReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Resync of persona '{}' {}", self.persona_id, self.state)?;
        writeln!(f, "  Run:      {}", self.run_id)?;
        writeln!(f, "  Users:    {}", self.total_users)?;
        writeln!(f, "  Chunks:   {}/{}", self.chunks_done, self.chunks)?;
        writeln!(f, "  Saved:    {}", self.saved)?;
        writeln!(f, "  Missing:  {}", self.missing)?;
        writeln!(f, "  Duration: {}ms", self.elapsed_ms)?;
        if !self.failures.is_empty() {
            writeln!(f, "  Failures:")?;
            for failure in &self.failures {
                match failure.user_id {
                    Some(uid) => writeln!(
                        f,
                        "    chunk {} user {}: [{}] {}",
                        failure.chunk + 1,
                        uid,
                        failure.code,
                        failure.message
                    )?,
                    None => writeln!(
                        f,
                        "    chunk {}: [{}] {}",
                        failure.chunk + 1,
                        failure.code,
                        failure.message
                    )?,
                }
            }
        }
        Ok(())
    }
}

// ─────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────
