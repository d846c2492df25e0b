//! Batch drivers
//!
//! A driver takes a prepared [`BatchRun`] and executes it. The strategy is
//! chosen by whoever constructs the engine:
//! - `HeadlessDriver` runs every chunk inside the call, for command-line runners
//! - `InteractiveDriver` yields between chunks, publishes progress events and
//!   ends with a redirect to the listing view

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tracing::debug;
use uuid::Uuid;

use crate::persona::PersonaId;

use super::context::{ChunkFailure, Progress, RunState};
use super::run::{BatchReport, BatchRun};

/// Listing view that interactive runs return to.
pub const DEFAULT_FINISH_URL: &str = "/admin/people/personas";

// ─────────────────────────────────────────────────────────────────
// Outcome & Events
// ─────────────────────────────────────────────────────────────────

/// What `process` hands back to the caller
#[derive(Debug, Clone)]
pub enum ProcessOutcome {
    /// Run finished in-process (headless, or nothing to do)
    Completed(BatchReport),
    /// Interactive run finished; the caller should navigate to `location`
    Redirect { location: String, report: BatchReport },
}

impl ProcessOutcome {
    pub fn report(&self) -> &BatchReport {
        match self {
            ProcessOutcome::Completed(report) | ProcessOutcome::Redirect { report, .. } => report,
        }
    }

    pub fn into_report(self) -> BatchReport {
        match self {
            ProcessOutcome::Completed(report) | ProcessOutcome::Redirect { report, .. } => report,
        }
    }

    pub fn redirect_location(&self) -> Option<&str> {
        match self {
            ProcessOutcome::Redirect { location, .. } => Some(location),
            ProcessOutcome::Completed(_) => None,
        }
    }
}

/// Progress notifications published by the interactive driver
#[derive(Debug, Clone)]
pub enum BatchEvent {
    Started {
        run_id: Uuid,
        persona_id: PersonaId,
        chunks: usize,
        total_users: usize,
    },
    Progress {
        run_id: Uuid,
        progress: Progress,
    },
    ChunkFailed {
        run_id: Uuid,
        failure: ChunkFailure,
    },
    Finished {
        run_id: Uuid,
        state: RunState,
    },
}

// ─────────────────────────────────────────────────────────────────
// Driver Trait
// ─────────────────────────────────────────────────────────────────

/// Driver selection, as written in configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DriverKind {
    #[default]
    Headless,
    Interactive,
}

impl fmt::Display for DriverKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DriverKind::Headless => write!(f, "headless"),
            DriverKind::Interactive => write!(f, "interactive"),
        }
    }
}

impl FromStr for DriverKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "headless" | "backend" => Ok(DriverKind::Headless),
            "interactive" => Ok(DriverKind::Interactive),
            _ => Err(format!("Unknown driver '{}'. Valid: headless, interactive", s)),
        }
    }
}

/// Executes a batch run
#[async_trait]
pub trait BatchDriver: Send + Sync {
    fn kind(&self) -> DriverKind;

    /// Drive `run` until it reaches a terminal state.
    async fn drive(&self, run: BatchRun) -> ProcessOutcome;
}

/// Build the driver named by `kind`.
pub fn driver_for(kind: DriverKind, finish_url: &str) -> Arc<dyn BatchDriver> {
    match kind {
        DriverKind::Headless => Arc::new(HeadlessDriver),
        DriverKind::Interactive => Arc::new(InteractiveDriver::new(finish_url)),
    }
}

// ─────────────────────────────────────────────────────────────────
// Headless
// ─────────────────────────────────────────────────────────────────

/// Runs every chunk synchronously within the call, no redirect
#[derive(Debug, Clone, Copy, Default)]
pub struct HeadlessDriver;

#[async_trait]
impl BatchDriver for HeadlessDriver {
    fn kind(&self) -> DriverKind {
        DriverKind::Headless
    }

    async fn drive(&self, run: BatchRun) -> ProcessOutcome {
        ProcessOutcome::Completed(run.run_to_completion().await)
    }
}

// ─────────────────────────────────────────────────────────────────
// Interactive
// ─────────────────────────────────────────────────────────────────

/// Steps chunk by chunk, yielding to the runtime in between
pub struct InteractiveDriver {
    finish_url: String,
    events: Option<mpsc::Sender<BatchEvent>>,
}

impl InteractiveDriver {
    pub fn new(finish_url: impl Into<String>) -> Self {
        Self {
            finish_url: finish_url.into(),
            events: None,
        }
    }

    /// Publish progress on `events`.
    pub fn with_events(mut self, events: mpsc::Sender<BatchEvent>) -> Self {
        self.events = Some(events);
        self
    }

    pub fn finish_url(&self) -> &str {
        &self.finish_url
    }

    async fn emit(&self, event: BatchEvent) {
        if let Some(ref tx) = self.events {
            if tx.send(event).await.is_err() {
                debug!("Batch event receiver dropped");
            }
        }
    }
}

impl Default for InteractiveDriver {
    fn default() -> Self {
        Self::new(DEFAULT_FINISH_URL)
    }
}

#[async_trait]
impl BatchDriver for InteractiveDriver {
    fn kind(&self) -> DriverKind {
        DriverKind::Interactive
    }

    async fn drive(&self, mut run: BatchRun) -> ProcessOutcome {
        let run_id = run.id();
        self.emit(BatchEvent::Started {
            run_id,
            persona_id: run.plan().persona_id().to_string(),
            chunks: run.plan().len(),
            total_users: run.plan().total_users(),
        })
        .await;

        loop {
            let failures_before = run.context().failures.len();
            let outcome = run.step().await;

            let new_failures: Vec<ChunkFailure> =
                run.context().failures[failures_before..].to_vec();
            for failure in new_failures {
                self.emit(BatchEvent::ChunkFailed { run_id, failure }).await;
            }
            self.emit(BatchEvent::Progress {
                run_id,
                progress: outcome.progress().clone(),
            })
            .await;

            if outcome.is_finished() {
                break;
            }
            tokio::task::yield_now().await;
        }

        let report = run.finish();
        self.emit(BatchEvent::Finished {
            run_id,
            state: report.state,
        })
        .await;

        ProcessOutcome::Redirect {
            location: self.finish_url.clone(),
            report,
        }
    }
}

// ─────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────
