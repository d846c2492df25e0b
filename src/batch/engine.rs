//! Batch engine
//!
//! Entry point for propagating a persona change: find every user holding the
//! persona, split them into chunks and hand the plan to the configured driver.

use std::num::NonZeroUsize;
use std::sync::Arc;

use tracing::{error, info};

use crate::config::BatchSettings;
use crate::error::{Error, Result};
use crate::persona::Persona;
use crate::store::UserStore;

use super::driver::{driver_for, BatchDriver, DriverKind, HeadlessDriver, ProcessOutcome};
use super::plan::{BatchPlan, DEFAULT_CHUNK_SIZE};
use super::run::{BatchReport, BatchRun, FailurePolicy};
use super::tracker::RunTracker;

/// Re-saves every user holding a persona, chunk by chunk
pub struct BatchEngine {
    store: Arc<dyn UserStore>,
    driver: Arc<dyn BatchDriver>,
    chunk_size: NonZeroUsize,
    policy: FailurePolicy,
    tracker: Arc<RunTracker>,
}

impl BatchEngine {
    /// Create an engine with the default chunk size and failure policy.
    pub fn new(store: Arc<dyn UserStore>, driver: Arc<dyn BatchDriver>) -> Self {
        Self {
            store,
            driver,
            chunk_size: default_chunk_size(),
            policy: FailurePolicy::default(),
            tracker: Arc::new(RunTracker::new()),
        }
    }

    /// Engine that runs to completion in-process.
    pub fn headless(store: Arc<dyn UserStore>) -> Self {
        Self::new(store, Arc::new(HeadlessDriver))
    }

    /// Engine configured from the `[batch]` settings.
    pub fn from_settings(store: Arc<dyn UserStore>, settings: &BatchSettings) -> Result<Self> {
        let mut engine = Self::new(store, driver_for(settings.driver, &settings.finish_url))
            .with_failure_policy(settings.failure_policy);
        engine.set_chunk_size(settings.chunk_size)?;
        Ok(engine)
    }

    /// Builder form of [`set_chunk_size`](Self::set_chunk_size).
    pub fn with_chunk_size(mut self, size: usize) -> Result<Self> {
        self.set_chunk_size(size)?;
        Ok(self)
    }

    /// Set the number of users per chunk. Zero is rejected and the previous
    /// size is kept.
    pub fn set_chunk_size(&mut self, size: usize) -> Result<()> {
        self.chunk_size = NonZeroUsize::new(size).ok_or_else(|| {
            Error::config_field_invalid("batch.chunk_size", "Chunk size must be a positive integer")
        })?;
        Ok(())
    }

    pub fn chunk_size(&self) -> usize {
        self.chunk_size.get()
    }

    pub fn with_failure_policy(mut self, policy: FailurePolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn failure_policy(&self) -> FailurePolicy {
        self.policy
    }

    /// Share a run tracker with other engines.
    pub fn with_tracker(mut self, tracker: Arc<RunTracker>) -> Self {
        self.tracker = tracker;
        self
    }

    pub fn tracker(&self) -> Arc<RunTracker> {
        self.tracker.clone()
    }

    pub fn driver_kind(&self) -> DriverKind {
        self.driver.kind()
    }

    /// Query the users holding `persona` and partition them into a plan.
    pub async fn plan(&self, persona: &Persona) -> Result<BatchPlan> {
        let ids = self
            .store
            .query_user_ids_by_persona(persona.id())
            .await
            .map_err(|e| match e {
                Error::Query { .. } => e,
                other => Error::query(persona.id(), other.to_string()),
            })?;

        Ok(BatchPlan::build(persona.id(), &ids, self.chunk_size))
    }

    /// Build a run without driving it, for hosts that step runs themselves.
    pub async fn prepare(&self, persona: &Persona) -> Result<BatchRun> {
        let plan = self.plan(persona).await?;
        Ok(BatchRun::new(plan, self.store.clone()).with_failure_policy(self.policy))
    }

    /// Propagate a change of `persona` to every user holding it.
    ///
    /// Fails only when the membership query fails; save failures are
    /// collected in the returned report.
    pub async fn process(&self, persona: &Persona) -> Result<ProcessOutcome> {
        let plan = match self.plan(persona).await {
            Ok(plan) => plan,
            Err(e) => {
                error!(persona = %persona.id(), error = %e.format_for_log(), "Resync aborted");
                self.tracker.record(&BatchReport::aborted(persona.id(), &e));
                return Err(e);
            }
        };

        if plan.is_empty() {
            info!(persona = %persona.id(), "No users hold persona, nothing to resync");
            let report = BatchReport::empty(persona.id());
            self.tracker.record(&report);
            return Ok(ProcessOutcome::Completed(report));
        }

        info!(
            persona = %persona.id(),
            users = plan.total_users(),
            chunks = plan.len(),
            chunk_size = plan.chunk_size(),
            driver = %self.driver.kind(),
            "Starting persona resync"
        );

        let run = BatchRun::new(plan, self.store.clone()).with_failure_policy(self.policy);
        let outcome = self.driver.drive(run).await;
        self.tracker.record(outcome.report());

        Ok(outcome)
    }
}

fn default_chunk_size() -> NonZeroUsize {
    NonZeroUsize::new(DEFAULT_CHUNK_SIZE).unwrap_or(NonZeroUsize::MIN)
}

// ─────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────
