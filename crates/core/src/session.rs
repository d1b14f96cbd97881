// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Session state
//!
//! The session is the single source of truth for a test run: job
//! definitions and their states, resource records, every known unit and
//! the run metadata. The [`SessionStateController`] reads and mutates it
//! only through the operations below.
//!
//! The flow is:
//! 1. The caller selects jobs with [`SessionState::update_desired_job_list`],
//!    which links `before` back-edges, solves the run list and recomputes
//!    readiness
//! 2. A scheduler picks a job from [`SessionState::ready_jobs`] and runs it
//! 3. The result goes through [`SessionState::observe_result`]; resource
//!    jobs replace their records and may generate new jobs
//! 4. Readiness is recomputed and the loop continues

use crate::clock::{Clock, SystemClock};
use crate::controller::SessionStateController;
use crate::depmgr::{DependencyProblem, DependencySolver};
use crate::inhibitor::{InhibitionCause, JobReadinessInhibitor};
use crate::job::JobDefinition;
use crate::resource::{Resource, ResourceMap};
use crate::result::{JobResult, Outcome};
use crate::unit::{Inserted, Unit, UnitRegistry};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

/// Keep generated jobs that fail validation as placeholders.
pub const FLAG_STRICT_TEMPLATE_EXPANSION: &str = "strict_template_expansion";
/// The session has jobs left to run.
pub const FLAG_INCOMPLETE: &str = "incomplete";
/// Results were submitted.
pub const FLAG_SUBMITTED: &str = "submitted";
/// Only resource and bootstrap jobs are being run.
pub const FLAG_BOOTSTRAPPING: &str = "bootstrapping";

/// Session metadata
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionMetadata {
    pub title: Option<String>,
    #[serde(default)]
    pub flags: BTreeSet<String>,
    /// Job currently being run, if any
    pub running_job_name: Option<String>,
}

impl SessionMetadata {
    pub fn has_flag(&self, flag: &str) -> bool {
        self.flags.contains(flag)
    }

    pub fn set_flag(&mut self, flag: impl Into<String>) {
        self.flags.insert(flag.into());
    }

    pub fn clear_flag(&mut self, flag: &str) {
        self.flags.remove(flag);
    }
}

/// State of a single job
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct JobState {
    job_id: String,
    result: JobResult,
    inhibitors: Vec<JobReadinessInhibitor>,
    /// Resource job that generated this job
    via: Option<String>,
    /// Non-empty only for placeholders of invalid generated jobs
    validation_errors: Vec<String>,
    attempts: u32,
    last_result_at: Option<DateTime<Utc>>,
}

impl JobState {
    fn new(job_id: &str) -> Self {
        Self {
            job_id: job_id.to_string(),
            result: JobResult::default(),
            inhibitors: vec![JobReadinessInhibitor::undesired()],
            via: None,
            validation_errors: Vec::new(),
            attempts: 0,
            last_result_at: None,
        }
    }

    pub fn job_id(&self) -> &str {
        &self.job_id
    }

    pub fn result(&self) -> &JobResult {
        &self.result
    }

    pub fn outcome(&self) -> Outcome {
        self.result.outcome
    }

    pub fn inhibitors(&self) -> &[JobReadinessInhibitor] {
        &self.inhibitors
    }

    /// Ready to run: nothing inhibits it.
    pub fn is_ready(&self) -> bool {
        self.inhibitors.is_empty()
    }

    /// Part of the run list.
    pub fn is_desired(&self) -> bool {
        !self
            .inhibitors
            .iter()
            .any(|i| i.cause == InhibitionCause::Undesired)
    }

    pub fn via(&self) -> Option<&str> {
        self.via.as_deref()
    }

    pub fn validation_errors(&self) -> &[String] {
        &self.validation_errors
    }

    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    pub fn last_result_at(&self) -> Option<DateTime<Utc>> {
        self.last_result_at
    }
}

/// Notifications for external bookkeeping, drained with
/// [`SessionState::take_events`].
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum SessionEvent {
    JobResultChanged {
        job_id: String,
        outcome: Outcome,
        at: DateTime<Utc>,
    },
    UnitAdded {
        id: String,
        kind: &'static str,
        via: Option<String>,
    },
    ResourcesReplaced {
        resource_id: String,
        records: usize,
    },
    ReadinessRecomputed {
        ready: usize,
    },
}

/// The mutable state of one test run
#[derive(Debug)]
pub struct SessionState {
    controller: Arc<SessionStateController>,
    clock: Arc<dyn Clock>,
    jobs: BTreeMap<String, JobDefinition>,
    job_states: BTreeMap<String, JobState>,
    resource_map: ResourceMap,
    units: UnitRegistry,
    metadata: SessionMetadata,
    desired: Vec<String>,
    run_list: Vec<String>,
    problems: Vec<DependencyProblem>,
    events: Vec<SessionEvent>,
}

impl SessionState {
    pub fn new(controller: Arc<SessionStateController>) -> Self {
        Self::with_clock(controller, Arc::new(SystemClock))
    }

    pub fn with_clock(controller: Arc<SessionStateController>, clock: Arc<dyn Clock>) -> Self {
        Self {
            controller,
            clock,
            jobs: BTreeMap::new(),
            job_states: BTreeMap::new(),
            resource_map: ResourceMap::new(),
            units: UnitRegistry::new(),
            metadata: SessionMetadata::default(),
            desired: Vec::new(),
            run_list: Vec::new(),
            problems: Vec::new(),
            events: Vec::new(),
        }
    }

    /// A session over an initial set of units.
    pub fn with_units(
        controller: Arc<SessionStateController>,
        units: impl IntoIterator<Item = Unit>,
    ) -> Self {
        let mut session = Self::new(controller);
        for unit in units {
            session.add_unit(unit, None, false);
        }
        session.recompute_job_readiness();
        session
    }

    pub fn controller(&self) -> &Arc<SessionStateController> {
        &self.controller
    }

    // ------------------------------------------------------------------------
    // Jobs and units
    // ------------------------------------------------------------------------

    pub fn job(&self, id: &str) -> Option<&JobDefinition> {
        self.jobs.get(id)
    }

    pub fn jobs(&self) -> &BTreeMap<String, JobDefinition> {
        &self.jobs
    }

    pub fn job_state(&self, id: &str) -> Option<&JobState> {
        self.job_states.get(id)
    }

    pub fn job_states(&self) -> &BTreeMap<String, JobState> {
        &self.job_states
    }

    /// Current outcome of a job, `None` when the job is unknown.
    pub fn outcome_of(&self, id: &str) -> Option<Outcome> {
        self.job_states.get(id).map(JobState::outcome)
    }

    pub fn units(&self) -> &UnitRegistry {
        &self.units
    }

    /// Register a unit; jobs and placeholders also get a job state.
    ///
    /// Returns whether the unit was new. A unit identical to a registered
    /// one is a no-op; a different unit with a registered id is logged and
    /// skipped.
    pub fn add_unit(&mut self, unit: Unit, via: Option<&str>, recompute: bool) -> bool {
        match self.units.insert(unit.clone(), via) {
            Ok(Inserted::Added) => {}
            Ok(Inserted::AlreadyPresent) => {
                tracing::debug!(id = %unit.id(), "unit already present");
                return false;
            }
            Err(e) => {
                tracing::warn!(error = %e, via = ?via, "skipping unit");
                return false;
            }
        }

        let validation_errors = match &unit {
            Unit::Invalid(invalid) => invalid.errors().to_vec(),
            _ => Vec::new(),
        };
        if let Some(job) = unit.job() {
            let mut state = JobState::new(job.id());
            state.via = via.map(str::to_string);
            state.validation_errors = validation_errors;
            self.job_states.insert(job.id().to_string(), state);
            self.jobs.insert(job.id().to_string(), job.clone());
        }
        self.events.push(SessionEvent::UnitAdded {
            id: unit.id().to_string(),
            kind: unit.kind(),
            via: via.map(str::to_string),
        });

        if recompute {
            self.recompute_job_readiness();
        }
        true
    }

    // ------------------------------------------------------------------------
    // Resources
    // ------------------------------------------------------------------------

    pub fn resource_map(&self) -> &ResourceMap {
        &self.resource_map
    }

    /// Replace every record of a resource id.
    pub fn set_resource_list(&mut self, resource_id: &str, records: Vec<Resource>) {
        self.events.push(SessionEvent::ResourcesReplaced {
            resource_id: resource_id.to_string(),
            records: records.len(),
        });
        self.resource_map.insert(resource_id.to_string(), records);
    }

    // ------------------------------------------------------------------------
    // Metadata
    // ------------------------------------------------------------------------

    pub fn metadata(&self) -> &SessionMetadata {
        &self.metadata
    }

    pub fn metadata_mut(&mut self) -> &mut SessionMetadata {
        &mut self.metadata
    }

    // ------------------------------------------------------------------------
    // Selection
    // ------------------------------------------------------------------------

    /// Select the jobs to run.
    ///
    /// Rebuilds every `before` back-edge from the selection, orders the
    /// selection and its dependencies into the run list and recomputes
    /// readiness. Returns the problems found while ordering.
    pub fn update_desired_job_list(&mut self, desired: Vec<String>) -> &[DependencyProblem] {
        for job in self.jobs.values_mut() {
            job.clear_before_references();
        }

        let global = self.jobs.clone();
        let mut active: BTreeMap<String, JobDefinition> = desired
            .iter()
            .filter_map(|id| global.get(id).map(|job| (id.clone(), job.clone())))
            .collect();
        for id in &desired {
            if let Some(job) = global.get(id) {
                self.controller.link_before_edges(job, &mut active, &global);
            }
        }
        self.jobs.extend(active);

        let resolution = DependencySolver::resolve(&self.jobs, &desired, &self.controller);
        for problem in &resolution.problems {
            tracing::warn!(%problem, "dependency problem");
        }
        self.run_list = resolution.run_list;
        self.problems = resolution.problems;
        self.desired = desired;
        self.recompute_job_readiness();
        &self.problems
    }

    pub fn desired(&self) -> &[String] {
        &self.desired
    }

    /// Ordered ids of the jobs that will run.
    pub fn run_list(&self) -> &[String] {
        &self.run_list
    }

    pub fn problems(&self) -> &[DependencyProblem] {
        &self.problems
    }

    /// Run-list jobs with no inhibitors, in run-list order.
    pub fn ready_jobs(&self) -> Vec<&str> {
        self.run_list
            .iter()
            .filter(|id| self.job_states.get(*id).is_some_and(JobState::is_ready))
            .map(String::as_str)
            .collect()
    }

    // ------------------------------------------------------------------------
    // Results
    // ------------------------------------------------------------------------

    /// Record a result through the controller.
    pub fn observe_result(&mut self, job_id: &str, result: JobResult) {
        self.observe_result_with(job_id, result, false);
    }

    /// Record a result, optionally expanding templates against fake
    /// resources.
    pub fn observe_result_with(&mut self, job_id: &str, result: JobResult, fake_resources: bool) {
        let Some(job) = self.jobs.get(job_id).cloned() else {
            tracing::warn!(job = %job_id, "ignoring result for an unknown job");
            return;
        };
        let controller = Arc::clone(&self.controller);
        controller.observe_result(self, &job, result, fake_resources);
    }

    /// Overwrite a job's result.
    pub fn set_result(&mut self, job_id: &str, result: JobResult) {
        if let Some(state) = self.job_states.get_mut(job_id) {
            state.result = result;
        }
    }

    /// Job states changed; dependents may have become ready.
    pub fn on_job_state_map_changed(&mut self) {
        self.recompute_job_readiness();
    }

    /// A job received a result.
    pub fn on_job_result_changed(&mut self, job_id: &str, outcome: Outcome) {
        let at = self.clock.now();
        if let Some(state) = self.job_states.get_mut(job_id) {
            state.attempts += 1;
            state.last_result_at = Some(at);
        }
        self.events.push(SessionEvent::JobResultChanged {
            job_id: job_id.to_string(),
            outcome,
            at,
        });
    }

    /// Recompute every job's inhibitors.
    ///
    /// Jobs outside the run list are undesired; run-list jobs get the
    /// controller's inhibitors.
    pub fn recompute_job_readiness(&mut self) {
        for state in self.job_states.values_mut() {
            state.inhibitors = vec![JobReadinessInhibitor::undesired()];
        }
        for id in &self.run_list {
            if let Some(state) = self.job_states.get_mut(id) {
                state.inhibitors.clear();
            }
        }

        let controller = Arc::clone(&self.controller);
        for id in self.run_list.clone() {
            let Some(job) = self.jobs.get(&id) else {
                continue;
            };
            let inhibitors = controller.inhibitors(self, job);
            if let Some(state) = self.job_states.get_mut(&id) {
                state.inhibitors = inhibitors;
            }
        }

        let ready = self.ready_jobs().len();
        tracing::trace!(ready, "readiness recomputed");
        self.events.push(SessionEvent::ReadinessRecomputed { ready });
    }

    /// Drain pending events.
    pub fn take_events(&mut self) -> Vec<SessionEvent> {
        std::mem::take(&mut self.events)
    }
}

#[cfg(test)]
#[path = "session_tests.rs"]
mod tests;
