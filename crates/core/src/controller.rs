// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Session state controller.
//!
//! The controller computes each job's typed dependency set, links `before`
//! declarations into back-edges, decides why a job is not ready and turns
//! resource job output into records and generated jobs. It holds only
//! configuration; all state lives in the [`SessionState`] it is given.

use crate::inhibitor::JobReadinessInhibitor;
use crate::job::JobDefinition;
use crate::resource::expression::EvaluationError;
use crate::resource::{is_empty_sentinel, rfc822, Resource};
use crate::result::{JobResult, Outcome};
use crate::session::{SessionState, FLAG_STRICT_TEMPLATE_EXPANSION};
use crate::unit::template::Candidate;
use crate::unit::validation::{self, Finding, Severity};
use crate::unit::{InvalidJob, Unit};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// Id of the automated suspend job.
pub const AUTO_SUSPEND_JOB_ID: &str = "com.canonical.certification::suspend/suspend_advanced_auto";
/// Flag marking jobs that must run before the automated suspend.
pub const AUTO_SUSPEND_FLAG: &str = "run-before-auto-suspend";
/// Id of the manual suspend job.
pub const MANUAL_SUSPEND_JOB_ID: &str = "com.canonical.certification::suspend/suspend_advanced";
/// Flag marking jobs that must run before the manual suspend.
pub const MANUAL_SUSPEND_FLAG: &str = "run-before-manual-suspend";

/// Kind of edge between two jobs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EdgeType {
    /// Must pass first
    Depends,
    /// Must have run first
    After,
    /// Produces resources this job requires
    Resource,
    /// Declared `before` on this job
    Before,
}

/// A synchronization point that flagged jobs must run before.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Checkpoint {
    pub job_id: String,
    pub flag: String,
}

impl Checkpoint {
    pub fn new(job_id: impl Into<String>, flag: impl Into<String>) -> Self {
        Self {
            job_id: job_id.into(),
            flag: flag.into(),
        }
    }

    /// Whether `job` must run before this checkpoint.
    ///
    /// True when the job carries the checkpoint flag or declares a sibling
    /// that depends on the checkpoint job.
    pub fn is_impacted_by(&self, job: &JobDefinition) -> bool {
        job.has_flag(&self.flag)
            || job
                .siblings()
                .iter()
                .any(|sibling| sibling.depends.iter().any(|id| *id == self.job_id))
    }
}

/// Controller configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ControllerConfig {
    pub checkpoints: Vec<Checkpoint>,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            checkpoints: vec![
                Checkpoint::new(AUTO_SUSPEND_JOB_ID, AUTO_SUSPEND_FLAG),
                Checkpoint::new(MANUAL_SUSPEND_JOB_ID, MANUAL_SUSPEND_FLAG),
            ],
        }
    }
}

/// Computes dependencies, readiness and resource-driven expansion.
#[derive(Debug, Clone, Default)]
pub struct SessionStateController {
    config: ControllerConfig,
}

impl SessionStateController {
    pub fn new(config: ControllerConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ControllerConfig {
        &self.config
    }

    /// The checkpoint whose job id is `job_id`, if any.
    pub fn checkpoint(&self, job_id: &str) -> Option<&Checkpoint> {
        self.config.checkpoints.iter().find(|c| c.job_id == job_id)
    }

    // ------------------------------------------------------------------------
    // Dependency sets
    // ------------------------------------------------------------------------

    /// Every typed edge from `job` to the jobs it waits for.
    ///
    /// `job_list` is only consulted when `job` is a checkpoint: flagged jobs
    /// in it become `After` edges.
    pub fn dependency_set(
        &self,
        job: &JobDefinition,
        job_list: &[&JobDefinition],
    ) -> BTreeSet<(EdgeType, String)> {
        let mut edges = BTreeSet::new();
        for id in job.direct_dependencies() {
            edges.insert((EdgeType::Depends, id.clone()));
        }
        for id in job.after_dependencies() {
            edges.insert((EdgeType::After, id));
        }
        match job.resource_dependencies() {
            Ok(ids) => edges.extend(ids.into_iter().map(|id| (EdgeType::Resource, id))),
            Err(e) => {
                tracing::debug!(job = %job.id(), error = %e, "no resource edges, requires does not compile");
            }
        }
        for id in job.before_references() {
            edges.insert((EdgeType::Before, id.clone()));
        }
        if let Some(checkpoint) = self.checkpoint(job.id()) {
            for candidate in job_list {
                if candidate.id() != job.id() && checkpoint.is_impacted_by(candidate) {
                    edges.insert((EdgeType::After, candidate.id().to_string()));
                }
            }
        }
        edges
    }

    /// Record `job` as a back-edge on every job it declared `before` on.
    ///
    /// Targets missing from `global_job_map` or absent from the active
    /// `job_map` are logged and skipped.
    pub fn link_before_edges(
        &self,
        job: &JobDefinition,
        job_map: &mut BTreeMap<String, JobDefinition>,
        global_job_map: &BTreeMap<String, JobDefinition>,
    ) {
        for target in job.before_dependencies() {
            if !global_job_map.contains_key(target) {
                tracing::error!(job = %job.id(), %target, "before dependency on an unknown job");
                continue;
            }
            match job_map.get_mut(target) {
                Some(referenced) => referenced.add_before_reference(job.id()),
                None => {
                    tracing::debug!(job = %job.id(), %target, "before dependency on a job that is not selected");
                }
            }
        }
    }

    // ------------------------------------------------------------------------
    // Readiness
    // ------------------------------------------------------------------------

    /// Every reason `job` cannot run now; empty means ready.
    pub fn inhibitors(
        &self,
        session: &SessionState,
        job: &JobDefinition,
    ) -> Vec<JobReadinessInhibitor> {
        let mut inhibitors = Vec::new();
        let outcome = |id: &str| match session.outcome_of(id) {
            Some(outcome) => outcome,
            None => {
                tracing::debug!(job = %job.id(), dependency = %id, "dependency is not part of the session");
                Outcome::None
            }
        };

        match job.resource_program() {
            None => {}
            Some(Err(e)) => {
                tracing::debug!(job = %job.id(), error = %e, "ignoring requires that does not compile");
            }
            Some(Ok(program)) => match program.evaluate_or_raise(session.resource_map()) {
                Ok(()) => {}
                Err(EvaluationError::CannotEvaluate { expression, .. }) => {
                    for resource_id in expression.resource_ids() {
                        if outcome(resource_id.as_str()) == Outcome::Pass {
                            continue;
                        }
                        inhibitors.push(JobReadinessInhibitor::pending_resource(
                            resource_id,
                            expression.text(),
                        ));
                    }
                }
                Err(EvaluationError::Failed { expression }) => {
                    for resource_id in expression.resource_ids() {
                        inhibitors.push(JobReadinessInhibitor::failed_resource(
                            resource_id,
                            expression.text(),
                        ));
                    }
                }
            },
        }

        for dep in job.direct_dependencies() {
            match outcome(dep.as_str()) {
                Outcome::None => inhibitors.push(JobReadinessInhibitor::pending_dep(dep)),
                Outcome::Pass => {}
                _ => inhibitors.push(JobReadinessInhibitor::failed_dep(dep)),
            }
        }

        for dep in job.after_dependencies() {
            if outcome(dep.as_str()) == Outcome::None {
                inhibitors.push(JobReadinessInhibitor::pending_dep(dep));
            }
        }

        for dep in job.salvage_dependencies() {
            if outcome(dep.as_str()) != Outcome::Fail {
                inhibitors.push(JobReadinessInhibitor::not_failed_dep(dep));
            }
        }

        if let Some(checkpoint) = self.checkpoint(job.id()) {
            for state in session.job_states().values() {
                if !state.is_desired() || state.job_id() == job.id() {
                    continue;
                }
                let Some(candidate) = session.job(state.job_id()) else {
                    continue;
                };
                if checkpoint.is_impacted_by(candidate) && state.outcome() == Outcome::None {
                    inhibitors.push(JobReadinessInhibitor::pending_dep(state.job_id()));
                }
            }
        }

        inhibitors
    }

    // ------------------------------------------------------------------------
    // Results
    // ------------------------------------------------------------------------

    /// Store `result` for `job` and run the resource pipeline for resource
    /// jobs.
    pub fn observe_result(
        &self,
        session: &mut SessionState,
        job: &JobDefinition,
        result: JobResult,
        fake_resources: bool,
    ) {
        if session.job_state(job.id()).is_none() {
            tracing::warn!(job = %job.id(), "ignoring result for a job that is not part of the session");
            return;
        }
        let outcome = result.outcome;
        session.set_result(job.id(), result.clone());
        session.on_job_state_map_changed();
        session.on_job_result_changed(job.id(), outcome);
        if job.is_resource() {
            self.process_resource_result(session, job, &result, fake_resources);
        }
    }

    /// Replace the job's records and expand the templates bound to it.
    ///
    /// A result with outcome `none` leaves every record untouched.
    pub fn process_resource_result(
        &self,
        session: &mut SessionState,
        job: &JobDefinition,
        result: &JobResult,
        fake_resources: bool,
    ) {
        if result.outcome == Outcome::None {
            tracing::debug!(job = %job.id(), "resource job has no result, keeping previous records");
            return;
        }
        self.parse_and_store_resource(session, job, result);
        self.instantiate_templates(session, job, fake_resources);
    }

    /// Parse stdout into records and replace the job's resource list.
    ///
    /// No records at all are stored as the single empty-record sentinel.
    pub fn parse_and_store_resource(
        &self,
        session: &mut SessionState,
        job: &JobDefinition,
        result: &JobResult,
    ) {
        let text = result.stdout_text();
        let mut records = Vec::new();
        for item in rfc822::parse_records(&text) {
            match item {
                Ok(record) => records.push(Resource::new(record.data)),
                Err(e) => {
                    tracing::warn!(job = %job.id(), error = %e, "discarding malformed resource record");
                }
            }
        }
        if records.is_empty() {
            records.push(Resource::empty());
        }
        tracing::debug!(job = %job.id(), records = records.len(), "storing resource records");
        session.set_resource_list(job.id(), records);
    }

    /// Expand every template bound to `job` against its current records.
    ///
    /// Generated jobs are validated and added without per-unit
    /// recomputation; readiness is recomputed once at the end.
    pub fn instantiate_templates(
        &self,
        session: &mut SessionState,
        job: &JobDefinition,
        fake_resources: bool,
    ) {
        let records = session
            .resource_map()
            .get(job.id())
            .cloned()
            .unwrap_or_default();
        if records.is_empty() || is_empty_sentinel(&records) {
            tracing::debug!(job = %job.id(), "no resource records, skipping template expansion");
            return;
        }

        let candidates: Vec<Candidate> = session
            .units()
            .templates_for(job.id())
            .flat_map(|template| template.instantiate_all(&records, fake_resources))
            .collect();

        let units: Vec<Unit> = if session.metadata().has_flag(FLAG_STRICT_TEMPLATE_EXPANSION) {
            candidates.into_iter().map(wrap_invalid).collect()
        } else {
            candidates.into_iter().filter_map(keep_valid).collect()
        };

        for unit in units {
            session.add_unit(unit, Some(job.id()), false);
        }
        session.recompute_job_readiness();
    }
}

fn log_warnings(findings: &[Finding]) {
    for finding in findings.iter().filter(|f| f.severity == Severity::Warning) {
        tracing::warn!(%finding, "generated job");
    }
}

/// Lenient expansion: drop candidates that fail validation.
fn keep_valid(candidate: Candidate) -> Option<Unit> {
    let job = match candidate.job {
        Ok(job) => job,
        Err(e) => {
            tracing::error!(
                id = %candidate.id,
                template = %candidate.template_id,
                error = %e,
                "ignoring generated job"
            );
            return None;
        }
    };
    let findings = validation::check_job(&job);
    log_warnings(&findings);
    if !validation::has_errors(&findings) {
        return Some(Unit::Job(job));
    }
    for finding in findings.iter().filter(|f| f.is_error()) {
        tracing::error!(%finding, "generated job");
    }
    tracing::error!(id = %job.id(), template = %candidate.template_id, "ignoring invalid generated job");
    None
}

/// Strict expansion: keep every candidate, replacing failures with
/// placeholders.
fn wrap_invalid(candidate: Candidate) -> Unit {
    let job = match candidate.job {
        Ok(job) => job,
        Err(e) => {
            return Unit::Invalid(InvalidJob::unrendered(
                &candidate.id,
                candidate.template_id,
                vec![e.to_string()],
            ));
        }
    };
    let findings = validation::check_job(&job);
    log_warnings(&findings);
    let errors: Vec<String> = findings
        .iter()
        .filter(|f| f.is_error())
        .map(ToString::to_string)
        .collect();
    if errors.is_empty() {
        Unit::Job(job)
    } else {
        Unit::Invalid(InvalidJob::new(job, candidate.template_id, errors))
    }
}

#[cfg(test)]
#[path = "controller_tests.rs"]
mod tests;
