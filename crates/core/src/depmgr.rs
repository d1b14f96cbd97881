// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Dependency solver.
//!
//! Orders the desired jobs into a run list in which every job comes after
//! the jobs it depends on. Dependencies that were not desired are pulled
//! in. Structural problems never abort the solve: the offending edge is
//! dropped, the problem is reported and a best-effort order is returned.

use crate::controller::{EdgeType, SessionStateController};
use crate::job::JobDefinition;
use serde::Serialize;
use std::collections::{BTreeMap, HashMap, HashSet, VecDeque};
use std::fmt;

/// A structural problem found while ordering.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "problem", rename_all = "snake_case")]
pub enum DependencyProblem {
    /// A desired id names no job
    UnknownJob { job_id: String },
    /// An edge points at a job that does not exist
    MissingDependency {
        job_id: String,
        dependency: String,
        edge: EdgeType,
    },
    /// Following an edge would close a cycle; `path` starts and ends with
    /// the same job
    Cycle { path: Vec<String> },
}

impl fmt::Display for DependencyProblem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DependencyProblem::UnknownJob { job_id } => write!(f, "unknown job '{job_id}'"),
            DependencyProblem::MissingDependency {
                job_id,
                dependency,
                edge,
            } => write!(f, "job '{job_id}' has a {edge:?} dependency on unknown job '{dependency}'"),
            DependencyProblem::Cycle { path } => {
                write!(f, "dependency cycle: {}", path.join(" -> "))
            }
        }
    }
}

/// Result of a solve.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Resolution {
    pub run_list: Vec<String>,
    pub problems: Vec<DependencyProblem>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mark {
    Visiting,
    Done,
}

/// Depth-first topological solver.
pub struct DependencySolver<'a> {
    jobs: &'a BTreeMap<String, JobDefinition>,
    controller: &'a SessionStateController,
    /// Candidates for checkpoint edges
    job_list: Vec<&'a JobDefinition>,
    marks: HashMap<&'a str, Mark>,
    stack: Vec<&'a str>,
    resolution: Resolution,
}

impl<'a> DependencySolver<'a> {
    /// Order `desired` and everything it needs.
    ///
    /// Desired ids are visited in the given order and each job's edges in id
    /// order, so the result is deterministic.
    pub fn resolve(
        jobs: &'a BTreeMap<String, JobDefinition>,
        desired: &[String],
        controller: &'a SessionStateController,
    ) -> Resolution {
        let job_list = Self::closure(jobs, desired, controller);
        let mut solver = Self {
            jobs,
            controller,
            job_list,
            marks: HashMap::new(),
            stack: Vec::new(),
            resolution: Resolution::default(),
        };
        for id in desired {
            match jobs.get_key_value(id) {
                Some((id, _)) => solver.visit(id),
                None => solver
                    .resolution
                    .problems
                    .push(DependencyProblem::UnknownJob { job_id: id.clone() }),
            }
        }
        solver.resolution
    }

    /// Desired jobs plus everything they pull in, which is exactly the set
    /// of jobs that ends up in the run list.
    ///
    /// Checkpoint edges only point into this set, so it can be computed
    /// without them and then serve as the checkpoint candidates.
    fn closure(
        jobs: &'a BTreeMap<String, JobDefinition>,
        desired: &[String],
        controller: &SessionStateController,
    ) -> Vec<&'a JobDefinition> {
        let mut seen: HashSet<&str> = HashSet::new();
        let mut pending: VecDeque<&'a JobDefinition> = VecDeque::new();
        let mut closure = Vec::new();
        for job in desired.iter().filter_map(|id| jobs.get(id)) {
            if seen.insert(job.id()) {
                pending.push_back(job);
            }
        }
        while let Some(job) = pending.pop_front() {
            closure.push(job);
            for (_, target) in controller.dependency_set(job, &[]) {
                if let Some((id, dependency)) = jobs.get_key_value(&target) {
                    if seen.insert(id.as_str()) {
                        pending.push_back(dependency);
                    }
                }
            }
        }
        closure
    }

    fn visit(&mut self, id: &'a str) {
        if self.marks.contains_key(id) {
            return;
        }
        let jobs = self.jobs;
        let Some(job) = jobs.get(id) else {
            return;
        };
        self.marks.insert(id, Mark::Visiting);
        self.stack.push(id);

        let mut targets: Vec<(String, EdgeType)> = Vec::new();
        for (edge, target) in self.controller.dependency_set(job, &self.job_list) {
            if !targets.iter().any(|(t, _)| *t == target) {
                targets.push((target, edge));
            }
        }
        targets.sort();

        for (target, edge) in targets {
            let Some((target, _)) = jobs.get_key_value(&target) else {
                self.resolution
                    .problems
                    .push(DependencyProblem::MissingDependency {
                        job_id: id.to_string(),
                        dependency: target,
                        edge,
                    });
                continue;
            };
            let target = target.as_str();
            if self.marks.get(target) == Some(&Mark::Visiting) {
                let start = self.stack.iter().position(|s| *s == target).unwrap_or(0);
                let mut path: Vec<String> =
                    self.stack[start..].iter().map(|s| s.to_string()).collect();
                path.push(target.to_string());
                tracing::warn!(job = %id, dependency = %target, "dropping edge that closes a cycle");
                self.resolution.problems.push(DependencyProblem::Cycle { path });
                continue;
            }
            self.visit(target);
        }

        self.stack.pop();
        self.marks.insert(id, Mark::Done);
        self.resolution.run_list.push(id.to_string());
    }
}

#[cfg(test)]
#[path = "depmgr_tests.rs"]
mod tests;
