// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Units known to a session.
//!
//! A unit is a job, a template, or the placeholder left behind by a
//! generated job that failed validation. Units are only ever appended to
//! the [`UnitRegistry`]; generated ones remember the resource job they
//! came from.

pub mod template;
pub mod validation;

use crate::job::{JobDefinition, Plugin, RawJob};
use std::collections::HashMap;
use template::TemplateUnit;
use thiserror::Error;

/// A unit of any kind.
#[derive(Debug, Clone)]
pub enum Unit {
    Job(JobDefinition),
    Template(TemplateUnit),
    Invalid(InvalidJob),
}

impl Unit {
    /// The job id, or the template id for templates.
    pub fn id(&self) -> &str {
        match self {
            Unit::Job(job) => job.id(),
            Unit::Template(template) => template.template_id(),
            Unit::Invalid(invalid) => invalid.id(),
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Unit::Job(_) => "job",
            Unit::Template(_) => "template",
            Unit::Invalid(_) => "invalid-job",
        }
    }

    /// The job taking part in ordering and readiness, if any.
    pub fn job(&self) -> Option<&JobDefinition> {
        match self {
            Unit::Job(job) => Some(job),
            Unit::Invalid(invalid) => Some(invalid.job()),
            Unit::Template(_) => None,
        }
    }

    pub fn as_template(&self) -> Option<&TemplateUnit> {
        match self {
            Unit::Template(template) => Some(template),
            _ => None,
        }
    }

    /// Same kind with the same declared content.
    pub fn same_definition(&self, other: &Unit) -> bool {
        match (self, other) {
            (Unit::Job(a), Unit::Job(b)) => a.same_definition(b),
            (Unit::Template(a), Unit::Template(b)) => a.raw() == b.raw(),
            (Unit::Invalid(a), Unit::Invalid(b)) => {
                a.job().same_definition(b.job()) && a.errors() == b.errors()
            }
            _ => false,
        }
    }
}

impl From<JobDefinition> for Unit {
    fn from(job: JobDefinition) -> Self {
        Unit::Job(job)
    }
}

impl From<TemplateUnit> for Unit {
    fn from(template: TemplateUnit) -> Self {
        Unit::Template(template)
    }
}

impl From<InvalidJob> for Unit {
    fn from(invalid: InvalidJob) -> Self {
        Unit::Invalid(invalid)
    }
}

/// Placeholder for a generated job that failed validation.
///
/// It keeps the generated id so the failure surfaces when the job would be
/// scheduled or reported instead of the job silently vanishing.
#[derive(Debug, Clone)]
pub struct InvalidJob {
    job: JobDefinition,
    template_id: String,
    errors: Vec<String>,
}

impl InvalidJob {
    /// Wrap a rendered job that has error findings.
    pub fn new(job: JobDefinition, template_id: impl Into<String>, errors: Vec<String>) -> Self {
        Self {
            job,
            template_id: template_id.into(),
            errors,
        }
    }

    /// Placeholder for a candidate that could not be rendered at all.
    pub fn unrendered(id: &str, template_id: impl Into<String>, errors: Vec<String>) -> Self {
        let stub = JobDefinition::from_raw(RawJob {
            plugin: Some(Plugin::Shell.as_str().to_string()),
            ..RawJob::new(id)
        });
        Self::new(stub, template_id, errors)
    }

    pub fn id(&self) -> &str {
        self.job.id()
    }

    pub fn job(&self) -> &JobDefinition {
        &self.job
    }

    pub fn template_id(&self) -> &str {
        &self.template_id
    }

    pub fn errors(&self) -> &[String] {
        &self.errors
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    #[error("{kind} '{id}' conflicts with an existing unit of the same id")]
    Conflict { id: String, kind: &'static str },
}

/// Outcome of a successful [`UnitRegistry::insert`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Inserted {
    Added,
    /// An identical unit was already registered
    AlreadyPresent,
}

/// Append-only collection of units keyed by id.
#[derive(Debug, Clone, Default)]
pub struct UnitRegistry {
    units: Vec<Unit>,
    index: HashMap<String, usize>,
    via: HashMap<String, String>,
}

impl UnitRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a unit, optionally recording the job that produced it.
    ///
    /// Re-registering an identical unit is a no-op.
    pub fn insert(&mut self, unit: Unit, via: Option<&str>) -> Result<Inserted, RegistryError> {
        if let Some(existing) = self.get(unit.id()) {
            if existing.same_definition(&unit) {
                return Ok(Inserted::AlreadyPresent);
            }
            return Err(RegistryError::Conflict {
                id: unit.id().to_string(),
                kind: unit.kind(),
            });
        }
        let id = unit.id().to_string();
        if let Some(via) = via {
            self.via.insert(id.clone(), via.to_string());
        }
        self.index.insert(id, self.units.len());
        self.units.push(unit);
        Ok(Inserted::Added)
    }

    pub fn get(&self, id: &str) -> Option<&Unit> {
        self.index.get(id).and_then(|&i| self.units.get(i))
    }

    pub fn contains(&self, id: &str) -> bool {
        self.index.contains_key(id)
    }

    /// Units in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = &Unit> {
        self.units.iter()
    }

    pub fn len(&self) -> usize {
        self.units.len()
    }

    pub fn is_empty(&self) -> bool {
        self.units.is_empty()
    }

    /// The job that generated `id`, if it was generated.
    pub fn via(&self, id: &str) -> Option<&str> {
        self.via.get(id).map(String::as_str)
    }

    /// Units generated from the records of `job_id`, in insertion order.
    pub fn generated_by<'a>(&'a self, job_id: &'a str) -> impl Iterator<Item = &'a Unit> + 'a {
        self.units
            .iter()
            .filter(move |unit| self.via(unit.id()) == Some(job_id))
    }

    /// Templates bound to a resource id.
    pub fn templates_for<'a>(
        &'a self,
        resource_id: &'a str,
    ) -> impl Iterator<Item = &'a TemplateUnit> + 'a {
        self.units
            .iter()
            .filter_map(Unit::as_template)
            .filter(move |template| template.resource_id() == resource_id)
    }
}
