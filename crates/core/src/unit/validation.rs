// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Static checks on units.
//!
//! Error findings make a generated job unusable; warnings and advice are
//! only reported.

use super::template::TemplateUnit;
use super::Unit;
use crate::job::JobDefinition;
use serde::Serialize;
use std::fmt;

/// How serious a finding is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Error,
    Warning,
    Advice,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Severity::Error => "error",
            Severity::Warning => "warning",
            Severity::Advice => "advice",
        })
    }
}

/// A single problem found in a unit field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Finding {
    pub severity: Severity,
    pub unit: String,
    pub field: &'static str,
    pub message: String,
}

impl Finding {
    fn new(severity: Severity, unit: &str, field: &'static str, message: impl Into<String>) -> Self {
        Self {
            severity,
            unit: unit.to_string(),
            field,
            message: message.into(),
        }
    }

    pub fn is_error(&self) -> bool {
        self.severity == Severity::Error
    }
}

impl fmt::Display for Finding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}: {}", self.unit, self.field, self.message)
    }
}

/// True when any finding is an error.
pub fn has_errors(findings: &[Finding]) -> bool {
    findings.iter().any(Finding::is_error)
}

/// Check any unit kind.
pub fn check_unit(unit: &Unit) -> Vec<Finding> {
    match unit {
        Unit::Job(job) => check_job(job),
        Unit::Template(template) => check_template(template),
        Unit::Invalid(invalid) => invalid
            .errors()
            .iter()
            .map(|message| Finding::new(Severity::Error, invalid.id(), "template", message.clone()))
            .collect(),
    }
}

/// Check a job definition.
pub fn check_job(job: &JobDefinition) -> Vec<Finding> {
    let id = job.id();
    let mut findings = Vec::new();

    if id.trim().is_empty() {
        findings.push(Finding::new(Severity::Error, id, "id", "id is empty"));
    } else if id.contains(char::is_whitespace) {
        findings.push(Finding::new(Severity::Error, id, "id", "id contains whitespace"));
    } else if id.contains(['{', '}']) {
        findings.push(Finding::new(
            Severity::Error,
            id,
            "id",
            "id contains unexpanded template braces",
        ));
    }

    match job.plugin() {
        Ok(plugin) => {
            let has_command = job.command().is_some_and(|c| !c.trim().is_empty());
            if plugin.requires_command() && !has_command {
                findings.push(Finding::new(
                    Severity::Error,
                    id,
                    "command",
                    format!("command is required for {plugin} jobs"),
                ));
            }
        }
        Err(e) => findings.push(Finding::new(Severity::Error, id, "plugin", e.to_string())),
    }

    if !job.summary().is_some_and(|s| !s.trim().is_empty()) {
        findings.push(Finding::new(Severity::Advice, id, "summary", "summary is missing"));
    }

    if let Some(Err(e)) = job.resource_program() {
        findings.push(Finding::new(Severity::Error, id, "requires", e.to_string()));
    }

    let lists: [(&'static str, &std::collections::BTreeSet<String>); 4] = [
        ("depends", job.direct_dependencies()),
        ("after", job.declared_after_dependencies()),
        ("salvages", job.salvage_dependencies()),
        ("before", job.before_dependencies()),
    ];
    for (field, ids) in lists {
        if ids.contains(id) {
            findings.push(Finding::new(Severity::Error, id, field, "job refers to itself"));
        }
    }

    for both in job
        .salvage_dependencies()
        .intersection(job.direct_dependencies())
    {
        findings.push(Finding::new(
            Severity::Warning,
            id,
            "salvages",
            format!("'{both}' is both a dependency and a salvage target"),
        ));
    }

    if let Some(e) = job.siblings_error() {
        findings.push(Finding::new(
            Severity::Warning,
            id,
            "siblings",
            format!("malformed siblings: {e}"),
        ));
    }

    findings
}

/// Check a template before any expansion.
pub fn check_template(template: &TemplateUnit) -> Vec<Finding> {
    let id = template.template_id();
    let mut findings = Vec::new();

    if template.resource_id().trim().is_empty() {
        findings.push(Finding::new(
            Severity::Error,
            id,
            "template-resource",
            "template is not bound to a resource",
        ));
    }

    if let Some(Err(e)) = template.filter() {
        findings.push(Finding::new(Severity::Error, id, "template-filter", e.to_string()));
    }

    match template.id_parameters() {
        Ok(params) if params.is_empty() => findings.push(Finding::new(
            Severity::Warning,
            id,
            "id",
            "id does not reference any parameter; every record generates the same id",
        )),
        // Reported below with the other fields
        Ok(_) | Err(_) => {}
    }

    if let Err(e) = template.parameters() {
        findings.push(Finding::new(Severity::Error, id, "template", e.to_string()));
    }

    findings
}

#[cfg(test)]
#[path = "validation_tests.rs"]
mod tests;
