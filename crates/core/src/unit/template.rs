// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Job templates expanded against resource records.
//!
//! Every string field of a template's job is a template. Two engines are
//! supported:
//!
//! - `default`: `{name}` is replaced by the record's `name` value, `{{` and
//!   `}}` stand for literal braces
//! - `jinja2`: full minijinja syntax with strict undefined handling
//!
//! A parameter the record does not provide is a [`TemplateError::MissingParam`].

use crate::job::{JobDefinition, RawJob};
use crate::resource::expression::{ResourceExpression, ResourceProgramError};
use crate::resource::Resource;
use minijinja::{Environment, UndefinedBehavior};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::sync::LazyLock;
use thiserror::Error;

// `{{`, `}}` or `{name}`
#[allow(clippy::expect_used)]
static PARAM_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\{\{|\}\}|\{([A-Za-z_][A-Za-z0-9_]*)\}").expect("constant regex pattern is valid")
});

/// Errors raised while expanding a template.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TemplateError {
    #[error("missing template parameter '{parameter}'")]
    MissingParam { parameter: String },

    #[error("template syntax error: {0}")]
    Syntax(String),

    #[error("render error: {0}")]
    Render(String),
}

impl From<minijinja::Error> for TemplateError {
    fn from(err: minijinja::Error) -> Self {
        match err.kind() {
            minijinja::ErrorKind::SyntaxError => TemplateError::Syntax(err.to_string()),
            _ => TemplateError::Render(err.to_string()),
        }
    }
}

/// Substitution syntax used by a template.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TemplateEngine {
    #[default]
    Default,
    Jinja2,
}

impl TemplateEngine {
    /// Names of the parameters `text` refers to.
    fn parameters(&self, text: &str, out: &mut BTreeSet<String>) -> Result<(), TemplateError> {
        match self {
            TemplateEngine::Default => {
                out.extend(
                    PARAM_PATTERN
                        .captures_iter(text)
                        .filter_map(|caps| caps.get(1))
                        .map(|name| name.as_str().to_string()),
                );
                Ok(())
            }
            TemplateEngine::Jinja2 => {
                let env = jinja_env();
                let tmpl = env.template_from_str(text)?;
                out.extend(tmpl.undeclared_variables(false));
                Ok(())
            }
        }
    }

    fn render(&self, text: &str, resource: &Resource) -> Result<String, TemplateError> {
        match self {
            TemplateEngine::Default => {
                let mut missing = None;
                let rendered = PARAM_PATTERN.replace_all(text, |caps: &regex::Captures| {
                    match caps.get(1) {
                        None if &caps[0] == "{{" => "{".to_string(),
                        None => "}".to_string(),
                        Some(name) => match resource.get(name.as_str()) {
                            Some(value) => value.to_string(),
                            None => {
                                missing.get_or_insert_with(|| name.as_str().to_string());
                                String::new()
                            }
                        },
                    }
                });
                match missing {
                    Some(parameter) => Err(TemplateError::MissingParam { parameter }),
                    None => Ok(rendered.into_owned()),
                }
            }
            TemplateEngine::Jinja2 => {
                let env = jinja_env();
                let tmpl = env.template_from_str(text)?;
                Ok(tmpl.render(resource.as_map())?)
            }
        }
    }
}

fn jinja_env() -> Environment<'static> {
    let mut env = Environment::new();
    env.set_undefined_behavior(UndefinedBehavior::Strict);
    env
}

/// Template fields exactly as declared.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct RawTemplate {
    /// Defaults to the job id pattern
    pub template_id: Option<String>,
    pub template_resource: String,
    pub template_engine: TemplateEngine,
    pub template_filter: Option<String>,
    #[serde(flatten)]
    pub job: RawJob,
}

/// One expansion result: a job, or why the record could not produce one.
#[derive(Debug, Clone)]
pub struct Candidate {
    pub template_id: String,
    /// The generated id, or the id pattern when the id itself did not render
    pub id: String,
    pub job: Result<JobDefinition, TemplateError>,
}

/// A parametrized job bound to a resource id.
#[derive(Debug, Clone)]
pub struct TemplateUnit {
    raw: RawTemplate,
    filter: Option<Result<ResourceExpression, ResourceProgramError>>,
}

impl TemplateUnit {
    pub fn from_raw(raw: RawTemplate) -> Self {
        let filter = raw
            .template_filter
            .as_deref()
            .filter(|text| !text.trim().is_empty())
            .map(ResourceExpression::parse);
        Self { raw, filter }
    }

    pub fn raw(&self) -> &RawTemplate {
        &self.raw
    }

    pub fn template_id(&self) -> &str {
        self.raw.template_id.as_deref().unwrap_or(&self.raw.job.id)
    }

    /// Id of the resource job whose records feed this template.
    pub fn resource_id(&self) -> &str {
        &self.raw.template_resource
    }

    pub fn engine(&self) -> TemplateEngine {
        self.raw.template_engine
    }

    pub fn filter(&self) -> Option<Result<&ResourceExpression, &ResourceProgramError>> {
        self.filter.as_ref().map(Result::as_ref)
    }

    /// Every parameter referenced by any field.
    pub fn parameters(&self) -> Result<BTreeSet<String>, TemplateError> {
        let mut params = BTreeSet::new();
        for text in text_fields(&self.raw.job) {
            self.engine().parameters(text, &mut params)?;
        }
        Ok(params)
    }

    /// Parameters referenced by the id pattern.
    pub fn id_parameters(&self) -> Result<BTreeSet<String>, TemplateError> {
        let mut params = BTreeSet::new();
        self.engine().parameters(&self.raw.job.id, &mut params)?;
        Ok(params)
    }

    /// Render a job for one record.
    pub fn instantiate(&self, resource: &Resource) -> Result<JobDefinition, TemplateError> {
        if let Some(parameter) = self
            .parameters()?
            .into_iter()
            .find(|p| resource.get(p).is_none())
        {
            return Err(TemplateError::MissingParam { parameter });
        }
        let engine = self.engine();
        let raw = map_fields(&self.raw.job, |text| engine.render(text, resource))?;
        Ok(JobDefinition::from_raw(raw))
    }

    /// One candidate per record accepted by the filter.
    ///
    /// With `fake_resources` the template is instantiated exactly once, every
    /// parameter bound to its own name, and the filter is not consulted.
    pub fn instantiate_all(&self, resources: &[Resource], fake_resources: bool) -> Vec<Candidate> {
        if fake_resources {
            let fake: Resource = match self.parameters() {
                Ok(params) => params.into_iter().map(|p| (p.clone(), p)).collect(),
                Err(e) => return vec![self.candidate(0, &Resource::empty(), Err(e))],
            };
            return vec![self.candidate(0, &fake, self.instantiate(&fake))];
        }

        resources
            .iter()
            .enumerate()
            .filter(|(_, record)| self.accepts(record))
            .map(|(index, record)| self.candidate(index, record, self.instantiate(record)))
            .collect()
    }

    fn accepts(&self, record: &Resource) -> bool {
        match &self.filter {
            None => true,
            Some(Ok(filter)) => filter.matches(record),
            Some(Err(e)) => {
                tracing::warn!(template = %self.template_id(), error = %e, "template filter does not compile");
                false
            }
        }
    }

    fn candidate(
        &self,
        index: usize,
        record: &Resource,
        job: Result<JobDefinition, TemplateError>,
    ) -> Candidate {
        let id = match &job {
            Ok(job) => job.id().to_string(),
            Err(_) => self.fallback_id(index, record),
        };
        Candidate {
            template_id: self.template_id().to_string(),
            id,
            job,
        }
    }

    /// Id for a record that could not be rendered into a job.
    ///
    /// Uses the rendered id pattern when the record binds all of its
    /// parameters, otherwise `<template-id>[<record index>]`, so every
    /// failed record keeps its own id.
    fn fallback_id(&self, index: usize, record: &Resource) -> String {
        let bound = self
            .id_parameters()
            .map(|params| params.iter().all(|p| record.get(p).is_some()))
            .unwrap_or(false);
        let rendered = bound
            .then(|| self.engine().render(&self.raw.job.id, record).ok())
            .flatten()
            .filter(|id| id.as_str() != self.template_id() && *id != self.raw.job.id);
        rendered.unwrap_or_else(|| format!("{}[{}]", self.template_id(), index))
    }
}

impl From<RawTemplate> for TemplateUnit {
    fn from(raw: RawTemplate) -> Self {
        Self::from_raw(raw)
    }
}

fn text_fields(job: &RawJob) -> impl Iterator<Item = &str> {
    [
        Some(&job.id),
        job.summary.as_ref(),
        job.plugin.as_ref(),
        job.command.as_ref(),
        job.depends.as_ref(),
        job.after.as_ref(),
        job.salvages.as_ref(),
        job.before.as_ref(),
        job.requires.as_ref(),
        job.flags.as_ref(),
        job.siblings.as_ref(),
        job.category_id.as_ref(),
    ]
    .into_iter()
    .flatten()
    .map(String::as_str)
}

fn map_fields<F>(job: &RawJob, mut f: F) -> Result<RawJob, TemplateError>
where
    F: FnMut(&str) -> Result<String, TemplateError>,
{
    let id = f(&job.id)?;
    let mut field = |value: &Option<String>| value.as_deref().map(&mut f).transpose();
    Ok(RawJob {
        id,
        summary: field(&job.summary)?,
        plugin: field(&job.plugin)?,
        command: field(&job.command)?,
        depends: field(&job.depends)?,
        after: field(&job.after)?,
        salvages: field(&job.salvages)?,
        before: field(&job.before)?,
        requires: field(&job.requires)?,
        flags: field(&job.flags)?,
        siblings: field(&job.siblings)?,
        category_id: field(&job.category_id)?,
    })
}

#[cfg(test)]
#[path = "template_tests.rs"]
mod tests;
