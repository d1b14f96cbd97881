// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Job definitions.
//!
//! A [`RawJob`] mirrors the catalog fields exactly. A [`JobDefinition`] is
//! built from it once: id lists are split, the `requires` program is compiled
//! and the sibling JSON is decoded. Apart from the runtime
//! `before_references` back-edge set, a definition never changes after that.

use crate::resource::expression::{ResourceProgram, ResourceProgramError};
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// How a job's command is run and how its output is interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Plugin {
    #[default]
    Shell,
    /// Output is parsed into resource records
    Resource,
    Attachment,
    Manual,
    UserInteract,
    UserVerify,
    UserInteractVerify,
}

impl Plugin {
    pub fn as_str(&self) -> &'static str {
        match self {
            Plugin::Shell => "shell",
            Plugin::Resource => "resource",
            Plugin::Attachment => "attachment",
            Plugin::Manual => "manual",
            Plugin::UserInteract => "user-interact",
            Plugin::UserVerify => "user-verify",
            Plugin::UserInteractVerify => "user-interact-verify",
        }
    }

    /// Whether a job of this kind needs a command.
    pub fn requires_command(&self) -> bool {
        !matches!(self, Plugin::Manual)
    }
}

impl fmt::Display for Plugin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown plugin: {0}")]
pub struct UnknownPlugin(pub String);

impl FromStr for Plugin {
    type Err = UnknownPlugin;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "shell" => Ok(Plugin::Shell),
            "resource" => Ok(Plugin::Resource),
            "attachment" => Ok(Plugin::Attachment),
            "manual" => Ok(Plugin::Manual),
            "user-interact" => Ok(Plugin::UserInteract),
            "user-verify" => Ok(Plugin::UserVerify),
            "user-interact-verify" => Ok(Plugin::UserInteractVerify),
            other => Err(UnknownPlugin(other.to_string())),
        }
    }
}

/// Job fields exactly as declared.
///
/// Id list fields accept either a whitespace/comma separated string or a
/// list of strings; both are stored as a single space separated string so
/// template placeholders can appear anywhere.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct RawJob {
    pub id: String,
    pub summary: Option<String>,
    pub plugin: Option<String>,
    pub command: Option<String>,
    #[serde(deserialize_with = "id_list")]
    pub depends: Option<String>,
    #[serde(deserialize_with = "id_list")]
    pub after: Option<String>,
    #[serde(deserialize_with = "id_list")]
    pub salvages: Option<String>,
    #[serde(deserialize_with = "id_list")]
    pub before: Option<String>,
    pub requires: Option<String>,
    #[serde(deserialize_with = "id_list")]
    pub flags: Option<String>,
    /// JSON list of sibling declarations
    pub siblings: Option<String>,
    pub category_id: Option<String>,
}

impl RawJob {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            ..Self::default()
        }
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum StringOrList {
    String(String),
    List(Vec<String>),
}

impl StringOrList {
    fn joined(self) -> String {
        match self {
            StringOrList::String(s) => s,
            StringOrList::List(items) => items.join(" "),
        }
    }
}

fn id_list<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<StringOrList>::deserialize(deserializer)?.map(StringOrList::joined))
}

fn id_vec<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<StringOrList>::deserialize(deserializer)?
        .map(|v| split_id_list(&v.joined()).into_iter().collect())
        .unwrap_or_default())
}

/// Split a whitespace and/or comma separated list of ids.
pub fn split_id_list(text: &str) -> BTreeSet<String> {
    text.split(|c: char| c.is_whitespace() || c == ',')
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

/// A related job declared inline by another job.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Sibling {
    pub id: String,
    #[serde(default, deserialize_with = "id_vec")]
    pub depends: Vec<String>,
    #[serde(default, deserialize_with = "id_vec")]
    pub after: Vec<String>,
}

/// A job definition ready for dependency resolution.
#[derive(Debug, Clone)]
pub struct JobDefinition {
    raw: RawJob,
    plugin: Result<Plugin, UnknownPlugin>,
    depends: BTreeSet<String>,
    after: BTreeSet<String>,
    salvages: BTreeSet<String>,
    before: BTreeSet<String>,
    flags: BTreeSet<String>,
    program: Option<Result<ResourceProgram, ResourceProgramError>>,
    siblings: Result<Vec<Sibling>, String>,
    before_references: BTreeSet<String>,
}

impl JobDefinition {
    pub fn from_raw(raw: RawJob) -> Self {
        let list = |field: &Option<String>| {
            field
                .as_deref()
                .map(split_id_list)
                .unwrap_or_default()
        };
        let plugin = raw.plugin.as_deref().unwrap_or("shell").parse();
        let program = raw
            .requires
            .as_deref()
            .filter(|text| !text.trim().is_empty())
            .map(ResourceProgram::parse);
        if let Some(Err(e)) = &program {
            tracing::debug!(job = %raw.id, error = %e, "requires does not compile");
        }
        let siblings = match raw.siblings.as_deref() {
            None => Ok(Vec::new()),
            Some(text) => serde_json::from_str::<Vec<Sibling>>(text).map_err(|e| {
                tracing::warn!(job = %raw.id, error = %e, "ignoring malformed siblings");
                e.to_string()
            }),
        };

        Self {
            depends: list(&raw.depends),
            after: list(&raw.after),
            salvages: list(&raw.salvages),
            before: list(&raw.before),
            flags: list(&raw.flags),
            plugin,
            program,
            siblings,
            before_references: BTreeSet::new(),
            raw,
        }
    }

    /// A job with only an id (shell plugin, no dependencies).
    pub fn new(id: impl Into<String>) -> Self {
        Self::from_raw(RawJob::new(id))
    }

    pub fn id(&self) -> &str {
        &self.raw.id
    }

    pub fn raw(&self) -> &RawJob {
        &self.raw
    }

    pub fn summary(&self) -> Option<&str> {
        self.raw.summary.as_deref()
    }

    pub fn command(&self) -> Option<&str> {
        self.raw.command.as_deref()
    }

    /// The plugin, or the unknown plugin name.
    pub fn plugin(&self) -> Result<Plugin, &UnknownPlugin> {
        self.plugin.as_ref().copied()
    }

    pub fn is_resource(&self) -> bool {
        matches!(self.plugin, Ok(Plugin::Resource))
    }

    pub fn flags(&self) -> &BTreeSet<String> {
        &self.flags
    }

    pub fn has_flag(&self, flag: &str) -> bool {
        self.flags.contains(flag)
    }

    /// Hard dependencies (`depends`).
    pub fn direct_dependencies(&self) -> &BTreeSet<String> {
        &self.depends
    }

    /// Soft dependencies as declared (`after`).
    pub fn declared_after_dependencies(&self) -> &BTreeSet<String> {
        &self.after
    }

    /// Soft dependencies including jobs that declared `before` on this one.
    pub fn after_dependencies(&self) -> BTreeSet<String> {
        self.after
            .union(&self.before_references)
            .cloned()
            .collect()
    }

    pub fn salvage_dependencies(&self) -> &BTreeSet<String> {
        &self.salvages
    }

    /// Jobs this one must run before.
    pub fn before_dependencies(&self) -> &BTreeSet<String> {
        &self.before
    }

    /// Compiled `requires`, if any.
    pub fn resource_program(&self) -> Option<Result<&ResourceProgram, &ResourceProgramError>> {
        self.program.as_ref().map(Result::as_ref)
    }

    /// Resource ids referenced by `requires`.
    ///
    /// Empty when there is no requirement; an error when it does not compile.
    pub fn resource_dependencies(&self) -> Result<BTreeSet<String>, &ResourceProgramError> {
        match self.resource_program() {
            None => Ok(BTreeSet::new()),
            Some(Ok(program)) => Ok(program
                .resource_ids()
                .into_iter()
                .map(str::to_string)
                .collect()),
            Some(Err(e)) => Err(e),
        }
    }

    /// Decoded siblings; empty when the declaration was malformed.
    pub fn siblings(&self) -> &[Sibling] {
        self.siblings.as_deref().unwrap_or(&[])
    }

    /// The decode error of a malformed sibling declaration.
    pub fn siblings_error(&self) -> Option<&str> {
        self.siblings.as_ref().err().map(String::as_str)
    }

    pub fn before_references(&self) -> &BTreeSet<String> {
        &self.before_references
    }

    pub fn add_before_reference(&mut self, job_id: impl Into<String>) {
        self.before_references.insert(job_id.into());
    }

    pub fn clear_before_references(&mut self) {
        self.before_references.clear();
    }

    /// Same declared content, ignoring runtime back-edges.
    pub fn same_definition(&self, other: &JobDefinition) -> bool {
        self.raw == other.raw
    }
}

impl From<RawJob> for JobDefinition {
    fn from(raw: RawJob) -> Self {
        Self::from_raw(raw)
    }
}

#[cfg(test)]
#[path = "job_tests.rs"]
mod tests;
