// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! A parsed catalog and the session it describes

use ck_core::unit::validation::{self, Finding};
use ck_core::{
    Checkpoint, ControllerConfig, JobDefinition, SessionMetadata, SessionState,
    SessionStateController, TemplateUnit, Unit, FLAG_STRICT_TEMPLATE_EXPANSION,
};
use serde::Deserialize;
use std::sync::Arc;

/// The `[session]` table
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, rename_all = "kebab-case", deny_unknown_fields)]
pub struct SessionSettings {
    pub title: Option<String>,
    pub strict_template_expansion: bool,
    /// Jobs to select; every job in catalog order when absent
    pub desired: Option<Vec<String>>,
}

/// A `[[checkpoint]]` entry
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CheckpointDef {
    pub job: String,
    pub flag: String,
}

/// A parsed catalog
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    pub session: SessionSettings,
    /// Replaces the default checkpoints when present
    pub checkpoints: Option<Vec<CheckpointDef>>,
    pub jobs: Vec<JobDefinition>,
    pub templates: Vec<TemplateUnit>,
}

impl Catalog {
    /// Get a job definition by id
    pub fn get_job(&self, id: &str) -> Option<&JobDefinition> {
        self.jobs.iter().find(|job| job.id() == id)
    }

    /// Get a template by template id
    pub fn get_template(&self, id: &str) -> Option<&TemplateUnit> {
        self.templates.iter().find(|t| t.template_id() == id)
    }

    pub fn controller_config(&self) -> ControllerConfig {
        match &self.checkpoints {
            Some(defs) => ControllerConfig {
                checkpoints: defs
                    .iter()
                    .map(|def| Checkpoint::new(&def.job, &def.flag))
                    .collect(),
            },
            None => ControllerConfig::default(),
        }
    }

    /// Every unit, jobs first, in declaration order.
    pub fn units(&self) -> Vec<Unit> {
        self.jobs
            .iter()
            .cloned()
            .map(Unit::Job)
            .chain(self.templates.iter().cloned().map(Unit::Template))
            .collect()
    }

    pub fn desired(&self) -> Vec<String> {
        match &self.session.desired {
            Some(ids) => ids.clone(),
            None => self.jobs.iter().map(|job| job.id().to_string()).collect(),
        }
    }

    pub fn metadata(&self) -> SessionMetadata {
        let mut metadata = SessionMetadata {
            title: self.session.title.clone(),
            ..SessionMetadata::default()
        };
        if self.session.strict_template_expansion {
            metadata.set_flag(FLAG_STRICT_TEMPLATE_EXPANSION);
        }
        metadata
    }

    /// Validation findings for every unit.
    pub fn findings(&self) -> Vec<Finding> {
        self.units().iter().flat_map(validation::check_unit).collect()
    }

    /// A session over this catalog with the desired jobs selected.
    pub fn start_session(&self) -> SessionState {
        let controller = Arc::new(SessionStateController::new(self.controller_config()));
        let mut session = SessionState::with_units(controller, self.units());
        *session.metadata_mut() = self.metadata();
        session.update_desired_job_list(self.desired());
        session
    }
}

#[cfg(test)]
#[path = "catalog_tests.rs"]
mod tests;
