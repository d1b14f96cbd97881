// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Catalog TOML parsing

use crate::{Catalog, CheckpointDef, SessionSettings};
use ck_core::{JobDefinition, RawJob, RawTemplate, TemplateUnit};
use serde::Deserialize;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Errors that can occur while loading a catalog
#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("duplicate unit id: {0}")]
    DuplicateId(String),
    #[error("template {template} is bound to unknown job '{resource}'")]
    UnknownResource { template: String, resource: String },
    #[error("template {template} is bound to '{resource}', which is not a resource job")]
    NotAResource { template: String, resource: String },
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct RawCatalog {
    session: SessionSettings,
    checkpoint: Option<Vec<CheckpointDef>>,
    job: Vec<RawJob>,
    template: Vec<RawTemplate>,
}

/// Parse a catalog from TOML content
pub fn parse_catalog(content: &str) -> Result<Catalog, CatalogError> {
    let raw: RawCatalog = toml::from_str(content)?;

    let jobs: Vec<JobDefinition> = raw.job.into_iter().map(JobDefinition::from_raw).collect();
    let templates: Vec<TemplateUnit> = raw
        .template
        .into_iter()
        .map(TemplateUnit::from_raw)
        .collect();

    let mut seen = HashSet::new();
    let ids = jobs
        .iter()
        .map(JobDefinition::id)
        .chain(templates.iter().map(TemplateUnit::template_id));
    for id in ids {
        if !seen.insert(id) {
            return Err(CatalogError::DuplicateId(id.to_string()));
        }
    }

    for template in &templates {
        let resource = template.resource_id();
        match jobs.iter().find(|job| job.id() == resource) {
            None => {
                return Err(CatalogError::UnknownResource {
                    template: template.template_id().to_string(),
                    resource: resource.to_string(),
                })
            }
            Some(job) if !job.is_resource() => {
                return Err(CatalogError::NotAResource {
                    template: template.template_id().to_string(),
                    resource: resource.to_string(),
                })
            }
            Some(_) => {}
        }
    }

    tracing::debug!(
        jobs = jobs.len(),
        templates = templates.len(),
        "catalog parsed"
    );
    Ok(Catalog {
        session: raw.session,
        checkpoints: raw.checkpoint,
        jobs,
        templates,
    })
}

/// Read and parse a catalog file
pub fn load_catalog_file(path: &Path) -> Result<Catalog, CatalogError> {
    let content = std::fs::read_to_string(path).map_err(|source| CatalogError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    parse_catalog(&content)
}

#[cfg(test)]
#[path = "parser_tests.rs"]
mod tests;
