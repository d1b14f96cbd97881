// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! CLI command implementations

pub mod check;
pub mod plan;
pub mod simulate;

use anyhow::{Context, Result};
use ck_catalog::Catalog;
use ck_core::{JobReadinessInhibitor, SessionState};
use std::path::Path;

fn load_catalog(path: &Path) -> Result<Catalog> {
    ck_catalog::load_catalog_file(path)
        .with_context(|| format!("cannot load catalog {}", path.display()))
}

/// `ready`, or every inhibitor separated by commas.
fn readiness(inhibitors: &[JobReadinessInhibitor]) -> String {
    if inhibitors.is_empty() {
        return "ready".to_string();
    }
    inhibitors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Drain queued session events into the log.
fn log_events(session: &mut SessionState) {
    for event in session.take_events() {
        tracing::debug!(?event, "session event");
    }
}
