// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `ck plan <catalog>` - Show the run list and readiness

use crate::output::{self, OutputFormat};
use anyhow::Result;
use ck_core::{DependencyProblem, JobReadinessInhibitor, SessionState};
use clap::Args;
use serde::Serialize;
use std::fmt;
use std::path::PathBuf;

#[derive(Args)]
pub struct PlanArgs {
    /// Catalog file
    pub catalog: PathBuf,

    #[arg(long, value_enum, default_value_t)]
    pub format: OutputFormat,
}

#[derive(Serialize)]
struct PlanEntry {
    id: String,
    ready: bool,
    inhibitors: Vec<JobReadinessInhibitor>,
}

#[derive(Serialize)]
struct PlanReport {
    run_list: Vec<PlanEntry>,
    problems: Vec<DependencyProblem>,
}

impl PlanReport {
    fn new(session: &SessionState) -> Self {
        let run_list = session
            .run_list()
            .iter()
            .filter_map(|id| session.job_state(id))
            .map(|state| PlanEntry {
                id: state.job_id().to_string(),
                ready: state.is_ready(),
                inhibitors: state.inhibitors().to_vec(),
            })
            .collect();
        Self {
            run_list,
            problems: session.problems().to_vec(),
        }
    }
}

impl fmt::Display for PlanReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for entry in &self.run_list {
            writeln!(f, "{}: {}", entry.id, super::readiness(&entry.inhibitors))?;
        }
        for problem in &self.problems {
            writeln!(f, "problem: {}", problem)?;
        }
        Ok(())
    }
}

pub fn handle(args: PlanArgs) -> Result<()> {
    let catalog = super::load_catalog(&args.catalog)?;
    let mut session = catalog.start_session();
    super::log_events(&mut session);
    output::print(&PlanReport::new(&session), args.format)
}
