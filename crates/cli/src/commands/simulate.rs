// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `ck simulate <catalog> --results <file>` - Feed scripted results through
//! a session

use crate::output::{self, OutputFormat};
use anyhow::{bail, Context, Result};
use ck_core::{JobReadinessInhibitor, JobResult, Outcome, SessionState, Unit};
use clap::Args;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};

#[derive(Args)]
pub struct SimulateArgs {
    /// Catalog file
    pub catalog: PathBuf,

    /// TOML file with `[[result]]` entries, observed in order
    #[arg(long)]
    pub results: PathBuf,

    /// Expand templates once per resource job with placeholder values
    #[arg(long)]
    pub fake_resources: bool,

    #[arg(long, value_enum, default_value_t)]
    pub format: OutputFormat,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct ResultsFile {
    result: Vec<ScriptedResult>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
struct ScriptedResult {
    job: String,
    outcome: Outcome,
    #[serde(default)]
    stdout: String,
    #[serde(default)]
    stderr: String,
    comments: Option<String>,
    return_code: Option<i32>,
}

impl ScriptedResult {
    fn to_result(&self) -> JobResult {
        let mut result = JobResult::new(self.outcome);
        if !self.stdout.is_empty() {
            result = result.with_stdout(&self.stdout);
        }
        if !self.stderr.is_empty() {
            result = result.with_stderr(&self.stderr);
        }
        if let Some(comments) = &self.comments {
            result = result.with_comments(comments.clone());
        }
        if let Some(code) = self.return_code {
            result = result.with_return_code(code);
        }
        result
    }
}

fn load_results(path: &Path) -> Result<Vec<ScriptedResult>> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("cannot read results {}", path.display()))?;
    let file: ResultsFile = toml::from_str(&content)
        .with_context(|| format!("cannot parse results {}", path.display()))?;
    Ok(file.result)
}

#[derive(Serialize)]
struct JobReport {
    id: String,
    outcome: Outcome,
    attempts: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    via: Option<String>,
    inhibitors: Vec<JobReadinessInhibitor>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    validation_errors: Vec<String>,
}

#[derive(Serialize)]
struct GeneratedReport {
    id: String,
    kind: &'static str,
    via: String,
}

#[derive(Serialize)]
struct SimulationReport {
    jobs: Vec<JobReport>,
    generated: Vec<GeneratedReport>,
    resources: BTreeMap<String, usize>,
}

impl SimulationReport {
    /// Run-list jobs first, in order, then every other job by id.
    fn new(session: &SessionState) -> Self {
        let in_run_list = |id: &str| session.run_list().iter().any(|r| r == id);
        let ids = session.run_list().iter().chain(
            session
                .job_states()
                .keys()
                .filter(|id| !in_run_list(id.as_str())),
        );
        let jobs = ids
            .filter_map(|id| session.job_state(id))
            .map(|state| JobReport {
                id: state.job_id().to_string(),
                outcome: state.outcome(),
                attempts: state.attempts(),
                via: state.via().map(str::to_string),
                inhibitors: state.inhibitors().to_vec(),
                validation_errors: state.validation_errors().to_vec(),
            })
            .collect();

        let generated = session
            .units()
            .iter()
            .filter_map(|unit| {
                session.units().via(unit.id()).map(|via| GeneratedReport {
                    id: unit.id().to_string(),
                    kind: unit.kind(),
                    via: via.to_string(),
                })
            })
            .collect();

        let resources = session
            .resource_map()
            .iter()
            .map(|(id, records)| (id.clone(), records.len()))
            .collect();

        Self {
            jobs,
            generated,
            resources,
        }
    }
}

impl fmt::Display for SimulationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for job in &self.jobs {
            write!(f, "{}: {}", job.id, job.outcome)?;
            if !job.inhibitors.is_empty() {
                write!(f, " [{}]", super::readiness(&job.inhibitors))?;
            }
            writeln!(f)?;
            for error in &job.validation_errors {
                writeln!(f, "  invalid: {}", error)?;
            }
        }
        for unit in &self.generated {
            writeln!(f, "generated {} ({}) via {}", unit.id, unit.kind, unit.via)?;
        }
        for (id, records) in &self.resources {
            writeln!(f, "resource {}: {} record(s)", id, records)?;
        }
        Ok(())
    }
}

/// Add jobs generated by `job_id` to the selection.
///
/// Placeholders for invalid jobs stay unselected.
fn select_generated(session: &mut SessionState, job_id: &str) {
    let generated: Vec<String> = session
        .units()
        .generated_by(job_id)
        .filter(|unit| matches!(unit, Unit::Job(_)))
        .map(|unit| unit.id().to_string())
        .filter(|id| !session.desired().contains(id))
        .collect();
    if generated.is_empty() {
        return;
    }
    tracing::info!(via = %job_id, count = generated.len(), "selecting generated jobs");
    let mut desired = session.desired().to_vec();
    desired.extend(generated);
    session.update_desired_job_list(desired);
}

pub fn handle(args: SimulateArgs) -> Result<()> {
    let catalog = super::load_catalog(&args.catalog)?;
    let script = load_results(&args.results)?;
    let mut session = catalog.start_session();
    super::log_events(&mut session);

    for (index, scripted) in script.iter().enumerate() {
        if session.job(&scripted.job).is_none() {
            bail!("result #{}: unknown job '{}'", index + 1, scripted.job);
        }
        session.observe_result_with(&scripted.job, scripted.to_result(), args.fake_resources);
        select_generated(&mut session, &scripted.job);
        super::log_events(&mut session);
    }

    output::print(&SimulationReport::new(&session), args.format)
}
