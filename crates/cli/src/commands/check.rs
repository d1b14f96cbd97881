// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `ck check <catalog>` - Validate every unit

use crate::output::{self, OutputFormat};
use anyhow::{bail, Result};
use ck_core::{Finding, Severity};
use clap::Args;
use serde::Serialize;
use std::fmt;
use std::path::PathBuf;

#[derive(Args)]
pub struct CheckArgs {
    /// Catalog file
    pub catalog: PathBuf,

    #[arg(long, value_enum, default_value_t)]
    pub format: OutputFormat,
}

#[derive(Serialize)]
struct CheckReport {
    findings: Vec<Finding>,
    errors: usize,
    warnings: usize,
}

impl CheckReport {
    fn new(findings: Vec<Finding>) -> Self {
        let count = |severity| findings.iter().filter(|f| f.severity == severity).count();
        let errors = count(Severity::Error);
        let warnings = count(Severity::Warning);
        Self {
            findings,
            errors,
            warnings,
        }
    }
}

impl fmt::Display for CheckReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for finding in &self.findings {
            writeln!(f, "{}: {}", finding.severity, finding)?;
        }
        writeln!(f, "{} error(s), {} warning(s)", self.errors, self.warnings)
    }
}

pub fn handle(args: CheckArgs) -> Result<()> {
    let catalog = super::load_catalog(&args.catalog)?;
    let report = CheckReport::new(catalog.findings());
    output::print(&report, args.format)?;
    if report.errors > 0 {
        bail!("{} has {} error(s)", args.catalog.display(), report.errors);
    }
    Ok(())
}
