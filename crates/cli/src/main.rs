// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! ck - certification session planner

mod commands;
mod output;

use anyhow::Result;
use clap::{Parser, Subcommand};
use commands::{check, plan, simulate};

#[derive(Parser)]
#[command(
    name = "ck",
    version,
    about = "Plan and simulate certification test sessions"
)]
struct Cli {
    /// Log filter, e.g. `debug` or `ck_core=trace` (defaults to RUST_LOG, then `warn`)
    #[arg(long, global = true)]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Validate every unit in a catalog
    Check(check::CheckArgs),
    /// Show the run list and why each job is not ready
    Plan(plan::PlanArgs),
    /// Feed scripted results through a session
    Simulate(simulate::SimulateArgs),
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    setup_logging(cli.log_level.as_deref());

    match cli.command {
        Commands::Check(args) => check::handle(args),
        Commands::Plan(args) => plan::handle(args),
        Commands::Simulate(args) => simulate::handle(args),
    }
}

fn setup_logging(level: Option<&str>) {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    let filter = match level {
        Some(level) => EnvFilter::new(level),
        None => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr).with_target(false))
        .init();
}
