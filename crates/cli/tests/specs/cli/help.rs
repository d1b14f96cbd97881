//! CLI help specs
//!
//! Verify help and version output.

use crate::prelude::*;

#[test]
fn help_lists_commands() {
    cli()
        .args(&["--help"])
        .passes()
        .stdout_has("check")
        .stdout_has("plan")
        .stdout_has("simulate")
        .stdout_has("Validate every unit in a catalog");
}

#[test]
fn version_is_printed() {
    cli()
        .args(&["--version"])
        .passes()
        .stdout_has(concat!("ck ", env!("CARGO_PKG_VERSION")));
}

#[test]
fn simulate_help_documents_results_file() {
    cli()
        .args(&["simulate", "--help"])
        .passes()
        .stdout_has("--results")
        .stdout_has("--fake-resources");
}
