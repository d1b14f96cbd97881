//! CLI error specs
//!
//! Verify failures exit non-zero with a useful message.

use crate::prelude::*;

#[test]
fn missing_command_prints_usage() {
    cli().args(&[]).fails().stderr_has("Usage");
}

#[test]
fn missing_catalog_names_the_file() {
    let temp = Project::empty();
    temp.ck()
        .args(&["plan", "missing.toml"])
        .fails()
        .stderr_has("cannot load catalog missing.toml");
}

#[test]
fn invalid_toml_is_reported() {
    let temp = Project::empty();
    temp.file("catalog.toml", "[[job]\nid = 'a'\n");
    temp.ck()
        .args(&["check", "catalog.toml"])
        .fails()
        .stderr_has("TOML parse error");
}

#[test]
fn template_bound_to_plain_job_is_rejected() {
    let temp = Project::empty();
    temp.file(
        "catalog.toml",
        "[[job]]\nid = 'shell'\ncommand = 'true'\n\n[[template]]\ntemplate-resource = 'shell'\nid = 't_{x}'\n",
    );
    temp.ck()
        .args(&["plan", "catalog.toml"])
        .fails()
        .stderr_has("which is not a resource job");
}

#[test]
fn result_for_unknown_job_is_rejected() {
    let temp = Project::empty();
    temp.file("catalog.toml", DEVICE_CATALOG);
    temp.file("results.toml", "[[result]]\njob = 'ghost'\noutcome = 'pass'\n");
    temp.ck()
        .args(&["simulate", "catalog.toml", "--results", "results.toml"])
        .fails()
        .stderr_has("result #1: unknown job 'ghost'");
}

#[test]
fn unknown_outcome_is_rejected() {
    let temp = Project::empty();
    temp.file("catalog.toml", DEVICE_CATALOG);
    temp.file("results.toml", "[[result]]\njob = 'device'\noutcome = 'maybe'\n");
    temp.ck()
        .args(&["simulate", "catalog.toml", "--results", "results.toml"])
        .fails()
        .stderr_has("cannot parse results");
}
