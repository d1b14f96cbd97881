// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use ck_core::{Plugin, TemplateEngine};
use yare::parameterized;

const SAMPLE_CATALOG: &str = r#"
[session]
title = "Laptop certification"
strict-template-expansion = true
desired = ["disk/detect", "wireless/scan"]

[[checkpoint]]
job = "suspend/advanced"
flag = "before-suspend"

[[job]]
id = "device"
plugin = "resource"
command = "udev_resource.py"

[[job]]
id = "disk/detect"
summary = "Detect disks"
command = "lsblk"
depends = ["device"]
requires = "device.category == 'DISK'"

[[job]]
id = "wireless/scan"
command = "iw dev wlan0 scan"
after = "disk/detect, device"
flags = "before-suspend also-reportable"

[[template]]
template-resource = "device"
template-filter = "device.category == 'DISK'"
template-engine = "jinja2"
id = "disk/stats_{{ name }}"
command = "cat /sys/block/{{ name }}/stat"
"#;

#[test]
fn parse_sample_catalog() {
    let catalog = parse_catalog(SAMPLE_CATALOG).unwrap();

    assert_eq!(catalog.session.title.as_deref(), Some("Laptop certification"));
    assert!(catalog.session.strict_template_expansion);
    assert_eq!(
        catalog.checkpoints,
        Some(vec![CheckpointDef {
            job: "suspend/advanced".to_string(),
            flag: "before-suspend".to_string(),
        }])
    );
    assert_eq!(catalog.jobs.len(), 3);
    assert_eq!(catalog.templates.len(), 1);

    let device = catalog.get_job("device").unwrap();
    assert_eq!(device.plugin(), Ok(Plugin::Resource));

    let detect = catalog.get_job("disk/detect").unwrap();
    assert!(detect.direct_dependencies().contains("device"));

    let scan = catalog.get_job("wireless/scan").unwrap();
    assert_eq!(scan.declared_after_dependencies().len(), 2);
    assert!(scan.has_flag("before-suspend"));

    let template = catalog.get_template("disk/stats_{{ name }}").unwrap();
    assert_eq!(template.resource_id(), "device");
    assert_eq!(template.engine(), TemplateEngine::Jinja2);
}

#[test]
fn empty_catalog_is_valid() {
    let catalog = parse_catalog("").unwrap();
    assert!(catalog.jobs.is_empty());
    assert!(catalog.templates.is_empty());
    assert!(catalog.checkpoints.is_none());
}

#[test]
fn toml_syntax_error() {
    let err = parse_catalog("[[job]\nid = 'a'").unwrap_err();
    assert!(matches!(err, CatalogError::Toml(_)));
}

#[test]
fn unknown_top_level_table_is_rejected() {
    let err = parse_catalog("[pipeline.build]\nname = 'x'\n").unwrap_err();
    assert!(matches!(err, CatalogError::Toml(_)));
}

#[parameterized(
    two_jobs = { "[[job]]\nid = 'a'\n[[job]]\nid = 'a'\n" },
    job_and_template = {
        "[[job]]\nid = 'r'\nplugin = 'resource'\n[[template]]\ntemplate-id = 'r'\ntemplate-resource = 'r'\nid = 'x_{a}'\n"
    },
)]
fn duplicate_ids_are_rejected(content: &str) {
    let err = parse_catalog(content).unwrap_err();
    assert!(matches!(err, CatalogError::DuplicateId(_)), "got {err:?}");
}

#[test]
fn template_bound_to_unknown_job() {
    let err = parse_catalog("[[template]]\ntemplate-resource = 'ghost'\nid = 't_{a}'\n").unwrap_err();
    assert_eq!(
        err.to_string(),
        "template t_{a} is bound to unknown job 'ghost'"
    );
}

#[test]
fn template_bound_to_non_resource_job() {
    let content = "[[job]]\nid = 'shell'\ncommand = 'true'\n[[template]]\ntemplate-resource = 'shell'\nid = 't_{a}'\n";
    let err = parse_catalog(content).unwrap_err();
    assert!(matches!(err, CatalogError::NotAResource { .. }));
}

#[test]
fn load_from_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("catalog.toml");
    std::fs::write(&path, SAMPLE_CATALOG).unwrap();
    let catalog = load_catalog_file(&path).unwrap();
    assert_eq!(catalog.jobs.len(), 3);
}

#[test]
fn missing_file_reports_path() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("missing.toml");
    let err = load_catalog_file(&path).unwrap_err();
    assert!(matches!(err, CatalogError::Io { .. }));
    assert!(err.to_string().contains("missing.toml"));
}
