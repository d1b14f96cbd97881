// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use yare::parameterized;

fn raw(id: &str) -> RawJob {
    RawJob::new(id)
}

#[parameterized(
    spaces = { "a b  c" },
    commas = { "a,b,c" },
    mixed = { " a, b\nc " },
)]
fn id_lists_split_on_whitespace_and_commas(text: &str) {
    let ids: Vec<String> = split_id_list(text).into_iter().collect();
    assert_eq!(ids, vec!["a", "b", "c"]);
}

#[test]
fn from_raw_splits_every_list_field() {
    let job = JobDefinition::from_raw(RawJob {
        depends: Some("a b".to_string()),
        after: Some("c".to_string()),
        salvages: Some("d".to_string()),
        before: Some("e, f".to_string()),
        flags: Some("simple preserve-locale".to_string()),
        ..raw("j")
    });

    assert_eq!(job.direct_dependencies().len(), 2);
    assert!(job.declared_after_dependencies().contains("c"));
    assert!(job.salvage_dependencies().contains("d"));
    assert_eq!(job.before_dependencies().len(), 2);
    assert!(job.has_flag("preserve-locale"));
    assert!(!job.has_flag("noreturn"));
}

#[parameterized(
    default_is_shell = { None, Plugin::Shell },
    resource = { Some("resource"), Plugin::Resource },
    manual = { Some("manual"), Plugin::Manual },
    interact_verify = { Some("user-interact-verify"), Plugin::UserInteractVerify },
)]
fn plugin_parses(name: Option<&str>, expected: Plugin) {
    let job = JobDefinition::from_raw(RawJob {
        plugin: name.map(str::to_string),
        ..raw("j")
    });
    assert_eq!(job.plugin(), Ok(expected));
}

#[test]
fn unknown_plugin_is_kept_as_error() {
    let job = JobDefinition::from_raw(RawJob {
        plugin: Some("telepathy".to_string()),
        ..raw("j")
    });
    assert_eq!(job.plugin().unwrap_err().0, "telepathy");
    assert!(!job.is_resource());
}

#[test]
fn only_manual_jobs_may_omit_command() {
    assert!(!Plugin::Manual.requires_command());
    assert!(Plugin::Shell.requires_command());
    assert!(Plugin::Resource.requires_command());
}

#[test]
fn after_dependencies_include_before_references() {
    let mut job = JobDefinition::from_raw(RawJob {
        after: Some("x".to_string()),
        ..raw("j")
    });
    job.add_before_reference("y");

    let after: Vec<String> = job.after_dependencies().into_iter().collect();
    assert_eq!(after, vec!["x", "y"]);
    assert!(job.declared_after_dependencies().contains("x"));
    assert!(!job.declared_after_dependencies().contains("y"));

    job.clear_before_references();
    assert_eq!(job.after_dependencies().len(), 1);
}

#[test]
fn resource_dependencies_come_from_requires() {
    let job = JobDefinition::from_raw(RawJob {
        requires: Some("package.name == 'a'\ndevice.category == 'DISK'".to_string()),
        ..raw("j")
    });
    let ids: Vec<String> = job.resource_dependencies().unwrap().into_iter().collect();
    assert_eq!(ids, vec!["device", "package"]);
}

#[test]
fn blank_requires_means_no_requirement() {
    let job = JobDefinition::from_raw(RawJob {
        requires: Some("   ".to_string()),
        ..raw("j")
    });
    assert!(job.resource_program().is_none());
    assert!(job.resource_dependencies().unwrap().is_empty());
}

#[test]
fn uncompilable_requires_is_reported() {
    let job = JobDefinition::from_raw(RawJob {
        requires: Some("package ==".to_string()),
        ..raw("j")
    });
    assert!(job.resource_dependencies().is_err());
    assert!(matches!(job.resource_program(), Some(Err(_))));
}

#[test]
fn siblings_decode_from_json() {
    let job = JobDefinition::from_raw(RawJob {
        siblings: Some(r#"[{"id": "j_after", "depends": "a b"}, {"id": "j2", "depends": ["c"]}]"#.to_string()),
        ..raw("j")
    });
    let siblings = job.siblings();
    assert_eq!(siblings.len(), 2);
    assert_eq!(siblings[0].id, "j_after");
    assert_eq!(siblings[0].depends, vec!["a", "b"]);
    assert_eq!(siblings[1].depends, vec!["c"]);
    assert!(job.siblings_error().is_none());
}

#[test]
fn malformed_siblings_are_ignored() {
    let job = JobDefinition::from_raw(RawJob {
        siblings: Some("[{not json".to_string()),
        ..raw("j")
    });
    assert!(job.siblings().is_empty());
    assert!(job.siblings_error().is_some());
}

#[test]
fn same_definition_ignores_back_edges() {
    let a = JobDefinition::new("j");
    let mut b = JobDefinition::new("j");
    b.add_before_reference("k");
    assert!(a.same_definition(&b));

    let c = JobDefinition::from_raw(RawJob {
        command: Some("true".to_string()),
        ..raw("j")
    });
    assert!(!a.same_definition(&c));
}

#[test]
fn raw_job_deserializes_lists_or_strings() {
    let job: RawJob = serde_json::from_value(serde_json::json!({
        "id": "j",
        "depends": ["a", "b"],
        "after": "c d",
        "category-id": "cat",
    }))
    .unwrap();
    assert_eq!(job.depends.as_deref(), Some("a b"));
    assert_eq!(job.after.as_deref(), Some("c d"));
    assert_eq!(job.category_id.as_deref(), Some("cat"));
    assert_eq!(job.before, None);
}
