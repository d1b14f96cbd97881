//! Plan specs
//!
//! Verify `ck plan` orders jobs and explains readiness.

use crate::prelude::*;

#[test]
fn resource_requirement_is_pending_until_the_resource_runs() {
    let temp = Project::empty();
    temp.file("catalog.toml", DEVICE_CATALOG);
    temp.ck()
        .args(&["plan", "catalog.toml"])
        .passes()
        .stdout_eq("device: ready\ndisk/detect: pending-resource (device: device.category == 'DISK')\n");
}

#[test]
fn dependencies_run_first() {
    let temp = Project::empty();
    temp.file(
        "catalog.toml",
        "[[job]]\nid = 'b'\ncommand = 'true'\ndepends = 'a'\n\n[[job]]\nid = 'a'\ncommand = 'true'\n",
    );
    temp.ck()
        .args(&["plan", "catalog.toml"])
        .passes()
        .stdout_eq("a: ready\nb: pending-dep (a)\n");
}

#[test]
fn cycles_are_reported() {
    let temp = Project::empty();
    temp.file(
        "catalog.toml",
        "[[job]]\nid = 'a'\ncommand = 'true'\ndepends = 'b'\n\n[[job]]\nid = 'b'\ncommand = 'true'\ndepends = 'a'\n",
    );
    temp.ck()
        .args(&["plan", "catalog.toml"])
        .passes()
        .stdout_eq("b: pending-dep (a)\na: pending-dep (b)\nproblem: dependency cycle: a -> b -> a\n");
}

#[test]
fn checkpoint_waits_for_flagged_jobs() {
    let temp = Project::empty();
    temp.file(
        "catalog.toml",
        r#"
[session]
desired = ["suspend", "flagged"]

[[checkpoint]]
job = "suspend"
flag = "before-suspend"

[[job]]
id = "suspend"
command = "true"

[[job]]
id = "flagged"
command = "true"
flags = "before-suspend"
"#,
    );
    temp.ck()
        .args(&["plan", "catalog.toml"])
        .passes()
        .stdout_eq("flagged: ready\nsuspend: pending-dep (flagged)\n");
}

#[test]
fn unselected_jobs_are_left_out() {
    let temp = Project::empty();
    temp.file(
        "catalog.toml",
        "[session]\ndesired = ['a']\n\n[[job]]\nid = 'a'\ncommand = 'true'\n\n[[job]]\nid = 'other'\ncommand = 'true'\n",
    );
    temp.ck()
        .args(&["plan", "catalog.toml"])
        .passes()
        .stdout_eq("a: ready\n")
        .stdout_lacks("other");
}

#[test]
fn json_output() {
    let temp = Project::empty();
    temp.file("catalog.toml", DEVICE_CATALOG);
    let json = temp
        .ck()
        .args(&["plan", "catalog.toml", "--format", "json"])
        .passes()
        .json();
    assert_eq!(json["run_list"][0]["id"], "device");
    assert_eq!(json["run_list"][0]["ready"], true);
    let inhibitor = &json["run_list"][1]["inhibitors"][0];
    assert_eq!(inhibitor["cause"], "pending-resource");
    assert_eq!(inhibitor["related_job"], "device");
    assert_eq!(inhibitor["related_expression"], "device.category == 'DISK'");
    assert_eq!(json["problems"], serde_json::json!([]));
}
