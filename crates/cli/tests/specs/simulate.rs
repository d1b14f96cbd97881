//! Simulate specs
//!
//! Verify `ck simulate` feeds results through a session, expanding
//! templates from resource output.

use crate::prelude::*;

const TWO_DEVICES: &str = r#"
[[result]]
job = "device"
outcome = "pass"
stdout = """
category: DISK
name: sda

category: NETWORK
name: eth0
"""
"#;

fn simulate(temp: &Project, extra: &[&str]) -> CliBuilder {
    let mut args = vec!["simulate", "catalog.toml", "--results", "results.toml"];
    args.extend_from_slice(extra);
    temp.ck().args(&args)
}

#[test]
fn resource_output_generates_and_selects_jobs() {
    let temp = Project::empty();
    temp.file("catalog.toml", DEVICE_CATALOG);
    temp.file("results.toml", TWO_DEVICES);

    simulate(&temp, &[]).passes().stdout_eq(
        "device: pass
disk/detect: none
disk/read_sda: none
generated disk/read_sda (job) via device
resource device: 2 record(s)
",
    );
}

#[test]
fn unmet_requirement_is_reported() {
    let temp = Project::empty();
    temp.file("catalog.toml", DEVICE_CATALOG);
    temp.file(
        "results.toml",
        "[[result]]\njob = 'device'\noutcome = 'pass'\nstdout = \"category: NETWORK\\nname: eth0\\n\"\n",
    );

    simulate(&temp, &[]).passes().stdout_eq(
        "device: pass
disk/detect: none [failed-resource (device: device.category == 'DISK')]
resource device: 1 record(s)
",
    );
}

#[test]
fn fake_resources_expand_each_template_once() {
    let temp = Project::empty();
    temp.file("catalog.toml", DEVICE_CATALOG);
    temp.file(
        "results.toml",
        "[[result]]\njob = 'device'\noutcome = 'pass'\nstdout = \"category: NETWORK\\nname: eth0\\n\"\n",
    );

    simulate(&temp, &["--fake-resources"]).passes().stdout_eq(
        "device: pass
disk/detect: none [failed-resource (device: device.category == 'DISK')]
disk/read_name: none
generated disk/read_name (job) via device
resource device: 1 record(s)
",
    );
}

#[test]
fn failed_dependency_blocks_dependents() {
    let temp = Project::empty();
    temp.file(
        "catalog.toml",
        "[[job]]\nid = 'b'\ncommand = 'true'\ndepends = 'a'\n\n[[job]]\nid = 'a'\ncommand = 'true'\n",
    );
    temp.file(
        "results.toml",
        "[[result]]\njob = 'a'\noutcome = 'fail'\ncomments = 'broken cable'\n",
    );

    simulate(&temp, &[])
        .passes()
        .stdout_eq("a: fail\nb: none [failed-dep (a)]\n");
}

#[test]
fn strict_expansion_keeps_invalid_jobs_unselected() {
    let temp = Project::empty();
    temp.file(
        "catalog.toml",
        r#"
[session]
strict-template-expansion = true

[[job]]
id = "device"
plugin = "resource"
command = "udev_resource"

[[template]]
template-resource = "device"
id = "disk/read_{name}"
command = "read {path}"
"#,
    );
    temp.file(
        "results.toml",
        "[[result]]\njob = 'device'\noutcome = 'pass'\nstdout = 'name: sda'\n",
    );

    simulate(&temp, &[])
        .passes()
        .stdout_has("disk/read_sda: none [undesired]\n")
        .stdout_has("  invalid: missing template parameter 'path'\n")
        .stdout_has("generated disk/read_sda (invalid-job) via device\n");
}

#[test]
fn session_events_are_logged_at_debug() {
    let temp = Project::empty();
    temp.file("catalog.toml", DEVICE_CATALOG);
    temp.file("results.toml", TWO_DEVICES);

    simulate(&temp, &["--log-level", "debug"])
        .passes()
        .stderr_has("session event")
        .stderr_has("JobResultChanged");
}

#[test]
fn json_output() {
    let temp = Project::empty();
    temp.file("catalog.toml", DEVICE_CATALOG);
    temp.file("results.toml", TWO_DEVICES);

    let json = simulate(&temp, &["--format", "json"]).passes().json();
    assert_eq!(json["jobs"][0]["id"], "device");
    assert_eq!(json["jobs"][0]["outcome"], "pass");
    assert_eq!(json["jobs"][0]["attempts"], 1);
    assert_eq!(json["jobs"][2]["via"], "device");
    assert_eq!(json["generated"][0]["kind"], "job");
    assert_eq!(json["resources"]["device"], 2);
}
