//! Check specs
//!
//! Verify `ck check` reports validation findings.

use crate::prelude::*;

#[test]
fn clean_catalog_passes() {
    let temp = Project::empty();
    temp.file("catalog.toml", DEVICE_CATALOG);
    temp.ck()
        .args(&["check", "catalog.toml"])
        .passes()
        .stdout_eq("0 error(s), 0 warning(s)\n");
}

#[test]
fn missing_command_is_an_error() {
    let temp = Project::empty();
    temp.file(
        "catalog.toml",
        r#"
[[job]]
id = "ok"
command = "true"
summary = "Fine"

[[job]]
id = "broken"
summary = "No command"
"#,
    );
    temp.ck()
        .args(&["check", "catalog.toml"])
        .fails()
        .stdout_eq("error: broken: command: command is required for shell jobs\n1 error(s), 0 warning(s)\n")
        .stderr_has("catalog.toml has 1 error(s)");
}

#[test]
fn warnings_and_advice_do_not_fail() {
    let temp = Project::empty();
    temp.file(
        "catalog.toml",
        r#"
[[job]]
id = "r"
plugin = "resource"
command = "true"

[[template]]
template-resource = "r"
id = "fixed"
command = "true"
"#,
    );
    temp.ck()
        .args(&["check", "catalog.toml"])
        .passes()
        .stdout_has("advice: r: summary: summary is missing")
        .stdout_has("warning: fixed: id: id does not reference any parameter")
        .stdout_has("0 error(s), 1 warning(s)");
}

#[test]
fn json_output() {
    let temp = Project::empty();
    temp.file("catalog.toml", "[[job]]\nid = 'broken'\nsummary = 'x'\n");
    let json = temp
        .ck()
        .args(&["check", "catalog.toml", "--format", "json"])
        .fails()
        .json();
    assert_eq!(json["errors"], 1);
    assert_eq!(json["findings"][0]["severity"], "error");
    assert_eq!(json["findings"][0]["unit"], "broken");
    assert_eq!(json["findings"][0]["field"], "command");
}
