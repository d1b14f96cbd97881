//! Shared helpers for CLI specs.

#![allow(dead_code)]

use assert_cmd::Command;
use predicates::Predicate;
use std::path::Path;
use tempfile::TempDir;

/// Resource job, a job that needs its data and a template bound to it.
pub const DEVICE_CATALOG: &str = r#"
[[job]]
id = "device"
plugin = "resource"
command = "udev_resource"
summary = "Collect devices"

[[job]]
id = "disk/detect"
command = "lsblk"
summary = "Detect disks"
requires = "device.category == 'DISK'"

[[template]]
template-resource = "device"
template-filter = "device.category == 'DISK'"
id = "disk/read_{name}"
command = "read {name}"
summary = "Read {name}"
"#;

/// A scratch directory holding catalogs and result scripts.
pub struct Project {
    dir: TempDir,
}

impl Project {
    pub fn empty() -> Self {
        Self {
            dir: tempfile::tempdir().unwrap(),
        }
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// Write a file relative to the project root, creating parent dirs.
    pub fn file(&self, path: &str, content: &str) {
        let full = self.dir.path().join(path);
        if let Some(parent) = full.parent() {
            std::fs::create_dir_all(parent).unwrap();
        }
        std::fs::write(full, content).unwrap();
    }

    /// A `ck` invocation running inside the project.
    pub fn ck(&self) -> CliBuilder {
        CliBuilder::new(self.dir.path())
    }
}

pub fn cli() -> CliBuilder {
    CliBuilder::new(&std::env::temp_dir())
}

pub struct CliBuilder {
    cmd: Command,
}

impl CliBuilder {
    fn new(dir: &Path) -> Self {
        let mut cmd = Command::new(env!("CARGO_BIN_EXE_ck"));
        cmd.current_dir(dir).env_remove("RUST_LOG");
        Self { cmd }
    }

    pub fn args(mut self, args: &[&str]) -> Self {
        self.cmd.args(args);
        self
    }

    /// Run and require a zero exit status.
    pub fn passes(mut self) -> RunAssert {
        let output = self.cmd.output().unwrap();
        let run = RunAssert::from(output);
        assert!(
            run.success,
            "expected success, got failure\nstdout:\n{}\nstderr:\n{}",
            run.stdout, run.stderr
        );
        run
    }

    /// Run and require a non-zero exit status.
    pub fn fails(mut self) -> RunAssert {
        let output = self.cmd.output().unwrap();
        let run = RunAssert::from(output);
        assert!(
            !run.success,
            "expected failure, got success\nstdout:\n{}\nstderr:\n{}",
            run.stdout, run.stderr
        );
        run
    }
}

pub struct RunAssert {
    success: bool,
    stdout: String,
    stderr: String,
}

impl From<std::process::Output> for RunAssert {
    fn from(output: std::process::Output) -> Self {
        Self {
            success: output.status.success(),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        }
    }
}

impl RunAssert {
    pub fn stdout(&self) -> String {
        self.stdout.clone()
    }

    pub fn stdout_eq(self, expected: &str) -> Self {
        similar_asserts::assert_eq!(self.stdout, expected);
        self
    }

    pub fn stdout_has(self, needle: &str) -> Self {
        assert!(
            self.stdout.contains(needle),
            "stdout does not contain {needle:?}\nstdout:\n{}",
            self.stdout
        );
        self
    }

    pub fn stdout_lacks(self, needle: &str) -> Self {
        assert!(
            !self.stdout.contains(needle),
            "stdout unexpectedly contains {needle:?}\nstdout:\n{}",
            self.stdout
        );
        self
    }

    pub fn stderr_has(self, needle: &str) -> Self {
        assert!(
            predicates::str::contains(needle).eval(&self.stderr),
            "stderr does not contain {needle:?}\nstderr:\n{}",
            self.stderr
        );
        self
    }

    pub fn json(&self) -> serde_json::Value {
        serde_json::from_str(&self.stdout).unwrap()
    }
}
