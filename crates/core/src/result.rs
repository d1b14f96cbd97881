// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Job results exchanged with the job runner.
//!
//! A result is replaceable: observing a new result for a job id fully
//! overwrites the previous one.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Outcome of a job run.
///
/// `None` is reserved for "no attempt yet" or "result withheld".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Outcome {
    #[default]
    None,
    Pass,
    Fail,
    Skip,
    NotSupported,
    NotImplemented,
    Undecided,
    Crash,
}

impl Outcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            Outcome::None => "none",
            Outcome::Pass => "pass",
            Outcome::Fail => "fail",
            Outcome::Skip => "skip",
            Outcome::NotSupported => "not-supported",
            Outcome::NotImplemented => "not-implemented",
            Outcome::Undecided => "undecided",
            Outcome::Crash => "crash",
        }
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown outcome: {0}")]
pub struct UnknownOutcome(pub String);

impl FromStr for Outcome {
    type Err = UnknownOutcome;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().replace('_', "-").as_str() {
            "none" => Ok(Outcome::None),
            "pass" => Ok(Outcome::Pass),
            "fail" => Ok(Outcome::Fail),
            "skip" => Ok(Outcome::Skip),
            "not-supported" => Ok(Outcome::NotSupported),
            "not-implemented" => Ok(Outcome::NotImplemented),
            "undecided" => Ok(Outcome::Undecided),
            "crash" => Ok(Outcome::Crash),
            other => Err(UnknownOutcome(other.to_string())),
        }
    }
}

/// Stream a captured chunk of output came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IoStream {
    Stdout,
    Stderr,
}

/// One captured chunk of job output.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IoLogRecord {
    /// Seconds since the previous record
    pub delay: f64,
    pub stream: IoStream,
    /// Raw bytes, not necessarily valid UTF-8
    pub data: Vec<u8>,
}

/// Result of a single job run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct JobResult {
    pub outcome: Outcome,
    #[serde(default)]
    pub io_log: Vec<IoLogRecord>,
    #[serde(default)]
    pub comments: Option<String>,
    #[serde(default)]
    pub return_code: Option<i32>,
}

impl JobResult {
    /// Create a result with the given outcome and no output.
    pub fn new(outcome: Outcome) -> Self {
        Self {
            outcome,
            ..Self::default()
        }
    }

    /// Append `text` to the log as stdout, one record per line.
    pub fn with_stdout(self, text: &str) -> Self {
        self.with_output(IoStream::Stdout, text.as_bytes())
    }

    /// Append `text` to the log as stderr, one record per line.
    pub fn with_stderr(self, text: &str) -> Self {
        self.with_output(IoStream::Stderr, text.as_bytes())
    }

    /// Append raw bytes to the log, split after each newline.
    pub fn with_output(mut self, stream: IoStream, bytes: &[u8]) -> Self {
        for line in bytes.split_inclusive(|b| *b == b'\n') {
            self.io_log.push(IoLogRecord {
                delay: 0.0,
                stream,
                data: line.to_vec(),
            });
        }
        self
    }

    pub fn with_comments(mut self, comments: impl Into<String>) -> Self {
        self.comments = Some(comments.into());
        self
    }

    pub fn with_return_code(mut self, code: i32) -> Self {
        self.return_code = Some(code);
        self
    }

    /// All stdout chunks concatenated and decoded, replacing invalid UTF-8.
    pub fn stdout_text(&self) -> String {
        let bytes: Vec<u8> = self
            .io_log
            .iter()
            .filter(|record| record.stream == IoStream::Stdout)
            .flat_map(|record| record.data.iter().copied())
            .collect();
        String::from_utf8_lossy(&bytes).into_owned()
    }
}
