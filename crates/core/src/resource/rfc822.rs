// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Paragraph record parser.
//!
//! Records are blocks of `key: value` lines separated by blank lines:
//!
//! ```text
//! name: sda
//! size: 512110190592
//!
//! name: sdb
//! description: first line
//!  second line
//!  .
//!  after an empty line
//! ```
//!
//! Lines starting with whitespace continue the previous value (a lone `.`
//! stands for an empty line) and lines starting with `#` are ignored.
//!
//! A malformed paragraph yields one `Err` item and the parser resumes at the
//! next paragraph, so callers can keep every well-formed record.

use std::collections::BTreeMap;
use std::str::Lines;
use thiserror::Error;

/// A single parsed paragraph.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record {
    pub data: BTreeMap<String, String>,
    /// 1-based line number where the paragraph starts
    pub line: usize,
}

/// Syntax errors, each discarding the paragraph it occurs in.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Rfc822Error {
    #[error("line {line}: unexpected non-empty line without a key: {text:?}")]
    MissingKey { line: usize, text: String },

    #[error("line {line}: continuation line before any key")]
    OrphanContinuation { line: usize },

    #[error("line {line}: duplicate key '{key}'")]
    DuplicateKey { line: usize, key: String },
}

/// Iterator over the records of a text.
pub struct Records<'a> {
    lines: Lines<'a>,
    line_no: usize,
}

/// Parse `text` into a sequence of records.
pub fn parse_records(text: &str) -> Records<'_> {
    Records {
        lines: text.lines(),
        line_no: 0,
    }
}

impl Records<'_> {
    /// Consume lines up to and including the next blank line.
    fn skip_paragraph(&mut self) {
        for line in self.lines.by_ref() {
            self.line_no += 1;
            if line.trim().is_empty() {
                break;
            }
        }
    }
}

/// Key/value under construction.
struct Pending {
    key: String,
    lines: Vec<String>,
}

impl Pending {
    fn commit(self, data: &mut BTreeMap<String, String>) {
        let value = self.lines.join("\n");
        data.insert(self.key, value.trim().to_string());
    }
}

impl Iterator for Records<'_> {
    type Item = Result<Record, Rfc822Error>;

    fn next(&mut self) -> Option<Self::Item> {
        let mut data = BTreeMap::new();
        let mut pending: Option<Pending> = None;
        let mut start = None;

        while let Some(raw) = self.lines.next() {
            self.line_no += 1;
            let line = raw.trim_end_matches('\r');

            if line.trim().is_empty() {
                if start.is_some() {
                    break;
                }
                continue;
            }
            if line.starts_with('#') {
                continue;
            }
            let start_line = *start.get_or_insert(self.line_no);

            if line.starts_with([' ', '\t']) {
                let Some(current) = pending.as_mut() else {
                    let line = self.line_no;
                    self.skip_paragraph();
                    return Some(Err(Rfc822Error::OrphanContinuation { line }));
                };
                let piece = line.trim();
                current
                    .lines
                    .push(if piece == "." { String::new() } else { piece.to_string() });
                continue;
            }

            let Some((key, value)) = line.split_once(':').filter(|(k, _)| !k.trim().is_empty())
            else {
                let err = Rfc822Error::MissingKey {
                    line: self.line_no,
                    text: line.to_string(),
                };
                self.skip_paragraph();
                return Some(Err(err));
            };

            if let Some(done) = pending.take() {
                done.commit(&mut data);
            }
            let key = key.trim().to_string();
            if data.contains_key(&key) {
                let err = Rfc822Error::DuplicateKey {
                    line: self.line_no,
                    key,
                };
                self.skip_paragraph();
                return Some(Err(err));
            }
            tracing::trace!(line = start_line, %key, "record field");
            pending = Some(Pending {
                key,
                lines: vec![value.trim().to_string()],
            });
        }

        if let Some(done) = pending.take() {
            done.commit(&mut data);
        }
        start.map(|line| Ok(Record { data, line }))
    }
}

#[cfg(test)]
#[path = "rfc822_tests.rs"]
mod tests;
