// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Resource records and the resource map.
//!
//! A resource job prints paragraphs of `key: value` lines. Each paragraph
//! becomes one [`Resource`]. The session keeps every resource job's records
//! in a [`ResourceMap`] keyed by the job id, and requirement expressions are
//! evaluated against that map.
//!
//! - **rfc822**: paragraph record parser
//! - **expression**: requirement expressions and programs

pub mod expression;
pub mod rfc822;

use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;

/// Resource id (the producing job's id) to its records.
pub type ResourceMap = BTreeMap<String, Vec<Resource>>;

/// An immutable mapping of string keys to string values.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct Resource {
    data: BTreeMap<String, String>,
}

impl Resource {
    pub fn new(data: BTreeMap<String, String>) -> Self {
        Self { data }
    }

    /// The record stored when a resource job produced no records at all.
    ///
    /// Attribute lookups against it fail with "attribute missing" rather
    /// than the resource looking like it never ran.
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.data.get(key).map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.data.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn as_map(&self) -> &BTreeMap<String, String> {
        &self.data
    }
}

impl From<BTreeMap<String, String>> for Resource {
    fn from(data: BTreeMap<String, String>) -> Self {
        Self::new(data)
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for Resource {
    fn from_iter<T: IntoIterator<Item = (K, V)>>(iter: T) -> Self {
        Self {
            data: iter
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}

impl fmt::Display for Resource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("{")?;
        for (i, (k, v)) in self.data.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{}: {:?}", k, v)?;
        }
        f.write_str("}")
    }
}

/// True when `records` is exactly the empty-record sentinel.
pub fn is_empty_sentinel(records: &[Resource]) -> bool {
    matches!(records, [only] if only.is_empty())
}
