// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! Job catalog parsing and session setup

mod catalog;
mod parser;

pub use catalog::{Catalog, CheckpointDef, SessionSettings};
pub use parser::{load_catalog_file, parse_catalog, CatalogError};
