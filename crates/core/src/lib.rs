// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! ck-core: session state controller for certification test suites
//!
//! This crate provides:
//! - Job definitions with typed dependency declarations
//! - Resource records, the paragraph parser that produces them and the
//!   requirement expressions evaluated against them
//! - Job templates expanded at runtime against resource records
//! - The session state (single source of truth) and the controller that
//!   computes dependency sets, readiness inhibitors and template expansion
//! - A dependency solver that orders the desired jobs into a run list

pub mod clock;
pub mod controller;
pub mod depmgr;
pub mod inhibitor;
pub mod job;
pub mod resource;
pub mod result;
pub mod session;
pub mod unit;

// Re-exports
pub use clock::{Clock, FakeClock, SystemClock};
pub use controller::{
    Checkpoint, ControllerConfig, EdgeType, SessionStateController, AUTO_SUSPEND_FLAG,
    AUTO_SUSPEND_JOB_ID, MANUAL_SUSPEND_FLAG, MANUAL_SUSPEND_JOB_ID,
};
pub use depmgr::{DependencyProblem, DependencySolver, Resolution};
pub use inhibitor::{InhibitionCause, JobReadinessInhibitor};
pub use job::{JobDefinition, Plugin, RawJob, Sibling};
pub use resource::expression::{
    EvaluationError, ResourceExpression, ResourceProgram, ResourceProgramError,
};
pub use resource::{Resource, ResourceMap};
pub use result::{IoLogRecord, IoStream, JobResult, Outcome};
pub use session::{
    JobState, SessionEvent, SessionMetadata, SessionState, FLAG_BOOTSTRAPPING, FLAG_INCOMPLETE,
    FLAG_STRICT_TEMPLATE_EXPANSION, FLAG_SUBMITTED,
};
pub use unit::template::{Candidate, RawTemplate, TemplateEngine, TemplateError, TemplateUnit};
pub use unit::validation::{Finding, Severity};
pub use unit::{Inserted, InvalidJob, RegistryError, Unit, UnitRegistry};
