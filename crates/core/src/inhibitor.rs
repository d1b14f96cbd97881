// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Reasons a job cannot run yet

use serde::{Deserialize, Serialize};
use std::fmt;

/// Why a job is not ready.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum InhibitionCause {
    /// Not part of the run list
    Undesired,
    /// A dependency has not produced a result yet
    PendingDep,
    /// A hard dependency did not pass
    FailedDep,
    /// A resource job has not produced usable data yet
    PendingResource,
    /// Resource data is present but the requirement does not hold
    FailedResource,
    /// A salvage dependency did not fail
    NotFailedDep,
}

impl InhibitionCause {
    pub fn as_str(&self) -> &'static str {
        match self {
            InhibitionCause::Undesired => "undesired",
            InhibitionCause::PendingDep => "pending-dep",
            InhibitionCause::FailedDep => "failed-dep",
            InhibitionCause::PendingResource => "pending-resource",
            InhibitionCause::FailedResource => "failed-resource",
            InhibitionCause::NotFailedDep => "not-failed-dep",
        }
    }
}

impl fmt::Display for InhibitionCause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single reason a job is not ready, with the job or expression involved.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct JobReadinessInhibitor {
    pub cause: InhibitionCause,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub related_job: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub related_expression: Option<String>,
}

impl JobReadinessInhibitor {
    pub fn undesired() -> Self {
        Self {
            cause: InhibitionCause::Undesired,
            related_job: None,
            related_expression: None,
        }
    }

    pub fn pending_dep(job_id: impl Into<String>) -> Self {
        Self::for_job(InhibitionCause::PendingDep, job_id)
    }

    pub fn failed_dep(job_id: impl Into<String>) -> Self {
        Self::for_job(InhibitionCause::FailedDep, job_id)
    }

    pub fn not_failed_dep(job_id: impl Into<String>) -> Self {
        Self::for_job(InhibitionCause::NotFailedDep, job_id)
    }

    pub fn pending_resource(job_id: impl Into<String>, expression: impl Into<String>) -> Self {
        Self::for_resource(InhibitionCause::PendingResource, job_id, expression)
    }

    pub fn failed_resource(job_id: impl Into<String>, expression: impl Into<String>) -> Self {
        Self::for_resource(InhibitionCause::FailedResource, job_id, expression)
    }

    fn for_job(cause: InhibitionCause, job_id: impl Into<String>) -> Self {
        Self {
            cause,
            related_job: Some(job_id.into()),
            related_expression: None,
        }
    }

    fn for_resource(
        cause: InhibitionCause,
        job_id: impl Into<String>,
        expression: impl Into<String>,
    ) -> Self {
        Self {
            cause,
            related_job: Some(job_id.into()),
            related_expression: Some(expression.into()),
        }
    }
}

impl fmt::Display for JobReadinessInhibitor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.cause)?;
        match (&self.related_job, &self.related_expression) {
            (Some(job), Some(expr)) => write!(f, " ({job}: {expr})"),
            (Some(job), None) => write!(f, " ({job})"),
            (None, Some(expr)) => write!(f, " ({expr})"),
            (None, None) => Ok(()),
        }
    }
}
