// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `JobResult` — the outcome of a Job's `run()`, possibly reused from a cache.

use crate::entity::JobId;
use crate::status::Status;
use serde::{Deserialize, Serialize};

/// The settled outcome of a Job, whether produced by a fresh execution or
/// reused from a prior snapshot.
///
/// `origin_id` is the identity of the Job whose *original, uncached*
/// execution produced this result. For a fresh run it equals the running
/// Job's own id; for a cache hit or an upstream-failure Skip it is copied
/// from whichever result is being reused/propagated.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobResult {
    pub status: Status,
    pub origin_id: JobId,
    /// Opaque base64-free value produced by `main`, if any. Stored as JSON
    /// so a `Job::<T>` can carry arbitrary serializable payloads without the
    /// sandbox-persisted blob format depending on the concrete type.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_kind: Option<String>,
}

impl JobResult {
    pub fn success(origin_id: JobId, value: Option<serde_json::Value>) -> Self {
        Self { status: Status::Success, origin_id, value, error: None, error_kind: None }
    }

    pub fn failed(origin_id: JobId, error: impl Into<String>, error_kind: impl Into<String>) -> Self {
        Self {
            status: Status::Failed,
            origin_id,
            value: None,
            error: Some(error.into()),
            error_kind: Some(error_kind.into()),
        }
    }

    pub fn skipped(origin_id: JobId) -> Self {
        Self { status: Status::Skipped, origin_id, value: None, error: None, error_kind: None }
    }

    /// True iff `status == Success`.
    pub fn ok(&self) -> bool {
        self.status == Status::Success
    }

    /// True iff this result was reused from a prior, distinct Job's
    /// execution rather than produced by the current Job's own run, i.e.
    /// `origin_id != current_id`. The caller supplies `current_id` because
    /// `JobResult` itself doesn't know which Job it's currently attached to
    /// (it may be handed to several in sequence as a Skip propagates
    /// downstream).
    pub fn is_cache(&self, current_id: JobId) -> bool {
        self.origin_id != current_id
    }

    /// A result is eligible to be persisted to the snapshot cache only when
    /// it is a successful, freshly-produced result.
    pub fn should_cache(&self, current_id: JobId) -> bool {
        self.ok() && !self.is_cache(current_id)
    }
}

#[cfg(test)]
#[path = "result_tests.rs"]
mod tests;
