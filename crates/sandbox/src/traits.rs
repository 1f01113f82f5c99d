// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `Sandbox` and `SandboxManager` capability traits.

use async_trait::async_trait;
use flowforge_core::{CommandResult, EngineError, JobResult};
use std::collections::HashMap;
use std::path::Path;

/// Well-known in-sandbox directory created on every sandbox, standing in
/// for a prior implementation's `RIVER_ROOT`.
pub const SANDBOX_STATE_DIR: &str = "/flow";

/// Well-known in-sandbox path a `JobResult` blob is written to and read
/// from.
pub const JOB_RESULT_PATH: &str = "/flow/job_result";

/// Default repository prefix for sandbox snapshot tags.
pub const DEFAULT_TAG_PREFIX: &str = "flow-sandbox";

/// Configuration handed to `SandboxManager::create`.
#[derive(Debug, Clone)]
pub struct SandboxConfig {
    /// Base image/template to start the sandbox from.
    pub image: String,
}

impl SandboxConfig {
    pub fn new(image: impl Into<String>) -> Self {
        Self { image: image.into() }
    }
}

/// A single isolated execution environment. Two live sandboxes are never
/// the same value — `Sandbox` is an opaque capability, not a `Copy` handle.
#[async_trait]
pub trait Sandbox: Send + Sync {
    /// Runtime-assigned identifier (e.g. a container id).
    fn id(&self) -> &str;

    /// The immutable tag of the last snapshot taken of this sandbox, if
    /// any. Unset means never snapshotted.
    fn snapshot_tag(&self) -> Option<String>;

    /// Record the tag of a snapshot just taken. Called by the owning
    /// `SandboxManager` after `take_snapshot` succeeds; not meant to be
    /// called by Job/Task code directly. Implementations store this behind
    /// interior mutability since the snapshot can be set after the sandbox
    /// was handed out as a shared capability.
    fn set_snapshot_tag(&self, tag: String);

    /// Run a command inside the sandbox. `env` keys/values are safely
    /// quoted on the way in; the command body itself runs through a shell
    /// inside the sandbox.
    async fn execute(
        &self,
        command: &str,
        cwd: Option<&Path>,
        env: &HashMap<String, String>,
    ) -> Result<CommandResult, EngineError>;
}

/// Owns sandbox lifecycle and the fingerprint-keyed snapshot cache.
///
/// Concurrency: the trait itself makes no serialization guarantee across
/// independent sandboxes — implementations are assumed thread-safe for
/// independent sandboxes; callers must serialize two operations on the
/// *same* sandbox.
#[async_trait]
pub trait SandboxManager: Send + Sync {
    /// Start a fresh sandbox from `config.image`, then create
    /// [`SANDBOX_STATE_DIR`] inside it for engine metadata.
    async fn create(&self, config: &SandboxConfig) -> Result<Box<dyn Sandbox>, EngineError>;

    /// Start a new sandbox initialized from `source`'s snapshot. Fails with
    /// `NoSnapshot` if `source` was never snapshotted.
    async fn fork(&self, source: &dyn Sandbox) -> Result<Box<dyn Sandbox>, EngineError>;

    /// Tear down a sandbox. Must be called on every exit path from the
    /// owning Job's `run`.
    async fn destroy(&self, sandbox: Box<dyn Sandbox>) -> Result<(), EngineError>;

    /// Persist the sandbox's current state under a cache key derived from
    /// `fingerprint`; returns the tag and sets it on `sandbox`. Fails with
    /// `SnapshotFailed` on underlying error.
    async fn take_snapshot(
        &self,
        sandbox: &dyn Sandbox,
        fingerprint: &str,
    ) -> Result<String, EngineError>;

    /// True iff a snapshot tagged with `fingerprint` is resolvable by the
    /// runtime.
    async fn snapshot_exists(&self, fingerprint: &str) -> Result<bool, EngineError>;

    /// Serialize `result` with the same JSON encoder the Fingerprinter's
    /// callers use, base64-encode it, and write it to [`JOB_RESULT_PATH`]
    /// inside `sandbox` — base64 over a single shell line avoids quoting
    /// issues.
    async fn write_job_result(
        &self,
        sandbox: &dyn Sandbox,
        result: &JobResult,
    ) -> Result<(), EngineError>;

    /// Instantiate a transient container from the snapshot tagged with
    /// `fingerprint`, read and base64-decode [`JOB_RESULT_PATH`], and
    /// deserialize the `JobResult`.
    async fn read_job_result(&self, fingerprint: &str) -> Result<JobResult, EngineError>;

    /// The cache tag for a given fingerprint: a pure function of the
    /// fingerprint string.
    fn tag_for(&self, fingerprint: &str) -> String;
}

#[cfg(test)]
#[path = "traits_tests.rs"]
mod tests;
