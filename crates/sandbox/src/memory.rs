// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! In-memory `Sandbox`/`SandboxManager` test double.
//!
//! A `test-support`-gated fake adapter, in the spirit of this workspace's
//! other fake adapters: same capability surface as [`crate::docker`],
//! backed by process memory instead of the `docker` CLI, so engine-level
//! tests don't need a container runtime available.

use crate::traits::{Sandbox, SandboxConfig, SandboxManager, DEFAULT_TAG_PREFIX};
use async_trait::async_trait;
use flowforge_core::{CommandResult, EngineError, JobResult};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

struct Snapshot {
    job_result: JobResult,
}

/// Shared state backing every `InMemorySandbox`/`InMemorySandboxManager`
/// pair produced from the same [`InMemorySandboxManager::new`] call.
#[derive(Default)]
struct Shared {
    snapshots: HashMap<String, Snapshot>,
    /// Result written via `write_job_result` before the sandbox has a
    /// snapshot tag yet, keyed by sandbox id. `take_snapshot` moves it under
    /// the real tag, mirroring the Docker-backed manager where
    /// `write_job_result` drops a file into the live container and
    /// `take_snapshot`'s `docker commit` is what actually captures it.
    pending_results: HashMap<String, JobResult>,
    /// Commands each sandbox was asked to run, in order, keyed by sandbox id
    /// — lets tests assert on dispatch without a real shell.
    executed: HashMap<String, Vec<String>>,
    next_id: u64,
}

pub struct InMemorySandboxManager {
    tag_prefix: String,
    shared: Arc<Mutex<Shared>>,
    stubs: Arc<Mutex<HashMap<String, i32>>>,
}

impl InMemorySandboxManager {
    pub fn new() -> Self {
        Self {
            tag_prefix: DEFAULT_TAG_PREFIX.into(),
            shared: Arc::new(Mutex::new(Shared::default())),
            stubs: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Force a specific command's exit behavior the next time it runs
    /// against any sandbox from this manager. Without a registered
    /// response, `execute` always returns exit code 0.
    pub fn stub_exit_code(&self, command: &str, exit_code: i32) {
        self.stubs.lock().insert(command.to_string(), exit_code);
    }

    /// Commands executed against `sandbox_id`, in dispatch order.
    pub fn executed_commands(&self, sandbox_id: &str) -> Vec<String> {
        self.shared.lock().executed.get(sandbox_id).cloned().unwrap_or_default()
    }
}

impl Default for InMemorySandboxManager {
    fn default() -> Self {
        Self::new()
    }
}

pub struct InMemorySandbox {
    id: String,
    snapshot_tag: Mutex<Option<String>>,
    shared: Arc<Mutex<Shared>>,
    stubs: Arc<Mutex<HashMap<String, i32>>>,
}

#[async_trait]
impl Sandbox for InMemorySandbox {
    fn id(&self) -> &str {
        &self.id
    }

    fn snapshot_tag(&self) -> Option<String> {
        self.snapshot_tag.lock().clone()
    }

    fn set_snapshot_tag(&self, tag: String) {
        *self.snapshot_tag.lock() = Some(tag);
    }

    async fn execute(
        &self,
        command: &str,
        _cwd: Option<&Path>,
        env: &HashMap<String, String>,
    ) -> Result<CommandResult, EngineError> {
        for key in env.keys() {
            if key.is_empty() {
                return Err(EngineError::InvalidArgument(
                    "environment key must not be empty".into(),
                ));
            }
        }
        self.shared.lock().executed.entry(self.id.clone()).or_default().push(command.to_string());
        let exit_code = self.stubs.lock().get(command).copied().unwrap_or(0);
        if exit_code == 0 {
            Ok(CommandResult::new(0, String::new(), String::new()))
        } else {
            Ok(CommandResult::new(exit_code, String::new(), format!("command failed: {command}")))
        }
    }
}

#[async_trait]
impl SandboxManager for InMemorySandboxManager {
    async fn create(&self, _config: &SandboxConfig) -> Result<Box<dyn Sandbox>, EngineError> {
        let mut shared = self.shared.lock();
        shared.next_id += 1;
        let id = format!("sandbox-{}", shared.next_id);
        drop(shared);
        Ok(Box::new(InMemorySandbox {
            id,
            snapshot_tag: Mutex::new(None),
            shared: self.shared.clone(),
            stubs: self.stubs.clone(),
        }))
    }

    async fn fork(&self, source: &dyn Sandbox) -> Result<Box<dyn Sandbox>, EngineError> {
        source.snapshot_tag().ok_or(EngineError::NoSnapshot)?;
        self.create(&SandboxConfig::new("forked")).await
    }

    async fn destroy(&self, _sandbox: Box<dyn Sandbox>) -> Result<(), EngineError> {
        Ok(())
    }

    async fn take_snapshot(
        &self,
        sandbox: &dyn Sandbox,
        fingerprint: &str,
    ) -> Result<String, EngineError> {
        let tag = self.tag_for(fingerprint);
        sandbox.set_snapshot_tag(tag.clone());
        let mut shared = self.shared.lock();
        if let Some(pending) = shared.pending_results.remove(sandbox.id()) {
            shared.snapshots.insert(tag.clone(), Snapshot { job_result: pending });
        }
        Ok(tag)
    }

    async fn snapshot_exists(&self, fingerprint: &str) -> Result<bool, EngineError> {
        let tag = self.tag_for(fingerprint);
        Ok(self.shared.lock().snapshots.contains_key(&tag))
    }

    async fn write_job_result(
        &self,
        sandbox: &dyn Sandbox,
        result: &JobResult,
    ) -> Result<(), EngineError> {
        let mut shared = self.shared.lock();
        match sandbox.snapshot_tag() {
            Some(tag) => {
                shared.snapshots.insert(tag, Snapshot { job_result: result.clone() });
            }
            None => {
                shared.pending_results.insert(sandbox.id().to_string(), result.clone());
            }
        }
        Ok(())
    }

    async fn read_job_result(&self, fingerprint: &str) -> Result<JobResult, EngineError> {
        let tag = self.tag_for(fingerprint);
        self.shared
            .lock()
            .snapshots
            .get(&tag)
            .map(|s| s.job_result.clone())
            .ok_or_else(|| EngineError::Io(std::io::Error::other(format!("no snapshot for {tag}"))))
    }

    fn tag_for(&self, fingerprint: &str) -> String {
        format!("{}:{}", self.tag_prefix, fingerprint)
    }
}

/// Seed a snapshot directly, bypassing `take_snapshot`/`write_job_result`,
/// for tests that need a pre-existing cache hit without replaying a run.
impl InMemorySandboxManager {
    pub fn seed_snapshot(&self, fingerprint: &str, result: JobResult) {
        let tag = self.tag_for(fingerprint);
        self.shared.lock().snapshots.insert(tag, Snapshot { job_result: result });
    }
}

#[cfg(test)]
#[path = "memory_tests.rs"]
mod tests;
