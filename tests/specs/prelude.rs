// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Shared fixtures for the workspace-level behavioral tests: a capturing
//! `Write` sink, a scripted `JobBody`, and a `Flow` builder wired to an
//! in-memory sandbox manager + local executor, matching the per-crate test
//! doubles in `flowforge-engine`'s own `job_tests.rs` / `flow_tests.rs` but
//! exposed here for tests that span multiple crates.

#![allow(dead_code)]

use async_trait::async_trait;
use flowforge_core::{EngineError, FakeClock, Fingerprinter, StatusRecord, StatusWriter};
use flowforge_engine::{Flow, FlowBuilder, Job, JobBody, RunDeps};
use flowforge_exec::LocalExecutor;
use flowforge_sandbox::InMemorySandboxManager;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex as StdMutex};

/// Resolve a workspace binary for the black-box CLI specs.
///
/// `assert_cmd::Command::cargo_bin` only resolves binaries that live in the
/// *current* package's own `[[bin]]` targets — `flowforge` belongs to
/// `crates/cli`, a sibling workspace member, so this looks the binary up
/// directly instead: the standard `target/debug` directory, with a
/// fallback resolved relative to the test binary itself for
/// coverage/worktree builds where `CARGO_MANIFEST_DIR` can point somewhere
/// stale.
pub fn binary_path(name: &str) -> PathBuf {
    let manifest_dir = Path::new(env!("CARGO_MANIFEST_DIR"));
    let standard = manifest_dir.join("target/debug").join(name);
    if standard.exists() {
        return standard;
    }
    if let Ok(exe) = std::env::current_exe() {
        if let Some(debug_dir) = exe.parent().and_then(|d| d.parent()) {
            let fallback = debug_dir.join(name);
            if fallback.exists() {
                return fallback;
            }
        }
    }
    standard
}

/// An `assert_cmd::Command` over the `flowforge` binary.
pub fn flowforge_cmd() -> assert_cmd::Command {
    assert_cmd::Command::from_std(std::process::Command::new(binary_path("flowforge")))
}

#[derive(Clone, Default)]
pub struct SharedBuf(Arc<StdMutex<Vec<u8>>>);

impl std::io::Write for SharedBuf {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }
    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

impl SharedBuf {
    pub fn records(&self) -> Vec<StatusRecord> {
        String::from_utf8(self.0.lock().unwrap().clone())
            .unwrap()
            .lines()
            .map(|line| serde_json::from_str(line).unwrap())
            .collect()
    }
}

/// Bundles the `RunDeps` a bare `Job::run` call needs, for tests that don't
/// go through a `Flow`.
pub fn test_deps(buf: SharedBuf, sandbox_manager: Arc<InMemorySandboxManager>) -> RunDeps {
    RunDeps {
        sandbox_manager,
        fingerprinter: Arc::new(Fingerprinter::new("specs-env")),
        executor: Arc::new(LocalExecutor::new()),
        writer: StatusWriter::new(buf),
        clock: Arc::new(FakeClock::new()),
    }
}

/// A `Flow` over a single `"default"` outlet, writing to `buf`, sharing
/// `manager` so separate `Flow`s in the same test can observe each other's
/// cached snapshots across a second run with the same fingerprint.
pub fn flow_with(buf: SharedBuf, manager: Arc<InMemorySandboxManager>, outlet: Arc<Job>) -> Arc<Flow> {
    FlowBuilder::new("specs-flow", manager, Arc::new(LocalExecutor::new()))
        .writer(StatusWriter::new(buf))
        .outlet("default", outlet)
        .build()
}

/// A minimal scripted [`JobBody`]: a fixed `cache_key`, an optional shared
/// run counter, and one of three canned actions.
pub struct ScriptedBody {
    cache_key: String,
    runs: Option<Arc<AtomicUsize>>,
    action: ScriptedAction,
}

pub enum ScriptedAction {
    Succeed,
    Fail(String),
    RunTask(String),
}

impl ScriptedBody {
    pub fn succeed(cache_key: impl Into<String>) -> Self {
        Self { cache_key: cache_key.into(), runs: None, action: ScriptedAction::Succeed }
    }

    pub fn fail(cache_key: impl Into<String>, message: impl Into<String>) -> Self {
        Self { cache_key: cache_key.into(), runs: None, action: ScriptedAction::Fail(message.into()) }
    }

    pub fn run_task(cache_key: impl Into<String>, command: impl Into<String>) -> Self {
        Self { cache_key: cache_key.into(), runs: None, action: ScriptedAction::RunTask(command.into()) }
    }

    /// Attach a shared counter `main()` increments on every invocation, so a
    /// test can assert a fan-in upstream ran exactly once.
    pub fn counted(mut self, runs: Arc<AtomicUsize>) -> Self {
        self.runs = Some(runs);
        self
    }
}

#[async_trait]
impl JobBody for ScriptedBody {
    fn cache_key(&self) -> String {
        self.cache_key.clone()
    }

    async fn main(&self) -> Result<Option<serde_json::Value>, EngineError> {
        if let Some(runs) = &self.runs {
            runs.fetch_add(1, Ordering::SeqCst);
        }
        match &self.action {
            ScriptedAction::Succeed => Ok(None),
            ScriptedAction::Fail(message) => Err(EngineError::InvalidArgument(message.clone())),
            ScriptedAction::RunTask(command) => {
                flowforge_engine::bash(command, flowforge_engine::TaskOptions::new()).await?;
                Ok(None)
            }
        }
    }
}

/// A `SandboxCreator` that asks `manager` for a fresh sandbox tagged with
/// `image`, the same shape `flowforge-engine`'s own tests use, exposed here
/// since the Flow-level `default_sandbox_creator` can't be used before the
/// `Flow` it would close over exists — an upstream Job needs a sandbox
/// creator before any `Flow` is built.
pub fn sandboxed_creator(manager: Arc<InMemorySandboxManager>, image: &str) -> flowforge_engine::SandboxCreator {
    let image = image.to_string();
    Arc::new(move || {
        let manager = manager.clone();
        let image = image.clone();
        Box::pin(async move { manager.create(&flowforge_sandbox::SandboxConfig::new(image)).await })
    })
}
