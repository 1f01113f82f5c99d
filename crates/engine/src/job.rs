// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `Job` and the DAG engine.
//!
//! Mirrors a prior Python implementation's `Job.run`: the
//! idempotency/cache/execute/skip state machine and the `_join`/
//! `_find_cycle_path` DFS cycle rejection are carried over structurally; the
//! ambient-context plumbing (`JobContext.__enter__`/`__exit__`,
//! `get_current_river`) is re-expressed as explicit parameters
//! ([`RunDeps`]) plus [`flowforge_core::context`]'s scoped thread-local.

use async_trait::async_trait;
use flowforge_core::{
    current_root, push_job, DependencyManifest, EngineError, EntityKind, EpochClock, Fingerprinter,
    JobId, JobResult, Status, StatusRecord, StatusWriter,
};
use flowforge_exec::CommandExecutor;
use flowforge_sandbox::{Sandbox, SandboxManager};
use parking_lot::Mutex;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

/// What a Job runs once its upstreams have settled and no cached snapshot
/// covers it. Implement this on whatever type models a Job's `main` body
/// and its captured environment — the Rust analogue of overriding `Job.main`
/// in the source's abstract base class.
#[async_trait]
pub trait JobBody: Send + Sync {
    /// Deterministic encoding of "what would behave differently" about
    /// this Job's body, fed to the [`Fingerprinter`]. Two Jobs whose bodies
    /// are behaviorally identical must return the same key.
    fn cache_key(&self) -> String;

    /// Third-party dependency versions referenced by this Job's body (the
    /// Rust analogue of a prior Python implementation's
    /// `DependencyTracker`). Defaults to empty — most Jobs don't need to
    /// distinguish themselves on dependency versions beyond their own
    /// `cache_key`.
    fn dependencies(&self) -> DependencyManifest {
        DependencyManifest::new()
    }

    /// Run the Job's body. May call [`crate::task::bash`] any number of
    /// times via the ambient Job dispatch context `run` establishes first.
    async fn main(&self) -> Result<Option<serde_json::Value>, EngineError>;
}

/// A no-argument capability that produces a fresh [`Sandbox`] for a Job
/// about to run. Built by [`crate::flow::Flow`]'s
/// `default_sandbox_creator`/`sandbox_forker`, which close over whatever
/// they need (the Flow's `SandboxManager` and config, or a source Job to
/// fork from) rather than reading it from an ambient context — a plain
/// closure passed explicitly is simpler than inventing a global singleton.
pub type SandboxCreator =
    Arc<dyn Fn() -> Pin<Box<dyn Future<Output = Result<Box<dyn Sandbox>, EngineError>> + Send>> + Send + Sync>;

/// Everything `Job::run` needs that isn't ambient: the sandbox cache, the
/// fingerprinter, a fallback command executor for Tasks that run with no
/// sandbox, the status stream, and a clock. Bundled so `run` stays a plain
/// method instead of needing half a dozen positional arguments, and so the
/// whole Job graph doesn't need to be generic over a concrete clock type
/// (see [`flowforge_core::EpochClock`]'s doc comment).
#[derive(Clone)]
pub struct RunDeps {
    pub sandbox_manager: Arc<dyn SandboxManager>,
    pub fingerprinter: Arc<Fingerprinter>,
    pub executor: Arc<dyn CommandExecutor>,
    pub writer: StatusWriter,
    pub clock: Arc<dyn EpochClock>,
}

struct JobState {
    status: Status,
    status: Status,
    /// Set the instant a `run()` call commits to executing this Job, before
    /// upstream recursion even starts. Separate from `status` (which stays
    /// `Pending` until the Job actually settles) so a second concurrent
    /// `run()` call can be rejected with `AlreadyRunning` even while the
    /// first call is still waiting on upstreams: running each Job graph as
    /// a single-threaded walk is the baseline, but nothing stops two
    /// downstream Jobs from independently calling `run` on a shared
    /// upstream.
    claimed: bool,
    result: Option<JobResult>,
    /// Tag of the snapshot that covers this Job's result, if any — kept
    /// even after the sandbox that produced it is destroyed, so
    /// `Flow::sandbox_forker(job)` can still resolve a fork source for a
    /// downstream Job that forks from it later.
    snapshot_tag: Option<String>,
}

/// A single DAG node: a name, an optional sandbox-creator capability, an
/// ordered upstream list, and the body to run once upstreams and the cache
/// have been consulted.
///
/// Always held behind `Arc` — fan-in (multiple downstream Jobs sharing one
/// upstream) and post-construction `add_upstream` calls both need shared
/// ownership and a stable identity.
pub struct Job {
    id: JobId,
    name: String,
    upstreams: Mutex<Vec<Arc<Job>>>,
    sandbox_creator: Option<SandboxCreator>,
    body: Box<dyn JobBody>,
    state: Mutex<JobState>,
}

/// Builds a [`Job`] before it's wrapped in the `Arc` every API past
/// construction operates on.
pub struct JobBuilder {
    name: String,
    body: Box<dyn JobBody>,
    sandbox_creator: Option<SandboxCreator>,
}

impl JobBuilder {
    pub fn new(name: impl Into<String>, body: impl JobBody + 'static) -> Self {
        Self { name: name.into(), body: Box::new(body), sandbox_creator: None }
    }

    pub fn sandbox_creator(mut self, creator: SandboxCreator) -> Self {
        self.sandbox_creator = Some(creator);
        self
    }

    /// Finish construction with no upstreams.
    pub fn build(self) -> Arc<Job> {
        Arc::new(Job {
            id: JobId::new(),
            name: self.name,
            upstreams: Mutex::new(Vec::new()),
            sandbox_creator: self.sandbox_creator,
            body: self.body,
            state: Mutex::new(JobState {
                status: Status::Pending,
                claimed: false,
                result: None,
                snapshot_tag: None,
            }),
        })
    }

    /// Finish construction and join each upstream in order. Fails with
    /// `CycleDetected` at the first edge that would close a loop; no
    /// StatusRecord is emitted for a construction-time failure — it is
    /// raised to the caller immediately.
    pub fn build_with_upstreams(
        self,
        upstreams: impl IntoIterator<Item = Arc<Job>>,
    ) -> Result<Arc<Job>, EngineError> {
        let job = self.build();
        for upstream in upstreams {
            job.add_upstream(upstream)?;
        }
        Ok(job)
    }
}

impl Job {
    pub fn id(&self) -> JobId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn status(&self) -> Status {
        self.state.lock().status
    }

    pub fn result(&self) -> Option<JobResult> {
        self.state.lock().result.clone()
    }

    /// Tag of the snapshot covering this Job's result, if one exists. `None`
    /// for a Job that hasn't run, failed, was skipped, or ran without a
    /// sandbox.
    pub fn snapshot_tag(&self) -> Option<String> {
        self.state.lock().snapshot_tag.clone()
    }

    /// Join `upstream` to this Job's upstream list: a depth-first search
    /// from `upstream` through its own existing upstream edges must not be
    /// able to reach `self` already, or the new edge would close a loop.
    pub fn add_upstream(self: &Arc<Self>, upstream: Arc<Job>) -> Result<(), EngineError> {
        if let Some(mut path) = find_cycle_path(&upstream, self) {
            if path.first().map(|j| j.id) != path.last().map(|j| j.id) {
                // Always emit a closed loop, even though the DFS only
                // lands back on its start when the cycle runs through the
                // full existing chain.
                if let Some(start) = path.first().cloned() {
                    path.push(start);
                }
            }
            let cycle = path.iter().map(|j| j.name.clone()).collect::<Vec<_>>().join(" -> ");
            return Err(EngineError::CycleDetected(cycle));
        }
        self.upstreams.lock().push(upstream);
        Ok(())
    }

    /// Run this Job to completion, recursing through upstreams first.
    /// Idempotent: a second call on a Job that has already settled returns
    /// immediately without re-running anything.
    pub async fn run(self: &Arc<Self>, deps: &RunDeps) -> Result<(), EngineError> {
        {
            let mut state = self.state.lock();
            if state.status.is_terminal() {
                return Ok(());
            }
            if state.claimed {
                return Err(EngineError::AlreadyRunning(self.id));
            }
            state.claimed = true;
        }
        let start = std::time::Instant::now();
        tracing::info!(job_id = %self.id, job_name = %self.name, "job run starting");

        let upstreams = self.upstreams.lock().clone();
        for upstream in &upstreams {
            Box::pin(upstream.run(deps)).await?;
            if matches!(upstream.status(), Status::Failed | Status::Skipped) {
                // Every upstream transition must be emitted before this
                // Job's own first record. This Job has no Pending record
                // yet, so emit it now, immediately followed by the Skipped
                // terminal, with every upstream already fully settled.
                self.emit(deps, Status::Pending, None, None);
                let result = JobResult::skipped(self.id);
                self.finish(deps, result);
                return Ok(());
            }
        }

        // First (and only) time this Job's `run` reaches here — emit the
        // Pending record that establishes its row in the stream, now that
        // every upstream has settled.
        self.emit(deps, Status::Pending, None, None);

        let fp = deps.fingerprinter.fingerprint(&self.body.cache_key(), &self.body.dependencies());
        if deps.sandbox_manager.snapshot_exists(&fp).await? {
            let cached = deps.sandbox_manager.read_job_result(&fp).await?;
            self.state.lock().snapshot_tag = Some(deps.sandbox_manager.tag_for(&fp));
            self.finish(deps, cached);
            return Ok(());
        }

        let outcome = self.execute(deps, &fp).await;
        let elapsed_ms = start.elapsed().as_millis() as u64;
        match outcome {
            Ok(result) => {
                tracing::info!(job_id = %self.id, elapsed_ms, status = %result.status, "job run finished");
                self.finish(deps, result);
            }
            Err(err) => {
                tracing::error!(job_id = %self.id, elapsed_ms, error = %err, "job run failed");
                let result = JobResult::failed(self.id, err.to_string(), err.kind());
                self.finish(deps, result);
            }
        }
        Ok(())
    }

    /// Create the sandbox (if this Job has a creator), run the body with it
    /// bound as the current Job dispatch target, cache a successful fresh
    /// result, and destroy the sandbox on every exit path — success, body
    /// failure, or a caching failure.
    async fn execute(self: &Arc<Self>, deps: &RunDeps, fp: &str) -> Result<JobResult, EngineError> {
        let sandbox: Option<Arc<dyn Sandbox>> = match &self.sandbox_creator {
            Some(creator) => Some(Arc::from(creator().await?)),
            None => None,
        };

        let body_result = {
            let _job_guard = push_job(self.id);
            let _dispatch_guard = crate::task::push_dispatch(crate::task::JobDispatch {
                job_id: self.id,
                sandbox: sandbox.clone(),
                executor: deps.executor.clone(),
                writer: deps.writer.clone(),
                clock: deps.clock.clone(),
            });
            self.emit(deps, Status::Running, None, None);
            self.body.main().await
        };

        let mut outcome = body_result.map(|value| JobResult::success(self.id, value));

        if let Ok(result) = &outcome {
            if result.should_cache(self.id) {
                if let Some(sb) = &sandbox {
                    match cache_fresh_result(deps, sb.as_ref(), result, fp).await {
                        Ok(tag) => self.state.lock().snapshot_tag = Some(tag),
                        Err(err) => outcome = Err(err),
                    }
                }
            }
        }

        if let Some(boxed) = crate::task::take_dispatch_sandbox(sandbox) {
            let destroyed = deps.sandbox_manager.destroy(boxed).await;
            outcome = destroyed.and(outcome);
        }

        outcome
    }

    fn finish(&self, deps: &RunDeps, result: JobResult) {
        let status = result.status;
        let origin_id = result.origin_id;
        let error = result.error.clone().zip(result.error_kind.clone());
        {
            let mut state = self.state.lock();
            state.status = status;
            state.result = Some(result);
        }
        self.emit(deps, status, Some(origin_id), error);
    }

    fn emit(&self, deps: &RunDeps, status: Status, origin_id: Option<JobId>, error: Option<(String, String)>) {
        let parent_id = current_root().ok().map(|r| r.to_string());
        let mut record = StatusRecord::at_epoch_ms(
            self.id.to_string(),
            EntityKind::Job,
            self.name.clone(),
            parent_id,
            status,
            origin_id.map(|id| id.to_string()),
            deps.clock.epoch_ms(),
        );
        if let Some((error, error_kind)) = error {
            record = record.with_error(error, error_kind);
        }
        let _ = deps.writer.emit(&record);
    }
}

async fn cache_fresh_result(
    deps: &RunDeps,
    sandbox: &dyn Sandbox,
    result: &JobResult,
    fingerprint: &str,
) -> Result<String, EngineError> {
    deps.sandbox_manager.write_job_result(sandbox, result).await?;
    deps.sandbox_manager.take_snapshot(sandbox, fingerprint).await
}

/// DFS from `start` through its own upstream edges looking for `target`.
/// Returns the path from `start` to `target` if found, so the caller can
/// render it as a closed loop.
fn find_cycle_path(start: &Arc<Job>, target: &Arc<Job>) -> Option<Vec<Arc<Job>>> {
    if start.id == target.id {
        return Some(vec![Arc::clone(start)]);
    }
    for upstream in start.upstreams.lock().iter() {
        if let Some(mut rest) = find_cycle_path(upstream, target) {
            let mut path = vec![Arc::clone(start)];
            path.append(&mut rest);
            return Some(path);
        }
    }
    None
}

#[cfg(test)]
#[path = "job_tests.rs"]
mod tests;
