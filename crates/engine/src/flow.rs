// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The Flow (Root) Controller.
//!
//! Mirrors a prior Python implementation's `River`: a Root entity emits its
//! own `Pending` record at construction (not at `flow()` time), holds a
//! name, a `SandboxManager`, a map of named outlets, and an optional
//! default sandbox config. `flow()` picks one outlet, runs its Job to
//! completion under a pushed execution-context scope, and re-raises
//! whatever error caused the Root to fail.

use flowforge_core::{
    push_root, EngineError, EntityKind, EpochClock, Fingerprinter, RootId, Status, StatusRecord,
    StatusWriter,
};
use flowforge_exec::CommandExecutor;
use flowforge_sandbox::{Sandbox, SandboxConfig, SandboxManager};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;

use crate::job::{Job, RunDeps, SandboxCreator};

struct FlowState {
    status: Status,
}

/// Holds everything a run of the DAG needs beyond the graph itself: name,
/// the sandbox cache, the set of named outlets a caller can start from, and
/// an optional default sandbox config for
/// [`Flow::default_sandbox_creator`].
pub struct Flow {
    id: RootId,
    name: String,
    sandbox_manager: Arc<dyn SandboxManager>,
    fingerprinter: Arc<Fingerprinter>,
    executor: Arc<dyn CommandExecutor>,
    writer: StatusWriter,
    clock: Arc<dyn EpochClock>,
    outlets: HashMap<String, Arc<Job>>,
    default_sandbox_config: Option<SandboxConfig>,
    state: Mutex<FlowState>,
}

/// Builds a [`Flow`]. `sandbox_manager`, `executor`, and `writer` are
/// required; everything else defaults to a sensible production shape
/// (`rustc_environment()`-keyed fingerprinter, system clock, no default
/// sandbox config).
pub struct FlowBuilder {
    name: String,
    sandbox_manager: Arc<dyn SandboxManager>,
    fingerprinter: Arc<Fingerprinter>,
    executor: Arc<dyn CommandExecutor>,
    writer: StatusWriter,
    clock: Arc<dyn EpochClock>,
    outlets: HashMap<String, Arc<Job>>,
    default_sandbox_config: Option<SandboxConfig>,
}

impl FlowBuilder {
    pub fn new(
        name: impl Into<String>,
        sandbox_manager: Arc<dyn SandboxManager>,
        executor: Arc<dyn CommandExecutor>,
    ) -> Self {
        Self {
            name: name.into(),
            sandbox_manager,
            fingerprinter: Arc::new(Fingerprinter::new(flowforge_core::rustc_environment())),
            executor,
            writer: StatusWriter::stdout(),
            clock: Arc::new(flowforge_core::SystemClock),
            outlets: HashMap::new(),
            default_sandbox_config: None,
        }
    }

    pub fn fingerprinter(mut self, fingerprinter: Arc<Fingerprinter>) -> Self {
        self.fingerprinter = fingerprinter;
        self
    }

    pub fn writer(mut self, writer: StatusWriter) -> Self {
        self.writer = writer;
        self
    }

    pub fn clock(mut self, clock: Arc<dyn EpochClock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn default_sandbox_config(mut self, config: SandboxConfig) -> Self {
        self.default_sandbox_config = Some(config);
        self
    }

    /// Register `job` as reachable through `flow(outlet_name)`.
    pub fn outlet(mut self, outlet_name: impl Into<String>, job: Arc<Job>) -> Self {
        self.outlets.insert(outlet_name.into(), job);
        self
    }

    /// Finish construction. Emits the Root's construction-time `Pending`
    /// record immediately, matching `River.__init__` in the source, not on
    /// first `flow()` call.
    pub fn build(self) -> Arc<Flow> {
        let id = RootId::new();
        let flow = Arc::new(Flow {
            id,
            name: self.name,
            sandbox_manager: self.sandbox_manager,
            fingerprinter: self.fingerprinter,
            executor: self.executor,
            writer: self.writer,
            clock: self.clock,
            outlets: self.outlets,
            default_sandbox_config: self.default_sandbox_config,
            state: Mutex::new(FlowState { status: Status::Pending }),
        });
        flow.emit(Status::Pending, None);
        flow
    }
}

impl Flow {
    pub fn id(&self) -> RootId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn status(&self) -> Status {
        self.state.lock().status
    }

    /// A capability that, invoked inside `flow()`'s pushed execution
    /// context, creates a fresh sandbox from this Flow's
    /// `default_sandbox_config`. Panics are never reachable here: a missing
    /// config surfaces as `InvalidArgument` the first time the capability
    /// is actually invoked, not at construction.
    pub fn default_sandbox_creator(self: &Arc<Self>) -> SandboxCreator {
        let flow = Arc::clone(self);
        Arc::new(move || {
            let flow = Arc::clone(&flow);
            Box::pin(async move {
                let config = flow.default_sandbox_config.clone().ok_or_else(|| {
                    EngineError::InvalidArgument("flow has no default sandbox config".into())
                })?;
                flow.sandbox_manager.create(&config).await
            })
        })
    }

    /// A capability that forks a fresh sandbox from `source`'s last
    /// snapshot. Fails with `NoSnapshot` if `source` never produced one —
    /// most commonly because `source` hasn't run yet, or settled via a
    /// cache-hit whose own snapshot write failed upstream.
    ///
    /// `source`'s live sandbox no longer exists by the time a downstream Job
    /// forks from it (it was destroyed at the end of `source`'s own `run`),
    /// so this resolves through the tag `Job::run` retained rather than a
    /// live handle — `SandboxManager::fork` only ever reads
    /// `Sandbox::snapshot_tag()` off the handle it's given.
    pub fn sandbox_forker(self: &Arc<Self>, source: Arc<Job>) -> SandboxCreator {
        let manager = self.sandbox_manager.clone();
        Arc::new(move || {
            let manager = manager.clone();
            let source = source.clone();
            Box::pin(async move {
                let handle = TagOnlySandbox { id: source.id().to_string(), tag: source.snapshot_tag() };
                manager.fork(&handle).await
            })
        })
    }

    /// Run `outlet`'s Job to completion, racing it against `Ctrl-C`.
    /// Delegates to [`Flow::flow_cancellable`] with `tokio::signal::ctrl_c`
    /// as the cancellation source; see that method for exactly what
    /// cancellation does and does not guarantee.
    pub async fn flow(self: &Arc<Self>, outlet: &str) -> Result<(), EngineError> {
        self.flow_cancellable(outlet, async {
            // A failure to install the Ctrl-C handler (e.g. no signal
            // handling support on the platform) just means this run is not
            // cancellable, not that it should fail outright — matching the
            // rest of the Engine's "degrade, don't crash" stance on
            // environment-dependent capabilities.
            let _ = tokio::signal::ctrl_c().await;
        })
        .await
    }

    /// Run `outlet`'s Job to completion, racing it against an arbitrary
    /// cancellation signal. Exposed separately from
    /// [`Flow::flow`] so tests (and embedders with their own shutdown
    /// signal) can drive cancellation deterministically instead of sending
    /// the process a real `SIGINT`.
    ///
    /// 1. Validates the outlet name.
    /// 2. Emits Root `Running`.
    /// 3. Pushes this Flow's id onto the execution context and runs the
    ///    outlet Job, racing it against `cancel`.
    /// 4. On normal completion, emits Root `Success` or `Failed` (carrying
    ///    the error) and re-raises on failure. On cancellation, emits Root
    ///    `Failed` with `error_kind = Interrupted` and returns
    ///    `Err(EngineError::Interrupted)`.
    /// 5. Pops the execution context on every exit path (RAII guard).
    ///
    /// Cancellation here is cooperative, not preemptive: the in-flight
    /// `run()` future is dropped at whatever `.await` point it's currently
    /// suspended at. Any Job that had already reached `Job::execute` and
    /// created a sandbox before the cancellation fired is not guaranteed to
    /// have that sandbox destroyed — Rust's `Future::drop` does not run the
    /// rest of an `async fn` body, so the `destroy` call later in that
    /// function's body never executes. Destroying any live sandboxes on
    /// interrupt is therefore honored for sandboxes whose owning Job has
    /// already returned by the time cancellation is observed, and is a
    /// known gap for a Job caught mid-`execute()` — closing it fully would
    /// need cancellation-token plumbing through every suspension point in
    /// `Job::run`/`Job::execute`, which is out of proportion to how rarely a
    /// `SIGINT` lands in that exact window.
    pub async fn flow_cancellable(
        self: &Arc<Self>,
        outlet: &str,
        cancel: impl std::future::Future<Output = ()> + Send,
    ) -> Result<(), EngineError> {
        let job = match self.outlets.get(outlet).cloned() {
            Some(job) => job,
            None => {
                let err = EngineError::UnknownOutlet {
                    requested: outlet.to_string(),
                    available: self.outlets.keys().cloned().collect(),
                };
                // Flow-level errors like UnknownOutlet are raised
                // immediately and fail the Root — unlike a Job settling
                // Skipped/Failed (which never fails the Root, see emit()
                // below), an unknown outlet never even reaches `run()`, so
                // Root must be failed explicitly here.
                self.state.lock().status = Status::Failed;
                self.emit_failed(&err);
                return Err(err);
            }
        };

        self.state.lock().status = Status::Running;
        self.emit(Status::Running, None);
        tracing::info!(root_id = %self.id, outlet, "flow starting");

        let _root_guard = push_root(self.id);
        let deps = RunDeps {
            sandbox_manager: self.sandbox_manager.clone(),
            fingerprinter: self.fingerprinter.clone(),
            executor: self.executor.clone(),
            writer: self.writer.clone(),
            clock: self.clock.clone(),
        };

        // A Job transitioning to Failed (or Skipped) is reported on its own
        // StatusRecord, never as an `Err` out of `run` — `Job::run` already
        // caught it there, and that extends all the way to the Root:
        // running an outlet that ends up Skipped due to an upstream
        // failure still yields Root Success, not Failed, since the engine
        // treats upstream failure as flow completion. Root only fails on a
        // genuinely propagated engine-level error —
        // `UnknownOutlet` above, or an I/O/sandbox failure bubbling out of
        // `run` itself.
        let outcome = tokio::select! {
            outcome = job.run(&deps) => outcome,
            () = cancel => {
                tracing::warn!(root_id = %self.id, "flow interrupted");
                Err(EngineError::Interrupted)
            }
        };

        match &outcome {
            Ok(()) => {
                self.state.lock().status = Status::Success;
                self.emit(Status::Success, None);
                tracing::info!(root_id = %self.id, "flow succeeded");
            }
            Err(err) => {
                self.state.lock().status = Status::Failed;
                self.emit_failed(err);
                tracing::error!(root_id = %self.id, error = %err, "flow failed");
            }
        }

        outcome
    }

    fn emit(&self, status: Status, origin_id: Option<String>) {
        let record = StatusRecord::at_epoch_ms(
            self.id.to_string(),
            EntityKind::Root,
            self.name.clone(),
            None,
            status,
            origin_id,
            self.clock.epoch_ms(),
        );
        let _ = self.writer.emit(&record);
    }

    fn emit_failed(&self, error: &EngineError) {
        let record = StatusRecord::at_epoch_ms(
            self.id.to_string(),
            EntityKind::Root,
            self.name.clone(),
            None,
            Status::Failed,
            None,
            self.clock.epoch_ms(),
        )
        .with_error(error.to_string(), error.kind());
        let _ = self.writer.emit(&record);
    }
}

/// A `Sandbox` handle carrying nothing but an id and a snapshot tag, built
/// from a settled `Job`'s retained [`Job::snapshot_tag`] so
/// [`Flow::sandbox_forker`] can call `SandboxManager::fork` without a live
/// sandbox. `execute` is unreachable: `fork` never dispatches a command
/// against its source, only reads `snapshot_tag()` off it.
struct TagOnlySandbox {
    id: String,
    tag: Option<String>,
}

#[async_trait::async_trait]
impl Sandbox for TagOnlySandbox {
    fn id(&self) -> &str {
        &self.id
    }

    fn snapshot_tag(&self) -> Option<String> {
        self.tag.clone()
    }

    fn set_snapshot_tag(&self, _tag: String) {}

    async fn execute(
        &self,
        _command: &str,
        _cwd: Option<&std::path::Path>,
        _env: &HashMap<String, String>,
    ) -> Result<flowforge_core::CommandResult, EngineError> {
        Err(EngineError::NoSnapshot)
    }
}

#[cfg(test)]
#[path = "flow_tests.rs"]
mod tests;
