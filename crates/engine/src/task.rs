// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The Task shell-command primitive.
//!
//! Mirrors a prior Python implementation's `bash()`: a Task is not a graph
//! node, just a synchronous call a Job's body makes. Dispatch
//! needs the calling Job's sandbox (if any), its command executor, the
//! status writer and clock — none of which [`flowforge_core::context`]
//! carries, since core stays free of any dependency on the sandbox/exec
//! crates. This module keeps its own `thread_local!` stack, pushed in
//! lockstep with `Job::run`'s core context push, holding exactly that.

use flowforge_core::{
    current_job, EngineError, EntityKind, EpochClock, JobId, Status, StatusRecord, StatusWriter, TaskId,
};
use flowforge_exec::CommandExecutor;
use flowforge_sandbox::Sandbox;
use std::cell::RefCell;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Everything a Task dispatched from inside a running Job's body needs.
/// Pushed onto [`DISPATCH_STACK`] by `Job::run` for the duration of the
/// Job's `main()` call.
pub struct JobDispatch {
    pub job_id: JobId,
    pub sandbox: Option<Arc<dyn Sandbox>>,
    pub executor: Arc<dyn CommandExecutor>,
    pub writer: StatusWriter,
    pub clock: Arc<dyn EpochClock>,
}

thread_local! {
    static DISPATCH_STACK: RefCell<Vec<JobDispatch>> = const { RefCell::new(Vec::new()) };
}

/// RAII guard returned by [`push_dispatch`]. Pops the binding on drop,
/// mirroring [`flowforge_core::context::JobGuard`].
#[must_use]
pub struct DispatchGuard(());

impl Drop for DispatchGuard {
    fn drop(&mut self) {
        DISPATCH_STACK.with(|stack| {
            stack.borrow_mut().pop();
        });
    }
}

/// Bind `dispatch` as the current Job dispatch target for the remainder of
/// the guard's scope.
pub fn push_dispatch(dispatch: JobDispatch) -> DispatchGuard {
    DISPATCH_STACK.with(|stack| stack.borrow_mut().push(dispatch));
    DispatchGuard(())
}

/// A snapshot of the fields [`bash`] needs out of the current dispatch
/// entry, cloned out from behind the thread-local `RefCell` so no borrow is
/// held across an `.await` point.
struct DispatchHandle {
    job_id: JobId,
    sandbox: Option<Arc<dyn Sandbox>>,
    executor: Arc<dyn CommandExecutor>,
    writer: StatusWriter,
    clock: Arc<dyn EpochClock>,
}

fn current_dispatch() -> Result<DispatchHandle, EngineError> {
    DISPATCH_STACK.with(|stack| {
        let stack = stack.borrow();
        let top = stack.last().ok_or(EngineError::NoJobContext)?;
        Ok(DispatchHandle {
            job_id: top.job_id,
            sandbox: top.sandbox.clone(),
            executor: top.executor.clone(),
            writer: top.writer.clone(),
            clock: top.clock.clone(),
        })
    })
}

/// Reclaim sole ownership of the current Job's sandbox so `Job::execute` can
/// hand it to the `SandboxManager` for snapshotting/destruction once
/// `main()` returns and this dispatch entry has been popped. Returns `None`
/// if the current Job has no sandbox, or if some other clone of the `Arc` is
/// still outstanding (a caller bug: a Task must not retain a handle to the
/// sandbox past its own call).
pub(crate) fn take_dispatch_sandbox(sandbox: Option<Arc<dyn Sandbox>>) -> Option<Box<dyn Sandbox>> {
    sandbox.and_then(|arc| Arc::try_unwrap(arc).ok())
}

/// Options accepted by [`bash`] beyond the command string itself.
#[derive(Default, Clone)]
pub struct TaskOptions {
    name: Option<String>,
    cwd: Option<PathBuf>,
    env: HashMap<String, String>,
}

impl TaskOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn cwd(mut self, cwd: impl Into<PathBuf>) -> Self {
        self.cwd = Some(cwd.into());
        self
    }

    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.insert(key.into(), value.into());
        self
    }
}

const DEFAULT_NAME_TRUNCATE_AT: usize = 50;

/// Default Task name: `"bash: <first 50 chars of command>..."` once the
/// command is longer than [`DEFAULT_NAME_TRUNCATE_AT`] chars, else the full
/// command.
fn default_task_name(command: &str) -> String {
    if command.chars().count() > DEFAULT_NAME_TRUNCATE_AT {
        let truncated: String = command.chars().take(DEFAULT_NAME_TRUNCATE_AT).collect();
        format!("bash: {truncated}...")
    } else {
        format!("bash: {command}")
    }
}

/// Run `command` as a Task of the currently-bound Job.
///
/// Dispatches through the Job's sandbox if it has one, otherwise through the
/// Local Command Executor passed in the Job's [`crate::job::RunDeps`].
/// Returns the command's stdout/stderr/exit code on a zero exit; on a
/// nonzero exit emits `Task Failed` and returns `TaskExecutionError` so the
/// calling Job's body propagates it and the Job itself transitions to
/// Failed.
pub async fn bash(
    command: &str,
    options: TaskOptions,
) -> Result<flowforge_core::CommandResult, EngineError> {
    let _ = current_job()?;
    let dispatch = current_dispatch()?;

    let task_id = TaskId::new();
    let name = options.name.clone().unwrap_or_else(|| default_task_name(command));
    let parent_id = dispatch.job_id.to_string();

    emit(&dispatch, &task_id, &name, &parent_id, Status::Running, None);

    let start = std::time::Instant::now();
    let cwd: Option<&Path> = options.cwd.as_deref();
    let dispatched = match &dispatch.sandbox {
        Some(sandbox) => sandbox.execute(command, cwd, &options.env).await,
        None => dispatch.executor.run(command, cwd, &options.env).await,
    };
    let elapsed_ms = start.elapsed().as_millis() as u64;

    let result = match dispatched {
        Ok(result) => result,
        Err(err) => {
            tracing::error!(task_id = %task_id, elapsed_ms, error = %err, "task dispatch failed");
            emit(&dispatch, &task_id, &name, &parent_id, Status::Failed, Some(&err));
            return Err(err);
        }
    };

    if result.ok() {
        tracing::info!(task_id = %task_id, elapsed_ms, "task succeeded");
        emit(&dispatch, &task_id, &name, &parent_id, Status::Success, None);
        Ok(result)
    } else {
        let error = EngineError::TaskExecutionError {
            command: command.to_string(),
            stdout: result.stdout,
            stderr: result.stderr,
            exit_code: result.exit_code,
        };
        tracing::error!(task_id = %task_id, elapsed_ms, exit_code = result.exit_code, "task exited nonzero");
        emit(&dispatch, &task_id, &name, &parent_id, Status::Failed, Some(&error));
        Err(error)
    }
}

fn emit(
    dispatch: &DispatchHandle,
    task_id: &TaskId,
    name: &str,
    parent_id: &str,
    status: Status,
    error: Option<&EngineError>,
) {
    let mut record = StatusRecord::at_epoch_ms(
        task_id.to_string(),
        EntityKind::Task,
        name,
        Some(parent_id.to_string()),
        status,
        None,
        dispatch.clock.epoch_ms(),
    );
    if let Some(error) = error {
        record = record.with_error(error.to_string(), error.kind());
    }
    let _ = dispatch.writer.emit(&record);
}

#[cfg(test)]
#[path = "task_tests.rs"]
mod tests;
