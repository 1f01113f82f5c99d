// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The engine-wide error taxonomy.

use crate::entity::JobId;

/// Everything the Flow Engine can fail with.
///
/// `CacheMiss` is intentionally absent: it is internal-only — a snapshot
/// lookup that comes back empty just triggers fresh execution, it never
/// surfaces as an `Err`.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// Raised at graph construction when joining an upstream would create a
    /// cycle. The message is a closed loop, e.g. `"B -> A -> B"`.
    #[error("cycle detected: {0}")]
    CycleDetected(String),

    /// `run()` re-entered on a Job that is already `Running`.
    #[error("job {0} is already running")]
    AlreadyRunning(JobId),

    /// `flow()` called with an outlet name the Flow doesn't know.
    #[error("unknown outlet {requested:?}, available: {available:?}")]
    UnknownOutlet {
        requested: String,
        available: Vec<String>,
    },

    /// A Task primitive was invoked with no Job bound in the execution
    /// context.
    #[error("no job bound in the current execution context")]
    NoJobContext,

    /// `flow()`'s own machinery was invoked with no Root bound in the
    /// execution context.
    #[error("no root bound in the current execution context")]
    NoRootContext,

    /// `fork()` was asked to start from a sandbox that was never
    /// snapshotted.
    #[error("cannot fork: source sandbox has no snapshot")]
    NoSnapshot,

    /// `take_snapshot()` failed at the runtime layer.
    #[error("failed to snapshot sandbox: {0}")]
    SnapshotFailed(String),

    /// A Task's command exited non-zero.
    #[error(
        "task command exited {exit_code}: {command}\n--- stdout ---\n{stdout}\n--- stderr ---\n{stderr}"
    )]
    TaskExecutionError {
        command: String,
        stdout: String,
        stderr: String,
        exit_code: i32,
    },

    /// An environment map contained a null or empty-string key.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// The producing process was interrupted (e.g. SIGINT) while entities
    /// were still Running.
    #[error("interrupted")]
    Interrupted,

    /// A sandbox or command-executor operation failed at the I/O layer.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl EngineError {
    /// The stable taxonomy name used as `StatusRecord.error_kind`. Matches
    /// the variant name, not the `Display` message.
    pub fn kind(&self) -> &'static str {
        match self {
            EngineError::CycleDetected(_) => "CycleDetected",
            EngineError::AlreadyRunning(_) => "AlreadyRunning",
            EngineError::UnknownOutlet { .. } => "UnknownOutlet",
            EngineError::NoJobContext => "NoJobContext",
            EngineError::NoRootContext => "NoRootContext",
            EngineError::NoSnapshot => "NoSnapshot",
            EngineError::SnapshotFailed(_) => "SnapshotFailed",
            EngineError::TaskExecutionError { .. } => "TaskExecutionError",
            EngineError::InvalidArgument(_) => "InvalidArgument",
            EngineError::Interrupted => "Interrupted",
            EngineError::Io(_) => "Io",
        }
    }
}

pub type EngineResult<T> = Result<T, EngineError>;

#[cfg(test)]
#[path = "error_tests.rs"]
mod tests;
