// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! spec.md §8 scenario 5 "Task failure": a Job whose body runs a Task that
//! exits nonzero must itself transition to `Failed` with `error_kind ==
//! "TaskExecutionError"`, and the exit code must be recoverable from the
//! error.

use crate::prelude::*;
use flowforge_core::{EngineError, Status};
use flowforge_engine::JobBuilder;
use flowforge_sandbox::InMemorySandboxManager;
use std::sync::Arc;

#[tokio::test]
async fn nonzero_exit_fails_the_job_with_task_execution_error() {
    let buf = SharedBuf::default();
    let manager = Arc::new(InMemorySandboxManager::new());

    let job = JobBuilder::new("build", ScriptedBody::run_task("task-failure", "exit 7")).build();
    flow_with(buf, manager, job.clone()).flow("default").await.unwrap();

    assert_eq!(job.status(), Status::Failed);
    let result = job.result().unwrap();
    assert_eq!(result.error_kind.as_deref(), Some("TaskExecutionError"));
}

#[test]
fn task_execution_error_carries_the_exit_code() {
    let err = EngineError::TaskExecutionError {
        command: "exit 7".into(),
        stdout: String::new(),
        stderr: String::new(),
        exit_code: 7,
    };
    match err {
        EngineError::TaskExecutionError { exit_code, .. } => assert_eq!(exit_code, 7),
        other => panic!("expected TaskExecutionError, got {other:?}"),
    }
}
