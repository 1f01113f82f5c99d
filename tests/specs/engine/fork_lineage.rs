// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! spec.md §8 scenario 6 "Fork lineage": `A` runs in a sandbox and takes a
//! snapshot; `B` forks from `A`'s retained snapshot tag through a separate
//! `Flow` sharing the same `SandboxManager`. Forking from a Job that never
//! snapshotted fails with `NoSnapshot`.

use crate::prelude::*;
use flowforge_core::Status;
use flowforge_engine::{FlowBuilder, JobBuilder};
use flowforge_exec::LocalExecutor;
use flowforge_sandbox::InMemorySandboxManager;
use std::sync::Arc;

#[tokio::test]
async fn b_forks_from_as_retained_snapshot() {
    let manager = Arc::new(InMemorySandboxManager::new());

    let a_buf = SharedBuf::default();
    let a = JobBuilder::new("A", ScriptedBody::succeed("fork-a"))
        .sandbox_creator(sandboxed_creator(manager.clone(), "base"))
        .build();
    let flow_a = FlowBuilder::new("flow-a", manager.clone(), Arc::new(LocalExecutor::new()))
        .writer(flowforge_core::StatusWriter::new(a_buf))
        .outlet("default", a.clone())
        .build();
    flow_a.flow("default").await.unwrap();

    assert_eq!(a.status(), Status::Success);
    let a_tag = a.snapshot_tag().expect("a successful sandboxed Job must retain a snapshot tag");

    let b_buf = SharedBuf::default();
    let forker = flow_a.sandbox_forker(a.clone());
    let b = JobBuilder::new("B", ScriptedBody::succeed("fork-b")).sandbox_creator(forker).build();
    let flow_b = FlowBuilder::new("flow-b", manager, Arc::new(LocalExecutor::new()))
        .writer(flowforge_core::StatusWriter::new(b_buf))
        .outlet("default", b.clone())
        .build();
    flow_b.flow("default").await.unwrap();

    assert_eq!(b.status(), Status::Success);
    assert_eq!(a_tag, a.snapshot_tag().unwrap(), "A's own tag must not change from forking off of it");
}

#[tokio::test]
async fn forking_from_an_unsnapshotted_job_fails() {
    let manager = Arc::new(InMemorySandboxManager::new());
    let buf = SharedBuf::default();

    // A Job with no sandbox creator never takes a snapshot even on success.
    let source = JobBuilder::new("source", ScriptedBody::succeed("fork-no-snapshot")).build();
    let flow = flow_with(buf, manager, source.clone());
    flow.flow("default").await.unwrap();
    assert!(source.snapshot_tag().is_none());

    let forker = flow.sandbox_forker(source);
    let err = forker().await.unwrap_err();
    assert_eq!(err.kind(), "NoSnapshot");
}
