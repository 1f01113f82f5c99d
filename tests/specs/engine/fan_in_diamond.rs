// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! spec.md §8 scenario 2 "Fan-in diamond": `root -> {left, right} -> sink`.
//! `root` is a shared upstream of both `left` and `right`; running `sink`
//! must execute `root`'s body exactly once no matter how many downstream
//! Jobs join it.

use crate::prelude::*;
use flowforge_core::Status;
use flowforge_engine::JobBuilder;
use flowforge_sandbox::InMemorySandboxManager;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

#[tokio::test]
async fn shared_upstream_runs_exactly_once() {
    let buf = SharedBuf::default();
    let manager = Arc::new(InMemorySandboxManager::new());
    let root_runs = Arc::new(AtomicUsize::new(0));

    let root = JobBuilder::new("root", ScriptedBody::succeed("diamond-root").counted(root_runs.clone())).build();
    let left = JobBuilder::new("left", ScriptedBody::succeed("diamond-left"))
        .build_with_upstreams([root.clone()])
        .unwrap();
    let right = JobBuilder::new("right", ScriptedBody::succeed("diamond-right"))
        .build_with_upstreams([root.clone()])
        .unwrap();
    let sink = JobBuilder::new("sink", ScriptedBody::succeed("diamond-sink"))
        .build_with_upstreams([left.clone(), right.clone()])
        .unwrap();

    flow_with(buf, manager, sink.clone()).flow("default").await.unwrap();

    assert_eq!(sink.status(), Status::Success);
    assert_eq!(root.status(), Status::Success);
    assert_eq!(left.status(), Status::Success);
    assert_eq!(right.status(), Status::Success);
    assert_eq!(root_runs.load(Ordering::SeqCst), 1, "a shared upstream must run exactly once");
}
