// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! spec.md §8 scenario 1 "Linear success": `A -> B`, run `B`, expect every
//! entity to transition Pending -> Running -> Success in dependency order,
//! and a second run against the same `SandboxManager` to resolve through
//! the cache instead of re-executing.

use crate::prelude::*;
use flowforge_core::{EntityKind, Status};
use flowforge_engine::JobBuilder;
use flowforge_sandbox::InMemorySandboxManager;
use std::sync::Arc;

#[tokio::test]
async fn linear_success_emits_expected_stream_order() {
    let buf = SharedBuf::default();
    let manager = Arc::new(InMemorySandboxManager::new());

    let a = JobBuilder::new("A", ScriptedBody::succeed("linear-a")).build();
    let b = JobBuilder::new("B", ScriptedBody::succeed("linear-b"))
        .build_with_upstreams([a.clone()])
        .unwrap();

    flow_with(buf.clone(), manager, b).flow("default").await.unwrap();

    let stream: Vec<(EntityKind, Status)> = buf.records().into_iter().map(|r| (r.kind, r.status)).collect();
    use EntityKind::*;
    use Status::*;
    assert_eq!(
        stream,
        vec![
            (Root, Pending),
            (Root, Running),
            (Job, Pending),
            (Job, Running),
            (Job, Success),
            (Job, Pending),
            (Job, Running),
            (Job, Success),
            (Root, Success),
        ],
        "A must settle fully before B starts, and the Root must bracket the whole run"
    );
}

#[tokio::test]
async fn second_run_with_same_fingerprints_resolves_through_cache() {
    let manager = Arc::new(InMemorySandboxManager::new());

    let first_buf = SharedBuf::default();
    let a1 = JobBuilder::new("A", ScriptedBody::succeed("linear-a-cached")).build();
    let b1 = JobBuilder::new("B", ScriptedBody::succeed("linear-b-cached"))
        .build_with_upstreams([a1.clone()])
        .unwrap();
    flow_with(first_buf, manager.clone(), b1).flow("default").await.unwrap();

    let second_buf = SharedBuf::default();
    let a2 = JobBuilder::new("A", ScriptedBody::succeed("linear-a-cached")).build();
    let b2 = JobBuilder::new("B", ScriptedBody::succeed("linear-b-cached"))
        .build_with_upstreams([a2.clone()])
        .unwrap();
    flow_with(second_buf.clone(), manager, b2).flow("default").await.unwrap();

    let jobs: Vec<_> = second_buf.records().into_iter().filter(|r| r.kind == EntityKind::Job).collect();
    assert_eq!(jobs.len(), 4, "each Job still emits its Pending record before the cache lookup runs");
    assert_eq!(jobs[1].status, Status::Success);
    assert_ne!(jobs[1].origin_id.as_deref(), Some(jobs[1].id.as_str()), "A's second run must be a cache hit");
    assert_eq!(jobs[3].status, Status::Success);
    assert_ne!(jobs[3].origin_id.as_deref(), Some(jobs[3].id.as_str()), "B's second run must be a cache hit");
}
