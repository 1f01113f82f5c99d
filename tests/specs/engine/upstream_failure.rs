// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! spec.md §8 scenario 3 "Upstream failure": `A` fails, `B` depends on `A`.
//! `B` must settle `Skipped` without its body ever running, and the engine
//! treats the whole run as a completed Flow (`Root` still reaches
//! `Success`) rather than as a propagated error — the Open Question this
//! repo resolved in `DESIGN.md`.

use crate::prelude::*;
use flowforge_core::Status;
use flowforge_engine::JobBuilder;
use flowforge_sandbox::InMemorySandboxManager;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

#[tokio::test]
async fn downstream_is_skipped_and_flow_still_succeeds() {
    let buf = SharedBuf::default();
    let manager = Arc::new(InMemorySandboxManager::new());
    let b_runs = Arc::new(AtomicUsize::new(0));

    let a = JobBuilder::new("A", ScriptedBody::fail("upstream-fail-a", "boom")).build();
    let b = JobBuilder::new("B", ScriptedBody::succeed("upstream-fail-b").counted(b_runs.clone()))
        .build_with_upstreams([a.clone()])
        .unwrap();

    let flow = flow_with(buf, manager, b.clone());
    flow.flow("default").await.unwrap();

    assert_eq!(a.status(), Status::Failed);
    let a_result = a.result().unwrap();
    assert_eq!(a_result.error.as_deref(), Some("boom"));
    assert_eq!(a_result.error_kind.as_deref(), Some("InvalidArgument"));

    assert_eq!(b.status(), Status::Skipped);
    assert_eq!(b_runs.load(Ordering::SeqCst), 0, "a skipped Job's body must never run");

    assert_eq!(flow.status(), Status::Success);
}
