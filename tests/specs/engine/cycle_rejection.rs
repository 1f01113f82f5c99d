// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! spec.md §8 scenario 4 "Cycle rejection": joining `B` as an upstream of
//! `A` after `A` is already joined as an upstream of `B` must fail
//! construction immediately with `CycleDetected`, never emitting a
//! `StatusRecord` for the rejected edge.

use flowforge_core::EngineError;
use flowforge_engine::JobBuilder;

use crate::prelude::*;

#[test]
fn closing_a_loop_is_rejected_at_construction() {
    let a = JobBuilder::new("A", ScriptedBody::succeed("cycle-a")).build();
    let b = JobBuilder::new("B", ScriptedBody::succeed("cycle-b")).build();
    a.add_upstream(b.clone()).unwrap();

    let err = b.add_upstream(a.clone()).unwrap_err();

    match err {
        EngineError::CycleDetected(path) => {
            assert!(path.contains('A'));
            assert!(path.contains('B'));
            let first = path.split(" -> ").next().unwrap();
            let last = path.split(" -> ").last().unwrap();
            assert_eq!(first, last, "the reported cycle must close the loop it found");
        }
        other => panic!("expected CycleDetected, got {other:?}"),
    }
}
