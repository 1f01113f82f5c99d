// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Ambient, scoped Execution Context.
//!
//! Two nested scopes are tracked per OS thread: the current Root (bound by
//! the Flow Controller's `flow()`) and the current Job (bound by `Job::run`).
//! Both are `thread_local!` stacks rather than a single global mutable
//! singleton, so nested scopes restore correctly across exceptional exits. A
//! `thread_local!` stack plus an RAII guard that pops on `Drop` satisfies
//! that: unwinding through a `?` early-return still runs the guard's
//! destructor, mirroring `river_sdk/river.py`'s
//! `RiverContext.__enter__`/`__exit__` token-reset.

use crate::entity::{JobId, RootId};
use crate::error::EngineError;
use std::cell::RefCell;

thread_local! {
    static ROOT_STACK: RefCell<Vec<RootId>> = const { RefCell::new(Vec::new()) };
    static JOB_STACK: RefCell<Vec<JobId>> = const { RefCell::new(Vec::new()) };
}

/// RAII guard returned by [`push_root`]. Pops the Root binding when dropped,
/// including during unwinding, so nested scopes never leak past their
/// owning call.
#[must_use]
pub struct RootGuard(());

impl Drop for RootGuard {
    fn drop(&mut self) {
        ROOT_STACK.with(|stack| {
            stack.borrow_mut().pop();
        });
    }
}

/// RAII guard returned by [`push_job`]. Pops the Job binding when dropped.
#[must_use]
pub struct JobGuard(());

impl Drop for JobGuard {
    fn drop(&mut self) {
        JOB_STACK.with(|stack| {
            stack.borrow_mut().pop();
        });
    }
}

/// Bind `root` as the current Root for the remainder of the guard's scope.
pub fn push_root(root: RootId) -> RootGuard {
    ROOT_STACK.with(|stack| stack.borrow_mut().push(root));
    RootGuard(())
}

/// Bind `job` as the current Job for the remainder of the guard's scope.
pub fn push_job(job: JobId) -> JobGuard {
    JOB_STACK.with(|stack| stack.borrow_mut().push(job));
    JobGuard(())
}

/// The innermost currently-bound Root, or `NoRootContext` if none is bound
/// on this thread.
pub fn current_root() -> Result<RootId, EngineError> {
    ROOT_STACK.with(|stack| stack.borrow().last().copied().ok_or(EngineError::NoRootContext))
}

/// The innermost currently-bound Job, or `NoJobContext` if none is bound on
/// this thread.
pub fn current_job() -> Result<JobId, EngineError> {
    JOB_STACK.with(|stack| stack.borrow().last().copied().ok_or(EngineError::NoJobContext))
}

#[cfg(test)]
#[path = "context_tests.rs"]
mod tests;
