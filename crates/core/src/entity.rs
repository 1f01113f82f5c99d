// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Entity identifiers and the Root/Job/Task kind tag.

use serde::{Deserialize, Serialize};

crate::define_id! {
    /// Identifier of a Flow's root entity, stable for the process run.
    pub struct RootId("root-");
}

crate::define_id! {
    /// Identifier of a Job instance, assigned once at construction.
    ///
    /// A prior Python implementation derived identity from the instance's
    /// memory address via a namespaced UUID v5; this is the idiomatic Rust
    /// equivalent — a per-instance nonce that never changes for the life of
    /// the `Job`.
    pub struct JobId("job-");
}

crate::define_id! {
    /// Identifier of a single Task invocation.
    pub struct TaskId("tsk-");
}

/// Which of the three entity shapes a [`crate::record::StatusRecord`] describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    Root,
    Job,
    Task,
}

crate::simple_display! {
    EntityKind {
        Root => "root",
        Job => "job",
        Task => "task",
    }
}

#[cfg(test)]
#[path = "entity_tests.rs"]
mod tests;
