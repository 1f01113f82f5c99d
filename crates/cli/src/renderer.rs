// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The Status Stream Renderer: consumes the line-delimited `StatusRecord`
//! stream emitted by a workflow program and maintains an in-memory tree
//! keyed by `id`, with `parent_id` edges.
//!
//! Mirrors a prior Python implementation's `RiverNode` and `CompositeLabel`:
//! a node's position in the tree is its parent chain, established the first
//! time its id is seen, and a Task never gets a tree row of its own — it's
//! folded into its owning Job's display. This renderer keeps both
//! structural behaviors but drops the prior implementation's live-redraw
//! animation/coloring, since that is purely a terminal-presentation detail
//! outside this renderer's core responsibility. What survives is a plain,
//! one-line-per-transition rendering: Root/Job transitions get their own
//! tracked tree row; Task transitions print nested under their parent Job's
//! depth but are never added to the tree or the failure summary, since a
//! Task's failure always surfaces as its owning Job's `Failed` transition
//! too.

use flowforge_core::{EntityKind, Status, StatusRecord};
use std::collections::HashMap;

struct Node {
    name: String,
    parent_id: Option<String>,
    status: Status,
    error: Option<String>,
    error_kind: Option<String>,
}

/// Reconstructs the Root/Job/Task tree from an arriving stream of
/// [`StatusRecord`]s, printing one indented line per transition and
/// tracking which entities are currently `Failed` for the end-of-run
/// summary.
///
/// Updates are applied in arrival order; unknown parents are tolerated by
/// simplifying to a parents-before-children assumption, which the producer
/// guarantees — a record whose `parent_id` hasn't been seen yet renders at
/// depth 0 rather than being buffered.
#[derive(Default)]
pub struct Renderer {
    nodes: HashMap<String, Node>,
    /// First-seen order, so the failure summary prints in the order
    /// entities actually failed rather than `HashMap` iteration order.
    order: Vec<String>,
}

impl Renderer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Apply one record: print its line, then track it in the tree — unless
    /// it's a Task, which prints nested under its parent Job but is never
    /// added to the tree, since it's folded into the owning Job's row, not
    /// a row of its own.
    pub fn apply(&mut self, record: StatusRecord) {
        if record.kind == EntityKind::Task {
            self.print_task(&record);
            return;
        }

        let depth = self.depth_of(record.parent_id.as_deref());
        let indent = "  ".repeat(depth);
        let cache_suffix = cache_suffix(&record);
        println!("{indent}[{}] {}: {}{}", record.kind, record.name, record.status, cache_suffix);

        if !self.nodes.contains_key(&record.id) {
            self.order.push(record.id.clone());
        }
        self.nodes.insert(
            record.id,
            Node {
                name: record.name,
                parent_id: record.parent_id,
                status: record.status,
                error: record.error,
                error_kind: record.error_kind,
            },
        );
    }

    /// Print a Task transition one level deeper than its owning Job, without
    /// creating a tree entry for it.
    fn print_task(&self, record: &StatusRecord) {
        let depth = self.depth_of(record.parent_id.as_deref()) + 1;
        let indent = "  ".repeat(depth);
        println!("{indent}[{}] {}: {}{}", record.kind, record.name, record.status, cache_suffix(record));
    }

    fn depth_of(&self, parent_id: Option<&str>) -> usize {
        let mut depth = 0;
        let mut current = parent_id;
        while let Some(id) = current {
            depth += 1;
            current = self.nodes.get(id).and_then(|n| n.parent_id.as_deref());
        }
        depth
    }

    /// `(name, error, error_kind)` for every entity currently in `Failed`
    /// status, in first-seen order.
    pub fn failed_summary(&self) -> Vec<(String, String, String)> {
        self.order
            .iter()
            .filter_map(|id| self.nodes.get(id))
            .filter(|n| n.status == Status::Failed)
            .map(|n| {
                (
                    n.name.clone(),
                    n.error.clone().unwrap_or_default(),
                    n.error_kind.clone().unwrap_or_default(),
                )
            })
            .collect()
    }
}

fn cache_suffix(record: &StatusRecord) -> &'static str {
    match &record.origin_id {
        Some(origin) if *origin != record.id => " (cached)",
        _ => "",
    }
}

#[cfg(test)]
#[path = "renderer_tests.rs"]
mod tests;
