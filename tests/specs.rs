// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Workspace-level behavioral specs for the Flow Engine: each of spec.md
//! §8's scenarios exercised end-to-end across `flowforge-core` +
//! `flowforge-sandbox` + `flowforge-exec` + `flowforge-engine`, plus
//! black-box specs for the `flowforge` CLI surface.

#[path = "specs/prelude.rs"]
mod prelude;

#[path = "specs/engine/linear_success.rs"]
mod engine_linear_success;
#[path = "specs/engine/fan_in_diamond.rs"]
mod engine_fan_in_diamond;
#[path = "specs/engine/upstream_failure.rs"]
mod engine_upstream_failure;
#[path = "specs/engine/cycle_rejection.rs"]
mod engine_cycle_rejection;
#[path = "specs/engine/task_failure.rs"]
mod engine_task_failure;
#[path = "specs/engine/fork_lineage.rs"]
mod engine_fork_lineage;

#[path = "specs/cli/run.rs"]
mod cli_run;
