// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `CommandExecutor`: polymorphic over the capability set
//! `run(command, cwd, env) -> (exit_code, stdout, stderr)`.

use async_trait::async_trait;
use flowforge_core::{CommandResult, EngineError};
use std::collections::HashMap;
use std::path::Path;

/// Runs a shell command somewhere — locally or over a remote transport —
/// and captures its outcome. Implementations never raise for a non-zero
/// exit; only dispatch failures (bad args, unreachable host) are `Err`.
#[async_trait]
pub trait CommandExecutor: Send + Sync {
    async fn run(
        &self,
        command: &str,
        cwd: Option<&Path>,
        env: &HashMap<String, String>,
    ) -> Result<CommandResult, EngineError>;
}

#[cfg(test)]
#[path = "executor_tests.rs"]
mod tests;
