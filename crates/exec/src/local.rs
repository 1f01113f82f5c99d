// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Local `CommandExecutor`: runs the command through `bash -c` in-process
//! via `tokio::process::Command`, wrapping
//! `std::process::Command`/`tokio::process::Command` directly rather than a
//! shell-execution crate.

use crate::env::sanitize_env;
use crate::executor::CommandExecutor;
use async_trait::async_trait;
use flowforge_core::{CommandResult, EngineError};
use std::collections::HashMap;
use std::path::Path;
use std::process::Stdio;
use tokio::process::Command;

#[derive(Debug, Default, Clone, Copy)]
pub struct LocalExecutor;

impl LocalExecutor {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl CommandExecutor for LocalExecutor {
    async fn run(
        &self,
        command: &str,
        cwd: Option<&Path>,
        env: &HashMap<String, String>,
    ) -> Result<CommandResult, EngineError> {
        sanitize_env(env)?;

        let mut cmd = Command::new("bash");
        cmd.arg("-c").arg(command).stdin(Stdio::null()).envs(env);
        if let Some(cwd) = cwd {
            cmd.current_dir(cwd);
        }

        let output = cmd.output().await?;
        Ok(CommandResult::new(
            output.status.code().unwrap_or(-1),
            String::from_utf8_lossy(&output.stdout).into_owned(),
            String::from_utf8_lossy(&output.stderr).into_owned(),
        ))
    }
}

#[cfg(test)]
#[path = "local_tests.rs"]
mod tests;
