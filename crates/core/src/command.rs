// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `CommandResult` — the shared return shape for both the Command Executor
//! and `Sandbox::execute`.
//!
//! A prior Python implementation wrapped `invoke`/`fabric`'s `Result`
//! (exposing `.ok`, `.exited`, `.stdout`, `.stderr`); this is the same shape
//! re-expressed as a plain struct that wraps `std::process::Output` rather
//! than depending on the subprocess library's own result type.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandResult {
    pub exit_code: i32,
    pub stdout: String,
    pub stderr: String,
}

impl CommandResult {
    pub fn new(exit_code: i32, stdout: impl Into<String>, stderr: impl Into<String>) -> Self {
        Self { exit_code, stdout: stdout.into(), stderr: stderr.into() }
    }

    /// Collapse a connection-level failure (e.g. an unreachable remote
    /// host) into the same shape a nonzero-exit command would produce:
    /// `exit_code` nonzero, `stderr` carrying the error message.
    pub fn connection_error(message: impl Into<String>) -> Self {
        Self { exit_code: -1, stdout: String::new(), stderr: message.into() }
    }

    pub fn ok(&self) -> bool {
        self.exit_code == 0
    }
}

#[cfg(test)]
#[path = "command_tests.rs"]
mod tests;
