// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Remote `CommandExecutor`: re-expresses a prior Python implementation's
//! fabric `Connection(host, user, key_filename, password, port)` as
//! shelling out to the system `ssh` binary, preferring an external binary
//! over embedding a protocol client (see the sandbox crate's `docker.rs`,
//! which does the same for the container runtime).
//!
//! Password authentication shells out to `sshpass` rather than `ssh`
//! directly — `ssh`
//! itself has no non-interactive password flag. The password is handed to
//! `sshpass` through the `SSHPASS` environment variable of the spawned
//! process (`sshpass -e`), not as a command-line argument, so it does not
//! show up in another user's `ps` listing on the same host. Key-based and
//! agent-based auth still go through plain `ssh` and ordinary `ssh`
//! configuration (`~/.ssh/config`, `ssh-agent`); `-o BatchMode=yes` is only
//! applied in that path, since batch mode suppresses the password prompt
//! `sshpass` needs to answer.

use crate::env::sanitize_env;
use crate::executor::CommandExecutor;
use async_trait::async_trait;
use flowforge_core::{CommandResult, EngineError};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::process::Command;

/// Connection parameters for a remote host, addressed over `ssh`.
#[derive(Clone)]
pub struct RemoteTarget {
    pub host: String,
    pub user: Option<String>,
    pub port: Option<u16>,
    pub key_path: Option<PathBuf>,
    pub password: Option<String>,
}

impl std::fmt::Debug for RemoteTarget {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RemoteTarget")
            .field("host", &self.host)
            .field("user", &self.user)
            .field("port", &self.port)
            .field("key_path", &self.key_path)
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

impl RemoteTarget {
    pub fn new(host: impl Into<String>) -> Self {
        Self { host: host.into(), user: None, port: None, key_path: None, password: None }
    }

    pub fn with_user(mut self, user: impl Into<String>) -> Self {
        self.user = Some(user.into());
        self
    }

    pub fn with_port(mut self, port: u16) -> Self {
        self.port = Some(port);
        self
    }

    pub fn with_key_path(mut self, key_path: impl Into<PathBuf>) -> Self {
        self.key_path = Some(key_path.into());
        self
    }

    /// Authenticate with `password` via `sshpass` instead of key/agent auth.
    pub fn with_password(mut self, password: impl Into<String>) -> Self {
        self.password = Some(password.into());
        self
    }

    fn destination(&self) -> String {
        match &self.user {
            Some(user) => format!("{user}@{}", self.host),
            None => self.host.clone(),
        }
    }
}

pub struct RemoteExecutor {
    target: RemoteTarget,
}

impl RemoteExecutor {
    pub fn new(target: RemoteTarget) -> Self {
        Self { target }
    }
}

#[async_trait]
impl CommandExecutor for RemoteExecutor {
    async fn run(
        &self,
        command: &str,
        cwd: Option<&Path>,
        env: &HashMap<String, String>,
    ) -> Result<CommandResult, EngineError> {
        sanitize_env(env)?;

        let mut remote_command = String::new();
        for (key, value) in env {
            remote_command.push_str(&format!("export {key}={}; ", shell_quote(value)));
        }
        if let Some(cwd) = cwd {
            remote_command.push_str(&format!("cd {} && ", shell_quote(&cwd.to_string_lossy())));
        }
        remote_command.push_str(command);

        let mut args: Vec<String> = Vec::new();
        if self.target.password.is_none() {
            // `BatchMode=yes` fails fast instead of hanging on a prompt the
            // caller can't answer — but a password auth needs exactly the
            // prompt this suppresses, so it's only set on the keyed/agent
            // path.
            args.push("-o".into());
            args.push("BatchMode=yes".into());
        }
        if let Some(port) = self.target.port {
            args.push("-p".into());
            args.push(port.to_string());
        }
        if let Some(key_path) = &self.target.key_path {
            args.push("-i".into());
            args.push(key_path.to_string_lossy().into_owned());
        }
        args.push(self.target.destination());
        args.push(remote_command);

        let mut process = match &self.target.password {
            Some(password) => {
                let mut process = Command::new("sshpass");
                process.arg("-e").arg("ssh").env("SSHPASS", password);
                process
            }
            None => Command::new("ssh"),
        };
        let output = process.args(&args).stdin(Stdio::null()).output().await;
        let output = match output {
            Ok(output) => output,
            Err(err) => {
                return Ok(CommandResult::connection_error(format!(
                    "ssh dispatch to {} failed: {err}",
                    self.target.host
                )))
            }
        };

        Ok(CommandResult::new(
            output.status.code().unwrap_or(-1),
            String::from_utf8_lossy(&output.stdout).into_owned(),
            String::from_utf8_lossy(&output.stderr).into_owned(),
        ))
    }
}

fn shell_quote(arg: &str) -> String {
    if !arg.is_empty()
        && arg.bytes().all(|b| b.is_ascii_alphanumeric() || matches!(b, b'_' | b'-' | b'.' | b'/' | b':' | b'@'))
    {
        return arg.to_string();
    }
    format!("'{}'", arg.replace('\'', "'\\''"))
}

#[cfg(test)]
#[path = "remote_tests.rs"]
mod tests;
