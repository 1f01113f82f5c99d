// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Docker-backed `Sandbox`/`SandboxManager`.
//!
//! Mirrors a prior Python implementation's `docker_sandbox.py`:
//! `create` is `docker run -d <image> tail -f /dev/null` followed by
//! `docker exec <id> mkdir -p <state dir>`; `execute` is `docker exec` with
//! env/cwd/command passed as their own argv entries (no shell sits between
//! this process and `docker`, so nothing here is shell-quoted — only the
//! inner `bash -c` script itself, once built, may need its own embedded
//! values quoted, as `write_job_result` does); `destroy` is `docker stop -t
//! 0` then `docker rm`; `take_snapshot` is `docker commit`;
//! `snapshot_exists` is `docker images --format ...`. All invocations shell
//! out via `tokio::process::Command` rather than a Docker Engine API
//! client, preferring to shell out to external binaries over embedding a
//! heavyweight SDK.

use crate::traits::{Sandbox, SandboxConfig, SandboxManager, JOB_RESULT_PATH, SANDBOX_STATE_DIR};
use async_trait::async_trait;
use base64::Engine as _;
use flowforge_core::{CommandResult, EngineError, JobResult};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::path::Path;
use std::process::Stdio;
use tokio::process::Command;

/// A single-quoted shell argument, matching Python's `shlex.quote`: wrap in
/// single quotes, escaping embedded single quotes as `'\''`.
fn shell_quote(arg: &str) -> String {
    if !arg.is_empty() && arg.bytes().all(|b| {
        b.is_ascii_alphanumeric() || matches!(b, b'_' | b'-' | b'.' | b'/' | b':' | b'@')
    }) {
        return arg.to_string();
    }
    format!("'{}'", arg.replace('\'', "'\\''"))
}

async fn run_docker(args: &[&str]) -> Result<CommandResult, EngineError> {
    let output = Command::new("docker")
        .args(args)
        .stdin(Stdio::null())
        .output()
        .await?;
    Ok(CommandResult::new(
        output.status.code().unwrap_or(-1),
        String::from_utf8_lossy(&output.stdout).into_owned(),
        String::from_utf8_lossy(&output.stderr).into_owned(),
    ))
}

pub struct DockerSandbox {
    container_id: String,
    snapshot_tag: Mutex<Option<String>>,
}

impl DockerSandbox {
    fn new(container_id: String) -> Self {
        Self { container_id, snapshot_tag: Mutex::new(None) }
    }
}

#[async_trait]
impl Sandbox for DockerSandbox {
    fn id(&self) -> &str {
        &self.container_id
    }

    fn snapshot_tag(&self) -> Option<String> {
        self.snapshot_tag.lock().clone()
    }

    fn set_snapshot_tag(&self, tag: String) {
        *self.snapshot_tag.lock() = Some(tag);
    }

    async fn execute(
        &self,
        command: &str,
        cwd: Option<&Path>,
        env: &HashMap<String, String>,
    ) -> Result<CommandResult, EngineError> {
        let docker_args = build_exec_args(&self.container_id, command, cwd, env)?;
        let args: Vec<&str> = docker_args.iter().map(String::as_str).collect();
        run_docker(&args).await
    }
}

/// Build the `docker exec` argv for dispatching `command` inside
/// `container_id`. Kept separate from `execute` so it's testable without a
/// running `docker` daemon.
///
/// `tokio::process::Command` passes each element of `args` straight through
/// to `execve` as its own argv entry — there is no shell in between to strip
/// quoting the way there is when a prior implementation built one string
/// and handed it to a shell. Quoting any of these would make the literal
/// quote characters part of the value docker sees, so every value here is
/// passed verbatim.
fn build_exec_args(
    container_id: &str,
    command: &str,
    cwd: Option<&Path>,
    env: &HashMap<String, String>,
) -> Result<Vec<String>, EngineError> {
    let mut docker_args: Vec<String> = vec!["exec".into()];
    for (key, value) in env {
        if key.is_empty() {
            return Err(EngineError::InvalidArgument("environment key must not be empty".into()));
        }
        docker_args.push("-e".into());
        docker_args.push(format!("{key}={value}"));
    }
    if let Some(cwd) = cwd {
        docker_args.push("-w".into());
        docker_args.push(cwd.to_string_lossy().into_owned());
    }
    docker_args.push(container_id.to_string());
    docker_args.push("bash".into());
    docker_args.push("-c".into());
    docker_args.push(command.to_string());
    Ok(docker_args)
}

/// `SandboxManager` backed by the `docker` CLI. `tag_prefix` replaces a
/// prior implementation's hardcoded `river-sandbox` with a configurable
/// repository name chosen at build time.
pub struct DockerSandboxManager {
    tag_prefix: String,
}

impl DockerSandboxManager {
    pub fn new(tag_prefix: impl Into<String>) -> Self {
        Self { tag_prefix: tag_prefix.into() }
    }
}

impl Default for DockerSandboxManager {
    fn default() -> Self {
        Self::new(crate::traits::DEFAULT_TAG_PREFIX)
    }
}

#[async_trait]
impl SandboxManager for DockerSandboxManager {
    async fn create(&self, config: &SandboxConfig) -> Result<Box<dyn Sandbox>, EngineError> {
        let run = run_docker(&["run", "-d", &config.image, "tail", "-f", "/dev/null"]).await?;
        if !run.ok() {
            return Err(EngineError::Io(std::io::Error::other(format!(
                "docker run failed: {}",
                run.stderr
            ))));
        }
        let container_id = run.stdout.trim().to_string();
        let mkdir = run_docker(&["exec", &container_id, "mkdir", "-p", SANDBOX_STATE_DIR]).await?;
        if !mkdir.ok() {
            return Err(EngineError::Io(std::io::Error::other(format!(
                "failed to initialize sandbox state dir: {}",
                mkdir.stderr
            ))));
        }
        Ok(Box::new(DockerSandbox::new(container_id)))
    }

    async fn fork(&self, source: &dyn Sandbox) -> Result<Box<dyn Sandbox>, EngineError> {
        let tag = source.snapshot_tag().ok_or(EngineError::NoSnapshot)?;
        self.create(&SandboxConfig::new(tag)).await
    }

    async fn destroy(&self, sandbox: Box<dyn Sandbox>) -> Result<(), EngineError> {
        let _ = run_docker(&["stop", "-t", "0", sandbox.id()]).await?;
        let _ = run_docker(&["rm", sandbox.id()]).await?;
        Ok(())
    }

    async fn take_snapshot(
        &self,
        sandbox: &dyn Sandbox,
        fingerprint: &str,
    ) -> Result<String, EngineError> {
        let tag = self.tag_for(fingerprint);
        let commit = run_docker(&["commit", sandbox.id(), &tag]).await?;
        if !commit.ok() {
            return Err(EngineError::SnapshotFailed(commit.stderr));
        }
        sandbox.set_snapshot_tag(tag.clone());
        Ok(tag)
    }

    async fn snapshot_exists(&self, fingerprint: &str) -> Result<bool, EngineError> {
        let tag = self.tag_for(fingerprint);
        let images =
            run_docker(&["images", "--format", "{{.Repository}}:{{.Tag}}"]).await?;
        Ok(images.stdout.lines().any(|line| line == tag))
    }

    async fn write_job_result(
        &self,
        sandbox: &dyn Sandbox,
        result: &JobResult,
    ) -> Result<(), EngineError> {
        let json = serde_json::to_vec(result).map_err(std::io::Error::other)?;
        let encoded = base64::engine::general_purpose::STANDARD.encode(json);
        let command = format!("echo {} | base64 -d > {}", shell_quote(&encoded), JOB_RESULT_PATH);
        let env = HashMap::new();
        let result = sandbox.execute(&command, None, &env).await?;
        if !result.ok() {
            return Err(EngineError::Io(std::io::Error::other(format!(
                "failed to write job result: {}",
                result.stderr
            ))));
        }
        Ok(())
    }

    async fn read_job_result(&self, fingerprint: &str) -> Result<JobResult, EngineError> {
        let tag = self.tag_for(fingerprint);
        let cat = run_docker(&["run", "--rm", &tag, "cat", JOB_RESULT_PATH]).await?;
        if !cat.ok() {
            return Err(EngineError::Io(std::io::Error::other(format!(
                "failed to read job result from {tag}: {}",
                cat.stderr
            ))));
        }
        let decoded = base64::engine::general_purpose::STANDARD
            .decode(cat.stdout.trim())
            .map_err(std::io::Error::other)?;
        serde_json::from_slice(&decoded).map_err(|e| EngineError::Io(std::io::Error::other(e)))
    }

    fn tag_for(&self, fingerprint: &str) -> String {
        format!("{}:{}", self.tag_prefix, fingerprint)
    }
}

#[cfg(test)]
#[path = "docker_tests.rs"]
mod tests;
