// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! flowforge — the CLI surface of the Status Stream Renderer.
//!
//! Invokes a sub-process (the workflow program), reads its stdout as the
//! status stream, forwards its stderr for diagnostics, and exits with the
//! child's exit code. This binary never runs a Job or DAG itself — that's
//! `flowforge-engine`, linked into the user's own workflow program.
//! `flowforge run` is purely an external collaborator: it tees the child's
//! status stream through a [`renderer::Renderer`] and mirrors its exit.

mod color;
mod exit_error;
mod renderer;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use exit_error::ExitError;
use renderer::Renderer;
use std::process::Stdio;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::Command;

const VERSION: &str = concat!(env!("CARGO_PKG_VERSION"), "+", env!("BUILD_GIT_HASH"));

#[derive(Parser)]
#[command(name = "flowforge", version = VERSION, about = "Flow Engine status stream renderer")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a workflow program and render its status stream live.
    Run {
        /// The workflow program to execute.
        program: String,
        /// Arguments passed through to the program.
        #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
        args: Vec<String>,
    },
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    if let Err(err) = run().await {
        let code = err.downcast_ref::<ExitError>().map_or(1, |e| e.code);
        let message = err.to_string();
        if !message.is_empty() {
            eprintln!("Error: {message}");
        }
        std::process::exit(code);
    }
}

async fn run() -> Result<()> {
    let cli = Cli::parse();
    match cli.command {
        Commands::Run { program, args } => run_program(&program, &args).await,
    }
}

/// Spawn `program`, render its status stream as it arrives, forward its
/// stderr untouched, and exit with its exit code.
async fn run_program(program: &str, args: &[String]) -> Result<()> {
    let mut child = Command::new(program)
        .args(args)
        .stdout(Stdio::piped())
        .stderr(Stdio::inherit())
        .spawn()
        .with_context(|| format!("failed to spawn workflow program {program:?}"))?;

    let stdout = child.stdout.take().expect("stdout was piped");
    let mut lines = BufReader::new(stdout).lines();
    let mut renderer = Renderer::new();

    while let Some(line) = lines.next_line().await.context("reading status stream")? {
        // An invalid line is treated as skipped, not fatal — logged and
        // dropped, never a reason to abort the run.
        match serde_json::from_str::<flowforge_core::StatusRecord>(&line) {
            Ok(record) => renderer.apply(record),
            Err(err) => tracing::warn!(%err, line = %line, "skipping malformed status record"),
        }
    }

    let status = child.wait().await.context("waiting for workflow program")?;

    let summary = renderer.failed_summary();
    if !summary.is_empty() {
        println!();
        println!("{}", color::header("Failures:"));
        for (name, error, error_kind) in &summary {
            println!("  {} ({error_kind}): {error}", color::literal(name));
        }
    }

    let code = status.code().unwrap_or(1);
    if code != 0 {
        return Err(ExitError::new(code, String::new()).into());
    }
    Ok(())
}
