// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Black-box tests for the `flowforge run` CLI surface: it spawns a
//! program, renders its stdout status stream, and mirrors its exit code.
//! Exercised against `bash -c <script>` rather than a full workflow
//! program, since the renderer only cares about the shape of the stream on
//! the wire.

use crate::prelude::flowforge_cmd;

#[test]
fn renders_the_stream_and_exits_zero_on_success() {
    let script = concat!(
        r#"echo '{"id":"root-1","kind":"root","name":"demo","status":"running","updated_at":"2026-01-01T00:00:00Z"}'"#,
        "\n",
        r#"echo '{"id":"job-1","kind":"job","name":"build","parent_id":"root-1","status":"success","updated_at":"2026-01-01T00:00:01Z"}'"#,
        "\n",
        "exit 0",
    );

    let assert = flowforge_cmd().args(["run", "bash", "-c", script]).assert().success();
    let stdout = String::from_utf8_lossy(&assert.get_output().stdout).into_owned();
    assert!(stdout.contains("[job] build: success"), "stdout was: {stdout}");
}

#[test]
fn propagates_nonzero_exit_and_prints_a_failure_summary() {
    let script = concat!(
        r#"echo '{"id":"job-1","kind":"job","name":"build","status":"failed","error":"boom","error_kind":"TaskExecutionError","updated_at":"2026-01-01T00:00:00Z"}'"#,
        "\n",
        "exit 3",
    );

    let assert = flowforge_cmd().args(["run", "bash", "-c", script]).assert().code(3);
    let stdout = String::from_utf8_lossy(&assert.get_output().stdout).into_owned();
    assert!(stdout.contains("Failures:"), "stdout was: {stdout}");
    assert!(stdout.contains("boom"), "stdout was: {stdout}");
}

#[test]
fn a_malformed_line_is_skipped_not_fatal() {
    let script = concat!(
        "echo 'not json at all'\n",
        r#"echo '{"id":"job-1","kind":"job","name":"build","status":"success","updated_at":"2026-01-01T00:00:00Z"}'"#,
        "\n",
        "exit 0",
    );

    let assert = flowforge_cmd().args(["run", "bash", "-c", script]).assert().success();
    let stdout = String::from_utf8_lossy(&assert.get_output().stdout).into_owned();
    assert!(stdout.contains("[job] build: success"), "stdout was: {stdout}");
}
