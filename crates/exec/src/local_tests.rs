// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[tokio::test]
async fn runs_a_trivial_command() {
    let executor = LocalExecutor::new();
    let env = HashMap::new();
    let result = executor.run("echo hello", None, &env).await.unwrap();
    assert!(result.ok());
    assert_eq!(result.stdout.trim(), "hello");
}

#[tokio::test]
async fn never_raises_for_nonzero_exit() {
    let executor = LocalExecutor::new();
    let env = HashMap::new();
    let result = executor.run("exit 7", None, &env).await.unwrap();
    assert!(!result.ok());
    assert_eq!(result.exit_code, 7);
}

#[tokio::test]
async fn passes_environment_variables_through() {
    let executor = LocalExecutor::new();
    let mut env = HashMap::new();
    env.insert("FLOWFORGE_TEST_VAR".to_string(), "sentinel".to_string());
    let result = executor.run("echo $FLOWFORGE_TEST_VAR", None, &env).await.unwrap();
    assert_eq!(result.stdout.trim(), "sentinel");
}

#[tokio::test]
async fn rejects_empty_env_key_before_dispatch() {
    let executor = LocalExecutor::new();
    let mut env = HashMap::new();
    env.insert(String::new(), "value".to_string());
    let err = executor.run("echo hi", None, &env).await.unwrap_err();
    assert_eq!(err.kind(), "InvalidArgument");
}

#[tokio::test]
async fn runs_in_the_given_working_directory() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("marker.txt"), "present").unwrap();
    let executor = LocalExecutor::new();
    let env = HashMap::new();
    let result = executor.run("cat marker.txt", Some(dir.path()), &env).await.unwrap();
    assert_eq!(result.stdout, "present");
}
