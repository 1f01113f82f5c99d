// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[test]
fn empty_map_is_fine() {
    assert!(sanitize_env(&HashMap::new()).is_ok());
}

#[test]
fn populated_keys_are_fine() {
    let mut env = HashMap::new();
    env.insert("PATH".to_string(), "/usr/bin".to_string());
    assert!(sanitize_env(&env).is_ok());
}

#[test]
fn empty_key_is_rejected() {
    let mut env = HashMap::new();
    env.insert(String::new(), "value".to_string());
    let err = sanitize_env(&env).unwrap_err();
    assert_eq!(err.kind(), "InvalidArgument");
}

#[test]
fn empty_value_is_allowed() {
    let mut env = HashMap::new();
    env.insert("FLAG".to_string(), String::new());
    assert!(sanitize_env(&env).is_ok());
}
