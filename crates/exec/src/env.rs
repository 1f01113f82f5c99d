// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Shared environment-sanitization helper: keys must be non-null and
//! stringifiable to non-empty strings; values are stringified (null becomes
//! empty). A null key or an empty-string key fails with InvalidArgument
//! before any command is dispatched.
//!
//! Rust has no null/None distinction inside a `HashMap<String, String>`
//! key, so the only remaining failure mode here is the empty-string key;
//! callers that build their env from something optional (e.g. a
//! `HashMap<String, Option<String>>`) fold `None` to `String::new()`
//! before calling this.

use flowforge_core::EngineError;
use std::collections::HashMap;

/// Reject any entry whose key is empty. Returns the map unchanged
/// otherwise — there is nothing left to coerce once keys and values are
/// already `String`.
pub fn sanitize_env(env: &HashMap<String, String>) -> Result<(), EngineError> {
    if env.keys().any(|key| key.is_empty()) {
        return Err(EngineError::InvalidArgument(
            "environment key must not be empty".into(),
        ));
    }
    Ok(())
}

#[cfg(test)]
#[path = "env_tests.rs"]
mod tests;
