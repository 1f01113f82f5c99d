// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The Fingerprinter: deterministic content hashing over a Job's cache key.
//!
//! A prior Python implementation of this system fingerprinted a job by
//! pickling its closure with a content-addressable encoder that tracks,
//! by reference, every third-party module the closure touches and its
//! installed version, then hashed
//! `pickled_bytes + str(deps) + interpreter_version`. Rust has no runtime
//! reflection over a closure's captured environment or the modules its body
//! references, so this is reimplemented as a content hash over a
//! caller-supplied, deterministic encoding of "what would behave
//! differently": the closure's own cache key plus the crate's declared
//! dependency versions plus the compiler/runtime version string. Only
//! closures whose behavior is fully captured by the `CacheKey` a caller
//! supplies can be safely fingerprinted — callers that close over unmodeled
//! mutable state will get false cache hits.
//!
//! That prior implementation hashed with SHA-1 (160 bits). This
//! implementation uses SHA-256 (see `DESIGN.md`): it strictly dominates that
//! floor and reuses the same hashing crate this workspace already depends on
//! elsewhere.

use serde::Serialize;
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;

/// Supplies the deterministic, language-appropriate encoding of "everything
/// that could change a Job's behavior" that the source derived by pickling
/// the closure. Implement this on whatever type models a Job's `main` body
/// and its captured environment.
///
/// Keys of the encoding must be normalized so that two behaviorally
/// equivalent closures — e.g. ones differing only in an instance-address-
/// derived token — hash equal.
pub trait CacheKey {
    /// A byte encoding of the closure's code and captured values. Must be
    /// stable across processes and machines for behaviorally identical
    /// inputs.
    fn encode(&self) -> Vec<u8>;
}

impl CacheKey for &str {
    fn encode(&self) -> Vec<u8> {
        self.as_bytes().to_vec()
    }
}

impl CacheKey for String {
    fn encode(&self) -> Vec<u8> {
        self.as_bytes().to_vec()
    }
}

/// The (name → version) map mixed into the hash, standing in for the
/// prior implementation's `DependencyTracker` (third-party modules
/// referenced by the closure). Built with a `BTreeMap` so iteration order —
/// and therefore the serialized bytes — is deterministic regardless of
/// insertion order.
#[derive(Debug, Clone, Default, Serialize)]
pub struct DependencyManifest(BTreeMap<String, String>);

impl DependencyManifest {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: impl Into<String>, version: impl Into<String>) -> &mut Self {
        self.0.insert(name.into(), version.into());
        self
    }

    pub fn with(mut self, name: impl Into<String>, version: impl Into<String>) -> Self {
        self.insert(name, version);
        self
    }
}

/// Produces fingerprints over a `CacheKey`, a [`DependencyManifest`], and an
/// environment descriptor (a runtime version string).
#[derive(Debug, Clone)]
pub struct Fingerprinter {
    environment: String,
}

impl Fingerprinter {
    /// `environment` is mixed in verbatim — typically `rustc`'s version
    /// string, so a newer toolchain yields a different hash.
    pub fn new(environment: impl Into<String>) -> Self {
        Self { environment: environment.into() }
    }

    /// Compute the hex digest for a closure's cache key and its dependency
    /// manifest.
    pub fn fingerprint(&self, key: &impl CacheKey, deps: &DependencyManifest) -> String {
        let mut hasher = Sha256::new();
        hasher.update(key.encode());
        // `str(deps_info)`-equivalent: a canonical JSON encoding, not a
        // language-specific debug format, so independent processes that
        // built the same manifest always serialize identically.
        let deps_json =
            serde_json::to_vec(deps).unwrap_or_default();
        hasher.update(&deps_json);
        hasher.update(self.environment.as_bytes());
        let digest = hasher.finalize();
        hex_encode(&digest)
    }
}

/// The runtime/interpreter version string to mix into every fingerprint, so
/// a newer runtime yields a different hash. Shells out to `rustc --version`
/// once per process and caches the result; an unavailable toolchain is
/// non-fatal, falling back to `"unknown"` — which still satisfies
/// determinism within a single environment, just not across environments
/// where the fallback is hit for different reasons.
pub fn rustc_environment() -> &'static str {
    static ENV: std::sync::OnceLock<String> = std::sync::OnceLock::new();
    ENV.get_or_init(|| {
        std::process::Command::new("rustc")
            .arg("--version")
            .output()
            .ok()
            .filter(|o| o.status.success())
            .and_then(|o| String::from_utf8(o.stdout).ok())
            .map(|s| s.trim().to_string())
            .unwrap_or_else(|| "unknown".to_string())
    })
}

fn hex_encode(bytes: &[u8]) -> String {
    use std::fmt::Write;
    let mut out = String::with_capacity(bytes.len() * 2);
    for b in bytes {
        // unwrap: write! to a String never fails.
        let _ = write!(out, "{:02x}", b);
    }
    out
}

#[cfg(test)]
#[path = "fingerprint_tests.rs"]
mod tests;
