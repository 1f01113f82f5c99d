// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `StatusRecord` and the single-writer line-delimited JSON stream.

use crate::clock::Clock;
use crate::entity::EntityKind;
use crate::status::Status;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::io::Write;
use std::sync::Arc;

/// One JSON object per line on the status stream.
///
/// Unknown fields on the wire MUST be tolerated by consumers; this struct
/// deliberately does not `deny_unknown_fields`. Consumers also skip lines
/// that fail to parse rather than treating them as fatal.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusRecord {
    pub id: String,
    pub kind: EntityKind,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<String>,
    pub status: Status,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub origin_id: Option<String>,
    pub updated_at: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_kind: Option<String>,
}

impl StatusRecord {
    /// Build a record stamped with the current clock time as RFC3339 UTC.
    pub fn new(
        id: impl Into<String>,
        kind: EntityKind,
        name: impl Into<String>,
        parent_id: Option<String>,
        status: Status,
        origin_id: Option<String>,
        clock: &impl Clock,
    ) -> Self {
        Self::at_epoch_ms(id, kind, name, parent_id, status, origin_id, clock.epoch_ms())
    }

    /// Build a record stamped with an explicit epoch-ms timestamp.
    ///
    /// Used wherever only the object-safe [`crate::clock::EpochClock`] slice
    /// is available instead of a concrete `impl Clock` (the engine crate's
    /// per-Job run dependencies, erased so Job recursion isn't generic over
    /// the clock type).
    pub fn at_epoch_ms(
        id: impl Into<String>,
        kind: EntityKind,
        name: impl Into<String>,
        parent_id: Option<String>,
        status: Status,
        origin_id: Option<String>,
        epoch_ms: u64,
    ) -> Self {
        Self {
            id: id.into(),
            kind,
            name: name.into(),
            parent_id,
            status,
            origin_id,
            updated_at: format_epoch_ms(epoch_ms),
            error: None,
            error_kind: None,
        }
    }

    /// Attach error fields; only meaningful when `status == Failed`. Cleared
    /// implicitly by never being set on any other transition away from
    /// Failed.
    pub fn with_error(mut self, error: impl Into<String>, error_kind: impl Into<String>) -> Self {
        self.error = Some(error.into());
        self.error_kind = Some(error_kind.into());
        self
    }
}

fn format_epoch_ms(epoch_ms: u64) -> String {
    let secs = (epoch_ms / 1000) as i64;
    let nanos = ((epoch_ms % 1000) * 1_000_000) as u32;
    chrono::DateTime::from_timestamp(secs, nanos)
        .unwrap_or_default()
        .to_rfc3339_opts(chrono::SecondsFormat::Millis, true)
}

/// Single writer for the status stream. Wraps an arbitrary `Write` sink in a
/// mutex so concurrent emitters (parallel sibling Jobs) never interleave
/// partial lines.
#[derive(Clone)]
pub struct StatusWriter {
    sink: Arc<Mutex<Box<dyn Write + Send>>>,
}

impl StatusWriter {
    pub fn new(sink: impl Write + Send + 'static) -> Self {
        Self { sink: Arc::new(Mutex::new(Box::new(sink))) }
    }

    /// Writer over the process's standard output, matching the producer
    /// contract consumers expect on the status stream.
    pub fn stdout() -> Self {
        Self::new(std::io::stdout())
    }

    /// Serialize and emit one record, flushing immediately so each
    /// emission is durable before the next one starts.
    pub fn emit(&self, record: &StatusRecord) -> std::io::Result<()> {
        let mut line = serde_json::to_string(record).map_err(std::io::Error::other)?;
        line.push('\n');
        let mut sink = self.sink.lock();
        sink.write_all(line.as_bytes())?;
        sink.flush()
    }
}

#[cfg(test)]
#[path = "record_tests.rs"]
mod tests;
