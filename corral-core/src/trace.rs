//! Trace identifiers for pipeline-run correlation.
//!
//! One root `TraceId` exists per externally-triggered pipeline run. Every
//! stage, the committed claim, and every telemetry event carry that exact
//! value. Child IDs exist only as a naming affordance for sub-operations
//! and are never substituted for the root.

use crate::error::TraceIdError;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Hex width of the nanosecond timestamp segment.
const TS_WIDTH: usize = 16;
/// Hex width of the random suffix segment.
const SUFFIX_WIDTH: usize = 32;

/// Correlation identifier for one pipeline run.
///
/// Format: `{nanos:016x}-{random:032x}`, optionally followed by
/// `.segment` suffixes for derived children. The fixed-width timestamp
/// prefix makes IDs sortable by creation time; the separator guarantees a
/// generated ID is never a string prefix of a different generated ID's
/// meaningful content. Opaque to every component except this module.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TraceId(String);

impl TraceId {
    /// Generate a fresh root trace ID.
    ///
    /// Combines a nanosecond UTC timestamp with a cryptographically random
    /// 128-bit suffix. No shared state and no I/O, safe to call from any
    /// number of threads or processes without coordination.
    pub fn generate() -> Self {
        let nanos = Utc::now()
            .timestamp_nanos_opt()
            .unwrap_or_else(|| Utc::now().timestamp_micros().saturating_mul(1_000));
        let suffix = Uuid::new_v4().as_u128();
        TraceId(format!(
            "{:0ts$x}-{:0sf$x}",
            nanos as u64,
            suffix,
            ts = TS_WIDTH,
            sf = SUFFIX_WIDTH
        ))
    }

    /// Derive a child ID for bookkeeping of a sub-operation.
    ///
    /// The parent remains recoverable by string containment. A derived ID
    /// must never be handed to an API that asks for "the" trace ID of a
    /// run; only the root value correlates telemetry.
    pub fn derive_child(&self, suffix: &str) -> Self {
        TraceId(format!("{}.{}", self.0, suffix))
    }

    /// The root ID this value belongs to (itself, if not derived).
    pub fn root(&self) -> TraceId {
        match self.0.split_once('.') {
            Some((root, _)) => TraceId(root.to_string()),
            None => self.clone(),
        }
    }

    /// Whether this ID was derived (directly or transitively) from `parent`.
    pub fn is_child_of(&self, parent: &TraceId) -> bool {
        self.0.len() > parent.0.len()
            && self.0.starts_with(parent.0.as_str())
            && self.0.as_bytes()[parent.0.len()] == b'.'
    }

    /// Whether this is a root ID rather than a derived child.
    pub fn is_root(&self) -> bool {
        !self.0.contains('.')
    }

    /// Validate and wrap an externally supplied trace ID string.
    pub fn parse(s: &str) -> Result<Self, TraceIdError> {
        let root = s.split('.').next().unwrap_or("");
        let mut segments = root.splitn(2, '-');
        let ts = segments.next().unwrap_or("");
        let suffix = segments.next().unwrap_or("");
        if ts.len() != TS_WIDTH || !ts.bytes().all(|b| b.is_ascii_hexdigit()) {
            return Err(TraceIdError::Malformed {
                value: s.to_string(),
                reason: format!("timestamp segment must be {} hex chars", TS_WIDTH),
            });
        }
        if suffix.len() != SUFFIX_WIDTH || !suffix.bytes().all(|b| b.is_ascii_hexdigit()) {
            return Err(TraceIdError::Malformed {
                value: s.to_string(),
                reason: format!("random segment must be {} hex chars", SUFFIX_WIDTH),
            });
        }
        if s.split('.').skip(1).any(|seg| seg.is_empty()) {
            return Err(TraceIdError::Malformed {
                value: s.to_string(),
                reason: "empty child segment".to_string(),
            });
        }
        Ok(TraceId(s.to_string()))
    }

    /// Borrow the string form.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TraceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for TraceId {
    type Err = TraceIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

// =============================================================================
// TESTS
// =============================================================================
