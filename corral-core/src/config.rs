//! Configuration types

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// What the coordinator does when the persisted snapshot is unparsable.
///
/// The source-of-truth decision for this workspace is `FailClosed`: a
/// corrupt snapshot blocks coordination rather than silently discarding
/// claims that may still be active. Read-only reporting paths may opt into
/// `TreatAsEmpty`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MalformedPolicy {
    /// Surface `StoreError::Malformed`; no claim commits until repaired
    FailClosed,
    /// Log a warning and proceed as if the store were empty
    TreatAsEmpty,
}

/// Master configuration for the coordinator side of the workspace.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CorralConfig {
    /// Path of the persisted claims snapshot
    pub store_path: PathBuf,
    /// File name of the exclusive lock marker, created next to the snapshot
    pub lock_marker_name: String,
    /// Malformed-snapshot policy for the commit path
    pub malformed_policy: MalformedPolicy,
}

impl CorralConfig {
    /// Configuration rooted at `store_path` with the default marker name
    /// and the fail-closed policy.
    pub fn new(store_path: impl Into<PathBuf>) -> Self {
        Self {
            store_path: store_path.into(),
            lock_marker_name: ".corral.lock".to_string(),
            malformed_policy: MalformedPolicy::FailClosed,
        }
    }

    /// Override the malformed-snapshot policy.
    pub fn with_malformed_policy(mut self, policy: MalformedPolicy) -> Self {
        self.malformed_policy = policy;
        self
    }

    /// Full path of the lock marker, co-located with the snapshot.
    pub fn lock_marker_path(&self) -> PathBuf {
        let dir = match self.store_path.parent() {
            Some(p) if !p.as_os_str().is_empty() => p,
            _ => Path::new("."),
        };
        dir.join(&self.lock_marker_name)
    }
}

// =============================================================================
// TESTS
// =============================================================================
