//! Lock typestate for compile-time safety of the store-lock lifecycle.
//!
//! The mutual-exclusion token over the claims snapshot is a marker file
//! created with `create_new`, which is atomic at the filesystem level:
//! "create if absent, fail if present", never check-then-create in two
//! steps. Its mere existence signals "locked"; absence signals "free".
//!
//! The typestate makes invalid transitions uncompilable - only a lock in
//! the Acquired state can be released - and a `Drop` impl removes the
//! marker on every exit path that did not release explicitly, including
//! unwinding out of the critical section.
//!
//! # State Transition Diagram
//!
//! ```text
//! (unlocked) ─── acquire() ──→ Acquired ─── release() ──→ (unlocked)
//! ```

use chrono::Utc;
use corral_core::Timestamp;
use serde::{Deserialize, Serialize};
use std::fs::OpenOptions;
use std::io::Write;
use std::marker::PhantomData;
use std::path::{Path, PathBuf};

// ============================================================================
// MARKER CONTENTS
// ============================================================================

/// Diagnostic payload written into the marker file.
///
/// Not load-bearing for mutual exclusion (the file's existence is), but
/// lets an operator see who is holding the store and since when.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LockHolder {
    pub agent_id: String,
    pub acquired_at: Timestamp,
    pub pid: u32,
}

// ============================================================================
// TYPESTATE MARKERS
// ============================================================================

/// Marker trait for lock states.
pub trait LockState: private::Sealed + Send + Sync {}

/// Lock is currently held.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Acquired;
impl LockState for Acquired {}

/// Lock has been released (for documentation; locks in this state don't
/// exist at runtime - release consumes the value).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Released;
impl LockState for Released {}

mod private {
    pub trait Sealed {}
    impl Sealed for super::Acquired {}
    impl Sealed for super::Released {}
}

// ============================================================================
// OUTCOMES
// ============================================================================

/// Why the lock could not be acquired.
#[derive(Debug)]
pub enum AcquireError {
    /// Marker already present: another agent holds the store. Expected
    /// under contention; callers decide retry policy.
    Held,
    /// The medium refused the marker for a reason other than contention.
    Io(std::io::Error),
}

// ============================================================================
// STORE LOCK
// ============================================================================

/// Exclusive, system-visible mutual-exclusion token over the claim store.
///
/// The type parameter tracks the lock state at compile time. Only
/// `StoreLock<Acquired>` values exist at runtime; `release` consumes the
/// value and deletes the marker.
#[derive(Debug)]
pub struct StoreLock<S: LockState> {
    marker_path: PathBuf,
    holder: LockHolder,
    armed: bool,
    _state: PhantomData<S>,
}

impl StoreLock<Acquired> {
    /// Acquire the lock by exclusively creating the marker file.
    ///
    /// Fails fast with `AcquireError::Held` if the marker already exists;
    /// never waits and never retries internally.
    pub fn acquire(marker_path: &Path, agent_id: &str) -> Result<Self, AcquireError> {
        let holder = LockHolder {
            agent_id: agent_id.to_string(),
            acquired_at: Utc::now(),
            pid: std::process::id(),
        };

        let mut file = match OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(marker_path)
        {
            Ok(file) => file,
            Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => {
                return Err(AcquireError::Held)
            }
            Err(e) => return Err(AcquireError::Io(e)),
        };

        // The marker exists from this point on; diagnostics are best-effort.
        if let Ok(body) = serde_json::to_vec_pretty(&holder) {
            let _ = file.write_all(&body);
        }

        Ok(StoreLock {
            marker_path: marker_path.to_path_buf(),
            holder,
            armed: true,
            _state: PhantomData,
        })
    }

    /// Who holds the lock.
    pub fn holder(&self) -> &LockHolder {
        &self.holder
    }

    /// Marker file path.
    pub fn marker_path(&self) -> &Path {
        &self.marker_path
    }

    /// Release the lock, removing the marker.
    ///
    /// Consumes the lock; the `Drop` safety net is disarmed first so the
    /// marker is removed exactly once.
    pub fn release(mut self) {
        self.armed = false;
        if let Err(e) = std::fs::remove_file(&self.marker_path) {
            if e.kind() != std::io::ErrorKind::NotFound {
                tracing::warn!(
                    marker = %self.marker_path.display(),
                    error = %e,
                    "failed to remove store lock marker on release"
                );
            }
        }
    }
}

impl<S: LockState> Drop for StoreLock<S> {
    fn drop(&mut self) {
        if self.armed {
            let _ = std::fs::remove_file(&self.marker_path);
        }
    }
}

// =============================================================================
// TESTS
// =============================================================================
