//! Explicit read cache over the claims snapshot.
//!
//! Owned by the coordinator, never ambient global state. Serves read-only
//! paths only; the commit path always reads the snapshot under the lock.
//! Every write through the coordinator invalidates the cache.

use corral_core::WorkClaim;
use std::sync::Mutex;

/// Invalidated-on-write cache of the last loaded snapshot.
#[derive(Debug, Default)]
pub struct ClaimCache {
    inner: Mutex<Option<Vec<WorkClaim>>>,
}

impl ClaimCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Cached snapshot, if one is held.
    pub fn get(&self) -> Option<Vec<WorkClaim>> {
        self.inner.lock().expect("claim cache poisoned").clone()
    }

    /// Replace the cached snapshot.
    pub fn fill(&self, claims: Vec<WorkClaim>) {
        *self.inner.lock().expect("claim cache poisoned") = Some(claims);
    }

    /// Drop the cached snapshot. Called on every write to the store.
    pub fn invalidate(&self) {
        *self.inner.lock().expect("claim cache poisoned") = None;
    }
}

// =============================================================================
// TESTS
// =============================================================================
