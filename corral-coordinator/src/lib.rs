//! CORRAL Coordinator - Atomic Claim Coordination
//!
//! Many independent agents, each a separate process or thread, call
//! `attempt_claim` concurrently against one shared claims snapshot. This
//! crate serializes them: an exclusive marker file is the mutual-exclusion
//! token, and the load/check/persist sequence runs entirely inside the
//! held-token critical section. Contention is reported fast as a
//! `Conflict` - the coordinator never blocks waiting for the lock and
//! never retries internally; callers own the backoff policy.
//!
//! Conflict rules, checked in order:
//! 1. a work item with an active claim cannot be claimed again;
//! 2. high-priority work is exclusive per work type - one active
//!    high-priority claim of a type blocks further high-priority claims of
//!    that type, while lower priorities coexist freely.

use corral_core::{
    ClaimError, ConflictReason, CorralConfig, EventKind, MalformedPolicy, Priority, SharedSink,
    StoreError, TelemetryEvent, TraceId, WorkClaim, WorkItem,
};
use corral_store::ClaimStore;

pub mod cache;
pub mod lock;

pub use cache::ClaimCache;
pub use lock::{Acquired, AcquireError, LockHolder, LockState, Released, StoreLock};

/// Serializes claim commits against one shared claims snapshot.
pub struct ClaimCoordinator {
    config: CorralConfig,
    store: ClaimStore,
    cache: ClaimCache,
    sink: SharedSink,
}

impl ClaimCoordinator {
    /// Coordinator over the snapshot named by `config`, emitting claim
    /// telemetry into `sink`.
    pub fn new(config: CorralConfig, sink: SharedSink) -> Self {
        let store = ClaimStore::new(&config.store_path);
        Self {
            config,
            store,
            cache: ClaimCache::new(),
            sink,
        }
    }

    /// The backing store.
    pub fn store(&self) -> &ClaimStore {
        &self.store
    }

    /// Attempt to claim `item` for `agent_id` under the given trace.
    ///
    /// Atomic with respect to all other callers across processes and
    /// threads. Fails fast with `Conflict(LockHeld)` when another agent
    /// holds the store; returns the conflict rule that fired otherwise.
    /// The lock is released on every exit path, including unwinding, and
    /// a persist failure commits nothing.
    pub fn attempt_claim(
        &self,
        item: &WorkItem,
        agent_id: &str,
        trace_id: &TraceId,
    ) -> Result<WorkClaim, ClaimError> {
        let lock = match StoreLock::acquire(&self.config.lock_marker_path(), agent_id) {
            Ok(lock) => lock,
            Err(AcquireError::Held) => {
                let reason = ConflictReason::LockHeld;
                self.emit_conflicted(item, agent_id, trace_id, &reason);
                return Err(ClaimError::Conflict(reason));
            }
            Err(AcquireError::Io(e)) => {
                let err = StoreError::Io {
                    path: self.config.lock_marker_path().display().to_string(),
                    reason: e.to_string(),
                };
                tracing::warn!(error = %err, "store lock marker unavailable");
                return Err(ClaimError::Store(err));
            }
        };

        let result = self.commit_under_lock(item, agent_id, trace_id);
        lock.release();

        match &result {
            Ok(claim) => {
                self.cache.invalidate();
                self.sink.emit(
                    TelemetryEvent::builder(EventKind::ClaimCommitted, trace_id.clone())
                        .agent(agent_id)
                        .work_item(&claim.work_item_id)
                        .build(),
                );
            }
            Err(ClaimError::Conflict(reason)) => {
                self.emit_conflicted(item, agent_id, trace_id, reason);
            }
            Err(e) => {
                tracing::warn!(error = %e, work_item = %item.id, "claim attempt hit infrastructure failure");
            }
        }
        result
    }

    /// Owner transition: mark the agent's active claim on `work_item_id`
    /// as completed. Runs under the same lock discipline as
    /// `attempt_claim`.
    pub fn complete_claim(
        &self,
        work_item_id: &str,
        agent_id: &str,
    ) -> Result<WorkClaim, ClaimError> {
        self.transition_claim(work_item_id, agent_id, WorkClaim::complete)
    }

    /// Owner transition: give the agent's active claim on `work_item_id`
    /// back unfinished.
    pub fn release_claim(
        &self,
        work_item_id: &str,
        agent_id: &str,
    ) -> Result<WorkClaim, ClaimError> {
        self.transition_claim(work_item_id, agent_id, WorkClaim::release)
    }

    /// All currently active claims, served from the read cache when warm.
    ///
    /// This is a reporting path and reads permissively: a malformed
    /// snapshot is logged and shown as empty rather than blocking status
    /// queries. Commits never take this path.
    pub fn active_claims(&self) -> Result<Vec<WorkClaim>, StoreError> {
        let claims = match self.cache.get() {
            Some(cached) => cached,
            None => {
                let loaded = self.store.load_or_empty()?;
                self.cache.fill(loaded.clone());
                loaded
            }
        };
        Ok(claims.into_iter().filter(|c| c.is_active()).collect())
    }

    // ------------------------------------------------------------------
    // Critical section
    // ------------------------------------------------------------------

    /// Load, check, append, persist. Caller holds the store lock.
    fn commit_under_lock(
        &self,
        item: &WorkItem,
        agent_id: &str,
        trace_id: &TraceId,
    ) -> Result<WorkClaim, ClaimError> {
        let mut claims = self.load_for_commit()?;

        if let Some(reason) = conflict_for(&claims, item) {
            return Err(ClaimError::Conflict(reason));
        }

        let claim = WorkClaim::active(item, agent_id, trace_id.clone());
        claims.push(claim.clone());
        self.store.persist(&claims)?;
        Ok(claim)
    }

    fn transition_claim(
        &self,
        work_item_id: &str,
        agent_id: &str,
        apply: impl FnOnce(&mut WorkClaim),
    ) -> Result<WorkClaim, ClaimError> {
        let lock = match StoreLock::acquire(&self.config.lock_marker_path(), agent_id) {
            Ok(lock) => lock,
            Err(AcquireError::Held) => {
                return Err(ClaimError::Conflict(ConflictReason::LockHeld))
            }
            Err(AcquireError::Io(e)) => {
                return Err(ClaimError::Store(StoreError::Io {
                    path: self.config.lock_marker_path().display().to_string(),
                    reason: e.to_string(),
                }))
            }
        };

        let result = (|| {
            let mut claims = self.load_for_commit()?;
            let claim = claims
                .iter_mut()
                .find(|c| {
                    c.work_item_id == work_item_id && c.agent_id == agent_id && c.is_active()
                })
                .ok_or_else(|| ClaimError::NotOwned {
                    work_item_id: work_item_id.to_string(),
                    agent_id: agent_id.to_string(),
                })?;
            apply(claim);
            let updated = claim.clone();
            self.store.persist(&claims)?;
            Ok(updated)
        })();

        lock.release();
        if result.is_ok() {
            self.cache.invalidate();
        }
        result
    }

    /// Snapshot read for the commit path, honouring the configured
    /// malformed-content policy. The default fails closed: a corrupt
    /// snapshot blocks coordination instead of silently discarding claims.
    fn load_for_commit(&self) -> Result<Vec<WorkClaim>, StoreError> {
        match self.config.malformed_policy {
            MalformedPolicy::FailClosed => self.store.load().map_err(|e| {
                if e.is_malformed() {
                    tracing::warn!(error = %e, "refusing to coordinate over a malformed snapshot");
                }
                e
            }),
            MalformedPolicy::TreatAsEmpty => self.store.load_or_empty(),
        }
    }

    fn emit_conflicted(
        &self,
        item: &WorkItem,
        agent_id: &str,
        trace_id: &TraceId,
        reason: &ConflictReason,
    ) {
        self.sink.emit(
            TelemetryEvent::builder(EventKind::ClaimConflicted, trace_id.clone())
                .agent(agent_id)
                .work_item(&item.id)
                .failed(reason.to_string())
                .build(),
        );
    }
}

/// First conflict rule fired by `item` against the existing claims, if any.
fn conflict_for(claims: &[WorkClaim], item: &WorkItem) -> Option<ConflictReason> {
    if let Some(holder) = claims
        .iter()
        .find(|c| c.is_active() && c.work_item_id == item.id)
    {
        return Some(ConflictReason::ItemAlreadyClaimed {
            work_item_id: item.id.clone(),
            holder: holder.agent_id.clone(),
        });
    }
    if item.priority == Priority::High {
        if let Some(holder) = claims.iter().find(|c| {
            c.is_active() && c.priority == Priority::High && c.work_type == item.work_type
        }) {
            return Some(ConflictReason::HighPriorityExclusive {
                work_type: item.work_type.clone(),
                holder: holder.agent_id.clone(),
            });
        }
    }
    None
}

// =============================================================================
// TESTS
// =============================================================================
