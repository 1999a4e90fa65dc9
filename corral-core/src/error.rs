//! Error types for CORRAL operations
//!
//! `Conflict` is an expected, non-exceptional outcome under contention and
//! is surfaced as a normal result variant, cheap to construct. `Io` and
//! `Malformed` indicate infrastructure problems and are additionally
//! logged as operational warnings at the call sites that hit them. No
//! error crosses a component boundary as a panic; every public operation
//! returns a discriminated result.

use thiserror::Error;

/// Storage layer errors for the persisted claims snapshot.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum StoreError {
    #[error("I/O failure on {path}: {reason}")]
    Io { path: String, reason: String },

    #[error("Malformed snapshot at {path}: {reason}")]
    Malformed { path: String, reason: String },
}

impl StoreError {
    /// Whether this is the malformed-content kind (as opposed to plain I/O).
    pub fn is_malformed(&self) -> bool {
        matches!(self, StoreError::Malformed { .. })
    }
}

/// Why a claim attempt could not proceed.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ConflictReason {
    #[error("Store lock held by another agent")]
    LockHeld,

    #[error("Work item {work_item_id} already actively claimed by {holder}")]
    ItemAlreadyClaimed { work_item_id: String, holder: String },

    #[error("Active high-priority claim for work type {work_type} held by {holder}")]
    HighPriorityExclusive { work_type: String, holder: String },
}

/// Claim coordination errors.
///
/// `Conflict` is the designated contention outcome; callers decide retry
/// policy, the coordinator never retries internally.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ClaimError {
    #[error("Claim conflict: {0}")]
    Conflict(ConflictReason),

    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    #[error("No active claim for item {work_item_id} owned by {agent_id}")]
    NotOwned {
        work_item_id: String,
        agent_id: String,
    },
}

impl ClaimError {
    /// Whether this is the expected contention outcome.
    pub fn is_conflict(&self) -> bool {
        matches!(self, ClaimError::Conflict(_))
    }
}

/// A pipeline stage returned an error.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("Stage {stage} failed: {reason}")]
pub struct StageError {
    pub stage: String,
    pub reason: String,
}

impl StageError {
    /// Build a stage error.
    pub fn new(stage: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            stage: stage.into(),
            reason: reason.into(),
        }
    }
}

/// Pipeline execution errors.
///
/// Stage failure and cancellation are outcomes, not errors: the executor
/// reports them through the pipeline report, so only protocol violations
/// live here.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum PipelineError {
    #[error("Collaborator echoed trace ID {echoed}, expected {expected}")]
    TraceEchoMismatch { expected: String, echoed: String },
}

/// Malformed trace identifier.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TraceIdError {
    #[error("Malformed trace ID {value:?}: {reason}")]
    Malformed { value: String, reason: String },
}

/// Master error type for all CORRAL errors.
#[derive(Debug, Clone, Error)]
pub enum CorralError {
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    #[error("Claim error: {0}")]
    Claim(#[from] ClaimError),

    #[error("Pipeline error: {0}")]
    Pipeline(#[from] PipelineError),

    #[error("Trace ID error: {0}")]
    Trace(#[from] TraceIdError),
}

/// Result type alias for CORRAL operations.
pub type CorralResult<T> = Result<T, CorralError>;

// =============================================================================
// TESTS
// =============================================================================
