//! CORRAL Core - Entity Types
//!
//! Pure data structures for the work-claim coordination framework.
//! All other crates depend on this. This crate contains data types and
//! the telemetry contract - no I/O and no coordination logic.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

pub mod config;
pub mod error;
pub mod telemetry;
pub mod trace;

pub use config::{CorralConfig, MalformedPolicy};
pub use error::{
    ClaimError, ConflictReason, CorralError, CorralResult, PipelineError, StageError, StoreError,
    TraceIdError,
};
pub use telemetry::{
    EventKind, NullSink, SharedSink, TelemetryEvent, TelemetryEventBuilder, TelemetrySink,
};
pub use trace::TraceId;

// ============================================================================
// IDENTITY TYPES
// ============================================================================

/// Timestamp type using UTC timezone.
pub type Timestamp = DateTime<Utc>;

/// Identifier of an agent competing for work. Opaque to the core.
pub type AgentId = String;

/// Identifier of a work item. Opaque, assigned by the producer.
pub type WorkItemId = String;

// ============================================================================
// PRIORITY
// ============================================================================

/// Priority of a work item. Ordering matters: `High` work of a given type
/// is exclusive across agents, lower priorities may coexist.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    Low,
    Medium,
    High,
}

impl Priority {
    /// Convert to the snapshot string representation.
    pub fn as_db_str(&self) -> &'static str {
        match self {
            Priority::Low => "low",
            Priority::Medium => "medium",
            Priority::High => "high",
        }
    }

    /// Parse from the snapshot string representation.
    pub fn from_db_str(s: &str) -> Result<Self, PriorityParseError> {
        match s.to_lowercase().as_str() {
            "low" => Ok(Priority::Low),
            "medium" => Ok(Priority::Medium),
            "high" => Ok(Priority::High),
            _ => Err(PriorityParseError(s.to_string())),
        }
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_db_str())
    }
}

impl FromStr for Priority {
    type Err = PriorityParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_db_str(s)
    }
}

/// Error when parsing an invalid priority string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PriorityParseError(pub String);

impl fmt::Display for PriorityParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Invalid priority: {}", self.0)
    }
}

impl std::error::Error for PriorityParseError {}

// ============================================================================
// CLAIM STATUS
// ============================================================================

/// Status of a work claim.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ClaimStatus {
    /// Claim is held by an agent currently working the item
    Active,
    /// Owning agent finished the work
    Completed,
    /// Owning agent gave the item back without finishing
    Released,
}

impl ClaimStatus {
    /// Convert to the snapshot string representation.
    pub fn as_db_str(&self) -> &'static str {
        match self {
            ClaimStatus::Active => "active",
            ClaimStatus::Completed => "completed",
            ClaimStatus::Released => "released",
        }
    }

    /// Parse from the snapshot string representation.
    pub fn from_db_str(s: &str) -> Result<Self, ClaimStatusParseError> {
        match s.to_lowercase().as_str() {
            "active" => Ok(ClaimStatus::Active),
            "completed" => Ok(ClaimStatus::Completed),
            "released" => Ok(ClaimStatus::Released),
            _ => Err(ClaimStatusParseError(s.to_string())),
        }
    }
}

impl fmt::Display for ClaimStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_db_str())
    }
}

impl FromStr for ClaimStatus {
    type Err = ClaimStatusParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_db_str(s)
    }
}

/// Error when parsing an invalid claim status string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClaimStatusParseError(pub String);

impl fmt::Display for ClaimStatusParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Invalid claim status: {}", self.0)
    }
}

impl std::error::Error for ClaimStatusParseError {}

// ============================================================================
// WORK ITEM
// ============================================================================

/// A unit of work available to be claimed.
///
/// Created by an external producer and immutable once created. Claims
/// reference work items, they never mutate them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkItem {
    /// Opaque unique identifier
    pub id: WorkItemId,
    /// Category string, drives the conflict rules
    pub work_type: String,
    /// Priority class
    pub priority: Priority,
    /// Free-text description
    pub description: String,
}

impl WorkItem {
    /// Create a new work item.
    pub fn new(
        id: impl Into<String>,
        work_type: impl Into<String>,
        priority: Priority,
        description: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            work_type: work_type.into(),
            priority,
            description: description.into(),
        }
    }
}

// ============================================================================
// WORK CLAIM
// ============================================================================

/// The binding of a work item to an agent.
///
/// Constructed only by the coordinator's commit path. Transitions to
/// `Completed`/`Released` are driven by the owning agent; claims are never
/// deleted, the store is an append-mostly log.
///
/// Invariants (enforced by the coordinator, not by this type):
/// - a work item has at most one `Active` claim at any time;
/// - for a given `work_type`, at most one `Active` claim with
///   `Priority::High` may exist.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkClaim {
    pub work_item_id: WorkItemId,
    pub agent_id: AgentId,
    /// Copied from the work item for conflict-check locality
    pub work_type: String,
    /// Copied from the work item for conflict-check locality
    pub priority: Priority,
    pub status: ClaimStatus,
    pub claimed_at: Timestamp,
    /// Correlation identifier active when the claim was created
    pub trace_id: TraceId,
}

impl WorkClaim {
    /// Build an active claim binding `item` to `agent_id`.
    ///
    /// Callers outside the coordinator should treat this as test plumbing;
    /// committed claims come from `ClaimCoordinator::attempt_claim`.
    pub fn active(item: &WorkItem, agent_id: impl Into<String>, trace_id: TraceId) -> Self {
        Self {
            work_item_id: item.id.clone(),
            agent_id: agent_id.into(),
            work_type: item.work_type.clone(),
            priority: item.priority,
            status: ClaimStatus::Active,
            claimed_at: Utc::now(),
            trace_id,
        }
    }

    /// Whether this claim currently binds the item to its agent.
    pub fn is_active(&self) -> bool {
        self.status == ClaimStatus::Active
    }

    /// Owner transition: mark the work finished.
    pub fn complete(&mut self) {
        self.status = ClaimStatus::Completed;
    }

    /// Owner transition: give the item back unfinished.
    pub fn release(&mut self) {
        self.status = ClaimStatus::Released;
    }

    /// Whether this claim excludes a new claim for `item`.
    ///
    /// Two rules, checked in this order by the coordinator:
    /// 1. an active claim for the same item excludes any new claim;
    /// 2. an active high-priority claim excludes a new high-priority claim
    ///    of the same work type. Lower priorities coexist freely.
    pub fn conflicts_with(&self, item: &WorkItem) -> bool {
        if !self.is_active() {
            return false;
        }
        if self.work_item_id == item.id {
            return true;
        }
        item.priority == Priority::High
            && self.priority == Priority::High
            && self.work_type == item.work_type
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn deploy_item(id: &str, priority: Priority) -> WorkItem {
        WorkItem::new(id, "deploy", priority, "roll out the release")
    }

    #[test]
    fn test_priority_roundtrip() {
        for p in [Priority::Low, Priority::Medium, Priority::High] {
            let parsed = Priority::from_db_str(p.as_db_str()).unwrap();
            assert_eq!(p, parsed);
        }
    }

    #[test]
    fn test_priority_rejects_unknown() {
        assert!(Priority::from_db_str("urgent").is_err());
    }

    #[test]
    fn test_priority_ordering() {
        assert!(Priority::Low < Priority::Medium);
        assert!(Priority::Medium < Priority::High);
    }

    #[test]
    fn test_claim_status_roundtrip() {
        for s in [
            ClaimStatus::Active,
            ClaimStatus::Completed,
            ClaimStatus::Released,
        ] {
            let parsed = ClaimStatus::from_db_str(s.as_db_str()).unwrap();
            assert_eq!(s, parsed);
        }
    }

    #[test]
    fn test_claim_serde_uses_lowercase_status() {
        let item = deploy_item("w1", Priority::High);
        let claim = WorkClaim::active(&item, "a1", TraceId::generate());
        let json = serde_json::to_value(&claim).unwrap();
        assert_eq!(json["status"], "active");
        assert_eq!(json["priority"], "high");
    }

    #[test]
    fn test_same_item_conflicts() {
        let item = deploy_item("w1", Priority::Low);
        let claim = WorkClaim::active(&item, "a1", TraceId::generate());
        assert!(claim.conflicts_with(&item));
    }

    #[test]
    fn test_high_priority_same_type_conflicts() {
        let first = deploy_item("w1", Priority::High);
        let claim = WorkClaim::active(&first, "a1", TraceId::generate());
        let second = deploy_item("w2", Priority::High);
        assert!(claim.conflicts_with(&second));
    }

    #[test]
    fn test_low_priority_same_type_coexists() {
        let first = deploy_item("w1", Priority::High);
        let claim = WorkClaim::active(&first, "a1", TraceId::generate());
        let second = deploy_item("w2", Priority::Low);
        assert!(!claim.conflicts_with(&second));
    }

    #[test]
    fn test_high_priority_different_type_coexists() {
        let first = deploy_item("w1", Priority::High);
        let claim = WorkClaim::active(&first, "a1", TraceId::generate());
        let second = WorkItem::new("w2", "benchmark", Priority::High, "run the suite");
        assert!(!claim.conflicts_with(&second));
    }

    #[test]
    fn test_released_claim_never_conflicts() {
        let item = deploy_item("w1", Priority::High);
        let mut claim = WorkClaim::active(&item, "a1", TraceId::generate());
        claim.release();
        assert!(!claim.conflicts_with(&item));
        assert_eq!(claim.status, ClaimStatus::Released);
    }

    #[test]
    fn test_complete_transition() {
        let item = deploy_item("w1", Priority::Medium);
        let mut claim = WorkClaim::active(&item, "a1", TraceId::generate());
        assert!(claim.is_active());
        claim.complete();
        assert_eq!(claim.status, ClaimStatus::Completed);
        assert!(!claim.is_active());
    }
}
