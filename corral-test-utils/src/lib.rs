//! CORRAL Test Utilities
//!
//! Centralized test infrastructure for the CORRAL workspace:
//! - Proptest generators for work items and claims
//! - A recording telemetry sink for trace-consistency assertions
//! - Fixture builders for common scenarios

use chrono::{TimeZone, Utc};
use corral_core::{
    ClaimStatus, Priority, TelemetryEvent, TelemetrySink, TraceId, WorkClaim, WorkItem,
};
use proptest::prelude::*;
use std::sync::{Arc, Mutex};

// ============================================================================
// RECORDING SINK
// ============================================================================

/// Telemetry sink that records every emission for later assertions.
///
/// Cloning shares the underlying buffer, so a clone can be handed to an
/// executor while the test keeps its own handle.
#[derive(Debug, Clone, Default)]
pub struct RecordingSink {
    events: Arc<Mutex<Vec<TelemetryEvent>>>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// All events emitted so far, in emission order.
    pub fn events(&self) -> Vec<TelemetryEvent> {
        self.events.lock().expect("recording sink poisoned").clone()
    }

    /// Trace IDs of all emitted events, in emission order.
    pub fn trace_ids(&self) -> Vec<TraceId> {
        self.events().into_iter().map(|e| e.trace_id).collect()
    }

    /// Stage names of all emitted events that carry one, in order.
    pub fn stages(&self) -> Vec<String> {
        self.events().into_iter().filter_map(|e| e.stage).collect()
    }

    /// Number of events emitted so far.
    pub fn len(&self) -> usize {
        self.events.lock().expect("recording sink poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl TelemetrySink for RecordingSink {
    fn emit(&self, event: TelemetryEvent) {
        self.events
            .lock()
            .expect("recording sink poisoned")
            .push(event);
    }
}

// ============================================================================
// FIXTURES
// ============================================================================

/// Shorthand work item for scenario tests.
pub fn work_item(id: &str, work_type: &str, priority: Priority) -> WorkItem {
    WorkItem::new(id, work_type, priority, format!("{work_type} work for {id}"))
}

// ============================================================================
// PROPTEST GENERATORS
// ============================================================================

/// Any priority.
pub fn arb_priority() -> impl Strategy<Value = Priority> {
    prop_oneof![
        Just(Priority::Low),
        Just(Priority::Medium),
        Just(Priority::High),
    ]
}

/// Any claim status.
pub fn arb_claim_status() -> impl Strategy<Value = ClaimStatus> {
    prop_oneof![
        Just(ClaimStatus::Active),
        Just(ClaimStatus::Completed),
        Just(ClaimStatus::Released),
    ]
}

/// Identifier-shaped strings.
pub fn arb_ident() -> impl Strategy<Value = String> {
    "[a-z][a-z0-9_-]{0,15}"
}

/// Any work item.
pub fn arb_work_item() -> impl Strategy<Value = WorkItem> {
    (arb_ident(), arb_ident(), arb_priority(), ".{0,40}").prop_map(
        |(id, work_type, priority, description)| WorkItem {
            id,
            work_type,
            priority,
            description,
        },
    )
}

/// Any work claim, with a second-precision timestamp so snapshot
/// round-trips compare exactly regardless of serializer precision.
pub fn arb_work_claim() -> impl Strategy<Value = WorkClaim> {
    (
        arb_work_item(),
        arb_ident(),
        arb_claim_status(),
        1_600_000_000i64..1_900_000_000i64,
    )
        .prop_map(|(item, agent_id, status, secs)| WorkClaim {
            work_item_id: item.id,
            agent_id,
            work_type: item.work_type,
            priority: item.priority,
            status,
            claimed_at: Utc.timestamp_opt(secs, 0).unwrap(),
            trace_id: TraceId::generate(),
        })
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use corral_core::EventKind;

    #[test]
    fn test_recording_sink_keeps_order() {
        let sink = RecordingSink::new();
        let trace = TraceId::generate();
        for kind in [
            EventKind::PipelineStarted,
            EventKind::StageStarted,
            EventKind::StageCompleted,
        ] {
            sink.emit(TelemetryEvent::builder(kind, trace.clone()).build());
        }
        let events = sink.events();
        assert_eq!(events.len(), 3);
        assert_eq!(events[0].kind, EventKind::PipelineStarted);
        assert_eq!(events[2].kind, EventKind::StageCompleted);
    }

    #[test]
    fn test_recording_sink_clone_shares_buffer() {
        let sink = RecordingSink::new();
        let clone = sink.clone();
        clone.emit(TelemetryEvent::builder(EventKind::ClaimCommitted, TraceId::generate()).build());
        assert_eq!(sink.len(), 1);
    }

    #[test]
    fn test_fixture_work_item() {
        let item = work_item("w1", "deploy", Priority::High);
        assert_eq!(item.id, "w1");
        assert_eq!(item.work_type, "deploy");
        assert_eq!(item.priority, Priority::High);
    }
}
