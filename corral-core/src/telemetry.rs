//! Telemetry contract: typed events and the fire-and-forget sink.
//!
//! The event schema is a closed set of kinds with a fixed metadata shape
//! rather than open-ended key-value maps. Every event carries the trace ID
//! of the run that produced it; trace-consistency of a pipeline run is
//! externally observable only through these emissions.
//!
//! Implementations of the sink live outside the core (an OTLP forwarder,
//! a log appender, the recording sink in corral-test-utils). A sink must
//! never block or fail its caller.

use crate::trace::TraceId;
use crate::Timestamp;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

// ============================================================================
// EVENT KINDS
// ============================================================================

/// Closed set of telemetry event kinds emitted by the core.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    PipelineStarted,
    PipelineCompleted,
    PipelineFailed,
    StageStarted,
    StageCompleted,
    StageFailed,
    StageCompensated,
    CompensationFailed,
    ClaimCommitted,
    ClaimConflicted,
}

impl EventKind {
    /// Event name as emitted on the wire.
    pub fn as_event_name(&self) -> &'static str {
        match self {
            EventKind::PipelineStarted => "pipeline.started",
            EventKind::PipelineCompleted => "pipeline.completed",
            EventKind::PipelineFailed => "pipeline.failed",
            EventKind::StageStarted => "stage.started",
            EventKind::StageCompleted => "stage.completed",
            EventKind::StageFailed => "stage.failed",
            EventKind::StageCompensated => "stage.compensated",
            EventKind::CompensationFailed => "stage.compensation_failed",
            EventKind::ClaimCommitted => "claim.committed",
            EventKind::ClaimConflicted => "claim.conflicted",
        }
    }
}

// ============================================================================
// EVENT
// ============================================================================

/// One telemetry emission.
///
/// Fixed metadata shape: optional stage/agent/work-item context plus a
/// success flag and an optional duration measurement. The trace ID is
/// mandatory, never optional - an event without correlation is useless.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TelemetryEvent {
    pub kind: EventKind,
    pub timestamp: Timestamp,
    pub trace_id: TraceId,
    pub stage: Option<String>,
    pub agent_id: Option<String>,
    pub work_item_id: Option<String>,
    pub success: bool,
    /// Wall-clock duration of the measured operation, in milliseconds
    pub duration_ms: Option<u64>,
    /// Human-readable failure reason, present on failure kinds
    pub reason: Option<String>,
}

impl TelemetryEvent {
    /// Start building an event of `kind` for the given run.
    pub fn builder(kind: EventKind, trace_id: TraceId) -> TelemetryEventBuilder {
        TelemetryEventBuilder {
            event: TelemetryEvent {
                kind,
                timestamp: Utc::now(),
                trace_id,
                stage: None,
                agent_id: None,
                work_item_id: None,
                success: true,
                duration_ms: None,
                reason: None,
            },
        }
    }
}

/// Builder for `TelemetryEvent` (only the trace ID and kind are required).
#[derive(Debug, Clone)]
pub struct TelemetryEventBuilder {
    event: TelemetryEvent,
}

impl TelemetryEventBuilder {
    /// Name the stage this event concerns.
    pub fn stage(mut self, stage: impl Into<String>) -> Self {
        self.event.stage = Some(stage.into());
        self
    }

    /// Name the agent this event concerns.
    pub fn agent(mut self, agent_id: impl Into<String>) -> Self {
        self.event.agent_id = Some(agent_id.into());
        self
    }

    /// Name the work item this event concerns.
    pub fn work_item(mut self, work_item_id: impl Into<String>) -> Self {
        self.event.work_item_id = Some(work_item_id.into());
        self
    }

    /// Mark the event as reporting a failure, with a reason.
    pub fn failed(mut self, reason: impl Into<String>) -> Self {
        self.event.success = false;
        self.event.reason = Some(reason.into());
        self
    }

    /// Attach a duration measurement.
    pub fn duration(mut self, duration: std::time::Duration) -> Self {
        self.event.duration_ms = Some(duration.as_millis() as u64);
        self
    }

    /// Finish building.
    pub fn build(self) -> TelemetryEvent {
        self.event
    }
}

// ============================================================================
// SINK CONTRACT
// ============================================================================

/// Fire-and-forget telemetry sink.
///
/// `emit` must never block for meaningful time and must never fail the
/// caller; a sink that cannot deliver drops the event.
pub trait TelemetrySink: Send + Sync {
    fn emit(&self, event: TelemetryEvent);
}

/// Shared handle to a sink.
pub type SharedSink = Arc<dyn TelemetrySink>;

/// Sink that discards every event.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullSink;

impl TelemetrySink for NullSink {
    fn emit(&self, _event: TelemetryEvent) {}
}

// =============================================================================
// TESTS
// =============================================================================
