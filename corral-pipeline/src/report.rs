//! Run reports: what a caller gets back from one pipeline run.

use corral_core::TraceId;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Lifecycle of one pipeline run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum PipelineState {
    /// Created, no stage started yet
    Pending,
    /// A stage is executing
    Running { stage: String },
    /// All stages finished
    Completed,
    /// A stage failed (or the run was cancelled); compensation has run
    Failed { stage: String },
}

impl PipelineState {
    /// Whether the run can make no further progress.
    pub fn is_terminal(&self) -> bool {
        matches!(self, PipelineState::Completed | PipelineState::Failed { .. })
    }
}

/// How one stage ended up.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StageOutcome {
    Completed,
    Failed,
    /// Completed earlier, then rolled back after a downstream failure
    Compensated,
    /// Completed earlier; the rollback itself failed
    CompensationFailed,
}

/// Per-stage timing and outcome.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StageReport {
    pub stage: String,
    pub outcome: StageOutcome,
    pub duration: Duration,
}

/// Which stage failed, why, and under which trace.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FailureReport {
    pub stage: String,
    pub reason: String,
    pub trace_id: TraceId,
}

/// Summary of one pipeline run.
///
/// Always carries the trace ID used, so a caller can correlate the report
/// with the telemetry emitted during the run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineReport {
    pub state: PipelineState,
    pub trace_id: TraceId,
    pub stages: Vec<StageReport>,
    pub failure: Option<FailureReport>,
}

impl PipelineReport {
    /// Whether the run completed all its stages.
    pub fn is_completed(&self) -> bool {
        self.state == PipelineState::Completed
    }

    /// Report for a stage by name.
    pub fn stage(&self, name: &str) -> Option<&StageReport> {
        self.stages.iter().find(|s| s.stage == name)
    }
}

// =============================================================================
// TESTS
// =============================================================================
