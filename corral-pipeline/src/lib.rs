//! CORRAL Pipeline - Trace-Propagated Stage Execution
//!
//! A small ordered state machine that threads one correlation identifier
//! through heterogeneous stages, emits a typed telemetry event at every
//! transition, and compensates completed stages in reverse order when a
//! later stage fails.
//!
//! The canonical pipeline runs `validate → compile → export → execute →
//! monitor`. The export/execute stages hand off to an external workflow
//! engine over HTTP; that transport lives outside this crate, but the
//! acknowledgment it returns must echo the run's trace ID and
//! [`verify_trace_echo`] is the check the stage applies to it.

use corral_core::{PipelineError, TraceId};

pub mod context;
pub mod executor;
pub mod report;
pub mod stage;

pub use context::PipelineContext;
pub use executor::{CancelToken, PipelineExecutor};
pub use report::{FailureReport, PipelineReport, PipelineState, StageOutcome, StageReport};
pub use stage::{FnStage, Stage, StageOutput};

/// Stage names of the canonical pipeline, in execution order.
pub const CANONICAL_STAGES: [&str; 5] = ["validate", "compile", "export", "execute", "monitor"];

/// Check a collaborator's correlation acknowledgment.
///
/// The export/execute handoff expects the external engine to echo the
/// run's trace ID back in a response field or header. Only the exact root
/// value passes; a derived child is a bookkeeping name, not the run's
/// identifier, and is rejected like any other mismatch.
pub fn verify_trace_echo(expected: &TraceId, echoed: &str) -> Result<(), PipelineError> {
    if echoed == expected.as_str() {
        Ok(())
    } else {
        Err(PipelineError::TraceEchoMismatch {
            expected: expected.as_str().to_string(),
            echoed: echoed.to_string(),
        })
    }
}

// =============================================================================
// TESTS
// =============================================================================
