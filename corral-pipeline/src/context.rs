//! Per-run execution context threaded through every stage.

use corral_core::TraceId;
use serde_json::Value;
use std::collections::BTreeMap;

/// Mutable context handed to each stage of one pipeline run.
///
/// The trace ID is read-only to every stage: there is an accessor and no
/// mutator, so no stage can overwrite the correlation identifier. Stages
/// append their own data alongside it via `record_output`.
#[derive(Debug, Clone)]
pub struct PipelineContext {
    trace_id: TraceId,
    agent_id: String,
    request: Value,
    outputs: BTreeMap<String, Value>,
}

impl PipelineContext {
    /// Context for one run. `trace_id` is the root for the whole run.
    pub fn new(trace_id: TraceId, agent_id: impl Into<String>, request: Value) -> Self {
        Self {
            trace_id,
            agent_id: agent_id.into(),
            request,
            outputs: BTreeMap::new(),
        }
    }

    /// The run's correlation identifier. Copied, never regenerated.
    pub fn trace_id(&self) -> &TraceId {
        &self.trace_id
    }

    /// The agent executing this run.
    pub fn agent_id(&self) -> &str {
        &self.agent_id
    }

    /// The original work request payload.
    pub fn request(&self) -> &Value {
        &self.request
    }

    /// Record a stage's partial result under its stage name.
    pub fn record_output(&mut self, stage: impl Into<String>, output: Value) {
        self.outputs.insert(stage.into(), output);
    }

    /// A previously recorded stage output.
    pub fn output(&self, stage: &str) -> Option<&Value> {
        self.outputs.get(stage)
    }

    /// All recorded outputs, keyed by stage name.
    pub fn outputs(&self) -> &BTreeMap<String, Value> {
        &self.outputs
    }
}

// =============================================================================
// TESTS
// =============================================================================
