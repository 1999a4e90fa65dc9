//! The stage contract.

use crate::context::PipelineContext;
use corral_core::StageError;
use serde_json::Value;

/// Partial result produced by one stage, recorded into the context under
/// the stage's name.
pub type StageOutput = Value;

/// One named step of a pipeline.
///
/// Stages run strictly sequentially; parallelism, where a deployment wants
/// it, belongs to collaborators outside this core. A stage reads the
/// context (including the read-only trace ID), does its work, and returns
/// a partial result or a `StageError`.
///
/// `compensate` is the undo action invoked when a *later* stage fails; the
/// default is a no-op for stages with nothing to roll back.
pub trait Stage: Send + Sync {
    /// Stage name as it appears in telemetry and reports.
    fn name(&self) -> &str;

    /// Run the stage against the current context.
    fn execute(&self, ctx: &mut PipelineContext) -> Result<StageOutput, StageError>;

    /// Undo this stage's effects after a downstream failure. Best-effort:
    /// the executor logs a failure here and keeps compensating.
    fn compensate(&self, _ctx: &PipelineContext) -> Result<(), StageError> {
        Ok(())
    }
}

/// Stage built from closures, for wiring and tests.
pub struct FnStage<E> {
    name: String,
    execute: E,
}

impl<E> FnStage<E>
where
    E: Fn(&mut PipelineContext) -> Result<StageOutput, StageError> + Send + Sync,
{
    pub fn new(name: impl Into<String>, execute: E) -> Self {
        Self {
            name: name.into(),
            execute,
        }
    }
}

impl<E> Stage for FnStage<E>
where
    E: Fn(&mut PipelineContext) -> Result<StageOutput, StageError> + Send + Sync,
{
    fn name(&self) -> &str {
        &self.name
    }

    fn execute(&self, ctx: &mut PipelineContext) -> Result<StageOutput, StageError> {
        (self.execute)(ctx)
    }
}

// =============================================================================
// TESTS
// =============================================================================
