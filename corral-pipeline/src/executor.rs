//! The pipeline executor: an ordered state machine that threads one trace
//! ID through heterogeneous stages.
//!
//! Execution is strictly sequential. On failure of stage *k*, the
//! compensations of stages *k-1 … 1* run in reverse order, best-effort:
//! a failing compensation is logged and reported but never masks the
//! original stage failure. Cancellation between stages takes the same
//! compensation path.
//!
//! Before and after every stage the executor emits a telemetry event
//! carrying the run's trace ID; these emissions are how trace-consistency
//! is externally observable.

use crate::context::PipelineContext;
use crate::report::{FailureReport, PipelineReport, PipelineState, StageOutcome, StageReport};
use crate::stage::Stage;
use corral_core::{EventKind, SharedSink, StageError, TelemetryEvent, TraceId};
use serde_json::Value;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;

// ============================================================================
// CANCELLATION
// ============================================================================

/// Cooperative cancellation token, checked between stages.
///
/// The executor defines no timeout of its own; a caller that wants one
/// arms a token externally. Cancellation still compensates the stages
/// that already completed, identical to the failure path.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    flag: Arc<AtomicBool>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation. Takes effect at the next stage boundary.
    pub fn cancel(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }
}

// ============================================================================
// EXECUTOR
// ============================================================================

/// Runs an ordered list of named stages against one context.
pub struct PipelineExecutor {
    sink: SharedSink,
}

impl PipelineExecutor {
    pub fn new(sink: SharedSink) -> Self {
        Self { sink }
    }

    /// Run `stages` in order against a fresh context.
    ///
    /// When `trace_id` is absent a root ID is generated; either way the
    /// same value flows unmodified through every stage, event, and the
    /// returned report.
    pub fn run(
        &self,
        stages: &[Box<dyn Stage>],
        request: Value,
        agent_id: &str,
        trace_id: Option<TraceId>,
    ) -> PipelineReport {
        self.run_with_cancel(stages, request, agent_id, trace_id, &CancelToken::new())
    }

    /// `run`, with a cooperative cancellation token checked between stages.
    pub fn run_with_cancel(
        &self,
        stages: &[Box<dyn Stage>],
        request: Value,
        agent_id: &str,
        trace_id: Option<TraceId>,
        cancel: &CancelToken,
    ) -> PipelineReport {
        let trace = trace_id.unwrap_or_else(TraceId::generate);
        let mut ctx = PipelineContext::new(trace.clone(), agent_id, request);
        let mut reports: Vec<StageReport> = Vec::with_capacity(stages.len());
        let mut completed: Vec<usize> = Vec::with_capacity(stages.len());

        self.emit(EventKind::PipelineStarted, &trace, None, None);

        for (i, stage) in stages.iter().enumerate() {
            if cancel.is_cancelled() {
                let reason = format!("cancelled before stage {}", stage.name());
                self.compensate(stages, &completed, &ctx, &mut reports);
                self.emit(EventKind::PipelineFailed, &trace, None, Some(&reason));
                return PipelineReport {
                    state: PipelineState::Failed {
                        stage: stage.name().to_string(),
                    },
                    trace_id: trace.clone(),
                    stages: reports,
                    failure: Some(FailureReport {
                        stage: stage.name().to_string(),
                        reason,
                        trace_id: trace,
                    }),
                };
            }

            self.emit(EventKind::StageStarted, &trace, Some(stage.name()), None);
            let started = Instant::now();
            let result = stage.execute(&mut ctx);
            let duration = started.elapsed();

            match result {
                Ok(output) => {
                    ctx.record_output(stage.name(), output);
                    self.sink.emit(
                        TelemetryEvent::builder(EventKind::StageCompleted, trace.clone())
                            .stage(stage.name())
                            .duration(duration)
                            .build(),
                    );
                    reports.push(StageReport {
                        stage: stage.name().to_string(),
                        outcome: StageOutcome::Completed,
                        duration,
                    });
                    completed.push(i);
                }
                Err(StageError { reason, .. }) => {
                    self.sink.emit(
                        TelemetryEvent::builder(EventKind::StageFailed, trace.clone())
                            .stage(stage.name())
                            .duration(duration)
                            .failed(reason.clone())
                            .build(),
                    );
                    reports.push(StageReport {
                        stage: stage.name().to_string(),
                        outcome: StageOutcome::Failed,
                        duration,
                    });
                    self.compensate(stages, &completed, &ctx, &mut reports);
                    self.emit(
                        EventKind::PipelineFailed,
                        &trace,
                        Some(stage.name()),
                        Some(&reason),
                    );
                    return PipelineReport {
                        state: PipelineState::Failed {
                            stage: stage.name().to_string(),
                        },
                        trace_id: trace.clone(),
                        stages: reports,
                        failure: Some(FailureReport {
                            stage: stage.name().to_string(),
                            reason,
                            trace_id: trace,
                        }),
                    };
                }
            }
        }

        self.emit(EventKind::PipelineCompleted, &trace, None, None);
        PipelineReport {
            state: PipelineState::Completed,
            trace_id: trace,
            stages: reports,
            failure: None,
        }
    }

    /// Roll back completed stages in reverse order, best-effort.
    fn compensate(
        &self,
        stages: &[Box<dyn Stage>],
        completed: &[usize],
        ctx: &PipelineContext,
        reports: &mut [StageReport],
    ) {
        for &i in completed.iter().rev() {
            let stage = &stages[i];
            match stage.compensate(ctx) {
                Ok(()) => {
                    self.emit(
                        EventKind::StageCompensated,
                        ctx.trace_id(),
                        Some(stage.name()),
                        None,
                    );
                    reports[i].outcome = StageOutcome::Compensated;
                }
                Err(e) => {
                    tracing::warn!(
                        stage = stage.name(),
                        trace_id = %ctx.trace_id(),
                        error = %e,
                        "compensation failed, continuing with remaining compensations"
                    );
                    self.sink.emit(
                        TelemetryEvent::builder(
                            EventKind::CompensationFailed,
                            ctx.trace_id().clone(),
                        )
                        .stage(stage.name())
                        .failed(e.reason)
                        .build(),
                    );
                    reports[i].outcome = StageOutcome::CompensationFailed;
                }
            }
        }
    }

    fn emit(&self, kind: EventKind, trace: &TraceId, stage: Option<&str>, reason: Option<&str>) {
        let mut builder = TelemetryEvent::builder(kind, trace.clone());
        if let Some(stage) = stage {
            builder = builder.stage(stage);
        }
        if let Some(reason) = reason {
            builder = builder.failed(reason);
        }
        self.sink.emit(builder.build());
    }
}
