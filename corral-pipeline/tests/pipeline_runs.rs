//! End-to-end executor behavior: ordering, compensation, cancellation,
//! and trace consistency across a whole run.

use corral_core::{EventKind, StageError, TraceId};
use corral_pipeline::{
    CancelToken, FnStage, PipelineContext, PipelineExecutor, PipelineState, Stage, StageOutcome,
    StageOutput, CANONICAL_STAGES,
};
use corral_test_utils::RecordingSink;
use serde_json::json;
use std::sync::{Arc, Mutex};

/// Stage scripted to succeed or fail, journaling every call.
struct ScriptedStage {
    name: &'static str,
    fail: bool,
    fail_compensation: bool,
    log: Arc<Mutex<Vec<String>>>,
}

impl ScriptedStage {
    fn ok(name: &'static str, log: &Arc<Mutex<Vec<String>>>) -> Box<dyn Stage> {
        Box::new(Self {
            name,
            fail: false,
            fail_compensation: false,
            log: Arc::clone(log),
        })
    }

    fn failing(name: &'static str, log: &Arc<Mutex<Vec<String>>>) -> Box<dyn Stage> {
        Box::new(Self {
            name,
            fail: true,
            fail_compensation: false,
            log: Arc::clone(log),
        })
    }

    fn bad_compensation(name: &'static str, log: &Arc<Mutex<Vec<String>>>) -> Box<dyn Stage> {
        Box::new(Self {
            name,
            fail: false,
            fail_compensation: true,
            log: Arc::clone(log),
        })
    }
}

impl Stage for ScriptedStage {
    fn name(&self) -> &str {
        self.name
    }

    fn execute(&self, _ctx: &mut PipelineContext) -> Result<StageOutput, StageError> {
        self.log
            .lock()
            .unwrap()
            .push(format!("execute:{}", self.name));
        if self.fail {
            Err(StageError::new(self.name, "scripted failure"))
        } else {
            Ok(json!({ "stage": self.name }))
        }
    }

    fn compensate(&self, _ctx: &PipelineContext) -> Result<(), StageError> {
        self.log
            .lock()
            .unwrap()
            .push(format!("compensate:{}", self.name));
        if self.fail_compensation {
            Err(StageError::new(self.name, "compensation refused"))
        } else {
            Ok(())
        }
    }
}

fn canonical_with(
    log: &Arc<Mutex<Vec<String>>>,
    failing: Option<&str>,
) -> Vec<Box<dyn Stage>> {
    CANONICAL_STAGES
        .iter()
        .map(|&name| {
            if Some(name) == failing {
                ScriptedStage::failing(name, log)
            } else {
                ScriptedStage::ok(name, log)
            }
        })
        .collect()
}

fn executor() -> (PipelineExecutor, RecordingSink) {
    let sink = RecordingSink::new();
    (PipelineExecutor::new(Arc::new(sink.clone())), sink)
}

#[test]
fn successful_run_completes_all_stages() {
    let log = Arc::new(Mutex::new(Vec::new()));
    let (executor, sink) = executor();
    let stages = canonical_with(&log, None);

    let report = executor.run(&stages, json!({"target": "prod"}), "a1", None);

    assert!(report.is_completed());
    assert_eq!(report.state, PipelineState::Completed);
    assert_eq!(report.stages.len(), 5);
    for (stage, name) in report.stages.iter().zip(CANONICAL_STAGES) {
        assert_eq!(stage.stage, name);
        assert_eq!(stage.outcome, StageOutcome::Completed);
    }

    // PipelineStarted + 5 * (started, completed) + PipelineCompleted.
    let events = sink.events();
    assert_eq!(events.len(), 12);
    assert_eq!(events[0].kind, EventKind::PipelineStarted);
    assert_eq!(events[11].kind, EventKind::PipelineCompleted);

    let executed: Vec<String> = log.lock().unwrap().clone();
    let expected: Vec<String> = CANONICAL_STAGES
        .iter()
        .map(|s| format!("execute:{s}"))
        .collect();
    assert_eq!(executed, expected);
}

#[test]
fn generated_trace_is_used_when_none_supplied() {
    let log = Arc::new(Mutex::new(Vec::new()));
    let (executor, sink) = executor();
    let stages = canonical_with(&log, None);

    let report = executor.run(&stages, json!({}), "a1", None);

    // The generated ID is well-formed and identical everywhere.
    TraceId::parse(report.trace_id.as_str()).unwrap();
    for trace in sink.trace_ids() {
        assert_eq!(trace, report.trace_id);
    }
}

#[test]
fn supplied_trace_flows_unmodified() {
    let log = Arc::new(Mutex::new(Vec::new()));
    let (executor, sink) = executor();
    let stages = canonical_with(&log, None);
    let trace = TraceId::generate();

    let report = executor.run(&stages, json!({}), "a1", Some(trace.clone()));

    assert_eq!(report.trace_id, trace);
    assert!(!sink.events().is_empty());
    for event_trace in sink.trace_ids() {
        assert_eq!(event_trace, trace);
    }
}

#[test]
fn export_failure_compensates_and_reports() {
    // Canonical failure scenario: export (stage 3 of 5) fails. validate
    // and compile are compensated in reverse order; execute and monitor
    // never run.
    let log = Arc::new(Mutex::new(Vec::new()));
    let (executor, sink) = executor();
    let stages = canonical_with(&log, Some("export"));
    let trace = TraceId::generate();

    let report = executor.run(&stages, json!({}), "a1", Some(trace.clone()));

    assert_eq!(
        report.state,
        PipelineState::Failed {
            stage: "export".to_string()
        }
    );
    let failure = report.failure.as_ref().unwrap();
    assert_eq!(failure.stage, "export");
    assert_eq!(failure.trace_id, trace);
    assert_eq!(failure.reason, "scripted failure");

    let journal: Vec<String> = log.lock().unwrap().clone();
    assert_eq!(
        journal,
        vec![
            "execute:validate",
            "execute:compile",
            "execute:export",
            "compensate:compile",
            "compensate:validate",
        ]
    );

    assert_eq!(report.stage("validate").unwrap().outcome, StageOutcome::Compensated);
    assert_eq!(report.stage("compile").unwrap().outcome, StageOutcome::Compensated);
    assert_eq!(report.stage("export").unwrap().outcome, StageOutcome::Failed);
    assert!(report.stage("execute").is_none());
    assert!(report.stage("monitor").is_none());

    // Every event of the run, including failure and compensation events,
    // carries the identical trace ID.
    for event_trace in sink.trace_ids() {
        assert_eq!(event_trace, trace);
    }
    let kinds: Vec<EventKind> = sink.events().iter().map(|e| e.kind).collect();
    assert!(kinds.contains(&EventKind::StageFailed));
    assert!(kinds.contains(&EventKind::StageCompensated));
    assert_eq!(*kinds.last().unwrap(), EventKind::PipelineFailed);
}

#[test]
fn compensation_failure_does_not_mask_stage_failure() {
    let log = Arc::new(Mutex::new(Vec::new()));
    let (executor, sink) = executor();
    let stages: Vec<Box<dyn Stage>> = vec![
        ScriptedStage::ok("validate", &log),
        ScriptedStage::bad_compensation("compile", &log),
        ScriptedStage::failing("export", &log),
    ];

    let report = executor.run(&stages, json!({}), "a1", None);

    // The original failure wins; the compensation failure is recorded
    // alongside, and compensation continued past it.
    assert_eq!(report.failure.as_ref().unwrap().stage, "export");
    assert_eq!(
        report.stage("compile").unwrap().outcome,
        StageOutcome::CompensationFailed
    );
    assert_eq!(
        report.stage("validate").unwrap().outcome,
        StageOutcome::Compensated
    );

    let kinds: Vec<EventKind> = sink.events().iter().map(|e| e.kind).collect();
    assert!(kinds.contains(&EventKind::CompensationFailed));

    let journal: Vec<String> = log.lock().unwrap().clone();
    assert_eq!(
        journal,
        vec![
            "execute:validate",
            "execute:compile",
            "execute:export",
            "compensate:compile",
            "compensate:validate",
        ]
    );
}

#[test]
fn cancellation_between_stages_compensates() {
    let log = Arc::new(Mutex::new(Vec::new()));
    let (executor, _sink) = executor();
    let cancel = CancelToken::new();

    // The compile stage trips the token; export must never start and the
    // completed stages roll back.
    let trip = cancel.clone();
    let stages: Vec<Box<dyn Stage>> = vec![
        ScriptedStage::ok("validate", &log),
        Box::new(FnStage::new("compile", move |_: &mut PipelineContext| {
            trip.cancel();
            Ok(json!({}))
        })),
        ScriptedStage::ok("export", &log),
    ];

    let report = executor.run_with_cancel(&stages, json!({}), "a1", None, &cancel);

    assert_eq!(
        report.state,
        PipelineState::Failed {
            stage: "export".to_string()
        }
    );
    assert!(report
        .failure
        .as_ref()
        .unwrap()
        .reason
        .contains("cancelled"));

    let journal: Vec<String> = log.lock().unwrap().clone();
    assert_eq!(journal, vec!["execute:validate", "compensate:validate"]);
}

#[test]
fn pre_cancelled_run_executes_nothing() {
    let log = Arc::new(Mutex::new(Vec::new()));
    let (executor, _sink) = executor();
    let cancel = CancelToken::new();
    cancel.cancel();
    let stages = canonical_with(&log, None);

    let report = executor.run_with_cancel(&stages, json!({}), "a1", None, &cancel);

    assert!(matches!(report.state, PipelineState::Failed { .. }));
    assert!(log.lock().unwrap().is_empty());
}

#[test]
fn empty_pipeline_completes() {
    let (executor, sink) = executor();
    let report = executor.run(&[], json!({}), "a1", None);

    assert!(report.is_completed());
    assert!(report.stages.is_empty());
    let kinds: Vec<EventKind> = sink.events().iter().map(|e| e.kind).collect();
    assert_eq!(
        kinds,
        vec![EventKind::PipelineStarted, EventKind::PipelineCompleted]
    );
}

#[test]
fn stage_outputs_accumulate_in_context() {
    let (executor, _sink) = executor();
    let stages: Vec<Box<dyn Stage>> = vec![
        Box::new(FnStage::new("validate", |_: &mut PipelineContext| {
            Ok(json!({"valid": true}))
        })),
        Box::new(FnStage::new("compile", |ctx: &mut PipelineContext| {
            // Later stages see earlier partial results.
            let validated = ctx.output("validate").cloned().unwrap_or_default();
            Ok(json!({ "based_on": validated }))
        })),
    ];

    let report = executor.run(&stages, json!({}), "a1", None);
    assert!(report.is_completed());
}
