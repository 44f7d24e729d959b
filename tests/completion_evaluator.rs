use phasekeeper::completion::{evaluate_workflow, CompletionReason, PhaseTaskCounts};
use phasekeeper::domain::{
    PhaseRecord, ResultStatus, TaskRecord, TaskStatus, WorkflowRecord, WorkflowResultRecord,
    WorkflowStatus,
};
use phasekeeper::facts::{
    FactSource, FactSourceError, SourceKind, StoreFactSource, WorkflowSelector, WorkflowSnapshot,
};
use phasekeeper::report::{Agreement, Reporter, SourceOutcome};
use phasekeeper::shared::{
    EngineError, EngineLog, ExternalError, PhaseId, ResultId, TaskId, WorkflowId,
};
use phasekeeper::store::SqliteStore;
use tempfile::{tempdir, TempDir};

fn seeded_store() -> (TempDir, SqliteStore) {
    let dir = tempdir().expect("tempdir");
    let store = SqliteStore::open(&dir.path().join("engine.db")).expect("open store");
    store.ensure_schema().expect("schema");
    (dir, store)
}

fn add_workflow(store: &SqliteStore, id: &str, status: WorkflowStatus) -> WorkflowId {
    let id = WorkflowId::parse(id).expect("workflow id");
    store
        .insert_workflow(&WorkflowRecord {
            id: id.clone(),
            name: format!("{id} name"),
            status,
        })
        .expect("insert workflow");
    id
}

fn add_phase(store: &SqliteStore, workflow: &WorkflowId, id: &str, order: i64) -> PhaseId {
    let id = PhaseId::parse(id).expect("phase id");
    store
        .insert_phase(&PhaseRecord {
            id: id.clone(),
            workflow_id: workflow.clone(),
            order,
            name: format!("phase {order}"),
        })
        .expect("insert phase");
    id
}

fn add_tasks(store: &SqliteStore, phase: &PhaseId, statuses: &[TaskStatus]) {
    for (idx, status) in statuses.iter().enumerate() {
        let id = TaskId::parse(&format!("{phase}-t{idx}")).expect("task id");
        store
            .insert_task(&TaskRecord::new(id, phase.clone(), *status))
            .expect("insert task");
    }
}

struct FixedSource {
    kind: SourceKind,
    snapshot: Result<Option<WorkflowSnapshot>, String>,
}

impl FactSource for FixedSource {
    fn kind(&self) -> SourceKind {
        self.kind
    }

    fn load_snapshot(
        &self,
        _selector: &WorkflowSelector,
    ) -> Result<Option<WorkflowSnapshot>, FactSourceError> {
        self.snapshot.clone().map_err(|reason| {
            FactSourceError::External(ExternalError::transient("fetch_workflow_status", reason))
        })
    }
}

#[test]
fn validated_result_completes_workflow_with_pending_tasks() {
    let (_dir, store) = seeded_store();
    let workflow = add_workflow(&store, "wf-1", WorkflowStatus::Active);
    let phase = add_phase(&store, &workflow, "p-1", 1);
    add_tasks(&store, &phase, &[TaskStatus::Pending; 10]);
    store
        .insert_workflow_result(&WorkflowResultRecord {
            id: ResultId::parse("res-1").expect("result id"),
            workflow_id: workflow.clone(),
            status: ResultStatus::Validated,
            summary: Some("x".repeat(250)),
        })
        .expect("insert result");

    let source = StoreFactSource::new(store);
    let snapshot = source
        .load_snapshot(&WorkflowSelector::Current)
        .expect("load snapshot");
    let verdict = evaluate_workflow(snapshot.as_ref());

    assert!(verdict.complete);
    match &verdict.reason {
        CompletionReason::ValidatedResult { result_id, summary } => {
            assert_eq!(result_id, "res-1");
            assert_eq!(summary.as_deref().map(str::len), Some(100));
        }
        other => panic!("unexpected reason: {other:?}"),
    }
    assert_eq!(verdict.progress.pending_tasks, 10);
    assert_eq!(verdict.progress.completion_percentage, 0.0);
}

#[test]
fn rejected_result_does_not_complete_workflow() {
    let (_dir, store) = seeded_store();
    let workflow = add_workflow(&store, "wf-1", WorkflowStatus::Active);
    let phase = add_phase(&store, &workflow, "p-1", 1);
    add_tasks(&store, &phase, &[TaskStatus::Done, TaskStatus::Pending]);
    store
        .insert_workflow_result(&WorkflowResultRecord {
            id: ResultId::parse("res-1").expect("result id"),
            workflow_id: workflow,
            status: ResultStatus::Rejected,
            summary: None,
        })
        .expect("insert result");

    let snapshot = StoreFactSource::new(store)
        .load_snapshot(&WorkflowSelector::Current)
        .expect("load snapshot");
    let verdict = evaluate_workflow(snapshot.as_ref());
    assert!(!verdict.complete);
    assert_eq!(verdict.progress.completion_percentage, 50.0);
}

#[test]
fn phases_roll_up_in_order_with_failed_work_holding_phase_open() {
    let (_dir, store) = seeded_store();
    let workflow = add_workflow(&store, "wf-1", WorkflowStatus::Active);
    let second = add_phase(&store, &workflow, "p-2", 2);
    let first = add_phase(&store, &workflow, "p-1", 1);
    add_tasks(&store, &first, &[TaskStatus::Done, TaskStatus::Done]);
    add_tasks(
        &store,
        &second,
        &[TaskStatus::Done, TaskStatus::Done, TaskStatus::Failed],
    );

    let snapshot = StoreFactSource::new(store)
        .load_snapshot(&WorkflowSelector::Current)
        .expect("load snapshot")
        .expect("workflow");
    let verdict = evaluate_workflow(Some(&snapshot));

    assert_eq!(verdict.phases[0].order, Some(1));
    assert!(verdict.phases[0].complete);
    assert_eq!(verdict.phases[1].counts, PhaseTaskCounts::new(3, 2, 0, 0));
    assert!(!verdict.phases[1].complete);
    assert!(!verdict.complete);
    assert_eq!(verdict.progress.total_tasks, 5);
    assert_eq!(verdict.progress.completed_tasks, 4);
    assert_eq!(verdict.progress.completion_percentage, 80.0);
}

#[test]
fn zero_task_phase_keeps_workflow_incomplete() {
    let (_dir, store) = seeded_store();
    let workflow = add_workflow(&store, "wf-1", WorkflowStatus::Active);
    add_phase(&store, &workflow, "p-empty", 1);

    let snapshot = StoreFactSource::new(store)
        .load_snapshot(&WorkflowSelector::Current)
        .expect("load snapshot");
    let verdict = evaluate_workflow(snapshot.as_ref());
    assert!(!verdict.complete);
    assert!(!verdict.phases[0].complete);
    assert_eq!(verdict.progress.completion_percentage, 0.0);
}

#[test]
fn selection_by_id_reaches_completed_workflows_and_current_skips_them() {
    let (_dir, store) = seeded_store();
    add_workflow(&store, "wf-done", WorkflowStatus::Completed);
    let source = StoreFactSource::new(store);

    let current = source
        .load_snapshot(&WorkflowSelector::Current)
        .expect("load current");
    assert!(current.is_none());
    let verdict = evaluate_workflow(current.as_ref());
    assert_eq!(verdict.reason, CompletionReason::NoActiveWorkflow);

    let by_id = source
        .load_snapshot(&WorkflowSelector::ById(
            WorkflowId::parse("wf-done").expect("id"),
        ))
        .expect("load by id");
    let verdict = evaluate_workflow(by_id.as_ref());
    assert_eq!(verdict.reason, CompletionReason::MarkedCompleted);
    assert_eq!(verdict.workflow_id.as_deref(), Some("wf-done"));
}

#[test]
fn reporter_surfaces_disagreement_without_resolving_it() {
    let (_dir, store) = seeded_store();
    let workflow = add_workflow(&store, "wf-1", WorkflowStatus::Active);
    let phase = add_phase(&store, &workflow, "p-1", 1);
    add_tasks(&store, &phase, &[TaskStatus::Done, TaskStatus::InProgress]);

    let api = FixedSource {
        kind: SourceKind::Api,
        snapshot: Ok(Some(
            WorkflowSnapshot::new(WorkflowStatus::Active)
                .with_phase(PhaseTaskCounts::new(2, 2, 0, 0)),
        )),
    };
    let db = StoreFactSource::new(store);
    let log = EngineLog::disabled();

    let report = Reporter::new(vec![&api, &db], &log)
        .evaluate(&WorkflowSelector::Current)
        .expect("evaluate");

    assert_eq!(report.agreement, Agreement::Disagree);
    assert_eq!(report.complete, None);
    let fields: Vec<&str> = report.mismatches.iter().map(|m| m.field).collect();
    assert_eq!(fields, vec!["complete", "reason", "progress"]);
    assert_eq!(report.mismatches[0].left_source, SourceKind::Api);
    assert_eq!(report.mismatches[0].left, "true");
    assert_eq!(report.mismatches[0].right, "false");
}

#[test]
fn reporter_agrees_when_both_sources_match() {
    let snapshot = WorkflowSnapshot::new(WorkflowStatus::Active)
        .with_phase(PhaseTaskCounts::new(2, 1, 1, 0));
    let api = FixedSource {
        kind: SourceKind::Api,
        snapshot: Ok(Some(snapshot.clone())),
    };
    let db = FixedSource {
        kind: SourceKind::Store,
        snapshot: Ok(Some(snapshot)),
    };
    let log = EngineLog::disabled();

    let report = Reporter::new(vec![&api, &db], &log)
        .evaluate(&WorkflowSelector::Current)
        .expect("evaluate");
    assert_eq!(report.agreement, Agreement::Agree);
    assert_eq!(report.complete, Some(false));
    assert!(report.mismatches.is_empty());
}

#[test]
fn unavailable_source_is_recorded_and_marks_agreement_incomplete() {
    let api = FixedSource {
        kind: SourceKind::Api,
        snapshot: Err("connection refused".to_string()),
    };
    let db = FixedSource {
        kind: SourceKind::Store,
        snapshot: Ok(None),
    };
    let log = EngineLog::disabled();

    let report = Reporter::new(vec![&api, &db], &log)
        .evaluate(&WorkflowSelector::Current)
        .expect("evaluate");
    assert_eq!(report.agreement, Agreement::Incomplete);
    assert_eq!(report.complete, Some(true));
    match &report.sources[0].outcome {
        SourceOutcome::Unavailable { error } => assert!(error.contains("connection refused")),
        other => panic!("unexpected outcome: {other:?}"),
    }
}

#[test]
fn reporter_fails_when_every_source_fails() {
    let api = FixedSource {
        kind: SourceKind::Api,
        snapshot: Err("timed out".to_string()),
    };
    let log = EngineLog::disabled();

    let err = Reporter::new(vec![&api], &log)
        .evaluate(&WorkflowSelector::Current)
        .expect_err("all sources failed");
    assert!(matches!(err, EngineError::AllSourcesFailed(_)));
    assert!(err.to_string().contains("api: "));
}
