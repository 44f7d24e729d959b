use phasekeeper::control::{AdmissionOutcome, QueueAdmission, SqliteQueueAdmission};
use phasekeeper::domain::{TaskRecord, TaskStatus};
use phasekeeper::recovery::{AdmissionStatus, FailedTaskRecovery};
use phasekeeper::shared::{AgentId, EngineError, EngineLog, ExternalError, PhaseId, RunMode, TaskId};
use phasekeeper::store::SqliteStore;
use rusqlite::Connection;
use std::sync::Mutex;
use tempfile::{tempdir, TempDir};

fn seeded_store() -> (TempDir, SqliteStore) {
    let dir = tempdir().expect("tempdir");
    let store = SqliteStore::open(&dir.path().join("engine.db")).expect("open store");
    store.ensure_schema().expect("schema");
    (dir, store)
}

fn id(raw: &str) -> TaskId {
    TaskId::parse(raw).expect("task id")
}

fn add_failed(store: &SqliteStore, task: &str) {
    let phase = PhaseId::parse("p-1").expect("id");
    let mut record = TaskRecord::new(id(task), phase, TaskStatus::Failed);
    record.failure_reason = Some("worktree creation failed".to_string());
    record.assigned_agent_id = Some(AgentId::parse("agent-1").expect("id"));
    record.started_at = Some(100);
    record.completed_at = Some(200);
    store.insert_task(&record).expect("insert task");
}

fn add_task(store: &SqliteStore, task: &str, status: TaskStatus) -> TaskRecord {
    let record = TaskRecord::new(id(task), PhaseId::parse("p-1").expect("id"), status);
    store.insert_task(&record).expect("insert task");
    record
}

fn status_of(store: &SqliteStore, task: &str) -> TaskStatus {
    store.task(&id(task)).expect("read").expect("task").status
}

/// Admission that fails for listed tasks and records the rest.
#[derive(Default)]
struct ScriptedAdmission {
    failing: Vec<TaskId>,
    admitted: Mutex<Vec<TaskId>>,
}

impl QueueAdmission for ScriptedAdmission {
    fn enqueue(&self, task_id: &TaskId) -> Result<AdmissionOutcome, ExternalError> {
        if self.failing.contains(task_id) {
            return Err(ExternalError::transient("enqueue", "queue unavailable"));
        }
        self.admitted.lock().expect("lock").push(task_id.clone());
        Ok(AdmissionOutcome::Admitted)
    }
}

#[test]
fn execute_resets_failed_tasks_and_admits_them() {
    let (_dir, store) = seeded_store();
    add_failed(&store, "task-a");
    add_failed(&store, "task-b");
    add_task(&store, "task-c", TaskStatus::Done);
    let admission = SqliteQueueAdmission::new(store.clone());
    let log = EngineLog::disabled();

    let report = FailedTaskRecovery::new(&store, &admission, &log, 2)
        .run(RunMode::Execute, false)
        .expect("recover");

    assert_eq!(report.failed.len(), 2);
    assert_eq!(report.reset, vec![id("task-a"), id("task-b")]);
    assert!(report.skipped.is_empty());
    assert!(report
        .admissions
        .iter()
        .all(|item| item.status == AdmissionStatus::Admitted));
    assert_eq!(store.queued_task_ids().expect("queue").len(), 2);

    let task = store.task(&id("task-a")).expect("read").expect("task");
    assert_eq!(task.status, TaskStatus::Queued);
    assert_eq!(task.failure_reason, None);
    assert_eq!(task.assigned_agent_id, None);
    assert_eq!(task.started_at, None);
    assert_eq!(task.completed_at, None);
    assert_eq!(status_of(&store, "task-c"), TaskStatus::Done);
}

#[test]
fn report_mode_never_mutates() {
    let (_dir, store) = seeded_store();
    add_failed(&store, "task-a");
    let admission = ScriptedAdmission::default();
    let log = EngineLog::disabled();

    let report = FailedTaskRecovery::new(&store, &admission, &log, 4)
        .run(RunMode::Report, false)
        .expect("report");
    assert_eq!(report.failed.len(), 1);
    assert_eq!(
        report.failed[0].failure_reason.as_deref(),
        Some("worktree creation failed")
    );
    assert!(report.reset.is_empty());
    assert!(admission.admitted.lock().expect("lock").is_empty());
    assert_eq!(status_of(&store, "task-a"), TaskStatus::Failed);
}

#[test]
fn injected_failure_on_second_task_rolls_back_the_whole_reset() {
    let (_dir, store) = seeded_store();
    add_failed(&store, "task-a");
    add_failed(&store, "task-b");
    Connection::open(store.db_path())
        .expect("raw connection")
        .execute_batch(
            "CREATE TRIGGER reject_task_b BEFORE UPDATE ON tasks WHEN OLD.id = 'task-b'
             BEGIN SELECT RAISE(ABORT, 'injected'); END;",
        )
        .expect("install trigger");
    let admission = ScriptedAdmission::default();
    let log = EngineLog::disabled();

    let err = FailedTaskRecovery::new(&store, &admission, &log, 4)
        .run(RunMode::Execute, false)
        .expect_err("reset must fail");
    assert!(matches!(err, EngineError::Store(_)));
    assert_eq!(status_of(&store, "task-a"), TaskStatus::Failed);
    assert_eq!(status_of(&store, "task-b"), TaskStatus::Failed);
    assert!(admission.admitted.lock().expect("lock").is_empty());
}

#[test]
fn admission_failures_are_itemized_and_keep_the_reset() {
    let (_dir, store) = seeded_store();
    add_failed(&store, "task-a");
    add_failed(&store, "task-b");
    let admission = ScriptedAdmission {
        failing: vec![id("task-b")],
        ..ScriptedAdmission::default()
    };
    let log = EngineLog::disabled();

    let report = FailedTaskRecovery::new(&store, &admission, &log, 4)
        .run(RunMode::Execute, false)
        .expect("recover");
    assert_eq!(report.admission_failures(), 1);
    assert_eq!(report.admissions[0].status, AdmissionStatus::Admitted);
    match &report.admissions[1].status {
        AdmissionStatus::Failed { error } => assert!(error.is_retryable()),
        other => panic!("unexpected status: {other:?}"),
    }
    assert_eq!(status_of(&store, "task-a"), TaskStatus::Queued);
    assert_eq!(status_of(&store, "task-b"), TaskStatus::Queued);
}

#[test]
fn second_run_finds_nothing_and_requeue_is_idempotent() {
    let (_dir, store) = seeded_store();
    add_failed(&store, "task-a");
    let admission = SqliteQueueAdmission::new(store.clone());
    let log = EngineLog::disabled();
    let recovery = FailedTaskRecovery::new(&store, &admission, &log, 4);

    recovery.run(RunMode::Execute, false).expect("first run");
    let again = recovery.run(RunMode::Execute, false).expect("second run");
    assert!(again.failed.is_empty());
    assert!(again.admissions.is_empty());

    assert_eq!(
        admission.enqueue(&id("task-a")).expect("enqueue"),
        AdmissionOutcome::AlreadyQueued
    );
    assert_eq!(store.queued_task_ids().expect("queue"), vec![id("task-a")]);
}

#[test]
fn blocked_tasks_are_reported_but_untouched() {
    let (_dir, store) = seeded_store();
    let mut blocked = TaskRecord::new(
        id("task-x"),
        PhaseId::parse("p-1").expect("id"),
        TaskStatus::Blocked,
    );
    blocked.description = Some("integrate API client".to_string());
    blocked.blocked_by = vec![id("task-a"), id("task-b")];
    store.insert_task(&blocked).expect("insert");
    let admission = ScriptedAdmission::default();
    let log = EngineLog::disabled();

    let report = FailedTaskRecovery::new(&store, &admission, &log, 4)
        .run(RunMode::Execute, true)
        .expect("recover");
    let views = report.blocked.expect("blocked section");
    assert_eq!(views.len(), 1);
    assert_eq!(views[0].task_id, id("task-x"));
    assert_eq!(views[0].description.as_deref(), Some("integrate API client"));
    assert_eq!(views[0].blocked_by, vec![id("task-a"), id("task-b")]);
    assert_eq!(status_of(&store, "task-x"), TaskStatus::Blocked);
}
