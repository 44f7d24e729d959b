use crate::control::{AdmissionOutcome, QueueAdmission};
use crate::domain::{TaskRecord, TaskStatus};
use crate::shared::{run_bounded, EngineError, EngineLog, ExternalError, RunMode, TaskId};
use crate::store::SqliteStore;
use serde::Serialize;
use serde_json::json;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FailedTaskView {
    pub task_id: TaskId,
    pub description: Option<String>,
    pub failure_reason: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BlockedTaskView {
    pub task_id: TaskId,
    pub description: Option<String>,
    pub blocked_by: Vec<TaskId>,
}

impl From<TaskRecord> for BlockedTaskView {
    fn from(task: TaskRecord) -> Self {
        Self {
            task_id: task.id,
            description: task.description,
            blocked_by: task.blocked_by,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum AdmissionStatus {
    Admitted,
    AlreadyQueued,
    Failed { error: ExternalError },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AdmissionResult {
    pub task_id: TaskId,
    #[serde(flatten)]
    pub status: AdmissionStatus,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FailedTaskReport {
    pub mode: RunMode,
    pub failed: Vec<FailedTaskView>,
    /// Tasks moved back to `queued` by this run.
    pub reset: Vec<TaskId>,
    /// Tasks that left `failed` between selection and reset.
    pub skipped: Vec<TaskId>,
    pub admissions: Vec<AdmissionResult>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub blocked: Option<Vec<BlockedTaskView>>,
}

impl FailedTaskReport {
    pub fn admission_failures(&self) -> usize {
        self.admissions
            .iter()
            .filter(|item| matches!(item.status, AdmissionStatus::Failed { .. }))
            .count()
    }
}

/// Resets `failed` tasks to `queued` and re-admits them.
pub struct FailedTaskRecovery<'a> {
    store: &'a SqliteStore,
    admission: &'a dyn QueueAdmission,
    log: &'a EngineLog,
    max_fanout: usize,
}

impl<'a> FailedTaskRecovery<'a> {
    pub fn new(
        store: &'a SqliteStore,
        admission: &'a dyn QueueAdmission,
        log: &'a EngineLog,
        max_fanout: usize,
    ) -> Self {
        Self {
            store,
            admission,
            log,
            max_fanout,
        }
    }

    pub fn blocked_tasks(&self) -> Result<Vec<BlockedTaskView>, EngineError> {
        Ok(self
            .store
            .tasks_with_status(TaskStatus::Blocked)?
            .into_iter()
            .map(BlockedTaskView::from)
            .collect())
    }

    pub fn run(
        &self,
        mode: RunMode,
        include_blocked: bool,
    ) -> Result<FailedTaskReport, EngineError> {
        let failed_tasks = self.store.tasks_with_status(TaskStatus::Failed)?;
        let blocked = if include_blocked {
            Some(self.blocked_tasks()?)
        } else {
            None
        };
        let failed: Vec<FailedTaskView> = failed_tasks
            .into_iter()
            .map(|task| FailedTaskView {
                task_id: task.id,
                description: task.description,
                failure_reason: task.failure_reason,
            })
            .collect();
        self.log.info(
            "recovery.failed_tasks.selected",
            &[("mode", json!(mode)), ("failed", json!(failed.len()))],
        );

        let mut report = FailedTaskReport {
            mode,
            failed,
            reset: Vec::new(),
            skipped: Vec::new(),
            admissions: Vec::new(),
            blocked,
        };
        if !mode.is_execute() || report.failed.is_empty() {
            return Ok(report);
        }

        let selected: Vec<TaskId> = report.failed.iter().map(|t| t.task_id.clone()).collect();
        report.reset = self.store.reset_failed_tasks(&selected)?;
        report.skipped = selected
            .into_iter()
            .filter(|id| !report.reset.contains(id))
            .collect();
        self.log.info(
            "recovery.failed_tasks.reset",
            &[
                ("reset", json!(report.reset)),
                ("skipped", json!(report.skipped)),
            ],
        );

        report.admissions = run_bounded(report.reset.clone(), self.max_fanout, |task_id| {
            self.admit(task_id)
        });
        Ok(report)
    }

    fn admit(&self, task_id: TaskId) -> AdmissionResult {
        let status = match self.admission.enqueue(&task_id) {
            Ok(AdmissionOutcome::Admitted) => AdmissionStatus::Admitted,
            Ok(AdmissionOutcome::AlreadyQueued) => AdmissionStatus::AlreadyQueued,
            Err(error) => {
                self.log.warn(
                    "recovery.failed_tasks.enqueue_failed",
                    &[
                        ("task_id", json!(task_id)),
                        ("retryable", json!(error.is_retryable())),
                        ("error", json!(error.to_string())),
                    ],
                );
                AdmissionStatus::Failed { error }
            }
        };
        AdmissionResult { task_id, status }
    }
}
