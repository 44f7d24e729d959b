use super::rows::{
    encode_blocked_by, RawAgent, RawPhase, RawResult, RawTask, RawWorkflow, RawWorktree,
    AGENT_COLUMNS, PHASE_COLUMNS, RESULT_COLUMNS, TASK_COLUMNS, WORKFLOW_COLUMNS,
    WORKTREE_COLUMNS,
};
use super::schema::SCHEMA;
use super::StoreError;
use crate::completion::PhaseTaskCounts;
use crate::domain::{
    find_assignment_inconsistencies, AgentRecord, AgentStatus, AssignmentInconsistency,
    MergeStatus, PhaseRecord, ResultStatus, TaskRecord, TaskStatus, WorkflowRecord,
    WorkflowResultRecord, WorkflowStatus, WorktreeRecord,
};
use crate::shared::{now_secs, AgentId, PhaseId, TaskId, WorkflowId, WorktreeId};
use rusqlite::{params, params_from_iter, Connection, OptionalExtension};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// Persisted store of workflows, phases, tasks, agents and worktrees.
///
/// Every call opens its own connection, so one store value can be shared by
/// the fan-out workers of a recovery batch.
#[derive(Debug, Clone)]
pub struct SqliteStore {
    db_path: PathBuf,
}

fn placeholders(count: usize) -> String {
    vec!["?"; count].join(", ")
}

impl SqliteStore {
    pub fn open(db_path: &Path) -> Result<Self, StoreError> {
        if let Some(parent) = db_path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|source| StoreError::CreateParent {
                path: parent.display().to_string(),
                source,
            })?;
        }

        let store = Self {
            db_path: db_path.to_path_buf(),
        };
        let _ = store.connect()?;
        Ok(store)
    }

    pub fn db_path(&self) -> &Path {
        &self.db_path
    }

    pub fn ensure_schema(&self) -> Result<(), StoreError> {
        self.connect()?
            .execute_batch(SCHEMA)
            .map_err(StoreError::sql)
    }

    fn connect(&self) -> Result<Connection, StoreError> {
        let connection =
            Connection::open(&self.db_path).map_err(|source| StoreError::Open {
                path: self.db_path.display().to_string(),
                source,
            })?;
        connection
            .busy_timeout(BUSY_TIMEOUT)
            .map_err(StoreError::sql)?;
        Ok(connection)
    }

    pub fn workflow_by_id(&self, workflow_id: &str) -> Result<Option<WorkflowRecord>, StoreError> {
        let connection = self.connect()?;
        let raw = connection
            .query_row(
                &format!("SELECT {WORKFLOW_COLUMNS} FROM workflows WHERE id = ?1"),
                params![workflow_id],
                RawWorkflow::read,
            )
            .optional()
            .map_err(StoreError::sql)?;
        raw.map(RawWorkflow::decode).transpose()
    }

    /// Oldest workflow whose status is one of `statuses`.
    pub fn first_workflow_with_status(
        &self,
        statuses: &[WorkflowStatus],
    ) -> Result<Option<WorkflowRecord>, StoreError> {
        if statuses.is_empty() {
            return Ok(None);
        }
        let connection = self.connect()?;
        let sql = format!(
            "SELECT {WORKFLOW_COLUMNS} FROM workflows WHERE status IN ({}) \
             ORDER BY created_at ASC, rowid ASC LIMIT 1",
            placeholders(statuses.len())
        );
        let raw = connection
            .query_row(
                &sql,
                params_from_iter(statuses.iter().map(|s| s.as_str())),
                RawWorkflow::read,
            )
            .optional()
            .map_err(StoreError::sql)?;
        raw.map(RawWorkflow::decode).transpose()
    }

    pub fn phases_for_workflow(
        &self,
        workflow_id: &WorkflowId,
    ) -> Result<Vec<PhaseRecord>, StoreError> {
        let connection = self.connect()?;
        let mut stmt = connection
            .prepare(&format!(
                "SELECT {PHASE_COLUMNS} FROM phases WHERE workflow_id = ?1 \
                 ORDER BY phase_order ASC, rowid ASC"
            ))
            .map_err(StoreError::sql)?;
        let rows = stmt
            .query_map(params![workflow_id.as_str()], RawPhase::read)
            .map_err(StoreError::sql)?;
        let mut phases = Vec::new();
        for row in rows {
            phases.push(row.map_err(StoreError::sql)?.decode()?);
        }
        Ok(phases)
    }

    pub fn phase_task_counts(&self, phase_id: &PhaseId) -> Result<PhaseTaskCounts, StoreError> {
        let connection = self.connect()?;
        let mut stmt = connection
            .prepare("SELECT status, COUNT(*) FROM tasks WHERE phase_id = ?1 GROUP BY status")
            .map_err(StoreError::sql)?;
        let rows = stmt
            .query_map(params![phase_id.as_str()], |row| {
                Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?))
            })
            .map_err(StoreError::sql)?;

        let mut counts = PhaseTaskCounts::default();
        for row in rows {
            let (raw_status, count) = row.map_err(StoreError::sql)?;
            let status = TaskStatus::parse(&raw_status).map_err(|reason| {
                StoreError::InvalidValue {
                    column: "tasks.status",
                    value: raw_status.clone(),
                    reason,
                }
            })?;
            let count = u64::try_from(count).map_err(|_| StoreError::InvalidValue {
                column: "tasks.count",
                value: count.to_string(),
                reason: "task count must not be negative".to_string(),
            })?;
            counts.add_status(status, count);
        }
        Ok(counts)
    }

    pub fn validated_result(
        &self,
        workflow_id: &WorkflowId,
    ) -> Result<Option<WorkflowResultRecord>, StoreError> {
        let connection = self.connect()?;
        let raw = connection
            .query_row(
                &format!(
                    "SELECT {RESULT_COLUMNS} FROM workflow_results \
                     WHERE workflow_id = ?1 AND status = ?2 \
                     ORDER BY created_at ASC, rowid ASC LIMIT 1"
                ),
                params![workflow_id.as_str(), ResultStatus::Validated.as_str()],
                RawResult::read,
            )
            .optional()
            .map_err(StoreError::sql)?;
        raw.map(RawResult::decode).transpose()
    }

    pub fn task(&self, task_id: &TaskId) -> Result<Option<TaskRecord>, StoreError> {
        let connection = self.connect()?;
        let raw = connection
            .query_row(
                &format!("SELECT {TASK_COLUMNS} FROM tasks WHERE id = ?1"),
                params![task_id.as_str()],
                RawTask::read,
            )
            .optional()
            .map_err(StoreError::sql)?;
        raw.map(RawTask::decode).transpose()
    }

    pub fn tasks_with_status(&self, status: TaskStatus) -> Result<Vec<TaskRecord>, StoreError> {
        self.tasks_with_statuses(&[status])
    }

    pub fn tasks_with_statuses(
        &self,
        statuses: &[TaskStatus],
    ) -> Result<Vec<TaskRecord>, StoreError> {
        if statuses.is_empty() {
            return Ok(Vec::new());
        }
        let connection = self.connect()?;
        let mut stmt = connection
            .prepare(&format!(
                "SELECT {TASK_COLUMNS} FROM tasks WHERE status IN ({}) ORDER BY rowid ASC",
                placeholders(statuses.len())
            ))
            .map_err(StoreError::sql)?;
        let rows = stmt
            .query_map(
                params_from_iter(statuses.iter().map(|s| s.as_str())),
                RawTask::read,
            )
            .map_err(StoreError::sql)?;
        let mut tasks = Vec::new();
        for row in rows {
            tasks.push(row.map_err(StoreError::sql)?.decode()?);
        }
        Ok(tasks)
    }

    pub fn agent(&self, agent_id: &AgentId) -> Result<Option<AgentRecord>, StoreError> {
        let connection = self.connect()?;
        let raw = connection
            .query_row(
                &format!("SELECT {AGENT_COLUMNS} FROM agents WHERE id = ?1"),
                params![agent_id.as_str()],
                RawAgent::read,
            )
            .optional()
            .map_err(StoreError::sql)?;
        raw.map(RawAgent::decode).transpose()
    }

    pub fn agents_with_status(
        &self,
        statuses: &[AgentStatus],
    ) -> Result<Vec<AgentRecord>, StoreError> {
        if statuses.is_empty() {
            return Ok(Vec::new());
        }
        let connection = self.connect()?;
        let mut stmt = connection
            .prepare(&format!(
                "SELECT {AGENT_COLUMNS} FROM agents WHERE status IN ({}) ORDER BY rowid ASC",
                placeholders(statuses.len())
            ))
            .map_err(StoreError::sql)?;
        let rows = stmt
            .query_map(
                params_from_iter(statuses.iter().map(|s| s.as_str())),
                RawAgent::read,
            )
            .map_err(StoreError::sql)?;
        let mut agents = Vec::new();
        for row in rows {
            agents.push(row.map_err(StoreError::sql)?.decode()?);
        }
        Ok(agents)
    }

    pub fn worktrees_with_status(
        &self,
        status: MergeStatus,
    ) -> Result<Vec<WorktreeRecord>, StoreError> {
        let connection = self.connect()?;
        let mut stmt = connection
            .prepare(&format!(
                "SELECT {WORKTREE_COLUMNS} FROM agent_worktrees WHERE merge_status = ?1 \
                 ORDER BY rowid ASC"
            ))
            .map_err(StoreError::sql)?;
        let rows = stmt
            .query_map(params![status.as_str()], RawWorktree::read)
            .map_err(StoreError::sql)?;
        let mut worktrees = Vec::new();
        for row in rows {
            worktrees.push(row.map_err(StoreError::sql)?.decode()?);
        }
        Ok(worktrees)
    }

    pub fn worktree(&self, worktree_id: &WorktreeId) -> Result<Option<WorktreeRecord>, StoreError> {
        let connection = self.connect()?;
        let raw = connection
            .query_row(
                &format!("SELECT {WORKTREE_COLUMNS} FROM agent_worktrees WHERE id = ?1"),
                params![worktree_id.as_str()],
                RawWorktree::read,
            )
            .optional()
            .map_err(StoreError::sql)?;
        raw.map(RawWorktree::decode).transpose()
    }

    /// Live task/agent pairs whose references do not point at each other.
    pub fn assignment_inconsistencies(&self) -> Result<Vec<AssignmentInconsistency>, StoreError> {
        let tasks = self.tasks_with_statuses(TaskStatus::ALL)?;
        let agents = self.agents_with_status(AgentStatus::ALL)?;
        Ok(find_assignment_inconsistencies(&tasks, &agents))
    }

    /// Resets failed tasks to `queued` in one transaction and returns the ids
    /// actually reset. Rows that left `failed` in the meantime are skipped.
    pub fn reset_failed_tasks(&self, task_ids: &[TaskId]) -> Result<Vec<TaskId>, StoreError> {
        let mut connection = self.connect()?;
        let tx = connection.transaction().map_err(StoreError::sql)?;
        let mut reset = Vec::new();
        for task_id in task_ids {
            let changed = tx
                .execute(
                    "
                    UPDATE tasks SET
                        status = ?2,
                        failure_reason = NULL,
                        assigned_agent_id = NULL,
                        started_at = NULL,
                        completed_at = NULL
                    WHERE id = ?1 AND status = ?3
                    ",
                    params![
                        task_id.as_str(),
                        TaskStatus::Queued.as_str(),
                        TaskStatus::Failed.as_str()
                    ],
                )
                .map_err(StoreError::sql)?;
            if changed > 0 {
                reset.push(task_id.clone());
            }
        }
        tx.commit().map_err(StoreError::sql)?;
        Ok(reset)
    }

    /// Marks worktrees `cleaned` in one transaction; only rows still
    /// `active` change, so repeating the call is a no-op.
    pub fn mark_worktrees_cleaned(
        &self,
        worktree_ids: &[WorktreeId],
    ) -> Result<Vec<WorktreeId>, StoreError> {
        let mut connection = self.connect()?;
        let tx = connection.transaction().map_err(StoreError::sql)?;
        let mut marked = Vec::new();
        for worktree_id in worktree_ids {
            let changed = tx
                .execute(
                    "UPDATE agent_worktrees SET merge_status = ?2 \
                     WHERE id = ?1 AND merge_status = ?3",
                    params![
                        worktree_id.as_str(),
                        MergeStatus::Cleaned.as_str(),
                        MergeStatus::Active.as_str()
                    ],
                )
                .map_err(StoreError::sql)?;
            if changed > 0 {
                marked.push(worktree_id.clone());
            }
        }
        tx.commit().map_err(StoreError::sql)?;
        Ok(marked)
    }

    /// Returns `true` when the task was newly queued, `false` when it was
    /// already waiting in the admission queue.
    pub fn enqueue_task(&self, task_id: &TaskId) -> Result<bool, StoreError> {
        let connection = self.connect()?;
        let inserted = connection
            .execute(
                "INSERT INTO task_queue (task_id, enqueued_at) VALUES (?1, ?2) \
                 ON CONFLICT(task_id) DO NOTHING",
                params![task_id.as_str(), now_secs()],
            )
            .map_err(StoreError::sql)?;
        Ok(inserted > 0)
    }

    pub fn queued_task_ids(&self) -> Result<Vec<TaskId>, StoreError> {
        let connection = self.connect()?;
        let mut stmt = connection
            .prepare("SELECT task_id FROM task_queue ORDER BY enqueued_at ASC, rowid ASC")
            .map_err(StoreError::sql)?;
        let rows = stmt
            .query_map([], |row| row.get::<_, String>(0))
            .map_err(StoreError::sql)?;
        let mut ids = Vec::new();
        for row in rows {
            let raw = row.map_err(StoreError::sql)?;
            let id = TaskId::parse(&raw).map_err(|reason| StoreError::InvalidValue {
                column: "task_queue.task_id",
                value: raw.clone(),
                reason,
            })?;
            ids.push(id);
        }
        Ok(ids)
    }

    pub fn insert_workflow(&self, workflow: &WorkflowRecord) -> Result<(), StoreError> {
        self.connect()?
            .execute(
                "INSERT INTO workflows (id, name, status, created_at) VALUES (?1, ?2, ?3, ?4)",
                params![
                    workflow.id.as_str(),
                    workflow.name,
                    workflow.status.as_str(),
                    now_secs()
                ],
            )
            .map_err(StoreError::sql)?;
        Ok(())
    }

    pub fn insert_phase(&self, phase: &PhaseRecord) -> Result<(), StoreError> {
        self.connect()?
            .execute(
                "INSERT INTO phases (id, workflow_id, phase_order, name) VALUES (?1, ?2, ?3, ?4)",
                params![
                    phase.id.as_str(),
                    phase.workflow_id.as_str(),
                    phase.order,
                    phase.name
                ],
            )
            .map_err(StoreError::sql)?;
        Ok(())
    }

    pub fn insert_task(&self, task: &TaskRecord) -> Result<(), StoreError> {
        let blocked_by = encode_blocked_by(&task.blocked_by)?;
        self.connect()?
            .execute(
                "
                INSERT INTO tasks (
                    id, phase_id, status, description, assigned_agent_id,
                    failure_reason, blocked_by, started_at, completed_at
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
                ",
                params![
                    task.id.as_str(),
                    task.phase_id.as_str(),
                    task.status.as_str(),
                    task.description,
                    task.assigned_agent_id.as_ref().map(AgentId::as_str),
                    task.failure_reason,
                    blocked_by,
                    task.started_at,
                    task.completed_at,
                ],
            )
            .map_err(StoreError::sql)?;
        Ok(())
    }

    pub fn insert_agent(&self, agent: &AgentRecord) -> Result<(), StoreError> {
        self.connect()?
            .execute(
                "INSERT INTO agents (id, status, current_task_id) VALUES (?1, ?2, ?3)",
                params![
                    agent.id.as_str(),
                    agent.status.as_str(),
                    agent.current_task_id.as_ref().map(TaskId::as_str)
                ],
            )
            .map_err(StoreError::sql)?;
        Ok(())
    }

    pub fn insert_worktree(&self, worktree: &WorktreeRecord) -> Result<(), StoreError> {
        self.connect()?
            .execute(
                "
                INSERT INTO agent_worktrees (id, agent_id, worktree_path, branch_name, merge_status)
                VALUES (?1, ?2, ?3, ?4, ?5)
                ",
                params![
                    worktree.id.as_str(),
                    worktree.agent_id.as_str(),
                    worktree.worktree_path.display().to_string(),
                    worktree.branch_name,
                    worktree.merge_status.as_str()
                ],
            )
            .map_err(StoreError::sql)?;
        Ok(())
    }

    pub fn insert_workflow_result(&self, result: &WorkflowResultRecord) -> Result<(), StoreError> {
        self.connect()?
            .execute(
                "
                INSERT INTO workflow_results (id, workflow_id, status, summary, created_at)
                VALUES (?1, ?2, ?3, ?4, ?5)
                ",
                params![
                    result.id.as_str(),
                    result.workflow_id.as_str(),
                    result.status.as_str(),
                    result.summary,
                    now_secs()
                ],
            )
            .map_err(StoreError::sql)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn store() -> (tempfile::TempDir, SqliteStore) {
        let dir = tempdir().expect("tempdir");
        let store = SqliteStore::open(&dir.path().join("state/engine.db")).expect("open");
        store.ensure_schema().expect("schema");
        (dir, store)
    }

    fn task(id: &str, phase: &str, status: TaskStatus) -> TaskRecord {
        TaskRecord::new(
            TaskId::parse(id).expect("task id"),
            PhaseId::parse(phase).expect("phase id"),
            status,
        )
    }

    #[test]
    fn open_creates_parent_directories() {
        let (dir, store) = store();
        assert!(dir.path().join("state").is_dir());
        assert!(store.db_path().exists());
    }

    #[test]
    fn phase_counts_bucket_statuses() {
        let (_dir, store) = store();
        for (id, status) in [
            ("t-1", TaskStatus::Done),
            ("t-2", TaskStatus::Assigned),
            ("t-3", TaskStatus::InProgress),
            ("t-4", TaskStatus::Pending),
            ("t-5", TaskStatus::Failed),
            ("t-6", TaskStatus::Queued),
        ] {
            store.insert_task(&task(id, "p-1", status)).expect("insert");
        }

        let counts = store
            .phase_task_counts(&PhaseId::parse("p-1").expect("id"))
            .expect("counts");
        assert_eq!(counts, PhaseTaskCounts::new(6, 1, 2, 1));
    }

    #[test]
    fn first_workflow_with_status_skips_completed() {
        let (_dir, store) = store();
        store
            .insert_workflow(&WorkflowRecord {
                id: WorkflowId::parse("wf-old").expect("id"),
                name: "old".to_string(),
                status: WorkflowStatus::Completed,
            })
            .expect("insert");
        store
            .insert_workflow(&WorkflowRecord {
                id: WorkflowId::parse("wf-live").expect("id"),
                name: "live".to_string(),
                status: WorkflowStatus::Paused,
            })
            .expect("insert");

        let found = store
            .first_workflow_with_status(WorkflowStatus::SELECTABLE)
            .expect("query")
            .expect("workflow");
        assert_eq!(found.id.as_str(), "wf-live");
    }

    #[test]
    fn reset_only_touches_rows_still_failed() {
        let (_dir, store) = store();
        let mut failed = task("t-1", "p-1", TaskStatus::Failed);
        failed.failure_reason = Some("worktree missing".to_string());
        failed.assigned_agent_id = Some(AgentId::parse("a-1").expect("id"));
        failed.started_at = Some(10);
        failed.completed_at = Some(20);
        store.insert_task(&failed).expect("insert");
        store
            .insert_task(&task("t-2", "p-1", TaskStatus::Done))
            .expect("insert");

        let reset = store
            .reset_failed_tasks(&[failed.id.clone(), TaskId::parse("t-2").expect("id")])
            .expect("reset");
        assert_eq!(reset, vec![failed.id.clone()]);

        let after = store.task(&failed.id).expect("read").expect("task");
        assert_eq!(after.status, TaskStatus::Queued);
        assert_eq!(after.failure_reason, None);
        assert_eq!(after.assigned_agent_id, None);
        assert_eq!(after.started_at, None);
        assert_eq!(after.completed_at, None);

        let done = store
            .task(&TaskId::parse("t-2").expect("id"))
            .expect("read")
            .expect("task");
        assert_eq!(done.status, TaskStatus::Done);
    }

    #[test]
    fn enqueue_is_idempotent() {
        let (_dir, store) = store();
        let id = TaskId::parse("t-1").expect("id");
        assert!(store.enqueue_task(&id).expect("first"));
        assert!(!store.enqueue_task(&id).expect("second"));
        assert_eq!(store.queued_task_ids().expect("ids"), vec![id]);
    }

    #[test]
    fn invalid_status_in_database_is_reported() {
        let (_dir, store) = store();
        Connection::open(store.db_path())
            .expect("raw connection")
            .execute(
                "INSERT INTO agents (id, status, current_task_id) VALUES ('a-1', 'zombie', NULL)",
                [],
            )
            .expect("raw insert");

        let err = store
            .agent(&AgentId::parse("a-1").expect("id"))
            .expect_err("invalid status");
        assert!(err.to_string().contains("agents.status"));
    }
}
