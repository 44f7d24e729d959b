use super::StoreError;
use crate::domain::{
    AgentRecord, AgentStatus, MergeStatus, PhaseRecord, ResultStatus, TaskRecord, TaskStatus,
    WorkflowRecord, WorkflowResultRecord, WorkflowStatus, WorktreeRecord,
};
use crate::shared::{AgentId, PhaseId, ResultId, TaskId, WorkflowId, WorktreeId};
use rusqlite::Row;
use std::path::PathBuf;

pub(super) const WORKFLOW_COLUMNS: &str = "id, name, status";
pub(super) const PHASE_COLUMNS: &str = "id, workflow_id, phase_order, name";
pub(super) const TASK_COLUMNS: &str = "id, phase_id, status, description, assigned_agent_id, \
     failure_reason, blocked_by, started_at, completed_at";
pub(super) const AGENT_COLUMNS: &str = "id, status, current_task_id";
pub(super) const WORKTREE_COLUMNS: &str =
    "id, agent_id, worktree_path, branch_name, merge_status";
pub(super) const RESULT_COLUMNS: &str = "id, workflow_id, status, summary";

fn decode<T>(
    column: &'static str,
    raw: &str,
    parse: impl FnOnce(&str) -> Result<T, String>,
) -> Result<T, StoreError> {
    parse(raw).map_err(|reason| StoreError::InvalidValue {
        column,
        value: raw.to_string(),
        reason,
    })
}

fn decode_opt<T>(
    column: &'static str,
    raw: Option<String>,
    parse: impl FnOnce(&str) -> Result<T, String>,
) -> Result<Option<T>, StoreError> {
    match raw.as_deref().map(str::trim).filter(|v| !v.is_empty()) {
        Some(value) => decode(column, value, parse).map(Some),
        None => Ok(None),
    }
}

pub(super) struct RawWorkflow {
    id: String,
    name: String,
    status: String,
}

impl RawWorkflow {
    pub(super) fn read(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            name: row.get(1)?,
            status: row.get(2)?,
        })
    }

    pub(super) fn decode(self) -> Result<WorkflowRecord, StoreError> {
        Ok(WorkflowRecord {
            id: decode("workflows.id", &self.id, WorkflowId::parse)?,
            name: self.name,
            status: decode("workflows.status", &self.status, WorkflowStatus::parse)?,
        })
    }
}

pub(super) struct RawPhase {
    id: String,
    workflow_id: String,
    order: i64,
    name: String,
}

impl RawPhase {
    pub(super) fn read(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            workflow_id: row.get(1)?,
            order: row.get(2)?,
            name: row.get(3)?,
        })
    }

    pub(super) fn decode(self) -> Result<PhaseRecord, StoreError> {
        Ok(PhaseRecord {
            id: decode("phases.id", &self.id, PhaseId::parse)?,
            workflow_id: decode("phases.workflow_id", &self.workflow_id, WorkflowId::parse)?,
            order: self.order,
            name: self.name,
        })
    }
}

pub(super) struct RawTask {
    id: String,
    phase_id: String,
    status: String,
    description: Option<String>,
    assigned_agent_id: Option<String>,
    failure_reason: Option<String>,
    blocked_by: Option<String>,
    started_at: Option<i64>,
    completed_at: Option<i64>,
}

impl RawTask {
    pub(super) fn read(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            phase_id: row.get(1)?,
            status: row.get(2)?,
            description: row.get(3)?,
            assigned_agent_id: row.get(4)?,
            failure_reason: row.get(5)?,
            blocked_by: row.get(6)?,
            started_at: row.get(7)?,
            completed_at: row.get(8)?,
        })
    }

    pub(super) fn decode(self) -> Result<TaskRecord, StoreError> {
        let blocked_by = match self.blocked_by.as_deref().map(str::trim) {
            None | Some("") => Vec::new(),
            Some(raw) => decode("tasks.blocked_by", raw, decode_blocked_by)?,
        };
        Ok(TaskRecord {
            id: decode("tasks.id", &self.id, TaskId::parse)?,
            phase_id: decode("tasks.phase_id", &self.phase_id, PhaseId::parse)?,
            status: decode("tasks.status", &self.status, TaskStatus::parse)?,
            description: self.description,
            assigned_agent_id: decode_opt(
                "tasks.assigned_agent_id",
                self.assigned_agent_id,
                AgentId::parse,
            )?,
            failure_reason: self.failure_reason,
            blocked_by,
            started_at: self.started_at,
            completed_at: self.completed_at,
        })
    }
}

/// `blocked_by` holds a JSON array of task ids; a bare id is accepted too.
fn decode_blocked_by(raw: &str) -> Result<Vec<TaskId>, String> {
    if raw.starts_with('[') {
        let ids: Vec<String> = serde_json::from_str(raw).map_err(|e| e.to_string())?;
        return ids.iter().map(|id| TaskId::parse(id)).collect();
    }
    Ok(vec![TaskId::parse(raw)?])
}

pub(super) fn encode_blocked_by(ids: &[TaskId]) -> Result<Option<String>, StoreError> {
    if ids.is_empty() {
        return Ok(None);
    }
    serde_json::to_string(ids)
        .map(Some)
        .map_err(|source| StoreError::Encode {
            column: "tasks.blocked_by",
            source,
        })
}

pub(super) struct RawAgent {
    id: String,
    status: String,
    current_task_id: Option<String>,
}

impl RawAgent {
    pub(super) fn read(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            status: row.get(1)?,
            current_task_id: row.get(2)?,
        })
    }

    pub(super) fn decode(self) -> Result<AgentRecord, StoreError> {
        Ok(AgentRecord {
            id: decode("agents.id", &self.id, AgentId::parse)?,
            status: decode("agents.status", &self.status, AgentStatus::parse)?,
            current_task_id: decode_opt(
                "agents.current_task_id",
                self.current_task_id,
                TaskId::parse,
            )?,
        })
    }
}

pub(super) struct RawWorktree {
    id: String,
    agent_id: String,
    worktree_path: String,
    branch_name: String,
    merge_status: String,
}

impl RawWorktree {
    pub(super) fn read(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            agent_id: row.get(1)?,
            worktree_path: row.get(2)?,
            branch_name: row.get(3)?,
            merge_status: row.get(4)?,
        })
    }

    pub(super) fn decode(self) -> Result<WorktreeRecord, StoreError> {
        Ok(WorktreeRecord {
            id: decode("agent_worktrees.id", &self.id, WorktreeId::parse)?,
            agent_id: decode("agent_worktrees.agent_id", &self.agent_id, AgentId::parse)?,
            worktree_path: PathBuf::from(self.worktree_path),
            branch_name: self.branch_name,
            merge_status: decode(
                "agent_worktrees.merge_status",
                &self.merge_status,
                MergeStatus::parse,
            )?,
        })
    }
}

pub(super) struct RawResult {
    id: String,
    workflow_id: String,
    status: String,
    summary: Option<String>,
}

impl RawResult {
    pub(super) fn read(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            workflow_id: row.get(1)?,
            status: row.get(2)?,
            summary: row.get(3)?,
        })
    }

    pub(super) fn decode(self) -> Result<WorkflowResultRecord, StoreError> {
        Ok(WorkflowResultRecord {
            id: decode("workflow_results.id", &self.id, ResultId::parse)?,
            workflow_id: decode(
                "workflow_results.workflow_id",
                &self.workflow_id,
                WorkflowId::parse,
            )?,
            status: decode("workflow_results.status", &self.status, ResultStatus::parse)?,
            summary: self.summary,
        })
    }
}
