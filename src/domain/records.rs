use super::status::{AgentStatus, MergeStatus, ResultStatus, TaskStatus, WorkflowStatus};
use crate::shared::{AgentId, PhaseId, ResultId, TaskId, WorkflowId, WorktreeId};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkflowRecord {
    pub id: WorkflowId,
    pub name: String,
    pub status: WorkflowStatus,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PhaseRecord {
    pub id: PhaseId,
    pub workflow_id: WorkflowId,
    pub order: i64,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskRecord {
    pub id: TaskId,
    pub phase_id: PhaseId,
    pub status: TaskStatus,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub assigned_agent_id: Option<AgentId>,
    #[serde(default)]
    pub failure_reason: Option<String>,
    #[serde(default)]
    pub blocked_by: Vec<TaskId>,
    #[serde(default)]
    pub started_at: Option<i64>,
    #[serde(default)]
    pub completed_at: Option<i64>,
}

impl TaskRecord {
    pub fn new(id: TaskId, phase_id: PhaseId, status: TaskStatus) -> Self {
        Self {
            id,
            phase_id,
            status,
            description: None,
            assigned_agent_id: None,
            failure_reason: None,
            blocked_by: Vec::new(),
            started_at: None,
            completed_at: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentRecord {
    pub id: AgentId,
    pub status: AgentStatus,
    #[serde(default)]
    pub current_task_id: Option<TaskId>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorktreeRecord {
    pub id: WorktreeId,
    pub agent_id: AgentId,
    pub worktree_path: PathBuf,
    pub branch_name: String,
    pub merge_status: MergeStatus,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkflowResultRecord {
    pub id: ResultId,
    pub workflow_id: WorkflowId,
    pub status: ResultStatus,
    #[serde(default)]
    pub summary: Option<String>,
}
