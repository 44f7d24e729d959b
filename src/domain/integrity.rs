use super::records::{AgentRecord, TaskRecord};
use crate::shared::{AgentId, TaskId};
use serde::Serialize;
use std::collections::BTreeMap;

/// Broken task/agent cross-reference. Reported, never repaired.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum AssignmentInconsistency {
    TaskAgentMissing {
        task_id: TaskId,
        agent_id: AgentId,
    },
    TaskAgentMismatch {
        task_id: TaskId,
        agent_id: AgentId,
        agent_current_task_id: Option<TaskId>,
    },
    AgentTaskMissing {
        agent_id: AgentId,
        task_id: TaskId,
    },
    AgentTaskMismatch {
        agent_id: AgentId,
        task_id: TaskId,
        task_assigned_agent_id: Option<AgentId>,
    },
}

impl AssignmentInconsistency {
    pub fn describe(&self) -> String {
        match self {
            Self::TaskAgentMissing { task_id, agent_id } => {
                format!("task {task_id} is assigned to unknown agent {agent_id}")
            }
            Self::TaskAgentMismatch {
                task_id,
                agent_id,
                agent_current_task_id,
            } => format!(
                "task {task_id} is assigned to agent {agent_id}, which is on {}",
                agent_current_task_id
                    .as_ref()
                    .map(TaskId::as_str)
                    .unwrap_or("no task")
            ),
            Self::AgentTaskMissing { agent_id, task_id } => {
                format!("agent {agent_id} points at unknown task {task_id}")
            }
            Self::AgentTaskMismatch {
                agent_id,
                task_id,
                task_assigned_agent_id,
            } => format!(
                "agent {agent_id} works on task {task_id}, which is assigned to {}",
                task_assigned_agent_id
                    .as_ref()
                    .map(AgentId::as_str)
                    .unwrap_or("nobody")
            ),
        }
    }
}

/// Checks live records only: tasks `assigned`/`in_progress` and agents
/// `working`/`running`/`stuck`. `all_tasks` and `all_agents` resolve the
/// other side of each reference and may contain finished records.
pub fn find_assignment_inconsistencies(
    all_tasks: &[TaskRecord],
    all_agents: &[AgentRecord],
) -> Vec<AssignmentInconsistency> {
    let tasks: BTreeMap<&str, &TaskRecord> =
        all_tasks.iter().map(|t| (t.id.as_str(), t)).collect();
    let agents: BTreeMap<&str, &AgentRecord> =
        all_agents.iter().map(|a| (a.id.as_str(), a)).collect();
    let mut found = Vec::new();

    for task in all_tasks.iter().filter(|t| t.status.is_live()) {
        let Some(agent_id) = &task.assigned_agent_id else {
            continue;
        };
        match agents.get(agent_id.as_str()) {
            None => found.push(AssignmentInconsistency::TaskAgentMissing {
                task_id: task.id.clone(),
                agent_id: agent_id.clone(),
            }),
            Some(agent) if agent.current_task_id.as_ref() != Some(&task.id) => {
                found.push(AssignmentInconsistency::TaskAgentMismatch {
                    task_id: task.id.clone(),
                    agent_id: agent_id.clone(),
                    agent_current_task_id: agent.current_task_id.clone(),
                })
            }
            Some(_) => {}
        }
    }

    for agent in all_agents.iter().filter(|a| a.status.is_live()) {
        let Some(task_id) = &agent.current_task_id else {
            continue;
        };
        match tasks.get(task_id.as_str()) {
            None => found.push(AssignmentInconsistency::AgentTaskMissing {
                agent_id: agent.id.clone(),
                task_id: task_id.clone(),
            }),
            Some(task) if task.assigned_agent_id.as_ref() != Some(&agent.id) => {
                found.push(AssignmentInconsistency::AgentTaskMismatch {
                    agent_id: agent.id.clone(),
                    task_id: task_id.clone(),
                    task_assigned_agent_id: task.assigned_agent_id.clone(),
                })
            }
            Some(_) => {}
        }
    }

    found
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{AgentStatus, TaskStatus};
    use crate::shared::PhaseId;

    fn task(id: &str, status: TaskStatus, agent: Option<&str>) -> TaskRecord {
        let mut record = TaskRecord::new(
            TaskId::parse(id).expect("id"),
            PhaseId::parse("p-1").expect("id"),
            status,
        );
        record.assigned_agent_id = agent.map(|a| AgentId::parse(a).expect("id"));
        record
    }

    fn agent(id: &str, status: AgentStatus, task: Option<&str>) -> AgentRecord {
        AgentRecord {
            id: AgentId::parse(id).expect("id"),
            status,
            current_task_id: task.map(|t| TaskId::parse(t).expect("id")),
        }
    }

    #[test]
    fn consistent_pair_reports_nothing() {
        let tasks = vec![task("t-1", TaskStatus::InProgress, Some("a-1"))];
        let agents = vec![agent("a-1", AgentStatus::Working, Some("t-1"))];
        assert!(find_assignment_inconsistencies(&tasks, &agents).is_empty());
    }

    #[test]
    fn finished_records_keep_history_without_complaint() {
        let tasks = vec![task("t-1", TaskStatus::Done, Some("a-1"))];
        let agents = vec![agent("a-1", AgentStatus::Idle, Some("t-0"))];
        assert!(find_assignment_inconsistencies(&tasks, &agents).is_empty());
    }

    #[test]
    fn both_directions_are_checked() {
        let tasks = vec![
            task("t-1", TaskStatus::Assigned, Some("a-9")),
            task("t-2", TaskStatus::InProgress, Some("a-1")),
        ];
        let agents = vec![
            agent("a-1", AgentStatus::Running, Some("t-3")),
            agent("a-2", AgentStatus::Stuck, Some("t-2")),
        ];
        let found = find_assignment_inconsistencies(&tasks, &agents);
        assert_eq!(found.len(), 4);
        assert!(matches!(
            found[0],
            AssignmentInconsistency::TaskAgentMissing { .. }
        ));
        assert!(matches!(
            found[1],
            AssignmentInconsistency::TaskAgentMismatch { .. }
        ));
        assert!(matches!(
            found[2],
            AssignmentInconsistency::AgentTaskMissing { .. }
        ));
        assert!(matches!(
            found[3],
            AssignmentInconsistency::AgentTaskMismatch { .. }
        ));
        assert!(found[3].describe().contains("assigned to a-1"));
    }
}
