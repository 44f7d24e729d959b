use crate::control::{ControlPlane, RestartOutcome};
use crate::domain::AgentStatus;
use crate::shared::{
    run_bounded, AgentId, EngineError, EngineLog, ExternalError, RunMode, TaskId,
};
use crate::store::SqliteStore;
use serde::Serialize;
use serde_json::json;
use std::thread;
use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StalledAgentView {
    pub agent_id: AgentId,
    pub status: AgentStatus,
    pub current_task_id: Option<TaskId>,
    pub task_description: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum TerminationStatus {
    Terminated,
    Failed { error: ExternalError },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TerminationResult {
    pub agent_id: AgentId,
    #[serde(flatten)]
    pub status: TerminationStatus,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum RestartStatus {
    Accepted { new_agent_id: Option<String> },
    Rejected { reason: String },
    Failed { error: ExternalError },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RestartResult {
    pub task_id: TaskId,
    #[serde(flatten)]
    pub status: RestartStatus,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StalledAgentReport {
    pub mode: RunMode,
    pub agents: Vec<StalledAgentView>,
    pub terminations: Vec<TerminationResult>,
    pub restarts: Vec<RestartResult>,
}

impl StalledAgentReport {
    pub fn restarts_accepted(&self) -> usize {
        self.count_restarts(|status| matches!(status, RestartStatus::Accepted { .. }))
    }

    pub fn restarts_rejected(&self) -> usize {
        self.count_restarts(|status| matches!(status, RestartStatus::Rejected { .. }))
    }

    pub fn restarts_failed(&self) -> usize {
        self.count_restarts(|status| matches!(status, RestartStatus::Failed { .. }))
    }

    fn count_restarts(&self, predicate: impl Fn(&RestartStatus) -> bool) -> usize {
        self.restarts
            .iter()
            .filter(|item| predicate(&item.status))
            .count()
    }
}

/// Terminates agents stuck in `working`, `running` or `stuck` and restarts
/// the tasks they held.
pub struct StalledAgentRecovery<'a> {
    store: &'a SqliteStore,
    control: &'a dyn ControlPlane,
    log: &'a EngineLog,
    max_fanout: usize,
    grace: Duration,
    reason: String,
}

impl<'a> StalledAgentRecovery<'a> {
    pub fn new(
        store: &'a SqliteStore,
        control: &'a dyn ControlPlane,
        log: &'a EngineLog,
        max_fanout: usize,
        grace: Duration,
        reason: impl Into<String>,
    ) -> Self {
        Self {
            store,
            control,
            log,
            max_fanout,
            grace,
            reason: reason.into(),
        }
    }

    pub fn run(&self, mode: RunMode) -> Result<StalledAgentReport, EngineError> {
        let mut agents = Vec::new();
        for agent in self.store.agents_with_status(AgentStatus::STALLED)? {
            let task_description = match &agent.current_task_id {
                Some(task_id) => self
                    .store
                    .task(task_id)?
                    .and_then(|task| task.description),
                None => None,
            };
            agents.push(StalledAgentView {
                agent_id: agent.id,
                status: agent.status,
                current_task_id: agent.current_task_id,
                task_description,
            });
        }
        self.log.info(
            "recovery.stalled_agents.selected",
            &[("mode", json!(mode)), ("agents", json!(agents.len()))],
        );

        let mut report = StalledAgentReport {
            mode,
            agents,
            terminations: Vec::new(),
            restarts: Vec::new(),
        };
        if !mode.is_execute() || report.agents.is_empty() {
            return Ok(report);
        }

        // Task ids are captured before termination rewrites agent state.
        let mut task_ids: Vec<TaskId> = Vec::new();
        for task_id in report.agents.iter().filter_map(|a| a.current_task_id.clone()) {
            if !task_ids.contains(&task_id) {
                task_ids.push(task_id);
            }
        }
        let agent_ids: Vec<AgentId> = report.agents.iter().map(|a| a.agent_id.clone()).collect();

        report.terminations = run_bounded(agent_ids, self.max_fanout, |agent_id| {
            self.terminate(agent_id)
        });

        if !self.grace.is_zero() {
            thread::sleep(self.grace);
        }

        report.restarts = run_bounded(task_ids, self.max_fanout, |task_id| self.restart(task_id));
        self.log.info(
            "recovery.stalled_agents.finished",
            &[
                ("accepted", json!(report.restarts_accepted())),
                ("rejected", json!(report.restarts_rejected())),
                ("failed", json!(report.restarts_failed())),
            ],
        );
        Ok(report)
    }

    fn terminate(&self, agent_id: AgentId) -> TerminationResult {
        let status = match self.control.terminate(&agent_id, &self.reason) {
            Ok(()) => TerminationStatus::Terminated,
            Err(error) => {
                self.log.warn(
                    "recovery.stalled_agents.terminate_failed",
                    &[
                        ("agent_id", json!(agent_id)),
                        ("error", json!(error.to_string())),
                    ],
                );
                TerminationStatus::Failed { error }
            }
        };
        TerminationResult { agent_id, status }
    }

    fn restart(&self, task_id: TaskId) -> RestartResult {
        let status = match self.control.restart_task(&task_id) {
            Ok(RestartOutcome::Accepted { new_agent_id }) => {
                RestartStatus::Accepted { new_agent_id }
            }
            Ok(RestartOutcome::Rejected { reason }) => {
                self.log.info(
                    "recovery.stalled_agents.restart_rejected",
                    &[("task_id", json!(task_id)), ("reason", json!(reason))],
                );
                RestartStatus::Rejected { reason }
            }
            Err(error) => {
                self.log.warn(
                    "recovery.stalled_agents.restart_failed",
                    &[
                        ("task_id", json!(task_id)),
                        ("retryable", json!(error.is_retryable())),
                        ("error", json!(error.to_string())),
                    ],
                );
                RestartStatus::Failed { error }
            }
        };
        RestartResult { task_id, status }
    }
}
