use super::counts::{completion_percentage, PhaseTaskCounts};
use crate::domain::WorkflowStatus;
use crate::facts::WorkflowSnapshot;
use serde::{Deserialize, Serialize};

const SUMMARY_PREVIEW_CHARS: usize = 100;

/// Why a workflow was judged complete or not. Variants are listed in the
/// order they are checked; the first that applies wins.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum CompletionReason {
    NoActiveWorkflow,
    MarkedCompleted,
    ValidatedResult {
        result_id: String,
        summary: Option<String>,
    },
    AllPhasesComplete,
    InProgress,
}

impl CompletionReason {
    pub fn describe(&self) -> String {
        match self {
            Self::NoActiveWorkflow => "No active workflow found".to_string(),
            Self::MarkedCompleted => "Workflow marked as completed".to_string(),
            Self::ValidatedResult { result_id, .. } => {
                format!("Workflow has validated result {result_id}")
            }
            Self::AllPhasesComplete => "All phases complete (all tasks done)".to_string(),
            Self::InProgress => "Workflow still in progress".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PhaseEvaluation {
    #[serde(default)]
    pub phase_id: Option<String>,
    #[serde(default)]
    pub order: Option<i64>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(flatten)]
    pub counts: PhaseTaskCounts,
    pub complete: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct ProgressSnapshot {
    pub total_tasks: u64,
    pub completed_tasks: u64,
    pub active_tasks: u64,
    pub pending_tasks: u64,
    pub completion_percentage: f64,
}

impl ProgressSnapshot {
    pub fn from_counts(counts: PhaseTaskCounts) -> Self {
        Self {
            total_tasks: counts.total_tasks,
            completed_tasks: counts.completed_tasks,
            active_tasks: counts.active_tasks,
            pending_tasks: counts.pending_tasks,
            completion_percentage: completion_percentage(
                counts.completed_tasks,
                counts.total_tasks,
            ),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompletionVerdict {
    pub complete: bool,
    #[serde(flatten)]
    pub reason: CompletionReason,
    #[serde(default)]
    pub workflow_id: Option<String>,
    #[serde(default)]
    pub workflow_name: Option<String>,
    #[serde(default)]
    pub workflow_status: Option<WorkflowStatus>,
    #[serde(default)]
    pub phases: Vec<PhaseEvaluation>,
    pub progress: ProgressSnapshot,
}

impl CompletionVerdict {
    pub fn describe(&self) -> String {
        self.reason.describe()
    }
}

fn preview(summary: &str) -> String {
    summary.chars().take(SUMMARY_PREVIEW_CHARS).collect()
}

/// Derives the completion verdict for one snapshot. `None` is "no workflow
/// selected", which counts as complete.
pub fn evaluate_workflow(snapshot: Option<&WorkflowSnapshot>) -> CompletionVerdict {
    let Some(snapshot) = snapshot else {
        return CompletionVerdict {
            complete: true,
            reason: CompletionReason::NoActiveWorkflow,
            workflow_id: None,
            workflow_name: None,
            workflow_status: None,
            phases: Vec::new(),
            progress: ProgressSnapshot::default(),
        };
    };

    let mut totals = PhaseTaskCounts::default();
    let phases: Vec<PhaseEvaluation> = snapshot
        .phases
        .iter()
        .map(|phase| {
            totals.add(&phase.counts);
            PhaseEvaluation {
                phase_id: phase.id.clone(),
                order: phase.order,
                name: phase.name.clone(),
                counts: phase.counts,
                complete: phase.counts.is_complete(),
            }
        })
        .collect();

    let reason = if snapshot.status == WorkflowStatus::Completed {
        CompletionReason::MarkedCompleted
    } else if let Some(result) = &snapshot.validated_result {
        CompletionReason::ValidatedResult {
            result_id: result.result_id.clone(),
            summary: result.summary.as_deref().map(preview),
        }
    } else if !phases.is_empty() && phases.iter().all(|phase| phase.complete) {
        CompletionReason::AllPhasesComplete
    } else {
        CompletionReason::InProgress
    };

    CompletionVerdict {
        complete: reason != CompletionReason::InProgress,
        reason,
        workflow_id: snapshot.workflow_id.clone(),
        workflow_name: snapshot.workflow_name.clone(),
        workflow_status: Some(snapshot.status),
        phases,
        progress: ProgressSnapshot::from_counts(totals),
    }
}
