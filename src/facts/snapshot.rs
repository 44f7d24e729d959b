use crate::completion::PhaseTaskCounts;
use crate::domain::WorkflowStatus;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidatedResultSnapshot {
    pub result_id: String,
    #[serde(default)]
    pub summary: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PhaseSnapshot {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub order: Option<i64>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(flatten)]
    pub counts: PhaseTaskCounts,
}

/// Source-neutral view of one workflow, phases in `order`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkflowSnapshot {
    #[serde(default)]
    pub workflow_id: Option<String>,
    #[serde(default)]
    pub workflow_name: Option<String>,
    pub status: WorkflowStatus,
    #[serde(default)]
    pub validated_result: Option<ValidatedResultSnapshot>,
    #[serde(default)]
    pub phases: Vec<PhaseSnapshot>,
}

impl WorkflowSnapshot {
    pub fn new(status: WorkflowStatus) -> Self {
        Self {
            workflow_id: None,
            workflow_name: None,
            status,
            validated_result: None,
            phases: Vec::new(),
        }
    }

    pub fn with_phase(mut self, counts: PhaseTaskCounts) -> Self {
        let order = i64::try_from(self.phases.len()).unwrap_or(i64::MAX);
        self.phases.push(PhaseSnapshot {
            id: None,
            order: Some(order),
            name: None,
            counts,
        });
        self
    }
}
