use super::{
    FactSource, FactSourceError, PhaseSnapshot, SourceKind, ValidatedResultSnapshot,
    WorkflowSelector, WorkflowSnapshot,
};
use crate::domain::WorkflowStatus;
use crate::store::SqliteStore;

#[derive(Debug, Clone)]
pub struct StoreFactSource {
    store: SqliteStore,
}

impl StoreFactSource {
    pub fn new(store: SqliteStore) -> Self {
        Self { store }
    }
}

impl FactSource for StoreFactSource {
    fn kind(&self) -> SourceKind {
        SourceKind::Store
    }

    fn load_snapshot(
        &self,
        selector: &WorkflowSelector,
    ) -> Result<Option<WorkflowSnapshot>, FactSourceError> {
        let workflow = match selector {
            WorkflowSelector::ById(id) => self.store.workflow_by_id(id.as_str())?,
            WorkflowSelector::Current => self
                .store
                .first_workflow_with_status(WorkflowStatus::SELECTABLE)?,
        };
        let Some(workflow) = workflow else {
            return Ok(None);
        };

        let validated_result =
            self.store
                .validated_result(&workflow.id)?
                .map(|result| ValidatedResultSnapshot {
                    result_id: result.id.to_string(),
                    summary: result.summary,
                });

        let mut phases = Vec::new();
        for phase in self.store.phases_for_workflow(&workflow.id)? {
            let counts = self.store.phase_task_counts(&phase.id)?;
            phases.push(PhaseSnapshot {
                id: Some(phase.id.to_string()),
                order: Some(phase.order),
                name: Some(phase.name),
                counts,
            });
        }

        Ok(Some(WorkflowSnapshot {
            workflow_id: Some(workflow.id.to_string()),
            workflow_name: Some(workflow.name),
            status: workflow.status,
            validated_result,
            phases,
        }))
    }
}
