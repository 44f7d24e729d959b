use crate::shared::{ExternalError, TaskId};
use crate::store::SqliteStore;
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AdmissionOutcome {
    Admitted,
    AlreadyQueued,
}

/// Hands a reset task to the scheduler. Enqueueing the same task twice must
/// be harmless.
pub trait QueueAdmission: Sync {
    fn enqueue(&self, task_id: &TaskId) -> Result<AdmissionOutcome, ExternalError>;
}

/// Admission backed by the store's `task_queue` table.
#[derive(Debug, Clone)]
pub struct SqliteQueueAdmission {
    store: SqliteStore,
}

impl SqliteQueueAdmission {
    pub fn new(store: SqliteStore) -> Self {
        Self { store }
    }
}

impl QueueAdmission for SqliteQueueAdmission {
    fn enqueue(&self, task_id: &TaskId) -> Result<AdmissionOutcome, ExternalError> {
        match self.store.enqueue_task(task_id) {
            Ok(true) => Ok(AdmissionOutcome::Admitted),
            Ok(false) => Ok(AdmissionOutcome::AlreadyQueued),
            Err(err) if err.is_transient() => {
                Err(ExternalError::transient("enqueue", err.to_string()))
            }
            Err(err) => Err(ExternalError::rejected("enqueue", err.to_string())),
        }
    }
}
