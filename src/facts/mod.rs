//! Fact sources: two adapters producing the same workflow aggregate.
//!
//! The store adapter reads the persisted SQLite store, the remote adapter
//! asks the running service. Both hand a [`WorkflowSnapshot`] to the
//! completion evaluator, which never knows where the facts came from.

pub mod remote;
pub mod snapshot;
pub mod store_source;

use crate::shared::{ExternalError, WorkflowId};
use crate::store::StoreError;
use serde::{Deserialize, Serialize};

pub use remote::RemoteStatusClient;
pub use snapshot::{PhaseSnapshot, ValidatedResultSnapshot, WorkflowSnapshot};
pub use store_source::StoreFactSource;

#[derive(Debug, thiserror::Error)]
pub enum FactSourceError {
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error(transparent)]
    External(#[from] ExternalError),
    #[error("malformed workflow payload from {source_name}: {reason}")]
    Malformed { source_name: String, reason: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceKind {
    Api,
    Store,
}

impl SourceKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Api => "api",
            Self::Store => "store",
        }
    }
}

/// Which workflow to evaluate.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum WorkflowSelector {
    /// First workflow whose status is `active` or `paused`.
    #[default]
    Current,
    ById(WorkflowId),
}

impl WorkflowSelector {
    pub fn from_option(workflow_id: Option<WorkflowId>) -> Self {
        workflow_id.map(Self::ById).unwrap_or_default()
    }

    pub fn workflow_id(&self) -> Option<&WorkflowId> {
        match self {
            Self::Current => None,
            Self::ById(id) => Some(id),
        }
    }
}

pub trait FactSource: Sync {
    fn kind(&self) -> SourceKind;

    /// `Ok(None)` means no workflow matched the selector.
    fn load_snapshot(
        &self,
        selector: &WorkflowSelector,
    ) -> Result<Option<WorkflowSnapshot>, FactSourceError>;
}
