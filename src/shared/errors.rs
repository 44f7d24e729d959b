use crate::config::ConfigError;
use crate::facts::FactSourceError;
use crate::staleness::VcsError;
use crate::store::StoreError;
use serde::Serialize;

/// Failure of a single call to an external collaborator (control plane,
/// queue admission, remote endpoint).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, thiserror::Error)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ExternalError {
    #[error("{operation} failed transiently: {reason}")]
    Transient { operation: String, reason: String },
    #[error("{operation} rejected: {reason}")]
    Rejected { operation: String, reason: String },
}

impl ExternalError {
    pub fn transient(operation: &str, reason: impl Into<String>) -> Self {
        Self::Transient {
            operation: operation.to_string(),
            reason: reason.into(),
        }
    }

    pub fn rejected(operation: &str, reason: impl Into<String>) -> Self {
        Self::Rejected {
            operation: operation.to_string(),
            reason: reason.into(),
        }
    }

    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Transient { .. })
    }
}

/// Batch-level failure: the report was not produced or a transaction did not
/// commit. Per-item failures never surface here.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error(transparent)]
    Vcs(#[from] VcsError),
    #[error("no fact source could be read: {0}")]
    AllSourcesFailed(String),
    #[error(transparent)]
    FactSource(#[from] FactSourceError),
    #[error("failed to generate report id: {0}")]
    ReportId(String),
}
