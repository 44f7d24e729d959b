//! Recovery flows. Both select from the store, apply store mutations in one
//! transaction, then fan out per-item external calls whose failures are
//! itemized in the report instead of aborting the batch.

pub mod failed_tasks;
pub mod stalled_agents;

pub use failed_tasks::{
    AdmissionResult, AdmissionStatus, BlockedTaskView, FailedTaskRecovery, FailedTaskReport,
    FailedTaskView,
};
pub use stalled_agents::{
    RestartResult, RestartStatus, StalledAgentRecovery, StalledAgentReport, StalledAgentView,
    TerminationResult, TerminationStatus,
};
