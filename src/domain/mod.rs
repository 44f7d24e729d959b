pub mod integrity;
pub mod records;
pub mod status;

pub use integrity::{find_assignment_inconsistencies, AssignmentInconsistency};
pub use records::{
    AgentRecord, PhaseRecord, TaskRecord, WorkflowRecord, WorkflowResultRecord, WorktreeRecord,
};
pub use status::{
    AgentStatus, MergeStatus, ResultStatus, TaskBucket, TaskStatus, WorkflowStatus,
};
