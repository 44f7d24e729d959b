pub mod errors;
pub mod fanout;
pub mod ids;
pub mod logging;
pub mod mode;
pub mod time;

pub use errors::{EngineError, ExternalError};
pub use fanout::{run_bounded, DEFAULT_MAX_FANOUT};
pub use ids::{AgentId, PhaseId, ResultId, TaskId, WorkflowId, WorktreeId};
pub use logging::{EngineLog, LogLevel};
pub use mode::RunMode;
pub use time::{now_rfc3339, now_secs};
