mod id;
pub mod render;
pub mod reporter;

pub use id::generate_report_id;
pub use render::{
    render_blocked_tasks, render_completion, render_failed_tasks, render_report,
    render_stalled_agents, render_staleness,
};
pub use reporter::{
    compare_verdicts, Agreement, CompletionReport, ReconciliationReport, Reporter,
    SourceEvaluation, SourceOutcome, VerdictMismatch,
};
