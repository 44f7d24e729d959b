pub mod counts;
pub mod evaluator;

pub use counts::{completion_percentage, phase_complete, PhaseTaskCounts};
pub use evaluator::{
    evaluate_workflow, CompletionReason, CompletionVerdict, PhaseEvaluation, ProgressSnapshot,
};
