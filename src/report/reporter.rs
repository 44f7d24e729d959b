use super::id::generate_report_id;
use crate::completion::{evaluate_workflow, CompletionReason, CompletionVerdict};
use crate::facts::{FactSource, SourceKind, WorkflowSelector};
use crate::recovery::{FailedTaskReport, StalledAgentReport};
use crate::shared::{now_rfc3339, now_secs, EngineError, EngineLog};
use crate::staleness::StalenessReport;
use serde::Serialize;
use serde_json::json;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum SourceOutcome {
    Evaluated { verdict: CompletionVerdict },
    Unavailable { error: String },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SourceEvaluation {
    pub source: SourceKind,
    #[serde(flatten)]
    pub outcome: SourceOutcome,
}

impl SourceEvaluation {
    pub fn verdict(&self) -> Option<&CompletionVerdict> {
        match &self.outcome {
            SourceOutcome::Evaluated { verdict } => Some(verdict),
            SourceOutcome::Unavailable { .. } => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Agreement {
    /// Only one source was requested.
    SingleSource,
    Agree,
    Disagree,
    /// At least one requested source could not be read.
    Incomplete,
}

/// A field on which two sources produced different verdicts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VerdictMismatch {
    pub field: &'static str,
    pub left_source: SourceKind,
    pub left: String,
    pub right_source: SourceKind,
    pub right: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CompletionReport {
    pub sources: Vec<SourceEvaluation>,
    pub agreement: Agreement,
    pub mismatches: Vec<VerdictMismatch>,
    /// Set when every evaluated source reached the same `complete` value.
    pub complete: Option<bool>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ReconciliationReport {
    pub report_id: String,
    pub generated_at: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completion: Option<CompletionReport>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub staleness: Option<StalenessReport>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failed_tasks: Option<FailedTaskReport>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stalled_agents: Option<StalledAgentReport>,
}

impl ReconciliationReport {
    pub fn new() -> Result<Self, EngineError> {
        Ok(Self {
            report_id: generate_report_id(now_secs()).map_err(EngineError::ReportId)?,
            generated_at: now_rfc3339(),
            completion: None,
            staleness: None,
            failed_tasks: None,
            stalled_agents: None,
        })
    }
}

fn reason_tag(reason: &CompletionReason) -> &'static str {
    match reason {
        CompletionReason::NoActiveWorkflow => "no_active_workflow",
        CompletionReason::MarkedCompleted => "marked_completed",
        CompletionReason::ValidatedResult { .. } => "validated_result",
        CompletionReason::AllPhasesComplete => "all_phases_complete",
        CompletionReason::InProgress => "in_progress",
    }
}

fn progress_text(verdict: &CompletionVerdict) -> String {
    let p = &verdict.progress;
    format!(
        "total={} completed={} active={} pending={}",
        p.total_tasks, p.completed_tasks, p.active_tasks, p.pending_tasks
    )
}

/// Field-by-field comparison of two verdicts.
pub fn compare_verdicts(
    left_source: SourceKind,
    left: &CompletionVerdict,
    right_source: SourceKind,
    right: &CompletionVerdict,
) -> Vec<VerdictMismatch> {
    let fields: [(&'static str, String, String); 3] = [
        ("complete", left.complete.to_string(), right.complete.to_string()),
        (
            "reason",
            reason_tag(&left.reason).to_string(),
            reason_tag(&right.reason).to_string(),
        ),
        ("progress", progress_text(left), progress_text(right)),
    ];
    fields
        .into_iter()
        .filter(|(_, l, r)| l != r)
        .map(|(field, left, right)| VerdictMismatch {
            field,
            left_source,
            left,
            right_source,
            right,
        })
        .collect()
}

/// Runs the completion evaluator once per fact source and compares the
/// verdicts. Disagreements are reported, never resolved.
pub struct Reporter<'a> {
    sources: Vec<&'a dyn FactSource>,
    log: &'a EngineLog,
}

impl<'a> Reporter<'a> {
    pub fn new(sources: Vec<&'a dyn FactSource>, log: &'a EngineLog) -> Self {
        Self { sources, log }
    }

    pub fn evaluate(&self, selector: &WorkflowSelector) -> Result<CompletionReport, EngineError> {
        if self.sources.is_empty() {
            return Err(EngineError::AllSourcesFailed(
                "no fact source requested".to_string(),
            ));
        }

        let mut sources = Vec::new();
        for source in &self.sources {
            let outcome = match source.load_snapshot(selector) {
                Ok(snapshot) => SourceOutcome::Evaluated {
                    verdict: evaluate_workflow(snapshot.as_ref()),
                },
                Err(err) => {
                    self.log.warn(
                        "completion.source_unavailable",
                        &[
                            ("source", json!(source.kind())),
                            ("error", json!(err.to_string())),
                        ],
                    );
                    SourceOutcome::Unavailable {
                        error: err.to_string(),
                    }
                }
            };
            sources.push(SourceEvaluation {
                source: source.kind(),
                outcome,
            });
        }

        let evaluated: Vec<(SourceKind, &CompletionVerdict)> = sources
            .iter()
            .filter_map(|item| item.verdict().map(|verdict| (item.source, verdict)))
            .collect();
        if evaluated.is_empty() {
            let errors = sources
                .iter()
                .filter_map(|item| match &item.outcome {
                    SourceOutcome::Unavailable { error } => {
                        Some(format!("{}: {error}", item.source.as_str()))
                    }
                    SourceOutcome::Evaluated { .. } => None,
                })
                .collect::<Vec<_>>()
                .join("; ");
            return Err(EngineError::AllSourcesFailed(errors));
        }

        let mut mismatches = Vec::new();
        for pair in evaluated.windows(2) {
            let (left_source, left) = pair[0];
            let (right_source, right) = pair[1];
            mismatches.extend(compare_verdicts(left_source, left, right_source, right));
        }

        let first_complete = evaluated[0].1.complete;
        let complete = evaluated
            .iter()
            .all(|(_, verdict)| verdict.complete == first_complete)
            .then_some(first_complete);

        let agreement = if evaluated.len() < sources.len() {
            Agreement::Incomplete
        } else if sources.len() == 1 {
            Agreement::SingleSource
        } else if mismatches.is_empty() {
            Agreement::Agree
        } else {
            Agreement::Disagree
        };

        self.log.info(
            "completion.evaluated",
            &[
                ("sources", json!(sources.len())),
                ("agreement", json!(agreement)),
                ("complete", json!(complete)),
            ],
        );

        Ok(CompletionReport {
            sources,
            agreement,
            mismatches,
            complete,
        })
    }
}
