use super::reporter::{Agreement, CompletionReport, ReconciliationReport, SourceOutcome};
use crate::completion::{CompletionReason, CompletionVerdict};
use crate::recovery::{
    AdmissionStatus, BlockedTaskView, FailedTaskReport, RestartStatus, StalledAgentReport,
    TerminationStatus,
};
use crate::shared::RunMode;
use crate::staleness::{BranchOutcome, StalenessReport};
use std::fmt::Write as _;

const BLOCKED_PREVIEW: usize = 10;

fn preview(text: Option<&str>, width: usize) -> String {
    let text = text.unwrap_or("N/A");
    if text.chars().count() <= width {
        return text.to_string();
    }
    let cut: String = text.chars().take(width).collect();
    format!("{cut}...")
}

fn render_verdict(out: &mut String, verdict: &CompletionVerdict) {
    let _ = writeln!(out, "  complete: {}", verdict.complete);
    let _ = writeln!(out, "  reason: {}", verdict.describe());
    if let CompletionReason::ValidatedResult {
        summary: Some(summary),
        ..
    } = &verdict.reason
    {
        let _ = writeln!(out, "  result summary: {summary}");
    }
    if let Some(id) = &verdict.workflow_id {
        let name = verdict.workflow_name.as_deref().unwrap_or("");
        let _ = writeln!(out, "  workflow: {id} {name}");
    }
    for phase in &verdict.phases {
        let label = phase
            .name
            .as_deref()
            .or(phase.phase_id.as_deref())
            .unwrap_or("phase");
        let _ = writeln!(
            out,
            "  phase {} {label}: {}/{} done, {} active, {} pending{}",
            phase.order.map(|o| o.to_string()).unwrap_or_default(),
            phase.counts.completed_tasks,
            phase.counts.total_tasks,
            phase.counts.active_tasks,
            phase.counts.pending_tasks,
            if phase.complete { " (complete)" } else { "" }
        );
    }
    let p = &verdict.progress;
    let _ = writeln!(
        out,
        "  progress: {}/{} tasks ({:.1}%), {} active, {} pending",
        p.completed_tasks, p.total_tasks, p.completion_percentage, p.active_tasks, p.pending_tasks
    );
}

pub fn render_completion(report: &CompletionReport) -> String {
    let mut out = String::new();
    for source in &report.sources {
        let _ = writeln!(out, "[{}]", source.source.as_str());
        match &source.outcome {
            SourceOutcome::Evaluated { verdict } => render_verdict(&mut out, verdict),
            SourceOutcome::Unavailable { error } => {
                let _ = writeln!(out, "  unavailable: {error}");
            }
        }
    }
    let agreement = match report.agreement {
        Agreement::SingleSource => "single source",
        Agreement::Agree => "sources agree",
        Agreement::Disagree => "SOURCES DISAGREE",
        Agreement::Incomplete => "incomplete (a source was unavailable)",
    };
    let _ = writeln!(out, "agreement: {agreement}");
    for mismatch in &report.mismatches {
        let _ = writeln!(
            out,
            "  {}: {}={} vs {}={}",
            mismatch.field,
            mismatch.left_source.as_str(),
            mismatch.left,
            mismatch.right_source.as_str(),
            mismatch.right
        );
    }
    out
}

pub fn render_staleness(report: &StalenessReport) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "scanned {} active worktree(s), {} stale",
        report.scanned,
        report.stale.len()
    );
    for item in &report.stale {
        let wt = &item.worktree;
        let _ = writeln!(out, "  worktree: {}", wt.worktree_path.display());
        let _ = writeln!(out, "    agent: {} ({})", wt.agent_id, item.agent_status.as_str());
        let _ = writeln!(out, "    branch: {}", wt.branch_name);
        let _ = writeln!(out, "    exists on disk: {}", item.exists_on_disk);
        let _ = writeln!(out, "    in worktree list: {}", item.in_version_control_listing);
    }
    match report.mode {
        RunMode::Report if !report.stale.is_empty() => {
            let _ = writeln!(out, "dry run: rerun with --execute to mark these cleaned");
        }
        RunMode::Report => {}
        RunMode::Execute => {
            let _ = writeln!(out, "marked {} worktree(s) cleaned", report.marked_cleaned.len());
            for action in &report.branch_actions {
                let status = match &action.outcome {
                    BranchOutcome::Deleted => "deleted".to_string(),
                    BranchOutcome::Absent => "already absent".to_string(),
                    BranchOutcome::Failed { error } => format!("failed: {error}"),
                };
                let _ = writeln!(out, "  branch {}: {status}", action.branch);
            }
        }
    }
    if !report.orphaned_assignments.is_empty() {
        let _ = writeln!(
            out,
            "{} orphaned assignment(s):",
            report.orphaned_assignments.len()
        );
        for item in &report.orphaned_assignments {
            let _ = writeln!(out, "  {}", item.describe());
        }
    }
    out
}

pub fn render_failed_tasks(report: &FailedTaskReport) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "{} failed task(s)", report.failed.len());
    for task in &report.failed {
        let _ = writeln!(
            out,
            "  task {}: {}",
            task.task_id.short(),
            preview(task.description.as_deref(), 60)
        );
        if let Some(reason) = &task.failure_reason {
            let _ = writeln!(out, "    failure: {}", preview(Some(reason), 80));
        }
    }
    if report.mode.is_execute() {
        let _ = writeln!(out, "reset {} task(s) to queued", report.reset.len());
        if !report.skipped.is_empty() {
            let _ = writeln!(
                out,
                "skipped {} task(s) no longer failed",
                report.skipped.len()
            );
        }
        for item in &report.admissions {
            let status = match &item.status {
                AdmissionStatus::Admitted => "enqueued".to_string(),
                AdmissionStatus::AlreadyQueued => "already queued".to_string(),
                AdmissionStatus::Failed { error } => format!("enqueue failed: {error}"),
            };
            let _ = writeln!(out, "  task {}: {status}", item.task_id.short());
        }
    } else if !report.failed.is_empty() {
        let _ = writeln!(out, "dry run: rerun with --execute to reset and re-queue");
    }

    if let Some(blocked) = &report.blocked {
        out.push_str(&render_blocked_tasks(blocked));
    }
    out
}

pub fn render_blocked_tasks(blocked: &[BlockedTaskView]) -> String {
    let mut out = format!("{} blocked task(s)\n", blocked.len());
    for task in blocked.iter().take(BLOCKED_PREVIEW) {
        let _ = writeln!(
            out,
            "  task {}: {}",
            task.task_id.short(),
            preview(task.description.as_deref(), 60)
        );
        if !task.blocked_by.is_empty() {
            let ids: Vec<&str> = task.blocked_by.iter().map(|id| id.as_str()).collect();
            let _ = writeln!(out, "    blocked by: {}", ids.join(", "));
        }
    }
    if blocked.len() > BLOCKED_PREVIEW {
        let _ = writeln!(out, "  ... and {} more", blocked.len() - BLOCKED_PREVIEW);
    }
    out
}

pub fn render_stalled_agents(report: &StalledAgentReport) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "{} stalled agent(s)", report.agents.len());
    for agent in &report.agents {
        let _ = writeln!(
            out,
            "  agent {}: {} (task: {})",
            agent.agent_id.short(),
            agent.status,
            preview(agent.task_description.as_deref(), 50)
        );
    }
    if !report.mode.is_execute() {
        if !report.agents.is_empty() {
            let _ = writeln!(out, "dry run: rerun with --execute to terminate and restart");
        }
        return out;
    }
    for item in &report.terminations {
        let status = match &item.status {
            TerminationStatus::Terminated => "terminated".to_string(),
            TerminationStatus::Failed { error } => format!("terminate failed: {error}"),
        };
        let _ = writeln!(out, "  agent {}: {status}", item.agent_id.short());
    }
    for item in &report.restarts {
        let status = match &item.status {
            RestartStatus::Accepted { new_agent_id } => format!(
                "restarted with agent {}",
                new_agent_id.as_deref().unwrap_or("unknown")
            ),
            RestartStatus::Rejected { reason } => format!("not ready to restart: {reason}"),
            RestartStatus::Failed { error } => format!("restart failed: {error}"),
        };
        let _ = writeln!(out, "  task {}: {status}", item.task_id.short());
    }
    let _ = writeln!(
        out,
        "restarts: {} accepted, {} rejected, {} failed",
        report.restarts_accepted(),
        report.restarts_rejected(),
        report.restarts_failed()
    );
    out
}

pub fn render_report(report: &ReconciliationReport) -> String {
    let mut out = format!(
        "report {} generated {}\n",
        report.report_id, report.generated_at
    );
    if let Some(completion) = &report.completion {
        out.push_str("\n== completion ==\n");
        out.push_str(&render_completion(completion));
    }
    if let Some(staleness) = &report.staleness {
        out.push_str("\n== worktrees ==\n");
        out.push_str(&render_staleness(staleness));
    }
    if let Some(failed) = &report.failed_tasks {
        out.push_str("\n== failed tasks ==\n");
        out.push_str(&render_failed_tasks(failed));
    }
    if let Some(stalled) = &report.stalled_agents {
        out.push_str("\n== stalled agents ==\n");
        out.push_str(&render_stalled_agents(stalled));
    }
    out
}
