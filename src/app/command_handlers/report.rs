use crate::app::command_support::{
    new_report, parse_options, to_json, CommandContext, SelectedSources,
};
use crate::control::{HttpControlPlane, SqliteQueueAdmission};
use crate::facts::WorkflowSelector;
use crate::recovery::{FailedTaskRecovery, StalledAgentRecovery};
use crate::report::{render_report, Reporter};
use crate::shared::RunMode;
use crate::staleness::{FilesystemProbe, GitCli, StalenessDetector};

/// Read-only report covering completion, staleness and recovery candidates.
pub fn cmd_report(args: &[String]) -> Result<String, String> {
    let options = parse_options(
        args,
        &["--config", "--workflow-id", "--method", "--json"],
    )?;
    let context = CommandContext::load(&options)?;
    let store = context.open_store()?;
    let repo = context
        .settings
        .require_repository()
        .map_err(|e| e.to_string())?;
    let settings = &context.settings;
    let max_fanout = settings.recovery.max_fanout;

    let mut report = new_report()?;
    context.log.info(
        "report.started",
        &[("report_id", serde_json::json!(report.report_id))],
    );

    let sources = SelectedSources::open(&context, options.method)?;
    let selector = WorkflowSelector::from_option(options.workflow_id.clone());
    report.completion = Some(
        Reporter::new(sources.as_sources(), &context.log)
            .evaluate(&selector)
            .map_err(|e| e.to_string())?,
    );

    let vcs = GitCli::new(repo);
    report.staleness = Some(
        StalenessDetector::new(&store, &FilesystemProbe, &vcs, &context.log)
            .run(RunMode::Report)
            .map_err(|e| e.to_string())?,
    );

    let admission = SqliteQueueAdmission::new(store.clone());
    report.failed_tasks = Some(
        FailedTaskRecovery::new(&store, &admission, &context.log, max_fanout)
            .run(RunMode::Report, true)
            .map_err(|e| e.to_string())?,
    );

    let control = HttpControlPlane::new(&settings.api.base_url, settings.control_timeout());
    report.stalled_agents = Some(
        StalledAgentRecovery::new(
            &store,
            &control,
            &context.log,
            max_fanout,
            settings.termination_grace(),
            settings.agents.restart_reason.clone(),
        )
        .run(RunMode::Report)
        .map_err(|e| e.to_string())?,
    );

    if options.json {
        return to_json(&report);
    }
    Ok(render_report(&report))
}
