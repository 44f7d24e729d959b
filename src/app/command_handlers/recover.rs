use crate::app::command_support::{new_report, parse_options, to_json, CommandContext};
use crate::control::{HttpControlPlane, SqliteQueueAdmission};
use crate::recovery::{FailedTaskRecovery, StalledAgentRecovery};
use crate::report::{render_blocked_tasks, render_failed_tasks, render_stalled_agents};
use crate::shared::RunMode;

const USAGE: &str = "usage: recover failed|blocked|agents [--execute] [--json]";

pub fn cmd_recover(args: &[String]) -> Result<String, String> {
    let Some(target) = args.first() else {
        return Err(USAGE.to_string());
    };
    match target.as_str() {
        "failed" => recover_failed(&args[1..]),
        "blocked" => recover_blocked(&args[1..]),
        "agents" => recover_agents(&args[1..]),
        other => Err(format!("unknown recover target `{other}`\n{USAGE}")),
    }
}

fn recover_failed(args: &[String]) -> Result<String, String> {
    let options = parse_options(args, &["--config", "--execute", "--check-blocked", "--json"])?;
    let context = CommandContext::load(&options)?;
    let store = context.open_store()?;
    let mode = RunMode::from_execute_flag(options.execute);
    if mode.is_execute() {
        store.ensure_schema().map_err(|e| e.to_string())?;
    }
    let admission = SqliteQueueAdmission::new(store.clone());

    let failed = FailedTaskRecovery::new(
        &store,
        &admission,
        &context.log,
        context.settings.recovery.max_fanout,
    )
    .run(mode, options.check_blocked)
    .map_err(|e| e.to_string())?;

    if options.json {
        let mut report = new_report()?;
        report.failed_tasks = Some(failed);
        return to_json(&report);
    }
    Ok(render_failed_tasks(&failed))
}

fn recover_blocked(args: &[String]) -> Result<String, String> {
    let options = parse_options(args, &["--config", "--json"])?;
    let context = CommandContext::load(&options)?;
    let store = context.open_store()?;
    let admission = SqliteQueueAdmission::new(store.clone());
    let recovery = FailedTaskRecovery::new(
        &store,
        &admission,
        &context.log,
        context.settings.recovery.max_fanout,
    );
    let blocked = recovery.blocked_tasks().map_err(|e| e.to_string())?;
    if options.json {
        return serde_json::to_string_pretty(&blocked)
            .map_err(|e| format!("failed to encode blocked tasks: {e}"));
    }
    Ok(render_blocked_tasks(&blocked))
}

fn recover_agents(args: &[String]) -> Result<String, String> {
    let options = parse_options(args, &["--config", "--execute", "--json"])?;
    let context = CommandContext::load(&options)?;
    let store = context.open_store()?;
    let control = HttpControlPlane::new(
        &context.settings.api.base_url,
        context.settings.control_timeout(),
    );

    let stalled = StalledAgentRecovery::new(
        &store,
        &control,
        &context.log,
        context.settings.recovery.max_fanout,
        context.settings.termination_grace(),
        context.settings.agents.restart_reason.clone(),
    )
    .run(RunMode::from_execute_flag(options.execute))
    .map_err(|e| e.to_string())?;

    if options.json {
        let mut report = new_report()?;
        report.stalled_agents = Some(stalled);
        return to_json(&report);
    }
    Ok(render_stalled_agents(&stalled))
}
