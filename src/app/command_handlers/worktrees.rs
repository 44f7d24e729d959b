use crate::app::command_support::{new_report, parse_options, to_json, CommandContext};
use crate::report::render_staleness;
use crate::shared::RunMode;
use crate::staleness::{FilesystemProbe, GitCli, StalenessDetector};

pub fn cmd_worktrees(args: &[String]) -> Result<String, String> {
    let options = parse_options(args, &["--config", "--execute", "--json"])?;
    let context = CommandContext::load(&options)?;
    let store = context.open_store()?;
    let repo = context
        .settings
        .require_repository()
        .map_err(|e| e.to_string())?;
    let vcs = GitCli::new(repo);

    let staleness = StalenessDetector::new(&store, &FilesystemProbe, &vcs, &context.log)
        .run(RunMode::from_execute_flag(options.execute))
        .map_err(|e| e.to_string())?;

    if options.json {
        let mut report = new_report()?;
        report.staleness = Some(staleness);
        return to_json(&report);
    }
    Ok(render_staleness(&staleness))
}
