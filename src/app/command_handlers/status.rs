use crate::app::command_support::{
    new_report, parse_options, to_json, CommandContext, SelectedSources,
};
use crate::facts::WorkflowSelector;
use crate::report::{render_completion, Reporter};

pub fn cmd_status(args: &[String]) -> Result<String, String> {
    let options = parse_options(
        args,
        &["--config", "--workflow-id", "--method", "--json"],
    )?;
    let context = CommandContext::load(&options)?;
    let sources = SelectedSources::open(&context, options.method)?;
    let selector = WorkflowSelector::from_option(options.workflow_id.clone());

    let completion = Reporter::new(sources.as_sources(), &context.log)
        .evaluate(&selector)
        .map_err(|e| e.to_string())?;

    if options.json {
        let mut report = new_report()?;
        report.completion = Some(completion);
        return to_json(&report);
    }
    Ok(render_completion(&completion))
}
