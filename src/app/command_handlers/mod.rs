use crate::app::cli::{help_text, parse_cli_verb, CliVerb};

pub mod recover;
pub mod report;
pub mod status;
pub mod worktrees;

pub fn run_cli(args: Vec<String>) -> Result<String, String> {
    if args.is_empty() {
        return Ok(help_text());
    }

    match parse_cli_verb(args[0].as_str()) {
        CliVerb::Status => status::cmd_status(&args[1..]),
        CliVerb::Worktrees => worktrees::cmd_worktrees(&args[1..]),
        CliVerb::Recover => recover::cmd_recover(&args[1..]),
        CliVerb::Report => report::cmd_report(&args[1..]),
        CliVerb::Help => Ok(help_text()),
        CliVerb::Unknown => Err(format!("unknown command `{}`\n{}", args[0], help_text())),
    }
}
