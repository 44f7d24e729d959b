#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CliVerb {
    Status,
    Worktrees,
    Recover,
    Report,
    Help,
    Unknown,
}

pub fn parse_cli_verb(input: &str) -> CliVerb {
    match input {
        "status" => CliVerb::Status,
        "worktrees" => CliVerb::Worktrees,
        "recover" => CliVerb::Recover,
        "report" => CliVerb::Report,
        "help" | "--help" | "-h" => CliVerb::Help,
        _ => CliVerb::Unknown,
    }
}

pub fn cli_help_lines() -> Vec<String> {
    vec![
        "Commands:".to_string(),
        "  status [--workflow-id <id>] [--method api|db|both]   Check workflow completion"
            .to_string(),
        "  worktrees [--execute]                                Find stale worktree records"
            .to_string(),
        "  recover failed [--execute] [--check-blocked]         Reset and re-queue failed tasks"
            .to_string(),
        "  recover blocked                                      List blocked tasks".to_string(),
        "  recover agents [--execute]                           Restart stalled agents"
            .to_string(),
        "  report [--workflow-id <id>] [--method api|db|both]   Full read-only report"
            .to_string(),
        "  help                                                 Show this help".to_string(),
        String::new(),
        "Options:".to_string(),
        "  --config <path>    Settings file (default $PHASEKEEPER_CONFIG or ./phasekeeper.yaml)"
            .to_string(),
        "  --json             Print the report as JSON".to_string(),
        "  --execute          Apply changes; without it commands only report".to_string(),
    ]
}

pub fn help_text() -> String {
    cli_help_lines().join("\n")
}
