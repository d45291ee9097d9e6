#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CliVerb {
    Validate,
    Dispatch,
    Help,
    Unknown,
}

pub fn parse_cli_verb(input: &str) -> CliVerb {
    match input {
        "validate" => CliVerb::Validate,
        "dispatch" => CliVerb::Dispatch,
        "help" | "--help" | "-h" => CliVerb::Help,
        _ => CliVerb::Unknown,
    }
}

pub fn cli_help_lines() -> Vec<String> {
    vec![
        "Commands:".to_string(),
        "  validate <outputs.jsonl> --config <file> [--context <file>] [--patch <file>]"
            .to_string(),
        "                                       Parse and validate agent output, print the report"
            .to_string(),
        "  dispatch <outputs.jsonl> --config <file> [--context <file>] [--patch <file>] [--staged]"
            .to_string(),
        "                                       Validate, then perform the accepted operations"
            .to_string(),
        "  help                                 Show this help".to_string(),
    ]
}

pub fn environment_help_lines() -> Vec<String> {
    vec![
        "Environment:".to_string(),
        "  GITHUB_TOKEN, GH_TOKEN               Token for GitHub API calls".to_string(),
        "  SAFE_OUTPUTS_GITHUB_API_URL          GitHub API base (default https://api.github.com)"
            .to_string(),
        "  GITHUB_EVENT_NAME, GITHUB_EVENT_PATH Event context when --context is not given"
            .to_string(),
        "  GITHUB_REPOSITORY, GITHUB_ACTOR, GITHUB_RUN_ID, GITHUB_SERVER_URL, GITHUB_WORKFLOW"
            .to_string(),
    ]
}

pub(crate) fn help_text() -> String {
    let mut lines = cli_help_lines();
    lines.push(String::new());
    lines.extend(environment_help_lines());
    lines.join("\n")
}
