use std::path::{Path, PathBuf};
use std::sync::LazyLock;
use std::time::Duration;

use regex::Regex;

use crate::host_tools::{
    DEFAULT_COMMAND_TIMEOUT, HostCommandResult, HostCommandSpec, run_host_command,
};

const WP_CLI_CANDIDATES: [&str; 5] = [
    "/usr/local/bin/wp-cli.phar",
    "wp",
    "/usr/local/bin/wp",
    "/opt/homebrew/bin/wp",
    "/usr/local/homebrew/bin/wp",
];
const USER_WP_CLI: &str = ".wp-cli/bin/wp";
const DIAGNOSTIC_EXCERPT_CHARS: usize = 200;

// PHP writes runtime diagnostics to stdout with a zero exit status; wp-cli prefixes its own failures with `Error:`.
static RUNTIME_DIAGNOSTIC: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?im)^\s*(?:PHP\s+)?(?:<b>)?(?:Fatal error|Parse error|Warning|Notice|Error)(?:</b>)?:",
    )
    .expect("diagnostic pattern")
});
static WP_CLI_VERSION: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"WP-CLI\s+([0-9.]+)").expect("version pattern"));

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QueryOutcome {
    Success(String),
    Empty,
    Failure(String),
}

impl QueryOutcome {
    #[must_use]
    pub fn is_failure(&self) -> bool {
        matches!(self, Self::Failure(_))
    }

    #[must_use]
    pub fn value(&self) -> Option<&str> {
        match self {
            Self::Success(raw) => Some(raw.trim()).filter(|value| !value.is_empty()),
            _ => None,
        }
    }
}

pub trait ManagementTool {
    fn invoke(&self, cwd: &Path, args: &[&str]) -> HostCommandResult;

    fn query(&self, cwd: &Path, args: &[&str]) -> QueryOutcome {
        let outcome = classify_invocation(&self.invoke(cwd, args));
        if let QueryOutcome::Failure(reason) = &outcome {
            tracing::debug!(cwd = %cwd.display(), query = %args.join(" "), %reason, "management tool query failed");
        }
        outcome
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WpCli {
    path: PathBuf,
    timeout: Duration,
}

impl WpCli {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            timeout: DEFAULT_COMMAND_TIMEOUT,
        }
    }

    #[must_use]
    pub const fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    #[must_use]
    pub fn version(&self) -> Option<String> {
        let program = self.path.to_string_lossy();
        let spec = HostCommandSpec::new("wp_cli:version", &program, &["--version"])
            .with_timeout(self.timeout);
        match classify_invocation(&run_host_command(spec)) {
            QueryOutcome::Success(raw) => Some(parse_wp_cli_version(&raw)),
            _ => None,
        }
    }
}

impl ManagementTool for WpCli {
    fn invoke(&self, cwd: &Path, args: &[&str]) -> HostCommandResult {
        let program = self.path.to_string_lossy();
        run_host_command(
            HostCommandSpec::new("wp_cli:query", &program, args)
                .with_current_dir(cwd)
                .with_timeout(self.timeout),
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnavailableTool {
    reason: String,
}

impl UnavailableTool {
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}

impl ManagementTool for UnavailableTool {
    fn invoke(&self, _cwd: &Path, _args: &[&str]) -> HostCommandResult {
        HostCommandResult::SpawnError {
            error: self.reason.clone(),
        }
    }
}

#[must_use]
pub fn classify_invocation(result: &HostCommandResult) -> QueryOutcome {
    match result {
        HostCommandResult::Blocked { reason } => {
            QueryOutcome::Failure(format!("tool blocked: {reason}"))
        }
        HostCommandResult::SpawnError { error } => {
            QueryOutcome::Failure(format!("tool unavailable: {error}"))
        }
        HostCommandResult::TimedOut { timeout_ms } => {
            QueryOutcome::Failure(format!("tool timed out after {timeout_ms}ms"))
        }
        HostCommandResult::Completed {
            success,
            exit_code,
            stdout,
            ..
        } => {
            let combined = result.combined_output().unwrap_or_default();
            if !success {
                let code = exit_code.map_or_else(|| "signal".to_string(), |code| code.to_string());
                return QueryOutcome::Failure(format!(
                    "exit status {code}: {}",
                    excerpt(&combined)
                ));
            }
            if let Some(line) = find_runtime_diagnostic(&combined) {
                return QueryOutcome::Failure(format!("runtime diagnostic: {line}"));
            }
            if stdout.trim().is_empty() {
                QueryOutcome::Empty
            } else {
                QueryOutcome::Success(stdout.clone())
            }
        }
    }
}

#[must_use]
pub fn find_runtime_diagnostic(output: &str) -> Option<String> {
    let found = RUNTIME_DIAGNOSTIC.find(output)?;
    let line_start = output[..found.start()].rfind('\n').map_or(0, |idx| idx + 1);
    let line_end = output[found.start()..]
        .find('\n')
        .map_or(output.len(), |idx| found.start() + idx);
    Some(excerpt(&output[line_start..line_end]))
}

#[must_use]
pub fn parse_json_array(raw: &str) -> Vec<serde_json::Value> {
    match serde_json::from_str::<serde_json::Value>(raw.trim()) {
        Ok(serde_json::Value::Array(items)) => items,
        Ok(_) | Err(_) => Vec::new(),
    }
}

#[must_use]
pub fn parse_wp_cli_version(raw: &str) -> String {
    WP_CLI_VERSION
        .captures(raw)
        .and_then(|caps| caps.get(1))
        .map_or_else(|| "Unknown".to_string(), |m| m.as_str().to_string())
}

#[must_use]
pub fn locate_wp_cli(
    override_path: Option<&Path>,
    home: Option<&Path>,
    timeout: Duration,
) -> Option<PathBuf> {
    if let Some(path) = override_path {
        return Some(path.to_path_buf());
    }

    let mut candidates: Vec<PathBuf> = Vec::new();
    for candidate in WP_CLI_CANDIDATES {
        if candidate == "wp" {
            if let Ok(found) = which::which("wp") {
                candidates.push(found);
            }
        } else {
            candidates.push(PathBuf::from(candidate));
        }
    }
    if let Some(home) = home {
        candidates.push(home.join(USER_WP_CLI));
    }

    candidates
        .into_iter()
        .find(|candidate| is_valid_wp_cli(candidate, timeout))
}

fn is_valid_wp_cli(path: &Path, timeout: Duration) -> bool {
    if !path.is_file() {
        return false;
    }
    let program = path.to_string_lossy();
    let spec = HostCommandSpec::new("wp_cli:info", &program, &["--info"]).with_timeout(timeout);
    match classify_invocation(&run_host_command(spec)) {
        QueryOutcome::Success(raw) => raw.contains("WP-CLI"),
        _ => false,
    }
}

fn excerpt(raw: &str) -> String {
    let line = raw.trim();
    if line.chars().count() <= DIAGNOSTIC_EXCERPT_CHARS {
        return line.to_string();
    }
    let mut out: String = line.chars().take(DIAGNOSTIC_EXCERPT_CHARS).collect();
    out.push_str("...");
    out
}
