#[cfg(feature = "host-tools")]
use std::io::Read;
use std::path::Path;
#[cfg(feature = "host-tools")]
use std::process::{Child, Command, Stdio};
#[cfg(feature = "host-tools")]
use std::thread::JoinHandle;
use std::time::Duration;
#[cfg(feature = "host-tools")]
use std::time::Instant;

#[cfg(feature = "host-tools")]
use wait_timeout::ChildExt;

pub const OHANAMI_HOST_TOOLS_ENV: &str = "OHANAMI_HOST_TOOLS";
pub const DEFAULT_COMMAND_TIMEOUT: Duration = Duration::from_secs(30);
#[cfg(feature = "host-tools")]
const READER_GRACE: Duration = Duration::from_millis(250);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HostToolsMode {
    Enabled,
    Disabled,
}

impl HostToolsMode {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Enabled => "enabled",
            Self::Disabled => "disabled",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HostToolsPolicySource {
    Environment,
    Default,
}

impl HostToolsPolicySource {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Environment => "env",
            Self::Default => "default",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HostToolsPolicy {
    pub mode: HostToolsMode,
    pub source: HostToolsPolicySource,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HostCommandSpec<'a> {
    pub operation: &'a str,
    pub program: &'a str,
    pub args: &'a [&'a str],
    pub current_dir: Option<&'a Path>,
    pub timeout: Duration,
}

impl<'a> HostCommandSpec<'a> {
    #[must_use]
    pub const fn new(operation: &'a str, program: &'a str, args: &'a [&'a str]) -> Self {
        Self {
            operation,
            program,
            args,
            current_dir: None,
            timeout: DEFAULT_COMMAND_TIMEOUT,
        }
    }

    #[must_use]
    pub const fn with_current_dir(mut self, current_dir: &'a Path) -> Self {
        self.current_dir = Some(current_dir);
        self
    }

    #[must_use]
    pub const fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HostCommandResult {
    Blocked {
        reason: String,
    },
    SpawnError {
        error: String,
    },
    TimedOut {
        timeout_ms: u128,
    },
    Completed {
        success: bool,
        exit_code: Option<i32>,
        stdout: String,
        stderr: String,
    },
}

impl HostCommandResult {
    #[must_use]
    pub fn completed(exit_code: i32, stdout: impl Into<String>) -> Self {
        Self::Completed {
            success: exit_code == 0,
            exit_code: Some(exit_code),
            stdout: stdout.into(),
            stderr: String::new(),
        }
    }

    #[must_use]
    pub fn combined_output(&self) -> Option<String> {
        match self {
            Self::Completed { stdout, stderr, .. } => {
                if stderr.trim().is_empty() {
                    Some(stdout.clone())
                } else if stdout.trim().is_empty() {
                    Some(stderr.clone())
                } else {
                    Some(format!("{stdout}\n{stderr}"))
                }
            }
            _ => None,
        }
    }
}

#[must_use]
pub fn resolve_host_tools_policy() -> HostToolsPolicy {
    let env_raw = std::env::var(OHANAMI_HOST_TOOLS_ENV).ok();
    resolve_host_tools_policy_with(env_raw.as_deref())
}

#[must_use]
pub fn run_host_command(spec: HostCommandSpec<'_>) -> HostCommandResult {
    run_host_command_with_policy(spec, resolve_host_tools_policy())
}

#[must_use]
pub fn run_host_command_with_policy(
    spec: HostCommandSpec<'_>,
    policy: HostToolsPolicy,
) -> HostCommandResult {
    if policy.mode == HostToolsMode::Disabled {
        return HostCommandResult::Blocked {
            reason: format_host_tools_block_reason(spec.operation, policy),
        };
    }

    #[cfg(feature = "host-tools")]
    {
        let mut command = Command::new(spec.program);
        command
            .args(spec.args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        if let Some(current_dir) = spec.current_dir {
            command.current_dir(current_dir);
        }
        #[cfg(unix)]
        {
            use std::os::unix::process::CommandExt;
            // Own process group, so a timeout also reaches helpers that inherited the pipes.
            command.process_group(0);
        }

        let mut child = match command.spawn() {
            Ok(child) => child,
            Err(err) => {
                return HostCommandResult::SpawnError {
                    error: err.to_string(),
                };
            }
        };

        // Drain both pipes while waiting so large JSON listings cannot fill the pipe buffer.
        let stdout_reader = spawn_pipe_reader(child.stdout.take());
        let stderr_reader = spawn_pipe_reader(child.stderr.take());

        let status = match child.wait_timeout(spec.timeout) {
            Ok(Some(status)) => status,
            Ok(None) => {
                kill_process_group(&mut child);
                let detached = reap_pipe_readers(vec![stdout_reader, stderr_reader], READER_GRACE);
                if detached > 0 {
                    tracing::debug!(
                        operation = spec.operation,
                        detached,
                        "pipe readers still blocked after kill; detaching"
                    );
                }
                tracing::warn!(
                    operation = spec.operation,
                    program = spec.program,
                    timeout_ms = spec.timeout.as_millis(),
                    "host command timed out"
                );
                return HostCommandResult::TimedOut {
                    timeout_ms: spec.timeout.as_millis(),
                };
            }
            Err(err) => {
                kill_process_group(&mut child);
                return HostCommandResult::SpawnError {
                    error: err.to_string(),
                };
            }
        };

        let stdout = join_pipe_reader(stdout_reader);
        let stderr = join_pipe_reader(stderr_reader);

        HostCommandResult::Completed {
            success: status.success(),
            exit_code: status.code(),
            stdout,
            stderr,
        }
    }

    #[cfg(not(feature = "host-tools"))]
    {
        let _ = policy;
        HostCommandResult::Blocked {
            reason: format_host_tools_feature_disabled_reason(spec.operation),
        }
    }
}

#[cfg(feature = "host-tools")]
fn spawn_pipe_reader<R: Read + Send + 'static>(pipe: Option<R>) -> Option<JoinHandle<Vec<u8>>> {
    pipe.map(|mut pipe| {
        std::thread::spawn(move || {
            let mut buf = Vec::new();
            let _ = pipe.read_to_end(&mut buf);
            buf
        })
    })
}

#[cfg(feature = "host-tools")]
fn kill_process_group(child: &mut Child) {
    #[cfg(unix)]
    if let Ok(pgid) = i32::try_from(child.id()) {
        // SAFETY: the child leads its own process group, so `-pgid` only addresses it and its helpers.
        unsafe {
            libc::kill(-pgid, libc::SIGKILL);
        }
    }
    let _ = child.kill();
    let _ = child.wait();
}

/// Waits up to `grace` for the pipe readers to finish and returns how many
/// were still blocked and had to be detached.
#[cfg(feature = "host-tools")]
fn reap_pipe_readers(readers: Vec<Option<JoinHandle<Vec<u8>>>>, grace: Duration) -> usize {
    let deadline = Instant::now() + grace;
    let mut pending: Vec<_> = readers.into_iter().flatten().collect();
    loop {
        let (finished, running): (Vec<_>, Vec<_>) =
            pending.into_iter().partition(JoinHandle::is_finished);
        for handle in finished {
            let _ = handle.join();
        }
        pending = running;
        if pending.is_empty() || Instant::now() >= deadline {
            return pending.len();
        }
        std::thread::sleep(Duration::from_millis(10));
    }
}

#[cfg(feature = "host-tools")]
fn join_pipe_reader(reader: Option<JoinHandle<Vec<u8>>>) -> String {
    reader
        .and_then(|handle| handle.join().ok())
        .map(|bytes| String::from_utf8_lossy(&bytes).to_string())
        .unwrap_or_default()
}

fn format_host_tools_block_reason(operation: &str, policy: HostToolsPolicy) -> String {
    format!(
        "host_tools_disabled operation={operation} mode={} source={} env={}",
        policy.mode.as_str(),
        policy.source.as_str(),
        OHANAMI_HOST_TOOLS_ENV
    )
}

#[cfg(not(feature = "host-tools"))]
fn format_host_tools_feature_disabled_reason(operation: &str) -> String {
    format!("host_tools_unavailable operation={operation} feature=host-tools")
}

#[must_use]
fn resolve_host_tools_policy_with(env_raw: Option<&str>) -> HostToolsPolicy {
    if let Some(mode) = env_raw.and_then(parse_host_tools_mode) {
        return HostToolsPolicy {
            mode,
            source: HostToolsPolicySource::Environment,
        };
    }
    HostToolsPolicy {
        mode: HostToolsMode::Enabled,
        source: HostToolsPolicySource::Default,
    }
}

#[must_use]
fn parse_host_tools_mode(raw: &str) -> Option<HostToolsMode> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" | "enabled" => Some(HostToolsMode::Enabled),
        "0" | "false" | "no" | "off" | "disabled" | "none" => Some(HostToolsMode::Disabled),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ENABLED: HostToolsPolicy = HostToolsPolicy {
        mode: HostToolsMode::Enabled,
        source: HostToolsPolicySource::Default,
    };

    #[test]
    fn parse_host_tools_mode_accepts_common_tokens() {
        assert_eq!(parse_host_tools_mode("on"), Some(HostToolsMode::Enabled));
        assert_eq!(parse_host_tools_mode("1"), Some(HostToolsMode::Enabled));
        assert_eq!(parse_host_tools_mode("off"), Some(HostToolsMode::Disabled));
        assert_eq!(parse_host_tools_mode(" NONE "), Some(HostToolsMode::Disabled));
        assert_eq!(parse_host_tools_mode("maybe"), None);
    }

    #[test]
    fn policy_prefers_environment_override() {
        let policy = resolve_host_tools_policy_with(Some("off"));
        assert_eq!(
            policy,
            HostToolsPolicy {
                mode: HostToolsMode::Disabled,
                source: HostToolsPolicySource::Environment,
            }
        );
        assert_eq!(resolve_host_tools_policy_with(None), ENABLED);
    }

    #[test]
    fn disabled_policy_returns_blocked() {
        let spec = HostCommandSpec::new("test:blocked", "this-command-should-not-run", &[]);
        let result = run_host_command_with_policy(
            spec,
            HostToolsPolicy {
                mode: HostToolsMode::Disabled,
                source: HostToolsPolicySource::Environment,
            },
        );
        match result {
            HostCommandResult::Blocked { reason } => {
                assert!(reason.contains("operation=test:blocked"));
            }
            other => panic!("expected Blocked result, got: {other:?}"),
        }
    }

    #[cfg(feature = "host-tools")]
    #[test]
    fn missing_binary_reports_spawn_error() {
        let spec = HostCommandSpec::new("test:spawn_error", "ohanami-command-does-not-exist", &[]);
        match run_host_command_with_policy(spec, ENABLED) {
            HostCommandResult::SpawnError { error } => assert!(!error.trim().is_empty()),
            other => panic!("expected SpawnError result, got: {other:?}"),
        }
    }

    #[cfg(all(unix, feature = "host-tools"))]
    #[test]
    fn completed_command_captures_stdout_and_exit_code() {
        let spec = HostCommandSpec::new("test:success", "sh", &["-c", "printf ok"]);
        match run_host_command_with_policy(spec, ENABLED) {
            HostCommandResult::Completed {
                success,
                exit_code,
                stdout,
                ..
            } => {
                assert!(success);
                assert_eq!(exit_code, Some(0));
                assert_eq!(stdout, "ok");
            }
            other => panic!("expected Completed result, got: {other:?}"),
        }
    }

    #[cfg(all(unix, feature = "host-tools"))]
    #[test]
    fn non_zero_exit_is_reported_with_stderr() {
        let spec = HostCommandSpec::new("test:failure", "sh", &["-c", "echo boom >&2; exit 7"]);
        let result = run_host_command_with_policy(spec, ENABLED);
        match &result {
            HostCommandResult::Completed {
                success, exit_code, ..
            } => {
                assert!(!success);
                assert_eq!(*exit_code, Some(7));
            }
            other => panic!("expected Completed result, got: {other:?}"),
        }
        assert_eq!(result.combined_output().as_deref().map(str::trim), Some("boom"));
    }

    #[cfg(all(unix, feature = "host-tools"))]
    #[test]
    fn slow_command_is_killed_after_timeout() {
        let spec = HostCommandSpec::new("test:timeout", "sh", &["-c", "exec sleep 5"])
            .with_timeout(Duration::from_millis(100));
        match run_host_command_with_policy(spec, ENABLED) {
            HostCommandResult::TimedOut { timeout_ms } => assert_eq!(timeout_ms, 100),
            other => panic!("expected TimedOut result, got: {other:?}"),
        }
    }

    #[cfg(all(unix, feature = "host-tools"))]
    #[test]
    fn timeout_kills_helpers_that_inherited_the_pipes() {
        let spec = HostCommandSpec::new("test:group", "sh", &["-c", "sleep 5 & sleep 5"])
            .with_timeout(Duration::from_millis(100));
        let started = Instant::now();
        let result = run_host_command_with_policy(spec, ENABLED);
        assert!(matches!(result, HostCommandResult::TimedOut { .. }), "{result:?}");
        assert!(started.elapsed() < Duration::from_secs(3));
    }

    #[cfg(feature = "host-tools")]
    #[test]
    fn blocked_pipe_readers_are_detached_after_grace() {
        struct StalledPipe;

        impl Read for StalledPipe {
            fn read(&mut self, _buf: &mut [u8]) -> std::io::Result<usize> {
                std::thread::sleep(Duration::from_secs(2));
                Ok(0)
            }
        }

        let drained = spawn_pipe_reader(Some(std::io::Cursor::new(b"done".to_vec())));
        let stalled = spawn_pipe_reader(Some(StalledPipe));
        let started = Instant::now();
        let detached = reap_pipe_readers(vec![drained, stalled, None], Duration::from_millis(100));
        assert_eq!(detached, 1);
        assert!(started.elapsed() < Duration::from_secs(1));
    }

    #[cfg(all(unix, feature = "host-tools"))]
    #[test]
    fn current_dir_is_applied() {
        let temp = tempfile::tempdir().expect("tempdir");
        let spec = HostCommandSpec::new("test:cwd", "sh", &["-c", "pwd"]).with_current_dir(temp.path());
        let output = run_host_command_with_policy(spec, ENABLED)
            .combined_output()
            .expect("completed");
        let expected = temp.path().canonicalize().expect("canonical");
        assert_eq!(
            std::path::PathBuf::from(output.trim())
                .canonicalize()
                .expect("canonical pwd"),
            expected
        );
    }
}
