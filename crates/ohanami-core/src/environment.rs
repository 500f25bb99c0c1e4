use std::sync::LazyLock;
use std::time::Duration;

use regex::Regex;

use crate::host_tools::{HostCommandSpec, run_host_command};
use crate::models::{EnvironmentFacts, HostIdentity, MysqlInfo, PhpInfo, WpCliInfo};
use crate::wp_cli::{QueryOutcome, WpCli, classify_invocation};

const PHP_PROBE_SCRIPT: &str = "echo PHP_VERSION, PHP_EOL, PHP_SAPI;";
const SERVER_SOFTWARE_ENV: &str = "SERVER_SOFTWARE";
const UNKNOWN_IDENTITY: &str = "unknown";

static MYSQL_CLIENT_VERSION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?:Ver|Distrib)\s+([0-9]+\.[0-9]+\.[0-9]+)").expect("mysql version pattern")
});

impl EnvironmentFacts {
    #[must_use]
    pub fn probe(wp_cli: Option<&WpCli>, timeout: Duration) -> Self {
        let php = probe_php(timeout);
        let mysql = MysqlInfo {
            version: probe_output("environment:mysql", "mysql", &["--version"], timeout)
                .and_then(|raw| parse_mysql_client_version(&raw)),
        };
        let wpcli = match wp_cli {
            Some(tool) => WpCliInfo {
                version: tool.version(),
                available: true,
                path: Some(tool.path().display().to_string()),
            },
            None => WpCliInfo::default(),
        };
        let facts = Self {
            php,
            os: std::env::consts::OS.to_string(),
            server_software: std::env::var(SERVER_SOFTWARE_ENV)
                .ok()
                .filter(|value| !value.trim().is_empty()),
            mysql,
            wpcli,
            host: probe_host_identity(),
        };
        tracing::debug!(
            php = ?facts.php.version,
            mysql = ?facts.mysql.version,
            wpcli_available = facts.wpcli.available,
            hostname = %facts.host.hostname,
            "environment probed"
        );
        facts
    }
}

#[must_use]
pub fn parse_mysql_client_version(raw: &str) -> Option<String> {
    MYSQL_CLIENT_VERSION
        .captures(raw)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
}

fn parse_php_probe(raw: &str) -> PhpInfo {
    let mut lines = raw.lines().map(str::trim).filter(|line| !line.is_empty());
    PhpInfo {
        version: lines.next().map(ToString::to_string),
        sapi: lines.next().map(ToString::to_string),
    }
}

fn probe_php(timeout: Duration) -> PhpInfo {
    probe_output("environment:php", "php", &["-r", PHP_PROBE_SCRIPT], timeout)
        .map(|raw| parse_php_probe(&raw))
        .unwrap_or_default()
}

fn probe_output(operation: &str, program: &str, args: &[&str], timeout: Duration) -> Option<String> {
    let spec = HostCommandSpec::new(operation, program, args).with_timeout(timeout);
    match classify_invocation(&run_host_command(spec)) {
        QueryOutcome::Success(raw) => Some(raw),
        QueryOutcome::Empty => None,
        QueryOutcome::Failure(reason) => {
            tracing::debug!(program, %reason, "environment probe failed");
            None
        }
    }
}

#[must_use]
pub fn probe_host_identity() -> HostIdentity {
    HostIdentity {
        hostname: current_hostname().unwrap_or_else(|| UNKNOWN_IDENTITY.to_string()),
        user: current_user().unwrap_or_else(|| UNKNOWN_IDENTITY.to_string()),
        working_directory: std::env::current_dir()
            .map(|dir| dir.display().to_string())
            .unwrap_or_default(),
    }
}

#[cfg(unix)]
fn current_hostname() -> Option<String> {
    use std::ffi::CStr;

    let mut buf = vec![0u8; 256];
    let rc = unsafe { libc::gethostname(buf.as_mut_ptr() as *mut libc::c_char, buf.len()) };
    if rc != 0 {
        return None;
    }
    let last = buf.len() - 1;
    buf[last] = 0;
    let name = CStr::from_bytes_until_nul(&buf).ok()?.to_string_lossy().trim().to_string();
    Some(name).filter(|name| !name.is_empty())
}

#[cfg(not(unix))]
fn current_hostname() -> Option<String> {
    std::env::var("COMPUTERNAME").ok()
}

#[cfg(unix)]
fn current_user() -> Option<String> {
    use std::ffi::CStr;

    unsafe {
        let bufsize = libc::sysconf(libc::_SC_GETPW_R_SIZE_MAX);
        let bufsize = if bufsize <= 0 {
            16 * 1024
        } else {
            bufsize as usize
        };
        let mut buf = vec![0u8; bufsize];
        let mut pwd: libc::passwd = std::mem::zeroed();
        let mut result: *mut libc::passwd = std::ptr::null_mut();

        let rc = libc::getpwuid_r(
            libc::geteuid(),
            &mut pwd,
            buf.as_mut_ptr() as *mut libc::c_char,
            buf.len(),
            &mut result,
        );
        if rc != 0 || result.is_null() || pwd.pw_name.is_null() {
            return std::env::var("USER").ok();
        }
        let name = CStr::from_ptr(pwd.pw_name).to_string_lossy().to_string();
        Some(name).filter(|name| !name.trim().is_empty())
    }
}

#[cfg(not(unix))]
fn current_user() -> Option<String> {
    std::env::var("USERNAME").ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mysql_version_handles_mysql_and_mariadb_clients() {
        assert_eq!(
            parse_mysql_client_version("mysql  Ver 8.0.36 for Linux on x86_64 (MySQL Community Server - GPL)")
                .as_deref(),
            Some("8.0.36")
        );
        assert_eq!(
            parse_mysql_client_version("mysql  Ver 15.1 Distrib 10.6.12-MariaDB, for debian-linux-gnu")
                .as_deref(),
            Some("10.6.12")
        );
        assert_eq!(parse_mysql_client_version("command not found"), None);
    }

    #[test]
    fn php_probe_output_splits_version_and_sapi() {
        let info = parse_php_probe("8.2.15\ncli\n");
        assert_eq!(info.version.as_deref(), Some("8.2.15"));
        assert_eq!(info.sapi.as_deref(), Some("cli"));
        assert_eq!(parse_php_probe(""), PhpInfo::default());
    }

    #[test]
    fn host_identity_is_always_populated() {
        let identity = probe_host_identity();
        assert!(!identity.hostname.is_empty());
        assert!(!identity.user.is_empty());
    }

    #[test]
    fn probe_without_management_tool_reports_unavailable() {
        let facts = EnvironmentFacts::probe(None, Duration::from_secs(5));
        assert!(!facts.wpcli.available);
        assert_eq!(facts.wpcli.path, None);
        assert_eq!(facts.os, std::env::consts::OS);
    }
}
