use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::detect::DetectionRule;
use crate::error::{OhanamiError, Result};
use crate::host_tools::DEFAULT_COMMAND_TIMEOUT;

mod env;

pub use env::{home_dir, parse_bool_flag};

pub const ENV_SCAN_DIR: &str = "OHANAMI_SCAN_DIR";
pub const ENV_MAX_DEPTH: &str = "OHANAMI_MAX_DEPTH";
pub const ENV_DETECTION_RULE: &str = "OHANAMI_DETECTION_RULE";
pub const ENV_WP_CLI: &str = "OHANAMI_WP_CLI";
pub const ENV_COMMAND_TIMEOUT_SECS: &str = "OHANAMI_COMMAND_TIMEOUT_SECS";
pub const ENV_OUTPUT_DIR: &str = "OHANAMI_OUTPUT_DIR";
pub const ENV_ENDPOINT: &str = "OHANAMI_ENDPOINT";
pub const ENV_AUTH_TOKEN: &str = "OHANAMI_AUTH_TOKEN";
pub const ENV_SEND_TIMEOUT_SECS: &str = "OHANAMI_SEND_TIMEOUT_SECS";
pub const ENV_DB_PATH: &str = "OHANAMI_DB_PATH";
pub const ENV_PROVIDER: &str = "OHANAMI_PROVIDER";

pub const DEFAULT_MAX_DEPTH: usize = 3;
pub const DEFAULT_OUTPUT_DIR_NAME: &str = "ohanami-data";
pub const DEFAULT_PROVIDER: &str = "sakura";
pub const DEFAULT_DB_FILE: &str = "ohanami.sqlite3";
pub const DEFAULT_SEND_TIMEOUT: Duration = Duration::from_secs(30);

// Priority order: shared rental hosts first, then VPS, then local development layouts.
const WEB_ROOT_CANDIDATES: [&str; 5] = ["~/www", "~/public_html", "/var/www", "~/htdocs", "~/public"];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CollectorConfig {
    pub scan_dirs: Vec<PathBuf>,
    pub max_depth: usize,
    pub detection_rule: DetectionRule,
    pub wp_cli_path: Option<PathBuf>,
    pub command_timeout: Duration,
    pub output_dir: PathBuf,
}

impl Default for CollectorConfig {
    fn default() -> Self {
        Self {
            scan_dirs: Vec::new(),
            max_depth: DEFAULT_MAX_DEPTH,
            detection_rule: DetectionRule::Either,
            wp_cli_path: None,
            command_timeout: DEFAULT_COMMAND_TIMEOUT,
            output_dir: PathBuf::from(DEFAULT_OUTPUT_DIR_NAME),
        }
    }
}

impl CollectorConfig {
    pub fn from_env() -> Result<Self> {
        let home = env::home_dir();
        let scan_dirs = match env::read_env_path(ENV_SCAN_DIR) {
            Some(dir) => vec![dir],
            None => detect_web_roots(home.as_deref()),
        };
        let detection_rule = match env::read_non_empty_env(ENV_DETECTION_RULE) {
            Some(raw) => raw.parse::<DetectionRule>()?,
            None => DetectionRule::Either,
        };
        let command_timeout = env::read_env_u64(ENV_COMMAND_TIMEOUT_SECS)
            .filter(|secs| *secs > 0)
            .map_or(DEFAULT_COMMAND_TIMEOUT, Duration::from_secs);
        let output_dir = env::read_env_path(ENV_OUTPUT_DIR).unwrap_or_else(|| {
            home.as_deref()
                .map_or_else(|| PathBuf::from(DEFAULT_OUTPUT_DIR_NAME), |home| {
                    home.join(DEFAULT_OUTPUT_DIR_NAME)
                })
        });

        Ok(Self {
            scan_dirs,
            max_depth: env::read_env_usize(ENV_MAX_DEPTH, DEFAULT_MAX_DEPTH, 0),
            detection_rule,
            wp_cli_path: env::read_env_path(ENV_WP_CLI),
            command_timeout,
            output_dir,
        })
    }

    #[must_use]
    pub fn with_scan_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.scan_dirs = vec![dir.into()];
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportConfig {
    pub enabled: bool,
    pub endpoint: Option<String>,
    pub auth_token: Option<String>,
    pub timeout: Duration,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            endpoint: None,
            auth_token: None,
            timeout: DEFAULT_SEND_TIMEOUT,
        }
    }
}

impl TransportConfig {
    #[must_use]
    pub fn from_env(enabled: bool) -> Self {
        Self {
            enabled,
            endpoint: env::read_non_empty_env(ENV_ENDPOINT),
            auth_token: env::read_non_empty_env(ENV_AUTH_TOKEN),
            timeout: env::read_env_u64(ENV_SEND_TIMEOUT_SECS)
                .filter(|secs| *secs > 0)
                .map_or(DEFAULT_SEND_TIMEOUT, Duration::from_secs),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SinkConfig {
    pub db_path: PathBuf,
    pub provider: String,
    /// Shared secret collectors present as `Authorization: Bearer <token>`.
    pub auth_token: Option<String>,
}

impl SinkConfig {
    #[must_use]
    pub fn from_env() -> Self {
        let db_path = env::read_env_path(ENV_DB_PATH).unwrap_or_else(|| {
            env::home_dir().map_or_else(|| PathBuf::from(DEFAULT_DB_FILE), |home| {
                home.join(DEFAULT_OUTPUT_DIR_NAME).join(DEFAULT_DB_FILE)
            })
        });
        Self {
            db_path,
            provider: env::read_non_empty_env(ENV_PROVIDER)
                .unwrap_or_else(|| DEFAULT_PROVIDER.to_string()),
            auth_token: env::read_non_empty_env(ENV_AUTH_TOKEN),
        }
    }
}

#[must_use]
pub fn detect_web_roots(home: Option<&Path>) -> Vec<PathBuf> {
    let mut out = Vec::new();
    for candidate in WEB_ROOT_CANDIDATES {
        let Some(dir) = env::expand_home(candidate, home) else {
            continue;
        };
        if std::fs::read_dir(&dir).is_ok() && !out.contains(&dir) {
            out.push(dir);
        }
    }
    out
}

pub fn parse_max_depth(raw: &str) -> Result<usize> {
    raw.trim()
        .parse::<usize>()
        .map_err(|_| OhanamiError::Validation(format!("invalid max depth '{raw}'")))
}

#[cfg(test)]
mod tests {
    use std::fs;

    use tempfile::tempdir;

    use super::*;

    #[test]
    fn detect_web_roots_keeps_priority_order_of_existing_dirs() {
        let home = tempdir().expect("tempdir");
        fs::create_dir_all(home.path().join("public")).expect("public");
        fs::create_dir_all(home.path().join("www")).expect("www");

        let roots = detect_web_roots(Some(home.path()));
        let home_roots: Vec<_> = roots
            .iter()
            .filter(|dir| dir.starts_with(home.path()))
            .cloned()
            .collect();
        assert_eq!(
            home_roots,
            vec![home.path().join("www"), home.path().join("public")]
        );
    }

    #[test]
    fn expand_home_requires_home_for_tilde_paths() {
        assert_eq!(env::expand_home("~/www", None), None);
        assert_eq!(
            env::expand_home("/var/www", None),
            Some(PathBuf::from("/var/www"))
        );
        assert_eq!(
            env::expand_home("~/www", Some(Path::new("/home/alice"))),
            Some(PathBuf::from("/home/alice/www"))
        );
    }

    #[test]
    fn parse_bool_flag_accepts_common_tokens() {
        assert_eq!(parse_bool_flag("TRUE"), Some(true));
        assert_eq!(parse_bool_flag("off"), Some(false));
        assert_eq!(parse_bool_flag("sometimes"), None);
    }

    #[test]
    fn parse_max_depth_rejects_negative_values() {
        assert_eq!(parse_max_depth("4").expect("depth"), 4);
        assert!(parse_max_depth("-1").is_err());
    }
}
