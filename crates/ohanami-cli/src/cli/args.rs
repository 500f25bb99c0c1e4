use std::path::PathBuf;

use clap::{ArgAction, Args, ValueEnum};
use ohanami_core::DetectionRule;

use super::parsers::{parse_bool_token, parse_depth, parse_min_one_u64, parse_min_one_usize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    None,
    Json,
    Human,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum RuleArg {
    Loader,
    Settings,
    Either,
}

impl From<RuleArg> for DetectionRule {
    fn from(value: RuleArg) -> Self {
        match value {
            RuleArg::Loader => Self::LoaderWithSettings,
            RuleArg::Settings => Self::SettingsOnly,
            RuleArg::Either => Self::Either,
        }
    }
}

#[derive(Debug, Args)]
pub struct CollectArgs {
    /// Format printed to stdout once the report is assembled.
    #[arg(short = 'o', long, value_enum, default_value_t = OutputFormat::None)]
    pub output: OutputFormat,
    /// Send the report to `OHANAMI_ENDPOINT` (true/false).
    #[arg(
        short = 's',
        long,
        default_value_t = true,
        value_parser = parse_bool_token,
        action = ArgAction::Set
    )]
    pub send: bool,
    /// Scan only this directory instead of the detected web roots.
    #[arg(short = 'd', long = "scan-dir", value_name = "DIR")]
    pub scan_dir: Option<PathBuf>,
    /// Use this wp-cli executable instead of searching for one.
    #[arg(short = 'w', long = "wp-cli", value_name = "PATH")]
    pub wp_cli: Option<PathBuf>,
    /// Directory levels below each scan root to search (0 checks the root only).
    #[arg(long, value_parser = parse_depth)]
    pub max_depth: Option<usize>,
    #[arg(long, value_enum)]
    pub rule: Option<RuleArg>,
    /// Per-invocation timeout for wp-cli and environment probes.
    #[arg(long, value_parser = parse_min_one_u64)]
    pub timeout_secs: Option<u64>,
    #[arg(long, value_name = "DIR")]
    pub output_dir: Option<PathBuf>,
}

#[derive(Debug, Args)]
pub struct IngestArgs {
    /// Report document path, or `-` to read stdin.
    pub input: String,
    #[arg(long, value_name = "PATH")]
    pub db: Option<PathBuf>,
    /// Service provider tag recorded with the server identity.
    #[arg(long)]
    pub provider: Option<String>,
}

#[derive(Debug, Args)]
pub struct ReportsArgs {
    #[arg(long, value_name = "PATH")]
    pub db: Option<PathBuf>,
    #[arg(long, default_value_t = 20, value_parser = parse_min_one_usize)]
    pub limit: usize,
}

/// The bearer token is read from `OHANAMI_AUTH_TOKEN` so it never appears in argv.
#[derive(Debug, Args)]
pub struct ServeArgs {
    #[arg(long, default_value = "127.0.0.1")]
    pub host: String,
    #[arg(long, default_value_t = 8080)]
    pub port: u16,
    #[arg(long, value_name = "PATH")]
    pub db: Option<PathBuf>,
    /// Service provider tag recorded with each server identity.
    #[arg(long)]
    pub provider: Option<String>,
}
