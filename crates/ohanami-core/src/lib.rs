// Public fallible APIs in this crate share one concrete error contract (`OhanamiError`).
// Repeating per-function `# Errors` boilerplate obscures behavior more than it clarifies.
#![allow(
    clippy::missing_errors_doc,
    reason = "crate-wide fallible API uses one explicit error type; per-item boilerplate would duplicate contract"
)]

pub mod collector;
pub mod config;
pub mod detect;
pub mod environment;
pub mod error;
pub mod host_tools;
pub mod models;
pub mod pipeline;
pub mod report;
pub mod state;
#[cfg(test)]
mod test_support;
pub mod topology;
pub mod transport;
pub mod wp_cli;

pub use collector::{collect, collect_installation};
pub use detect::{DetectionRule, InstallationRoot, discover, discover_all};
pub use error::{OhanamiError, PersistFailureKind, Result};
pub use pipeline::{CollectionRun, run_collection};
pub use report::{assemble, validate_report_payload};
pub use state::SqliteReportStore;
pub use topology::{CollectionFailure, resolve_tenants};
pub use transport::{ReportSender, SendOutcome};
pub use wp_cli::{ManagementTool, QueryOutcome};
