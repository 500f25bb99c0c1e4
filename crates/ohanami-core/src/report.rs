use chrono::{DateTime, SecondsFormat, Utc};

use crate::error::{OhanamiError, Result};
use crate::models::{
    EnvironmentFacts, ReportBody, ReportDocument, ReportMetadata, SiteRecord, WordPressSection,
};

pub const COLLECTOR_VERSION: &str = env!("CARGO_PKG_VERSION");

#[must_use]
pub fn assemble(env: EnvironmentFacts, sites: Vec<SiteRecord>) -> ReportDocument {
    assemble_at(env, sites, Utc::now())
}

#[must_use]
pub fn assemble_at(
    env: EnvironmentFacts,
    sites: Vec<SiteRecord>,
    collected_at: DateTime<Utc>,
) -> ReportDocument {
    let metadata = ReportMetadata {
        version: COLLECTOR_VERSION.to_string(),
        timestamp: collected_at.to_rfc3339_opts(SecondsFormat::Secs, true),
        hostname: env.host.hostname.clone(),
        user: env.host.user.clone(),
        working_directory: env.host.working_directory.clone(),
    };
    ReportDocument {
        report: ReportBody {
            metadata,
            environment: env,
            wordpress: WordPressSection { sites },
        },
    }
}

pub fn validate_report_payload(payload: &serde_json::Value) -> Result<()> {
    let report = payload
        .get("report")
        .filter(|value| value.is_object())
        .ok_or_else(|| OhanamiError::Validation("payload is missing `report`".to_string()))?;
    for section in ["metadata", "wordpress"] {
        if !report.get(section).is_some_and(serde_json::Value::is_object) {
            return Err(OhanamiError::Validation(format!(
                "payload is missing `report.{section}`"
            )));
        }
    }
    let timestamp = report["metadata"]
        .get("timestamp")
        .and_then(serde_json::Value::as_str)
        .ok_or_else(|| {
            OhanamiError::Validation("payload is missing `report.metadata.timestamp`".to_string())
        })?;
    normalize_timestamp(timestamp)?;
    Ok(())
}

/// Parses an RFC 3339 instant and re-renders it in UTC with second precision,
/// so stored execution times sort chronologically as plain text.
pub fn normalize_timestamp(raw: &str) -> Result<String> {
    DateTime::parse_from_rfc3339(raw.trim())
        .map(|at| {
            at.with_timezone(&Utc)
                .to_rfc3339_opts(SecondsFormat::Secs, true)
        })
        .map_err(|err| {
            OhanamiError::Validation(format!(
                "invalid `report.metadata.timestamp` '{raw}': {err}"
            ))
        })
}

pub fn parse_report_payload(raw: &str) -> Result<ReportDocument> {
    let payload: serde_json::Value = serde_json::from_str(raw)?;
    validate_report_payload(&payload)?;
    Ok(serde_json::from_value(payload)?)
}
