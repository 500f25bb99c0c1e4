use thiserror::Error;

use crate::detect::InstallationRoot;
use crate::models::{TenantDescriptor, TenantKind};
use crate::wp_cli::{ManagementTool, QueryOutcome};

pub(crate) const MULTISITE_QUERY: [&str; 2] = ["eval", "echo is_multisite() ? 1 : 0;"];
pub(crate) const SITE_URL_QUERY: [&str; 3] = ["option", "get", "siteurl"];
pub(crate) const TENANT_LIST_QUERY: [&str; 4] =
    ["site", "list", "--fields=blog_id,url", "--format=json"];

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CollectionFailure {
    #[error("management tool unreachable: {0}")]
    ToolUnreachable(String),
    #[error("malformed management tool output: {0}")]
    MalformedOutput(String),
}

pub fn resolve_tenants(
    tool: &dyn ManagementTool,
    root: &InstallationRoot,
) -> Result<Vec<TenantDescriptor>, CollectionFailure> {
    let cwd = root.path.as_path();
    let multisite = match tool.query(cwd, &MULTISITE_QUERY) {
        QueryOutcome::Success(raw) => parse_multisite_flag(&raw)?,
        QueryOutcome::Empty => {
            return Err(CollectionFailure::MalformedOutput(
                "multisite flag query returned no output".to_string(),
            ));
        }
        QueryOutcome::Failure(reason) => return Err(CollectionFailure::ToolUnreachable(reason)),
    };

    if !multisite {
        let url = tool
            .query(cwd, &SITE_URL_QUERY)
            .value()
            .map(ToString::to_string);
        if url.is_none() {
            tracing::debug!(path = %cwd.display(), "site url unavailable for single-site installation");
        }
        return Ok(vec![TenantDescriptor::single(cwd, url)]);
    }

    let raw = match tool.query(cwd, &TENANT_LIST_QUERY) {
        QueryOutcome::Success(raw) => raw,
        QueryOutcome::Empty => {
            return Err(CollectionFailure::MalformedOutput(
                "tenant listing returned no output".to_string(),
            ));
        }
        QueryOutcome::Failure(reason) => return Err(CollectionFailure::ToolUnreachable(reason)),
    };
    let tenants = parse_tenant_listing(&raw)?
        .into_iter()
        .map(|(id, url)| TenantDescriptor {
            root: cwd.to_path_buf(),
            id,
            kind: TenantKind::for_listed_id(id),
            url: Some(url),
        })
        .collect::<Vec<_>>();
    tracing::debug!(path = %cwd.display(), tenants = tenants.len(), "multisite network resolved");
    Ok(tenants)
}

fn parse_multisite_flag(raw: &str) -> Result<bool, CollectionFailure> {
    match raw.trim() {
        "1" | "true" => Ok(true),
        "0" | "false" => Ok(false),
        other => Err(CollectionFailure::MalformedOutput(format!(
            "unexpected multisite flag '{other}'"
        ))),
    }
}

fn parse_tenant_listing(raw: &str) -> Result<Vec<(u64, String)>, CollectionFailure> {
    let value: serde_json::Value = serde_json::from_str(raw.trim())
        .map_err(|err| CollectionFailure::MalformedOutput(format!("tenant listing: {err}")))?;
    let items = value.as_array().ok_or_else(|| {
        CollectionFailure::MalformedOutput("tenant listing is not an array".to_string())
    })?;
    if items.is_empty() {
        return Err(CollectionFailure::MalformedOutput(
            "tenant listing is empty".to_string(),
        ));
    }

    let mut out = Vec::with_capacity(items.len());
    for item in items {
        let id = match item.get("blog_id") {
            Some(serde_json::Value::String(raw)) => raw.trim().parse::<u64>().ok(),
            Some(serde_json::Value::Number(raw)) => raw.as_u64(),
            _ => None,
        }
        .filter(|id| *id > 0)
        .ok_or_else(|| {
            CollectionFailure::MalformedOutput(format!("tenant entry without valid blog_id: {item}"))
        })?;
        let url = item
            .get("url")
            .and_then(serde_json::Value::as_str)
            .map(|url| url.trim().to_string())
            .filter(|url| !url.is_empty())
            .ok_or_else(|| {
                CollectionFailure::MalformedOutput(format!("tenant entry without url: {item}"))
            })?;
        out.push((id, url));
    }
    Ok(out)
}
