use std::path::Path;
use std::sync::LazyLock;

use regex::Regex;

use crate::detect::InstallationRoot;
use crate::models::{CollectionStatus, ExtensionInfo, SiteRecord, TenantDescriptor};
use crate::topology::resolve_tenants;
use crate::wp_cli::{ManagementTool, QueryOutcome, parse_json_array};

pub(crate) const PROBE_QUERY: [&str; 2] = ["core", "is-installed"];
pub(crate) const CORE_VERSION_QUERY: [&str; 2] = ["core", "version"];
pub(crate) const LANGUAGE_QUERY: [&str; 5] = [
    "language",
    "core",
    "list",
    "--field=language",
    "--status=active",
];
pub(crate) const DB_VERSION_QUERY: [&str; 4] =
    ["db", "query", "SELECT VERSION();", "--skip-column-names"];
pub(crate) const PLUGIN_LIST_QUERY: [&str; 3] = ["plugin", "list", "--format=json"];
pub(crate) const THEME_LIST_QUERY: [&str; 3] = ["theme", "list", "--format=json"];

const VERSION_DECLARATION_FILE: &str = "wp-includes/version.php";

static VERSION_DECLARATION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"\$wp_version\s*=\s*['"]([^'"]+)['"]"#).expect("version declaration pattern")
});

struct TenantQueries<'a> {
    tool: &'a dyn ManagementTool,
    tenant: &'a TenantDescriptor,
    url_arg: Option<String>,
}

impl<'a> TenantQueries<'a> {
    fn new(tool: &'a dyn ManagementTool, tenant: &'a TenantDescriptor) -> Self {
        let url_arg = tenant
            .kind
            .is_multisite()
            .then(|| tenant.url.as_ref().map(|url| format!("--url={url}")))
            .flatten();
        Self {
            tool,
            tenant,
            url_arg,
        }
    }

    fn run(&self, base: &[&str]) -> QueryOutcome {
        let mut args: Vec<&str> = base.to_vec();
        if let Some(url_arg) = &self.url_arg {
            args.push(url_arg.as_str());
        }
        self.tool.query(&self.tenant.root, &args)
    }
}

pub fn collect(tool: &dyn ManagementTool, tenant: &TenantDescriptor) -> SiteRecord {
    let mut site = SiteRecord::new(tenant.root.display().to_string());
    site.tenant = Some(tenant.to_ref());
    site.core.is_multisite = tenant.kind.is_multisite();

    let queries = TenantQueries::new(tool, tenant);
    if let QueryOutcome::Failure(reason) = queries.run(&PROBE_QUERY) {
        tracing::warn!(path = %site.path, tenant = tenant.id, %reason, "installation probe failed; using static inspection");
        apply_static_fallback(&mut site, &tenant.root, &format!("installation probe failed: {reason}"));
        return site;
    }

    match queries.run(&CORE_VERSION_QUERY) {
        QueryOutcome::Success(raw) => site.core.version = non_empty(&raw),
        QueryOutcome::Empty => {}
        QueryOutcome::Failure(reason) => {
            site.push_error(format!("core version: {reason}"));
            site.core.error = Some(reason);
        }
    }

    match queries.run(&LANGUAGE_QUERY) {
        QueryOutcome::Success(raw) => {
            if let Some(language) = raw.lines().map(str::trim).find(|line| !line.is_empty()) {
                site.core.language = language.to_string();
            }
        }
        QueryOutcome::Empty => {}
        QueryOutcome::Failure(reason) => site.push_error(format!("language: {reason}")),
    }

    match queries.run(&DB_VERSION_QUERY) {
        QueryOutcome::Success(raw) => site.database.version = non_empty(&raw),
        QueryOutcome::Empty => {}
        QueryOutcome::Failure(reason) => site.push_error(format!("database version: {reason}")),
    }

    match collect_extensions(&queries, &PLUGIN_LIST_QUERY) {
        Ok(plugins) => site.plugins = plugins,
        Err(reason) => site.push_error(format!("plugin list: {reason}")),
    }

    match collect_extensions(&queries, &THEME_LIST_QUERY) {
        Ok(themes) => site.themes = themes,
        Err(reason) => site.push_error(format!("theme list: {reason}")),
    }

    site.status = if site.errors.is_empty() {
        CollectionStatus::Complete
    } else {
        CollectionStatus::Partial
    };
    tracing::debug!(
        path = %site.path,
        tenant = tenant.id,
        plugins = site.plugins.len(),
        themes = site.themes.len(),
        errors = site.errors.len(),
        "site collected"
    );
    site
}

pub fn collect_installation(tool: &dyn ManagementTool, root: &InstallationRoot) -> Vec<SiteRecord> {
    match resolve_tenants(tool, root) {
        Ok(tenants) => tenants.iter().map(|tenant| collect(tool, tenant)).collect(),
        Err(failure) => {
            tracing::warn!(path = %root.path.display(), %failure, "tenant resolution failed");
            let mut site = SiteRecord::new(root.path.display().to_string());
            apply_static_fallback(&mut site, &root.path, &format!("tenant resolution failed: {failure}"));
            vec![site]
        }
    }
}

#[must_use]
pub fn read_declared_version(root: &Path) -> Option<String> {
    let raw = std::fs::read_to_string(root.join(VERSION_DECLARATION_FILE)).ok()?;
    VERSION_DECLARATION
        .captures(&raw)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
}

fn apply_static_fallback(site: &mut SiteRecord, root: &Path, diagnostic: &str) {
    site.push_error(diagnostic.to_string());
    site.core.error = Some(diagnostic.to_string());
    match read_declared_version(root) {
        Some(version) => {
            site.core.version = Some(version);
            site.status = CollectionStatus::Fallback;
        }
        None => {
            site.push_error(format!(
                "static inspection failed: no version declaration in {VERSION_DECLARATION_FILE}"
            ));
            site.status = CollectionStatus::Failed;
        }
    }
}

fn collect_extensions(queries: &TenantQueries<'_>, query: &[&str]) -> Result<Vec<ExtensionInfo>, String> {
    match queries.run(query) {
        QueryOutcome::Success(raw) => Ok(parse_json_array(&raw)
            .iter()
            .map(ExtensionInfo::from_tool_value)
            .collect()),
        QueryOutcome::Empty => Ok(Vec::new()),
        QueryOutcome::Failure(reason) => Err(reason),
    }
}

fn non_empty(raw: &str) -> Option<String> {
    Some(raw.trim().to_string()).filter(|value| !value.is_empty())
}
