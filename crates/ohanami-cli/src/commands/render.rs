use std::fmt::Write;

use chrono::{DateTime, Local};
use ohanami_core::models::{EnvironmentFacts, ReportDocument, ReportMetadata, SiteRecord};

const NOT_AVAILABLE: &str = "N/A";

pub(super) fn render_human(doc: &ReportDocument) -> String {
    let mut out = String::new();
    render_metadata(&mut out, &doc.report.metadata);
    render_environment(&mut out, &doc.report.environment);
    render_sites(&mut out, &doc.report.wordpress.sites);
    out
}

fn row(out: &mut String, key: &str, value: Option<&str>) {
    let _ = writeln!(out, "{key:<15}: {}", value.unwrap_or(NOT_AVAILABLE));
}

fn render_metadata(out: &mut String, metadata: &ReportMetadata) {
    out.push_str("\n=== Metadata ===\n");
    row(out, "version", Some(&metadata.version));
    row(out, "timestamp", Some(&metadata.timestamp));
    let local = DateTime::parse_from_rfc3339(&metadata.timestamp)
        .ok()
        .map(|at| at.with_timezone(&Local).format("%Y-%m-%d %H:%M:%S %:z").to_string());
    row(out, "local_time", local.as_deref());
    row(out, "hostname", Some(&metadata.hostname));
    row(out, "user", Some(&metadata.user));
    row(out, "working_dir", Some(&metadata.working_directory));
}

fn render_environment(out: &mut String, env: &EnvironmentFacts) {
    out.push_str("\n=== Environment ===\n");
    row(out, "php", env.php.version.as_deref());
    row(out, "php_sapi", env.php.sapi.as_deref());
    row(out, "os", Some(&env.os));
    row(out, "server_software", env.server_software.as_deref());
    row(out, "mysql", env.mysql.version.as_deref());
    let wpcli = if env.wpcli.available {
        format!(
            "{} ({})",
            env.wpcli.version.as_deref().unwrap_or("Unknown"),
            env.wpcli.path.as_deref().unwrap_or(NOT_AVAILABLE)
        )
    } else {
        "unavailable".to_string()
    };
    row(out, "wpcli", Some(&wpcli));
}

fn render_sites(out: &mut String, sites: &[SiteRecord]) {
    out.push_str("\n=== WordPress Sites ===\n");
    if sites.is_empty() {
        out.push_str("No WordPress sites found.\n");
        return;
    }

    for (index, site) in sites.iter().enumerate() {
        let _ = writeln!(out, "\n--- Site {} ---", index + 1);
        let _ = writeln!(out, "Path: {}", site.path);
        if let Some(url) = site.tenant.as_ref().and_then(|tenant| tenant.url.as_deref()) {
            let _ = writeln!(out, "URL: {url}");
        }
        let multisite = if site.core.is_multisite { " (Multisite)" } else { "" };
        let _ = writeln!(
            out,
            "WordPress: {}{multisite}",
            site.core.version.as_deref().unwrap_or("Unknown")
        );
        let _ = writeln!(out, "Language: {}", site.core.language);
        if let Some(version) = &site.database.version {
            let _ = writeln!(out, "Database: {version}");
        }
        if !site.plugins.is_empty() {
            let _ = writeln!(out, "Plugins: {} installed", site.plugins.len());
            for plugin in &site.plugins {
                let marker = if plugin.status == "active" { "+" } else { "-" };
                let update = if plugin.update_available() { " [UPDATE]" } else { "" };
                let _ = writeln!(
                    out,
                    "  {marker} {} ({}){update}",
                    plugin.name,
                    plugin.version.as_deref().unwrap_or("Unknown")
                );
            }
        }
        if !site.themes.is_empty() {
            let _ = write!(out, "Themes: {} installed", site.themes.len());
            if let Some(active) = site.themes.iter().find(|theme| theme.status == "active") {
                let _ = write!(out, " (Active: {})", active.name);
            }
            out.push('\n');
        }
        if !site.errors.is_empty() {
            let _ = writeln!(out, "Status: {}", site.status.as_str());
            for error in &site.errors {
                let _ = writeln!(out, "  ! {error}");
            }
        }
    }
}
