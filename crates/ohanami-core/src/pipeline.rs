use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::collector::collect_installation;
use crate::config::{CollectorConfig, home_dir};
use crate::detect::discover_all;
use crate::error::Result;
use crate::models::{EnvironmentFacts, ReportDocument, SiteRecord};
use crate::report::assemble;
use crate::wp_cli::{ManagementTool, UnavailableTool, WpCli, locate_wp_cli};

pub const REPORT_FILE_NAME: &str = "ohanami-report.json";

#[derive(Debug, Clone)]
pub struct CollectionRun {
    pub document: ReportDocument,
    pub report_path: PathBuf,
}

pub fn run_collection(config: &CollectorConfig) -> Result<CollectionRun> {
    // The output location is the only hard precondition of a run.
    ensure_output_dir(&config.output_dir)?;

    let home = home_dir();
    let wp_cli = locate_wp_cli(
        config.wp_cli_path.as_deref(),
        home.as_deref(),
        config.command_timeout,
    )
    .map(|path| WpCli::new(path).with_timeout(config.command_timeout));
    let sites = match &wp_cli {
        Some(tool) => {
            tracing::info!(path = %tool.path().display(), "using wp-cli");
            collect_sites(tool, config)
        }
        None => {
            tracing::warn!("wp-cli not found; falling back to static inspection");
            collect_sites(&UnavailableTool::new("wp-cli not found"), config)
        }
    };

    let env = EnvironmentFacts::probe(wp_cli.as_ref(), config.command_timeout);
    let document = assemble(env, sites);
    let report_path = write_local_copy(&config.output_dir, &document)?;
    tracing::info!(
        sites = document.report.wordpress.sites.len(),
        path = %report_path.display(),
        "collection finished"
    );
    Ok(CollectionRun {
        document,
        report_path,
    })
}

#[must_use]
pub fn collect_sites(tool: &dyn ManagementTool, config: &CollectorConfig) -> Vec<SiteRecord> {
    if config.scan_dirs.is_empty() {
        tracing::warn!("no readable web root found; report will contain no sites");
    }
    let installations = discover_all(&config.scan_dirs, config.max_depth, config.detection_rule);
    tracing::info!(
        installations = installations.len(),
        rule = %config.detection_rule,
        max_depth = config.max_depth,
        "installations discovered"
    );
    installations
        .iter()
        .flat_map(|root| collect_installation(tool, root))
        .collect()
}

pub fn ensure_output_dir(dir: &Path) -> Result<()> {
    fs::create_dir_all(dir)?;
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        fs::set_permissions(dir, fs::Permissions::from_mode(0o700))?;
    }
    Ok(())
}

pub fn write_local_copy(dir: &Path, doc: &ReportDocument) -> Result<PathBuf> {
    ensure_output_dir(dir)?;
    let path = dir.join(REPORT_FILE_NAME);
    let mut options = fs::OpenOptions::new();
    options.write(true).create(true).truncate(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        options.mode(0o600);
    }
    let mut file = options.open(&path)?;
    serde_json::to_writer_pretty(&mut file, doc)?;
    file.write_all(b"\n")?;
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        fs::set_permissions(&path, fs::Permissions::from_mode(0o600))?;
    }
    Ok(path)
}

#[cfg(test)]
mod tests {
    use tempfile::tempdir;

    use super::*;
    use crate::collector::{CORE_VERSION_QUERY, PLUGIN_LIST_QUERY, PROBE_QUERY};
    use crate::detect::DetectionRule;
    use crate::host_tools::HostCommandResult;
    use crate::models::{CollectionStatus, TenantKind};
    use crate::test_support::ScriptedTool;
    use crate::topology::{MULTISITE_QUERY, SITE_URL_QUERY, TENANT_LIST_QUERY};

    fn ok(stdout: &str) -> HostCommandResult {
        HostCommandResult::completed(0, stdout)
    }

    fn single_site_tree() -> (tempfile::TempDir, CollectorConfig) {
        let temp = tempdir().expect("tempdir");
        let site = temp.path().join("site");
        fs::create_dir_all(&site).expect("mkdir");
        fs::write(site.join("wp-load.php"), "<?php\n").expect("loader");
        fs::write(site.join("wp-config.php"), "<?php\n").expect("settings");
        let config = CollectorConfig {
            detection_rule: DetectionRule::LoaderWithSettings,
            ..CollectorConfig::default()
        }
        .with_scan_dir(temp.path());
        (temp, config)
    }

    #[test]
    fn single_site_end_to_end() {
        let (temp, config) = single_site_tree();
        let tool = ScriptedTool::default()
            .respond(&MULTISITE_QUERY, ok("0"))
            .respond(&SITE_URL_QUERY, ok("https://example.test"))
            .respond(&PROBE_QUERY, ok(""))
            .respond(&CORE_VERSION_QUERY, ok("6.4.2"))
            .respond(
                &PLUGIN_LIST_QUERY,
                ok(r#"[{"name":"akismet","version":"5.3","status":"active","update":"none"}]"#),
            )
            .otherwise(ok(""));

        let sites = collect_sites(&tool, &config);
        assert_eq!(sites.len(), 1);
        let site = &sites[0];
        assert_eq!(site.path, temp.path().join("site").display().to_string());
        let tenant = site.tenant.as_ref().expect("tenant");
        assert_eq!((tenant.id, tenant.kind), (1, TenantKind::Single));
        assert_eq!(site.core.version.as_deref(), Some("6.4.2"));
        assert_eq!(site.plugins.len(), 1);
        assert_eq!(site.plugins[0].name, "akismet");
        assert!(site.errors.is_empty());
        assert_eq!(site.status, CollectionStatus::Complete);
    }

    #[test]
    fn multisite_end_to_end_yields_one_record_per_tenant() {
        let (_temp, config) = single_site_tree();
        let tool = ScriptedTool::default()
            .respond(&MULTISITE_QUERY, ok("1"))
            .respond(
                &TENANT_LIST_QUERY,
                ok(r#"[{"blog_id":"1","url":"a.test"},{"blog_id":"2","url":"b.test"}]"#),
            )
            .otherwise(ok(""));

        let sites = collect_sites(&tool, &config);
        let kinds: Vec<_> = sites
            .iter()
            .map(|site| site.tenant.as_ref().map(|tenant| tenant.kind))
            .collect();
        assert_eq!(
            kinds,
            vec![Some(TenantKind::MultiPrimary), Some(TenantKind::MultiSecondary)]
        );
        assert!(sites.iter().all(|site| site.core.is_multisite));
    }

    #[test]
    fn one_broken_installation_does_not_hide_the_others() {
        let (temp, config) = single_site_tree();
        let other = temp.path().join("other");
        fs::create_dir_all(&other).expect("mkdir");
        fs::write(other.join("wp-load.php"), "<?php\n").expect("loader");
        fs::write(other.join("wp-config.php"), "<?php\n").expect("settings");
        let tool = ScriptedTool::default().otherwise(HostCommandResult::TimedOut {
            timeout_ms: 30_000,
        });

        let sites = collect_sites(&tool, &config);
        assert_eq!(sites.len(), 2);
        assert!(sites.iter().all(|site| !site.path.is_empty()));
        assert!(sites.iter().all(|site| !site.errors.is_empty()));
    }

    #[cfg(unix)]
    #[test]
    fn local_copy_is_owner_only() {
        use std::os::unix::fs::PermissionsExt;

        let temp = tempdir().expect("tempdir");
        let out = temp.path().join("ohanami-data");
        let doc = assemble(EnvironmentFacts::default(), Vec::new());

        let path = write_local_copy(&out, &doc).expect("write");
        let dir_mode = fs::metadata(&out).expect("dir").permissions().mode() & 0o777;
        let file_mode = fs::metadata(&path).expect("file").permissions().mode() & 0o777;
        assert_eq!(dir_mode, 0o700);
        assert_eq!(file_mode, 0o600);

        let written: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(&path).expect("read")).expect("json");
        assert!(written["report"]["metadata"].is_object());
    }
}
