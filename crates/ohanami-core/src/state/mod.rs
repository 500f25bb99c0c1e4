use std::path::Path;
#[cfg(unix)]
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::{SecondsFormat, Utc};
use rusqlite::types::Value;
use rusqlite::{Connection, Transaction, TransactionBehavior, params, params_from_iter};

use crate::error::{OhanamiError, Result};
use crate::models::{
    ExtensionInfo, PersistResult, PersistedSite, ReportDocument, SiteRecord, StoredReportSummary,
};
use crate::report::normalize_timestamp;

mod migration;

const BUSY_TIMEOUT: Duration = Duration::from_secs(5);
const REPORT_STATUS_COMPLETED: &str = "completed";
const EXTENSION_COLUMNS: usize = 6;

#[derive(Clone)]
pub struct SqliteReportStore {
    conn: Arc<Mutex<Connection>>,
}

impl std::fmt::Debug for SqliteReportStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SqliteReportStore").finish_non_exhaustive()
    }
}

struct ServerIdentity {
    id: i64,
    display_name: String,
}

impl SqliteReportStore {
    fn with_conn<T>(&self, f: impl FnOnce(&Connection) -> Result<T>) -> Result<T> {
        let conn = self
            .conn
            .lock()
            .map_err(|_| OhanamiError::mutex_poisoned("sqlite"))?;
        f(&conn)
    }

    fn with_tx<T>(&self, f: impl FnOnce(&Transaction<'_>) -> Result<T>) -> Result<T> {
        let mut conn = self
            .conn
            .lock()
            .map_err(|_| OhanamiError::mutex_poisoned("sqlite"))?;
        // Take the write lock up front so concurrent writers queue on the busy timeout.
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        let value = f(&tx)?;
        tx.commit()?;
        drop(conn);
        Ok(value)
    }

    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent)?;
        }
        let conn = Connection::open(path)?;
        conn.busy_timeout(BUSY_TIMEOUT)?;
        let store = Self {
            conn: Arc::new(Mutex::new(conn)),
        };
        store.migrate()?;
        #[cfg(unix)]
        harden_sqlite_permissions(path)?;
        Ok(store)
    }

    pub fn persist(&self, doc: &ReportDocument, provider: &str) -> Result<PersistResult> {
        let outcome = normalize_timestamp(&doc.report.metadata.timestamp).and_then(|executed_at| {
            self.with_tx(|tx| write_report(tx, doc, provider, &executed_at))
        });
        match &outcome {
            Ok(result) => tracing::info!(
                report_id = result.report_id,
                server_id = result.server_id,
                sites = result.sites_count,
                "report persisted"
            ),
            Err(err) => tracing::warn!(
                kind = err.persist_failure_kind().as_str(),
                error = %err,
                "report persistence rolled back"
            ),
        }
        outcome
    }

    pub fn latest_reports(&self, limit: usize) -> Result<Vec<StoredReportSummary>> {
        let limit = i64::try_from(limit).unwrap_or(i64::MAX);
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                r"
                SELECT r.id, r.execution_time, r.sites_count, r.status,
                       s.hostname, s.username, s.display_name
                FROM reports r
                JOIN servers s ON s.id = r.server_id
                ORDER BY r.execution_time DESC, r.id DESC
                LIMIT ?1
                ",
            )?;
            let rows = stmt.query_map(params![limit], |row| {
                Ok(StoredReportSummary {
                    id: row.get(0)?,
                    execution_time: row.get(1)?,
                    sites_count: row.get(2)?,
                    status: row.get(3)?,
                    hostname: row.get(4)?,
                    username: row.get(5)?,
                    display_name: row.get(6)?,
                })
            })?;

            let mut out = Vec::new();
            for row in rows {
                out.push(row?);
            }
            Ok(out)
        })
    }
}

fn write_report(
    tx: &Transaction<'_>,
    doc: &ReportDocument,
    provider: &str,
    executed_at: &str,
) -> Result<PersistResult> {
    let metadata = &doc.report.metadata;
    let server = resolve_server(tx, provider, &metadata.hostname, &metadata.user)?;
    let report_id = insert_report(tx, server.id, doc, executed_at)?;

    let mut sites = Vec::with_capacity(doc.report.wordpress.sites.len());
    for site in &doc.report.wordpress.sites {
        let site_id = insert_site(tx, report_id, server.id, site)?;
        let plugins_count = insert_extensions(tx, "plugins", site_id, &site.plugins)?;
        let themes_count = insert_extensions(tx, "themes", site_id, &site.themes)?;
        sites.push(PersistedSite {
            site_id,
            path: site.path.clone(),
            plugins_count,
            themes_count,
        });
    }

    Ok(PersistResult {
        report_id,
        server_id: server.id,
        server_info: server.display_name,
        sites_count: sites.len(),
        sites,
    })
}

fn resolve_server(
    tx: &Transaction<'_>,
    provider: &str,
    hostname: &str,
    username: &str,
) -> Result<ServerIdentity> {
    tx.execute(
        r"
        INSERT INTO servers(service_provider, hostname, username, display_name, description, created_at)
        VALUES (?1, ?2, ?3, ?4, ?5, ?6)
        ON CONFLICT(service_provider, hostname, username) DO NOTHING
        ",
        params![
            provider,
            hostname,
            username,
            format!("{username}@{hostname}"),
            format!("registered by {provider} collector"),
            now_rfc3339(),
        ],
    )?;
    let identity = tx.query_row(
        r"
        SELECT id, display_name FROM servers
        WHERE service_provider = ?1 AND hostname = ?2 AND username = ?3
        ",
        params![provider, hostname, username],
        |row| {
            Ok(ServerIdentity {
                id: row.get(0)?,
                display_name: row.get(1)?,
            })
        },
    )?;
    Ok(identity)
}

fn insert_report(
    tx: &Transaction<'_>,
    server_id: i64,
    doc: &ReportDocument,
    executed_at: &str,
) -> Result<i64> {
    let metadata = &doc.report.metadata;
    let env = &doc.report.environment;
    let sites_count = i64::try_from(doc.report.wordpress.sites.len()).unwrap_or(i64::MAX);
    tx.execute(
        r"
        INSERT INTO reports(
            server_id, ohanami_version, execution_time, hostname, username, working_directory,
            php_version, php_sapi, os_name, server_software, mysql_version,
            wpcli_version, wpcli_available, wpcli_path, sites_count, status, created_at
        )
        VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17)
        ",
        params![
            server_id,
            metadata.version,
            executed_at,
            metadata.hostname,
            metadata.user,
            metadata.working_directory,
            env.php.version,
            env.php.sapi,
            env.os,
            env.server_software,
            env.mysql.version,
            env.wpcli.version,
            env.wpcli.available,
            env.wpcli.path,
            sites_count,
            REPORT_STATUS_COMPLETED,
            now_rfc3339(),
        ],
    )?;
    Ok(tx.last_insert_rowid())
}

fn insert_site(tx: &Transaction<'_>, report_id: i64, server_id: i64, site: &SiteRecord) -> Result<i64> {
    let tenant_id = site
        .tenant
        .as_ref()
        .map(|tenant| i64::try_from(tenant.id).unwrap_or(i64::MAX));
    tx.execute(
        r"
        INSERT INTO wordpress_sites(
            report_id, server_id, site_path, tenant_id, tenant_kind, site_url,
            database_version, core_version, is_multisite, language, core_error,
            errors_json, collection_status
        )
        VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)
        ",
        params![
            report_id,
            server_id,
            site.path,
            tenant_id,
            site.tenant.as_ref().map(|tenant| tenant.kind.as_str()),
            site.tenant.as_ref().and_then(|tenant| tenant.url.as_deref()),
            site.database.version,
            site.core.version,
            site.core.is_multisite,
            site.core.language,
            site.core.error,
            serde_json::to_string(&site.errors)?,
            site.status.as_str(),
        ],
    )?;
    Ok(tx.last_insert_rowid())
}

fn insert_extensions(
    tx: &Transaction<'_>,
    table: &'static str,
    site_id: i64,
    items: &[ExtensionInfo],
) -> Result<usize> {
    let Some(sql) = bulk_insert_sql(table, items.len()) else {
        return Ok(0);
    };
    let mut values = Vec::with_capacity(items.len() * EXTENSION_COLUMNS);
    for item in items {
        values.push(Value::Integer(site_id));
        values.push(Value::Text(item.name.clone()));
        values.push(item.version.clone().map_or(Value::Null, Value::Text));
        values.push(Value::Text(item.status.clone()));
        values.push(Value::Text(item.update.clone()));
        values.push(Value::Text(item.auto_update.clone()));
    }
    let inserted = tx.execute(&sql, params_from_iter(values))?;
    Ok(inserted)
}

pub(crate) fn bulk_insert_sql(table: &str, rows: usize) -> Option<String> {
    if rows == 0 {
        return None;
    }
    let tuples = (0..rows)
        .map(|row| {
            let base = row * EXTENSION_COLUMNS;
            let slots = (1..=EXTENSION_COLUMNS)
                .map(|col| format!("?{}", base + col))
                .collect::<Vec<_>>()
                .join(", ");
            format!("({slots})")
        })
        .collect::<Vec<_>>()
        .join(", ");
    Some(format!(
        "INSERT INTO {table}(site_id, name, version, status, update_status, auto_update) VALUES {tuples}"
    ))
}

fn now_rfc3339() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true)
}

#[cfg(unix)]
fn harden_sqlite_permissions(path: &Path) -> Result<()> {
    use std::os::unix::fs::PermissionsExt;

    for suffix in ["", "-wal", "-shm"] {
        let mut os = path.as_os_str().to_os_string();
        os.push(suffix);
        let candidate = PathBuf::from(os);
        if candidate.exists() {
            std::fs::set_permissions(candidate, std::fs::Permissions::from_mode(0o600))?;
        }
    }
    Ok(())
}
