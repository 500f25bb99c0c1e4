use rusqlite::Connection;

use crate::error::{OhanamiError, Result};

use super::SqliteReportStore;

const MIGRATION_SCHEMA_SQL: &str = r"
    PRAGMA journal_mode = WAL;
    PRAGMA foreign_keys = ON;
    CREATE TABLE IF NOT EXISTS servers (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        service_provider TEXT NOT NULL,
        hostname TEXT NOT NULL,
        username TEXT NOT NULL,
        display_name TEXT NOT NULL,
        description TEXT,
        created_at TEXT NOT NULL,
        UNIQUE(service_provider, hostname, username)
    );

    CREATE TABLE IF NOT EXISTS reports (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        server_id INTEGER NOT NULL,
        ohanami_version TEXT NOT NULL,
        execution_time TEXT NOT NULL,
        hostname TEXT NOT NULL,
        username TEXT NOT NULL,
        working_directory TEXT,
        php_version TEXT,
        php_sapi TEXT,
        os_name TEXT,
        server_software TEXT,
        mysql_version TEXT,
        wpcli_version TEXT,
        wpcli_available INTEGER NOT NULL DEFAULT 0,
        wpcli_path TEXT,
        sites_count INTEGER NOT NULL DEFAULT 0,
        status TEXT NOT NULL,
        created_at TEXT NOT NULL,
        FOREIGN KEY (server_id) REFERENCES servers(id)
    );

    CREATE TABLE IF NOT EXISTS wordpress_sites (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        report_id INTEGER NOT NULL,
        server_id INTEGER NOT NULL,
        site_path TEXT NOT NULL,
        tenant_id INTEGER,
        tenant_kind TEXT,
        site_url TEXT,
        database_version TEXT,
        core_version TEXT,
        is_multisite INTEGER NOT NULL DEFAULT 0,
        language TEXT,
        core_error TEXT,
        errors_json TEXT NOT NULL DEFAULT '[]',
        collection_status TEXT NOT NULL,
        FOREIGN KEY (report_id) REFERENCES reports(id) ON DELETE CASCADE,
        FOREIGN KEY (server_id) REFERENCES servers(id)
    );

    CREATE TABLE IF NOT EXISTS plugins (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        site_id INTEGER NOT NULL,
        name TEXT NOT NULL,
        version TEXT,
        status TEXT NOT NULL,
        update_status TEXT NOT NULL,
        auto_update TEXT NOT NULL,
        FOREIGN KEY (site_id) REFERENCES wordpress_sites(id) ON DELETE CASCADE
    );

    CREATE TABLE IF NOT EXISTS themes (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        site_id INTEGER NOT NULL,
        name TEXT NOT NULL,
        version TEXT,
        status TEXT NOT NULL,
        update_status TEXT NOT NULL,
        auto_update TEXT NOT NULL,
        FOREIGN KEY (site_id) REFERENCES wordpress_sites(id) ON DELETE CASCADE
    );

    CREATE INDEX IF NOT EXISTS idx_reports_server_execution
    ON reports(server_id, execution_time DESC);
    CREATE INDEX IF NOT EXISTS idx_reports_execution_time ON reports(execution_time DESC);
    CREATE INDEX IF NOT EXISTS idx_wordpress_sites_report ON wordpress_sites(report_id);
    CREATE INDEX IF NOT EXISTS idx_plugins_site ON plugins(site_id);
    CREATE INDEX IF NOT EXISTS idx_plugins_name ON plugins(name);
    CREATE INDEX IF NOT EXISTS idx_themes_site ON themes(site_id);
";

impl SqliteReportStore {
    pub fn migrate(&self) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute_batch(MIGRATION_SCHEMA_SQL)?;
            ensure_required_column(
                conn,
                "wordpress_sites",
                "tenant_id",
                "unsupported wordpress_sites schema: tenant_id is missing; recreate the report database",
            )?;
            ensure_required_column(
                conn,
                "wordpress_sites",
                "collection_status",
                "unsupported wordpress_sites schema: collection_status is missing; recreate the report database",
            )?;
            ensure_required_column(
                conn,
                "reports",
                "working_directory",
                "unsupported reports schema: working_directory is missing; recreate the report database",
            )?;
            Ok(())
        })
    }
}

fn has_column(conn: &Connection, table: &str, column: &str) -> Result<bool> {
    let mut stmt = conn.prepare(&format!("PRAGMA table_info({table})"))?;
    let rows = stmt.query_map([], |row| row.get::<_, String>(1))?;
    for row in rows {
        if row? == column {
            return Ok(true);
        }
    }
    Ok(false)
}

fn ensure_required_column(
    conn: &Connection,
    table: &str,
    column: &str,
    error_message: &'static str,
) -> Result<()> {
    if has_column(conn, table, column)? {
        Ok(())
    } else {
        Err(OhanamiError::Validation(error_message.to_string()))
    }
}
