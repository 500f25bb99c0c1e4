use std::io::Write;
use std::process::{Command, Stdio};
use std::{env, fs, path::PathBuf};

use tempfile::tempdir;

const REPORT: &str = r#"{"report":{"metadata":{"version":"0.3.0","timestamp":"2024-05-01T09:30:00Z","hostname":"web01","user":"deploy","working_directory":"/home/deploy"},"environment":{"os":"linux"},"wordpress":{"sites":[{"path":"/home/deploy/www/site","core":{"version":"6.4.2"},"plugins":[{"name":"akismet","version":"5.3","status":"active","update":"none"}]}]}}}"#;

fn cli_bin_path() -> PathBuf {
    if let Ok(path) = env::var("CARGO_BIN_EXE_ohanami") {
        return PathBuf::from(path);
    }

    let manifest_dir = PathBuf::from(env!("CARGO_MANIFEST_DIR"));
    let workspace_root = manifest_dir
        .parent()
        .and_then(|p| p.parent())
        .map(PathBuf::from)
        .expect("workspace root");
    let bin_name = if cfg!(windows) {
        "ohanami.exe"
    } else {
        "ohanami"
    };
    let fallback = workspace_root.join("target").join("debug").join(bin_name);
    assert!(
        fallback.exists(),
        "ohanami binary not found at {}",
        fallback.display()
    );
    fallback
}

#[test]
fn help_process_contract_exits_zero() {
    let output = Command::new(cli_bin_path())
        .arg("--help")
        .output()
        .expect("run help");

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("collect"));
    assert!(stdout.contains("ingest"));
    assert!(stdout.contains("serve"));
}

#[test]
fn ingest_then_reports_process_contract_round_trips_through_sqlite() {
    // Given a report file and an empty database path
    // When ingesting it twice and listing reports
    // Then both runs share one server and the listing shows two reports.
    let temp = tempdir().expect("tempdir");
    let report_path = temp.path().join("report.json");
    fs::write(&report_path, REPORT).expect("write report");
    let db_path = temp.path().join("db").join("reports.db");

    for _ in 0..2 {
        let output = Command::new(cli_bin_path())
            .args([
                "ingest",
                report_path.to_str().expect("report path"),
                "--db",
                db_path.to_str().expect("db path"),
                "--provider",
                "sakura",
            ])
            .output()
            .expect("run ingest");
        assert!(
            output.status.success(),
            "stderr: {}",
            String::from_utf8_lossy(&output.stderr)
        );
        let result: serde_json::Value =
            serde_json::from_slice(&output.stdout).expect("ingest json");
        assert_eq!(result["sites_count"], 1);
        assert_eq!(result["sites"][0]["plugins_count"], 1);
    }

    let output = Command::new(cli_bin_path())
        .args([
            "reports",
            "--db",
            db_path.to_str().expect("db path"),
            "--limit",
            "5",
        ])
        .output()
        .expect("run reports");
    assert!(output.status.success());
    let reports: serde_json::Value = serde_json::from_slice(&output.stdout).expect("reports json");
    let reports = reports.as_array().expect("array");
    assert_eq!(reports.len(), 2);
    assert_eq!(reports[0]["hostname"], "web01");
}

#[test]
fn ingest_process_contract_rejects_payload_without_wordpress_section() {
    let temp = tempdir().expect("tempdir");
    let db_path = temp.path().join("reports.db");
    let mut child = Command::new(cli_bin_path())
        .args(["ingest", "-", "--db", db_path.to_str().expect("db path")])
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .expect("spawn ingest");
    child
        .stdin
        .take()
        .expect("stdin")
        .write_all(br#"{"report":{"metadata":{}}}"#)
        .expect("write stdin");
    let output = child.wait_with_output().expect("wait ingest");

    assert_eq!(output.status.code(), Some(1));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("VALIDATION_FAILED"));
    assert!(stderr.contains("report.wordpress"));
    assert!(!db_path.exists());
}

#[test]
fn collect_process_contract_writes_local_copy_without_sending() {
    let temp = tempdir().expect("tempdir");
    let web_root = temp.path().join("www");
    fs::create_dir_all(&web_root).expect("web root");
    let out_dir = temp.path().join("out");

    let output = Command::new(cli_bin_path())
        .args([
            "collect",
            "-o",
            "json",
            "-s",
            "false",
            "-d",
            web_root.to_str().expect("web root"),
            "-w",
            "/nonexistent/wp",
            "--output-dir",
            out_dir.to_str().expect("out dir"),
        ])
        .env("OHANAMI_HOST_TOOLS", "off")
        .output()
        .expect("run collect");

    assert!(
        output.status.success(),
        "stderr: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    let printed: serde_json::Value = serde_json::from_slice(&output.stdout).expect("report json");
    assert_eq!(
        printed["report"]["wordpress"]["sites"]
            .as_array()
            .map(Vec::len),
        Some(0)
    );
    assert!(out_dir.join("ohanami-report.json").is_file());
}

#[test]
fn serve_process_contract_refuses_to_start_without_token() {
    let temp = tempdir().expect("tempdir");
    let db_path = temp.path().join("reports.db");

    let output = Command::new(cli_bin_path())
        .args([
            "serve",
            "--port",
            "0",
            "--db",
            db_path.to_str().expect("db path"),
        ])
        .env_remove("OHANAMI_AUTH_TOKEN")
        .output()
        .expect("run serve");

    assert_eq!(output.status.code(), Some(1));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("OHANAMI_AUTH_TOKEN"), "stderr: {stderr}");
    assert!(!db_path.exists());
}
