use std::time::Duration;

use anyhow::{Context, Result};
use ohanami_core::config::{CollectorConfig, SinkConfig, TransportConfig};
use ohanami_core::models::ReportDocument;
use ohanami_core::report::parse_report_payload;
use ohanami_core::{ReportSender, SendOutcome, SqliteReportStore, run_collection};

use crate::cli::{CollectArgs, Commands, IngestArgs, OutputFormat, ReportsArgs, ServeArgs};

mod render;
mod support;

use self::render::render_human;
use self::support::{print_error_payload, print_json, read_input};

pub(crate) fn run(command: Commands) -> Result<()> {
    match command {
        Commands::Collect(args) => run_collect(&args),
        Commands::Ingest(args) => run_ingest(&args),
        Commands::Reports(args) => run_reports(&args),
        Commands::Serve(args) => run_serve(&args),
    }
}

fn run_collect(args: &CollectArgs) -> Result<()> {
    let config = collector_config(args)?;
    let run = run_collection(&config).context("collection failed")?;
    send_best_effort(&TransportConfig::from_env(args.send), &run.document);
    emit_report(args.output, &run.document)
}

pub(super) fn collector_config(args: &CollectArgs) -> Result<CollectorConfig> {
    let mut config = CollectorConfig::from_env().context("invalid collector environment")?;
    if let Some(dir) = &args.scan_dir {
        config = config.with_scan_dir(dir);
    }
    if let Some(path) = &args.wp_cli {
        config.wp_cli_path = Some(path.clone());
    }
    if let Some(depth) = args.max_depth {
        config.max_depth = depth;
    }
    if let Some(rule) = args.rule {
        config.detection_rule = rule.into();
    }
    if let Some(secs) = args.timeout_secs {
        config.command_timeout = Duration::from_secs(secs);
    }
    if let Some(dir) = &args.output_dir {
        config.output_dir = dir.clone();
    }
    Ok(config)
}

fn send_best_effort(transport: &TransportConfig, doc: &ReportDocument) {
    let outcome = ReportSender::new(transport).and_then(|sender| sender.send(doc));
    match outcome {
        Ok(SendOutcome::Delivered { .. } | SendOutcome::Skipped { .. }) => {}
        Ok(SendOutcome::Rejected { status, .. }) => {
            tracing::warn!(status, "report was not accepted; local copy kept");
        }
        Err(err) => {
            tracing::warn!(
                code = err.code(),
                retryable = err.persist_failure_kind().is_retryable(),
                error = %err,
                "report send failed; local copy kept"
            );
        }
    }
}

fn emit_report(format: OutputFormat, doc: &ReportDocument) -> Result<()> {
    match format {
        OutputFormat::None => Ok(()),
        OutputFormat::Json => print_json(doc),
        OutputFormat::Human => {
            print!("{}", render_human(doc));
            Ok(())
        }
    }
}

pub(super) fn sink_config(db: Option<&std::path::Path>, provider: Option<&str>) -> SinkConfig {
    let mut config = SinkConfig::from_env();
    if let Some(db) = db {
        config.db_path = db.to_path_buf();
    }
    if let Some(provider) = provider.map(str::trim).filter(|value| !value.is_empty()) {
        config.provider = provider.to_string();
    }
    config
}

fn run_ingest(args: &IngestArgs) -> Result<()> {
    let sink = sink_config(args.db.as_deref(), args.provider.as_deref());
    let raw = read_input(&args.input)?;
    let doc = match parse_report_payload(&raw) {
        Ok(doc) => doc,
        Err(err) => {
            print_error_payload(&err, "ingest")?;
            return Err(err).context("report payload rejected");
        }
    };

    let store = SqliteReportStore::open(&sink.db_path)
        .with_context(|| format!("failed to open report database {}", sink.db_path.display()))?;
    match store.persist(&doc, &sink.provider) {
        Ok(result) => print_json(&result),
        Err(err) => {
            print_error_payload(&err, "ingest")?;
            Err(err).context("report persistence failed")
        }
    }
}

fn run_reports(args: &ReportsArgs) -> Result<()> {
    let sink = sink_config(args.db.as_deref(), None);
    let store = SqliteReportStore::open(&sink.db_path)
        .with_context(|| format!("failed to open report database {}", sink.db_path.display()))?;
    let reports = store.latest_reports(args.limit)?;
    print_json(&reports)
}

fn run_serve(args: &ServeArgs) -> Result<()> {
    let sink = sink_config(args.db.as_deref(), args.provider.as_deref());
    ohanami_web::serve_sink(&sink, &args.host, args.port)
}
