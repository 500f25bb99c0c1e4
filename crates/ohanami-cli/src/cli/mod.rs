use clap::{Parser, Subcommand};

mod args;
mod parsers;


pub use args::{CollectArgs, IngestArgs, OutputFormat, ReportsArgs, RuleArg, ServeArgs};

#[derive(Debug, Parser)]
#[command(name = "ohanami")]
#[command(about = "WordPress fleet inventory collector and report sink", version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Scan web roots, collect site metadata and optionally send the report.
    Collect(CollectArgs),
    /// Validate a report document and persist it into the report database.
    Ingest(IngestArgs),
    /// List the most recent persisted reports.
    Reports(ReportsArgs),
    /// Serve the HTTP report sink that collectors send to.
    Serve(ServeArgs),
}
