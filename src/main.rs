use std::path::PathBuf;

use clap::Parser;
use qb_item_bills::io::excel_read::DEFAULT_SHEET;
use qb_item_bills::io::report::DEFAULT_REPORT_NAME;
use qb_item_bills::io::session::{self, QuickBooksGateway};
use qb_item_bills::model::ReconciliationReport;
use qb_item_bills::sync::{self, SyncOptions};
use qb_item_bills::{Result, ToolError};
use tracing_subscriber::EnvFilter;

fn main() {
    let cli = Cli::parse();
    match run(cli) {
        Ok(report) if report.is_success() => {}
        Ok(report) => {
            if let Some(message) = report.error {
                eprintln!("error: {message}");
            }
            std::process::exit(1);
        }
        Err(error) => {
            eprintln!("error: {error}");
            std::process::exit(1);
        }
    }
}

fn run(cli: Cli) -> Result<ReconciliationReport> {
    init_logging()?;

    // Additions need a writable QuickBooks session, which the binary cannot
    // open, so it only ever reconciles.
    let options = SyncOptions {
        sheet: cli.sheet,
        output: cli.output,
        ..SyncOptions::new(cli.workbook)
    };
    let replay = cli.qbxml_response;

    let report = sync::sync_item_bills(&options, || {
        session::open_processor(replay.as_deref()).map(QuickBooksGateway::new)
    })?;
    println!("Report written to {}", options.output.display());
    Ok(report)
}

fn init_logging() -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init()
        .map_err(|error| ToolError::Logging(error.to_string()))
}

#[derive(Parser)]
#[command(
    author,
    version,
    about = "Reconcile item bills between an Excel workbook and QuickBooks Desktop."
)]
struct Cli {
    /// Excel workbook containing the item bills worksheet.
    #[arg(long)]
    workbook: PathBuf,

    /// JSON report output path.
    #[arg(long, default_value = DEFAULT_REPORT_NAME)]
    output: PathBuf,

    /// Worksheet holding the item bills.
    #[arg(long, default_value = DEFAULT_SHEET)]
    sheet: String,

    /// Saved QBXML bill query response to reconcile against instead of a
    /// live QuickBooks session.
    #[arg(long)]
    qbxml_response: Option<PathBuf>,
}
