//! Run command implementation (direct worker connection, no bridge)

use anyhow::{Result, bail};

use jobstream::config::Config;
use jobstream::domain::{FileRef, ReportStyle};
use jobstream::store::TranscriptDb;
use jobstream::worker::{WsTransport, run_direct};

use super::TranscriptPrinter;

/// Options for `jobstream run`
pub struct RunArgs {
    pub task: Option<String>,
    pub files: Vec<String>,
    pub style: Option<ReportStyle>,
    pub report_type: Option<String>,
    pub sources: Vec<String>,
    pub cadence: Option<String>,
    pub edits: Option<String>,
    pub worker: Option<String>,
}

/// Run one job straight against the worker and print the transcript as it grows
pub async fn run_command(config: &Config, args: RunArgs) -> Result<()> {
    if args.files.is_empty() {
        bail!("At least one --file is required");
    }

    let report_type = args
        .report_type
        .or_else(|| args.style.map(|s| s.report_type().to_string()));
    let mut builder = config
        .job_builder(report_type)
        .maybe_task(args.task)
        .files(args.files.iter().map(|f| FileRef::parse(f)).collect())
        .cadence(args.cadence)
        .edits(args.edits);
    if !args.sources.is_empty() {
        builder = builder.sources(args.sources);
    }
    let request = builder.build();

    let worker_url = args.worker.unwrap_or_else(|| config.worker.url.clone());
    let db = TranscriptDb::open(&config.db_path())?;

    let mut printer = TranscriptPrinter::default();
    let outcome = run_direct(
        &WsTransport,
        &db,
        &worker_url,
        &config.retry_policy(),
        &request,
        |total| printer.update(total),
    )
    .await?;
    printer.finish();

    if outcome.completed {
        eprintln!("Job {} complete.", request.id);
    } else {
        eprintln!("Worker closed before completing job {}.", request.id);
    }

    Ok(())
}
