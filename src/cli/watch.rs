//! Watch command implementation

use anyhow::{Context, Result};

use jobstream::bridge::HttpStreamClient;
use jobstream::config::Config;
use jobstream::domain::FileRef;
use jobstream::server::AnalyzeRequest;

use super::TranscriptPrinter;

/// Options for `jobstream watch`
pub struct WatchArgs {
    pub url: Option<String>,
    pub task: Option<String>,
    pub files: Vec<String>,
    pub report_type: Option<String>,
    pub sources: Vec<String>,
    pub token: Option<String>,
}

/// Submit a job to a running bridge server and print the stream
pub async fn watch_command(config: &Config, args: WatchArgs) -> Result<()> {
    let url = args
        .url
        .unwrap_or_else(|| format!("http://127.0.0.1:{}/analyze", config.server.port));
    let token = args
        .token
        .or_else(|| config.auth_token().map(str::to_string));

    let request = AnalyzeRequest {
        task: args.task,
        files: args.files.iter().map(|f| FileRef::parse(f)).collect(),
        report_type: args.report_type,
        sources: (!args.sources.is_empty()).then_some(args.sources),
        cadence: None,
        edits: None,
    };

    let outcome = tokio::task::spawn_blocking(move || {
        let mut printer = TranscriptPrinter::default();
        let outcome = HttpStreamClient::new(url)
            .with_token(token)
            .analyze(&request, |total| printer.update(total));
        printer.finish();
        outcome
    })
    .await
    .context("Stream reader panicked")??;

    if outcome.transcript.is_empty() {
        eprintln!("Stream ended without report output.");
    }

    Ok(())
}
