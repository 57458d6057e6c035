//! History command implementation

use anyhow::Result;

use jobstream::config::Config;
use jobstream::store::TranscriptDb;

const PREVIEW_CHARS: usize = 100;

/// List recently saved transcripts
pub async fn history_command(config: &Config, limit: usize) -> Result<()> {
    let db = TranscriptDb::open(&config.db_path())?;
    let records = db.recent(limit)?;

    if records.is_empty() {
        println!("No transcripts saved yet.");
        return Ok(());
    }

    println!("Transcripts ({}):\n", records.len());

    for record in records {
        println!(
            "  {} [{}] {}",
            record.created_at.format("%Y-%m-%d %H:%M:%S"),
            record.report_type,
            record.job_id
        );
        println!("    Task: {}", preview(&record.task));
        if !record.file_urls.is_empty() {
            println!("    Files: {}", record.file_urls.len());
        }
        println!("    {}", preview(&record.transcript));
        println!();
    }

    Ok(())
}

fn preview(text: &str) -> String {
    let line = text.split_whitespace().collect::<Vec<_>>().join(" ");
    if line.chars().count() <= PREVIEW_CHARS {
        return line;
    }
    let cut: String = line.chars().take(PREVIEW_CHARS).collect();
    format!("{}...", cut)
}
