//! SQLite transcript store
//!
//! Manages `~/.jobstream/transcripts.db` with versioned schema setup.

use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rusqlite::Connection;
use tracing::{error, info};

use super::{PersistError, TranscriptRecord, TranscriptSink};
use crate::config::Config;
use crate::domain::JobRequest;

const SCHEMA_VERSION: i32 = 1;

const SCHEMA_SQL: &str = r#"
CREATE TABLE IF NOT EXISTS schema_version (
    version INTEGER PRIMARY KEY
);

CREATE TABLE IF NOT EXISTS transcripts (
    job_id TEXT NOT NULL,
    task TEXT NOT NULL,
    report_type TEXT NOT NULL,
    sources TEXT NOT NULL,      -- JSON array
    file_urls TEXT NOT NULL,    -- JSON array
    transcript TEXT NOT NULL,
    created_at INTEGER NOT NULL -- unix millis
);
CREATE INDEX IF NOT EXISTS idx_transcripts_job ON transcripts(job_id);
CREATE INDEX IF NOT EXISTS idx_transcripts_created ON transcripts(created_at);
"#;

/// Transcript database handle, cheap to clone
#[derive(Clone)]
pub struct TranscriptDb {
    conn: Arc<Mutex<Connection>>,
}

impl TranscriptDb {
    /// Open or create the database at the default location (~/.jobstream/transcripts.db)
    pub fn open_default() -> Result<Self> {
        Self::open(&Config::global_config_dir().join("transcripts.db"))
    }

    /// Open or create the database at a specific path
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create store dir: {}", parent.display()))?;
        }

        let conn = Connection::open(path)
            .with_context(|| format!("Failed to open transcript db: {}", path.display()))?;
        conn.pragma_update(None, "journal_mode", "WAL")?;
        conn.pragma_update(None, "synchronous", "NORMAL")?;

        conn.execute_batch(SCHEMA_SQL)
            .context("Failed to initialize transcript schema")?;
        conn.execute(
            "INSERT OR IGNORE INTO schema_version (version) VALUES (?1)",
            [SCHEMA_VERSION],
        )?;

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    fn conn(&self) -> Result<MutexGuard<'_, Connection>, PersistError> {
        self.conn.lock().map_err(|_| PersistError::Poisoned)
    }

    pub fn insert(&self, record: &TranscriptRecord) -> Result<(), PersistError> {
        let sources = serde_json::to_string(&record.sources)?;
        let file_urls = serde_json::to_string(&record.file_urls)?;

        let conn = self.conn()?;
        conn.execute(
            r#"INSERT INTO transcripts
               (job_id, task, report_type, sources, file_urls, transcript, created_at)
               VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)"#,
            rusqlite::params![
                record.job_id,
                record.task,
                record.report_type,
                sources,
                file_urls,
                record.transcript,
                record.created_at.timestamp_millis(),
            ],
        )?;
        Ok(())
    }

    /// Most recent transcripts first
    pub fn recent(&self, limit: usize) -> Result<Vec<TranscriptRecord>, PersistError> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            r#"SELECT job_id, task, report_type, sources, file_urls, transcript, created_at
               FROM transcripts ORDER BY created_at DESC, rowid DESC LIMIT ?1"#,
        )?;

        let rows = stmt.query_map([limit as i64], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, String>(2)?,
                row.get::<_, String>(3)?,
                row.get::<_, String>(4)?,
                row.get::<_, String>(5)?,
                row.get::<_, i64>(6)?,
            ))
        })?;

        let mut records = Vec::new();
        for row in rows {
            let (job_id, task, report_type, sources, file_urls, transcript, created_at) = row?;
            records.push(TranscriptRecord {
                job_id,
                task,
                report_type,
                sources: serde_json::from_str(&sources)?,
                file_urls: serde_json::from_str(&file_urls)?,
                transcript,
                created_at: DateTime::<Utc>::from_timestamp_millis(created_at).unwrap_or_default(),
            });
        }
        Ok(records)
    }
}

#[async_trait]
impl TranscriptSink for TranscriptDb {
    async fn save(&self, request: &JobRequest, transcript: &str) -> Result<(), PersistError> {
        let record = TranscriptRecord::from_job(request, transcript);
        let db = self.clone();
        let job_id = record.job_id.clone();
        let bytes = record.transcript.len();

        let result = tokio::task::spawn_blocking(move || db.insert(&record)).await?;
        match &result {
            Ok(()) => info!("[jobstream:store] saved job {} ({} bytes)", job_id, bytes),
            Err(e) => error!("[jobstream:store] failed to save job {}: {}", job_id, e),
        }
        result
    }
}
