//! Transcript persistence.
//!
//! A finished job's transcript is written once, by whoever ran the job (the
//! bridge task or the direct client). The sink itself does not deduplicate.
//!
//! ```text
//!   Bridge / run_direct ──save()──▶ TranscriptSink ──▶ ~/.jobstream/transcripts.db
//! ```

mod db;
mod record;

#[cfg(test)]
pub(crate) mod testing;

pub use db::TranscriptDb;
pub use record::TranscriptRecord;

use async_trait::async_trait;

use crate::domain::JobRequest;

/// Saving a transcript failed. Logged and reported, never retried.
#[derive(Debug, thiserror::Error)]
pub enum PersistError {
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("failed to encode record: {0}")]
    Encode(#[from] serde_json::Error),

    #[error("transcript store lock poisoned")]
    Poisoned,

    #[error("storage task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

/// Destination for finished transcripts
#[async_trait]
pub trait TranscriptSink: Send + Sync {
    async fn save(&self, request: &JobRequest, transcript: &str) -> Result<(), PersistError>;
}
