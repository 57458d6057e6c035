use serde::{Deserialize, Serialize};

use super::{ConnectionState, JobId};

/// What a job produced by the time its socket closed
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobOutcome {
    /// Concatenation of every report fragment, in arrival order
    pub transcript: String,
    /// Whether the worker sent its `complete` event
    pub completed: bool,
}

/// Result of the single persistence check at the end of a job
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase", tag = "status", content = "reason")]
pub enum PersistStatus {
    /// Transcript was empty, nothing written
    Skipped,
    Saved,
    Failed(String),
}

/// Summary returned by a bridge job task when it ends
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobReport {
    pub job_id: JobId,
    /// Terminal connection state
    pub state: ConnectionState,
    pub outcome: JobOutcome,
    pub persist: PersistStatus,
}
