use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::{JobId, JobRequest};

/// One persisted job transcript
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TranscriptRecord {
    pub job_id: JobId,
    /// Task text the job ran with
    pub task: String,
    pub report_type: String,
    pub sources: Vec<String>,
    pub file_urls: Vec<String>,
    pub transcript: String,
    pub created_at: DateTime<Utc>,
}

impl TranscriptRecord {
    pub fn from_job(request: &JobRequest, transcript: &str) -> Self {
        Self {
            job_id: request.id.clone(),
            task: request.task.clone(),
            report_type: request.report_type.clone(),
            sources: request.sources.clone(),
            file_urls: request.file_refs.iter().map(|f| f.url.clone()).collect(),
            transcript: transcript.to_string(),
            created_at: Utc::now(),
        }
    }
}
