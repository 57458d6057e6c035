//! Type definitions for the HTTP server.

use serde::{Deserialize, Serialize};

use crate::config::Config;
use crate::domain::{FileRef, JobRequest};
use crate::store::TranscriptRecord;

/// Body of `POST /analyze`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AnalyzeRequest {
    /// Instruction text. Blank or missing uses the configured default prompt.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub task: Option<String>,

    /// Already-uploaded files, at least one
    #[serde(default)]
    pub files: Vec<FileRef>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub report_type: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sources: Option<Vec<String>>,

    /// Newsletter cadence, passed through to the worker
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cadence: Option<String>,

    /// Edit notes from a previous run, passed through to the worker
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub edits: Option<String>,
}

impl AnalyzeRequest {
    /// Build the worker job, filling gaps from `config`
    pub fn into_job(self, config: &Config) -> JobRequest {
        let mut builder = config
            .job_builder(self.report_type)
            .maybe_task(self.task)
            .files(self.files)
            .cadence(self.cadence)
            .edits(self.edits);
        if let Some(sources) = self.sources {
            builder = builder.sources(sources);
        }
        builder.build()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TranscriptsResponse {
    pub transcripts: Vec<TranscriptRecord>,
}
