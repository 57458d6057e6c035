//! Job request construction

use super::{FileRef, JobRequest};

/// Prompt used when the client sends no task text
pub const DEFAULT_TASK: &str = "The following are legal documents that I would like analyzed. \
I need to understand the key important pieces with the relevant cited language as well as any \
language that can be loosely interpreted.";

/// Assembles a [`JobRequest`] from inbound client data.
///
/// The builder never rejects input. Callers decide whether an empty file list
/// is acceptable before getting here.
#[derive(Debug, Clone)]
pub struct JobRequestBuilder {
    task: Option<String>,
    default_task: String,
    report_type: String,
    sources: Vec<String>,
    files: Vec<FileRef>,
    cadence: Option<String>,
    edits: Option<String>,
}

impl JobRequestBuilder {
    pub fn new(report_type: impl Into<String>) -> Self {
        Self {
            task: None,
            default_task: DEFAULT_TASK.to_string(),
            report_type: report_type.into(),
            sources: Vec::new(),
            files: Vec::new(),
            cadence: None,
            edits: None,
        }
    }

    /// Set the client-supplied task. Blank text falls back to the default prompt.
    pub fn task(mut self, task: impl Into<String>) -> Self {
        self.task = Some(task.into());
        self
    }

    pub fn maybe_task(mut self, task: Option<String>) -> Self {
        self.task = task;
        self
    }

    /// Override the fallback prompt (from config)
    pub fn default_task(mut self, task: impl Into<String>) -> Self {
        self.default_task = task.into();
        self
    }

    pub fn sources(mut self, sources: Vec<String>) -> Self {
        self.sources = sources;
        self
    }

    pub fn files(mut self, files: Vec<FileRef>) -> Self {
        self.files = files;
        self
    }

    pub fn cadence(mut self, cadence: Option<String>) -> Self {
        self.cadence = cadence;
        self
    }

    pub fn edits(mut self, edits: Option<String>) -> Self {
        self.edits = edits;
        self
    }

    pub fn build(self) -> JobRequest {
        let task = match self.task {
            Some(task) if !task.trim().is_empty() => task.trim().to_string(),
            _ => self.default_task,
        };

        JobRequest {
            id: uuid::Uuid::new_v4().to_string(),
            task,
            report_type: self.report_type,
            sources: self.sources,
            file_refs: self.files,
            cadence: self.cadence,
            edits: self.edits,
        }
    }
}
