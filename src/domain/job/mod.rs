mod builder;
mod result;
mod status;
mod types;

pub use builder::{DEFAULT_TASK, JobRequestBuilder};
pub use result::{JobOutcome, JobReport, PersistStatus};
pub use status::ConnectionState;
pub use types::{FileRef, ReportStyle};

use serde::Serialize;

/// Unique identifier for a job (UUID v4 string)
pub type JobId = String;

/// A job request as handed to the worker.
///
/// Built once per job by [`JobRequestBuilder`] and never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobRequest {
    /// Identifier used for the persisted transcript record (not sent to the worker)
    pub id: JobId,

    /// Task text (the prompt the worker runs)
    pub task: String,

    /// Worker report type tag (e.g. "research_report", "detailed_report")
    pub report_type: String,

    /// Source selectors (e.g. ["WEB"])
    pub sources: Vec<String>,

    /// Already-uploaded files the worker should read
    pub file_refs: Vec<FileRef>,

    /// Newsletter cadence, passed through when set
    pub cadence: Option<String>,

    /// Edit notes ("user-retained: ... user-deleted: ..."), passed through when set
    pub edits: Option<String>,
}

/// Wire shape of the job request sent on the worker socket.
#[derive(Serialize)]
struct WireJobRequest<'a> {
    task: &'a str,
    report_type: &'a str,
    sources: &'a [String],
    file_urls: Vec<&'a str>,
    file_paths: Vec<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    cadence: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    edits: Option<&'a str>,
}

impl JobRequest {
    /// Serialize into the document the worker expects immediately after open
    pub fn to_wire_json(&self) -> Result<String, serde_json::Error> {
        let wire = WireJobRequest {
            task: &self.task,
            report_type: &self.report_type,
            sources: &self.sources,
            file_urls: self.file_refs.iter().map(|f| f.url.as_str()).collect(),
            file_paths: self.file_refs.iter().map(|f| f.path.as_str()).collect(),
            cadence: self.cadence.as_deref(),
            edits: self.edits.as_deref(),
        };
        serde_json::to_string(&wire)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wire_json_splits_file_refs() {
        let request = JobRequestBuilder::new("research_report")
            .task("Summarize")
            .sources(vec!["WEB".to_string()])
            .files(vec![
                FileRef::new("https://cdn.example/a.pdf?sig=1", "uploads/a.pdf"),
                FileRef::new("https://cdn.example/b.pdf", "uploads/b.pdf"),
            ])
            .build();

        let json: serde_json::Value =
            serde_json::from_str(&request.to_wire_json().unwrap()).unwrap();

        assert_eq!(json["task"], "Summarize");
        assert_eq!(json["report_type"], "research_report");
        assert_eq!(json["sources"], serde_json::json!(["WEB"]));
        assert_eq!(
            json["file_urls"],
            serde_json::json!(["https://cdn.example/a.pdf?sig=1", "https://cdn.example/b.pdf"])
        );
        assert_eq!(
            json["file_paths"],
            serde_json::json!(["uploads/a.pdf", "uploads/b.pdf"])
        );
        assert!(json.get("cadence").is_none());
        assert!(json.get("edits").is_none());
        assert!(json.get("id").is_none());
    }

    #[test]
    fn test_wire_json_includes_optional_fields_when_set() {
        let request = JobRequestBuilder::new("newsletter_report")
            .task("AI regulation")
            .cadence(Some("0 0 * * 0".to_string()))
            .edits(Some("user-retained: intro".to_string()))
            .build();

        let json: serde_json::Value =
            serde_json::from_str(&request.to_wire_json().unwrap()).unwrap();
        assert_eq!(json["cadence"], "0 0 * * 0");
        assert_eq!(json["edits"], "user-retained: intro");
        assert_eq!(json["file_urls"], serde_json::json!([]));
    }
}
