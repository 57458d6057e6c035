//! Core domain types for jobstream

mod event;
mod job;

pub use event::{EventDecodeError, StreamEvent};
pub use job::{
    ConnectionState, DEFAULT_TASK, FileRef, JobId, JobOutcome, JobReport, JobRequest,
    JobRequestBuilder, PersistStatus, ReportStyle,
};
