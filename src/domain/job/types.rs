use serde::{Deserialize, Serialize};

/// An already-uploaded file: signed URL plus its storage path
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileRef {
    pub url: String,
    pub path: String,
}

impl FileRef {
    pub fn new(url: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            path: path.into(),
        }
    }

    /// Parse the CLI form `path=url`. A value without `=` is used as both.
    ///
    /// Only the first `=` separates, signed URLs carry their own in the query.
    pub fn parse(value: &str) -> Self {
        match value.split_once('=') {
            Some((path, url)) if !path.is_empty() && !url.is_empty() => Self::new(url, path),
            _ => Self::new(value, value),
        }
    }
}

/// Newsletter style, mapped to the worker's report type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum ReportStyle {
    Succinct,
    Standard,
    InDepth,
}

impl ReportStyle {
    pub fn report_type(&self) -> &'static str {
        match self {
            ReportStyle::Succinct => "newsletter_paragraph",
            ReportStyle::Standard => "newsletter_report",
            ReportStyle::InDepth => "detailed_report",
        }
    }
}
