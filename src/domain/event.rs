use serde::Deserialize;
use serde_json::Value;

/// An event received from the worker, discriminated by its `type` field.
///
/// Payloads are not validated beyond what each variant needs.
#[derive(Debug, Clone, PartialEq)]
pub enum StreamEvent {
    /// A fragment of generated text
    Report { output: String },
    /// Diagnostic payload, forwarded as received
    Logs(Value),
    /// Worker-side failure message, forwarded as received
    Error { message: String, raw: Value },
    /// Terminal signal
    Complete,
    /// Any other `type`, ignored
    Unknown(String),
}

#[derive(Deserialize)]
struct ReportFields {
    output: String,
}

#[derive(Deserialize)]
struct ErrorFields {
    #[serde(default)]
    message: String,
}

/// Why a frame could not be read as a [`StreamEvent`]
#[derive(Debug, thiserror::Error)]
pub enum EventDecodeError {
    #[error("frame has no string `type` field")]
    MissingType,

    #[error("invalid `{kind}` event: {source}")]
    InvalidPayload {
        kind: &'static str,
        #[source]
        source: serde_json::Error,
    },
}

impl StreamEvent {
    pub fn from_value(value: Value) -> Result<Self, EventDecodeError> {
        let kind = value
            .get("type")
            .and_then(Value::as_str)
            .ok_or(EventDecodeError::MissingType)?
            .to_string();

        match kind.as_str() {
            "report" => {
                let fields: ReportFields = serde_json::from_value(value).map_err(|source| {
                    EventDecodeError::InvalidPayload {
                        kind: "report",
                        source,
                    }
                })?;
                Ok(StreamEvent::Report {
                    output: fields.output,
                })
            }
            "logs" => Ok(StreamEvent::Logs(value)),
            "error" => {
                let fields: ErrorFields =
                    serde_json::from_value(value.clone()).map_err(|source| {
                        EventDecodeError::InvalidPayload {
                            kind: "error",
                            source,
                        }
                    })?;
                Ok(StreamEvent::Error {
                    message: fields.message,
                    raw: value,
                })
            }
            "complete" => Ok(StreamEvent::Complete),
            _ => Ok(StreamEvent::Unknown(kind)),
        }
    }

    pub fn kind(&self) -> &str {
        match self {
            StreamEvent::Report { .. } => "report",
            StreamEvent::Logs(_) => "logs",
            StreamEvent::Error { .. } => "error",
            StreamEvent::Complete => "complete",
            StreamEvent::Unknown(kind) => kind,
        }
    }
}
