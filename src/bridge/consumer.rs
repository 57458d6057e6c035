//! Client side of the job stream: reads blank-line-delimited frames off an
//! HTTP response body and keeps the visible transcript current.

use std::io::{ErrorKind, Read};
use std::time::Duration;

use serde_json::Value;
use tracing::{debug, info, warn};

use crate::domain::JobOutcome;
use crate::server::{AUTH_HEADER, AnalyzeRequest};
use crate::stream::{FrameError, FrameParser};

const READ_CHUNK: usize = 8 * 1024;

#[derive(Debug, thiserror::Error)]
pub enum ConsumeError {
    #[error("failed to read job stream: {0}")]
    Read(#[from] std::io::Error),

    #[error("request to {url} failed: {source}")]
    Request {
        url: String,
        #[source]
        source: Box<ureq::Error>,
    },
}

/// Folds a job stream into a transcript.
///
/// `report` frames carry the running total in `accumulatedOutput`, which
/// replaces the transcript outright. A report without it appends `output`.
/// Frames that fail to parse are logged and skipped; a `complete` frame ends
/// reading early.
pub struct StreamConsumer<R: Read> {
    reader: R,
    parser: FrameParser,
    transcript: String,
    completed: bool,
}

impl<R: Read> StreamConsumer<R> {
    pub fn new(reader: R) -> Self {
        Self {
            reader,
            parser: FrameParser::blank_line_delimited(),
            transcript: String::new(),
            completed: false,
        }
    }

    /// Read to the end of the stream, calling `on_update` with the whole
    /// transcript each time it changes.
    pub fn run(mut self, mut on_update: impl FnMut(&str)) -> Result<JobOutcome, ConsumeError> {
        let mut buf = vec![0u8; READ_CHUNK];

        'read: loop {
            let n = match self.reader.read(&mut buf) {
                Ok(n) => n,
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => return Err(e.into()),
            };

            let frames = if n == 0 {
                self.parser.finish().into_iter().collect()
            } else {
                self.parser.feed(&buf[..n])
            };

            for frame in frames {
                if self.apply(frame, &mut on_update) {
                    debug!("[jobstream:consumer] complete frame received");
                    break 'read;
                }
            }
            if n == 0 {
                break;
            }
        }

        Ok(JobOutcome {
            transcript: self.transcript,
            completed: self.completed,
        })
    }

    /// Returns true once the stream is complete
    fn apply(
        &mut self,
        frame: Result<Value, FrameError>,
        on_update: &mut impl FnMut(&str),
    ) -> bool {
        let value = match frame {
            Ok(value) => value,
            Err(e) => {
                warn!("[jobstream:consumer] skipping frame: {}", e);
                return false;
            }
        };

        match value.get("type").and_then(Value::as_str) {
            Some("report") => {
                if let Some(total) = value.get("accumulatedOutput").and_then(Value::as_str) {
                    self.transcript.clear();
                    self.transcript.push_str(total);
                } else if let Some(output) = value.get("output").and_then(Value::as_str) {
                    self.transcript.push_str(output);
                } else {
                    return false;
                }
                on_update(&self.transcript);
                false
            }
            Some("complete") => {
                self.completed = true;
                true
            }
            Some("error") => {
                warn!("[jobstream:consumer] worker reported: {}", value);
                false
            }
            _ => false,
        }
    }
}

/// Posts analysis requests to a running bridge server and consumes the reply
#[derive(Clone)]
pub struct HttpStreamClient {
    url: String,
    token: Option<String>,
    agent: ureq::Agent,
}

impl HttpStreamClient {
    /// `url` is the full endpoint, e.g. `http://127.0.0.1:8787/analyze`
    pub fn new(url: impl Into<String>) -> Self {
        // No read timeout: reports can take minutes between fragments
        let agent = ureq::AgentBuilder::new()
            .timeout_connect(Duration::from_secs(5))
            .build();

        Self {
            url: url.into(),
            token: None,
            agent,
        }
    }

    pub fn with_token(mut self, token: Option<String>) -> Self {
        self.token = token.filter(|t| !t.is_empty());
        self
    }

    pub fn analyze(
        &self,
        request: &AnalyzeRequest,
        on_update: impl FnMut(&str),
    ) -> Result<JobOutcome, ConsumeError> {
        let mut call = self.agent.post(&self.url);
        if let Some(token) = &self.token {
            call = call.set(AUTH_HEADER, token);
        }

        info!("[jobstream:consumer] POST {}", self.url);
        let response = call
            .send_json(request)
            .map_err(|source| ConsumeError::Request {
                url: self.url.clone(),
                source: Box::new(source),
            })?;

        StreamConsumer::new(response.into_reader()).run(on_update)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Hands out the input a few bytes at a time
    struct Chunked {
        data: Vec<u8>,
        pos: usize,
        step: usize,
    }

    impl Chunked {
        fn new(data: &str, step: usize) -> Self {
            Self {
                data: data.as_bytes().to_vec(),
                pos: 0,
                step,
            }
        }
    }

    impl Read for Chunked {
        fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
            let end = (self.pos + self.step).min(self.data.len());
            let n = (end - self.pos).min(buf.len());
            buf[..n].copy_from_slice(&self.data[self.pos..self.pos + n]);
            self.pos += n;
            Ok(n)
        }
    }

    const STREAM: &str = concat!(
        "{\"type\":\"report\",\"output\":\"Hello \",\"accumulatedOutput\":\"Hello \"}\n\n",
        "{\"type\":\"logs\",\"output\":\"working\"}\n\n",
        "{\"type\":\"report\",\"output\":\"world\",\"accumulatedOutput\":\"Hello world\"}\n\n",
    );

    #[test]
    fn test_consumer_tracks_accumulated_output_across_chunk_splits() {
        for step in [1, 3, 7, 64, 4096] {
            let mut updates = Vec::new();
            let outcome = StreamConsumer::new(Chunked::new(STREAM, step))
                .run(|t| updates.push(t.to_string()))
                .unwrap();

            assert_eq!(outcome.transcript, "Hello world", "step {step}");
            assert_eq!(updates, vec!["Hello ", "Hello world"], "step {step}");
            assert!(!outcome.completed);
        }
    }

    #[test]
    fn test_consumer_appends_output_without_accumulated_field() {
        let stream = concat!(
            "{\"type\":\"report\",\"output\":\"a\"}\n\n",
            "{\"type\":\"report\",\"output\":\"b\"}\n\n",
        );
        let outcome = StreamConsumer::new(stream.as_bytes()).run(|_| {}).unwrap();
        assert_eq!(outcome.transcript, "ab");
    }

    #[test]
    fn test_consumer_skips_malformed_frames() {
        let stream = concat!(
            "{\"type\":\"report\",\"output\":\"a\",\"accumulatedOutput\":\"a\"}\n\n",
            "{broken\n\n",
            "{\"type\":\"report\",\"output\":\"b\",\"accumulatedOutput\":\"ab\"}\n\n",
        );
        let outcome = StreamConsumer::new(stream.as_bytes()).run(|_| {}).unwrap();
        assert_eq!(outcome.transcript, "ab");
    }

    #[test]
    fn test_consumer_stops_on_complete() {
        let stream = concat!(
            "{\"type\":\"report\",\"output\":\"x\",\"accumulatedOutput\":\"x\"}\n\n",
            "{\"type\":\"complete\"}\n\n",
            "{\"type\":\"report\",\"output\":\"y\",\"accumulatedOutput\":\"xy\"}\n\n",
        );
        let outcome = StreamConsumer::new(stream.as_bytes()).run(|_| {}).unwrap();
        assert_eq!(outcome.transcript, "x");
        assert!(outcome.completed);
    }

    #[test]
    fn test_consumer_parses_unterminated_final_frame() {
        let stream = "{\"type\":\"report\",\"output\":\"tail\",\"accumulatedOutput\":\"tail\"}";
        let outcome = StreamConsumer::new(stream.as_bytes()).run(|_| {}).unwrap();
        assert_eq!(outcome.transcript, "tail");
    }

    #[test]
    fn test_consumer_surfaces_read_errors() {
        struct Broken;
        impl Read for Broken {
            fn read(&mut self, _buf: &mut [u8]) -> std::io::Result<usize> {
                Err(std::io::Error::other("reset"))
            }
        }

        let err = StreamConsumer::new(Broken).run(|_| {}).unwrap_err();
        assert!(matches!(err, ConsumeError::Read(_)));
    }
}
