//! Delimited JSON frame parsing and encoding.
//!
//! Worker socket payloads are separated by a single `\n`, the outbound HTTP
//! stream by a blank line (`\n\n`). In both cases the split happens after the
//! new chunk is appended to the residual buffer, and a trailing incomplete
//! frame is held back for the next call.

use serde::Serialize;
use serde_json::Value;

const LINE: &[u8] = b"\n";
const BLANK_LINE: &[u8] = b"\n\n";

/// One frame that could not be parsed. Non-fatal: parsing continues.
#[derive(Debug, thiserror::Error)]
#[error("malformed frame: {source} (frame: {frame})")]
pub struct FrameError {
    pub frame: String,
    #[source]
    pub source: serde_json::Error,
}

/// Splits a byte stream into JSON frames, keeping a residual across calls
#[derive(Debug, Clone)]
pub struct FrameParser {
    delimiter: &'static [u8],
    residual: Vec<u8>,
}

impl FrameParser {
    /// Parser for raw worker socket payloads
    pub fn line_delimited() -> Self {
        Self {
            delimiter: LINE,
            residual: Vec::new(),
        }
    }

    /// Parser for the outbound HTTP event stream
    pub fn blank_line_delimited() -> Self {
        Self {
            delimiter: BLANK_LINE,
            residual: Vec::new(),
        }
    }

    /// Bytes received but not yet part of a complete frame
    pub fn residual(&self) -> &[u8] {
        &self.residual
    }

    /// Append `chunk` and return every frame completed by it, in order
    pub fn feed(&mut self, chunk: impl AsRef<[u8]>) -> Vec<Result<Value, FrameError>> {
        self.residual.extend_from_slice(chunk.as_ref());

        let mut frames = Vec::new();
        let mut start = 0;
        while let Some(offset) = find(&self.residual[start..], self.delimiter) {
            let end = start + offset;
            if let Some(frame) = parse_frame(&self.residual[start..end]) {
                frames.push(frame);
            }
            start = end + self.delimiter.len();
        }
        self.residual.drain(..start);
        frames
    }

    /// Release the residual if it already holds one complete JSON document.
    ///
    /// A websocket message ends a frame even without a trailing newline. A
    /// residual cut short (end-of-input error) stays buffered; any other
    /// syntax error is reported and the residual dropped.
    pub fn take_trailing_frame(&mut self) -> Option<Result<Value, FrameError>> {
        if is_blank(&self.residual) {
            self.residual.clear();
            return None;
        }

        match serde_json::from_slice::<Value>(&self.residual) {
            Ok(value) => {
                self.residual.clear();
                Some(Ok(value))
            }
            Err(e) if e.is_eof() => None,
            Err(source) => {
                let frame = String::from_utf8_lossy(&self.residual).into_owned();
                self.residual.clear();
                Some(Err(FrameError { frame, source }))
            }
        }
    }

    /// End of stream: whatever is left is the final frame
    pub fn finish(&mut self) -> Option<Result<Value, FrameError>> {
        let residual = std::mem::take(&mut self.residual);
        parse_frame(&residual)
    }
}

fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack
        .windows(needle.len())
        .position(|window| window == needle)
}

fn is_blank(bytes: &[u8]) -> bool {
    bytes.iter().all(u8::is_ascii_whitespace)
}

fn parse_frame(bytes: &[u8]) -> Option<Result<Value, FrameError>> {
    if is_blank(bytes) {
        return None;
    }
    Some(
        serde_json::from_slice::<Value>(bytes).map_err(|source| FrameError {
            frame: String::from_utf8_lossy(bytes).trim().to_string(),
            source,
        }),
    )
}

#[derive(Serialize)]
struct ReportFrame<'a> {
    #[serde(rename = "type")]
    kind: &'static str,
    output: &'a str,
    #[serde(rename = "accumulatedOutput")]
    accumulated_output: &'a str,
}

/// Encode an outbound report frame carrying the fragment and the full transcript
pub fn encode_report_frame(output: &str, accumulated: &str) -> Result<String, serde_json::Error> {
    let frame = ReportFrame {
        kind: "report",
        output,
        accumulated_output: accumulated,
    };
    Ok(format!("{}\n\n", serde_json::to_string(&frame)?))
}

/// Encode a payload verbatim as an outbound frame
pub fn encode_frame(value: &Value) -> Result<String, serde_json::Error> {
    Ok(format!("{}\n\n", serde_json::to_string(value)?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn values(results: Vec<Result<Value, FrameError>>) -> Vec<Value> {
        results.into_iter().map(|r| r.unwrap()).collect()
    }

    const STREAM: &str = concat!(
        r#"{"type":"report","output":"Hello ","accumulatedOutput":"Hello "}"#,
        "\n\n",
        r#"{"type":"logs","output":"searching ü"}"#,
        "\n\n",
        r#"{"type":"report","output":"world","accumulatedOutput":"Hello world"}"#,
        "\n\n",
    );

    #[test]
    fn test_multiple_frames_in_one_chunk() {
        let mut parser = FrameParser::blank_line_delimited();
        let frames = values(parser.feed(STREAM));

        assert_eq!(frames.len(), 3);
        assert_eq!(frames[0]["output"], "Hello ");
        assert_eq!(frames[1]["type"], "logs");
        assert_eq!(frames[2]["accumulatedOutput"], "Hello world");
        assert!(parser.residual().is_empty());
    }

    #[test]
    fn test_split_at_every_offset_matches_single_feed() {
        let expected = values(FrameParser::blank_line_delimited().feed(STREAM));
        let bytes = STREAM.as_bytes();

        for split in 0..=bytes.len() {
            let mut parser = FrameParser::blank_line_delimited();
            let mut frames = values(parser.feed(&bytes[..split]));
            frames.extend(values(parser.feed(&bytes[split..])));
            assert_eq!(frames, expected, "split at byte {}", split);
        }
    }

    #[test]
    fn test_incomplete_frame_is_held_back() {
        let mut parser = FrameParser::line_delimited();
        let frames = parser.feed("{\"type\":\"report\",\"out");
        assert!(frames.is_empty());
        assert!(!parser.residual().is_empty());

        let frames = values(parser.feed("put\":\"abc\"}\n"));
        assert_eq!(frames, vec![json!({"type": "report", "output": "abc"})]);
        assert!(parser.residual().is_empty());
    }

    #[test]
    fn test_malformed_frame_is_isolated() {
        let mut parser = FrameParser::blank_line_delimited();
        let results = parser.feed(concat!(
            r#"{"type":"report","output":"a"}"#,
            "\n\n",
            r#"{"type":"report","output":"#,
            "\n\n",
            r#"{"type":"report","output":"b"}"#,
            "\n\n",
        ));

        assert_eq!(results.len(), 3);
        assert_eq!(results[0].as_ref().unwrap()["output"], "a");
        let err = results[1].as_ref().unwrap_err();
        assert!(err.frame.contains("\"output\":"));
        assert_eq!(results[2].as_ref().unwrap()["output"], "b");
        assert!(parser.residual().is_empty());
    }

    #[test]
    fn test_blank_frames_are_skipped() {
        let mut parser = FrameParser::line_delimited();
        let frames = values(parser.feed("\n\n{\"type\":\"complete\"}\n\r\n"));
        assert_eq!(frames, vec![json!({"type": "complete"})]);
    }

    #[test]
    fn test_take_trailing_frame() {
        let mut parser = FrameParser::line_delimited();
        assert!(parser.feed(r#"{"type":"complete"}"#).is_empty());
        let frame = parser.take_trailing_frame().unwrap().unwrap();
        assert_eq!(frame, json!({"type": "complete"}));
        assert!(parser.residual().is_empty());

        // Cut short: stays buffered for the next message
        assert!(parser.feed(r#"{"type":"report","#).is_empty());
        assert!(parser.take_trailing_frame().is_none());
        let frames = values(parser.feed("\"output\":\"x\"}\n"));
        assert_eq!(frames, vec![json!({"type": "report", "output": "x"})]);

        // Broken beyond repair: reported once and dropped
        assert!(parser.feed("{\"type\" 1}").is_empty());
        assert!(parser.take_trailing_frame().unwrap().is_err());
        assert!(parser.residual().is_empty());
    }

    #[test]
    fn test_finish_parses_final_unterminated_frame() {
        let mut parser = FrameParser::blank_line_delimited();
        assert!(parser.feed(r#"{"type":"complete"}"#).is_empty());
        let frame = parser.finish().unwrap().unwrap();
        assert_eq!(frame["type"], "complete");
        assert!(parser.finish().is_none());
    }

    #[test]
    fn test_encode_report_frame() {
        let frame = encode_report_frame("world", "Hello world").unwrap();
        assert!(frame.ends_with("\n\n"));
        let value: Value = serde_json::from_str(frame.trim_end()).unwrap();
        assert_eq!(
            value,
            json!({"type": "report", "output": "world", "accumulatedOutput": "Hello world"})
        );
    }
}
