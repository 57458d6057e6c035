//! Streamed `text/event-stream` response over a raw connection writer.

use std::io::{self, Write};
use std::time::Duration;

use tokio::runtime::Handle;
use tracing::{debug, info, warn};

use crate::bridge::JobStream;

const RESPONSE_HEAD: &[u8] = b"HTTP/1.1 200 OK\r\n\
Content-Type: text/event-stream\r\n\
Cache-Control: no-cache\r\n\
Connection: keep-alive\r\n\
Transfer-Encoding: chunked\r\n\
\r\n";

/// Blank frame, skipped by stream parsers
const HEARTBEAT_FRAME: &str = "\n\n";

/// Chunk header that is not valid hex, so the client fails the read
/// instead of seeing a complete body
const ABORT_CHUNK: &[u8] = b"!\r\n";

/// Chunked response body, flushed after every frame
pub(crate) struct EventStreamWriter<W: Write> {
    out: W,
}

impl<W: Write> EventStreamWriter<W> {
    /// Write the response head
    pub fn start(mut out: W) -> io::Result<Self> {
        out.write_all(RESPONSE_HEAD)?;
        out.flush()?;
        Ok(Self { out })
    }

    pub fn send(&mut self, frame: &str) -> io::Result<()> {
        if frame.is_empty() {
            return Ok(());
        }
        write!(self.out, "{:X}\r\n", frame.len())?;
        self.out.write_all(frame.as_bytes())?;
        self.out.write_all(b"\r\n")?;
        self.out.flush()
    }

    /// Keep-alive frame written while the job is quiet
    pub fn heartbeat(&mut self) -> io::Result<()> {
        self.send(HEARTBEAT_FRAME)
    }

    /// Normal end of the body
    pub fn finish(mut self) -> io::Result<()> {
        self.out.write_all(b"0\r\n\r\n")?;
        self.out.flush()
    }

    /// Abnormal end of the body
    pub fn abort(mut self) -> io::Result<()> {
        self.out.write_all(ABORT_CHUNK)?;
        self.out.flush()
    }
}

/// Copy frames from `stream` to `writer` until either side ends.
///
/// After `heartbeat` without a frame a keep-alive is written, so a client that
/// left during a quiet stretch is still noticed. A failed write cancels the job.
pub(crate) fn pump<W: Write>(
    stream: &mut JobStream,
    mut writer: EventStreamWriter<W>,
    runtime: &Handle,
    heartbeat: Duration,
) {
    loop {
        let written = match runtime.block_on(stream.next_within(heartbeat)) {
            Err(_) => {
                debug!("[jobstream:http] job {} idle, sending heartbeat", stream.job_id());
                writer.heartbeat()
            }
            Ok(Some(Ok(frame))) => writer.send(&frame),
            Ok(Some(Err(e))) => {
                warn!("[jobstream:http] job {} ended with error: {}", stream.job_id(), e);
                if let Err(e) = writer.abort() {
                    info!("[jobstream:http] failed to signal abort: {}", e);
                }
                return;
            }
            Ok(None) => {
                if let Err(e) = writer.finish() {
                    info!("[jobstream:http] failed to end body: {}", e);
                }
                return;
            }
        };

        if let Err(e) = written {
            info!("[jobstream:http] client left job {}: {}", stream.job_id(), e);
            stream.cancel();
            return;
        }
    }
}
