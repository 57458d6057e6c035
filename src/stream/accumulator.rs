use crate::domain::{JobOutcome, StreamEvent};

/// Running transcript for one job.
///
/// `append` is the only mutator. Once `complete` has been seen every further
/// event is ignored, so a misbehaving worker cannot grow the transcript.
#[derive(Debug, Default, Clone)]
pub struct Accumulator {
    transcript: String,
    completed: bool,
}

impl Accumulator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold one event in and return the current transcript
    pub fn append(&mut self, event: &StreamEvent) -> &str {
        if self.completed {
            tracing::debug!(
                "[jobstream:stream] ignoring {} event after complete",
                event.kind()
            );
            return &self.transcript;
        }

        match event {
            StreamEvent::Report { output } => self.transcript.push_str(output),
            StreamEvent::Complete => self.completed = true,
            StreamEvent::Logs(_) | StreamEvent::Error { .. } | StreamEvent::Unknown(_) => {}
        }
        &self.transcript
    }

    pub fn transcript(&self) -> &str {
        &self.transcript
    }

    pub fn is_completed(&self) -> bool {
        self.completed
    }

    pub fn into_outcome(self) -> JobOutcome {
        JobOutcome {
            transcript: self.transcript,
            completed: self.completed,
        }
    }
}
