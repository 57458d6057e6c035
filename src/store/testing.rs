use std::sync::Mutex;

use async_trait::async_trait;

use super::{PersistError, TranscriptSink};
use crate::domain::{JobId, JobRequest};

/// Sink that remembers every save call
#[derive(Default)]
pub(crate) struct RecordingSink {
    saved: Mutex<Vec<(JobId, String)>>,
    fail: bool,
}

impl RecordingSink {
    pub fn failing() -> Self {
        Self {
            saved: Mutex::new(Vec::new()),
            fail: true,
        }
    }

    pub fn saved(&self) -> Vec<(JobId, String)> {
        self.saved.lock().unwrap().clone()
    }
}

#[async_trait]
impl TranscriptSink for RecordingSink {
    async fn save(&self, request: &JobRequest, transcript: &str) -> Result<(), PersistError> {
        self.saved
            .lock()
            .unwrap()
            .push((request.id.clone(), transcript.to_string()));
        if self.fail {
            return Err(PersistError::Poisoned);
        }
        Ok(())
    }
}
