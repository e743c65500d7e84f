//! Reporter that records fatal outcomes for later assertions

use parking_lot::Mutex;

use crate::pusher::{FailureReporter, PushError};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedReport {
    pub message: String,
    /// Debug rendering of the cause
    pub cause: String,
}

#[derive(Debug, Default)]
pub struct RecordingReporter {
    reports: Mutex<Vec<RecordedReport>>,
}

impl RecordingReporter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reports(&self) -> Vec<RecordedReport> {
        self.reports.lock().clone()
    }

    pub fn messages(&self) -> Vec<String> {
        self.reports.lock().iter().map(|r| r.message.clone()).collect()
    }

    pub fn count(&self) -> usize {
        self.reports.lock().len()
    }
}

impl FailureReporter for RecordingReporter {
    fn report(&self, message: &str, cause: &PushError) {
        tracing::debug!(message, "Recording push failure");
        self.reports.lock().push(RecordedReport {
            message: message.to_string(),
            cause: format!("{:?}", cause),
        });
    }
}
