use std::collections::HashSet;
use std::sync::RwLock;

use async_trait::async_trait;

use lmeval_core::error::RecordingError;
use lmeval_core::recorder::{Recorder, RunRecord};

/// In-memory recorder for testing and dry runs.
///
/// Thread-safe via `RwLock`. All data is lost when the recorder is dropped.
#[derive(Default)]
pub struct InMemoryRecorder {
    runs: RwLock<Vec<RunRecord>>,
    /// Run names whose `record` call is rejected.
    reject: HashSet<String>,
}

impl InMemoryRecorder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reject any run with this name, as an unavailable tracking server would.
    pub fn rejecting(mut self, run_name: impl Into<String>) -> Self {
        self.reject.insert(run_name.into());
        self
    }

    /// Snapshot of every accepted run, in record order.
    pub fn runs(&self) -> Vec<RunRecord> {
        self.runs.read().unwrap().clone()
    }

    pub fn find(&self, run_name: &str) -> Option<RunRecord> {
        self.runs
            .read()
            .unwrap()
            .iter()
            .find(|r| r.run_name == run_name)
            .cloned()
    }
}

#[async_trait]
impl Recorder for InMemoryRecorder {
    async fn record(&self, run: &RunRecord) -> Result<(), RecordingError> {
        if self.reject.contains(&run.run_name) {
            return Err(RecordingError::Status {
                status: 503,
                message: format!("run '{}' rejected", run.run_name),
            });
        }
        self.runs.write().unwrap().push(run.clone());
        Ok(())
    }

    fn ui_url(&self) -> Option<&str> {
        Some("memory://")
    }
}
