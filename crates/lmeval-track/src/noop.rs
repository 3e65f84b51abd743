use async_trait::async_trait;

use lmeval_core::error::RecordingError;
use lmeval_core::recorder::{Recorder, RunRecord};

/// Recorder used when tracking is disabled. Accepts and drops every run.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopRecorder;

#[async_trait]
impl Recorder for NoopRecorder {
    async fn record(&self, run: &RunRecord) -> Result<(), RecordingError> {
        tracing::debug!(run_name = %run.run_name, "tracking disabled, dropping run");
        Ok(())
    }
}
