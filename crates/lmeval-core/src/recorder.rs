use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::RecordingError;

/// Artifact file name the results table is stored under.
pub const RESULTS_ARTIFACT: &str = "eval_results.json";

/// Terminal status of a recorded run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RunStatus {
    Finished,
    Failed,
}

impl RunStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Finished => "FINISHED",
            Self::Failed => "FAILED",
        }
    }
}

impl std::fmt::Display for RunStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Per-case results table, in the `{"columns": [...], "data": [[...]]}`
/// shape the tracking UI renders as a table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResultTable {
    pub columns: Vec<String>,
    pub data: Vec<Vec<Value>>,
}

impl ResultTable {
    pub fn new() -> Self {
        Self {
            columns: ["question", "reference", "completion", "similarity"]
                .into_iter()
                .map(String::from)
                .collect(),
            data: Vec::new(),
        }
    }

    pub fn push_row(&mut self, question: &str, reference: &str, completion: &str, similarity: f64) {
        self.data.push(vec![
            Value::from(question),
            Value::from(reference),
            Value::from(completion),
            Value::from(similarity),
        ]);
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

impl Default for ResultTable {
    fn default() -> Self {
        Self::new()
    }
}

/// Everything the loop persists for one model.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunRecord {
    pub experiment: String,
    pub run_name: String,
    pub status: RunStatus,
    pub params: Vec<(String, String)>,
    pub metrics: Vec<(String, f64)>,
    #[serde(default)]
    pub table: Option<ResultTable>,
    #[serde(default)]
    pub error: Option<String>,
}

impl RunRecord {
    pub fn new(experiment: impl Into<String>, run_name: impl Into<String>) -> Self {
        Self {
            experiment: experiment.into(),
            run_name: run_name.into(),
            status: RunStatus::Finished,
            params: Vec::new(),
            metrics: Vec::new(),
            table: None,
            error: None,
        }
    }

    pub fn with_param(mut self, key: impl Into<String>, value: impl ToString) -> Self {
        self.params.push((key.into(), value.to_string()));
        self
    }

    pub fn with_metric(mut self, key: impl Into<String>, value: f64) -> Self {
        self.metrics.push((key.into(), value));
        self
    }

    pub fn with_table(mut self, table: ResultTable) -> Self {
        self.table = Some(table);
        self
    }

    pub fn failed(mut self, error: impl Into<String>) -> Self {
        self.status = RunStatus::Failed;
        self.error = Some(error.into());
        self
    }

    pub fn param(&self, key: &str) -> Option<&str> {
        self.params
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    pub fn metric(&self, key: &str) -> Option<f64> {
        self.metrics.iter().find(|(k, _)| k == key).map(|(_, v)| *v)
    }
}

/// Write-only sink for evaluation runs. The loop never reads state back.
#[async_trait]
pub trait Recorder: Send + Sync {
    /// Persist one run: parameters, metrics, and the optional results table.
    async fn record(&self, run: &RunRecord) -> Result<(), RecordingError>;

    /// Base URL of the UI where recorded runs can be browsed, if any.
    fn ui_url(&self) -> Option<&str> {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn run_status_serde() {
        assert_eq!(
            serde_json::to_string(&RunStatus::Finished).unwrap(),
            "\"FINISHED\""
        );
        assert_eq!(RunStatus::Failed.to_string(), "FAILED");
    }

    #[test]
    fn table_json_shape() {
        let mut table = ResultTable::new();
        table.push_row("2+2?", "4", "4", 1.0);
        assert_eq!(table.len(), 1);

        let value: Value = serde_json::from_str(&table.to_json().unwrap()).unwrap();
        assert_eq!(
            value,
            json!({
                "columns": ["question", "reference", "completion", "similarity"],
                "data": [["2+2?", "4", "4", 1.0]]
            })
        );
    }

    #[test]
    fn record_builder() {
        let run = RunRecord::new("exp", "llama3-simple-eval")
            .with_param("model", "llama3")
            .with_param("num_samples", 7)
            .with_metric("avg_similarity", 0.5);
        assert_eq!(run.status, RunStatus::Finished);
        assert_eq!(run.param("num_samples"), Some("7"));
        assert_eq!(run.metric("avg_similarity"), Some(0.5));
        assert!(run.param("missing").is_none());
        assert!(run.table.is_none());
    }

    #[test]
    fn failed_record() {
        let run = RunRecord::new("exp", "m-simple-eval").failed("connection refused");
        assert_eq!(run.status, RunStatus::Failed);
        assert_eq!(run.error.as_deref(), Some("connection refused"));
    }
}
