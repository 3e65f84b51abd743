//! MLflow tracking server integration over its REST API.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use reqwest::{Client, Method};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;

use lmeval_core::config::DEFAULT_TRACKING_URL;
use lmeval_core::error::RecordingError;
use lmeval_core::recorder::{RESULTS_ARTIFACT, Recorder, RunRecord, RunStatus};

const ARTIFACT_SCHEME: &str = "mlflow-artifacts:";
// Server-side limits on param and tag values.
const MAX_PARAM_LEN: usize = 500;
const MAX_TAG_LEN: usize = 5000;

// ---------------------------------------------------------------------------
// REST request/response types
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize)]
struct CreateExperimentRequest<'a> {
    name: &'a str,
}

#[derive(Debug, Deserialize)]
struct CreateExperimentResponse {
    experiment_id: String,
}

#[derive(Debug, Deserialize)]
struct GetExperimentResponse {
    experiment: ExperimentInfo,
}

#[derive(Debug, Deserialize)]
struct ExperimentInfo {
    experiment_id: String,
}

#[derive(Debug, Serialize)]
struct CreateRunRequest<'a> {
    experiment_id: &'a str,
    run_name: &'a str,
    start_time: i64,
    tags: Vec<KeyValue>,
}

#[derive(Debug, Deserialize)]
struct CreateRunResponse {
    run: RunPayload,
}

#[derive(Debug, Deserialize)]
struct RunPayload {
    info: RunInfo,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RunInfo {
    pub run_id: String,
    #[serde(default)]
    pub artifact_uri: String,
}

#[derive(Debug, Serialize)]
struct LogBatchRequest<'a> {
    run_id: &'a str,
    metrics: Vec<Metric>,
    params: Vec<KeyValue>,
    tags: Vec<KeyValue>,
}

#[derive(Debug, Serialize)]
struct Metric {
    key: String,
    value: f64,
    timestamp: i64,
    step: i64,
}

#[derive(Debug, Serialize)]
struct KeyValue {
    key: String,
    value: String,
}

impl KeyValue {
    fn new(key: impl Into<String>, value: &str, max_len: usize) -> Self {
        Self {
            key: key.into(),
            value: value.chars().take(max_len).collect(),
        }
    }
}

#[derive(Debug, Serialize)]
struct UpdateRunRequest<'a> {
    run_id: &'a str,
    status: &'a str,
    end_time: i64,
}

#[derive(Debug, Deserialize)]
struct MlflowErrorBody {
    #[serde(default)]
    error_code: String,
    #[serde(default)]
    message: String,
}

// ---------------------------------------------------------------------------
// MlflowRecorder
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct MlflowConfig {
    pub base_url: String,
    pub timeout: Duration,
}

impl Default for MlflowConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_TRACKING_URL.into(),
            timeout: Duration::from_secs(30),
        }
    }
}

impl MlflowConfig {
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

/// Records each evaluation as one MLflow run: params and metrics through
/// `runs/log-batch`, the results table as an `eval_results.json` artifact.
pub struct MlflowRecorder {
    client: Client,
    base_url: String,
    /// experiment name → experiment id
    experiments: Mutex<HashMap<String, String>>,
}

impl MlflowRecorder {
    pub fn new(config: MlflowConfig) -> Result<Self, RecordingError> {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| RecordingError::Request(format!("failed to build HTTP client: {e}")))?;
        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            experiments: Mutex::new(HashMap::new()),
        })
    }

    fn api_url(&self, endpoint: &str) -> String {
        format!("{}/api/2.0/mlflow/{endpoint}", self.base_url)
    }

    /// Send a JSON request and decode the JSON response.
    async fn call<B, R>(
        &self,
        method: Method,
        url: String,
        query: &[(&str, &str)],
        body: Option<&B>,
    ) -> Result<R, RecordingError>
    where
        B: Serialize + ?Sized,
        R: DeserializeOwned,
    {
        let mut request = self.client.request(method, &url).query(query);
        if let Some(body) = body {
            request = request.json(body);
        }
        let resp = request
            .send()
            .await
            .map_err(|e| RecordingError::Request(format!("{url}: {e}")))?;

        let status = resp.status();
        let text = resp
            .text()
            .await
            .map_err(|e| RecordingError::Request(format!("{url}: {e}")))?;
        if !status.is_success() {
            return Err(status_error(status.as_u16(), &text));
        }
        // Several endpoints answer with an empty object.
        let text = if text.trim().is_empty() { "{}" } else { text.as_str() };
        serde_json::from_str(text)
            .map_err(|e| RecordingError::InvalidResponse(format!("{url}: {e}")))
    }

    async fn post<B, R>(&self, endpoint: &str, body: &B) -> Result<R, RecordingError>
    where
        B: Serialize + ?Sized,
        R: DeserializeOwned,
    {
        self.call(Method::POST, self.api_url(endpoint), &[], Some(body)).await
    }

    /// Resolve an experiment id by name, creating the experiment if missing.
    pub async fn experiment_id(&self, name: &str) -> Result<String, RecordingError> {
        let mut cache = self.experiments.lock().await;
        if let Some(id) = cache.get(name) {
            return Ok(id.clone());
        }

        let id = match self.get_experiment(name).await? {
            Some(id) => id,
            None => match self.create_experiment(name).await {
                Ok(id) => id,
                // Lost a creation race with another client.
                Err(RecordingError::Status { status: 400, ref message })
                    if message.contains("RESOURCE_ALREADY_EXISTS") =>
                {
                    self.get_experiment(name).await?.ok_or_else(|| {
                        RecordingError::InvalidResponse(format!(
                            "experiment '{name}' exists but could not be fetched"
                        ))
                    })?
                }
                Err(e) => return Err(e),
            },
        };

        cache.insert(name.to_string(), id.clone());
        Ok(id)
    }

    async fn get_experiment(&self, name: &str) -> Result<Option<String>, RecordingError> {
        let url = self.api_url("experiments/get-by-name");
        match self
            .call::<(), GetExperimentResponse>(Method::GET, url, &[("experiment_name", name)], None)
            .await
        {
            Ok(resp) => Ok(Some(resp.experiment.experiment_id)),
            Err(RecordingError::Status { status: 404, .. }) => Ok(None),
            Err(e) => Err(e),
        }
    }

    async fn create_experiment(&self, name: &str) -> Result<String, RecordingError> {
        tracing::info!(experiment = name, "creating experiment");
        let resp: CreateExperimentResponse = self
            .post("experiments/create", &CreateExperimentRequest { name })
            .await?;
        Ok(resp.experiment_id)
    }

    async fn create_run(&self, experiment_id: &str, run_name: &str) -> Result<RunInfo, RecordingError> {
        let resp: CreateRunResponse = self
            .post(
                "runs/create",
                &CreateRunRequest {
                    experiment_id,
                    run_name,
                    start_time: Utc::now().timestamp_millis(),
                    tags: vec![KeyValue::new("mlflow.runName", run_name, MAX_TAG_LEN)],
                },
            )
            .await?;
        Ok(resp.run.info)
    }

    async fn log_batch(&self, run_id: &str, run: &RunRecord) -> Result<(), RecordingError> {
        let timestamp = Utc::now().timestamp_millis();
        let mut tags = Vec::new();
        if let Some(error) = &run.error {
            tags.push(KeyValue::new("error", error, MAX_TAG_LEN));
        }
        if run.table.is_some() {
            let logged = serde_json::json!([{"path": RESULTS_ARTIFACT, "type": "table"}]);
            tags.push(KeyValue::new(
                "mlflow.loggedArtifacts",
                &logged.to_string(),
                MAX_TAG_LEN,
            ));
        }

        let body = LogBatchRequest {
            run_id,
            metrics: run
                .metrics
                .iter()
                .map(|(key, value)| Metric {
                    key: key.clone(),
                    value: *value,
                    timestamp,
                    step: 0,
                })
                .collect(),
            params: run
                .params
                .iter()
                .map(|(key, value)| KeyValue::new(key.clone(), value, MAX_PARAM_LEN))
                .collect(),
            tags,
        };
        let _: serde_json::Value = self.post("runs/log-batch", &body).await?;
        Ok(())
    }

    async fn upload_artifact(&self, info: &RunInfo, file: &str, body: String) -> Result<(), RecordingError> {
        let path = artifact_path(&info.artifact_uri)
            .ok_or_else(|| RecordingError::UnsupportedArtifactUri(info.artifact_uri.clone()))?;
        let url = format!(
            "{}/api/2.0/mlflow-artifacts/artifacts/{path}/{file}",
            self.base_url
        );

        let resp = self
            .client
            .put(&url)
            .header("Content-Type", "application/json")
            .body(body)
            .send()
            .await
            .map_err(|e| RecordingError::Request(format!("{url}: {e}")))?;
        if !resp.status().is_success() {
            let status = resp.status().as_u16();
            let text = resp.text().await.unwrap_or_default();
            return Err(status_error(status, &text));
        }
        Ok(())
    }

    async fn update_run(&self, run_id: &str, status: RunStatus) -> Result<(), RecordingError> {
        let _: serde_json::Value = self
            .post(
                "runs/update",
                &UpdateRunRequest {
                    run_id,
                    status: status.as_str(),
                    end_time: Utc::now().timestamp_millis(),
                },
            )
            .await?;
        Ok(())
    }

    async fn populate(&self, info: &RunInfo, run: &RunRecord) -> Result<(), RecordingError> {
        self.log_batch(&info.run_id, run).await?;
        if let Some(table) = &run.table {
            let body = table
                .to_json()
                .map_err(|e| RecordingError::InvalidResponse(e.to_string()))?;
            self.upload_artifact(info, RESULTS_ARTIFACT, body).await?;
        }
        Ok(())
    }
}

#[async_trait]
impl Recorder for MlflowRecorder {
    async fn record(&self, run: &RunRecord) -> Result<(), RecordingError> {
        let experiment_id = self.experiment_id(&run.experiment).await?;
        let info = self.create_run(&experiment_id, &run.run_name).await?;
        tracing::debug!(run_id = %info.run_id, run_name = %run.run_name, "run created");

        let populated = self.populate(&info, run).await;
        let final_status = match populated {
            Ok(()) => run.status,
            Err(_) => RunStatus::Failed,
        };
        let closed = self.update_run(&info.run_id, final_status).await;

        populated?;
        closed
    }

    fn ui_url(&self) -> Option<&str> {
        Some(&self.base_url)
    }
}

fn status_error(status: u16, body: &str) -> RecordingError {
    let message = match serde_json::from_str::<MlflowErrorBody>(body) {
        Ok(e) if !e.error_code.is_empty() => format!("{}: {}", e.error_code, e.message),
        _ => body.to_string(),
    };
    RecordingError::Status { status, message }
}

/// Strip the `mlflow-artifacts:` scheme (and any authority) from a run's
/// artifact URI, leaving the path the artifact proxy expects.
pub fn artifact_path(artifact_uri: &str) -> Option<String> {
    let rest = artifact_uri.strip_prefix(ARTIFACT_SCHEME)?;
    let rest = match rest.strip_prefix("//") {
        Some(with_authority) => with_authority.split_once('/').map(|(_, p)| p)?,
        None => rest,
    };
    let path = rest.trim_matches('/');
    if path.is_empty() {
        None
    } else {
        Some(path.to_string())
    }
}
