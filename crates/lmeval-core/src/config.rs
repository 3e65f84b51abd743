use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::case::EvalCase;
use crate::error::ConfigError;

pub const DEFAULT_INFERENCE_URL: &str = "http://localhost:11434";
pub const DEFAULT_TRACKING_URL: &str = "http://localhost:5000";
pub const DEFAULT_EXPERIMENT: &str = "Ollama Model Evaluation - Simple";
pub const DEFAULT_TIMEOUT_SECS: u64 = 60;

pub const DEFAULT_MODELS: &[&str] = &[
    "llama3.2:latest",
    "mistral:latest",
    "dolphin3:latest",
    "deepscaler:latest",
    "deepseek-r1:latest",
];

/// Settings for one comparison run, threaded explicitly through the loop.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvalConfig {
    /// Models to evaluate, in presentation order.
    pub models: Vec<String>,

    /// Inline cases. `None` falls back to `dataset_path`, then the built-in set.
    #[serde(default)]
    pub dataset: Option<Vec<EvalCase>>,

    /// Dataset file (`.json`, `.yaml`, `.yml`).
    #[serde(default)]
    pub dataset_path: Option<PathBuf>,

    /// Base URL of the inference daemon.
    pub inference_url: String,

    /// Base URL of the tracking server.
    pub tracking_url: String,

    /// Experiment every run is grouped under.
    pub experiment: String,

    /// Per-call inference timeout.
    pub timeout_secs: u64,

    /// Extra attempts per inference call on transient failures. 0 disables retry.
    pub retries: u32,

    /// Whether runs are sent to the tracking server.
    pub tracking_enabled: bool,
}

impl Default for EvalConfig {
    fn default() -> Self {
        Self {
            models: DEFAULT_MODELS.iter().map(|m| m.to_string()).collect(),
            dataset: None,
            dataset_path: None,
            inference_url: DEFAULT_INFERENCE_URL.into(),
            tracking_url: DEFAULT_TRACKING_URL.into(),
            experiment: DEFAULT_EXPERIMENT.into(),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            retries: 0,
            tracking_enabled: true,
        }
    }
}

impl EvalConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_models<I, S>(mut self, models: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.models = models.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_dataset(mut self, cases: Vec<EvalCase>) -> Self {
        self.dataset = Some(cases);
        self
    }

    /// Point at a dataset file. Clears any inline cases so the file wins.
    pub fn with_dataset_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.dataset_path = Some(path.into());
        self.dataset = None;
        self
    }

    pub fn with_inference_url(mut self, url: impl Into<String>) -> Self {
        self.inference_url = url.into();
        self
    }

    pub fn with_tracking_url(mut self, url: impl Into<String>) -> Self {
        self.tracking_url = url.into();
        self
    }

    pub fn with_experiment(mut self, name: impl Into<String>) -> Self {
        self.experiment = name.into();
        self
    }

    pub fn with_timeout_secs(mut self, secs: u64) -> Self {
        self.timeout_secs = secs;
        self
    }

    pub fn with_retries(mut self, retries: u32) -> Self {
        self.retries = retries;
        self
    }

    pub fn without_tracking(mut self) -> Self {
        self.tracking_enabled = false;
        self
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Overlay every field the file sets. Relative `dataset_path`s resolve
    /// against `base_dir` (normally the config file's directory).
    pub fn merge_file(mut self, file: ConfigFile, base_dir: Option<&Path>) -> Self {
        if let Some(models) = file.models {
            self = self.with_models(
                models
                    .iter()
                    .map(|m| m.trim())
                    .filter(|m| !m.is_empty()),
            );
        }
        if let Some(path) = file.dataset_path {
            let path = match base_dir {
                Some(dir) if path.is_relative() => dir.join(path),
                _ => path,
            };
            self = self.with_dataset_path(path);
        }
        if let Some(cases) = file.dataset {
            self = self.with_dataset(cases);
        }
        if let Some(url) = file.inference_url {
            self.inference_url = url;
        }
        if let Some(url) = file.tracking_url {
            self.tracking_url = url;
        }
        if let Some(name) = file.experiment {
            self.experiment = name;
        }
        if let Some(secs) = file.timeout_secs {
            self.timeout_secs = secs;
        }
        if let Some(retries) = file.retries {
            self.retries = retries;
        }
        if let Some(enabled) = file.tracking_enabled {
            self.tracking_enabled = enabled;
        }
        self
    }

    /// Reject configurations under which no evaluation is possible.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.models.iter().all(|m| m.trim().is_empty()) {
            return Err(ConfigError::EmptyModelList);
        }
        if matches!(&self.dataset, Some(cases) if cases.is_empty()) {
            return Err(ConfigError::EmptyDataset);
        }
        Ok(())
    }
}

/// On-disk YAML configuration. Every field is optional and only overrides
/// what it sets.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ConfigFile {
    pub models: Option<Vec<String>>,
    pub dataset: Option<Vec<EvalCase>>,
    pub dataset_path: Option<PathBuf>,
    pub inference_url: Option<String>,
    pub tracking_url: Option<String>,
    pub experiment: Option<String>,
    pub timeout_secs: Option<u64>,
    pub retries: Option<u32>,
    pub tracking_enabled: Option<bool>,
}

impl ConfigFile {
    pub fn from_yaml(yaml: &str) -> Result<Self, serde_yaml::Error> {
        serde_yaml::from_str(yaml)
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let invalid = |reason: String| ConfigError::InvalidFile {
            path: path.display().to_string(),
            reason,
        };
        let text = std::fs::read_to_string(path).map_err(|e| invalid(e.to_string()))?;
        Self::from_yaml(&text).map_err(|e| invalid(e.to_string()))
    }
}
