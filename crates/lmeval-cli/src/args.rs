//! Command-line arguments and configuration layering.
//!
//! Precedence, lowest first: built-in defaults, the YAML config file,
//! environment variables, then flags. clap folds the last two together.

use std::path::{Path, PathBuf};

use clap::Parser;

use lmeval_core::config::{ConfigFile, EvalConfig};
use lmeval_core::error::ConfigError;

/// Compare local language models on a question set and record the results.
#[derive(Parser, Debug, Clone, Default)]
#[command(name = "lmeval", version, about)]
pub struct Args {
    /// YAML config file. Defaults to `<config dir>/lmeval/config.yaml` when present.
    #[arg(long, env = "LMEVAL_CONFIG")]
    pub config: Option<PathBuf>,

    /// Comma-separated model identifiers, evaluated in this order
    #[arg(long, env = "LMEVAL_MODELS", value_delimiter = ',')]
    pub models: Option<Vec<String>>,

    /// Dataset file (.json, .yaml, .yml)
    #[arg(long, env = "LMEVAL_DATASET")]
    pub dataset: Option<PathBuf>,

    /// Base URL of the Ollama daemon
    #[arg(long, env = "OLLAMA_BASE_URI")]
    pub inference_url: Option<String>,

    /// Base URL of the MLflow tracking server
    #[arg(long, env = "MLFLOW_TRACKING_URI")]
    pub tracking_url: Option<String>,

    #[arg(long, env = "LMEVAL_EXPERIMENT")]
    pub experiment: Option<String>,

    /// Per-call inference timeout in seconds
    #[arg(long)]
    pub timeout_secs: Option<u64>,

    /// Extra attempts per inference call on transient failures
    #[arg(long)]
    pub retries: Option<u32>,

    /// Skip the tracking server entirely
    #[arg(long)]
    pub no_tracking: bool,

    /// Also write the ranked report as JSON to this path
    #[arg(long)]
    pub output: Option<PathBuf>,
}

impl Args {
    /// Build the effective configuration, looking for a config file in the
    /// user config directory when none is given.
    pub fn resolve(&self) -> Result<EvalConfig, ConfigError> {
        let default_file = dirs::config_dir().map(|d| d.join("lmeval").join("config.yaml"));
        self.resolve_with(default_file.as_deref())
    }

    /// Like [`Args::resolve`] with an explicit fallback config path. A
    /// missing fallback is ignored; a missing `--config` is an error.
    pub fn resolve_with(&self, default_file: Option<&Path>) -> Result<EvalConfig, ConfigError> {
        let mut config = EvalConfig::default();

        let file = match (&self.config, default_file) {
            (Some(path), _) => Some(path.as_path()),
            (None, Some(path)) if path.is_file() => Some(path),
            _ => None,
        };
        if let Some(path) = file {
            tracing::debug!(path = %path.display(), "loading config file");
            config = config.merge_file(ConfigFile::load(path)?, path.parent());
        }

        if let Some(models) = &self.models {
            config = config.with_models(
                models
                    .iter()
                    .map(|m| m.trim())
                    .filter(|m| !m.is_empty()),
            );
        }
        if let Some(path) = &self.dataset {
            config = config.with_dataset_path(path);
        }
        if let Some(url) = &self.inference_url {
            config = config.with_inference_url(url);
        }
        if let Some(url) = &self.tracking_url {
            config = config.with_tracking_url(url);
        }
        if let Some(name) = &self.experiment {
            config = config.with_experiment(name);
        }
        if let Some(secs) = self.timeout_secs {
            config = config.with_timeout_secs(secs);
        }
        if let Some(retries) = self.retries {
            config = config.with_retries(retries);
        }
        if self.no_tracking {
            config = config.without_tracking();
        }

        config.validate()?;
        Ok(config)
    }
}
