use std::io::Write;
use std::path::Path;
use std::sync::Arc;

use lmeval_core::config::EvalConfig;
use lmeval_core::error::Result;
use lmeval_core::recorder::Recorder;
use lmeval_eval::prelude::*;
use lmeval_llm::{OllamaClient, OllamaConfig};
use lmeval_track::prelude::{MlflowConfig, MlflowRecorder, NoopRecorder};

/// Pick the recorder the config asks for.
pub fn recorder(config: &EvalConfig) -> Result<Arc<dyn Recorder>> {
    if !config.tracking_enabled {
        tracing::info!("tracking disabled");
        return Ok(Arc::new(NoopRecorder));
    }
    let mlflow = MlflowRecorder::new(MlflowConfig::default().with_base_url(&config.tracking_url))?;
    Ok(Arc::new(mlflow))
}

/// Run the full comparison, writing console output to `out` and, when
/// `output` is set, the JSON report to that file.
pub async fn run<W: Write>(
    config: &EvalConfig,
    output: Option<&Path>,
    out: W,
) -> Result<ComparisonReport> {
    let dataset = Dataset::resolve(config)?;
    tracing::info!(
        dataset = %dataset.name,
        cases = dataset.len(),
        models = config.models.len(),
        "starting comparison"
    );

    let client = Arc::new(OllamaClient::new(OllamaConfig::from_eval_config(config))?);
    let comparison =
        Comparison::new(client, recorder(config)?).with_experiment(config.experiment.clone());

    let mut reporter = Reporter::new(out);
    let report = comparison.run(&config.models, &dataset, &mut reporter).await?;

    if let Some(path) = output {
        std::fs::write(path, report.to_json()?)?;
        tracing::info!(path = %path.display(), "wrote report");
    }
    Ok(report)
}
