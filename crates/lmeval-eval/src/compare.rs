use std::io::Write;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use lmeval_core::config::DEFAULT_EXPERIMENT;
use lmeval_core::error::{ConfigError, EvalError, Result};
use lmeval_core::model::ModelClient;
use lmeval_core::recorder::{Recorder, ResultTable, RunRecord};

use crate::dataset::Dataset;
use crate::report::Reporter;
use crate::similarity::{Scorer, SimilarityScorer};
use crate::summary::{ModelSummary, Prediction, ScoredPrediction, rank, winner};

/// Outcome of a full comparison, ranked best first.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComparisonReport {
    pub experiment: String,
    pub summaries: Vec<ModelSummary>,
    #[serde(default)]
    pub tracking_url: Option<String>,
}

impl ComparisonReport {
    /// Rank `summaries` (given in model-list order).
    pub fn new(
        experiment: impl Into<String>,
        summaries: Vec<ModelSummary>,
        tracking_url: Option<String>,
    ) -> Self {
        Self {
            experiment: experiment.into(),
            summaries: rank(summaries),
            tracking_url,
        }
    }

    pub fn winner(&self) -> Option<&ModelSummary> {
        winner(&self.summaries)
    }

    /// Successful summaries in rank order.
    pub fn successful(&self) -> impl Iterator<Item = &ModelSummary> {
        self.summaries.iter().filter(|s| s.success)
    }

    pub fn to_json(&self) -> std::result::Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}

/// Evaluates every model against a dataset, one model and one case at a
/// time, records a run per model, and ranks the results.
///
/// A model whose call fails is aborted on the spot and ranked with a
/// zero-valued summary; the remaining models still run.
pub struct Comparison {
    client: Arc<dyn ModelClient>,
    recorder: Arc<dyn Recorder>,
    scorer: Box<dyn Scorer>,
    experiment: String,
}

impl Comparison {
    pub fn new(client: Arc<dyn ModelClient>, recorder: Arc<dyn Recorder>) -> Self {
        Self {
            client,
            recorder,
            scorer: Box::new(SimilarityScorer),
            experiment: DEFAULT_EXPERIMENT.into(),
        }
    }

    pub fn with_experiment(mut self, name: impl Into<String>) -> Self {
        self.experiment = name.into();
        self
    }

    pub fn with_scorer(mut self, scorer: impl Scorer + 'static) -> Self {
        self.scorer = Box::new(scorer);
        self
    }

    pub async fn run<W: Write>(
        &self,
        models: &[String],
        dataset: &Dataset,
        reporter: &mut Reporter<W>,
    ) -> Result<ComparisonReport> {
        if models.is_empty() {
            return Err(ConfigError::EmptyModelList.into());
        }
        if dataset.is_empty() {
            return Err(ConfigError::EmptyDataset.into());
        }

        let mut summaries = Vec::with_capacity(models.len());
        for model in models {
            reporter.model_header(model)?;
            tracing::info!(model = %model, cases = dataset.len(), "evaluating model");

            let mut summary = match self.evaluate_model(model, dataset, reporter).await {
                Ok(predictions) => {
                    let summary = ModelSummary::from_scored(model.as_str(), predictions);
                    tracing::info!(model = %model, avg = summary.avg, "model evaluated");
                    reporter.model_summary(&summary)?;
                    summary
                }
                Err(EvalError::ModelUnavailable(err)) => {
                    tracing::warn!(model = %model, error = %err, "model failed, skipping");
                    let summary = ModelSummary::failed(model.as_str(), &err.to_string());
                    reporter.model_failed(&summary)?;
                    summary
                }
                Err(other) => return Err(other),
            };

            let run = self.run_record(&summary, dataset);
            if let Err(err) = self.recorder.record(&run).await {
                tracing::warn!(model = %model, error = %err, "failed to record run");
                reporter.recording_warning(model, &err.to_string())?;
                summary.recording_error = Some(err.to_string());
            }
            summaries.push(summary);
        }

        let report = ComparisonReport::new(
            self.experiment.clone(),
            summaries,
            self.recorder.ui_url().map(String::from),
        );
        match report.winner() {
            Some(w) => tracing::info!(winner = %w.model, avg = w.avg, "comparison finished"),
            None => tracing::warn!("comparison finished with no successful models"),
        }
        reporter.final_report(&report)?;
        Ok(report)
    }

    /// Query every case, then score. The first failed call aborts the model.
    async fn evaluate_model<W: Write>(
        &self,
        model: &str,
        dataset: &Dataset,
        reporter: &mut Reporter<W>,
    ) -> Result<Vec<ScoredPrediction>> {
        let total = dataset.len();
        let mut predictions = Vec::with_capacity(total);
        for (i, case) in dataset.cases().iter().enumerate() {
            reporter.progress(i + 1, total, &case.question)?;
            let completion = self.client.complete(model, &case.question).await?;
            predictions.push(Prediction {
                case: case.clone(),
                model: model.to_string(),
                completion: Some(completion),
            });
        }

        Ok(predictions
            .into_iter()
            .map(|p| ScoredPrediction::score(p, self.scorer.as_ref()))
            .collect())
    }

    fn run_record(&self, summary: &ModelSummary, dataset: &Dataset) -> RunRecord {
        let run = RunRecord::new(&self.experiment, format!("{}-simple-eval", summary.model))
            .with_param("model", &summary.model)
            .with_param("provider", self.client.provider())
            .with_param("num_samples", dataset.len());

        if !summary.success {
            return run.failed(summary.error_message.clone().unwrap_or_default());
        }

        let mut table = ResultTable::new();
        for scored in &summary.predictions {
            let p = &scored.prediction;
            table.push_row(
                &p.case.question,
                &p.case.reference,
                p.completion.as_deref().unwrap_or_default(),
                scored.similarity.unwrap_or_default(),
            );
        }

        run.with_metric("avg_similarity", summary.avg)
            .with_metric("min_similarity", summary.min)
            .with_metric("max_similarity", summary.max)
            .with_metric("num_predictions", summary.num_predictions as f64)
            .with_table(table)
    }
}
