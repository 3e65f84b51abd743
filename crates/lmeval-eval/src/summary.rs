use serde::{Deserialize, Serialize};

use lmeval_core::case::EvalCase;

use crate::similarity::Scorer;

/// Failure messages longer than this are cut before being stored.
pub const MAX_ERROR_CHARS: usize = 200;

/// One model's answer to one case. `completion` is `None` for a failed call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Prediction {
    pub case: EvalCase,
    pub model: String,
    pub completion: Option<String>,
}

/// A prediction with its similarity to the reference, absent when the call failed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredPrediction {
    #[serde(flatten)]
    pub prediction: Prediction,
    pub similarity: Option<f64>,
}

impl ScoredPrediction {
    pub fn score(prediction: Prediction, scorer: &dyn Scorer) -> Self {
        let similarity = prediction
            .completion
            .as_deref()
            .map(|c| scorer.score(c, &prediction.case.reference))
            .map(|s| if s.is_nan() { 0.0 } else { s.clamp(0.0, 1.0) });
        Self {
            prediction,
            similarity,
        }
    }
}

/// Aggregate result for one model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelSummary {
    pub model: String,
    pub avg: f64,
    pub min: f64,
    pub max: f64,
    pub num_predictions: usize,
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
    /// Set when the tracking server did not accept this model's run.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recording_error: Option<String>,
    #[serde(default)]
    pub predictions: Vec<ScoredPrediction>,
}

impl ModelSummary {
    /// Aggregate the similarities of every scored prediction.
    pub fn from_scored(model: impl Into<String>, predictions: Vec<ScoredPrediction>) -> Self {
        let scores: Vec<f64> = predictions.iter().filter_map(|p| p.similarity).collect();
        let (avg, min, max) = if scores.is_empty() {
            (0.0, 0.0, 0.0)
        } else {
            let sum: f64 = scores.iter().sum();
            let min = scores.iter().copied().fold(f64::INFINITY, f64::min);
            let max = scores.iter().copied().fold(f64::NEG_INFINITY, f64::max);
            // Rounding can push the mean a hair outside its own bounds.
            ((sum / scores.len() as f64).clamp(min, max), min, max)
        };
        Self {
            model: model.into(),
            avg,
            min,
            max,
            num_predictions: scores.len(),
            success: true,
            error_message: None,
            recording_error: None,
            predictions,
        }
    }

    /// Zero-valued summary for a model whose evaluation was aborted.
    pub fn failed(model: impl Into<String>, error: &str) -> Self {
        Self {
            model: model.into(),
            avg: 0.0,
            min: 0.0,
            max: 0.0,
            num_predictions: 0,
            success: false,
            error_message: Some(truncate_chars(error, MAX_ERROR_CHARS)),
            recording_error: None,
            predictions: Vec::new(),
        }
    }

    pub fn status(&self) -> &'static str {
        if self.success { "ok" } else { "failed" }
    }
}

/// Stable sort, highest `avg` first; ties keep their input order.
pub fn rank(mut summaries: Vec<ModelSummary>) -> Vec<ModelSummary> {
    summaries.sort_by(|a, b| b.avg.total_cmp(&a.avg));
    summaries
}

/// Highest-ranked successful summary in an already ranked list.
pub fn winner(ranked: &[ModelSummary]) -> Option<&ModelSummary> {
    ranked.iter().find(|s| s.success)
}

pub(crate) fn truncate_chars(s: &str, max_chars: usize) -> String {
    match s.char_indices().nth(max_chars) {
        Some((idx, _)) => format!("{}...", &s[..idx]),
        None => s.to_string(),
    }
}
