//! Human-readable console output for a comparison.

use std::io::{self, Write};

use crate::compare::ComparisonReport;
use crate::summary::{ModelSummary, truncate_chars};

const RULE_WIDTH: usize = 60;
const QUESTION_PREFIX_CHARS: usize = 60;
const PREDICTION_PREVIEW_CHARS: usize = 150;
const SAMPLE_ROWS: usize = 3;
const TOP_N: usize = 3;

/// Writes progress lines, per-model blocks, and the final ranking.
pub struct Reporter<W: Write> {
    out: W,
}

impl<W: Write> Reporter<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    fn rule(&mut self, c: char) -> io::Result<()> {
        writeln!(self.out, "{}", c.to_string().repeat(RULE_WIDTH))
    }

    fn banner(&mut self, title: &str) -> io::Result<()> {
        writeln!(self.out)?;
        self.rule('=')?;
        writeln!(self.out, "{title}")?;
        self.rule('=')
    }

    pub fn model_header(&mut self, model: &str) -> io::Result<()> {
        self.banner(&format!("Evaluating model: {model}"))?;
        writeln!(self.out)?;
        writeln!(self.out, "Generating predictions...")
    }

    pub fn progress(&mut self, index: usize, total: usize, question: &str) -> io::Result<()> {
        let prefix: String = question.chars().take(QUESTION_PREFIX_CHARS).collect();
        writeln!(self.out, "[{index}/{total}] Processing: {prefix}...")?;
        self.out.flush()
    }

    pub fn model_summary(&mut self, summary: &ModelSummary) -> io::Result<()> {
        self.banner(&format!("Evaluation Complete for {}!", summary.model))?;
        writeln!(self.out, "Average Similarity: {:.4}", summary.avg)?;
        writeln!(self.out, "Min Similarity:     {:.4}", summary.min)?;
        writeln!(self.out, "Max Similarity:     {:.4}", summary.max)?;
        writeln!(self.out, "Number of samples:  {}", summary.num_predictions)?;

        if summary.predictions.is_empty() {
            return Ok(());
        }
        self.banner("Sample Results:")?;
        for scored in summary.predictions.iter().take(SAMPLE_ROWS) {
            let p = &scored.prediction;
            writeln!(self.out)?;
            writeln!(self.out, "Question: {}", p.case.question)?;
            writeln!(self.out, "Ground Truth: {}", p.case.reference)?;
            match &p.completion {
                Some(text) => writeln!(
                    self.out,
                    "Prediction: {}",
                    truncate_chars(text, PREDICTION_PREVIEW_CHARS)
                )?,
                None => writeln!(self.out, "Prediction: <none>")?,
            }
            match scored.similarity {
                Some(sim) => writeln!(self.out, "Similarity: {sim:.4}")?,
                None => writeln!(self.out, "Similarity: n/a")?,
            }
        }
        Ok(())
    }

    pub fn model_failed(&mut self, summary: &ModelSummary) -> io::Result<()> {
        self.banner(&format!("Evaluation FAILED for {}", summary.model))?;
        writeln!(
            self.out,
            "Error: {}",
            summary.error_message.as_deref().unwrap_or("unknown error")
        )
    }

    pub fn recording_warning(&mut self, model: &str, error: &str) -> io::Result<()> {
        writeln!(
            self.out,
            "Warning: results for {model} were not recorded: {error}"
        )
    }

    /// Ranking table, winner, top three, and the tracking link.
    pub fn final_report(&mut self, report: &ComparisonReport) -> io::Result<()> {
        let ranked = &report.summaries;
        let width = ranked
            .iter()
            .map(|s| s.model.chars().count())
            .max()
            .unwrap_or(0)
            .max("Model".len());

        self.banner("Model Comparison (ranked by average similarity)")?;
        writeln!(
            self.out,
            "{:<5} {:<width$}  {:>7} {:>7} {:>7}  Status",
            "Rank", "Model", "Avg", "Min", "Max"
        )?;
        self.rule('-')?;
        for (i, s) in ranked.iter().enumerate() {
            writeln!(
                self.out,
                "{:<5} {:<width$}  {:>7.4} {:>7.4} {:>7.4}  {}",
                i + 1,
                s.model,
                s.avg,
                s.min,
                s.max,
                s.status()
            )?;
        }
        writeln!(self.out)?;

        match report.winner() {
            Some(w) => writeln!(
                self.out,
                "Winner: {} (avg similarity {:.4})",
                w.model, w.avg
            )?,
            None => writeln!(
                self.out,
                "No successful models: all {} evaluation(s) failed.",
                ranked.len()
            )?,
        }

        let successful: Vec<&ModelSummary> = report.successful().collect();
        if successful.len() >= TOP_N {
            writeln!(self.out)?;
            writeln!(self.out, "Top {TOP_N}:")?;
            for (i, s) in successful.iter().take(TOP_N).enumerate() {
                writeln!(self.out, "  {}. {} ({:.4})", i + 1, s.model, s.avg)?;
            }
        }

        let failed: Vec<&ModelSummary> = ranked.iter().filter(|s| !s.success).collect();
        if !failed.is_empty() {
            writeln!(self.out)?;
            writeln!(self.out, "Failed models:")?;
            for s in failed {
                writeln!(
                    self.out,
                    "  {}: {}",
                    s.model,
                    s.error_message.as_deref().unwrap_or("unknown error")
                )?;
            }
        }

        writeln!(self.out)?;
        self.rule('=')?;
        writeln!(self.out, "All evaluations complete!")?;
        if let Some(url) = &report.tracking_url {
            writeln!(self.out, "View full results at: {url}")?;
        }
        self.rule('=')?;
        self.out.flush()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::summary::{Prediction, ScoredPrediction};
    use lmeval_core::case::EvalCase;

    fn render(f: impl FnOnce(&mut Reporter<Vec<u8>>) -> io::Result<()>) -> String {
        let mut reporter = Reporter::new(Vec::new());
        f(&mut reporter).unwrap();
        String::from_utf8(reporter.into_inner()).unwrap()
    }

    fn ok_summary(model: &str, avg: f64) -> ModelSummary {
        ModelSummary {
            model: model.into(),
            avg,
            min: avg,
            max: avg,
            num_predictions: 1,
            success: true,
            error_message: None,
            recording_error: None,
            predictions: Vec::new(),
        }
    }

    fn report(summaries: Vec<ModelSummary>) -> ComparisonReport {
        ComparisonReport::new("exp", summaries, Some("http://localhost:5000".into()))
    }

    #[test]
    fn progress_line_truncates_question() {
        let question = "q".repeat(100);
        let out = render(|r| r.progress(2, 7, &question));
        assert_eq!(out, format!("[2/7] Processing: {}...\n", "q".repeat(60)));
    }

    #[test]
    fn summary_shows_at_most_three_samples() {
        let predictions = (0..5)
            .map(|i| ScoredPrediction {
                prediction: Prediction {
                    case: EvalCase::new(format!("question {i}"), "ref"),
                    model: "m".into(),
                    completion: Some("x".repeat(200)),
                },
                similarity: Some(0.25),
            })
            .collect();
        let summary = ModelSummary::from_scored("m", predictions);
        let out = render(|r| r.model_summary(&summary));

        assert!(out.contains("Average Similarity: 0.2500"));
        assert!(out.contains("Number of samples:  5"));
        assert!(out.contains("question 2"));
        assert!(!out.contains("question 3"));
        assert!(out.contains(&format!("Prediction: {}...", "x".repeat(150))));
    }

    #[test]
    fn summary_with_fewer_rows_than_samples() {
        let summary = ModelSummary::from_scored(
            "m",
            vec![ScoredPrediction {
                prediction: Prediction {
                    case: EvalCase::new("2+2?", "4"),
                    model: "m".into(),
                    completion: Some("4".into()),
                },
                similarity: Some(1.0),
            }],
        );
        let out = render(|r| r.model_summary(&summary));
        assert_eq!(out.matches("Question:").count(), 1);
    }

    #[test]
    fn ranking_table_and_winner() {
        let r = report(vec![
            ok_summary("beta", 0.9),
            ok_summary("alpha", 0.7),
            ModelSummary::failed("gamma", "endpoint unreachable"),
        ]);
        let out = render(|w| w.final_report(&r));

        let beta = out.find("beta").unwrap();
        let alpha = out.find("alpha").unwrap();
        let gamma = out.find("gamma").unwrap();
        assert!(beta < alpha && alpha < gamma);
        assert!(out.contains("Winner: beta (avg similarity 0.9000)"));
        // Only two succeeded, so no top-3 block.
        assert!(!out.contains("Top 3:"));
        assert!(out.contains("gamma: endpoint unreachable"));
        assert!(out.contains("View full results at: http://localhost:5000"));
    }

    #[test]
    fn top_three_when_enough_succeed() {
        let r = report(vec![
            ok_summary("a", 0.9),
            ok_summary("b", 0.8),
            ok_summary("c", 0.7),
            ok_summary("d", 0.6),
        ]);
        let out = render(|w| w.final_report(&r));
        assert!(out.contains("Top 3:"));
        assert!(out.contains("  3. c (0.7000)"));
        assert!(!out.contains("  4. d"));
    }

    #[test]
    fn all_failed_is_reported_explicitly() {
        let r = report(vec![
            ModelSummary::failed("a", "down"),
            ModelSummary::failed("b", "down"),
        ]);
        let out = render(|w| w.final_report(&r));
        assert!(out.contains("No successful models"));
        assert!(!out.contains("Winner:"));
    }
}
