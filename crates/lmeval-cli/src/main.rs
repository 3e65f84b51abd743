use std::process::ExitCode;

use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use lmeval_core::error::{EvalError, Result};
use lmeval_eval::prelude::ComparisonReport;

mod app;
mod args;

use args::Args;

/// Aborted run, or no model succeeded.
const FAILURE: u8 = 1;
/// Invalid configuration, wherever it is detected.
const CONFIG_ERROR: u8 = 2;

#[tokio::main]
async fn main() -> ExitCode {
    // Logs go to stderr so stdout carries only the report.
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "lmeval=info".into()),
        )
        .init();

    let args = Args::parse();
    let result = match args.resolve() {
        Ok(config) => app::run(&config, args.output.as_deref(), std::io::stdout()).await,
        Err(e) => Err(e.into()),
    };

    if let Err(e) = &result {
        tracing::error!(error = %e, "evaluation aborted");
        eprintln!("error: {e}");
    }
    ExitCode::from(exit_code(&result))
}

/// 0 when some model succeeded, 2 for configuration errors, 1 otherwise.
fn exit_code(result: &Result<ComparisonReport>) -> u8 {
    match result {
        Ok(report) if report.winner().is_some() => 0,
        Ok(_) => FAILURE,
        Err(EvalError::Config(_)) => CONFIG_ERROR,
        Err(_) => FAILURE,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lmeval_core::config::EvalConfig;
    use lmeval_core::error::{ConfigError, ModelError};
    use lmeval_eval::prelude::ModelSummary;

    #[test]
    fn success_needs_a_winner() {
        let ok = ComparisonReport::new("exp", vec![ModelSummary::from_scored("m", Vec::new())], None);
        assert_eq!(exit_code(&Ok(ok)), 0);

        let none = ComparisonReport::new("exp", vec![ModelSummary::failed("m", "down")], None);
        assert_eq!(exit_code(&Ok(none)), FAILURE);
    }

    #[test]
    fn config_errors_exit_two() {
        for err in [
            ConfigError::EmptyModelList,
            ConfigError::EmptyDataset,
            ConfigError::UnsupportedFormat("csv".into()),
        ] {
            assert_eq!(exit_code(&Err(err.into())), CONFIG_ERROR);
        }
        let other = EvalError::ModelUnavailable(ModelError::Unreachable("x".into()));
        assert_eq!(exit_code(&Err(other)), FAILURE);
    }

    #[tokio::test]
    async fn dataset_errors_found_during_the_run_exit_two() {
        let dir = tempfile::tempdir().unwrap();
        let empty = dir.path().join("cases.json");
        std::fs::write(&empty, "[]").unwrap();

        for path in [empty, dir.path().join("missing.json")] {
            let config = EvalConfig::new()
                .with_models(["m"])
                .with_dataset_path(path)
                .without_tracking();
            let result = app::run(&config, None, Vec::new()).await;
            assert!(matches!(result, Err(EvalError::Config(_))));
            assert_eq!(exit_code(&result), CONFIG_ERROR);
        }
    }
}
