use std::path::Path;

use serde::{Deserialize, Serialize};

use lmeval_core::case::EvalCase;
use lmeval_core::config::EvalConfig;
use lmeval_core::error::ConfigError;

/// A fixed, ordered collection of evaluation cases.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Dataset {
    /// Dataset name.
    #[serde(default = "default_name")]
    pub name: String,
    /// Description of what this dataset tests.
    #[serde(default)]
    pub description: String,
    cases: Vec<EvalCase>,
}

fn default_name() -> String {
    "dataset".into()
}

/// Accepted on-disk shapes: a full dataset object or a bare list of cases.
#[derive(Deserialize)]
#[serde(untagged)]
enum DatasetFile {
    Full(Dataset),
    Bare(Vec<EvalCase>),
}

impl DatasetFile {
    fn into_dataset(self, fallback_name: &str) -> Dataset {
        match self {
            Self::Full(ds) => ds,
            Self::Bare(cases) => Dataset::new(fallback_name, cases),
        }
    }
}

impl Dataset {
    pub fn new(name: impl Into<String>, cases: Vec<EvalCase>) -> Self {
        Self {
            name: name.into(),
            description: String::new(),
            cases,
        }
    }

    pub fn with_description(mut self, desc: impl Into<String>) -> Self {
        self.description = desc.into();
        self
    }

    /// The general-knowledge question set the comparison runs by default.
    pub fn builtin() -> Self {
        let pairs = [
            (
                "What is MLflow?",
                "MLflow is an open-source platform for managing the machine learning lifecycle.",
            ),
            (
                "What is the capital of Spain?",
                "The capital city of Spain is Madrid",
            ),
            (
                "Explain machine learning in simple terms.",
                "Machine learning is a way for computers to learn patterns from data.",
            ),
            ("What is 2+2+2?", "6"),
            ("Who wrote Romeo and Juliet?", "William Shakespeare"),
            ("How many vowels are in Alabama?", "4"),
            (
                "Which city is meant in the song \"We built this city\" by the group Starship?",
                "Two cities are referenced: San Francisco and Los Angeles.",
            ),
        ];
        Self::new(
            "builtin",
            pairs
                .into_iter()
                .map(|(q, r)| EvalCase::new(q, r))
                .collect(),
        )
        .with_description("Short general-knowledge questions with reference answers")
    }

    pub fn cases(&self) -> &[EvalCase] {
        &self.cases
    }

    pub fn len(&self) -> usize {
        self.cases.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cases.is_empty()
    }

    /// Load from JSON string.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str::<DatasetFile>(json).map(|f| f.into_dataset("dataset"))
    }

    /// Load from YAML string.
    pub fn from_yaml(yaml: &str) -> Result<Self, serde_yaml::Error> {
        serde_yaml::from_str::<DatasetFile>(yaml).map(|f| f.into_dataset("dataset"))
    }

    /// Serialize to JSON string.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Load a dataset file, choosing the format by extension. Bare case
    /// lists are named after the file stem.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let invalid = |reason: String| ConfigError::InvalidFile {
            path: path.display().to_string(),
            reason,
        };
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_ascii_lowercase)
            .unwrap_or_default();
        let stem = path
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("dataset");

        let is_json = match ext.as_str() {
            "json" => true,
            "yaml" | "yml" => false,
            other => return Err(ConfigError::UnsupportedFormat(other.to_string())),
        };

        let text = std::fs::read_to_string(path).map_err(|e| invalid(e.to_string()))?;
        let file: DatasetFile = if is_json {
            serde_json::from_str(&text).map_err(|e| invalid(e.to_string()))?
        } else {
            serde_yaml::from_str(&text).map_err(|e| invalid(e.to_string()))?
        };
        file.into_dataset(stem).non_empty()
    }

    /// Pick the dataset a config asks for: inline cases, then a dataset
    /// file, then the built-in set.
    pub fn resolve(config: &EvalConfig) -> Result<Self, ConfigError> {
        match (&config.dataset, &config.dataset_path) {
            (Some(cases), _) => Self::new("inline", cases.clone()).non_empty(),
            (None, Some(path)) => Self::load(path),
            (None, None) => Ok(Self::builtin()),
        }
    }

    fn non_empty(self) -> Result<Self, ConfigError> {
        if self.is_empty() {
            Err(ConfigError::EmptyDataset)
        } else {
            Ok(self)
        }
    }
}
