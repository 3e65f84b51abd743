use serde::{Deserialize, Serialize};

/// One question / reference-answer pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EvalCase {
    pub question: String,
    #[serde(alias = "ground_truth")]
    pub reference: String,
}

impl EvalCase {
    pub fn new(question: impl Into<String>, reference: impl Into<String>) -> Self {
        Self {
            question: question.into(),
            reference: reference.into(),
        }
    }
}
