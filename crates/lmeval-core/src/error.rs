use thiserror::Error;

/// Top-level error type for lmeval.
#[derive(Debug, Error)]
pub enum EvalError {
    #[error("Model unavailable: {0}")]
    ModelUnavailable(#[from] ModelError),

    #[error("Recording failed: {0}")]
    Recording(#[from] RecordingError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    Other(String),
}

/// Failures talking to the inference endpoint.
#[derive(Debug, Error)]
pub enum ModelError {
    #[error("endpoint unreachable: {0}")]
    Unreachable(String),

    #[error("request timed out: {0}")]
    Timeout(String),

    #[error("HTTP {status}: {message}")]
    Status { status: u16, message: String },

    #[error("invalid response: {0}")]
    InvalidResponse(String),

    #[error("invalid input: {0}")]
    InvalidInput(String),
}

impl ModelError {
    /// Whether another attempt could plausibly succeed.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Unreachable(_) | Self::Timeout(_) => true,
            Self::Status { status, .. } => *status == 429 || *status >= 500,
            Self::InvalidResponse(_) | Self::InvalidInput(_) => false,
        }
    }
}

/// Failures persisting a run to the tracking service.
#[derive(Debug, Error)]
pub enum RecordingError {
    #[error("tracking request failed: {0}")]
    Request(String),

    #[error("tracking HTTP {status}: {message}")]
    Status { status: u16, message: String },

    #[error("invalid tracking response: {0}")]
    InvalidResponse(String),

    #[error("unsupported artifact URI: {0}")]
    UnsupportedArtifactUri(String),
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("dataset is empty, nothing to evaluate")]
    EmptyDataset,

    #[error("model list is empty, nothing to evaluate")]
    EmptyModelList,

    #[error("invalid file '{path}': {reason}")]
    InvalidFile { path: String, reason: String },

    #[error("unsupported file format '{0}' (expected .json, .yaml or .yml)")]
    UnsupportedFormat(String),
}

pub type Result<T> = std::result::Result<T, EvalError>;
