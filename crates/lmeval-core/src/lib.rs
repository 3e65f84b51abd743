pub mod case;
pub mod config;
pub mod error;
pub mod model;
pub mod recorder;

/// Prelude module for convenient imports.
pub mod prelude {
    pub use crate::case::EvalCase;
    pub use crate::config::{ConfigFile, EvalConfig};
    pub use crate::error::{ConfigError, EvalError, ModelError, RecordingError, Result};
    pub use crate::model::ModelClient;
    pub use crate::recorder::{Recorder, ResultTable, RunRecord, RunStatus};
}
