pub mod memory;
pub mod mlflow;
pub mod noop;

/// Prelude for convenient imports.
pub mod prelude {
    pub use crate::memory::InMemoryRecorder;
    pub use crate::mlflow::{MlflowConfig, MlflowRecorder};
    pub use crate::noop::NoopRecorder;
}
