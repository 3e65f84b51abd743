use async_trait::async_trait;

use crate::error::ModelError;

/// A text-completion endpoint that can serve several named models.
///
/// One call per invocation: no streaming, no caching. Whether a call is
/// repeatable depends on the remote model, which is not guaranteed to be
/// deterministic.
#[async_trait]
pub trait ModelClient: Send + Sync {
    /// Send `prompt` to `model` and return its full completion, unmodified.
    async fn complete(&self, model: &str, prompt: &str) -> Result<String, ModelError>;

    /// Provider label recorded alongside each run (e.g. `"ollama"`).
    fn provider(&self) -> &str;
}
