pub mod ollama;
pub mod retry;

pub use ollama::{OllamaClient, OllamaConfig};
