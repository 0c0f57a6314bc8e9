//! Provider implementations for completion backends.

pub mod ollama;

// Re-export commonly used provider types
pub use ollama::OllamaClient;
