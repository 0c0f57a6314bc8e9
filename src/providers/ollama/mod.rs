//! Ollama `/api/generate` client.

pub mod client;
pub mod types;

pub use client::OllamaClient;
