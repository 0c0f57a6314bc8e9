//! A streaming completion client for locally hosted Ollama servers.
//!
//! This library sends prompts (optionally with image attachments) to an Ollama server and
//! returns either the aggregated completion or a cancellable stream of fragments, with
//! support for structured JSON output and per-fragment callbacks.

pub mod error;
pub mod types;
pub mod callback;
pub mod provider;
pub mod providers;
pub mod response;
pub mod ndjson_stream;
pub mod streaming;
pub mod accumulator;

// Re-export core types for easy usage
pub use error::Error;
pub use types::*;
pub use callback::FragmentSink;
pub use provider::CompletionProvider;
pub use providers::*;
pub use response::*;
pub use streaming::FragmentStream;
pub use accumulator::ResponseAccumulator;
pub use tokio_util::sync::CancellationToken;
