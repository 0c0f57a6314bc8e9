//! Types for streaming responses.

use serde::{Deserialize, Serialize};

/// Token usage and timing reported on the final chunk of a generation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Usage {
    /// Number of tokens in the prompt.
    pub input_tokens: u32,
    /// Number of tokens generated.
    pub output_tokens: u32,
    /// Durations in nanoseconds.
    pub total_duration: Option<u64>,
    pub load_duration: Option<u64>,
    pub prompt_eval_duration: Option<u64>,
    pub eval_duration: Option<u64>,
}

/// Metadata attached to the end-of-generation fragment.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GenerationInfo {
    pub model: String,
    /// Why generation stopped ("stop", "length", ...).
    pub done_reason: Option<String>,
    /// Token ids that can be sent back to continue the conversation.
    pub context: Option<Vec<i64>>,
    pub usage: Usage,
}

/// One incremental unit of generated text.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResponseFragment {
    pub text: String,
    /// Set on the last fragment of a generation.
    pub done: bool,
    /// Present only when `done` is set.
    pub info: Option<GenerationInfo>,
}

impl ResponseFragment {
    /// Create an intermediate fragment.
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            done: false,
            info: None,
        }
    }

    /// Create the end-of-generation fragment.
    pub fn last(text: impl Into<String>, info: GenerationInfo) -> Self {
        Self {
            text: text.into(),
            done: true,
            info: Some(info),
        }
    }
}
