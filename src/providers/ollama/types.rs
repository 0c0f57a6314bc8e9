use crate::types::{GenerationInfo, ModelOptions, ResponseFragment, Usage};
use crate::Error;
use serde::{Deserialize, Serialize};

/// Body of `POST /api/generate`.
#[derive(Debug, Clone, Serialize)]
pub struct GenerateRequest {
    pub model: String,
    pub prompt: String,
    pub stream: bool,
    /// "json" or a JSON schema.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub format: Option<serde_json::Value>,
    /// Base64-encoded images for multimodal models.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub images: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub system: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub options: Option<ModelOptions>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub keep_alive: Option<String>,
}

/// One line of a streamed generate response (or the whole non-streamed body).
#[derive(Debug, Clone, Default, Deserialize)]
pub struct GenerateChunk {
    #[serde(default)]
    pub model: String,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub response: String,
    #[serde(default)]
    pub done: bool,
    #[serde(default)]
    pub done_reason: Option<String>,
    #[serde(default)]
    pub context: Option<Vec<i64>>,
    #[serde(default)]
    pub total_duration: Option<u64>,
    #[serde(default)]
    pub load_duration: Option<u64>,
    #[serde(default)]
    pub prompt_eval_count: Option<u32>,
    #[serde(default)]
    pub prompt_eval_duration: Option<u64>,
    #[serde(default)]
    pub eval_count: Option<u32>,
    #[serde(default)]
    pub eval_duration: Option<u64>,
    /// Set when the server fails after the response has started.
    #[serde(default)]
    pub error: Option<String>,
}

impl GenerateChunk {
    /// Parse a single NDJSON line.
    pub fn parse(line: &str) -> Result<Self, Error> {
        serde_json::from_str(line)
            .map_err(|e| Error::server(None, format!("Malformed response chunk: {e}")))
    }

    /// Convert into a fragment, surfacing in-band server errors.
    pub fn into_fragment(self) -> Result<ResponseFragment, Error> {
        if let Some(error) = self.error {
            return Err(Error::server(None, error));
        }

        if !self.done {
            return Ok(ResponseFragment::text(self.response));
        }

        let info = GenerationInfo {
            model: self.model,
            done_reason: self.done_reason,
            context: self.context,
            usage: Usage {
                input_tokens: self.prompt_eval_count.unwrap_or_default(),
                output_tokens: self.eval_count.unwrap_or_default(),
                total_duration: self.total_duration,
                load_duration: self.load_duration,
                prompt_eval_duration: self.prompt_eval_duration,
                eval_duration: self.eval_duration,
            },
        };
        Ok(ResponseFragment::last(self.response, info))
    }
}

/// Error body returned with a non-success status.
#[derive(Debug, Clone, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}

/// Response of `GET /api/version`.
#[derive(Debug, Clone, Deserialize)]
pub struct VersionResponse {
    pub version: String,
}

/// Response of `GET /api/tags`.
#[derive(Debug, Clone, Deserialize)]
pub struct TagsResponse {
    #[serde(default)]
    pub models: Vec<ModelTag>,
}

/// A locally available model.
#[derive(Debug, Clone, Deserialize)]
pub struct ModelTag {
    pub name: String,
}
