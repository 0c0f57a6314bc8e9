use crate::Error;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::env;
use std::time::Duration;

/// Default base URL of a locally hosted Ollama server.
pub const DEFAULT_BASE_URL: &str = "http://localhost:11434";

/// Model used when none is configured.
pub const DEFAULT_MODEL: &str = "llama2";

/// Output format requested from the server.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum OutputFormat {
    /// Free-form text.
    #[default]
    Plain,
    /// The server constrains the completion to a single JSON value.
    Json,
    /// The server constrains the completion to the given JSON schema.
    Schema(serde_json::Value),
}

impl OutputFormat {
    /// Value of the `format` field in the request body, if any.
    pub fn to_wire(&self) -> Option<serde_json::Value> {
        match self {
            OutputFormat::Plain => None,
            OutputFormat::Json => Some(serde_json::Value::String("json".to_string())),
            OutputFormat::Schema(schema) => Some(schema.clone()),
        }
    }

    /// Whether the aggregated completion is expected to be JSON.
    pub fn is_structured(&self) -> bool {
        !matches!(self, OutputFormat::Plain)
    }
}

/// Sampling options forwarded in the `options` object of a generate request.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ModelOptions {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub top_k: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub top_p: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub num_ctx: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub num_predict: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub repeat_penalty: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub seed: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stop: Option<Vec<String>>,
}

impl ModelOptions {
    /// True when no option is set, so the `options` object can be omitted.
    pub fn is_empty(&self) -> bool {
        self == &ModelOptions::default()
    }

    pub fn temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    pub fn top_k(mut self, top_k: u32) -> Self {
        self.top_k = Some(top_k);
        self
    }

    pub fn top_p(mut self, top_p: f32) -> Self {
        self.top_p = Some(top_p);
        self
    }

    pub fn num_ctx(mut self, num_ctx: u32) -> Self {
        self.num_ctx = Some(num_ctx);
        self
    }

    pub fn num_predict(mut self, num_predict: i32) -> Self {
        self.num_predict = Some(num_predict);
        self
    }

    pub fn repeat_penalty(mut self, repeat_penalty: f32) -> Self {
        self.repeat_penalty = Some(repeat_penalty);
        self
    }

    pub fn seed(mut self, seed: i64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn stop(mut self, stop: Vec<String>) -> Self {
        self.stop = Some(stop);
        self
    }
}

/// Client-wide configuration.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub base_url: String,
    pub model: String,
    pub format: OutputFormat,
    pub options: ModelOptions,
    /// How long the server keeps the model loaded after a request (e.g. "5m").
    pub keep_alive: Option<String>,
    /// Overall request timeout. Unset by default since generations can be long.
    pub timeout: Option<Duration>,
    pub headers: HashMap<String, String>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            model: DEFAULT_MODEL.to_string(),
            format: OutputFormat::Plain,
            options: ModelOptions::default(),
            keep_alive: None,
            timeout: None,
            headers: HashMap::new(),
        }
    }
}

impl ClientConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn with_format(mut self, format: OutputFormat) -> Self {
        self.format = format;
        self
    }

    pub fn with_options(mut self, options: ModelOptions) -> Self {
        self.options = options;
        self
    }

    pub fn with_keep_alive(mut self, keep_alive: impl Into<String>) -> Self {
        self.keep_alive = Some(keep_alive.into());
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    /// Create configuration from environment variables.
    ///
    /// Reads `OLLAMA_BASE_URL` (falling back to `OLLAMA_HOST`), `OLLAMA_MODEL`
    /// and `OLLAMA_KEEP_ALIVE`. Unset variables keep their defaults.
    pub fn from_env() -> Result<Self, Error> {
        let mut config = Self::default();

        if let Some(base_url) = env::var("OLLAMA_BASE_URL")
            .ok()
            .or_else(|| env::var("OLLAMA_HOST").ok())
        {
            let base_url = base_url.trim();
            if base_url.is_empty() {
                return Err(Error::config("OLLAMA_BASE_URL must not be empty"));
            }
            // OLLAMA_HOST is commonly set without a scheme, e.g. "127.0.0.1:11434"
            config.base_url = if base_url.contains("://") {
                base_url.to_string()
            } else {
                format!("http://{base_url}")
            };
        }

        if let Ok(model) = env::var("OLLAMA_MODEL") {
            if !model.trim().is_empty() {
                config.model = model.trim().to_string();
            }
        }

        if let Ok(keep_alive) = env::var("OLLAMA_KEEP_ALIVE") {
            if !keep_alive.trim().is_empty() {
                config.keep_alive = Some(keep_alive.trim().to_string());
            }
        }

        Ok(config)
    }
}
