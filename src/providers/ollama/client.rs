use super::types::{ErrorResponse, GenerateChunk, GenerateRequest, TagsResponse, VersionResponse};
use crate::ndjson_stream::NdjsonStreamExt;
use crate::provider::CompletionProvider;
use crate::streaming::{guard_fragments, FragmentStream};
use crate::types::{CallOptions, ClientConfig, CompletionRequest, OutputFormat};
use crate::{CompleteResponse, Error, Response};
use futures_util::StreamExt;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use reqwest::{Client, Url};
use serde::de::DeserializeOwned;
use std::time::Duration;
use tracing::{debug, warn};

const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Streaming completion client for an Ollama server.
#[derive(Debug, Clone)]
pub struct OllamaClient {
    client: Client,
    config: ClientConfig,
    /// Options bound with `with_call_options`, applied under every call.
    defaults: CallOptions,
}

impl OllamaClient {
    /// Create a client for the default local server and model.
    pub fn new() -> Result<Self, Error> {
        Self::with_config(ClientConfig::default())
    }

    /// Create a client from environment variables.
    pub fn from_env() -> Result<Self, Error> {
        Self::with_config(ClientConfig::from_env()?)
    }

    /// Create a client with custom configuration.
    pub fn with_config(config: ClientConfig) -> Result<Self, Error> {
        let url = Url::parse(&config.base_url)
            .map_err(|e| Error::config(format!("Invalid base URL '{}': {e}", config.base_url)))?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(Error::config(format!(
                "Base URL must use http or https, got '{}'",
                url.scheme()
            )));
        }

        let mut headers = HeaderMap::new();
        for (name, value) in &config.headers {
            let name = HeaderName::from_bytes(name.as_bytes())
                .map_err(|e| Error::config(format!("Invalid header name '{name}': {e}")))?;
            let value = HeaderValue::from_str(value).map_err(|e| {
                Error::config(format!("Invalid value for header '{}': {e}", name.as_str()))
            })?;
            headers.insert(name, value);
        }

        let mut builder = Client::builder()
            .connect_timeout(CONNECT_TIMEOUT)
            .default_headers(headers);
        if let Some(timeout) = config.timeout {
            builder = builder.timeout(timeout);
        }

        Ok(Self {
            client: builder.build()?,
            config,
            defaults: CallOptions::default(),
        })
    }

    /// Return a client that applies `options` to every call.
    ///
    /// Per-call options still take precedence over bound ones.
    pub fn with_call_options(&self, options: CallOptions) -> Self {
        Self {
            client: self.client.clone(),
            config: self.config.clone(),
            defaults: self.defaults.clone().merge(options),
        }
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn model(&self) -> &str {
        &self.config.model
    }

    pub fn base_url(&self) -> &str {
        &self.config.base_url
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/{path}", self.config.base_url.trim_end_matches('/'))
    }

    /// Resolve a request for `prompt` from configuration, bound and per-call options.
    pub fn build_request(
        &self,
        prompt: impl Into<String>,
        options: CallOptions,
    ) -> CompletionRequest {
        CompletionRequest::from_config(
            &self.config,
            prompt,
            self.defaults.clone().merge(options),
        )
    }

    /// Send a prompt and return the aggregated completion text.
    pub async fn invoke(
        &self,
        prompt: impl Into<String>,
        options: CallOptions,
    ) -> Result<String, Error> {
        Ok(self.complete(prompt, options).await?.text)
    }

    /// Send a prompt and return the aggregated completion with its metadata.
    pub async fn complete(
        &self,
        prompt: impl Into<String>,
        options: CallOptions,
    ) -> Result<CompleteResponse, Error> {
        let request = self.build_request(prompt, options);
        self.generate(&request).await?.buffer().await
    }

    /// Send a prompt and return its fragments as they arrive.
    pub async fn stream(
        &self,
        prompt: impl Into<String>,
        options: CallOptions,
    ) -> Result<FragmentStream, Error> {
        let request = self.build_request(prompt, options);
        Ok(self.generate(&request).await?.stream())
    }

    /// Send a prompt in structured output mode and deserialize the completion.
    ///
    /// Uses JSON mode unless the resolved request already asks for a schema.
    pub async fn invoke_json<T: DeserializeOwned>(
        &self,
        prompt: impl Into<String>,
        options: CallOptions,
    ) -> Result<T, Error> {
        let mut request = self.build_request(prompt, options);
        if !request.format.is_structured() {
            request.format = OutputFormat::Json;
        }
        self.generate(&request).await?.buffer().await?.json()
    }

    /// Check whether the server is reachable.
    pub async fn health_check(&self) -> Result<bool, Error> {
        match self.client.get(self.endpoint("api/version")).send().await {
            Ok(response) if response.status().is_success() => {
                if let Ok(version) = response.json::<VersionResponse>().await {
                    debug!(version = %version.version, "Ollama server is reachable");
                }
                Ok(true)
            }
            Ok(response) => {
                debug!(status = response.status().as_u16(), "health check failed");
                Ok(false)
            }
            Err(e) => {
                debug!(error = %e, "health check failed");
                Ok(false)
            }
        }
    }

    /// List the models available on the server.
    pub async fn list_models(&self) -> Result<Vec<String>, Error> {
        let response = self.client.get(self.endpoint("api/tags")).send().await?;
        let response = Self::check_status(response).await?;

        let tags: TagsResponse = response
            .json()
            .await
            .map_err(|e| Error::server(None, format!("Failed to parse model list: {e}")))?;

        Ok(tags.models.into_iter().map(|m| m.name).collect())
    }

    /// Convert a resolved request to the wire format.
    fn convert_request(request: &CompletionRequest) -> GenerateRequest {
        GenerateRequest {
            model: request.model.clone(),
            prompt: request.prompt.clone(),
            stream: true,
            format: request.format.to_wire(),
            images: (!request.attachments.is_empty()).then(|| {
                request
                    .attachments
                    .iter()
                    .map(|a| a.as_base64().to_string())
                    .collect()
            }),
            system: request.system.clone(),
            options: (!request.options.is_empty()).then(|| request.options.clone()),
            keep_alive: request.keep_alive.clone(),
        }
    }

    /// Turn a non-success status into a server error, using the body's message.
    async fn check_status(response: reqwest::Response) -> Result<reqwest::Response, Error> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        let message = serde_json::from_str::<ErrorResponse>(&body)
            .map(|e| e.error)
            .unwrap_or(body);
        warn!(status = status.as_u16(), %message, "Ollama returned an error");

        Err(Error::server(Some(status.as_u16()), message))
    }
}

#[async_trait::async_trait]
impl CompletionProvider for OllamaClient {
    /// Generate a completion (internally always streams).
    async fn generate(&self, request: &CompletionRequest) -> Result<Response, Error> {
        request.validate()?;

        if request.cancel.is_cancelled() {
            debug!("request cancelled before sending");
            return Err(Error::Aborted);
        }

        let body = Self::convert_request(request);
        debug!(
            model = %body.model,
            prompt_len = body.prompt.len(),
            images = request.attachments.len(),
            format = ?request.format,
            "sending generate request"
        );

        let send = self
            .client
            .post(self.endpoint("api/generate"))
            .json(&body)
            .send();

        // Dropping the pending request closes the connection
        let response = tokio::select! {
            biased;
            _ = request.cancel.cancelled() => {
                debug!("request cancelled while connecting");
                return Err(Error::Aborted);
            }
            result = send => result?,
        };

        // The error body of a failed request can stall too
        let response = tokio::select! {
            biased;
            _ = request.cancel.cancelled() => {
                debug!("request cancelled while reading the status");
                return Err(Error::Aborted);
            }
            result = Self::check_status(response) => result?,
        };

        let fragments = response
            .bytes_stream()
            .ndjson_lines()
            .map(|line| line.and_then(|line| GenerateChunk::parse(&line)?.into_fragment()));

        Ok(Response::from_stream(guard_fragments(
            fragments,
            request.cancel.clone(),
            request.callbacks.clone(),
        )))
    }
}
