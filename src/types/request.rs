//! Request types: per-call options and the fully resolved completion request.

use super::config::{ClientConfig, ModelOptions, OutputFormat};
use crate::callback::FragmentSink;
use crate::Error;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use std::fmt;
use std::path::Path;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// A binary attachment (typically an image) sent base64-encoded with the prompt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attachment {
    data: String,
}

impl Attachment {
    /// Encode raw bytes.
    pub fn from_bytes(bytes: impl AsRef<[u8]>) -> Self {
        Self {
            data: STANDARD.encode(bytes.as_ref()),
        }
    }

    /// Wrap data that is already base64-encoded. The encoding is checked.
    pub fn from_base64(encoded: impl Into<String>) -> Result<Self, Error> {
        let data = encoded.into();
        STANDARD
            .decode(data.as_bytes())
            .map_err(|e| Error::config(format!("Attachment is not valid base64: {e}")))?;
        Ok(Self { data })
    }

    /// Read and encode a file.
    pub async fn from_file(path: impl AsRef<Path>) -> Result<Self, Error> {
        let path = path.as_ref();
        let bytes = tokio::fs::read(path).await.map_err(|e| {
            Error::config(format!("Failed to read attachment {}: {e}", path.display()))
        })?;
        Ok(Self::from_bytes(bytes))
    }

    pub fn as_base64(&self) -> &str {
        &self.data
    }
}

/// Per-call configuration.
///
/// Unset fields fall back to the client configuration.
#[derive(Clone, Default)]
pub struct CallOptions {
    pub format: Option<OutputFormat>,
    pub attachments: Vec<Attachment>,
    pub system: Option<String>,
    pub options: Option<ModelOptions>,
    pub cancel: Option<CancellationToken>,
    pub callbacks: Vec<Arc<dyn FragmentSink>>,
}

impl fmt::Debug for CallOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CallOptions")
            .field("format", &self.format)
            .field("attachments", &self.attachments.len())
            .field("system", &self.system)
            .field("options", &self.options)
            .field("cancel", &self.cancel)
            .field("callbacks", &self.callbacks.len())
            .finish()
    }
}

impl CallOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_format(mut self, format: OutputFormat) -> Self {
        self.format = Some(format);
        self
    }

    /// Shorthand for `with_format(OutputFormat::Json)`.
    pub fn json(self) -> Self {
        self.with_format(OutputFormat::Json)
    }

    pub fn with_attachment(mut self, attachment: Attachment) -> Self {
        self.attachments.push(attachment);
        self
    }

    pub fn with_attachments(mut self, attachments: Vec<Attachment>) -> Self {
        self.attachments.extend(attachments);
        self
    }

    pub fn with_system(mut self, system: impl Into<String>) -> Self {
        self.system = Some(system.into());
        self
    }

    pub fn with_options(mut self, options: ModelOptions) -> Self {
        self.options = Some(options);
        self
    }

    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = Some(token);
        self
    }

    pub fn with_callback(mut self, sink: impl FragmentSink + 'static) -> Self {
        self.callbacks.push(Arc::new(sink));
        self
    }

    pub fn with_shared_callback(mut self, sink: Arc<dyn FragmentSink>) -> Self {
        self.callbacks.push(sink);
        self
    }

    /// Layer `overrides` on top of these options.
    ///
    /// Set fields in `overrides` win; attachments are replaced only when
    /// `overrides` carries some; callbacks from both are kept, ours first.
    pub fn merge(self, overrides: CallOptions) -> CallOptions {
        let mut callbacks = self.callbacks;
        callbacks.extend(overrides.callbacks);

        CallOptions {
            format: overrides.format.or(self.format),
            attachments: if overrides.attachments.is_empty() {
                self.attachments
            } else {
                overrides.attachments
            },
            system: overrides.system.or(self.system),
            options: overrides.options.or(self.options),
            cancel: overrides.cancel.or(self.cancel),
            callbacks,
        }
    }
}

/// A fully resolved request, consumed once by a provider.
#[derive(Clone)]
pub struct CompletionRequest {
    pub model: String,
    pub prompt: String,
    pub format: OutputFormat,
    pub attachments: Vec<Attachment>,
    pub system: Option<String>,
    pub options: ModelOptions,
    pub keep_alive: Option<String>,
    pub cancel: CancellationToken,
    pub callbacks: Vec<Arc<dyn FragmentSink>>,
}

impl fmt::Debug for CompletionRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CompletionRequest")
            .field("model", &self.model)
            .field("prompt", &self.prompt)
            .field("format", &self.format)
            .field("attachments", &self.attachments.len())
            .field("system", &self.system)
            .field("options", &self.options)
            .field("keep_alive", &self.keep_alive)
            .field("cancelled", &self.cancel.is_cancelled())
            .field("callbacks", &self.callbacks.len())
            .finish()
    }
}

impl CompletionRequest {
    /// Create a plain-text request with no attachments or callbacks.
    pub fn new(model: impl Into<String>, prompt: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            prompt: prompt.into(),
            format: OutputFormat::Plain,
            attachments: Vec::new(),
            system: None,
            options: ModelOptions::default(),
            keep_alive: None,
            cancel: CancellationToken::new(),
            callbacks: Vec::new(),
        }
    }

    /// Resolve a request from client configuration and per-call options.
    pub fn from_config(
        config: &ClientConfig,
        prompt: impl Into<String>,
        call: CallOptions,
    ) -> Self {
        Self {
            model: config.model.clone(),
            prompt: prompt.into(),
            format: call.format.unwrap_or_else(|| config.format.clone()),
            attachments: call.attachments,
            system: call.system,
            options: call.options.unwrap_or_else(|| config.options.clone()),
            keep_alive: config.keep_alive.clone(),
            cancel: call.cancel.unwrap_or_else(CancellationToken::new),
            callbacks: call.callbacks,
        }
    }

    pub fn format(mut self, format: OutputFormat) -> Self {
        self.format = format;
        self
    }

    pub fn attachment(mut self, attachment: Attachment) -> Self {
        self.attachments.push(attachment);
        self
    }

    pub fn cancel_with(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    pub fn callback(mut self, sink: impl FragmentSink + 'static) -> Self {
        self.callbacks.push(Arc::new(sink));
        self
    }

    /// Check the request invariants before any I/O happens.
    pub fn validate(&self) -> Result<(), Error> {
        if self.prompt.trim().is_empty() {
            return Err(Error::config("Prompt must not be empty"));
        }
        if self.model.trim().is_empty() {
            return Err(Error::config("Model name must not be empty"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ResponseFragment;

    #[test]
    fn test_attachment_encoding() {
        let attachment = Attachment::from_bytes(b"hotdog");
        assert_eq!(attachment.as_base64(), "aG90ZG9n");

        let decoded = Attachment::from_base64("aG90ZG9n").unwrap();
        assert_eq!(decoded, attachment);

        let err = Attachment::from_base64("not base64!").unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[tokio::test]
    async fn test_attachment_from_missing_file() {
        let err = Attachment::from_file("/definitely/not/here.jpg")
            .await
            .unwrap_err();
        assert!(err.to_string().contains("Failed to read attachment"));
    }

    #[test]
    fn test_merge_prefers_overrides() {
        let bound = CallOptions::new()
            .with_attachment(Attachment::from_bytes(b"a"))
            .with_system("be brief")
            .with_callback(|_: &ResponseFragment| {});
        let per_call = CallOptions::new()
            .json()
            .with_callback(|_: &ResponseFragment| {});

        let merged = bound.merge(per_call);
        assert_eq!(merged.format, Some(OutputFormat::Json));
        assert_eq!(merged.attachments.len(), 1);
        assert_eq!(merged.system.as_deref(), Some("be brief"));
        assert_eq!(merged.callbacks.len(), 2);

        let replaced = CallOptions::new()
            .with_attachment(Attachment::from_bytes(b"a"))
            .merge(CallOptions::new().with_attachment(Attachment::from_bytes(b"b")));
        assert_eq!(replaced.attachments, vec![Attachment::from_bytes(b"b")]);
    }

    #[test]
    fn test_from_config_falls_back_to_client_settings() {
        let config = ClientConfig::new()
            .with_model("llama2")
            .with_format(OutputFormat::Json)
            .with_keep_alive("5m");

        let request = CompletionRequest::from_config(&config, "Hi", CallOptions::new());
        assert_eq!(request.model, "llama2");
        assert_eq!(request.format, OutputFormat::Json);
        assert_eq!(request.keep_alive.as_deref(), Some("5m"));
        assert!(!request.cancel.is_cancelled());

        let request = CompletionRequest::from_config(
            &config,
            "Hi",
            CallOptions::new().with_format(OutputFormat::Plain),
        );
        assert_eq!(request.format, OutputFormat::Plain);
    }

    #[test]
    fn test_validate_rejects_empty_prompt() {
        assert!(CompletionRequest::new("llama2", "Hello").validate().is_ok());

        let err = CompletionRequest::new("llama2", "   ").validate().unwrap_err();
        assert!(err.to_string().contains("Prompt must not be empty"));

        let err = CompletionRequest::new("", "Hello").validate().unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }
}
