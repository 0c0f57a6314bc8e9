use crate::{CompletionRequest, Error, Response};

/// A trait for backends that can generate completions.
/// All responses are internally streamed - use `response.stream()` for streaming
/// or `response.text().await` for buffered text.
#[async_trait::async_trait]
pub trait CompletionProvider: Send + Sync + 'static {
    /// Generate a completion (internally always streams).
    async fn generate(&self, request: &CompletionRequest) -> Result<Response, Error>;
}
