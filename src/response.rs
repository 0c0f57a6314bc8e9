//! Response handling for completions.

use crate::streaming::FragmentStream;
use crate::types::{GenerationInfo, ResponseFragment};
use crate::Error;
use futures_util::stream::Stream;
use serde::de::DeserializeOwned;

/// A complete, aggregated completion.
#[derive(Debug, Clone, PartialEq)]
pub struct CompleteResponse {
    /// Concatenation of every fragment, in emission order.
    pub text: String,
    /// Number of fragments the server sent, including the final one.
    pub fragment_count: usize,
    /// Metadata from the end-of-generation fragment.
    pub info: GenerationInfo,
}

impl CompleteResponse {
    /// Get the aggregated text.
    pub fn content(&self) -> &str {
        &self.text
    }

    /// Parse the aggregated text as JSON.
    pub fn json<T: DeserializeOwned>(&self) -> Result<T, Error> {
        serde_json::from_str(&self.text).map_err(|e| Error::parse(e.to_string()))
    }
}

/// Response from a completion that can be streamed or buffered.
/// All responses are internally streaming.
pub struct Response {
    stream: FragmentStream,
}

impl Response {
    /// Create a new response from a stream of fragments.
    pub fn from_stream<S>(stream: S) -> Self
    where
        S: Stream<Item = Result<ResponseFragment, Error>> + Send + 'static,
    {
        Self {
            stream: Box::pin(stream),
        }
    }

    /// Buffer the entire response by consuming the stream.
    pub async fn buffer(self) -> Result<CompleteResponse, Error> {
        use futures_util::StreamExt;

        let mut stream = self.stream;
        let mut accumulator = crate::accumulator::ResponseAccumulator::new();

        while let Some(fragment) = stream.next().await {
            accumulator.process_fragment(fragment?)?;
            if accumulator.is_done() {
                break;
            }
        }

        accumulator.finalize()
    }

    /// Get just the text content (convenience method).
    pub async fn text(self) -> Result<String, Error> {
        Ok(self.buffer().await?.text)
    }

    /// Buffer the response and parse it as JSON.
    pub async fn json<T: DeserializeOwned>(self) -> Result<T, Error> {
        self.buffer().await?.json()
    }

    /// Stream the response fragments.
    pub fn stream(self) -> FragmentStream {
        self.stream
    }
}
