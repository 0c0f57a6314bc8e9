//! Fragment accumulation logic for streaming responses.

use crate::types::{GenerationInfo, ResponseFragment};
use crate::CompleteResponse;
use crate::Error;

/// Accumulates streamed fragments into a complete response.
#[derive(Debug, Default)]
pub struct ResponseAccumulator {
    text: String,
    fragment_count: usize,
    /// Set once the end-of-generation fragment has been seen.
    info: Option<GenerationInfo>,
}

impl ResponseAccumulator {
    /// Create a new response accumulator.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a fragment to the aggregate.
    pub fn process_fragment(&mut self, fragment: ResponseFragment) -> Result<(), Error> {
        if self.info.is_some() {
            return Err(Error::server(
                None,
                "Received a fragment after the end-of-generation marker",
            ));
        }

        self.text.push_str(&fragment.text);
        self.fragment_count += 1;

        if fragment.done {
            self.info = Some(fragment.info.unwrap_or_default());
        }

        Ok(())
    }

    /// Whether the end-of-generation fragment has been processed.
    pub fn is_done(&self) -> bool {
        self.info.is_some()
    }

    /// Text accumulated so far.
    pub fn current_content(&self) -> &str {
        &self.text
    }

    /// Finalize and return the complete response.
    ///
    /// Fails if the generation never finished, so a truncated aggregate is
    /// never mistaken for a complete one.
    pub fn finalize(self) -> Result<CompleteResponse, Error> {
        let info = self.info.ok_or_else(|| {
            Error::server(None, "Response ended before the end-of-generation marker")
        })?;

        Ok(CompleteResponse {
            text: self.text,
            fragment_count: self.fragment_count,
            info,
        })
    }
}
