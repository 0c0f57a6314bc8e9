//! Newline-delimited JSON stream adapter.

use crate::Error;
use bytes::Bytes;
use futures_util::stream::Stream;
use futures_util::StreamExt;
use std::collections::VecDeque;
use std::pin::Pin;
use std::task::{ready, Context, Poll};

/// Largest partial line we are willing to buffer.
const MAX_LINE_BYTES: usize = 1_048_576;

/// A stream adapter that splits a byte stream into complete, non-blank lines.
pub struct NdjsonStream<S> {
    inner: S,
    buffer: Vec<u8>,
    lines: VecDeque<String>,
    finished: bool,
}

impl<S> NdjsonStream<S> {
    /// Create a new line stream from a byte stream.
    pub fn new(stream: S) -> Self {
        Self {
            inner: stream,
            buffer: Vec::new(),
            lines: VecDeque::new(),
            finished: false,
        }
    }

    /// Move every complete line out of the buffer.
    fn split_lines(&mut self) -> Result<(), Error> {
        let mut start = 0;

        while let Some(pos) = memchr::memchr(b'\n', &self.buffer[start..]) {
            let line_end = start + pos;
            Self::push_line(&mut self.lines, &self.buffer[start..line_end])?;
            start = line_end + 1;
        }

        if start > 0 {
            self.buffer.drain(..start);
        }

        Ok(())
    }

    fn push_line(lines: &mut VecDeque<String>, bytes: &[u8]) -> Result<(), Error> {
        let text = std::str::from_utf8(bytes)
            .map_err(|e| Error::server(None, format!("Invalid UTF-8 in response line: {e}")))?;
        let text = text.trim();
        if !text.is_empty() {
            lines.push_back(text.to_string());
        }
        Ok(())
    }
}

impl<S, E> Stream for NdjsonStream<S>
where
    S: Stream<Item = Result<Bytes, E>> + Unpin,
    E: Into<Error>,
{
    type Item = Result<String, Error>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        loop {
            if let Some(line) = self.lines.pop_front() {
                return Poll::Ready(Some(Ok(line)));
            }

            if self.finished {
                return Poll::Ready(None);
            }

            let chunk = match ready!(self.inner.poll_next_unpin(cx)) {
                Some(Ok(chunk)) => chunk,
                Some(Err(e)) => {
                    self.finished = true;
                    self.buffer.clear();
                    return Poll::Ready(Some(Err(e.into())));
                }
                None => {
                    // A final line may arrive without its trailing newline
                    self.finished = true;
                    let rest = std::mem::take(&mut self.buffer);
                    if let Err(e) = Self::push_line(&mut self.lines, &rest) {
                        return Poll::Ready(Some(Err(e)));
                    }
                    continue;
                }
            };

            self.buffer.extend_from_slice(&chunk);

            if let Err(e) = self.split_lines() {
                self.finished = true;
                self.buffer.clear();
                return Poll::Ready(Some(Err(e)));
            }

            if self.buffer.len() > MAX_LINE_BYTES {
                self.finished = true;
                self.buffer.clear();
                return Poll::Ready(Some(Err(Error::server(
                    None,
                    "Response line exceeded maximum size",
                ))));
            }
        }
    }
}

/// Extension trait to add NDJSON line splitting to byte streams.
pub trait NdjsonStreamExt: Stream {
    /// Split this byte stream into newline-delimited lines.
    fn ndjson_lines(self) -> NdjsonStream<Self>
    where
        Self: Sized,
    {
        NdjsonStream::new(self)
    }
}

impl<S: Stream> NdjsonStreamExt for S {}
