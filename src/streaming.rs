//! Fragment stream guard: cancellation, token callbacks and end-of-stream checks.

use crate::callback::FragmentSink;
use crate::types::ResponseFragment;
use crate::Error;
use futures_util::stream::Stream;
use futures_util::StreamExt;
use std::pin::Pin;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace, warn};

/// A lazily pulled sequence of fragments.
pub type FragmentStream = Pin<Box<dyn Stream<Item = Result<ResponseFragment, Error>> + Send>>;

enum Step {
    Cancelled,
    Next(Option<Result<ResponseFragment, Error>>),
}

/// Wrap a raw fragment stream so that it
///
/// - yields `Error::Aborted` and stops as soon as `cancel` fires, checked
///   before every fragment is pulled;
/// - invokes each sink for every fragment before it is yielded;
/// - stops after the end-of-generation fragment;
/// - fails with a server error if the input ends before that fragment.
///
/// After an error item the stream ends. Dropping the inner stream closes the
/// underlying connection.
pub fn guard_fragments<S>(
    inner: S,
    cancel: CancellationToken,
    sinks: Vec<Arc<dyn FragmentSink>>,
) -> FragmentStream
where
    S: Stream<Item = Result<ResponseFragment, Error>> + Send + 'static,
{
    Box::pin(async_stream::stream! {
        let mut inner = Box::pin(inner);
        let mut emitted = 0usize;

        loop {
            let step = tokio::select! {
                biased;
                _ = cancel.cancelled() => Step::Cancelled,
                item = inner.next() => Step::Next(item),
            };

            match step {
                Step::Cancelled => {
                    debug!(fragments = emitted, "generation cancelled, closing stream");
                    drop(inner);
                    yield Err(Error::Aborted);
                    return;
                }
                Step::Next(Some(Ok(fragment))) => {
                    emitted += 1;
                    trace!(index = emitted, done = fragment.done, "fragment received");
                    for sink in &sinks {
                        sink.on_fragment(&fragment);
                    }
                    let done = fragment.done;
                    yield Ok(fragment);
                    if done {
                        debug!(fragments = emitted, "generation finished");
                        return;
                    }
                }
                Step::Next(Some(Err(e))) => {
                    warn!(error = %e, fragments = emitted, "generation failed");
                    yield Err(e);
                    return;
                }
                Step::Next(None) => {
                    warn!(fragments = emitted, "stream ended before end-of-generation marker");
                    yield Err(Error::server(
                        None,
                        "Stream ended before the end-of-generation marker",
                    ));
                    return;
                }
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::GenerationInfo;
    use futures_util::stream;
    use std::sync::Mutex;

    fn fragments(texts: &[&str]) -> Vec<Result<ResponseFragment, Error>> {
        let mut items: Vec<_> = texts
            .iter()
            .map(|t| Ok(ResponseFragment::text(*t)))
            .collect();
        items.push(Ok(ResponseFragment::last("", GenerationInfo::default())));
        items
    }

    #[tokio::test]
    async fn test_passes_fragments_and_stops_at_done() {
        let mut items = fragments(&["Ich ", "liebe"]);
        // Anything after the done marker is never pulled
        items.push(Ok(ResponseFragment::text("ignored")));

        let collected: Vec<_> = guard_fragments(
            stream::iter(items),
            CancellationToken::new(),
            Vec::new(),
        )
        .collect()
        .await;

        assert_eq!(collected.len(), 3);
        assert!(collected.iter().all(|r| r.is_ok()));
        assert!(collected[2].as_ref().unwrap().done);
    }

    #[tokio::test]
    async fn test_sinks_see_every_fragment_in_order() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink: Arc<dyn FragmentSink> = {
            let seen = seen.clone();
            Arc::new(move |f: &ResponseFragment| seen.lock().unwrap().push(f.text.clone()))
        };

        let texts: Vec<String> = guard_fragments(
            stream::iter(fragments(&["Ich ", "liebe ", "Programmieren"])),
            CancellationToken::new(),
            vec![sink],
        )
        .map(|r| r.unwrap().text)
        .collect()
        .await;

        assert_eq!(*seen.lock().unwrap(), texts);
        assert_eq!(texts.concat(), "Ich liebe Programmieren");
    }

    #[tokio::test]
    async fn test_cancelled_before_first_fragment() {
        let token = CancellationToken::new();
        token.cancel();

        let calls = Arc::new(Mutex::new(0));
        let sink: Arc<dyn FragmentSink> = {
            let calls = calls.clone();
            Arc::new(move |_: &ResponseFragment| *calls.lock().unwrap() += 1)
        };

        let mut guarded = guard_fragments(stream::iter(fragments(&["a", "b"])), token, vec![sink]);

        assert!(matches!(guarded.next().await, Some(Err(Error::Aborted))));
        assert!(guarded.next().await.is_none());
        assert_eq!(*calls.lock().unwrap(), 0);
    }

    #[tokio::test]
    async fn test_cancelled_mid_stream() {
        let token = CancellationToken::new();
        let mut guarded = guard_fragments(
            stream::iter(fragments(&["a", "b", "c"])),
            token.clone(),
            Vec::new(),
        );

        assert_eq!(guarded.next().await.unwrap().unwrap().text, "a");
        token.cancel();
        assert!(matches!(guarded.next().await, Some(Err(Error::Aborted))));
        assert!(guarded.next().await.is_none());
    }

    #[tokio::test]
    async fn test_cancellation_interrupts_pending_fragment() {
        let token = CancellationToken::new();
        let mut guarded = guard_fragments(
            stream::pending::<Result<ResponseFragment, Error>>(),
            token.clone(),
            Vec::new(),
        );

        let canceller = tokio::spawn(async move {
            tokio::time::sleep(std::time::Duration::from_millis(20)).await;
            token.cancel();
        });

        let item = tokio::time::timeout(std::time::Duration::from_secs(5), guarded.next())
            .await
            .expect("cancellation must not hang");
        assert!(matches!(item, Some(Err(Error::Aborted))));
        canceller.await.unwrap();
    }

    #[test]
    fn test_cancel_wakes_waiting_consumer() {
        let token = CancellationToken::new();
        let mut guarded = tokio_test::task::spawn(guard_fragments(
            stream::pending::<Result<ResponseFragment, Error>>(),
            token.clone(),
            Vec::new(),
        ));

        tokio_test::assert_pending!(guarded.poll_next());
        token.cancel();
        assert!(guarded.is_woken());
        assert!(matches!(
            guarded.poll_next(),
            std::task::Poll::Ready(Some(Err(Error::Aborted)))
        ));
    }

    #[tokio::test]
    async fn test_truncated_stream_is_an_error() {
        let items = vec![Ok(ResponseFragment::text("partial"))];
        let collected: Vec<_> =
            guard_fragments(stream::iter(items), CancellationToken::new(), Vec::new())
                .collect()
                .await;

        assert_eq!(collected.len(), 2);
        assert!(matches!(collected[1], Err(Error::Server { .. })));
    }

    #[tokio::test]
    async fn test_error_item_ends_stream() {
        let items = vec![
            Ok(ResponseFragment::text("a")),
            Err(Error::server(None, "boom")),
            Ok(ResponseFragment::text("b")),
        ];
        let collected: Vec<_> =
            guard_fragments(stream::iter(items), CancellationToken::new(), Vec::new())
                .collect()
                .await;

        assert_eq!(collected.len(), 2);
        assert!(collected[1].is_err());
    }
}
