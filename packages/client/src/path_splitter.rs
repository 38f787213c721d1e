//! PathStreamSplitter: slices a [`PathSelector`](crate::path_selector::PathSelector)'s
//! output into one nested sub-stream per matched subtree, re-rooting each
//! subtree's paths (spec §4.7).
//!
//! The outer "announce a new sub-stream" channel and each sub-stream's own
//! channel are two independently-buffered `tokio::sync::mpsc` queues (spec
//! §5/§9: an internal buffering queue so that neither consumer can block
//! the other indefinitely), fed by one background task so that a reader who
//! never drains a sub-stream cannot stall the outer announcement stream,
//! and vice versa, up to the bound of each queue (see DESIGN.md for the
//! module this is grounded on).

use std::pin::Pin;
use std::task::{Context, Poll};

use futures_core::Stream;
use futures_util::StreamExt;
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;

use crate::error::{JsonFlowError, JsonFlowResult};
use crate::path::Path;
use crate::token::PathedToken;

/// Default bounded-queue depth for each sub-stream's internal channel (see
/// module docs for the backpressure rationale). Chosen as a modest memory
/// cost -- at ~100 bytes/token worst case this is a few KB per open
/// sub-stream.
pub const DEFAULT_SUB_STREAM_BUFFER: usize = 64;

/// One matched subtree's token stream, re-rooted so that its paths are
/// relative to the subtree's own root (spec §4.7).
pub struct SubStream {
    root: Path,
    rx: ReceiverStream<JsonFlowResult<PathedToken>>,
}

impl SubStream {
    /// The path this sub-stream's contents were rooted at in the parent
    /// document.
    #[must_use]
    pub fn root_path(&self) -> &Path {
        &self.root
    }
}

impl Stream for SubStream {
    type Item = JsonFlowResult<PathedToken>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        Pin::new(&mut self.rx).poll_next(cx)
    }
}

/// A `Stream` of [`SubStream`]s, one per matched subtree in emission order.
///
/// Both fields are `Unpin` (a `ReceiverStream` over an already-heap-owned
/// channel, and a `JoinHandle`), so this type needs no structural pinning.
pub struct PathStreamSplitter {
    announce_rx: ReceiverStream<JsonFlowResult<SubStream>>,
    driver: tokio::task::JoinHandle<()>,
}

impl PathStreamSplitter {
    /// Spawns the background driver task that pulls `upstream` and tees it
    /// into per-subtree sub-streams, each buffered up to `sub_stream_buffer`
    /// tokens.
    pub fn new<S>(upstream: S, sub_stream_buffer: usize) -> Self
    where
        S: Stream<Item = JsonFlowResult<PathedToken>> + Send + Unpin + 'static,
    {
        let (announce_tx, announce_rx) = mpsc::channel(8);
        let driver = tokio::spawn(drive(upstream, announce_tx, sub_stream_buffer));
        Self { announce_rx: ReceiverStream::new(announce_rx), driver }
    }
}

impl Drop for PathStreamSplitter {
    fn drop(&mut self) {
        // Dropping the outer stream aborts the driver: per spec §5
        // Cancellation, the outer reader going away must forward as an
        // abort to upstream. Sub-streams already handed out keep whatever
        // they were sent before the abort took effect.
        self.driver.abort();
    }
}

impl Stream for PathStreamSplitter {
    type Item = JsonFlowResult<SubStream>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        Pin::new(&mut self.announce_rx).poll_next(cx)
    }
}

async fn drive<S>(
    mut upstream: S,
    announce_tx: mpsc::Sender<JsonFlowResult<SubStream>>,
    sub_stream_buffer: usize,
) where
    S: Stream<Item = JsonFlowResult<PathedToken>> + Unpin,
{
    let mut current: Option<(Path, mpsc::Sender<JsonFlowResult<PathedToken>>)> = None;

    while let Some(item) = upstream.next().await {
        match item {
            Ok(pathed) => {
                let belongs_to_current = current
                    .as_ref()
                    .is_some_and(|(root, _)| pathed.path.has_prefix(root));
                if !belongs_to_current {
                    if let Some((closed_root, _)) = current.take() {
                        tracing::debug!(
                            target: "jsonflow_core::path_splitter",
                            root = %closed_root,
                            "sub-stream closed"
                        );
                    }
                }
                if current.is_none() {
                    let root = pathed.path.clone();
                    let (tx, rx) = mpsc::channel(sub_stream_buffer);
                    let sub = SubStream { root: root.clone(), rx: ReceiverStream::new(rx) };
                    tracing::debug!(target: "jsonflow_core::path_splitter", root = %root, "sub-stream opened");
                    if announce_tx.send(Ok(sub)).await.is_err() {
                        // Outer reader is gone; forward the abort upstream
                        // by simply stopping the driver.
                        return;
                    }
                    current = Some((root, tx));
                }
                let (root, tx) = current.as_ref().expect("just populated above");
                let rerooted = PathedToken::new(
                    pathed.token,
                    pathed.path.strip_prefix(root).unwrap_or_else(Path::root),
                );
                // A reader who cancelled their sub-stream drops its
                // receiver; `send` then errors and we simply stop writing
                // to it (spec §4.7 buffering discipline), without affecting
                // the outer announcement stream or any other sub-stream.
                let _ = tx.send(Ok(rerooted)).await;
            }
            Err(err) => {
                let upstream_err = err.clone().into_upstream();
                if let Some((root, tx)) = current.take() {
                    tracing::debug!(
                        target: "jsonflow_core::path_splitter",
                        root = %root,
                        "sub-stream closed (upstream error)"
                    );
                    let _ = tx.send(Err(err.into_upstream())).await;
                }
                let _ = announce_tx.send(Err(upstream_err)).await;
                return;
            }
        }
    }
    if let Some((root, _)) = current {
        tracing::debug!(target: "jsonflow_core::path_splitter", root = %root, "sub-stream closed");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::{parse_complete, ParserOptions};
    use crate::path_detector::detect_paths;
    use crate::path_selector::PathSelector;
    use crate::selector::Selector;
    use crate::stringifier::stringify_complete;
    use crate::token::Token;
    use futures_util::StreamExt;

    fn selected_stream(
        input: &str,
        selector: Selector,
    ) -> impl Stream<Item = JsonFlowResult<PathedToken>> + Send + Unpin + 'static {
        let tokens = parse_complete(input, ParserOptions::default()).unwrap();
        let pathed = detect_paths(tokens);
        let upstream = futures_util::stream::iter(pathed.into_iter().map(Ok));
        PathSelector::new(upstream, selector)
    }

    #[tokio::test]
    async fn splits_two_matched_subtrees_with_distinct_root_paths() {
        let input = r#"{"apples":{"results":["a1","a2"]},"cherries":{"results":["c1","c2"]}}"#;
        let selected = selected_stream(input, Selector::parse("*.results").unwrap());

        let mut splitter = PathStreamSplitter::new(selected, DEFAULT_SUB_STREAM_BUFFER);
        let mut results = Vec::new();
        while let Some(sub) = splitter.next().await {
            let mut sub = sub.unwrap();
            let root = sub.root_path().clone();
            let tokens: Vec<Token> = (&mut sub)
                .map(|r| r.unwrap().token)
                .collect::<Vec<_>>()
                .await;
            results.push((root, stringify_complete(&tokens)));
        }

        assert_eq!(results.len(), 2);
        assert_eq!(results[0].0, Path::root().joined("apples").joined("results"));
        assert_eq!(results[0].1, r#"["a1","a2"]"#);
        assert_eq!(results[1].0, Path::root().joined("cherries").joined("results"));
        assert_eq!(results[1].1, r#"["c1","c2"]"#);
    }

    #[tokio::test]
    async fn sub_streams_rerooted_paths_start_at_the_subtree() {
        let input = r#"{"apples":{"results":["a1","a2"]}}"#;
        let selected = selected_stream(input, Selector::parse("*.results").unwrap());
        let mut splitter = PathStreamSplitter::new(selected, DEFAULT_SUB_STREAM_BUFFER);
        let sub = splitter.next().await.unwrap().unwrap();
        let pathed: Vec<PathedToken> = sub.map(|r| r.unwrap()).collect().await;
        assert!(matches!(pathed[0].token, Token::ArrayStart { .. }));
        assert!(pathed[0].path.is_root());
        let item0 = pathed
            .iter()
            .find(|pt| matches!(pt.token, Token::StringChunk { .. }))
            .unwrap();
        assert_eq!(item0.path, Path::root().joined(0usize));
    }
}
