//! PathSelector: filters a path-annotated token stream by a [`Selector`]
//! expression, forwarding every descendant of a match alongside the match
//! itself (spec §4.6).

use std::pin::Pin;
use std::task::{Context, Poll};

use futures_core::Stream;
use pin_project_lite::pin_project;

use crate::error::JsonFlowResult;
use crate::path::Path;
use crate::selector::Selector;
use crate::token::PathedToken;

pin_project! {
    /// Adapts a `Stream<Item = PathedToken>` by dropping every token whose
    /// path neither matches `selector` nor descends from a path that did.
    ///
    /// The resulting stream may contain several top-level (path == root of
    /// a match) values and need not itself be a single valid JSON document
    /// -- it is meant to feed [`crate::path_splitter::PathStreamSplitter`]
    /// or a [`crate::deserializer`] that tolerates multiple top-level
    /// values.
    pub struct PathSelector<S> {
        #[pin]
        upstream: S,
        selector: Selector,
        include_descendants: bool,
        matched_prefix: Option<Path>,
    }
}

impl<S> PathSelector<S>
where
    S: Stream<Item = JsonFlowResult<PathedToken>>,
{
    #[must_use]
    pub fn new(upstream: S, selector: Selector) -> Self {
        Self { upstream, selector, include_descendants: true, matched_prefix: None }
    }

    /// When `false`, only tokens whose path matches the selector exactly
    /// are forwarded -- descendants of a match are dropped (spec §4.6's
    /// "optionally including all descendants").
    #[must_use]
    pub fn with_include_descendants(mut self, include: bool) -> Self {
        self.include_descendants = include;
        self
    }
}

impl<S> Stream for PathSelector<S>
where
    S: Stream<Item = JsonFlowResult<PathedToken>>,
{
    type Item = JsonFlowResult<PathedToken>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let mut me = self.project();
        loop {
            match me.upstream.as_mut().poll_next(cx) {
                Poll::Ready(Some(Ok(pathed))) => {
                    let within_prefix = *me.include_descendants
                        && me
                            .matched_prefix
                            .as_ref()
                            .is_some_and(|prefix| pathed.path.has_prefix(prefix));
                    if !within_prefix {
                        *me.matched_prefix = None;
                    }
                    let is_match = within_prefix || me.selector.matches(&pathed.path);
                    if is_match {
                        if !within_prefix {
                            *me.matched_prefix = Some(pathed.path.clone());
                        }
                        return Poll::Ready(Some(Ok(pathed)));
                    }
                    // Not a match and not within an active prefix: drop and
                    // keep pulling from upstream.
                }
                Poll::Ready(Some(Err(err))) => return Poll::Ready(Some(Err(err.into_upstream()))),
                Poll::Ready(None) => return Poll::Ready(None),
                Poll::Pending => return Poll::Pending,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::{parse_complete, ParserOptions};
    use crate::path_detector::detect_paths;
    use crate::token::Token;
    use futures_util::StreamExt;

    async fn select(input: &str, selector: Selector) -> Vec<PathedToken> {
        let tokens = parse_complete(input, ParserOptions::default()).unwrap();
        let pathed = detect_paths(tokens);
        let upstream = futures_util::stream::iter(pathed.into_iter().map(Ok));
        PathSelector::new(upstream, selector)
            .map(|r| r.unwrap())
            .collect()
            .await
    }

    #[tokio::test]
    async fn root_selector_passes_every_token_unchanged() {
        let input = r#"{"a":[1,2]}"#;
        let all_tokens = parse_complete(input, ParserOptions::default()).unwrap();
        let all_pathed = detect_paths(all_tokens);
        let selected = select(input, Selector::root()).await;
        assert_eq!(selected, all_pathed);
    }

    #[tokio::test]
    async fn wildcard_pattern_selects_each_matching_subtree_with_descendants() {
        let input = r#"{"apples":{"results":["a1","a2"]},"cherries":{"results":["c1","c2"]}}"#;
        let selector = Selector::parse("*.results").unwrap();
        let selected = select(input, selector).await;

        // Both matched roots (ArrayStart at apples.results and
        // cherries.results) plus their full subtrees are present; nothing
        // outside those subtrees survives.
        let array_starts: Vec<&Path> = selected
            .iter()
            .filter(|pt| matches!(pt.token, Token::ArrayStart { .. }))
            .map(|pt| &pt.path)
            .collect();
        assert_eq!(array_starts.len(), 2);
        assert!(array_starts.contains(&&Path::root().joined("apples").joined("results")));
        assert!(array_starts.contains(&&Path::root().joined("cherries").joined("results")));

        for pt in &selected {
            assert!(pt.path.has_prefix(&Path::root().joined("apples").joined("results"))
                || pt.path.has_prefix(&Path::root().joined("cherries").joined("results")));
        }
    }
}
