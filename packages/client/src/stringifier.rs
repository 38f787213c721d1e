//! Stringifier: tokens back to text (spec §4.2).
//!
//! Infallible and verbatim: each token's `raw_text` is emitted as-is.
//! Round-trips exactly with [`crate::parser::Parser`] when its output is
//! consumed unmodified (spec §8 universal invariant).

use std::pin::Pin;
use std::task::{Context, Poll};

use futures_core::Stream;
use pin_project_lite::pin_project;

use crate::error::JsonFlowResult;
use crate::token::Token;

pin_project! {
    /// Adapts a `Stream<Item = Token>` into a `Stream<Item = String>` of
    /// raw text fragments, one per input token.
    pub struct Stringifier<S> {
        #[pin]
        upstream: S,
    }
}

impl<S> Stringifier<S>
where
    S: Stream<Item = JsonFlowResult<Token>>,
{
    pub fn new(upstream: S) -> Self {
        Self { upstream }
    }
}

impl<S> Stream for Stringifier<S>
where
    S: Stream<Item = JsonFlowResult<Token>>,
{
    type Item = JsonFlowResult<String>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let me = self.project();
        match me.upstream.poll_next(cx) {
            Poll::Ready(Some(Ok(token))) => Poll::Ready(Some(Ok(token.raw_text().to_string()))),
            Poll::Ready(Some(Err(err))) => Poll::Ready(Some(Err(err.into_upstream()))),
            Poll::Ready(None) => Poll::Ready(None),
            Poll::Pending => Poll::Pending,
        }
    }
}

/// Stringifies a complete, already-available token slice in one shot.
#[must_use]
pub fn stringify_complete(tokens: &[Token]) -> String {
    tokens.iter().map(Token::raw_text).collect()
}
