//! PathDetector: annotates a [`Token`] stream with each token's position in
//! the document's nesting hierarchy (spec §4.5).
//!
//! One frame per open container; a segment is pushed onto the path when a
//! child value starts and popped when that value completes (see DESIGN.md
//! for the module this is grounded on).

use std::pin::Pin;
use std::task::{Context, Poll};

use futures_core::Stream;
use pin_project_lite::pin_project;

use crate::error::JsonFlowResult;
use crate::path::{Path, Segment};
use crate::token::{PathedToken, Role, Token};

#[derive(Debug)]
enum Frame {
    /// `segment_pushed` is true while a child value's key/index segment is
    /// currently on `path` -- i.e. between that value's first token and its
    /// terminal token.
    Object { key: String, segment_pushed: bool },
    Array { index: usize, segment_pushed: bool },
}

/// The synchronous half of path annotation: consumes one token at a time
/// and returns it paired with its path snapshot.
#[derive(Debug, Default)]
pub struct PathDetectorEngine {
    frames: Vec<Frame>,
    path: Path,
}

fn is_value_start(token: &Token) -> bool {
    matches!(
        token,
        Token::ObjectStart { .. }
            | Token::ArrayStart { .. }
            | Token::StringStart { role: Role::Value, .. }
            | Token::NumberValue { .. }
            | Token::BooleanValue { .. }
            | Token::NullValue { .. }
    )
}

fn is_value_terminal(token: &Token) -> bool {
    matches!(
        token,
        Token::NumberValue { .. }
            | Token::BooleanValue { .. }
            | Token::NullValue { .. }
            | Token::StringEnd { role: Role::Value, .. }
            | Token::ObjectEnd { .. }
            | Token::ArrayEnd { .. }
    )
}

impl PathDetectorEngine {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Annotates `token` with its path snapshot and advances the internal
    /// frame/path state accordingly.
    pub fn push(&mut self, token: Token) -> PathedToken {
        // "Before emitting": promote a pending value-start into the active
        // path (spec §4.5's NextValue -> ActiveValue promotion, folded here
        // into "only value-start tokens push a segment").
        if is_value_start(&token) {
            if let Some(frame) = self.frames.last_mut() {
                let pushed = match frame {
                    Frame::Object { key, segment_pushed } if !*segment_pushed => {
                        *segment_pushed = true;
                        Some(Segment::Key(std::sync::Arc::from(key.as_str())))
                    }
                    Frame::Array { index, segment_pushed } if !*segment_pushed => {
                        *segment_pushed = true;
                        Some(Segment::Index(*index))
                    }
                    _ => None,
                };
                if let Some(segment) = pushed {
                    self.path.push(segment);
                }
            }
        }

        let snapshot = self.path.clone();

        match &token {
            Token::ObjectStart { .. } => {
                self.frames.push(Frame::Object { key: String::new(), segment_pushed: false });
            }
            Token::ArrayStart { .. } => {
                self.frames.push(Frame::Array { index: 0, segment_pushed: false });
            }
            Token::StringChunk { role: Role::Key, text, .. } => {
                if let Some(Frame::Object { key, .. }) = self.frames.last_mut() {
                    key.push_str(text);
                }
            }
            Token::Comma { .. } => match self.frames.last_mut() {
                Some(Frame::Object { key, segment_pushed }) => {
                    key.clear();
                    *segment_pushed = false;
                }
                Some(Frame::Array { index, segment_pushed }) => {
                    *index += 1;
                    *segment_pushed = false;
                }
                None => {}
            },
            _ => {}
        }

        if is_value_terminal(&token) {
            match &token {
                Token::ObjectEnd { .. } | Token::ArrayEnd { .. } => {
                    self.frames.pop();
                }
                _ => {}
            }
            if let Some(frame) = self.frames.last_mut() {
                let had_segment = match frame {
                    Frame::Object { segment_pushed, .. } | Frame::Array { segment_pushed, .. } => {
                        std::mem::replace(segment_pushed, false)
                    }
                };
                if had_segment {
                    self.path.pop();
                }
            }
        }

        PathedToken::new(token, snapshot)
    }
}

pin_project! {
    /// Adapts a `Stream<Item = Token>` into a `Stream<Item = PathedToken>`.
    pub struct PathDetector<S> {
        #[pin]
        upstream: S,
        engine: PathDetectorEngine,
    }
}

impl<S> PathDetector<S>
where
    S: Stream<Item = JsonFlowResult<Token>>,
{
    pub fn new(upstream: S) -> Self {
        Self { upstream, engine: PathDetectorEngine::new() }
    }
}

impl<S> Stream for PathDetector<S>
where
    S: Stream<Item = JsonFlowResult<Token>>,
{
    type Item = JsonFlowResult<PathedToken>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let me = self.project();
        match me.upstream.poll_next(cx) {
            Poll::Ready(Some(Ok(token))) => Poll::Ready(Some(Ok(me.engine.push(token)))),
            Poll::Ready(Some(Err(err))) => Poll::Ready(Some(Err(err.into_upstream()))),
            Poll::Ready(None) => Poll::Ready(None),
            Poll::Pending => Poll::Pending,
        }
    }
}

/// Annotates a complete, already-available token slice in one shot.
#[must_use]
pub fn detect_paths(tokens: Vec<Token>) -> Vec<PathedToken> {
    let mut engine = PathDetectorEngine::new();
    tokens.into_iter().map(|t| engine.push(t)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::{parse_complete, ParserOptions};

    fn path_of(tokens: &[PathedToken], predicate: impl Fn(&Token) -> bool) -> Path {
        tokens
            .iter()
            .find(|pt| predicate(&pt.token))
            .expect("token not found")
            .path
            .clone()
    }

    #[test]
    fn nested_object_array_paths_match_spec_example() {
        let input = r#"{"object":{"array":["item1",2,{"key":"item3"}]}}"#;
        let tokens = parse_complete(input, ParserOptions::default()).unwrap();
        let pathed = detect_paths(tokens);

        let number_path = path_of(&pathed, |t| matches!(t, Token::NumberValue { value, .. } if *value == 2.0));
        assert_eq!(number_path, Path::root().joined("object").joined("array").joined(1usize));

        let item3_path = path_of(&pathed, |t| {
            matches!(t, Token::StringChunk { text, .. } if text.as_ref() == "item3")
        });
        assert_eq!(
            item3_path,
            Path::root().joined("object").joined("array").joined(2usize).joined("key")
        );

        let outer_start = &pathed[0];
        assert!(matches!(outer_start.token, Token::ObjectStart { .. }));
        assert!(outer_start.path.is_root());
    }

    #[test]
    fn empty_array_boundary_tokens_carry_enclosing_path() {
        let input = r#"{"a":[]}"#;
        let tokens = parse_complete(input, ParserOptions::default()).unwrap();
        let pathed = detect_paths(tokens);
        let array_start = path_of(&pathed, |t| matches!(t, Token::ArrayStart { .. }));
        let array_end = path_of(&pathed, |t| matches!(t, Token::ArrayEnd { .. }));
        assert_eq!(array_start, Path::root().joined("a"));
        assert_eq!(array_end, Path::root().joined("a"));
    }

    #[test]
    fn commas_carry_the_containers_own_path_not_the_element_path() {
        let input = "[1,2,3]";
        let tokens = parse_complete(input, ParserOptions::default()).unwrap();
        let pathed = detect_paths(tokens);
        for pt in pathed.iter().filter(|pt| matches!(pt.token, Token::Comma { .. })) {
            assert!(pt.path.is_root());
        }
    }

    #[test]
    fn idempotent_when_rerun_on_stripped_tokens() {
        let input = r#"{"a":[1,2],"b":"x"}"#;
        let tokens = parse_complete(input, ParserOptions::default()).unwrap();
        let first_pass = detect_paths(tokens);
        let stripped: Vec<Token> = first_pass.iter().map(|pt| pt.token.clone()).collect();
        let second_pass = detect_paths(stripped);
        assert_eq!(first_pass, second_pass);
    }
}
