//! # jsonflow
//!
//! Thin public facade over [`jsonflow_core`]: re-exports the engine's types
//! and adds a handful of top-level convenience functions that compose two or
//! three core transforms together. The engine itself -- parsing, path
//! matching, splitting, serialization -- lives in `jsonflow_core`; this crate
//! is sugar on top of it, not a second implementation.

#![deny(unsafe_code)]
#![warn(clippy::all)]

pub use jsonflow_core::{
    Deserializer, DocumentMode, Indent, JsonFlowError, JsonFlowResult, MultiDocFraming,
    MultiDocSerializer, ObjectKey, Parser, ParserOptions, Path, PathDetector, PathSelector,
    PathStreamSplitter, PathedDeserializer, PathedToken, Role, Segment, SegmentMatcher, Selector,
    Serializer, SerializerOptions, SourceValue, Stringifier, Token, Transform, Value,
};

/// Parses a complete, already-available text buffer into tokens.
///
/// Shorthand for [`jsonflow_core::parser::parse_complete`] with default
/// options; use [`Parser`] directly for incremental/chunked input or a
/// non-default [`ParserOptions`] (e.g. multi-document mode).
pub fn parse(input: &str) -> JsonFlowResult<Vec<Token>> {
    jsonflow_core::parser::parse_complete(input, ParserOptions::default())
}

/// Re-renders a complete token slice back to JSON text.
///
/// Shorthand for [`jsonflow_core::stringifier::stringify_complete`].
#[must_use]
pub fn stringify(tokens: &[Token]) -> String {
    jsonflow_core::stringifier::stringify_complete(tokens)
}

/// Lowers one [`SourceValue`] into its token stream, the [`Serializer`]
/// half of the text/token/value diamond. The value itself may be lazy --
/// a [`SourceValue::Deferred`] future or a `StringStream`/`ArrayStream`/
/// `ObjectStream` tag -- in which case tokens are produced as each piece
/// resolves.
#[must_use]
pub fn to_token_stream(value: SourceValue, options: SerializerOptions) -> Serializer {
    Serializer::new(value, options)
}

/// Deserializes a complete, already-available token slice into values.
///
/// Shorthand for [`jsonflow_core::deserializer::deserialize_complete`].
#[must_use]
pub fn to_value_stream(tokens: Vec<Token>) -> Vec<Value> {
    jsonflow_core::deserializer::deserialize_complete(tokens)
}

/// Parses and fully assembles a complete JSON document in one call,
/// composing [`parse`] and [`to_value_stream`].
pub fn from_str(input: &str) -> JsonFlowResult<Vec<Value>> {
    Ok(to_value_stream(parse(input)?))
}

/// Renders a single materialized [`Value`] back to compact JSON text,
/// composing [`to_token_stream`] over a [`SourceValue::Plain`] and
/// [`stringify`].
pub async fn from_value(value: Value) -> String {
    use futures_util::StreamExt;

    let tokens: Vec<Token> = to_token_stream(SourceValue::Plain(value), SerializerOptions::default())
        .filter_map(|r| async move { r.ok() })
        .collect()
        .await;
    stringify(&tokens)
}
