//! Error types for the streaming JSON pipeline.
//!
//! One enum per spec error kind (see spec's §7 Error Handling Design):
//! `UnexpectedCharacter`, `PrematureEnd`, `InvalidSelector`, `Cancelled`,
//! `UpstreamError`. Every transform surfaces failures this way rather than
//! retrying internally.

use std::sync::Arc;

/// Errors produced anywhere in the parse/serialize/path pipeline.
#[derive(Debug, Clone, thiserror::Error)]
pub enum JsonFlowError {
    /// The parser could not extend its current grammatical state with the
    /// given character.
    #[error("unexpected character {character:?} at byte offset {offset}")]
    UnexpectedCharacter {
        /// The offending character.
        character: char,
        /// Byte offset since the start of the stream.
        offset: u64,
    },

    /// Input ended while a document was still open.
    #[error("input ended before the document was complete")]
    PrematureEnd,

    /// A selector expression was malformed (e.g. a negative index).
    #[error("invalid selector: {0}")]
    InvalidSelector(String),

    /// The downstream consumer cancelled before the stream was exhausted.
    #[error("stream cancelled")]
    Cancelled,

    /// A failure was received from an upstream producer and is being
    /// forwarded with its cause chain intact.
    #[error("upstream error: {0}")]
    UpstreamError(#[source] Arc<JsonFlowError>),
}

/// Convenience result alias used throughout the crate.
pub type JsonFlowResult<T> = Result<T, JsonFlowError>;

impl JsonFlowError {
    /// Wrap `self` as the cause of an `UpstreamError`, for transforms that
    /// forward a failure received from the stream above them.
    #[must_use]
    pub fn into_upstream(self) -> Self {
        JsonFlowError::UpstreamError(Arc::new(self))
    }

    #[must_use]
    pub fn unexpected_character(character: char, offset: u64) -> Self {
        tracing::debug!(
            target: "jsonflow_core::parser",
            character = ?character,
            offset,
            "unexpected character"
        );
        JsonFlowError::UnexpectedCharacter { character, offset }
    }

    #[must_use]
    pub fn invalid_selector(message: impl Into<String>) -> Self {
        let message = message.into();
        tracing::debug!(target: "jsonflow_core::selector", %message, "invalid selector");
        JsonFlowError::InvalidSelector(message)
    }
}
