//! The token model shared by every transform in the pipeline.
//!
//! A [`Token`] is a tagged value describing one lexical/semantic element of
//! a JSON document. Every variant carries its `raw_text`; the concatenation
//! of `raw_text` over a whole token stream reproduces the original (or
//! produced) document text exactly -- this is the invariant `Stringifier`
//! relies on and every other token producer must preserve.

use std::sync::Arc;

use crate::path::Path;

/// Whether a string token belongs to an object's key or to a value
/// position. A string is always bracketed by a `StringStart`/`StringEnd`
/// pair sharing the same role, with zero or more `StringChunk`s between.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Role {
    Key,
    Value,
}

/// One lexical/semantic element of a JSON document.
#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    /// Insignificant whitespace between two structurally adjacent tokens.
    Whitespace { raw: Arc<str> },
    /// `,` separating object members or array elements.
    Comma { raw: Arc<str> },
    /// `:` separating an object key from its value.
    Colon { raw: Arc<str> },
    ObjectStart { raw: Arc<str> },
    ObjectEnd { raw: Arc<str> },
    ArrayStart { raw: Arc<str> },
    ArrayEnd { raw: Arc<str> },
    /// Opening quote of a string in `role` position.
    StringStart { role: Role, raw: Arc<str> },
    /// A decoded fragment of a string's content (escapes already resolved).
    /// Guaranteed to fall on Unicode codepoint boundaries; a `\uXXXX`
    /// escape is never split across two chunks.
    StringChunk {
        role: Role,
        text: Arc<str>,
        raw: Arc<str>,
    },
    /// Closing quote of a string in `role` position.
    StringEnd { role: Role, raw: Arc<str> },
    /// A JSON number, decoded to `f64` with the original text preserved for
    /// exact round-tripping (and for precision beyond what `f64` carries).
    NumberValue { value: f64, raw: Arc<str> },
    BooleanValue { value: bool, raw: Arc<str> },
    NullValue { raw: Arc<str> },
}

impl Token {
    /// The exact source text this token was produced from (or, for
    /// generated tokens, the text `Stringifier` will emit for it).
    #[must_use]
    pub fn raw_text(&self) -> &str {
        match self {
            Token::Whitespace { raw }
            | Token::Comma { raw }
            | Token::Colon { raw }
            | Token::ObjectStart { raw }
            | Token::ObjectEnd { raw }
            | Token::ArrayStart { raw }
            | Token::ArrayEnd { raw }
            | Token::StringStart { raw, .. }
            | Token::StringChunk { raw, .. }
            | Token::StringEnd { raw, .. }
            | Token::NumberValue { raw, .. }
            | Token::BooleanValue { raw, .. }
            | Token::NullValue { raw } => raw,
        }
    }

    #[must_use]
    pub fn is_whitespace(&self) -> bool {
        matches!(self, Token::Whitespace { .. })
    }

    #[must_use]
    pub fn role(&self) -> Option<Role> {
        match self {
            Token::StringStart { role, .. }
            | Token::StringChunk { role, .. }
            | Token::StringEnd { role, .. } => Some(*role),
            _ => None,
        }
    }
}

/// A token annotated with its position in the document's nesting
/// hierarchy, as produced by [`crate::path_detector::PathDetector`].
#[derive(Debug, Clone, PartialEq)]
pub struct PathedToken {
    pub token: Token,
    pub path: Path,
}

impl PathedToken {
    #[must_use]
    pub fn new(token: Token, path: Path) -> Self {
        Self { token, path }
    }
}
