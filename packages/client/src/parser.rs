//! The character-driven push parser: text chunks of arbitrary size in,
//! [`Token`]s out (spec §4.1).
//!
//! A depth-stack of open-container frames tracks nesting, and per-character
//! numeric/string sub-states track progress through multi-character
//! literals across chunk boundaries. The async adapter drains a buffer of
//! already-produced tokens before polling upstream for more input (see
//! DESIGN.md for the modules this is grounded on).

use std::collections::VecDeque;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use futures_core::Stream;
use pin_project_lite::pin_project;

use crate::error::{JsonFlowError, JsonFlowResult};
use crate::token::{Role, Token};

/// Record-separator byte used by JSON-seq (RFC 7464) framing.
pub const RECORD_SEPARATOR: char = '\u{1e}';

/// Whether the parser accepts exactly one top-level value, or any number of
/// them delimited by JSONL/JSON-seq whitespace (spec §4.1 "Modes").
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DocumentMode {
    #[default]
    Single,
    Multi,
}

/// Constructor options for [`Parser`] (spec §9 "configuration layer" ->
/// option structs, with `with_*` builder methods).
#[derive(Debug, Clone, Copy, Default)]
pub struct ParserOptions {
    pub mode: DocumentMode,
}

impl ParserOptions {
    #[must_use]
    pub fn with_mode(mut self, mode: DocumentMode) -> Self {
        self.mode = mode;
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ObjState {
    AfterStart,
    AfterKey,
    AfterColon,
    AfterValue,
    AfterComma,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ArrState {
    AfterStart,
    AfterValue,
    AfterComma,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RootState {
    Start,
    AfterValue,
}

#[derive(Debug)]
enum Frame {
    Object { state: ObjState, key: String },
    Array { state: ArrState },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum NumSub {
    Minus,
    IntZero,
    IntDigits,
    Point,
    FracDigits,
    /// Just saw `e`/`E`; a sign or a digit may follow.
    ExpStart,
    /// Saw `e`/`E` then a sign; a digit must follow.
    ExpSign,
    ExpDigits,
}

impl NumSub {
    /// Terminal states: a number may legally end here.
    fn is_terminal(self) -> bool {
        matches!(self, NumSub::IntZero | NumSub::IntDigits | NumSub::FracDigits | NumSub::ExpDigits)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum StrSub {
    Inside,
    AfterBackslash,
    /// Accumulating the four hex digits of a `\uXXXX` escape; the `u8`
    /// counts digits seen so far.
    AfterBackslashU(u8),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Lit {
    True,
    False,
    Null,
}

impl Lit {
    fn text(self) -> &'static str {
        match self {
            Lit::True => "true",
            Lit::False => "false",
            Lit::Null => "null",
        }
    }
}

#[derive(Debug)]
enum Accum {
    Whitespace {
        raw: String,
    },
    Number {
        raw: String,
        sub: NumSub,
    },
    Str {
        role: Role,
        raw: String,
        decoded: String,
        sub: StrSub,
        hex: u32,
        pending_high_surrogate: Option<u16>,
    },
    Literal {
        which: Lit,
        raw: String,
    },
}

/// The synchronous half of the parser: a pure state machine that consumes
/// characters one at a time and appends finished [`Token`]s to a caller
/// supplied sink. Kept separate from the `Stream` adapter so it can be fed
/// from any source of text chunks, not just an async one.
pub struct ParserEngine {
    mode: DocumentMode,
    stack: Vec<Frame>,
    root: RootState,
    accum: Option<Accum>,
    offset: u64,
    finished: bool,
}

impl ParserEngine {
    #[must_use]
    pub fn new(options: ParserOptions) -> Self {
        Self {
            mode: options.mode,
            stack: Vec::new(),
            root: RootState::Start,
            accum: None,
            offset: 0,
            finished: false,
        }
    }

    /// Feeds one chunk of text into the state machine, appending every
    /// token it can complete to `out`. Any `Whitespace`/`StringChunk` still
    /// buffered at the end of the chunk is flushed too (spec §4.1
    /// "Chunk-boundary flushing") -- partial numbers are never flushed,
    /// since a number's boundary is itself disambiguating.
    pub fn feed(&mut self, chunk: &str, out: &mut VecDeque<Token>) -> JsonFlowResult<()> {
        for ch in chunk.chars() {
            self.push_char(ch, out)?;
        }
        self.flush_boundary(out);
        Ok(())
    }

    /// Signals end of input. Runs the final implicit-terminator step (spec
    /// §4.1 "End-of-stream") and validates that the document(s) are
    /// complete for the configured [`DocumentMode`].
    pub fn finish(&mut self, out: &mut VecDeque<Token>) -> JsonFlowResult<()> {
        self.terminate_open_accum(out)?;
        self.finished = true;
        match self.mode {
            DocumentMode::Single => {
                if self.root != RootState::AfterValue || !self.stack.is_empty() {
                    tracing::debug!(
                        target: "jsonflow_core::parser",
                        open_frames = self.stack.len(),
                        "input ended before the document was complete"
                    );
                    return Err(JsonFlowError::PrematureEnd);
                }
            }
            DocumentMode::Multi => {
                if !self.stack.is_empty() {
                    tracing::debug!(
                        target: "jsonflow_core::parser",
                        open_frames = self.stack.len(),
                        "input ended before the document was complete"
                    );
                    return Err(JsonFlowError::PrematureEnd);
                }
            }
        }
        Ok(())
    }

    fn flush_boundary(&mut self, out: &mut VecDeque<Token>) {
        let should_flush = match &self.accum {
            Some(Accum::Whitespace { .. }) => true,
            // Never flush mid-escape (spec §4.1): a `\` or a partial
            // `\uXXXX` straddling a chunk boundary must stay buffered, raw
            // text and all, until the escape resolves.
            Some(Accum::Str { sub, .. }) => *sub == StrSub::Inside,
            _ => false,
        };
        if should_flush {
            self.flush_string_chunk_or_whitespace(out);
        }
    }

    fn flush_string_chunk_or_whitespace(&mut self, out: &mut VecDeque<Token>) {
        match self.accum.take() {
            Some(Accum::Whitespace { raw }) => {
                if !raw.is_empty() {
                    out.push_back(Token::Whitespace { raw: Arc::from(raw.as_str()) });
                }
            }
            Some(Accum::Str {
                role,
                raw,
                decoded,
                sub,
                hex,
                pending_high_surrogate,
            }) => {
                if decoded.is_empty() {
                    // Nothing decoded since the last flush (e.g. this chunk
                    // contributed no string body characters): keep the
                    // buffered `raw` instead of discarding it, so no source
                    // bytes are lost across the boundary.
                    self.accum = Some(Accum::Str { role, raw, decoded, sub, hex, pending_high_surrogate });
                    return;
                }
                out.push_back(Token::StringChunk {
                    role,
                    text: Arc::from(decoded.as_str()),
                    raw: Arc::from(raw.as_str()),
                });
                // Re-arm an empty accumulator so the string stays "open".
                self.accum = Some(Accum::Str {
                    role,
                    raw: String::new(),
                    decoded: String::new(),
                    sub,
                    hex,
                    pending_high_surrogate,
                });
            }
            other => self.accum = other,
        }
    }

    /// Implicit-terminator step: if the current accumulator is a number or
    /// whitespace run and `next` (or end-of-input, when `next` is `None`)
    /// cannot extend it, emit the finished token and pop back to the
    /// enclosing grammatical state (spec §4.1 step 1).
    fn terminate_open_accum(&mut self, out: &mut VecDeque<Token>) -> JsonFlowResult<()> {
        match self.accum.take() {
            Some(Accum::Number { raw, sub }) => {
                if !sub.is_terminal() {
                    return Err(JsonFlowError::PrematureEnd);
                }
                let value: f64 = raw.parse().unwrap_or(f64::NAN);
                out.push_back(Token::NumberValue { value, raw: Arc::from(raw.as_str()) });
                self.complete_value()
            }
            Some(Accum::Whitespace { raw }) => {
                if !raw.is_empty() {
                    out.push_back(Token::Whitespace { raw: Arc::from(raw.as_str()) });
                }
                Ok(())
            }
            other => {
                self.accum = other;
                Ok(())
            }
        }
    }

    fn push_char(&mut self, ch: char, out: &mut VecDeque<Token>) -> JsonFlowResult<()> {
        self.offset += ch.len_utf8() as u64;

        // Step 1: implicit terminators for number/whitespace accumulators
        // that `ch` cannot extend.
        if let Some(terminated) = self.maybe_terminate_for(ch) {
            self.flush_terminated(terminated, out)?;
        }

        // Step 3 (string body) takes priority: once inside a string every
        // character (other than the ones the grammar recognises) is data.
        if let Some(Accum::Str { .. }) = &self.accum {
            return self.push_string_char(ch, out);
        }

        if let Some(Accum::Literal { .. }) = &self.accum {
            return self.push_literal_char(ch, out);
        }

        if let Some(Accum::Number { .. }) = &self.accum {
            return self.push_number_char(ch, out);
        }

        if let Some(Accum::Whitespace { .. }) = &self.accum {
            if ch.is_whitespace() {
                if let Some(Accum::Whitespace { raw }) = &mut self.accum {
                    raw.push(ch);
                }
                return Ok(());
            }
            // Whitespace accumulator should have already been terminated
            // above; falling through handles the new character fresh.
        }

        self.dispatch_fresh(ch, out)
    }

    /// Returns `Some(accum)` (taking it out of `self`) if the active
    /// accumulator cannot be extended by `ch` and must be flushed first.
    fn maybe_terminate_for(&mut self, ch: char) -> Option<Accum> {
        match &self.accum {
            Some(Accum::Number { sub, .. }) => {
                let extends = match sub {
                    NumSub::Minus => ch.is_ascii_digit(),
                    NumSub::IntZero | NumSub::IntDigits => {
                        ch.is_ascii_digit() || ch == '.' || ch == 'e' || ch == 'E'
                    }
                    NumSub::Point => ch.is_ascii_digit(),
                    NumSub::FracDigits => ch.is_ascii_digit() || ch == 'e' || ch == 'E',
                    NumSub::ExpStart => ch.is_ascii_digit() || ch == '+' || ch == '-',
                    NumSub::ExpSign => ch.is_ascii_digit(),
                    NumSub::ExpDigits => ch.is_ascii_digit(),
                };
                if extends { None } else { self.accum.take() }
            }
            Some(Accum::Whitespace { .. }) => {
                if ch.is_whitespace() {
                    None
                } else {
                    self.accum.take()
                }
            }
            _ => None,
        }
    }

    fn flush_terminated(&mut self, accum: Accum, out: &mut VecDeque<Token>) -> JsonFlowResult<()> {
        match accum {
            Accum::Number { raw, sub } => {
                if !sub.is_terminal() {
                    return Err(JsonFlowError::unexpected_character(
                        raw.chars().last().unwrap_or('\0'),
                        self.offset,
                    ));
                }
                let value: f64 = raw.parse().unwrap_or(f64::NAN);
                out.push_back(Token::NumberValue { value, raw: Arc::from(raw.as_str()) });
                self.complete_value()
            }
            Accum::Whitespace { raw } => {
                if !raw.is_empty() {
                    out.push_back(Token::Whitespace { raw: Arc::from(raw.as_str()) });
                }
                Ok(())
            }
            _ => Ok(()),
        }
    }

    fn dispatch_fresh(&mut self, ch: char, out: &mut VecDeque<Token>) -> JsonFlowResult<()> {
        if ch.is_whitespace() {
            self.accum = Some(Accum::Whitespace { raw: ch.to_string() });
            return Ok(());
        }
        if ch == RECORD_SEPARATOR {
            if self.mode == DocumentMode::Multi && self.stack.is_empty() {
                out.push_back(Token::Whitespace { raw: Arc::from(ch.to_string().as_str()) });
                return Ok(());
            }
            return Err(JsonFlowError::unexpected_character(ch, self.offset));
        }

        if !self.expecting_value_start() {
            return self.dispatch_structural(ch, out);
        }

        match ch {
            '{' => {
                out.push_back(Token::ObjectStart { raw: Arc::from("{") });
                self.stack.push(Frame::Object { state: ObjState::AfterStart, key: String::new() });
                tracing::trace!(target: "jsonflow_core::parser", depth = self.stack.len(), "object opened");
                self.begin_value_if_root();
                Ok(())
            }
            '[' => {
                out.push_back(Token::ArrayStart { raw: Arc::from("[") });
                self.stack.push(Frame::Array { state: ArrState::AfterStart });
                tracing::trace!(target: "jsonflow_core::parser", depth = self.stack.len(), "array opened");
                self.begin_value_if_root();
                Ok(())
            }
            '"' => {
                let role = self.expected_string_role();
                out.push_back(Token::StringStart { role, raw: Arc::from("\"") });
                self.accum = Some(Accum::Str {
                    role,
                    raw: String::new(),
                    decoded: String::new(),
                    sub: StrSub::Inside,
                    hex: 0,
                    pending_high_surrogate: None,
                });
                Ok(())
            }
            '-' => {
                self.accum = Some(Accum::Number { raw: "-".to_string(), sub: NumSub::Minus });
                Ok(())
            }
            '0'..='9' => {
                let sub = if ch == '0' { NumSub::IntZero } else { NumSub::IntDigits };
                self.accum = Some(Accum::Number { raw: ch.to_string(), sub });
                Ok(())
            }
            't' => {
                self.accum = Some(Accum::Literal { which: Lit::True, raw: ch.to_string() });
                Ok(())
            }
            'f' => {
                self.accum = Some(Accum::Literal { which: Lit::False, raw: ch.to_string() });
                Ok(())
            }
            'n' => {
                self.accum = Some(Accum::Literal { which: Lit::Null, raw: ch.to_string() });
                Ok(())
            }
            _ => Err(JsonFlowError::unexpected_character(ch, self.offset)),
        }
    }

    fn dispatch_structural(&mut self, ch: char, out: &mut VecDeque<Token>) -> JsonFlowResult<()> {
        match self.stack.last_mut() {
            Some(Frame::Object { state, .. }) => match (ch, *state) {
                ('}', ObjState::AfterStart) | ('}', ObjState::AfterValue) => {
                    out.push_back(Token::ObjectEnd { raw: Arc::from("}") });
                    self.stack.pop();
                    tracing::trace!(target: "jsonflow_core::parser", depth = self.stack.len(), "object closed");
                    self.complete_value()
                }
                (':', ObjState::AfterKey) => {
                    out.push_back(Token::Colon { raw: Arc::from(":") });
                    if let Some(Frame::Object { state, .. }) = self.stack.last_mut() {
                        *state = ObjState::AfterColon;
                    }
                    Ok(())
                }
                (',', ObjState::AfterValue) => {
                    out.push_back(Token::Comma { raw: Arc::from(",") });
                    if let Some(Frame::Object { state, key }) = self.stack.last_mut() {
                        *state = ObjState::AfterComma;
                        key.clear();
                    }
                    Ok(())
                }
                _ => Err(JsonFlowError::unexpected_character(ch, self.offset)),
            },
            Some(Frame::Array { state }) => match (ch, *state) {
                (']', ArrState::AfterStart) | (']', ArrState::AfterValue) => {
                    out.push_back(Token::ArrayEnd { raw: Arc::from("]") });
                    self.stack.pop();
                    tracing::trace!(target: "jsonflow_core::parser", depth = self.stack.len(), "array closed");
                    self.complete_value()
                }
                (',', ArrState::AfterValue) => {
                    out.push_back(Token::Comma { raw: Arc::from(",") });
                    if let Some(Frame::Array { state }) = self.stack.last_mut() {
                        *state = ArrState::AfterComma;
                    }
                    Ok(())
                }
                _ => Err(JsonFlowError::unexpected_character(ch, self.offset)),
            },
            None => Err(JsonFlowError::unexpected_character(ch, self.offset)),
        }
    }

    /// True iff the grammar is currently expecting the *start* of a value
    /// (object/array/string/number/literal), as opposed to a structural
    /// character (`,` `:` `}` `]`).
    fn expecting_value_start(&self) -> bool {
        match self.stack.last() {
            Some(Frame::Object { state, .. }) => {
                matches!(state, ObjState::AfterStart | ObjState::AfterColon | ObjState::AfterComma)
            }
            Some(Frame::Array { state }) => {
                matches!(state, ArrState::AfterStart | ArrState::AfterComma)
            }
            None => self.root == RootState::Start,
        }
    }

    fn expected_string_role(&self) -> Role {
        match self.stack.last() {
            Some(Frame::Object { state, .. })
                if matches!(state, ObjState::AfterStart | ObjState::AfterComma) =>
            {
                Role::Key
            }
            _ => Role::Value,
        }
    }

    fn begin_value_if_root(&mut self) {
        // Entering a container doesn't itself complete a value; completion
        // happens on the matching End token via `complete_value`.
    }

    /// Called whenever a value (scalar, or a just-closed container) has
    /// finished. Maps the completed value to the successor state of its
    /// enclosing frame (spec §4.1: "completing a value pops this pointer
    /// and maps it to the correct successor").
    fn complete_value(&mut self) -> JsonFlowResult<()> {
        match self.stack.last_mut() {
            Some(Frame::Object { state, .. }) => {
                if *state == ObjState::AfterColon {
                    *state = ObjState::AfterValue;
                }
                // else: an ObjectEnd/ArrayEnd just popped out of this
                // frame's own completion; nothing further to do here.
                Ok(())
            }
            Some(Frame::Array { state }) => {
                if matches!(state, ArrState::AfterStart | ArrState::AfterComma) {
                    *state = ArrState::AfterValue;
                }
                Ok(())
            }
            None => {
                self.root = match self.mode {
                    // Ready to accept another top-level value immediately.
                    DocumentMode::Multi => RootState::Start,
                    DocumentMode::Single => RootState::AfterValue,
                };
                Ok(())
            }
        }
    }

    fn push_number_char(&mut self, ch: char, out: &mut VecDeque<Token>) -> JsonFlowResult<()> {
        let Some(Accum::Number { raw, sub }) = &mut self.accum else { unreachable!() };
        let next_sub = match (*sub, ch) {
            (NumSub::Minus, '0') => Some(NumSub::IntZero),
            (NumSub::Minus, '1'..='9') => Some(NumSub::IntDigits),
            (NumSub::IntZero, '.') | (NumSub::IntDigits, '.') => Some(NumSub::Point),
            (NumSub::IntDigits, '0'..='9') => Some(NumSub::IntDigits),
            (NumSub::IntZero, 'e') | (NumSub::IntZero, 'E')
            | (NumSub::IntDigits, 'e') | (NumSub::IntDigits, 'E') => Some(NumSub::ExpStart),
            (NumSub::Point, '0'..='9') => Some(NumSub::FracDigits),
            (NumSub::FracDigits, '0'..='9') => Some(NumSub::FracDigits),
            (NumSub::FracDigits, 'e') | (NumSub::FracDigits, 'E') => Some(NumSub::ExpStart),
            (NumSub::ExpStart, '+') | (NumSub::ExpStart, '-') => Some(NumSub::ExpSign),
            (NumSub::ExpStart, '0'..='9') => Some(NumSub::ExpDigits),
            (NumSub::ExpSign, '0'..='9') => Some(NumSub::ExpDigits),
            (NumSub::ExpDigits, '0'..='9') => Some(NumSub::ExpDigits),
            _ => None,
        };
        match next_sub {
            Some(s) => {
                raw.push(ch);
                *sub = s;
                Ok(())
            }
            None => Err(JsonFlowError::unexpected_character(ch, self.offset)),
        }
    }

    fn push_literal_char(&mut self, ch: char, out: &mut VecDeque<Token>) -> JsonFlowResult<()> {
        let Some(Accum::Literal { which, raw }) = &mut self.accum else { unreachable!() };
        let target = which.text();
        let next_raw_len = raw.len() + ch.len_utf8();
        if next_raw_len > target.len() || !target.as_bytes()[raw.len()..next_raw_len].starts_with(ch.to_string().as_bytes()) {
            return Err(JsonFlowError::unexpected_character(ch, self.offset));
        }
        raw.push(ch);
        if raw.len() == target.len() {
            let which = *which;
            let raw = std::mem::take(raw);
            self.accum = None;
            match which {
                Lit::True => out.push_back(Token::BooleanValue { value: true, raw: Arc::from(raw.as_str()) }),
                Lit::False => out.push_back(Token::BooleanValue { value: false, raw: Arc::from(raw.as_str()) }),
                Lit::Null => out.push_back(Token::NullValue { raw: Arc::from(raw.as_str()) }),
            }
            self.complete_value()?;
        }
        Ok(())
    }

    fn push_string_char(&mut self, ch: char, out: &mut VecDeque<Token>) -> JsonFlowResult<()> {
        let Some(Accum::Str { role, raw, decoded, sub, hex, pending_high_surrogate }) = &mut self.accum else {
            unreachable!()
        };
        match *sub {
            StrSub::Inside => match ch {
                '"' => {
                    if pending_high_surrogate.is_some() {
                        return Err(JsonFlowError::unexpected_character(ch, self.offset));
                    }
                    if !decoded.is_empty() {
                        out.push_back(Token::StringChunk {
                            role: *role,
                            text: Arc::from(decoded.as_str()),
                            raw: Arc::from(raw.as_str()),
                        });
                    }
                    let role = *role;
                    self.accum = None;
                    out.push_back(Token::StringEnd { role, raw: Arc::from("\"") });
                    match role {
                        Role::Key => {
                            if let Some(Frame::Object { state, key: _ }) = self.stack.last_mut() {
                                *state = ObjState::AfterKey;
                            }
                            Ok(())
                        }
                        Role::Value => self.complete_value(),
                    }
                }
                '\\' => {
                    raw.push('\\');
                    *sub = StrSub::AfterBackslash;
                    Ok(())
                }
                c if (c as u32) < 0x20 => Err(JsonFlowError::unexpected_character(c, self.offset)),
                c => {
                    raw.push(c);
                    decoded.push(c);
                    Ok(())
                }
            },
            StrSub::AfterBackslash => {
                let mapped = match ch {
                    '"' => Some('"'),
                    '\\' => Some('\\'),
                    '/' => Some('/'),
                    'b' => Some('\u{8}'),
                    'f' => Some('\u{c}'),
                    'n' => Some('\n'),
                    'r' => Some('\r'),
                    't' => Some('\t'),
                    _ => None,
                };
                if let Some(decoded_char) = mapped {
                    raw.push(ch);
                    push_resolved_char(decoded, pending_high_surrogate, decoded_char);
                    *sub = StrSub::Inside;
                    return Ok(());
                }
                if ch == 'u' {
                    raw.push('u');
                    *hex = 0;
                    *sub = StrSub::AfterBackslashU(0);
                    return Ok(());
                }
                Err(JsonFlowError::unexpected_character(ch, self.offset))
            }
            StrSub::AfterBackslashU(count) => {
                let digit = ch.to_digit(16).ok_or_else(|| {
                    JsonFlowError::unexpected_character(ch, self.offset)
                })?;
                raw.push(ch);
                *hex = (*hex << 4) | digit;
                if count + 1 == 4 {
                    let code = *hex;
                    *sub = StrSub::Inside;
                    if (0xD800..=0xDBFF).contains(&code) {
                        // High surrogate: hold it until the low half
                        // arrives in a following `\uXXXX` escape.
                        *pending_high_surrogate = Some(code as u16);
                    } else if (0xDC00..=0xDFFF).contains(&code) {
                        match pending_high_surrogate.take() {
                            Some(high) => {
                                let c = combine_surrogate_pair(high, code as u16);
                                decoded.push(c);
                            }
                            None => decoded.push('\u{fffd}'),
                        }
                    } else {
                        match char::from_u32(code) {
                            Some(c) => push_resolved_char(decoded, pending_high_surrogate, c),
                            None => decoded.push('\u{fffd}'),
                        }
                    }
                } else {
                    *sub = StrSub::AfterBackslashU(count + 1);
                }
                Ok(())
            }
        }
    }
}

fn push_resolved_char(decoded: &mut String, pending_high_surrogate: &mut Option<u16>, c: char) {
    if let Some(high) = pending_high_surrogate.take() {
        // An isolated high surrogate followed by a non-surrogate escape:
        // emit a replacement character for the orphan, then the new one.
        let _ = high;
        decoded.push('\u{fffd}');
    }
    decoded.push(c);
}

fn combine_surrogate_pair(high: u16, low: u16) -> char {
    let c = 0x10000u32 + ((high as u32 - 0xD800) << 10) + (low as u32 - 0xDC00);
    char::from_u32(c).unwrap_or('\u{fffd}')
}

pin_project! {
    /// Adapts [`ParserEngine`] into a `Stream<Item = Token>` over an
    /// upstream stream of text fragments. Drains any already-produced
    /// tokens before polling upstream for more input, mirroring
    /// `ReadJsonLines` in the example pack.
    pub struct Parser<S> {
        #[pin]
        upstream: S,
        engine: ParserEngine,
        queue: VecDeque<Token>,
        upstream_done: bool,
        errored: bool,
    }
}

impl<S> Parser<S>
where
    S: Stream<Item = JsonFlowResult<String>>,
{
    pub fn new(upstream: S, options: ParserOptions) -> Self {
        Self {
            upstream,
            engine: ParserEngine::new(options),
            queue: VecDeque::new(),
            upstream_done: false,
            errored: false,
        }
    }
}

impl<S> Stream for Parser<S>
where
    S: Stream<Item = JsonFlowResult<String>>,
{
    type Item = JsonFlowResult<Token>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let mut me = self.project();
        loop {
            if *me.errored {
                return Poll::Ready(None);
            }
            if let Some(token) = me.queue.pop_front() {
                return Poll::Ready(Some(Ok(token)));
            }
            if *me.upstream_done {
                return Poll::Ready(None);
            }
            match me.upstream.as_mut().poll_next(cx) {
                Poll::Ready(Some(Ok(chunk))) => {
                    if let Err(err) = me.engine.feed(&chunk, me.queue) {
                        *me.errored = true;
                        return Poll::Ready(Some(Err(err)));
                    }
                }
                Poll::Ready(Some(Err(err))) => {
                    *me.errored = true;
                    return Poll::Ready(Some(Err(err.into_upstream())));
                }
                Poll::Ready(None) => {
                    *me.upstream_done = true;
                    if let Err(err) = me.engine.finish(me.queue) {
                        *me.errored = true;
                        return Poll::Ready(Some(Err(err)));
                    }
                }
                Poll::Pending => return Poll::Pending,
            }
        }
    }
}

/// Parses a complete, already-available string in one shot -- a thin
/// convenience wrapper around [`ParserEngine`] for callers that don't need
/// the streaming `Stream` adapter.
pub fn parse_complete(text: &str, options: ParserOptions) -> JsonFlowResult<Vec<Token>> {
    let mut engine = ParserEngine::new(options);
    let mut out = VecDeque::new();
    engine.feed(text, &mut out)?;
    engine.finish(&mut out)?;
    Ok(out.into_iter().collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tokens_for(text: &str) -> Vec<Token> {
        parse_complete(text, ParserOptions::default()).expect("parse should succeed")
    }

    #[test]
    fn basic_round_trip_token_count() {
        let tokens = tokens_for(r#"{"a":1,"b":[true,null]}"#);
        assert_eq!(tokens.len(), 17);
        assert!(matches!(tokens[0], Token::ObjectStart { .. }));
        assert!(matches!(tokens[16], Token::ObjectEnd { .. }));
    }

    #[test]
    fn raw_text_concatenation_equals_input() {
        let input = r#"{"a": 1, "b": [true, null], "c": "hi♥"}"#;
        let tokens = tokens_for(input);
        let joined: String = tokens.iter().map(Token::raw_text).collect();
        assert_eq!(joined, input);
    }

    #[test]
    fn empty_object_and_array() {
        let tokens = tokens_for("{}");
        assert_eq!(tokens.len(), 2);
        let tokens = tokens_for("[]");
        assert_eq!(tokens.len(), 2);
    }

    #[test]
    fn unicode_escape_decodes_and_preserves_raw() {
        let tokens = tokens_for(r#""♥""#);
        let chunk = tokens
            .iter()
            .find_map(|t| match t {
                Token::StringChunk { text, raw, .. } => Some((text.to_string(), raw.to_string())),
                _ => None,
            })
            .unwrap();
        assert_eq!(chunk.0, "\u{2665}");
        assert_eq!(chunk.1, "\\u2665");
    }

    #[test]
    fn negative_exponent_number_decodes_correctly() {
        let tokens = tokens_for("-1.23e2");
        let Token::NumberValue { value, raw } = &tokens[0] else { panic!("expected number") };
        assert_eq!(*value, -123.0);
        assert_eq!(raw.as_ref(), "-1.23e2");
    }

    #[test]
    fn chunk_boundary_does_not_affect_token_sequence() {
        let input = r#"{"alpha":"beta gamma","n":42}"#;
        let whole = tokens_for(input);

        let mut engine = ParserEngine::new(ParserOptions::default());
        let mut out = VecDeque::new();
        for byte_chunk in split_every(input, 3) {
            engine.feed(byte_chunk, &mut out).unwrap();
        }
        engine.finish(&mut out).unwrap();
        let chunked: Vec<Token> = out.into_iter().collect();

        let normalize = |tokens: &[Token]| -> Vec<Token> {
            let mut merged: Vec<Token> = Vec::new();
            for t in tokens {
                if let (Some(Token::StringChunk { role: pr, text: pt, raw: praw }), Token::StringChunk { role, text, raw }) =
                    (merged.last().cloned(), t.clone())
                {
                    if pr == role {
                        let mut new_text = pt.to_string();
                        new_text.push_str(&text);
                        let mut new_raw = praw.to_string();
                        new_raw.push_str(&raw);
                        *merged.last_mut().unwrap() = Token::StringChunk {
                            role,
                            text: Arc::from(new_text.as_str()),
                            raw: Arc::from(new_raw.as_str()),
                        };
                        continue;
                    }
                }
                merged.push(t.clone());
            }
            merged
        };

        assert_eq!(normalize(&whole), normalize(&chunked));
    }

    fn split_every(s: &str, n: usize) -> Vec<&str> {
        let mut out = Vec::new();
        let mut start = 0;
        let chars: Vec<(usize, char)> = s.char_indices().collect();
        for window in chars.chunks(n) {
            let begin = window.first().unwrap().0;
            let end = window
                .last()
                .map(|(i, c)| i + c.len_utf8())
                .unwrap_or(begin);
            out.push(&s[begin..end]);
            start = end;
        }
        let _ = start;
        out
    }

    #[test]
    fn premature_end_inside_object() {
        let err = parse_complete(r#"{"a":"#, ParserOptions::default()).unwrap_err();
        assert!(matches!(err, JsonFlowError::PrematureEnd));
    }

    #[test]
    fn unexpected_character_in_literal() {
        let err = parse_complete("tru1", ParserOptions::default()).unwrap_err();
        assert!(matches!(err, JsonFlowError::UnexpectedCharacter { .. }));
    }

    #[test]
    fn single_document_mode_rejects_trailing_content() {
        let err = parse_complete("1 2", ParserOptions::default()).unwrap_err();
        assert!(matches!(err, JsonFlowError::UnexpectedCharacter { .. }));
    }

    #[test]
    fn multi_document_jsonl_mode_accepts_many_values() {
        let tokens = parse_complete(
            "1\n2\n3",
            ParserOptions::default().with_mode(DocumentMode::Multi),
        )
        .unwrap();
        let numbers: Vec<f64> = tokens
            .iter()
            .filter_map(|t| match t {
                Token::NumberValue { value, .. } => Some(*value),
                _ => None,
            })
            .collect();
        assert_eq!(numbers, vec![1.0, 2.0, 3.0]);
    }

    #[test]
    fn multi_document_json_seq_framing() {
        let input = "\u{1e}\"a\"\n\u{1e}\"b\"\n";
        let tokens = parse_complete(
            input,
            ParserOptions::default().with_mode(DocumentMode::Multi),
        )
        .unwrap();
        let strings: Vec<String> = tokens
            .iter()
            .filter_map(|t| match t {
                Token::StringChunk { text, .. } => Some(text.to_string()),
                _ => None,
            })
            .collect();
        assert_eq!(strings, vec!["a".to_string(), "b".to_string()]);
    }
}
