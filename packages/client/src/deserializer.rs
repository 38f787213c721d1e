//! Deserializer: reassembles a [`Token`] stream into fully materialised
//! [`Value`]s (spec §4.4).
//!
//! A frame-stack assembler: every object/array push gets its own frame, and
//! each scalar or closed container is attached into its parent (or, once the
//! frame stack is empty again, emitted as a completed top-level value). A
//! token stream may contain several top-level values -- as produced by
//! [`crate::path_splitter::PathStreamSplitter`] or a multi-document
//! [`crate::parser::Parser`] -- and each completion emits one item (see
//! DESIGN.md for the module this is grounded on).

use std::collections::VecDeque;
use std::pin::Pin;
use std::task::{Context, Poll};

use futures_core::Stream;
use pin_project_lite::pin_project;

use crate::error::JsonFlowResult;
use crate::path::Path;
use crate::token::{PathedToken, Role, Token};
use crate::value::Value;

enum Frame {
    Object { entries: Vec<(String, Value)>, key: String },
    Array { items: Vec<Value> },
}

/// The synchronous half of the deserializer: a frame-stack assembler fed
/// one token at a time.
#[derive(Default)]
pub struct DeserializerEngine {
    stack: Vec<Frame>,
    current_string: Option<String>,
    output: VecDeque<(Value, Option<Path>)>,
}

impl DeserializerEngine {
    #[must_use]
    pub fn new() -> Self {
        Self { stack: Vec::new(), current_string: None, output: VecDeque::new() }
    }

    fn attach(&mut self, value: Value, path: Option<Path>) {
        match self.stack.last_mut() {
            Some(Frame::Object { entries, key }) => {
                Value::object_insert(entries, std::mem::take(key), value);
            }
            Some(Frame::Array { items }) => items.push(value),
            None => self.output.push_back((value, path)),
        }
    }

    /// Feeds one token, optionally carrying the path it was annotated with
    /// upstream (spec §4.4: "with the path copied from the emitting
    /// token's path, if the upstream tokens carry paths").
    pub fn push(&mut self, token: Token, path: Option<Path>) {
        match token {
            Token::ObjectStart { .. } => {
                self.stack.push(Frame::Object { entries: Vec::new(), key: String::new() });
            }
            Token::ArrayStart { .. } => {
                self.stack.push(Frame::Array { items: Vec::new() });
            }
            Token::ObjectEnd { .. } => {
                if let Some(Frame::Object { entries, .. }) = self.stack.pop() {
                    self.attach(Value::Object(entries), path);
                }
            }
            Token::ArrayEnd { .. } => {
                if let Some(Frame::Array { items }) = self.stack.pop() {
                    self.attach(Value::Array(items), path);
                }
            }
            Token::StringStart { role: Role::Value, .. } => {
                self.current_string = Some(String::new());
            }
            Token::StringChunk { role: Role::Value, text, .. } => {
                if let Some(s) = &mut self.current_string {
                    s.push_str(&text);
                }
            }
            Token::StringEnd { role: Role::Value, .. } => {
                let s = self.current_string.take().unwrap_or_default();
                self.attach(Value::String(s), path);
            }
            Token::StringChunk { role: Role::Key, text, .. } => {
                if let Some(Frame::Object { key, .. }) = self.stack.last_mut() {
                    key.push_str(&text);
                }
            }
            Token::NumberValue { value, .. } => self.attach(Value::Number(value), path),
            Token::BooleanValue { value, .. } => self.attach(Value::Bool(value), path),
            Token::NullValue { .. } => self.attach(Value::Null, path),
            Token::StringStart { role: Role::Key, .. }
            | Token::Whitespace { .. }
            | Token::Comma { .. }
            | Token::Colon { .. } => {}
        }
    }

    /// Pops the next fully-assembled `(value, path)` pair, if one is ready.
    pub fn pop_completed(&mut self) -> Option<(Value, Option<Path>)> {
        self.output.pop_front()
    }
}

pin_project! {
    /// Adapts a `Stream<Item = Token>` into a `Stream<Item = Value>`, one
    /// item per completed top-level value.
    pub struct Deserializer<S> {
        #[pin]
        upstream: S,
        engine: DeserializerEngine,
        done: bool,
    }
}

impl<S> Deserializer<S>
where
    S: Stream<Item = JsonFlowResult<Token>>,
{
    pub fn new(upstream: S) -> Self {
        Self { upstream, engine: DeserializerEngine::new(), done: false }
    }
}

impl<S> Stream for Deserializer<S>
where
    S: Stream<Item = JsonFlowResult<Token>>,
{
    type Item = JsonFlowResult<Value>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let mut me = self.project();
        loop {
            if let Some((value, _)) = me.engine.pop_completed() {
                return Poll::Ready(Some(Ok(value)));
            }
            if *me.done {
                return Poll::Ready(None);
            }
            match me.upstream.as_mut().poll_next(cx) {
                Poll::Ready(Some(Ok(token))) => me.engine.push(token, None),
                Poll::Ready(Some(Err(err))) => {
                    *me.done = true;
                    return Poll::Ready(Some(Err(err.into_upstream())));
                }
                Poll::Ready(None) => {
                    *me.done = true;
                }
                Poll::Pending => return Poll::Pending,
            }
        }
    }
}

pin_project! {
    /// Like [`Deserializer`], but consumes a path-annotated token stream
    /// (e.g. a [`crate::path_splitter::SubStream`]) and emits each
    /// completed value alongside the path of the token that completed it.
    pub struct PathedDeserializer<S> {
        #[pin]
        upstream: S,
        engine: DeserializerEngine,
        done: bool,
    }
}

impl<S> PathedDeserializer<S>
where
    S: Stream<Item = JsonFlowResult<PathedToken>>,
{
    pub fn new(upstream: S) -> Self {
        Self { upstream, engine: DeserializerEngine::new(), done: false }
    }
}

impl<S> Stream for PathedDeserializer<S>
where
    S: Stream<Item = JsonFlowResult<PathedToken>>,
{
    type Item = JsonFlowResult<(Value, Path)>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let mut me = self.project();
        loop {
            if let Some((value, path)) = me.engine.pop_completed() {
                return Poll::Ready(Some(Ok((value, path.unwrap_or_else(Path::root)))));
            }
            if *me.done {
                return Poll::Ready(None);
            }
            match me.upstream.as_mut().poll_next(cx) {
                Poll::Ready(Some(Ok(pathed))) => {
                    me.engine.push(pathed.token, Some(pathed.path));
                }
                Poll::Ready(Some(Err(err))) => {
                    *me.done = true;
                    return Poll::Ready(Some(Err(err.into_upstream())));
                }
                Poll::Ready(None) => {
                    *me.done = true;
                }
                Poll::Pending => return Poll::Pending,
            }
        }
    }
}

/// Deserializes a complete, already-available token slice in one shot.
/// Panics (in the sense of returning an error) only if the token stream is
/// malformed -- a well-formed stream always yields at least the values it
/// completed.
#[must_use]
pub fn deserialize_complete(tokens: Vec<Token>) -> Vec<Value> {
    let mut engine = DeserializerEngine::new();
    for token in tokens {
        engine.push(token, None);
    }
    let mut out = Vec::new();
    while let Some((value, _)) = engine.pop_completed() {
        out.push(value);
    }
    out
}
