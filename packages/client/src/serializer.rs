//! Serializer: a [`SourceValue`] tree, where any sub-tree may itself be a
//! lazy asynchronous stream, lowered to a [`Token`] stream (spec §4.3).
//!
//! An explicit work stack of `Task`s replaces recursive calls so that
//! awaiting a deferred value or the next item of a stream tag (spec §5
//! suspension points (c)/(d)) can suspend `poll_next` and resume later,
//! draining queued output before asking the stack for more work (see
//! DESIGN.md for the module this is grounded on).

use std::collections::VecDeque;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use futures_core::Stream;
use futures_util::StreamExt;

use crate::error::{JsonFlowError, JsonFlowResult};
use crate::parser::{parse_complete, ParserOptions};
use crate::token::{Role, Token};
use crate::value::{ObjectKey, SourceValue, Transform, Value};

/// One level of pretty-print indentation: either a literal string or a
/// count of spaces (spec §4.3). `None`/non-positive disables pretty
/// printing -- modelled here by `SerializerOptions::space` being `None`.
#[derive(Debug, Clone)]
pub enum Indent {
    Spaces(usize),
    Str(String),
}

impl Indent {
    #[must_use]
    pub fn spaces(n: i64) -> Option<Self> {
        if n > 0 { Some(Indent::Spaces(n as usize)) } else { None }
    }

    fn unit(&self) -> String {
        match self {
            Indent::Spaces(n) => " ".repeat(*n),
            Indent::Str(s) => s.clone(),
        }
    }
}

/// Framing for multi-document serialization (spec §4.3 "Multi-document
/// mode"): whitespace emitted before the first document, between adjacent
/// documents, and after the last one.
#[derive(Debug, Clone)]
pub struct MultiDocFraming {
    pub before_first: String,
    pub delimiter: String,
    pub after_last: String,
}

impl MultiDocFraming {
    /// JSONL: one document per line, nothing before the first or after the
    /// last.
    #[must_use]
    pub fn jsonl() -> Self {
        Self { before_first: String::new(), delimiter: "\n".to_string(), after_last: String::new() }
    }

    /// JSON-seq (RFC 7464): each record prefixed with the ASCII
    /// record-separator and suffixed with a newline.
    #[must_use]
    pub fn json_seq() -> Self {
        Self {
            before_first: "\u{1e}".to_string(),
            delimiter: "\n\u{1e}".to_string(),
            after_last: "\n".to_string(),
        }
    }
}

/// Constructor options for [`Serializer`] (spec §9 configuration layer).
#[derive(Clone)]
pub struct SerializerOptions {
    pub space: Option<Indent>,
    pub transform: Option<Arc<dyn Transform>>,
}

impl Default for SerializerOptions {
    fn default() -> Self {
        Self { space: None, transform: None }
    }
}

impl SerializerOptions {
    #[must_use]
    pub fn with_pretty(mut self, indent: Indent) -> Self {
        self.space = Some(indent);
        self
    }

    #[must_use]
    pub fn with_transform(mut self, transform: impl Transform + 'static) -> Self {
        self.transform = Some(Arc::new(transform));
        self
    }
}

enum Task {
    Emit(Token),
    Serialize { value: SourceValue, key: Arc<str>, depth: usize },
    AwaitDeferred { fut: crate::value::ValueFuture, key: Arc<str>, depth: usize },
    AwaitStringFragment { stream: crate::value::StringFragmentStream, role: Role, depth: usize },
    AwaitArrayItem { stream: crate::value::ArrayElementStream, depth: usize, index: usize },
    AwaitObjectEntry { stream: crate::value::ObjectEntryStream, depth: usize, index: usize },
    /// Draining a `StringStream` object key before moving on to `:` and
    /// the entry's value.
    AwaitKeyFragment {
        stream: crate::value::StringFragmentStream,
        depth: usize,
        index: usize,
        rest_stream: crate::value::ObjectEntryStream,
        value: SourceValue,
    },
    CloseArray { depth: usize, empty: bool },
    CloseObject { depth: usize, empty: bool },
}

/// Lowers one [`SourceValue`] into its token stream.
///
/// Every future/stream a `Task` holds is already independently heap-boxed
/// (`Pin<Box<dyn Future/Stream>>`), so `Serializer` itself never borrows
/// from its own address and needs no pin-projection -- it is `Unpin`.
pub struct Serializer {
    options: SerializerOptions,
    stack: Vec<Task>,
    queue: VecDeque<Token>,
    done: bool,
}

impl Serializer {
    #[must_use]
    pub fn new(value: SourceValue, options: SerializerOptions) -> Self {
        Self {
            options,
            stack: vec![Task::Serialize { value, key: Arc::from(""), depth: 0 }],
            queue: VecDeque::new(),
            done: false,
        }
    }

    fn pretty(&self) -> Option<String> {
        self.options.space.as_ref().map(Indent::unit)
    }

    fn push_indent(queue: &mut VecDeque<Token>, unit: &str, depth: usize) {
        let mut raw = String::with_capacity(1 + unit.len() * depth);
        raw.push('\n');
        for _ in 0..depth {
            raw.push_str(unit);
        }
        queue.push_back(Token::Whitespace { raw: Arc::from(raw.as_str()) });
    }

    fn apply_transform(&self, key: &str, value: Value) -> Value {
        match &self.options.transform {
            Some(t) => t.transform(key, &value).unwrap_or(value),
            None => value,
        }
    }

    fn push_scalar(&mut self, value: Value) {
        match value {
            Value::Null => self.queue.push_back(Token::NullValue { raw: Arc::from("null") }),
            Value::Bool(b) => self.queue.push_back(Token::BooleanValue {
                value: b,
                raw: Arc::from(if b { "true" } else { "false" }),
            }),
            Value::Number(n) => {
                if n.is_finite() {
                    let raw = format_number(n);
                    self.queue.push_back(Token::NumberValue { value: n, raw: Arc::from(raw.as_str()) });
                } else {
                    // Documented choice (spec §9 open question): non-finite
                    // numbers serialize as `null`, matching standard JSON
                    // text convention, at the cost of losing the NaN/Inf
                    // distinction. See DESIGN.md.
                    self.queue.push_back(Token::NullValue { raw: Arc::from("null") });
                }
            }
            Value::String(s) => {
                self.queue.push_back(Token::StringStart { role: Role::Value, raw: Arc::from("\"") });
                if !s.is_empty() {
                    let raw = escape_json_fragment(&s);
                    self.queue.push_back(Token::StringChunk {
                        role: Role::Value,
                        text: Arc::from(s.as_str()),
                        raw: Arc::from(raw.as_str()),
                    });
                }
                self.queue.push_back(Token::StringEnd { role: Role::Value, raw: Arc::from("\"") });
            }
            Value::Array(_) | Value::Object(_) => unreachable!("containers handled by the stream path"),
        }
    }

    /// Runs one step of the stack machine, returning `true` if `poll_next`
    /// should keep looping (more synchronous work available or a token was
    /// queued), or pushing a `Task` back and returning `false` when the top
    /// of stack is awaiting an async operation that was `Pending`.
    fn step(&mut self, cx: &mut Context<'_>) -> JsonFlowResult<bool> {
        let Some(task) = self.stack.pop() else {
            self.done = true;
            return Ok(true);
        };
        match task {
            Task::Emit(token) => {
                self.queue.push_back(token);
                Ok(true)
            }
            Task::Serialize { value, key, depth } => self.serialize(value, key, depth),
            Task::AwaitDeferred { mut fut, key, depth } => match fut.as_mut().poll(cx) {
                Poll::Ready(Ok(value)) => {
                    let value = self.apply_transform(&key, value);
                    self.serialize(SourceValue::Plain(value), key, depth)
                }
                Poll::Ready(Err(err)) => Err(err.into_upstream()),
                Poll::Pending => {
                    self.stack.push(Task::AwaitDeferred { fut, key, depth });
                    Ok(false)
                }
            },
            Task::AwaitStringFragment { mut stream, role, depth } => {
                match stream.as_mut().poll_next(cx) {
                    Poll::Ready(Some(Ok(fragment))) => {
                        if !fragment.is_empty() {
                            let raw = escape_json_fragment(&fragment);
                            self.queue.push_back(Token::StringChunk {
                                role,
                                text: Arc::from(fragment.as_str()),
                                raw: Arc::from(raw.as_str()),
                            });
                        }
                        self.stack.push(Task::AwaitStringFragment { stream, role, depth });
                        Ok(true)
                    }
                    Poll::Ready(Some(Err(err))) => Err(err.into_upstream()),
                    Poll::Ready(None) => {
                        self.queue.push_back(Token::StringEnd { role, raw: Arc::from("\"") });
                        Ok(true)
                    }
                    Poll::Pending => {
                        self.stack.push(Task::AwaitStringFragment { stream, role, depth });
                        Ok(false)
                    }
                }
            }
            Task::AwaitArrayItem { mut stream, depth, index } => {
                match stream.as_mut().poll_next(cx) {
                    Poll::Ready(Some(Ok(item))) => {
                        self.emit_item_separator(depth, index);
                        self.stack.push(Task::AwaitArrayItem { stream, depth, index: index + 1 });
                        self.stack.push(Task::Serialize { value: item, key: Arc::from(""), depth: depth + 1 });
                        Ok(true)
                    }
                    Poll::Ready(Some(Err(err))) => Err(err.into_upstream()),
                    Poll::Ready(None) => {
                        self.close_container(depth, index == 0, false);
                        Ok(true)
                    }
                    Poll::Pending => {
                        self.stack.push(Task::AwaitArrayItem { stream, depth, index });
                        Ok(false)
                    }
                }
            }
            Task::AwaitObjectEntry { mut stream, depth, index } => {
                match stream.as_mut().poll_next(cx) {
                    Poll::Ready(Some(Ok((key, value)))) => {
                        self.emit_item_separator(depth, index);
                        match key {
                            ObjectKey::Plain(k) => {
                                self.push_key_tokens(&k);
                                self.stack.push(Task::AwaitObjectEntry { stream, depth, index: index + 1 });
                                self.stack.push(Task::Serialize { value, key: Arc::from(k.as_str()), depth: depth + 1 });
                            }
                            ObjectKey::Stream(key_stream) => {
                                self.queue.push_back(Token::StringStart { role: Role::Key, raw: Arc::from("\"") });
                                self.stack.push(Task::AwaitKeyFragment {
                                    stream: key_stream,
                                    depth,
                                    index,
                                    rest_stream: stream,
                                    value,
                                });
                            }
                        }
                        Ok(true)
                    }
                    Poll::Ready(Some(Err(err))) => Err(err.into_upstream()),
                    Poll::Ready(None) => {
                        self.close_container(depth, index == 0, true);
                        Ok(true)
                    }
                    Poll::Pending => {
                        self.stack.push(Task::AwaitObjectEntry { stream, depth, index });
                        Ok(false)
                    }
                }
            }
            Task::AwaitKeyFragment { mut stream, depth, index, rest_stream, value } => {
                match stream.as_mut().poll_next(cx) {
                    Poll::Ready(Some(Ok(fragment))) => {
                        if !fragment.is_empty() {
                            let raw = escape_json_fragment(&fragment);
                            self.queue.push_back(Token::StringChunk {
                                role: Role::Key,
                                text: Arc::from(fragment.as_str()),
                                raw: Arc::from(raw.as_str()),
                            });
                        }
                        self.stack.push(Task::AwaitKeyFragment { stream, depth, index, rest_stream, value });
                        Ok(true)
                    }
                    Poll::Ready(Some(Err(err))) => Err(err.into_upstream()),
                    Poll::Ready(None) => {
                        self.queue.push_back(Token::StringEnd { role: Role::Key, raw: Arc::from("\"") });
                        self.push_colon();
                        self.stack.push(Task::AwaitObjectEntry { stream: rest_stream, depth, index: index + 1 });
                        // The key used when invoking the transform hook on
                        // an entry whose key is itself a stream is the
                        // empty string (spec §9, final open question).
                        self.stack.push(Task::Serialize { value, key: Arc::from(""), depth: depth + 1 });
                        Ok(true)
                    }
                    Poll::Pending => {
                        self.stack.push(Task::AwaitKeyFragment { stream, depth, index, rest_stream, value });
                        Ok(false)
                    }
                }
            }
            Task::CloseArray { depth, empty } => {
                if !empty {
                    if let Some(unit) = self.pretty() {
                        Self::push_indent(&mut self.queue, &unit, depth);
                    }
                }
                self.queue.push_back(Token::ArrayEnd { raw: Arc::from("]") });
                Ok(true)
            }
            Task::CloseObject { depth, empty } => {
                if !empty {
                    if let Some(unit) = self.pretty() {
                        Self::push_indent(&mut self.queue, &unit, depth);
                    }
                }
                self.queue.push_back(Token::ObjectEnd { raw: Arc::from("}") });
                Ok(true)
            }
        }
    }

    fn push_key_tokens(&mut self, key: &str) {
        self.queue.push_back(Token::StringStart { role: Role::Key, raw: Arc::from("\"") });
        if !key.is_empty() {
            let raw = escape_json_fragment(key);
            self.queue.push_back(Token::StringChunk {
                role: Role::Key,
                text: Arc::from(key),
                raw: Arc::from(raw.as_str()),
            });
        }
        self.queue.push_back(Token::StringEnd { role: Role::Key, raw: Arc::from("\"") });
        self.push_colon();
    }

    fn push_colon(&mut self) {
        self.queue.push_back(Token::Colon { raw: Arc::from(":") });
        if self.pretty().is_some() {
            self.queue.push_back(Token::Whitespace { raw: Arc::from(" ") });
        }
    }

    /// Emits the comma that precedes every *non-first* item inside a
    /// container, and (if pretty) the indent that precedes *every* item
    /// including the first (spec §4.3 pretty-printing rule).
    fn emit_item_separator(&mut self, container_depth: usize, index: usize) {
        if index > 0 {
            self.queue.push_back(Token::Comma { raw: Arc::from(",") });
        }
        if let Some(unit) = self.pretty() {
            Self::push_indent(&mut self.queue, &unit, container_depth + 1);
        }
    }

    fn close_container(&mut self, depth: usize, empty: bool, is_object: bool) {
        if is_object {
            self.stack.push(Task::CloseObject { depth, empty });
        } else {
            self.stack.push(Task::CloseArray { depth, empty });
        }
    }

    fn serialize(&mut self, value: SourceValue, key: Arc<str>, depth: usize) -> JsonFlowResult<bool> {
        match value {
            SourceValue::Plain(Value::Array(items)) => {
                self.queue.push_back(Token::ArrayStart { raw: Arc::from("[") });
                let stream = futures_util::stream::iter(
                    items.into_iter().map(|v| Ok(SourceValue::Plain(v))),
                )
                .boxed();
                self.stack.push(Task::AwaitArrayItem { stream, depth, index: 0 });
                Ok(true)
            }
            SourceValue::Plain(Value::Object(entries)) => {
                self.queue.push_back(Token::ObjectStart { raw: Arc::from("{") });
                let stream = futures_util::stream::iter(
                    entries.into_iter().map(|(k, v)| Ok((ObjectKey::Plain(k), SourceValue::Plain(v)))),
                )
                .boxed();
                self.stack.push(Task::AwaitObjectEntry { stream, depth, index: 0 });
                Ok(true)
            }
            SourceValue::Plain(scalar) => {
                let scalar = self.apply_transform(&key, scalar);
                // A transform may turn a primitive into a container; route
                // back through `serialize` rather than `push_scalar` in
                // that case.
                match scalar {
                    Value::Array(_) | Value::Object(_) => {
                        self.stack.push(Task::Serialize { value: SourceValue::Plain(scalar), key, depth });
                    }
                    other => self.push_scalar(other),
                }
                Ok(true)
            }
            SourceValue::Deferred(make_future) => {
                let fut = make_future();
                self.stack.push(Task::AwaitDeferred { fut, key, depth });
                Ok(true)
            }
            SourceValue::StringStream(stream) => {
                self.queue.push_back(Token::StringStart { role: Role::Value, raw: Arc::from("\"") });
                self.stack.push(Task::AwaitStringFragment { stream, role: Role::Value, depth });
                Ok(true)
            }
            SourceValue::ArrayStream(stream) => {
                self.queue.push_back(Token::ArrayStart { raw: Arc::from("[") });
                self.stack.push(Task::AwaitArrayItem { stream, depth, index: 0 });
                Ok(true)
            }
            SourceValue::ObjectStream(stream) => {
                self.queue.push_back(Token::ObjectStart { raw: Arc::from("{") });
                self.stack.push(Task::AwaitObjectEntry { stream, depth, index: 0 });
                Ok(true)
            }
            SourceValue::RawPassthrough(text) => {
                let tokens = parse_complete(&text, ParserOptions::default())
                    .map_err(|err| JsonFlowError::UpstreamError(Arc::new(err)))?;
                for token in tokens.into_iter().rev() {
                    self.stack.push(Task::Emit(token));
                }
                Ok(true)
            }
        }
    }
}

impl Stream for Serializer {
    type Item = JsonFlowResult<Token>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        loop {
            if let Some(token) = self.queue.pop_front() {
                return Poll::Ready(Some(Ok(token)));
            }
            if self.done {
                return Poll::Ready(None);
            }
            match self.step(cx) {
                Ok(true) => continue,
                Ok(false) => return Poll::Pending,
                Err(err) => {
                    self.done = true;
                    return Poll::Ready(Some(Err(err)));
                }
            }
        }
    }
}

pin_project! {
    /// Serializes *many* source values in sequence, framing them per spec
    /// §4.3 "Multi-document mode": an optional prefix before the first
    /// document, a delimiter between adjacent documents (default `"\n"` for
    /// JSONL), and an optional suffix after the last. Each document is
    /// lowered by its own inner [`Serializer`] sharing the same
    /// [`SerializerOptions`].
    pub struct MultiDocSerializer<S> {
        #[pin]
        upstream: S,
        framing: MultiDocFraming,
        options: SerializerOptions,
        queue: VecDeque<Token>,
        current: Option<Serializer>,
        started: bool,
        done: bool,
    }
}

impl<S> MultiDocSerializer<S>
where
    S: Stream<Item = JsonFlowResult<SourceValue>>,
{
    #[must_use]
    pub fn new(upstream: S, framing: MultiDocFraming, options: SerializerOptions) -> Self {
        Self {
            upstream,
            framing,
            options,
            queue: VecDeque::new(),
            current: None,
            started: false,
            done: false,
        }
    }
}

impl<S> Stream for MultiDocSerializer<S>
where
    S: Stream<Item = JsonFlowResult<SourceValue>>,
{
    type Item = JsonFlowResult<Token>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let mut me = self.project();
        loop {
            if let Some(token) = me.queue.pop_front() {
                return Poll::Ready(Some(Ok(token)));
            }
            if *me.done {
                return Poll::Ready(None);
            }
            if let Some(ser) = me.current.as_mut() {
                match Pin::new(ser).poll_next(cx) {
                    Poll::Ready(Some(Ok(token))) => {
                        me.queue.push_back(token);
                        continue;
                    }
                    Poll::Ready(Some(Err(err))) => {
                        *me.done = true;
                        return Poll::Ready(Some(Err(err)));
                    }
                    Poll::Ready(None) => {
                        *me.current = None;
                        continue;
                    }
                    Poll::Pending => return Poll::Pending,
                }
            }
            match me.upstream.as_mut().poll_next(cx) {
                Poll::Ready(Some(Ok(value))) => {
                    if !*me.started {
                        if !me.framing.before_first.is_empty() {
                            me.queue.push_back(Token::Whitespace {
                                raw: Arc::from(me.framing.before_first.as_str()),
                            });
                        }
                        *me.started = true;
                    } else if !me.framing.delimiter.is_empty() {
                        me.queue.push_back(Token::Whitespace {
                            raw: Arc::from(me.framing.delimiter.as_str()),
                        });
                    }
                    *me.current = Some(Serializer::new(value, me.options.clone()));
                    continue;
                }
                Poll::Ready(Some(Err(err))) => {
                    *me.done = true;
                    return Poll::Ready(Some(Err(err.into_upstream())));
                }
                Poll::Ready(None) => {
                    if *me.started && !me.framing.after_last.is_empty() {
                        me.queue.push_back(Token::Whitespace {
                            raw: Arc::from(me.framing.after_last.as_str()),
                        });
                    }
                    *me.done = true;
                    continue;
                }
                Poll::Pending => return Poll::Pending,
            }
        }
    }
}

/// Renders a finite `f64` the way `serde_json` would: integral values
/// without a trailing `.0`, everything else via the shortest round-tripping
/// decimal representation.
fn format_number(n: f64) -> String {
    n.to_string()
}

/// Escapes a decoded string fragment back into the form it would take
/// inside a JSON string literal (the inverse of the parser's string-body
/// decoding).
fn escape_json_fragment(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\u{8}' => out.push_str("\\b"),
            '\u{c}' => out.push_str("\\f"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            c if (c as u32) < 0x20 => out.push_str(&format!("\\u{:04x}", c as u32)),
            c => out.push(c),
        }
    }
    out
}
