//! The materialised `Value` tree (spec §3.4) and the `SourceValue` that the
//! [`crate::serializer::Serializer`] consumes (spec §3.5).

use std::fmt;
use std::future::Future;
use std::pin::Pin;

use futures_core::Stream;

/// A fully materialised JSON value.
///
/// Objects preserve insertion order; a duplicate key collapses to the last
/// writer but keeps the position of its first occurrence (DESIGN.md O1).
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Bool(bool),
    /// Decoded 64-bit float. Exact textual round-tripping of numbers that
    /// don't survive an `f64` (big integers, `-0`) is the job of the token
    /// layer's `raw` field, not this type -- see spec §3.4 Non-goals.
    Number(f64),
    String(String),
    Array(Vec<Value>),
    Object(Vec<(String, Value)>),
}

impl Value {
    #[must_use]
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_array(&self) -> Option<&[Value]> {
        match self {
            Value::Array(items) => Some(items),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_object(&self) -> Option<&[(String, Value)]> {
        match self {
            Value::Object(entries) => Some(entries),
            _ => None,
        }
    }

    /// Insert `key`/`value`, overwriting an existing entry in place (keeping
    /// its original position) rather than appending a duplicate.
    pub fn object_insert(entries: &mut Vec<(String, Value)>, key: String, value: Value) {
        if let Some(slot) = entries.iter_mut().find(|(k, _)| *k == key) {
            slot.1 = value;
        } else {
            entries.push((key, value));
        }
    }
}

impl From<serde_json::Value> for Value {
    fn from(value: serde_json::Value) -> Self {
        match value {
            serde_json::Value::Null => Value::Null,
            serde_json::Value::Bool(b) => Value::Bool(b),
            serde_json::Value::Number(n) => Value::Number(n.as_f64().unwrap_or(f64::NAN)),
            serde_json::Value::String(s) => Value::String(s),
            serde_json::Value::Array(items) => {
                Value::Array(items.into_iter().map(Value::from).collect())
            }
            serde_json::Value::Object(map) => {
                Value::Object(map.into_iter().map(|(k, v)| (k, Value::from(v))).collect())
            }
        }
    }
}

/// A boxed future resolving to a [`Value`], as accepted by
/// [`SourceValue::Deferred`].
pub type ValueFuture = Pin<Box<dyn Future<Output = crate::error::JsonFlowResult<Value>> + Send>>;

/// A boxed stream of decoded string fragments, as accepted by
/// [`SourceValue::StringStream`].
pub type StringFragmentStream =
    Pin<Box<dyn Stream<Item = crate::error::JsonFlowResult<String>> + Send>>;

/// A boxed stream of [`SourceValue`]s, as accepted by
/// [`SourceValue::ArrayStream`].
pub type ArrayElementStream =
    Pin<Box<dyn Stream<Item = crate::error::JsonFlowResult<SourceValue>> + Send>>;

/// A boxed stream of object entries, as accepted by
/// [`SourceValue::ObjectStream`]. A key may itself be a string stream (spec
/// §3.5, §9's empty-string transform-key convention).
pub type ObjectEntryStream =
    Pin<Box<dyn Stream<Item = crate::error::JsonFlowResult<(ObjectKey, SourceValue)>> + Send>>;

/// An object entry's key: either a plain string or a lazily-produced one.
pub enum ObjectKey {
    Plain(String),
    Stream(StringFragmentStream),
}

impl fmt::Debug for ObjectKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ObjectKey::Plain(s) => f.debug_tuple("Plain").field(s).finish(),
            ObjectKey::Stream(_) => f.write_str("Stream(..)"),
        }
    }
}

/// The value the [`crate::serializer::Serializer`] accepts in any position:
/// an eager value, something that resolves to one lazily, or a stream tag
/// (spec §3.5).
///
/// A stream tag is created by the caller, consumed exactly once by the
/// serializer, and (per spec §3.5 lifecycle / §5 Cancellation) dropped
/// without full consumption if the downstream consumer cancels first.
pub enum SourceValue {
    Plain(Value),
    /// A zero-argument closure returning a value or a future of one.
    /// Resolved lazily, at the point the serializer reaches this position.
    Deferred(Box<dyn FnOnce() -> ValueFuture + Send>),
    StringStream(StringFragmentStream),
    ArrayStream(ArrayElementStream),
    ObjectStream(ObjectEntryStream),
    /// Pre-rendered JSON text, spliced verbatim by re-parsing it and
    /// re-emitting its tokens in place of a single value's tokens (spec §9
    /// raw-JSON passthrough, preserved per DESIGN.md O3).
    RawPassthrough(String),
}

impl fmt::Debug for SourceValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SourceValue::Plain(v) => f.debug_tuple("Plain").field(v).finish(),
            SourceValue::Deferred(_) => f.write_str("Deferred(..)"),
            SourceValue::StringStream(_) => f.write_str("StringStream(..)"),
            SourceValue::ArrayStream(_) => f.write_str("ArrayStream(..)"),
            SourceValue::ObjectStream(_) => f.write_str("ObjectStream(..)"),
            SourceValue::RawPassthrough(s) => f.debug_tuple("RawPassthrough").field(s).finish(),
        }
    }
}

impl From<Value> for SourceValue {
    fn from(value: Value) -> Self {
        SourceValue::Plain(value)
    }
}

/// A user-supplied hook invoked on every value, including primitives (spec
/// §9), before it is lowered to tokens. Modelled as a trait object so
/// callers can close over arbitrary state.
pub trait Transform: Send + Sync {
    /// `key` is the entry's key, or `""` when the key is itself a
    /// `StringStream` (spec §9, the explicit empty-string convention).
    fn transform(&self, key: &str, value: &Value) -> Option<Value>;
}

impl<F> Transform for F
where
    F: Fn(&str, &Value) -> Option<Value> + Send + Sync,
{
    fn transform(&self, key: &str, value: &Value) -> Option<Value> {
        self(key, value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn object_insert_overwrites_in_place() {
        let mut entries = vec![("a".to_string(), Value::Number(1.0))];
        Value::object_insert(&mut entries, "b".to_string(), Value::Number(2.0));
        Value::object_insert(&mut entries, "a".to_string(), Value::Number(3.0));
        assert_eq!(
            entries,
            vec![
                ("a".to_string(), Value::Number(3.0)),
                ("b".to_string(), Value::Number(2.0)),
            ]
        );
    }

    #[test]
    fn from_serde_json_preserves_structure() {
        let input = serde_json::json!({"a": [1, null, true]});
        let value = Value::from(input);
        match value {
            Value::Object(entries) => {
                assert_eq!(entries.len(), 1);
                assert_eq!(entries[0].0, "a");
                assert_eq!(
                    entries[0].1,
                    Value::Array(vec![Value::Number(1.0), Value::Null, Value::Bool(true)])
                );
            }
            other => panic!("expected object, got {other:?}"),
        }
    }
}
