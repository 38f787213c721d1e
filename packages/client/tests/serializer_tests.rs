//! Integration tests for value -> token conversion: pretty-printing,
//! multi-document framing, and the value-transform hook.

use futures_util::StreamExt;
use jsonflow_core::serializer::{Indent, MultiDocFraming, Serializer, SerializerOptions};
use jsonflow_core::stringifier::stringify_complete;
use jsonflow_core::token::Token;
use jsonflow_core::value::{SourceValue, Value};

async fn render(value: Value, options: SerializerOptions) -> String {
    let tokens: Vec<Token> = Serializer::new(SourceValue::Plain(value), options)
        .map(|r| r.unwrap())
        .collect()
        .await;
    stringify_complete(&tokens)
}

#[tokio::test]
async fn empty_array_and_object_serialize_without_an_interior_indent() {
    let value = Value::Object(vec![
        ("empty_array".to_string(), Value::Array(vec![])),
        ("empty_object".to_string(), Value::Object(vec![])),
    ]);
    let options = SerializerOptions::default().with_pretty(Indent::Spaces(2));
    let text = render(value, options).await;
    assert_eq!(
        text,
        "{\n  \"empty_array\": [],\n  \"empty_object\": {}\n}"
    );
}

#[tokio::test]
async fn custom_indent_string_is_used_verbatim() {
    let value = Value::Array(vec![Value::Number(1.0), Value::Number(2.0)]);
    let options = SerializerOptions::default().with_pretty(Indent::Str("\t".to_string()));
    let text = render(value, options).await;
    assert_eq!(text, "[\n\t1,\n\t2\n]");
}

#[tokio::test]
async fn transform_hook_rewrites_values_including_primitives() {
    let value = Value::Object(vec![
        ("secret".to_string(), Value::String("sensitive".to_string())),
        ("count".to_string(), Value::Number(3.0)),
    ]);
    let options = SerializerOptions::default().with_transform(|key: &str, value: &Value| {
        if key == "secret" {
            Some(Value::String("[redacted]".to_string()))
        } else if matches!(value, Value::Number(n) if *n == 3.0) {
            Some(Value::Number(30.0))
        } else {
            None
        }
    });
    let text = render(value, options).await;
    assert_eq!(text, r#"{"secret":"[redacted]","count":30}"#);
}

#[tokio::test]
async fn deferred_value_resolves_before_its_tokens_are_emitted() {
    let deferred = SourceValue::Deferred(Box::new(|| -> jsonflow_core::value::ValueFuture {
        Box::pin(async { Ok(Value::String("resolved".to_string())) })
    }));
    let obj = futures_util::stream::iter(vec![Ok((
        jsonflow_core::value::ObjectKey::Plain("value".to_string()),
        deferred,
    ))])
    .boxed();
    let tokens: Vec<Token> = Serializer::new(SourceValue::ObjectStream(obj), SerializerOptions::default())
        .map(|r| r.unwrap())
        .collect()
        .await;
    assert_eq!(stringify_complete(&tokens), r#"{"value":"resolved"}"#);
}

#[test]
fn jsonl_framing_constants_match_the_jsonl_convention() {
    let framing = MultiDocFraming::jsonl();
    assert_eq!(framing.before_first, "");
    assert_eq!(framing.delimiter, "\n");
    assert_eq!(framing.after_last, "");
}

#[test]
fn json_seq_framing_constants_match_rfc_7464() {
    let framing = MultiDocFraming::json_seq();
    assert_eq!(framing.before_first, "\u{1e}");
    assert_eq!(framing.delimiter, "\n\u{1e}");
    assert_eq!(framing.after_last, "\n");
}
