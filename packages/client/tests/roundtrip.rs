//! End-to-end round trips across all four converters: text -> tokens ->
//! values -> tokens -> text, and the reverse composition.

use futures_util::StreamExt;
use jsonflow_core::deserializer::deserialize_complete;
use jsonflow_core::parser::{parse_complete, ParserOptions};
use jsonflow_core::serializer::{Serializer, SerializerOptions};
use jsonflow_core::stringifier::stringify_complete;
use jsonflow_core::token::Token;
use jsonflow_core::value::{SourceValue, Value};

async fn serialize_one(value: Value) -> Vec<Token> {
    Serializer::new(SourceValue::Plain(value), SerializerOptions::default())
        .map(|r| r.unwrap())
        .collect()
        .await
}

#[tokio::test]
async fn text_to_tokens_to_values_to_tokens_to_text_preserves_the_document() {
    let input = r#"{"name":"ok","tags":["a","b"],"count":3,"active":true,"meta":null}"#;
    let tokens = parse_complete(input, ParserOptions::default()).unwrap();
    let mut values = deserialize_complete(tokens);
    assert_eq!(values.len(), 1);
    let value = values.remove(0);

    let re_tokens = serialize_one(value).await;
    let output = stringify_complete(&re_tokens);
    assert_eq!(output, input);
}

#[test]
fn parsing_then_stringifying_is_the_identity_on_raw_text() {
    let input = "  { \"a\" :  [1,  2,\n3] }  ";
    let tokens = parse_complete(input, ParserOptions::default()).unwrap();
    let output = stringify_complete(&tokens);
    assert_eq!(output, input);
}

#[tokio::test]
async fn values_with_nested_duplicate_keys_collapse_consistently_through_a_full_cycle() {
    let input = r#"{"a":1,"b":{"x":1,"x":2},"a":3}"#;
    let tokens = parse_complete(input, ParserOptions::default()).unwrap();
    let mut values = deserialize_complete(tokens);
    let value = values.remove(0);
    assert_eq!(
        value,
        Value::Object(vec![
            ("a".to_string(), Value::Number(3.0)),
            ("b".to_string(), Value::Object(vec![("x".to_string(), Value::Number(2.0))])),
        ])
    );

    let re_tokens = serialize_one(value).await;
    let output = stringify_complete(&re_tokens);
    assert_eq!(output, r#"{"a":3,"b":{"x":2}}"#);
}
