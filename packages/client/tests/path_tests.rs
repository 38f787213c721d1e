//! Integration tests for path annotation, selector parsing/matching, and
//! subtree splitting working together.

use futures_util::StreamExt;
use jsonflow_core::parser::{parse_complete, ParserOptions};
use jsonflow_core::path::Path;
use jsonflow_core::path_detector::detect_paths;
use jsonflow_core::path_selector::PathSelector;
use jsonflow_core::path_splitter::{PathStreamSplitter, DEFAULT_SUB_STREAM_BUFFER};
use jsonflow_core::selector::Selector;
use jsonflow_core::stringifier::stringify_complete;
use jsonflow_core::token::{PathedToken, Token};

#[test]
fn selector_parse_rejects_a_negative_index_literal() {
    let err = Selector::parse("-1").unwrap_err();
    assert!(matches!(err, jsonflow_core::JsonFlowError::InvalidSelector(_)));
}

#[test]
fn selector_parse_accepts_an_alternation_set() {
    let selector = Selector::parse("{a,b,c}").unwrap();
    assert!(selector.matches(&Path::root().joined("b")));
    assert!(!selector.matches(&Path::root().joined("d")));
}

#[tokio::test]
async fn detector_selector_and_splitter_compose_to_select_named_subtrees() {
    let input = r#"{"apples":{"price":1,"results":["a1","a2"]},"oranges":{"price":2,"results":["o1"]}}"#;
    let tokens = parse_complete(input, ParserOptions::default()).unwrap();
    let pathed = detect_paths(tokens);
    let upstream = futures_util::stream::iter(pathed.into_iter().map(Ok));
    let selected = PathSelector::new(upstream, Selector::parse("*.results").unwrap());

    let mut splitter = PathStreamSplitter::new(selected, DEFAULT_SUB_STREAM_BUFFER);
    let mut rendered = Vec::new();
    while let Some(sub) = splitter.next().await {
        let mut sub = sub.unwrap();
        let root = sub.root_path().clone();
        let tokens: Vec<Token> = (&mut sub).map(|r| r.unwrap().token).collect().await;
        rendered.push((root, stringify_complete(&tokens)));
    }

    assert_eq!(rendered.len(), 2);
    assert_eq!(rendered[0].0, Path::root().joined("apples").joined("results"));
    assert_eq!(rendered[0].1, r#"["a1","a2"]"#);
    assert_eq!(rendered[1].0, Path::root().joined("oranges").joined("results"));
    assert_eq!(rendered[1].1, r#"["o1"]"#);
}

#[tokio::test]
async fn excluding_descendants_keeps_only_the_exact_match_boundary_tokens() {
    let input = r#"{"a":{"b":[1,2]}}"#;
    let tokens = parse_complete(input, ParserOptions::default()).unwrap();
    let pathed = detect_paths(tokens);
    let upstream = futures_util::stream::iter(pathed.into_iter().map(Ok));
    let selected: Vec<PathedToken> =
        PathSelector::new(upstream, Selector::parse("a.b").unwrap())
            .with_include_descendants(false)
            .map(|r| r.unwrap())
            .collect()
            .await;

    assert_eq!(selected.len(), 1);
    assert!(matches!(selected[0].token, Token::ArrayStart { .. }));
}

#[test]
fn path_strip_prefix_reroots_a_descendant_path() {
    let root = Path::root().joined("a").joined("b");
    let full = root.joined(2usize).joined("c");
    let rerooted = full.strip_prefix(&root).unwrap();
    assert_eq!(rerooted, Path::root().joined(2usize).joined("c"));
    assert!(full.strip_prefix(&Path::root().joined("x")).is_none());
}
