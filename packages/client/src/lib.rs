//! # jsonflow-core
//!
//! Incremental streaming JSON: text chunks, tokens, and values are three
//! views of the same document, and this crate is the set of converters
//! between them.
//!
//! ```text
//!        Parser            Serializer
//!  text ----------> tokens <----------- values
//!        Stringifier        Deserializer
//! ```
//!
//! Path-aware transforms sit on top of the token representation:
//! [`path_detector::PathDetector`] annotates each token with its position in
//! the document, [`path_selector::PathSelector`] filters that stream down to
//! the subtrees a [`selector::Selector`] expression matches, and
//! [`path_splitter::PathStreamSplitter`] explodes a matched set of subtrees
//! into one independent sub-stream per match.
//!
//! ## Usage
//!
//! ```
//! use jsonflow_core::parser::{parse_complete, ParserOptions};
//! use jsonflow_core::deserializer::deserialize_complete;
//!
//! let tokens = parse_complete(r#"{"a":1}"#, ParserOptions::default()).unwrap();
//! let values = deserialize_complete(tokens);
//! assert_eq!(values.len(), 1);
//! ```

#![deny(unsafe_code)]
#![warn(clippy::all)]

pub mod deserializer;
pub mod error;
pub mod parser;
pub mod path;
pub mod path_detector;
pub mod path_selector;
pub mod path_splitter;
pub mod selector;
pub mod serializer;
pub mod stringifier;
pub mod token;
pub mod value;

pub use crate::deserializer::{Deserializer, PathedDeserializer};
pub use crate::error::{JsonFlowError, JsonFlowResult};
pub use crate::parser::{DocumentMode, Parser, ParserOptions};
pub use crate::path::{Path, Segment};
pub use crate::path_detector::PathDetector;
pub use crate::path_selector::PathSelector;
pub use crate::path_splitter::{PathStreamSplitter, SubStream};
pub use crate::selector::{SegmentMatcher, Selector};
pub use crate::serializer::{Indent, MultiDocFraming, MultiDocSerializer, Serializer, SerializerOptions};
pub use crate::stringifier::Stringifier;
pub use crate::token::{PathedToken, Role, Token};
pub use crate::value::{ObjectKey, SourceValue, Transform, Value};
