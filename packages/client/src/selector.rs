//! Selectors: predicates over [`Path`]s (spec §3.3, §6).
//!
//! Two forms are supported: a structural pattern (list of per-segment
//! constraints, parseable from the textual form in §6) and an opaque
//! predicate function, which is library-internal only and has no textual
//! form.

use std::fmt;
use std::sync::Arc;

use crate::error::{JsonFlowError, JsonFlowResult};
use crate::path::{Path, Segment};

/// A constraint on a single path segment within a [`Selector::Pattern`].
#[derive(Debug, Clone, PartialEq)]
pub enum SegmentMatcher {
    Key(String),
    Index(usize),
    /// Match any of the given keys/indices.
    AnyOf(Vec<SegmentMatcher>),
    /// Match any single segment.
    Wildcard,
}

impl SegmentMatcher {
    fn matches(&self, segment: &Segment) -> bool {
        match self {
            SegmentMatcher::Key(k) => matches!(segment, Segment::Key(sk) if sk.as_ref() == k),
            SegmentMatcher::Index(i) => matches!(segment, Segment::Index(si) if si == i),
            SegmentMatcher::AnyOf(options) => options.iter().any(|m| m.matches(segment)),
            SegmentMatcher::Wildcard => true,
        }
    }
}

/// A predicate over [`Path`]s, used to pick out tokens/values by position
/// (spec §3.3).
pub enum Selector {
    /// Per-segment constraints; path length must equal the pattern length
    /// to match (spec §3.3).
    Pattern(Vec<SegmentMatcher>),
    /// An opaque predicate. Library-internal; has no textual form.
    Predicate(Arc<dyn Fn(&Path) -> bool + Send + Sync>),
}

impl fmt::Debug for Selector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Selector::Pattern(segments) => f.debug_tuple("Pattern").field(segments).finish(),
            Selector::Predicate(_) => f.write_str("Predicate(..)"),
        }
    }
}

impl Selector {
    /// The selector matching only the document root (empty pattern).
    #[must_use]
    pub fn root() -> Self {
        Selector::Pattern(Vec::new())
    }

    #[must_use]
    pub fn predicate<F>(f: F) -> Self
    where
        F: Fn(&Path) -> bool + Send + Sync + 'static,
    {
        Selector::Predicate(Arc::new(f))
    }

    #[must_use]
    pub fn matches(&self, path: &Path) -> bool {
        match self {
            Selector::Pattern(matchers) => {
                let segments = path.segments();
                matchers.len() == segments.len()
                    && matchers
                        .iter()
                        .zip(segments)
                        .all(|(matcher, segment)| matcher.matches(segment))
            }
            Selector::Predicate(f) => f(path),
        }
    }

    /// Parses the textual selector form of spec §6: a sequence of
    /// dot-separated segments, each a literal key, a non-negative integer
    /// index, a `{a,b,c}` alternation set, or `*` for wildcard.
    ///
    /// Raises [`JsonFlowError::InvalidSelector`] synchronously (spec §7) on
    /// malformed input -- e.g. a negative index literal inside `{}`.
    pub fn parse(text: &str) -> JsonFlowResult<Self> {
        if text.is_empty() {
            return Ok(Selector::root());
        }
        let mut matchers = Vec::new();
        for raw_segment in text.split('.') {
            if raw_segment.is_empty() {
                return Err(JsonFlowError::invalid_selector(format!(
                    "empty segment in selector {text:?}"
                )));
            }
            matchers.push(parse_segment(raw_segment)?);
        }
        Ok(Selector::Pattern(matchers))
    }
}

fn parse_segment(raw: &str) -> JsonFlowResult<SegmentMatcher> {
    if raw == "*" {
        return Ok(SegmentMatcher::Wildcard);
    }
    if let Some(inner) = raw.strip_prefix('{').and_then(|s| s.strip_suffix('}')) {
        if inner.is_empty() {
            return Err(JsonFlowError::invalid_selector("empty alternation set {}"));
        }
        let options = inner
            .split(',')
            .map(parse_atom)
            .collect::<JsonFlowResult<Vec<_>>>()?;
        return Ok(SegmentMatcher::AnyOf(options));
    }
    parse_atom(raw)
}

fn parse_atom(raw: &str) -> JsonFlowResult<SegmentMatcher> {
    if raw.chars().all(|c| c.is_ascii_digit()) && !raw.is_empty() {
        let index: usize = raw
            .parse()
            .map_err(|_| JsonFlowError::invalid_selector(format!("invalid index {raw:?}")))?;
        return Ok(SegmentMatcher::Index(index));
    }
    if raw.starts_with('-') {
        return Err(JsonFlowError::invalid_selector(format!(
            "negative index {raw:?} is not a valid path segment"
        )));
    }
    Ok(SegmentMatcher::Key(raw.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wildcard_matches_any_single_segment() {
        let selector = Selector::parse("*.results").unwrap();
        assert!(selector.matches(&Path::root().joined("apples").joined("results")));
        assert!(!selector.matches(&Path::root().joined("apples")));
        assert!(!selector.matches(
            &Path::root()
                .joined("apples")
                .joined("results")
                .joined(0usize)
        ));
    }

    #[test]
    fn alternation_set_matches_any_listed_key() {
        let selector = Selector::parse("{a,b}").unwrap();
        assert!(selector.matches(&Path::root().joined("a")));
        assert!(selector.matches(&Path::root().joined("b")));
        assert!(!selector.matches(&Path::root().joined("c")));
    }

    #[test]
    fn negative_index_is_rejected() {
        assert!(Selector::parse("{-1}").is_err());
    }

    #[test]
    fn numeric_segment_matches_index() {
        let selector = Selector::parse("items.0").unwrap();
        assert!(selector.matches(&Path::root().joined("items").joined(0usize)));
    }

    #[test]
    fn root_selector_matches_only_empty_path() {
        let selector = Selector::root();
        assert!(selector.matches(&Path::root()));
        assert!(!selector.matches(&Path::root().joined("a")));
    }
}
