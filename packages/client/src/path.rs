//! Document paths: the position of a token or value inside the nesting
//! hierarchy of a JSON document (spec §3.2).
//!
//! A path is an ordered sequence of segments, each either an object key or
//! an array index. The empty path denotes the document root.

use std::fmt;
use std::sync::Arc;

/// One element of a [`Path`]: either a property key or an array index.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Segment {
    Key(Arc<str>),
    Index(usize),
}

impl Segment {
    #[must_use]
    pub fn as_key(&self) -> Option<&str> {
        match self {
            Segment::Key(k) => Some(k),
            Segment::Index(_) => None,
        }
    }

    #[must_use]
    pub fn as_index(&self) -> Option<usize> {
        match self {
            Segment::Index(i) => Some(*i),
            Segment::Key(_) => None,
        }
    }
}

impl fmt::Display for Segment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Segment::Key(k) => write!(f, "{k}"),
            Segment::Index(i) => write!(f, "{i}"),
        }
    }
}

impl From<&str> for Segment {
    fn from(value: &str) -> Self {
        Segment::Key(Arc::from(value))
    }
}

impl From<String> for Segment {
    fn from(value: String) -> Self {
        Segment::Key(Arc::from(value.as_str()))
    }
}

impl From<usize> for Segment {
    fn from(value: usize) -> Self {
        Segment::Index(value)
    }
}

/// An ordered sequence of [`Segment`]s locating a token or value within a
/// document. The empty path is the root.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct Path(Vec<Segment>);

impl Path {
    #[must_use]
    pub fn root() -> Self {
        Path(Vec::new())
    }

    #[must_use]
    pub fn from_segments(segments: Vec<Segment>) -> Self {
        Path(segments)
    }

    #[must_use]
    pub fn segments(&self) -> &[Segment] {
        &self.0
    }

    #[must_use]
    pub fn is_root(&self) -> bool {
        self.0.is_empty()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn push(&mut self, segment: impl Into<Segment>) {
        self.0.push(segment.into());
    }

    pub fn pop(&mut self) -> Option<Segment> {
        self.0.pop()
    }

    /// Returns a new path with `segment` appended, leaving `self` untouched.
    #[must_use]
    pub fn joined(&self, segment: impl Into<Segment>) -> Self {
        let mut out = self.0.clone();
        out.push(segment.into());
        Path(out)
    }

    /// True iff `self` is `prefix` or a descendant of it, i.e. `prefix`'s
    /// segments are a leading subsequence of `self`'s segments.
    #[must_use]
    pub fn has_prefix(&self, prefix: &Path) -> bool {
        prefix.0.len() <= self.0.len() && self.0[..prefix.0.len()] == prefix.0[..]
    }

    /// Strips `prefix` from the front of `self`. Returns `None` if `self`
    /// does not have `prefix` as a prefix.
    #[must_use]
    pub fn strip_prefix(&self, prefix: &Path) -> Option<Path> {
        if !self.has_prefix(prefix) {
            return None;
        }
        Some(Path(self.0[prefix.0.len()..].to_vec()))
    }
}

impl fmt::Display for Path {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "$")?;
        for segment in &self.0 {
            match segment {
                Segment::Key(k) => write!(f, ".{k}")?,
                Segment::Index(i) => write!(f, "[{i}]")?,
            }
        }
        Ok(())
    }
}

impl FromIterator<Segment> for Path {
    fn from_iter<T: IntoIterator<Item = Segment>>(iter: T) -> Self {
        Path(iter.into_iter().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn root_is_empty() {
        assert!(Path::root().is_root());
    }

    #[test]
    fn prefix_detection() {
        let root = Path::root();
        let a = root.joined("a");
        let a_results = a.joined("results");
        assert!(a_results.has_prefix(&a));
        assert!(!a.has_prefix(&a_results));
        assert_eq!(a_results.strip_prefix(&a).unwrap(), Path::root().joined("results"));
    }

    #[test]
    fn display_formats_mixed_segments() {
        let path = Path::root().joined("object").joined("array").joined(1usize);
        assert_eq!(path.to_string(), "$.object.array[1]");
    }
}
