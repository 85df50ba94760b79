//! Path segment extraction.
//!
//! # Design Decisions
//! - The path is split on `/` and cut at a fixed segment count
//! - Segment 0 is the (empty) text before the leading slash
//! - Matching is case-sensitive and does not percent-decode

/// Path of a request split into segments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathSegments {
    segments: Vec<String>,
}

impl PathSegments {
    /// Split `path` on `/`, keeping at most `max` segments.
    pub fn parse(path: &str, max: usize) -> Self {
        Self {
            segments: path.split('/').take(max).map(str::to_string).collect(),
        }
    }

    /// The segment that selects a route, e.g. `ingest` for `/ingest/x`.
    ///
    /// Returns an empty string for `/` or an empty path.
    pub fn first(&self) -> &str {
        self.get(1).unwrap_or("")
    }

    pub fn get(&self, index: usize) -> Option<&str> {
        self.segments.get(index).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.segments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.segments.iter().map(String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_segment_after_leading_slash() {
        let segments = PathSegments::parse("/ingest/extra", 16);
        assert_eq!(segments.first(), "ingest");
        assert_eq!(segments.get(2), Some("extra"));
        assert_eq!(segments.len(), 3);
    }

    #[test]
    fn empty_and_root_paths() {
        assert_eq!(PathSegments::parse("/", 16).first(), "");
        assert_eq!(PathSegments::parse("", 16).first(), "");
        assert!(!PathSegments::parse("", 16).is_empty());
    }

    #[test]
    fn caps_segment_count() {
        let path = "/a".repeat(40);
        let segments = PathSegments::parse(&path, 16);
        assert_eq!(segments.len(), 16);
        assert!(segments.iter().skip(1).all(|s| s == "a"));
    }

    #[test]
    fn case_sensitive() {
        assert_eq!(PathSegments::parse("/ingestAll", 16).first(), "ingestAll");
        assert_ne!(PathSegments::parse("/INGEST", 16).first(), "ingest");
    }
}
