//! Ant-style path matching for access rules.
//!
//! # Pattern Syntax
//!
//! - `?` matches exactly one character
//! - `*` matches zero or more characters within a path segment
//! - `**` matches zero or more whole path segments
//!
//! Empty segments are ignored on both sides, so `/user/`, `/user` and
//! `//user` are the same path.
//!
//! ```rust
//! use warden_core::http::security::ant_matcher::AntMatcher;
//!
//! let matcher = AntMatcher::new("/manager/**");
//! assert!(matcher.matches("/manager"));
//! assert!(matcher.matches("/manager/reports/2024"));
//! assert!(!matcher.matches("/managers"));
//! ```
//!
//! # Spring Equivalent
//!
//! `org.springframework.util.AntPathMatcher`

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Literal(String),
    /// `**`
    AnyPath,
    /// A segment containing `*` or `?`
    Glob(Vec<char>),
}

/// A compiled Ant pattern.
#[derive(Debug, Clone)]
pub struct AntMatcher {
    pattern: String,
    segments: Vec<Segment>,
}

impl AntMatcher {
    pub fn new(pattern: &str) -> Self {
        let segments = split(pattern)
            .map(|part| {
                if part == "**" {
                    Segment::AnyPath
                } else if part.contains(['*', '?']) {
                    Segment::Glob(part.chars().collect())
                } else {
                    Segment::Literal(part.to_string())
                }
            })
            .collect();

        AntMatcher {
            pattern: pattern.to_string(),
            segments,
        }
    }

    /// The pattern as written.
    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    pub fn matches(&self, path: &str) -> bool {
        let path: Vec<&str> = split(path).collect();
        match_segments(&self.segments, &path)
    }

    /// Returns true when every path matched by `other` is also matched by `self`.
    ///
    /// Only decides the common shapes: identical patterns, and a pattern of
    /// literals followed by a trailing `**` against a pattern that begins
    /// with the same literals. Anything else reports `false`.
    pub fn covers(&self, other: &AntMatcher) -> bool {
        if self.segments == other.segments {
            return true;
        }

        let Some((Segment::AnyPath, prefix)) = self.segments.split_last() else {
            return false;
        };
        if prefix.iter().any(|s| !matches!(s, Segment::Literal(_))) {
            return false;
        }

        other.segments.len() >= prefix.len()
            && prefix.iter().zip(&other.segments).all(|(a, b)| a == b)
    }
}

fn split(path: &str) -> impl Iterator<Item = &str> {
    path.split('/').filter(|s| !s.is_empty())
}

fn match_segments(pattern: &[Segment], path: &[&str]) -> bool {
    match pattern.split_first() {
        None => path.is_empty(),
        Some((Segment::AnyPath, rest)) => {
            (0..=path.len()).any(|skip| match_segments(rest, &path[skip..]))
        }
        Some((segment, rest)) => match path.split_first() {
            Some((head, tail)) => match_one(segment, head) && match_segments(rest, tail),
            None => false,
        },
    }
}

fn match_one(segment: &Segment, text: &str) -> bool {
    match segment {
        Segment::Literal(literal) => literal == text,
        Segment::Glob(glob) => {
            let text: Vec<char> = text.chars().collect();
            match_glob(glob, &text)
        }
        Segment::AnyPath => true,
    }
}

fn match_glob(glob: &[char], text: &[char]) -> bool {
    match glob.split_first() {
        None => text.is_empty(),
        Some(('*', rest)) => (0..=text.len()).any(|skip| match_glob(rest, &text[skip..])),
        Some(('?', rest)) => !text.is_empty() && match_glob(rest, &text[1..]),
        Some((c, rest)) => text.first() == Some(c) && match_glob(rest, &text[1..]),
    }
}
