//! Element path filtering
//!
//! Patterns are dot-separated (`Patient.name.family`, `*.meta`). The first
//! segment names a resource type, the rest are field names. `*` matches any
//! single segment. Paths are always rooted at the nearest enclosing resource,
//! so `*.meta` also applies to contained and bundled resources.

use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Any,
    Name(String),
}

impl Segment {
    fn matches(&self, segment: &str) -> bool {
        match self {
            Segment::Any => true,
            Segment::Name(name) => name == segment,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathPattern {
    segments: Vec<Segment>,
}

impl PathPattern {
    pub fn parse(pattern: &str) -> Self {
        let segments = pattern
            .trim()
            .split('.')
            .filter(|s| !s.is_empty())
            .map(|s| match s {
                "*" => Segment::Any,
                name => Segment::Name(name.to_string()),
            })
            .collect();
        Self { segments }
    }

    pub fn len(&self) -> usize {
        self.segments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    /// The path equals the pattern or lies below it.
    pub fn covers(&self, path: &[&str]) -> bool {
        !self.segments.is_empty()
            && path.len() >= self.segments.len()
            && self
                .segments
                .iter()
                .zip(path)
                .all(|(segment, name)| segment.matches(name))
    }

    /// The path is a strict ancestor of what the pattern selects.
    pub fn is_below(&self, path: &[&str]) -> bool {
        path.len() < self.segments.len()
            && self
                .segments
                .iter()
                .zip(path)
                .all(|(segment, name)| segment.matches(name))
    }
}

impl fmt::Display for PathPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text: Vec<&str> = self
            .segments
            .iter()
            .map(|s| match s {
                Segment::Any => "*",
                Segment::Name(name) => name.as_str(),
            })
            .collect();
        f.write_str(&text.join("."))
    }
}

/// Fields every allow-list keeps.
const ALWAYS_INCLUDE: &[&str] = &["id", "meta"];

/// Allow-list and deny-list over element paths.
#[derive(Debug, Clone, Default)]
pub struct PathFilter {
    include: Vec<PathPattern>,
    exclude: Vec<PathPattern>,
}

impl PathFilter {
    pub fn new<S: AsRef<str>>(include: &[S], exclude: &[S]) -> Self {
        let parse = |patterns: &[S]| {
            patterns
                .iter()
                .map(|p| PathPattern::parse(p.as_ref()))
                .filter(|p| !p.is_empty())
                .collect::<Vec<_>>()
        };
        Self {
            include: parse(include),
            exclude: parse(exclude),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.include.is_empty() && self.exclude.is_empty()
    }

    /// Whether the element at `path` (resource type first) is encoded.
    pub fn is_included(&self, path: &[&str]) -> bool {
        self.passes_allow_list(path) && !self.is_excluded(path)
    }

    /// A deny-list pattern covers the path.
    pub fn is_excluded(&self, path: &[&str]) -> bool {
        self.exclude.iter().any(|pattern| pattern.covers(path))
    }

    fn passes_allow_list(&self, path: &[&str]) -> bool {
        if self.include.is_empty() || path.len() <= 1 {
            return true;
        }
        if path.get(1).is_some_and(|field| ALWAYS_INCLUDE.contains(field)) {
            return true;
        }
        self.include
            .iter()
            .any(|pattern| pattern.covers(path) || pattern.is_below(path))
    }
}
