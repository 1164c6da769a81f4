// ── Name filter ──
//
// User-supplied patterns that hide devices. `%` is the only wildcard and
// only counts at the start or end of a pattern:
//
//   bathroom    exact match
//   %bathroom   ends with
//   bathroom%   starts with
//   %bathroom%  contains
//
// Matching is case-insensitive and applies to the full device name and to
// the processor's type string.

#[derive(Debug, Clone, PartialEq, Eq)]
enum Pattern {
    Exact(String),
    Prefix(String),
    Suffix(String),
    Contains(String),
}

impl Pattern {
    fn parse(raw: &str) -> Self {
        let p = raw.trim().to_lowercase();
        let leading = p.starts_with('%');
        let trailing = p.len() > 1 && p.ends_with('%');

        match (leading, trailing) {
            (true, true) => Self::Contains(p[1..p.len() - 1].to_owned()),
            (true, false) => Self::Suffix(p[1..].to_owned()),
            (false, true) => Self::Prefix(p[..p.len() - 1].to_owned()),
            (false, false) => Self::Exact(p),
        }
    }

    fn matches(&self, candidate: &str) -> bool {
        match self {
            Self::Exact(term) => candidate == term,
            Self::Prefix(term) => candidate.starts_with(term.as_str()),
            Self::Suffix(term) => candidate.ends_with(term.as_str()),
            Self::Contains(term) => candidate.contains(term.as_str()),
        }
    }
}

/// Compiled set of ignore patterns.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NameFilter {
    patterns: Vec<Pattern>,
}

impl NameFilter {
    /// Compile patterns. Blank entries are dropped.
    pub fn new<I, S>(patterns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let patterns = patterns
            .into_iter()
            .filter(|p| !p.as_ref().trim().is_empty())
            .map(|p| Pattern::parse(p.as_ref()))
            .collect();
        Self { patterns }
    }

    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }

    /// True if ANY pattern matches `name` or `raw_type`.
    pub fn matches(&self, name: &str, raw_type: &str) -> bool {
        if self.patterns.is_empty() {
            return false;
        }
        let name = name.to_lowercase();
        let raw_type = raw_type.to_lowercase();
        self.patterns
            .iter()
            .any(|p| p.matches(&name) || p.matches(&raw_type))
    }
}
