use glob::{MatchOptions, Pattern};
use once_cell::sync::Lazy;

use crate::error::{HistoryError, Result};

/// Where Alembic and Django keep their migration scripts.
pub const DEFAULT_PATTERNS: &[&str] = &["alembic/versions/*.py", "*/migrations/*.py"];

static DEFAULT_MATCHER: Lazy<PathMatcher> = Lazy::new(|| {
    PathMatcher::new(DEFAULT_PATTERNS.iter().map(|s| s.to_string()))
        .expect("default migration patterns are valid globs")
});

// fnmatch semantics: `*` and `?` also match `/`
const MATCH_OPTIONS: MatchOptions = MatchOptions {
    case_sensitive: true,
    require_literal_separator: false,
    require_literal_leading_dot: false,
};

/// A compiled set of glob patterns matched against repository-relative paths.
#[derive(Debug, Clone)]
pub struct PathMatcher {
    patterns: Vec<Pattern>,
}

impl PathMatcher {
    /// Compiles `patterns`. An empty list or an invalid glob is an `InvalidArgument`.
    pub fn new<I, S>(patterns: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut compiled = Vec::new();
        for raw in patterns {
            let raw = raw.as_ref();
            let pattern = Pattern::new(raw)
                .map_err(|e| HistoryError::invalid(format!("Invalid pattern '{raw}': {e}")))?;
            compiled.push(pattern);
        }
        if compiled.is_empty() {
            return Err(HistoryError::invalid("patterns cannot be an empty list"));
        }
        Ok(Self { patterns: compiled })
    }

    pub fn default_patterns() -> Self {
        DEFAULT_MATCHER.clone()
    }

    pub fn matches(&self, path: &str) -> bool {
        self.patterns.iter().any(|p| p.matches_with(path, MATCH_OPTIONS))
    }

    pub fn patterns(&self) -> Vec<&str> {
        self.patterns.iter().map(|p| p.as_str()).collect()
    }
}

/// Returns the sorted, duplicate-free subset of `files` matching any pattern.
pub fn filter_migration_files(files: &[String], matcher: &PathMatcher) -> Vec<String> {
    let mut matched: Vec<String> = files.iter().filter(|f| matcher.matches(f)).cloned().collect();
    matched.sort();
    matched.dedup();
    matched
}
