pub mod cli;
pub mod date;
pub mod log_parser;

#[cfg(test)]
pub mod fake;

use crate::error::Result;

pub use cli::GitCli;
pub use date::{parse_git_date, Timestamp};

/// One line of `git log` for a path: hash, author, raw date, subject.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogEntry {
    pub hash: String,
    pub author: String,
    pub date: String,
    pub subject: String,
}

/// A resolved commit object.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommitObject {
    pub hash: String,
    pub author: String,
    /// Committer date, ISO-8601 with offset.
    pub date: String,
    pub message: String,
    pub parents: Vec<String>,
    /// Every path the commit changed relative to its first parent.
    pub files: Vec<String>,
}

impl CommitObject {
    pub fn first_parent(&self) -> Option<&str> {
        self.parents.first().map(|p| p.as_str())
    }

    pub fn is_root(&self) -> bool {
        self.parents.is_empty()
    }
}

/// Filters forwarded to the log query.
#[derive(Debug, Clone, Default)]
pub struct LogFilter<'a> {
    pub since: Option<&'a Timestamp>,
    pub until: Option<&'a Timestamp>,
    pub author: Option<&'a str>,
}

/// The version-control query surface the scanner reads from.
///
/// Every call blocks until the underlying query finishes. Implementations do
/// no caching of their own.
pub trait VcsBackend {
    /// All paths tracked at HEAD.
    fn tracked_files(&self) -> Result<Vec<String>>;

    /// Whether `path` is tracked at HEAD.
    fn is_tracked(&self, path: &str) -> Result<bool>;

    /// Commits touching `path`, most recent first, following renames.
    fn log(&self, path: &str, filter: &LogFilter<'_>) -> Result<Vec<LogEntry>>;

    /// Unified diff of `path` between two revisions.
    fn diff(&self, from: &str, to: &str, path: &str) -> Result<String>;

    /// `--name-status` output for `path` between two revisions.
    fn name_status(&self, from: &str, to: &str, path: &str) -> Result<String>;

    /// Full content of `path` as introduced by a parentless commit.
    fn show_root(&self, hash: &str, path: &str) -> Result<String>;

    /// Resolves a hash (or any revision) to a commit object.
    fn commit(&self, hash: &str) -> Result<CommitObject>;

    /// Whether `path` exists in the tree of `rev`.
    fn tree_contains(&self, rev: &str, path: &str) -> Result<bool>;
}
