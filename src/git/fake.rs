//! In-memory [`VcsBackend`] for unit tests.

use std::cell::RefCell;
use std::collections::{HashMap, HashSet};

use super::{CommitObject, LogEntry, LogFilter, VcsBackend};
use crate::error::{HistoryError, Result};

#[derive(Debug, Default)]
pub struct FakeBackend {
    tracked: Vec<String>,
    /// path → hashes, most recent first
    logs: HashMap<String, Vec<String>>,
    commits: HashMap<String, CommitObject>,
    diffs: HashMap<(String, String), String>,
    statuses: HashMap<(String, String), String>,
    root_content: HashMap<(String, String), String>,
    trees: HashMap<String, HashSet<String>>,
    failing: HashSet<(String, String)>,
    calls: RefCell<HashMap<&'static str, usize>>,
}

impl FakeBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn track(mut self, paths: &[&str]) -> Self {
        self.tracked.extend(paths.iter().map(|p| p.to_string()));
        self
    }

    /// Registers a commit and prepends it to the log of every file it touches.
    pub fn commit(mut self, hash: &str, date: &str, message: &str, parents: &[&str], files: &[&str]) -> Self {
        let obj = CommitObject {
            hash: hash.to_string(),
            author: "Dev".to_string(),
            date: date.to_string(),
            message: message.to_string(),
            parents: parents.iter().map(|p| p.to_string()).collect(),
            files: files.iter().map(|f| f.to_string()).collect(),
        };
        for file in files {
            self.logs.entry(file.to_string()).or_default().insert(0, hash.to_string());
        }
        self.commits.insert(hash.to_string(), obj);
        self
    }

    pub fn author(mut self, hash: &str, author: &str) -> Self {
        if let Some(c) = self.commits.get_mut(hash) {
            c.author = author.to_string();
        }
        self
    }

    pub fn diff(mut self, hash: &str, path: &str, text: &str) -> Self {
        self.diffs.insert((hash.to_string(), path.to_string()), text.to_string());
        self
    }

    pub fn status(mut self, hash: &str, path: &str, text: &str) -> Self {
        self.statuses.insert((hash.to_string(), path.to_string()), text.to_string());
        self
    }

    pub fn root_content(mut self, hash: &str, path: &str, text: &str) -> Self {
        self.root_content.insert((hash.to_string(), path.to_string()), text.to_string());
        self
    }

    pub fn tree(mut self, rev: &str, paths: &[&str]) -> Self {
        self.trees
            .insert(rev.to_string(), paths.iter().map(|p| p.to_string()).collect());
        self
    }

    /// Makes every diff/status/content query for (hash, path) fail.
    pub fn failing(mut self, hash: &str, path: &str) -> Self {
        self.failing.insert((hash.to_string(), path.to_string()));
        self
    }

    pub fn calls(&self, kind: &str) -> usize {
        self.calls.borrow().get(kind).copied().unwrap_or(0)
    }

    fn record(&self, kind: &'static str) {
        *self.calls.borrow_mut().entry(kind).or_insert(0) += 1;
    }

    fn check(&self, hash: &str, path: &str) -> Result<()> {
        if self.failing.contains(&(hash.to_string(), path.to_string())) {
            return Err(HistoryError::Git(format!("simulated failure for {hash}:{path}")));
        }
        Ok(())
    }
}

impl VcsBackend for FakeBackend {
    fn tracked_files(&self) -> Result<Vec<String>> {
        self.record("tracked_files");
        Ok(self.tracked.clone())
    }

    fn is_tracked(&self, path: &str) -> Result<bool> {
        self.record("is_tracked");
        Ok(self.tracked.iter().any(|p| p == path))
    }

    /// Filters are ignored; the scanner re-applies them itself.
    fn log(&self, path: &str, _filter: &LogFilter<'_>) -> Result<Vec<LogEntry>> {
        self.record("log");
        let hashes = self.logs.get(path).cloned().unwrap_or_default();
        Ok(hashes
            .iter()
            .filter_map(|h| self.commits.get(h))
            .map(|c| LogEntry {
                hash: c.hash.clone(),
                author: c.author.clone(),
                date: c.date.clone(),
                subject: c.message.lines().next().unwrap_or("").to_string(),
            })
            .collect())
    }

    fn diff(&self, _from: &str, to: &str, path: &str) -> Result<String> {
        self.record("diff");
        self.check(to, path)?;
        Ok(self
            .diffs
            .get(&(to.to_string(), path.to_string()))
            .cloned()
            .unwrap_or_default())
    }

    fn name_status(&self, _from: &str, to: &str, path: &str) -> Result<String> {
        self.record("name_status");
        self.check(to, path)?;
        Ok(self
            .statuses
            .get(&(to.to_string(), path.to_string()))
            .cloned()
            .unwrap_or_default())
    }

    fn show_root(&self, hash: &str, path: &str) -> Result<String> {
        self.record("show_root");
        self.check(hash, path)?;
        Ok(self
            .root_content
            .get(&(hash.to_string(), path.to_string()))
            .cloned()
            .unwrap_or_default())
    }

    fn commit(&self, hash: &str) -> Result<CommitObject> {
        self.record("commit");
        self.commits
            .get(hash)
            .cloned()
            .ok_or_else(|| HistoryError::Git(format!("unknown revision {hash}")))
    }

    fn tree_contains(&self, rev: &str, path: &str) -> Result<bool> {
        self.record("tree_contains");
        Ok(self.trees.get(rev).map_or(false, |t| t.contains(path)))
    }
}
