use std::path::Path;

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::cache::{BoundedCache, CacheCounters, DEFAULT_CACHE_SIZE};
use crate::error::Result;
use crate::filters::{filter_migration_files, PathMatcher};
use crate::git::{parse_git_date, CommitObject, GitCli, LogFilter, VcsBackend};
use crate::types::{ChangeEvent, ChangeKind, CommitBatch, CommitRecord, HistoryQuery};

/// Snapshot of the three scanner caches.
#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct CacheStats {
    pub commits: CacheCounters,
    pub migration_patterns: CacheCounters,
    pub diffs: CacheCounters,
}

/// Reads migration history out of a repository through a [`VcsBackend`].
///
/// Owns three independent LRU caches: resolved commits by hash (including
/// failed lookups), migration-pattern verdicts by path, and diffs by
/// (hash, path).
pub struct RepositoryScanner<B: VcsBackend = GitCli> {
    backend: B,
    matcher: PathMatcher,
    commit_cache: BoundedCache<String, Option<CommitObject>>,
    pattern_cache: BoundedCache<String, bool>,
    diff_cache: BoundedCache<(String, String), String>,
}

impl RepositoryScanner<GitCli> {
    /// Opens the git repository at `repo_path` with default caches.
    pub fn open(repo_path: impl AsRef<Path>) -> Result<Self> {
        Self::open_with_cache_size(repo_path, DEFAULT_CACHE_SIZE)
    }

    pub fn open_with_cache_size(repo_path: impl AsRef<Path>, max_cache_size: usize) -> Result<Self> {
        Ok(Self::with_backend(GitCli::open(repo_path)?, max_cache_size))
    }

    pub fn repo_path(&self) -> &Path {
        self.backend.repo_path()
    }
}

impl<B: VcsBackend> RepositoryScanner<B> {
    pub fn with_backend(backend: B, max_cache_size: usize) -> Self {
        Self {
            backend,
            matcher: PathMatcher::default_patterns(),
            commit_cache: BoundedCache::new(max_cache_size),
            pattern_cache: BoundedCache::new(max_cache_size),
            diff_cache: BoundedCache::new(max_cache_size),
        }
    }

    /// Replaces the patterns used to decide whether a path is a migration.
    pub fn with_matcher(mut self, matcher: PathMatcher) -> Self {
        self.matcher = matcher;
        self.pattern_cache.clear();
        self
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn matcher(&self) -> &PathMatcher {
        &self.matcher
    }

    /// Tracked paths matching any of `patterns` (the scanner's own patterns
    /// when `None`), sorted and duplicate-free.
    ///
    /// An explicitly empty pattern list is an `InvalidArgument`. A failing
    /// `ls-files` is logged and yields an empty list.
    pub fn find_migration_files(&self, patterns: Option<&[String]>) -> Result<Vec<String>> {
        let custom;
        let matcher = match patterns {
            Some(list) => {
                custom = PathMatcher::new(list)?;
                &custom
            }
            None => &self.matcher,
        };

        match self.backend.tracked_files() {
            Ok(files) => Ok(filter_migration_files(&files, matcher)),
            Err(e) => {
                tracing::error!("Error searching for migration files: {e}");
                Ok(Vec::new())
            }
        }
    }

    /// Commits touching `path`, most recent first.
    ///
    /// Filters are forwarded to the backend and re-applied here against the
    /// author date, so every backend yields the same result. Untracked paths
    /// and failing queries yield an empty list.
    pub fn get_file_history(&mut self, path: &str, query: &HistoryQuery) -> Result<Vec<CommitRecord>> {
        query.validate(path)?;

        let limit = query.max_results.map(|n| n as usize);
        if limit == Some(0) {
            return Ok(Vec::new());
        }

        match self.backend.is_tracked(path) {
            Ok(true) => {}
            Ok(false) => {
                warn!("File {path} not found in repository");
                return Ok(Vec::new());
            }
            Err(e) => {
                warn!("File {path} not found in repository: {e}");
                return Ok(Vec::new());
            }
        }

        let filter = LogFilter {
            since: query.since.as_ref(),
            until: query.until.as_ref(),
            author: query.author.as_deref(),
        };
        let entries = match self.backend.log(path, &filter) {
            Ok(entries) => entries,
            Err(e) => {
                warn!("Error getting file history {path}: {e}");
                return Ok(Vec::new());
            }
        };
        if entries.is_empty() {
            debug!("File history {path} is empty");
            return Ok(Vec::new());
        }

        let author_needle = query.author.as_ref().map(|a| a.to_lowercase());
        let mut commits = Vec::new();

        for entry in entries {
            if let Some(needle) = &author_needle {
                if !entry.author.to_lowercase().contains(needle.as_str()) {
                    continue;
                }
            }

            if let Ok(ts) = parse_git_date(&entry.date) {
                if query.since.is_some_and(|since| ts.compare(&since).is_lt()) {
                    continue;
                }
                if query.until.is_some_and(|until| ts.compare(&until).is_gt()) {
                    continue;
                }
            }

            let files = match self.resolve_commit(&entry.hash) {
                Some(obj) => obj.files,
                None => vec![path.to_string()],
            };
            commits.push(CommitRecord::new(entry.hash, entry.author, entry.date, entry.subject, files));

            if limit.is_some_and(|l| commits.len() >= l) {
                break;
            }
        }

        Ok(commits)
    }

    /// Diff of `path` in commit `hash` against its first parent, or the full
    /// file content for a root commit.
    ///
    /// Any failure is logged and cached as an empty string.
    pub fn get_diff(&mut self, hash: &str, path: &str) -> String {
        let key = (hash.to_string(), path.to_string());
        if let Some(diff) = self.diff_cache.get(&key) {
            return diff.clone();
        }

        let diff = match self.resolve_commit(hash) {
            None => String::new(),
            Some(commit) => {
                let result = match commit.first_parent() {
                    Some(parent) => self.backend.diff(parent, hash, path),
                    None => self.backend.show_root(hash, path),
                };
                result.unwrap_or_else(|e| {
                    warn!("Error getting diff for {path} in {hash}: {e}");
                    String::new()
                })
            }
        };

        self.diff_cache.put(key, diff.clone());
        diff
    }

    /// Change events for migration files touched by `hashes`.
    ///
    /// Unresolvable hashes are skipped and counted. Change kind here is the
    /// coarse default: root commit or empty diff against the first parent is
    /// `Added`, a non-empty diff is `Modified`, and a failing diff query falls
    /// back to `Modified` with no diff.
    pub fn analyze_commits(&mut self, hashes: &[String]) -> CommitBatch {
        let mut batch = CommitBatch::default();

        for hash in hashes {
            let Some(commit) = self.resolve_commit(hash) else {
                batch.skipped += 1;
                debug!("Skipped commit {hash}: failed to get");
                continue;
            };

            let record = CommitRecord::new(
                hash.as_str(),
                commit.author.as_str(),
                commit.date.as_str(),
                commit.message.as_str(),
                commit.files.clone(),
            );

            for file_path in record.files() {
                if !self.is_migration_file(file_path) {
                    continue;
                }

                let result = match commit.first_parent() {
                    Some(parent) => self
                        .backend
                        .diff(parent, hash, file_path)
                        .map(|d| (if d.is_empty() { ChangeKind::Added } else { ChangeKind::Modified }, d)),
                    None => self
                        .backend
                        .show_root(hash, file_path)
                        .map(|d| (ChangeKind::Added, d)),
                };

                let (change_kind, diff) = match result {
                    Ok((kind, diff)) => (kind, Some(diff)),
                    Err(e) => {
                        batch.errors += 1;
                        debug!("Error determining change type for {file_path} in {hash}: {e}");
                        (ChangeKind::Modified, None)
                    }
                };

                batch.changes.push(ChangeEvent {
                    file_path: file_path.clone(),
                    commit: record.clone(),
                    change_kind,
                    diff,
                });
            }
        }

        if batch.skipped > 0 {
            info!("Skipped commits: {}", batch.skipped);
        }
        if batch.errors > 0 {
            warn!("Errors analyzing commits: {}", batch.errors);
        }
        batch
    }

    /// Empties all three caches.
    pub fn clear_cache(&mut self) {
        self.commit_cache.clear();
        self.pattern_cache.clear();
        self.diff_cache.clear();
        debug!("Caches cleared");
    }

    pub fn cache_stats(&self) -> CacheStats {
        CacheStats {
            commits: self.commit_cache.counters(),
            migration_patterns: self.pattern_cache.counters(),
            diffs: self.diff_cache.counters(),
        }
    }

    /// Resolves `hash` through the commit cache. Failures are cached as `None`.
    pub fn resolve_commit(&mut self, hash: &str) -> Option<CommitObject> {
        if let Some(cached) = self.commit_cache.get(hash) {
            return cached.clone();
        }
        let resolved = match self.backend.commit(hash) {
            Ok(commit) => Some(commit),
            Err(e) => {
                debug!("Failed to get commit {hash}: {e}");
                None
            }
        };
        self.commit_cache.put(hash.to_string(), resolved.clone());
        resolved
    }

    /// Whether `path` matches the scanner's migration patterns (cached).
    pub fn is_migration_file(&mut self, path: &str) -> bool {
        let matcher = &self.matcher;
        self.pattern_cache
            .get_or_insert_with(&path.to_string(), || matcher.matches(path))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::HistoryError;
    use crate::git::fake::FakeBackend;

    const MIG: &str = "app/migrations/0001_init.py";

    fn backend() -> FakeBackend {
        FakeBackend::new()
            .track(&[MIG, "app/models.py", "alembic/versions/abc_add_users.py", "README.md"])
            .commit("c1", "2024-01-01 10:00:00 +0000", "Initial migration", &[], &[MIG, "app/models.py"])
            .commit("c2", "2024-01-08 10:00:00 +0000", "Alter table users", &["c1"], &[MIG])
            .commit("c3", "2024-02-01 10:00:00 +0000", "Revert users change", &["c2"], &[MIG])
            .author("c2", "Alice Smith")
            .root_content("c1", MIG, "CREATE TABLE users (id int);")
            .diff("c2", MIG, "+ALTER TABLE users ADD COLUMN email text;")
    }

    fn scanner(b: FakeBackend) -> RepositoryScanner<FakeBackend> {
        RepositoryScanner::with_backend(b, 16)
    }

    #[test]
    fn test_find_migration_files_default_patterns() {
        let s = scanner(backend());
        let files = s.find_migration_files(None).unwrap();
        assert_eq!(files, vec!["alembic/versions/abc_add_users.py", MIG]);
        assert_eq!(files, s.find_migration_files(None).unwrap(), "must be deterministic");
    }

    #[test]
    fn test_find_migration_files_custom_and_empty_patterns() {
        let s = scanner(backend());
        let custom = vec!["*.md".to_string()];
        assert_eq!(s.find_migration_files(Some(&custom)).unwrap(), vec!["README.md"]);

        let empty: Vec<String> = Vec::new();
        assert!(matches!(
            s.find_migration_files(Some(&empty)),
            Err(HistoryError::InvalidArgument(_))
        ));
    }

    #[test]
    fn test_get_file_history_most_recent_first_with_files() {
        let mut s = scanner(backend());
        let commits = s.get_file_history(MIG, &HistoryQuery::default()).unwrap();
        let hashes: Vec<&str> = commits.iter().map(|c| c.hash()).collect();
        assert_eq!(hashes, vec!["c3", "c2", "c1"]);
        assert_eq!(commits[2].files(), &[MIG.to_string(), "app/models.py".to_string()]);
    }

    #[test]
    fn test_get_file_history_validates_before_querying() {
        let mut s = scanner(backend());
        let negative = HistoryQuery { max_results: Some(-1), ..Default::default() };
        assert!(s.get_file_history(MIG, &negative).is_err());
        assert!(s.get_file_history("", &HistoryQuery::default()).is_err());
        assert_eq!(s.backend().calls("log"), 0);
    }

    #[test]
    fn test_get_file_history_untracked_path_is_empty() {
        let mut s = scanner(backend());
        let commits = s.get_file_history("nope/migrations/9.py", &HistoryQuery::default()).unwrap();
        assert!(commits.is_empty());
    }

    #[test]
    fn test_get_file_history_post_filters() {
        let mut s = scanner(backend());

        let by_author = HistoryQuery { author: Some("alice".to_string()), ..Default::default() };
        let commits = s.get_file_history(MIG, &by_author).unwrap();
        assert_eq!(commits.len(), 1);
        assert_eq!(commits[0].hash(), "c2");

        let since = HistoryQuery {
            since: Some(parse_git_date("2024-01-05").unwrap()),
            ..Default::default()
        };
        assert_eq!(s.get_file_history(MIG, &since).unwrap().len(), 2);

        let limited = HistoryQuery { max_results: Some(1), ..Default::default() };
        let commits = s.get_file_history(MIG, &limited).unwrap();
        assert_eq!(commits.len(), 1);
        assert_eq!(commits[0].hash(), "c3");

        let zero = HistoryQuery { max_results: Some(0), ..Default::default() };
        assert!(s.get_file_history(MIG, &zero).unwrap().is_empty());
    }

    #[test]
    fn test_get_diff_root_and_parent_and_cache() {
        let mut s = scanner(backend());
        assert_eq!(s.get_diff("c1", MIG), "CREATE TABLE users (id int);");
        assert!(s.get_diff("c2", MIG).contains("ADD COLUMN email"));
        let before = s.backend().calls("diff");
        s.get_diff("c2", MIG);
        assert_eq!(s.backend().calls("diff"), before, "second lookup must hit the cache");
    }

    #[test]
    fn test_get_diff_failure_degrades_to_empty_and_is_cached() {
        let mut s = scanner(backend().failing("c2", MIG));
        assert_eq!(s.get_diff("c2", MIG), "");
        assert_eq!(s.get_diff("c2", MIG), "");
        assert_eq!(s.backend().calls("diff"), 1);

        assert_eq!(s.get_diff("missing", MIG), "");
        assert_eq!(s.cache_stats().diffs.len, 2);
    }

    #[test]
    fn test_analyze_commits_skips_unknown_and_filters_migrations() {
        let mut s = scanner(backend().failing("c3", MIG));
        let hashes: Vec<String> = ["c1", "bogus", "c2", "c3"].iter().map(|h| h.to_string()).collect();
        let batch = s.analyze_commits(&hashes);

        assert_eq!(batch.skipped, 1);
        assert_eq!(batch.errors, 1);
        assert!(batch.changes.iter().all(|c| c.file_path == MIG), "models.py is not a migration");
        let kinds: Vec<ChangeKind> = batch.changes.iter().map(|c| c.change_kind).collect();
        assert_eq!(kinds, vec![ChangeKind::Added, ChangeKind::Modified, ChangeKind::Modified]);
        assert_eq!(batch.changes[2].diff, None);
    }

    #[test]
    fn test_analyze_commits_empty_diff_means_added() {
        let b = backend().commit("c4", "2024-03-01 10:00:00 +0000", "new", &["c3"], &["x/migrations/0002.py"]);
        let mut s = scanner(b);
        let batch = s.analyze_commits(&["c4".to_string()]);
        assert_eq!(batch.changes.len(), 1);
        assert_eq!(batch.changes[0].change_kind, ChangeKind::Added);
    }

    #[test]
    fn test_failed_commit_lookup_is_cached() {
        let mut s = scanner(backend());
        assert!(s.resolve_commit("bogus").is_none());
        assert!(s.resolve_commit("bogus").is_none());
        assert_eq!(s.backend().calls("commit"), 1);
    }

    #[test]
    fn test_caches_stay_bounded() {
        let mut s = RepositoryScanner::with_backend(backend(), 2);
        for i in 0..10 {
            s.is_migration_file(&format!("x/migrations/{i}.py"));
            s.resolve_commit(&format!("h{i}"));
            s.get_diff(&format!("h{i}"), MIG);
        }
        let stats = s.cache_stats();
        assert_eq!(stats.commits.len, 2);
        assert_eq!(stats.migration_patterns.len, 2);
        assert_eq!(stats.diffs.len, 2);
    }

    #[test]
    fn test_clear_cache_empties_everything() {
        let mut s = scanner(backend());
        s.resolve_commit("c1");
        s.get_diff("c1", MIG);
        s.is_migration_file(MIG);
        s.clear_cache();
        let stats = s.cache_stats();
        assert_eq!(stats.commits.len + stats.migration_patterns.len + stats.diffs.len, 0);
    }
}
