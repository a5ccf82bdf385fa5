use tracing::{debug, warn};

use crate::error::Result;
use crate::git::log_parser::first_status_line;
use crate::git::{GitCli, Timestamp, VcsBackend};
use crate::scanner::RepositoryScanner;
use crate::store::HistoryStore;
use crate::types::{AggregateStatistics, ChangeEvent, ChangeKind, HistoryQuery, HistoryRecord};

/// Builds per-file [`HistoryRecord`]s from a scanner and keeps them in a
/// [`HistoryStore`].
pub struct ChangeTracker<B: VcsBackend = GitCli> {
    scanner: RepositoryScanner<B>,
    store: HistoryStore,
}

impl<B: VcsBackend> ChangeTracker<B> {
    pub fn new(scanner: RepositoryScanner<B>) -> Self {
        Self {
            scanner,
            store: HistoryStore::new(),
        }
    }

    pub fn scanner(&self) -> &RepositoryScanner<B> {
        &self.scanner
    }

    pub fn store(&self) -> &HistoryStore {
        &self.store
    }

    pub fn into_store(self) -> HistoryStore {
        self.store
    }

    /// Collects the history of `path`, stores it (replacing any earlier
    /// record for the same path) and returns a copy.
    ///
    /// A file with no matching commits gets a record with zero changes whose
    /// `first_seen` and `last_modified` are both the current local time.
    pub fn track_changes(&mut self, path: &str, query: &HistoryQuery) -> Result<HistoryRecord> {
        query.validate(path)?;

        let commits = self.scanner.get_file_history(path, query)?;
        if commits.is_empty() {
            debug!("No commits found for {path}");
        }

        let mut changes = Vec::with_capacity(commits.len());
        for commit in commits {
            let change_kind = self.determine_change_kind(commit.hash(), path);
            let diff = self.scanner.get_diff(commit.hash(), path);
            changes.push(ChangeEvent {
                file_path: path.to_string(),
                commit,
                change_kind,
                diff: Some(diff),
            });
        }

        let stamps: Vec<Timestamp> = changes.iter().filter_map(|c| c.commit.timestamp()).collect();
        if stamps.len() < changes.len() {
            warn!(
                "{} commit date(s) for {path} could not be parsed",
                changes.len() - stamps.len()
            );
        }
        // Same ordering as the timeline filter, so mixed offset-awareness
        // still yields first_seen <= last_modified.
        let (first_seen, last_modified) = match (
            stamps.iter().copied().min_by(Timestamp::compare),
            stamps.iter().copied().max_by(Timestamp::compare),
        ) {
            (Some(first), Some(last)) => (first, last),
            _ => {
                let now = Timestamp::now();
                (now, now)
            }
        };

        let record = HistoryRecord {
            file_path: path.to_string(),
            change_count: changes.len(),
            changes,
            first_seen,
            last_modified,
        };
        debug!("Tracked {} change(s) for {path}", record.change_count);

        self.store.insert(record.clone());
        Ok(record)
    }

    /// Classifies what commit `hash` did to `path`.
    ///
    /// Root commits add the file. Otherwise the `--name-status` letter against
    /// the first parent decides; when that output is empty, tree membership in
    /// parent and commit decides. Any failure falls back to `Modified`.
    pub fn determine_change_kind(&mut self, hash: &str, path: &str) -> ChangeKind {
        let Some(commit) = self.scanner.resolve_commit(hash) else {
            return ChangeKind::Modified;
        };
        let Some(parent) = commit.first_parent() else {
            return ChangeKind::Added;
        };

        let backend = self.scanner.backend();
        let status = match backend.name_status(parent, hash, path) {
            Ok(out) => out,
            Err(e) => {
                warn!("Error determining change type for {path} in {hash}: {e}");
                return ChangeKind::Modified;
            }
        };

        if let Some(line) = first_status_line(&status) {
            return ChangeKind::from_git_status(line);
        }

        let in_commit = backend.tree_contains(hash, path);
        let in_parent = backend.tree_contains(parent, path);
        match (in_commit, in_parent) {
            (Ok(true), Ok(false)) => ChangeKind::Added,
            (Ok(false), Ok(true)) => ChangeKind::Deleted,
            (Ok(_), Ok(_)) => ChangeKind::Modified,
            (Err(e), _) | (_, Err(e)) => {
                warn!("Error determining change type for {path} in {hash}: {e}");
                ChangeKind::Modified
            }
        }
    }

    pub fn calculate_statistics(&self) -> AggregateStatistics {
        self.store.calculate_statistics()
    }

    pub fn find_problematic_patterns(&self) -> Vec<String> {
        self.store.find_problematic_patterns()
    }

    pub fn generate_timeline(
        &self,
        start: Option<&Timestamp>,
        end: Option<&Timestamp>,
    ) -> Result<Vec<&HistoryRecord>> {
        self.store.generate_timeline(start, end)
    }
}
