use std::collections::HashMap;

use tracing::debug;

use crate::analyzers::revert_tracker::count_reverts;
use crate::error::{HistoryError, Result};
use crate::git::Timestamp;
use crate::types::{AggregateStatistics, HistoryRecord};

/// A migration changed more often than this is reported as problematic.
pub const MAX_CHANGES_THRESHOLD: usize = 5;

const MOST_CHANGED_LIMIT: usize = 10;

/// Caller-owned map of file path → [`HistoryRecord`].
///
/// Iteration follows first-insertion order. Inserting a record for a path
/// that is already present replaces it in place.
#[derive(Debug, Clone, Default)]
pub struct HistoryStore {
    records: Vec<HistoryRecord>,
    index: HashMap<String, usize>,
}

impl HistoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores `record`, replacing any previous record for the same path.
    pub fn insert(&mut self, record: HistoryRecord) {
        match self.index.get(&record.file_path) {
            Some(&i) => self.records[i] = record,
            None => {
                self.index.insert(record.file_path.clone(), self.records.len());
                self.records.push(record);
            }
        }
    }

    pub fn get(&self, path: &str) -> Option<&HistoryRecord> {
        self.index.get(path).map(|&i| &self.records[i])
    }

    pub fn records(&self) -> &[HistoryRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Totals, mean changes per file, the ten most-changed records and the
    /// problematic-pattern messages. Ties keep insertion order.
    pub fn calculate_statistics(&self) -> AggregateStatistics {
        let total_migrations = self.records.len();
        let total_changes: usize = self.records.iter().map(|r| r.change_count).sum();
        let average_changes_per_migration = if total_migrations > 0 {
            total_changes as f64 / total_migrations as f64
        } else {
            0.0
        };

        let mut most_changed: Vec<&HistoryRecord> = self.records.iter().collect();
        most_changed.sort_by(|a, b| b.change_count.cmp(&a.change_count));
        let most_changed_migrations = most_changed
            .into_iter()
            .take(MOST_CHANGED_LIMIT)
            .cloned()
            .collect();

        AggregateStatistics {
            total_migrations,
            total_changes,
            average_changes_per_migration,
            most_changed_migrations,
            problematic_patterns: self.find_problematic_patterns(),
        }
    }

    /// One message per record changed more than [`MAX_CHANGES_THRESHOLD`]
    /// times, followed by one message per record touched by revert commits.
    pub fn find_problematic_patterns(&self) -> Vec<String> {
        let mut patterns: Vec<String> = self
            .records
            .iter()
            .filter(|r| r.change_count > MAX_CHANGES_THRESHOLD)
            .map(|r| format!("Migration {} was changed {} times", r.file_path, r.change_count))
            .collect();

        for record in &self.records {
            let reverts = count_reverts(&record.changes);
            if reverts > 0 {
                patterns.push(format!("Migration {} has {} rollback(s)", record.file_path, reverts));
            }
        }

        patterns
    }

    /// Records active inside `[start, end]`, most recently modified first.
    ///
    /// A record is kept when `last_modified >= start` and `first_seen <= end`.
    /// Boundaries and record timestamps may freely mix offset-aware and naive
    /// values; see [`Timestamp::compare`].
    pub fn generate_timeline(
        &self,
        start: Option<&Timestamp>,
        end: Option<&Timestamp>,
    ) -> Result<Vec<&HistoryRecord>> {
        if let (Some(s), Some(e)) = (start, end) {
            if s.compare(e).is_gt() {
                return Err(HistoryError::invalid("start_date cannot be later than end_date"));
            }
        }

        if self.records.is_empty() {
            debug!("No history records for timeline generation");
            return Ok(Vec::new());
        }

        let mut timeline: Vec<&HistoryRecord> = self
            .records
            .iter()
            .filter(|r| start.map_or(true, |s| !r.last_modified.compare(s).is_lt()))
            .filter(|r| end.map_or(true, |e| !r.first_seen.compare(e).is_gt()))
            .collect();

        timeline.sort_by(|a, b| b.last_modified.instant().cmp(&a.last_modified.instant()));

        if timeline.is_empty() {
            debug!("No records matching specified date filters");
        }
        Ok(timeline)
    }
}
