use serde::Serialize;
use std::fmt;

use crate::error::{HistoryError, Result};
use crate::git::{parse_git_date, Timestamp};

// ─── Core Git Data ────────────────────────────────────────────────────────────

/// One commit as seen by the history pipeline. Immutable once built.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CommitRecord {
    hash: String,
    author: String,
    date: String,
    #[serde(skip)]
    timestamp: Option<Timestamp>,
    message: String,
    files: Vec<String>,
}

impl CommitRecord {
    /// Builds a record, parsing `date` once. Duplicate file paths are dropped.
    pub fn new(
        hash: impl Into<String>,
        author: impl Into<String>,
        date: impl Into<String>,
        message: impl Into<String>,
        files: Vec<String>,
    ) -> Self {
        let date = date.into();
        let timestamp = parse_git_date(&date).ok();
        let mut unique: Vec<String> = Vec::with_capacity(files.len());
        for f in files {
            if !unique.contains(&f) {
                unique.push(f);
            }
        }
        Self {
            hash: hash.into(),
            author: author.into(),
            date,
            timestamp,
            message: message.into(),
            files: unique,
        }
    }

    pub fn hash(&self) -> &str {
        &self.hash
    }

    pub fn author(&self) -> &str {
        &self.author
    }

    /// The date exactly as git printed it.
    pub fn date(&self) -> &str {
        &self.date
    }

    /// Parsed form of [`Self::date`]; `None` when it could not be parsed.
    pub fn timestamp(&self) -> Option<Timestamp> {
        self.timestamp
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn files(&self) -> &[String] {
        &self.files
    }

    pub fn touches(&self, path: &str) -> bool {
        self.files.iter().any(|f| f == path)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ChangeKind {
    Added,
    Modified,
    Deleted,
}

impl ChangeKind {
    /// Maps the leading letter of a `--name-status` line.
    /// Anything unrecognized is treated as a modification.
    pub fn from_git_status(status: &str) -> Self {
        let status = status.trim_start();
        if status.starts_with("??") || status.starts_with('A') {
            ChangeKind::Added
        } else if status.starts_with('D') {
            ChangeKind::Deleted
        } else {
            ChangeKind::Modified
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ChangeKind::Added => "added",
            ChangeKind::Modified => "modified",
            ChangeKind::Deleted => "deleted",
        }
    }
}

impl fmt::Display for ChangeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One observed (file, commit) touch.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChangeEvent {
    pub file_path: String,
    pub commit: CommitRecord,
    pub change_kind: ChangeKind,
    pub diff: Option<String>,
}

// ─── Tracker Outputs ──────────────────────────────────────────────────────────

/// Full history of one migration file.
///
/// `change_count == changes.len()` and `first_seen <= last_modified` hold for
/// every record built by the tracker.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HistoryRecord {
    pub file_path: String,
    #[serde(skip)]
    pub changes: Vec<ChangeEvent>,
    pub first_seen: Timestamp,
    pub last_modified: Timestamp,
    pub change_count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AggregateStatistics {
    pub total_migrations: usize,
    pub total_changes: usize,
    pub average_changes_per_migration: f64,
    pub most_changed_migrations: Vec<HistoryRecord>,
    pub problematic_patterns: Vec<String>,
}

// ─── Trend Outputs ────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FrequencyReport {
    pub migrations_per_week: f64,
    pub migrations_per_month: f64,
    /// At most three labels, busiest first.
    pub peak_periods: Vec<String>,
}

impl FrequencyReport {
    pub fn empty() -> Self {
        FrequencyReport {
            migrations_per_week: 0.0,
            migrations_per_month: 0.0,
            peak_periods: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DetectedPattern {
    pub pattern_type: String,
    pub description: String,
    pub frequency: usize,
    pub affected_tables: Vec<String>,
}

// ─── Commit Classifier ────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum OperationKind {
    Add,
    Drop,
    Alter,
    CreateIndex,
}

impl OperationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            OperationKind::Add => "add",
            OperationKind::Drop => "drop",
            OperationKind::Alter => "alter",
            OperationKind::CreateIndex => "create_index",
        }
    }
}

/// Everything the classifier reads out of one commit message.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct MessageSignals {
    pub is_migration: bool,
    pub is_revert: bool,
    pub tables: Vec<String>,
    pub operations: Vec<OperationKind>,
    pub migration_type: Option<OperationKind>,
}

/// Migration-relevant subset of [`MessageSignals`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct MigrationInfo {
    pub migration_type: Option<OperationKind>,
    pub tables: Vec<String>,
    pub operations: Vec<OperationKind>,
    pub is_revert: bool,
}

// ─── Queries ──────────────────────────────────────────────────────────────────

/// Filters for a per-file history query.
#[derive(Debug, Clone, Default)]
pub struct HistoryQuery {
    pub since: Option<Timestamp>,
    pub until: Option<Timestamp>,
    /// Case-insensitive substring of the author name.
    pub author: Option<String>,
    /// Negative values are rejected; `Some(0)` yields no commits.
    pub max_results: Option<i64>,
}

impl HistoryQuery {
    /// Rejects blank paths, `since > until` and negative limits.
    pub fn validate(&self, path: &str) -> Result<()> {
        if path.trim().is_empty() {
            return Err(HistoryError::invalid("file path cannot be empty"));
        }
        self.validate_filters()
    }

    /// The path-independent part of [`Self::validate`].
    pub fn validate_filters(&self) -> Result<()> {
        if let (Some(since), Some(until)) = (&self.since, &self.until) {
            if since.compare(until) == std::cmp::Ordering::Greater {
                return Err(HistoryError::invalid("since cannot be later than until"));
            }
        }
        if let Some(n) = self.max_results {
            if n < 0 {
                return Err(HistoryError::invalid("max_results cannot be negative"));
            }
        }
        Ok(())
    }
}

/// Result of a batch commit analysis.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CommitBatch {
    pub changes: Vec<ChangeEvent>,
    /// Hashes that could not be resolved.
    pub skipped: usize,
    /// Files whose diff or change kind fell back to a default.
    pub errors: usize,
}

// ─── Report ───────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize)]
pub struct ReportMeta {
    pub repo_path: String,
    pub analyzed_at: String,
    pub file_count: usize,
    pub filters: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct HistoryReport {
    pub meta: ReportMeta,
    pub statistics: AggregateStatistics,
    pub frequency: FrequencyReport,
    pub patterns: Vec<DetectedPattern>,
    pub hotspots: Vec<String>,
    pub recommendations: Vec<String>,
}
