use once_cell::sync::Lazy;
use regex::Regex;

use super::revert_tracker::{is_revert_message, revert_commits};
use crate::error::{HistoryError, Result};
use crate::types::{CommitRecord, MessageSignals, MigrationInfo, OperationKind};

pub const MIGRATION_KEYWORDS: &[&str] = &["migration", "миграция", "migrate"];

static TABLE_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\b(?:table|таблица)[\s:]+(\w+)").unwrap());

// Checked in order; the first kind present wins as `migration_type`.
static OPERATION_PATTERNS: Lazy<Vec<(Regex, OperationKind)>> = Lazy::new(|| {
    vec![
        (
            Regex::new(r"(?i)\b(?:add|добавить|create|создать)\s+(?:column|колонк|index|индекс)").unwrap(),
            OperationKind::Add,
        ),
        (
            Regex::new(r"(?i)\b(?:drop|удалить|delete)\s+(?:column|колонк|index|индекс|table|таблиц)").unwrap(),
            OperationKind::Drop,
        ),
        (
            Regex::new(r"(?i)\b(?:alter|изменить|modify|change)\s+(?:column|колонк|table|таблиц)").unwrap(),
            OperationKind::Alter,
        ),
        (
            Regex::new(r"(?i)\b(?:create|создать)\s+(?:index|индекс)").unwrap(),
            OperationKind::CreateIndex,
        ),
    ]
});

/// Reads migration intent, revert intent, named tables and operation kinds
/// out of a commit message. An empty message yields empty signals.
pub fn classify_message(message: &str) -> MessageSignals {
    if message.is_empty() {
        return MessageSignals::default();
    }

    let lower = message.to_lowercase();
    let is_migration = MIGRATION_KEYWORDS.iter().any(|k| lower.contains(k));

    let mut tables: Vec<String> = Vec::new();
    for caps in TABLE_PATTERN.captures_iter(message) {
        let name = caps[1].to_string();
        if !tables.contains(&name) {
            tables.push(name);
        }
    }

    let operations: Vec<OperationKind> = OPERATION_PATTERNS
        .iter()
        .filter(|(re, _)| re.is_match(message))
        .map(|(_, kind)| *kind)
        .collect();

    MessageSignals {
        is_migration,
        is_revert: is_revert_message(message),
        tables,
        migration_type: operations.first().copied(),
        operations,
    }
}

/// Like [`classify_message`], but an empty message is an `InvalidArgument`.
pub fn analyze_commit_message(message: &str) -> Result<MessageSignals> {
    if message.is_empty() {
        return Err(HistoryError::invalid("message cannot be empty"));
    }
    Ok(classify_message(message))
}

pub fn extract_migration_info(commit: &CommitRecord) -> MigrationInfo {
    let signals = classify_message(commit.message());
    MigrationInfo {
        migration_type: signals.migration_type,
        tables: signals.tables,
        operations: signals.operations,
        is_revert: signals.is_revert,
    }
}

/// Commits whose message reads like a revert, in input order.
pub fn detect_revert_commits(commits: &[CommitRecord]) -> Vec<&CommitRecord> {
    revert_commits(commits)
}

/// Commits other than `commit` that touch at least one of its files.
pub fn find_related_commits<'a>(commit: &CommitRecord, all_commits: &'a [CommitRecord]) -> Vec<&'a CommitRecord> {
    all_commits
        .iter()
        .filter(|other| other.hash() != commit.hash())
        .filter(|other| other.files().iter().any(|f| commit.touches(f)))
        .collect()
}
