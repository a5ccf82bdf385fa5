use crate::types::{ChangeEvent, CommitRecord};

/// Lowercase substrings that mark a commit as undoing earlier work.
pub const REVERT_KEYWORDS: &[&str] = &["revert", "rollback", "undo", "откат", "отменить"];

/// True when the message contains any revert keyword, ignoring case.
pub fn is_revert_message(message: &str) -> bool {
    let lower = message.to_lowercase();
    REVERT_KEYWORDS.iter().any(|k| lower.contains(k))
}

/// Number of changes whose commit message reads like a revert.
pub fn count_reverts(changes: &[ChangeEvent]) -> usize {
    changes
        .iter()
        .filter(|c| is_revert_message(c.commit.message()))
        .count()
}

/// The subset of `commits` that look like reverts, in input order.
pub fn revert_commits(commits: &[CommitRecord]) -> Vec<&CommitRecord> {
    commits.iter().filter(|c| is_revert_message(c.message())).collect()
}
