use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::{BTreeSet, HashMap};

use crate::types::{ChangeEvent, HistoryRecord};

// Each matcher captures the table name in group 1.
static TABLE_PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    [
        r"(?i)\b(?:table|таблица|table_name)[\s:]+(?:if\s+(?:not\s+)?exists\s+)?(\w+)",
        r"(?i)(?:create|alter|drop)\s+table\s+(?:if\s+(?:not\s+)?exists\s+)?(\w+)",
        r"(?i)from\s+(\w+)\s+(?:where|join|group|order)",
        r"(?i)into\s+(\w+)\s*(?:\(|values)",
        r"(?i)update\s+(\w+)\s+set",
        r"(?i)delete\s+from\s+(\w+)",
    ]
    .iter()
    .map(|p| Regex::new(p).unwrap())
    .collect()
});

/// Lowercased table names referenced in `text`. Single-character names are ignored.
pub fn extract_tables(text: &str) -> BTreeSet<String> {
    let lower = text.to_lowercase();
    let mut found = BTreeSet::new();
    for pattern in TABLE_PATTERNS.iter() {
        for caps in pattern.captures_iter(&lower) {
            if let Some(name) = caps.get(1) {
                if name.as_str().chars().count() > 1 {
                    found.insert(name.as_str().to_string());
                }
            }
        }
    }
    found
}

/// Tables referenced by one change, from its commit message and diff.
pub fn tables_in_change(change: &ChangeEvent) -> BTreeSet<String> {
    let mut tables = extract_tables(change.commit.message());
    if let Some(diff) = change.diff.as_deref().filter(|d| !d.is_empty()) {
        tables.extend(extract_tables(diff));
    }
    tables
}

/// Number of changes referencing each table across `records`, busiest first
/// and then by name. A change counts at most once per table.
pub fn rank_table_changes(records: &[HistoryRecord]) -> Vec<(String, usize)> {
    let mut counts: HashMap<String, usize> = HashMap::new();
    for change in records.iter().flat_map(|r| r.changes.iter()) {
        for table in tables_in_change(change) {
            *counts.entry(table).or_insert(0) += 1;
        }
    }

    let mut ranked: Vec<(String, usize)> = counts.into_iter().collect();
    ranked.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    ranked
}
