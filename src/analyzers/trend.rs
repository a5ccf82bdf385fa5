use chrono::{Datelike, Duration, NaiveDate};
use std::collections::HashMap;
use tracing::debug;

use super::tables::rank_table_changes;
use crate::git::Timestamp;
use crate::store::{HistoryStore, MAX_CHANGES_THRESHOLD};
use crate::types::{DetectedPattern, FrequencyReport};

/// A table must be referenced by more changes than this to form a pattern.
pub const MIN_TABLE_CHANGES_FOR_PATTERN: usize = 3;
/// A table must be referenced by more changes than this to be a hotspot.
pub const MIN_HOTSPOT_CHANGES: usize = 2;
/// Weekly migration rate above which batching is recommended.
pub const HIGH_FREQUENCY_THRESHOLD: f64 = 10.0;

const TOP_TABLES: usize = 10;
const TOP_PEAK_WEEKS: usize = 3;
const HOTSPOTS_IN_RECOMMENDATION: usize = 5;

// ─── Frequency ────────────────────────────────────────────────────────────────

/// Migration rate per week and per month, plus the busiest calendar weeks.
///
/// Only parseable change timestamps count. Spans shorter than a day report
/// the raw count as both rates and label the earliest day as the only peak.
pub fn calculate_frequency(store: &HistoryStore) -> FrequencyReport {
    let changes = store.records().iter().flat_map(|r| r.changes.iter());
    let mut stamps: Vec<Timestamp> = Vec::new();
    for change in changes {
        match change.commit.timestamp() {
            Some(ts) => stamps.push(ts),
            None => debug!("Failed to parse date: {}", change.commit.date()),
        }
    }

    let (Some(min), Some(max)) = (
        stamps.iter().copied().min_by_key(Timestamp::instant),
        stamps.iter().copied().max_by_key(Timestamp::instant),
    ) else {
        debug!("No dates found in migration history");
        return FrequencyReport::empty();
    };

    let count = stamps.len();
    let span = max.instant() - min.instant();
    if span < Duration::days(1) {
        debug!("All migrations fall within one day");
        return FrequencyReport {
            migrations_per_week: count as f64,
            migrations_per_month: count as f64,
            peak_periods: vec![format!("{} ({} migrations)", min.date().format("%Y-%m-%d"), count)],
        };
    }

    let days = span.num_days() as f64;
    let weeks = (days / 7.0).max(1.0);
    let months = (days / 30.0).max(1.0);

    FrequencyReport {
        migrations_per_week: count as f64 / weeks,
        migrations_per_month: count as f64 / months,
        peak_periods: peak_weeks(&stamps),
    }
}

/// Top weeks by change count, earlier weeks first on ties.
fn peak_weeks(stamps: &[Timestamp]) -> Vec<String> {
    let mut weekly: HashMap<NaiveDate, usize> = HashMap::new();
    for ts in stamps {
        *weekly.entry(week_start(ts.date())).or_insert(0) += 1;
    }

    let mut ranked: Vec<(NaiveDate, usize)> = weekly.into_iter().collect();
    ranked.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    ranked
        .into_iter()
        .take(TOP_PEAK_WEEKS)
        .map(|(week, n)| format!("{} ({} migrations)", week.format("%Y-%m-%d"), n))
        .collect()
}

fn week_start(date: NaiveDate) -> NaiveDate {
    date - Duration::days(date.weekday().num_days_from_monday() as i64)
}

// ─── Tables ───────────────────────────────────────────────────────────────────

/// One `frequently_changed_table` pattern for each of the ten busiest tables
/// referenced by more than [`MIN_TABLE_CHANGES_FOR_PATTERN`] changes.
pub fn detect_patterns(store: &HistoryStore) -> Vec<DetectedPattern> {
    if store.is_empty() {
        debug!("Migration history is empty, no patterns found");
        return Vec::new();
    }

    rank_table_changes(store.records())
        .into_iter()
        .take(TOP_TABLES)
        .filter(|(_, count)| *count > MIN_TABLE_CHANGES_FOR_PATTERN)
        .map(|(table, count)| DetectedPattern {
            pattern_type: "frequently_changed_table".to_string(),
            description: format!("Table {table} was changed {count} times"),
            frequency: count,
            affected_tables: vec![table],
        })
        .collect()
}

/// Up to ten table names referenced by more than [`MIN_HOTSPOT_CHANGES`]
/// changes, most frequent first.
pub fn identify_hotspots(store: &HistoryStore) -> Vec<String> {
    if store.is_empty() {
        debug!("Migration history is empty, no hotspots found");
        return Vec::new();
    }

    rank_table_changes(store.records())
        .into_iter()
        .take(TOP_TABLES)
        .filter(|(_, count)| *count > MIN_HOTSPOT_CHANGES)
        .map(|(table, _)| table)
        .collect()
}

// ─── Recommendations ──────────────────────────────────────────────────────────

pub fn generate_recommendations(store: &HistoryStore) -> Vec<String> {
    let mut recs = Vec::new();
    let stats = store.calculate_statistics();

    if let Some(top) = stats.most_changed_migrations.first() {
        if top.change_count > MAX_CHANGES_THRESHOLD {
            recs.push(format!(
                "Migration {} was changed {} times. Consider refactoring.",
                top.file_path, top.change_count
            ));
        }
    }

    if !stats.problematic_patterns.is_empty() {
        recs.push(format!(
            "Found {} problematic patterns. Migration review recommended.",
            stats.problematic_patterns.len()
        ));
    }

    let hotspots = identify_hotspots(store);
    if !hotspots.is_empty() {
        let top: Vec<&str> = hotspots
            .iter()
            .take(HOTSPOTS_IN_RECOMMENDATION)
            .map(String::as_str)
            .collect();
        recs.push(format!(
            "Hotspots detected: {}. Consider optimizing the structure of these tables.",
            top.join(", ")
        ));
    }

    let frequency = calculate_frequency(store);
    if frequency.migrations_per_week > HIGH_FREQUENCY_THRESHOLD {
        recs.push(format!(
            "High migration frequency: {:.1} per week. Consider batching changes.",
            frequency.migrations_per_week
        ));
    }

    recs
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::tests::record_with;

    fn store_of(records: Vec<crate::types::HistoryRecord>) -> HistoryStore {
        let mut store = HistoryStore::new();
        for r in records {
            store.insert(r);
        }
        store
    }

    #[test]
    fn test_frequency_empty_store() {
        assert_eq!(calculate_frequency(&HistoryStore::new()), FrequencyReport::empty());
    }

    #[test]
    fn test_frequency_single_timestamp() {
        let store = store_of(vec![record_with("a.py", &[("2024-03-05T10:00:00+00:00", "x")])]);
        let f = calculate_frequency(&store);
        assert_eq!(f.migrations_per_week, 1.0);
        assert_eq!(f.migrations_per_month, 1.0);
        assert_eq!(f.peak_periods, vec!["2024-03-05 (1 migrations)"]);
    }

    #[test]
    fn test_frequency_same_day() {
        let day: Vec<(&str, &str)> = vec![
            ("2024-03-05T08:00:00+00:00", "a"),
            ("2024-03-05T09:00:00+00:00", "b"),
            ("2024-03-05T10:00:00+00:00", "c"),
            ("2024-03-05T11:00:00+00:00", "d"),
            ("2024-03-05T12:00:00+00:00", "e"),
        ];
        let store = store_of(vec![record_with("a.py", &day)]);
        let f = calculate_frequency(&store);
        assert_eq!(f.migrations_per_week, 5.0);
        assert_eq!(f.migrations_per_month, 5.0);
        assert_eq!(f.peak_periods.len(), 1);
    }

    #[test]
    fn test_frequency_skips_unparseable_dates() {
        let store = store_of(vec![record_with(
            "a.py",
            &[
                ("2024-03-05T08:00:00+00:00", "a"),
                ("garbage", "b"),
                ("2024-03-05T18:00:00+00:00", "c"),
            ],
        )]);
        let f = calculate_frequency(&store);
        assert_eq!(f.migrations_per_week, 2.0);
        assert_eq!(f.migrations_per_month, 2.0);
        assert_eq!(f.peak_periods, vec!["2024-03-05 (2 migrations)"]);

        let unparseable = store_of(vec![record_with("b.py", &[("garbage", "x"), ("nope", "y")])]);
        assert_eq!(calculate_frequency(&unparseable), FrequencyReport::empty());
    }

    #[test]
    fn test_frequency_over_weeks() {
        // Mondays 2024-01-01 and 2024-01-15; span 28 days
        let store = store_of(vec![record_with(
            "a.py",
            &[
                ("2024-01-01T10:00:00+00:00", "a"),
                ("2024-01-02T10:00:00+00:00", "b"),
                ("2024-01-03T10:00:00+00:00", "c"),
                ("2024-01-16T10:00:00+00:00", "d"),
                ("2024-01-29T10:00:00+00:00", "e"),
            ],
        )]);
        let f = calculate_frequency(&store);
        assert!((f.migrations_per_week - 5.0 / 4.0).abs() < 1e-9);
        assert_eq!(f.migrations_per_month, 5.0);
        assert_eq!(
            f.peak_periods,
            vec!["2024-01-01 (3 migrations)", "2024-01-15 (1 migrations)", "2024-01-29 (1 migrations)"]
        );
    }

    #[test]
    fn test_patterns_and_hotspots_thresholds() {
        let orders: Vec<(&str, &str)> = vec![
            ("2024-01-01T00:00:00Z", "alter table orders"),
            ("2024-01-02T00:00:00Z", "alter table orders"),
            ("2024-01-03T00:00:00Z", "alter table orders"),
            ("2024-01-04T00:00:00Z", "alter table orders"),
            ("2024-01-05T00:00:00Z", "alter table users"),
            ("2024-01-06T00:00:00Z", "alter table users"),
            ("2024-01-07T00:00:00Z", "alter table users"),
            ("2024-01-08T00:00:00Z", "alter table tags"),
        ];
        let store = store_of(vec![record_with("db/0001.py", &orders)]);

        let patterns = detect_patterns(&store);
        assert_eq!(patterns.len(), 1);
        assert_eq!(patterns[0].pattern_type, "frequently_changed_table");
        assert_eq!(patterns[0].description, "Table orders was changed 4 times");
        assert_eq!(patterns[0].affected_tables, vec!["orders"]);

        assert_eq!(identify_hotspots(&store), vec!["orders", "users"]);
    }

    #[test]
    fn test_empty_store_has_no_recommendations() {
        let store = HistoryStore::new();
        assert!(detect_patterns(&store).is_empty());
        assert!(identify_hotspots(&store).is_empty());
        assert!(generate_recommendations(&store).is_empty());
    }

    #[test]
    fn test_recommendations_for_busy_migration() {
        let changes: Vec<(&str, &str)> = vec![
            ("2024-01-01T00:00:00Z", "create table orders"),
            ("2024-01-01T01:00:00Z", "alter table orders"),
            ("2024-01-01T02:00:00Z", "revert alter table orders"),
            ("2024-01-01T03:00:00Z", "alter table orders"),
            ("2024-01-01T04:00:00Z", "x"),
            ("2024-01-01T05:00:00Z", "y"),
            ("2024-01-01T06:00:00Z", "z"),
            ("2024-01-01T07:00:00Z", "w"),
            ("2024-01-01T08:00:00Z", "v"),
            ("2024-01-01T09:00:00Z", "u"),
            ("2024-01-01T10:00:00Z", "t"),
        ];
        let store = store_of(vec![record_with("db/0001.py", &changes)]);
        let recs = generate_recommendations(&store);

        assert_eq!(recs.len(), 4, "{recs:?}");
        assert_eq!(recs[0], "Migration db/0001.py was changed 11 times. Consider refactoring.");
        assert_eq!(recs[1], "Found 2 problematic patterns. Migration review recommended.");
        assert!(recs[2].starts_with("Hotspots detected: orders."));
        assert_eq!(recs[3], "High migration frequency: 11.0 per week. Consider batching changes.");
    }
}
