use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, FixedOffset, Local, NaiveDate, NaiveDateTime, Utc};
use serde::{Serialize, Serializer};

use crate::error::{HistoryError, Result};

/// A commit timestamp as git (or a caller) reported it: either with a UTC
/// offset or as a bare wall-clock value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Timestamp {
    Aware(DateTime<FixedOffset>),
    Naive(NaiveDateTime),
}

impl Timestamp {
    /// Local wall-clock "now", without an offset.
    pub fn now() -> Self {
        Timestamp::Naive(Local::now().naive_local())
    }

    pub fn is_aware(&self) -> bool {
        matches!(self, Timestamp::Aware(_))
    }

    /// The clock reading as written, with any offset dropped.
    pub fn wall_clock(&self) -> NaiveDateTime {
        match self {
            Timestamp::Aware(dt) => dt.naive_local(),
            Timestamp::Naive(n) => *n,
        }
    }

    /// Position on a single time axis: aware values in UTC, naive values as-is.
    pub fn instant(&self) -> NaiveDateTime {
        match self {
            Timestamp::Aware(dt) => dt.naive_utc(),
            Timestamp::Naive(n) => *n,
        }
    }

    /// Calendar date of the wall-clock reading.
    pub fn date(&self) -> NaiveDate {
        self.wall_clock().date()
    }

    /// Compares two timestamps without failing on mixed offset-awareness.
    ///
    /// Two aware values compare as instants. If either side is naive, both
    /// sides are reduced to their wall-clock reading first.
    pub fn compare(&self, other: &Timestamp) -> Ordering {
        match (self, other) {
            (Timestamp::Aware(a), Timestamp::Aware(b)) => a.cmp(b),
            _ => self.wall_clock().cmp(&other.wall_clock()),
        }
    }

    /// Renders the value in a form `git log --since/--until` accepts.
    pub fn to_git_arg(&self) -> String {
        match self {
            Timestamp::Aware(dt) => dt.to_rfc3339(),
            Timestamp::Naive(n) => n.format("%Y-%m-%dT%H:%M:%S").to_string(),
        }
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Timestamp::Aware(dt) => write!(f, "{}", dt.to_rfc3339()),
            Timestamp::Naive(n) => write!(f, "{}", n.format("%Y-%m-%dT%H:%M:%S%.f")),
        }
    }
}

impl Serialize for Timestamp {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl From<DateTime<FixedOffset>> for Timestamp {
    fn from(dt: DateTime<FixedOffset>) -> Self {
        Timestamp::Aware(dt)
    }
}

impl From<DateTime<Utc>> for Timestamp {
    fn from(dt: DateTime<Utc>) -> Self {
        Timestamp::Aware(dt.fixed_offset())
    }
}

impl From<NaiveDateTime> for Timestamp {
    fn from(n: NaiveDateTime) -> Self {
        Timestamp::Naive(n)
    }
}

impl FromStr for Timestamp {
    type Err = HistoryError;

    fn from_str(s: &str) -> Result<Self> {
        parse_git_date(s)
    }
}

// ─── Parsing ──────────────────────────────────────────────────────────────────

const AWARE_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f%:z",
    "%Y-%m-%dT%H:%M:%S%.f%z",
    "%Y-%m-%d %H:%M:%S%.f%:z",
    "%Y-%m-%d %H:%M:%S%.f%z",
    "%Y-%m-%d %H:%M:%S%.f %z",
    "%Y-%m-%d %H:%M:%S%.f %:z",
    "%Y-%m-%dT%H:%M:%S%.f %z",
];

const NAIVE_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M",
];

// git's default `--date=default` rendering, e.g. "Mon Jan 1 12:00:00 2024 +0000"
const GIT_DEFAULT_FORMAT: &str = "%a %b %e %H:%M:%S %Y %z";

/// Parses a date string produced by git or typed by a user.
///
/// Accepts ISO-8601 with or without an offset, a trailing `Z`, space or `T`
/// separators, optional fractional seconds and git's `--date=iso` output.
/// Falls back to RFC 2822, git's default date format, a bare `YYYY-MM-DD`
/// and unix seconds before giving up.
pub fn parse_git_date(raw: &str) -> Result<Timestamp> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(HistoryError::invalid("Empty date string"));
    }

    let normalized = match trimmed.strip_suffix('Z').or_else(|| trimmed.strip_suffix('z')) {
        Some(head) => format!("{head}+00:00"),
        None => trimmed.to_string(),
    };

    if let Ok(dt) = DateTime::parse_from_rfc3339(&normalized) {
        return Ok(Timestamp::Aware(dt));
    }
    for fmt in AWARE_FORMATS {
        if let Ok(dt) = DateTime::parse_from_str(&normalized, fmt) {
            return Ok(Timestamp::Aware(dt));
        }
    }
    for fmt in NAIVE_FORMATS {
        if let Ok(n) = NaiveDateTime::parse_from_str(&normalized, fmt) {
            return Ok(Timestamp::Naive(n));
        }
    }

    if let Some(ts) = parse_generic(trimmed) {
        return Ok(ts);
    }

    tracing::warn!("Failed to parse date: {raw}");
    Err(HistoryError::invalid(format!("Invalid date format: {raw}")))
}

fn parse_generic(s: &str) -> Option<Timestamp> {
    if let Ok(dt) = DateTime::parse_from_rfc2822(s) {
        return Some(Timestamp::Aware(dt));
    }
    if let Ok(dt) = DateTime::parse_from_str(s, GIT_DEFAULT_FORMAT) {
        return Some(Timestamp::Aware(dt));
    }
    if let Ok(d) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
        return d.and_hms_opt(0, 0, 0).map(Timestamp::Naive);
    }
    let digits = s.strip_prefix('@').unwrap_or(s);
    if !digits.is_empty() && digits.chars().all(|c| c.is_ascii_digit()) {
        let secs: i64 = digits.parse().ok()?;
        return DateTime::from_timestamp(secs, 0).map(Timestamp::from);
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Datelike, Timelike};

    #[test]
    fn test_parses_iso_with_offset() {
        let ts = parse_git_date("2024-01-01T10:30:00+03:00").unwrap();
        assert!(ts.is_aware());
        assert_eq!(ts.wall_clock().hour(), 10);
        assert_eq!(ts.instant().hour(), 7);
    }

    #[test]
    fn test_parses_trailing_z_as_utc() {
        let ts = parse_git_date("2024-01-01T00:00:00Z").unwrap();
        assert!(ts.is_aware());
        assert_eq!(ts.instant(), ts.wall_clock());
    }

    #[test]
    fn test_parses_naive_iso_and_space_separated() {
        for s in ["2024-01-01T00:00:00", "2024-01-01 00:00:00"] {
            let ts = parse_git_date(s).unwrap();
            assert!(!ts.is_aware(), "{s} should be naive");
            assert_eq!(ts.date(), NaiveDate::from_ymd_opt(2024, 1, 1).unwrap());
        }
    }

    #[test]
    fn test_parses_git_iso_output() {
        let ts = parse_git_date("2024-03-05 14:22:10 +0200").unwrap();
        assert!(ts.is_aware());
        assert_eq!(ts.wall_clock().day(), 5);
        assert_eq!(ts.instant().hour(), 12);
    }

    #[test]
    fn test_parses_microseconds() {
        let aware = parse_git_date("2024-01-01T00:00:00.123456+00:00").unwrap();
        assert!(aware.is_aware());
        assert_eq!(aware.wall_clock().nanosecond(), 123_456_000);

        let naive = parse_git_date("2024-01-01 00:00:00.5").unwrap();
        assert!(!naive.is_aware());
        assert_eq!(naive.wall_clock().nanosecond(), 500_000_000);
    }

    #[test]
    fn test_generic_fallbacks() {
        assert!(parse_git_date("Mon, 1 Jan 2024 12:00:00 +0000").is_ok());
        assert!(parse_git_date("Mon Jan 1 12:00:00 2024 +0000").is_ok());
        assert!(parse_git_date("2024-01-01").is_ok());
        let unix = parse_git_date("1700000000").unwrap();
        assert_eq!(unix.date().year(), 2023);
    }

    #[test]
    fn test_rejects_garbage_and_blank() {
        assert!(parse_git_date("").is_err());
        assert!(parse_git_date("   ").is_err());
        assert!(parse_git_date("not a date").is_err());
        assert!(parse_git_date("2024-13-45").is_err());
    }

    #[test]
    fn test_mixed_comparison_uses_wall_clock() {
        let aware = parse_git_date("2024-01-01T12:00:00+05:00").unwrap();
        let naive = parse_git_date("2024-01-01T11:00:00").unwrap();
        assert_eq!(aware.compare(&naive), Ordering::Greater);
        assert_eq!(naive.compare(&aware), Ordering::Less);
    }

    #[test]
    fn test_aware_comparison_uses_instant() {
        let east = parse_git_date("2024-01-01T12:00:00+05:00").unwrap();
        let utc = parse_git_date("2024-01-01T08:00:00+00:00").unwrap();
        assert_eq!(east.compare(&utc), Ordering::Less);
    }

    #[test]
    fn test_display_round_trips_through_parser() {
        let ts = parse_git_date("2024-06-01 09:15:00 -0700").unwrap();
        assert_eq!(parse_git_date(&ts.to_string()).unwrap(), ts);
    }
}
