use once_cell::sync::Lazy;
use regex::Regex;

use super::{CommitObject, LogEntry};

/// `git log` pretty format understood by [`parse_log_output`].
pub const LOG_FORMAT: &str = "--pretty=format:%H|%an|%ad|%s";

/// `git show -s` format understood by [`parse_commit_header`].
/// Fields are separated by ASCII unit separators so subjects may contain `|`.
pub const COMMIT_FORMAT: &str = "--format=%H%x1f%an%x1f%cI%x1f%P%x1f%B";

const FIELD_SEP: char = '\u{1f}';

/// Parses `hash|author|date|subject` lines. Malformed lines are dropped.
pub fn parse_log_output(output: &str) -> Vec<LogEntry> {
    output.lines().filter_map(parse_log_line).collect()
}

fn parse_log_line(line: &str) -> Option<LogEntry> {
    let trimmed = line.trim();
    if trimmed.is_empty() {
        return None;
    }
    let mut parts = trimmed.splitn(4, '|');
    match (parts.next(), parts.next(), parts.next(), parts.next()) {
        (Some(hash), Some(author), Some(date), Some(subject)) if !hash.is_empty() => Some(LogEntry {
            hash: hash.to_string(),
            author: author.to_string(),
            date: date.to_string(),
            subject: subject.to_string(),
        }),
        _ => None,
    }
}

/// Parses the header printed with [`COMMIT_FORMAT`] and attaches `files`.
pub fn parse_commit_header(output: &str, files: Vec<String>) -> Option<CommitObject> {
    let mut parts = output.splitn(5, FIELD_SEP);
    let hash = parts.next()?.trim();
    let author = parts.next()?;
    let date = parts.next()?;
    let parents = parts.next()?;
    let message = parts.next().unwrap_or("");
    if hash.is_empty() {
        return None;
    }
    Some(CommitObject {
        hash: hash.to_string(),
        author: author.to_string(),
        date: date.trim().to_string(),
        message: message.trim().to_string(),
        parents: parents.split_whitespace().map(str::to_string).collect(),
        files,
    })
}

/// Extracts file names from `git diff-tree --numstat` output, resolving
/// rename notation to the new name. Order is preserved, duplicates dropped.
pub fn parse_changed_files(output: &str) -> Vec<String> {
    let mut files: Vec<String> = Vec::new();
    for line in output.lines() {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }
        let mut parts = trimmed.splitn(3, '\t');
        if let (Some(_added), Some(_deleted), Some(raw_name)) = (parts.next(), parts.next(), parts.next()) {
            if let Some(name) = normalize_filename(raw_name) {
                if !files.contains(&name) {
                    files.push(name);
                }
            }
        }
    }
    files
}

/// First non-blank line of `--name-status` output.
pub fn first_status_line(output: &str) -> Option<&str> {
    output.lines().map(str::trim).find(|l| !l.is_empty())
}

/// Normalizes git rename notations:
///   "db/{old => new}/0001.py" → "db/new/0001.py"
///   "old-name => new-name"    → "new-name"
fn normalize_filename(raw: &str) -> Option<String> {
    if raw.contains('{') && raw.contains("=>") {
        let result = RENAME_RE.replace(raw, "$1").replace("//", "/");
        return if result.contains('{') {
            None
        } else {
            Some(result.trim().to_string())
        };
    }
    if raw.contains(" => ") {
        return raw.split(" => ").last().map(|s| s.trim().to_string());
    }
    let t = raw.trim();
    if t.is_empty() {
        None
    } else {
        Some(t.to_string())
    }
}

static RENAME_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\{[^}]*? => ([^}]*)\}").expect("rename regex"));
