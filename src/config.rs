use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::error::{HistoryError, Result};
use crate::git::{parse_git_date, Timestamp};

/// File name looked up in the repository root.
pub const REPO_CONFIG_FILE: &str = ".migtrail.yml";

/// Output formats understood by the reporters.
pub const FORMATS: &[&str] = &["terminal", "json"];

/// All settings that can be placed in a .migtrail.yml config file.
/// Every field is optional; omitted fields fall back to CLI defaults.
/// CLI flags always take precedence over values set here.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MigtrailConfig {
    // Which files count as migrations
    pub patterns: Option<Vec<String>>,

    // History filters
    pub since: Option<String>,
    pub until: Option<String>,
    pub author: Option<String>,
    pub max_commits: Option<i64>,

    // Scanner
    pub max_cache_size: Option<usize>,

    // Output
    pub format: Option<String>,
    pub output: Option<String>,
    pub no_color: Option<bool>,
}

impl MigtrailConfig {
    /// Validates semantic constraints that serde cannot enforce.
    ///
    /// Called automatically by [`load_config`].
    pub fn validate(&self) -> Result<()> {
        if let Some(fmt) = &self.format {
            if !FORMATS.contains(&fmt.as_str()) {
                return Err(HistoryError::Config(format!(
                    "Invalid 'format' value: \"{fmt}\". Expected one of: \"terminal\", \"json\""
                )));
            }
        }

        if let Some(patterns) = &self.patterns {
            if patterns.is_empty() {
                return Err(HistoryError::Config(
                    "Invalid 'patterns' value: the list is empty. \
                     Omit the field to use the built-in Alembic and Django patterns"
                        .to_string(),
                ));
            }
        }

        if let Some(0) = self.max_cache_size {
            return Err(HistoryError::Config(
                "Invalid 'max_cache_size' value: 0. Must be 1 or greater".to_string(),
            ));
        }

        if let Some(n) = self.max_commits {
            if n < 0 {
                return Err(HistoryError::Config(format!(
                    "Invalid 'max_commits' value: {n}. Must be 0 or greater"
                )));
            }
        }

        let since = self.since_timestamp()?;
        let until = self.until_timestamp()?;
        if let (Some(s), Some(u)) = (since, until) {
            if s.compare(&u).is_gt() {
                return Err(HistoryError::Config(format!(
                    "'since' ({s}) is later than 'until' ({u})"
                )));
            }
        }

        Ok(())
    }

    pub fn since_timestamp(&self) -> Result<Option<Timestamp>> {
        parse_field("since", self.since.as_deref())
    }

    pub fn until_timestamp(&self) -> Result<Option<Timestamp>> {
        parse_field("until", self.until.as_deref())
    }
}

fn parse_field(name: &str, value: Option<&str>) -> Result<Option<Timestamp>> {
    match value.map(str::trim).filter(|v| !v.is_empty()) {
        None => Ok(None),
        Some(raw) => parse_git_date(raw)
            .map(Some)
            .map_err(|_| HistoryError::Config(format!("Invalid '{name}' date: \"{raw}\""))),
    }
}

/// Reads, parses, and validates a YAML config file from `path`.
pub fn load_config(path: &Path) -> Result<MigtrailConfig> {
    let content = std::fs::read_to_string(path).map_err(|e| {
        HistoryError::Config(format!("Cannot read config file '{}': {e}", path.display()))
    })?;
    let cfg: MigtrailConfig = serde_yaml::from_str(&content).map_err(|e| {
        HistoryError::Config(format!("Invalid config file '{}': {e}", path.display()))
    })?;
    cfg.validate().map_err(|e| match e {
        HistoryError::Config(msg) => {
            HistoryError::Config(format!("Config file '{}': {msg}", path.display()))
        }
        other => other,
    })?;
    Ok(cfg)
}

/// Finds the config file to use for `repo`.
///
/// An explicit path must exist. Otherwise `<repo>/.migtrail.yml` is tried,
/// then `migtrail/config.yml` under the user config directory.
pub fn discover_config(explicit: Option<&Path>, repo: &Path) -> Option<PathBuf> {
    if let Some(path) = explicit {
        return Some(path.to_path_buf());
    }
    let in_repo = repo.join(REPO_CONFIG_FILE);
    if in_repo.is_file() {
        return Some(in_repo);
    }
    dirs::config_dir()
        .map(|dir| dir.join("migtrail").join("config.yml"))
        .filter(|p| p.is_file())
}

/// Annotated YAML template, printed by `--generate-config`.
pub static TEMPLATE: &str = r#"# migtrail configuration file
# Generated by: migtrail --generate-config
#
# All settings are optional. Omit any field to use the built-in default.
# CLI flags always take precedence over values in this file.
# Save this file as .migtrail.yml in your repository root, or as
# migtrail/config.yml in your user config directory.

# ── Migration files ────────────────────────────────────────────────────────────

# Glob patterns selecting migration scripts. `*` also matches `/`.
# patterns:
#   - "alembic/versions/*.py"
#   - "*/migrations/*.py"

# ── History filters ────────────────────────────────────────────────────────────

# Only count commits on or after / before these dates.
# Accepts ISO 8601 with or without an offset, or a bare date.
# since: "2024-01-01"
# until: "2024-12-31T23:59:59+00:00"

# Case-insensitive part of the author name.
# author: "alice"

# Most recent commits to read per migration file.
# max_commits: 500

# ── Scanner ────────────────────────────────────────────────────────────────────

# Entries kept in each of the commit, pattern and diff caches.
# max_cache_size: 1000

# ── Output ─────────────────────────────────────────────────────────────────────

# Output format: terminal, json
# format: "terminal"

# Write the report to a file instead of stdout.
# output: "migration-history.json"

# Disable colored terminal output.
# no_color: false
"#;

/// Prints the config template to stdout, or writes it to `output_path` if given.
pub fn print_template(output_path: Option<&Path>) -> Result<()> {
    match output_path {
        Some(path) => std::fs::write(path, TEMPLATE).map_err(|e| {
            HistoryError::Config(format!(
                "Cannot write config template to '{}': {e}",
                path.display()
            ))
        }),
        None => {
            print!("{TEMPLATE}");
            Ok(())
        }
    }
}

// ─── Tests ────────────────────────────────────────────────────────────────────
