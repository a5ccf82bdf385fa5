use std::path::{Path, PathBuf};
use std::process::{Command, Output};

use super::log_parser::{self, COMMIT_FORMAT, LOG_FORMAT};
use super::{CommitObject, LogEntry, LogFilter, VcsBackend};
use crate::error::{HistoryError, Result};

/// [`VcsBackend`] that shells out to the `git` executable.
#[derive(Debug, Clone)]
pub struct GitCli {
    repo_path: PathBuf,
}

impl GitCli {
    /// Opens the repository rooted at `repo_path`.
    ///
    /// Fails with `RepositoryUnavailable` when the path is missing, is not a
    /// directory, git cannot be executed, or the directory is not inside a
    /// work tree.
    pub fn open(repo_path: impl AsRef<Path>) -> Result<Self> {
        let path = repo_path.as_ref();
        if !path.exists() {
            return Err(HistoryError::RepositoryUnavailable(format!(
                "Path does not exist: {}",
                path.display()
            )));
        }
        if !path.is_dir() {
            return Err(HistoryError::RepositoryUnavailable(format!(
                "Path is not a directory: {}",
                path.display()
            )));
        }
        let repo_path = path.canonicalize()?;

        let output = Command::new("git")
            .args(["rev-parse", "--is-inside-work-tree"])
            .current_dir(&repo_path)
            .output()
            .map_err(|e| HistoryError::RepositoryUnavailable(format!("Failed to run git: {e}")))?;

        // `.git` directories and bare repositories exit 0 but print "false".
        let in_work_tree = output.status.success() && String::from_utf8_lossy(&output.stdout).trim() == "true";
        if !in_work_tree {
            return Err(HistoryError::RepositoryUnavailable(format!(
                "Directory is not a git work tree: {}",
                repo_path.display()
            )));
        }

        Ok(Self { repo_path })
    }

    pub fn repo_path(&self) -> &Path {
        &self.repo_path
    }

    fn exec(&self, args: &[&str]) -> Result<Output> {
        Command::new("git")
            .args(["-c", "core.quotepath=off"])
            .args(args)
            .current_dir(&self.repo_path)
            .output()
            .map_err(|e| HistoryError::Git(format!("Failed to run git {}: {e}", args.join(" "))))
    }

    /// Runs git and returns stdout; a non-zero exit becomes `HistoryError::Git`.
    fn run(&self, args: &[&str]) -> Result<String> {
        let output = self.exec(args)?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(HistoryError::Git(format!(
                "git {} failed: {}",
                args.first().copied().unwrap_or(""),
                stderr.trim()
            )));
        }
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

impl VcsBackend for GitCli {
    fn tracked_files(&self) -> Result<Vec<String>> {
        let out = self.run(&["ls-files"])?;
        Ok(out
            .lines()
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .map(str::to_string)
            .collect())
    }

    fn is_tracked(&self, path: &str) -> Result<bool> {
        let out = self.run(&["ls-files", "--", path])?;
        Ok(out.lines().any(|l| !l.trim().is_empty()))
    }

    fn log(&self, path: &str, filter: &LogFilter<'_>) -> Result<Vec<LogEntry>> {
        let mut args: Vec<String> = vec![
            "log".into(),
            "--follow".into(),
            LOG_FORMAT.into(),
            "--date=iso".into(),
        ];
        if let Some(since) = filter.since {
            args.push(format!("--since={}", since.to_git_arg()));
        }
        if let Some(until) = filter.until {
            args.push(format!("--until={}", until.to_git_arg()));
        }
        if let Some(author) = filter.author {
            args.push(format!("--author={author}"));
            args.push("--regexp-ignore-case".into());
        }
        args.push("--".into());
        args.push(path.into());

        let refs: Vec<&str> = args.iter().map(String::as_str).collect();
        let out = self.run(&refs)?;
        Ok(log_parser::parse_log_output(&out))
    }

    fn diff(&self, from: &str, to: &str, path: &str) -> Result<String> {
        self.run(&["diff", from, to, "--", path])
    }

    fn name_status(&self, from: &str, to: &str, path: &str) -> Result<String> {
        self.run(&["diff", "--name-status", from, to, "--", path])
    }

    fn show_root(&self, hash: &str, path: &str) -> Result<String> {
        self.run(&["show", &format!("{hash}:{path}")])
    }

    fn commit(&self, hash: &str) -> Result<CommitObject> {
        let header = self.run(&["show", "-s", COMMIT_FORMAT, hash])?;
        let mut commit = log_parser::parse_commit_header(&header, Vec::new())
            .ok_or_else(|| HistoryError::Git(format!("Unreadable commit header for {hash}")))?;

        // A single-commit diff-tree prints nothing for merges, so diff
        // against the first parent explicitly.
        let numstat = match commit.first_parent() {
            Some(parent) => self.run(&["diff-tree", "-r", "--numstat", "-M", parent, commit.hash.as_str()])?,
            None => self.run(&["diff-tree", "-r", "--root", "--no-commit-id", "--numstat", "-M", commit.hash.as_str()])?,
        };
        commit.files = log_parser::parse_changed_files(&numstat);
        Ok(commit)
    }

    fn tree_contains(&self, rev: &str, path: &str) -> Result<bool> {
        let output = self.exec(&["cat-file", "-e", &format!("{rev}:{path}")])?;
        Ok(output.status.success())
    }
}
