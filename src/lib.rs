//! Mines git history for the risk profile of database migration scripts.
//!
//! The pipeline runs in three stages: a [`RepositoryScanner`] reads commits
//! and diffs through a [`VcsBackend`], a [`ChangeTracker`] turns them into one
//! [`HistoryRecord`] per migration file, and the [`analyzers::trend`] functions
//! derive frequency, patterns, hotspots and recommendations from the
//! resulting [`HistoryStore`].

pub mod analyzers;
pub mod cache;
pub mod config;
pub mod error;
pub mod filters;
pub mod git;
pub mod reporters;
pub mod scanner;
pub mod store;
pub mod tracker;
pub mod types;

pub use error::{HistoryError, Result};
pub use git::{parse_git_date, GitCli, Timestamp, VcsBackend};
pub use scanner::{CacheStats, RepositoryScanner};
pub use store::HistoryStore;
pub use tracker::ChangeTracker;
pub use types::{
    AggregateStatistics, ChangeEvent, ChangeKind, CommitRecord, DetectedPattern, FrequencyReport,
    HistoryQuery, HistoryRecord, HistoryReport,
};
