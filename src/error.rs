use thiserror::Error;

#[derive(Error, Debug)]
pub enum HistoryError {
    /// Bad filter combination or blank input; raised before any git query.
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// Missing git tooling or a root that is not a repository.
    #[error("Repository unavailable: {0}")]
    RepositoryUnavailable(String),

    /// A single git query failed. Batch operations downgrade this to a default.
    #[error("Git error: {0}")]
    Git(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Config error: {0}")]
    Config(String),
}

impl HistoryError {
    pub fn invalid(msg: impl Into<String>) -> Self {
        HistoryError::InvalidArgument(msg.into())
    }
}

pub type Result<T> = std::result::Result<T, HistoryError>;
