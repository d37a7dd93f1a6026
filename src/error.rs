use thiserror::Error;

/// Unified error type for upmerge operations
#[derive(Error, Debug)]
pub enum UpmergeError {
    #[error("Git operation failed: {0}")]
    Git(#[from] git2::Error),

    #[error("Git command failed: {0}")]
    Command(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Version parsing error: {0}")]
    Version(String),

    #[error("Precondition failed: {0}")]
    Precondition(String),

    #[error("Planning error: {0}")]
    Planning(String),

    #[error("Merge of '{source_branch}' into '{target_branch}' failed: {reason}")]
    Merge {
        source_branch: String,
        target_branch: String,
        reason: String,
    },

    #[error("Cannot parse commit log: {0}")]
    LogParse(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Convenience type alias for Results in upmerge
pub type Result<T> = std::result::Result<T, UpmergeError>;

impl UpmergeError {
    /// Create a git command error with context
    pub fn command(msg: impl Into<String>) -> Self {
        UpmergeError::Command(msg.into())
    }

    /// Create a configuration error with context
    pub fn config(msg: impl Into<String>) -> Self {
        UpmergeError::Config(msg.into())
    }

    /// Create a version error with context
    pub fn version(msg: impl Into<String>) -> Self {
        UpmergeError::Version(msg.into())
    }

    /// Create a precondition error (nothing has been mutated yet)
    pub fn precondition(msg: impl Into<String>) -> Self {
        UpmergeError::Precondition(msg.into())
    }

    /// Create a planning error (the whole batch is rejected)
    pub fn planning(msg: impl Into<String>) -> Self {
        UpmergeError::Planning(msg.into())
    }

    /// Create a merge error for one step of the chain
    pub fn merge(
        source_branch: impl Into<String>,
        target_branch: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        UpmergeError::Merge {
            source_branch: source_branch.into(),
            target_branch: target_branch.into(),
            reason: reason.into(),
        }
    }

    /// Create a commit log parse error
    pub fn log_parse(msg: impl Into<String>) -> Self {
        UpmergeError::LogParse(msg.into())
    }
}
