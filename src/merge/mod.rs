//! Merge execution through disposable local branches

pub mod executor;

pub use executor::{ExecutionReport, MergeExecutor, StepOutcome};

use crate::domain::{BranchRecord, MergePair};
use crate::error::{Result, UpmergeError};
use rand::distr::Alphanumeric;
use rand::Rng;
use std::fmt;
use std::str::FromStr;

/// Length of the per-invocation token in temporary branch names
pub const TOKEN_LENGTH: usize = 6;

const TEMP_BRANCH_PREFIX: &str = "upmerge-";

/// Per-invocation token that makes temporary branch names unique.
///
/// Generated once per run and threaded through the executor; tests pass a
/// fixed token to get predictable branch names.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TempBranchToken(String);

impl TempBranchToken {
    /// A fresh random alphanumeric token
    pub fn random() -> Self {
        let token: String = rand::rng()
            .sample_iter(Alphanumeric)
            .take(TOKEN_LENGTH)
            .map(char::from)
            .collect();
        TempBranchToken(token)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Prefix shared by every temporary branch of this run
    pub fn prefix(&self) -> String {
        format!("{}{}/", TEMP_BRANCH_PREFIX, self.0)
    }

    /// Temporary branch for `record`, e.g. `upmerge-a1B2c3/release/5.20`
    pub fn branch_name(&self, record: &BranchRecord) -> String {
        format!("{}{}", self.prefix(), record.short_name())
    }
}

impl FromStr for TempBranchToken {
    type Err = UpmergeError;

    fn from_str(s: &str) -> Result<Self> {
        if s.len() != TOKEN_LENGTH || !s.chars().all(|c| c.is_ascii_alphanumeric()) {
            return Err(UpmergeError::config(format!(
                "Temporary branch token must be {} alphanumeric characters, got '{}'",
                TOKEN_LENGTH, s
            )));
        }
        Ok(TempBranchToken(s.to_string()))
    }
}

impl fmt::Display for TempBranchToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Reference a merge reads its source from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceRef {
    /// Untouched in this run; merged straight from the remote-tracking branch
    Remote { remote: String, branch: String },
    /// Temporary branch holding this run's earlier merge result
    Temp(String),
}

impl fmt::Display for SourceRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SourceRef::Remote { remote, branch } => write!(f, "{}/{}", remote, branch),
            SourceRef::Temp(name) => f.write_str(name),
        }
    }
}

/// One merge as executed: the pair plus the branches it touches
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MergeStep {
    pub pair: MergePair,
    pub source_ref: SourceRef,
    /// Temporary branch that receives the merge
    pub target_branch: String,
}

impl MergeStep {
    /// `<temp>:<target short name>` for pushing the result
    pub fn push_refspec(&self) -> String {
        format!("{}:{}", self.target_branch, self.pair.target.short_name())
    }
}

/// Stages of a run. Failures from any stage end in `Failed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Init,
    Fetched,
    CheckedClean,
    ReleaseResolved,
    Planned,
    Merging,
    Restoring,
    Done,
    Failed,
}

impl Phase {
    /// Move to `next`, logging the transition
    pub fn advance(self, next: Phase) -> Phase {
        tracing::debug!(from = %self, to = %next, "phase transition");
        next
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Phase::Init => "init",
            Phase::Fetched => "fetched",
            Phase::CheckedClean => "checked-clean",
            Phase::ReleaseResolved => "release-resolved",
            Phase::Planned => "planned",
            Phase::Merging => "merging",
            Phase::Restoring => "restoring",
            Phase::Done => "done",
            Phase::Failed => "failed",
        };
        f.write_str(name)
    }
}
