//! Version-control backend abstraction
//!
//! Everything upmerge does to a repository goes through the [Repository]
//! trait. Two implementations exist:
//!
//! - [repository::Git2Repository]: a real working copy. Reads (status,
//!   branch listing) use `git2`; mutations and log queries run the `git`
//!   executable so that merge, push and credential behavior match what the
//!   user gets on the command line.
//! - [mock::MockRepository]: an in-memory backend for tests, with call
//!   recording and failure injection.
//!
//! ```rust
//! # use upmerge::git::Repository;
//! # fn example<R: Repository>(repo: &R) -> upmerge::error::Result<()> {
//! repo.fetch("origin")?;
//! let status = repo.status()?;
//! if !status.is_clean() {
//!     println!("working copy has local changes");
//! }
//! # Ok(())
//! # }
//! ```

pub mod mock;
pub mod repository;

pub use mock::MockRepository;
pub use repository::Git2Repository;

use crate::domain::RawBranch;
use crate::error::Result;

/// Snapshot of the working copy
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RepoStatus {
    /// Checked-out local branch; `None` when HEAD is detached
    pub current: Option<String>,
    /// Upstream of the current branch, e.g. `origin/release/5.20`
    pub tracking: Option<String>,
    pub ahead: usize,
    pub behind: usize,
    pub untracked: Vec<String>,
    pub conflicted: Vec<String>,
    pub staged: Vec<String>,
    pub modified: Vec<String>,
}

impl RepoStatus {
    /// No untracked, conflicted, staged or modified files
    pub fn is_clean(&self) -> bool {
        self.untracked.is_empty()
            && self.conflicted.is_empty()
            && self.staged.is_empty()
            && self.modified.is_empty()
    }

    /// Total number of files with local changes
    pub fn change_count(&self) -> usize {
        self.untracked.len() + self.conflicted.len() + self.staged.len() + self.modified.len()
    }
}

/// Flags for [Repository::merge]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MergeOptions {
    /// Always create a merge commit
    pub no_fast_forward: bool,
    /// Stop before committing the merge result
    pub no_commit: bool,
    /// Report the files touched by the merge commit
    pub list_files: bool,
}

impl Default for MergeOptions {
    fn default() -> Self {
        MergeOptions {
            no_fast_forward: true,
            no_commit: false,
            list_files: false,
        }
    }
}

/// Result of a successful merge
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MergeSummary {
    /// The target already contained everything from the source
    pub up_to_date: bool,
    /// Files touched by the merge commit (only when requested)
    pub files: Vec<String>,
}

/// Operations upmerge needs from a version-control backend.
///
/// Implementations map their failures onto [crate::error::UpmergeError];
/// a failed merge must leave the working copy without an in-progress merge.
pub trait Repository: Send {
    /// Update remote-tracking refs of `remote`, pruning deleted branches
    fn fetch(&self, remote: &str) -> Result<()>;

    /// Current branch, tracking information and local changes
    fn status(&self) -> Result<RepoStatus>;

    /// Every local and remote branch with tracking metadata.
    ///
    /// Remote entries are remote-qualified (`origin/release/5.20`) and carry
    /// the ahead/behind counts of the local branch tracking them, if any. A
    /// local branch whose upstream no longer exists yields a remote entry for
    /// that upstream with `is_gone` set.
    fn list_branches(&self) -> Result<Vec<RawBranch>>;

    /// Switch to `name`, creating it from `create_from` (and tracking it)
    /// when given
    fn checkout_branch(&self, name: &str, create_from: Option<&str>) -> Result<()>;

    /// Merge `branch` (qualified by `remote` when given) into the current branch
    fn merge(&self, remote: Option<&str>, branch: &str, options: &MergeOptions)
        -> Result<MergeSummary>;

    /// Push using `refspec` (`local:remote-branch`)
    fn push(&self, remote: &str, refspec: &str) -> Result<()>;

    /// Delete a local branch; refuses branches with unmerged commits
    fn delete_branch(&self, name: &str) -> Result<()>;

    /// Run an arbitrary backend command and return its stdout
    fn raw_command(&self, args: &[&str]) -> Result<String>;
}
