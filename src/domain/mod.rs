//! Domain logic - pure business rules independent of git operations

pub mod branch;
pub mod commit;
pub mod plan;
pub mod version;

pub use branch::{classify, release_of_local_branch, BranchRecord, CustomerFilter, RawBranch};
pub use commit::{group_by_author, parse_log, AuthorInfo, CommitInfo, LOG_FORMAT};
pub use plan::{build_pairs, build_plan, release_gaps, MergePair, MergePlan};
pub use version::ReleaseVersion;
