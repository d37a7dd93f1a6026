use std::fmt;

/// Non-fatal conditions found while planning or cleaning up.
/// They are reported to the user but never replace the primary result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UpmergeWarning {
    /// A temporary branch could not be deleted
    CleanupFailed { branch: String, reason: String },
    /// The branch checked out before the run could not be restored
    RestoreFailed { branch: String, reason: String },
    /// The local tracking branch has commits that are not on the remote
    UnpushedLocalCommits { branch: String, ahead: usize },
    /// A customer branch has no release branch of the same version
    ReleaseGap { branch: String, version: String },
}

impl fmt::Display for UpmergeWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UpmergeWarning::CleanupFailed { branch, reason } => {
                write!(f, "Could not delete temporary branch '{}': {}", branch, reason)
            }
            UpmergeWarning::RestoreFailed { branch, reason } => {
                write!(f, "Could not check out '{}' again: {}", branch, reason)
            }
            UpmergeWarning::UnpushedLocalCommits { branch, ahead } => {
                let noun = if *ahead == 1 { "commit" } else { "commits" };
                write!(
                    f,
                    "Local branch '{}' has {} unpushed {}; they are not part of this upmerge",
                    branch, ahead, noun
                )
            }
            UpmergeWarning::ReleaseGap { branch, version } => {
                write!(
                    f,
                    "No release branch for version {}; '{}' only receives the previous customer branch",
                    version, branch
                )
            }
        }
    }
}
