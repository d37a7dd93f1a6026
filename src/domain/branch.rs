use crate::domain::version::{is_default_branch_name, ReleaseVersion, NUMERIC_VERSION_PATTERN};
use crate::error::{Result, UpmergeError};
use regex::Regex;
use serde::Serialize;
use std::collections::HashSet;
use std::fmt;

/// One entry of the backend's branch listing
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct RawBranch {
    /// Branch name; remote branches are remote-qualified (`origin/release/5.20`)
    pub name: String,
    pub is_remote: bool,
    /// Commits the local tracking branch has that its upstream lacks
    pub ahead: usize,
    /// Commits the upstream has that the local tracking branch lacks
    pub behind: usize,
    /// The upstream of the local tracking branch no longer exists
    pub is_gone: bool,
}

impl RawBranch {
    /// A remote branch with no local tracking information
    pub fn remote(name: impl Into<String>) -> Self {
        RawBranch {
            name: name.into(),
            is_remote: true,
            ..RawBranch::default()
        }
    }

    /// A local branch with no tracking information
    pub fn local(name: impl Into<String>) -> Self {
        RawBranch {
            name: name.into(),
            is_remote: false,
            ..RawBranch::default()
        }
    }
}

/// Which customer branches take part in a run
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum CustomerFilter {
    /// Release branches only
    #[default]
    ReleasesOnly,
    /// Every customer
    All,
    /// A single named customer
    Only(String),
}

impl CustomerFilter {
    /// Build the filter from CLI-style inputs. `"*"` selects all customers.
    pub fn from_args(all_customers: bool, customer: Option<&str>) -> Self {
        match (all_customers, customer) {
            (true, _) | (false, Some("*")) => CustomerFilter::All,
            (false, Some(name)) => CustomerFilter::Only(name.to_string()),
            (false, None) => CustomerFilter::ReleasesOnly,
        }
    }

    pub fn is_active(&self) -> bool {
        !matches!(self, CustomerFilter::ReleasesOnly)
    }

    pub fn accepts(&self, customer: &str) -> bool {
        match self {
            CustomerFilter::ReleasesOnly => false,
            CustomerFilter::All => true,
            CustomerFilter::Only(name) => name == customer,
        }
    }
}

impl fmt::Display for CustomerFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CustomerFilter::ReleasesOnly => write!(f, "no customers"),
            CustomerFilter::All => write!(f, "all customers"),
            CustomerFilter::Only(name) => write!(f, "customer '{}'", name),
        }
    }
}

/// A classified, version-tagged remote branch
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BranchRecord {
    #[serde(skip)]
    pub remote: String,
    /// Fully qualified name, e.g. `origin/release/5.20`
    pub remote_name: String,
    pub version: ReleaseVersion,
    pub customer: Option<String>,
    pub ahead: usize,
    pub behind: usize,
    pub is_gone: bool,
}

impl BranchRecord {
    /// Name without the remote prefix, e.g. `release/5.20`
    pub fn short_name(&self) -> &str {
        self.remote_name
            .strip_prefix(self.remote.as_str())
            .and_then(|rest| rest.strip_prefix('/'))
            .unwrap_or(&self.remote_name)
    }

    pub fn is_customer(&self) -> bool {
        self.customer.is_some()
    }

    /// Local tracking branch has both unpushed and unpulled commits
    pub fn is_diverged(&self) -> bool {
        self.ahead > 0 && self.behind > 0
    }
}

impl fmt::Display for BranchRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.remote_name)
    }
}

/// Name patterns for release infrastructure on one remote
pub struct BranchPatterns {
    remote: String,
    release: Regex,
    customer: Regex,
}

impl BranchPatterns {
    /// Compile the release and customer patterns for `remote`
    pub fn new(remote: &str) -> Result<Self> {
        let escaped = regex::escape(remote);
        let release = Regex::new(&format!(
            "^{}/release/({})$",
            escaped, NUMERIC_VERSION_PATTERN
        ))
        .map_err(|e| UpmergeError::config(format!("Invalid remote '{}': {}", remote, e)))?;
        let customer = Regex::new(&format!(
            "^{}/customer/([^/]+)/({})$",
            escaped, NUMERIC_VERSION_PATTERN
        ))
        .map_err(|e| UpmergeError::config(format!("Invalid remote '{}': {}", remote, e)))?;

        Ok(BranchPatterns {
            remote: remote.to_string(),
            release,
            customer,
        })
    }

    /// Match a remote branch name, returning its version and customer.
    ///
    /// The default-branch test runs first, then the release pattern, then the
    /// customer pattern (only when the filter is active).
    pub fn match_name(
        &self,
        name: &str,
        filter: &CustomerFilter,
    ) -> Option<(ReleaseVersion, Option<String>)> {
        let short = name
            .strip_prefix(self.remote.as_str())
            .and_then(|rest| rest.strip_prefix('/'))?;
        if is_default_branch_name(short) {
            return Some((ReleaseVersion::Default, None));
        }

        if let Some(captures) = self.release.captures(name) {
            let version = ReleaseVersion::parse_numeric(captures.get(1)?.as_str())?;
            return Some((version, None));
        }

        if !filter.is_active() {
            return None;
        }

        let captures = self.customer.captures(name)?;
        let customer = captures.get(1)?.as_str();
        if !filter.accepts(customer) {
            return None;
        }
        let version = ReleaseVersion::parse_numeric(captures.get(2)?.as_str())?;
        Some((version, Some(customer.to_string())))
    }
}

/// Turn a raw branch listing into typed branch records.
///
/// Only remote branches of `remote` are considered. Names matching no
/// recognized pattern are dropped, and duplicate names are kept once.
pub fn classify(
    remote: &str,
    raw_branches: &[RawBranch],
    filter: &CustomerFilter,
) -> Result<Vec<BranchRecord>> {
    let patterns = BranchPatterns::new(remote)?;
    let mut seen = HashSet::new();
    let mut records = Vec::new();

    for raw in raw_branches.iter().filter(|b| b.is_remote) {
        let Some((version, customer)) = patterns.match_name(&raw.name, filter) else {
            tracing::trace!(branch = %raw.name, "not release infrastructure");
            continue;
        };

        if !seen.insert(raw.name.as_str()) {
            continue;
        }

        records.push(BranchRecord {
            remote: remote.to_string(),
            remote_name: raw.name.clone(),
            version,
            customer,
            ahead: raw.ahead,
            behind: raw.behind,
            is_gone: raw.is_gone,
        });
    }

    Ok(records)
}

/// Release version implied by a local branch name (`release/5.20`,
/// `customer/acme/5.20`, `main`, `master`)
pub fn release_of_local_branch(name: &str) -> Option<ReleaseVersion> {
    if is_default_branch_name(name) {
        return Some(ReleaseVersion::Default);
    }
    if let Some(version) = name.strip_prefix("release/") {
        return ReleaseVersion::parse_numeric(version);
    }

    let (customer, version) = name.strip_prefix("customer/")?.split_once('/')?;
    if customer.is_empty() {
        return None;
    }
    ReleaseVersion::parse_numeric(version)
}
