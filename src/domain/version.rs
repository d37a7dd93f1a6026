use crate::error::{Result, UpmergeError};
use semver::Version;
use serde::{Serialize, Serializer};
use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

/// Dotted numeric version with one to three components, e.g. `5`, `5.20`, `5.20.1`
pub const NUMERIC_VERSION_PATTERN: &str = r"\d+(?:\.\d+){0,2}";

/// Returns true for the trunk branch names that terminate every release chain
pub fn is_default_branch_name(name: &str) -> bool {
    matches!(name, "main" | "master")
}

/// Version of a release or customer branch.
///
/// Numbered versions order by (major, minor, patch). The default branch
/// (`main`/`master`) is greater than every numbered version, and two
/// default-branch versions are equal.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ReleaseVersion {
    Numbered(Version),
    Default,
}

impl ReleaseVersion {
    /// Create a numbered release version
    pub fn new(major: u64, minor: u64, patch: u64) -> Self {
        ReleaseVersion::Numbered(Version::new(major, minor, patch))
    }

    /// Parse a branch suffix into a release version.
    ///
    /// An optional `remote` prefix (`"<remote>/"`) is stripped first. `main` and
    /// `master` parse to [`ReleaseVersion::Default`]; a dotted numeric string
    /// with up to three components parses with missing components set to zero.
    /// Anything else returns `None`.
    ///
    /// # Examples
    /// ```
    /// # use upmerge::domain::ReleaseVersion;
    /// assert_eq!(ReleaseVersion::parse("5.2", None), Some(ReleaseVersion::new(5, 2, 0)));
    /// assert_eq!(ReleaseVersion::parse("origin/main", Some("origin")), Some(ReleaseVersion::Default));
    /// assert_eq!(ReleaseVersion::parse("5.x", None), None);
    /// ```
    pub fn parse(text: &str, remote: Option<&str>) -> Option<Self> {
        let name = match remote {
            Some(remote) => text
                .strip_prefix(remote)
                .and_then(|rest| rest.strip_prefix('/'))
                .unwrap_or(text),
            None => text,
        };

        if is_default_branch_name(name) {
            return Some(ReleaseVersion::Default);
        }

        Self::parse_numeric(name)
    }

    /// Parse only the dotted numeric form, without the default-branch names
    pub fn parse_numeric(text: &str) -> Option<Self> {
        let components: Vec<&str> = text.split('.').collect();
        if components.len() > 3 {
            return None;
        }

        let mut parts = [0u64; 3];
        for (slot, part) in parts.iter_mut().zip(components) {
            if part.is_empty() || !part.bytes().all(|b| b.is_ascii_digit()) {
                return None;
            }
            // Components that overflow u64 are not versions either
            *slot = part.parse::<u64>().ok()?;
        }

        Some(ReleaseVersion::new(parts[0], parts[1], parts[2]))
    }

    /// Whether this is the default-branch sentinel
    pub fn is_default_branch(&self) -> bool {
        matches!(self, ReleaseVersion::Default)
    }

    /// (major, minor, patch) for numbered versions
    pub fn components(&self) -> Option<(u64, u64, u64)> {
        match self {
            ReleaseVersion::Numbered(v) => Some((v.major, v.minor, v.patch)),
            ReleaseVersion::Default => None,
        }
    }

    /// Lowest possible version; every branch compares greater or equal
    pub fn lowest() -> Self {
        ReleaseVersion::new(0, 0, 0)
    }
}

impl Ord for ReleaseVersion {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            (ReleaseVersion::Default, ReleaseVersion::Default) => Ordering::Equal,
            (ReleaseVersion::Default, ReleaseVersion::Numbered(_)) => Ordering::Greater,
            (ReleaseVersion::Numbered(_), ReleaseVersion::Default) => Ordering::Less,
            (ReleaseVersion::Numbered(a), ReleaseVersion::Numbered(b)) => {
                (a.major, a.minor, a.patch).cmp(&(b.major, b.minor, b.patch))
            }
        }
    }
}

impl PartialOrd for ReleaseVersion {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for ReleaseVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReleaseVersion::Numbered(v) => write!(f, "{}.{}.{}", v.major, v.minor, v.patch),
            ReleaseVersion::Default => write!(f, "default"),
        }
    }
}

impl FromStr for ReleaseVersion {
    type Err = UpmergeError;

    fn from_str(s: &str) -> Result<Self> {
        ReleaseVersion::parse(s.trim(), None).ok_or_else(|| {
            UpmergeError::version(format!(
                "'{}' is not a release version (expected N, N.N, N.N.N, main or master)",
                s
            ))
        })
    }
}

impl Serialize for ReleaseVersion {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}
