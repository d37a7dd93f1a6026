//! Merge ordering over classified branches.
//!
//! The release chain is a strict ascending sequence ending at the default
//! branch. Each customer chain runs alongside it: every customer branch
//! receives the previous branch of the same customer and the release branch
//! of the same version.

use crate::domain::branch::BranchRecord;
use crate::domain::version::ReleaseVersion;
use crate::error::{Result, UpmergeError};
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;

/// Ordered branch records that take part in one run
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct MergePlan {
    records: Vec<BranchRecord>,
}

impl MergePlan {
    pub fn records(&self) -> &[BranchRecord] {
        &self.records
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Release-chain members (including the default branch), ascending
    pub fn releases(&self) -> impl Iterator<Item = &BranchRecord> {
        self.records.iter().filter(|r| !r.is_customer())
    }

    /// Customer chains keyed by customer name, each ascending
    pub fn customer_chains(&self) -> BTreeMap<&str, Vec<&BranchRecord>> {
        let mut chains: BTreeMap<&str, Vec<&BranchRecord>> = BTreeMap::new();
        for record in &self.records {
            if let Some(customer) = record.customer.as_deref() {
                chains.entry(customer).or_default().push(record);
            }
        }
        chains
    }

    /// Keep only records named in `branches` (short or remote-qualified names)
    pub fn retain_branches(&mut self, branches: &[String]) {
        self.records.retain(|r| {
            branches
                .iter()
                .any(|b| b == r.short_name() || *b == r.remote_name)
        });
    }
}

/// One ordered merge: `source` is merged into `target`
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MergePair {
    pub source: BranchRecord,
    pub target: BranchRecord,
}

impl MergePair {
    pub fn new(source: &BranchRecord, target: &BranchRecord) -> Self {
        MergePair {
            source: source.clone(),
            target: target.clone(),
        }
    }
}

impl fmt::Display for MergePair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} → {}", self.source.remote_name, self.target.remote_name)
    }
}

/// Filter records below `starting_release` and order the rest.
///
/// Records sort ascending by version; on a version tie a release record
/// comes before a customer record. Remaining ties break on customer and
/// branch name so the output is stable for identical input.
pub fn build_plan(records: Vec<BranchRecord>, starting_release: &ReleaseVersion) -> MergePlan {
    let mut records: Vec<BranchRecord> = records
        .into_iter()
        .filter(|r| r.version >= *starting_release)
        .collect();

    records.sort_by(|a, b| {
        a.version
            .cmp(&b.version)
            .then_with(|| a.is_customer().cmp(&b.is_customer()))
            .then_with(|| a.customer.cmp(&b.customer))
            .then_with(|| a.remote_name.cmp(&b.remote_name))
    });

    MergePlan { records }
}

fn ensure_strictly_ascending(chain: &[&BranchRecord], label: &str) -> Result<()> {
    for window in chain.windows(2) {
        if window[0].version == window[1].version {
            return Err(UpmergeError::planning(format!(
                "{} branches '{}' and '{}' share version {}; remove one before upmerging",
                label, window[0].remote_name, window[1].remote_name, window[0].version
            )));
        }
    }
    Ok(())
}

/// Customer branches with no release branch of the same version
pub fn release_gaps(plan: &MergePlan) -> Vec<&BranchRecord> {
    plan.records
        .iter()
        .filter(|c| c.is_customer())
        .filter(|c| !plan.releases().any(|r| r.version == c.version))
        .collect()
}

/// Generate the ordered merge pairs for a plan.
///
/// Release pairs come first, then each customer's pairs in ascending
/// version order. A customer branch without a release of the same version
/// only gets its horizontal pair; a customer with no release pairing at all
/// is a planning error.
pub fn build_pairs(plan: &MergePlan) -> Result<Vec<MergePair>> {
    let releases: Vec<&BranchRecord> = plan.releases().collect();
    ensure_strictly_ascending(&releases, "release")?;

    let mut pairs: Vec<MergePair> = releases
        .windows(2)
        .map(|w| MergePair::new(w[0], w[1]))
        .collect();

    for (customer, chain) in plan.customer_chains() {
        ensure_strictly_ascending(&chain, &format!("customer '{}'", customer))?;

        let mut has_release_pairing = false;
        let mut previous: Option<&BranchRecord> = None;

        for branch in chain.iter().copied() {
            if let Some(previous) = previous {
                pairs.push(MergePair::new(previous, branch));
            }

            match releases.iter().find(|r| r.version == branch.version) {
                Some(release) => {
                    has_release_pairing = true;
                    pairs.push(MergePair::new(release, branch));
                }
                None => {
                    tracing::warn!(
                        branch = %branch.remote_name,
                        version = %branch.version,
                        "no release branch with the same version; skipping release pairing"
                    );
                }
            }

            previous = Some(branch);
        }

        if !has_release_pairing {
            return Err(UpmergeError::planning(format!(
                "no matching release branch for any branch of customer '{}'",
                customer
            )));
        }
    }

    Ok(pairs)
}
