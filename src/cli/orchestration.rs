//! Upmerge and check workflows
//!
//! These functions hold the business flow behind the `merge` and `check`
//! subcommands, independent of clap, so they can be driven against any
//! [Repository] implementation.

use crate::analyzer::{AnalysisReport, PendingMergeAnalyzer};
use crate::config::{CheckOptions, UpmergeOptions};
use crate::domain::{
    build_pairs, build_plan, classify, release_gaps, release_of_local_branch, MergePair,
    MergePlan, ReleaseVersion,
};
use crate::error::{Result, UpmergeError};
use crate::git::{RepoStatus, Repository};
use crate::merge::{MergeExecutor, Phase, StepOutcome, TempBranchToken};
use crate::ui;
use crate::warning::UpmergeWarning;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;

/// Result of a successful upmerge run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpmergeSummary {
    pub starting_release: ReleaseVersion,
    pub token: TempBranchToken,
    pub pairs: Vec<MergePair>,
    pub steps: Vec<StepOutcome>,
    /// Planning and cleanup warnings
    pub warnings: Vec<UpmergeWarning>,
}

impl UpmergeSummary {
    pub fn pushed_count(&self) -> usize {
        self.steps.iter().filter(|s| s.pushed).count()
    }
}

/// Result of a pending-merge check
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckOutcome {
    pub plan: MergePlan,
    pub pairs: Vec<MergePair>,
    pub report: AnalysisReport,
    pub warnings: Vec<UpmergeWarning>,
}

impl CheckOutcome {
    pub fn has_pending(&self) -> bool {
        self.report.has_pending()
    }

    /// Process exit code: 1 when merges are pending
    pub fn exit_code(&self) -> i32 {
        if self.has_pending() {
            1
        } else {
            0
        }
    }
}

/// Run the upmerge workflow:
/// 1. Fetch the remote
/// 2. Require a clean working copy that is not behind its upstream
/// 3. Resolve the starting release (explicit or from the current branch)
/// 4. Classify branches, build the plan and its pairs, validate tracking state
/// 5. Execute the merges, then restore the original branch and clean up
pub fn run_upmerge<R: Repository>(
    repo: &R,
    options: &UpmergeOptions,
    token: TempBranchToken,
) -> Result<UpmergeSummary> {
    run_upmerge_with_cancel(repo, options, token, None)
}

/// [run_upmerge] with a flag that stops the run between merge steps
pub fn run_upmerge_with_cancel<R: Repository>(
    repo: &R,
    options: &UpmergeOptions,
    token: TempBranchToken,
    cancel: Option<Arc<AtomicBool>>,
) -> Result<UpmergeSummary> {
    let mut phase = Phase::Init;
    let prepared = match prepare_upmerge(repo, options, &mut phase) {
        Ok(prepared) => prepared,
        Err(e) => {
            phase.advance(Phase::Failed);
            return Err(e);
        }
    };
    let PreparedRun {
        starting_release,
        pairs,
        mut warnings,
    } = prepared;

    ui::display_plan(&pairs);
    for warning in &warnings {
        ui::display_warning(warning);
    }

    let mut executor = MergeExecutor::new(repo, options.remote.as_str(), token.clone())
        .with_push(options.push)
        .with_show_files(options.show_files)
        .with_show_details(options.show_details, options.detail_limit);
    if let Some(flag) = cancel {
        executor = executor.with_cancel_flag(flag);
    }

    let report = executor.execute(&pairs);
    if let Some(error) = report.error {
        for warning in &report.warnings {
            ui::display_warning(warning);
        }
        return Err(error);
    }

    warnings.extend(report.warnings);
    Ok(UpmergeSummary {
        starting_release,
        token,
        pairs,
        steps: report.steps,
        warnings,
    })
}

/// Everything decided before the first branch is touched
struct PreparedRun {
    starting_release: ReleaseVersion,
    pairs: Vec<MergePair>,
    warnings: Vec<UpmergeWarning>,
}

/// Validate, fetch, check the working copy, resolve the release and plan
/// the pairs. `phase` is left at the last stage reached.
fn prepare_upmerge<R: Repository>(
    repo: &R,
    options: &UpmergeOptions,
    phase: &mut Phase,
) -> Result<PreparedRun> {
    options.validate()?;
    repo.fetch(&options.remote)?;
    *phase = phase.advance(Phase::Fetched);

    let status = repo.status()?;
    let current = ensure_ready(&status)?;
    *phase = phase.advance(Phase::CheckedClean);

    let starting_release = match options.starting_release()? {
        Some(release) => release,
        None => release_of_local_branch(&current).ok_or_else(|| {
            UpmergeError::precondition(format!(
                "Cannot infer a release from branch '{}'; pass the starting release explicitly",
                current
            ))
        })?,
    };
    *phase = phase.advance(Phase::ReleaseResolved);
    tracing::debug!(release = %starting_release, customers = %options.customers, "resolved starting release");

    let raw = repo.list_branches()?;
    let records = classify(&options.remote, &raw, &options.customers)?;
    let plan = build_plan(records, &starting_release);
    if plan.is_empty() {
        return Err(UpmergeError::planning(format!(
            "No release branches at or above {} on '{}'",
            starting_release, options.remote
        )));
    }

    let mut warnings = validate_tracking(&plan)?;
    warnings.extend(gap_warnings(&plan));
    let pairs = build_pairs(&plan)?;
    *phase = phase.advance(Phase::Planned);

    Ok(PreparedRun {
        starting_release,
        pairs,
        warnings,
    })
}

/// Run the pending-merge check. Read-only apart from the optional fetch.
pub fn run_check<R: Repository>(repo: &R, options: &CheckOptions) -> Result<CheckOutcome> {
    options.validate()?;

    if options.fetch {
        repo.fetch(&options.remote)?;
    }

    let starting_release = options.starting_release()?;
    let raw = repo.list_branches()?;
    let records = classify(&options.remote, &raw, &options.effective_customers())?;
    let mut plan = build_plan(records, &starting_release);

    if !options.branches.is_empty() {
        for branch in &options.branches {
            let known = plan
                .records()
                .iter()
                .any(|r| r.short_name() == branch.as_str() || &r.remote_name == branch);
            if !known {
                return Err(UpmergeError::planning(format!(
                    "Branch '{}' is not a release or customer branch on '{}' at or above {}",
                    branch, options.remote, starting_release
                )));
            }
        }
        plan.retain_branches(&options.branches);
    }

    let warnings = gap_warnings(&plan);
    let pairs = build_pairs(&plan)?;
    let report = PendingMergeAnalyzer::new(repo)
        .with_detail_limit(options.detail_limit)
        .analyze(&pairs, options.mode)?;

    Ok(CheckOutcome {
        plan,
        pairs,
        report,
        warnings,
    })
}

/// Current branch of a clean working copy that is not behind its upstream
fn ensure_ready(status: &RepoStatus) -> Result<String> {
    let current = status.current.clone().ok_or_else(|| {
        UpmergeError::precondition("HEAD is detached; check out a branch first")
    })?;

    if !status.is_clean() {
        return Err(UpmergeError::precondition(format!(
            "Working copy has {} uncommitted or untracked file(s); commit or stash them first",
            status.change_count()
        )));
    }

    if status.behind > 0 {
        return Err(UpmergeError::precondition(format!(
            "'{}' is {} commit(s) behind {}; pull first",
            current,
            status.behind,
            status.tracking.as_deref().unwrap_or("its upstream")
        )));
    }

    Ok(current)
}

/// Reject gone or diverged local branches; warn about unpushed ones
fn validate_tracking(plan: &MergePlan) -> Result<Vec<UpmergeWarning>> {
    let mut problems = Vec::new();
    let mut warnings = Vec::new();

    for record in plan.records() {
        if record.is_gone {
            problems.push(format!("'{}' no longer exists on the remote", record.remote_name));
        } else if record.is_diverged() {
            problems.push(format!(
                "local '{}' has diverged from '{}' ({} ahead, {} behind)",
                record.short_name(),
                record.remote_name,
                record.ahead,
                record.behind
            ));
        } else if record.ahead > 0 {
            warnings.push(UpmergeWarning::UnpushedLocalCommits {
                branch: record.short_name().to_string(),
                ahead: record.ahead,
            });
        }
    }

    if !problems.is_empty() {
        return Err(UpmergeError::planning(format!(
            "Cannot upmerge: {}",
            problems.join("; ")
        )));
    }
    Ok(warnings)
}

fn gap_warnings(plan: &MergePlan) -> Vec<UpmergeWarning> {
    release_gaps(plan)
        .into_iter()
        .map(|record| UpmergeWarning::ReleaseGap {
            branch: record.remote_name.clone(),
            version: record.version.to_string(),
        })
        .collect()
}
