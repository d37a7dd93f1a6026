use crate::analyzer::{PendingMergeAnalyzer, PendingMergeReport, DEFAULT_DETAIL_LIMIT};
use crate::domain::MergePair;
use crate::error::{Result, UpmergeError};
use crate::git::{MergeOptions, Repository};
use crate::merge::{MergeStep, Phase, SourceRef, TempBranchToken};
use crate::ui;
use crate::warning::UpmergeWarning;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// What happened in one completed merge step
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StepOutcome {
    pub pair: MergePair,
    /// The target already contained the source
    pub up_to_date: bool,
    pub pushed: bool,
    /// Files touched by the merge (only with `show_files`)
    pub files: Vec<String>,
    /// Commits that were pending before the merge (only with `show_details`)
    pub pending: Option<PendingMergeReport>,
}

/// Result of walking a list of merge pairs
#[derive(Debug, Default)]
pub struct ExecutionReport {
    /// Completed steps in execution order
    pub steps: Vec<StepOutcome>,
    /// Cleanup problems; never the primary failure
    pub warnings: Vec<UpmergeWarning>,
    /// Temporary branches created during the run
    pub temp_branches: Vec<String>,
    /// The failure that stopped the chain, if any
    pub error: Option<UpmergeError>,
}

impl ExecutionReport {
    pub fn is_success(&self) -> bool {
        self.error.is_none()
    }

    pub fn pushed_count(&self) -> usize {
        self.steps.iter().filter(|s| s.pushed).count()
    }

    fn failed(error: UpmergeError) -> Self {
        ExecutionReport {
            error: Some(error),
            ..ExecutionReport::default()
        }
    }
}

/// Executes merge pairs in order through temporary branches.
///
/// Each record gets at most one temporary branch per run, created from its
/// remote branch the first time the record is a merge target. A source that
/// has no temporary branch yet is merged straight from its remote-tracking
/// branch; otherwise the temporary branch (holding this run's earlier
/// merges) is used. The first failing step stops the chain. Cleanup always
/// restores the original branch and deletes the temporary branches.
pub struct MergeExecutor<'a, R: Repository> {
    repo: &'a R,
    remote: String,
    token: TempBranchToken,
    push: bool,
    show_files: bool,
    show_details: bool,
    detail_limit: usize,
    cancel: Option<Arc<AtomicBool>>,
}

impl<'a, R: Repository> MergeExecutor<'a, R> {
    pub fn new(repo: &'a R, remote: impl Into<String>, token: TempBranchToken) -> Self {
        MergeExecutor {
            repo,
            remote: remote.into(),
            token,
            push: true,
            show_files: false,
            show_details: false,
            detail_limit: DEFAULT_DETAIL_LIMIT,
            cancel: None,
        }
    }

    pub fn with_push(mut self, push: bool) -> Self {
        self.push = push;
        self
    }

    pub fn with_show_files(mut self, show_files: bool) -> Self {
        self.show_files = show_files;
        self
    }

    pub fn with_show_details(mut self, show_details: bool, detail_limit: usize) -> Self {
        self.show_details = show_details;
        self.detail_limit = detail_limit;
        self
    }

    /// Stop before the next step once `flag` is set
    pub fn with_cancel_flag(mut self, flag: Arc<AtomicBool>) -> Self {
        self.cancel = Some(flag);
        self
    }

    fn is_cancelled(&self) -> bool {
        self.cancel
            .as_ref()
            .is_some_and(|flag| flag.load(Ordering::SeqCst))
    }

    /// Run every pair, then clean up
    pub fn execute(&self, pairs: &[MergePair]) -> ExecutionReport {
        let original = match self.repo.status().and_then(|status| {
            status.current.ok_or_else(|| {
                UpmergeError::precondition("HEAD is detached; check out a branch first")
            })
        }) {
            Ok(branch) => branch,
            Err(e) => {
                Phase::Planned.advance(Phase::Failed);
                return ExecutionReport::failed(e);
            }
        };

        let mut phase = Phase::Planned.advance(Phase::Merging);
        let mut report = ExecutionReport::default();
        let mut temps: HashMap<String, String> = HashMap::new();

        let result = self.run_steps(pairs, &mut temps, &mut report);

        phase = phase.advance(Phase::Restoring);
        report.warnings = self.cleanup(&original, &report.temp_branches);

        match result {
            Ok(()) => {
                phase.advance(Phase::Done);
            }
            Err(e) => {
                phase.advance(Phase::Failed);
                report.error = Some(e);
            }
        }
        report
    }

    fn run_steps(
        &self,
        pairs: &[MergePair],
        temps: &mut HashMap<String, String>,
        report: &mut ExecutionReport,
    ) -> Result<()> {
        for pair in pairs {
            if self.is_cancelled() {
                return Err(UpmergeError::precondition(format!(
                    "Cancelled before merging {}",
                    pair
                )));
            }

            let step = self.prepare_step(pair, temps, report)?;
            let outcome = self.run_step(&step)?;
            ui::display_step(&outcome);
            report.steps.push(outcome);
        }
        Ok(())
    }

    /// Resolve the source reference and check out the target's temporary branch
    fn prepare_step(
        &self,
        pair: &MergePair,
        temps: &mut HashMap<String, String>,
        report: &mut ExecutionReport,
    ) -> Result<MergeStep> {
        let source_ref = match temps.get(&pair.source.remote_name) {
            Some(temp) => SourceRef::Temp(temp.clone()),
            None => SourceRef::Remote {
                remote: self.remote.clone(),
                branch: pair.source.short_name().to_string(),
            },
        };

        let target_branch = match temps.get(&pair.target.remote_name) {
            Some(temp) => {
                self.repo
                    .checkout_branch(temp, None)
                    .map_err(|e| step_error(pair, e))?;
                temp.clone()
            }
            None => {
                let temp = self.token.branch_name(&pair.target);
                self.repo
                    .checkout_branch(&temp, Some(&pair.target.remote_name))
                    .map_err(|e| step_error(pair, e))?;
                report.temp_branches.push(temp.clone());
                temps.insert(pair.target.remote_name.clone(), temp.clone());
                temp
            }
        };

        tracing::debug!(%pair, source = %source_ref, target = %target_branch, "prepared merge step");

        Ok(MergeStep {
            pair: pair.clone(),
            source_ref,
            target_branch,
        })
    }

    fn run_step(&self, step: &MergeStep) -> Result<StepOutcome> {
        let pair = &step.pair;
        let pending = if self.show_details {
            let mut pending = PendingMergeAnalyzer::new(self.repo)
                .with_detail_limit(self.detail_limit)
                .analyze_refs(&step.source_ref.to_string(), &step.target_branch)?;
            pending.source = pair.source.remote_name.clone();
            pending.target = pair.target.remote_name.clone();
            ui::display_pending_report(&pending);
            Some(pending)
        } else {
            None
        };

        let (remote, branch) = match &step.source_ref {
            SourceRef::Remote { remote, branch } => (Some(remote.as_str()), branch.as_str()),
            SourceRef::Temp(name) => (None, name.as_str()),
        };
        let options = MergeOptions {
            no_fast_forward: true,
            no_commit: false,
            list_files: self.show_files,
        };
        let summary = self
            .repo
            .merge(remote, branch, &options)
            .map_err(|e| step_error(pair, e))?;

        let pushed = if self.push && !summary.up_to_date {
            self.repo
                .push(&self.remote, &step.push_refspec())
                .map_err(|e| {
                    UpmergeError::merge(
                        &pair.source.remote_name,
                        &pair.target.remote_name,
                        format!("push failed: {}", e),
                    )
                })?;
            true
        } else {
            false
        };

        Ok(StepOutcome {
            pair: pair.clone(),
            up_to_date: summary.up_to_date,
            pushed,
            files: summary.files,
            pending,
        })
    }

    fn cleanup(&self, original: &str, temp_branches: &[String]) -> Vec<UpmergeWarning> {
        let mut warnings = Vec::new();

        if let Err(e) = self.repo.checkout_branch(original, None) {
            tracing::warn!(branch = %original, error = %e, "could not restore original branch");
            warnings.push(UpmergeWarning::RestoreFailed {
                branch: original.to_string(),
                reason: e.to_string(),
            });
        }

        for branch in temp_branches {
            if let Err(e) = self.repo.delete_branch(branch) {
                tracing::warn!(%branch, error = %e, "could not delete temporary branch");
                warnings.push(UpmergeWarning::CleanupFailed {
                    branch: branch.clone(),
                    reason: e.to_string(),
                });
            }
        }

        warnings
    }
}

fn step_error(pair: &MergePair, error: UpmergeError) -> UpmergeError {
    UpmergeError::merge(
        &pair.source.remote_name,
        &pair.target.remote_name,
        error.to_string(),
    )
}
