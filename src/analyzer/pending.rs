use crate::domain::{group_by_author, parse_log, AuthorInfo, CommitInfo, MergePair, LOG_FORMAT};
use crate::error::Result;
use crate::git::Repository;
use serde::Serialize;

/// Pairs with more pending commits than this are summarized per author
pub const DEFAULT_DETAIL_LIMIT: usize = 10;

/// How an analysis is presented
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ReportMode {
    /// Every pair, including up-to-date ones
    #[default]
    Narrate,
    /// Only pairs with pending commits
    Gate,
}

/// Pending commits of one pair, either listed or summarized
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "items", rename_all = "snake_case")]
pub enum PendingDetail {
    Commits(Vec<CommitInfo>),
    ByAuthor(Vec<AuthorInfo>),
}

/// Commits on `source` that have not reached `target`
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PendingMergeReport {
    pub source: String,
    pub target: String,
    pub commit_count: usize,
    pub detail: PendingDetail,
}

impl PendingMergeReport {
    pub fn is_up_to_date(&self) -> bool {
        self.commit_count == 0
    }
}

/// Reports for every analyzed pair, in plan order
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AnalysisReport {
    pub mode: ReportMode,
    pub pairs: Vec<PendingMergeReport>,
}

impl AnalysisReport {
    /// At least one pair has pending commits
    pub fn has_pending(&self) -> bool {
        self.pairs.iter().any(|p| !p.is_up_to_date())
    }

    pub fn pending(&self) -> impl Iterator<Item = &PendingMergeReport> {
        self.pairs.iter().filter(|p| !p.is_up_to_date())
    }

    /// Pairs shown in this report's mode
    pub fn visible(&self) -> Vec<&PendingMergeReport> {
        match self.mode {
            ReportMode::Narrate => self.pairs.iter().collect(),
            ReportMode::Gate => self.pending().collect(),
        }
    }

    pub fn total_pending_commits(&self) -> usize {
        self.pairs.iter().map(|p| p.commit_count).sum()
    }
}

/// Read-only analysis of merge pairs through commit-range queries
pub struct PendingMergeAnalyzer<'a, R: Repository> {
    repo: &'a R,
    detail_limit: usize,
}

impl<'a, R: Repository> PendingMergeAnalyzer<'a, R> {
    pub fn new(repo: &'a R) -> Self {
        PendingMergeAnalyzer {
            repo,
            detail_limit: DEFAULT_DETAIL_LIMIT,
        }
    }

    /// Pairs with more than `limit` commits are aggregated by author
    pub fn with_detail_limit(mut self, limit: usize) -> Self {
        self.detail_limit = limit.max(1);
        self
    }

    /// Commits reachable from `source` but not from `target`
    pub fn analyze_refs(&self, source: &str, target: &str) -> Result<PendingMergeReport> {
        let range = format!("{}..{}", target, source);
        let output = self.repo.raw_command(&["log", LOG_FORMAT, &range])?;
        let commits = parse_log(&output)?;
        let commit_count = commits.len();

        tracing::debug!(%range, commit_count, "analyzed commit range");

        let detail = if commit_count > self.detail_limit {
            PendingDetail::ByAuthor(group_by_author(&commits))
        } else {
            PendingDetail::Commits(commits)
        };

        Ok(PendingMergeReport {
            source: source.to_string(),
            target: target.to_string(),
            commit_count,
            detail,
        })
    }

    pub fn analyze_pair(&self, pair: &MergePair) -> Result<PendingMergeReport> {
        self.analyze_refs(&pair.source.remote_name, &pair.target.remote_name)
    }

    /// Analyze every pair in order. Any unparseable log output fails the call.
    pub fn analyze(&self, pairs: &[MergePair], mode: ReportMode) -> Result<AnalysisReport> {
        let pairs = pairs
            .iter()
            .map(|pair| self.analyze_pair(pair))
            .collect::<Result<Vec<_>>>()?;
        Ok(AnalysisReport { mode, pairs })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::git::MockRepository;

    fn log_line(i: usize, email: &str) -> String {
        format!(
            "{:040x}\u{1f}Dev {}\u{1f}{}\u{1f}2024-01-0{}T12:00:00Z\u{1f}change {}",
            i,
            email,
            email,
            (i % 9) + 1,
            i
        )
    }

    #[test]
    fn test_empty_range_is_up_to_date() {
        let repo = MockRepository::new("main");
        let analyzer = PendingMergeAnalyzer::new(&repo);
        let report = analyzer.analyze_refs("origin/release/1.0", "origin/main").unwrap();

        assert!(report.is_up_to_date());
        assert_eq!(report.detail, PendingDetail::Commits(vec![]));
        assert_eq!(
            repo.calls(),
            vec![format!("raw log {} origin/main..origin/release/1.0", LOG_FORMAT)]
        );
    }

    #[test]
    fn test_limit_switches_to_author_summary() {
        let output: Vec<String> = (1..=3).map(|i| log_line(i, "a@x")).collect();
        let repo = MockRepository::new("main").with_log("t..s", &output.join("\n"));

        let listed = PendingMergeAnalyzer::new(&repo)
            .with_detail_limit(3)
            .analyze_refs("s", "t")
            .unwrap();
        assert!(matches!(listed.detail, PendingDetail::Commits(ref c) if c.len() == 3));

        let summarized = PendingMergeAnalyzer::new(&repo)
            .with_detail_limit(2)
            .analyze_refs("s", "t")
            .unwrap();
        assert_eq!(summarized.commit_count, 3);
        assert!(matches!(summarized.detail, PendingDetail::ByAuthor(ref a) if a[0].commit_count == 3));
    }

    #[test]
    fn test_gate_mode_hides_up_to_date_pairs() {
        let report = AnalysisReport {
            mode: ReportMode::Gate,
            pairs: vec![
                PendingMergeReport {
                    source: "a".to_string(),
                    target: "b".to_string(),
                    commit_count: 0,
                    detail: PendingDetail::Commits(vec![]),
                },
                PendingMergeReport {
                    source: "b".to_string(),
                    target: "c".to_string(),
                    commit_count: 12,
                    detail: PendingDetail::ByAuthor(vec![]),
                },
            ],
        };
        assert!(report.has_pending());
        assert_eq!(report.visible().len(), 1);
        assert_eq!(report.total_pending_commits(), 12);

        let narrated = AnalysisReport {
            mode: ReportMode::Narrate,
            ..report
        };
        assert_eq!(narrated.visible().len(), 2);
    }

    #[test]
    fn test_malformed_log_fails_analysis() {
        let repo = MockRepository::new("main").with_log("t..s", "not a log record");
        assert!(PendingMergeAnalyzer::new(&repo).analyze_refs("s", "t").is_err());
    }
}
