//! Read-only analysis of merges that are still outstanding

pub mod pending;

pub use pending::{
    AnalysisReport, PendingDetail, PendingMergeAnalyzer, PendingMergeReport, ReportMode,
    DEFAULT_DETAIL_LIMIT,
};
