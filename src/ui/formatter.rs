//! Formatting functions for UI output.
//!
//! `format_*` functions build the text and are pure; `display_*` functions
//! print it. Styling goes through `console`, which drops colors when the
//! output is not a terminal.

use crate::analyzer::{AnalysisReport, PendingDetail, PendingMergeReport, ReportMode};
use crate::cli::orchestration::UpmergeSummary;
use crate::domain::MergePair;
use crate::merge::StepOutcome;
use crate::warning::UpmergeWarning;
use console::style;

/// Format and print an error message in red.
pub fn display_error(message: &str) {
    eprintln!("{} {}", style("ERROR:").red().bold(), message);
}

/// Format and print a success message with green checkmark.
pub fn display_success(message: &str) {
    println!("{} {}", style("✓").green(), message);
}

/// Format and print a status message with yellow arrow.
pub fn display_status(message: &str) {
    println!("{} {}", style("→").yellow(), message);
}

/// Display a non-fatal warning.
pub fn display_warning(warning: &UpmergeWarning) {
    eprintln!("{} {}", style("⚠ WARNING:").yellow(), warning);
}

/// One numbered line per merge pair
pub fn format_plan(pairs: &[MergePair]) -> String {
    if pairs.is_empty() {
        return "Nothing to merge: the plan has a single branch".to_string();
    }
    let mut out = format!("{}", style(format!("Merge plan ({} steps):", pairs.len())).bold());
    for (i, pair) in pairs.iter().enumerate() {
        out.push_str(&format!("\n  {:>2}. {}", i + 1, pair));
    }
    out
}

pub fn display_plan(pairs: &[MergePair]) {
    println!("{}", format_plan(pairs));
}

pub fn format_step(outcome: &StepOutcome) -> String {
    let state = if outcome.up_to_date {
        "already up to date"
    } else if outcome.pushed {
        "merged and pushed"
    } else {
        "merged locally"
    };
    let mut out = format!("{}: {}", outcome.pair, state);
    for file in &outcome.files {
        out.push_str(&format!("\n    {}", style(file).dim()));
    }
    out
}

/// Print the result of one merge step.
pub fn display_step(outcome: &StepOutcome) {
    println!("{} {}", style("✓").green(), format_step(outcome));
}

/// Header plus commit or author lines for one pair
pub fn format_pending_report(report: &PendingMergeReport) -> String {
    let header = format!("{} → {}", report.source, report.target);
    if report.is_up_to_date() {
        return format!("{} {}", style(header).bold(), style("up to date").green());
    }

    let noun = if report.commit_count == 1 {
        "commit"
    } else {
        "commits"
    };
    let mut out = format!(
        "{} {}",
        style(header).bold(),
        style(format!("{} pending {}", report.commit_count, noun)).red()
    );

    match &report.detail {
        PendingDetail::Commits(commits) => {
            for commit in commits {
                out.push_str(&format!(
                    "\n  {} {} {} <{}> {}",
                    style(commit.short_hash()).yellow(),
                    commit.date.format("%Y-%m-%d"),
                    commit.author_name,
                    commit.author_email,
                    commit.message
                ));
            }
        }
        PendingDetail::ByAuthor(authors) => {
            for author in authors {
                out.push_str(&format!(
                    "\n  {:>4}  {} <{}>",
                    author.commit_count, author.name, author.email
                ));
            }
        }
    }
    out
}

pub fn display_pending_report(report: &PendingMergeReport) {
    println!("{}", format_pending_report(report));
}

/// Print an analysis in its report mode
pub fn display_analysis(report: &AnalysisReport) {
    for pair in report.visible() {
        println!("{}", format_pending_report(pair));
    }

    let pending: Vec<&PendingMergeReport> = report.pending().collect();
    if pending.is_empty() {
        display_success("All branches are up to date");
    } else if report.mode == ReportMode::Gate {
        display_error(&format!(
            "{} pending commit(s) across {} merge(s)",
            report.total_pending_commits(),
            pending.len()
        ));
    }
}

/// Final lines of a successful upmerge
pub fn display_upmerge_summary(summary: &UpmergeSummary) {
    for warning in &summary.warnings {
        display_warning(warning);
    }
    display_success(&format!(
        "Upmerge from {} complete: {} step(s), {} pushed",
        summary.starting_release,
        summary.steps.len(),
        summary.pushed_count()
    ));
}
