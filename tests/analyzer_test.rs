// tests/analyzer_test.rs
use upmerge::analyzer::{PendingDetail, ReportMode};
use upmerge::cli::run_check;
use upmerge::config::CheckOptions;
use upmerge::domain::CustomerFilter;
use upmerge::git::MockRepository;
use upmerge::UpmergeError;

const BRANCHES: &[&str] = &[
    "origin/release/1.0",
    "origin/release/2.0",
    "origin/main",
    "origin/customer/acme/1.0",
    "origin/customer/acme/2.0",
];

fn log_line(index: usize, name: &str, email: &str) -> String {
    format!(
        "{:040x}\u{1f}{}\u{1f}{}\u{1f}2024-02-{:02}T08:30:00+02:00\u{1f}Fix issue #{}",
        index,
        name,
        email,
        (index % 28) + 1,
        index
    )
}

fn log_of(authors: &[(&str, &str, usize)]) -> String {
    let mut lines = Vec::new();
    let mut index = 1;
    for (name, email, count) in authors {
        for _ in 0..*count {
            lines.push(log_line(index, name, email));
            index += 1;
        }
    }
    lines.join("\n") + "\n"
}

fn repo() -> MockRepository {
    MockRepository::new("main").with_remote_branches(BRANCHES)
}

#[test]
fn test_up_to_date_repository_passes() {
    let repo = repo();
    let outcome = run_check(&repo, &CheckOptions::default()).unwrap();

    assert!(!outcome.has_pending());
    assert_eq!(outcome.exit_code(), 0);
    assert_eq!(outcome.report.pairs.len(), 2);
    assert!(outcome.report.pairs.iter().all(|p| p.is_up_to_date()));
    assert_eq!(repo.calls()[0], "fetch origin");
}

#[test]
fn test_small_backlog_lists_commits() {
    let repo = repo().with_log(
        "origin/release/2.0..origin/release/1.0",
        &log_of(&[("Ada", "ada@x", 2), ("Bob", "bob@x", 1)]),
    );

    let outcome = run_check(&repo, &CheckOptions::default()).unwrap();
    assert!(outcome.has_pending());
    assert_eq!(outcome.exit_code(), 1);

    let first = &outcome.report.pairs[0];
    assert_eq!(first.source, "origin/release/1.0");
    assert_eq!(first.target, "origin/release/2.0");
    assert_eq!(first.commit_count, 3);
    match &first.detail {
        PendingDetail::Commits(commits) => {
            assert_eq!(commits.len(), 3);
            assert_eq!(commits[2].author_name, "Bob");
            assert_eq!(commits[0].message, "Fix issue #1");
        }
        other => panic!("expected commit list, got {:?}", other),
    }
    assert!(outcome.report.pairs[1].is_up_to_date());
}

#[test]
fn test_ten_commits_are_still_listed() {
    let repo = repo().with_log(
        "origin/main..origin/release/2.0",
        &log_of(&[("Ada", "ada@x", 10)]),
    );
    let outcome = run_check(&repo, &CheckOptions::default()).unwrap();
    assert!(matches!(
        &outcome.report.pairs[1].detail,
        PendingDetail::Commits(commits) if commits.len() == 10
    ));
}

#[test]
fn test_large_backlog_aggregates_by_author() {
    let repo = repo().with_log(
        "origin/main..origin/release/2.0",
        &log_of(&[("Carol", "carol@x", 2), ("Ada", "ada@x", 6), ("Bob", "bob@x", 4)]),
    );

    let outcome = run_check(&repo, &CheckOptions::default()).unwrap();
    let pair = &outcome.report.pairs[1];
    assert_eq!(pair.commit_count, 12);

    match &pair.detail {
        PendingDetail::ByAuthor(authors) => {
            let counts: Vec<(&str, usize)> = authors
                .iter()
                .map(|a| (a.name.as_str(), a.commit_count))
                .collect();
            assert_eq!(counts, vec![("Ada", 6), ("Bob", 4), ("Carol", 2)]);
        }
        other => panic!("expected author summary, got {:?}", other),
    }
}

#[test]
fn test_analysis_is_idempotent() {
    let repo = repo().with_log(
        "origin/main..origin/release/2.0",
        &log_of(&[("Ada", "ada@x", 11)]),
    );
    let options = CheckOptions::default();

    let first = run_check(&repo, &options).unwrap();
    let second = run_check(&repo, &options).unwrap();
    assert_eq!(first, second);
    assert!(repo.calls_starting_with("checkout").is_empty());
    assert!(repo.calls_starting_with("merge").is_empty());
    assert!(repo.calls_starting_with("push").is_empty());
}

#[test]
fn test_gate_mode_shows_only_pending_pairs() {
    let repo = repo().with_log(
        "origin/main..origin/release/2.0",
        &log_of(&[("Ada", "ada@x", 1)]),
    );
    let options = CheckOptions {
        mode: ReportMode::Gate,
        ..CheckOptions::default()
    };

    let outcome = run_check(&repo, &options).unwrap();
    let visible = outcome.report.visible();
    assert_eq!(visible.len(), 1);
    assert_eq!(visible[0].target, "origin/main");
}

#[test]
fn test_branch_list_restricts_plan() {
    let repo = repo();
    let options = CheckOptions {
        branches: vec![
            "release/2.0".to_string(),
            "origin/customer/acme/2.0".to_string(),
        ],
        ..CheckOptions::default()
    };

    let outcome = run_check(&repo, &options).unwrap();
    assert_eq!(outcome.plan.len(), 2);
    assert_eq!(outcome.pairs.len(), 1);
    assert_eq!(outcome.pairs[0].source.short_name(), "release/2.0");
    assert_eq!(outcome.pairs[0].target.short_name(), "customer/acme/2.0");
}

#[test]
fn test_release_threshold_and_customer_filter() {
    let repo = repo();
    let options = CheckOptions {
        release: Some("2.0".to_string()),
        customers: CustomerFilter::Only("acme".to_string()),
        ..CheckOptions::default()
    };

    let outcome = run_check(&repo, &options).unwrap();
    let names: Vec<String> = outcome.pairs.iter().map(|p| p.to_string()).collect();
    assert_eq!(
        names,
        vec![
            "origin/release/2.0 → origin/main",
            "origin/release/2.0 → origin/customer/acme/2.0",
        ]
    );
}

#[test]
fn test_malformed_log_fails_the_check() {
    let repo = repo().with_log(
        "origin/main..origin/release/2.0",
        "0123abcd\u{1f}Ada\u{1f}ada@x\u{1f}not-a-date\u{1f}Fix\n",
    );
    let err = run_check(&repo, &CheckOptions::default()).unwrap_err();
    assert!(matches!(err, UpmergeError::LogParse(_)));
}

#[test]
fn test_json_report_shape() {
    let repo = repo().with_log(
        "origin/main..origin/release/2.0",
        &log_of(&[("Ada", "ada@x", 11)]),
    );
    let options = CheckOptions {
        mode: ReportMode::Gate,
        ..CheckOptions::default()
    };

    let outcome = run_check(&repo, &options).unwrap();
    let json = serde_json::to_value(&outcome.report).unwrap();

    assert_eq!(json["mode"], "gate");
    assert_eq!(json["pairs"][1]["commit_count"], 11);
    assert_eq!(json["pairs"][1]["detail"]["kind"], "by_author");
    assert_eq!(json["pairs"][1]["detail"]["items"][0]["email"], "ada@x");
}
