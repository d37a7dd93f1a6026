// tests/plan_test.rs
use upmerge::domain::{
    build_pairs, build_plan, classify, CustomerFilter, MergePair, RawBranch, ReleaseVersion,
};
use upmerge::UpmergeError;

fn listing(names: &[&str]) -> Vec<RawBranch> {
    names.iter().map(|n| RawBranch::remote(*n)).collect()
}

fn pairs_for(names: &[&str], start: ReleaseVersion, filter: CustomerFilter) -> Vec<(String, String)> {
    let records = classify("origin", &listing(names), &filter).unwrap();
    let plan = build_plan(records, &start);
    render(&build_pairs(&plan).unwrap())
}

fn render(pairs: &[MergePair]) -> Vec<(String, String)> {
    pairs
        .iter()
        .map(|p| (p.source.short_name().to_string(), p.target.short_name().to_string()))
        .collect()
}

fn expect(pairs: &[(&str, &str)]) -> Vec<(String, String)> {
    pairs
        .iter()
        .map(|(s, t)| (s.to_string(), t.to_string()))
        .collect()
}

const RELEASES_AND_ACME: &[&str] = &[
    "origin/release/23.1",
    "origin/release/23.2",
    "origin/release/23.3",
    "origin/main",
    "origin/customer/acme/23.1",
    "origin/customer/acme/23.2",
    "origin/customer/acme/23.3",
];

#[test]
fn test_release_and_customer_chain_order() {
    let pairs = pairs_for(RELEASES_AND_ACME, ReleaseVersion::lowest(), CustomerFilter::All);

    assert_eq!(
        pairs,
        expect(&[
            ("release/23.1", "release/23.2"),
            ("release/23.2", "release/23.3"),
            ("release/23.3", "main"),
            ("release/23.1", "customer/acme/23.1"),
            ("customer/acme/23.1", "customer/acme/23.2"),
            ("release/23.2", "customer/acme/23.2"),
            ("customer/acme/23.2", "customer/acme/23.3"),
            ("release/23.3", "customer/acme/23.3"),
        ])
    );
}

#[test]
fn test_pair_order_independent_of_listing_order() {
    let mut shuffled = RELEASES_AND_ACME.to_vec();
    shuffled.reverse();
    shuffled.swap(1, 4);

    assert_eq!(
        pairs_for(&shuffled, ReleaseVersion::lowest(), CustomerFilter::All),
        pairs_for(RELEASES_AND_ACME, ReleaseVersion::lowest(), CustomerFilter::All)
    );
}

#[test]
fn test_starting_release_trims_both_chains() {
    let pairs = pairs_for(
        RELEASES_AND_ACME,
        ReleaseVersion::new(23, 2, 0),
        CustomerFilter::All,
    );

    assert_eq!(
        pairs,
        expect(&[
            ("release/23.2", "release/23.3"),
            ("release/23.3", "main"),
            ("release/23.2", "customer/acme/23.2"),
            ("customer/acme/23.2", "customer/acme/23.3"),
            ("release/23.3", "customer/acme/23.3"),
        ])
    );
}

#[test]
fn test_customers_excluded_without_filter() {
    let pairs = pairs_for(
        RELEASES_AND_ACME,
        ReleaseVersion::lowest(),
        CustomerFilter::ReleasesOnly,
    );
    assert_eq!(pairs.len(), 3);
}

#[test]
fn test_customers_are_walked_alphabetically() {
    let pairs = pairs_for(
        &[
            "origin/release/1.0",
            "origin/customer/zeta/1.0",
            "origin/customer/acme/1.0",
        ],
        ReleaseVersion::lowest(),
        CustomerFilter::All,
    );
    assert_eq!(
        pairs,
        expect(&[
            ("release/1.0", "customer/acme/1.0"),
            ("release/1.0", "customer/zeta/1.0"),
        ])
    );
}

#[test]
fn test_numeric_not_textual_order() {
    let pairs = pairs_for(
        &[
            "origin/release/5.10",
            "origin/release/22.3",
            "origin/release/5.9",
            "origin/master",
        ],
        ReleaseVersion::lowest(),
        CustomerFilter::ReleasesOnly,
    );
    assert_eq!(
        pairs,
        expect(&[
            ("release/5.9", "release/5.10"),
            ("release/5.10", "release/22.3"),
            ("release/22.3", "master"),
        ])
    );
}

#[test]
fn test_default_branch_as_start_has_no_pairs() {
    let pairs = pairs_for(
        RELEASES_AND_ACME,
        ReleaseVersion::Default,
        CustomerFilter::ReleasesOnly,
    );
    assert!(pairs.is_empty());
}

#[test]
fn test_customer_with_no_matching_release_is_rejected() {
    let records = classify(
        "origin",
        &listing(&["origin/release/23.1", "origin/customer/acme/24.1"]),
        &CustomerFilter::Only("acme".to_string()),
    )
    .unwrap();
    let plan = build_plan(records, &ReleaseVersion::lowest());

    match build_pairs(&plan) {
        Err(UpmergeError::Planning(message)) => {
            assert!(message.contains("no matching release branch"));
            assert!(message.contains("acme"));
        }
        other => panic!("expected a planning error, got {:?}", other),
    }
}

#[test]
fn test_plan_records_unique_and_ascending() {
    let mut names = RELEASES_AND_ACME.to_vec();
    names.push("origin/release/23.2");
    let records = classify("origin", &listing(&names), &CustomerFilter::All).unwrap();
    let plan = build_plan(records, &ReleaseVersion::lowest());

    let releases: Vec<&ReleaseVersion> = plan.releases().map(|r| &r.version).collect();
    assert!(releases.windows(2).all(|w| w[0] < w[1]));
    assert_eq!(plan.len(), RELEASES_AND_ACME.len());
}
