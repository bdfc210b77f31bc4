mod common;

use common::{TestDb, id, ids};
use proptest::prelude::*;
use quarry_core::{
    error::ErrorClass,
    obs::{metrics_report, metrics_reset_all},
    prelude::*,
};

fn thirty_items() -> TestDb {
    let db = TestDb::new();
    for n in 1..=30 {
        db.index(n, &[("kind", Value::text("item")), ("n", Value::Int(n as i64 % 7))]);
    }

    db
}

#[test]
fn pages_resume_where_the_previous_page_stopped() {
    let db = thirty_items();
    let query = db.query().filter(Predicate::eq("kind", "item")).limit(15);

    let first = db.page(&query);
    assert_eq!(ids(&first), (1..=15).collect::<Vec<_>>());
    assert!(!first.exhausted);

    let second = db.page(&query.clone().cursor(first.cursor.clone()));
    assert_eq!(ids(&second), (16..=30).collect::<Vec<_>>());
    assert!(second.exhausted);

    let third = db.page(&query.cursor(second.cursor.clone()));
    assert!(third.is_empty());
    assert!(third.exhausted);
    assert_eq!(third.cursor, second.cursor);
}

#[test]
fn collection_scan_pages_without_a_predicate() {
    let db = thirty_items();
    let query = db.query().limit(7);

    let mut seen = Vec::new();
    let mut page = db.page(&query);
    while !page.exhausted {
        assert_eq!(page.len(), 7);
        seen.extend(ids(&page));
        page = db.page(&query.clone().cursor(page.cursor.clone()));
    }
    seen.extend(ids(&page));

    assert_eq!(seen, (1..=30).collect::<Vec<_>>());
}

#[test]
fn ordered_pages_split_tie_groups_without_repeats() {
    let db = thirty_items();
    let query = db.query().order_by("n").limit(4);

    let mut expected: Vec<u128> = (1..=30).collect();
    expected.sort_by_key(|n| (n % 7, *n));

    assert_eq!(db.all(&query), expected);
}

#[test]
fn large_tie_groups_cost_a_bounded_number_of_reads_per_page() {
    let db = TestDb::new();
    for n in 1..=2000 {
        db.index(n, &[("flag", Value::Bool(true))]);
    }

    for first in [
        db.query().order_by("flag").limit(10),
        db.query().order_by_desc("flag").limit(10),
    ] {
        let mut query = first;
        for page_no in 0..3u128 {
            let before = db.store.read_count();
            let page = db.page(&query);
            let reads = db.store.read_count() - before;

            let start = page_no * 10 + 1;
            assert_eq!(ids(&page), (start..start + 10).collect::<Vec<_>>());
            assert!(reads <= 3, "page {page_no} took {reads} store reads");
            query = query.cursor(page.cursor);
        }
    }
}

#[test]
fn limits_default_and_clamp_to_configuration() {
    let db = thirty_items();

    assert_eq!(db.page(&db.query()).len(), 10);

    let config = EngineConfig::from_toml_str("max_limit = 12").expect("config");
    let executor = LoadExecutor::new(&db.store, config);
    let page = executor.execute(&db.query().limit(500)).expect("query");
    assert_eq!(page.len(), 12);
}

#[test]
fn exact_limit_detects_exhaustion_on_the_same_page() {
    let db = TestDb::new();
    for n in 1..=5 {
        db.index(n, &[]);
    }

    let page = db.page(&db.query().limit(5));
    assert_eq!(ids(&page), vec![1, 2, 3, 4, 5]);
    assert!(page.exhausted);
}

#[test]
fn cursor_stays_valid_when_the_limit_changes() {
    let db = thirty_items();
    let first = db.page(&db.query().limit(3));

    let second = db.page(&db.query().limit(20).cursor(first.cursor));
    assert_eq!(ids(&second), (4..=23).collect::<Vec<_>>());
}

#[test]
fn store_failure_surfaces_and_the_same_cursor_retries() {
    let db = thirty_items();
    let query = db.query().filter(Predicate::eq("kind", "item")).limit(10);
    let first = db.page(&query);
    let next = query.cursor(first.cursor);

    metrics_reset_all();
    db.store.fail_next_reads(1);
    let err = db.executor().execute(&next).expect_err("injected failure");
    assert_eq!(err.class, ErrorClass::StoreRead);
    assert!(err.is_retryable());
    assert_eq!(metrics_report().ops.store_read_failures, 1);

    let retried = db.page(&next);
    assert_eq!(ids(&retried), (11..=20).collect::<Vec<_>>());
}

#[test]
fn failures_mid_page_never_return_partial_results() {
    let db = TestDb::new();
    for n in 1..=40 {
        db.index(n, &[]);
    }
    let config = EngineConfig::from_toml_str("min_scan_batch = 4\nmax_scan_batch = 4")
        .expect("config");
    let executor = LoadExecutor::new(&db.store, config);
    let query = db.query().limit(10);

    db.store.fail_reads_after(1, 1);
    executor.execute(&query).expect_err("second fetch fails");

    let page = executor.execute(&query).expect("retry succeeds");
    assert_eq!(ids(&page), (1..=10).collect::<Vec<_>>());
}

#[test]
fn metrics_count_queries_and_returned_ids() {
    let db = thirty_items();
    metrics_reset_all();

    let page = db.page(&db.query().limit(5));
    let report = metrics_report();

    assert_eq!(report.ops.queries, 1);
    assert_eq!(report.ops.ids_returned, 5);
    assert_eq!(report.ops.pages_exhausted, 0);
    assert!(report.ops.scan_fetches >= 1);
    assert_eq!(report.scopes["items"].ids_returned, 5);

    db.all(&db.query().cursor(page.cursor).limit(100));
    assert_eq!(metrics_report().ops.pages_exhausted, 1);
}

#[test]
fn unindexed_entities_disappear_from_results() {
    let db = thirty_items();
    db.unindex(3);

    let all = db.all(&db.query().filter(Predicate::eq("kind", "item")).limit(50));
    assert_eq!(all.len(), 29);
    assert!(!all.contains(&id(3).as_u128()));
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(24))]

    #[test]
    fn paging_matches_a_single_full_read(
        values in prop::collection::vec(prop::option::of(0i64..5), 1..30),
        limit in 1u32..6,
        desc in any::<bool>(),
    ) {
        let db = TestDb::new();
        for (idx, value) in values.iter().enumerate() {
            let owner = idx as u128 + 1;
            match value {
                Some(v) => db.index(owner, &[("n", Value::Int(*v))]),
                None => db.index(owner, &[]),
            }
        }

        let base = if desc { db.query().order_by_desc("n") } else { db.query().order_by("n") };

        let mut expected: Vec<(i64, u128)> = values
            .iter()
            .enumerate()
            .filter_map(|(idx, value)| value.map(|v| (v, idx as u128 + 1)))
            .collect();
        expected.sort_by(|a, b| {
            let by_value = if desc { b.0.cmp(&a.0) } else { a.0.cmp(&b.0) };
            by_value.then(a.1.cmp(&b.1))
        });
        let expected: Vec<u128> = expected.into_iter().map(|(_, owner)| owner).collect();

        prop_assert_eq!(db.all(&base.clone().limit(1000)), expected.clone());
        prop_assert_eq!(db.all(&base.clone().limit(limit)), expected);

        let first = db.page(&base.clone().limit(limit));
        let again = db.page(&base.clone().limit(limit));
        prop_assert_eq!(&first, &again);

        let resumed = base.limit(limit).cursor(first.cursor.clone());
        prop_assert_eq!(db.page(&resumed), db.page(&resumed));
    }
}
