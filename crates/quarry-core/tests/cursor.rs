mod common;

use common::TestDb;
use quarry_core::{
    error::ErrorClass,
    obs::{metrics_report, metrics_reset_all},
    prelude::*,
};

fn seeded() -> TestDb {
    let db = TestDb::new();
    for n in 1..=12 {
        db.index(n, &[("kind", Value::text("item")), ("n", Value::Int(n as i64 % 3))]);
    }

    db
}

fn rejected(db: &TestDb, query: &Query) -> ErrorClass {
    db.executor()
        .execute(query)
        .expect_err("cursor should be rejected")
        .class
}

#[test]
fn garbage_cursors_are_rejected_not_restarted() {
    let db = seeded();
    let query = db.query().limit(5);

    for token in ["", "   ", "zz", "abc", "00", "deadbeef"] {
        assert_eq!(
            rejected(&db, &query.clone().cursor(token)),
            ErrorClass::MalformedCursor,
            "token {token:?}"
        );
    }
}

#[test]
fn truncated_cursors_are_rejected() {
    let db = seeded();
    let query = db.query().limit(5);
    let page = db.page(&query);

    let cut = &page.cursor[..page.cursor.len() - 8];
    assert_eq!(rejected(&db, &query.cursor(cut)), ErrorClass::MalformedCursor);
}

#[test]
fn oversized_cursors_are_rejected() {
    let db = seeded();
    let token = "ab".repeat(EngineConfig::default().max_cursor_hex_len);

    assert_eq!(
        rejected(&db, &db.query().cursor(token)),
        ErrorClass::MalformedCursor
    );
}

#[test]
fn cursors_are_bound_to_the_query_shape() {
    let db = seeded();
    let filtered = db.query().filter(Predicate::eq("kind", "item")).limit(5);
    let page = db.page(&filtered);

    let other_predicate = db.query().filter(Predicate::eq("kind", "other")).limit(5);
    let other_order = db.query().order_by("n").limit(5);
    let other_scope = Query::collection(common::APP, "others").limit(5);

    metrics_reset_all();
    for query in [other_predicate, other_order, other_scope, db.query().limit(5)] {
        assert_eq!(
            rejected(&db, &query.cursor(page.cursor.clone())),
            ErrorClass::MalformedCursor
        );
    }
    assert_eq!(metrics_report().ops.cursors_rejected, 4);
}

#[test]
fn case_only_differences_share_a_cursor() {
    let db = seeded();
    let lower = db.query().filter(Predicate::eq("kind", "item")).limit(5);
    let page = db.page(&lower);

    let upper = db.query().filter(Predicate::eq("KIND", "ITEM")).limit(5);
    let resumed = db.page(&upper.cursor(page.cursor));
    assert_eq!(resumed.len(), 5);
}

#[test]
fn ordered_cursors_reject_foreign_directions() {
    let db = seeded();
    let asc = db.query().order_by("n").limit(2);
    let page = db.page(&asc);

    let desc = db.query().order_by_desc("n").limit(2);
    assert_eq!(
        rejected(&db, &desc.cursor(page.cursor)),
        ErrorClass::MalformedCursor
    );
}

#[test]
fn terminal_cursor_returns_an_empty_page() {
    let db = seeded();
    let query = db.query().limit(100);
    let page = db.page(&query);
    assert!(page.exhausted);
    assert_eq!(page.len(), 12);

    let after = db.page(&query.cursor(page.cursor.clone()));
    assert!(after.is_empty());
    assert!(after.exhausted);
    assert_eq!(after.cursor, page.cursor);
}

#[test]
fn cursors_are_lowercase_hex() {
    let db = seeded();
    let page = db.page(&db.query().limit(3));

    assert!(!page.cursor.is_empty());
    assert!(
        page.cursor
            .chars()
            .all(|c| c.is_ascii_digit() || ('a'..='f').contains(&c))
    );

    let padded = format!("  {}\n", page.cursor.to_uppercase());
    let resumed = db.page(&db.query().limit(3).cursor(padded));
    assert_eq!(resumed.len(), 3);
}
