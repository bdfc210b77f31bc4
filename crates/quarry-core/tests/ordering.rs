mod common;

use common::TestDb;
use quarry_core::prelude::*;

fn scored() -> TestDb {
    let db = TestDb::new();
    db.index(1, &[("a", Value::Int(1)), ("b", Value::Int(1)), ("tag", Value::text("x"))]);
    db.index(2, &[("a", Value::Int(1)), ("b", Value::Int(3))]);
    db.index(3, &[("a", Value::Int(0)), ("b", Value::Int(5)), ("tag", Value::text("x"))]);
    db.index(4, &[("a", Value::Int(1))]);
    db.index(5, &[("a", Value::Int(0)), ("b", Value::Int(5))]);
    db.index(6, &[("b", Value::Int(0))]);

    db
}

#[test]
fn ties_break_by_ascending_identifier_in_both_directions() {
    let db = scored();

    assert_eq!(db.all(&db.query().order_by("a").limit(2)), vec![3, 5, 1, 2, 4]);
    assert_eq!(db.all(&db.query().order_by_desc("a").limit(2)), vec![1, 2, 4, 3, 5]);
}

#[test]
fn secondary_fields_order_within_primary_ties_and_missing_values_sort_last() {
    let db = scored();
    let query = db.query().order_by("a").order_by_desc("b");

    assert_eq!(db.all(&query.clone().limit(1)), vec![3, 5, 2, 1, 4]);
    assert_eq!(db.all(&query.limit(100)), vec![3, 5, 2, 1, 4]);
}

#[test]
fn identifier_can_be_a_secondary_order_field() {
    let db = scored();
    let query = db.query().order_by("a").order_by_desc("uuid").limit(2);

    assert_eq!(db.all(&query), vec![5, 3, 4, 2, 1]);
}

#[test]
fn identifier_primary_with_a_range_filter() {
    let db = scored();
    let query = db
        .query()
        .order_by_desc("uuid")
        .filter(Predicate::gte("b", 3))
        .limit(1);

    assert_eq!(db.all(&query), vec![5, 3, 2]);
}

#[test]
fn range_on_the_order_property_bounds_the_walk() {
    let db = scored();
    let query = db
        .query()
        .order_by_desc("b")
        .filter(Predicate::and(vec![Predicate::gt("b", 0), Predicate::lt("b", 5)]))
        .limit(1);

    assert_eq!(db.all(&query), vec![2, 1]);
}

#[test]
fn range_on_another_property_filters_ordered_results() {
    let db = scored();
    let query = db
        .query()
        .order_by("b")
        .filter(Predicate::lte("a", 0))
        .limit(1);

    assert_eq!(db.all(&query), vec![3, 5]);
}

#[test]
fn equality_filters_apply_to_ordered_walks() {
    let db = scored();
    let query = db
        .query()
        .order_by_desc("b")
        .filter(Predicate::eq("tag", "x"));

    assert_eq!(db.all(&query), vec![3, 1]);
}

#[test]
fn text_order_ignores_case() {
    let db = TestDb::new();
    db.index(1, &[("name", Value::text("bob"))]);
    db.index(2, &[("name", Value::text("Alice"))]);
    db.index(3, &[("name", Value::text("carol"))]);
    db.index(4, &[("name", Value::text("ALICE"))]);

    assert_eq!(db.all(&db.query().order_by("name").limit(3)), vec![2, 4, 1, 3]);
}

#[test]
fn multi_valued_entities_appear_once_at_their_extreme_value() {
    let db = TestDb::new();
    db.index(1, &[("n", Value::Int(1)), ("n", Value::Int(9))]);
    db.index(2, &[("n", Value::Int(5))]);
    db.index(3, &[("n", Value::Int(3)), ("n", Value::Int(7))]);

    assert_eq!(db.all(&db.query().order_by("n").limit(1)), vec![1, 3, 2]);
    assert_eq!(db.all(&db.query().order_by_desc("n").limit(1)), vec![1, 3, 2]);

    // Within a range the extreme is taken among in-range values only.
    let bounded = db.query().order_by("n").filter(Predicate::gte("n", 4)).limit(1);
    assert_eq!(db.all(&bounded), vec![2, 3, 1]);
}

#[test]
fn mixed_value_kinds_order_by_kind_then_value() {
    let db = TestDb::new();
    db.index(1, &[("v", Value::text("a"))]);
    db.index(2, &[("v", Value::Int(10))]);
    db.index(3, &[("v", Value::Bool(true))]);
    db.index(4, &[("v", Value::Float(-1.5))]);

    assert_eq!(db.all(&db.query().order_by("v")), vec![3, 2, 4, 1]);
    assert_eq!(db.all(&db.query().order_by_desc("v").limit(1)), vec![1, 4, 2, 3]);
}
