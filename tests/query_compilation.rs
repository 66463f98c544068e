//! Query Compilation Tests
//!
//! End-to-end checks of the predicate compiler and the range-merge pass:
//! - Range merge into BETWEEN
//! - Contradiction detection
//! - Membership normalization
//! - Disjunction shape
//! - Local evaluation against packed records

use std::cell::RefCell;

use chrono::{DateTime, Duration, Utc};
use keyquery::keys::{date_time_to_ticks, KeyKind, KeyRole, KeyValue, Scalar};
use keyquery::packer::{PackedRecord, Packer};
use keyquery::query::{
    collection, compile_for, constant, field, full_text_search, only_if_complete, AtomicQuery,
    Disjunction, Predicate, PredicateCompiler, QueryErrorCode, QueryOperator,
};
use keyquery::schema::{Indexable, SchemaRegistry, SchemaResult, TypeDescription, TypeSchema};
use serde::{Deserialize, Serialize};

// =============================================================================
// Helper Functions
// =============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct Trade {
    id: i64,
    folder: String,
    value_date: DateTime<Utc>,
    accounts: Vec<i64>,
    comment: String,
}

impl Indexable for Trade {
    fn type_schema() -> SchemaResult<TypeSchema<Self>> {
        TypeSchema::builder("Trades.Trade")
            .primary_key("Id", KeyKind::Integer, |t: &Trade| t.id.into())
            .index("Folder", KeyKind::Text, |t: &Trade| t.folder.as_str().into())
            .index("ValueDate", KeyKind::DateTime, |t: &Trade| t.value_date.into())
            .list_index("Accounts", KeyKind::Integer, |t: &Trade| {
                t.accounts.iter().map(|a| Scalar::from(*a)).collect()
            })
            .full_text("Comment", |t: &Trade| serde_json::json!(t.comment))
            .build()
    }
}

fn trade(id: i64, accounts: Vec<i64>) -> Trade {
    Trade {
        id,
        folder: "TF".into(),
        value_date: Utc::now(),
        accounts,
        comment: "Hedge for the March roll".into(),
    }
}

fn pack(registry: &SchemaRegistry, trade: &Trade) -> PackedRecord {
    Packer::default().pack_in(registry, trade).unwrap()
}

fn compile(predicate: Predicate) -> Result<Disjunction, keyquery::query::QueryError> {
    compile_for::<Trade>(&SchemaRegistry::new(), &predicate)
}

fn date_key(value: DateTime<Utc>) -> KeyValue {
    KeyValue::int("ValueDate", KeyRole::ScalarIndex, date_time_to_ticks(&value))
}

// =============================================================================
// Range Merge Tests
// =============================================================================

/// ValueDate >= today && ValueDate <= tomorrow becomes one BETWEEN.
#[test]
fn test_today_tomorrow_merged_into_between() {
    let today = Utc::now();
    let tomorrow = today + Duration::days(1);

    let query = compile(field("ValueDate").ge(today) & field("ValueDate").le(tomorrow)).unwrap();

    assert_eq!(query.elements().len(), 1);
    assert_eq!(
        query.elements()[0].elements(),
        &[AtomicQuery::between(date_key(today), date_key(tomorrow))]
    );
}

/// Constant-first comparisons merge the same way.
#[test]
fn test_flipped_bounds_merge() {
    let query = compile(constant(10).le(field("Id")) & constant(20).ge(field("Id"))).unwrap();

    let atomic = &query.elements()[0].elements()[0];
    assert_eq!(atomic.operator(), QueryOperator::Btw);
    assert_eq!(atomic.range().map(|(l, h)| (l.as_int(), h.as_int())), Some((Some(10), Some(20))));
}

/// Strict bounds stay as two tests.
#[test]
fn test_strict_bounds_not_merged() {
    let query = compile(field("Id").gt(10) & field("Id").lt(20)).unwrap();
    assert_eq!(query.elements()[0].len(), 2);
}

// =============================================================================
// Contradiction Tests
// =============================================================================

/// Two different equalities on one index are rejected.
#[test]
fn test_two_equalities_rejected() {
    let err = compile(field("Folder").eq("A") & field("Folder").eq("B")).unwrap_err();
    assert_eq!(err.code(), QueryErrorCode::InconsistentQuery);
    assert_eq!(err.index_name(), Some("Folder"));
}

/// An equality combined with a range on the same index is rejected.
#[test]
fn test_equality_with_range_rejected() {
    let err = compile(field("Id").eq(5) & field("Id").ge(1)).unwrap_err();
    assert_eq!(err.code(), QueryErrorCode::InconsistentQuery);
}

/// Contradictions are checked per conjunction, not across the OR.
#[test]
fn test_contradiction_scoped_to_conjunction() {
    let query = compile(field("Folder").eq("A") | field("Folder").eq("B")).unwrap();
    assert_eq!(query.elements().len(), 2);
}

// =============================================================================
// Membership Tests
// =============================================================================

/// Both membership forms compile to a single IN test.
#[test]
fn test_membership_normalized() {
    let scalar = compile(collection(["A", "B"]).contains(field("Folder"))).unwrap();
    let atomic = &scalar.elements()[0].elements()[0];
    assert_eq!(atomic.operator(), QueryOperator::In);
    assert_eq!(atomic.role(), KeyRole::ScalarIndex);
    assert_eq!(atomic.index_name(), "Folder");

    let list = compile(field("Accounts").contains(44)).unwrap();
    let atomic = &list.elements()[0].elements()[0];
    assert_eq!(atomic.operator(), QueryOperator::In);
    assert_eq!(atomic.role(), KeyRole::ListIndex);
    assert_eq!(atomic.values().map(|v| v.len()), Some(1));
}

/// Accounts = [44, 45, 46] matches Contains(44) but not Contains(50).
#[test]
fn test_list_membership_matches_elements() {
    let registry = SchemaRegistry::new();
    let record = pack(&registry, &trade(1, vec![44, 45, 46]));

    let hit = compile_for::<Trade>(&registry, &field("Accounts").contains(44)).unwrap();
    let miss = compile_for::<Trade>(&registry, &field("Accounts").contains(50)).unwrap();

    assert!(hit.is_match(&record));
    assert!(!miss.is_match(&record));
}

/// Two memberships on one collection field test two elements.
#[test]
fn test_list_memberships_combine() {
    let registry = SchemaRegistry::new();
    let record = pack(&registry, &trade(1, vec![44, 45, 46]));

    let both = field("Accounts").contains(44) & field("Accounts").contains(46);
    let query = compile_for::<Trade>(&registry, &both).unwrap();
    assert_eq!(query.elements()[0].len(), 2);
    assert!(query.is_match(&record));

    let one_missing = field("Accounts").contains(44) & field("Accounts").contains(99);
    let query = compile_for::<Trade>(&registry, &one_missing).unwrap();
    assert!(!query.is_match(&record));
}

// =============================================================================
// Disjunction Shape Tests
// =============================================================================

/// P1 || P2 gives exactly two conjunctions with the tests of each side.
#[test]
fn test_top_level_or_shape() {
    let query = compile(
        (field("Folder").eq("TF") & field("Id").ge(3)) | field("Accounts").contains(44),
    )
    .unwrap();

    assert_eq!(query.elements().len(), 2);
    assert_eq!(query.elements()[0].len(), 2);
    assert_eq!(query.elements()[1].len(), 1);
    assert_eq!(query.to_string(), "Folder = TF AND Id >= 3 OR Accounts IN (44)");
}

/// OR under AND cannot be represented and is rejected.
#[test]
fn test_nested_or_rejected() {
    let err = compile(field("Folder").eq("TF") & (field("Id").eq(1) | field("Id").eq(2))).unwrap_err();
    assert_eq!(err.code(), QueryErrorCode::UnsupportedPredicateShape);
}

// =============================================================================
// Modifier Tests
// =============================================================================

/// Modifiers attach to the query and full-text search filters records.
#[test]
fn test_modifiers_and_full_text_match() {
    let registry = SchemaRegistry::new();
    let record = pack(&registry, &trade(1, vec![44]));

    let query = compile_for::<Trade>(
        &registry,
        &(field("Folder").eq("TF") & full_text_search("march hedge") & only_if_complete()),
    )
    .unwrap();
    assert_eq!(query.full_text_search(), Some("march hedge"));
    assert!(query.only_if_complete());
    assert!(query.is_match(&record));

    let query = compile_for::<Trade>(&registry, &full_text_search("april")).unwrap();
    assert!(query.elements().is_empty());
    assert!(!query.is_match(&record));
}

// =============================================================================
// Observer Tests
// =============================================================================

/// The observer sees each compiled query and nothing else.
#[test]
fn test_observer_receives_compiled_queries() {
    let description = TypeDescription::builder("Trades.Trade")
        .primary_key("Id", KeyKind::Integer)
        .index("Folder", KeyKind::Text)
        .build()
        .unwrap();

    let seen = RefCell::new(Vec::new());
    let observer = |query: &Disjunction| seen.borrow_mut().push(query.to_string());
    let compiler = PredicateCompiler::new(&description).with_observer(&observer);

    compiler.compile(&field("Folder").eq("A")).unwrap();
    compiler.compile(&field("Folder").eq("B")).unwrap();
    compiler.compile(&!field("Folder").eq("C")).unwrap_err();

    assert_eq!(*seen.borrow(), vec!["Folder = A", "Folder = B"]);
}

/// Compiling against an unregistered name fails with UnregisteredType.
#[test]
fn test_unregistered_type_rejected() {
    let registry = SchemaRegistry::new();
    let err = keyquery::query::compile_named(&registry, "Missing.Type", &field("Id").eq(1)).unwrap_err();
    assert_eq!(err.code(), QueryErrorCode::UnregisteredType);
}
