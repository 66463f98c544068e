//! Compiled query model
//!
//! A [`Disjunction`] is an OR of [`Conjunction`]s, each an AND of
//! [`AtomicQuery`] comparisons against one index. The full-text search and
//! completeness modifiers belong to the disjunction as a whole.
//!
//! Queries can also be evaluated locally against a [`PackedRecord`], which
//! is what the index engine is expected to reproduce.

use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::keys::{KeyRole, KeyValue};
use crate::packer::{tokenize_line, tokenize_lines, PackedRecord};

/// Comparison operator of an atomic query
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QueryOperator {
    Eq,
    Lt,
    Le,
    Gt,
    Ge,
    /// Inclusive range
    Btw,
    /// Membership in a set
    In,
}

impl QueryOperator {
    pub fn as_str(&self) -> &'static str {
        match self {
            QueryOperator::Eq => "=",
            QueryOperator::Lt => "<",
            QueryOperator::Le => "<=",
            QueryOperator::Gt => ">",
            QueryOperator::Ge => ">=",
            QueryOperator::Btw => "BETWEEN",
            QueryOperator::In => "IN",
        }
    }

    /// True for operators pinning the index to given values
    pub fn is_exact(&self) -> bool {
        matches!(self, QueryOperator::Eq | QueryOperator::In)
    }
}

impl fmt::Display for QueryOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Operand of an atomic query; its shape follows the operator
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Bound {
    /// Eq, Lt, Le, Gt, Ge
    Single(KeyValue),
    /// Btw, both ends inclusive
    Range(KeyValue, KeyValue),
    /// In
    Set(BTreeSet<KeyValue>),
}

/// One comparison against one index
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AtomicQuery {
    index_name: String,
    role: KeyRole,
    operator: QueryOperator,
    bound: Bound,
}

impl AtomicQuery {
    fn single(operator: QueryOperator, value: KeyValue) -> Self {
        Self {
            index_name: value.name().to_string(),
            role: value.role(),
            operator,
            bound: Bound::Single(value),
        }
    }

    pub fn eq(value: KeyValue) -> Self {
        Self::single(QueryOperator::Eq, value)
    }

    pub fn lt(value: KeyValue) -> Self {
        Self::single(QueryOperator::Lt, value)
    }

    pub fn le(value: KeyValue) -> Self {
        Self::single(QueryOperator::Le, value)
    }

    pub fn gt(value: KeyValue) -> Self {
        Self::single(QueryOperator::Gt, value)
    }

    pub fn ge(value: KeyValue) -> Self {
        Self::single(QueryOperator::Ge, value)
    }

    /// Inclusive range `low..=high` on the index of `low`
    pub fn between(low: KeyValue, high: KeyValue) -> Self {
        Self {
            index_name: low.name().to_string(),
            role: low.role(),
            operator: QueryOperator::Btw,
            bound: Bound::Range(low, high),
        }
    }

    /// Membership test; an empty set matches nothing
    pub fn one_of(
        index_name: impl Into<String>,
        role: KeyRole,
        values: impl IntoIterator<Item = KeyValue>,
    ) -> Self {
        Self {
            index_name: index_name.into(),
            role,
            operator: QueryOperator::In,
            bound: Bound::Set(values.into_iter().collect()),
        }
    }

    pub fn index_name(&self) -> &str {
        &self.index_name
    }

    pub fn role(&self) -> KeyRole {
        self.role
    }

    pub fn operator(&self) -> QueryOperator {
        self.operator
    }

    pub fn bound(&self) -> &Bound {
        &self.bound
    }

    /// The single value of Eq/Lt/Le/Gt/Ge
    pub fn value(&self) -> Option<&KeyValue> {
        match &self.bound {
            Bound::Single(v) => Some(v),
            _ => None,
        }
    }

    /// Both ends of a Btw
    pub fn range(&self) -> Option<(&KeyValue, &KeyValue)> {
        match &self.bound {
            Bound::Range(low, high) => Some((low, high)),
            _ => None,
        }
    }

    /// The set of an In
    pub fn values(&self) -> Option<&BTreeSet<KeyValue>> {
        match &self.bound {
            Bound::Set(values) => Some(values),
            _ => None,
        }
    }

    /// True iff the record holds a key on this index satisfying the test
    pub fn is_match(&self, record: &PackedRecord) -> bool {
        let mut keys = record.keys_named(self.role, &self.index_name);
        match (&self.operator, &self.bound) {
            (QueryOperator::Eq, Bound::Single(v)) => keys.any(|k| k == v),
            (QueryOperator::Lt, Bound::Single(v)) => keys.any(|k| k.repr() < v.repr()),
            (QueryOperator::Le, Bound::Single(v)) => keys.any(|k| k.repr() <= v.repr()),
            (QueryOperator::Gt, Bound::Single(v)) => keys.any(|k| k.repr() > v.repr()),
            (QueryOperator::Ge, Bound::Single(v)) => keys.any(|k| k.repr() >= v.repr()),
            (QueryOperator::Btw, Bound::Range(low, high)) => {
                keys.any(|k| k.repr() >= low.repr() && k.repr() <= high.repr())
            }
            (QueryOperator::In, Bound::Set(values)) => {
                record.match_one_of(self.role, &self.index_name, values)
            }
            _ => false,
        }
    }
}

impl fmt::Display for AtomicQuery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.bound {
            Bound::Single(v) => write!(f, "{} {} {}", self.index_name, self.operator, v),
            Bound::Range(low, high) => {
                write!(f, "{} {} {}, {}", self.index_name, self.operator, low, high)
            }
            Bound::Set(values) => {
                write!(f, "{} {} (", self.index_name, self.operator)?;
                for (i, v) in values.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", v)?;
                }
                write!(f, ")")
            }
        }
    }
}

/// AND of atomic queries
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Conjunction {
    elements: Vec<AtomicQuery>,
}

impl Conjunction {
    pub fn new(elements: Vec<AtomicQuery>) -> Self {
        Self { elements }
    }

    pub fn elements(&self) -> &[AtomicQuery] {
        &self.elements
    }

    pub fn into_elements(self) -> Vec<AtomicQuery> {
        self.elements
    }

    pub fn push(&mut self, query: AtomicQuery) {
        self.elements.push(query);
    }

    pub fn len(&self) -> usize {
        self.elements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    /// Every element matches; an empty conjunction matches everything
    pub fn is_match(&self, record: &PackedRecord) -> bool {
        self.elements.iter().all(|q| q.is_match(record))
    }
}

impl fmt::Display for Conjunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, q) in self.elements.iter().enumerate() {
            if i > 0 {
                write!(f, " AND ")?;
            }
            write!(f, "{}", q)?;
        }
        Ok(())
    }
}

/// The compiled query: OR of conjunctions, plus query-level modifiers
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Disjunction {
    type_name: String,
    elements: Vec<Conjunction>,
    full_text_search: Option<String>,
    only_if_complete: bool,
}

impl Disjunction {
    /// An empty query on a type: no conjunctions, no modifiers
    pub fn new(type_name: impl Into<String>) -> Self {
        Self {
            type_name: type_name.into(),
            elements: Vec::new(),
            full_text_search: None,
            only_if_complete: false,
        }
    }

    pub fn with_conjunctions(mut self, elements: Vec<Conjunction>) -> Self {
        self.elements = elements;
        self
    }

    pub fn with_full_text_search(mut self, text: impl Into<String>) -> Self {
        self.full_text_search = Some(text.into());
        self
    }

    pub fn with_only_if_complete(mut self, only_if_complete: bool) -> Self {
        self.only_if_complete = only_if_complete;
        self
    }

    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    pub fn elements(&self) -> &[Conjunction] {
        &self.elements
    }

    pub fn push(&mut self, conjunction: Conjunction) {
        self.elements.push(conjunction);
    }

    pub fn full_text_search(&self) -> Option<&str> {
        self.full_text_search.as_deref()
    }

    /// The caller wants a failure rather than a partial result set
    pub fn only_if_complete(&self) -> bool {
        self.only_if_complete
    }

    /// Empty query with the same type and modifiers
    pub(crate) fn empty_like(&self) -> Self {
        Self {
            type_name: self.type_name.clone(),
            elements: Vec::new(),
            full_text_search: self.full_text_search.clone(),
            only_if_complete: self.only_if_complete,
        }
    }

    /// Local evaluation.
    ///
    /// With no conjunctions every record matches the key part. A full-text
    /// search matches when each of its tokens appears in the record's text.
    /// Completeness is a delivery requirement and does not filter records.
    pub fn is_match(&self, record: &PackedRecord) -> bool {
        let keys_match =
            self.elements.is_empty() || self.elements.iter().any(|c| c.is_match(record));
        if !keys_match {
            return false;
        }

        match &self.full_text_search {
            None => true,
            Some(text) => {
                let wanted = tokenize_line(text).tokens;
                let computed;
                let lines = match record.tokenized_full_text() {
                    Some(lines) => lines,
                    None => {
                        computed = tokenize_lines(record.full_text());
                        &computed[..]
                    }
                };
                wanted
                    .iter()
                    .all(|token| lines.iter().any(|line| line.tokens.contains(token)))
            }
        }
    }
}

impl fmt::Display for Disjunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, c) in self.elements.iter().enumerate() {
            if i > 0 {
                write!(f, " OR ")?;
            }
            write!(f, "{}", c)?;
        }
        if let Some(text) = &self.full_text_search {
            if !self.elements.is_empty() {
                write!(f, " ")?;
            }
            write!(f, "FULL TEXT '{}'", text)?;
        }
        if self.only_if_complete {
            if !self.elements.is_empty() || self.full_text_search.is_some() {
                write!(f, " ")?;
            }
            write!(f, "ONLY IF COMPLETE")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::keys::{KeyDataType, KeyKind};
    use crate::packer::Packer;
    use crate::schema::TypeDescription;
    use serde_json::json;

    fn home() -> PackedRecord {
        let description = TypeDescription::builder("Homes.Home")
            .primary_key("Id", KeyKind::Integer)
            .index("Town", KeyKind::Text)
            .index("Rooms", KeyKind::Integer)
            .list_index("Accounts", KeyKind::Integer)
            .full_text("Comment")
            .build()
            .unwrap();
        Packer::default()
            .pack_document(
                &json!({
                    "Id": 1,
                    "Town": "Paris",
                    "Rooms": 3,
                    "Accounts": [44, 45, 46],
                    "Comment": "Sunny flat near the river"
                }),
                &description,
            )
            .unwrap()
    }

    fn town(v: &str) -> KeyValue {
        KeyValue::text("Town", KeyRole::ScalarIndex, v)
    }

    fn rooms(v: i64) -> KeyValue {
        KeyValue::int("Rooms", KeyRole::ScalarIndex, v)
    }

    #[test]
    fn test_single_value_operators() {
        let record = home();
        assert!(AtomicQuery::eq(town("Paris")).is_match(&record));
        assert!(!AtomicQuery::eq(town("Nice")).is_match(&record));
        assert!(AtomicQuery::ge(rooms(3)).is_match(&record));
        assert!(!AtomicQuery::gt(rooms(3)).is_match(&record));
        assert!(AtomicQuery::le(rooms(3)).is_match(&record));
        assert!(!AtomicQuery::lt(rooms(3)).is_match(&record));
    }

    #[test]
    fn test_between_is_inclusive() {
        let record = home();
        assert!(AtomicQuery::between(rooms(3), rooms(3)).is_match(&record));
        assert!(AtomicQuery::between(rooms(1), rooms(5)).is_match(&record));
        assert!(!AtomicQuery::between(rooms(4), rooms(5)).is_match(&record));
    }

    #[test]
    fn test_membership_on_list_index() {
        let record = home();
        let account = |v| KeyValue::int("Accounts", KeyRole::ListIndex, v);

        assert!(AtomicQuery::one_of("Accounts", KeyRole::ListIndex, [account(44)]).is_match(&record));
        assert!(!AtomicQuery::one_of("Accounts", KeyRole::ListIndex, [account(50)]).is_match(&record));
        assert!(!AtomicQuery::one_of("Accounts", KeyRole::ListIndex, []).is_match(&record));
    }

    #[test]
    fn test_operator_accessors() {
        let q = AtomicQuery::between(rooms(1), rooms(2));
        assert_eq!(q.operator(), QueryOperator::Btw);
        assert_eq!(q.role(), KeyRole::ScalarIndex);
        assert!(q.value().is_none());
        assert_eq!(q.range().map(|(l, _)| l.data_type()), Some(KeyDataType::IntKey));
    }

    #[test]
    fn test_display() {
        let conjunction = Conjunction::new(vec![
            AtomicQuery::eq(town("Paris")),
            AtomicQuery::between(rooms(1), rooms(4)),
        ]);
        let query = Disjunction::new("Homes.Home")
            .with_conjunctions(vec![
                conjunction,
                Conjunction::new(vec![AtomicQuery::one_of(
                    "Rooms",
                    KeyRole::ScalarIndex,
                    [rooms(2), rooms(1)],
                )]),
            ])
            .with_full_text_search("river");

        assert_eq!(
            query.to_string(),
            "Town = Paris AND Rooms BETWEEN 1, 4 OR Rooms IN (1, 2) FULL TEXT 'river'"
        );
    }

    #[test]
    fn test_disjunction_is_match() {
        let record = home();
        let nice = Conjunction::new(vec![AtomicQuery::eq(town("Nice"))]);
        let paris = Conjunction::new(vec![AtomicQuery::eq(town("Paris"))]);

        let query = Disjunction::new("Homes.Home").with_conjunctions(vec![nice.clone(), paris]);
        assert!(query.is_match(&record));

        let query = Disjunction::new("Homes.Home").with_conjunctions(vec![nice]);
        assert!(!query.is_match(&record));

        assert!(Disjunction::new("Homes.Home").is_match(&record));
    }

    #[test]
    fn test_full_text_search_needs_every_token() {
        let record = home();
        let query = |text: &str| Disjunction::new("Homes.Home").with_full_text_search(text);

        assert!(query("sunny RIVER").is_match(&record));
        assert!(!query("sunny beach").is_match(&record));

        let mut tokenized = home();
        tokenized.tokenize_full_text();
        assert!(query("flat").is_match(&tokenized));
    }

    #[test]
    fn test_serializes_to_json() {
        let query = Disjunction::new("Homes.Home")
            .with_conjunctions(vec![Conjunction::new(vec![AtomicQuery::eq(town("Paris"))])])
            .with_only_if_complete(true);

        let json = serde_json::to_value(&query).unwrap();
        assert_eq!(json["only_if_complete"], true);
        assert_eq!(json["elements"][0]["elements"][0]["operator"], "eq");

        let back: Disjunction = serde_json::from_value(json).unwrap();
        assert_eq!(back, query);
    }
}
