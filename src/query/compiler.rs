//! Predicate compiler
//!
//! Translates a [`Predicate`] over a registered type into a [`Disjunction`].
//! Compilation is total but intolerant: every shape it cannot represent
//! exactly is rejected with `KQ_UNSUPPORTED_PREDICATE_SHAPE`, it never
//! produces a looser filter.
//!
//! Supported shapes:
//!
//! - `field OP constant` and `constant OP field` for `=`, `<`, `<=`, `>`, `>=`
//! - AND chains, flattened into one conjunction
//! - a top-level OR, one conjunction per disjunct
//! - `collection.contains(field)` on a scalar field and
//!   `field.contains(constant)` on a list field, both compiled to `In`
//! - full-text search and completeness modifiers in the top-level AND chain
//!
//! Constants are folded through the field's declared kind, so compiled values
//! compare exactly with packed keys.

use crate::keys::{KeyRole, Scalar};
use crate::observability::{self, Event, Logger};
use crate::schema::{Indexable, KeyField, SchemaRegistry, TypeDescription};

use super::ast::{AtomicQuery, Conjunction, Disjunction};
use super::errors::{QueryError, QueryResult};
use super::optimizer::QueryOptimizer;
use super::predicate::{CompareOp, Operand, Predicate};

/// Compiles predicates against one type description
pub struct PredicateCompiler<'a> {
    description: &'a TypeDescription,
    observer: Option<&'a dyn Fn(&Disjunction)>,
}

impl<'a> PredicateCompiler<'a> {
    pub fn new(description: &'a TypeDescription) -> Self {
        Self {
            description,
            observer: None,
        }
    }

    /// Receives every successfully compiled query. Never changes the output.
    pub fn with_observer(mut self, observer: &'a dyn Fn(&Disjunction)) -> Self {
        self.observer = Some(observer);
        self
    }

    /// Compiles and optimizes a predicate
    pub fn compile(&self, predicate: &Predicate) -> QueryResult<Disjunction> {
        let result = self
            .compile_raw(predicate)
            .and_then(QueryOptimizer::optimize);

        match result {
            Ok(query) => {
                observability::metrics().increment_queries_compiled();
                if Logger::enabled(Event::QueryCompiled.default_severity()) {
                    let text = query.to_string();
                    Logger::log(
                        Event::QueryCompiled.default_severity(),
                        Event::QueryCompiled.as_str(),
                        &[("query", text.as_str()), ("type", query.type_name())],
                    );
                }
                if let Some(observer) = self.observer {
                    observer(&query);
                }
                Ok(query)
            }
            Err(err) => {
                observability::metrics().increment_queries_rejected();
                Logger::log(
                    Event::QueryRejected.default_severity(),
                    Event::QueryRejected.as_str(),
                    &[
                        ("code", err.code().code()),
                        ("reason", err.message()),
                        ("type", self.description.type_name()),
                    ],
                );
                Err(err)
            }
        }
    }

    /// Compiles without the optimization pass
    pub fn compile_raw(&self, predicate: &Predicate) -> QueryResult<Disjunction> {
        let mut query = Disjunction::new(self.description.type_name());

        let mut parts = Vec::new();
        flatten_and(predicate, &mut parts);

        let mut remainder = Vec::new();
        for part in parts {
            match part {
                Predicate::FullTextSearch { text } => {
                    if query.full_text_search().is_some() {
                        return Err(QueryError::unsupported_shape(
                            "more than one full-text search in a query",
                        ));
                    }
                    query = query.with_full_text_search(text.clone());
                }
                Predicate::OnlyIfComplete => query = query.with_only_if_complete(true),
                other => remainder.push(other),
            }
        }

        match remainder.as_slice() {
            [] => {}
            [Predicate::Or { operands }] => {
                let mut disjuncts = Vec::new();
                flatten_or(operands, &mut disjuncts)?;
                for disjunct in disjuncts {
                    query.push(self.compile_disjunct(disjunct)?);
                }
            }
            members => query.push(self.compile_members(members)?),
        }

        Ok(query)
    }

    fn compile_disjunct(&self, disjunct: &Predicate) -> QueryResult<Conjunction> {
        let mut members = Vec::new();
        flatten_and(disjunct, &mut members);
        self.compile_members(&members)
    }

    fn compile_members(&self, members: &[&Predicate]) -> QueryResult<Conjunction> {
        let mut conjunction = Conjunction::default();
        for member in members {
            conjunction.push(self.compile_atomic(member)?);
        }
        Ok(conjunction)
    }

    fn compile_atomic(&self, predicate: &Predicate) -> QueryResult<AtomicQuery> {
        match predicate {
            Predicate::Compare { left, op, right } => self.compile_compare(left, *op, right),
            Predicate::Contains { collection, item } => self.compile_contains(collection, item),
            Predicate::Or { .. } => Err(QueryError::unsupported_shape("OR nested under AND")),
            Predicate::Not { .. } => Err(QueryError::unsupported_shape("NOT is not supported")),
            Predicate::FullTextSearch { .. } | Predicate::OnlyIfComplete => Err(
                QueryError::unsupported_shape("query modifiers must be at the top level"),
            ),
            Predicate::And { .. } => Err(QueryError::unsupported_shape("unexpected AND")),
        }
    }

    fn compile_compare(
        &self,
        left: &Operand,
        op: CompareOp,
        right: &Operand,
    ) -> QueryResult<AtomicQuery> {
        let (name, op, value) = match (left, right) {
            (Operand::Field(name), Operand::Constant(value)) => (name, op, value),
            (Operand::Constant(value), Operand::Field(name)) => (name, op.flipped(), value),
            (Operand::Field(_), Operand::Field(_)) => {
                return Err(QueryError::unsupported_shape("field compared to field"));
            }
            _ => {
                return Err(QueryError::unsupported_shape(
                    "a comparison needs one field and one constant",
                ));
            }
        };

        let field = self.key_field(name)?;
        if field.role == KeyRole::ListIndex {
            return Err(QueryError::unsupported_field(
                name,
                "collection fields only support contains",
            ));
        }
        let value = self.fold(field, value)?;

        match op {
            CompareOp::Eq => Ok(AtomicQuery::eq(value)),
            CompareOp::Lt => Ok(AtomicQuery::lt(value)),
            CompareOp::Le => Ok(AtomicQuery::le(value)),
            CompareOp::Gt => Ok(AtomicQuery::gt(value)),
            CompareOp::Ge => Ok(AtomicQuery::ge(value)),
            CompareOp::Ne => Err(QueryError::unsupported_field(
                name,
                "inequality is not supported",
            )),
        }
    }

    fn compile_contains(&self, collection: &Operand, item: &Operand) -> QueryResult<AtomicQuery> {
        match (collection, item) {
            (Operand::Collection(values), Operand::Field(name)) => {
                let field = self.key_field(name)?;
                if field.role == KeyRole::ListIndex {
                    return Err(QueryError::unsupported_field(
                        name,
                        "a constant collection cannot hold a collection field",
                    ));
                }
                let keys = values
                    .iter()
                    .map(|v| self.fold(field, v))
                    .collect::<QueryResult<Vec<_>>>()?;
                Ok(AtomicQuery::one_of(&field.name, field.role, keys))
            }
            (Operand::Field(name), Operand::Constant(value)) => {
                let field = self.key_field(name)?;
                if field.role != KeyRole::ListIndex {
                    return Err(QueryError::unsupported_field(name, "not a collection field"));
                }
                let key = self.fold(field, value)?;
                Ok(AtomicQuery::one_of(&field.name, field.role, [key]))
            }
            _ => Err(QueryError::unsupported_shape(
                "contains needs a collection and a field, one of them constant",
            )),
        }
    }

    fn key_field(&self, name: &str) -> QueryResult<&'a KeyField> {
        self.description
            .key_field(name)
            .ok_or_else(|| QueryError::unsupported_field(name, "not an indexed field"))
    }

    fn fold(&self, field: &KeyField, value: &Scalar) -> QueryResult<crate::keys::KeyValue> {
        field
            .key_value(value)
            .map_err(|e| QueryError::unsupported_field(&field.name, e.to_string()))
    }
}

/// Collects the members of an AND chain, nested ANDs included
fn flatten_and<'p>(predicate: &'p Predicate, out: &mut Vec<&'p Predicate>) {
    match predicate {
        Predicate::And { operands } => {
            for operand in operands {
                flatten_and(operand, out);
            }
        }
        other => out.push(other),
    }
}

/// Collects the disjuncts of an OR chain; an empty OR anywhere is rejected
fn flatten_or<'p>(operands: &'p [Predicate], out: &mut Vec<&'p Predicate>) -> QueryResult<()> {
    if operands.is_empty() {
        return Err(QueryError::unsupported_shape("empty OR"));
    }
    for operand in operands {
        match operand {
            Predicate::Or { operands } => flatten_or(operands, out)?,
            other => out.push(other),
        }
    }
    Ok(())
}

/// Compiles a predicate over `T`, resolving its schema in `registry`
pub fn compile_for<T: Indexable>(
    registry: &SchemaRegistry,
    predicate: &Predicate,
) -> QueryResult<Disjunction> {
    let schema = registry.resolve::<T>()?;
    PredicateCompiler::new(schema.description()).compile(predicate)
}

/// Compiles a predicate over a type registered by name
pub fn compile_named(
    registry: &SchemaRegistry,
    type_name: &str,
    predicate: &Predicate,
) -> QueryResult<Disjunction> {
    let description = registry.description(type_name)?;
    PredicateCompiler::new(&description).compile(predicate)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::keys::{KeyKind, KeyValue};
    use crate::query::predicate::{collection, constant, field, full_text_search, only_if_complete};
    use crate::query::{QueryErrorCode, QueryOperator};
    use std::cell::RefCell;

    fn trade() -> TypeDescription {
        TypeDescription::builder("Trades.Trade")
            .primary_key("Id", KeyKind::Integer)
            .unique_key("ContractId", KeyKind::Integer)
            .index("Folder", KeyKind::Text)
            .index("ValueDate", KeyKind::DateTime)
            .index("Nominal", KeyKind::Float)
            .list_index("Accounts", KeyKind::Integer)
            .full_text("Comment")
            .build()
            .unwrap()
    }

    fn compile(predicate: Predicate) -> QueryResult<Disjunction> {
        let description = trade();
        PredicateCompiler::new(&description).compile(&predicate)
    }

    fn shape_error(predicate: Predicate) {
        let err = compile(predicate).unwrap_err();
        assert_eq!(err.code(), QueryErrorCode::UnsupportedPredicateShape, "{}", err);
    }

    #[test]
    fn test_and_chain_single_conjunction() {
        let query = compile(field("Folder").eq("TF") & field("ContractId").eq(12)).unwrap();
        assert_eq!(query.elements().len(), 1);
        assert_eq!(query.elements()[0].len(), 2);
        assert_eq!(query.type_name(), "Trades.Trade");
    }

    #[test]
    fn test_constant_on_left_flipped() {
        let query = compile(constant(5).lt(field("ContractId"))).unwrap();
        let atomic = &query.elements()[0].elements()[0];
        assert_eq!(atomic.operator(), QueryOperator::Gt);
        assert_eq!(atomic.value(), Some(&KeyValue::int("ContractId", KeyRole::Unique, 5)));
    }

    #[test]
    fn test_date_constant_folded_to_ticks() {
        let query = compile(field("ValueDate").eq("2024-03-01")).unwrap();
        let value = query.elements()[0].elements()[0].value().unwrap();
        assert_eq!(value.as_int(), Some(638_448_480_000_000_000));
    }

    #[test]
    fn test_top_level_or() {
        let query = compile(
            (field("Folder").eq("A") & field("ContractId").eq(1)) | field("Folder").eq("B"),
        )
        .unwrap();
        assert_eq!(query.elements().len(), 2);
        assert_eq!(query.elements()[0].len(), 2);
        assert_eq!(query.elements()[1].len(), 1);
    }

    #[test]
    fn test_membership_forms() {
        let query = compile(collection([1, 2, 3]).contains(field("ContractId"))).unwrap();
        let atomic = &query.elements()[0].elements()[0];
        assert_eq!(atomic.operator(), QueryOperator::In);
        assert_eq!(atomic.values().map(|v| v.len()), Some(3));

        let query = compile(field("Accounts").contains(44)).unwrap();
        let atomic = &query.elements()[0].elements()[0];
        assert_eq!(atomic.operator(), QueryOperator::In);
        assert_eq!(atomic.role(), KeyRole::ListIndex);
    }

    #[test]
    fn test_modifiers_attach_to_query() {
        let query = compile(
            field("Folder").eq("TF") & full_text_search("hello world") & only_if_complete(),
        )
        .unwrap();
        assert_eq!(query.full_text_search(), Some("hello world"));
        assert!(query.only_if_complete());
        assert_eq!(query.elements().len(), 1);
        assert_eq!(query.elements()[0].len(), 1);
    }

    #[test]
    fn test_modifiers_only_has_no_conjunction() {
        let query = compile(full_text_search("hello")).unwrap();
        assert!(query.elements().is_empty());
    }

    #[test]
    fn test_modifiers_with_top_level_or() {
        let query = compile(
            (field("Folder").eq("A") | field("Folder").eq("B")) & only_if_complete(),
        )
        .unwrap();
        assert_eq!(query.elements().len(), 2);
        assert!(query.only_if_complete());
    }

    #[test]
    fn test_unsupported_shapes() {
        shape_error(field("Folder").eq("A") & (field("ContractId").eq(1) | field("ContractId").eq(2)));
        shape_error(!field("Folder").eq("A"));
        shape_error(field("Folder").ne("A"));
        shape_error(field("Unknown").eq(1));
        shape_error(field("Accounts").eq(44));
        shape_error(field("Folder").contains("A"));
        shape_error(field("ContractId").eq("not a number"));
        shape_error(field("Folder").eq("A") | full_text_search("x"));
        shape_error(full_text_search("a") & full_text_search("b"));
        shape_error(Predicate::Compare {
            left: Operand::Field("Folder".into()),
            op: CompareOp::Eq,
            right: Operand::Field("Folder".into()),
        });
        shape_error(Predicate::Or { operands: vec![] });
    }

    #[test]
    fn test_nested_empty_or_rejected() {
        shape_error(Predicate::Or {
            operands: vec![Predicate::Or { operands: vec![] }],
        });
        shape_error(Predicate::Or {
            operands: vec![field("Folder").eq("A"), Predicate::Or { operands: vec![] }],
        });
    }

    #[test]
    fn test_raw_keeps_range_pair() {
        let description = trade();
        let predicate = field("Nominal").ge(1.5) & field("Nominal").le(9.5);

        let raw = PredicateCompiler::new(&description).compile_raw(&predicate).unwrap();
        assert_eq!(raw.elements()[0].len(), 2);

        let optimized = PredicateCompiler::new(&description).compile(&predicate).unwrap();
        assert_eq!(optimized.elements()[0].len(), 1);
        assert_eq!(optimized.elements()[0].elements()[0].operator(), QueryOperator::Btw);
    }

    #[test]
    fn test_observer_sees_compiled_query() {
        let description = trade();
        let seen = RefCell::new(Vec::new());
        let observer = |q: &Disjunction| seen.borrow_mut().push(q.to_string());

        let compiler = PredicateCompiler::new(&description).with_observer(&observer);
        let query = compiler.compile(&field("Folder").eq("TF")).unwrap();
        assert!(compiler.compile(&field("Folder").ne("TF")).is_err());

        assert_eq!(*seen.borrow(), vec![query.to_string()]);
    }

    #[test]
    fn test_observer_does_not_change_output() {
        let description = trade();
        let observer = |_: &Disjunction| {};
        let predicate = field("Folder").eq("TF") & field("ContractId").ge(3);

        let with = PredicateCompiler::new(&description)
            .with_observer(&observer)
            .compile(&predicate)
            .unwrap();
        let without = PredicateCompiler::new(&description).compile(&predicate).unwrap();
        assert_eq!(with, without);
    }

    #[test]
    fn test_compile_named_unregistered() {
        let registry = SchemaRegistry::new();
        let err = compile_named(&registry, "Nowhere", &field("A").eq(1)).unwrap_err();
        assert_eq!(err.code(), QueryErrorCode::UnregisteredType);
    }
}
