//! Query compilation for keyquery
//!
//! Predicates over a registered type are compiled into a disjunctive normal
//! form of atomic key tests that an index engine evaluates directly:
//!
//! ```text
//! Predicate ──► PredicateCompiler ──► Disjunction ──► QueryOptimizer ──► Disjunction
//!                                    (OR of ANDs)     (range merge)
//! ```
//!
//! # Design Principles
//!
//! - Compilation is exact: a shape that cannot be represented is rejected,
//!   never approximated
//! - Constants are folded with the field's converter, so compiled values and
//!   packed keys compare on the same representation
//! - The optimizer only ever tightens or merges tests on the same index
//! - Output is deterministic for a given predicate

mod ast;
mod compiler;
mod errors;
mod optimizer;
mod predicate;

pub use ast::{AtomicQuery, Bound, Conjunction, Disjunction, QueryOperator};
pub use compiler::{compile_for, compile_named, PredicateCompiler};
pub use errors::{QueryError, QueryErrorCode, QueryResult, Severity};
pub use optimizer::QueryOptimizer;
pub use predicate::{
    collection, constant, field, full_text_search, only_if_complete, CollectionRef, CompareOp,
    ConstantRef, FieldRef, Operand, Predicate,
};
