//! Predicate intermediate representation
//!
//! A small closed set of node kinds that the compiler understands:
//! comparisons, AND, OR, NOT, membership tests and the two query modifiers.
//! Predicates are built with the DSL below or read from JSON:
//!
//! ```json
//! { "kind": "and", "operands": [
//!     { "kind": "compare", "left": { "field": "ValueDate" }, "op": "ge", "right": { "constant": "2024-03-01" } },
//!     { "kind": "contains", "collection": { "field": "Accounts" }, "item": { "constant": 44 } }
//! ] }
//! ```

use std::ops::{BitAnd, BitOr, Not};

use serde::{Deserialize, Serialize};

use crate::keys::Scalar;

/// Comparison operator as written in the predicate
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CompareOp {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
}

impl CompareOp {
    /// The operator to use once the operands are swapped
    pub fn flipped(&self) -> Self {
        match self {
            CompareOp::Eq => CompareOp::Eq,
            CompareOp::Ne => CompareOp::Ne,
            CompareOp::Lt => CompareOp::Gt,
            CompareOp::Le => CompareOp::Ge,
            CompareOp::Gt => CompareOp::Lt,
            CompareOp::Ge => CompareOp::Le,
        }
    }
}

/// Leaf operand of a predicate
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Operand {
    /// A field of the queried type, by name
    Field(String),
    /// A constant scalar
    Constant(Scalar),
    /// A constant collection
    Collection(Vec<Scalar>),
}

/// Boolean predicate over the fields of a type
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Predicate {
    Compare {
        left: Operand,
        op: CompareOp,
        right: Operand,
    },
    And {
        operands: Vec<Predicate>,
    },
    Or {
        operands: Vec<Predicate>,
    },
    Not {
        operand: Box<Predicate>,
    },
    /// `collection` holds `item`
    Contains {
        collection: Operand,
        item: Operand,
    },
    /// Full-text search modifier
    FullTextSearch {
        text: String,
    },
    /// Completeness modifier
    OnlyIfComplete,
}

impl Predicate {
    /// `self AND other`, extending an existing AND chain
    pub fn and(self, other: Predicate) -> Predicate {
        match self {
            Predicate::And { mut operands } => {
                operands.push(other);
                Predicate::And { operands }
            }
            first => Predicate::And {
                operands: vec![first, other],
            },
        }
    }

    /// `self OR other`, extending an existing OR chain
    pub fn or(self, other: Predicate) -> Predicate {
        match self {
            Predicate::Or { mut operands } => {
                operands.push(other);
                Predicate::Or { operands }
            }
            first => Predicate::Or {
                operands: vec![first, other],
            },
        }
    }

    /// Short name of the node kind, for diagnostics
    pub fn kind(&self) -> &'static str {
        match self {
            Predicate::Compare { .. } => "compare",
            Predicate::And { .. } => "and",
            Predicate::Or { .. } => "or",
            Predicate::Not { .. } => "not",
            Predicate::Contains { .. } => "contains",
            Predicate::FullTextSearch { .. } => "full_text_search",
            Predicate::OnlyIfComplete => "only_if_complete",
        }
    }
}

impl BitAnd for Predicate {
    type Output = Predicate;

    fn bitand(self, other: Predicate) -> Predicate {
        self.and(other)
    }
}

impl BitOr for Predicate {
    type Output = Predicate;

    fn bitor(self, other: Predicate) -> Predicate {
        self.or(other)
    }
}

impl Not for Predicate {
    type Output = Predicate;

    fn not(self) -> Predicate {
        Predicate::Not {
            operand: Box::new(self),
        }
    }
}

/// A field reference, the left side of most predicates
#[derive(Debug, Clone)]
pub struct FieldRef(String);

/// Starts a predicate on a field
pub fn field(name: impl Into<String>) -> FieldRef {
    FieldRef(name.into())
}

impl FieldRef {
    fn compare(self, op: CompareOp, value: impl Into<Scalar>) -> Predicate {
        Predicate::Compare {
            left: Operand::Field(self.0),
            op,
            right: Operand::Constant(value.into()),
        }
    }

    pub fn eq(self, value: impl Into<Scalar>) -> Predicate {
        self.compare(CompareOp::Eq, value)
    }

    pub fn ne(self, value: impl Into<Scalar>) -> Predicate {
        self.compare(CompareOp::Ne, value)
    }

    pub fn lt(self, value: impl Into<Scalar>) -> Predicate {
        self.compare(CompareOp::Lt, value)
    }

    pub fn le(self, value: impl Into<Scalar>) -> Predicate {
        self.compare(CompareOp::Le, value)
    }

    pub fn gt(self, value: impl Into<Scalar>) -> Predicate {
        self.compare(CompareOp::Gt, value)
    }

    pub fn ge(self, value: impl Into<Scalar>) -> Predicate {
        self.compare(CompareOp::Ge, value)
    }

    /// The collection field holds `value`
    pub fn contains(self, value: impl Into<Scalar>) -> Predicate {
        Predicate::Contains {
            collection: Operand::Field(self.0),
            item: Operand::Constant(value.into()),
        }
    }

    /// The field equals one of `values`
    pub fn is_in<I, V>(self, values: I) -> Predicate
    where
        I: IntoIterator<Item = V>,
        V: Into<Scalar>,
    {
        collection(values).contains(self)
    }
}

/// A constant on the left side of a comparison
#[derive(Debug, Clone)]
pub struct ConstantRef(Scalar);

/// Starts a predicate with a constant on the left, as in `5 < x.Rooms`
pub fn constant(value: impl Into<Scalar>) -> ConstantRef {
    ConstantRef(value.into())
}

impl ConstantRef {
    fn compare(self, op: CompareOp, field: FieldRef) -> Predicate {
        Predicate::Compare {
            left: Operand::Constant(self.0),
            op,
            right: Operand::Field(field.0),
        }
    }

    pub fn eq(self, field: FieldRef) -> Predicate {
        self.compare(CompareOp::Eq, field)
    }

    pub fn lt(self, field: FieldRef) -> Predicate {
        self.compare(CompareOp::Lt, field)
    }

    pub fn le(self, field: FieldRef) -> Predicate {
        self.compare(CompareOp::Le, field)
    }

    pub fn gt(self, field: FieldRef) -> Predicate {
        self.compare(CompareOp::Gt, field)
    }

    pub fn ge(self, field: FieldRef) -> Predicate {
        self.compare(CompareOp::Ge, field)
    }
}

/// A constant collection, for `collection.Contains(field)` tests
#[derive(Debug, Clone)]
pub struct CollectionRef(Vec<Scalar>);

pub fn collection<I, V>(values: I) -> CollectionRef
where
    I: IntoIterator<Item = V>,
    V: Into<Scalar>,
{
    CollectionRef(values.into_iter().map(Into::into).collect())
}

impl CollectionRef {
    /// The collection holds the value of `field`
    pub fn contains(self, field: FieldRef) -> Predicate {
        Predicate::Contains {
            collection: Operand::Collection(self.0),
            item: Operand::Field(field.0),
        }
    }
}

/// Full-text search modifier
pub fn full_text_search(text: impl Into<String>) -> Predicate {
    Predicate::FullTextSearch { text: text.into() }
}

/// Completeness modifier
pub fn only_if_complete() -> Predicate {
    Predicate::OnlyIfComplete
}
