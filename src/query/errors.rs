//! Query error types
//!
//! Error codes:
//! - KQ_UNREGISTERED_TYPE (REJECT)
//! - KQ_INVALID_SCHEMA (REJECT)
//! - KQ_UNSUPPORTED_PREDICATE_SHAPE (REJECT)
//! - KQ_INCONSISTENT_QUERY (REJECT)

use std::fmt;

use crate::schema::{SchemaError, SchemaErrorCode};

/// Severity levels for query errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    /// Caller request rejected
    Reject,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Reject => write!(f, "REJECT"),
        }
    }
}

/// Query error codes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryErrorCode {
    /// The queried type has no schema
    UnregisteredType,
    /// The queried type's schema is invalid or conflicts with a registered one
    InvalidSchema,
    /// The compiler cannot classify a sub-expression
    UnsupportedPredicateShape,
    /// Contradictory predicates on one index
    InconsistentQuery,
}

impl QueryErrorCode {
    pub fn code(&self) -> &'static str {
        match self {
            QueryErrorCode::UnregisteredType => "KQ_UNREGISTERED_TYPE",
            QueryErrorCode::InvalidSchema => "KQ_INVALID_SCHEMA",
            QueryErrorCode::UnsupportedPredicateShape => "KQ_UNSUPPORTED_PREDICATE_SHAPE",
            QueryErrorCode::InconsistentQuery => "KQ_INCONSISTENT_QUERY",
        }
    }

    pub fn severity(&self) -> Severity {
        Severity::Reject
    }
}

impl fmt::Display for QueryErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// Query error with context
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryError {
    code: QueryErrorCode,
    message: String,
    index_name: Option<String>,
}

impl QueryError {
    pub fn unregistered_type(type_name: impl Into<String>) -> Self {
        Self {
            code: QueryErrorCode::UnregisteredType,
            message: format!("Type '{}' is not registered", type_name.into()),
            index_name: None,
        }
    }

    /// The predicate has a shape the compiler cannot represent
    pub fn unsupported_shape(reason: impl Into<String>) -> Self {
        Self {
            code: QueryErrorCode::UnsupportedPredicateShape,
            message: reason.into(),
            index_name: None,
        }
    }

    /// Same as [`unsupported_shape`](Self::unsupported_shape), naming the field
    pub fn unsupported_field(field: impl Into<String>, reason: impl Into<String>) -> Self {
        let field = field.into();
        Self {
            code: QueryErrorCode::UnsupportedPredicateShape,
            message: format!("Field '{}': {}", field, reason.into()),
            index_name: Some(field),
        }
    }

    /// Contradictory predicates on one index
    pub fn inconsistent(index_name: impl Into<String>, reason: impl Into<String>) -> Self {
        let index_name = index_name.into();
        Self {
            code: QueryErrorCode::InconsistentQuery,
            message: format!("Inconsistent query on '{}': {}", index_name, reason.into()),
            index_name: Some(index_name),
        }
    }

    pub fn code(&self) -> QueryErrorCode {
        self.code
    }

    pub fn severity(&self) -> Severity {
        self.code.severity()
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    /// Index or field the error is about, if any
    pub fn index_name(&self) -> Option<&str> {
        self.index_name.as_deref()
    }
}

impl fmt::Display for QueryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}: {}", self.severity(), self.code, self.message)
    }
}

impl std::error::Error for QueryError {}

impl From<SchemaError> for QueryError {
    fn from(err: SchemaError) -> Self {
        match err.code() {
            SchemaErrorCode::UnregisteredType => Self {
                code: QueryErrorCode::UnregisteredType,
                message: err.message().to_string(),
                index_name: None,
            },
            other => Self {
                code: QueryErrorCode::InvalidSchema,
                message: format!("{}: {}", other, err.message()),
                index_name: err.field().map(str::to_string),
            },
        }
    }
}

/// Result type for query operations
pub type QueryResult<T> = Result<T, QueryError>;
