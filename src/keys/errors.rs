//! Key conversion errors

use thiserror::Error;

use super::value::KeyKind;

/// Result type for key conversions
pub type KeyResult<T> = Result<T, KeyError>;

/// Errors raised while folding a raw scalar into a key value
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum KeyError {
    /// The scalar has no conversion into the declared key kind
    #[error("cannot convert {found} value '{value}' into a {kind} key")]
    Incompatible {
        kind: KeyKind,
        found: &'static str,
        value: String,
    },

    /// The raw value is a collection or nested object, not a scalar
    #[error("field '{field}' holds a non-scalar value")]
    NotScalar { field: String },
}

impl KeyError {
    pub(crate) fn incompatible(kind: KeyKind, found: &'static str, value: impl ToString) -> Self {
        KeyError::Incompatible {
            kind,
            found,
            value: value.to_string(),
        }
    }
}
