//! Typed key values for keyquery
//!
//! Every indexable scalar (primary key, unique key, scalar index, list index
//! element, predicate operand) is represented by a [`KeyValue`].
//!
//! # Invariants
//!
//! - The representation of a field is fixed by its declared [`KeyKind`]:
//!   integer-backed kinds always produce `KeyRepr::Int`, text produces
//!   `KeyRepr::Text`. A field never mixes both.
//! - Ordering compares the representation first (kind, then value).
//! - Conversion is deterministic: date/time values become tick counts, floats
//!   become an order-preserving integer encoding, nulls become the zero value.
//! - Key values are immutable once constructed.

mod convert;
mod errors;
mod scalar;
mod value;

pub use convert::{
    date_time_to_ticks, date_to_ticks, ordered_f64, parse_date_time, ticks_to_date_time,
    TICKS_PER_SECOND,
};
pub use errors::{KeyError, KeyResult};
pub use scalar::Scalar;
pub use value::{KeyDataType, KeyKind, KeyRepr, KeyRole, KeyValue};
