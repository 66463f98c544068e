//! Key value types
//!
//! A [`KeyValue`] couples a field name and role with a fixed representation.
//! Ordering is deterministic: `Int < Text`, then by value.

use std::cmp::Ordering;
use std::fmt;

use serde::{Deserialize, Serialize};

use super::convert::{date_time_to_ticks, date_to_ticks, ordered_f64, parse_date_time};
use super::errors::{KeyError, KeyResult};
use super::scalar::Scalar;

/// Role of a key field inside a type schema
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum KeyRole {
    /// The one and only primary key
    Primary,
    /// Unique secondary key
    Unique,
    /// Scalar index key
    ScalarIndex,
    /// Collection-valued index key, one value per element
    ListIndex,
}

impl KeyRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            KeyRole::Primary => "primary",
            KeyRole::Unique => "unique",
            KeyRole::ScalarIndex => "scalar_index",
            KeyRole::ListIndex => "list_index",
        }
    }
}

impl fmt::Display for KeyRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Physical representation of a key
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum KeyDataType {
    IntKey,
    StringKey,
}

/// Declared value kind of a key field.
///
/// The kind selects the converter used when folding raw scalars into keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum KeyKind {
    /// 64-bit signed integer
    Integer,
    /// 64-bit float, stored with an order-preserving encoding
    Float,
    /// Date or date/time, stored as ticks
    DateTime,
    /// Boolean, stored as 0/1
    Boolean,
    /// UTF-8 text
    Text,
}

impl KeyKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            KeyKind::Integer => "integer",
            KeyKind::Float => "float",
            KeyKind::DateTime => "date_time",
            KeyKind::Boolean => "boolean",
            KeyKind::Text => "text",
        }
    }

    /// Returns the representation used by keys of this kind
    pub fn data_type(&self) -> KeyDataType {
        match self {
            KeyKind::Text => KeyDataType::StringKey,
            _ => KeyDataType::IntKey,
        }
    }

    /// Fold a raw scalar into this kind's representation.
    ///
    /// Null always folds into the zero value of the representation.
    pub fn convert(&self, scalar: &Scalar) -> KeyResult<KeyRepr> {
        if scalar.is_null() {
            return Ok(KeyRepr::zero(self.data_type()));
        }

        let repr = match (self, scalar) {
            (KeyKind::Integer, Scalar::Int(v)) => KeyRepr::Int(*v),
            (KeyKind::Integer, Scalar::Bool(v)) => KeyRepr::Int(i64::from(*v)),
            (KeyKind::Integer, Scalar::Float(v))
                if v.fract() == 0.0 && *v >= i64::MIN as f64 && *v < i64::MAX as f64 =>
            {
                KeyRepr::Int(*v as i64)
            }
            (KeyKind::Integer, Scalar::Text(v)) => v
                .trim()
                .parse::<i64>()
                .map(KeyRepr::Int)
                .map_err(|_| KeyError::incompatible(*self, scalar.type_name(), v))?,
            (KeyKind::Integer | KeyKind::DateTime, Scalar::DateTime(v)) => {
                KeyRepr::Int(date_time_to_ticks(v))
            }
            (KeyKind::Integer | KeyKind::DateTime, Scalar::Date(v)) => {
                KeyRepr::Int(date_to_ticks(v))
            }

            (KeyKind::Float, Scalar::Int(v)) => KeyRepr::Int(ordered_f64(*v as f64)),
            (KeyKind::Float, Scalar::Float(v)) => KeyRepr::Int(ordered_f64(*v)),
            (KeyKind::Float, Scalar::Text(v)) => v
                .trim()
                .parse::<f64>()
                .map(|f| KeyRepr::Int(ordered_f64(f)))
                .map_err(|_| KeyError::incompatible(*self, scalar.type_name(), v))?,

            // Integers on a date field are already tick counts
            (KeyKind::DateTime, Scalar::Int(v)) => KeyRepr::Int(*v),
            (KeyKind::DateTime, Scalar::Text(v)) => parse_date_time(v)
                .map(|dt| KeyRepr::Int(date_time_to_ticks(&dt)))
                .ok_or_else(|| KeyError::incompatible(*self, scalar.type_name(), v))?,

            (KeyKind::Boolean, Scalar::Bool(v)) => KeyRepr::Int(i64::from(*v)),
            (KeyKind::Boolean, Scalar::Int(v)) => KeyRepr::Int(i64::from(*v != 0)),

            (KeyKind::Text, Scalar::Text(v)) => KeyRepr::Text(v.clone()),
            (KeyKind::Text, Scalar::Int(v)) => KeyRepr::Text(v.to_string()),
            (KeyKind::Text, Scalar::Float(v)) => KeyRepr::Text(v.to_string()),
            (KeyKind::Text, Scalar::Bool(v)) => KeyRepr::Text(v.to_string()),
            (KeyKind::Text, Scalar::DateTime(v)) => KeyRepr::Text(v.to_rfc3339()),
            (KeyKind::Text, Scalar::Date(v)) => KeyRepr::Text(v.format("%Y-%m-%d").to_string()),

            (kind, other) => {
                return Err(KeyError::incompatible(*kind, other.type_name(), other));
            }
        };

        Ok(repr)
    }
}

impl fmt::Display for KeyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Key representation: integer or text
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum KeyRepr {
    Int(i64),
    Text(String),
}

impl KeyRepr {
    /// Zero value of a representation (what null folds into)
    pub fn zero(data_type: KeyDataType) -> Self {
        match data_type {
            KeyDataType::IntKey => KeyRepr::Int(0),
            KeyDataType::StringKey => KeyRepr::Text(String::new()),
        }
    }

    pub fn data_type(&self) -> KeyDataType {
        match self {
            KeyRepr::Int(_) => KeyDataType::IntKey,
            KeyRepr::Text(_) => KeyDataType::StringKey,
        }
    }
}

impl fmt::Display for KeyRepr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            KeyRepr::Int(v) => write!(f, "{}", v),
            KeyRepr::Text(v) => write!(f, "{}", v),
        }
    }
}

/// A typed, ordered, hashable key value bound to a field.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct KeyValue {
    name: String,
    role: KeyRole,
    repr: KeyRepr,
}

impl KeyValue {
    pub fn new(name: impl Into<String>, role: KeyRole, repr: KeyRepr) -> Self {
        Self {
            name: name.into(),
            role,
            repr,
        }
    }

    /// Shorthand for an integer key
    pub fn int(name: impl Into<String>, role: KeyRole, value: i64) -> Self {
        Self::new(name, role, KeyRepr::Int(value))
    }

    /// Shorthand for a text key
    pub fn text(name: impl Into<String>, role: KeyRole, value: impl Into<String>) -> Self {
        Self::new(name, role, KeyRepr::Text(value.into()))
    }

    /// Field name
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn role(&self) -> KeyRole {
        self.role
    }

    pub fn repr(&self) -> &KeyRepr {
        &self.repr
    }

    pub fn data_type(&self) -> KeyDataType {
        self.repr.data_type()
    }

    pub fn as_int(&self) -> Option<i64> {
        match self.repr {
            KeyRepr::Int(v) => Some(v),
            KeyRepr::Text(_) => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match &self.repr {
            KeyRepr::Text(v) => Some(v),
            KeyRepr::Int(_) => None,
        }
    }
}

impl Ord for KeyValue {
    fn cmp(&self, other: &Self) -> Ordering {
        self.repr
            .cmp(&other.repr)
            .then_with(|| self.name.cmp(&other.name))
            .then_with(|| self.role.cmp(&other.role))
    }
}

impl PartialOrd for KeyValue {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Displays the raw value only
impl fmt::Display for KeyValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.repr)
    }
}
