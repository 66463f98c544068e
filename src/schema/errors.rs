//! Schema error types
//!
//! Error codes:
//! - KQ_UNREGISTERED_TYPE (REJECT)
//! - KQ_DUPLICATE_FIELD (REJECT)
//! - KQ_SCHEMA_CONFLICT (REJECT)
//! - KQ_MALFORMED_DESCRIPTION (FATAL)

use std::fmt;

/// Severity levels for schema errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    /// Caller request rejected
    Reject,
    /// Description files are unusable, startup must stop
    Fatal,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Reject => write!(f, "REJECT"),
            Severity::Fatal => write!(f, "FATAL"),
        }
    }
}

/// Schema-specific error codes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchemaErrorCode {
    /// Type has no schema, or its schema declares no primary key
    UnregisteredType,
    /// Same field declared twice as a key
    DuplicateField,
    /// A different description is already registered under the same name
    SchemaConflict,
    /// Description file unreadable or invalid
    MalformedDescription,
}

impl SchemaErrorCode {
    /// Returns the stable string code
    pub fn code(&self) -> &'static str {
        match self {
            SchemaErrorCode::UnregisteredType => "KQ_UNREGISTERED_TYPE",
            SchemaErrorCode::DuplicateField => "KQ_DUPLICATE_FIELD",
            SchemaErrorCode::SchemaConflict => "KQ_SCHEMA_CONFLICT",
            SchemaErrorCode::MalformedDescription => "KQ_MALFORMED_DESCRIPTION",
        }
    }

    /// Returns the severity level for this error
    pub fn severity(&self) -> Severity {
        match self {
            SchemaErrorCode::MalformedDescription => Severity::Fatal,
            _ => Severity::Reject,
        }
    }
}

impl fmt::Display for SchemaErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// Schema error type with full context
#[derive(Debug, Clone)]
pub struct SchemaError {
    code: SchemaErrorCode,
    message: String,
    type_name: Option<String>,
    field: Option<String>,
}

impl SchemaError {
    /// Create an unregistered type error
    pub fn unregistered_type(type_name: impl Into<String>) -> Self {
        let name = type_name.into();
        Self {
            code: SchemaErrorCode::UnregisteredType,
            message: format!("Type '{}' is not registered", name),
            type_name: Some(name),
            field: None,
        }
    }

    /// Create an error for a description without primary key
    pub fn missing_primary_key(type_name: impl Into<String>) -> Self {
        let name = type_name.into();
        Self {
            code: SchemaErrorCode::UnregisteredType,
            message: format!("Type '{}' declares no primary key", name),
            type_name: Some(name),
            field: None,
        }
    }

    /// Create a duplicate field error
    pub fn duplicate_field(type_name: impl Into<String>, field: impl Into<String>) -> Self {
        let name = type_name.into();
        let field = field.into();
        Self {
            code: SchemaErrorCode::DuplicateField,
            message: format!("Field '{}' is declared more than once on '{}'", field, name),
            type_name: Some(name),
            field: Some(field),
        }
    }

    /// Create a conflict error for a name already bound to another description
    pub fn schema_conflict(type_name: impl Into<String>) -> Self {
        let name = type_name.into();
        Self {
            code: SchemaErrorCode::SchemaConflict,
            message: format!(
                "Type '{}' is already registered with a different description",
                name
            ),
            type_name: Some(name),
            field: None,
        }
    }

    /// Create an error for a malformed description file
    pub fn malformed_description(path: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            code: SchemaErrorCode::MalformedDescription,
            message: format!("Malformed description '{}': {}", path.into(), reason.into()),
            type_name: None,
            field: None,
        }
    }

    /// Returns the error code
    pub fn code(&self) -> SchemaErrorCode {
        self.code
    }

    /// Returns the severity level
    pub fn severity(&self) -> Severity {
        self.code.severity()
    }

    /// Returns the error message
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Returns the type name if applicable
    pub fn type_name(&self) -> Option<&str> {
        self.type_name.as_deref()
    }

    /// Returns the offending field if applicable
    pub fn field(&self) -> Option<&str> {
        self.field.as_deref()
    }

    /// Returns whether this is a fatal error
    pub fn is_fatal(&self) -> bool {
        self.severity() == Severity::Fatal
    }
}

impl fmt::Display for SchemaError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}: {}", self.code.severity(), self.code.code(), self.message)
    }
}

impl std::error::Error for SchemaError {}

/// Result type for schema operations
pub type SchemaResult<T> = Result<T, SchemaError>;
