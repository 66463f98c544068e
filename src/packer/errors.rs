//! Packing errors

use thiserror::Error;

use crate::keys::KeyError;
use crate::schema::{SchemaError, SchemaErrorCode};

/// Result type for packing operations
pub type PackResult<T> = Result<T, PackError>;

/// Errors raised while packing, unpacking or decoding records
#[derive(Debug, Error)]
pub enum PackError {
    /// The type has no schema, or its schema declares no primary key
    #[error("type is not registered: {0}")]
    UnregisteredType(SchemaError),

    /// The type's schema is invalid or conflicts with a registered one
    #[error("invalid schema: {0}")]
    Schema(SchemaError),

    /// Pack was called without an object
    #[error("cannot pack a null instance")]
    NullInstance,

    /// The document root is a collection
    #[error("cannot pack a document whose root is an array")]
    ArrayPackUnsupported,

    /// The document is not a JSON object
    #[error("malformed document: {0}")]
    MalformedDocument(String),

    /// A key field could not be converted
    #[error("key conversion failed: {0}")]
    Key(#[from] KeyError),

    /// The payload could not be (de)serialized
    #[error("payload serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),

    /// The payload could not be (de)compressed
    #[error("payload compression failed: {0}")]
    Compression(#[source] std::io::Error),

    /// A wire-encoded record failed validation
    #[error("corrupted record: {0}")]
    Corrupted(String),
}

impl PackError {
    /// Stable error code, aligned with the schema and query codes
    pub fn code(&self) -> &'static str {
        match self {
            PackError::UnregisteredType(_) => "KQ_UNREGISTERED_TYPE",
            PackError::Schema(e) => e.code().code(),
            PackError::NullInstance => "KQ_NULL_INSTANCE",
            PackError::ArrayPackUnsupported => "KQ_ARRAY_PACK_UNSUPPORTED",
            PackError::MalformedDocument(_) => "KQ_MALFORMED_DOCUMENT",
            PackError::Key(_) => "KQ_KEY_CONVERSION",
            PackError::Serialization(_) => "KQ_SERIALIZATION",
            PackError::Compression(_) => "KQ_COMPRESSION",
            PackError::Corrupted(_) => "KQ_CORRUPTED_RECORD",
        }
    }
}

impl From<SchemaError> for PackError {
    fn from(err: SchemaError) -> Self {
        match err.code() {
            SchemaErrorCode::UnregisteredType => PackError::UnregisteredType(err),
            _ => PackError::Schema(err),
        }
    }
}
