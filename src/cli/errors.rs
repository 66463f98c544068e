//! CLI-specific error types
//!
//! Every CLI error ends the process with a non-zero status.

use thiserror::Error;

use crate::config::ConfigError;
use crate::packer::PackError;
use crate::query::QueryError;
use crate::schema::SchemaError;

/// CLI error
#[derive(Debug, Error)]
pub enum CliError {
    #[error("KQ_CLI_CONFIG_ERROR: {0}")]
    Config(#[from] ConfigError),

    #[error("KQ_CLI_IO_ERROR: {0}")]
    Io(#[from] std::io::Error),

    #[error("KQ_CLI_IO_ERROR: invalid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("KQ_CLI_SCHEMA_ERROR: {0}")]
    Schema(#[from] SchemaError),

    #[error("KQ_CLI_NO_SCHEMA_DIR: --type needs schema_dir in the configuration")]
    NoSchemaDir,

    #[error("{0}")]
    Pack(#[from] PackError),

    #[error("{0}")]
    Query(#[from] QueryError),
}

impl CliError {
    /// Stable error code string
    pub fn code(&self) -> &'static str {
        match self {
            Self::Config(_) => "KQ_CLI_CONFIG_ERROR",
            Self::Io(_) | Self::Json(_) => "KQ_CLI_IO_ERROR",
            Self::Schema(e) => e.code().code(),
            Self::NoSchemaDir => "KQ_CLI_NO_SCHEMA_DIR",
            Self::Pack(e) => e.code(),
            Self::Query(e) => e.code().code(),
        }
    }
}

/// CLI result type
pub type CliResult<T> = Result<T, CliError>;
