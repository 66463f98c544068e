//! Type schemas for keyquery
//!
//! A schema lists the key fields of a registered type by role (primary,
//! unique, scalar index, list index), its full-text fields and its
//! compression policy. It is built once per type and read-only afterwards.
//!
//! # Design Principles
//!
//! - Exactly one primary key per type, mandatory
//! - Field order is declaration order, stable across calls
//! - Fields are matched by name, never by position
//! - Accessors are resolved at registration, no runtime type inspection
//! - First registration wins under concurrent first use

mod errors;
mod loader;
mod registry;
mod typed;
mod types;

pub use errors::{SchemaError, SchemaErrorCode, SchemaResult, Severity};
pub use loader::{parse_description, SchemaLoader};
pub use registry::SchemaRegistry;
pub use typed::{Indexable, TypeSchema, TypeSchemaBuilder};
pub use types::{DescriptionBuilder, KeyField, TypeDescription};
