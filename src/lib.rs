//! keyquery - schema-driven object packing and predicate compilation
//!
//! Client-side core of an indexed object store: objects of registered types
//! are packed into keys plus an opaque payload, and predicates over those
//! types are compiled into OR-of-AND key tests the index engine evaluates.

pub mod cli;
pub mod config;
pub mod keys;
pub mod observability;
pub mod packer;
pub mod query;
pub mod schema;
