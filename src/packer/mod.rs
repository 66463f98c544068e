//! Object packing for keyquery
//!
//! Converts live instances and raw JSON documents into [`PackedRecord`]s:
//! typed keys per role, flattened full text and an opaque payload.
//!
//! # Design Principles
//!
//! - Identity is the primary key, nothing else
//! - Key arrays follow schema declaration order
//! - Packing is pure: same input, same keys, same payload bytes
//! - Wire field ids never change meaning
//! - Failures are returned, never swallowed

pub mod codec;
mod errors;
mod fulltext;
mod pack;
mod record;

pub use errors::{PackError, PackResult};
pub use fulltext::{flatten_field, tokenize_line, tokenize_lines, TokenizedLine, METADATA_MARKER};
pub use pack::{Packer, DEFAULT_COMPRESSION_LEVEL};
pub use record::PackedRecord;
