//! Object packer
//!
//! Two entry points share one contract: pack a live [`Indexable`] instance
//! through its schema accessors, or pack a raw JSON document by field name
//! through a [`TypeDescription`]. Steps, in order:
//!
//! 1. primary key
//! 2. unique keys and scalar index keys, in schema order
//! 3. list index keys, one per collection element, all fields concatenated
//! 4. full-text lines
//! 5. payload, compressed when the schema asks for it
//! 6. full type name
//!
//! Packing is deterministic: the same input and schema always yield the
//! same keys and the same payload bytes.

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{Map, Value};

use crate::config::CoreConfig;
use crate::observability::{self, Event, Logger};
use crate::schema::{Indexable, SchemaRegistry, TypeDescription};

use super::errors::{PackError, PackResult};
use super::fulltext::flatten_field;
use super::record::PackedRecord;

/// Default zstd level for compressed payloads
pub const DEFAULT_COMPRESSION_LEVEL: i32 = 3;

/// Packs objects and documents into [`PackedRecord`]s
#[derive(Debug, Clone, Copy)]
pub struct Packer {
    compression_level: i32,
}

impl Default for Packer {
    fn default() -> Self {
        Self::new(DEFAULT_COMPRESSION_LEVEL)
    }
}

impl Packer {
    pub fn new(compression_level: i32) -> Self {
        Self { compression_level }
    }

    pub fn from_config(config: &CoreConfig) -> Self {
        Self::new(config.compression_level)
    }

    pub fn compression_level(&self) -> i32 {
        self.compression_level
    }

    /// Packs a live instance, resolving its schema in the global registry
    pub fn pack<T: Indexable>(&self, instance: &T) -> PackResult<PackedRecord> {
        self.pack_in(SchemaRegistry::global(), instance)
    }

    /// Packs an optional instance; `None` is a null instance
    pub fn pack_optional<T: Indexable>(&self, instance: Option<&T>) -> PackResult<PackedRecord> {
        match instance {
            Some(instance) => self.pack(instance),
            None => Err(self.rejected(PackError::NullInstance)),
        }
    }

    /// Packs a live instance, resolving its schema in `registry`
    pub fn pack_in<T: Indexable>(
        &self,
        registry: &SchemaRegistry,
        instance: &T,
    ) -> PackResult<PackedRecord> {
        self.pack_instance(registry, instance)
            .map_err(|e| self.rejected(e))
    }

    /// Packs a JSON document given as text.
    ///
    /// The payload holds the document text as given.
    pub fn pack_json(&self, json: &str, description: &TypeDescription) -> PackResult<PackedRecord> {
        serde_json::from_str::<Value>(json)
            .map_err(|e| PackError::MalformedDocument(e.to_string()))
            .and_then(|document| {
                let record = self.keys_from_document(root_object(&document)?, description)?;
                self.finish(record, json.as_bytes().to_vec(), description)
            })
            .map_err(|e| self.rejected(e))
    }

    /// Packs a parsed JSON document
    pub fn pack_document(
        &self,
        document: &Value,
        description: &TypeDescription,
    ) -> PackResult<PackedRecord> {
        self.pack_parsed(document, description)
            .map_err(|e| self.rejected(e))
    }

    /// Packs any serializable value by its JSON form
    pub fn pack_value<V: Serialize + ?Sized>(
        &self,
        value: &V,
        description: &TypeDescription,
    ) -> PackResult<PackedRecord> {
        serde_json::to_value(value)
            .map_err(PackError::from)
            .and_then(|document| self.pack_parsed(&document, description))
            .map_err(|e| self.rejected(e))
    }

    /// Restores the original object from a packed record
    pub fn unpack<T: DeserializeOwned>(record: &PackedRecord) -> PackResult<T> {
        if record.payload_compressed {
            let content = zstd::decode_all(record.payload.as_slice()).map_err(PackError::Compression)?;
            Ok(serde_json::from_slice(&content)?)
        } else {
            Ok(serde_json::from_slice(&record.payload)?)
        }
    }

    fn pack_instance<T: Indexable>(
        &self,
        registry: &SchemaRegistry,
        instance: &T,
    ) -> PackResult<PackedRecord> {
        let schema = registry.resolve::<T>()?;
        let description = schema.description();

        let mut record = PackedRecord::new(schema.primary_key_of(instance)?);
        record.unique_keys = schema.unique_keys_of(instance)?;
        record.index_keys = schema.index_keys_of(instance)?;
        record.list_index_keys = schema.list_index_keys_of(instance)?;
        for value in schema.full_text_of(instance) {
            flatten_field(Some(&value), &mut record.full_text);
        }

        let content = serde_json::to_vec(instance)?;
        self.finish(record, content, description)
    }

    fn pack_parsed(&self, document: &Value, description: &TypeDescription) -> PackResult<PackedRecord> {
        let record = self.keys_from_document(root_object(document)?, description)?;
        let content = serde_json::to_vec(document)?;
        self.finish(record, content, description)
    }

    fn keys_from_document(
        &self,
        object: &Map<String, Value>,
        description: &TypeDescription,
    ) -> PackResult<PackedRecord> {
        let primary = description.primary_key();
        let mut record = PackedRecord::new(primary.key_from_json(object.get(&primary.name))?);

        record.unique_keys = description
            .unique_keys()
            .iter()
            .map(|field| field.key_from_json(object.get(&field.name)))
            .collect::<Result<_, _>>()?;

        record.index_keys = description
            .index_keys()
            .iter()
            .map(|field| field.key_from_json(object.get(&field.name)))
            .collect::<Result<_, _>>()?;

        for field in description.list_index_keys() {
            match object.get(&field.name) {
                None | Some(Value::Null) => {}
                Some(Value::Array(elements)) => {
                    for element in elements {
                        record.list_index_keys.push(field.key_from_json(Some(element))?);
                    }
                }
                Some(_) => {
                    return Err(PackError::MalformedDocument(format!(
                        "list index field '{}' is not an array",
                        field.name
                    )));
                }
            }
        }

        for name in description.full_text() {
            flatten_field(object.get(name), &mut record.full_text);
        }

        Ok(record)
    }

    fn finish(
        &self,
        mut record: PackedRecord,
        content: Vec<u8>,
        description: &TypeDescription,
    ) -> PackResult<PackedRecord> {
        record.payload = if description.compressed() {
            zstd::encode_all(content.as_slice(), self.compression_level)
                .map_err(PackError::Compression)?
        } else {
            content
        };
        record.payload_compressed = description.compressed();
        record.type_name = description.type_name().to_string();

        observability::metrics().record_packed(record.payload.len() as u64);
        if Logger::enabled(Event::RecordPacked.default_severity()) {
            let key = record.primary_key.to_string();
            let bytes = record.payload.len().to_string();
            Logger::log(
                Event::RecordPacked.default_severity(),
                Event::RecordPacked.as_str(),
                &[
                    ("bytes", bytes.as_str()),
                    ("key", key.as_str()),
                    ("type", record.type_name.as_str()),
                ],
            );
        }

        Ok(record)
    }

    fn rejected(&self, error: PackError) -> PackError {
        observability::metrics().increment_packs_rejected();
        Logger::log(
            Event::PackRejected.default_severity(),
            Event::PackRejected.as_str(),
            &[("code", error.code())],
        );
        error
    }
}

fn root_object(document: &Value) -> PackResult<&Map<String, Value>> {
    match document {
        Value::Object(object) => Ok(object),
        Value::Null => Err(PackError::NullInstance),
        Value::Array(_) => Err(PackError::ArrayPackUnsupported),
        other => Err(PackError::MalformedDocument(format!(
            "expected an object at the root, found {}",
            other
        ))),
    }
}
