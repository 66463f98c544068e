//! Typed schemas: a description plus per-field accessor closures
//!
//! Accessors are resolved once when the schema is built and stored by role
//! and ordinal, so packing a live instance never inspects its type at runtime.

use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

use crate::keys::{KeyKind, KeyResult, KeyValue, Scalar};

use super::errors::{SchemaError, SchemaResult};
use super::types::{DescriptionBuilder, TypeDescription};

type ScalarAccessor<T> = Box<dyn Fn(&T) -> Scalar + Send + Sync>;
type ListAccessor<T> = Box<dyn Fn(&T) -> Vec<Scalar> + Send + Sync>;
type TextAccessor<T> = Box<dyn Fn(&T) -> Value + Send + Sync>;

/// A type whose instances can be packed and queried.
///
/// The schema is built at most once per process by the
/// [`SchemaRegistry`](super::SchemaRegistry).
pub trait Indexable: Serialize + DeserializeOwned + Send + Sync + 'static {
    /// Declares the key fields of this type
    fn type_schema() -> SchemaResult<TypeSchema<Self>>;
}

/// Schema of a Rust type: description and accessors in declaration order
pub struct TypeSchema<T> {
    description: Arc<TypeDescription>,
    primary_key: ScalarAccessor<T>,
    unique_keys: Vec<ScalarAccessor<T>>,
    index_keys: Vec<ScalarAccessor<T>>,
    list_index_keys: Vec<ListAccessor<T>>,
    full_text: Vec<TextAccessor<T>>,
}

impl<T> TypeSchema<T> {
    /// Starts a typed schema for the given full type name
    pub fn builder(type_name: impl Into<String>) -> TypeSchemaBuilder<T> {
        TypeSchemaBuilder::new(type_name)
    }

    pub fn description(&self) -> &TypeDescription {
        &self.description
    }

    /// Shared handle on the description
    pub fn description_arc(&self) -> Arc<TypeDescription> {
        Arc::clone(&self.description)
    }

    pub fn primary_key_of(&self, instance: &T) -> KeyResult<KeyValue> {
        self.description
            .primary_key()
            .key_value(&(self.primary_key)(instance))
    }

    /// Unique keys of an instance, in schema order
    pub fn unique_keys_of(&self, instance: &T) -> KeyResult<Vec<KeyValue>> {
        self.description
            .unique_keys()
            .iter()
            .zip(&self.unique_keys)
            .map(|(field, accessor)| field.key_value(&accessor(instance)))
            .collect()
    }

    /// Scalar index keys of an instance, in schema order
    pub fn index_keys_of(&self, instance: &T) -> KeyResult<Vec<KeyValue>> {
        self.description
            .index_keys()
            .iter()
            .zip(&self.index_keys)
            .map(|(field, accessor)| field.key_value(&accessor(instance)))
            .collect()
    }

    /// One key per collection element, all list fields concatenated
    pub fn list_index_keys_of(&self, instance: &T) -> KeyResult<Vec<KeyValue>> {
        let mut keys = Vec::new();
        for (field, accessor) in self.description.list_index_keys().iter().zip(&self.list_index_keys) {
            for element in accessor(instance) {
                keys.push(field.key_value(&element)?);
            }
        }
        Ok(keys)
    }

    /// Full-text field values of an instance, in schema order, before
    /// flattening
    pub fn full_text_of(&self, instance: &T) -> Vec<Value> {
        self.full_text.iter().map(|accessor| accessor(instance)).collect()
    }
}

/// Builder pairing each declared field with its accessor
pub struct TypeSchemaBuilder<T> {
    description: DescriptionBuilder,
    primary_key: Option<ScalarAccessor<T>>,
    unique_keys: Vec<ScalarAccessor<T>>,
    index_keys: Vec<ScalarAccessor<T>>,
    list_index_keys: Vec<ListAccessor<T>>,
    full_text: Vec<TextAccessor<T>>,
}

impl<T> TypeSchemaBuilder<T> {
    pub fn new(type_name: impl Into<String>) -> Self {
        Self {
            description: DescriptionBuilder::new(type_name),
            primary_key: None,
            unique_keys: Vec::new(),
            index_keys: Vec::new(),
            list_index_keys: Vec::new(),
            full_text: Vec::new(),
        }
    }

    pub fn primary_key<F>(mut self, name: impl Into<String>, kind: KeyKind, accessor: F) -> Self
    where
        F: Fn(&T) -> Scalar + Send + Sync + 'static,
    {
        self.description = self.description.primary_key(name, kind);
        self.primary_key = Some(Box::new(accessor));
        self
    }

    pub fn unique_key<F>(mut self, name: impl Into<String>, kind: KeyKind, accessor: F) -> Self
    where
        F: Fn(&T) -> Scalar + Send + Sync + 'static,
    {
        self.description = self.description.unique_key(name, kind);
        self.unique_keys.push(Box::new(accessor));
        self
    }

    pub fn index<F>(mut self, name: impl Into<String>, kind: KeyKind, accessor: F) -> Self
    where
        F: Fn(&T) -> Scalar + Send + Sync + 'static,
    {
        self.description = self.description.index(name, kind);
        self.index_keys.push(Box::new(accessor));
        self
    }

    /// Declares a collection field; every element is indexed on its own
    pub fn list_index<F>(mut self, name: impl Into<String>, kind: KeyKind, accessor: F) -> Self
    where
        F: Fn(&T) -> Vec<Scalar> + Send + Sync + 'static,
    {
        self.description = self.description.list_index(name, kind);
        self.list_index_keys.push(Box::new(accessor));
        self
    }

    /// Declares a full-text field.
    ///
    /// The accessor returns the field as JSON; the packer flattens it the same
    /// way it flattens the field of a raw document.
    pub fn full_text<F>(mut self, name: impl Into<String>, accessor: F) -> Self
    where
        F: Fn(&T) -> Value + Send + Sync + 'static,
    {
        self.description = self.description.full_text(name);
        self.full_text.push(Box::new(accessor));
        self
    }

    pub fn compressed(mut self, compressed: bool) -> Self {
        self.description = self.description.compressed(compressed);
        self
    }

    pub fn build(self) -> SchemaResult<TypeSchema<T>> {
        let description = self.description.build()?;
        let primary_key = self
            .primary_key
            .ok_or_else(|| SchemaError::missing_primary_key(description.type_name()))?;

        Ok(TypeSchema {
            description: Arc::new(description),
            primary_key,
            unique_keys: self.unique_keys,
            index_keys: self.index_keys,
            list_index_keys: self.list_index_keys,
            full_text: self.full_text,
        })
    }
}
