//! Type description: the name-addressed, accessor-free half of a schema
//!
//! A description lists the key fields of a registered type per role, in
//! declaration order, plus its full-text fields and compression policy. Both
//! the packer and the predicate compiler address fields by name through it.

use std::collections::HashSet;

use serde_json::Value;

use crate::keys::{KeyError, KeyKind, KeyResult, KeyRole, KeyValue, Scalar};

use super::errors::{SchemaError, SchemaResult};

/// A declared key field
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyField {
    /// Field name (matches the JSON property name)
    pub name: String,
    /// Role of the field
    pub role: KeyRole,
    /// Declared kind, selects the converter
    pub kind: KeyKind,
}

impl KeyField {
    pub fn new(name: impl Into<String>, role: KeyRole, kind: KeyKind) -> Self {
        Self {
            name: name.into(),
            role,
            kind,
        }
    }

    /// Fold a raw scalar into this field's key value
    pub fn key_value(&self, scalar: &Scalar) -> KeyResult<KeyValue> {
        let repr = self.kind.convert(scalar)?;
        Ok(KeyValue::new(&self.name, self.role, repr))
    }

    /// Fold a JSON value into this field's key value.
    ///
    /// A missing property folds like null.
    pub fn key_from_json(&self, value: Option<&Value>) -> KeyResult<KeyValue> {
        let scalar = match value {
            None => Scalar::Null,
            Some(v) => Scalar::from_json(v).ok_or_else(|| KeyError::NotScalar {
                field: self.name.clone(),
            })?,
        };
        self.key_value(&scalar)
    }
}

/// Immutable description of a registered type
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeDescription {
    type_name: String,
    primary_key: KeyField,
    unique_keys: Vec<KeyField>,
    index_keys: Vec<KeyField>,
    list_index_keys: Vec<KeyField>,
    full_text: Vec<String>,
    compressed: bool,
}

impl TypeDescription {
    /// Starts a description for the given full type name
    pub fn builder(type_name: impl Into<String>) -> DescriptionBuilder {
        DescriptionBuilder::new(type_name)
    }

    /// Full type name stamped on packed records
    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    pub fn primary_key(&self) -> &KeyField {
        &self.primary_key
    }

    pub fn unique_keys(&self) -> &[KeyField] {
        &self.unique_keys
    }

    pub fn index_keys(&self) -> &[KeyField] {
        &self.index_keys
    }

    pub fn list_index_keys(&self) -> &[KeyField] {
        &self.list_index_keys
    }

    /// Names of the full-text fields
    pub fn full_text(&self) -> &[String] {
        &self.full_text
    }

    /// Whether payloads of this type are compressed
    pub fn compressed(&self) -> bool {
        self.compressed
    }

    /// All key fields: primary, unique, scalar index, list index
    pub fn key_fields(&self) -> impl Iterator<Item = &KeyField> {
        std::iter::once(&self.primary_key)
            .chain(self.unique_keys.iter())
            .chain(self.index_keys.iter())
            .chain(self.list_index_keys.iter())
    }

    /// Finds a key field by name
    pub fn key_field(&self, name: &str) -> Option<&KeyField> {
        self.key_fields().find(|f| f.name == name)
    }
}

/// Builder validating a [`TypeDescription`]
#[derive(Debug, Clone)]
pub struct DescriptionBuilder {
    type_name: String,
    primary_key: Option<KeyField>,
    unique_keys: Vec<KeyField>,
    index_keys: Vec<KeyField>,
    list_index_keys: Vec<KeyField>,
    full_text: Vec<String>,
    compressed: bool,
}

impl DescriptionBuilder {
    pub fn new(type_name: impl Into<String>) -> Self {
        Self {
            type_name: type_name.into(),
            primary_key: None,
            unique_keys: Vec::new(),
            index_keys: Vec::new(),
            list_index_keys: Vec::new(),
            full_text: Vec::new(),
            compressed: false,
        }
    }

    pub fn primary_key(mut self, name: impl Into<String>, kind: KeyKind) -> Self {
        self.primary_key = Some(KeyField::new(name, KeyRole::Primary, kind));
        self
    }

    pub fn unique_key(mut self, name: impl Into<String>, kind: KeyKind) -> Self {
        self.unique_keys.push(KeyField::new(name, KeyRole::Unique, kind));
        self
    }

    pub fn index(mut self, name: impl Into<String>, kind: KeyKind) -> Self {
        self.index_keys.push(KeyField::new(name, KeyRole::ScalarIndex, kind));
        self
    }

    pub fn list_index(mut self, name: impl Into<String>, kind: KeyKind) -> Self {
        self.list_index_keys.push(KeyField::new(name, KeyRole::ListIndex, kind));
        self
    }

    pub fn full_text(mut self, name: impl Into<String>) -> Self {
        self.full_text.push(name.into());
        self
    }

    pub fn compressed(mut self, compressed: bool) -> Self {
        self.compressed = compressed;
        self
    }

    /// Validates and freezes the description.
    ///
    /// Fails with `KQ_UNREGISTERED_TYPE` when no primary key is declared and
    /// with `KQ_DUPLICATE_FIELD` when a key name appears twice.
    pub fn build(self) -> SchemaResult<TypeDescription> {
        let primary_key = self
            .primary_key
            .ok_or_else(|| SchemaError::missing_primary_key(&self.type_name))?;

        let mut seen = HashSet::new();
        let key_names = std::iter::once(&primary_key)
            .chain(self.unique_keys.iter())
            .chain(self.index_keys.iter())
            .chain(self.list_index_keys.iter())
            .map(|f| f.name.as_str());
        for name in key_names {
            if !seen.insert(name) {
                return Err(SchemaError::duplicate_field(&self.type_name, name));
            }
        }

        let mut seen_text = HashSet::new();
        for name in &self.full_text {
            if !seen_text.insert(name.as_str()) {
                return Err(SchemaError::duplicate_field(&self.type_name, name));
            }
        }

        Ok(TypeDescription {
            type_name: self.type_name,
            primary_key,
            unique_keys: self.unique_keys,
            index_keys: self.index_keys,
            list_index_keys: self.list_index_keys,
            full_text: self.full_text,
            compressed: self.compressed,
        })
    }
}
