//! Packed record: the store-ready form of an object
//!
//! Keys plus an opaque payload. Identity is the primary key alone, so two
//! records with the same primary key are the same logical object whatever
//! their payloads. `transient_rank` is never persisted and never compared.

use std::collections::BTreeSet;
use std::fmt;
use std::hash::{Hash, Hasher};

use serde::{Deserialize, Serialize};

use crate::keys::{KeyRole, KeyValue};

use super::fulltext::{tokenize_lines, TokenizedLine};

/// An object packed into keys and payload
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PackedRecord {
    pub(crate) primary_key: KeyValue,
    pub(crate) unique_keys: Vec<KeyValue>,
    pub(crate) index_keys: Vec<KeyValue>,
    pub(crate) list_index_keys: Vec<KeyValue>,
    pub(crate) full_text: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub(crate) tokenized_full_text: Option<Vec<TokenizedLine>>,
    #[serde(with = "base64_bytes")]
    pub(crate) payload: Vec<u8>,
    pub(crate) payload_compressed: bool,
    pub(crate) type_name: String,
    pub(crate) change_number: i64,
    #[serde(skip)]
    pub(crate) transient_rank: f64,
}

impl PackedRecord {
    pub(crate) fn new(primary_key: KeyValue) -> Self {
        Self {
            primary_key,
            unique_keys: Vec::new(),
            index_keys: Vec::new(),
            list_index_keys: Vec::new(),
            full_text: Vec::new(),
            tokenized_full_text: None,
            payload: Vec::new(),
            payload_compressed: false,
            type_name: String::new(),
            change_number: 0,
            transient_rank: 0.0,
        }
    }

    pub fn primary_key(&self) -> &KeyValue {
        &self.primary_key
    }

    /// Unique keys in schema order
    pub fn unique_keys(&self) -> &[KeyValue] {
        &self.unique_keys
    }

    /// Scalar index keys in schema order
    pub fn index_keys(&self) -> &[KeyValue] {
        &self.index_keys
    }

    /// One key per collection element; several may share a field name
    pub fn list_index_keys(&self) -> &[KeyValue] {
        &self.list_index_keys
    }

    /// Raw full-text lines, before tokenization
    pub fn full_text(&self) -> &[String] {
        &self.full_text
    }

    pub fn tokenized_full_text(&self) -> Option<&[TokenizedLine]> {
        self.tokenized_full_text.as_deref()
    }

    /// Serialized object content, compressed when `payload_compressed`
    pub fn payload(&self) -> &[u8] {
        &self.payload
    }

    pub fn payload_compressed(&self) -> bool {
        self.payload_compressed
    }

    /// Full type name of the packed object
    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    pub fn change_number(&self) -> i64 {
        self.change_number
    }

    /// Set by the store when the object changes
    pub fn set_change_number(&mut self, change_number: i64) {
        self.change_number = change_number;
    }

    pub fn transient_rank(&self) -> f64 {
        self.transient_rank
    }

    /// Used only while merging results from several sources
    pub fn set_transient_rank(&mut self, rank: f64) {
        self.transient_rank = rank;
    }

    /// Type name followed by the primary key; unique across the store
    pub fn global_key(&self) -> String {
        format!("{}{}", self.type_name, self.primary_key)
    }

    /// Keys only: no payload, no type name, no full text
    pub fn metadata(&self) -> PackedRecord {
        let mut copy = PackedRecord::new(self.primary_key.clone());
        copy.unique_keys = self.unique_keys.clone();
        copy.index_keys = self.index_keys.clone();
        copy.list_index_keys = self.list_index_keys.clone();
        copy
    }

    /// Computes and stores the tokenized form of the full text
    pub fn tokenize_full_text(&mut self) -> &[TokenizedLine] {
        let tokens = tokenize_lines(&self.full_text);
        self.tokenized_full_text.insert(tokens)
    }

    /// Keys held under a role, in record order
    pub fn keys_for(&self, role: KeyRole) -> &[KeyValue] {
        match role {
            KeyRole::Primary => std::slice::from_ref(&self.primary_key),
            KeyRole::Unique => &self.unique_keys,
            KeyRole::ScalarIndex => &self.index_keys,
            KeyRole::ListIndex => &self.list_index_keys,
        }
    }

    /// Keys held under a role and field name
    pub fn keys_named<'a>(
        &'a self,
        role: KeyRole,
        name: &'a str,
    ) -> impl Iterator<Item = &'a KeyValue> + 'a {
        self.keys_for(role).iter().filter(move |k| k.name() == name)
    }

    /// True iff the record holds, under `role` and `name`, a key contained
    /// in `values`.
    pub fn match_one_of(&self, role: KeyRole, name: &str, values: &BTreeSet<KeyValue>) -> bool {
        self.keys_named(role, name).any(|k| values.contains(k))
    }
}

impl PartialEq for PackedRecord {
    fn eq(&self, other: &Self) -> bool {
        self.primary_key == other.primary_key
    }
}

impl Eq for PackedRecord {}

impl Hash for PackedRecord {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.primary_key.hash(state);
    }
}

impl fmt::Display for PackedRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {{", self.primary_key)?;
        for key in self
            .unique_keys
            .iter()
            .chain(&self.index_keys)
            .chain(&self.list_index_keys)
        {
            write!(f, " {}", key)?;
        }
        write!(f, " }} {} bytes", self.payload.len())
    }
}

mod base64_bytes {
    use base64::{engine::general_purpose::STANDARD, Engine as _};
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&STANDARD.encode(bytes))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        let encoded = String::deserialize(deserializer)?;
        STANDARD.decode(encoded).map_err(serde::de::Error::custom)
    }
}
