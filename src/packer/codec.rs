//! Binary wire format for packed records
//!
//! ```text
//! +------------------+
//! | Record Length    | (u32 LE, whole record)
//! +------------------+
//! | Field*           | [id u8][len u32 LE][bytes]
//! +------------------+
//! | Checksum         | (u32 LE, CRC32 of everything before it)
//! +------------------+
//! ```
//!
//! Field ids are stable across versions:
//!
//! | id | field |
//! |----|-------|
//! | 1  | type name |
//! | 2  | primary key |
//! | 3  | unique keys |
//! | 4  | index keys |
//! | 5  | payload |
//! | 7  | payload compressed |
//! | 8  | list index keys |
//! | 9  | full text |
//! | 10 | change number |
//! | 11 | tokenized full text |
//!
//! Unknown ids are skipped on decode. The transient rank is never encoded.

use std::io::{Cursor, Read};

use crc32fast::Hasher;

use crate::keys::{KeyRepr, KeyRole, KeyValue};

use super::errors::{PackError, PackResult};
use super::fulltext::TokenizedLine;
use super::record::PackedRecord;

pub const FIELD_TYPE_NAME: u8 = 1;
pub const FIELD_PRIMARY_KEY: u8 = 2;
pub const FIELD_UNIQUE_KEYS: u8 = 3;
pub const FIELD_INDEX_KEYS: u8 = 4;
pub const FIELD_PAYLOAD: u8 = 5;
pub const FIELD_COMPRESSED: u8 = 7;
pub const FIELD_LIST_INDEX_KEYS: u8 = 8;
pub const FIELD_FULL_TEXT: u8 = 9;
pub const FIELD_CHANGE_NUMBER: u8 = 10;
pub const FIELD_TOKENIZED_FULL_TEXT: u8 = 11;

const HEADER_SIZE: usize = 4;
const CHECKSUM_SIZE: usize = 4;

const REPR_INT: u8 = 0;
const REPR_TEXT: u8 = 1;

fn compute_checksum(data: &[u8]) -> u32 {
    let mut hasher = Hasher::new();
    hasher.update(data);
    hasher.finalize()
}

/// Encodes a record. Deterministic: equal records encode to equal bytes.
pub fn encode(record: &PackedRecord) -> Vec<u8> {
    let mut body = Vec::new();

    put_field(&mut body, FIELD_TYPE_NAME, record.type_name().as_bytes());

    let mut buf = Vec::new();
    write_key(&mut buf, record.primary_key());
    put_field(&mut body, FIELD_PRIMARY_KEY, &buf);

    put_field(&mut body, FIELD_UNIQUE_KEYS, &key_list(record.unique_keys()));
    put_field(&mut body, FIELD_INDEX_KEYS, &key_list(record.index_keys()));
    put_field(&mut body, FIELD_PAYLOAD, record.payload());
    put_field(&mut body, FIELD_COMPRESSED, &[u8::from(record.payload_compressed())]);
    put_field(&mut body, FIELD_LIST_INDEX_KEYS, &key_list(record.list_index_keys()));

    let mut buf = Vec::new();
    write_strings(&mut buf, record.full_text());
    put_field(&mut body, FIELD_FULL_TEXT, &buf);

    put_field(&mut body, FIELD_CHANGE_NUMBER, &record.change_number().to_le_bytes());

    if let Some(lines) = record.tokenized_full_text() {
        let mut buf = Vec::new();
        write_u32(&mut buf, lines.len());
        for line in lines {
            write_strings(&mut buf, &line.tokens);
        }
        put_field(&mut body, FIELD_TOKENIZED_FULL_TEXT, &buf);
    }

    let record_length = (HEADER_SIZE + body.len() + CHECKSUM_SIZE) as u32;

    let mut out = Vec::with_capacity(record_length as usize);
    out.extend_from_slice(&record_length.to_le_bytes());
    out.extend_from_slice(&body);
    let checksum = compute_checksum(&out);
    out.extend_from_slice(&checksum.to_le_bytes());
    out
}

/// Decodes a record, verifying length and checksum.
///
/// Returns the record and the number of bytes consumed.
pub fn decode(data: &[u8]) -> PackResult<(PackedRecord, usize)> {
    if data.len() < HEADER_SIZE + CHECKSUM_SIZE {
        return Err(corrupted("record too short"));
    }

    let record_length = u32::from_le_bytes([data[0], data[1], data[2], data[3]]) as usize;
    if record_length < HEADER_SIZE + CHECKSUM_SIZE {
        return Err(corrupted(format!("invalid record length: {}", record_length)));
    }
    if data.len() < record_length {
        return Err(corrupted(format!(
            "record truncated: expected {} bytes, got {}",
            record_length,
            data.len()
        )));
    }

    let checksum_offset = record_length - CHECKSUM_SIZE;
    let stored = u32::from_le_bytes([
        data[checksum_offset],
        data[checksum_offset + 1],
        data[checksum_offset + 2],
        data[checksum_offset + 3],
    ]);
    let computed = compute_checksum(&data[..checksum_offset]);
    if computed != stored {
        return Err(corrupted(format!(
            "checksum mismatch: computed {:08x}, stored {:08x}",
            computed, stored
        )));
    }

    let mut cursor = Cursor::new(&data[HEADER_SIZE..checksum_offset]);
    let end = (checksum_offset - HEADER_SIZE) as u64;

    let mut primary_key = None;
    let mut record_fields = Vec::new();
    while cursor.position() < end {
        let id = read_u8(&mut cursor)?;
        let value = read_bytes(&mut cursor)?;
        if id == FIELD_PRIMARY_KEY {
            primary_key = Some(read_key(&mut Cursor::new(value.as_slice()))?);
        } else {
            record_fields.push((id, value));
        }
    }

    let primary_key = primary_key.ok_or_else(|| corrupted("missing primary key"))?;
    let mut record = PackedRecord::new(primary_key);

    for (id, value) in record_fields {
        match id {
            FIELD_TYPE_NAME => {
                record.type_name = utf8(value)?;
                continue;
            }
            FIELD_PAYLOAD => {
                record.payload = value;
                continue;
            }
            _ => {}
        }

        let mut field = Cursor::new(value.as_slice());
        match id {
            FIELD_UNIQUE_KEYS => record.unique_keys = read_key_list(&mut field)?,
            FIELD_INDEX_KEYS => record.index_keys = read_key_list(&mut field)?,
            FIELD_COMPRESSED => record.payload_compressed = read_u8(&mut field)? != 0,
            FIELD_LIST_INDEX_KEYS => record.list_index_keys = read_key_list(&mut field)?,
            FIELD_FULL_TEXT => record.full_text = read_strings(&mut field)?,
            FIELD_CHANGE_NUMBER => record.change_number = read_i64(&mut field)?,
            FIELD_TOKENIZED_FULL_TEXT => {
                let count = read_u32(&mut field)?;
                let mut lines = Vec::new();
                for _ in 0..count {
                    lines.push(TokenizedLine {
                        tokens: read_strings(&mut field)?,
                    });
                }
                record.tokenized_full_text = Some(lines);
            }
            _ => {}
        }
    }

    Ok((record, record_length))
}

fn corrupted(reason: impl Into<String>) -> PackError {
    PackError::Corrupted(reason.into())
}

fn put_field(out: &mut Vec<u8>, id: u8, value: &[u8]) {
    out.push(id);
    write_u32(out, value.len());
    out.extend_from_slice(value);
}

fn write_u32(out: &mut Vec<u8>, value: usize) {
    out.extend_from_slice(&(value as u32).to_le_bytes());
}

fn write_str(out: &mut Vec<u8>, value: &str) {
    write_u32(out, value.len());
    out.extend_from_slice(value.as_bytes());
}

fn write_strings(out: &mut Vec<u8>, values: &[String]) {
    write_u32(out, values.len());
    for value in values {
        write_str(out, value);
    }
}

fn role_tag(role: KeyRole) -> u8 {
    match role {
        KeyRole::Primary => 0,
        KeyRole::Unique => 1,
        KeyRole::ScalarIndex => 2,
        KeyRole::ListIndex => 3,
    }
}

fn write_key(out: &mut Vec<u8>, key: &KeyValue) {
    write_str(out, key.name());
    out.push(role_tag(key.role()));
    match key.repr() {
        KeyRepr::Int(v) => {
            out.push(REPR_INT);
            out.extend_from_slice(&v.to_le_bytes());
        }
        KeyRepr::Text(v) => {
            out.push(REPR_TEXT);
            write_str(out, v);
        }
    }
}

fn key_list(keys: &[KeyValue]) -> Vec<u8> {
    let mut out = Vec::new();
    write_u32(&mut out, keys.len());
    for key in keys {
        write_key(&mut out, key);
    }
    out
}

fn read_array<const N: usize>(reader: &mut impl Read) -> PackResult<[u8; N]> {
    let mut buf = [0u8; N];
    reader
        .read_exact(&mut buf)
        .map_err(|e| corrupted(format!("unexpected end of field: {}", e)))?;
    Ok(buf)
}

fn read_u8(reader: &mut impl Read) -> PackResult<u8> {
    Ok(read_array::<1>(reader)?[0])
}

fn read_u32(reader: &mut impl Read) -> PackResult<usize> {
    Ok(u32::from_le_bytes(read_array::<4>(reader)?) as usize)
}

fn read_i64(reader: &mut impl Read) -> PackResult<i64> {
    Ok(i64::from_le_bytes(read_array::<8>(reader)?))
}

fn read_bytes(reader: &mut impl Read) -> PackResult<Vec<u8>> {
    let len = read_u32(reader)?;
    let mut buf = Vec::new();
    (&mut *reader)
        .take(len as u64)
        .read_to_end(&mut buf)
        .map_err(|e| corrupted(e.to_string()))?;
    if buf.len() != len {
        return Err(corrupted(format!("field truncated: expected {} bytes, got {}", len, buf.len())));
    }
    Ok(buf)
}

fn utf8(bytes: Vec<u8>) -> PackResult<String> {
    String::from_utf8(bytes).map_err(|e| corrupted(format!("invalid UTF-8: {}", e)))
}

fn read_string(reader: &mut impl Read) -> PackResult<String> {
    utf8(read_bytes(reader)?)
}

fn read_strings(reader: &mut impl Read) -> PackResult<Vec<String>> {
    let count = read_u32(reader)?;
    (0..count).map(|_| read_string(reader)).collect()
}

fn read_key(reader: &mut impl Read) -> PackResult<KeyValue> {
    let name = read_string(reader)?;
    let role = match read_u8(reader)? {
        0 => KeyRole::Primary,
        1 => KeyRole::Unique,
        2 => KeyRole::ScalarIndex,
        3 => KeyRole::ListIndex,
        other => return Err(corrupted(format!("unknown key role {}", other))),
    };
    let repr = match read_u8(reader)? {
        REPR_INT => KeyRepr::Int(read_i64(reader)?),
        REPR_TEXT => KeyRepr::Text(read_string(reader)?),
        other => return Err(corrupted(format!("unknown key representation {}", other))),
    };
    Ok(KeyValue::new(name, role, repr))
}

fn read_key_list(reader: &mut impl Read) -> PackResult<Vec<KeyValue>> {
    let count = read_u32(reader)?;
    (0..count).map(|_| read_key(reader)).collect()
}
