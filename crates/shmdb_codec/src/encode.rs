//! Canonical payload encoders.
//!
//! One encoder per typed payload shape. Encoders normalize their input
//! (sets are sorted and deduplicated, dictionary and object keys are sorted
//! bytewise with duplicates rejected) and produce the exact little-endian
//! wire bytes; they never touch shared state, so a writer can build the
//! payload before taking the segment mutex.

use crate::error::{CodecError, CodecResult};
use crate::tag::ValueType;

/// A borrowed row-major `f64` matrix, used for dictionary-of-matrix entries.
#[derive(Debug, Clone, Copy)]
pub struct MatrixRef<'a> {
    /// Row count.
    pub rows: u32,
    /// Column count.
    pub cols: u32,
    /// `rows * cols` elements, row-major.
    pub data: &'a [f64],
}

/// One field of an OBJECT payload: name, tag, and already-encoded payload.
#[derive(Debug, Clone, Copy)]
pub struct ObjectField<'a> {
    /// Field name bytes (UTF-8 by convention).
    pub name: &'a [u8],
    /// Type tag of the field's payload.
    pub tag: ValueType,
    /// The field's bare typed payload (no tag prefix).
    pub payload: &'a [u8],
}

fn u32_len(len: usize, what: &str) -> CodecResult<u32> {
    u32::try_from(len).map_err(|_| CodecError::length_overflow(what))
}

fn put_u32(buf: &mut Vec<u8>, v: u32) {
    buf.extend_from_slice(&v.to_le_bytes());
}

/// Appends a CSR table: `count + 1` offsets followed by the concatenated
/// blob. The terminal offset equals the blob length.
fn put_csr(buf: &mut Vec<u8>, items: &[&[u8]], what: &str) -> CodecResult<()> {
    let mut off: u32 = 0;
    for item in items {
        put_u32(buf, off);
        off = off
            .checked_add(u32_len(item.len(), what)?)
            .ok_or_else(|| CodecError::length_overflow(what))?;
    }
    put_u32(buf, off);
    for item in items {
        buf.extend_from_slice(item);
    }
    Ok(())
}

fn pad_to_4(buf: &mut Vec<u8>) {
    while buf.len() % 4 != 0 {
        buf.push(0);
    }
}

/// Sorts dictionary entries by key bytes and rejects duplicates.
fn sort_dict<'a, T: Clone>(entries: &[(&'a [u8], T)]) -> CodecResult<Vec<(&'a [u8], T)>> {
    let mut sorted = entries.to_vec();
    sorted.sort_by(|a, b| a.0.cmp(b.0));
    for pair in sorted.windows(2) {
        if pair[0].0 == pair[1].0 {
            return Err(CodecError::duplicate_key(pair[0].0));
        }
    }
    Ok(sorted)
}

/// Encodes an `i64` scalar.
#[must_use]
pub fn encode_int_scalar(value: i64) -> Vec<u8> {
    value.to_le_bytes().to_vec()
}

/// Encodes an `f64` scalar.
#[must_use]
pub fn encode_float_scalar(value: f64) -> Vec<u8> {
    value.to_le_bytes().to_vec()
}

/// Encodes a bool scalar as a single 0/1 byte.
#[must_use]
pub fn encode_bool_scalar(value: bool) -> Vec<u8> {
    vec![u8::from(value)]
}

/// Encodes the null payload (no bytes).
#[must_use]
pub fn encode_null() -> Vec<u8> {
    Vec::new()
}

/// Encodes a string payload: `u32 len | bytes`.
pub fn encode_string(value: &[u8]) -> CodecResult<Vec<u8>> {
    let len = u32_len(value.len(), "string length")?;
    let mut buf = Vec::with_capacity(4 + value.len());
    put_u32(&mut buf, len);
    buf.extend_from_slice(value);
    Ok(buf)
}

/// Encodes a raw bytes payload; same shape as a string.
pub fn encode_bytes(value: &[u8]) -> CodecResult<Vec<u8>> {
    encode_string(value)
}

/// Encodes an `i64` vector: `u32 N | N x i64`.
pub fn encode_int_vector(values: &[i64]) -> CodecResult<Vec<u8>> {
    let count = u32_len(values.len(), "vector length")?;
    let mut buf = Vec::with_capacity(4 + values.len() * 8);
    put_u32(&mut buf, count);
    for v in values {
        buf.extend_from_slice(&v.to_le_bytes());
    }
    Ok(buf)
}

/// Encodes an `f64` vector: `u32 N | N x f64`.
pub fn encode_float_vector(values: &[f64]) -> CodecResult<Vec<u8>> {
    let count = u32_len(values.len(), "vector length")?;
    let mut buf = Vec::with_capacity(4 + values.len() * 8);
    put_u32(&mut buf, count);
    for v in values {
        buf.extend_from_slice(&v.to_le_bytes());
    }
    Ok(buf)
}

/// Encodes a bool vector: `u32 N | N x u8` of 0/1 bytes.
pub fn encode_bool_vector(values: &[bool]) -> CodecResult<Vec<u8>> {
    let count = u32_len(values.len(), "vector length")?;
    let mut buf = Vec::with_capacity(4 + values.len());
    put_u32(&mut buf, count);
    buf.extend(values.iter().map(|&b| u8::from(b)));
    Ok(buf)
}

/// Encodes an order-preserving string vector in CSR layout.
pub fn encode_string_vector(items: &[&[u8]]) -> CodecResult<Vec<u8>> {
    let count = u32_len(items.len(), "vector length")?;
    let mut buf = Vec::new();
    put_u32(&mut buf, count);
    put_csr(&mut buf, items, "string data")?;
    Ok(buf)
}

fn check_shape(rows: u32, cols: u32, actual: usize) -> CodecResult<()> {
    let expected = u64::from(rows) * u64::from(cols);
    if expected != actual as u64 {
        return Err(CodecError::ShapeMismatch {
            rows,
            cols,
            expected,
            actual,
        });
    }
    Ok(())
}

/// Encodes a row-major `i64` matrix: `u32 rows | u32 cols | data`.
pub fn encode_int_matrix(rows: u32, cols: u32, data: &[i64]) -> CodecResult<Vec<u8>> {
    check_shape(rows, cols, data.len())?;
    let mut buf = Vec::with_capacity(8 + data.len() * 8);
    put_u32(&mut buf, rows);
    put_u32(&mut buf, cols);
    for v in data {
        buf.extend_from_slice(&v.to_le_bytes());
    }
    Ok(buf)
}

/// Encodes a row-major `f64` matrix: `u32 rows | u32 cols | data`.
pub fn encode_float_matrix(rows: u32, cols: u32, data: &[f64]) -> CodecResult<Vec<u8>> {
    check_shape(rows, cols, data.len())?;
    let mut buf = Vec::with_capacity(8 + data.len() * 8);
    put_u32(&mut buf, rows);
    put_u32(&mut buf, cols);
    for v in data {
        buf.extend_from_slice(&v.to_le_bytes());
    }
    Ok(buf)
}

/// Encodes an `i64` set: input is sorted and deduplicated, then laid out
/// like a vector.
pub fn encode_int_set(values: &[i64]) -> CodecResult<Vec<u8>> {
    let mut sorted = values.to_vec();
    sorted.sort_unstable();
    sorted.dedup();
    encode_int_vector(&sorted)
}

/// Encodes an `f64` set.
///
/// Elements are ordered and deduplicated under `f64::total_cmp`, so `-0.0`
/// and `0.0` are distinct members and NaN payload bits are preserved.
pub fn encode_float_set(values: &[f64]) -> CodecResult<Vec<u8>> {
    let mut sorted = values.to_vec();
    sorted.sort_unstable_by(f64::total_cmp);
    sorted.dedup_by(|a, b| a.total_cmp(b).is_eq());
    encode_float_vector(&sorted)
}

/// Encodes a string set: sorted bytewise, deduplicated, CSR layout.
pub fn encode_string_set(items: &[&[u8]]) -> CodecResult<Vec<u8>> {
    let mut sorted = items.to_vec();
    sorted.sort_unstable();
    sorted.dedup();
    encode_string_vector(&sorted)
}

/// Encodes `Dict[str, i64]`: `u32 N | key CSR | N x i64`.
pub fn encode_dict_str_int(entries: &[(&[u8], i64)]) -> CodecResult<Vec<u8>> {
    let sorted = sort_dict(entries)?;
    let keys: Vec<&[u8]> = sorted.iter().map(|e| e.0).collect();
    let mut buf = Vec::new();
    put_u32(&mut buf, u32_len(sorted.len(), "dict length")?);
    put_csr(&mut buf, &keys, "dict keys")?;
    for (_, v) in &sorted {
        buf.extend_from_slice(&v.to_le_bytes());
    }
    Ok(buf)
}

/// Encodes `Dict[str, f64]`: `u32 N | key CSR | N x f64`.
pub fn encode_dict_str_float(entries: &[(&[u8], f64)]) -> CodecResult<Vec<u8>> {
    let sorted = sort_dict(entries)?;
    let keys: Vec<&[u8]> = sorted.iter().map(|e| e.0).collect();
    let mut buf = Vec::new();
    put_u32(&mut buf, u32_len(sorted.len(), "dict length")?);
    put_csr(&mut buf, &keys, "dict keys")?;
    for (_, v) in &sorted {
        buf.extend_from_slice(&v.to_le_bytes());
    }
    Ok(buf)
}

/// Encodes `Dict[str, bool]`: `u32 N | key CSR | N x u8`.
pub fn encode_dict_str_bool(entries: &[(&[u8], bool)]) -> CodecResult<Vec<u8>> {
    let sorted = sort_dict(entries)?;
    let keys: Vec<&[u8]> = sorted.iter().map(|e| e.0).collect();
    let mut buf = Vec::new();
    put_u32(&mut buf, u32_len(sorted.len(), "dict length")?);
    put_csr(&mut buf, &keys, "dict keys")?;
    buf.extend(sorted.iter().map(|&(_, v)| u8::from(v)));
    Ok(buf)
}

/// Encodes `Dict[str, string]`: `u32 N | key CSR | value CSR`.
pub fn encode_dict_str_string(entries: &[(&[u8], &[u8])]) -> CodecResult<Vec<u8>> {
    let sorted = sort_dict(entries)?;
    let keys: Vec<&[u8]> = sorted.iter().map(|e| e.0).collect();
    let values: Vec<&[u8]> = sorted.iter().map(|e| e.1).collect();
    let mut buf = Vec::new();
    put_u32(&mut buf, u32_len(sorted.len(), "dict length")?);
    put_csr(&mut buf, &keys, "dict keys")?;
    put_csr(&mut buf, &values, "dict values")?;
    Ok(buf)
}

/// Encodes `Dict[str, bytes]`; identical shape to `Dict[str, string]`.
pub fn encode_dict_str_bytes(entries: &[(&[u8], &[u8])]) -> CodecResult<Vec<u8>> {
    encode_dict_str_string(entries)
}

/// Encodes `Dict[str, Vec<f64>]`:
/// `u32 N | key CSR | u32 val_off[N+1] | u32 val_len[N] | f64 flat`.
///
/// Offsets and lengths count elements, not bytes.
pub fn encode_dict_str_float_vector(entries: &[(&[u8], &[f64])]) -> CodecResult<Vec<u8>> {
    let sorted = sort_dict(entries)?;
    let keys: Vec<&[u8]> = sorted.iter().map(|e| e.0).collect();
    let mut buf = Vec::new();
    put_u32(&mut buf, u32_len(sorted.len(), "dict length")?);
    put_csr(&mut buf, &keys, "dict keys")?;

    let mut off: u32 = 0;
    for (_, v) in &sorted {
        put_u32(&mut buf, off);
        off = off
            .checked_add(u32_len(v.len(), "flat vector elements")?)
            .ok_or_else(|| CodecError::length_overflow("flat vector elements"))?;
    }
    put_u32(&mut buf, off);
    for (_, v) in &sorted {
        put_u32(&mut buf, u32_len(v.len(), "flat vector elements")?);
    }
    for (_, v) in &sorted {
        for x in *v {
            buf.extend_from_slice(&x.to_le_bytes());
        }
    }
    Ok(buf)
}

/// Encodes `Dict[str, matrix<f64>]`:
/// `u32 N | key CSR | u32 val_off[N+1] | u32 rows[N] | u32 cols[N] | f64 flat`.
pub fn encode_dict_str_float_matrix(entries: &[(&[u8], MatrixRef<'_>)]) -> CodecResult<Vec<u8>> {
    for (_, m) in entries {
        check_shape(m.rows, m.cols, m.data.len())?;
    }
    let sorted = sort_dict(entries)?;
    let keys: Vec<&[u8]> = sorted.iter().map(|e| e.0).collect();
    let mut buf = Vec::new();
    put_u32(&mut buf, u32_len(sorted.len(), "dict length")?);
    put_csr(&mut buf, &keys, "dict keys")?;

    let mut off: u32 = 0;
    for (_, m) in &sorted {
        put_u32(&mut buf, off);
        off = off
            .checked_add(u32_len(m.data.len(), "flat matrix elements")?)
            .ok_or_else(|| CodecError::length_overflow("flat matrix elements"))?;
    }
    put_u32(&mut buf, off);
    for (_, m) in &sorted {
        put_u32(&mut buf, m.rows);
    }
    for (_, m) in &sorted {
        put_u32(&mut buf, m.cols);
    }
    for (_, m) in &sorted {
        for x in m.data {
            buf.extend_from_slice(&x.to_le_bytes());
        }
    }
    Ok(buf)
}

/// Encodes `Dict[str, Vec<string>]`:
/// `u32 N | key CSR | u32 list_off[N+1] | u32 n_strings | string CSR`.
///
/// `list_off` slices the string-offset index space; per-list string order is
/// preserved and strings are not deduplicated.
pub fn encode_dict_str_string_vector(entries: &[(&[u8], &[&[u8]])]) -> CodecResult<Vec<u8>> {
    let sorted = sort_dict(entries)?;
    let keys: Vec<&[u8]> = sorted.iter().map(|e| e.0).collect();
    let strings: Vec<&[u8]> = sorted.iter().flat_map(|e| e.1.iter().copied()).collect();
    let n_strings = u32_len(strings.len(), "string count")?;

    let mut buf = Vec::new();
    put_u32(&mut buf, u32_len(sorted.len(), "dict length")?);
    put_csr(&mut buf, &keys, "dict keys")?;

    let mut idx: u32 = 0;
    for (_, list) in &sorted {
        put_u32(&mut buf, idx);
        idx = idx
            .checked_add(u32_len(list.len(), "string count")?)
            .ok_or_else(|| CodecError::length_overflow("string count"))?;
    }
    put_u32(&mut buf, idx);
    put_u32(&mut buf, n_strings);
    put_csr(&mut buf, &strings, "string data")?;
    Ok(buf)
}

/// Encodes an OBJECT payload. Fields are sorted by name bytes; duplicate
/// names are rejected.
pub fn encode_object(fields: &[ObjectField<'_>]) -> CodecResult<Vec<u8>> {
    let mut sorted = fields.to_vec();
    sorted.sort_by(|a, b| a.name.cmp(b.name));
    for pair in sorted.windows(2) {
        if pair[0].name == pair[1].name {
            return Err(CodecError::duplicate_key(pair[0].name));
        }
    }

    let names: Vec<&[u8]> = sorted.iter().map(|f| f.name).collect();
    let payloads: Vec<&[u8]> = sorted.iter().map(|f| f.payload).collect();

    let mut buf = Vec::new();
    put_u32(&mut buf, u32_len(sorted.len(), "field count")?);
    put_csr(&mut buf, &names, "field names")?;
    buf.extend(sorted.iter().map(|f| f.tag.as_u8()));
    pad_to_4(&mut buf);
    put_csr(&mut buf, &payloads, "field payloads")?;
    Ok(buf)
}

/// Encodes a LIST payload. Element order is preserved.
pub fn encode_list(elems: &[(ValueType, &[u8])]) -> CodecResult<Vec<u8>> {
    let payloads: Vec<&[u8]> = elems.iter().map(|e| e.1).collect();

    let mut buf = Vec::new();
    put_u32(&mut buf, u32_len(elems.len(), "element count")?);
    buf.extend(elems.iter().map(|e| e.0.as_u8()));
    pad_to_4(&mut buf);
    put_csr(&mut buf, &payloads, "element payloads")?;
    Ok(buf)
}
