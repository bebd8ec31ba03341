//! Dynamic typed value.
//!
//! [`Value`] is the materialized (owning) counterpart of the zero-copy
//! views: one variant per wire tag, encodable to and decodable from the
//! canonical payload bytes. It is the convenient way to build recursive
//! OBJECT/LIST trees and the oracle used by round-trip tests.

use crate::decode::{
    parse_bool_scalar, parse_bytes, parse_float_scalar, parse_int_scalar, parse_string,
    BoolVectorView, DictStrBoolView, DictStrFloatMatrixView, DictStrFloatVectorView,
    DictStrFloatView, DictStrIntView, DictStrStringVectorView, DictStrStringView,
    FloatMatrixView, FloatSetView, FloatVectorView, IntMatrixView, IntSetView, IntVectorView,
    StringSetView, StringVectorView,
};
use crate::encode;
use crate::error::{CodecError, CodecResult};
use crate::object::{ListView, ObjectView};
use crate::tag::ValueType;

/// An owning row-major matrix.
#[derive(Debug, Clone, PartialEq)]
pub struct Matrix<T> {
    /// Row count.
    pub rows: u32,
    /// Column count.
    pub cols: u32,
    /// `rows * cols` elements, row-major.
    pub data: Vec<T>,
}

impl<T> Matrix<T> {
    /// Creates a matrix, checking that `data` matches the dimensions.
    pub fn new(rows: u32, cols: u32, data: Vec<T>) -> CodecResult<Self> {
        let expected = u64::from(rows) * u64::from(cols);
        if expected != data.len() as u64 {
            return Err(CodecError::ShapeMismatch {
                rows,
                cols,
                expected,
                actual: data.len(),
            });
        }
        Ok(Self { rows, cols, data })
    }
}

/// A dynamic value covering every typed payload shape.
///
/// String-typed content is UTF-8; decoding payloads whose string bytes are
/// not valid UTF-8 fails with [`CodecError::InvalidUtf8`].
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// Null value (no payload bytes).
    Null,
    /// Boolean.
    Bool(bool),
    /// `i64` scalar.
    Int(i64),
    /// `f64` scalar.
    Float(f64),
    /// UTF-8 string.
    Str(String),
    /// Raw byte blob.
    Bytes(Vec<u8>),
    /// Homogeneous `i64` vector.
    IntVector(Vec<i64>),
    /// Homogeneous `f64` vector.
    FloatVector(Vec<f64>),
    /// Homogeneous bool vector.
    BoolVector(Vec<bool>),
    /// Order-preserving string vector.
    StringVector(Vec<String>),
    /// Row-major `i64` matrix.
    IntMatrix(Matrix<i64>),
    /// Row-major `f64` matrix.
    FloatMatrix(Matrix<f64>),
    /// Sorted unique `i64` set (normalized on encode).
    IntSet(Vec<i64>),
    /// Sorted unique `f64` set (normalized on encode).
    FloatSet(Vec<f64>),
    /// Sorted unique string set (normalized on encode).
    StringSet(Vec<String>),
    /// String-keyed `i64` dictionary (sorted on encode, unique keys).
    DictStrInt(Vec<(String, i64)>),
    /// String-keyed `f64` dictionary.
    DictStrFloat(Vec<(String, f64)>),
    /// String-keyed bool dictionary.
    DictStrBool(Vec<(String, bool)>),
    /// String-keyed string dictionary.
    DictStrString(Vec<(String, String)>),
    /// String-keyed bytes dictionary.
    DictStrBytes(Vec<(String, Vec<u8>)>),
    /// String-keyed `f64`-vector dictionary.
    DictStrFloatVector(Vec<(String, Vec<f64>)>),
    /// String-keyed `f64`-matrix dictionary.
    DictStrFloatMatrix(Vec<(String, Matrix<f64>)>),
    /// String-keyed string-vector dictionary.
    DictStrStringVector(Vec<(String, Vec<String>)>),
    /// Recursive string-keyed object (sorted on encode, unique names).
    Object(Vec<(String, Value)>),
    /// Recursive heterogeneous list.
    List(Vec<Value>),
}

fn utf8(bytes: &[u8]) -> CodecResult<String> {
    String::from_utf8(bytes.to_vec()).map_err(|_| CodecError::InvalidUtf8)
}

impl Value {
    /// Returns the wire tag for this value.
    #[must_use]
    pub fn tag(&self) -> ValueType {
        match self {
            Self::Null => ValueType::Null,
            Self::Bool(_) => ValueType::BoolScalar,
            Self::Int(_) => ValueType::IntScalar,
            Self::Float(_) => ValueType::FloatScalar,
            Self::Str(_) => ValueType::String,
            Self::Bytes(_) => ValueType::Bytes,
            Self::IntVector(_) => ValueType::IntVector,
            Self::FloatVector(_) => ValueType::FloatVector,
            Self::BoolVector(_) => ValueType::BoolVector,
            Self::StringVector(_) => ValueType::StringVector,
            Self::IntMatrix(_) => ValueType::IntMatrix,
            Self::FloatMatrix(_) => ValueType::FloatMatrix,
            Self::IntSet(_) => ValueType::IntSet,
            Self::FloatSet(_) => ValueType::FloatSet,
            Self::StringSet(_) => ValueType::StringSet,
            Self::DictStrInt(_) => ValueType::DictStrInt,
            Self::DictStrFloat(_) => ValueType::DictStrFloat,
            Self::DictStrBool(_) => ValueType::DictStrBool,
            Self::DictStrString(_) => ValueType::DictStrString,
            Self::DictStrBytes(_) => ValueType::DictStrBytes,
            Self::DictStrFloatVector(_) => ValueType::DictStrFloatVector,
            Self::DictStrFloatMatrix(_) => ValueType::DictStrFloatMatrix,
            Self::DictStrStringVector(_) => ValueType::DictStrStringVector,
            Self::Object(_) => ValueType::Object,
            Self::List(_) => ValueType::List,
        }
    }

    /// Encodes this value to its canonical payload bytes.
    ///
    /// Sets are sorted and deduplicated; dictionary and object keys are
    /// sorted with duplicates rejected.
    pub fn encode(&self) -> CodecResult<Vec<u8>> {
        match self {
            Self::Null => Ok(encode::encode_null()),
            Self::Bool(v) => Ok(encode::encode_bool_scalar(*v)),
            Self::Int(v) => Ok(encode::encode_int_scalar(*v)),
            Self::Float(v) => Ok(encode::encode_float_scalar(*v)),
            Self::Str(v) => encode::encode_string(v.as_bytes()),
            Self::Bytes(v) => encode::encode_bytes(v),
            Self::IntVector(v) => encode::encode_int_vector(v),
            Self::FloatVector(v) => encode::encode_float_vector(v),
            Self::BoolVector(v) => encode::encode_bool_vector(v),
            Self::StringVector(v) => {
                let items: Vec<&[u8]> = v.iter().map(|s| s.as_bytes()).collect();
                encode::encode_string_vector(&items)
            }
            Self::IntMatrix(m) => encode::encode_int_matrix(m.rows, m.cols, &m.data),
            Self::FloatMatrix(m) => encode::encode_float_matrix(m.rows, m.cols, &m.data),
            Self::IntSet(v) => encode::encode_int_set(v),
            Self::FloatSet(v) => encode::encode_float_set(v),
            Self::StringSet(v) => {
                let items: Vec<&[u8]> = v.iter().map(|s| s.as_bytes()).collect();
                encode::encode_string_set(&items)
            }
            Self::DictStrInt(entries) => {
                let pairs: Vec<(&[u8], i64)> =
                    entries.iter().map(|(k, v)| (k.as_bytes(), *v)).collect();
                encode::encode_dict_str_int(&pairs)
            }
            Self::DictStrFloat(entries) => {
                let pairs: Vec<(&[u8], f64)> =
                    entries.iter().map(|(k, v)| (k.as_bytes(), *v)).collect();
                encode::encode_dict_str_float(&pairs)
            }
            Self::DictStrBool(entries) => {
                let pairs: Vec<(&[u8], bool)> =
                    entries.iter().map(|(k, v)| (k.as_bytes(), *v)).collect();
                encode::encode_dict_str_bool(&pairs)
            }
            Self::DictStrString(entries) => {
                let pairs: Vec<(&[u8], &[u8])> = entries
                    .iter()
                    .map(|(k, v)| (k.as_bytes(), v.as_bytes()))
                    .collect();
                encode::encode_dict_str_string(&pairs)
            }
            Self::DictStrBytes(entries) => {
                let pairs: Vec<(&[u8], &[u8])> = entries
                    .iter()
                    .map(|(k, v)| (k.as_bytes(), v.as_slice()))
                    .collect();
                encode::encode_dict_str_bytes(&pairs)
            }
            Self::DictStrFloatVector(entries) => {
                let pairs: Vec<(&[u8], &[f64])> = entries
                    .iter()
                    .map(|(k, v)| (k.as_bytes(), v.as_slice()))
                    .collect();
                encode::encode_dict_str_float_vector(&pairs)
            }
            Self::DictStrFloatMatrix(entries) => {
                let pairs: Vec<(&[u8], encode::MatrixRef<'_>)> = entries
                    .iter()
                    .map(|(k, m)| {
                        (
                            k.as_bytes(),
                            encode::MatrixRef {
                                rows: m.rows,
                                cols: m.cols,
                                data: &m.data,
                            },
                        )
                    })
                    .collect();
                encode::encode_dict_str_float_matrix(&pairs)
            }
            Self::DictStrStringVector(entries) => {
                let lists: Vec<Vec<&[u8]>> = entries
                    .iter()
                    .map(|(_, v)| v.iter().map(|s| s.as_bytes()).collect())
                    .collect();
                let pairs: Vec<(&[u8], &[&[u8]])> = entries
                    .iter()
                    .zip(&lists)
                    .map(|((k, _), list)| (k.as_bytes(), list.as_slice()))
                    .collect();
                encode::encode_dict_str_string_vector(&pairs)
            }
            Self::Object(fields) => {
                let encoded: Vec<(ValueType, Vec<u8>)> = fields
                    .iter()
                    .map(|(_, v)| Ok((v.tag(), v.encode()?)))
                    .collect::<CodecResult<_>>()?;
                let refs: Vec<encode::ObjectField<'_>> = fields
                    .iter()
                    .zip(&encoded)
                    .map(|((name, _), (tag, payload))| encode::ObjectField {
                        name: name.as_bytes(),
                        tag: *tag,
                        payload,
                    })
                    .collect();
                encode::encode_object(&refs)
            }
            Self::List(elems) => {
                let encoded: Vec<(ValueType, Vec<u8>)> = elems
                    .iter()
                    .map(|v| Ok((v.tag(), v.encode()?)))
                    .collect::<CodecResult<_>>()?;
                let refs: Vec<(ValueType, &[u8])> = encoded
                    .iter()
                    .map(|(tag, payload)| (*tag, payload.as_slice()))
                    .collect();
                encode::encode_list(&refs)
            }
        }
    }

    /// Decodes a payload under the given tag.
    ///
    /// # Errors
    ///
    /// Fails on malformed payloads, non-UTF-8 string content, and the
    /// [`ValueType::Unknown`] tag (untyped payloads carry no shape to
    /// materialize).
    pub fn decode(tag: ValueType, payload: &[u8]) -> CodecResult<Self> {
        Ok(match tag {
            ValueType::Unknown => {
                return Err(CodecError::malformed("untyped payload cannot be decoded"))
            }
            ValueType::Null => Self::Null,
            ValueType::BoolScalar => Self::Bool(parse_bool_scalar(payload)?),
            ValueType::IntScalar => Self::Int(parse_int_scalar(payload)?),
            ValueType::FloatScalar => Self::Float(parse_float_scalar(payload)?),
            ValueType::String => Self::Str(utf8(parse_string(payload)?)?),
            ValueType::Bytes => Self::Bytes(parse_bytes(payload)?.to_vec()),
            ValueType::IntVector => Self::IntVector(IntVectorView::parse(payload)?.to_vec()),
            ValueType::FloatVector => Self::FloatVector(FloatVectorView::parse(payload)?.to_vec()),
            ValueType::BoolVector => Self::BoolVector(BoolVectorView::parse(payload)?.to_vec()),
            ValueType::StringVector => {
                let view = StringVectorView::parse(payload)?;
                Self::StringVector(view.iter().map(utf8).collect::<CodecResult<_>>()?)
            }
            ValueType::IntMatrix => {
                let view = IntMatrixView::parse(payload)?;
                Self::IntMatrix(Matrix::new(view.rows(), view.cols(), view.to_vec())?)
            }
            ValueType::FloatMatrix => {
                let view = FloatMatrixView::parse(payload)?;
                Self::FloatMatrix(Matrix::new(view.rows(), view.cols(), view.to_vec())?)
            }
            ValueType::IntSet => Self::IntSet(IntSetView::parse(payload)?.to_vec()),
            ValueType::FloatSet => Self::FloatSet(FloatSetView::parse(payload)?.to_vec()),
            ValueType::StringSet => {
                let view = StringSetView::parse(payload)?;
                Self::StringSet(view.iter().map(utf8).collect::<CodecResult<_>>()?)
            }
            ValueType::DictStrInt => {
                let view = DictStrIntView::parse(payload)?;
                Self::DictStrInt(
                    view.iter()
                        .map(|(k, v)| Ok((utf8(k)?, v)))
                        .collect::<CodecResult<_>>()?,
                )
            }
            ValueType::DictStrFloat => {
                let view = DictStrFloatView::parse(payload)?;
                Self::DictStrFloat(
                    view.iter()
                        .map(|(k, v)| Ok((utf8(k)?, v)))
                        .collect::<CodecResult<_>>()?,
                )
            }
            ValueType::DictStrBool => {
                let view = DictStrBoolView::parse(payload)?;
                Self::DictStrBool(
                    view.iter()
                        .map(|(k, v)| Ok((utf8(k)?, v)))
                        .collect::<CodecResult<_>>()?,
                )
            }
            ValueType::DictStrString => {
                let view = DictStrStringView::parse(payload)?;
                Self::DictStrString(
                    view.iter()
                        .map(|(k, v)| Ok((utf8(k)?, utf8(v)?)))
                        .collect::<CodecResult<_>>()?,
                )
            }
            ValueType::DictStrBytes => {
                let view = DictStrStringView::parse(payload)?;
                Self::DictStrBytes(
                    view.iter()
                        .map(|(k, v)| Ok((utf8(k)?, v.to_vec())))
                        .collect::<CodecResult<_>>()?,
                )
            }
            ValueType::DictStrFloatVector => {
                let view = DictStrFloatVectorView::parse(payload)?;
                let mut entries = Vec::with_capacity(view.len());
                for i in 0..view.len() {
                    let key = view.key_at(i).ok_or(CodecError::UnexpectedEof)?;
                    let vec = view.value_at(i).ok_or(CodecError::UnexpectedEof)?;
                    entries.push((utf8(key)?, vec.to_vec()));
                }
                Self::DictStrFloatVector(entries)
            }
            ValueType::DictStrFloatMatrix => {
                let view = DictStrFloatMatrixView::parse(payload)?;
                let mut entries = Vec::with_capacity(view.len());
                for i in 0..view.len() {
                    let key = view.key_at(i).ok_or(CodecError::UnexpectedEof)?;
                    let m = view.value_at(i).ok_or(CodecError::UnexpectedEof)?;
                    entries.push((utf8(key)?, Matrix::new(m.rows(), m.cols(), m.to_vec())?));
                }
                Self::DictStrFloatMatrix(entries)
            }
            ValueType::DictStrStringVector => {
                let view = DictStrStringVectorView::parse(payload)?;
                let mut entries = Vec::with_capacity(view.len());
                for i in 0..view.len() {
                    let key = view.key_at(i).ok_or(CodecError::UnexpectedEof)?;
                    let list = view.value_at(i).ok_or(CodecError::UnexpectedEof)?;
                    entries.push((
                        utf8(key)?,
                        list.iter().map(utf8).collect::<CodecResult<_>>()?,
                    ));
                }
                Self::DictStrStringVector(entries)
            }
            ValueType::Object => {
                let view = ObjectView::parse(payload)?;
                let mut fields = Vec::with_capacity(view.len());
                for entry in view.iter() {
                    let (name, field) = entry?;
                    fields.push((utf8(name)?, Self::decode(field.tag, field.payload)?));
                }
                Self::Object(fields)
            }
            ValueType::List => {
                let view = ListView::parse(payload)?;
                let mut elems = Vec::with_capacity(view.len());
                for elem in view.iter() {
                    let elem = elem?;
                    elems.push(Self::decode(elem.tag, elem.payload)?);
                }
                Self::List(elems)
            }
        })
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Self::Bool(v)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Self::Int(v)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Self::Float(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Self::Str(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Self::Str(v)
    }
}

impl From<Vec<u8>> for Value {
    fn from(v: Vec<u8>) -> Self {
        Self::Bytes(v)
    }
}
