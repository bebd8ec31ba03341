//! # shmdb codec
//!
//! Typed value wire codec for shmdb shared-memory segments.
//!
//! Every value stored in a segment is one of ~25 typed payload shapes
//! selected by a one-byte tag. This crate owns that wire format:
//!
//! - [`ValueType`]: the tag catalog (fixed numeric values);
//! - `encode_*`: canonical payload builders (sets sorted + deduplicated,
//!   dictionary/object keys sorted with duplicates rejected);
//! - `*View`: zero-copy parsers over borrowed payload bytes, including the
//!   recursive [`ObjectView`]/[`ListView`] pair with binary-search field
//!   access;
//! - [`Value`]: the owning dynamic value for building nested trees and
//!   materializing payloads.
//!
//! All multi-byte integers are little-endian. Variable-length collections
//! use the CSR form: `count + 1` offsets plus a contiguous blob, the
//! terminal offset equal to the blob length.
//!
//! ## Example
//!
//! ```
//! use shmdb_codec::{Value, ValueType};
//!
//! let value = Value::DictStrInt(vec![("b".into(), 2), ("a".into(), 1)]);
//! let payload = value.encode().unwrap();
//! let decoded = Value::decode(ValueType::DictStrInt, &payload).unwrap();
//! // Keys come back sorted.
//! assert_eq!(
//!     decoded,
//!     Value::DictStrInt(vec![("a".into(), 1), ("b".into(), 2)])
//! );
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod decode;
mod encode;
mod error;
mod object;
mod tag;
mod value;

pub use decode::{
    parse_bool_scalar, parse_bytes, parse_float_scalar, parse_int_scalar, parse_string,
    BoolVectorView, DictStrBoolView, DictStrBytesView, DictStrFloatMatrixView,
    DictStrFloatVectorView, DictStrFloatView, DictStrIntView, DictStrStringVectorView,
    DictStrStringView, FloatMatrixView, FloatSetView, FloatVectorView, IntMatrixView, IntSetView,
    IntVectorView, OffsetTable, StringListView, StringSetView, StringVectorView,
};
pub use encode::{
    encode_bool_scalar, encode_bool_vector, encode_bytes, encode_dict_str_bool,
    encode_dict_str_bytes, encode_dict_str_float, encode_dict_str_float_matrix,
    encode_dict_str_float_vector, encode_dict_str_int, encode_dict_str_string,
    encode_dict_str_string_vector, encode_float_matrix, encode_float_scalar, encode_float_set,
    encode_float_vector, encode_int_matrix, encode_int_scalar, encode_int_set, encode_int_vector,
    encode_list, encode_null, encode_object, encode_string, encode_string_set,
    encode_string_vector, MatrixRef, ObjectField,
};
pub use error::{CodecError, CodecResult};
pub use object::{ListView, ObjectView, TypedValueView};
pub use tag::ValueType;
pub use value::{Matrix, Value};
