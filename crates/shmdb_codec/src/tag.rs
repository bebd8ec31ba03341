//! One-byte value type tags.
//!
//! Every node in a segment carries one of these tags, and OBJECT/LIST
//! payloads embed them per field/element. The numeric values are part of
//! the wire format and must never be renumbered.

use crate::error::{CodecError, CodecResult};
use std::fmt;

/// Type tag selecting one of the typed payload shapes.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ValueType {
    /// Untyped raw bytes written through the plain insert path.
    Unknown = 0,
    /// `i64` scalar, 8 bytes.
    IntScalar = 1,
    /// `f64` scalar, 8 bytes.
    FloatScalar = 2,
    /// `u32 len | bytes`, no NUL terminator.
    String = 3,
    /// `u32 N | N x i64`.
    IntVector = 4,
    /// `u32 N | N x f64`.
    FloatVector = 5,
    /// `u32 rows | u32 cols | rows*cols x i64`, row-major.
    IntMatrix = 6,
    /// `u32 rows | u32 cols | rows*cols x f64`, row-major.
    FloatMatrix = 7,
    /// Sorted, deduplicated `i64` elements in vector layout.
    IntSet = 8,
    /// Sorted, deduplicated `f64` elements in vector layout.
    FloatSet = 9,
    /// Sorted, deduplicated strings in CSR layout.
    StringSet = 10,
    /// `u32 N | u32 key_off[N+1] | keys | N x i64`, keys sorted.
    DictStrInt = 11,
    /// Same as [`DictStrInt`](Self::DictStrInt) with `f64` values.
    DictStrFloat = 12,
    /// Order-preserving strings in CSR layout.
    StringVector = 13,
    /// `u32 len | bytes` raw blob.
    Bytes = 14,
    /// Two parallel CSR tables: sorted keys, then values.
    DictStrString = 15,
    /// One byte, 0 or 1.
    BoolScalar = 16,
    /// `u32 N | N x u8` of 0/1 bytes.
    BoolVector = 17,
    /// Recursive string-keyed object, fields sorted by name.
    Object = 18,
    /// Recursive heterogeneous list, input order preserved.
    List = 19,
    /// Keys CSR plus element-indexed flat `f64` storage.
    DictStrFloatVector = 20,
    /// Keys CSR plus per-entry rows/cols and flat `f64` storage.
    DictStrFloatMatrix = 21,
    /// Keys CSR plus a two-level string CSR.
    DictStrStringVector = 22,
    /// Keys CSR plus `N x u8` of 0/1 bytes.
    DictStrBool = 23,
    /// Two parallel CSR tables: sorted keys, then byte blobs.
    DictStrBytes = 24,
    /// No payload bytes at all.
    Null = 25,
}

impl ValueType {
    /// Returns the wire byte for this tag.
    #[must_use]
    pub const fn as_u8(self) -> u8 {
        self as u8
    }

    /// Parses a wire byte into a tag.
    ///
    /// # Errors
    ///
    /// Returns [`CodecError::UnknownTag`] for bytes outside the catalog.
    pub const fn from_u8(tag: u8) -> CodecResult<Self> {
        Ok(match tag {
            0 => Self::Unknown,
            1 => Self::IntScalar,
            2 => Self::FloatScalar,
            3 => Self::String,
            4 => Self::IntVector,
            5 => Self::FloatVector,
            6 => Self::IntMatrix,
            7 => Self::FloatMatrix,
            8 => Self::IntSet,
            9 => Self::FloatSet,
            10 => Self::StringSet,
            11 => Self::DictStrInt,
            12 => Self::DictStrFloat,
            13 => Self::StringVector,
            14 => Self::Bytes,
            15 => Self::DictStrString,
            16 => Self::BoolScalar,
            17 => Self::BoolVector,
            18 => Self::Object,
            19 => Self::List,
            20 => Self::DictStrFloatVector,
            21 => Self::DictStrFloatMatrix,
            22 => Self::DictStrStringVector,
            23 => Self::DictStrBool,
            24 => Self::DictStrBytes,
            25 => Self::Null,
            other => return Err(CodecError::UnknownTag { tag: other }),
        })
    }
}

impl fmt::Display for ValueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Unknown => "unknown",
            Self::IntScalar => "int_scalar",
            Self::FloatScalar => "float_scalar",
            Self::String => "string",
            Self::IntVector => "int_vector",
            Self::FloatVector => "float_vector",
            Self::IntMatrix => "int_matrix",
            Self::FloatMatrix => "float_matrix",
            Self::IntSet => "int_set",
            Self::FloatSet => "float_set",
            Self::StringSet => "string_set",
            Self::DictStrInt => "dict_str_int",
            Self::DictStrFloat => "dict_str_float",
            Self::StringVector => "string_vector",
            Self::Bytes => "bytes",
            Self::DictStrString => "dict_str_string",
            Self::BoolScalar => "bool_scalar",
            Self::BoolVector => "bool_vector",
            Self::Object => "object",
            Self::List => "list",
            Self::DictStrFloatVector => "dict_str_float_vector",
            Self::DictStrFloatMatrix => "dict_str_float_matrix",
            Self::DictStrStringVector => "dict_str_string_vector",
            Self::DictStrBool => "dict_str_bool",
            Self::DictStrBytes => "dict_str_bytes",
            Self::Null => "null",
        };
        f.write_str(name)
    }
}
