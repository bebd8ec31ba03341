//! Typed insert/lookup catalog.
//!
//! One insert/lookup pair per payload shape. Inserts encode the canonical
//! payload in caller-local memory (normalizing sets and dictionaries
//! there), then funnel through the shared tagged-insert skeleton. Lookups
//! find the node, check the stored tag, parse a zero-copy view, and
//! validate the whole read against the generation bracket.

use crate::error::{ShmError, ShmResult};
use crate::segment::Segment;
use shmdb_codec::{
    self as codec, BoolVectorView, CodecResult, DictStrBoolView, DictStrBytesView,
    DictStrFloatMatrixView, DictStrFloatVectorView, DictStrFloatView, DictStrIntView,
    DictStrStringVectorView, DictStrStringView, FloatMatrixView, FloatSetView, FloatVectorView,
    IntMatrixView, IntSetView, IntVectorView, ListView, MatrixRef, ObjectField, ObjectView,
    StringSetView, StringVectorView, Value, ValueType,
};

impl Segment {
    fn lookup_typed<'a, T>(
        &'a self,
        key: &[u8],
        expected: ValueType,
        parse: impl FnOnce(&'a [u8]) -> CodecResult<T>,
    ) -> ShmResult<T> {
        Self::validate_key(key)?;
        let g1 = self.generation();
        let Some(node) = self.find_node(key)? else {
            return Err(self.not_found(g1));
        };
        // An unrecognized tag byte means the node was torn (or the arena
        // corrupted); never report it as a decoded value.
        let actual = ValueType::from_u8(node.value_type)
            .map_err(|_| ShmError::ConcurrentModification)?;
        if actual != expected {
            return Err(ShmError::TypeMismatch { expected, actual });
        }
        let parsed = parse(self.payload_slice(node.val_off, node.val_len));
        if self.generation() != g1 {
            return Err(ShmError::ConcurrentModification);
        }
        parsed.map_err(ShmError::from)
    }

    /// Returns the stored type tag for `key`.
    pub fn get_value_type(&self, key: &[u8]) -> ShmResult<ValueType> {
        Self::validate_key(key)?;
        let g1 = self.generation();
        let Some(node) = self.find_node(key)? else {
            return Err(self.not_found(g1));
        };
        let tag = ValueType::from_u8(node.value_type)
            .map_err(|_| ShmError::ConcurrentModification)?;
        if self.generation() != g1 {
            return Err(ShmError::ConcurrentModification);
        }
        Ok(tag)
    }

    // ------------------------------------------------------------------
    // Scalars
    // ------------------------------------------------------------------

    /// Stores an `i64` scalar.
    pub fn insert_int_scalar(&self, key: &[u8], value: i64) -> ShmResult<()> {
        self.insert_tagged(key, ValueType::IntScalar, &codec::encode_int_scalar(value))
    }

    /// Reads an `i64` scalar.
    pub fn lookup_int_scalar(&self, key: &[u8]) -> ShmResult<i64> {
        self.lookup_typed(key, ValueType::IntScalar, codec::parse_int_scalar)
    }

    /// Stores an `f64` scalar.
    pub fn insert_float_scalar(&self, key: &[u8], value: f64) -> ShmResult<()> {
        self.insert_tagged(key, ValueType::FloatScalar, &codec::encode_float_scalar(value))
    }

    /// Reads an `f64` scalar.
    pub fn lookup_float_scalar(&self, key: &[u8]) -> ShmResult<f64> {
        self.lookup_typed(key, ValueType::FloatScalar, codec::parse_float_scalar)
    }

    /// Stores a bool scalar.
    pub fn insert_bool_scalar(&self, key: &[u8], value: bool) -> ShmResult<()> {
        self.insert_tagged(key, ValueType::BoolScalar, &codec::encode_bool_scalar(value))
    }

    /// Reads a bool scalar.
    pub fn lookup_bool_scalar(&self, key: &[u8]) -> ShmResult<bool> {
        self.lookup_typed(key, ValueType::BoolScalar, codec::parse_bool_scalar)
    }

    /// Stores a null value (no payload bytes).
    pub fn insert_null(&self, key: &[u8]) -> ShmResult<()> {
        self.insert_tagged(key, ValueType::Null, &codec::encode_null())
    }

    // ------------------------------------------------------------------
    // Strings and bytes
    // ------------------------------------------------------------------

    /// Stores a string (raw bytes, no NUL terminator).
    pub fn insert_string(&self, key: &[u8], value: &[u8]) -> ShmResult<()> {
        self.insert_tagged(key, ValueType::String, &codec::encode_string(value)?)
    }

    /// Reads a string as a borrowed byte slice.
    pub fn lookup_string(&self, key: &[u8]) -> ShmResult<&[u8]> {
        self.lookup_typed(key, ValueType::String, codec::parse_string)
    }

    /// Stores a raw bytes blob.
    pub fn insert_bytes(&self, key: &[u8], value: &[u8]) -> ShmResult<()> {
        self.insert_tagged(key, ValueType::Bytes, &codec::encode_bytes(value)?)
    }

    /// Reads a bytes blob as a borrowed slice.
    pub fn lookup_bytes(&self, key: &[u8]) -> ShmResult<&[u8]> {
        self.lookup_typed(key, ValueType::Bytes, codec::parse_bytes)
    }

    // ------------------------------------------------------------------
    // Vectors
    // ------------------------------------------------------------------

    /// Stores an `i64` vector.
    pub fn insert_int_vector(&self, key: &[u8], values: &[i64]) -> ShmResult<()> {
        self.insert_tagged(key, ValueType::IntVector, &codec::encode_int_vector(values)?)
    }

    /// Reads an `i64` vector view.
    pub fn lookup_int_vector(&self, key: &[u8]) -> ShmResult<IntVectorView<'_>> {
        self.lookup_typed(key, ValueType::IntVector, IntVectorView::parse)
    }

    /// Stores an `f64` vector.
    pub fn insert_float_vector(&self, key: &[u8], values: &[f64]) -> ShmResult<()> {
        self.insert_tagged(key, ValueType::FloatVector, &codec::encode_float_vector(values)?)
    }

    /// Reads an `f64` vector view.
    pub fn lookup_float_vector(&self, key: &[u8]) -> ShmResult<FloatVectorView<'_>> {
        self.lookup_typed(key, ValueType::FloatVector, FloatVectorView::parse)
    }

    /// Stores a bool vector (byte-packed 0/1).
    pub fn insert_bool_vector(&self, key: &[u8], values: &[bool]) -> ShmResult<()> {
        self.insert_tagged(key, ValueType::BoolVector, &codec::encode_bool_vector(values)?)
    }

    /// Reads a bool vector view.
    pub fn lookup_bool_vector(&self, key: &[u8]) -> ShmResult<BoolVectorView<'_>> {
        self.lookup_typed(key, ValueType::BoolVector, BoolVectorView::parse)
    }

    /// Stores an order-preserving string vector.
    pub fn insert_string_vector(&self, key: &[u8], values: &[&[u8]]) -> ShmResult<()> {
        self.insert_tagged(
            key,
            ValueType::StringVector,
            &codec::encode_string_vector(values)?,
        )
    }

    /// Reads a string vector view.
    pub fn lookup_string_vector(&self, key: &[u8]) -> ShmResult<StringVectorView<'_>> {
        self.lookup_typed(key, ValueType::StringVector, StringVectorView::parse)
    }

    // ------------------------------------------------------------------
    // Matrices
    // ------------------------------------------------------------------

    /// Stores a row-major `i64` matrix.
    pub fn insert_int_matrix(
        &self,
        key: &[u8],
        rows: u32,
        cols: u32,
        data: &[i64],
    ) -> ShmResult<()> {
        self.insert_tagged(
            key,
            ValueType::IntMatrix,
            &codec::encode_int_matrix(rows, cols, data)?,
        )
    }

    /// Reads an `i64` matrix view.
    pub fn lookup_int_matrix(&self, key: &[u8]) -> ShmResult<IntMatrixView<'_>> {
        self.lookup_typed(key, ValueType::IntMatrix, IntMatrixView::parse)
    }

    /// Stores a row-major `f64` matrix.
    pub fn insert_float_matrix(
        &self,
        key: &[u8],
        rows: u32,
        cols: u32,
        data: &[f64],
    ) -> ShmResult<()> {
        self.insert_tagged(
            key,
            ValueType::FloatMatrix,
            &codec::encode_float_matrix(rows, cols, data)?,
        )
    }

    /// Reads an `f64` matrix view.
    pub fn lookup_float_matrix(&self, key: &[u8]) -> ShmResult<FloatMatrixView<'_>> {
        self.lookup_typed(key, ValueType::FloatMatrix, FloatMatrixView::parse)
    }

    // ------------------------------------------------------------------
    // Sets (sorted + deduplicated on insert)
    // ------------------------------------------------------------------

    /// Stores an `i64` set; elements are sorted and deduplicated.
    pub fn insert_int_set(&self, key: &[u8], values: &[i64]) -> ShmResult<()> {
        self.insert_tagged(key, ValueType::IntSet, &codec::encode_int_set(values)?)
    }

    /// Reads an `i64` set view.
    pub fn lookup_int_set(&self, key: &[u8]) -> ShmResult<IntSetView<'_>> {
        self.lookup_typed(key, ValueType::IntSet, IntSetView::parse)
    }

    /// Stores an `f64` set; elements are sorted and deduplicated.
    pub fn insert_float_set(&self, key: &[u8], values: &[f64]) -> ShmResult<()> {
        self.insert_tagged(key, ValueType::FloatSet, &codec::encode_float_set(values)?)
    }

    /// Reads an `f64` set view.
    pub fn lookup_float_set(&self, key: &[u8]) -> ShmResult<FloatSetView<'_>> {
        self.lookup_typed(key, ValueType::FloatSet, FloatSetView::parse)
    }

    /// Stores a string set; strings are sorted and deduplicated.
    pub fn insert_string_set(&self, key: &[u8], values: &[&[u8]]) -> ShmResult<()> {
        self.insert_tagged(key, ValueType::StringSet, &codec::encode_string_set(values)?)
    }

    /// Reads a string set view.
    pub fn lookup_string_set(&self, key: &[u8]) -> ShmResult<StringSetView<'_>> {
        self.lookup_typed(key, ValueType::StringSet, StringSetView::parse)
    }

    // ------------------------------------------------------------------
    // String-keyed dictionaries (sorted by key; duplicates rejected)
    // ------------------------------------------------------------------

    /// Stores `Dict[str, i64]`.
    pub fn insert_dict_str_int(&self, key: &[u8], entries: &[(&[u8], i64)]) -> ShmResult<()> {
        self.insert_tagged(key, ValueType::DictStrInt, &codec::encode_dict_str_int(entries)?)
    }

    /// Reads a `Dict[str, i64]` view.
    pub fn lookup_dict_str_int(&self, key: &[u8]) -> ShmResult<DictStrIntView<'_>> {
        self.lookup_typed(key, ValueType::DictStrInt, DictStrIntView::parse)
    }

    /// Stores `Dict[str, f64]`.
    pub fn insert_dict_str_float(&self, key: &[u8], entries: &[(&[u8], f64)]) -> ShmResult<()> {
        self.insert_tagged(
            key,
            ValueType::DictStrFloat,
            &codec::encode_dict_str_float(entries)?,
        )
    }

    /// Reads a `Dict[str, f64]` view.
    pub fn lookup_dict_str_float(&self, key: &[u8]) -> ShmResult<DictStrFloatView<'_>> {
        self.lookup_typed(key, ValueType::DictStrFloat, DictStrFloatView::parse)
    }

    /// Stores `Dict[str, bool]`.
    pub fn insert_dict_str_bool(&self, key: &[u8], entries: &[(&[u8], bool)]) -> ShmResult<()> {
        self.insert_tagged(
            key,
            ValueType::DictStrBool,
            &codec::encode_dict_str_bool(entries)?,
        )
    }

    /// Reads a `Dict[str, bool]` view.
    pub fn lookup_dict_str_bool(&self, key: &[u8]) -> ShmResult<DictStrBoolView<'_>> {
        self.lookup_typed(key, ValueType::DictStrBool, DictStrBoolView::parse)
    }

    /// Stores `Dict[str, string]`.
    pub fn insert_dict_str_string(&self, key: &[u8], entries: &[(&[u8], &[u8])]) -> ShmResult<()> {
        self.insert_tagged(
            key,
            ValueType::DictStrString,
            &codec::encode_dict_str_string(entries)?,
        )
    }

    /// Reads a `Dict[str, string]` view.
    pub fn lookup_dict_str_string(&self, key: &[u8]) -> ShmResult<DictStrStringView<'_>> {
        self.lookup_typed(key, ValueType::DictStrString, DictStrStringView::parse)
    }

    /// Stores `Dict[str, bytes]`.
    pub fn insert_dict_str_bytes(&self, key: &[u8], entries: &[(&[u8], &[u8])]) -> ShmResult<()> {
        self.insert_tagged(
            key,
            ValueType::DictStrBytes,
            &codec::encode_dict_str_bytes(entries)?,
        )
    }

    /// Reads a `Dict[str, bytes]` view.
    pub fn lookup_dict_str_bytes(&self, key: &[u8]) -> ShmResult<DictStrBytesView<'_>> {
        self.lookup_typed(key, ValueType::DictStrBytes, DictStrBytesView::parse)
    }

    /// Stores `Dict[str, Vec<f64>]`.
    pub fn insert_dict_str_float_vector(
        &self,
        key: &[u8],
        entries: &[(&[u8], &[f64])],
    ) -> ShmResult<()> {
        self.insert_tagged(
            key,
            ValueType::DictStrFloatVector,
            &codec::encode_dict_str_float_vector(entries)?,
        )
    }

    /// Reads a `Dict[str, Vec<f64>]` view.
    pub fn lookup_dict_str_float_vector(
        &self,
        key: &[u8],
    ) -> ShmResult<DictStrFloatVectorView<'_>> {
        self.lookup_typed(
            key,
            ValueType::DictStrFloatVector,
            DictStrFloatVectorView::parse,
        )
    }

    /// Stores `Dict[str, matrix<f64>]`.
    pub fn insert_dict_str_float_matrix(
        &self,
        key: &[u8],
        entries: &[(&[u8], MatrixRef<'_>)],
    ) -> ShmResult<()> {
        self.insert_tagged(
            key,
            ValueType::DictStrFloatMatrix,
            &codec::encode_dict_str_float_matrix(entries)?,
        )
    }

    /// Reads a `Dict[str, matrix<f64>]` view.
    pub fn lookup_dict_str_float_matrix(
        &self,
        key: &[u8],
    ) -> ShmResult<DictStrFloatMatrixView<'_>> {
        self.lookup_typed(
            key,
            ValueType::DictStrFloatMatrix,
            DictStrFloatMatrixView::parse,
        )
    }

    /// Stores `Dict[str, Vec<string>]`.
    pub fn insert_dict_str_string_vector(
        &self,
        key: &[u8],
        entries: &[(&[u8], &[&[u8]])],
    ) -> ShmResult<()> {
        self.insert_tagged(
            key,
            ValueType::DictStrStringVector,
            &codec::encode_dict_str_string_vector(entries)?,
        )
    }

    /// Reads a `Dict[str, Vec<string>]` view.
    pub fn lookup_dict_str_string_vector(
        &self,
        key: &[u8],
    ) -> ShmResult<DictStrStringVectorView<'_>> {
        self.lookup_typed(
            key,
            ValueType::DictStrStringVector,
            DictStrStringVectorView::parse,
        )
    }

    // ------------------------------------------------------------------
    // Recursive OBJECT / LIST
    // ------------------------------------------------------------------

    /// Stores an OBJECT from pre-encoded fields; names are sorted and
    /// duplicates rejected.
    pub fn insert_object(&self, key: &[u8], fields: &[ObjectField<'_>]) -> ShmResult<()> {
        self.insert_tagged(key, ValueType::Object, &codec::encode_object(fields)?)
    }

    /// Reads an OBJECT view with binary-search field access.
    pub fn lookup_object(&self, key: &[u8]) -> ShmResult<ObjectView<'_>> {
        self.lookup_typed(key, ValueType::Object, ObjectView::parse)
    }

    /// Stores a LIST from pre-encoded elements, preserving order.
    pub fn insert_list(&self, key: &[u8], elements: &[(ValueType, &[u8])]) -> ShmResult<()> {
        self.insert_tagged(key, ValueType::List, &codec::encode_list(elements)?)
    }

    /// Reads a LIST view with indexed element access.
    pub fn lookup_list(&self, key: &[u8]) -> ShmResult<ListView<'_>> {
        self.lookup_typed(key, ValueType::List, ListView::parse)
    }

    // ------------------------------------------------------------------
    // Dynamic values
    // ------------------------------------------------------------------

    /// Stores any [`Value`], including recursive OBJECT/LIST trees.
    pub fn insert_value(&self, key: &[u8], value: &Value) -> ShmResult<()> {
        self.insert_tagged(key, value.tag(), &value.encode()?)
    }

    /// Reads and materializes the value stored under `key`.
    ///
    /// Untyped entries (tag [`ValueType::Unknown`]) cannot be materialized;
    /// use [`lookup`](Self::lookup) for those.
    pub fn lookup_value(&self, key: &[u8]) -> ShmResult<Value> {
        Self::validate_key(key)?;
        let g1 = self.generation();
        let Some(node) = self.find_node(key)? else {
            return Err(self.not_found(g1));
        };
        let tag = ValueType::from_u8(node.value_type)
            .map_err(|_| ShmError::ConcurrentModification)?;
        let decoded = Value::decode(tag, self.payload_slice(node.val_off, node.val_len));
        if self.generation() != g1 {
            return Err(ShmError::ConcurrentModification);
        }
        decoded.map_err(ShmError::from)
    }
}
