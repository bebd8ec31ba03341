//! Zero-copy payload views.
//!
//! Each view parses a typed payload from a borrowed byte slice and exposes
//! element access without copying. Structure (counts, offset tables) is
//! validated up front; element reads go through `from_le_bytes` because a
//! payload is only 8-byte-aligned at its start and interior tables carry no
//! alignment guarantee at all.

use crate::error::{CodecError, CodecResult};
use std::cmp::Ordering;

/// Sequential reader over a payload slice.
pub(crate) struct Reader<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    pub(crate) fn new(buf: &'a [u8]) -> Self {
        Self { buf, pos: 0 }
    }

    pub(crate) fn take(&mut self, n: usize) -> CodecResult<&'a [u8]> {
        let end = self.pos.checked_add(n).ok_or(CodecError::UnexpectedEof)?;
        let slice = self.buf.get(self.pos..end).ok_or(CodecError::UnexpectedEof)?;
        self.pos = end;
        Ok(slice)
    }

    pub(crate) fn u32(&mut self) -> CodecResult<u32> {
        let b = self.take(4)?;
        Ok(u32::from_le_bytes([b[0], b[1], b[2], b[3]]))
    }

    /// Skips padding so the cursor sits on a 4-byte boundary relative to the
    /// payload start.
    pub(crate) fn align4(&mut self) -> CodecResult<()> {
        let rem = self.pos % 4;
        if rem != 0 {
            self.take(4 - rem)?;
        }
        Ok(())
    }
}

fn u32_at(table: &[u8], index: usize) -> u32 {
    let b = &table[index * 4..index * 4 + 4];
    u32::from_le_bytes([b[0], b[1], b[2], b[3]])
}

fn i64_at(data: &[u8], index: usize) -> i64 {
    let b = &data[index * 8..index * 8 + 8];
    i64::from_le_bytes([b[0], b[1], b[2], b[3], b[4], b[5], b[6], b[7]])
}

fn f64_at(data: &[u8], index: usize) -> f64 {
    let b = &data[index * 8..index * 8 + 8];
    f64::from_le_bytes([b[0], b[1], b[2], b[3], b[4], b[5], b[6], b[7]])
}

/// The CSR form shared by every variable-length collection: `count + 1`
/// offsets into a contiguous blob, where the terminal offset equals the
/// blob's byte length.
#[derive(Debug, Clone, Copy)]
pub struct OffsetTable<'a> {
    offsets: &'a [u8],
    blob: &'a [u8],
    count: usize,
}

impl<'a> OffsetTable<'a> {
    pub(crate) fn parse(r: &mut Reader<'a>, count: usize) -> CodecResult<Self> {
        let offsets = r.take(
            count
                .checked_add(1)
                .and_then(|n| n.checked_mul(4))
                .ok_or(CodecError::UnexpectedEof)?,
        )?;
        let mut prev = 0u32;
        for i in 0..=count {
            let off = u32_at(offsets, i);
            if off < prev {
                return Err(CodecError::malformed("offset table not monotonic"));
            }
            prev = off;
        }
        let blob = r.take(prev as usize)?;
        Ok(Self {
            offsets,
            blob,
            count,
        })
    }

    /// Number of entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.count
    }

    /// Whether the table is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    /// Total blob length in bytes (the terminal offset).
    #[must_use]
    pub fn blob_len(&self) -> u32 {
        u32_at(self.offsets, self.count)
    }

    // Invariant from parse(): offsets are monotonic and bounded by blob.len().
    fn slice(&self, index: usize) -> &'a [u8] {
        let start = u32_at(self.offsets, index) as usize;
        let end = u32_at(self.offsets, index + 1) as usize;
        &self.blob[start..end]
    }

    /// Returns entry `index`, or `None` past the end.
    #[must_use]
    pub fn get(&self, index: usize) -> Option<&'a [u8]> {
        (index < self.count).then(|| self.slice(index))
    }

    /// Iterates over all entries in order.
    pub fn iter(&self) -> impl Iterator<Item = &'a [u8]> + 'a {
        let table = *self;
        (0..table.count).map(move |i| table.slice(i))
    }

    /// Binary-searches a sorted table for `needle` byte-wise.
    ///
    /// Only meaningful for tables written sorted (sets, dictionary keys,
    /// object field names).
    pub fn binary_search(&self, needle: &[u8]) -> Result<usize, usize> {
        let mut lo = 0;
        let mut hi = self.count;
        while lo < hi {
            let mid = lo + (hi - lo) / 2;
            match self.slice(mid).cmp(needle) {
                Ordering::Less => lo = mid + 1,
                Ordering::Greater => hi = mid,
                Ordering::Equal => return Ok(mid),
            }
        }
        Err(lo)
    }
}

/// Decodes an `i64` scalar payload.
pub fn parse_int_scalar(payload: &[u8]) -> CodecResult<i64> {
    let bytes: [u8; 8] = payload.try_into().map_err(|_| CodecError::UnexpectedEof)?;
    Ok(i64::from_le_bytes(bytes))
}

/// Decodes an `f64` scalar payload.
pub fn parse_float_scalar(payload: &[u8]) -> CodecResult<f64> {
    let bytes: [u8; 8] = payload.try_into().map_err(|_| CodecError::UnexpectedEof)?;
    Ok(f64::from_le_bytes(bytes))
}

/// Decodes a bool scalar payload. Any nonzero byte reads as `true`.
pub fn parse_bool_scalar(payload: &[u8]) -> CodecResult<bool> {
    match payload {
        [byte] => Ok(*byte != 0),
        _ => Err(CodecError::UnexpectedEof),
    }
}

/// Decodes a string payload, returning the raw bytes after the length
/// prefix. There is no NUL terminator; use the slice length.
pub fn parse_string(payload: &[u8]) -> CodecResult<&[u8]> {
    let mut r = Reader::new(payload);
    let len = r.u32()? as usize;
    r.take(len)
}

/// Decodes a bytes payload; same shape as a string.
pub fn parse_bytes(payload: &[u8]) -> CodecResult<&[u8]> {
    parse_string(payload)
}

macro_rules! numeric_vector_view {
    ($(#[$doc:meta])* $name:ident, $elem:ty, $at:ident) => {
        $(#[$doc])*
        #[derive(Debug, Clone, Copy)]
        pub struct $name<'a> {
            data: &'a [u8],
        }

        impl<'a> $name<'a> {
            /// Parses the `u32 N | N x 8B` layout.
            pub fn parse(payload: &'a [u8]) -> CodecResult<Self> {
                let mut r = Reader::new(payload);
                let count = r.u32()? as usize;
                let data = r.take(count.checked_mul(8).ok_or(CodecError::UnexpectedEof)?)?;
                Ok(Self { data })
            }

            pub(crate) fn from_raw(data: &'a [u8]) -> Self {
                Self { data }
            }

            /// Element count.
            #[must_use]
            pub fn len(&self) -> usize {
                self.data.len() / 8
            }

            /// Whether the vector is empty.
            #[must_use]
            pub fn is_empty(&self) -> bool {
                self.data.is_empty()
            }

            /// Returns element `index`, or `None` past the end.
            #[must_use]
            pub fn get(&self, index: usize) -> Option<$elem> {
                (index < self.len()).then(|| $at(self.data, index))
            }

            /// Iterates over all elements.
            pub fn iter(&self) -> impl Iterator<Item = $elem> + 'a {
                let data = self.data;
                (0..data.len() / 8).map(move |i| $at(data, i))
            }

            /// Copies the elements out.
            #[must_use]
            pub fn to_vec(&self) -> Vec<$elem> {
                self.iter().collect()
            }

            /// The raw little-endian element bytes.
            #[must_use]
            pub fn as_bytes(&self) -> &'a [u8] {
                self.data
            }
        }
    };
}

numeric_vector_view!(
    /// Zero-copy view of an `i64` vector.
    IntVectorView,
    i64,
    i64_at
);
numeric_vector_view!(
    /// Zero-copy view of an `f64` vector.
    FloatVectorView,
    f64,
    f64_at
);

/// Zero-copy view of a bool vector (one 0/1 byte per element).
#[derive(Debug, Clone, Copy)]
pub struct BoolVectorView<'a> {
    data: &'a [u8],
}

impl<'a> BoolVectorView<'a> {
    /// Parses the `u32 N | N x u8` layout.
    pub fn parse(payload: &'a [u8]) -> CodecResult<Self> {
        let mut r = Reader::new(payload);
        let count = r.u32()? as usize;
        let data = r.take(count)?;
        Ok(Self { data })
    }

    /// Element count.
    #[must_use]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Whether the vector is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Returns element `index`, or `None` past the end.
    #[must_use]
    pub fn get(&self, index: usize) -> Option<bool> {
        self.data.get(index).map(|&b| b != 0)
    }

    /// Iterates over all elements.
    pub fn iter(&self) -> impl Iterator<Item = bool> + 'a {
        self.data.iter().map(|&b| b != 0)
    }

    /// Copies the elements out.
    #[must_use]
    pub fn to_vec(&self) -> Vec<bool> {
        self.iter().collect()
    }
}

macro_rules! numeric_matrix_view {
    ($(#[$doc:meta])* $name:ident, $elem:ty, $at:ident) => {
        $(#[$doc])*
        #[derive(Debug, Clone, Copy)]
        pub struct $name<'a> {
            rows: u32,
            cols: u32,
            data: &'a [u8],
        }

        impl<'a> $name<'a> {
            /// Parses the `u32 rows | u32 cols | data` layout.
            pub fn parse(payload: &'a [u8]) -> CodecResult<Self> {
                let mut r = Reader::new(payload);
                let rows = r.u32()?;
                let cols = r.u32()?;
                let elems = (rows as usize)
                    .checked_mul(cols as usize)
                    .and_then(|n| n.checked_mul(8))
                    .ok_or(CodecError::UnexpectedEof)?;
                let data = r.take(elems)?;
                Ok(Self { rows, cols, data })
            }

            pub(crate) fn from_raw(rows: u32, cols: u32, data: &'a [u8]) -> Self {
                Self { rows, cols, data }
            }

            /// Row count.
            #[must_use]
            pub fn rows(&self) -> u32 {
                self.rows
            }

            /// Column count.
            #[must_use]
            pub fn cols(&self) -> u32 {
                self.cols
            }

            /// Returns the element at `(row, col)`, or `None` out of range.
            #[must_use]
            pub fn get(&self, row: u32, col: u32) -> Option<$elem> {
                (row < self.rows && col < self.cols)
                    .then(|| $at(self.data, row as usize * self.cols as usize + col as usize))
            }

            /// Copies the row-major elements out.
            #[must_use]
            pub fn to_vec(&self) -> Vec<$elem> {
                (0..self.data.len() / 8).map(|i| $at(self.data, i)).collect()
            }

            /// The raw little-endian element bytes, row-major.
            #[must_use]
            pub fn as_bytes(&self) -> &'a [u8] {
                self.data
            }
        }
    };
}

numeric_matrix_view!(
    /// Zero-copy view of a row-major `i64` matrix.
    IntMatrixView,
    i64,
    i64_at
);
numeric_matrix_view!(
    /// Zero-copy view of a row-major `f64` matrix.
    FloatMatrixView,
    f64,
    f64_at
);

/// Zero-copy view of a sorted `i64` set.
#[derive(Debug, Clone, Copy)]
pub struct IntSetView<'a> {
    inner: IntVectorView<'a>,
}

impl<'a> IntSetView<'a> {
    /// Parses the vector layout; elements were sorted at encode time.
    pub fn parse(payload: &'a [u8]) -> CodecResult<Self> {
        Ok(Self {
            inner: IntVectorView::parse(payload)?,
        })
    }

    /// Element count.
    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.len()
    }

    /// Whether the set is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    /// Returns element `index` in sorted order.
    #[must_use]
    pub fn get(&self, index: usize) -> Option<i64> {
        self.inner.get(index)
    }

    /// Iterates in ascending order.
    pub fn iter(&self) -> impl Iterator<Item = i64> + 'a {
        self.inner.iter()
    }

    /// Copies the elements out in ascending order.
    #[must_use]
    pub fn to_vec(&self) -> Vec<i64> {
        self.inner.to_vec()
    }

    /// Binary-searches for `value`.
    #[must_use]
    pub fn contains(&self, value: i64) -> bool {
        let data = self.inner.as_bytes();
        let mut lo = 0;
        let mut hi = self.len();
        while lo < hi {
            let mid = lo + (hi - lo) / 2;
            match i64_at(data, mid).cmp(&value) {
                Ordering::Less => lo = mid + 1,
                Ordering::Greater => hi = mid,
                Ordering::Equal => return true,
            }
        }
        false
    }
}

/// Zero-copy view of a sorted `f64` set (ordered by `f64::total_cmp`).
#[derive(Debug, Clone, Copy)]
pub struct FloatSetView<'a> {
    inner: FloatVectorView<'a>,
}

impl<'a> FloatSetView<'a> {
    /// Parses the vector layout; elements were sorted at encode time.
    pub fn parse(payload: &'a [u8]) -> CodecResult<Self> {
        Ok(Self {
            inner: FloatVectorView::parse(payload)?,
        })
    }

    /// Element count.
    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.len()
    }

    /// Whether the set is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    /// Returns element `index` in total order.
    #[must_use]
    pub fn get(&self, index: usize) -> Option<f64> {
        self.inner.get(index)
    }

    /// Iterates in ascending total order.
    pub fn iter(&self) -> impl Iterator<Item = f64> + 'a {
        self.inner.iter()
    }

    /// Copies the elements out.
    #[must_use]
    pub fn to_vec(&self) -> Vec<f64> {
        self.inner.to_vec()
    }

    /// Binary-searches for `value` under total-order equality.
    #[must_use]
    pub fn contains(&self, value: f64) -> bool {
        let data = self.inner.as_bytes();
        let mut lo = 0;
        let mut hi = self.len();
        while lo < hi {
            let mid = lo + (hi - lo) / 2;
            match f64_at(data, mid).total_cmp(&value) {
                Ordering::Less => lo = mid + 1,
                Ordering::Greater => hi = mid,
                Ordering::Equal => return true,
            }
        }
        false
    }
}

/// Zero-copy view of an order-preserving string vector.
#[derive(Debug, Clone, Copy)]
pub struct StringVectorView<'a> {
    table: OffsetTable<'a>,
}

impl<'a> StringVectorView<'a> {
    /// Parses the `u32 N | CSR` layout.
    pub fn parse(payload: &'a [u8]) -> CodecResult<Self> {
        let mut r = Reader::new(payload);
        let count = r.u32()? as usize;
        let table = OffsetTable::parse(&mut r, count)?;
        Ok(Self { table })
    }

    /// Element count.
    #[must_use]
    pub fn len(&self) -> usize {
        self.table.len()
    }

    /// Whether the vector is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }

    /// Returns string `index`, or `None` past the end.
    #[must_use]
    pub fn get(&self, index: usize) -> Option<&'a [u8]> {
        self.table.get(index)
    }

    /// Iterates over all strings in stored order.
    pub fn iter(&self) -> impl Iterator<Item = &'a [u8]> + 'a {
        self.table.iter()
    }

    /// The underlying CSR table.
    #[must_use]
    pub fn table(&self) -> OffsetTable<'a> {
        self.table
    }
}

/// Zero-copy view of a sorted, deduplicated string set.
#[derive(Debug, Clone, Copy)]
pub struct StringSetView<'a> {
    table: OffsetTable<'a>,
}

impl<'a> StringSetView<'a> {
    /// Parses the `u32 N | CSR` layout; strings were sorted at encode time.
    pub fn parse(payload: &'a [u8]) -> CodecResult<Self> {
        let mut r = Reader::new(payload);
        let count = r.u32()? as usize;
        let table = OffsetTable::parse(&mut r, count)?;
        Ok(Self { table })
    }

    /// Element count.
    #[must_use]
    pub fn len(&self) -> usize {
        self.table.len()
    }

    /// Whether the set is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }

    /// Returns string `index` in sorted order.
    #[must_use]
    pub fn get(&self, index: usize) -> Option<&'a [u8]> {
        self.table.get(index)
    }

    /// Iterates in sorted order.
    pub fn iter(&self) -> impl Iterator<Item = &'a [u8]> + 'a {
        self.table.iter()
    }

    /// Binary-searches for `value`.
    #[must_use]
    pub fn contains(&self, value: &[u8]) -> bool {
        self.table.binary_search(value).is_ok()
    }
}

macro_rules! fixed_value_dict_view {
    ($(#[$doc:meta])* $name:ident, $elem:ty, $width:expr, $read:expr) => {
        $(#[$doc])*
        #[derive(Debug, Clone, Copy)]
        pub struct $name<'a> {
            keys: OffsetTable<'a>,
            values: &'a [u8],
        }

        impl<'a> $name<'a> {
            /// Parses `u32 N | key CSR | N fixed-width values`.
            pub fn parse(payload: &'a [u8]) -> CodecResult<Self> {
                let mut r = Reader::new(payload);
                let count = r.u32()? as usize;
                let keys = OffsetTable::parse(&mut r, count)?;
                let values =
                    r.take(count.checked_mul($width).ok_or(CodecError::UnexpectedEof)?)?;
                Ok(Self { keys, values })
            }

            /// Entry count.
            #[must_use]
            pub fn len(&self) -> usize {
                self.keys.len()
            }

            /// Whether the dictionary is empty.
            #[must_use]
            pub fn is_empty(&self) -> bool {
                self.keys.is_empty()
            }

            /// Returns the key at `index` in sorted order.
            #[must_use]
            pub fn key_at(&self, index: usize) -> Option<&'a [u8]> {
                self.keys.get(index)
            }

            /// Returns the value at `index`.
            #[must_use]
            pub fn value_at(&self, index: usize) -> Option<$elem> {
                (index < self.len()).then(|| ($read)(self.values, index))
            }

            /// Binary-searches for `key`.
            #[must_use]
            pub fn get(&self, key: &[u8]) -> Option<$elem> {
                let index = self.keys.binary_search(key).ok()?;
                Some(($read)(self.values, index))
            }

            /// Iterates over `(key, value)` pairs in key order.
            pub fn iter(&self) -> impl Iterator<Item = (&'a [u8], $elem)> + 'a {
                let keys = self.keys;
                let values = self.values;
                keys.iter()
                    .enumerate()
                    .map(move |(i, k)| (k, ($read)(values, i)))
            }
        }
    };
}

fixed_value_dict_view!(
    /// Zero-copy view of `Dict[str, i64]`.
    DictStrIntView,
    i64,
    8,
    i64_at
);
fixed_value_dict_view!(
    /// Zero-copy view of `Dict[str, f64]`.
    DictStrFloatView,
    f64,
    8,
    f64_at
);
fixed_value_dict_view!(
    /// Zero-copy view of `Dict[str, bool]`.
    DictStrBoolView,
    bool,
    1,
    (|values: &[u8], i: usize| values[i] != 0)
);

/// Zero-copy view of `Dict[str, string]`: two parallel CSR tables.
#[derive(Debug, Clone, Copy)]
pub struct DictStrStringView<'a> {
    keys: OffsetTable<'a>,
    values: OffsetTable<'a>,
}

impl<'a> DictStrStringView<'a> {
    /// Parses `u32 N | key CSR | value CSR`.
    pub fn parse(payload: &'a [u8]) -> CodecResult<Self> {
        let mut r = Reader::new(payload);
        let count = r.u32()? as usize;
        let keys = OffsetTable::parse(&mut r, count)?;
        let values = OffsetTable::parse(&mut r, count)?;
        Ok(Self { keys, values })
    }

    /// Entry count.
    #[must_use]
    pub fn len(&self) -> usize {
        self.keys.len()
    }

    /// Whether the dictionary is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    /// Returns the key at `index` in sorted order.
    #[must_use]
    pub fn key_at(&self, index: usize) -> Option<&'a [u8]> {
        self.keys.get(index)
    }

    /// Returns the value at `index`.
    #[must_use]
    pub fn value_at(&self, index: usize) -> Option<&'a [u8]> {
        self.values.get(index)
    }

    /// Binary-searches for `key`.
    #[must_use]
    pub fn get(&self, key: &[u8]) -> Option<&'a [u8]> {
        let index = self.keys.binary_search(key).ok()?;
        self.values.get(index)
    }

    /// Iterates over `(key, value)` pairs in key order.
    pub fn iter(&self) -> impl Iterator<Item = (&'a [u8], &'a [u8])> + 'a {
        let values = self.values;
        self.keys
            .iter()
            .enumerate()
            .map(move |(i, k)| (k, values.slice(i)))
    }
}

/// Zero-copy view of `Dict[str, bytes]`; the wire shape is identical to
/// [`DictStrStringView`].
pub type DictStrBytesView<'a> = DictStrStringView<'a>;

/// Zero-copy view of `Dict[str, Vec<f64>]` stored as flattened elements.
#[derive(Debug, Clone, Copy)]
pub struct DictStrFloatVectorView<'a> {
    keys: OffsetTable<'a>,
    elem_offsets: &'a [u8],
    flat: &'a [u8],
}

impl<'a> DictStrFloatVectorView<'a> {
    /// Parses `u32 N | key CSR | u32 off[N+1] | u32 len[N] | f64 flat`.
    pub fn parse(payload: &'a [u8]) -> CodecResult<Self> {
        let mut r = Reader::new(payload);
        let count = r.u32()? as usize;
        let keys = OffsetTable::parse(&mut r, count)?;
        let elem_offsets = r.take((count + 1) * 4)?;
        let lengths = r.take(count * 4)?;
        let mut prev = 0u32;
        for i in 0..=count {
            let off = u32_at(elem_offsets, i);
            if off < prev {
                return Err(CodecError::malformed("element offsets not monotonic"));
            }
            prev = off;
        }
        for i in 0..count {
            let span = u32_at(elem_offsets, i + 1) - u32_at(elem_offsets, i);
            if u32_at(lengths, i) != span {
                return Err(CodecError::malformed("element lengths disagree with offsets"));
            }
        }
        let flat = r.take((prev as usize).checked_mul(8).ok_or(CodecError::UnexpectedEof)?)?;
        Ok(Self {
            keys,
            elem_offsets,
            flat,
        })
    }

    /// Entry count.
    #[must_use]
    pub fn len(&self) -> usize {
        self.keys.len()
    }

    /// Whether the dictionary is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    /// Returns the key at `index` in sorted order.
    #[must_use]
    pub fn key_at(&self, index: usize) -> Option<&'a [u8]> {
        self.keys.get(index)
    }

    /// Returns the vector at `index`.
    #[must_use]
    pub fn value_at(&self, index: usize) -> Option<FloatVectorView<'a>> {
        (index < self.len()).then(|| {
            let start = u32_at(self.elem_offsets, index) as usize * 8;
            let end = u32_at(self.elem_offsets, index + 1) as usize * 8;
            FloatVectorView::from_raw(&self.flat[start..end])
        })
    }

    /// Binary-searches for `key`.
    #[must_use]
    pub fn get(&self, key: &[u8]) -> Option<FloatVectorView<'a>> {
        let index = self.keys.binary_search(key).ok()?;
        self.value_at(index)
    }
}

/// Zero-copy view of `Dict[str, matrix<f64>]` stored as flattened elements.
#[derive(Debug, Clone, Copy)]
pub struct DictStrFloatMatrixView<'a> {
    keys: OffsetTable<'a>,
    elem_offsets: &'a [u8],
    rows: &'a [u8],
    cols: &'a [u8],
    flat: &'a [u8],
}

impl<'a> DictStrFloatMatrixView<'a> {
    /// Parses `u32 N | key CSR | u32 off[N+1] | u32 rows[N] | u32 cols[N] |
    /// f64 flat`.
    pub fn parse(payload: &'a [u8]) -> CodecResult<Self> {
        let mut r = Reader::new(payload);
        let count = r.u32()? as usize;
        let keys = OffsetTable::parse(&mut r, count)?;
        let elem_offsets = r.take((count + 1) * 4)?;
        let rows = r.take(count * 4)?;
        let cols = r.take(count * 4)?;
        let mut prev = 0u32;
        for i in 0..=count {
            let off = u32_at(elem_offsets, i);
            if off < prev {
                return Err(CodecError::malformed("element offsets not monotonic"));
            }
            prev = off;
        }
        for i in 0..count {
            let span = u32_at(elem_offsets, i + 1) - u32_at(elem_offsets, i);
            let elems = u64::from(u32_at(rows, i)) * u64::from(u32_at(cols, i));
            if elems != u64::from(span) {
                return Err(CodecError::malformed("matrix shape disagrees with offsets"));
            }
        }
        let flat = r.take((prev as usize).checked_mul(8).ok_or(CodecError::UnexpectedEof)?)?;
        Ok(Self {
            keys,
            elem_offsets,
            rows,
            cols,
            flat,
        })
    }

    /// Entry count.
    #[must_use]
    pub fn len(&self) -> usize {
        self.keys.len()
    }

    /// Whether the dictionary is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    /// Returns the key at `index` in sorted order.
    #[must_use]
    pub fn key_at(&self, index: usize) -> Option<&'a [u8]> {
        self.keys.get(index)
    }

    /// Returns the matrix at `index`.
    #[must_use]
    pub fn value_at(&self, index: usize) -> Option<FloatMatrixView<'a>> {
        (index < self.len()).then(|| {
            let start = u32_at(self.elem_offsets, index) as usize * 8;
            let end = u32_at(self.elem_offsets, index + 1) as usize * 8;
            FloatMatrixView::from_raw(
                u32_at(self.rows, index),
                u32_at(self.cols, index),
                &self.flat[start..end],
            )
        })
    }

    /// Binary-searches for `key`.
    #[must_use]
    pub fn get(&self, key: &[u8]) -> Option<FloatMatrixView<'a>> {
        let index = self.keys.binary_search(key).ok()?;
        self.value_at(index)
    }
}

/// One list of a [`DictStrStringVectorView`]: a contiguous index range of
/// the shared string table.
#[derive(Debug, Clone, Copy)]
pub struct StringListView<'a> {
    strings: OffsetTable<'a>,
    start: usize,
    end: usize,
}

impl<'a> StringListView<'a> {
    /// String count in this list.
    #[must_use]
    pub fn len(&self) -> usize {
        self.end - self.start
    }

    /// Whether the list is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }

    /// Returns string `index` within this list.
    #[must_use]
    pub fn get(&self, index: usize) -> Option<&'a [u8]> {
        (index < self.len()).then(|| self.strings.slice(self.start + index))
    }

    /// Iterates over the list's strings in stored order.
    pub fn iter(&self) -> impl Iterator<Item = &'a [u8]> + 'a {
        let list = *self;
        (0..list.len()).map(move |i| list.strings.slice(list.start + i))
    }
}

/// Zero-copy view of `Dict[str, Vec<string>]`.
#[derive(Debug, Clone, Copy)]
pub struct DictStrStringVectorView<'a> {
    keys: OffsetTable<'a>,
    list_offsets: &'a [u8],
    strings: OffsetTable<'a>,
}

impl<'a> DictStrStringVectorView<'a> {
    /// Parses `u32 N | key CSR | u32 list_off[N+1] | u32 n_strings |
    /// string CSR`.
    pub fn parse(payload: &'a [u8]) -> CodecResult<Self> {
        let mut r = Reader::new(payload);
        let count = r.u32()? as usize;
        let keys = OffsetTable::parse(&mut r, count)?;
        let list_offsets = r.take((count + 1) * 4)?;
        let n_strings = r.u32()? as usize;
        let strings = OffsetTable::parse(&mut r, n_strings)?;
        let mut prev = 0u32;
        for i in 0..=count {
            let off = u32_at(list_offsets, i);
            if off < prev || off as usize > n_strings {
                return Err(CodecError::malformed("list offsets not monotonic"));
            }
            prev = off;
        }
        Ok(Self {
            keys,
            list_offsets,
            strings,
        })
    }

    /// Entry count.
    #[must_use]
    pub fn len(&self) -> usize {
        self.keys.len()
    }

    /// Whether the dictionary is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    /// Total strings across all lists.
    #[must_use]
    pub fn string_count(&self) -> usize {
        self.strings.len()
    }

    /// Returns the key at `index` in sorted order.
    #[must_use]
    pub fn key_at(&self, index: usize) -> Option<&'a [u8]> {
        self.keys.get(index)
    }

    /// Returns the string list at `index`.
    #[must_use]
    pub fn value_at(&self, index: usize) -> Option<StringListView<'a>> {
        (index < self.len()).then(|| StringListView {
            strings: self.strings,
            start: u32_at(self.list_offsets, index) as usize,
            end: u32_at(self.list_offsets, index + 1) as usize,
        })
    }

    /// Binary-searches for `key`.
    #[must_use]
    pub fn get(&self, key: &[u8]) -> Option<StringListView<'a>> {
        let index = self.keys.binary_search(key).ok()?;
        self.value_at(index)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::encode;

    #[test]
    fn scalar_roundtrip() {
        assert_eq!(parse_int_scalar(&encode::encode_int_scalar(-7)).unwrap(), -7);
        assert_eq!(
            parse_float_scalar(&encode::encode_float_scalar(2.5)).unwrap(),
            2.5
        );
        assert!(parse_bool_scalar(&encode::encode_bool_scalar(true)).unwrap());
        assert!(!parse_bool_scalar(&encode::encode_bool_scalar(false)).unwrap());
    }

    #[test]
    fn scalar_rejects_wrong_length() {
        assert!(parse_int_scalar(&[0; 4]).is_err());
        assert!(parse_bool_scalar(&[]).is_err());
        assert!(parse_bool_scalar(&[1, 2]).is_err());
    }

    #[test]
    fn string_roundtrip() {
        let payload = encode::encode_string(b"hello").unwrap();
        assert_eq!(parse_string(&payload).unwrap(), b"hello");
        let payload = encode::encode_string(b"").unwrap();
        assert_eq!(parse_string(&payload).unwrap(), b"");
    }

    #[test]
    fn string_rejects_truncation() {
        let mut payload = encode::encode_string(b"hello").unwrap();
        payload.truncate(6);
        assert!(parse_string(&payload).is_err());
    }

    #[test]
    fn int_vector_roundtrip() {
        let payload = encode::encode_int_vector(&[1, -2, i64::MAX]).unwrap();
        let view = IntVectorView::parse(&payload).unwrap();
        assert_eq!(view.len(), 3);
        assert_eq!(view.get(1), Some(-2));
        assert_eq!(view.get(3), None);
        assert_eq!(view.to_vec(), vec![1, -2, i64::MAX]);
    }

    #[test]
    fn float_vector_bytes_match_source_encoding() {
        let values = [1.0, 2.0, 3.0, 4.0];
        let payload = encode::encode_float_vector(&values).unwrap();
        let view = FloatVectorView::parse(&payload).unwrap();
        let mut raw = Vec::new();
        for v in values {
            raw.extend_from_slice(&v.to_le_bytes());
        }
        assert_eq!(view.as_bytes(), &raw[..]);
    }

    #[test]
    fn matrix_roundtrip() {
        let payload = encode::encode_float_matrix(2, 3, &[1.0, 2.0, 3.0, 4.0, 5.0, 6.0]).unwrap();
        let view = FloatMatrixView::parse(&payload).unwrap();
        assert_eq!(view.rows(), 2);
        assert_eq!(view.cols(), 3);
        assert_eq!(view.get(1, 2), Some(6.0));
        assert_eq!(view.get(2, 0), None);
    }

    #[test]
    fn set_contains() {
        let payload = encode::encode_int_set(&[5, 1, 3, 5]).unwrap();
        let view = IntSetView::parse(&payload).unwrap();
        assert_eq!(view.to_vec(), vec![1, 3, 5]);
        assert!(view.contains(3));
        assert!(!view.contains(4));

        let payload = encode::encode_string_set(&[b"kiwi", b"apple"]).unwrap();
        let view = StringSetView::parse(&payload).unwrap();
        assert!(view.contains(b"apple"));
        assert!(!view.contains(b"mango"));
    }

    #[test]
    fn float_set_contains_total_order() {
        let payload = encode::encode_float_set(&[2.5, -1.0, 2.5]).unwrap();
        let view = FloatSetView::parse(&payload).unwrap();
        assert_eq!(view.len(), 2);
        assert!(view.contains(-1.0));
        assert!(!view.contains(0.0));
    }

    #[test]
    fn string_vector_preserves_order() {
        let payload = encode::encode_string_vector(&[b"b", b"a", b"b"]).unwrap();
        let view = StringVectorView::parse(&payload).unwrap();
        let items: Vec<&[u8]> = view.iter().collect();
        assert_eq!(items, vec![b"b".as_slice(), b"a", b"b"]);
    }

    #[test]
    fn dict_str_int_lookup() {
        let payload = encode::encode_dict_str_int(&[(b"b", 2), (b"a", 1), (b"c", 3)]).unwrap();
        let view = DictStrIntView::parse(&payload).unwrap();
        let pairs: Vec<(&[u8], i64)> = view.iter().collect();
        assert_eq!(
            pairs,
            vec![(b"a".as_slice(), 1), (b"b".as_slice(), 2), (b"c".as_slice(), 3)]
        );
        assert_eq!(view.get(b"b"), Some(2));
        assert_eq!(view.get(b"d"), None);
    }

    #[test]
    fn dict_str_string_lookup() {
        let payload =
            encode::encode_dict_str_string(&[(b"name", b"alice"), (b"city", b"oslo")]).unwrap();
        let view = DictStrStringView::parse(&payload).unwrap();
        assert_eq!(view.get(b"name"), Some(b"alice".as_slice()));
        assert_eq!(view.get(b"city"), Some(b"oslo".as_slice()));
        assert_eq!(view.key_at(0), Some(b"city".as_slice()));
    }

    #[test]
    fn dict_str_float_vector_lookup() {
        let payload = encode::encode_dict_str_float_vector(&[
            (b"b", [4.0, 5.0].as_slice()),
            (b"a", [1.0, 2.0, 3.0].as_slice()),
        ])
        .unwrap();
        let view = DictStrFloatVectorView::parse(&payload).unwrap();
        assert_eq!(view.get(b"a").unwrap().to_vec(), vec![1.0, 2.0, 3.0]);
        assert_eq!(view.get(b"b").unwrap().to_vec(), vec![4.0, 5.0]);
        assert!(view.get(b"c").is_none());
    }

    #[test]
    fn dict_str_float_matrix_lookup() {
        let payload = encode::encode_dict_str_float_matrix(&[(
            b"m",
            encode::MatrixRef {
                rows: 2,
                cols: 2,
                data: &[1.0, 2.0, 3.0, 4.0],
            },
        )])
        .unwrap();
        let view = DictStrFloatMatrixView::parse(&payload).unwrap();
        let m = view.get(b"m").unwrap();
        assert_eq!(m.rows(), 2);
        assert_eq!(m.get(1, 0), Some(3.0));
    }

    #[test]
    fn dict_str_string_vector_lookup() {
        let payload = encode::encode_dict_str_string_vector(&[
            (b"fruits", [b"apple".as_slice(), b"kiwi".as_slice()].as_slice()),
            (b"empty", [].as_slice()),
        ])
        .unwrap();
        let view = DictStrStringVectorView::parse(&payload).unwrap();
        assert_eq!(view.len(), 2);
        assert_eq!(view.string_count(), 2);
        let list = view.get(b"fruits").unwrap();
        let items: Vec<&[u8]> = list.iter().collect();
        assert_eq!(items, vec![b"apple".as_slice(), b"kiwi"]);
        assert!(view.get(b"empty").unwrap().is_empty());
    }

    #[test]
    fn offset_table_rejects_non_monotonic() {
        // count=1, offsets [4, 0], blob would be 0 bytes.
        let mut payload = Vec::new();
        payload.extend_from_slice(&1u32.to_le_bytes());
        payload.extend_from_slice(&4u32.to_le_bytes());
        payload.extend_from_slice(&0u32.to_le_bytes());
        assert!(StringVectorView::parse(&payload).is_err());
    }

    #[test]
    fn truncated_vector_is_rejected() {
        let mut payload = encode::encode_int_vector(&[1, 2, 3]).unwrap();
        payload.truncate(payload.len() - 1);
        assert!(IntVectorView::parse(&payload).is_err());
    }
}
