//! Recursive OBJECT and LIST views.
//!
//! OBJECT and LIST payloads embed bare typed payloads per field/element,
//! with the tag held in a sibling types table. Field access returns a
//! [`TypedValueView`]; nested OBJECT/LIST payloads are re-parsed from that
//! view's byte slice, so every internal pointer is derived fresh from the
//! parent's values blob and parsing stays reentrant.

use crate::decode::{OffsetTable, Reader};
use crate::error::{CodecError, CodecResult};
use crate::tag::ValueType;

/// A tagged payload inside an OBJECT or LIST values blob.
#[derive(Debug, Clone, Copy)]
pub struct TypedValueView<'a> {
    /// Type tag of the payload.
    pub tag: ValueType,
    /// The bare typed payload bytes (no tag prefix).
    pub payload: &'a [u8],
}

impl<'a> TypedValueView<'a> {
    /// Parses the payload as a nested OBJECT.
    ///
    /// # Errors
    ///
    /// Returns an error if the tag is not [`ValueType::Object`] or the
    /// payload is malformed.
    pub fn as_object(&self) -> CodecResult<ObjectView<'a>> {
        if self.tag != ValueType::Object {
            return Err(CodecError::malformed(format!(
                "expected object payload, found {}",
                self.tag
            )));
        }
        ObjectView::parse(self.payload)
    }

    /// Parses the payload as a nested LIST.
    ///
    /// # Errors
    ///
    /// Returns an error if the tag is not [`ValueType::List`] or the
    /// payload is malformed.
    pub fn as_list(&self) -> CodecResult<ListView<'a>> {
        if self.tag != ValueType::List {
            return Err(CodecError::malformed(format!(
                "expected list payload, found {}",
                self.tag
            )));
        }
        ListView::parse(self.payload)
    }
}

/// Zero-copy view of an OBJECT payload.
///
/// Field names are sorted bytewise, so [`field`](Self::field) is a binary
/// search over the name table.
#[derive(Debug, Clone, Copy)]
pub struct ObjectView<'a> {
    names: OffsetTable<'a>,
    field_types: &'a [u8],
    values: OffsetTable<'a>,
}

impl<'a> ObjectView<'a> {
    /// Parses `u32 C | name CSR | u8 types[C] | pad to 4 | value CSR`.
    pub fn parse(payload: &'a [u8]) -> CodecResult<Self> {
        let mut r = Reader::new(payload);
        let count = r.u32()? as usize;
        let names = OffsetTable::parse(&mut r, count)?;
        let field_types = r.take(count)?;
        r.align4()?;
        let values = OffsetTable::parse(&mut r, count)?;
        Ok(Self {
            names,
            field_types,
            values,
        })
    }

    /// Field count.
    #[must_use]
    pub fn len(&self) -> usize {
        self.names.len()
    }

    /// Whether the object has no fields.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// Returns the field name at `index` in sorted order.
    #[must_use]
    pub fn name_at(&self, index: usize) -> Option<&'a [u8]> {
        self.names.get(index)
    }

    /// Returns the typed payload at `index`.
    ///
    /// # Errors
    ///
    /// Returns an error if the stored tag byte is not part of the wire
    /// format.
    pub fn field_at(&self, index: usize) -> CodecResult<Option<TypedValueView<'a>>> {
        let Some(payload) = self.values.get(index) else {
            return Ok(None);
        };
        let tag = ValueType::from_u8(self.field_types[index])?;
        Ok(Some(TypedValueView { tag, payload }))
    }

    /// Binary-searches for the field named `name`.
    ///
    /// Returns `Ok(None)` when the object has no such field.
    ///
    /// # Errors
    ///
    /// Returns an error if the stored tag byte is not part of the wire
    /// format.
    pub fn field(&self, name: &[u8]) -> CodecResult<Option<TypedValueView<'a>>> {
        match self.names.binary_search(name) {
            Ok(index) => self.field_at(index),
            Err(_) => Ok(None),
        }
    }

    /// Iterates over `(name, tag, payload)` triples in name order.
    ///
    /// Entries whose tag byte is invalid yield an error.
    pub fn iter(&self) -> impl Iterator<Item = CodecResult<(&'a [u8], TypedValueView<'a>)>> + 'a {
        let view = *self;
        (0..view.len()).map(move |i| {
            let name = view.names.get(i).ok_or(CodecError::UnexpectedEof)?;
            let field = view.field_at(i)?.ok_or(CodecError::UnexpectedEof)?;
            Ok((name, field))
        })
    }
}

/// Zero-copy view of a LIST payload. Element order is the insertion order.
#[derive(Debug, Clone, Copy)]
pub struct ListView<'a> {
    elem_types: &'a [u8],
    values: OffsetTable<'a>,
}

impl<'a> ListView<'a> {
    /// Parses `u32 C | u8 types[C] | pad to 4 | value CSR`.
    pub fn parse(payload: &'a [u8]) -> CodecResult<Self> {
        let mut r = Reader::new(payload);
        let count = r.u32()? as usize;
        let elem_types = r.take(count)?;
        r.align4()?;
        let values = OffsetTable::parse(&mut r, count)?;
        Ok(Self { elem_types, values })
    }

    /// Element count.
    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Whether the list is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Returns the typed payload at `index`, bounds-checked against the
    /// element count.
    ///
    /// # Errors
    ///
    /// Returns an error if the stored tag byte is not part of the wire
    /// format.
    pub fn element(&self, index: usize) -> CodecResult<Option<TypedValueView<'a>>> {
        let Some(payload) = self.values.get(index) else {
            return Ok(None);
        };
        let tag = ValueType::from_u8(self.elem_types[index])?;
        Ok(Some(TypedValueView { tag, payload }))
    }

    /// Iterates over the elements in stored order.
    pub fn iter(&self) -> impl Iterator<Item = CodecResult<TypedValueView<'a>>> + 'a {
        let view = *self;
        (0..view.len()).map(move |i| view.element(i)?.ok_or(CodecError::UnexpectedEof))
    }
}
