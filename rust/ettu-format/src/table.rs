//! Table accessor: resolves field ids through the table's vtable and decodes
//! values straight out of the buffer.

use ettu_common::{Result, error::Error, verify_data};

use crate::{
    FieldId, SIZE_SOFFSET, SIZE_UOFFSET,
    codec::{Scalar, Struct, read_scalar, read_struct, read_uoffset},
    vector::{Follow, Vector, read_byte_string, read_str},
    vtable::VTable,
};

/// A table located at `pos` within `buf`.
///
/// Creating a `Table` validates the table header and its vtable; individual
/// field reads are bounds-checked when they happen.
#[derive(Clone, Copy)]
pub struct Table<'a> {
    buf: &'a [u8],
    pos: usize,
    vtable: VTable<'a>,
}

impl<'a> Table<'a> {
    /// Opens the table whose first byte (the signed vtable offset) is at `pos`.
    pub fn at(buf: &'a [u8], pos: usize) -> Result<Table<'a>> {
        let soffset = read_scalar::<i32>(buf, pos)?;
        let vtable_pos = pos as i64 - soffset as i64;
        if vtable_pos < 0 || vtable_pos as usize >= buf.len() {
            return Err(Error::out_of_bounds("vtable", pos, buf.len()));
        }
        let vtable = VTable::at(buf, vtable_pos as usize)?;
        let table_len = vtable.table_len();
        verify_data!(table_len, table_len >= SIZE_SOFFSET);
        crate::codec::check_range(buf, pos, table_len, "table")?;
        Ok(Table { buf, pos, vtable })
    }

    /// Opens the table referenced by the forward offset stored at `pos`.
    pub fn follow(buf: &'a [u8], pos: usize) -> Result<Table<'a>> {
        Table::at(buf, read_uoffset(buf, pos)?)
    }

    #[inline]
    pub fn buffer(&self) -> &'a [u8] {
        self.buf
    }

    #[inline]
    pub fn position(&self) -> usize {
        self.pos
    }

    #[inline]
    pub fn vtable(&self) -> VTable<'a> {
        self.vtable
    }

    /// Returns `true` if the field has a slot in this table's vtable.
    #[inline]
    pub fn is_present(&self, id: FieldId) -> bool {
        self.vtable.slot(id) != 0
    }

    /// Resolves `id` to an absolute buffer position, or `None` when the field
    /// is absent and the schema default applies. The field's `size` bytes must
    /// lie inside the table.
    pub fn field_position(&self, id: FieldId, size: usize) -> Result<Option<usize>> {
        let slot = self.vtable.slot(id) as usize;
        if slot == 0 {
            return Ok(None);
        }
        if slot < SIZE_SOFFSET || slot + size > self.vtable.table_len() {
            return Err(Error::invalid_format(
                "field",
                format!(
                    "field {id} at table offset {slot} (size {size}) overruns table of {} bytes",
                    self.vtable.table_len()
                ),
            ));
        }
        Ok(Some(self.pos + slot))
    }

    /// Reads a scalar field, falling back to `default` when absent.
    #[inline]
    pub fn get<T: Scalar>(&self, id: FieldId, default: T) -> Result<T> {
        Ok(self.get_optional(id)?.unwrap_or(default))
    }

    /// Reads a scalar field that has no default.
    pub fn get_optional<T: Scalar>(&self, id: FieldId) -> Result<Option<T>> {
        match self.field_position(id, T::SIZE)? {
            Some(pos) => read_scalar(self.buf, pos).map(Some),
            None => Ok(None),
        }
    }

    /// Reads an inline struct field.
    pub fn get_struct<S: Struct>(&self, id: FieldId) -> Result<Option<S>> {
        match self.field_position(id, S::SIZE)? {
            Some(pos) => read_struct(self.buf, pos).map(Some),
            None => Ok(None),
        }
    }

    /// Reads a string field.
    pub fn get_str(&self, id: FieldId) -> Result<Option<&'a str>> {
        match self.offset_target(id)? {
            Some(target) => read_str(self.buf, target).map(Some),
            None => Ok(None),
        }
    }

    /// Reads a `[u8]` vector field as a byte slice.
    pub fn get_bytes(&self, id: FieldId) -> Result<Option<&'a [u8]>> {
        match self.offset_target(id)? {
            Some(target) => read_byte_string(self.buf, target).map(Some),
            None => Ok(None),
        }
    }

    /// Reads a vector field.
    pub fn get_vector<T: Follow<'a>>(&self, id: FieldId) -> Result<Option<Vector<'a, T>>> {
        match self.offset_target(id)? {
            Some(target) => Vector::at(self.buf, target).map(Some),
            None => Ok(None),
        }
    }

    /// Reads a nested table field.
    pub fn get_table(&self, id: FieldId) -> Result<Option<Table<'a>>> {
        match self.offset_target(id)? {
            Some(target) => Table::at(self.buf, target).map(Some),
            None => Ok(None),
        }
    }

    fn offset_target(&self, id: FieldId) -> Result<Option<usize>> {
        match self.field_position(id, SIZE_UOFFSET)? {
            Some(pos) => read_uoffset(self.buf, pos).map(Some),
            None => Ok(None),
        }
    }
}

impl std::fmt::Debug for Table<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Table")
            .field("pos", &self.pos)
            .field("vtable", &self.vtable)
            .finish()
    }
}

/// Implemented by the schema-specific typed wrappers around [`Table`].
pub trait TableRef<'a>: Sized {
    fn from_table(table: Table<'a>) -> Self;

    fn table(&self) -> Table<'a>;
}

impl<'a> TableRef<'a> for Table<'a> {
    fn from_table(table: Table<'a>) -> Self {
        table
    }

    fn table(&self) -> Table<'a> {
        *self
    }
}

/// Declares the reading glue for a typed table wrapper `struct Name<'a>(Table<'a>)`:
/// [`TableRef`] and [`Follow`] (so it can be an element of a vector of tables).
#[macro_export]
macro_rules! table_ref {
    ($name:ident) => {
        impl<'a> $crate::table::TableRef<'a> for $name<'a> {
            #[inline]
            fn from_table(table: $crate::table::Table<'a>) -> Self {
                $name(table)
            }

            #[inline]
            fn table(&self) -> $crate::table::Table<'a> {
                self.0
            }
        }

        impl<'a> $crate::vector::Follow<'a> for $name<'a> {
            const STRIDE: usize = $crate::SIZE_UOFFSET;

            #[inline]
            fn follow(buf: &'a [u8], pos: usize) -> $crate::Result<Self> {
                $crate::table::Table::follow(buf, pos).map($name)
            }
        }
    };
}
