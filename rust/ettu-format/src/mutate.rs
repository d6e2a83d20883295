//! In-place mutation of fixed-size fields in a finished buffer.
//!
//! Only fields that are physically present can change: overwriting a scalar
//! or inline struct touches exactly its own bytes. A field that was omitted
//! when the buffer was built (because it held its default) has no storage, so
//! setting it reports `false` and leaves the buffer untouched. Strings,
//! vector lengths and references to child tables are never mutable.

use ettu_common::Result;

use crate::{
    FieldId,
    codec::{Scalar, Struct, write_scalar, write_struct},
    root_position,
    table::Table,
};

/// Mutable view of a table. Holding it borrows the buffer exclusively.
pub struct TableMut<'a> {
    buf: &'a mut [u8],
    pos: usize,
}

impl<'a> TableMut<'a> {
    /// Opens the table at `pos` for mutation, validating its header.
    pub fn at(buf: &'a mut [u8], pos: usize) -> Result<TableMut<'a>> {
        Table::at(buf, pos)?;
        Ok(TableMut { buf, pos })
    }

    /// Opens the root table of a finished buffer for mutation.
    pub fn root(buf: &'a mut [u8]) -> Result<TableMut<'a>> {
        let pos = root_position(buf)?;
        Self::at(buf, pos)
    }

    #[inline]
    pub fn position(&self) -> usize {
        self.pos
    }

    /// Read-only view of the same table.
    pub fn as_table(&self) -> Result<Table<'_>> {
        Table::at(self.buf, self.pos)
    }

    /// Overwrites a present scalar field. Returns `false` if the field is
    /// absent, in which case nothing is written.
    pub fn set<T: Scalar>(&mut self, id: FieldId, value: T) -> Result<bool> {
        let Some(pos) = self.as_table()?.field_position(id, T::SIZE)? else {
            return Ok(false);
        };
        write_scalar(self.buf, pos, value)?;
        Ok(true)
    }

    /// Overwrites a present inline struct field. Returns `false` if the field
    /// is absent.
    pub fn set_struct<S: Struct>(&mut self, id: FieldId, value: &S) -> Result<bool> {
        let Some(pos) = self.as_table()?.field_position(id, S::SIZE)? else {
            return Ok(false);
        };
        write_struct(self.buf, pos, value)?;
        Ok(true)
    }

    /// Mutable view of the child table referenced by field `id`.
    pub fn child_table(&mut self, id: FieldId) -> Result<Option<TableMut<'_>>> {
        let Some(child) = self.as_table()?.get_table(id)? else {
            return Ok(None);
        };
        let pos = child.position();
        Ok(Some(TableMut {
            buf: &mut *self.buf,
            pos,
        }))
    }

    /// Mutable view of element `index` of the vector of tables in field `id`.
    pub fn vector_table(&mut self, id: FieldId, index: usize) -> Result<Option<TableMut<'_>>> {
        let Some(vector) = self.as_table()?.get_vector::<Table>(id)? else {
            return Ok(None);
        };
        let pos = vector.get(index)?.position();
        Ok(Some(TableMut {
            buf: &mut *self.buf,
            pos,
        }))
    }

    /// Mutable view of another table in the same buffer, typically one located
    /// through a read-only lookup on [`TableMut::as_table`].
    pub fn table_at(&mut self, pos: usize) -> Result<TableMut<'_>> {
        TableMut::at(&mut *self.buf, pos)
    }
}

impl std::fmt::Debug for TableMut<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TableMut").field("pos", &self.pos).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Builder, root_table};

    fn build() -> Vec<u8> {
        let mut builder = Builder::new();
        builder.start_table(2);
        builder.add_scalar(0, 10u16, 0);
        builder.add_scalar(1, -3i32, 0);
        let child = builder.end_table::<()>();
        builder.start_table(3);
        builder.add_scalar(0, 1u32, 0);
        // Field 1 holds its default and is omitted.
        builder.add_scalar(1, 0u64, 0);
        builder.add_offset(2, child);
        let root = builder.end_table::<()>();
        builder.finish(root, None);
        builder.finished_data().to_vec()
    }

    #[test]
    fn test_set_present_field_changes_only_its_bytes() {
        let mut buf = build();
        let before = buf.clone();
        let field_pos = root_table(&buf)
            .unwrap()
            .field_position(0, 4)
            .unwrap()
            .unwrap();
        let mut root = TableMut::root(&mut buf).unwrap();
        assert!(root.set(0, 0xdead_beefu32).unwrap());
        let value = root.as_table().unwrap().get::<u32>(0, 0).unwrap();
        assert_eq!(value, 0xdead_beef);
        for (i, (a, b)) in before.iter().zip(&buf).enumerate() {
            if !(field_pos..field_pos + 4).contains(&i) {
                assert_eq!(a, b, "byte {i} changed");
            }
        }
    }

    #[test]
    fn test_set_absent_field_is_rejected() {
        let mut buf = build();
        let before = buf.clone();
        let mut root = TableMut::root(&mut buf).unwrap();
        assert!(!root.set(1, 99u64).unwrap());
        assert!(!root.set(7, 1u8).unwrap());
        assert_eq!(buf, before);
    }

    #[test]
    fn test_set_child_field() {
        let mut buf = build();
        let mut root = TableMut::root(&mut buf).unwrap();
        let mut child = root.child_table(2).unwrap().unwrap();
        assert!(child.set(1, 12i32).unwrap());
        let child = root_table(&buf).unwrap().get_table(2).unwrap().unwrap();
        assert_eq!(child.get::<i32>(1, 0).unwrap(), 12);
        assert_eq!(child.get::<u16>(0, 0).unwrap(), 10);
    }
}
