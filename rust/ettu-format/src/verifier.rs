//! Up-front structural verification of a buffer.
//!
//! Accessors already bounds-check every read, so verification is optional. It
//! walks the whole table tree once, following the schema through [`Verify`]
//! implementations, and rejects a buffer early if any offset, vtable, field,
//! vector or string is out of bounds or malformed. It also enforces limits on
//! nesting depth, table count and the total number of bytes visited, which
//! bounds the work done on adversarial input (such as many offsets pointing
//! at the same large vector).

use ettu_bytes::align::is_aligned;
use ettu_common::{Result, error::Error, verify_data};

use crate::{
    FILE_IDENTIFIER_LEN, FieldId, SIZE_UOFFSET, buffer_has_identifier,
    codec::{Scalar, Struct, check_range, read_uoffset},
    options::VerifierOptions,
    root_position,
    table::Table,
    vector::{Vector, read_byte_string, read_str},
};

/// Schema-specific verification of one table type.
pub trait Verify<'a> {
    /// Checks every declared field of `table`, descending into children
    /// through the verifier.
    fn verify(v: &mut Verifier<'a>, table: Table<'a>) -> Result<()>;
}

pub struct Verifier<'a> {
    buf: &'a [u8],
    options: VerifierOptions,
    depth: usize,
    num_tables: usize,
    apparent_size: usize,
}

impl<'a> Verifier<'a> {
    pub fn new(buf: &'a [u8], options: VerifierOptions) -> Verifier<'a> {
        Verifier {
            buf,
            options,
            depth: 0,
            num_tables: 0,
            apparent_size: 0,
        }
    }

    /// Number of tables visited so far.
    pub fn num_tables(&self) -> usize {
        self.num_tables
    }

    /// Number of bytes covered by the objects visited so far.
    pub fn apparent_size(&self) -> usize {
        self.apparent_size
    }

    /// Verifies the whole buffer starting from its root table of type `T`,
    /// optionally requiring a file identifier.
    pub fn verify_root<T: Verify<'a>>(
        &mut self,
        file_identifier: Option<&[u8; FILE_IDENTIFIER_LEN]>,
    ) -> Result<Table<'a>> {
        verify_data!(buffer_len, self.buf.len() <= crate::MAX_BUFFER_SIZE);
        if let Some(ident) = file_identifier {
            if !buffer_has_identifier(self.buf, ident) {
                return Err(Error::invalid_format(
                    "file identifier",
                    format!("expected {:?}", String::from_utf8_lossy(ident)),
                ));
            }
        }
        let pos = root_position(self.buf)?;
        let table = self.verify_table_at::<T>(pos)?;
        log::trace!(
            "verified buffer of {} bytes: {} tables, {} bytes visited",
            self.buf.len(),
            self.num_tables,
            self.apparent_size
        );
        Ok(table)
    }

    /// Verifies the table of type `T` at `pos` and everything it references.
    pub fn verify_table_at<T: Verify<'a>>(&mut self, pos: usize) -> Result<Table<'a>> {
        self.check_alignment(pos, 4, "table")?;
        let table = Table::at(self.buf, pos)?;
        let vtable = table.vtable();
        self.check_alignment(vtable.position(), 2, "vtable")?;

        self.num_tables += 1;
        if self.num_tables > self.options.max_tables {
            return Err(Error::verifier_limit("max_tables", self.num_tables));
        }
        self.add_apparent_size(vtable.table_len() + vtable.byte_len())?;

        self.depth += 1;
        if self.depth > self.options.max_depth {
            return Err(Error::verifier_limit("max_depth", self.depth));
        }
        T::verify(self, table)?;
        self.depth -= 1;
        Ok(table)
    }

    pub fn verify_scalar<T: Scalar>(&mut self, table: Table<'a>, id: FieldId) -> Result<()> {
        if let Some(pos) = table.field_position(id, T::SIZE)? {
            self.check_alignment(pos, T::SIZE, "scalar")?;
        }
        Ok(())
    }

    pub fn verify_struct<S: Struct>(&mut self, table: Table<'a>, id: FieldId) -> Result<()> {
        if let Some(pos) = table.field_position(id, S::SIZE)? {
            self.check_alignment(pos, S::ALIGN, "struct")?;
        }
        Ok(())
    }

    /// Verifies a string field: bounds, UTF-8 and the trailing NUL.
    pub fn verify_string(&mut self, table: Table<'a>, id: FieldId) -> Result<()> {
        match self.offset_field(table, id)? {
            Some(target) => self.verify_string_at(target),
            None => Ok(()),
        }
    }

    pub fn verify_byte_vector(&mut self, table: Table<'a>, id: FieldId) -> Result<()> {
        if let Some(target) = self.offset_field(table, id)? {
            self.check_alignment(target, SIZE_UOFFSET, "vector")?;
            let bytes = read_byte_string(self.buf, target)?;
            self.add_apparent_size(SIZE_UOFFSET + bytes.len())?;
        }
        Ok(())
    }

    /// Verifies a vector of scalars.
    pub fn verify_vector<T>(&mut self, table: Table<'a>, id: FieldId) -> Result<()>
    where
        T: Scalar + crate::vector::Follow<'a>,
    {
        self.verify_inline_vector::<T>(table, id, T::SIZE)
    }

    pub fn verify_vector_of_structs<S>(&mut self, table: Table<'a>, id: FieldId) -> Result<()>
    where
        S: Struct + crate::vector::Follow<'a>,
    {
        self.verify_inline_vector::<S>(table, id, S::ALIGN)
    }

    pub fn verify_vector_of_strings(&mut self, table: Table<'a>, id: FieldId) -> Result<()> {
        let Some(vector) = self.offset_vector(table, id)? else {
            return Ok(());
        };
        for index in 0..vector.len() {
            let target = read_uoffset(self.buf, vector.slot_position(index)?)?;
            self.verify_string_at(target)?;
        }
        Ok(())
    }

    /// Verifies a vector of tables of type `T`.
    pub fn verify_vector_of_tables<T: Verify<'a>>(
        &mut self,
        table: Table<'a>,
        id: FieldId,
    ) -> Result<()> {
        let Some(vector) = self.offset_vector(table, id)? else {
            return Ok(());
        };
        for index in 0..vector.len() {
            let target = read_uoffset(self.buf, vector.slot_position(index)?)?;
            self.verify_table_at::<T>(target)?;
        }
        Ok(())
    }

    /// Verifies a nested table field of type `T`.
    pub fn verify_table_field<T: Verify<'a>>(
        &mut self,
        table: Table<'a>,
        id: FieldId,
    ) -> Result<()> {
        if let Some(target) = self.offset_field(table, id)? {
            self.verify_table_at::<T>(target)?;
        }
        Ok(())
    }

    fn verify_string_at(&mut self, pos: usize) -> Result<()> {
        self.check_alignment(pos, SIZE_UOFFSET, "string")?;
        let s = read_str(self.buf, pos)?;
        let nul = pos + SIZE_UOFFSET + s.len();
        check_range(self.buf, nul, 1, "string terminator")?;
        verify_data!(string_terminator, self.buf[nul] == 0);
        self.add_apparent_size(SIZE_UOFFSET + s.len() + 1)
    }

    fn verify_inline_vector<T: crate::vector::Follow<'a>>(
        &mut self,
        table: Table<'a>,
        id: FieldId,
        alignment: usize,
    ) -> Result<()> {
        if let Some(target) = self.offset_field(table, id)? {
            self.check_alignment(target, SIZE_UOFFSET, "vector")?;
            let vector = Vector::<T>::at(self.buf, target)?;
            self.check_alignment(vector.data_position(), alignment, "vector elements")?;
            self.add_apparent_size(SIZE_UOFFSET + vector.as_bytes().len())?;
        }
        Ok(())
    }

    fn offset_vector(
        &mut self,
        table: Table<'a>,
        id: FieldId,
    ) -> Result<Option<Vector<'a, Table<'a>>>> {
        let Some(target) = self.offset_field(table, id)? else {
            return Ok(None);
        };
        self.check_alignment(target, SIZE_UOFFSET, "vector")?;
        // Strings and tables are both referenced through 4-byte slots, so a
        // vector of tables view is used only for slot positions.
        let vector = Vector::<Table>::at(self.buf, target)?;
        self.add_apparent_size(SIZE_UOFFSET + vector.as_bytes().len())?;
        Ok(Some(vector))
    }

    fn offset_field(&self, table: Table<'a>, id: FieldId) -> Result<Option<usize>> {
        let Some(pos) = table.field_position(id, SIZE_UOFFSET)? else {
            return Ok(None);
        };
        self.check_alignment(pos, SIZE_UOFFSET, "offset")?;
        read_uoffset(self.buf, pos).map(Some)
    }

    fn check_alignment(&self, pos: usize, alignment: usize, element: &str) -> Result<()> {
        if self.options.check_alignment && !is_aligned(pos, alignment) {
            return Err(Error::invalid_format(
                element,
                format!("position {pos} is not aligned to {alignment}"),
            ));
        }
        Ok(())
    }

    fn add_apparent_size(&mut self, size: usize) -> Result<()> {
        self.apparent_size = self.apparent_size.saturating_add(size);
        if self.apparent_size > self.options.max_apparent_size {
            return Err(Error::verifier_limit(
                "max_apparent_size",
                self.apparent_size,
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Builder;
    use ettu_common::error::ErrorKind;

    /// `{ 0: u32, 1: string, 2: [u16], 3: [Node], 4: [string] }`
    struct Node;

    impl<'a> Verify<'a> for Node {
        fn verify(v: &mut Verifier<'a>, table: Table<'a>) -> Result<()> {
            v.verify_scalar::<u32>(table, 0)?;
            v.verify_string(table, 1)?;
            v.verify_vector::<u16>(table, 2)?;
            v.verify_vector_of_tables::<Node>(table, 3)?;
            v.verify_vector_of_strings(table, 4)
        }
    }

    fn build_chain(depth: usize) -> Vec<u8> {
        let mut builder = Builder::new();
        let mut child = None;
        for level in 0..depth {
            let name = builder.create_string(&format!("node {level}"));
            let values = builder.create_vector(&[1u16, 2, 3]);
            let tags = builder.create_vector_of_strings(&["a", "b"]);
            let children = child.map(|c| builder.create_vector_of_offsets(&[c]));
            builder.start_table(5);
            builder.add_scalar(0, level as u32, 0);
            builder.add_offset(1, name);
            builder.add_offset(2, values);
            builder.add_offset_opt(3, children);
            builder.add_offset(4, tags);
            child = Some(builder.end_table::<()>());
        }
        builder.finish(child.unwrap(), Some(b"test"));
        builder.finished_data().to_vec()
    }

    #[test]
    fn test_valid_buffer() {
        let buf = build_chain(5);
        let mut verifier = Verifier::new(&buf, VerifierOptions::default());
        verifier.verify_root::<Node>(Some(b"test")).unwrap();
        assert_eq!(verifier.num_tables(), 5);
        assert!(verifier.apparent_size() > 0);
    }

    #[test]
    fn test_wrong_identifier() {
        let buf = build_chain(1);
        let mut verifier = Verifier::new(&buf, VerifierOptions::default());
        assert!(verifier.verify_root::<Node>(Some(b"gomd")).is_err());
    }

    #[test]
    fn test_depth_limit() {
        let buf = build_chain(10);
        let options = VerifierOptions {
            max_depth: 4,
            ..Default::default()
        };
        let err = Verifier::new(&buf, options)
            .verify_root::<Node>(None)
            .unwrap_err();
        assert!(matches!(
            err.kind(),
            ErrorKind::VerifierLimit {
                limit: "max_depth",
                ..
            }
        ));
    }

    #[test]
    fn test_table_and_size_limits() {
        let buf = build_chain(10);
        let options = VerifierOptions {
            max_tables: 3,
            ..Default::default()
        };
        assert!(Verifier::new(&buf, options).verify_root::<Node>(None).is_err());
        let options = VerifierOptions {
            max_apparent_size: 64,
            ..Default::default()
        };
        assert!(Verifier::new(&buf, options).verify_root::<Node>(None).is_err());
    }

    #[test]
    fn test_corrupted_bytes_never_panic() {
        let buf = build_chain(4);
        let mut rng = fastrand::Rng::with_seed(7);
        for _ in 0..2000 {
            let mut corrupted = buf.clone();
            let pos = rng.usize(..corrupted.len());
            corrupted[pos] = rng.u8(..);
            let _ = Verifier::new(&corrupted, VerifierOptions::default())
                .verify_root::<Node>(None);
        }
    }

    #[test]
    fn test_misaligned_table() {
        // root -> table at 6, vtable at 10 with no slots.
        let mut buf = vec![0u8; 14];
        buf[0..4].copy_from_slice(&6u32.to_le_bytes());
        buf[6..10].copy_from_slice(&(-4i32).to_le_bytes());
        buf[10..14].copy_from_slice(&[4, 0, 4, 0]);
        let err = Verifier::new(&buf, VerifierOptions::default())
            .verify_root::<Node>(None)
            .unwrap_err();
        assert!(err.to_string().contains("not aligned to 4"), "{err}");

        let options = VerifierOptions {
            check_alignment: false,
            ..Default::default()
        };
        Verifier::new(&buf, options)
            .verify_root::<Node>(None)
            .unwrap();
    }

    #[test]
    fn test_missing_string_terminator() {
        let mut builder = Builder::new();
        let name = builder.create_string("abc");
        builder.start_table(2);
        builder.add_offset(1, name);
        let root = builder.end_table::<()>();
        builder.finish(root, None);
        let mut buf = builder.finished_data().to_vec();
        let table = crate::root_table(&buf).unwrap();
        let s = table.get_str(1).unwrap().unwrap();
        let nul = s.as_ptr() as usize - buf.as_ptr() as usize + s.len();
        buf[nul] = b'!';
        let err = Verifier::new(&buf, VerifierOptions::default())
            .verify_root::<Node>(None)
            .unwrap_err();
        assert!(matches!(err.kind(), ErrorKind::InvalidFormat { .. }));
    }
}
