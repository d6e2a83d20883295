//! Zero-copy, schema-driven table buffers.
//!
//! A buffer holds a tree of tables rooted at the `u32` forward offset stored
//! at position 0. Each table starts with a signed offset to its vtable, which
//! maps field ids to positions inside the table. Reading a field resolves the
//! id through the vtable and decodes the value in place; absent fields yield
//! their declared default.
//!
//! This crate provides the schema-independent machinery: the primitive codec,
//! the table, vector and string accessors, the [`Builder`], keyed lookup over
//! sorted vectors, in-place mutation, the [`Verifier`](verifier::Verifier) and
//! checksummed message framing. Schema crates wrap [`Table`] in typed
//! accessors.

pub mod builder;
pub mod codec;
pub mod message;
pub mod mutate;
pub mod options;
pub mod sorted;
pub mod table;
pub mod vector;
pub mod verifier;
pub mod vtable;

#[cfg(test)]
mod tests;

pub use builder::{BuildStats, Builder, Offset};
pub use ettu_common::Result;
pub use mutate::TableMut;
pub use table::{Table, TableRef};
pub use vector::{Follow, Vector};

use ettu_common::error::Error;

/// Size of a forward (unsigned) offset.
pub const SIZE_UOFFSET: usize = 4;

/// Size of the signed offset at the start of every table.
pub const SIZE_SOFFSET: usize = 4;

/// Size of a vtable entry.
pub const SIZE_VOFFSET: usize = 2;

/// Vtable byte length followed by table byte length.
pub const VTABLE_HEADER_SIZE: usize = 2 * SIZE_VOFFSET;

pub const FILE_IDENTIFIER_LEN: usize = 4;

/// Offsets are 32-bit and the table-to-vtable offset is signed, which caps a
/// buffer just below 2 GiB.
pub const MAX_BUFFER_SIZE: usize = (1 << 31) - 1;

/// Index of a field in its table's declared field list.
pub type FieldId = u16;

/// Position of the vtable slot for field `id`, relative to the vtable start.
#[inline]
pub const fn field_voffset(id: FieldId) -> usize {
    VTABLE_HEADER_SIZE + SIZE_VOFFSET * id as usize
}

/// Position of the root table of a finished buffer.
pub fn root_position(buf: &[u8]) -> Result<usize> {
    if buf.len() < SIZE_UOFFSET {
        return Err(Error::out_of_bounds("root offset", 0, buf.len()));
    }
    codec::read_uoffset(buf, 0)
}

/// Opens the root table of a finished buffer without verifying it.
pub fn root_table(buf: &[u8]) -> Result<Table<'_>> {
    Table::at(buf, root_position(buf)?)
}

/// Returns `true` if the buffer carries `ident` right after the root offset.
pub fn buffer_has_identifier(buf: &[u8], ident: &[u8; FILE_IDENTIFIER_LEN]) -> bool {
    buf.get(SIZE_UOFFSET..SIZE_UOFFSET + FILE_IDENTIFIER_LEN) == Some(ident.as_slice())
}
