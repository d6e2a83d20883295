//! Field-offset tables ("vtables").
//!
//! A vtable is a run of little-endian `u16` values:
//!
//! ```text
//! [vtable byte length][table byte length][slot 0][slot 1]...
//! ```
//!
//! Slot `i` holds the offset of field `i` relative to the start of the table
//! that references the vtable, or 0 when the field is absent. Trailing absent
//! slots are not stored; a field id past the end of the vtable is simply
//! absent, which is what lets buffers written by older and newer schemas be
//! read by each other.

use ahash::AHashMap;
use byteorder::{ByteOrder, LittleEndian};
use ettu_common::{Result, verify_data};

use crate::{FieldId, VTABLE_HEADER_SIZE, codec::check_range, field_voffset};

/// Read-only view of a vtable inside a buffer. The header is validated on creation.
#[derive(Clone, Copy)]
pub struct VTable<'a> {
    buf: &'a [u8],
    pos: usize,
    len: usize,
}

impl<'a> VTable<'a> {
    /// Opens the vtable at `pos`, checking that its declared length is sane and
    /// that the whole vtable lies within `buf`.
    pub fn at(buf: &'a [u8], pos: usize) -> Result<VTable<'a>> {
        check_range(buf, pos, VTABLE_HEADER_SIZE, "vtable header")?;
        let len = LittleEndian::read_u16(&buf[pos..]) as usize;
        verify_data!(vtable_len, len >= VTABLE_HEADER_SIZE && len % 2 == 0);
        check_range(buf, pos, len, "vtable")?;
        Ok(VTable { buf, pos, len })
    }

    /// Position of the vtable within the buffer.
    #[inline]
    pub fn position(&self) -> usize {
        self.pos
    }

    /// Size of the vtable in bytes, header included.
    #[inline]
    pub fn byte_len(&self) -> usize {
        self.len
    }

    /// Size in bytes of the table described by this vtable.
    #[inline]
    pub fn table_len(&self) -> usize {
        LittleEndian::read_u16(&self.buf[self.pos + 2..]) as usize
    }

    /// Number of stored field slots.
    #[inline]
    pub fn num_slots(&self) -> usize {
        (self.len - VTABLE_HEADER_SIZE) / 2
    }

    /// Returns the stored offset for `id`, or 0 when the field is absent
    /// (including ids beyond the stored slots).
    #[inline]
    pub fn slot(&self, id: FieldId) -> u16 {
        let voffset = field_voffset(id);
        if voffset >= self.len {
            return 0;
        }
        LittleEndian::read_u16(&self.buf[self.pos + voffset..])
    }

    /// Raw bytes of the vtable.
    pub fn as_bytes(&self) -> &'a [u8] {
        &self.buf[self.pos..self.pos + self.len]
    }
}

impl std::fmt::Debug for VTable<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let slots = (0..self.num_slots())
            .map(|i| self.slot(i as FieldId))
            .collect::<Vec<_>>();
        f.debug_struct("VTable")
            .field("pos", &self.pos)
            .field("table_len", &self.table_len())
            .field("slots", &slots)
            .finish()
    }
}

/// Encodes a vtable for a table of `table_len` bytes with the given slots.
pub(crate) fn encode(table_len: u16, slots: &[u16]) -> Vec<u8> {
    let len = VTABLE_HEADER_SIZE + slots.len() * 2;
    let mut bytes = vec![0u8; len];
    LittleEndian::write_u16(&mut bytes[0..], len as u16);
    LittleEndian::write_u16(&mut bytes[2..], table_len);
    for (i, &slot) in slots.iter().enumerate() {
        LittleEndian::write_u16(&mut bytes[VTABLE_HEADER_SIZE + i * 2..], slot);
    }
    bytes
}

/// Interning cache for vtables emitted by a builder, keyed by their encoded bytes.
///
/// Values are positions expressed as distance from the end of the buffer under
/// construction, which stay valid for the lifetime of the builder.
#[derive(Debug, Default)]
pub(crate) struct VTableCache {
    entries: AHashMap<Vec<u8>, u32>,
}

impl VTableCache {
    pub fn get(&self, vtable: &[u8]) -> Option<u32> {
        self.entries.get(vtable).copied()
    }

    pub fn insert(&mut self, vtable: Vec<u8>, position: u32) {
        self.entries.insert(vtable, position);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}
