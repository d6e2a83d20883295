//! Back-to-front buffer construction.
//!
//! Objects are written bottom-up: strings, vectors and child tables are
//! written and closed first, and the handle returned for each (an [`Offset`])
//! is then embedded into the parent. The buffer grows from the end towards the
//! front, so an `Offset` is the object's distance from the end of the buffer,
//! which does not change as more data is prepended. Relative offsets stored in
//! the buffer are computed from these distances at the moment they are written.
//!
//! Misusing the builder (nesting tables, adding fields outside a table,
//! finishing twice, referencing an object that was never written) indicates a
//! bug in the producing code and panics. Exceeding the configured
//! `max_buffer_size` is not misuse and is reported by [`Builder::try_finish`].
//!
//! Every table starts on a 4-byte boundary and its declared length ends at
//! its last field, so tables with the same present fields written in the same
//! order get byte-identical vtables wherever they land in the buffer.

use std::{cmp::Ordering, marker::PhantomData};

use ahash::AHashMap;
use ettu_bytes::{Bytes, DownwardVec, align::padding_len};
use ettu_common::{Result, error::Error};

use crate::{
    FILE_IDENTIFIER_LEN, FieldId, SIZE_SOFFSET, SIZE_UOFFSET,
    codec::{Scalar, Struct},
    options::BuilderOptions,
    table::Table,
    vtable::{self, VTableCache},
};

/// Handle to an object already written into a [`Builder`].
///
/// The type parameter only documents what the handle points at: `Offset<str>`,
/// `Offset<[u32]>`, `Offset<System>`, and so on.
pub struct Offset<T: ?Sized> {
    value: u32,
    _p: PhantomData<fn() -> *const T>,
}

impl<T: ?Sized> Offset<T> {
    #[inline]
    fn new(value: u32) -> Offset<T> {
        Offset {
            value,
            _p: PhantomData,
        }
    }

    /// Distance of the object from the end of the buffer.
    #[inline]
    pub fn value(self) -> u32 {
        self.value
    }
}

impl<T: ?Sized> Clone for Offset<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T: ?Sized> Copy for Offset<T> {}

impl<T: ?Sized> PartialEq for Offset<T> {
    fn eq(&self, other: &Self) -> bool {
        self.value == other.value
    }
}

impl<T: ?Sized> Eq for Offset<T> {}

impl<T: ?Sized> std::fmt::Debug for Offset<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Offset({})", self.value)
    }
}

/// Counters describing what a builder has written.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BuildStats {
    pub tables: usize,
    pub vtables_written: usize,
    pub vtables_reused: usize,
    pub shared_strings_reused: usize,
}

#[derive(Debug, Clone, Copy)]
struct FieldLoc {
    off: u32,
    size: u32,
    id: FieldId,
}

/// State of the table currently being built.
#[derive(Debug, Clone, Copy)]
struct OpenTable {
    field_count: FieldId,
}

pub struct Builder {
    buf: DownwardVec,
    options: BuilderOptions,
    min_align: usize,
    open_table: Option<OpenTable>,
    field_locs: Vec<FieldLoc>,
    vtables: VTableCache,
    shared_strings: AHashMap<String, u32>,
    finished: bool,
    stats: BuildStats,
}

impl Builder {
    pub fn new() -> Builder {
        Self::with_options(BuilderOptions::default())
    }

    pub fn with_options(options: BuilderOptions) -> Builder {
        Builder {
            buf: DownwardVec::with_capacity(options.initial_capacity),
            options,
            min_align: 1,
            open_table: None,
            field_locs: Vec::new(),
            vtables: VTableCache::default(),
            shared_strings: AHashMap::new(),
            finished: false,
            stats: BuildStats::default(),
        }
    }

    pub fn options(&self) -> &BuilderOptions {
        &self.options
    }

    pub fn stats(&self) -> BuildStats {
        self.stats
    }

    /// Number of bytes written so far.
    pub fn len(&self) -> usize {
        self.buf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    pub fn is_finished(&self) -> bool {
        self.finished
    }

    /// Discards everything written so far, including the vtable and string
    /// caches, so the builder can produce another buffer.
    pub fn reset(&mut self) {
        self.buf.clear();
        self.min_align = 1;
        self.open_table = None;
        self.field_locs.clear();
        self.vtables.clear();
        self.shared_strings.clear();
        self.finished = false;
        self.stats = BuildStats::default();
    }

    /// Begins a table with `field_count` declared fields.
    ///
    /// Fields should be added widest first so that the padding between them
    /// does not depend on what was written before the table.
    pub fn start_table(&mut self, field_count: FieldId) {
        self.assert_writable("start_table");
        self.align(SIZE_SOFFSET, 0);
        self.field_locs.clear();
        self.open_table = Some(OpenTable { field_count });
    }

    /// Adds a scalar field, omitting it when it equals `default` (unless
    /// `force_defaults` is set). Floats are compared bitwise, so `-0.0` is
    /// kept when the default is `0.0`.
    pub fn add_scalar<T: Scalar>(&mut self, id: FieldId, value: T, default: T) {
        if value.key_cmp(&default) == Ordering::Equal && !self.options.force_defaults {
            self.assert_in_table(id);
            return;
        }
        self.add_scalar_always(id, value);
    }

    /// Adds a scalar field regardless of its value.
    pub fn add_scalar_always<T: Scalar>(&mut self, id: FieldId, value: T) {
        self.assert_in_table(id);
        let off = self.push_scalar(value);
        self.track_field(id, off, T::SIZE);
    }

    /// Adds a scalar field that has no default; `None` leaves it absent.
    pub fn add_optional_scalar<T: Scalar>(&mut self, id: FieldId, value: Option<T>) {
        match value {
            Some(value) => self.add_scalar_always(id, value),
            None => self.assert_in_table(id),
        }
    }

    /// Adds an inline struct field.
    pub fn add_struct<S: Struct>(&mut self, id: FieldId, value: &S) {
        self.assert_in_table(id);
        self.align(S::ALIGN, S::SIZE);
        value.write_to(self.buf.make_front(S::SIZE));
        let off = self.buf.len() as u32;
        self.track_field(id, off, S::SIZE);
    }

    /// Adds a field referencing a previously written string, vector or table.
    pub fn add_offset<T: ?Sized>(&mut self, id: FieldId, offset: Offset<T>) {
        self.assert_in_table(id);
        let off = self.push_uoffset(offset.value);
        self.track_field(id, off, SIZE_UOFFSET);
    }

    /// Adds an offset field when present.
    pub fn add_offset_opt<T: ?Sized>(&mut self, id: FieldId, offset: Option<Offset<T>>) {
        if let Some(offset) = offset {
            self.add_offset(id, offset);
        }
    }

    /// Closes the open table: writes the vtable reference (reusing an identical
    /// vtable when one was already written) and returns the table's handle.
    pub fn end_table<T: ?Sized>(&mut self) -> Offset<T> {
        assert!(
            self.open_table.is_some(),
            "end_table called without a matching start_table"
        );
        let object_offset = self.push_scalar::<i32>(0) as usize;
        self.open_table = None;

        // Padding written ahead of the first field belongs to no table.
        let table_end = self
            .field_locs
            .iter()
            .map(|loc| (loc.off - loc.size) as usize)
            .min()
            .unwrap_or(object_offset - SIZE_SOFFSET);
        let table_len = object_offset - table_end;
        assert!(
            table_len <= u16::MAX as usize,
            "table of {table_len} bytes exceeds the 64 KiB limit"
        );

        let num_slots = self
            .field_locs
            .iter()
            .map(|loc| loc.id as usize + 1)
            .max()
            .unwrap_or(0);
        let mut slots = vec![0u16; num_slots];
        for loc in &self.field_locs {
            let slot = &mut slots[loc.id as usize];
            assert_eq!(*slot, 0, "field {} added twice to the same table", loc.id);
            *slot = (object_offset - loc.off as usize) as u16;
        }
        self.field_locs.clear();
        let vtable_bytes = vtable::encode(table_len as u16, &slots);

        let cached = if self.options.dedup_vtables {
            self.vtables.get(&vtable_bytes)
        } else {
            None
        };
        let vtable_offset = match cached {
            Some(existing) => {
                log::trace!("reusing vtable at {existing} for table at {object_offset}");
                self.stats.vtables_reused += 1;
                existing as usize
            }
            None => {
                self.buf.prepend(&vtable_bytes);
                let written = self.buf.len();
                if self.options.dedup_vtables {
                    self.vtables.insert(vtable_bytes, written as u32);
                }
                self.stats.vtables_written += 1;
                written
            }
        };

        // table position - vtable position, in final forward coordinates.
        let soffset = vtable_offset as i64 - object_offset as i64;
        self.buf
            .write_at(object_offset, &(soffset as i32).to_le_bytes());
        self.stats.tables += 1;
        Offset::new(object_offset as u32)
    }

    /// Writes a NUL-terminated, length-prefixed UTF-8 string.
    pub fn create_string(&mut self, s: &str) -> Offset<str> {
        self.assert_writable("create_string");
        Offset::new(self.write_byte_run(s.as_bytes(), true))
    }

    /// Writes a string, or returns the handle of an identical string previously
    /// written through this method.
    pub fn create_shared_string(&mut self, s: &str) -> Offset<str> {
        if let Some(&existing) = self.shared_strings.get(s) {
            self.assert_writable("create_shared_string");
            self.stats.shared_strings_reused += 1;
            return Offset::new(existing);
        }
        let offset = self.create_string(s);
        self.shared_strings.insert(s.to_string(), offset.value);
        offset
    }

    /// Writes a `[u8]` vector.
    pub fn create_byte_vector(&mut self, bytes: &[u8]) -> Offset<[u8]> {
        self.assert_writable("create_byte_vector");
        Offset::new(self.write_byte_run(bytes, false))
    }

    /// Writes a vector of scalars.
    pub fn create_vector<T: Scalar>(&mut self, items: &[T]) -> Offset<[T]> {
        self.assert_writable("create_vector");
        let size = T::SIZE * items.len();
        self.align(SIZE_UOFFSET, size);
        self.align(T::SIZE, size);
        for item in items.iter().rev() {
            item.write_le(self.buf.make_front(T::SIZE));
        }
        Offset::new(self.push_scalar(items.len() as u32))
    }

    /// Writes a vector of inline structs.
    pub fn create_vector_of_structs<S: Struct>(&mut self, items: &[S]) -> Offset<[S]> {
        self.assert_writable("create_vector_of_structs");
        let size = S::SIZE * items.len();
        self.align(SIZE_UOFFSET, size);
        self.align(S::ALIGN, size);
        for item in items.iter().rev() {
            item.write_to(self.buf.make_front(S::SIZE));
        }
        Offset::new(self.push_scalar(items.len() as u32))
    }

    /// Writes a vector of forward offsets to previously written objects.
    pub fn create_vector_of_offsets<T: ?Sized>(
        &mut self,
        items: &[Offset<T>],
    ) -> Offset<[Offset<T>]> {
        self.assert_writable("create_vector_of_offsets");
        self.align(SIZE_UOFFSET, SIZE_UOFFSET * items.len());
        for item in items.iter().rev() {
            self.push_uoffset(item.value);
        }
        Offset::new(self.push_scalar(items.len() as u32))
    }

    /// Writes each string, then a vector referencing them in order.
    pub fn create_vector_of_strings(&mut self, items: &[&str]) -> Offset<[Offset<str>]> {
        let offsets = items
            .iter()
            .map(|s| self.create_string(s))
            .collect::<Vec<_>>();
        self.create_vector_of_offsets(&offsets)
    }

    /// Sorts `items` by the scalar key field `key_field` of each referenced
    /// table (ascending, stable, absent keys read as `key_default`) and writes
    /// the vector of offsets in that order. `items` is left sorted.
    ///
    /// Every element must be a table closed by this builder.
    pub fn create_sorted_vector_of_tables<T: ?Sized, K: Scalar>(
        &mut self,
        items: &mut [Offset<T>],
        key_field: FieldId,
        key_default: K,
    ) -> Offset<[Offset<T>]> {
        let mut keyed = items
            .iter()
            .map(|&item| (self.read_key(item.value, key_field, key_default), item))
            .collect::<Vec<_>>();
        keyed.sort_by(|a, b| a.0.key_cmp(&b.0));
        for (slot, (_, item)) in items.iter_mut().zip(keyed) {
            *slot = item;
        }
        self.create_vector_of_offsets(items)
    }

    /// Completes the buffer with `root` as its root table and an optional file
    /// identifier. The root offset becomes the first four bytes.
    ///
    /// # Panics
    ///
    /// Panics if the finished buffer is larger than `max_buffer_size`; use
    /// [`Builder::try_finish`] when the limit comes from configuration.
    pub fn finish<T: ?Sized>(&mut self, root: Offset<T>, file_identifier: Option<&[u8; 4]>) {
        if let Err(e) = self.try_finish(root, file_identifier) {
            panic!("{e}");
        }
    }

    /// Like [`Builder::finish`], but returns an error when the finished buffer
    /// is larger than `max_buffer_size`. The builder is finished either way.
    pub fn try_finish<T: ?Sized>(
        &mut self,
        root: Offset<T>,
        file_identifier: Option<&[u8; 4]>,
    ) -> Result<()> {
        self.assert_writable("finish");
        let ident_len = if file_identifier.is_some() {
            FILE_IDENTIFIER_LEN
        } else {
            0
        };
        let alignment = self.min_align.max(SIZE_UOFFSET);
        self.align(alignment, SIZE_UOFFSET + ident_len);
        if let Some(ident) = file_identifier {
            self.buf.prepend(ident);
        }
        self.push_uoffset(root.value);
        self.finished = true;
        log::debug!(
            "finished buffer: {} bytes, {} tables, {} vtables written, {} reused",
            self.buf.len(),
            self.stats.tables,
            self.stats.vtables_written,
            self.stats.vtables_reused
        );
        self.check_size()
    }

    /// The finished buffer.
    ///
    /// # Panics
    ///
    /// Panics if [`Builder::finish`] has not been called.
    pub fn finished_data(&self) -> &[u8] {
        assert!(self.finished, "finished_data called before finish");
        self.buf.as_slice()
    }

    /// Consumes the builder, returning the finished buffer.
    ///
    /// # Panics
    ///
    /// Panics if [`Builder::finish`] has not been called.
    pub fn into_bytes(self) -> Bytes {
        assert!(self.finished, "into_bytes called before finish");
        Bytes::from(self.buf.into_vec())
    }

    fn read_key<K: Scalar>(&self, offset: u32, key_field: FieldId, key_default: K) -> K {
        let buf = self.buf.as_slice();
        let pos = self.buf.position_of(offset as usize);
        Table::at(buf, pos)
            .and_then(|table| table.get(key_field, key_default))
            .unwrap_or_else(|e| panic!("offset {offset} does not reference a closed table: {e}"))
    }

    /// Pads the front so that, after `additional` more bytes are written, the
    /// buffer length is a multiple of `alignment`.
    fn align(&mut self, alignment: usize, additional: usize) {
        self.min_align = self.min_align.max(alignment);
        let pad = padding_len(self.buf.len() + additional, alignment);
        self.buf.prepend_zeros(pad);
    }

    fn push_scalar<T: Scalar>(&mut self, value: T) -> u32 {
        self.align(T::SIZE, 0);
        value.write_le(self.buf.make_front(T::SIZE));
        self.buf.len() as u32
    }

    fn push_uoffset(&mut self, target: u32) -> u32 {
        self.align(SIZE_UOFFSET, 0);
        assert!(
            target != 0 && target as usize <= self.buf.len(),
            "offset {target} does not reference an object written by this builder"
        );
        let relative = self.buf.len() as u32 + SIZE_UOFFSET as u32 - target;
        self.push_scalar(relative)
    }

    fn write_byte_run(&mut self, bytes: &[u8], nul_terminated: bool) -> u32 {
        let extra = usize::from(nul_terminated);
        self.align(SIZE_UOFFSET, bytes.len() + extra);
        self.buf.prepend_zeros(extra);
        self.buf.prepend(bytes);
        self.push_scalar(bytes.len() as u32)
    }

    fn track_field(&mut self, id: FieldId, off: u32, size: usize) {
        self.field_locs.push(FieldLoc {
            off,
            size: size as u32,
            id,
        });
    }

    fn check_size(&self) -> Result<()> {
        let size = self.buf.len();
        if size > self.options.max_buffer_size {
            return Err(Error::size_limit(size, self.options.max_buffer_size));
        }
        Ok(())
    }

    fn assert_writable(&self, op: &str) {
        assert!(
            !self.finished,
            "{op} called on a finished builder; call reset() first"
        );
        assert!(
            self.open_table.is_none(),
            "{op} called while a table is being built"
        );
    }

    fn assert_in_table(&self, id: FieldId) {
        assert!(!self.finished, "field added to a finished builder");
        let Some(open) = self.open_table else {
            panic!("field {id} added outside of a table");
        };
        assert!(
            id < open.field_count,
            "field {id} is beyond the table's {} declared fields",
            open.field_count
        );
    }
}

impl Default for Builder {
    fn default() -> Self {
        Self::new()
    }
}
