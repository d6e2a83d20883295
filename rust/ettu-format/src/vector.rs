//! Length-prefixed vectors and strings.
//!
//! A vector is `[count: u32][elements...]`. Scalars and structs are stored
//! inline with a stride equal to their size; strings and tables are stored as
//! 4-byte forward offsets. A string is a `u8` vector followed by a NUL byte
//! that is not included in the count.

use std::marker::PhantomData;

use ettu_common::{Result, error::Error, error::ErrorKind, try_or_ret_some_err};

use crate::{
    SIZE_UOFFSET,
    codec::{Scalar, check_range, read_scalar, read_uoffset},
    table::Table,
};

/// A value that can be decoded from a vector slot.
pub trait Follow<'a>: Sized {
    /// Distance between consecutive elements of a vector of `Self`.
    const STRIDE: usize;

    /// Decodes the element whose slot starts at `pos`.
    fn follow(buf: &'a [u8], pos: usize) -> Result<Self>;
}

macro_rules! impl_scalar_follow {
    ($($ty:ty),*) => {
        $(
            impl<'a> Follow<'a> for $ty {
                const STRIDE: usize = <$ty as Scalar>::SIZE;

                #[inline]
                fn follow(buf: &'a [u8], pos: usize) -> Result<Self> {
                    read_scalar(buf, pos)
                }
            }
        )*
    };
}

impl_scalar_follow!(u8, i8, bool, u16, i16, u32, i32, u64, i64, f32, f64);

impl<'a> Follow<'a> for &'a str {
    const STRIDE: usize = SIZE_UOFFSET;

    #[inline]
    fn follow(buf: &'a [u8], pos: usize) -> Result<Self> {
        read_str(buf, read_uoffset(buf, pos)?)
    }
}

impl<'a> Follow<'a> for Table<'a> {
    const STRIDE: usize = SIZE_UOFFSET;

    #[inline]
    fn follow(buf: &'a [u8], pos: usize) -> Result<Self> {
        Table::follow(buf, pos)
    }
}

/// Implements [`Follow`] for a type implementing [`Struct`](crate::codec::Struct),
/// so it can be read as an inline vector element.
#[macro_export]
macro_rules! struct_follow {
    ($name:ty) => {
        impl<'a> $crate::vector::Follow<'a> for $name {
            const STRIDE: usize = <$name as $crate::codec::Struct>::SIZE;

            #[inline]
            fn follow(buf: &'a [u8], pos: usize) -> $crate::Result<Self> {
                $crate::codec::read_struct(buf, pos)
            }
        }
    };
}

/// Reads the `u32` element count at `pos` and checks that `count * stride`
/// payload bytes follow it. Returns the payload position and the count.
fn read_prefixed(buf: &[u8], pos: usize, stride: usize) -> Result<(usize, usize)> {
    let count = read_scalar::<u32>(buf, pos)? as usize;
    let data = pos + SIZE_UOFFSET;
    let size = count
        .checked_mul(stride)
        .ok_or_else(|| Error::out_of_bounds("vector", pos, buf.len()))?;
    check_range(buf, data, size, "vector")?;
    Ok((data, count))
}

/// Reads the string whose length prefix is at `pos`.
pub fn read_str(buf: &[u8], pos: usize) -> Result<&str> {
    let bytes = read_byte_string(buf, pos)?;
    std::str::from_utf8(bytes).map_err(|e| {
        ErrorKind::InvalidUtf8 {
            element: "string".to_string(),
            source: e,
        }
        .into()
    })
}

/// Reads the raw bytes of the `u8` vector whose length prefix is at `pos`.
pub fn read_byte_string(buf: &[u8], pos: usize) -> Result<&[u8]> {
    let (data, len) = read_prefixed(buf, pos, 1)?;
    Ok(&buf[data..data + len])
}

/// A typed vector inside a buffer.
pub struct Vector<'a, T> {
    buf: &'a [u8],
    /// Position of the first element.
    data: usize,
    len: usize,
    _p: PhantomData<T>,
}

impl<'a, T: Follow<'a>> Vector<'a, T> {
    /// Opens the vector whose length prefix is at `pos`.
    pub fn at(buf: &'a [u8], pos: usize) -> Result<Vector<'a, T>> {
        let (data, len) = read_prefixed(buf, pos, T::STRIDE)?;
        Ok(Vector {
            buf,
            data,
            len,
            _p: PhantomData,
        })
    }

    /// Opens the vector referenced by the forward offset stored at `pos`.
    pub fn follow(buf: &'a [u8], pos: usize) -> Result<Vector<'a, T>> {
        Vector::at(buf, read_uoffset(buf, pos)?)
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Position of the first element within the buffer.
    #[inline]
    pub fn data_position(&self) -> usize {
        self.data
    }

    /// Position of the slot holding element `index` (the element itself for
    /// inline types, its forward offset otherwise).
    pub fn slot_position(&self, index: usize) -> Result<usize> {
        if index >= self.len {
            return Err(Error::invalid_arg(
                "index",
                format!("{index} out of range for vector of {}", self.len),
            ));
        }
        Ok(self.data + index * T::STRIDE)
    }

    /// Decodes element `index`.
    pub fn get(&self, index: usize) -> Result<T> {
        T::follow(self.buf, self.slot_position(index)?)
    }

    pub fn iter(&self) -> VectorIter<'a, T> {
        VectorIter {
            vector: self.clone(),
            index: 0,
        }
    }

    /// Decodes every element into a `Vec`.
    pub fn to_vec(&self) -> Result<Vec<T>> {
        self.iter().collect()
    }

    /// The raw bytes of the element slots.
    pub fn as_bytes(&self) -> &'a [u8] {
        &self.buf[self.data..self.data + self.len * T::STRIDE]
    }
}

impl<T> Clone for Vector<'_, T> {
    fn clone(&self) -> Self {
        Vector {
            buf: self.buf,
            data: self.data,
            len: self.len,
            _p: PhantomData,
        }
    }
}

impl<T> std::fmt::Debug for Vector<'_, T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Vector")
            .field("data", &self.data)
            .field("len", &self.len)
            .finish()
    }
}

impl<'a, T: Follow<'a>> IntoIterator for &Vector<'a, T> {
    type Item = Result<T>;
    type IntoIter = VectorIter<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

pub struct VectorIter<'a, T> {
    vector: Vector<'a, T>,
    index: usize,
}

impl<'a, T: Follow<'a>> Iterator for VectorIter<'a, T> {
    type Item = Result<T>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.index >= self.vector.len {
            return None;
        }
        let index = self.index;
        self.index += 1;
        let item = try_or_ret_some_err!(self.vector.get(index));
        Some(Ok(item))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.vector.len - self.index;
        (remaining, Some(remaining))
    }
}

impl<'a, T: Follow<'a>> ExactSizeIterator for VectorIter<'a, T> {}
