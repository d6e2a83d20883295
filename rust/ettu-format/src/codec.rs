//! Fixed-width little-endian scalar and inline-struct codec.
//!
//! Every read in this module is bounds-checked against the buffer it is
//! given; an out-of-range offset is reported as [`ErrorKind::OutOfBounds`]
//! rather than a panic.
//!
//! [`ErrorKind::OutOfBounds`]: ettu_common::error::ErrorKind::OutOfBounds

use std::cmp::Ordering;

use byteorder::{ByteOrder, LittleEndian};
use ettu_common::{Result, error::Error};

/// A fixed-width primitive value stored little-endian in the buffer.
pub trait Scalar: Copy + PartialEq + std::fmt::Debug {
    /// Encoded width in bytes. Also the natural alignment of the value.
    const SIZE: usize;

    /// Decodes the value from the first `SIZE` bytes of `bytes`.
    fn read_le(bytes: &[u8]) -> Self;

    /// Encodes the value into the first `SIZE` bytes of `bytes`.
    fn write_le(self, bytes: &mut [u8]);

    /// Total order used for keyed vectors.
    fn key_cmp(&self, other: &Self) -> Ordering;
}

macro_rules! impl_int_scalar {
    ($ty:ty, $size:expr, $read:ident, $write:ident) => {
        impl Scalar for $ty {
            const SIZE: usize = $size;

            #[inline]
            fn read_le(bytes: &[u8]) -> Self {
                LittleEndian::$read(bytes)
            }

            #[inline]
            fn write_le(self, bytes: &mut [u8]) {
                LittleEndian::$write(bytes, self)
            }

            #[inline]
            fn key_cmp(&self, other: &Self) -> Ordering {
                self.cmp(other)
            }
        }
    };
}

impl_int_scalar!(u16, 2, read_u16, write_u16);
impl_int_scalar!(i16, 2, read_i16, write_i16);
impl_int_scalar!(u32, 4, read_u32, write_u32);
impl_int_scalar!(i32, 4, read_i32, write_i32);
impl_int_scalar!(u64, 8, read_u64, write_u64);
impl_int_scalar!(i64, 8, read_i64, write_i64);

macro_rules! impl_float_scalar {
    ($ty:ty, $size:expr, $read:ident, $write:ident) => {
        impl Scalar for $ty {
            const SIZE: usize = $size;

            #[inline]
            fn read_le(bytes: &[u8]) -> Self {
                LittleEndian::$read(bytes)
            }

            #[inline]
            fn write_le(self, bytes: &mut [u8]) {
                LittleEndian::$write(bytes, self)
            }

            #[inline]
            fn key_cmp(&self, other: &Self) -> Ordering {
                self.total_cmp(other)
            }
        }
    };
}

impl_float_scalar!(f32, 4, read_f32, write_f32);
impl_float_scalar!(f64, 8, read_f64, write_f64);

impl Scalar for u8 {
    const SIZE: usize = 1;

    #[inline]
    fn read_le(bytes: &[u8]) -> Self {
        bytes[0]
    }

    #[inline]
    fn write_le(self, bytes: &mut [u8]) {
        bytes[0] = self;
    }

    #[inline]
    fn key_cmp(&self, other: &Self) -> Ordering {
        self.cmp(other)
    }
}

impl Scalar for i8 {
    const SIZE: usize = 1;

    #[inline]
    fn read_le(bytes: &[u8]) -> Self {
        bytes[0] as i8
    }

    #[inline]
    fn write_le(self, bytes: &mut [u8]) {
        bytes[0] = self as u8;
    }

    #[inline]
    fn key_cmp(&self, other: &Self) -> Ordering {
        self.cmp(other)
    }
}

/// Booleans occupy one byte; any nonzero byte decodes as `true`.
impl Scalar for bool {
    const SIZE: usize = 1;

    #[inline]
    fn read_le(bytes: &[u8]) -> Self {
        bytes[0] != 0
    }

    #[inline]
    fn write_le(self, bytes: &mut [u8]) {
        bytes[0] = u8::from(self);
    }

    #[inline]
    fn key_cmp(&self, other: &Self) -> Ordering {
        self.cmp(other)
    }
}

/// A fixed-size record stored inline, either inside a table or as a vector element.
///
/// Implementations lay their members out little-endian at fixed offsets,
/// including any explicit padding, so that `SIZE` is a multiple of `ALIGN`.
pub trait Struct: Copy + std::fmt::Debug {
    const SIZE: usize;
    const ALIGN: usize;

    /// Decodes the struct from exactly `SIZE` bytes.
    fn read_from(bytes: &[u8]) -> Self;

    /// Encodes the struct into exactly `SIZE` bytes, zeroing any padding.
    fn write_to(&self, bytes: &mut [u8]);
}

/// Checks that `size` bytes starting at `pos` lie within `buf`.
#[inline]
pub fn check_range(buf: &[u8], pos: usize, size: usize, element: &'static str) -> Result<()> {
    match pos.checked_add(size) {
        Some(end) if end <= buf.len() => Ok(()),
        _ => Err(Error::out_of_bounds(element, pos, buf.len())),
    }
}

#[inline]
pub fn read_scalar<T: Scalar>(buf: &[u8], pos: usize) -> Result<T> {
    check_range(buf, pos, T::SIZE, "scalar")?;
    Ok(T::read_le(&buf[pos..pos + T::SIZE]))
}

#[inline]
pub fn write_scalar<T: Scalar>(buf: &mut [u8], pos: usize, value: T) -> Result<()> {
    check_range(buf, pos, T::SIZE, "scalar")?;
    value.write_le(&mut buf[pos..pos + T::SIZE]);
    Ok(())
}

#[inline]
pub fn read_struct<S: Struct>(buf: &[u8], pos: usize) -> Result<S> {
    check_range(buf, pos, S::SIZE, "struct")?;
    Ok(S::read_from(&buf[pos..pos + S::SIZE]))
}

#[inline]
pub fn write_struct<S: Struct>(buf: &mut [u8], pos: usize, value: &S) -> Result<()> {
    check_range(buf, pos, S::SIZE, "struct")?;
    value.write_to(&mut buf[pos..pos + S::SIZE]);
    Ok(())
}

/// Follows the unsigned forward offset stored at `pos`, returning the target position.
pub fn read_uoffset(buf: &[u8], pos: usize) -> Result<usize> {
    let offset = read_scalar::<u32>(buf, pos)? as usize;
    match pos.checked_add(offset) {
        Some(target) if offset != 0 && target < buf.len() => Ok(target),
        _ => Err(Error::out_of_bounds("offset target", pos, buf.len())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scalar_little_endian_layout() {
        let mut buf = [0u8; 8];
        write_scalar(&mut buf, 0, 0x1122_3344u32).unwrap();
        assert_eq!(&buf[..4], &[0x44, 0x33, 0x22, 0x11]);
        write_scalar(&mut buf, 4, -2i16).unwrap();
        assert_eq!(&buf[4..6], &[0xfe, 0xff]);
        assert_eq!(read_scalar::<i16>(&buf, 4).unwrap(), -2);
        assert_eq!(read_scalar::<u32>(&buf, 0).unwrap(), 0x1122_3344);
    }

    #[test]
    fn test_bool_and_float() {
        let mut buf = [0u8; 12];
        write_scalar(&mut buf, 0, true).unwrap();
        assert_eq!(buf[0], 1);
        buf[1] = 7;
        assert!(read_scalar::<bool>(&buf, 1).unwrap());
        write_scalar(&mut buf, 4, 1.5f64).unwrap();
        assert_eq!(read_scalar::<f64>(&buf, 4).unwrap(), 1.5);
    }

    #[test]
    fn test_out_of_bounds_reads() {
        let buf = [0u8; 6];
        assert!(read_scalar::<u32>(&buf, 2).is_ok());
        assert!(read_scalar::<u32>(&buf, 3).unwrap_err().is_out_of_bounds());
        assert!(read_scalar::<u64>(&buf, usize::MAX - 2).is_err());
        let mut buf = [0u8; 2];
        assert!(write_scalar(&mut buf, 1, 5u16).is_err());
        assert_eq!(buf, [0, 0]);
    }

    #[test]
    fn test_uoffset_bounds() {
        let mut buf = [0u8; 8];
        write_scalar(&mut buf, 0, 4u32).unwrap();
        assert_eq!(read_uoffset(&buf, 0).unwrap(), 4);
        write_scalar(&mut buf, 0, 8u32).unwrap();
        assert!(read_uoffset(&buf, 0).is_err());
        write_scalar(&mut buf, 0, 0u32).unwrap();
        assert!(read_uoffset(&buf, 0).is_err());
    }

    #[test]
    fn test_float_key_order_is_total() {
        assert_eq!((-0.0f32).key_cmp(&0.0), Ordering::Less);
        assert_eq!(1.0f64.key_cmp(&f64::NAN), Ordering::Less);
        assert_eq!(3u32.key_cmp(&3), Ordering::Equal);
    }
}
