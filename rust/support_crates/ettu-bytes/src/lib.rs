//! Byte buffers for the ettu format: a shared immutable [`Bytes`] for finished
//! buffers and a back-to-front [`DownwardVec`] used while a buffer is being
//! built.

use std::{
    ops::{Bound, Range, RangeBounds},
    sync::Arc,
};

pub mod align;
pub mod downward;

pub use downward::DownwardVec;

/// A contiguous, immutable memory region that can be shared with other buffers and across
/// thread boundaries.
///
/// `Bytes` can be sliced and cloned without copying the underlying data.
#[derive(Clone)]
pub struct Bytes {
    data: Arc<[u8]>,
    range: Range<usize>,
}

impl Bytes {
    /// Creates a new empty `Bytes`.
    #[inline]
    pub fn new() -> Self {
        Bytes {
            data: Arc::from(Vec::new()),
            range: 0..0,
        }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.range.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.range.is_empty()
    }

    /// Creates a new `Bytes` by slicing the current `Bytes` within the given range.
    ///
    /// This operation is zero-copy; it does not allocate new memory.
    ///
    /// # Panics
    ///
    /// Panics if the range is out of bounds.
    pub fn slice(&self, range: impl RangeBounds<usize>) -> Bytes {
        let start = match range.start_bound() {
            Bound::Included(&s) => s,
            Bound::Excluded(&s) => s + 1,
            Bound::Unbounded => 0,
        };
        let end = match range.end_bound() {
            Bound::Included(&e) => e + 1,
            Bound::Excluded(&e) => e,
            Bound::Unbounded => self.len(),
        };
        assert!(
            start <= end && end <= self.len(),
            "slice {start}..{end} out of bounds for length {}",
            self.len()
        );
        Bytes {
            data: self.data.clone(),
            range: self.range.start + start..self.range.start + end,
        }
    }
}

impl std::ops::Deref for Bytes {
    type Target = [u8];

    #[inline]
    fn deref(&self) -> &Self::Target {
        &self.data[self.range.clone()]
    }
}

impl AsRef<[u8]> for Bytes {
    fn as_ref(&self) -> &[u8] {
        self
    }
}

impl Default for Bytes {
    fn default() -> Self {
        Self::new()
    }
}

impl PartialEq for Bytes {
    fn eq(&self, other: &Self) -> bool {
        self[..] == other[..]
    }
}

impl Eq for Bytes {}

impl std::fmt::Debug for Bytes {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Bytes").field("len", &self.len()).finish()
    }
}

impl From<Vec<u8>> for Bytes {
    fn from(vec: Vec<u8>) -> Self {
        let len = vec.len();
        Bytes {
            data: Arc::from(vec),
            range: 0..len,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bytes_slice_is_zero_copy() {
        let bytes = Bytes::from(b"hello world".to_vec());
        let world = bytes.slice(6..);
        assert_eq!(&world[..], b"world");
        assert_eq!(world.len(), 5);
        let inner = world.slice(1..=2);
        assert_eq!(&inner[..], b"or");
        assert!(Arc::ptr_eq(&bytes.data, &inner.data));
    }

    #[test]
    #[should_panic]
    fn test_bytes_slice_out_of_bounds() {
        let bytes = Bytes::from(b"abc".to_vec());
        bytes.slice(2..5);
    }

    #[test]
    fn test_bytes_empty() {
        let bytes = Bytes::default();
        assert!(bytes.is_empty());
        assert_eq!(bytes.slice(..).len(), 0);
    }

    #[test]
    fn test_bytes_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<Bytes>();
    }
}
