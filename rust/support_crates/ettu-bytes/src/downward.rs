/// A growable byte buffer that is filled from the back towards the front.
///
/// The occupied region always sits at the end of the backing allocation, so
/// prepending is cheap and every previously written byte keeps a stable
/// "distance from the end" as the buffer grows. Positions handed out by this
/// type are expressed as such distances.
///
/// When the front runs out of room, the backing storage is doubled and the
/// occupied region is moved to the end of the new allocation.
pub struct DownwardVec {
    /// Backing storage; bytes before `head` are unused (but initialized).
    inner: Vec<u8>,
    /// Index of the first occupied byte within `inner`.
    head: usize,
}

impl DownwardVec {
    const MIN_GROWTH: usize = 64;

    /// Creates a new empty buffer without allocating.
    pub fn new() -> DownwardVec {
        Self::with_capacity(0)
    }

    /// Creates a new empty buffer able to hold `capacity` bytes without reallocating.
    pub fn with_capacity(capacity: usize) -> DownwardVec {
        DownwardVec {
            inner: vec![0; capacity],
            head: capacity,
        }
    }

    /// Returns the number of occupied bytes.
    #[inline]
    pub fn len(&self) -> usize {
        self.inner.len() - self.head
    }

    /// Returns `true` if nothing has been written yet.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns the total number of bytes the buffer can hold without reallocating.
    #[inline]
    pub fn capacity(&self) -> usize {
        self.inner.len()
    }

    /// Ensures at least `additional` bytes can be prepended without reallocating.
    pub fn reserve(&mut self, additional: usize) {
        if self.head >= additional {
            return;
        }
        let len = self.len();
        let required = len.checked_add(additional).expect("buffer size overflow");
        let new_capacity = required
            .max(self.inner.len().saturating_mul(2))
            .max(Self::MIN_GROWTH);
        let mut grown = vec![0u8; new_capacity];
        let new_head = new_capacity - len;
        grown[new_head..].copy_from_slice(&self.inner[self.head..]);
        self.inner = grown;
        self.head = new_head;
    }

    /// Prepends a slice, so that it becomes the first bytes of the buffer.
    #[inline]
    pub fn prepend(&mut self, bytes: &[u8]) {
        let front = self.make_front(bytes.len());
        front.copy_from_slice(bytes);
    }

    /// Prepends `count` zero bytes.
    #[inline]
    pub fn prepend_zeros(&mut self, count: usize) {
        self.make_front(count).fill(0);
    }

    /// Grows the occupied region by `count` bytes at the front and returns the
    /// new (uninitialized from the caller's perspective) front slice.
    pub fn make_front(&mut self, count: usize) -> &mut [u8] {
        self.reserve(count);
        self.head -= count;
        &mut self.inner[self.head..self.head + count]
    }

    /// Returns the occupied bytes, front to back.
    #[inline]
    pub fn as_slice(&self) -> &[u8] {
        &self.inner[self.head..]
    }

    /// Returns the occupied bytes, front to back, as a mutable slice.
    #[inline]
    pub fn as_mut_slice(&mut self) -> &mut [u8] {
        &mut self.inner[self.head..]
    }

    /// Converts a distance from the end into an index into [`Self::as_slice`].
    ///
    /// # Panics
    ///
    /// Panics if `from_end` exceeds the occupied length.
    #[inline]
    pub fn position_of(&self, from_end: usize) -> usize {
        assert!(
            from_end <= self.len(),
            "position {from_end} is beyond the written region ({})",
            self.len()
        );
        self.len() - from_end
    }

    /// Overwrites bytes at the given distance from the end.
    ///
    /// # Panics
    ///
    /// Panics if the target range is not fully inside the occupied region.
    pub fn write_at(&mut self, from_end: usize, bytes: &[u8]) {
        let pos = self.position_of(from_end);
        self.as_mut_slice()[pos..pos + bytes.len()].copy_from_slice(bytes);
    }

    /// Discards all content, keeping the allocation.
    pub fn clear(&mut self) {
        self.head = self.inner.len();
    }

    /// Consumes the buffer, returning the occupied bytes as a `Vec<u8>`.
    pub fn into_vec(mut self) -> Vec<u8> {
        self.inner.drain(..self.head);
        self.inner
    }
}

impl Default for DownwardVec {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for DownwardVec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DownwardVec")
            .field("len", &self.len())
            .field("capacity", &self.capacity())
            .finish()
    }
}
