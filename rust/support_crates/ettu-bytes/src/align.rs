/// Returns the number of padding bytes needed to bring `n` up to a multiple
/// of `alignment`.
///
/// # Examples
///
/// ```
/// use ettu_bytes::align::padding_len;
///
/// assert_eq!(padding_len(0, 4), 0);
/// assert_eq!(padding_len(5, 4), 3);
/// assert_eq!(padding_len(6, 2), 0);
/// assert_eq!(padding_len(13, 8), 3);
/// ```
#[inline]
pub fn padding_len(n: usize, alignment: usize) -> usize {
    debug_assert_ne!(alignment, 0);
    debug_assert!(alignment.is_power_of_two());
    n.wrapping_neg() & (alignment - 1)
}

/// Checks if a number is aligned to the specified alignment boundary.
///
/// # Examples
///
/// ```
/// use ettu_bytes::align::is_aligned;
///
/// assert!(is_aligned(0, 8));
/// assert!(!is_aligned(7, 8));
/// assert!(is_aligned(16, 8));
/// ```
#[inline]
pub fn is_aligned(n: usize, alignment: usize) -> bool {
    debug_assert_ne!(alignment, 0);
    debug_assert!(alignment.is_power_of_two());
    (n & (alignment - 1)) == 0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_padding_reaches_alignment() {
        for alignment in [1usize, 2, 4, 8, 16] {
            for n in 0..100usize {
                let pad = padding_len(n, alignment);
                assert!(pad < alignment);
                assert!(is_aligned(n + pad, alignment));
                assert_eq!(is_aligned(n, alignment), pad == 0);
            }
        }
    }
}
