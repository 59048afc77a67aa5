//! Mathematical utility functions.

/// Rounds `value` up to the next multiple of `alignment`.
///
/// `alignment` must be a power of two. The result is the smallest multiple of `alignment`
/// that is greater than or equal to `value`; an already aligned value is returned unchanged.
/// An alignment of `0` or `1` leaves the value untouched.
///
/// # Examples
///
/// ```rust,ignore
/// use callpack::utils::align_up;
///
/// assert_eq!(align_up(0, 8), 0);
/// assert_eq!(align_up(1, 8), 8);
/// assert_eq!(align_up(8, 8), 8);
/// assert_eq!(align_up(13, 4), 16);
/// ```
#[must_use]
#[inline]
pub const fn align_up(value: usize, alignment: usize) -> usize {
    if alignment <= 1 {
        return value;
    }
    debug_assert!(alignment.is_power_of_two());
    let mask = alignment - 1;
    (value + mask) & !mask
}
