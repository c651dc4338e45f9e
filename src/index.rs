/// Wrap a possibly negative index into `[0, size)`.
///
/// Negative indices wrap from the end, so `idx(-1, size) == size - 1`. This is
/// how the periodic domain resolves the partition left of partition 0.
///
/// # Panics
/// If `size` is zero or does not fit into `isize`.
#[inline]
#[must_use]
pub fn idx(i: isize, size: usize) -> usize {
    let signed_size = isize::try_from(size).expect("idx: [1]");
    assert_ne!(signed_size, 0, "idx: size must be non-zero");
    // `rem_euclid` with a positive modulus is never negative.
    i.rem_euclid(signed_size).unsigned_abs()
}

/// Indices of the periodic left and right neighbours of `i`.
///
/// # Panics
/// If `size` is zero or `i` does not fit into `isize`.
#[inline]
#[must_use]
pub fn neighbours(i: usize, size: usize) -> (usize, usize) {
    let i = isize::try_from(i).expect("neighbours: [1]");
    (idx(i - 1, size), idx(i + 1, size))
}
