//! Size classes for pooled allocations.
//!
//! Requests up to [`MAX_BYTES`] are rounded up to a multiple of [`ALIGN`]
//! and served from one of [`NUM_SIZE_CLASSES`] free lists: 8, 16, 24, ...,
//! 128 bytes. Anything larger bypasses the pool entirely.

/// Rounding boundary for pooled sizes (bytes).
pub const ALIGN: usize = 8;

/// Largest request served from a free list (bytes).
pub const MAX_BYTES: usize = 128;

/// Number of size classes.
pub const NUM_SIZE_CLASSES: usize = MAX_BYTES / ALIGN;

/// Rounds `bytes` up to the next multiple of [`ALIGN`].
#[must_use]
pub const fn round_up(bytes: usize) -> usize {
    (bytes + ALIGN - 1) & !(ALIGN - 1)
}

/// Returns true if `bytes` is served by the fallback allocator directly.
#[must_use]
pub const fn is_oversized(bytes: usize) -> bool {
    bytes > MAX_BYTES
}

/// Free-list index for a request of `bytes`.
///
/// Zero-byte requests share the smallest class. Returns `NUM_SIZE_CLASSES`
/// for oversized requests to signal the fallback path.
#[must_use]
pub const fn class_index(bytes: usize) -> usize {
    if is_oversized(bytes) {
        return NUM_SIZE_CLASSES;
    }
    if bytes == 0 {
        return 0;
    }
    (bytes + ALIGN - 1) / ALIGN - 1
}

/// Block size of class `index`, or 0 for out-of-range indices.
#[must_use]
pub const fn class_size(index: usize) -> usize {
    if index < NUM_SIZE_CLASSES {
        (index + 1) * ALIGN
    } else {
        0
    }
}
