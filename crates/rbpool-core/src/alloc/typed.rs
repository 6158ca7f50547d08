//! Element-typed view over a pool.
//!
//! [`TypedAllocator<T>`] converts element counts into byte counts of
//! `size_of::<T>()` and forwards to the shared pool. Tree nodes are
//! allocated through it, one element at a time.

use std::marker::PhantomData;
use std::mem::size_of;

use crate::error::AllocError;

use super::handle::PoolHandle;

/// Allocates storage for values of `T` from a [`PoolHandle`].
pub struct TypedAllocator<T> {
    pool: PoolHandle,
    _elem: PhantomData<fn() -> T>,
}

impl<T> TypedAllocator<T> {
    #[must_use]
    pub fn new(pool: PoolHandle) -> Self {
        Self {
            pool,
            _elem: PhantomData,
        }
    }

    /// Bytes reserved per element.
    #[must_use]
    pub const fn elem_size() -> usize {
        size_of::<T>()
    }

    /// Storage for `n` elements. Zero elements yields `None` without touching
    /// the pool.
    pub fn allocate(&self, n: usize) -> Result<Option<usize>, AllocError> {
        if n == 0 {
            return Ok(None);
        }
        let bytes = Self::byte_len(n)?;
        self.pool.allocate(bytes).map(Some)
    }

    /// Storage for exactly one element.
    pub fn allocate_one(&self) -> Result<usize, AllocError> {
        self.pool.allocate(size_of::<T>())
    }

    /// Returns storage for `n` elements. `n == 0` is a no-op.
    pub fn deallocate(&self, addr: usize, n: usize) {
        if n == 0 {
            return;
        }
        if let Ok(bytes) = Self::byte_len(n) {
            self.pool.deallocate(addr, bytes);
        }
    }

    pub fn deallocate_one(&self, addr: usize) {
        self.pool.deallocate(addr, size_of::<T>());
    }

    #[must_use]
    pub fn pool(&self) -> &PoolHandle {
        &self.pool
    }

    fn byte_len(n: usize) -> Result<usize, AllocError> {
        n.checked_mul(size_of::<T>()).ok_or(AllocError::SizeOverflow {
            count: n,
            elem_size: size_of::<T>(),
        })
    }
}

impl<T> Clone for TypedAllocator<T> {
    fn clone(&self) -> Self {
        Self::new(self.pool.clone())
    }
}

impl<T> std::fmt::Debug for TypedAllocator<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TypedAllocator")
            .field("elem_size", &size_of::<T>())
            .finish_non_exhaustive()
    }
}
