//! Shared pool handle.
//!
//! Every tree and typed allocator reaches its pool through a [`PoolHandle`].
//! Handles are cheap to clone and all clones refer to the same pool. Each
//! thread has a lazily built default pool, configured from the environment,
//! returned by [`PoolHandle::global`].

use std::cell::RefCell;
use std::rc::Rc;

use crate::config::PoolConfig;
use crate::error::AllocError;
use crate::metrics::PoolStats;

use super::fallback::OomHandler;
use super::heap::HostHeap;
use super::pool::PoolAllocator;

thread_local! {
    static DEFAULT_POOL: PoolHandle = PoolHandle::new(PoolAllocator::default());
}

/// Reference-counted handle to a [`PoolAllocator`].
#[derive(Debug, Clone)]
pub struct PoolHandle {
    inner: Rc<RefCell<PoolAllocator>>,
}

impl PoolHandle {
    #[must_use]
    pub fn new(pool: PoolAllocator) -> Self {
        Self {
            inner: Rc::new(RefCell::new(pool)),
        }
    }

    /// Builds a fresh pool over `heap`.
    #[must_use]
    pub fn with_heap(heap: impl HostHeap + 'static, config: PoolConfig) -> Self {
        Self::new(PoolAllocator::new(heap, config))
    }

    /// This thread's default pool.
    #[must_use]
    pub fn global() -> Self {
        DEFAULT_POOL.with(Clone::clone)
    }

    pub fn allocate(&self, n: usize) -> Result<usize, AllocError> {
        self.inner.borrow_mut().allocate(n)
    }

    pub fn deallocate(&self, addr: usize, n: usize) {
        self.inner.borrow_mut().deallocate(addr, n);
    }

    pub fn reallocate(&self, addr: usize, old_n: usize, new_n: usize) -> Result<usize, AllocError> {
        self.inner.borrow_mut().reallocate(addr, old_n, new_n)
    }

    /// See [`PoolAllocator::set_oom_handler`]. The handler must not touch
    /// this pool: it runs while the pool is mutably borrowed.
    pub fn set_oom_handler(&self, handler: Option<OomHandler>) -> Option<OomHandler> {
        self.inner.borrow_mut().set_oom_handler(handler)
    }

    #[must_use]
    pub fn stats(&self) -> PoolStats {
        self.inner.borrow().stats()
    }

    /// Runs `f` with exclusive access to the pool.
    pub fn with<R>(&self, f: impl FnOnce(&mut PoolAllocator) -> R) -> R {
        f(&mut self.inner.borrow_mut())
    }

    /// True if both handles refer to the same pool.
    #[must_use]
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }
}

impl Default for PoolHandle {
    fn default() -> Self {
        Self::global()
    }
}
