//! Host heap seam.
//!
//! The fallback allocator talks to the host's raw allocation primitive
//! through [`HostHeap`]. [`SimulatedHeap`] is the logical heap used by this
//! crate: addresses are offsets in a private address space, no bytes are
//! backed. It supports a byte limit and injected failures so exhaustion paths
//! can be driven deterministically.

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

/// Raw host allocation primitive.
pub trait HostHeap {
    /// Returns the address of a fresh region of at least `bytes` bytes, or
    /// `None` when the host refuses.
    fn malloc(&mut self, bytes: usize) -> Option<usize>;

    /// Resizes the region at `addr`, possibly moving it.
    fn realloc(&mut self, addr: usize, old_bytes: usize, new_bytes: usize) -> Option<usize>;

    /// Returns a region to the host. `bytes` is advisory.
    fn free(&mut self, addr: usize, bytes: usize);
}

/// Alignment of every address handed out by [`SimulatedHeap`].
pub const HEAP_ALIGN: usize = 16;

/// First address of the simulated address space.
const HEAP_BASE: usize = 0x1_0000;

fn heap_align(size: usize) -> Option<usize> {
    size.checked_next_multiple_of(HEAP_ALIGN)
}

/// Counters kept by [`SimulatedHeap`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct HeapStats {
    pub malloc_calls: u64,
    pub realloc_calls: u64,
    pub free_calls: u64,
    /// Requests refused (limit or injected failure).
    pub refusals: u64,
    pub live_regions: usize,
    pub live_bytes: usize,
}

#[derive(Debug)]
struct HeapState {
    /// Map from base address to region size.
    regions: HashMap<usize, usize>,
    next_base: usize,
    live_bytes: usize,
    limit: Option<usize>,
    fail_next: usize,
    stats: HeapStats,
}

impl HeapState {
    fn admit(&mut self, bytes: usize) -> bool {
        if self.fail_next > 0 {
            self.fail_next -= 1;
            self.stats.refusals += 1;
            return false;
        }
        let over_limit = self
            .limit
            .is_some_and(|limit| self.live_bytes.saturating_add(bytes) > limit);
        if over_limit {
            self.stats.refusals += 1;
            return false;
        }
        true
    }

    fn map(&mut self, bytes: usize) -> Option<usize> {
        let span = heap_align(bytes.max(1))?;
        let base = self.next_base;
        self.next_base = self.next_base.checked_add(span)?;
        self.regions.insert(base, bytes);
        self.live_bytes += bytes;
        Some(base)
    }

    fn unmap(&mut self, addr: usize) -> bool {
        match self.regions.remove(&addr) {
            Some(bytes) => {
                self.live_bytes -= bytes;
                true
            }
            None => false,
        }
    }
}

/// Logical host heap with fault injection.
///
/// Clones share the same address space, so a test can keep a clone to steer
/// a heap that has been moved into a fallback allocator.
#[derive(Debug, Clone)]
pub struct SimulatedHeap {
    state: Rc<RefCell<HeapState>>,
}

impl SimulatedHeap {
    /// Creates an unbounded heap.
    #[must_use]
    pub fn new() -> Self {
        Self {
            state: Rc::new(RefCell::new(HeapState {
                regions: HashMap::new(),
                next_base: HEAP_BASE,
                live_bytes: 0,
                limit: None,
                fail_next: 0,
                stats: HeapStats::default(),
            })),
        }
    }

    /// Creates a heap refusing requests that would exceed `limit` live bytes.
    #[must_use]
    pub fn with_limit(limit: usize) -> Self {
        let heap = Self::new();
        heap.set_limit(Some(limit));
        heap
    }

    pub fn set_limit(&self, limit: Option<usize>) {
        self.state.borrow_mut().limit = limit;
    }

    /// Refuses the next `count` allocation requests regardless of the limit.
    pub fn fail_next(&self, count: usize) {
        self.state.borrow_mut().fail_next = count;
    }

    /// Returns true if `addr` is the base of a live region.
    #[must_use]
    pub fn owns(&self, addr: usize) -> bool {
        self.state.borrow().regions.contains_key(&addr)
    }

    #[must_use]
    pub fn stats(&self) -> HeapStats {
        let state = self.state.borrow();
        HeapStats {
            live_regions: state.regions.len(),
            live_bytes: state.live_bytes,
            ..state.stats
        }
    }
}

impl Default for SimulatedHeap {
    fn default() -> Self {
        Self::new()
    }
}

impl HostHeap for SimulatedHeap {
    fn malloc(&mut self, bytes: usize) -> Option<usize> {
        let mut state = self.state.borrow_mut();
        state.stats.malloc_calls += 1;
        if !state.admit(bytes) {
            return None;
        }
        state.map(bytes)
    }

    fn realloc(&mut self, addr: usize, old_bytes: usize, new_bytes: usize) -> Option<usize> {
        let mut state = self.state.borrow_mut();
        state.stats.realloc_calls += 1;
        let current = state.regions.get(&addr).copied().unwrap_or(old_bytes);
        if !state.admit(new_bytes.saturating_sub(current)) {
            return None;
        }
        // Refuse unmappable sizes while the old region is still live.
        heap_align(new_bytes.max(1))?;
        state.unmap(addr);
        state.map(new_bytes)
    }

    fn free(&mut self, addr: usize, _bytes: usize) {
        let mut state = self.state.borrow_mut();
        state.stats.free_calls += 1;
        state.unmap(addr);
    }
}
