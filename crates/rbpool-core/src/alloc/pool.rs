//! Segregated-free-list pool allocator.
//!
//! Small requests are rounded up to a size class and served from that class's
//! free list. Empty lists are refilled in batches carved from a bump arena,
//! and the arena itself grows in chunks obtained from the fallback allocator.
//! Oversized requests bypass the pool.
//!
//! A pooled block is either free (linked into its class list) or live (owned
//! by a caller). That state is kept explicitly per block address in
//! [`Slot`], which stands in for the link word a C allocator would write into
//! the freed block itself.

use std::collections::HashMap;

use crate::config::PoolConfig;
use crate::error::AllocError;
use crate::log::{Event, LifecycleLog, LogLevel, LogRecord};
use crate::metrics::PoolStats;

use super::fallback::{FallbackAllocator, OomHandler};
use super::heap::{HostHeap, SimulatedHeap};
use super::size_class::{NUM_SIZE_CLASSES, class_index, class_size, is_oversized, round_up};

/// State of one pooled block.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Slot {
    /// On the free list of `class`; `next` is the following free block.
    Free { class: usize, next: Option<usize> },
    /// Handed out to a caller.
    Live { class: usize },
}

/// Size-classed pool allocator.
#[derive(Debug)]
pub struct PoolAllocator {
    /// Head of each class's free list.
    free_lists: [Option<usize>; NUM_SIZE_CLASSES],
    /// Every pooled block carved so far, keyed by address.
    slots: HashMap<usize, Slot>,
    /// Bump arena `[start_free, end_free)`.
    start_free: usize,
    end_free: usize,
    /// Cumulative bytes obtained for the arena.
    heap_size: usize,
    refill_batch: usize,
    fallback: FallbackAllocator,
    log: LifecycleLog,
    stats: PoolStats,
}

impl PoolAllocator {
    /// Creates a pool over `heap`.
    pub fn new(heap: impl HostHeap + 'static, config: PoolConfig) -> Self {
        Self {
            free_lists: [None; NUM_SIZE_CLASSES],
            slots: HashMap::new(),
            start_free: 0,
            end_free: 0,
            heap_size: 0,
            refill_batch: config.refill_batch.max(1),
            fallback: FallbackAllocator::new(heap, &config),
            log: LifecycleLog::new("pool", config.log_level),
            stats: PoolStats::empty(),
        }
    }

    /// Allocates `n` bytes and returns the block address.
    ///
    /// Zero-byte requests receive a block of the smallest class.
    pub fn allocate(&mut self, n: usize) -> Result<usize, AllocError> {
        if is_oversized(n) {
            self.stats.oversized_allocations += 1;
            self.log.record(
                Event::new(LogLevel::Trace, "allocate", "alloc")
                    .size(n)
                    .class(NUM_SIZE_CLASSES),
                || "path=oversized",
            );
            return self.fallback.allocate(n);
        }

        let class = class_index(n);
        if let Some(addr) = self.pop_free(class) {
            self.stats.pooled_allocations += 1;
            self.stats.free_list_hits += 1;
            self.log.record(
                Event::new(LogLevel::Trace, "allocate", "alloc")
                    .addr(addr)
                    .size(n)
                    .class(class),
                || "path=free_list_hit",
            );
            return Ok(addr);
        }

        let addr = self.refill(class_size(class))?;
        self.stats.pooled_allocations += 1;
        self.log.record(
            Event::new(LogLevel::Trace, "allocate", "alloc")
                .addr(addr)
                .size(n)
                .class(class),
            || "path=refill",
        );
        Ok(addr)
    }

    /// Returns a block obtained from [`Self::allocate`] with the same `n`.
    ///
    /// Oversized blocks go straight back to the fallback allocator. Pooled
    /// blocks are pushed onto their class list; no coalescing happens. Frees
    /// of already-free or unknown addresses are logged and ignored.
    pub fn deallocate(&mut self, addr: usize, n: usize) {
        if is_oversized(n) {
            self.stats.oversized_frees += 1;
            self.fallback.deallocate(addr, n);
            return;
        }

        let requested_class = class_index(n);
        match self.slots.get(&addr).copied() {
            Some(Slot::Live { class }) => {
                if class != requested_class {
                    self.log.record(
                        Event::new(LogLevel::Warn, "deallocate", "class_mismatch")
                            .addr(addr)
                            .size(n)
                            .class(class)
                            .outcome("healed"),
                        || format!("requested_class={requested_class} recorded_class={class}"),
                    );
                }
                self.stats.classes[class].live_blocks -= 1;
                self.stats.pooled_frees += 1;
                self.push_free(class, addr);
                self.log.record(
                    Event::new(LogLevel::Trace, "deallocate", "free")
                        .addr(addr)
                        .size(n)
                        .class(class),
                    String::new,
                );
            }
            Some(Slot::Free { class, .. }) => {
                self.stats.double_frees_ignored += 1;
                self.log.record(
                    Event::new(LogLevel::Warn, "deallocate", "double_free_detected")
                        .addr(addr)
                        .size(n)
                        .class(class)
                        .outcome("ignored"),
                    || "block_already_on_free_list",
                );
            }
            None => {
                self.stats.unknown_frees_ignored += 1;
                self.log.record(
                    Event::new(LogLevel::Warn, "deallocate", "unknown_free_pointer")
                        .addr(addr)
                        .size(n)
                        .outcome("ignored"),
                    || "address_not_carved_by_pool",
                );
            }
        }
    }

    /// Resizes a block from `old_n` to `new_n` bytes.
    ///
    /// Oversized-to-oversized moves are delegated to the fallback allocator.
    /// A resize within one size class returns `addr` unchanged. Anything
    /// else allocates the new size and frees the old block.
    pub fn reallocate(&mut self, addr: usize, old_n: usize, new_n: usize) -> Result<usize, AllocError> {
        if is_oversized(old_n) && is_oversized(new_n) {
            return self.fallback.reallocate(addr, old_n, new_n);
        }
        if !is_oversized(old_n) && !is_oversized(new_n) && class_index(old_n) == class_index(new_n) {
            return Ok(addr);
        }
        let moved = self.allocate(new_n)?;
        self.deallocate(addr, old_n);
        Ok(moved)
    }

    /// Installs an out-of-memory handler on the fallback allocator and
    /// returns the previous one.
    ///
    /// The handler runs while the pool is borrowed; it must not call back
    /// into the same pool.
    pub fn set_oom_handler(&mut self, handler: Option<OomHandler>) -> Option<OomHandler> {
        self.fallback.set_oom_handler(handler)
    }

    #[must_use]
    pub fn fallback(&self) -> &FallbackAllocator {
        &self.fallback
    }

    pub fn fallback_mut(&mut self) -> &mut FallbackAllocator {
        &mut self.fallback
    }

    /// Snapshot of pool and fallback counters.
    #[must_use]
    pub fn stats(&self) -> PoolStats {
        let mut stats = self.stats.clone();
        stats.heap_size = self.heap_size;
        stats.arena_remaining = self.arena_remaining();
        stats.fallback = self.fallback.stats();
        stats
    }

    #[must_use]
    pub fn logs(&self) -> &[LogRecord] {
        self.log.records()
    }

    /// Drains pool records followed by fallback records.
    pub fn drain_logs(&mut self) -> Vec<LogRecord> {
        let mut records = self.log.drain();
        records.extend(self.fallback.drain_logs());
        records
    }

    /// Bytes left in the bump arena.
    #[must_use]
    pub fn arena_remaining(&self) -> usize {
        self.end_free - self.start_free
    }

    /// Addresses on the free list of `class`, head first.
    #[must_use]
    pub fn free_list(&self, class: usize) -> Vec<usize> {
        let mut out = Vec::new();
        let mut cursor = self.free_lists.get(class).copied().flatten();
        while let Some(addr) = cursor {
            out.push(addr);
            cursor = match self.slots.get(&addr) {
                Some(Slot::Free { next, .. }) => *next,
                _ => None,
            };
        }
        out
    }

    /// Returns true if `addr` is a pooled block currently handed out.
    #[must_use]
    pub fn is_live(&self, addr: usize) -> bool {
        matches!(self.slots.get(&addr), Some(Slot::Live { .. }))
    }

    /// Verifies that every free list holds only free blocks of its own class
    /// and that per-class counters match the slot table.
    pub fn check_free_lists(&self) -> Result<(), String> {
        for class in 0..NUM_SIZE_CLASSES {
            let mut len = 0;
            let mut cursor = self.free_lists[class];
            while let Some(addr) = cursor {
                match self.slots.get(&addr) {
                    Some(Slot::Free { class: c, next }) if *c == class => cursor = *next,
                    other => return Err(format!("class {class}: block {addr:#x} is {other:?}")),
                }
                len += 1;
                if len > self.slots.len() {
                    return Err(format!("class {class}: free list cycles"));
                }
            }
            let counted = self.stats.classes[class].free_blocks;
            if len != counted {
                return Err(format!("class {class}: list holds {len} blocks, counter says {counted}"));
            }
        }
        let live = self.slots.values().filter(|s| matches!(s, Slot::Live { .. })).count();
        let counted: usize = self.stats.classes.iter().map(|c| c.live_blocks).sum();
        if live != counted {
            return Err(format!("{live} live slots, counters say {counted}"));
        }
        Ok(())
    }

    fn pop_free(&mut self, class: usize) -> Option<usize> {
        let head = self.free_lists[class]?;
        let next = match self.slots.get(&head) {
            Some(Slot::Free { next, .. }) => *next,
            _ => None,
        };
        self.free_lists[class] = next;
        self.slots.insert(head, Slot::Live { class });
        self.stats.classes[class].free_blocks -= 1;
        self.stats.classes[class].live_blocks += 1;
        Some(head)
    }

    fn push_free(&mut self, class: usize, addr: usize) {
        let next = self.free_lists[class];
        self.slots.insert(addr, Slot::Free { class, next });
        self.free_lists[class] = Some(addr);
        self.stats.classes[class].free_blocks += 1;
    }

    /// Refills the free list for blocks of `size` bytes (already rounded) and
    /// returns one block to the caller.
    fn refill(&mut self, size: usize) -> Result<usize, AllocError> {
        let class = class_index(size);
        let (chunk, nobjs) = self.chunk_alloc(size, self.refill_batch)?;
        self.stats.refills += 1;
        self.slots.insert(chunk, Slot::Live { class });
        self.stats.classes[class].live_blocks += 1;
        self.log.record(
            Event::new(LogLevel::Debug, "refill", "refill")
                .addr(chunk)
                .size(size)
                .class(class),
            || format!("nobjs={nobjs}"),
        );
        if nobjs == 1 {
            return Ok(chunk);
        }
        // Push back to front so the list runs in address order.
        for i in (1..nobjs).rev() {
            self.push_free(class, chunk + i * size);
        }
        Ok(chunk)
    }

    /// Carves up to `nobjs` contiguous blocks of `size` bytes from the arena,
    /// growing it when empty. Returns the first address and the number of
    /// blocks actually carved (at least one).
    ///
    /// A batch whose byte size, or whose growth request, does not fit in
    /// `usize` fails with [`AllocError::SizeOverflow`] before any state changes.
    fn chunk_alloc(&mut self, size: usize, nobjs: usize) -> Result<(usize, usize), AllocError> {
        let mut nobjs = nobjs;
        loop {
            let overflow = AllocError::SizeOverflow {
                count: nobjs,
                elem_size: size,
            };
            let total_bytes = size.checked_mul(nobjs).ok_or(overflow)?;
            let bytes_left = self.arena_remaining();

            if bytes_left >= total_bytes {
                let result = self.start_free;
                self.start_free += total_bytes;
                return Ok((result, nobjs));
            }

            if bytes_left >= size {
                nobjs = bytes_left / size;
                let result = self.start_free;
                self.start_free += size * nobjs;
                self.log.record(
                    Event::new(LogLevel::Debug, "chunk_alloc", "partial_batch")
                        .addr(result)
                        .size(size)
                        .outcome("degraded"),
                    || format!("nobjs={nobjs} bytes_left={bytes_left}"),
                );
                return Ok((result, nobjs));
            }

            let bytes_to_get = total_bytes
                .checked_mul(2)
                .and_then(|doubled| doubled.checked_add(round_up(self.heap_size >> 4)))
                .ok_or(overflow)?;

            if bytes_left > 0 {
                self.recycle_fragment(bytes_left);
            }

            let (addr, granted) = match self.fallback.try_allocate(bytes_to_get) {
                Some(addr) => (addr, bytes_to_get),
                None => match self.reclaim_larger_block(size) {
                    Some((addr, block_size)) => {
                        self.start_free = addr;
                        self.end_free = addr + block_size;
                        continue;
                    }
                    None => {
                        self.stats.last_resort_requests += 1;
                        self.log.record(
                            Event::new(LogLevel::Warn, "chunk_alloc", "last_resort_request")
                                .size(bytes_to_get)
                                .outcome("retry"),
                            || "no_larger_free_block",
                        );
                        (self.fallback.allocate(bytes_to_get)?, bytes_to_get)
                    }
                },
            };

            self.stats.chunk_grows += 1;
            self.heap_size += granted;
            self.start_free = addr;
            self.end_free = addr + granted;
            self.log.record(
                Event::new(LogLevel::Info, "chunk_alloc", "chunk_grow")
                    .addr(addr)
                    .size(granted),
                || format!("heap_size={}", self.heap_size),
            );
        }
    }

    /// Pushes the arena remainder onto the free list it exactly matches.
    fn recycle_fragment(&mut self, bytes_left: usize) {
        let class = class_index(bytes_left);
        let addr = self.start_free;
        debug_assert_eq!(class_size(class), bytes_left);
        self.push_free(class, addr);
        self.start_free = self.end_free;
        self.stats.fragments_recycled += 1;
        self.log.record(
            Event::new(LogLevel::Debug, "chunk_alloc", "fragment_recycled")
                .addr(addr)
                .size(bytes_left)
                .class(class),
            String::new,
        );
    }

    /// Takes the first free block from a class larger than `size`, smallest
    /// class first, and forgets it as a block so it can serve as arena.
    fn reclaim_larger_block(&mut self, size: usize) -> Option<(usize, usize)> {
        for class in class_index(size) + 1..NUM_SIZE_CLASSES {
            let Some(addr) = self.pop_free(class) else {
                continue;
            };
            self.slots.remove(&addr);
            self.stats.classes[class].live_blocks -= 1;
            self.stats.larger_block_reclaims += 1;
            self.log.record(
                Event::new(LogLevel::Warn, "chunk_alloc", "reclaim_larger_block")
                    .addr(addr)
                    .size(class_size(class))
                    .class(class)
                    .outcome("reclaimed"),
                || format!("requested_size={size}"),
            );
            return Some((addr, class_size(class)));
        }
        None
    }
}

impl Default for PoolAllocator {
    fn default() -> Self {
        Self::new(SimulatedHeap::new(), crate::config::global_config())
    }
}

/// Block size actually reserved for a request of `n` bytes, or `n` itself
/// for oversized requests.
#[must_use]
pub fn reserved_size(n: usize) -> usize {
    if is_oversized(n) {
        n
    } else {
        class_size(class_index(n))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::alloc::size_class::MAX_BYTES;
    use crate::config::OomPolicy;

    fn pool_over(heap: &SimulatedHeap) -> PoolAllocator {
        let config = PoolConfig::default()
            .with_oom_policy(OomPolicy::Error)
            .with_log_level(Some(LogLevel::Trace));
        PoolAllocator::new(heap.clone(), config)
    }

    #[test]
    fn first_allocation_refills_batch() {
        let heap = SimulatedHeap::new();
        let mut pool = pool_over(&heap);
        let addr = pool.allocate(10).unwrap();
        assert!(pool.is_live(addr));

        let stats = pool.stats();
        assert_eq!(stats.refills, 1);
        assert_eq!(stats.chunk_grows, 1);
        // 2 x (16 x 20) bytes obtained, first half carved into 20 blocks.
        assert_eq!(stats.heap_size, 640);
        assert_eq!(stats.classes[1].live_blocks, 1);
        assert_eq!(stats.classes[1].free_blocks, 19);
        assert_eq!(stats.arena_remaining, 320);
        assert_eq!(stats.fallback.host_allocations, 1);
        pool.check_free_lists().unwrap();
    }

    #[test]
    fn free_list_runs_in_address_order() {
        let heap = SimulatedHeap::new();
        let mut pool = pool_over(&heap);
        let first = pool.allocate(8).unwrap();
        let list = pool.free_list(0);
        assert_eq!(list.len(), 19);
        for (i, addr) in list.iter().enumerate() {
            assert_eq!(*addr, first + (i + 1) * 8);
        }
    }

    #[test]
    fn freed_block_is_reused_lifo() {
        let heap = SimulatedHeap::new();
        let mut pool = pool_over(&heap);
        let a = pool.allocate(24).unwrap();
        let _b = pool.allocate(24).unwrap();
        pool.deallocate(a, 24);
        assert_eq!(pool.free_list(2)[0], a);
        assert_eq!(pool.allocate(17).unwrap(), a);
        assert_eq!(pool.stats().free_list_hits, 2);
    }

    #[test]
    fn oversized_requests_bypass_pool() {
        let heap = SimulatedHeap::new();
        let mut pool = pool_over(&heap);
        let addr = pool.allocate(MAX_BYTES + 1).unwrap();
        assert!(heap.owns(addr));
        assert!(!pool.is_live(addr));
        let stats = pool.stats();
        assert_eq!(stats.oversized_allocations, 1);
        assert_eq!(stats.refills, 0);
        assert_eq!(stats.heap_size, 0);

        pool.deallocate(addr, MAX_BYTES + 1);
        assert!(!heap.owns(addr));
        assert_eq!(pool.stats().oversized_frees, 1);
    }

    #[test]
    fn partial_batch_when_arena_runs_low() {
        let heap = SimulatedHeap::new();
        let mut pool = pool_over(&heap);
        // Class 128: grows by 2 x 128 x 20 = 5120, keeps 2560 after the first batch.
        let _ = pool.allocate(128).unwrap();
        assert_eq!(pool.arena_remaining(), 2560);
        // A 120-byte refill wants 2400 bytes, fits.
        let _ = pool.allocate(120).unwrap();
        assert_eq!(pool.arena_remaining(), 160);
        // A 64-byte refill wants 1280 but only two blocks fit.
        let _ = pool.allocate(64).unwrap();
        let stats = pool.stats();
        assert_eq!(stats.classes[7].live_blocks, 1);
        assert_eq!(stats.classes[7].free_blocks, 1);
        assert_eq!(stats.arena_remaining, 32);
        assert_eq!(stats.chunk_grows, 1);
        assert!(pool.logs().iter().any(|r| r.event == "partial_batch"));
    }

    #[test]
    fn leftover_fragment_is_recycled_before_growth() {
        let heap = SimulatedHeap::new();
        let mut pool = pool_over(&heap);
        let _ = pool.allocate(128).unwrap();
        let _ = pool.allocate(120).unwrap();
        let _ = pool.allocate(64).unwrap();
        assert_eq!(pool.arena_remaining(), 32);
        // A 40-byte refill cannot carve even one block from 32 bytes.
        let _ = pool.allocate(40).unwrap();
        let stats = pool.stats();
        assert_eq!(stats.fragments_recycled, 1);
        assert_eq!(stats.classes[3].free_blocks, 1);
        assert_eq!(stats.chunk_grows, 2);
        // 2 x 800 + round_up(5120 / 16) = 1920
        assert_eq!(stats.heap_size, 5120 + 1920);
        assert_eq!(stats.accounted_bytes(), stats.heap_size);
        pool.check_free_lists().unwrap();
    }

    #[test]
    fn host_refusal_reclaims_larger_free_block() {
        let heap = SimulatedHeap::new();
        let mut pool = pool_over(&heap);
        let big = pool.allocate(96).unwrap();
        pool.deallocate(big, 96);
        // Use up the arena: 1920 bytes left, a 128-byte refill takes 15 blocks.
        let _ = pool.allocate(128).unwrap();
        assert_eq!(pool.arena_remaining(), 0);
        let before = pool.stats();
        heap.fail_next(1);
        let small = pool.allocate(8).unwrap();
        let after = pool.stats();
        assert_eq!(after.larger_block_reclaims, 1);
        assert_eq!(after.chunk_grows, before.chunk_grows);
        assert_eq!(after.heap_size, before.heap_size);
        assert_eq!(after.accounted_bytes(), after.heap_size);
        assert!(pool.is_live(small));
        pool.check_free_lists().unwrap();
    }

    #[test]
    fn host_refusal_without_larger_block_takes_last_resort_path() {
        let heap = SimulatedHeap::new();
        let mut pool = pool_over(&heap);
        heap.fail_next(1);
        let addr = pool.allocate(8).unwrap();
        let stats = pool.stats();
        assert!(pool.is_live(addr));
        assert_eq!(stats.last_resort_requests, 1);
        assert_eq!(stats.chunk_grows, 1);
        assert_eq!(stats.fallback.host_refusals, 1);
    }

    #[test]
    fn exhaustion_surfaces_error_under_error_policy() {
        let heap = SimulatedHeap::with_limit(0);
        let mut pool = pool_over(&heap);
        assert_eq!(pool.allocate(8), Err(AllocError::OutOfMemory { requested: 320 }));
        let stats = pool.stats();
        assert_eq!(stats.pooled_allocations, 0);
        assert_eq!(stats.live_blocks(), 0);
    }

    #[test]
    fn oom_handler_rescues_growth() {
        let heap = SimulatedHeap::with_limit(0);
        let mut pool = pool_over(&heap);
        let control = heap.clone();
        pool.set_oom_handler(Some(Box::new(move || control.set_limit(None))));
        assert!(pool.allocate(8).is_ok());
        assert_eq!(pool.stats().fallback.oom_handler_invocations, 1);
    }

    #[test]
    fn double_free_is_ignored() {
        let heap = SimulatedHeap::new();
        let mut pool = pool_over(&heap);
        let a = pool.allocate(32).unwrap();
        pool.deallocate(a, 32);
        pool.deallocate(a, 32);
        let stats = pool.stats();
        assert_eq!(stats.double_frees_ignored, 1);
        assert_eq!(stats.classes[3].free_blocks, 20);
        assert!(pool.logs().iter().any(|r| r.event == "double_free_detected"));
        pool.check_free_lists().unwrap();
    }

    #[test]
    fn unknown_free_is_ignored() {
        let heap = SimulatedHeap::new();
        let mut pool = pool_over(&heap);
        pool.deallocate(0xDEAD_0, 16);
        assert_eq!(pool.stats().unknown_frees_ignored, 1);
        pool.check_free_lists().unwrap();
    }

    #[test]
    fn mismatched_size_frees_into_recorded_class() {
        let heap = SimulatedHeap::new();
        let mut pool = pool_over(&heap);
        let a = pool.allocate(16).unwrap();
        pool.deallocate(a, 64);
        assert_eq!(pool.free_list(1)[0], a);
        assert!(pool.free_list(7).is_empty());
        pool.check_free_lists().unwrap();
    }

    #[test]
    fn reallocate_within_class_keeps_address() {
        let heap = SimulatedHeap::new();
        let mut pool = pool_over(&heap);
        let a = pool.allocate(17).unwrap();
        assert_eq!(pool.reallocate(a, 17, 24).unwrap(), a);
    }

    #[test]
    fn reallocate_across_classes_moves() {
        let heap = SimulatedHeap::new();
        let mut pool = pool_over(&heap);
        let a = pool.allocate(16).unwrap();
        let b = pool.reallocate(a, 16, 100).unwrap();
        assert_ne!(a, b);
        assert!(!pool.is_live(a));
        assert!(pool.is_live(b));
        let c = pool.reallocate(b, 100, 4096).unwrap();
        assert!(heap.owns(c));
        let d = pool.reallocate(c, 4096, 8192).unwrap();
        assert!(heap.owns(d));
        assert!(!heap.owns(c));
    }

    #[test]
    fn oversized_batch_fails_without_touching_state() {
        let heap = SimulatedHeap::new();
        let config = PoolConfig::default()
            .with_oom_policy(OomPolicy::Error)
            .with_refill_batch(usize::MAX / 8);
        let mut pool = PoolAllocator::new(heap.clone(), config);

        assert_eq!(
            pool.allocate(16),
            Err(AllocError::SizeOverflow {
                count: usize::MAX / 8,
                elem_size: 16,
            })
        );
        let stats = pool.stats();
        assert_eq!(stats.refills, 0);
        assert_eq!(stats.heap_size, 0);
        assert_eq!(stats.pooled_allocations, 0);
        assert_eq!(heap.stats().malloc_calls, 0);
        pool.check_free_lists().unwrap();
    }

    #[test]
    fn growth_request_overflow_is_reported() {
        // 16 * batch is half the address space; doubling it overflows.
        let batch = (usize::MAX >> 5) + 1;
        let heap = SimulatedHeap::new();
        let config = PoolConfig::default()
            .with_oom_policy(OomPolicy::Error)
            .with_refill_batch(batch);
        let mut pool = PoolAllocator::new(heap.clone(), config);

        assert_eq!(
            pool.allocate(9),
            Err(AllocError::SizeOverflow {
                count: batch,
                elem_size: 16,
            })
        );
        assert_eq!(pool.arena_remaining(), 0);
        assert_eq!(heap.stats().malloc_calls, 0);
    }

    #[test]
    fn reserved_size_matches_classes() {
        assert_eq!(reserved_size(0), 8);
        assert_eq!(reserved_size(9), 16);
        assert_eq!(reserved_size(4096), 4096);
    }
}
