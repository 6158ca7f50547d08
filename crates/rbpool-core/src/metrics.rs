//! Allocator counters.
//!
//! Plain integers rather than atomics: every allocator in this crate is
//! single-threaded. Snapshots are `serde`-serializable for harness reports.

use serde::Serialize;

use crate::alloc::size_class::{NUM_SIZE_CLASSES, class_size};

/// Counters kept by the fallback allocator.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct FallbackStats {
    /// Every call into the fallback allocator (allocate, try, realloc, free).
    pub calls: u64,
    /// Host requests that succeeded.
    pub host_allocations: u64,
    /// Host requests that were refused.
    pub host_refusals: u64,
    pub host_frees: u64,
    pub host_reallocations: u64,
    pub oom_handler_invocations: u64,
    /// Bytes obtained from the host, cumulative.
    pub bytes_requested: u64,
}

/// Per-class block accounting.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ClassStats {
    pub block_size: usize,
    /// Blocks currently handed out to callers.
    pub live_blocks: usize,
    /// Blocks currently on the free list.
    pub free_blocks: usize,
}

/// Point-in-time snapshot of pool counters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PoolStats {
    /// Pooled allocations served straight from a free list.
    pub free_list_hits: u64,
    /// Free-list refills (each one a `chunk_alloc` call).
    pub refills: u64,
    /// Arena growths requested from the fallback allocator.
    pub chunk_grows: u64,
    /// Arena leftovers pushed onto a free list before growing.
    pub fragments_recycled: u64,
    /// Larger free blocks repurposed as arena after a host refusal.
    pub larger_block_reclaims: u64,
    /// Growths that went through the handler-retry path.
    pub last_resort_requests: u64,
    pub oversized_allocations: u64,
    pub oversized_frees: u64,
    pub pooled_allocations: u64,
    pub pooled_frees: u64,
    /// Frees rejected because the block was already free.
    pub double_frees_ignored: u64,
    /// Frees rejected because the address is not a pooled block.
    pub unknown_frees_ignored: u64,
    /// Cumulative bytes obtained for the arena.
    pub heap_size: usize,
    /// Bytes left in the current arena.
    pub arena_remaining: usize,
    pub classes: Vec<ClassStats>,
    pub fallback: FallbackStats,
}

impl PoolStats {
    pub(crate) fn empty() -> Self {
        Self {
            free_list_hits: 0,
            refills: 0,
            chunk_grows: 0,
            fragments_recycled: 0,
            larger_block_reclaims: 0,
            last_resort_requests: 0,
            oversized_allocations: 0,
            oversized_frees: 0,
            pooled_allocations: 0,
            pooled_frees: 0,
            double_frees_ignored: 0,
            unknown_frees_ignored: 0,
            heap_size: 0,
            arena_remaining: 0,
            classes: (0..NUM_SIZE_CLASSES)
                .map(|i| ClassStats {
                    block_size: class_size(i),
                    ..ClassStats::default()
                })
                .collect(),
            fallback: FallbackStats::default(),
        }
    }

    /// Live pooled blocks across all classes.
    #[must_use]
    pub fn live_blocks(&self) -> usize {
        self.classes.iter().map(|c| c.live_blocks).sum()
    }

    /// Free pooled blocks across all classes.
    #[must_use]
    pub fn free_blocks(&self) -> usize {
        self.classes.iter().map(|c| c.free_blocks).sum()
    }

    /// Bytes held by pooled blocks (live or free) plus the arena remainder.
    /// Always equals `heap_size`: the pool never drops bytes.
    #[must_use]
    pub fn accounted_bytes(&self) -> usize {
        self.classes
            .iter()
            .map(|c| (c.live_blocks + c.free_blocks) * c.block_size)
            .sum::<usize>()
            + self.arena_remaining
    }
}
