//! Integration test: pool allocator accounting
//!
//! Drives the pool through its public surface and checks that block
//! bookkeeping stays consistent: free lists hold only blocks of their own
//! class, oversized requests never touch the arena, and every byte obtained
//! for the arena is either live, free, or still in the bump region.
//!
//! Run: cargo test -p rbpool-core --test pool_accounting_test

use std::cell::Cell;
use std::collections::HashSet;
use std::rc::Rc;

use rbpool_core::alloc::size_class::{MAX_BYTES, NUM_SIZE_CLASSES, class_index, class_size};
use rbpool_core::log::LogLevel;
use rbpool_core::{AllocError, OomPolicy, PoolAllocator, PoolConfig, SimulatedHeap};

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

struct XorShift64(u64);

impl XorShift64 {
    fn next(&mut self) -> u64 {
        let mut x = self.0;
        x ^= x >> 12;
        x ^= x << 25;
        x ^= x >> 27;
        self.0 = x;
        x.wrapping_mul(0x2545_F491_4F6C_DD1D)
    }

    fn below(&mut self, n: usize) -> usize {
        (self.next() % n as u64) as usize
    }
}

fn surfacing() -> PoolConfig {
    PoolConfig::default()
        .with_oom_policy(OomPolicy::Error)
        .with_log_level(Some(LogLevel::Trace))
}

fn pool_with_heap() -> (PoolAllocator, SimulatedHeap) {
    let heap = SimulatedHeap::new();
    (PoolAllocator::new(heap.clone(), surfacing()), heap)
}

// ---------------------------------------------------------------------------
// 1. Size classes
// ---------------------------------------------------------------------------

#[test]
fn requests_in_one_class_share_blocks() {
    let (mut pool, _heap) = pool_with_heap();
    let a = pool.allocate(20).unwrap();
    pool.deallocate(a, 20);
    // 17 and 20 both round to 24.
    let b = pool.allocate(17).unwrap();
    assert_eq!(a, b);
    assert!(pool.is_live(b));
}

#[test]
fn free_lists_hold_only_their_own_class() {
    let (mut pool, _heap) = pool_with_heap();
    let mut rng = XorShift64(0x5EED);
    let mut held = Vec::new();
    for _ in 0..2_000 {
        if held.is_empty() || rng.below(3) != 0 {
            let n = rng.below(MAX_BYTES + 1);
            held.push((pool.allocate(n).unwrap(), n));
        } else {
            let (addr, n) = held.swap_remove(rng.below(held.len()));
            pool.deallocate(addr, n);
        }
    }
    for (addr, n) in held.drain(..) {
        pool.deallocate(addr, n);
    }

    pool.check_free_lists().unwrap();
    let mut seen = HashSet::new();
    for class in 0..NUM_SIZE_CLASSES {
        for addr in pool.free_list(class) {
            assert!(seen.insert(addr), "block {addr:#x} is on two free lists");
            assert_eq!(addr % 8, 0);
        }
    }

    let stats = pool.stats();
    assert_eq!(stats.live_blocks(), 0);
    assert_eq!(stats.accounted_bytes(), stats.heap_size);
    for (class, counters) in stats.classes.iter().enumerate() {
        assert_eq!(counters.block_size, class_size(class));
    }
}

#[test]
fn zero_byte_requests_use_the_smallest_class() {
    let (mut pool, _heap) = pool_with_heap();
    let a = pool.allocate(0).unwrap();
    pool.deallocate(a, 0);
    assert_eq!(pool.free_list(class_index(0)).first(), Some(&a));
    assert_eq!(class_index(0), 0);
}

// ---------------------------------------------------------------------------
// 2. Oversized requests
// ---------------------------------------------------------------------------

#[test]
fn oversized_requests_bypass_the_arena() {
    let (mut pool, heap) = pool_with_heap();
    let big = pool.allocate(MAX_BYTES + 1).unwrap();
    assert!(heap.owns(big));
    assert!(!pool.is_live(big));

    let stats = pool.stats();
    assert_eq!(stats.heap_size, 0);
    assert_eq!(stats.refills, 0);
    assert_eq!(stats.oversized_allocations, 1);

    pool.deallocate(big, MAX_BYTES + 1);
    assert!(!heap.owns(big));
    assert_eq!(pool.stats().oversized_frees, 1);
}

#[test]
fn oversized_reallocate_goes_to_host() {
    let (mut pool, heap) = pool_with_heap();
    let big = pool.allocate(4096).unwrap();
    let moved = pool.reallocate(big, 4096, 8192).unwrap();
    assert!(heap.owns(moved));
    assert_eq!(pool.stats().fallback.host_reallocations, 1);
    pool.deallocate(moved, 8192);
    assert_eq!(heap.stats().live_regions, 0);
}

// ---------------------------------------------------------------------------
// 3. Refill and growth
// ---------------------------------------------------------------------------

#[test]
fn steady_state_churn_stops_calling_the_host() {
    let (mut pool, _heap) = pool_with_heap();
    for _ in 0..1_000 {
        let a = pool.allocate(8).unwrap();
        pool.deallocate(a, 8);
    }
    let stats = pool.stats();
    assert_eq!(stats.fallback.host_allocations, 1);
    assert_eq!(stats.refills, 1);
    assert_eq!(stats.free_list_hits, 999);
}

#[test]
fn reallocating_more_than_a_batch_reuses_freed_blocks() {
    let (mut pool, heap) = pool_with_heap();
    let mut rng = XorShift64(0xB10C);
    let mut held: Vec<usize> = (0..137).map(|_| pool.allocate(24).unwrap()).collect();
    assert!(pool.stats().refills > 1);

    while !held.is_empty() {
        let addr = held.swap_remove(rng.below(held.len()));
        pool.deallocate(addr, 24);
    }
    assert!(pool.free_list(class_index(24)).len() >= 137);

    let host_calls = heap.stats().malloc_calls;
    let before = pool.stats();
    for _ in 0..137 {
        held.push(pool.allocate(24).unwrap());
    }
    let after = pool.stats();
    assert_eq!(heap.stats().malloc_calls, host_calls);
    assert_eq!(after.fallback.host_allocations, before.fallback.host_allocations);
    assert_eq!(after.refills, before.refills);
    assert_eq!(after.free_list_hits - before.free_list_hits, 137);

    let distinct: HashSet<usize> = held.iter().copied().collect();
    assert_eq!(distinct.len(), 137);
    pool.check_free_lists().unwrap();
}

#[test]
fn first_refill_grows_by_twice_the_batch() {
    let (mut pool, _heap) = pool_with_heap();
    pool.allocate(16).unwrap();
    let stats = pool.stats();
    // 20 blocks of 16 carved from a 2 * 320 byte chunk.
    assert_eq!(stats.heap_size, 640);
    assert_eq!(stats.arena_remaining, 320);
    assert_eq!(pool.free_list(class_index(16)).len(), 19);
}

#[test]
fn refill_batch_is_configurable() {
    let heap = SimulatedHeap::new();
    let mut pool = PoolAllocator::new(heap, surfacing().with_refill_batch(4));
    pool.allocate(32).unwrap();
    assert_eq!(pool.free_list(class_index(32)).len(), 3);
}

// ---------------------------------------------------------------------------
// 4. Bad frees
// ---------------------------------------------------------------------------

#[test]
fn double_free_is_ignored_and_logged() {
    let (mut pool, _heap) = pool_with_heap();
    let a = pool.allocate(40).unwrap();
    pool.deallocate(a, 40);
    pool.deallocate(a, 40);

    let occurrences = pool.free_list(class_index(40)).iter().filter(|&&x| x == a).count();
    assert_eq!(occurrences, 1);
    assert_eq!(pool.stats().double_frees_ignored, 1);
    assert!(pool.logs().iter().any(|r| r.event == "double_free_detected"));
    pool.check_free_lists().unwrap();
}

#[test]
fn unknown_free_is_ignored() {
    let (mut pool, _heap) = pool_with_heap();
    pool.deallocate(0xdead_0000, 16);
    assert_eq!(pool.stats().unknown_frees_ignored, 1);
    pool.check_free_lists().unwrap();
}

// ---------------------------------------------------------------------------
// 5. Exhaustion
// ---------------------------------------------------------------------------

#[test]
fn exhaustion_without_handler_surfaces_error() {
    let heap = SimulatedHeap::with_limit(0);
    let mut pool = PoolAllocator::new(heap, surfacing());
    let err = pool.allocate(8).unwrap_err();
    assert!(matches!(err, AllocError::OutOfMemory { .. }));
    assert_eq!(pool.stats().last_resort_requests, 1);
    assert!(pool.drain_logs().iter().any(|r| r.event == "oom_surfaced"));
}

#[test]
fn handler_is_retried_until_the_host_gives_in() {
    let heap = SimulatedHeap::new();
    let mut pool = PoolAllocator::new(heap.clone(), surfacing());
    let calls = Rc::new(Cell::new(0_u32));
    let seen = Rc::clone(&calls);
    pool.set_oom_handler(Some(Box::new(move || seen.set(seen.get() + 1))));

    // Growth attempt, last-resort attempt, then one retry after the first
    // handler call are refused.
    heap.fail_next(3);
    pool.allocate(24).unwrap();
    assert_eq!(calls.get(), 2);
    assert_eq!(pool.stats().fallback.oom_handler_invocations, 2);
}

#[test]
fn handler_can_release_host_memory() {
    let heap = SimulatedHeap::with_limit(0);
    let mut pool = PoolAllocator::new(heap.clone(), surfacing());
    let steer = heap.clone();
    pool.set_oom_handler(Some(Box::new(move || steer.set_limit(None))));

    let a = pool.allocate(64).unwrap();
    assert!(pool.is_live(a));
    assert_eq!(pool.stats().fallback.oom_handler_invocations, 1);
}

#[test]
fn refusal_reclaims_a_larger_free_block() {
    let (mut pool, heap) = pool_with_heap();
    let big = pool.allocate(128).unwrap();
    pool.deallocate(big, 128);
    // Drain the arena left by the 128-byte refill.
    while pool.arena_remaining() >= 128 {
        pool.allocate(128).unwrap();
    }
    let leftover = pool.arena_remaining();
    heap.set_limit(Some(heap.stats().live_bytes));

    let small = pool.allocate(8).unwrap();
    assert!(pool.is_live(small));
    let stats = pool.stats();
    assert_eq!(stats.larger_block_reclaims, 1);
    assert_eq!(stats.last_resort_requests, 0);
    assert!(leftover < 128);
}

// ---------------------------------------------------------------------------
// 6. Reporting
// ---------------------------------------------------------------------------

#[test]
fn stats_snapshot_serializes_to_json() {
    let (mut pool, _heap) = pool_with_heap();
    let a = pool.allocate(56).unwrap();
    let big = pool.allocate(512).unwrap();
    pool.deallocate(a, 56);
    pool.deallocate(big, 512);

    let report = serde_json::to_value(pool.stats()).unwrap();
    assert_eq!(report["refills"], 1);
    assert_eq!(report["oversized_allocations"], 1);
    assert_eq!(report["classes"].as_array().map(Vec::len), Some(NUM_SIZE_CLASSES));
    assert_eq!(report["classes"][class_index(56)]["free_blocks"], 20);
    assert_eq!(report["fallback"]["host_frees"], 1);

    let line = serde_json::to_string(&pool.drain_logs()).unwrap();
    assert!(line.contains("chunk_grow"));
}
