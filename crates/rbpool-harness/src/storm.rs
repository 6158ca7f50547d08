//! Deterministic allocation storms.
//!
//! Each storm drives a fresh pool with a seeded operation stream, frees
//! everything it still holds, then checks that the pool's books balance:
//! no live blocks, every free list consistent, and every byte obtained for
//! the arena accounted for.

use std::str::FromStr;

use serde::Serialize;

use rbpool_core::log::LogRecord;
use rbpool_core::metrics::PoolStats;
use rbpool_core::{PoolAllocator, PoolConfig, PoolHandle, RbSet, SimulatedHeap};

use crate::error::HarnessError;

#[derive(Clone, Copy, Debug)]
pub struct XorShift64 {
    state: u64,
}

impl XorShift64 {
    #[must_use]
    pub fn new(seed: u64) -> Self {
        Self { state: seed.max(1) }
    }

    pub fn next_u64(&mut self) -> u64 {
        let mut x = self.state;
        x ^= x >> 12;
        x ^= x << 25;
        x ^= x >> 27;
        self.state = x;
        x.wrapping_mul(0x2545_F491_4F6C_DD1D)
    }

    pub fn gen_range(&mut self, low: usize, high_inclusive: usize) -> usize {
        let span = high_inclusive - low + 1;
        low + (self.next_u64() % span as u64) as usize
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StormKind {
    /// Allocate a ramp of sizes, then free it all, repeatedly.
    Sawtooth,
    /// Random mix of allocations (including oversized) and frees.
    RandomChurn,
    /// Alternate between two distant size classes.
    SizeClassThrash,
    /// Build and clear trees with repeated keys.
    TreeChurn,
}

impl StormKind {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Sawtooth => "sawtooth",
            Self::RandomChurn => "random_churn",
            Self::SizeClassThrash => "size_class_thrash",
            Self::TreeChurn => "tree_churn",
        }
    }

    #[must_use]
    pub fn all() -> [Self; 4] {
        [Self::Sawtooth, Self::RandomChurn, Self::SizeClassThrash, Self::TreeChurn]
    }
}

impl FromStr for StormKind {
    type Err = HarnessError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::all()
            .into_iter()
            .find(|kind| kind.as_str() == s.trim().to_ascii_lowercase().replace('-', "_"))
            .ok_or_else(|| HarnessError::UnknownStorm(s.to_string()))
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct StormReport {
    pub storm: &'static str,
    pub seed: u64,
    pub ops: usize,
    pub allocations: usize,
    pub frees: usize,
    pub peak_live: usize,
    pub stats: PoolStats,
    #[serde(skip)]
    pub records: Vec<LogRecord>,
}

#[derive(Clone, Copy, Debug)]
struct Held {
    addr: usize,
    size: usize,
}

struct Tally {
    allocations: usize,
    frees: usize,
    peak_live: usize,
}

impl Tally {
    fn new() -> Self {
        Self {
            allocations: 0,
            frees: 0,
            peak_live: 0,
        }
    }

    fn alloc(&mut self, pool: &mut PoolAllocator, held: &mut Vec<Held>, size: usize) -> Result<(), HarnessError> {
        let addr = pool.allocate(size)?;
        held.push(Held { addr, size });
        self.allocations += 1;
        self.peak_live = self.peak_live.max(held.len());
        Ok(())
    }

    fn free(&mut self, pool: &mut PoolAllocator, block: Held) {
        pool.deallocate(block.addr, block.size);
        self.frees += 1;
    }
}

/// Runs `kind` for `ops` operations on a fresh pool seeded with `seed`.
pub fn run_storm(kind: StormKind, seed: u64, ops: usize, config: PoolConfig) -> Result<StormReport, HarnessError> {
    let mut rng = XorShift64::new(seed);
    let mut tally = Tally::new();

    let (stats, records) = if kind == StormKind::TreeChurn {
        let pool = PoolHandle::with_heap(SimulatedHeap::new(), config);
        tree_churn(&pool, &mut rng, ops, &mut tally)?;
        let records = pool.with(|p| -> Result<Vec<LogRecord>, HarnessError> {
            p.check_free_lists().map_err(|message| accounting(kind, message))?;
            Ok(p.drain_logs())
        })?;
        (pool.stats(), records)
    } else {
        let mut pool = PoolAllocator::new(SimulatedHeap::new(), config);
        let mut held = Vec::new();
        match kind {
            StormKind::Sawtooth => sawtooth(&mut pool, &mut held, ops, &mut tally)?,
            StormKind::RandomChurn => random_churn(&mut pool, &mut held, &mut rng, ops, &mut tally)?,
            StormKind::SizeClassThrash => size_class_thrash(&mut pool, &mut held, &mut rng, ops, &mut tally)?,
            StormKind::TreeChurn => {}
        }
        for block in held.drain(..) {
            tally.free(&mut pool, block);
        }
        pool.check_free_lists().map_err(|message| accounting(kind, message))?;
        (pool.stats(), pool.drain_logs())
    };

    verify_books(kind, &stats)?;
    Ok(StormReport {
        storm: kind.as_str(),
        seed,
        ops,
        allocations: tally.allocations,
        frees: tally.frees,
        peak_live: tally.peak_live,
        stats,
        records,
    })
}

fn accounting(kind: StormKind, message: String) -> HarnessError {
    HarnessError::Accounting {
        storm: kind.as_str(),
        message,
    }
}

fn verify_books(kind: StormKind, stats: &PoolStats) -> Result<(), HarnessError> {
    let fail = |message: String| accounting(kind, message);
    if stats.live_blocks() != 0 {
        return Err(fail(format!("{} pooled blocks still live", stats.live_blocks())));
    }
    if stats.accounted_bytes() != stats.heap_size {
        return Err(fail(format!(
            "accounted {} bytes of {} obtained",
            stats.accounted_bytes(),
            stats.heap_size
        )));
    }
    if stats.oversized_allocations != stats.oversized_frees {
        return Err(fail(format!(
            "{} oversized allocations, {} frees",
            stats.oversized_allocations, stats.oversized_frees
        )));
    }
    Ok(())
}

fn sawtooth(pool: &mut PoolAllocator, held: &mut Vec<Held>, ops: usize, tally: &mut Tally) -> Result<(), HarnessError> {
    let mut done = 0;
    while done < ops {
        let ramp = (ops - done).min(64);
        for i in 0..ramp {
            tally.alloc(pool, held, (i % 16 + 1) * 8)?;
        }
        done += ramp;
        while let Some(block) = held.pop() {
            tally.free(pool, block);
        }
    }
    Ok(())
}

fn random_churn(
    pool: &mut PoolAllocator,
    held: &mut Vec<Held>,
    rng: &mut XorShift64,
    ops: usize,
    tally: &mut Tally,
) -> Result<(), HarnessError> {
    for _ in 0..ops {
        if held.is_empty() || rng.gen_range(0, 99) < 60 {
            let size = if rng.gen_range(0, 9) == 0 {
                rng.gen_range(129, 4096)
            } else {
                rng.gen_range(0, 128)
            };
            tally.alloc(pool, held, size)?;
        } else {
            let victim = rng.gen_range(0, held.len() - 1);
            let block = held.swap_remove(victim);
            tally.free(pool, block);
        }
    }
    Ok(())
}

fn size_class_thrash(
    pool: &mut PoolAllocator,
    held: &mut Vec<Held>,
    rng: &mut XorShift64,
    ops: usize,
    tally: &mut Tally,
) -> Result<(), HarnessError> {
    for i in 0..ops {
        let size = if i % 2 == 0 { 8 } else { 120 };
        tally.alloc(pool, held, size)?;
        if held.len() > 32 {
            let victim = rng.gen_range(0, held.len() - 1);
            let block = held.swap_remove(victim);
            tally.free(pool, block);
        }
    }
    Ok(())
}

fn tree_churn(pool: &PoolHandle, rng: &mut XorShift64, ops: usize, tally: &mut Tally) -> Result<(), HarnessError> {
    let mut tree: RbSet<u32> = RbSet::new_in(pool.clone());
    for i in 0..ops {
        let key = u32::try_from(rng.gen_range(0, 255)).unwrap_or(u32::MAX);
        tree.insert_equal(key)?;
        tally.allocations += 1;
        tally.peak_live = tally.peak_live.max(tree.len());
        if (i + 1) % 200 == 0 {
            tree.check_invariants()?;
            tally.frees += tree.len();
            tree.clear();
        }
    }
    tree.check_invariants()?;
    tally.frees += tree.len();
    tree.clear();
    Ok(())
}
