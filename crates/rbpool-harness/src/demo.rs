//! The canonical demo scenario: unique insertion of a fixed key sequence,
//! then an in-order walk reporting each node's color.

use serde::Serialize;

use rbpool_core::log::LogRecord;
use rbpool_core::metrics::PoolStats;
use rbpool_core::{PoolConfig, PoolHandle, RbSet, SimulatedHeap};

use crate::error::HarnessError;

/// Keys inserted by the demo, in order.
pub const DEMO_KEYS: [i32; 9] = [10, 7, 8, 15, 5, 6, 11, 13, 12];

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DemoNode {
    pub key: i32,
    pub color: &'static str,
}

#[derive(Debug, Clone, Serialize)]
pub struct DemoReport {
    pub size_before: usize,
    pub size_after: usize,
    pub in_order: Vec<DemoNode>,
    pub black_height: usize,
    /// Pool counters after the tree was cleared.
    pub pool: PoolStats,
    #[serde(skip)]
    pub records: Vec<LogRecord>,
}

impl DemoReport {
    /// `key(color)` pairs separated by spaces.
    #[must_use]
    pub fn render_line(&self) -> String {
        self.in_order
            .iter()
            .map(|node| format!("{}({})", node.key, node.color))
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// Runs the demo on a fresh pool.
pub fn run_demo(config: PoolConfig) -> Result<DemoReport, HarnessError> {
    let pool = PoolHandle::with_heap(SimulatedHeap::new(), config);
    let mut tree: RbSet<i32> = RbSet::new_in(pool.clone());
    let size_before = tree.size();

    for key in DEMO_KEYS {
        tree.insert_unique(key)?;
    }
    let size_after = tree.size();
    let black_height = tree.check_invariants()?;

    let mut in_order = Vec::with_capacity(size_after);
    let mut cursor = tree.begin();
    while let Some(&key) = cursor.get() {
        let color = tree.color(cursor.position()).map_or("?", |c| c.as_str());
        in_order.push(DemoNode { key, color });
        cursor.move_next();
    }

    tree.clear();
    let records = pool.with(|p| p.drain_logs());
    Ok(DemoReport {
        size_before,
        size_after,
        in_order,
        black_height,
        pool: pool.stats(),
        records,
    })
}
