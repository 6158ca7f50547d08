//! Error types for the allocators and the tree engine.

use thiserror::Error;

use crate::tree::NodeId;

/// Allocation failure surfaced to the caller.
///
/// Only produced when the pool is configured with [`crate::OomPolicy::Error`];
/// under the default policy host exhaustion without a handler aborts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum AllocError {
    #[error("out of memory: host heap refused {requested} bytes and no handler is registered")]
    OutOfMemory { requested: usize },
    #[error("allocation size overflow: {count} elements of {elem_size} bytes")]
    SizeOverflow { count: usize, elem_size: usize },
}

/// Failure while inserting into a tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum TreeError {
    #[error(transparent)]
    Alloc(#[from] AllocError),
    #[error("node limit reached: tree already holds {limit} nodes")]
    NodeLimit { limit: usize },
}

/// Structural defect found by [`crate::RbTree::check_invariants`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum InvariantViolation {
    #[error("root is red")]
    RedRoot,
    #[error("root has a parent link")]
    RootHasParent,
    #[error("red node {0:?} has a red child")]
    RedRed(NodeId),
    #[error("child {child:?} does not link back to parent {parent:?}")]
    BrokenParentLink { parent: NodeId, child: NodeId },
    #[error("black height {found} below {node:?} differs from {expected}")]
    BlackHeight {
        node: NodeId,
        expected: usize,
        found: usize,
    },
    #[error("node {0:?} orders before its in-order predecessor")]
    OutOfOrder(NodeId),
    #[error("cached {which} does not match the tree")]
    StaleBound { which: &'static str },
    #[error("size counter says {recorded}, tree holds {reachable} nodes")]
    CountMismatch { recorded: usize, reachable: usize },
}
