//! In-order navigation.
//!
//! Successor and predecessor are computed from parent/child links alone.
//! The past-the-end position is the explicit [`Position::End`]; it sits
//! between the maximum and the minimum, so stepping forward from the last
//! element or backward from the first lands on it, and stepping off it goes
//! to the minimum (forward) or the maximum (backward).

use std::fmt;
use std::iter::FusedIterator;

use super::node::{NodeArena, NodeId};

/// A location in a tree: an element, or one past the last element.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Position {
    Node(NodeId),
    End,
}

impl Position {
    #[must_use]
    pub const fn is_end(self) -> bool {
        matches!(self, Self::End)
    }

    #[must_use]
    pub const fn node(self) -> Option<NodeId> {
        match self {
            Self::Node(id) => Some(id),
            Self::End => None,
        }
    }
}

impl From<Option<NodeId>> for Position {
    fn from(id: Option<NodeId>) -> Self {
        id.map_or(Self::End, Self::Node)
    }
}

/// Leftmost node of the subtree rooted at `x`.
pub(crate) fn subtree_min<V>(nodes: &NodeArena<V>, mut x: NodeId) -> NodeId {
    while let Some(left) = nodes[x].left {
        x = left;
    }
    x
}

/// Rightmost node of the subtree rooted at `x`.
pub(crate) fn subtree_max<V>(nodes: &NodeArena<V>, mut x: NodeId) -> NodeId {
    while let Some(right) = nodes[x].right {
        x = right;
    }
    x
}

/// In-order successor of `x`, or `None` past the maximum.
pub(crate) fn successor<V>(nodes: &NodeArena<V>, mut x: NodeId) -> Option<NodeId> {
    if let Some(right) = nodes[x].right {
        return Some(subtree_min(nodes, right));
    }
    loop {
        let parent = nodes[x].parent?;
        if nodes[parent].right != Some(x) {
            return Some(parent);
        }
        x = parent;
    }
}

/// In-order predecessor of `x`, or `None` before the minimum.
pub(crate) fn predecessor<V>(nodes: &NodeArena<V>, mut x: NodeId) -> Option<NodeId> {
    if let Some(left) = nodes[x].left {
        return Some(subtree_max(nodes, left));
    }
    loop {
        let parent = nodes[x].parent?;
        if nodes[parent].left != Some(x) {
            return Some(parent);
        }
        x = parent;
    }
}

/// Read-only view of the topology needed to step between positions.
pub(crate) struct Walk<'a, V> {
    pub(crate) nodes: &'a NodeArena<V>,
    pub(crate) leftmost: Option<NodeId>,
    pub(crate) rightmost: Option<NodeId>,
}

impl<V> Clone for Walk<'_, V> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<V> Copy for Walk<'_, V> {}

impl<'a, V> Walk<'a, V> {
    /// Stale positions (vacated nodes) step to `End`.
    pub(crate) fn next(self, pos: Position) -> Position {
        match pos {
            Position::End => self.leftmost.into(),
            Position::Node(id) if self.nodes.get(id).is_some() => successor(self.nodes, id).into(),
            Position::Node(_) => Position::End,
        }
    }

    pub(crate) fn prev(self, pos: Position) -> Position {
        match pos {
            Position::End => self.rightmost.into(),
            Position::Node(id) if self.nodes.get(id).is_some() => predecessor(self.nodes, id).into(),
            Position::Node(_) => Position::End,
        }
    }

    pub(crate) fn value(self, pos: Position) -> Option<&'a V> {
        pos.node().and_then(|id| self.nodes.get(id)).map(|node| &node.value)
    }
}

/// Bidirectional cursor borrowing a tree.
///
/// Moving past either end lands on the end position; moving again wraps
/// around to the other end.
pub struct Cursor<'a, V> {
    walk: Walk<'a, V>,
    pos: Position,
}

impl<'a, V> Cursor<'a, V> {
    pub(crate) fn new(walk: Walk<'a, V>, pos: Position) -> Self {
        Self { walk, pos }
    }

    /// The element under the cursor, `None` at the end position.
    #[must_use]
    pub fn get(&self) -> Option<&'a V> {
        self.walk.value(self.pos)
    }

    #[must_use]
    pub fn position(&self) -> Position {
        self.pos
    }

    #[must_use]
    pub fn is_end(&self) -> bool {
        self.pos.is_end()
    }

    /// Advances to the in-order successor (pre-increment).
    pub fn move_next(&mut self) -> &mut Self {
        self.pos = self.walk.next(self.pos);
        self
    }

    /// Steps back to the in-order predecessor (pre-decrement).
    pub fn move_prev(&mut self) -> &mut Self {
        self.pos = self.walk.prev(self.pos);
        self
    }

    /// Advances and returns the cursor as it was (post-increment).
    pub fn post_next(&mut self) -> Self {
        let before = self.clone();
        self.move_next();
        before
    }

    /// Steps back and returns the cursor as it was (post-decrement).
    pub fn post_prev(&mut self) -> Self {
        let before = self.clone();
        self.move_prev();
        before
    }
}

impl<V> Clone for Cursor<'_, V> {
    fn clone(&self) -> Self {
        Self {
            walk: self.walk,
            pos: self.pos,
        }
    }
}

impl<V> PartialEq for Cursor<'_, V> {
    fn eq(&self, other: &Self) -> bool {
        self.pos == other.pos && std::ptr::eq(self.walk.nodes, other.walk.nodes)
    }
}

impl<V> Eq for Cursor<'_, V> {}

impl<V: fmt::Debug> fmt::Debug for Cursor<'_, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Cursor")
            .field("pos", &self.pos)
            .field("value", &self.get())
            .finish()
    }
}

/// In-order iterator over a tree's values.
pub struct Iter<'a, V> {
    walk: Walk<'a, V>,
    front: Position,
    /// One past the last value still to yield from the back.
    back: Position,
    remaining: usize,
}

impl<'a, V> Iter<'a, V> {
    pub(crate) fn new(walk: Walk<'a, V>, len: usize) -> Self {
        Self {
            front: walk.leftmost.into(),
            back: Position::End,
            walk,
            remaining: len,
        }
    }
}

impl<'a, V> Iterator for Iter<'a, V> {
    type Item = &'a V;

    fn next(&mut self) -> Option<&'a V> {
        if self.remaining == 0 {
            return None;
        }
        let value = self.walk.value(self.front)?;
        self.front = self.walk.next(self.front);
        self.remaining -= 1;
        Some(value)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl<'a, V> DoubleEndedIterator for Iter<'a, V> {
    fn next_back(&mut self) -> Option<&'a V> {
        if self.remaining == 0 {
            return None;
        }
        self.back = self.walk.prev(self.back);
        self.remaining -= 1;
        self.walk.value(self.back)
    }
}

impl<V> ExactSizeIterator for Iter<'_, V> {}

impl<V> FusedIterator for Iter<'_, V> {}

impl<V> Clone for Iter<'_, V> {
    fn clone(&self) -> Self {
        Self {
            walk: self.walk,
            front: self.front,
            back: self.back,
            remaining: self.remaining,
        }
    }
}
