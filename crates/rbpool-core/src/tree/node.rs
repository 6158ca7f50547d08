//! Tree nodes and the index arena that owns them.
//!
//! Links are [`NodeId`] indices into a [`NodeArena`], so parent pointers are
//! plain back-references and never alias ownership. Vacated indices are
//! reused by later insertions.

use std::ops::{Index, IndexMut};

use crate::construct::{construct, destroy};

/// Largest number of live nodes one arena can index.
pub const MAX_NODES: usize = u32::MAX as usize;

/// Index of a node within its tree's arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NodeId(u32);

impl NodeId {
    #[must_use]
    pub const fn index(self) -> usize {
        self.0 as usize
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Color {
    Red,
    Black,
}

impl Color {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Red => "red",
            Self::Black => "black",
        }
    }
}

/// One tree node. `block` is the pool address reserved for it.
#[derive(Debug)]
pub struct Node<V> {
    pub color: Color,
    pub parent: Option<NodeId>,
    pub left: Option<NodeId>,
    pub right: Option<NodeId>,
    pub block: usize,
    pub value: V,
}

impl<V> Node<V> {
    pub(crate) fn new(value: V, parent: Option<NodeId>, block: usize) -> Self {
        Self {
            color: Color::Red,
            parent,
            left: None,
            right: None,
            block,
            value,
        }
    }

    pub(crate) fn is_red(&self) -> bool {
        self.color == Color::Red
    }
}

/// Slab of nodes addressed by [`NodeId`].
#[derive(Debug)]
pub(crate) struct NodeArena<V> {
    slots: Vec<Option<Node<V>>>,
    vacant: Vec<NodeId>,
    live: usize,
}

impl<V> NodeArena<V> {
    pub(crate) const fn new() -> Self {
        Self {
            slots: Vec::new(),
            vacant: Vec::new(),
            live: 0,
        }
    }

    pub(crate) fn live(&self) -> usize {
        self.live
    }

    /// Stores `node`, reusing a vacated index when one exists. Returns
    /// `None` once the index space is exhausted.
    pub(crate) fn insert(&mut self, node: Node<V>) -> Option<NodeId> {
        let id = match self.vacant.pop() {
            Some(id) => id,
            None => {
                let index = u32::try_from(self.slots.len()).ok().filter(|&i| i < u32::MAX)?;
                self.slots.push(None);
                NodeId(index)
            }
        };
        construct(&mut self.slots[id.index()], node);
        self.live += 1;
        Some(id)
    }

    /// Tears down the node at `id`. Returns false for a vacant index.
    pub(crate) fn remove(&mut self, id: NodeId) -> bool {
        let Some(slot) = self.slots.get_mut(id.index()) else {
            return false;
        };
        if !destroy(slot) {
            return false;
        }
        self.vacant.push(id);
        self.live -= 1;
        true
    }

    pub(crate) fn get(&self, id: NodeId) -> Option<&Node<V>> {
        self.slots.get(id.index()).and_then(Option::as_ref)
    }

    /// Drops the index bookkeeping once every node has been removed.
    pub(crate) fn reset(&mut self) {
        debug_assert_eq!(self.live, 0);
        self.slots.clear();
        self.vacant.clear();
    }
}

impl<V> Index<NodeId> for NodeArena<V> {
    type Output = Node<V>;

    fn index(&self, id: NodeId) -> &Node<V> {
        match self.slots.get(id.index()) {
            Some(Some(node)) => node,
            _ => panic!("dangling node link {id:?}"),
        }
    }
}

impl<V> IndexMut<NodeId> for NodeArena<V> {
    fn index_mut(&mut self, id: NodeId) -> &mut Node<V> {
        match self.slots.get_mut(id.index()) {
            Some(Some(node)) => node,
            _ => panic!("dangling node link {id:?}"),
        }
    }
}
