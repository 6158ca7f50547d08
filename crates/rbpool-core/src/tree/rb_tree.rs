//! The red-black tree.
//!
//! Every node's storage is reserved from the tree's pool as one block of
//! `size_of::<Node<V>>()` bytes before the node is placed in the arena, and
//! returned after the payload is torn down. The cached minimum and maximum
//! make [`RbTree::begin`] and stepping back from [`RbTree::end`] O(1).
//!
//! Only whole-tree removal ([`RbTree::clear`]) is supported.

use std::fmt;
use std::marker::PhantomData;
use std::mem::size_of;

use crate::alloc::{PoolHandle, TypedAllocator};
use crate::config::TreeConfig;
use crate::error::{InvariantViolation, TreeError};

use super::iter::{Cursor, Iter, Position, Walk, subtree_max, subtree_min, successor};
use super::node::{Color, MAX_NODES, Node, NodeArena, NodeId};
use super::rebalance::rebalance_after_insert;
use super::{Identity, KeyCompare, KeyOfValue, Less};

/// Ordered tree of `V` keyed by `X::key(&V)` under `C`.
pub struct RbTree<K, V, X = Identity, C = Less> {
    nodes: NodeArena<V>,
    root: Option<NodeId>,
    leftmost: Option<NodeId>,
    rightmost: Option<NodeId>,
    node_count: usize,
    key_of: X,
    compare: C,
    allocator: TypedAllocator<Node<V>>,
    config: TreeConfig,
    _key: PhantomData<fn() -> K>,
}

impl<K, V, X, C> RbTree<K, V, X, C> {
    /// Empty tree on this thread's default pool.
    #[must_use]
    pub fn new() -> Self
    where
        X: Default,
        C: Default,
    {
        Self::new_in(PoolHandle::global())
    }

    /// Empty tree drawing its nodes from `pool`.
    #[must_use]
    pub fn new_in(pool: PoolHandle) -> Self
    where
        X: Default,
        C: Default,
    {
        Self::with_parts(X::default(), C::default(), pool, TreeConfig::default())
    }

    /// Empty tree ordered by `compare`, on this thread's default pool.
    #[must_use]
    pub fn with_comparator(compare: C) -> Self
    where
        X: Default,
    {
        Self::with_parts(X::default(), compare, PoolHandle::global(), TreeConfig::default())
    }

    #[must_use]
    pub fn with_parts(key_of: X, compare: C, pool: PoolHandle, config: TreeConfig) -> Self {
        Self {
            nodes: NodeArena::new(),
            root: None,
            leftmost: None,
            rightmost: None,
            node_count: 0,
            key_of,
            compare,
            allocator: TypedAllocator::new(pool),
            config,
            _key: PhantomData,
        }
    }

    /// Bytes reserved from the pool per node.
    #[must_use]
    pub const fn node_size() -> usize {
        size_of::<Node<V>>()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.node_count
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.node_count == 0
    }

    /// Same as [`Self::len`].
    #[must_use]
    pub fn size(&self) -> usize {
        self.node_count
    }

    /// Same as [`Self::is_empty`].
    #[must_use]
    pub fn empty(&self) -> bool {
        self.is_empty()
    }

    /// Largest number of elements this tree will hold.
    #[must_use]
    pub fn max_size(&self) -> usize {
        self.config.node_limit
    }

    #[must_use]
    pub fn key_comp(&self) -> &C {
        &self.compare
    }

    #[must_use]
    pub fn pool(&self) -> &PoolHandle {
        self.allocator.pool()
    }

    /// Cursor at the smallest element, or at the end when empty.
    #[must_use]
    pub fn begin(&self) -> Cursor<'_, V> {
        self.cursor(self.leftmost.into())
    }

    /// Cursor one past the largest element.
    #[must_use]
    pub fn end(&self) -> Cursor<'_, V> {
        self.cursor(Position::End)
    }

    /// Cursor at a position previously returned by this tree.
    #[must_use]
    pub fn cursor(&self, pos: Position) -> Cursor<'_, V> {
        Cursor::new(self.walk(), pos)
    }

    /// Element at `pos`, `None` for the end position.
    #[must_use]
    pub fn get(&self, pos: Position) -> Option<&V> {
        self.walk().value(pos)
    }

    /// Color of the node at `pos`, `None` for the end position.
    #[must_use]
    pub fn color(&self, pos: Position) -> Option<Color> {
        pos.node().and_then(|id| self.nodes.get(id)).map(|node| node.color)
    }

    #[must_use]
    pub fn minimum(&self) -> Option<&V> {
        self.get(self.leftmost.into())
    }

    #[must_use]
    pub fn maximum(&self) -> Option<&V> {
        self.get(self.rightmost.into())
    }

    /// In-order iterator; `.rev()` walks from the maximum down.
    pub fn iter(&self) -> Iter<'_, V> {
        Iter::new(self.walk(), self.node_count)
    }

    /// Destroys every element and returns every node block to the pool.
    ///
    /// Positions obtained before the call are invalidated.
    pub fn clear(&mut self) {
        let Some(root) = self.root.take() else {
            return;
        };
        self.erase_subtree(root);
        self.leftmost = None;
        self.rightmost = None;
        self.node_count = 0;
        self.nodes.reset();
    }

    fn walk(&self) -> Walk<'_, V> {
        Walk {
            nodes: &self.nodes,
            leftmost: self.leftmost,
            rightmost: self.rightmost,
        }
    }

    /// Tears down the subtree at `top` in right, node, left order, keeping
    /// only the unfinished left spines on an explicit stack.
    fn erase_subtree(&mut self, top: NodeId) {
        let mut pending = Vec::new();
        let mut next = Some(top);
        loop {
            while let Some(x) = next {
                pending.push(x);
                next = self.nodes[x].right;
            }
            let Some(x) = pending.pop() else {
                break;
            };
            next = self.nodes[x].left;
            self.destroy_node(x);
        }
    }

    /// Reserves a block, then places the node. On failure the block goes
    /// back to the pool before the error is returned.
    fn create_node(&mut self, value: V, parent: Option<NodeId>) -> Result<NodeId, TreeError> {
        let block = self.allocator.allocate_one()?;
        if self.node_count >= self.config.node_limit {
            self.allocator.deallocate_one(block);
            return Err(TreeError::NodeLimit {
                limit: self.config.node_limit,
            });
        }
        match self.nodes.insert(Node::new(value, parent, block)) {
            Some(id) => Ok(id),
            None => {
                self.allocator.deallocate_one(block);
                Err(TreeError::NodeLimit { limit: MAX_NODES })
            }
        }
    }

    /// Tears down the payload, then returns the block.
    fn destroy_node(&mut self, x: NodeId) {
        let block = self.nodes[x].block;
        self.nodes.remove(x);
        self.allocator.deallocate_one(block);
    }

    /// Links a new node under `parent` (as root when `None`) on the given
    /// side, refreshes the cached bounds and rebalances.
    fn insert_at(&mut self, parent: Option<NodeId>, insert_left: bool, value: V) -> Result<NodeId, TreeError> {
        let z = self.create_node(value, parent)?;
        match parent {
            None => {
                self.root = Some(z);
                self.leftmost = Some(z);
                self.rightmost = Some(z);
            }
            Some(p) if insert_left => {
                self.nodes[p].left = Some(z);
                if self.leftmost == Some(p) {
                    self.leftmost = Some(z);
                }
            }
            Some(p) => {
                self.nodes[p].right = Some(z);
                if self.rightmost == Some(p) {
                    self.rightmost = Some(z);
                }
            }
        }
        rebalance_after_insert(&mut self.nodes, z, &mut self.root);
        self.node_count += 1;
        Ok(z)
    }
}

impl<K, V, X, C> RbTree<K, V, X, C>
where
    X: KeyOfValue<V, Key = K>,
    C: KeyCompare<K>,
{
    fn less(&self, a: &K, b: &K) -> bool {
        self.compare.less(a, b)
    }

    fn key_at(&self, id: NodeId) -> &K {
        self.key_of.key(&self.nodes[id].value)
    }

    /// Walks down to the leaf slot for `key`. Returns the would-be parent
    /// and whether the last step went left.
    fn descend(&self, key: &K) -> (Option<NodeId>, bool) {
        let mut parent = None;
        let mut went_left = true;
        let mut x = self.root;
        while let Some(id) = x {
            parent = Some(id);
            went_left = self.less(key, self.key_at(id));
            x = if went_left {
                self.nodes[id].left
            } else {
                self.nodes[id].right
            };
        }
        (parent, went_left)
    }

    /// Inserts `value` unless an element with an equivalent key exists.
    ///
    /// Returns the position of the inserted element, or of the existing one,
    /// and whether insertion happened.
    pub fn insert_unique(&mut self, value: V) -> Result<(Position, bool), TreeError> {
        let (parent, went_left) = self.descend(self.key_of.key(&value));
        let mut candidate = Position::from(parent);
        if went_left {
            if parent == self.leftmost {
                let id = self.insert_at(parent, true, value)?;
                return Ok((Position::Node(id), true));
            }
            candidate = self.walk().prev(candidate);
        }
        if let Position::Node(existing) = candidate
            && !self.less(self.key_at(existing), self.key_of.key(&value))
        {
            return Ok((candidate, false));
        }
        let id = self.insert_at(parent, went_left, value)?;
        Ok((Position::Node(id), true))
    }

    /// Inserts `value` even if equivalent keys exist. Equivalent elements
    /// keep insertion order.
    pub fn insert_equal(&mut self, value: V) -> Result<Position, TreeError> {
        let (parent, went_left) = self.descend(self.key_of.key(&value));
        self.insert_at(parent, went_left, value).map(Position::Node)
    }

    /// Inserts each value with [`Self::insert_unique`]; returns how many were
    /// new. Stops at the first failure.
    pub fn insert_unique_iter<I>(&mut self, values: I) -> Result<usize, TreeError>
    where
        I: IntoIterator<Item = V>,
    {
        let mut inserted = 0;
        for value in values {
            if self.insert_unique(value)?.1 {
                inserted += 1;
            }
        }
        Ok(inserted)
    }

    /// Inserts each value with [`Self::insert_equal`]. Stops at the first
    /// failure.
    pub fn insert_equal_iter<I>(&mut self, values: I) -> Result<(), TreeError>
    where
        I: IntoIterator<Item = V>,
    {
        for value in values {
            self.insert_equal(value)?;
        }
        Ok(())
    }

    /// Cursor at the element whose key is equivalent to `key`, or the end.
    /// With repeated keys this is the first of them.
    #[must_use]
    pub fn find(&self, key: &K) -> Cursor<'_, V> {
        match self.lower_bound_position(key) {
            Position::Node(id) if !self.less(key, self.key_at(id)) => self.cursor(Position::Node(id)),
            _ => self.end(),
        }
    }

    #[must_use]
    pub fn contains(&self, key: &K) -> bool {
        !self.find(key).is_end()
    }

    /// Cursor at the first element whose key is not less than `key`.
    #[must_use]
    pub fn lower_bound(&self, key: &K) -> Cursor<'_, V> {
        self.cursor(self.lower_bound_position(key))
    }

    fn lower_bound_position(&self, key: &K) -> Position {
        let mut candidate = Position::End;
        let mut x = self.root;
        while let Some(id) = x {
            if self.less(self.key_at(id), key) {
                x = self.nodes[id].right;
            } else {
                candidate = Position::Node(id);
                x = self.nodes[id].left;
            }
        }
        candidate
    }

    /// Verifies the red-black, linkage, ordering and bookkeeping invariants.
    ///
    /// Returns the black height (black nodes on any root-to-leaf path,
    /// counting the root) or the first violation found.
    pub fn check_invariants(&self) -> Result<usize, InvariantViolation> {
        let Some(root) = self.root else {
            if self.node_count != 0 || self.nodes.live() != 0 {
                return Err(InvariantViolation::CountMismatch {
                    recorded: self.node_count,
                    reachable: 0,
                });
            }
            if self.leftmost.is_some() {
                return Err(InvariantViolation::StaleBound { which: "minimum" });
            }
            if self.rightmost.is_some() {
                return Err(InvariantViolation::StaleBound { which: "maximum" });
            }
            return Ok(0);
        };

        if self.nodes[root].parent.is_some() {
            return Err(InvariantViolation::RootHasParent);
        }
        if self.nodes[root].is_red() {
            return Err(InvariantViolation::RedRoot);
        }

        let mut black_height = None;
        let mut reachable = 0;
        let mut stack = vec![(root, 0_usize)];
        while let Some((id, above)) = stack.pop() {
            reachable += 1;
            if reachable > self.nodes.live() {
                return Err(InvariantViolation::CountMismatch {
                    recorded: self.node_count,
                    reachable,
                });
            }
            let node = &self.nodes[id];
            let blacks = above + usize::from(!node.is_red());
            for child in [node.left, node.right] {
                let Some(c) = child else {
                    match black_height {
                        None => black_height = Some(blacks),
                        Some(expected) if expected != blacks => {
                            return Err(InvariantViolation::BlackHeight {
                                node: id,
                                expected,
                                found: blacks,
                            });
                        }
                        Some(_) => {}
                    }
                    continue;
                };
                let broken = InvariantViolation::BrokenParentLink { parent: id, child: c };
                let child_node = self.nodes.get(c).ok_or(broken)?;
                if child_node.parent != Some(id) {
                    return Err(broken);
                }
                if node.is_red() && child_node.is_red() {
                    return Err(InvariantViolation::RedRed(id));
                }
                stack.push((c, blacks));
            }
        }

        if reachable != self.node_count || self.node_count != self.nodes.live() {
            return Err(InvariantViolation::CountMismatch {
                recorded: self.node_count,
                reachable,
            });
        }
        if self.leftmost != Some(subtree_min(&self.nodes, root)) {
            return Err(InvariantViolation::StaleBound { which: "minimum" });
        }
        if self.rightmost != Some(subtree_max(&self.nodes, root)) {
            return Err(InvariantViolation::StaleBound { which: "maximum" });
        }

        let mut prev = subtree_min(&self.nodes, root);
        while let Some(next) = successor(&self.nodes, prev) {
            if self.less(self.key_at(next), self.key_at(prev)) {
                return Err(InvariantViolation::OutOfOrder(next));
            }
            prev = next;
        }

        Ok(black_height.unwrap_or(0))
    }
}

impl<K, V, X, C> Drop for RbTree<K, V, X, C> {
    fn drop(&mut self) {
        self.clear();
    }
}

impl<K, V, X: Default, C: Default> Default for RbTree<K, V, X, C> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K, V, X, C> Extend<V> for RbTree<K, V, X, C>
where
    X: KeyOfValue<V, Key = K>,
    C: KeyCompare<K>,
{
    /// Inserts with unique-key semantics.
    ///
    /// # Panics
    ///
    /// Panics if a node cannot be created (node limit, or pool exhaustion
    /// under the `error` OOM policy). Use [`RbTree::insert_unique_iter`] to
    /// handle that case.
    fn extend<I: IntoIterator<Item = V>>(&mut self, values: I) {
        if let Err(err) = self.insert_unique_iter(values) {
            panic!("RbTree::extend: {err}");
        }
    }
}

impl<K, V, X, C> FromIterator<V> for RbTree<K, V, X, C>
where
    X: KeyOfValue<V, Key = K> + Default,
    C: KeyCompare<K> + Default,
{
    fn from_iter<I: IntoIterator<Item = V>>(values: I) -> Self {
        let mut tree = Self::new();
        tree.extend(values);
        tree
    }
}

impl<'a, K, V, X, C> IntoIterator for &'a RbTree<K, V, X, C> {
    type Item = &'a V;
    type IntoIter = Iter<'a, V>;

    fn into_iter(self) -> Iter<'a, V> {
        self.iter()
    }
}

impl<K, V: fmt::Debug, X, C> fmt::Debug for RbTree<K, V, X, C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.iter()).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::alloc::SimulatedHeap;
    use crate::alloc::size_class::class_index;
    use crate::config::{OomPolicy, PoolConfig};
    use crate::tree::{First, RbMap, RbSet};
    use std::cell::RefCell;
    use std::rc::Rc;

    fn pool() -> PoolHandle {
        PoolHandle::with_heap(
            SimulatedHeap::new(),
            PoolConfig::default().with_oom_policy(OomPolicy::Error),
        )
    }

    fn collect<K, V: Clone, X, C>(tree: &RbTree<K, V, X, C>) -> Vec<V> {
        tree.iter().cloned().collect()
    }

    #[test]
    fn empty_tree() {
        let tree: RbSet<i32> = RbSet::new_in(pool());
        assert!(tree.empty());
        assert_eq!(tree.size(), 0);
        assert_eq!(tree.begin(), tree.end());
        assert_eq!(tree.minimum(), None);
        assert_eq!(tree.check_invariants(), Ok(0));
        assert!(tree.find(&1).is_end());
    }

    #[test]
    fn unique_insert_orders_and_rejects_duplicates() {
        let mut tree: RbSet<i32> = RbSet::new_in(pool());
        for k in [10, 7, 8, 15, 5, 6, 11, 13, 12] {
            assert!(tree.insert_unique(k).unwrap().1);
            tree.check_invariants().unwrap();
        }
        assert_eq!(collect(&tree), vec![5, 6, 7, 8, 10, 11, 12, 13, 15]);

        let (pos, inserted) = tree.insert_unique(8).unwrap();
        assert!(!inserted);
        assert_eq!(tree.get(pos), Some(&8));
        assert_eq!(tree.len(), 9);
    }

    #[test]
    fn duplicate_of_minimum_is_detected() {
        let mut tree: RbSet<i32> = RbSet::new_in(pool());
        tree.insert_unique(3).unwrap();
        tree.insert_unique(9).unwrap();
        let (pos, inserted) = tree.insert_unique(3).unwrap();
        assert!(!inserted);
        assert_eq!(tree.get(pos), Some(&3));
    }

    #[test]
    fn equal_insert_keeps_duplicates_in_insertion_order() {
        let mut tree: RbMap<i32, &str> = RbMap::new_in(pool());
        for entry in [(2, "a"), (1, "b"), (2, "c"), (3, "d"), (2, "e")] {
            tree.insert_equal(entry).unwrap();
        }
        let order: Vec<&str> = tree.iter().map(|(_, v)| *v).collect();
        assert_eq!(order, vec!["b", "a", "c", "e", "d"]);
        assert_eq!(tree.find(&2).get(), Some(&(2, "a")));
        tree.check_invariants().unwrap();
    }

    #[test]
    fn bounds_track_min_and_max() {
        let mut tree: RbSet<u32> = RbSet::new_in(pool());
        tree.insert_unique(50).unwrap();
        tree.insert_unique(20).unwrap();
        tree.insert_unique(80).unwrap();
        tree.insert_unique(10).unwrap();
        assert_eq!(tree.minimum(), Some(&10));
        assert_eq!(tree.maximum(), Some(&80));
        let mut end = tree.end();
        assert_eq!(end.move_prev().get(), Some(&80));
        let mut begin = tree.begin();
        assert!(begin.move_prev().is_end());
    }

    #[test]
    fn find_and_lower_bound() {
        let mut tree: RbSet<i32> = RbSet::new_in(pool());
        tree.insert_unique_iter([1, 3, 5, 7]).unwrap();
        assert_eq!(tree.find(&5).get(), Some(&5));
        assert!(tree.find(&4).is_end());
        assert!(tree.find(&8).is_end());
        assert_eq!(tree.lower_bound(&4).get(), Some(&5));
        assert!(tree.lower_bound(&8).is_end());
        assert!(tree.contains(&1));
        assert!(!tree.contains(&0));
    }

    #[test]
    fn nodes_come_from_the_pool() {
        let pool = pool();
        let mut tree: RbSet<u64> = RbSet::new_in(pool.clone());
        let class = class_index(RbSet::<u64>::node_size());
        tree.insert_unique_iter(0..10).unwrap();
        assert_eq!(pool.stats().classes[class].live_blocks, 10);
        tree.clear();
        let stats = pool.stats();
        assert_eq!(stats.classes[class].live_blocks, 0);
        assert_eq!(stats.pooled_frees, 10);
        assert!(tree.is_empty());
        assert_eq!(tree.begin(), tree.end());
    }

    #[test]
    fn drop_returns_blocks() {
        let pool = pool();
        {
            let mut tree: RbSet<u16> = RbSet::new_in(pool.clone());
            tree.insert_unique_iter([4, 2, 6]).unwrap();
        }
        assert_eq!(pool.stats().live_blocks(), 0);
    }

    #[test]
    fn clear_tears_down_in_descending_order() {
        struct Tracked(u32, Rc<RefCell<Vec<u32>>>);
        impl Drop for Tracked {
            fn drop(&mut self) {
                self.1.borrow_mut().push(self.0);
            }
        }
        let seen = Rc::new(RefCell::new(Vec::new()));
        let mut tree: RbTree<u32, (u32, Tracked), First> = RbTree::new_in(pool());
        for k in [5, 2, 8, 1, 9, 3] {
            tree.insert_unique((k, Tracked(k, Rc::clone(&seen)))).unwrap();
        }
        tree.clear();
        assert_eq!(*seen.borrow(), vec![9, 8, 5, 3, 2, 1]);
    }

    #[test]
    fn node_limit_returns_block_and_leaves_tree_intact() {
        let pool = pool();
        let mut tree: RbSet<i32> = RbTree::with_parts(Identity, Less, pool.clone(), TreeConfig::with_node_limit(2));
        tree.insert_unique(1).unwrap();
        tree.insert_unique(2).unwrap();
        let before = pool.stats().live_blocks();
        assert_eq!(tree.insert_unique(3), Err(TreeError::NodeLimit { limit: 2 }));
        assert_eq!(pool.stats().live_blocks(), before);
        assert_eq!(tree.len(), 2);
        assert_eq!(tree.max_size(), 2);
        tree.check_invariants().unwrap();
    }

    #[test]
    fn pool_exhaustion_surfaces_as_tree_error() {
        let pool = PoolHandle::with_heap(
            SimulatedHeap::with_limit(0),
            PoolConfig::default().with_oom_policy(OomPolicy::Error),
        );
        let mut tree: RbSet<i32> = RbSet::new_in(pool);
        assert!(matches!(tree.insert_unique(1), Err(TreeError::Alloc(_))));
        assert!(tree.is_empty());
        assert_eq!(tree.check_invariants(), Ok(0));
    }

    #[test]
    fn closure_comparator_reverses_order() {
        let mut tree = RbTree::<i32, i32, Identity, _>::with_parts(
            Identity,
            |a: &i32, b: &i32| a > b,
            pool(),
            TreeConfig::default(),
        );
        tree.insert_unique_iter([3, 1, 2]).unwrap();
        assert_eq!(collect(&tree), vec![3, 2, 1]);
        assert!(tree.key_comp().less(&5, &4));
    }

    #[test]
    fn from_iterator_and_debug() {
        let tree: RbSet<i32> = [3, 1, 2, 3].into_iter().collect();
        assert_eq!(tree.len(), 3);
        assert_eq!(format!("{tree:?}"), "{1, 2, 3}");
    }

    #[test]
    fn invariant_checker_reports_corruption() {
        let mut tree: RbSet<i32> = RbSet::new_in(pool());
        tree.insert_unique_iter([2, 1, 3]).unwrap();
        assert_eq!(tree.check_invariants(), Ok(1));
        let root = tree.root.unwrap();
        tree.nodes[root].color = Color::Red;
        assert_eq!(tree.check_invariants(), Err(InvariantViolation::RedRoot));
        tree.nodes[root].color = Color::Black;
        tree.node_count = 5;
        assert!(matches!(
            tree.check_invariants(),
            Err(InvariantViolation::CountMismatch { .. })
        ));
        tree.node_count = 3;
    }
}
