//! Red-black tree engine.
//!
//! An ordered tree whose node storage is reserved exclusively from a
//! [`crate::PoolHandle`]. Values are ordered by a key projected out of each
//! value ([`KeyOfValue`]) under a strict weak ordering ([`KeyCompare`]).
//! [`RbSet`] and [`RbMap`] are the two usual projections.

pub mod iter;
pub mod node;
pub mod rb_tree;
mod rebalance;

pub use iter::{Cursor, Iter, Position};
pub use node::{Color, NodeId};
pub use rb_tree::RbTree;

pub use crate::error::InvariantViolation;

/// Projects the ordering key out of a stored value.
pub trait KeyOfValue<V> {
    type Key;

    fn key<'a>(&self, value: &'a V) -> &'a Self::Key;
}

/// The value is its own key.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Identity;

impl<V> KeyOfValue<V> for Identity {
    type Key = V;

    fn key<'a>(&self, value: &'a V) -> &'a V {
        value
    }
}

/// The key is the first component of a pair.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct First;

impl<K, T> KeyOfValue<(K, T)> for First {
    type Key = K;

    fn key<'a>(&self, value: &'a (K, T)) -> &'a K {
        &value.0
    }
}

/// Strict weak ordering over keys.
pub trait KeyCompare<K: ?Sized> {
    /// Returns true if `a` orders strictly before `b`.
    fn less(&self, a: &K, b: &K) -> bool;
}

/// Natural ascending order.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Less;

impl<K: Ord + ?Sized> KeyCompare<K> for Less {
    fn less(&self, a: &K, b: &K) -> bool {
        a < b
    }
}

impl<K: ?Sized, F> KeyCompare<K> for F
where
    F: Fn(&K, &K) -> bool,
{
    fn less(&self, a: &K, b: &K) -> bool {
        self(a, b)
    }
}

/// Ordered set of unique or repeated keys.
pub type RbSet<K, C = Less> = RbTree<K, K, Identity, C>;

/// Ordered map from `K` to `T`, stored as `(K, T)` pairs.
pub type RbMap<K, T, C = Less> = RbTree<K, (K, T), First, C>;
