//! Rotations and red-black insert fixup.

use super::node::{Color, NodeArena, NodeId};

/// Rotates the subtree at `x` to the left: its right child `y` takes its
/// place and `x` becomes `y`'s left child.
pub(crate) fn rotate_left<V>(nodes: &mut NodeArena<V>, x: NodeId, root: &mut Option<NodeId>) {
    let Some(y) = nodes[x].right else {
        return;
    };
    let inner = nodes[y].left;
    nodes[x].right = inner;
    if let Some(inner) = inner {
        nodes[inner].parent = Some(x);
    }
    replace_child(nodes, x, y, root);
    nodes[y].left = Some(x);
    nodes[x].parent = Some(y);
}

/// Mirror image of [`rotate_left`].
pub(crate) fn rotate_right<V>(nodes: &mut NodeArena<V>, x: NodeId, root: &mut Option<NodeId>) {
    let Some(y) = nodes[x].left else {
        return;
    };
    let inner = nodes[y].right;
    nodes[x].left = inner;
    if let Some(inner) = inner {
        nodes[inner].parent = Some(x);
    }
    replace_child(nodes, x, y, root);
    nodes[y].right = Some(x);
    nodes[x].parent = Some(y);
}

/// Hangs `new` where `old` was attached, updating `root` when `old` was it.
fn replace_child<V>(nodes: &mut NodeArena<V>, old: NodeId, new: NodeId, root: &mut Option<NodeId>) {
    let parent = nodes[old].parent;
    nodes[new].parent = parent;
    match parent {
        None => *root = Some(new),
        Some(p) if nodes[p].left == Some(old) => nodes[p].left = Some(new),
        Some(p) => nodes[p].right = Some(new),
    }
}

fn is_red<V>(nodes: &NodeArena<V>, id: Option<NodeId>) -> bool {
    id.is_some_and(|id| nodes[id].is_red())
}

/// Restores the red-black properties after `x` was linked in as a leaf.
pub(crate) fn rebalance_after_insert<V>(nodes: &mut NodeArena<V>, mut x: NodeId, root: &mut Option<NodeId>) {
    nodes[x].color = Color::Red;
    while Some(x) != *root {
        let Some(parent) = nodes[x].parent else {
            break;
        };
        if !nodes[parent].is_red() {
            break;
        }
        // A red parent is never the root, so the grandparent exists.
        let Some(grandparent) = nodes[parent].parent else {
            break;
        };

        if nodes[grandparent].left == Some(parent) {
            let uncle = nodes[grandparent].right;
            if let Some(uncle) = uncle.filter(|&u| nodes[u].is_red()) {
                nodes[parent].color = Color::Black;
                nodes[uncle].color = Color::Black;
                nodes[grandparent].color = Color::Red;
                x = grandparent;
                continue;
            }
            if nodes[parent].right == Some(x) {
                x = parent;
                rotate_left(nodes, x, root);
            }
            let (Some(parent), Some(grandparent)) = (nodes[x].parent, grandparent_of(nodes, x)) else {
                break;
            };
            nodes[parent].color = Color::Black;
            nodes[grandparent].color = Color::Red;
            rotate_right(nodes, grandparent, root);
        } else {
            let uncle = nodes[grandparent].left;
            if let Some(uncle) = uncle.filter(|&u| nodes[u].is_red()) {
                nodes[parent].color = Color::Black;
                nodes[uncle].color = Color::Black;
                nodes[grandparent].color = Color::Red;
                x = grandparent;
                continue;
            }
            if nodes[parent].left == Some(x) {
                x = parent;
                rotate_right(nodes, x, root);
            }
            let (Some(parent), Some(grandparent)) = (nodes[x].parent, grandparent_of(nodes, x)) else {
                break;
            };
            nodes[parent].color = Color::Black;
            nodes[grandparent].color = Color::Red;
            rotate_left(nodes, grandparent, root);
        }
    }
    if let Some(r) = *root {
        nodes[r].color = Color::Black;
    }
    debug_assert!(!is_red(nodes, *root));
}

fn grandparent_of<V>(nodes: &NodeArena<V>, x: NodeId) -> Option<NodeId> {
    nodes[x].parent.and_then(|p| nodes[p].parent)
}
