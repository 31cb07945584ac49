//! Red-black insertion fixup, independent of keys and values.
//!
//! The algorithm only needs to read and rewrite node links and colours, which
//! [`RbNodes`] exposes. Any node storage (arena, boxed nodes, ...) that can
//! answer those questions can reuse [`rebalance`].
//!
//! Absent children and the parent of the root are `None`, and count as black.

/// Link and colour accessors over some node storage.
///
/// `Id` addresses a node. Parent links are navigation only; ownership of
/// children is up to the implementor.
pub trait RbNodes {
    type Id: Copy + Eq;

    fn parent(&self, node: Self::Id) -> Option<Self::Id>;
    fn set_parent(&mut self, node: Self::Id, parent: Option<Self::Id>);
    fn left(&self, node: Self::Id) -> Option<Self::Id>;
    fn set_left(&mut self, node: Self::Id, left: Option<Self::Id>);
    fn right(&self, node: Self::Id) -> Option<Self::Id>;
    fn set_right(&mut self, node: Self::Id, right: Option<Self::Id>);
    fn is_red(&self, node: Self::Id) -> bool;
    fn set_red(&mut self, node: Self::Id, red: bool);
}

#[inline]
fn is_red<T: RbNodes + ?Sized>(nodes: &T, node: Option<T::Id>) -> bool {
    node.is_some_and(|n| nodes.is_red(n))
}

/// Restore the red-black invariants after `node` was linked in as a red leaf.
///
/// Walks upward recolouring while parent and uncle are both red, then performs
/// at most two rotations. Returns the new root if a rotation moved a different
/// node to the top of the tree, `None` if the root is unchanged. The caller
/// should repaint the root black afterwards.
pub fn rebalance<T: RbNodes + ?Sized>(nodes: &mut T, mut node: T::Id) -> Option<T::Id> {
    debug_assert!(nodes.is_red(node), "rebalance starts from a red node");

    loop {
        let Some(parent) = nodes.parent(node) else {
            // Reached the root.
            nodes.set_red(node, false);
            return None;
        };
        if !nodes.is_red(parent) {
            return None;
        }
        let Some(grandparent) = nodes.parent(parent) else {
            // Red root: painting it black is enough.
            nodes.set_red(parent, false);
            return None;
        };

        let parent_is_left = nodes.left(grandparent) == Some(parent);
        let uncle = if parent_is_left {
            nodes.right(grandparent)
        } else {
            nodes.left(grandparent)
        };

        if let Some(uncle) = uncle.filter(|&u| nodes.is_red(u)) {
            nodes.set_red(parent, false);
            nodes.set_red(uncle, false);
            nodes.set_red(grandparent, true);
            node = grandparent;
            continue;
        }

        // Inner grandchild: rotate it into the outer position first.
        let node_is_left = nodes.left(parent) == Some(node);
        if node_is_left != parent_is_left {
            if parent_is_left {
                rotate_left(nodes, parent);
            } else {
                rotate_right(nodes, parent);
            }
        }

        let top = if parent_is_left {
            rotate_right(nodes, grandparent)
        } else {
            rotate_left(nodes, grandparent)
        };
        nodes.set_red(top, false);
        nodes.set_red(grandparent, true);

        return nodes.parent(top).is_none().then_some(top);
    }
}

/// Rotate `node` down to the left; its right child takes its place.
/// Returns the new subtree root.
pub fn rotate_left<T: RbNodes + ?Sized>(nodes: &mut T, node: T::Id) -> T::Id {
    let Some(pivot) = nodes.right(node) else {
        panic!("rotate_left: node has no right child");
    };

    let inner = nodes.left(pivot);
    nodes.set_right(node, inner);
    if let Some(inner) = inner {
        nodes.set_parent(inner, Some(node));
    }

    replace_in_parent(nodes, node, pivot);

    nodes.set_left(pivot, Some(node));
    nodes.set_parent(node, Some(pivot));
    pivot
}

/// Rotate `node` down to the right; its left child takes its place.
/// Returns the new subtree root.
pub fn rotate_right<T: RbNodes + ?Sized>(nodes: &mut T, node: T::Id) -> T::Id {
    let Some(pivot) = nodes.left(node) else {
        panic!("rotate_right: node has no left child");
    };

    let inner = nodes.right(pivot);
    nodes.set_left(node, inner);
    if let Some(inner) = inner {
        nodes.set_parent(inner, Some(node));
    }

    replace_in_parent(nodes, node, pivot);

    nodes.set_right(pivot, Some(node));
    nodes.set_parent(node, Some(pivot));
    pivot
}

/// Point `old`'s parent (if any) at `new` instead.
fn replace_in_parent<T: RbNodes + ?Sized>(nodes: &mut T, old: T::Id, new: T::Id) {
    let parent = nodes.parent(old);
    nodes.set_parent(new, parent);
    if let Some(parent) = parent {
        if nodes.left(parent) == Some(old) {
            nodes.set_left(parent, Some(new));
        } else {
            nodes.set_right(parent, Some(new));
        }
    }
}

/// Black-height of the subtree under `node`, counting the absent leaves.
///
/// Panics if a red node has a red child or two paths disagree.
pub fn black_height<T: RbNodes + ?Sized>(nodes: &T, node: Option<T::Id>) -> usize {
    let Some(n) = node else {
        return 1;
    };
    let (left, right) = (nodes.left(n), nodes.right(n));
    if nodes.is_red(n) {
        assert!(
            !is_red(nodes, left) && !is_red(nodes, right),
            "red node has a red child"
        );
    }
    let lh = black_height(nodes, left);
    let rh = black_height(nodes, right);
    assert_eq!(lh, rh, "black-height differs between subtrees");
    lh + usize::from(!nodes.is_red(n))
}
