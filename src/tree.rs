//! Red-black tree keyed by byte strings, holding one [`BitmapLayer`] per key.

use crate::error::{Error, Result};
use crate::layer::BitmapLayer;
use crate::rbtree::{self, RbNodes};
use std::cmp::Ordering;

/// Index of a node in the [`NodeArena`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct NodeId(u32);

impl NodeId {
    #[inline]
    fn index(self) -> usize {
        self.0 as usize
    }
}

/// A key and its layered value, as stored in the tree.
///
/// Nodes are created once per distinct key and never removed. Callers only
/// ever see them by shared reference.
#[derive(Debug, Clone)]
pub struct BinarySearchNode {
    key: Box<[u8]>,
    value: BitmapLayer,
    pub(crate) parent: Option<NodeId>,
    pub(crate) left: Option<NodeId>,
    pub(crate) right: Option<NodeId>,
    pub(crate) red: bool,
}

impl BinarySearchNode {
    fn new(key: &[u8], additions: &[u64], deletions: &[u64], parent: Option<NodeId>) -> Self {
        Self {
            key: key.into(),
            value: BitmapLayer::from_lists(additions, deletions),
            parent,
            left: None,
            right: None,
            // Fresh nodes go in red; the root is repainted black right after.
            red: true,
        }
    }

    #[inline]
    pub fn key(&self) -> &[u8] {
        &self.key
    }

    #[inline]
    pub fn value(&self) -> &BitmapLayer {
        &self.value
    }
}

/// Growable node table. Children are owned through the table, parent links
/// are plain indices used for walking upward.
#[derive(Debug, Clone, Default)]
pub(crate) struct NodeArena {
    nodes: Vec<BinarySearchNode>,
}

impl NodeArena {
    fn with_capacity(capacity: usize) -> Self {
        Self {
            nodes: Vec::with_capacity(capacity),
        }
    }

    #[inline]
    fn len(&self) -> usize {
        self.nodes.len()
    }

    fn alloc(&mut self, node: BinarySearchNode) -> NodeId {
        let Ok(idx) = u32::try_from(self.nodes.len()) else {
            panic!("node arena exceeded {} nodes", u32::MAX);
        };
        self.nodes.push(node);
        NodeId(idx)
    }

    #[inline]
    pub(crate) fn get(&self, id: NodeId) -> &BinarySearchNode {
        &self.nodes[id.index()]
    }

    #[inline]
    fn get_mut(&mut self, id: NodeId) -> &mut BinarySearchNode {
        &mut self.nodes[id.index()]
    }

    fn shrink_to_fit(&mut self) {
        self.nodes.shrink_to_fit();
    }
}

impl RbNodes for NodeArena {
    type Id = NodeId;

    fn parent(&self, node: NodeId) -> Option<NodeId> {
        self.get(node).parent
    }

    fn set_parent(&mut self, node: NodeId, parent: Option<NodeId>) {
        self.get_mut(node).parent = parent;
    }

    fn left(&self, node: NodeId) -> Option<NodeId> {
        self.get(node).left
    }

    fn set_left(&mut self, node: NodeId, left: Option<NodeId>) {
        self.get_mut(node).left = left;
    }

    fn right(&self, node: NodeId) -> Option<NodeId> {
        self.get(node).right
    }

    fn set_right(&mut self, node: NodeId, right: Option<NodeId>) {
        self.get_mut(node).right = right;
    }

    fn is_red(&self, node: NodeId) -> bool {
        self.get(node).red
    }

    fn set_red(&mut self, node: NodeId, red: bool) {
        self.get_mut(node).red = red;
    }
}

/// Ordered write buffer mapping byte-string keys to [`BitmapLayer`]s.
///
/// Keys compare as unsigned bytes, so a prefix sorts before its extensions.
/// The tree is not synchronised; wrap it in a lock to share it.
#[derive(Clone, Default)]
pub struct BinarySearchTree {
    pub(crate) nodes: NodeArena,
    pub(crate) root: Option<NodeId>,
}

impl BinarySearchTree {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            nodes: NodeArena::with_capacity(capacity),
            root: None,
        }
    }

    /// Number of distinct keys.
    #[inline]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.root.is_none()
    }

    pub fn shrink_to_fit(&mut self) {
        self.nodes.shrink_to_fit();
    }

    /// Record `additions` and `deletions` against `key`.
    ///
    /// A new key gets a node initialised from the two lists. An existing key has
    /// the lists merged into its layer: additions clear earlier tombstones,
    /// then deletions clear additions and are recorded as tombstones.
    pub fn insert(&mut self, key: &[u8], additions: &[u64], deletions: &[u64]) {
        let Some(mut current) = self.root else {
            let root = self
                .nodes
                .alloc(BinarySearchNode::new(key, additions, deletions, None));
            self.nodes.set_red(root, false);
            self.root = Some(root);
            return;
        };

        loop {
            let node = self.nodes.get(current);
            let next = match key.cmp(node.key()) {
                Ordering::Equal => {
                    self.nodes
                        .get_mut(current)
                        .value
                        .apply(additions, deletions);
                    return;
                }
                Ordering::Less => node.left,
                Ordering::Greater => node.right,
            };

            match next {
                Some(child) => current = child,
                None => {
                    self.link_new_leaf(current, key, additions, deletions);
                    return;
                }
            }
        }
    }

    fn link_new_leaf(&mut self, parent: NodeId, key: &[u8], additions: &[u64], deletions: &[u64]) {
        let go_left = key < self.nodes.get(parent).key();
        let leaf = self
            .nodes
            .alloc(BinarySearchNode::new(key, additions, deletions, Some(parent)));
        if go_left {
            self.nodes.set_left(parent, Some(leaf));
        } else {
            self.nodes.set_right(parent, Some(leaf));
        }

        if let Some(new_root) = rbtree::rebalance(&mut self.nodes, leaf) {
            #[cfg(feature = "tracing")]
            tracing::trace!(nodes = self.nodes.len(), "root replaced after rebalance");
            self.root = Some(new_root);
        }

        if let Some(root) = self.root {
            self.nodes.set_red(root, false);
        }
    }

    /// Look up the layer stored for `key`.
    pub fn get(&self, key: &[u8]) -> Result<&BitmapLayer> {
        let mut current = self.root;
        while let Some(id) = current {
            let node = self.nodes.get(id);
            current = match key.cmp(node.key()) {
                Ordering::Equal => return Ok(node.value()),
                Ordering::Less => node.left,
                Ordering::Greater => node.right,
            };
        }
        Err(Error::NotFound)
    }

    pub fn contains_key(&self, key: &[u8]) -> bool {
        self.get(key).is_ok()
    }

    /// All nodes in ascending key order.
    ///
    /// This is the view a segment writer serialises at flush time. It does not
    /// modify the tree, so repeated calls return the same sequence.
    pub fn flatten_in_order(&self) -> Vec<&BinarySearchNode> {
        let mut out = Vec::with_capacity(self.len());
        out.extend(self.iter());
        out
    }

    /// Lazy in-order traversal.
    pub fn iter(&self) -> Iter<'_> {
        let mut iter = Iter {
            nodes: &self.nodes,
            stack: Vec::new(),
        };
        iter.push_left_spine(self.root);
        iter
    }
}

impl std::fmt::Debug for BinarySearchTree {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_map()
            .entries(self.iter().map(|n| (n.key(), n.value())))
            .finish()
    }
}

impl<'a> IntoIterator for &'a BinarySearchTree {
    type Item = &'a BinarySearchNode;
    type IntoIter = Iter<'a>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// In-order iterator over a [`BinarySearchTree`].
pub struct Iter<'a> {
    nodes: &'a NodeArena,
    stack: Vec<NodeId>,
}

impl<'a> Iter<'a> {
    fn push_left_spine(&mut self, mut current: Option<NodeId>) {
        while let Some(id) = current {
            self.stack.push(id);
            current = self.nodes.get(id).left;
        }
    }
}

impl<'a> Iterator for Iter<'a> {
    type Item = &'a BinarySearchNode;

    fn next(&mut self) -> Option<Self::Item> {
        let id = self.stack.pop()?;
        let node = self.nodes.get(id);
        self.push_left_spine(node.right);
        Some(node)
    }
}
