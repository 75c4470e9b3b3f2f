//! Group nodes, their arena, and depth-first traversal.
//!
//! Nodes live in a flat arena and refer to each other through [`NodeId`]
//! indices. Items are stored once by the owning tree and referenced from
//! nodes through [`ItemId`], so exemplar bookkeeping compares identities and
//! never inspects the item payload.

#![allow(missing_docs)]

use std::collections::HashMap;
use std::ops::Index;

use serde::{Deserialize, Serialize};

/// Index of a node inside its tree's arena. Only the arena mints these.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NodeId(usize);

impl NodeId {
    /// The root node of every tree.
    pub const ROOT: Self = Self(0);

    pub const fn index(self) -> usize {
        self.0
    }
}

/// Identity of an inserted item: its arrival position in the owning tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ItemId(usize);

impl ItemId {
    pub(crate) const fn new(index: usize) -> Self {
        Self(index)
    }

    pub const fn index(self) -> usize {
        self.0
    }
}

/// A group of items.
///
/// Children are kept in creation order for stable downstream naming, with a
/// key index for O(1) get-or-create.
#[derive(Debug, Clone)]
pub struct Node {
    name: String,
    label: Option<String>,
    items: Vec<ItemId>,
    total_item_count: u64,
    exemplar: Option<ItemId>,
    children: Vec<NodeId>,
    child_index: HashMap<String, NodeId>,
}

impl Node {
    fn new(name: String, label: Option<String>) -> Self {
        Self {
            name,
            label,
            items: Vec::new(),
            total_item_count: 0,
            exemplar: None,
            children: Vec::new(),
            child_index: HashMap::new(),
        }
    }

    /// Unique among siblings only.
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn label(&self) -> Option<&str> {
        self.label.as_deref()
    }

    /// Items that terminated exactly at this node, in arrival order.
    pub fn items(&self) -> &[ItemId] {
        &self.items
    }

    /// Number of items that terminated exactly at this node.
    pub fn item_count(&self) -> usize {
        self.items.len()
    }

    /// Items whose insertion passed through this node.
    pub fn total_item_count(&self) -> u64 {
        self.total_item_count
    }

    /// First item that ever passed through this node.
    pub fn exemplar(&self) -> Option<ItemId> {
        self.exemplar
    }

    /// Children in creation order.
    pub fn children(&self) -> &[NodeId] {
        &self.children
    }

    pub fn has_children(&self) -> bool {
        !self.children.is_empty()
    }

    /// Look up a child by key without creating it.
    pub fn child(&self, key: &str) -> Option<NodeId> {
        self.child_index.get(key).copied()
    }

    /// Count one item passing through; the first one becomes the exemplar.
    pub(crate) fn record_arrival(&mut self, item: ItemId) {
        self.total_item_count += 1;
        if self.exemplar.is_none() {
            self.exemplar = Some(item);
        }
    }

    pub(crate) fn append_item(&mut self, item: ItemId) {
        self.items.push(item);
    }
}

/// Arena owning every node of one tree. Index 0 is always the root.
#[derive(Debug, Clone)]
pub struct NodeArena {
    nodes: Vec<Node>,
}

impl NodeArena {
    pub fn new(root_name: impl Into<String>) -> Self {
        Self {
            nodes: vec![Node::new(root_name.into(), None)],
        }
    }

    pub fn root(&self) -> &Node {
        &self.nodes[NodeId::ROOT.0]
    }

    pub fn get(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(id.0)
    }

    /// Number of nodes, root included.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Always false: the root exists from construction.
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Return the child of `parent` under `key`, creating it on first reference.
    pub(crate) fn get_or_create_child(
        &mut self,
        parent: NodeId,
        key: &str,
        label: Option<&str>,
    ) -> NodeId {
        if let Some(existing) = self.nodes[parent.0].child(key) {
            return existing;
        }

        let id = NodeId(self.nodes.len());
        self.nodes
            .push(Node::new(key.to_string(), label.map(str::to_string)));
        let parent_node = &mut self.nodes[parent.0];
        parent_node.children.push(id);
        parent_node.child_index.insert(key.to_string(), id);
        id
    }

    pub(crate) fn record_arrival(&mut self, id: NodeId, item: ItemId) {
        self.nodes[id.0].record_arrival(item);
    }

    pub(crate) fn append_item(&mut self, id: NodeId, item: ItemId) {
        self.nodes[id.0].append_item(item);
    }

    /// Depth-first traversal, parents before children.
    pub fn walk(&self) -> Walk<'_> {
        Walk {
            arena: self,
            stack: vec![(NodeId::ROOT, 0)],
            path: Vec::new(),
        }
    }
}

impl Index<NodeId> for NodeArena {
    type Output = Node;

    /// Panics when `id` was minted by a different tree with more nodes.
    fn index(&self, id: NodeId) -> &Node {
        &self.nodes[id.0]
    }
}

/// One node visited by [`Walk`].
#[derive(Debug, Clone)]
pub struct WalkEntry<'a> {
    pub id: NodeId,
    pub node: &'a Node,
    /// Strict ancestors from the root down to the immediate parent.
    pub ancestors: Vec<NodeId>,
}

impl WalkEntry<'_> {
    /// Depth below the root (the root itself is 0).
    pub fn depth(&self) -> usize {
        self.ancestors.len()
    }

    pub fn parent(&self) -> Option<NodeId> {
        self.ancestors.last().copied()
    }
}

/// Lazy depth-first iterator over a [`NodeArena`].
///
/// Borrowing the arena keeps the tree frozen for the whole traversal.
#[derive(Debug)]
pub struct Walk<'a> {
    arena: &'a NodeArena,
    /// Pending (node, depth) pairs.
    stack: Vec<(NodeId, usize)>,
    /// Ancestor chain of the most recently yielded node, itself included.
    path: Vec<NodeId>,
}

impl<'a> Iterator for Walk<'a> {
    type Item = WalkEntry<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        let (id, depth) = self.stack.pop()?;
        self.path.truncate(depth);
        let ancestors = self.path.clone();
        self.path.push(id);

        let node = &self.arena[id];
        self.stack
            .extend(node.children.iter().rev().map(|&child| (child, depth + 1)));

        Some(WalkEntry {
            id,
            node,
            ancestors,
        })
    }
}
