//! Path-based grouping: the hash list is a path down the tree, most general first.

use crate::grouping::hash::HashEntry;
use crate::grouping::inserter::{InsertionMode, Inserter, Placement};
use crate::grouping::node::{ItemId, NodeArena, NodeId};

/// Places each item at the end of its hash path.
///
/// Every node on the path, root included, counts the item once, so a node's
/// total always equals its own items plus its children's totals.
#[derive(Debug, Default, Clone, Copy)]
pub struct HierarchicalInserter;

impl HierarchicalInserter {
    pub fn new() -> Self {
        Self
    }
}

impl Inserter for HierarchicalInserter {
    fn mode(&self) -> InsertionMode {
        InsertionMode::Hierarchical
    }

    fn insert(&mut self, arena: &mut NodeArena, path: &[HashEntry], item: ItemId) -> Placement {
        let nodes_before = arena.len();
        let mut current = NodeId::ROOT;

        for entry in path {
            let child = arena.get_or_create_child(current, entry.hash(), entry.label());
            arena.record_arrival(current, item);
            current = child;
        }

        arena.append_item(current, item);
        arena.record_arrival(current, item);

        Placement {
            item,
            node: current,
            created_nodes: arena.len() - nodes_before,
            candidates: Vec::new(),
        }
    }
}
