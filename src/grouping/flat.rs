//! Overlap-based grouping: items sharing any hash land in the same group.
//!
//! Groups sit directly below the root and never nest. Linking is transitive
//! through shared hashes: `[h1, h2]`, `[h2, h3]` and `[h3, h4]` all end up in
//! one group. When an item's hashes point at several existing groups the
//! groups are not fused; the item joins the group reached through the
//! earliest hash in its path, so hash-path order is a significant input.

#![allow(missing_docs)]

use std::collections::HashMap;

use crate::grouping::hash::HashEntry;
use crate::grouping::inserter::{InsertionMode, Inserter, Placement};
use crate::grouping::node::{ItemId, NodeArena, NodeId};

/// Separator between hashes in a new group's name.
pub const GROUP_NAME_SEPARATOR: &str = "-";

/// Flat grouping strategy with a per-tree hash lookup table.
#[derive(Debug, Default, Clone)]
pub struct FlatInserter {
    /// Hash → owning group. Several hashes usually share a group.
    lookup: HashMap<String, NodeId>,
}

impl FlatInserter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Group currently registered for `hash`.
    pub fn group_for(&self, hash: &str) -> Option<NodeId> {
        self.lookup.get(hash).copied()
    }

    /// Number of hashes in the lookup table.
    pub fn registered_hashes(&self) -> usize {
        self.lookup.len()
    }

    /// Registered groups for the path, deduplicated, in first-seen path order.
    fn candidates(&self, path: &[HashEntry]) -> Vec<NodeId> {
        let mut candidates: Vec<NodeId> = Vec::new();
        for entry in path {
            if let Some(&group) = self.lookup.get(entry.hash())
                && !candidates.contains(&group)
            {
                candidates.push(group);
            }
        }
        candidates
    }

    fn register_missing(&mut self, path: &[HashEntry], group: NodeId) {
        for entry in path {
            if !self.lookup.contains_key(entry.hash()) {
                self.lookup.insert(entry.hash().to_string(), group);
            }
        }
    }
}

/// Name of a group created for `path`: its hashes joined in order.
pub fn group_name(path: &[HashEntry]) -> String {
    path.iter()
        .map(HashEntry::hash)
        .collect::<Vec<_>>()
        .join(GROUP_NAME_SEPARATOR)
}

impl Inserter for FlatInserter {
    fn mode(&self) -> InsertionMode {
        InsertionMode::Flat
    }

    fn insert(&mut self, arena: &mut NodeArena, path: &[HashEntry], item: ItemId) -> Placement {
        if path.is_empty() {
            arena.append_item(NodeId::ROOT, item);
            arena.record_arrival(NodeId::ROOT, item);
            return Placement {
                item,
                node: NodeId::ROOT,
                created_nodes: 0,
                candidates: Vec::new(),
            };
        }

        let nodes_before = arena.len();
        let candidates = self.candidates(path);
        let group = match candidates.as_slice() {
            [] => {
                let group = arena.get_or_create_child(NodeId::ROOT, &group_name(path), None);
                self.register_missing(path, group);
                group
            }
            [single] => {
                self.register_missing(path, *single);
                *single
            }
            // Ambiguous: first match wins, table untouched.
            [first, ..] => *first,
        };

        arena.append_item(group, item);
        arena.record_arrival(group, item);
        arena.record_arrival(NodeId::ROOT, item);

        Placement {
            item,
            node: group,
            created_nodes: arena.len() - nodes_before,
            candidates,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grouping::hash::hash_path;

    fn insert(
        inserter: &mut FlatInserter,
        arena: &mut NodeArena,
        hashes: &[&str],
        item: usize,
    ) -> Placement {
        let path = hash_path(hashes.iter().copied()).unwrap();
        inserter.insert(arena, &path, ItemId::new(item))
    }

    #[test]
    fn new_group_is_named_after_joined_hashes() {
        let mut arena = NodeArena::new("root");
        let mut inserter = FlatInserter::new();
        let placement = insert(&mut inserter, &mut arena, &["h1", "h2"], 0);

        assert_eq!(placement.created_nodes, 1);
        assert!(placement.candidates.is_empty());
        assert_eq!(arena[placement.node].name(), "h1-h2");
        assert_eq!(arena[placement.node].label(), None);
        assert_eq!(inserter.group_for("h1"), Some(placement.node));
        assert_eq!(inserter.group_for("h2"), Some(placement.node));
    }

    #[test]
    fn identical_paths_share_a_group() {
        let mut arena = NodeArena::new("root");
        let mut inserter = FlatInserter::new();
        let first = insert(&mut inserter, &mut arena, &["a", "b"], 0);
        let second = insert(&mut inserter, &mut arena, &["a", "b"], 1);

        assert_eq!(first.node, second.node);
        assert_eq!(second.created_nodes, 0);
        assert_eq!(arena[first.node].total_item_count(), 2);
        assert_eq!(arena[first.node].items(), &[ItemId::new(0), ItemId::new(1)]);
        assert_eq!(arena.root().total_item_count(), 2);
    }

    #[test]
    fn single_match_registers_new_hashes() {
        let mut arena = NodeArena::new("root");
        let mut inserter = FlatInserter::new();
        let group = insert(&mut inserter, &mut arena, &["h1", "h2"], 0).node;
        insert(&mut inserter, &mut arena, &["h2", "h3"], 1);

        assert_eq!(inserter.group_for("h3"), Some(group));
        let third = insert(&mut inserter, &mut arena, &["h3", "h4"], 2);
        assert_eq!(third.node, group);
        assert_eq!(arena.len(), 2);
    }

    #[test]
    fn ambiguous_match_picks_first_in_path_order() {
        let mut arena = NodeArena::new("root");
        let mut inserter = FlatInserter::new();
        let g1 = insert(&mut inserter, &mut arena, &["h1"], 0).node;
        let g2 = insert(&mut inserter, &mut arena, &["h2"], 1).node;

        let placement = insert(&mut inserter, &mut arena, &["h2", "x", "h1"], 2);
        assert!(placement.is_ambiguous());
        assert_eq!(placement.node, g2);
        assert_eq!(placement.candidates, vec![g2, g1]);

        // Nothing new registered, nothing fused.
        assert_eq!(inserter.group_for("x"), None);
        assert_eq!(inserter.group_for("h1"), Some(g1));
        assert_eq!(arena[g1].total_item_count(), 1);
        assert_eq!(arena[g2].total_item_count(), 2);
    }

    #[test]
    fn empty_path_goes_to_root_items() {
        let mut arena = NodeArena::new("root");
        let mut inserter = FlatInserter::new();
        let placement = inserter.insert(&mut arena, &[], ItemId::new(0));
        assert_eq!(placement.node, NodeId::ROOT);
        assert_eq!(arena.root().items(), &[ItemId::new(0)]);
        assert_eq!(arena.root().total_item_count(), 1);
        assert_eq!(inserter.registered_hashes(), 0);
    }

    #[test]
    fn duplicate_hashes_in_path_yield_one_candidate() {
        let mut arena = NodeArena::new("root");
        let mut inserter = FlatInserter::new();
        let group = insert(&mut inserter, &mut arena, &["h1"], 0).node;
        let placement = insert(&mut inserter, &mut arena, &["h1", "h1"], 1);
        assert_eq!(placement.candidates, vec![group]);
        assert!(!placement.is_ambiguous());
    }
}
