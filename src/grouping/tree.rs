//! The aggregate root: one node arena, its items, and the two bound inserters.
//!
//! A tree is built by a single writer and read afterwards. Insertion takes
//! `&mut self` and traversal borrows `&self`, so walking a tree while it is
//! still being built is rejected at compile time.
//!
//! Both insertion methods operate on the same root. Mixing them is legal but
//! yields subtrees with different counting semantics; the first mixed
//! insertion is reported as a [`Diagnostic::MixedInsertionModes`].

#![allow(missing_docs)]

use std::fmt;
use std::sync::Arc;

use crate::core::errors::{GroupingError, Result};
use crate::grouping::diagnostics::{AmbiguousMerge, Diagnostic, DiagnosticSink};
use crate::grouping::flat::FlatInserter;
use crate::grouping::hash::{HashEntry, validate_path};
use crate::grouping::hierarchical::HierarchicalInserter;
use crate::grouping::inserter::{InsertionMode, Inserter, Placement};
use crate::grouping::node::{ItemId, Node, NodeArena, NodeId, Walk};

/// Grouping tree over opaque items of type `T`.
pub struct GroupTree<T> {
    arena: NodeArena,
    items: Vec<T>,
    flat: FlatInserter,
    hierarchical: HierarchicalInserter,
    first_mode: Option<InsertionMode>,
    mixed_reported: bool,
    diagnostics: Vec<Diagnostic>,
    sink: Option<Arc<dyn DiagnosticSink>>,
}

impl<T> GroupTree<T> {
    /// Create an empty tree whose root is called `name` (e.g. a project id).
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            arena: NodeArena::new(name),
            items: Vec::new(),
            flat: FlatInserter::new(),
            hierarchical: HierarchicalInserter::new(),
            first_mode: None,
            mixed_reported: false,
            diagnostics: Vec::new(),
            sink: None,
        }
    }

    /// Forward diagnostics to `sink` as well as keeping them on the tree.
    #[must_use]
    pub fn with_sink(mut self, sink: Arc<dyn DiagnosticSink>) -> Self {
        self.sink = Some(sink);
        self
    }

    pub fn set_sink(&mut self, sink: Option<Arc<dyn DiagnosticSink>>) {
        self.sink = sink;
    }

    pub fn name(&self) -> &str {
        self.arena.root().name()
    }

    pub fn root(&self) -> &Node {
        self.arena.root()
    }

    /// Panics if `id` was not minted by this tree.
    pub fn node(&self, id: NodeId) -> &Node {
        &self.arena[id]
    }

    pub fn try_node(&self, id: NodeId) -> Result<&Node> {
        self.arena
            .get(id)
            .ok_or(GroupingError::UnknownNode { index: id.index() })
    }

    pub fn arena(&self) -> &NodeArena {
        &self.arena
    }

    pub fn node_count(&self) -> usize {
        self.arena.len()
    }

    /// Number of items ever inserted.
    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn item(&self, id: ItemId) -> Option<&T> {
        self.items.get(id.index())
    }

    /// Items that terminated at `node`, in arrival order.
    pub fn items_of<'a>(&'a self, node: &'a Node) -> impl Iterator<Item = &'a T> + 'a {
        node.items().iter().filter_map(|&id| self.item(id))
    }

    pub fn exemplar_of(&self, node: &Node) -> Option<&T> {
        node.exemplar().and_then(|id| self.item(id))
    }

    /// Depth-first traversal of every node, parents first.
    pub fn walk(&self) -> Walk<'_> {
        self.arena.walk()
    }

    /// Diagnostics emitted so far, in emission order.
    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    /// Flat lookup table state (hash → group).
    pub fn flat_inserter(&self) -> &FlatInserter {
        &self.flat
    }

    /// Insertion mode of the first insertion, if any.
    pub fn first_mode(&self) -> Option<InsertionMode> {
        self.first_mode
    }

    fn emit(&mut self, diagnostic: Diagnostic) {
        if let Some(sink) = &self.sink {
            sink.report(&diagnostic);
        }
        self.diagnostics.push(diagnostic);
    }

    fn note_mode(&mut self, mode: InsertionMode) {
        match self.first_mode {
            None => self.first_mode = Some(mode),
            Some(first) if first != mode && !self.mixed_reported => {
                self.mixed_reported = true;
                self.emit(Diagnostic::MixedInsertionModes {
                    tree: self.name().to_string(),
                    first,
                    second: mode,
                });
            }
            Some(_) => {}
        }
    }
}

impl<T: fmt::Display> GroupTree<T> {
    /// Insert `item` treating `path` as a route down the tree.
    pub fn insert_hierarchical(&mut self, path: &[HashEntry], item: T) -> Result<Placement> {
        self.insert(InsertionMode::Hierarchical, path, item)
    }

    /// Insert `item` into the flat group its hashes overlap with.
    pub fn insert_flat(&mut self, path: &[HashEntry], item: T) -> Result<Placement> {
        self.insert(InsertionMode::Flat, path, item)
    }

    /// Insert with an explicitly chosen mode.
    ///
    /// Invalid paths are rejected before anything is mutated.
    pub fn insert(&mut self, mode: InsertionMode, path: &[HashEntry], item: T) -> Result<Placement> {
        validate_path(path)?;

        let item_id = ItemId::new(self.items.len());
        self.items.push(item);

        let placement = match mode {
            InsertionMode::Flat => self.flat.insert(&mut self.arena, path, item_id),
            InsertionMode::Hierarchical => {
                self.hierarchical.insert(&mut self.arena, path, item_id)
            }
        };
        self.note_mode(mode);

        if placement.is_ambiguous() {
            let merge = AmbiguousMerge {
                tree: self.name().to_string(),
                item: item_id,
                item_label: self.items[item_id.index()].to_string(),
                chosen: placement.node,
                candidates: placement
                    .candidates
                    .iter()
                    .map(|&id| self.arena[id].name().to_string())
                    .collect(),
                hashes: path.iter().map(|entry| entry.hash().to_string()).collect(),
            };
            self.emit(Diagnostic::AmbiguousMerge(merge));
        }

        Ok(placement)
    }
}

impl<T> fmt::Debug for GroupTree<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GroupTree")
            .field("name", &self.name())
            .field("nodes", &self.arena.len())
            .field("items", &self.items.len())
            .field("first_mode", &self.first_mode)
            .field("diagnostics", &self.diagnostics.len())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grouping::diagnostics::MemorySink;
    use crate::grouping::hash::hash_path;

    fn path(hashes: &[&str]) -> Vec<HashEntry> {
        hash_path(hashes.iter().copied()).unwrap()
    }

    #[test]
    fn items_are_returned_by_identity() {
        let mut tree = GroupTree::new("project_1");
        let placement = tree.insert_hierarchical(&path(&["a"]), "evt-1").unwrap();
        let node = tree.node(placement.node);
        assert_eq!(tree.items_of(node).copied().collect::<Vec<_>>(), vec!["evt-1"]);
        assert_eq!(tree.exemplar_of(tree.root()), Some(&"evt-1"));
        assert_eq!(tree.len(), 1);
    }

    #[test]
    fn ambiguous_flat_insert_reports_to_tree_and_sink() {
        let sink = Arc::new(MemorySink::new());
        let mut tree = GroupTree::new("project_1").with_sink(sink.clone());
        tree.insert_flat(&path(&["h1"]), "a").unwrap();
        tree.insert_flat(&path(&["h2"]), "b").unwrap();
        let placement = tree.insert_flat(&path(&["h1", "h2"]), "c").unwrap();

        assert!(placement.is_ambiguous());
        assert_eq!(tree.diagnostics().len(), 1);
        assert_eq!(sink.len(), 1);
        match &tree.diagnostics()[0] {
            Diagnostic::AmbiguousMerge(merge) => {
                assert_eq!(merge.item_label, "c");
                assert_eq!(merge.candidates, vec!["h1".to_string(), "h2".to_string()]);
                assert_eq!(merge.chosen, placement.node);
            }
            other => panic!("unexpected diagnostic: {other:?}"),
        }
    }

    #[test]
    fn mixed_modes_reported_once() {
        let mut tree = GroupTree::new("p");
        tree.insert_flat(&path(&["h1"]), 1).unwrap();
        tree.insert_hierarchical(&path(&["x"]), 2).unwrap();
        tree.insert_hierarchical(&path(&["y"]), 3).unwrap();
        tree.insert_flat(&path(&["h2"]), 4).unwrap();

        let mixed: Vec<_> = tree
            .diagnostics()
            .iter()
            .filter(|d| matches!(d, Diagnostic::MixedInsertionModes { .. }))
            .collect();
        assert_eq!(mixed.len(), 1);
        assert_eq!(tree.first_mode(), Some(InsertionMode::Flat));
        assert_eq!(tree.root().total_item_count(), 4);
    }

    #[test]
    fn try_node_rejects_foreign_ids() {
        let mut big = GroupTree::new("big");
        let far = big.insert_hierarchical(&path(&["a", "b", "c"]), 0).unwrap().node;
        let small: GroupTree<u32> = GroupTree::new("small");
        let err = small.try_node(far).unwrap_err();
        assert_eq!(err.code(), "GRP-2002");
    }
}
