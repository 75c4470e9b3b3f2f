//! Insertion strategy seam shared by flat and hierarchical grouping.

#![allow(missing_docs)]

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::grouping::hash::HashEntry;
use crate::grouping::node::{ItemId, NodeArena, NodeId};

/// Which grouping semantics an insertion used.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InsertionMode {
    Flat,
    Hierarchical,
}

impl fmt::Display for InsertionMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Flat => f.write_str("flat"),
            Self::Hierarchical => f.write_str("hierarchical"),
        }
    }
}

/// Where one insertion put its item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Placement {
    pub item: ItemId,
    /// Node whose `items` received the item.
    pub node: NodeId,
    /// Nodes created by this insertion.
    pub created_nodes: usize,
    /// Existing flat groups matched by the item's hashes, in path order.
    /// Always empty for hierarchical insertions and for new flat groups.
    pub candidates: Vec<NodeId>,
}

impl Placement {
    /// More than one existing group claimed the item.
    pub fn is_ambiguous(&self) -> bool {
        self.candidates.len() > 1
    }
}

/// Decides where an item goes, given a hash path, and updates node counts.
///
/// Implementations must record the arrival exactly once on every node the
/// item logically passes through, root included.
pub trait Inserter {
    fn mode(&self) -> InsertionMode;

    fn insert(&mut self, arena: &mut NodeArena, path: &[HashEntry], item: ItemId) -> Placement;
}
