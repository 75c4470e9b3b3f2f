//! Event grouping trees: node arena, insertion strategies, diagnostics.

pub mod diagnostics;
pub mod flat;
pub mod hash;
pub mod hierarchical;
pub mod inserter;
pub mod node;
pub mod tree;
