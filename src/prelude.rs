//! Convenience re-exports for library consumers.
//!
//! ```rust,no_run
//! use event_grouping::prelude::*;
//! ```

// Core
pub use crate::core::config::{Config, GroupingMode};
pub use crate::core::errors::{GroupingError, Result};

// Grouping
pub use crate::grouping::diagnostics::{
    AmbiguousMerge, Diagnostic, DiagnosticSink, FanoutSink, MemorySink, Severity, StderrSink,
};
pub use crate::grouping::hash::{HashEntry, hash_path};
pub use crate::grouping::inserter::{InsertionMode, Placement};
pub use crate::grouping::node::{ItemId, Node, NodeId, WalkEntry};
pub use crate::grouping::tree::GroupTree;

// Logging
pub use crate::logger::jsonl::{JsonlConfig, JsonlSink};

// Ingest
pub use crate::ingest::event::{EventItem, event_path};
pub use crate::ingest::records::{HashedEvent, IngestStats, ProjectForest, select_strategy};

// Report
pub use crate::report::chart::{chart_flat, chart_tree};
pub use crate::report::metadata::RunMetadata;
pub use crate::report::summary::TreeSummary;
