//! Recoverable grouping observations and the sinks that receive them.
//!
//! Diagnostics never alter insertion results. Every tree keeps its own list
//! and additionally forwards each diagnostic to an injected
//! [`DiagnosticSink`], if one is configured.

#![allow(missing_docs)]

use std::fmt;
use std::io::{self, Write};
use std::sync::Arc;

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use crate::grouping::inserter::InsertionMode;
use crate::grouping::node::{ItemId, NodeId};

/// Severity level for diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Info,
    Warning,
    Critical,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Info => f.write_str("info"),
            Self::Warning => f.write_str("warning"),
            Self::Critical => f.write_str("critical"),
        }
    }
}

/// A flat insertion whose hashes matched more than one existing group.
///
/// The item went to `chosen`, the group reached through the earliest hash in
/// the path; the other candidates were left untouched.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AmbiguousMerge {
    /// Root name of the tree (usually the project id).
    pub tree: String,
    pub item: ItemId,
    /// Display form of the item payload.
    pub item_label: String,
    pub chosen: NodeId,
    /// Candidate group names in path order; the first one is the chosen group.
    pub candidates: Vec<String>,
    /// The item's flat hash path.
    pub hashes: Vec<String>,
}

/// Observations emitted while building a tree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Diagnostic {
    AmbiguousMerge(AmbiguousMerge),
    /// A tree received both flat and hierarchical insertions. Emitted once.
    MixedInsertionModes {
        tree: String,
        first: InsertionMode,
        second: InsertionMode,
    },
}

impl Diagnostic {
    pub const fn severity(&self) -> Severity {
        match self {
            Self::AmbiguousMerge(_) | Self::MixedInsertionModes { .. } => Severity::Warning,
        }
    }

    /// Short component tag used for prefixed log lines.
    pub const fn component(&self) -> &'static str {
        match self {
            Self::AmbiguousMerge(_) => "GRP-FLAT",
            Self::MixedInsertionModes { .. } => "GRP-TREE",
        }
    }

    pub fn tree(&self) -> &str {
        match self {
            Self::AmbiguousMerge(merge) => &merge.tree,
            Self::MixedInsertionModes { tree, .. } => tree,
        }
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::AmbiguousMerge(merge) => write!(
                f,
                "{}: multiple group candidates for item {} ({}); using {}",
                merge.tree,
                merge.item_label,
                merge.candidates.join(", "),
                merge.candidates.first().map_or("?", String::as_str),
            ),
            Self::MixedInsertionModes {
                tree,
                first,
                second,
            } => write!(
                f,
                "{tree}: {second} insertion into a tree built with {first} insertions"
            ),
        }
    }
}

/// Receiver for diagnostics. Implementations must not fail the caller.
pub trait DiagnosticSink: Send + Sync {
    fn report(&self, diagnostic: &Diagnostic);
}

/// Collects diagnostics in memory.
#[derive(Debug, Default)]
pub struct MemorySink {
    entries: Mutex<Vec<Diagnostic>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn snapshot(&self) -> Vec<Diagnostic> {
        self.entries.lock().clone()
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }

    /// Drain everything collected so far.
    pub fn take(&self) -> Vec<Diagnostic> {
        std::mem::take(&mut *self.entries.lock())
    }
}

impl DiagnosticSink for MemorySink {
    fn report(&self, diagnostic: &Diagnostic) {
        self.entries.lock().push(diagnostic.clone());
    }
}

/// Writes one prefixed line per diagnostic to stderr.
#[derive(Debug, Default, Clone, Copy)]
pub struct StderrSink;

impl DiagnosticSink for StderrSink {
    fn report(&self, diagnostic: &Diagnostic) {
        let _ = writeln!(
            io::stderr(),
            "[{}] {}: {diagnostic}",
            diagnostic.component(),
            diagnostic.severity()
        );
    }
}

/// Forwards every diagnostic to each wrapped sink in order.
#[derive(Default, Clone)]
pub struct FanoutSink {
    sinks: Vec<Arc<dyn DiagnosticSink>>,
}

impl FanoutSink {
    pub fn new(sinks: Vec<Arc<dyn DiagnosticSink>>) -> Self {
        Self { sinks }
    }

    pub fn push(&mut self, sink: Arc<dyn DiagnosticSink>) {
        self.sinks.push(sink);
    }

    pub fn len(&self) -> usize {
        self.sinks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sinks.is_empty()
    }
}

impl fmt::Debug for FanoutSink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FanoutSink")
            .field("sinks", &self.sinks.len())
            .finish()
    }
}

impl DiagnosticSink for FanoutSink {
    fn report(&self, diagnostic: &Diagnostic) {
        for sink in &self.sinks {
            sink.report(diagnostic);
        }
    }
}
