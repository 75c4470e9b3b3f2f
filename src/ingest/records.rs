//! Hashed-event records and the per-project forest they are grouped into.
//!
//! Records arrive one JSON object per line, with fingerprint hashes already
//! computed. Each project gets its own independent [`GroupTree`].

#![allow(missing_docs)]

use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;
use std::slice;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::core::config::{Config, GroupingMode, ReportConfig};
use crate::core::errors::{GroupingError, Result};
use crate::grouping::diagnostics::DiagnosticSink;
use crate::grouping::hash::HashEntry;
use crate::grouping::inserter::{InsertionMode, Placement};
use crate::grouping::tree::GroupTree;
use crate::ingest::event::{EventItem, event_url_path};

/// One event with its precomputed flat and hierarchical hash lists.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HashedEvent {
    pub project: String,
    pub event_id: String,
    pub title: String,
    #[serde(default)]
    pub metadata_value: Option<String>,
    #[serde(default)]
    pub culprit: Option<String>,
    #[serde(default)]
    pub json_url: Option<String>,
    #[serde(default)]
    pub flat_hashes: Vec<HashEntry>,
    #[serde(default)]
    pub hierarchical_hashes: Vec<HashEntry>,
}

impl HashedEvent {
    fn check(&self) -> std::result::Result<(), String> {
        if self.project.is_empty() {
            return Err("project must not be empty".to_string());
        }
        if self.event_id.is_empty() {
            return Err("event_id must not be empty".to_string());
        }
        Ok(())
    }
}

/// Insertion mode and hash path chosen for one event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Strategy<'a> {
    pub mode: InsertionMode,
    pub path: &'a [HashEntry],
}

/// Pick the insertion mode and path for one event.
///
/// `placeholder` only applies in [`GroupingMode::Hierarchical`], replacing
/// an empty hierarchical list so the event stays off the project node.
pub fn select_strategy<'a>(
    mode: GroupingMode,
    flat: &'a [HashEntry],
    hierarchical: &'a [HashEntry],
    placeholder: Option<&'a HashEntry>,
) -> Strategy<'a> {
    match mode {
        GroupingMode::Flat => Strategy {
            mode: InsertionMode::Flat,
            path: flat,
        },
        GroupingMode::Hierarchical => {
            let path = match placeholder {
                Some(entry) if hierarchical.is_empty() => slice::from_ref(entry),
                _ => hierarchical,
            };
            Strategy {
                mode: InsertionMode::Hierarchical,
                path,
            }
        }
        GroupingMode::Auto => {
            if hierarchical.is_empty() && !flat.is_empty() {
                Strategy {
                    mode: InsertionMode::Flat,
                    path: flat,
                }
            } else {
                Strategy {
                    mode: InsertionMode::Hierarchical,
                    path: hierarchical,
                }
            }
        }
    }
}

/// Counters for one ingestion call, or the forest's lifetime.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IngestStats {
    pub records: u64,
    pub flat: u64,
    pub hierarchical: u64,
    pub ambiguous: u64,
}

impl IngestStats {
    fn count(&mut self, placement: &Placement, mode: InsertionMode) {
        self.records += 1;
        match mode {
            InsertionMode::Flat => self.flat += 1,
            InsertionMode::Hierarchical => self.hierarchical += 1,
        }
        if placement.is_ambiguous() {
            self.ambiguous += 1;
        }
    }

    pub fn merge(&mut self, other: &Self) {
        self.records += other.records;
        self.flat += other.flat;
        self.hierarchical += other.hierarchical;
        self.ambiguous += other.ambiguous;
    }
}

/// One grouping tree per project, created on the project's first record.
pub struct ProjectForest {
    mode: GroupingMode,
    placeholder: Option<HashEntry>,
    report: ReportConfig,
    sink: Option<Arc<dyn DiagnosticSink>>,
    trees: BTreeMap<String, GroupTree<EventItem>>,
    stats: IngestStats,
}

impl ProjectForest {
    pub fn new(mode: GroupingMode) -> Self {
        Self {
            mode,
            placeholder: None,
            report: ReportConfig::default(),
            sink: None,
            trees: BTreeMap::new(),
            stats: IngestStats::default(),
        }
    }

    /// Forest using the grouping and report sections plus the configured sink.
    pub fn from_config(config: &Config) -> Result<Self> {
        let mut forest = Self::new(config.grouping.mode);
        if let Some(placeholder) = &config.grouping.empty_hierarchical_placeholder {
            forest.placeholder = Some(HashEntry::unlabeled(placeholder.as_str()).map_err(
                |_| GroupingError::InvalidConfig {
                    details: "grouping.empty_hierarchical_placeholder must not be empty"
                        .to_string(),
                },
            )?);
        }
        forest.report = config.report.clone();
        forest.sink = config.diagnostic_sink();
        Ok(forest)
    }

    #[must_use]
    pub fn with_sink(mut self, sink: Arc<dyn DiagnosticSink>) -> Self {
        self.sink = Some(sink);
        self
    }

    #[must_use]
    pub fn with_placeholder(mut self, placeholder: HashEntry) -> Self {
        self.placeholder = Some(placeholder);
        self
    }

    pub fn mode(&self) -> GroupingMode {
        self.mode
    }

    pub fn tree(&self, project: &str) -> Option<&GroupTree<EventItem>> {
        self.trees.get(project)
    }

    /// Trees in project order.
    pub fn trees(&self) -> impl Iterator<Item = (&str, &GroupTree<EventItem>)> {
        self.trees.iter().map(|(name, tree)| (name.as_str(), tree))
    }

    pub fn projects(&self) -> Vec<&str> {
        self.trees.keys().map(String::as_str).collect()
    }

    pub fn len(&self) -> usize {
        self.trees.len()
    }

    pub fn is_empty(&self) -> bool {
        self.trees.is_empty()
    }

    /// Totals since the forest was created.
    pub fn stats(&self) -> IngestStats {
        self.stats
    }

    pub fn into_trees(self) -> BTreeMap<String, GroupTree<EventItem>> {
        self.trees
    }

    /// Group one record. Malformed records are rejected before any mutation.
    pub fn ingest(&mut self, record: HashedEvent) -> Result<Placement> {
        self.ingest_at(record, 0).map(|(placement, _)| placement)
    }

    /// Group every record of a JSONL stream, one object per non-blank line.
    ///
    /// Stops at the first malformed line, reporting its 1-based number.
    /// Records before it stay grouped.
    pub fn ingest_reader<R: BufRead>(&mut self, reader: R) -> Result<IngestStats> {
        self.ingest_lines(reader, Path::new("<reader>"))
    }

    pub fn ingest_path(&mut self, path: &Path) -> Result<IngestStats> {
        let file = File::open(path).map_err(|source| GroupingError::io(path, source))?;
        self.ingest_lines(BufReader::new(file), path)
    }

    fn ingest_lines<R: BufRead>(&mut self, reader: R, source: &Path) -> Result<IngestStats> {
        let mut stats = IngestStats::default();
        for (index, line) in reader.lines().enumerate() {
            let line_no = index + 1;
            let line = line.map_err(|err| GroupingError::io(source, err))?;
            if line.trim().is_empty() {
                continue;
            }
            let record: HashedEvent =
                serde_json::from_str(&line).map_err(|err| GroupingError::InvalidRecord {
                    line: line_no,
                    details: err.to_string(),
                })?;
            let (placement, mode) = self.ingest_at(record, line_no)?;
            stats.count(&placement, mode);
        }
        Ok(stats)
    }

    /// `line` is 0 for records that did not come from a stream.
    fn ingest_at(
        &mut self,
        record: HashedEvent,
        line: usize,
    ) -> Result<(Placement, InsertionMode)> {
        record
            .check()
            .map_err(|details| GroupingError::InvalidRecord { line, details })?;

        let json_url = record.json_url.clone().or_else(|| {
            Some(format!(
                "{}/{}",
                record.project,
                event_url_path(
                    &record.event_id,
                    ".json",
                    self.report.shard_prefix_length,
                    self.report.shard_levels,
                )
            ))
        });
        let item = EventItem::from_raw_title(
            record.event_id.as_str(),
            &record.title,
            record.metadata_value.as_deref(),
        )
        .with_culprit(record.culprit.clone())
        .with_json_url(json_url);

        let strategy = select_strategy(
            self.mode,
            &record.flat_hashes,
            &record.hierarchical_hashes,
            self.placeholder.as_ref(),
        );

        let sink = self.sink.clone();
        let tree = self
            .trees
            .entry(record.project.clone())
            .or_insert_with(|| {
                let mut tree = GroupTree::new(record.project.as_str());
                tree.set_sink(sink);
                tree
            });
        let placement = tree.insert(strategy.mode, strategy.path, item)?;
        self.stats.count(&placement, strategy.mode);
        Ok((placement, strategy.mode))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grouping::hash::hash_path;
    use crate::grouping::node::NodeId;

    fn record(project: &str, id: &str, flat: &[&str], hier: &[&str]) -> HashedEvent {
        HashedEvent {
            project: project.to_string(),
            event_id: id.to_string(),
            title: format!("Error {id}: details"),
            metadata_value: None,
            culprit: None,
            json_url: None,
            flat_hashes: hash_path(flat.iter().copied()).unwrap(),
            hierarchical_hashes: hash_path(hier.iter().copied()).unwrap(),
        }
    }

    #[test]
    fn auto_prefers_hierarchical_then_flat() {
        let flat = hash_path(["f"]).unwrap();
        let hier = hash_path(["h"]).unwrap();

        let both = select_strategy(GroupingMode::Auto, &flat, &hier, None);
        assert_eq!(both.mode, InsertionMode::Hierarchical);
        assert_eq!(both.path, hier.as_slice());

        let flat_only = select_strategy(GroupingMode::Auto, &flat, &[], None);
        assert_eq!(flat_only.mode, InsertionMode::Flat);

        let neither = select_strategy(GroupingMode::Auto, &[], &[], None);
        assert_eq!(neither.mode, InsertionMode::Hierarchical);
        assert!(neither.path.is_empty());
    }

    #[test]
    fn placeholder_only_in_hierarchical_mode() {
        let placeholder = HashEntry::unlabeled("NO_HASH").unwrap();
        let flat = hash_path(["f"]).unwrap();

        let hier = select_strategy(GroupingMode::Hierarchical, &flat, &[], Some(&placeholder));
        assert_eq!(hier.path, slice::from_ref(&placeholder));

        let auto = select_strategy(GroupingMode::Auto, &[], &[], Some(&placeholder));
        assert!(auto.path.is_empty());

        let forced_flat = select_strategy(GroupingMode::Flat, &flat, &[], Some(&placeholder));
        assert_eq!(forced_flat.mode, InsertionMode::Flat);
        assert_eq!(forced_flat.path, flat.as_slice());
    }

    #[test]
    fn projects_get_independent_trees() {
        let mut forest = ProjectForest::new(GroupingMode::Hierarchical);
        forest.ingest(record("project_2", "e1", &[], &["a"])).unwrap();
        forest.ingest(record("project_1", "e2", &[], &["a"])).unwrap();
        forest.ingest(record("project_1", "e3", &[], &["a", "b"])).unwrap();

        assert_eq!(forest.projects(), vec!["project_1", "project_2"]);
        assert_eq!(forest.tree("project_1").unwrap().root().total_item_count(), 2);
        assert_eq!(forest.tree("project_2").unwrap().root().total_item_count(), 1);
        assert_eq!(forest.stats().hierarchical, 3);
    }

    #[test]
    fn derived_json_url_uses_shard_layout() {
        let mut forest = ProjectForest::new(GroupingMode::Flat);
        let placement = forest.ingest(record("p", "abcdef", &["h"], &[])).unwrap();
        let tree = forest.tree("p").unwrap();
        let item = tree.item(placement.item).unwrap();
        assert_eq!(item.json_url.as_deref(), Some("p/ab/cd/event_abcdef.json"));
        assert_eq!(item.title, "Error abcdef");
        assert_eq!(item.subtitle.as_deref(), Some("details"));
    }

    #[test]
    fn empty_project_rejected_without_mutation() {
        let mut forest = ProjectForest::new(GroupingMode::Auto);
        let err = forest.ingest(record("", "e1", &["h"], &[])).unwrap_err();
        assert_eq!(err.code(), "GRP-2101");
        assert!(forest.is_empty());
        assert_eq!(forest.stats().records, 0);
    }

    #[test]
    fn reader_reports_bad_line_number() {
        let input = concat!(
            r#"{"project":"p","event_id":"e1","title":"A","flat_hashes":[{"hash":"h1"}]}"#,
            "\n\n",
            r#"{"project":"p","event_id":"e2","title":"B","flat_hashes":[{"hash":""}]}"#,
            "\n",
        );
        let mut forest = ProjectForest::new(GroupingMode::Auto);
        let err = forest.ingest_reader(input.as_bytes()).unwrap_err();
        match err {
            GroupingError::InvalidRecord { line, .. } => assert_eq!(line, 3),
            other => panic!("unexpected error: {other}"),
        }
        assert_eq!(forest.tree("p").unwrap().len(), 1);
    }

    #[test]
    fn placeholder_keeps_events_off_project_node() {
        let mut forest = ProjectForest::new(GroupingMode::Hierarchical)
            .with_placeholder(HashEntry::unlabeled("NO_HASH").unwrap());
        let placement = forest.ingest(record("p", "e1", &[], &[])).unwrap();
        let tree = forest.tree("p").unwrap();
        assert_ne!(placement.node, NodeId::ROOT);
        assert_eq!(tree.node(placement.node).name(), "NO_HASH");
        assert!(tree.root().items().is_empty());
    }
}
