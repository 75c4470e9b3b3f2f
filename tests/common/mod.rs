#![allow(dead_code)]

use std::collections::BTreeMap;

use event_grouping::grouping::hash::{HashEntry, hash_path};
use event_grouping::grouping::tree::GroupTree;
use event_grouping::ingest::records::HashedEvent;

pub fn path(hashes: &[&str]) -> Vec<HashEntry> {
    hash_path(hashes.iter().copied()).expect("non-empty test hashes")
}

pub fn owned_path(hashes: &[String]) -> Vec<HashEntry> {
    hash_path(hashes.iter().cloned()).expect("non-empty test hashes")
}

/// Panics unless every node's total equals its own items plus its children's totals.
pub fn assert_ancestor_sums<T>(tree: &GroupTree<T>) {
    for entry in tree.walk() {
        let node = entry.node;
        let children: u64 = node
            .children()
            .iter()
            .map(|&child| tree.node(child).total_item_count())
            .sum();
        assert_eq!(
            node.total_item_count(),
            node.item_count() as u64 + children,
            "ancestor sum broken at node {:?} (depth {})",
            node.name(),
            entry.depth()
        );
    }
}

/// Order-insensitive shape: node path → (total count, own item count).
pub fn shape<T>(tree: &GroupTree<T>) -> BTreeMap<Vec<String>, (u64, usize)> {
    tree.walk()
        .map(|entry| {
            let mut key: Vec<String> = entry
                .ancestors
                .iter()
                .map(|&id| tree.node(id).name().to_string())
                .collect();
            key.push(entry.node.name().to_string());
            (key, (entry.node.total_item_count(), entry.node.item_count()))
        })
        .collect()
}

pub fn record(project: &str, event_id: &str, flat: &[&str], hierarchical: &[&str]) -> HashedEvent {
    HashedEvent {
        project: project.to_string(),
        event_id: event_id.to_string(),
        title: format!("Error {event_id}: something broke"),
        metadata_value: None,
        culprit: Some("app.main".to_string()),
        json_url: None,
        flat_hashes: path(flat),
        hierarchical_hashes: path(hierarchical),
    }
}
