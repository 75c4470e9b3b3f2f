//! Read-only views over a finished tree, for report generators.
//!
//! The project root never shows an event's title or hash: it is presented by
//! its own name even though it carries an exemplar internally.

#![allow(missing_docs)]

use serde::Serialize;

use crate::grouping::node::{NodeId, WalkEntry};
use crate::grouping::tree::GroupTree;
use crate::ingest::event::EventItem;

/// Page name appended to every node directory.
pub const INDEX_PAGE: &str = "index.html";

/// Display title: exemplar title, or the node name when there is no exemplar.
pub fn node_title(tree: &GroupTree<EventItem>, id: NodeId) -> &str {
    let node = tree.node(id);
    if id == NodeId::ROOT {
        return node.name();
    }
    tree.exemplar_of(node)
        .map_or(node.name(), |item| item.title.as_str())
}

pub fn node_subtitle(tree: &GroupTree<EventItem>, id: NodeId) -> Option<&str> {
    if id == NodeId::ROOT {
        return None;
    }
    tree.exemplar_of(tree.node(id))
        .and_then(|item| item.subtitle.as_deref())
}

/// Short text for breadcrumb trails.
///
/// Intermediate nodes with a tree label show the label; everything else
/// shows its title.
pub fn breadcrumb(tree: &GroupTree<EventItem>, id: NodeId) -> &str {
    let node = tree.node(id);
    match node.label() {
        Some(label) if node.has_children() => label,
        _ => node_title(tree, id),
    }
}

/// Grouping hash shown on a node page; the root has none.
pub fn node_hash(tree: &GroupTree<EventItem>, id: NodeId) -> Option<&str> {
    (id != NodeId::ROOT).then(|| tree.node(id).name())
}

/// Output directory of a node: every ancestor name plus its own, `/`-joined.
pub fn node_path(tree: &GroupTree<EventItem>, entry: &WalkEntry<'_>) -> String {
    entry
        .ancestors
        .iter()
        .map(|&id| tree.node(id).name())
        .chain(std::iter::once(entry.node.name()))
        .collect::<Vec<_>>()
        .join("/")
}

/// Link to a node's page relative to the project page; `None` for the root.
pub fn descendant_url(tree: &GroupTree<EventItem>, entry: &WalkEntry<'_>) -> Option<String> {
    if entry.id == NodeId::ROOT {
        return None;
    }
    Some(relative_url(
        tree,
        entry.ancestors.iter().skip(1).copied(),
        entry.id,
    ))
}

/// `a/b/<node>/index.html` built from the given path segments.
pub(crate) fn relative_url(
    tree: &GroupTree<EventItem>,
    between: impl Iterator<Item = NodeId>,
    id: NodeId,
) -> String {
    let mut parts: Vec<&str> = between.map(|ancestor| tree.node(ancestor).name()).collect();
    parts.push(tree.node(id).name());
    parts.push(INDEX_PAGE);
    parts.join("/")
}

/// Link to an event's JSON document under `base_url`.
pub fn event_url(base_url: &str, item: &EventItem) -> Option<String> {
    let relative = item.json_url.as_deref()?;
    Some(format!(
        "{}/{}",
        base_url.trim_end_matches('/'),
        relative.trim_start_matches('/')
    ))
}

/// Serializable snapshot of one node and its subtree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NodeSummary {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subtitle: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hash: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    pub item_count: usize,
    pub total_item_count: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exemplar: Option<String>,
    /// Event ids of the node's own items, in arrival order.
    pub events: Vec<String>,
    /// Sorted by title.
    pub children: Vec<NodeSummary>,
}

/// Serializable snapshot of a whole project tree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TreeSummary {
    pub project: String,
    pub node_count: usize,
    pub event_count: usize,
    pub diagnostic_count: usize,
    pub root: NodeSummary,
}

impl TreeSummary {
    pub fn build(tree: &GroupTree<EventItem>) -> Self {
        Self {
            project: tree.name().to_string(),
            node_count: tree.node_count(),
            event_count: tree.len(),
            diagnostic_count: tree.diagnostics().len(),
            root: summarize(tree, NodeId::ROOT, &mut Vec::new()),
        }
    }

    /// Every node of the snapshot, parents first.
    pub fn nodes(&self) -> Vec<&NodeSummary> {
        let mut out = Vec::new();
        let mut stack = vec![&self.root];
        while let Some(node) = stack.pop() {
            out.push(node);
            stack.extend(node.children.iter().rev());
        }
        out
    }
}

fn summarize(tree: &GroupTree<EventItem>, id: NodeId, ancestors: &mut Vec<NodeId>) -> NodeSummary {
    let node = tree.node(id);
    let url = (id != NodeId::ROOT)
        .then(|| relative_url(tree, ancestors.iter().skip(1).copied(), id));
    let exemplar = if id == NodeId::ROOT {
        None
    } else {
        tree.exemplar_of(node).map(|item| item.event_id.clone())
    };

    ancestors.push(id);
    let mut children: Vec<NodeSummary> = node
        .children()
        .iter()
        .map(|&child| summarize(tree, child, ancestors))
        .collect();
    ancestors.pop();
    children.sort_by(|a, b| a.title.cmp(&b.title));

    NodeSummary {
        name: node.name().to_string(),
        label: node.label().map(str::to_string),
        title: node_title(tree, id).to_string(),
        subtitle: node_subtitle(tree, id).map(str::to_string),
        hash: node_hash(tree, id).map(str::to_string),
        url,
        item_count: node.item_count(),
        total_item_count: node.total_item_count(),
        exemplar,
        events: tree.items_of(node).map(|item| item.event_id.clone()).collect(),
        children,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grouping::hash::{HashEntry, hash_path};

    fn item(id: &str, raw_title: &str) -> EventItem {
        EventItem::from_raw_title(id, raw_title, None)
    }

    fn sample() -> GroupTree<EventItem> {
        let mut tree = GroupTree::new("project_1");
        let labeled = vec![
            HashEntry::new("aaa", Some("in main".to_string())).unwrap(),
            HashEntry::new("bbb", None).unwrap(),
        ];
        tree.insert_hierarchical(&labeled, item("e1", "KeyError: 'x'"))
            .unwrap();
        tree.insert_hierarchical(&hash_path(["aaa", "ccc"]).unwrap(), item("e2", "Abort"))
            .unwrap();
        tree.insert_hierarchical(&hash_path(["zzz"]).unwrap(), item("e3", "Boom: now"))
            .unwrap();
        tree
    }

    #[test]
    fn root_uses_its_own_name() {
        let tree = sample();
        assert_eq!(node_title(&tree, NodeId::ROOT), "project_1");
        assert_eq!(node_subtitle(&tree, NodeId::ROOT), None);
        assert_eq!(node_hash(&tree, NodeId::ROOT), None);
    }

    #[test]
    fn inner_nodes_use_exemplar_and_label() {
        let tree = sample();
        let aaa = tree.root().child("aaa").unwrap();
        assert_eq!(node_title(&tree, aaa), "KeyError");
        assert_eq!(node_subtitle(&tree, aaa), Some("'x'"));
        assert_eq!(breadcrumb(&tree, aaa), "in main");
        assert_eq!(node_hash(&tree, aaa), Some("aaa"));

        let zzz = tree.root().child("zzz").unwrap();
        assert_eq!(breadcrumb(&tree, zzz), "Boom");
    }

    #[test]
    fn paths_and_urls() {
        let tree = sample();
        let entries: Vec<_> = tree.walk().collect();
        let bbb = entries
            .iter()
            .find(|entry| entry.node.name() == "bbb")
            .unwrap();
        assert_eq!(node_path(&tree, bbb), "project_1/aaa/bbb");
        assert_eq!(
            descendant_url(&tree, bbb).as_deref(),
            Some("aaa/bbb/index.html")
        );
        assert_eq!(descendant_url(&tree, &entries[0]), None);
    }

    #[test]
    fn event_url_joins_base() {
        let event = item("abcdef", "T").with_json_url(Some("p/ab/cd/event_abcdef.json".into()));
        assert_eq!(
            event_url("file:///events/", &event).as_deref(),
            Some("file:///events/p/ab/cd/event_abcdef.json")
        );
        assert_eq!(event_url("x", &item("e", "T")), None);
    }

    #[test]
    fn summary_sorts_children_by_title() {
        let tree = sample();
        let summary = TreeSummary::build(&tree);
        assert_eq!(summary.node_count, 5);
        assert_eq!(summary.event_count, 3);
        assert_eq!(summary.root.exemplar, None);
        assert_eq!(summary.root.total_item_count, 3);

        let titles: Vec<&str> = summary.root.children.iter().map(|c| c.title.as_str()).collect();
        assert_eq!(titles, vec!["Boom", "KeyError"]);
        assert_eq!(summary.nodes().len(), 5);

        let value = serde_json::to_value(&summary).unwrap();
        assert_eq!(value["root"]["name"], "project_1");
        assert!(value["root"].get("hash").is_none());
    }
}
