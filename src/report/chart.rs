//! Chart-ready data: nested (d3 tree) and flat (plotly sunburst) shapes.

#![allow(missing_docs)]

use serde::Serialize;

use crate::grouping::node::NodeId;
use crate::grouping::tree::GroupTree;
use crate::ingest::event::EventItem;
use crate::report::summary::{node_path, node_title, relative_url};

/// Characters of a node name appended to flat-chart labels.
const SHORT_NAME_LEN: usize = 8;

/// One node of a nested tree chart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TreeChartNode {
    pub name: String,
    /// Page of this node relative to the chart's top node; `None` at the top.
    pub href: Option<String>,
    pub item_count: usize,
    pub children: Vec<TreeChartNode>,
}

/// Parallel arrays for a sunburst chart.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct FlatChart {
    pub ids: Vec<String>,
    pub labels: Vec<String>,
    pub parents: Vec<String>,
    pub values: Vec<usize>,
}

/// Nested chart for the whole tree.
pub fn chart_tree(tree: &GroupTree<EventItem>) -> TreeChartNode {
    chart_node(tree, NodeId::ROOT)
}

/// Nested chart rooted at `top`, as shown on that node's own page.
pub fn chart_node(tree: &GroupTree<EventItem>, top: NodeId) -> TreeChartNode {
    build(tree, top, &mut Vec::new())
}

fn build(tree: &GroupTree<EventItem>, id: NodeId, ancestors: &mut Vec<NodeId>) -> TreeChartNode {
    let node = tree.node(id);
    let href = (!ancestors.is_empty())
        .then(|| relative_url(tree, ancestors.iter().skip(1).copied(), id));

    ancestors.push(id);
    let mut children: Vec<TreeChartNode> = node
        .children()
        .iter()
        .map(|&child| build(tree, child, ancestors))
        .collect();
    ancestors.pop();
    children.sort_by(|a, b| a.name.cmp(&b.name));

    TreeChartNode {
        name: node
            .label()
            .map_or_else(|| node_title(tree, id).to_string(), str::to_string),
        href,
        item_count: node.item_count(),
        children,
    }
}

/// Flat sunburst arrays in depth-first order.
pub fn chart_flat(tree: &GroupTree<EventItem>) -> FlatChart {
    let mut chart = FlatChart::default();
    let mut paths: Vec<String> = Vec::new();

    for entry in tree.walk() {
        let path = node_path(tree, &entry);
        paths.truncate(entry.depth());
        let parent = paths.last().cloned().unwrap_or_default();

        chart.labels.push(flat_label(tree, entry.id));
        chart.parents.push(parent);
        chart.values.push(entry.node.item_count());
        chart.ids.push(path.clone());
        paths.push(path);
    }
    chart
}

fn flat_label(tree: &GroupTree<EventItem>, id: NodeId) -> String {
    let node = tree.node(id);
    if id == NodeId::ROOT {
        return node.name().to_string();
    }
    match tree.exemplar_of(node) {
        Some(item) => {
            let short: String = node.name().chars().take(SHORT_NAME_LEN).collect();
            format!("{} {short}", item.title)
        }
        None => node.name().to_string(),
    }
}
