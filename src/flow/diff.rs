//! Identity-keyed graph diff used for change highlighting and suggestion impact.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use super::ast::{Edge, Graph, Node};

/// Who caused a text change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChangeSource {
    User,
    Agent,
    Remote,
}

/// Ids added or changed between two snapshots, tagged with their source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangeSet {
    pub source: ChangeSource,
    pub node_ids: Vec<String>,
    pub edge_ids: Vec<String>,
}

impl ChangeSet {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.node_ids.is_empty() && self.edge_ids.is_empty()
    }

    #[must_use]
    pub fn contains_node(&self, id: &str) -> bool {
        self.node_ids.iter().any(|n| n == id)
    }

    #[must_use]
    pub fn contains_edge(&self, id: &str) -> bool {
        self.edge_ids.iter().any(|e| e == id)
    }
}

/// Net size change plus the changed ids, reported with a suggestion.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Impact {
    #[serde(alias = "nodesDelta")]
    pub node_delta: i64,
    #[serde(alias = "edgesDelta")]
    pub edge_delta: i64,
    #[serde(default)]
    pub changed_node_ids: Vec<String>,
    #[serde(default)]
    pub changed_edge_ids: Vec<String>,
}

/// Ids in `next` that are new or differ from `previous`, in `next` order.
#[must_use]
pub fn diff(previous: &Graph, next: &Graph, source: ChangeSource) -> ChangeSet {
    let old_nodes: HashMap<&str, &Node> = previous.nodes.iter().map(|n| (n.id.as_str(), n)).collect();
    let old_edges: HashMap<&str, &Edge> = previous.edges.iter().map(|e| (e.id.as_str(), e)).collect();

    let node_ids = next
        .nodes
        .iter()
        .filter(|n| {
            old_nodes
                .get(n.id.as_str())
                .map_or(true, |old| old.label != n.label || old.kind != n.kind)
        })
        .map(|n| n.id.clone())
        .collect();

    let edge_ids = next
        .edges
        .iter()
        .filter(|e| {
            old_edges.get(e.id.as_str()).map_or(true, |old| {
                old.label != e.label || old.source != e.source || old.target != e.target
            })
        })
        .map(|e| e.id.clone())
        .collect();

    ChangeSet { source, node_ids, edge_ids }
}

/// Net count differences (`next - previous`), not the size of the changed set.
#[must_use]
pub fn impact(previous: &Graph, next: &Graph) -> Impact {
    let changes = diff(previous, next, ChangeSource::Agent);
    Impact {
        node_delta: count(next.nodes.len()) - count(previous.nodes.len()),
        edge_delta: count(next.edges.len()) - count(previous.edges.len()),
        changed_node_ids: changes.node_ids,
        changed_edge_ids: changes.edge_ids,
    }
}

fn count(len: usize) -> i64 {
    i64::try_from(len).unwrap_or(i64::MAX)
}
