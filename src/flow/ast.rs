//! Graph model derived from flow text.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

/// Node shape, selected by the delimiter pair in a node declaration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeKind {
    /// `[id]`: rectangle.
    #[default]
    Plain,
    /// `[[id]]`: rounded start/input node.
    Entry,
    /// `((id))`: circular end/output node.
    Exit,
    /// `{id}`: diamond.
    Decision,
}

impl NodeKind {
    /// Opening and closing delimiters used in node declarations.
    #[must_use]
    pub fn delimiters(self) -> (&'static str, &'static str) {
        match self {
            Self::Plain => ("[", "]"),
            Self::Entry => ("[[", "]]"),
            Self::Exit => ("((", "))"),
            Self::Decision => ("{", "}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Node {
    pub id: String,
    pub label: String,
    pub kind: NodeKind,
}

impl Node {
    #[must_use]
    pub fn new(id: impl Into<String>, label: impl Into<String>, kind: NodeKind) -> Self {
        Self { id: id.into(), label: label.into(), kind }
    }

    /// A node created by reference only: Plain, labelled with its id.
    #[must_use]
    pub fn implicit(id: impl Into<String>) -> Self {
        let id = id.into();
        Self { label: id.clone(), id, kind: NodeKind::Plain }
    }

    /// True when an edge reference alone would recreate this node.
    #[must_use]
    pub fn is_implicit(&self) -> bool {
        self.kind == NodeKind::Plain && self.label == self.id
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Edge {
    pub id: String,
    pub source: String,
    pub target: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
}

impl Edge {
    #[must_use]
    pub fn new(source: impl Into<String>, target: impl Into<String>, label: Option<String>) -> Self {
        let source = source.into();
        let target = target.into();
        Self { id: edge_id(&source, &target), source, target, label }
    }
}

/// Identity of the single edge allowed between an ordered pair of nodes.
///
/// The source length is encoded up front, so ids stay distinct for every
/// ordered pair even when node ids contain the separator.
#[must_use]
pub fn edge_id(source: &str, target: &str) -> String {
    format!("e{}-{source}-{target}", source.len())
}

/// Ordered nodes and edges. Order is first-encounter order in the source text.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Graph {
    pub nodes: Vec<Node>,
    pub edges: Vec<Edge>,
}

impl Graph {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty() && self.edges.is_empty()
    }

    #[must_use]
    pub fn node(&self, id: &str) -> Option<&Node> {
        self.nodes.iter().find(|n| n.id == id)
    }

    #[must_use]
    pub fn has_node(&self, id: &str) -> bool {
        self.node(id).is_some()
    }

    #[must_use]
    pub fn edge_between(&self, source: &str, target: &str) -> Option<&Edge> {
        self.edges
            .iter()
            .find(|e| e.source == source && e.target == target)
    }

    /// Ids of every node that appears as an endpoint of some edge.
    #[must_use]
    pub fn referenced_ids(&self) -> HashSet<&str> {
        self.edges
            .iter()
            .flat_map(|e| [e.source.as_str(), e.target.as_str()])
            .collect()
    }

    /// Drop edges whose endpoints are not declared nodes.
    #[must_use]
    pub fn without_dangling_edges(mut self) -> Self {
        let ids: HashSet<String> = self.nodes.iter().map(|n| n.id.clone()).collect();
        self.edges
            .retain(|e| ids.contains(&e.source) && ids.contains(&e.target));
        self
    }
}
