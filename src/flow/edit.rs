//! Structured graph edits, used as the AI agent's tool surface.
//!
//! Each operation reports its outcome as a short sentence that is fed back
//! to the model as the tool result. Unknown ids are reported, never fatal.

use super::ast::{Edge, Graph, Node, NodeKind};

#[derive(Debug, Clone, Default)]
pub struct FlowEditor {
    graph: Graph,
}

impl FlowEditor {
    #[must_use]
    pub fn new(graph: Graph) -> Self {
        Self { graph }
    }

    #[must_use]
    pub fn graph(&self) -> &Graph {
        &self.graph
    }

    #[must_use]
    pub fn into_graph(self) -> Graph {
        self.graph
    }

    pub fn add_node(&mut self, id: &str, label: &str, kind: NodeKind) -> String {
        if self.graph.has_node(id) {
            return format!("Node '{id}' already exists.");
        }
        let label = if label.trim().is_empty() { id } else { label.trim() };
        self.graph.nodes.push(Node::new(id, label, kind));
        format!("Added {kind:?} node '{id}' ({label}).")
    }

    /// Remove a node together with every edge touching it.
    pub fn remove_node(&mut self, id: &str) -> String {
        let Some(idx) = self.graph.nodes.iter().position(|n| n.id == id) else {
            return format!("Node '{id}' not found.");
        };
        self.graph.nodes.remove(idx);
        let before = self.graph.edges.len();
        self.graph
            .edges
            .retain(|e| e.source != id && e.target != id);
        let removed = before - self.graph.edges.len();
        format!("Removed node '{id}' and {removed} connected edge(s).")
    }

    /// Connect two nodes, creating missing endpoints as implicit nodes. An
    /// existing edge for the same pair is relabelled instead of duplicated.
    pub fn add_edge(&mut self, source: &str, target: &str, label: Option<&str>) -> String {
        for id in [source, target] {
            if !self.graph.has_node(id) {
                self.graph.nodes.push(Node::implicit(id));
            }
        }

        let label = label
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .map(ToOwned::to_owned);
        let suffix = label
            .as_deref()
            .map_or(String::new(), |l| format!(" : {l}"));

        if let Some(existing) = self
            .graph
            .edges
            .iter_mut()
            .find(|e| e.source == source && e.target == target)
        {
            existing.label = label;
            return format!("Updated edge {source} -> {target}{suffix}.");
        }

        self.graph.edges.push(Edge::new(source, target, label));
        format!("Added edge {source} -> {target}{suffix}.")
    }

    pub fn remove_edge(&mut self, source: &str, target: &str) -> String {
        let before = self.graph.edges.len();
        self.graph
            .edges
            .retain(|e| !(e.source == source && e.target == target));
        if self.graph.edges.len() == before {
            format!("Edge {source} -> {target} not found.")
        } else {
            format!("Removed edge {source} -> {target}.")
        }
    }

    /// Replace the whole flow. Duplicate node ids and pairs keep their first
    /// occurrence; edges are re-keyed from their endpoints.
    pub fn replace(&mut self, nodes: Vec<Node>, edges: Vec<Edge>) -> String {
        let mut editor = Self::default();
        for node in nodes {
            if !editor.graph.has_node(&node.id) {
                editor.graph.nodes.push(node);
            }
        }
        for edge in edges {
            if editor.graph.edge_between(&edge.source, &edge.target).is_none() {
                editor.add_edge(&edge.source, &edge.target, edge.label.as_deref());
            }
        }
        self.graph = editor.graph;
        format!("Replaced flow: {} nodes, {} edges.", self.graph.nodes.len(), self.graph.edges.len())
    }
}
