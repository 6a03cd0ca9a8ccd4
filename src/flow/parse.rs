//! Line-oriented parser for flow regions embedded in Markdown.
//!
//! Only lines inside ```` ```flow ```` fenced regions are read. Regions are
//! merged in document order, so ids declared in one region are visible in
//! the next. A document without any flow fence is bare flow text and is read
//! as a single region. The grammar is permissive: anything that is not a
//! node or an edge line is skipped.

use std::collections::HashSet;

use super::ast::{Edge, Graph, Node, NodeKind};

/// Opening fence line of a flow region.
pub const FLOW_FENCE: &str = "```flow";
const FENCE: &str = "```";

/// Parse every flow region in `text` into a single graph. Never fails.
#[must_use]
pub fn parse(text: &str) -> Graph {
    let mut builder = GraphBuilder::default();
    for region in flow_regions(text) {
        for line in region {
            parse_line(line, &mut builder);
        }
    }
    builder.graph
}

/// Collect the lines of each closed flow region. An unterminated region is
/// dropped. Text with no opening fence at all is one region.
pub(crate) fn flow_regions(text: &str) -> Vec<Vec<&str>> {
    let mut regions = Vec::new();
    let mut current: Vec<&str> = Vec::new();
    let mut open = false;
    let mut fenced = false;

    for line in text.lines() {
        let trimmed = line.trim();
        if !open {
            open = trimmed == FLOW_FENCE;
            fenced |= open;
        } else if trimmed.starts_with(FENCE) {
            regions.push(std::mem::take(&mut current));
            open = false;
        } else {
            current.push(line);
        }
    }

    if !fenced {
        regions.push(text.lines().collect());
    }
    regions
}

/// True when `line` is a node or edge statement.
pub(crate) fn is_flow_statement(line: &str) -> bool {
    let line = line.trim();
    !line.is_empty() && (parse_edge_line(line).is_some() || parse_node_line(line).is_some())
}

fn parse_line(line: &str, builder: &mut GraphBuilder) {
    let line = line.trim();
    if line.is_empty() {
        return;
    }

    // Edge lines first: `[a] -> [b] : label` would otherwise read as node `a`.
    if let Some((source, target, label)) = parse_edge_line(line) {
        builder.connect(source, target, label);
        return;
    }

    if let Some((kind, id, label)) = parse_node_line(line) {
        let label = if label.is_empty() { id } else { label };
        builder.register_node(Node::new(id, label, kind));
    }
}

/// `<ref> -> <ref>` with an optional `: label`. Any delimiter form is accepted
/// as a reference; it never declares the node's kind.
fn parse_edge_line(line: &str) -> Option<(&str, &str, Option<String>)> {
    let (left, right) = line.split_once("->")?;

    let (_, source, rest) = strip_ref(left.trim())?;
    if !rest.trim().is_empty() {
        return None;
    }

    let (_, target, rest) = strip_ref(right.trim())?;
    let rest = rest.trim();
    let label = if rest.is_empty() {
        None
    } else {
        let text = rest.strip_prefix(':')?.trim();
        (!text.is_empty()).then(|| text.to_owned())
    };

    Some((source, target, label))
}

/// `<delimited id>` optionally followed by whitespace and a label.
fn parse_node_line(line: &str) -> Option<(NodeKind, &str, &str)> {
    let (kind, id, rest) = strip_ref(line)?;
    if !rest.is_empty() && !rest.starts_with(char::is_whitespace) {
        return None;
    }
    Some((kind, id, rest.trim()))
}

/// Strip a delimited id from the start of `s`, returning the kind, the id and the remainder.
pub(super) fn strip_ref(s: &str) -> Option<(NodeKind, &str, &str)> {
    // Longest delimiters first so `[[a]]` is not read as `[` + `[a`.
    const FORMS: [NodeKind; 4] = [NodeKind::Entry, NodeKind::Exit, NodeKind::Decision, NodeKind::Plain];

    for kind in FORMS {
        let (open, close) = kind.delimiters();
        let Some(body) = s.strip_prefix(open) else {
            continue;
        };
        let Some(end) = body.find(close) else {
            continue;
        };
        let id = body[..end].trim();
        if id.is_empty() {
            continue;
        }
        return Some((kind, id, &body[end + close.len()..]));
    }

    None
}

/// Accumulates nodes and edges in first-encounter order.
#[derive(Default)]
struct GraphBuilder {
    graph: Graph,
    node_ids: HashSet<String>,
    pairs: HashSet<(String, String)>,
}

impl GraphBuilder {
    /// First declaration wins; later ones are ignored.
    fn register_node(&mut self, node: Node) {
        if self.node_ids.insert(node.id.clone()) {
            self.graph.nodes.push(node);
        }
    }

    fn ensure_node(&mut self, id: &str) {
        if !self.node_ids.contains(id) {
            self.register_node(Node::implicit(id));
        }
    }

    /// One edge per ordered pair; the first occurrence wins.
    fn connect(&mut self, source: &str, target: &str, label: Option<String>) {
        self.ensure_node(source);
        self.ensure_node(target);
        if self.pairs.insert((source.to_owned(), target.to_owned())) {
            self.graph.edges.push(Edge::new(source, target, label));
        }
    }
}
