//! Serializer: graph → one fenced flow region, plus Markdown splicing.

use super::ast::{Edge, Graph, Node, NodeKind};
use super::parse::{FLOW_FENCE, is_flow_statement, strip_ref};

/// Render `graph` as a single ```` ```flow ```` region (no trailing newline).
///
/// Declaration lines come first, in graph order. A node that some edge
/// references is left to its edge lines when an implicit reference would
/// recreate it exactly; otherwise it is declared so label and kind survive.
#[must_use]
pub fn serialize(graph: &Graph) -> String {
    let referenced = graph.referenced_ids();

    let node_lines: Vec<String> = graph
        .nodes
        .iter()
        .filter(|n| !(referenced.contains(n.id.as_str()) && n.is_implicit()))
        .map(node_line)
        .collect();
    let edge_lines: Vec<String> = graph.edges.iter().map(edge_line).collect();

    let mut out = String::from(FLOW_FENCE);
    out.push('\n');
    for line in &node_lines {
        out.push_str(line);
        out.push('\n');
    }
    if !node_lines.is_empty() && !edge_lines.is_empty() {
        out.push('\n');
    }
    for line in &edge_lines {
        out.push_str(line);
        out.push('\n');
    }
    out.push_str("```");
    out
}

fn node_line(node: &Node) -> String {
    let (open, close) = node.kind.delimiters();
    format!("{open}{}{close} {}", node.id, node.label)
}

fn edge_line(edge: &Edge) -> String {
    let source = node_ref(&edge.source);
    let target = node_ref(&edge.target);
    match edge.label.as_deref() {
        Some(label) if !label.is_empty() => format!("{source} -> {target} : {label}"),
        _ => format!("{source} -> {target}"),
    }
}

/// Edge-line reference for `id`: the first delimiter form that reads back as
/// exactly `id`. Ids holding a `]` need one of the other forms.
fn node_ref(id: &str) -> String {
    const FORMS: [NodeKind; 4] = [NodeKind::Plain, NodeKind::Decision, NodeKind::Entry, NodeKind::Exit];

    FORMS
        .iter()
        .map(|kind| {
            let (open, close) = kind.delimiters();
            format!("{open}{id}{close}")
        })
        .find(|candidate| matches!(strip_ref(candidate), Some((_, parsed, "")) if parsed == id))
        .unwrap_or_else(|| format!("[{id}]"))
}

/// Replace the flow region(s) of `markdown` with the serialized `graph`.
///
/// The first region is replaced in place and any later regions are removed,
/// since the parser merges them into one graph. Prose outside the regions is
/// kept. Without a region the text is bare flow: its statement lines are
/// dropped and the block is appended after a blank line.
#[must_use]
pub fn splice_flow(markdown: &str, graph: &Graph) -> String {
    let block = serialize(graph);
    let mut out: Vec<&str> = Vec::new();
    let mut region: Vec<&str> = Vec::new();
    let mut open = false;
    let mut replaced = false;

    for line in markdown.lines() {
        let trimmed = line.trim();
        if !open {
            if trimmed == FLOW_FENCE {
                open = true;
                region.push(line);
            } else {
                out.push(line);
            }
        } else if trimmed.starts_with("```") {
            open = false;
            region.clear();
            if !replaced {
                out.push(&block);
                replaced = true;
            }
        } else {
            region.push(line);
        }
    }

    // A trailing unterminated fence takes the block when nothing else did;
    // otherwise it stays verbatim and the parser keeps ignoring it.
    if open {
        if replaced {
            out.extend(region);
        } else {
            out.push(&block);
            replaced = true;
        }
    }

    if !replaced {
        out.retain(|line| !is_flow_statement(line));
    }
    let mut text = out.join("\n");
    if !replaced {
        let trimmed_len = text.trim_end().len();
        text.truncate(trimmed_len);
        if !text.is_empty() {
            text.push_str("\n\n");
        }
        text.push_str(&block);
    }
    if markdown.ends_with('\n') || !replaced {
        text.push('\n');
    }
    text
}
