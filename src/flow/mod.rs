//! Flow text grammar, layered layout and graph diffing.
//!
//! Parses ```` ```flow ```` regions embedded in Markdown into a node/edge
//! graph, serializes graphs back into a region, positions nodes with a
//! layered layout, and diffs snapshots by id. Everything here is pure and
//! synchronous; the store composes it.

pub mod ast;
pub mod diff;
pub mod edit;
pub mod layout;
pub mod parse;
pub mod serialize;

pub use ast::{Edge, Graph, Node, NodeKind};
pub use diff::{ChangeSet, ChangeSource, Impact, diff, impact};
pub use edit::FlowEditor;
pub use layout::{Direction, PositionedGraph, PositionedNode, layout};
pub use parse::parse;
pub use serialize::{serialize, splice_flow};

#[cfg(test)]
#[path = "mod_test.rs"]
mod tests;
