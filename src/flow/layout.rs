//! Layered layout: rank nodes by longest path from the sources, order each
//! rank to reduce crossings, then assign top-left anchored coordinates.
//!
//! The result is a pure function of the graph and direction. Edges whose
//! endpoints are not in the node set are dropped before anything else.

use std::collections::{HashMap, VecDeque};

use serde::{Deserialize, Serialize};

use super::ast::{Edge, Graph, Node, NodeKind};

// Node footprint (logical pixels). Must match what the renderer measures.
pub const NODE_WIDTH: f64 = 172.0;
pub const NODE_HEIGHT: f64 = 40.0;
pub const DECISION_WIDTH: f64 = 180.0;
pub const DECISION_HEIGHT: f64 = 100.0;

const RANK_SEP: f64 = 80.0;
const NODE_SEP: f64 = 40.0;
const ORDERING_SWEEPS: usize = 4;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    #[default]
    TopToBottom,
    LeftToRight,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PositionedNode {
    #[serde(flatten)]
    pub node: Node,
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
    pub rank: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PositionedGraph {
    pub direction: Direction,
    pub nodes: Vec<PositionedNode>,
    /// Edges that survived the dangling-endpoint filter.
    pub edges: Vec<Edge>,
    pub width: f64,
    pub height: f64,
}

impl PositionedGraph {
    #[must_use]
    pub fn position(&self, id: &str) -> Option<(f64, f64)> {
        self.nodes
            .iter()
            .find(|n| n.node.id == id)
            .map(|n| (n.x, n.y))
    }
}

/// Footprint assumed for a node of the given kind.
#[must_use]
pub fn node_size(kind: NodeKind) -> (f64, f64) {
    match kind {
        NodeKind::Decision => (DECISION_WIDTH, DECISION_HEIGHT),
        NodeKind::Plain | NodeKind::Entry | NodeKind::Exit => (NODE_WIDTH, NODE_HEIGHT),
    }
}

/// Position every node of `graph`. Never fails; isolated nodes land on rank 0.
#[must_use]
pub fn layout(graph: &Graph, direction: Direction) -> PositionedGraph {
    let count = graph.nodes.len();
    if count == 0 {
        return PositionedGraph { direction, ..PositionedGraph::default() };
    }

    let mut index: HashMap<&str, usize> = HashMap::with_capacity(count);
    for (i, node) in graph.nodes.iter().enumerate() {
        index.entry(node.id.as_str()).or_insert(i);
    }

    let edges: Vec<Edge> = graph
        .edges
        .iter()
        .filter(|e| index.contains_key(e.source.as_str()) && index.contains_key(e.target.as_str()))
        .cloned()
        .collect();
    let links: Vec<(usize, usize)> = edges
        .iter()
        .map(|e| (index[e.source.as_str()], index[e.target.as_str()]))
        .filter(|(s, t)| s != t)
        .collect();

    let links = acyclic_links(count, &links);
    let ranks = longest_path_ranks(count, &links);
    let layers = order_layers(&ranks, &links);

    let sizes: Vec<(f64, f64)> = graph.nodes.iter().map(|n| node_size(n.kind)).collect();
    let placed = assign_coordinates(&layers, &sizes, direction);

    let nodes: Vec<PositionedNode> = graph
        .nodes
        .iter()
        .enumerate()
        .map(|(i, node)| PositionedNode {
            node: node.clone(),
            x: placed[i].0,
            y: placed[i].1,
            width: sizes[i].0,
            height: sizes[i].1,
            rank: ranks[i],
        })
        .collect();

    let width = nodes.iter().map(|n| n.x + n.width).fold(0.0, f64::max);
    let height = nodes.iter().map(|n| n.y + n.height).fold(0.0, f64::max);

    PositionedGraph { direction, nodes, edges, width, height }
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Visit {
    New,
    Active,
    Done,
}

/// Drop back edges found by a depth-first walk in node order.
fn acyclic_links(count: usize, links: &[(usize, usize)]) -> Vec<(usize, usize)> {
    let mut adjacency: Vec<Vec<usize>> = vec![Vec::new(); count];
    for (i, &(source, _)) in links.iter().enumerate() {
        adjacency[source].push(i);
    }

    let mut state = vec![Visit::New; count];
    let mut back = vec![false; links.len()];

    for root in 0..count {
        if state[root] != Visit::New {
            continue;
        }
        state[root] = Visit::Active;
        let mut stack = vec![(root, 0usize)];

        while let Some(frame) = stack.last_mut() {
            let (node, cursor) = *frame;
            if let Some(&link) = adjacency[node].get(cursor) {
                frame.1 += 1;
                let target = links[link].1;
                match state[target] {
                    Visit::New => {
                        state[target] = Visit::Active;
                        stack.push((target, 0));
                    }
                    Visit::Active => back[link] = true,
                    Visit::Done => {}
                }
            } else {
                state[node] = Visit::Done;
                stack.pop();
            }
        }
    }

    links
        .iter()
        .zip(back)
        .filter(|(_, is_back)| !is_back)
        .map(|(link, _)| *link)
        .collect()
}

/// Rank = length of the longest path from any source. Requires a DAG.
fn longest_path_ranks(count: usize, links: &[(usize, usize)]) -> Vec<usize> {
    let mut outgoing: Vec<Vec<usize>> = vec![Vec::new(); count];
    let mut indegree = vec![0usize; count];
    for &(source, target) in links {
        outgoing[source].push(target);
        indegree[target] += 1;
    }

    let mut ranks = vec![0usize; count];
    let mut queue: VecDeque<usize> = (0..count).filter(|&i| indegree[i] == 0).collect();
    while let Some(node) = queue.pop_front() {
        for &next in &outgoing[node] {
            ranks[next] = ranks[next].max(ranks[node] + 1);
            indegree[next] -= 1;
            if indegree[next] == 0 {
                queue.push_back(next);
            }
        }
    }
    ranks
}

/// Group nodes by rank, then run barycenter sweeps (down, up, ...) to reduce crossings.
fn order_layers(ranks: &[usize], links: &[(usize, usize)]) -> Vec<Vec<usize>> {
    let depth = ranks.iter().copied().max().unwrap_or(0) + 1;
    let mut layers: Vec<Vec<usize>> = vec![Vec::new(); depth];
    for (node, &rank) in ranks.iter().enumerate() {
        layers[rank].push(node);
    }

    let mut neighbors: Vec<Vec<usize>> = vec![Vec::new(); ranks.len()];
    for &(source, target) in links {
        neighbors[source].push(target);
        neighbors[target].push(source);
    }

    let mut order = vec![0usize; ranks.len()];
    let sync_order = |layers: &[Vec<usize>], order: &mut [usize]| {
        for layer in layers {
            for (i, &node) in layer.iter().enumerate() {
                order[node] = i;
            }
        }
    };
    sync_order(&layers, &mut order);

    for sweep in 0..ORDERING_SWEEPS {
        let downward = sweep % 2 == 0;
        let rank_order: Vec<usize> = if downward { (1..depth).collect() } else { (0..depth.saturating_sub(1)).rev().collect() };

        for rank in rank_order {
            let keys: HashMap<usize, f64> = layers[rank]
                .iter()
                .map(|&node| {
                    let fixed: Vec<usize> = neighbors[node]
                        .iter()
                        .copied()
                        .filter(|&n| if downward { ranks[n] < rank } else { ranks[n] > rank })
                        .collect();
                    #[allow(clippy::cast_precision_loss)]
                    let key = if fixed.is_empty() {
                        order[node] as f64
                    } else {
                        fixed.iter().map(|&n| order[n] as f64).sum::<f64>() / fixed.len() as f64
                    };
                    (node, key)
                })
                .collect();
            layers[rank].sort_by(|a, b| keys[a].total_cmp(&keys[b]));
            for (i, &node) in layers[rank].iter().enumerate() {
                order[node] = i;
            }
        }
    }

    layers
}

/// Top-left positions per node index. Ranks advance along the main axis and
/// each rank is centered on the cross axis.
fn assign_coordinates(layers: &[Vec<usize>], sizes: &[(f64, f64)], direction: Direction) -> Vec<(f64, f64)> {
    // (main, cross) extent of a node for this direction.
    let extent = |node: usize| -> (f64, f64) {
        let (w, h) = sizes[node];
        match direction {
            Direction::TopToBottom => (h, w),
            Direction::LeftToRight => (w, h),
        }
    };

    let thickness: Vec<f64> = layers
        .iter()
        .map(|layer| layer.iter().map(|&n| extent(n).0).fold(0.0, f64::max))
        .collect();
    let spans: Vec<f64> = layers
        .iter()
        .map(|layer| {
            let total: f64 = layer.iter().map(|&n| extent(n).1).sum();
            #[allow(clippy::cast_precision_loss)]
            let gaps = layer.len().saturating_sub(1) as f64 * NODE_SEP;
            total + gaps
        })
        .collect();
    let widest = spans.iter().copied().fold(0.0, f64::max);

    let mut placed = vec![(0.0, 0.0); sizes.len()];
    let mut main = 0.0;
    for (rank, layer) in layers.iter().enumerate() {
        let mut cross = (widest - spans[rank]) / 2.0;
        for &node in layer {
            let (node_main, node_cross) = extent(node);
            let main_pos = main + (thickness[rank] - node_main) / 2.0;
            placed[node] = match direction {
                Direction::TopToBottom => (cross, main_pos),
                Direction::LeftToRight => (main_pos, cross),
            };
            cross += node_cross + NODE_SEP;
        }
        main += thickness[rank] + RANK_SEP;
    }
    placed
}
