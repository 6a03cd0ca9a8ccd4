//! Bounded version history.

use std::collections::VecDeque;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::flow::parse;
use crate::services::storage::now_rfc3339;

/// Immutable snapshot of canonical text plus its graph size.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VersionEntry {
    pub id: String,
    pub label: String,
    pub timestamp: String,
    pub text: String,
    pub node_count: usize,
    pub edge_count: usize,
}

/// Oldest-first list of snapshots. Pushing beyond `cap` silently evicts the
/// oldest entry.
#[derive(Debug, Clone)]
pub struct VersionHistory {
    entries: VecDeque<VersionEntry>,
    cap: usize,
}

impl VersionHistory {
    #[must_use]
    pub fn new(cap: usize) -> Self {
        let cap = cap.max(1);
        Self { entries: VecDeque::with_capacity(cap), cap }
    }

    /// Record `text` under `label` and return the new entry.
    pub fn push(&mut self, label: impl Into<String>, text: &str) -> VersionEntry {
        let graph = parse(text);
        let entry = VersionEntry {
            id: Uuid::new_v4().to_string(),
            label: label.into(),
            timestamp: now_rfc3339(),
            text: text.to_string(),
            node_count: graph.nodes.len(),
            edge_count: graph.edges.len(),
        };
        while self.entries.len() >= self.cap {
            self.entries.pop_front();
        }
        self.entries.push_back(entry.clone());
        entry
    }

    #[must_use]
    pub fn get(&self, id: &str) -> Option<&VersionEntry> {
        self.entries.iter().find(|e| e.id == id)
    }

    #[must_use]
    pub fn latest(&self) -> Option<&VersionEntry> {
        self.entries.back()
    }

    pub fn iter(&self) -> impl DoubleEndedIterator<Item = &VersionEntry> {
        self.entries.iter()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    #[must_use]
    pub fn cap(&self) -> usize {
        self.cap
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}
