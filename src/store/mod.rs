//! Synchronization store: canonical text, derived graph, suggestions and versions.
//!
//! DESIGN
//! ======
//! `text` is the only writable field. `graph` and `layout` are re-derived
//! from it on every write by [`FlowStore::set_text`], and diagram edits are
//! serialized back into the text before anything else sees them. Every entry
//! point (typing, canvas edits, suggestions, restores, remote changes)
//! funnels through `set_text`, so readers never see a graph that disagrees
//! with the text.
//!
//! The store is a plain owned value driven through `&mut self`. Collaborator
//! calls are awaited inline, which orders any two actions on one store.
//! Subscribers observe the intermediate `Thinking` and saving states through
//! [`StoreEvent`]s. Collaborator failures never escape: storage errors are
//! logged and leave state untouched, suggestion errors become an error chat
//! entry plus [`AgentStatus::Error`].

pub mod history;
pub mod templates;

use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use tokio::time::Instant;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::config::StoreConfig;
use crate::error::describe;
use crate::flow::{
    ChangeSet, ChangeSource, Direction, Edge, Graph, Node, PositionedGraph, diff, impact, layout, parse, splice_flow,
};
use crate::services::realtime::RealtimeEvent;
use crate::services::storage::{Document, DocumentStorage, DocumentSummary, SaveRequest, now_rfc3339};
use crate::services::suggest::{
    METADATA_SYSTEM_PROMPT, METADATA_TEMPLATE_ID, Selection, Suggester, Suggestion, SuggestionContext,
    SuggestionRequest,
};
use history::{VersionEntry, VersionHistory};

const EVENT_CHANNEL_CAPACITY: usize = 64;
const VERSION_LABEL_MAX_CHARS: usize = 40;

pub const LABEL_BEFORE_AI_CHANGE: &str = "before AI change";
pub const LABEL_BEFORE_RESTORE: &str = "before restore";
pub const LABEL_BEFORE_REMOTE_CHANGE: &str = "before remote change";

// =============================================================================
// TYPES
// =============================================================================

/// Agent interaction status. Saving and connectivity are tracked separately.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AgentStatus {
    #[default]
    Idle,
    Thinking,
    Error,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    User,
    Agent,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatEntry {
    pub id: String,
    pub role: ChatRole,
    pub text: String,
    /// Set on agent entries that produced a suggestion.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub suggestion_id: Option<String>,
    pub timestamp: String,
}

impl ChatEntry {
    fn new(role: ChatRole, text: impl Into<String>) -> Self {
        Self { id: Uuid::new_v4().to_string(), role, text: text.into(), suggestion_id: None, timestamp: now_rfc3339() }
    }
}

/// Notifications sent after a state change has fully landed.
#[derive(Debug, Clone, PartialEq)]
pub enum StoreEvent {
    TextChanged { source: ChangeSource, changes: ChangeSet },
    StatusChanged(AgentStatus),
    SuggestionPending(Suggestion),
    SuggestionCleared,
    VersionAdded(VersionEntry),
    DocumentsChanged,
    DocumentOpened { document_id: Option<String> },
    SavingChanged(bool),
    ConnectionChanged(bool),
}

#[derive(Debug, Clone)]
struct Highlight {
    changes: ChangeSet,
    expires_at: Instant,
}

// =============================================================================
// STORE
// =============================================================================

pub struct FlowStore {
    storage: Arc<dyn DocumentStorage>,
    suggester: Arc<dyn Suggester>,
    highlight_for: Duration,
    events: broadcast::Sender<StoreEvent>,

    document_id: Option<String>,
    title: String,
    tags: Vec<String>,
    metadata: serde_json::Map<String, serde_json::Value>,
    text: String,
    saved_text: String,
    graph: Graph,
    layout: PositionedGraph,
    direction: Direction,
    highlight: Option<Highlight>,
    selection: Selection,

    status: AgentStatus,
    chat: Vec<ChatEntry>,
    pending: Option<Suggestion>,
    history: VersionHistory,

    documents: Vec<DocumentSummary>,
    is_saving: bool,
    is_connected: bool,
}

impl FlowStore {
    #[must_use]
    pub fn new(storage: Arc<dyn DocumentStorage>, suggester: Arc<dyn Suggester>, config: StoreConfig) -> Self {
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self {
            storage,
            suggester,
            highlight_for: config.highlight,
            events,
            document_id: None,
            title: String::new(),
            tags: Vec::new(),
            metadata: serde_json::Map::new(),
            text: String::new(),
            saved_text: String::new(),
            graph: Graph::default(),
            layout: layout(&Graph::default(), Direction::default()),
            direction: Direction::default(),
            highlight: None,
            selection: Selection::default(),
            status: AgentStatus::Idle,
            chat: Vec::new(),
            pending: None,
            history: VersionHistory::new(config.history_cap),
            documents: Vec::new(),
            is_saving: false,
            is_connected: false,
        }
    }

    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<StoreEvent> {
        self.events.subscribe()
    }

    fn emit(&self, event: StoreEvent) {
        // No subscribers is fine.
        let _ = self.events.send(event);
    }

    // ===== accessors =====

    #[must_use]
    pub fn text(&self) -> &str {
        &self.text
    }

    #[must_use]
    pub fn graph(&self) -> &Graph {
        &self.graph
    }

    #[must_use]
    pub fn layout(&self) -> &PositionedGraph {
        &self.layout
    }

    #[must_use]
    pub fn direction(&self) -> Direction {
        self.direction
    }

    /// Current change highlight, or `None` once its display window has passed.
    #[must_use]
    pub fn highlight(&self) -> Option<&ChangeSet> {
        self.highlight
            .as_ref()
            .filter(|h| Instant::now() < h.expires_at)
            .map(|h| &h.changes)
    }

    #[must_use]
    pub fn selection(&self) -> &Selection {
        &self.selection
    }

    #[must_use]
    pub fn status(&self) -> AgentStatus {
        self.status
    }

    #[must_use]
    pub fn chat(&self) -> &[ChatEntry] {
        &self.chat
    }

    #[must_use]
    pub fn pending_suggestion(&self) -> Option<&Suggestion> {
        self.pending.as_ref()
    }

    #[must_use]
    pub fn versions(&self) -> &VersionHistory {
        &self.history
    }

    #[must_use]
    pub fn documents(&self) -> &[DocumentSummary] {
        &self.documents
    }

    #[must_use]
    pub fn document_id(&self) -> Option<&str> {
        self.document_id.as_deref()
    }

    #[must_use]
    pub fn title(&self) -> &str {
        &self.title
    }

    #[must_use]
    pub fn tags(&self) -> &[String] {
        &self.tags
    }

    #[must_use]
    pub fn is_saving(&self) -> bool {
        self.is_saving
    }

    #[must_use]
    pub fn is_connected(&self) -> bool {
        self.is_connected
    }

    /// True when the text differs from what was last loaded or saved.
    #[must_use]
    pub fn is_dirty(&self) -> bool {
        self.text != self.saved_text
    }

    // ===== text =====

    /// Replace the canonical text and re-derive graph, layout and highlight.
    pub fn set_text(&mut self, text: impl Into<String>, source: ChangeSource) -> ChangeSet {
        let text = text.into();
        let next = parse(&text);
        let changes = diff(&self.graph, &next, source);

        self.layout = layout(&next, self.direction);
        self.graph = next;
        self.text = text;
        self.highlight = Some(Highlight { changes: changes.clone(), expires_at: Instant::now() + self.highlight_for });

        debug!(
            ?source,
            nodes = self.graph.nodes.len(),
            edges = self.graph.edges.len(),
            changed_nodes = changes.node_ids.len(),
            changed_edges = changes.edge_ids.len(),
            "store: text set"
        );
        self.emit(StoreEvent::TextChanged { source, changes: changes.clone() });
        changes
    }

    /// Write a locally edited diagram back through the text. Edges whose
    /// endpoints are not in `nodes` are dropped.
    pub fn apply_canvas_edit(&mut self, nodes: Vec<Node>, edges: Vec<Edge>) -> ChangeSet {
        let graph = Graph { nodes, edges }.without_dangling_edges();
        let text = splice_flow(&self.text, &graph);
        self.set_text(text, ChangeSource::User)
    }

    /// Drop the highlight once its window has passed. Returns true if one was dropped.
    pub fn clear_expired_highlight(&mut self) -> bool {
        match &self.highlight {
            Some(h) if Instant::now() >= h.expires_at => {
                self.highlight = None;
                true
            }
            _ => false,
        }
    }

    pub fn set_direction(&mut self, direction: Direction) {
        if self.direction != direction {
            self.direction = direction;
            self.layout = layout(&self.graph, direction);
        }
    }

    pub fn set_selection(&mut self, node_ids: Vec<String>, edge_ids: Vec<String>) {
        self.selection = Selection { node_ids, edge_ids };
    }

    pub fn set_title(&mut self, title: impl Into<String>) {
        self.title = title.into();
    }

    pub fn set_tags(&mut self, tags: Vec<String>) {
        self.tags = tags;
    }

    // ===== suggestions =====

    fn set_status(&mut self, status: AgentStatus) {
        if self.status != status {
            self.status = status;
            self.emit(StoreEvent::StatusChanged(status));
        }
    }

    /// Ask the suggestion collaborator for a proposal. Blank messages are
    /// ignored. On success the proposal becomes the pending suggestion; on
    /// failure an error entry is logged to the chat and any earlier pending
    /// suggestion is kept.
    pub async fn request_suggestion(&mut self, message: &str) -> bool {
        let message = message.trim();
        if message.is_empty() {
            return false;
        }

        self.chat.push(ChatEntry::new(ChatRole::User, message));
        self.set_status(AgentStatus::Thinking);

        let request = SuggestionRequest {
            document_id: self.document_id.clone(),
            message: message.to_string(),
            context: SuggestionContext::new(self.text.clone(), self.selection.clone(), self.metadata.clone()),
        };
        info!(document_id = self.document_id.as_deref().unwrap_or("-"), "store: requesting suggestion");

        match self.suggester.suggest(request).await {
            Ok(mut suggestion) => {
                if let Some(text) = &suggestion.proposed_text {
                    suggestion.impact = impact(&self.graph, &parse(text));
                }
                let mut entry = ChatEntry::new(ChatRole::Agent, suggestion.summary.clone());
                entry.suggestion_id = Some(suggestion.suggestion_id.clone());
                self.chat.push(entry);
                self.pending = Some(suggestion.clone());
                self.emit(StoreEvent::SuggestionPending(suggestion));
                self.set_status(AgentStatus::Idle);
                true
            }
            Err(e) => {
                warn!(error = %e, "store: suggestion failed");
                self.chat.push(ChatEntry::new(ChatRole::Error, describe(&e)));
                self.set_status(AgentStatus::Error);
                false
            }
        }
    }

    /// Apply the pending suggestion. Returns the resulting change set, or
    /// `None` when there was nothing to apply.
    pub fn apply_suggestion(&mut self) -> Option<ChangeSet> {
        let suggestion = self.pending.take()?;
        self.emit(StoreEvent::SuggestionCleared);
        let proposed = suggestion.proposed_text?;

        self.snapshot(LABEL_BEFORE_AI_CHANGE);
        let changes = self.set_text(proposed, ChangeSource::Agent);
        self.snapshot(version_label(&suggestion.summary));
        info!(suggestion_id = %suggestion.suggestion_id, "store: suggestion applied");
        Some(changes)
    }

    /// Drop the pending suggestion without touching text or history.
    pub fn discard_suggestion(&mut self) -> bool {
        if self.pending.take().is_some() {
            self.emit(StoreEvent::SuggestionCleared);
            true
        } else {
            false
        }
    }

    // ===== versions =====

    /// Record the current text in the version history.
    pub fn snapshot(&mut self, label: impl Into<String>) -> VersionEntry {
        let entry = self.history.push(label, &self.text);
        self.emit(StoreEvent::VersionAdded(entry.clone()));
        entry
    }

    /// Restore a version's text, snapshotting the current text first.
    pub fn restore_version(&mut self, id: &str) -> Option<ChangeSet> {
        let text = self.history.get(id)?.text.clone();
        self.snapshot(LABEL_BEFORE_RESTORE);
        Some(self.set_text(text, ChangeSource::User))
    }

    // ===== remote changes =====

    /// React to a remote change of `document_id`. Only the open document is
    /// reloaded; its remote text overwrites local text, with a safety
    /// snapshot first when local edits were unsaved.
    pub async fn on_remote_change(&mut self, document_id: &str) -> bool {
        if self.document_id.as_deref() != Some(document_id) {
            return false;
        }
        let doc = match self.storage.load(document_id).await {
            Ok(doc) => doc,
            Err(e) => {
                warn!(%document_id, error = %e, "store: remote reload failed");
                return false;
            }
        };
        if self.is_dirty() && doc.text != self.text {
            self.snapshot(LABEL_BEFORE_REMOTE_CHANGE);
        }
        info!(%document_id, "store: applying remote change");
        self.title = doc.title;
        self.tags = doc.tags;
        self.saved_text.clone_from(&doc.text);
        self.set_text(doc.text, ChangeSource::Remote);
        true
    }

    pub fn set_connected(&mut self, connected: bool) {
        if self.is_connected != connected {
            self.is_connected = connected;
            self.emit(StoreEvent::ConnectionChanged(connected));
        }
    }

    pub async fn handle_realtime(&mut self, event: RealtimeEvent) {
        match event {
            RealtimeEvent::Connected => self.set_connected(true),
            RealtimeEvent::Disconnected => self.set_connected(false),
            RealtimeEvent::DocumentChanged { document_id } => {
                self.on_remote_change(&document_id).await;
            }
        }
    }

    // ===== documents =====

    /// Re-list documents. A failure keeps the previous index.
    pub async fn refresh_documents(&mut self) -> bool {
        match self.storage.list().await {
            Ok(docs) => {
                self.documents = docs;
                self.emit(StoreEvent::DocumentsChanged);
                true
            }
            Err(e) => {
                warn!(error = %e, "store: list failed");
                false
            }
        }
    }

    /// Open a stored document. A failure keeps the current document.
    pub async fn load_document(&mut self, id: &str) -> bool {
        match self.storage.load(id).await {
            Ok(doc) => {
                info!(document_id = %doc.id, "store: document loaded");
                self.open(doc);
                true
            }
            Err(e) => {
                warn!(document_id = %id, error = %e, "store: load failed");
                false
            }
        }
    }

    /// Upsert the open document, then re-list. Returns the saved document.
    pub async fn save_document(&mut self) -> Option<Document> {
        let request = SaveRequest {
            id: self.document_id.clone(),
            title: self.title.clone(),
            text: self.text.clone(),
            tags: self.tags.clone(),
        };
        self.set_saving(true);
        let result = self.storage.save(request).await;
        self.set_saving(false);

        let doc = match result {
            Ok(doc) => doc,
            Err(e) => {
                warn!(error = %e, "store: save failed");
                return None;
            }
        };
        info!(document_id = %doc.id, "store: document saved");
        self.document_id = Some(doc.id.clone());
        self.title.clone_from(&doc.title);
        self.saved_text.clone_from(&doc.text);
        self.refresh_documents().await;
        Some(doc)
    }

    /// Delete a stored document, then re-list. Deleting the open document
    /// leaves an empty untitled one.
    pub async fn delete_document(&mut self, id: &str) -> bool {
        if let Err(e) = self.storage.delete(id).await {
            warn!(document_id = %id, error = %e, "store: delete failed");
            return false;
        }
        info!(document_id = %id, "store: document deleted");
        if self.document_id.as_deref() == Some(id) {
            self.new_document("");
        }
        self.refresh_documents().await;
        true
    }

    /// Start an unsaved empty document.
    pub fn new_document(&mut self, title: &str) {
        self.open(Document {
            id: String::new(),
            title: title.to_string(),
            text: String::new(),
            tags: Vec::new(),
            updated_at: String::new(),
        });
    }

    /// Start an unsaved document from a built-in template. The template's
    /// role prompt rides along as suggestion metadata.
    pub fn apply_template(&mut self, template_id: &str) -> bool {
        let Some(template) = templates::template(template_id) else {
            return false;
        };
        self.open(Document {
            id: String::new(),
            title: template.name.to_string(),
            text: template.text.to_string(),
            tags: Vec::new(),
            updated_at: String::new(),
        });
        self.metadata
            .insert(METADATA_TEMPLATE_ID.into(), template.id.into());
        self.metadata
            .insert(METADATA_SYSTEM_PROMPT.into(), template.system_prompt.into());
        // A template is new content, not a loaded baseline.
        self.saved_text.clear();
        true
    }

    /// Switch to `doc`. An empty id means an unsaved document. Pending
    /// suggestion, history, selection and highlight belong to the previous
    /// document and are dropped.
    fn open(&mut self, doc: Document) {
        if self.pending.take().is_some() {
            self.emit(StoreEvent::SuggestionCleared);
        }
        self.history.clear();
        self.metadata.clear();
        self.selection = Selection::default();
        self.set_status(AgentStatus::Idle);

        self.document_id = (!doc.id.is_empty()).then_some(doc.id);
        self.title = doc.title;
        self.tags = doc.tags;
        self.saved_text.clone_from(&doc.text);
        // Start from an empty graph so the whole document reads as new.
        self.graph = Graph::default();
        self.set_text(doc.text, ChangeSource::User);
        self.highlight = None;
        self.emit(StoreEvent::DocumentOpened { document_id: self.document_id.clone() });
    }

    fn set_saving(&mut self, saving: bool) {
        if self.is_saving != saving {
            self.is_saving = saving;
            self.emit(StoreEvent::SavingChanged(saving));
        }
    }
}

/// Version label for an applied suggestion: its summary, truncated.
fn version_label(summary: &str) -> String {
    let summary = summary.trim();
    if summary.is_empty() {
        return "AI change".to_string();
    }
    if summary.chars().count() <= VERSION_LABEL_MAX_CHARS {
        return summary.to_string();
    }
    let mut label: String = summary.chars().take(VERSION_LABEL_MAX_CHARS).collect();
    label.push('…');
    label
}

#[cfg(test)]
#[path = "mod_test.rs"]
mod tests;
