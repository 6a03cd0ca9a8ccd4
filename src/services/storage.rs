//! Storage collaborator: document list/load/save/delete.
//!
//! DESIGN
//! ======
//! The store only sees [`DocumentStorage`]. `MemoryStorage` backs tests and
//! the CLI; `HttpStorage` talks to the REST backend, whose wire field for the
//! canonical text is `markdown`. Both sort the index newest first.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;
use tokio::sync::RwLock;
use tracing::info;
use uuid::Uuid;

use super::api::{ApiClient, ApiError, path_of};
use crate::error::ErrorCode;

// =============================================================================
// TYPES
// =============================================================================

#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("document not found: {0}")]
    NotFound(String),
    #[error("storage backend error: {0}")]
    Backend(#[from] ApiError),
}

impl ErrorCode for StorageError {
    fn error_code(&self) -> &'static str {
        match self {
            Self::NotFound(_) => "E_DOCUMENT_NOT_FOUND",
            Self::Backend(e) => e.error_code(),
        }
    }

    fn retryable(&self) -> bool {
        matches!(self, Self::Backend(e) if e.retryable())
    }
}

/// A persisted document. `text` is the canonical text, stored verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Document {
    pub id: String,
    #[serde(default)]
    pub title: String,
    #[serde(rename = "markdown", alias = "text", default)]
    pub text: String,
    #[serde(default)]
    pub tags: Vec<String>,
    /// RFC 3339 timestamp of the last save.
    #[serde(default)]
    pub updated_at: String,
}

/// Index entry returned by `list`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentSummary {
    pub id: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub updated_at: String,
}

impl From<&Document> for DocumentSummary {
    fn from(doc: &Document) -> Self {
        Self { id: doc.id.clone(), title: doc.title.clone(), tags: doc.tags.clone(), updated_at: doc.updated_at.clone() }
    }
}

/// Upsert request. A missing `id` creates a new document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SaveRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub title: String,
    #[serde(rename = "markdown")]
    pub text: String,
    #[serde(default)]
    pub tags: Vec<String>,
}

#[async_trait::async_trait]
pub trait DocumentStorage: Send + Sync {
    /// Document index, most recently updated first.
    async fn list(&self) -> Result<Vec<DocumentSummary>, StorageError>;

    async fn load(&self, id: &str) -> Result<Document, StorageError>;

    /// Create or update by id.
    async fn save(&self, request: SaveRequest) -> Result<Document, StorageError>;

    async fn delete(&self, id: &str) -> Result<(), StorageError>;
}

pub(crate) fn now_rfc3339() -> String {
    OffsetDateTime::now_utc()
        .format(&Rfc3339)
        .unwrap_or_default()
}

pub(crate) fn sort_newest_first(docs: &mut [DocumentSummary]) {
    docs.sort_by(|a, b| {
        b.updated_at
            .cmp(&a.updated_at)
            .then_with(|| a.id.cmp(&b.id))
    });
}

fn normalize_title(title: &str) -> String {
    let title = title.trim();
    if title.is_empty() { "Untitled".to_string() } else { title.to_string() }
}

// =============================================================================
// MEMORY STORAGE
// =============================================================================

/// In-process storage keyed by id.
#[derive(Default)]
pub struct MemoryStorage {
    docs: RwLock<HashMap<String, Document>>,
}

impl MemoryStorage {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed with existing documents, kept exactly as given.
    #[must_use]
    pub fn with_documents(docs: impl IntoIterator<Item = Document>) -> Self {
        let docs = docs.into_iter().map(|d| (d.id.clone(), d)).collect();
        Self { docs: RwLock::new(docs) }
    }
}

#[async_trait::async_trait]
impl DocumentStorage for MemoryStorage {
    async fn list(&self) -> Result<Vec<DocumentSummary>, StorageError> {
        let docs = self.docs.read().await;
        let mut out: Vec<DocumentSummary> = docs.values().map(DocumentSummary::from).collect();
        sort_newest_first(&mut out);
        Ok(out)
    }

    async fn load(&self, id: &str) -> Result<Document, StorageError> {
        let docs = self.docs.read().await;
        docs.get(id)
            .cloned()
            .ok_or_else(|| StorageError::NotFound(id.to_string()))
    }

    async fn save(&self, request: SaveRequest) -> Result<Document, StorageError> {
        let id = request
            .id
            .filter(|id| !id.trim().is_empty())
            .unwrap_or_else(|| Uuid::new_v4().to_string());
        let doc = Document {
            id: id.clone(),
            title: normalize_title(&request.title),
            text: request.text,
            tags: request.tags,
            updated_at: now_rfc3339(),
        };
        self.docs.write().await.insert(id, doc.clone());
        Ok(doc)
    }

    async fn delete(&self, id: &str) -> Result<(), StorageError> {
        self.docs.write().await.remove(id);
        Ok(())
    }
}

// =============================================================================
// HTTP STORAGE
// =============================================================================

/// REST backend: `GET /list`, `GET /load/{id}`, `POST /save`, `DELETE /delete/{id}`.
pub struct HttpStorage {
    api: ApiClient,
}

/// Save replies carry at least `id` and `updatedAt`; fuller replies echo
/// the document.
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct SaveReply {
    id: String,
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    updated_at: Option<String>,
}

impl HttpStorage {
    #[must_use]
    pub fn new(api: ApiClient) -> Self {
        Self { api }
    }
}

#[async_trait::async_trait]
impl DocumentStorage for HttpStorage {
    async fn list(&self) -> Result<Vec<DocumentSummary>, StorageError> {
        let mut docs: Vec<DocumentSummary> = self.api.get("/list").await?;
        sort_newest_first(&mut docs);
        Ok(docs)
    }

    async fn load(&self, id: &str) -> Result<Document, StorageError> {
        match self.api.get::<Document>(&path_of(&["load", id])).await {
            Err(ApiError::Status { status: 404, .. }) => Err(StorageError::NotFound(id.to_string())),
            other => Ok(other?),
        }
    }

    async fn save(&self, mut request: SaveRequest) -> Result<Document, StorageError> {
        // The backend requires an id, so new documents get one here.
        let id = request
            .id
            .take()
            .filter(|id| !id.trim().is_empty())
            .unwrap_or_else(|| Uuid::new_v4().to_string());
        request.id = Some(id);
        request.title = normalize_title(&request.title);

        let reply: SaveReply = self.api.post("/save", &request).await?;
        info!(document_id = %reply.id, "storage: saved");
        Ok(Document {
            id: reply.id,
            title: reply.title.unwrap_or(request.title),
            text: request.text,
            tags: request.tags,
            updated_at: reply.updated_at.unwrap_or_else(now_rfc3339),
        })
    }

    async fn delete(&self, id: &str) -> Result<(), StorageError> {
        self.api.delete(&path_of(&["delete", id])).await?;
        Ok(())
    }
}

#[cfg(test)]
#[path = "storage_test.rs"]
mod tests;
