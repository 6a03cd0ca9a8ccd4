//! AI suggestion collaborator contract.
//!
//! A request carries the current text and selection; the response is a
//! full-text proposal with a summary and impact. Field names on the wire
//! follow the backend (`noteId`, `markdown`, `impacts`).

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::api::{ApiClient, ApiError};
use crate::error::ErrorCode;
use crate::flow::Impact;
use crate::llm::types::LlmError;

#[derive(Debug, thiserror::Error)]
pub enum SuggestError {
    #[error("message is empty")]
    EmptyMessage,
    #[error("suggestion service error: {0}")]
    Api(#[from] ApiError),
    #[error("LLM error: {0}")]
    Llm(#[from] LlmError),
    #[error("agent returned no usable answer")]
    NoAnswer,
}

impl ErrorCode for SuggestError {
    fn error_code(&self) -> &'static str {
        match self {
            Self::EmptyMessage => "E_EMPTY_MESSAGE",
            Self::Api(e) => e.error_code(),
            Self::Llm(_) => "E_LLM_ERROR",
            Self::NoAnswer => "E_NO_ANSWER",
        }
    }

    fn retryable(&self) -> bool {
        match self {
            Self::Api(e) => e.retryable(),
            Self::Llm(e) => e.retryable(),
            Self::EmptyMessage | Self::NoAnswer => false,
        }
    }
}

/// Selected diagram entities, sent as context.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Selection {
    #[serde(default)]
    pub node_ids: Vec<String>,
    #[serde(default)]
    pub edge_ids: Vec<String>,
}

impl Selection {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.node_ids.is_empty() && self.edge_ids.is_empty()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SuggestionContext {
    #[serde(rename = "markdown")]
    pub text: String,
    #[serde(default)]
    pub selection: Selection,
    /// Free-form hints, e.g. `templateId` and a template `systemPrompt`.
    #[serde(default)]
    pub metadata: serde_json::Map<String, serde_json::Value>,
    /// Template hints, also sent at the top level where the backend agent reads them.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub template_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub system_prompt: Option<String>,
}

impl SuggestionContext {
    /// Build a context, lifting `templateId` and `systemPrompt` out of `metadata`.
    #[must_use]
    pub fn new(text: String, selection: Selection, metadata: serde_json::Map<String, serde_json::Value>) -> Self {
        let mut context = Self { text, selection, metadata, template_id: None, system_prompt: None };
        context.template_id = context.metadata_str(METADATA_TEMPLATE_ID).map(str::to_owned);
        context.system_prompt = context.metadata_str(METADATA_SYSTEM_PROMPT).map(str::to_owned);
        context
    }

    #[must_use]
    pub fn metadata_str(&self, key: &str) -> Option<&str> {
        self.metadata
            .get(key)
            .and_then(serde_json::Value::as_str)
            .map(str::trim)
            .filter(|v| !v.is_empty())
    }

    #[must_use]
    pub fn template_id(&self) -> Option<&str> {
        non_blank(self.template_id.as_deref()).or_else(|| self.metadata_str(METADATA_TEMPLATE_ID))
    }

    #[must_use]
    pub fn system_prompt(&self) -> Option<&str> {
        non_blank(self.system_prompt.as_deref()).or_else(|| self.metadata_str(METADATA_SYSTEM_PROMPT))
    }
}

pub const METADATA_TEMPLATE_ID: &str = "templateId";
pub const METADATA_SYSTEM_PROMPT: &str = "systemPrompt";

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SuggestionRequest {
    #[serde(rename = "noteId", default, skip_serializing_if = "Option::is_none")]
    pub document_id: Option<String>,
    pub message: String,
    pub context: SuggestionContext,
}

/// One tool call made by the agent while producing a suggestion.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentTraceEntry {
    pub seq: usize,
    pub tool: String,
    pub args: serde_json::Value,
    pub result: String,
    pub duration_ms: u64,
}

fn new_suggestion_id() -> String {
    Uuid::new_v4().to_string()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Suggestion {
    #[serde(default = "new_suggestion_id")]
    pub suggestion_id: String,
    /// Full replacement text. `None` means nothing to apply.
    #[serde(rename = "markdown", default, skip_serializing_if = "Option::is_none")]
    pub proposed_text: Option<String>,
    #[serde(default)]
    pub summary: String,
    #[serde(rename = "impacts", alias = "impact", default)]
    pub impact: Impact,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub agent_trace: Vec<AgentTraceEntry>,
    #[serde(default)]
    pub execution_ms: u64,
}

impl Suggestion {
    #[must_use]
    pub fn new(proposed_text: Option<String>, summary: impl Into<String>) -> Self {
        Self {
            suggestion_id: new_suggestion_id(),
            proposed_text,
            summary: summary.into(),
            impact: Impact::default(),
            agent_trace: Vec::new(),
            execution_ms: 0,
        }
    }
}

#[async_trait::async_trait]
pub trait Suggester: Send + Sync {
    /// # Errors
    ///
    /// Returns a [`SuggestError`] when no suggestion could be produced. The
    /// caller does not retry.
    async fn suggest(&self, request: SuggestionRequest) -> Result<Suggestion, SuggestError>;
}

/// Remote suggestion service at `POST /agent/chat`.
pub struct HttpSuggester {
    api: ApiClient,
}

impl HttpSuggester {
    #[must_use]
    pub fn new(api: ApiClient) -> Self {
        Self { api }
    }
}

#[async_trait::async_trait]
impl Suggester for HttpSuggester {
    async fn suggest(&self, request: SuggestionRequest) -> Result<Suggestion, SuggestError> {
        if request.message.trim().is_empty() {
            return Err(SuggestError::EmptyMessage);
        }
        Ok(self.api.post("/agent/chat", &request).await?)
    }
}

#[cfg(test)]
#[path = "suggest_test.rs"]
mod tests;
