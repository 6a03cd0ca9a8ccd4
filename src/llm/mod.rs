//! LLM: chat adapter for the AI flow agent.
//!
//! DESIGN
//! ======
//! Configuration comes from environment variables. `OpenAI` and Azure `OpenAI`
//! share the chat-completions wire format, so one client covers both; the
//! agent only sees the [`LlmChat`] trait and is tested against a mock.

pub mod config;
pub mod openai;
pub mod tools;
pub mod types;

use config::LlmConfig;
pub use types::LlmChat;
use types::{ChatResponse, LlmError, Message, Tool};

/// Concrete LLM client configured by [`LlmClient::from_env`].
pub struct LlmClient {
    inner: openai::OpenAiClient,
    model: String,
}

impl LlmClient {
    /// Build an LLM client from environment variables.
    ///
    /// # Errors
    ///
    /// Returns an error if no provider key is set or the HTTP client fails.
    pub fn from_env() -> Result<Self, LlmError> {
        Self::from_config(&LlmConfig::from_env()?)
    }

    /// # Errors
    ///
    /// Returns an error if the HTTP client fails to build.
    pub fn from_config(config: &LlmConfig) -> Result<Self, LlmError> {
        Ok(Self { inner: openai::OpenAiClient::new(config)?, model: config.model.clone() })
    }

    /// Model name, or Azure deployment name.
    #[must_use]
    pub fn model(&self) -> &str {
        &self.model
    }
}

#[async_trait::async_trait]
impl LlmChat for LlmClient {
    async fn chat(
        &self,
        max_tokens: u32,
        system: &str,
        messages: &[Message],
        tools: Option<&[Tool]>,
    ) -> Result<ChatResponse, LlmError> {
        self.inner
            .chat(&self.model, max_tokens, system, messages, tools)
            .await
    }
}
