//! LLM configuration parsed from environment variables.
//!
//! Azure `OpenAI` wins when its endpoint and key are both present; otherwise
//! plain `OpenAI` is used. With neither configured there is no client, and
//! callers fall back to the remote suggestion service.

use super::types::LlmError;

pub const DEFAULT_OPENAI_BASE_URL: &str = "https://api.openai.com/v1";
pub const DEFAULT_OPENAI_MODEL: &str = "gpt-4o-mini";
pub const DEFAULT_AZURE_DEPLOYMENT: &str = "gpt-4o-mini";
pub const DEFAULT_AZURE_API_VERSION: &str = "2025-01-01-preview";
pub const DEFAULT_LLM_REQUEST_TIMEOUT_SECS: u64 = 120;
pub const DEFAULT_LLM_CONNECT_TIMEOUT_SECS: u64 = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LlmProviderKind {
    OpenAi,
    AzureOpenAi,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LlmTimeouts {
    pub request_secs: u64,
    pub connect_secs: u64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LlmConfig {
    pub provider: LlmProviderKind,
    pub api_key: String,
    /// Model name, or the deployment name for Azure.
    pub model: String,
    /// API base for `OpenAI`, resource endpoint for Azure. No trailing slash.
    pub base_url: String,
    /// Azure `api-version` query parameter. Unused for `OpenAI`.
    pub api_version: String,
    pub timeouts: LlmTimeouts,
}

impl LlmConfig {
    /// Build typed LLM config from environment variables.
    ///
    /// Azure (takes precedence):
    /// - `AZURE_OPENAI_ENDPOINT`, `AZURE_OPENAI_API_KEY`
    /// - `AZURE_OPENAI_DEPLOYMENT_NAME`: default `gpt-4o-mini`
    /// - `AZURE_OPENAI_API_VERSION`: default `2025-01-01-preview`
    ///
    /// `OpenAI`:
    /// - `OPENAI_API_KEY`
    /// - `OPENAI_MODEL`: default `gpt-4o-mini`
    /// - `OPENAI_BASE_URL`: default `https://api.openai.com/v1`
    ///
    /// Both:
    /// - `LLM_REQUEST_TIMEOUT_SECS`: default 120
    /// - `LLM_CONNECT_TIMEOUT_SECS`: default 10
    ///
    /// # Errors
    ///
    /// Returns [`LlmError::MissingApiKey`] when no provider is configured.
    pub fn from_env() -> Result<Self, LlmError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`LlmConfig::from_env`] but reads values through `lookup`.
    ///
    /// # Errors
    ///
    /// Returns [`LlmError::MissingApiKey`] when no provider is configured.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, LlmError> {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());
        let parse_u64 = |key: &str, default: u64| get(key).and_then(|v| v.parse::<u64>().ok()).unwrap_or(default);

        let timeouts = LlmTimeouts {
            request_secs: parse_u64("LLM_REQUEST_TIMEOUT_SECS", DEFAULT_LLM_REQUEST_TIMEOUT_SECS),
            connect_secs: parse_u64("LLM_CONNECT_TIMEOUT_SECS", DEFAULT_LLM_CONNECT_TIMEOUT_SECS),
        };

        if let (Some(endpoint), Some(api_key)) = (get("AZURE_OPENAI_ENDPOINT"), get("AZURE_OPENAI_API_KEY")) {
            return Ok(Self {
                provider: LlmProviderKind::AzureOpenAi,
                api_key,
                model: get("AZURE_OPENAI_DEPLOYMENT_NAME").unwrap_or_else(|| DEFAULT_AZURE_DEPLOYMENT.to_string()),
                base_url: endpoint.trim_end_matches('/').to_string(),
                api_version: get("AZURE_OPENAI_API_VERSION").unwrap_or_else(|| DEFAULT_AZURE_API_VERSION.to_string()),
                timeouts,
            });
        }

        let api_key = get("OPENAI_API_KEY").ok_or_else(|| LlmError::MissingApiKey { var: "OPENAI_API_KEY".into() })?;
        Ok(Self {
            provider: LlmProviderKind::OpenAi,
            api_key,
            model: get("OPENAI_MODEL").unwrap_or_else(|| DEFAULT_OPENAI_MODEL.to_string()),
            base_url: get("OPENAI_BASE_URL")
                .unwrap_or_else(|| DEFAULT_OPENAI_BASE_URL.to_string())
                .trim_end_matches('/')
                .to_string(),
            api_version: String::new(),
            timeouts,
        })
    }
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
