//! Application configuration parsed from environment variables.

use std::time::Duration;

pub const DEFAULT_API_BASE_URL: &str = "http://127.0.0.1:7071/api";
pub const DEFAULT_HIGHLIGHT_MS: u64 = 2000;
pub const DEFAULT_HISTORY_CAP: usize = 50;
pub const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_AI_MAX_TOOL_ITERATIONS: usize = 10;
pub const DEFAULT_AI_MAX_TOKENS: u32 = 4096;

/// Parse `key` from the environment, falling back to `default` when unset or
/// unparsable.
pub(crate) fn env_parse<T>(key: &str, default: T) -> T
where
    T: std::str::FromStr + Copy,
{
    std::env::var(key)
        .ok()
        .and_then(|v| v.trim().parse::<T>().ok())
        .unwrap_or(default)
}

/// Settings for the HTTP storage and suggestion collaborators.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiConfig {
    /// Base URL ending in `/api`, no trailing slash.
    pub base_url: String,
    pub token: Option<String>,
    pub timeout: Duration,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreConfig {
    /// How long a change set stays highlighted.
    pub highlight: Duration,
    pub history_cap: usize,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self { highlight: Duration::from_millis(DEFAULT_HIGHLIGHT_MS), history_cap: DEFAULT_HISTORY_CAP }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AgentConfig {
    pub max_tool_iterations: usize,
    pub max_tokens: u32,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self { max_tool_iterations: DEFAULT_AI_MAX_TOOL_ITERATIONS, max_tokens: DEFAULT_AI_MAX_TOKENS }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    pub api: ApiConfig,
    pub store: StoreConfig,
    pub agent: AgentConfig,
}

impl AppConfig {
    /// Build config from environment variables.
    ///
    /// - `FLOWNOTE_API_BASE_URL`: default `http://127.0.0.1:7071/api`
    /// - `FLOWNOTE_API_TOKEN`: optional bearer token
    /// - `FLOWNOTE_HTTP_TIMEOUT_SECS`: default 30
    /// - `FLOWNOTE_HIGHLIGHT_MS`: default 2000
    /// - `FLOWNOTE_HISTORY_CAP`: default 50
    /// - `AI_MAX_TOOL_ITERATIONS`: default 10
    /// - `AI_MAX_TOKENS`: default 4096
    ///
    /// LLM provider settings are read separately by `LlmConfig::from_env`.
    #[must_use]
    pub fn from_env() -> Self {
        let base_url = std::env::var("FLOWNOTE_API_BASE_URL")
            .ok()
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
            .unwrap_or_else(|| DEFAULT_API_BASE_URL.to_string())
            .trim_end_matches('/')
            .to_string();
        let token = std::env::var("FLOWNOTE_API_TOKEN")
            .ok()
            .filter(|v| !v.trim().is_empty());

        Self {
            api: ApiConfig {
                base_url,
                token,
                timeout: Duration::from_secs(env_parse("FLOWNOTE_HTTP_TIMEOUT_SECS", DEFAULT_HTTP_TIMEOUT_SECS)),
            },
            store: StoreConfig {
                highlight: Duration::from_millis(env_parse("FLOWNOTE_HIGHLIGHT_MS", DEFAULT_HIGHLIGHT_MS)),
                history_cap: env_parse("FLOWNOTE_HISTORY_CAP", DEFAULT_HISTORY_CAP).max(1),
            },
            agent: AgentConfig {
                max_tool_iterations: env_parse("AI_MAX_TOOL_ITERATIONS", DEFAULT_AI_MAX_TOOL_ITERATIONS),
                max_tokens: env_parse("AI_MAX_TOKENS", DEFAULT_AI_MAX_TOKENS),
            },
        }
    }
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
