use std::collections::HashMap;

use super::*;

fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
    let map: HashMap<String, String> = pairs
        .iter()
        .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
        .collect();
    move |key| map.get(key).cloned()
}

#[test]
fn openai_defaults() {
    let cfg = LlmConfig::from_lookup(lookup(&[("OPENAI_API_KEY", "sk-test")])).unwrap();
    assert_eq!(cfg.provider, LlmProviderKind::OpenAi);
    assert_eq!(cfg.api_key, "sk-test");
    assert_eq!(cfg.model, DEFAULT_OPENAI_MODEL);
    assert_eq!(cfg.base_url, DEFAULT_OPENAI_BASE_URL);
    assert_eq!(
        cfg.timeouts,
        LlmTimeouts { request_secs: DEFAULT_LLM_REQUEST_TIMEOUT_SECS, connect_secs: DEFAULT_LLM_CONNECT_TIMEOUT_SECS }
    );
}

#[test]
fn openai_overrides() {
    let cfg = LlmConfig::from_lookup(lookup(&[
        ("OPENAI_API_KEY", "sk-test"),
        ("OPENAI_MODEL", "gpt-4o"),
        ("OPENAI_BASE_URL", "https://example.test/v1/"),
        ("LLM_REQUEST_TIMEOUT_SECS", "42"),
        ("LLM_CONNECT_TIMEOUT_SECS", "7"),
    ]))
    .unwrap();
    assert_eq!(cfg.model, "gpt-4o");
    assert_eq!(cfg.base_url, "https://example.test/v1");
    assert_eq!(cfg.timeouts, LlmTimeouts { request_secs: 42, connect_secs: 7 });
}

#[test]
fn azure_takes_precedence() {
    let cfg = LlmConfig::from_lookup(lookup(&[
        ("OPENAI_API_KEY", "sk-test"),
        ("AZURE_OPENAI_ENDPOINT", "https://res.openai.azure.com/"),
        ("AZURE_OPENAI_API_KEY", "az-key"),
    ]))
    .unwrap();
    assert_eq!(cfg.provider, LlmProviderKind::AzureOpenAi);
    assert_eq!(cfg.api_key, "az-key");
    assert_eq!(cfg.base_url, "https://res.openai.azure.com");
    assert_eq!(cfg.model, DEFAULT_AZURE_DEPLOYMENT);
    assert_eq!(cfg.api_version, DEFAULT_AZURE_API_VERSION);
}

#[test]
fn azure_without_key_falls_back_to_openai() {
    let cfg = LlmConfig::from_lookup(lookup(&[
        ("AZURE_OPENAI_ENDPOINT", "https://res.openai.azure.com"),
        ("OPENAI_API_KEY", "sk-test"),
    ]))
    .unwrap();
    assert_eq!(cfg.provider, LlmProviderKind::OpenAi);
}

#[test]
fn missing_everything_is_missing_key() {
    let err = LlmConfig::from_lookup(lookup(&[])).unwrap_err();
    assert!(matches!(err, LlmError::MissingApiKey { ref var } if var == "OPENAI_API_KEY"));
}

#[test]
fn blank_values_count_as_missing() {
    let err = LlmConfig::from_lookup(lookup(&[("OPENAI_API_KEY", "   ")])).unwrap_err();
    assert!(matches!(err, LlmError::MissingApiKey { .. }));
}

#[test]
fn bad_timeout_uses_default() {
    let cfg =
        LlmConfig::from_lookup(lookup(&[("OPENAI_API_KEY", "k"), ("LLM_REQUEST_TIMEOUT_SECS", "soon")])).unwrap();
    assert_eq!(cfg.timeouts.request_secs, DEFAULT_LLM_REQUEST_TIMEOUT_SECS);
}
