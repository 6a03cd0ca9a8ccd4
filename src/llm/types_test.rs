use super::*;

#[test]
fn error_codes_are_stable() {
    assert_eq!(LlmError::ConfigParse("bad".into()).error_code(), "E_CONFIG_PARSE");
    assert_eq!(LlmError::MissingApiKey { var: "KEY".into() }.error_code(), "E_MISSING_API_KEY");
    assert_eq!(LlmError::ApiRequest("timeout".into()).error_code(), "E_API_REQUEST");
    assert_eq!(LlmError::ApiResponse { status: 500, body: String::new() }.error_code(), "E_API_RESPONSE");
    assert_eq!(LlmError::ApiParse("json".into()).error_code(), "E_API_PARSE");
    assert_eq!(LlmError::HttpClientBuild("tls".into()).error_code(), "E_HTTP_CLIENT_BUILD");
}

#[test]
fn retryable_transport_and_server_errors() {
    assert!(LlmError::ApiRequest("conn refused".into()).retryable());
    assert!(LlmError::ApiResponse { status: 429, body: String::new() }.retryable());
    assert!(LlmError::ApiResponse { status: 503, body: String::new() }.retryable());
}

#[test]
fn not_retryable_client_errors() {
    assert!(!LlmError::ApiResponse { status: 400, body: String::new() }.retryable());
    assert!(!LlmError::ApiResponse { status: 401, body: String::new() }.retryable());
    assert!(!LlmError::MissingApiKey { var: "X".into() }.retryable());
    assert!(!LlmError::ApiParse("bad".into()).retryable());
}

#[test]
fn content_block_tool_use_serde() {
    let block = ContentBlock::ToolUse {
        id: "call_1".into(),
        name: "add_node".into(),
        input: serde_json::json!({ "node_id": "a" }),
    };
    let json = serde_json::to_value(&block).unwrap();
    assert_eq!(json["type"], "tool_use");
    assert_eq!(json["name"], "add_node");
}

#[test]
fn content_block_unknown_type_deserializes() {
    let block: ContentBlock = serde_json::from_value(serde_json::json!({ "type": "thinking", "thinking": "hm" })).unwrap();
    assert!(matches!(block, ContentBlock::Unknown));
}

#[test]
fn tool_result_omits_missing_error_flag() {
    let block = ContentBlock::ToolResult { tool_use_id: "t".into(), content: "ok".into(), is_error: None };
    let json = serde_json::to_value(&block).unwrap();
    assert!(json.get("is_error").is_none());
}

#[test]
fn chat_response_text_joins_text_blocks() {
    let resp = ChatResponse {
        content: vec![
            ContentBlock::Text { text: "one".into() },
            ContentBlock::ToolUse { id: "x".into(), name: "n".into(), input: serde_json::json!({}) },
            ContentBlock::Text { text: "two".into() },
        ],
        model: "m".into(),
        stop_reason: "end_turn".into(),
        input_tokens: 0,
        output_tokens: 0,
    };
    assert_eq!(resp.text().as_deref(), Some("one\ntwo"));
}

#[test]
fn chat_response_text_none_without_text() {
    let resp = ChatResponse {
        content: vec![],
        model: "m".into(),
        stop_reason: "end_turn".into(),
        input_tokens: 0,
        output_tokens: 0,
    };
    assert!(resp.text().is_none());
}
