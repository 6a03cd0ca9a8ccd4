use super::*;
use crate::flow::Graph;
use crate::llm::types::{ChatResponse, LlmError, Tool};
use crate::services::suggest::{Selection, SuggestionContext};
use serde_json::json;
use std::sync::Mutex;

// =========================================================================
// MockLlm
// =========================================================================

struct MockLlm {
    responses: Mutex<Vec<ChatResponse>>,
    systems: Mutex<Vec<String>>,
}

impl MockLlm {
    fn new(responses: Vec<ChatResponse>) -> Arc<Self> {
        Arc::new(Self { responses: Mutex::new(responses), systems: Mutex::new(Vec::new()) })
    }
}

#[async_trait::async_trait]
impl LlmChat for MockLlm {
    async fn chat(
        &self,
        _max_tokens: u32,
        system: &str,
        _messages: &[Message],
        _tools: Option<&[Tool]>,
    ) -> Result<ChatResponse, LlmError> {
        self.systems.lock().unwrap().push(system.to_string());
        let mut responses = self.responses.lock().unwrap();
        if responses.is_empty() {
            Err(LlmError::ApiRequest("script exhausted".into()))
        } else {
            Ok(responses.remove(0))
        }
    }
}

fn text_reply(text: &str) -> ChatResponse {
    ChatResponse {
        content: vec![ContentBlock::Text { text: text.into() }],
        model: "mock".into(),
        stop_reason: "end_turn".into(),
        input_tokens: 0,
        output_tokens: 0,
    }
}

fn tool_reply(calls: &[(&str, serde_json::Value)]) -> ChatResponse {
    ChatResponse {
        content: calls
            .iter()
            .enumerate()
            .map(|(i, (name, input))| ContentBlock::ToolUse {
                id: format!("call_{i}"),
                name: (*name).into(),
                input: input.clone(),
            })
            .collect(),
        model: "mock".into(),
        stop_reason: "tool_use".into(),
        input_tokens: 0,
        output_tokens: 0,
    }
}

const DOC: &str = "# Plan\n\n```flow\n[[start]] Begin\n[start] -> [work]\n```\n";

fn request(message: &str) -> SuggestionRequest {
    SuggestionRequest {
        document_id: Some("doc-1".into()),
        message: message.into(),
        context: SuggestionContext { text: DOC.into(), ..SuggestionContext::default() },
    }
}

fn agent(llm: Arc<MockLlm>) -> AgentSuggester {
    AgentSuggester::new(llm, AgentConfig::default())
}

// =========================================================================
// suggest
// =========================================================================

#[tokio::test]
async fn tool_edits_spliced_when_no_json() {
    let llm = MockLlm::new(vec![
        tool_reply(&[("add_edge", json!({ "source": "work", "target": "done", "label": "ok" }))]),
        text_reply("I connected work to done."),
    ]);
    let suggestion = agent(llm).suggest(request("finish the flow")).await.unwrap();

    let text = suggestion.proposed_text.unwrap();
    assert!(text.starts_with("# Plan\n\n```flow\n"));
    let graph = parse(&text);
    assert!(graph.edge_between("work", "done").is_some());
    assert_eq!(suggestion.summary, "I connected work to done.");
    assert_eq!(suggestion.impact.node_delta, 1);
    assert_eq!(suggestion.impact.edge_delta, 1);
    assert!(suggestion.impact.changed_node_ids.contains(&"done".to_string()));
    assert_eq!(suggestion.agent_trace.len(), 1);
    assert_eq!(suggestion.agent_trace[0].seq, 1);
    assert_eq!(suggestion.agent_trace[0].tool, "add_edge");
}

#[tokio::test]
async fn json_answer_wins() {
    let proposed = "# Plan\n\n```flow\n[[start]] Begin\n((end)) Done\n\n[start] -> [end]\n```\n";
    let answer = json!({ "markdown": proposed, "summary": "Replaced work with end.", "nodesDelta": 99 });
    let llm = MockLlm::new(vec![text_reply(&answer.to_string())]);
    let suggestion = agent(llm).suggest(request("simplify")).await.unwrap();

    assert_eq!(suggestion.proposed_text.as_deref(), Some(proposed));
    assert_eq!(suggestion.summary, "Replaced work with end.");
    // Recomputed from the graphs, not taken from the model.
    assert_eq!(suggestion.impact.node_delta, 0);
    assert_eq!(suggestion.impact.edge_delta, 0);
    assert_eq!(suggestion.impact.changed_node_ids, ["end"]);
}

#[tokio::test]
async fn fenced_json_answer_is_extracted() {
    let answer = json!({ "markdown": "```flow\n[a]\n```", "summary": "Reset." });
    let reply = format!("```json\n{answer}\n```");
    let llm = MockLlm::new(vec![text_reply(&reply)]);
    let suggestion = agent(llm).suggest(request("reset")).await.unwrap();
    assert_eq!(suggestion.proposed_text.as_deref(), Some("```flow\n[a]\n```"));
}

#[tokio::test]
async fn prose_only_reply_has_no_text() {
    let llm = MockLlm::new(vec![text_reply("Could you say which step you mean?")]);
    let suggestion = agent(llm).suggest(request("change it")).await.unwrap();
    assert!(suggestion.proposed_text.is_none());
    assert_eq!(suggestion.summary, "Could you say which step you mean?");
    assert_eq!(suggestion.impact.node_delta, 0);
}

#[tokio::test]
async fn llm_failure_is_error() {
    let llm = MockLlm::new(vec![]);
    let err = agent(llm).suggest(request("anything")).await.unwrap_err();
    assert!(matches!(err, SuggestError::Llm(_)));
}

#[tokio::test]
async fn blank_message_rejected_without_calling_llm() {
    let llm = MockLlm::new(vec![]);
    let err = agent(llm.clone()).suggest(request("   ")).await.unwrap_err();
    assert!(matches!(err, SuggestError::EmptyMessage));
    assert!(llm.systems.lock().unwrap().is_empty());
}

#[tokio::test]
async fn tool_loop_is_bounded() {
    let calls: Vec<ChatResponse> = (0..5)
        .map(|i| tool_reply(&[("add_node", json!({ "node_id": format!("n{i}"), "label": "N" }))]))
        .collect();
    let llm = MockLlm::new(calls);
    let suggester = AgentSuggester::new(llm.clone(), AgentConfig { max_tool_iterations: 2, max_tokens: 256 });
    let suggestion = suggester.suggest(request("grow")).await.unwrap();
    assert_eq!(llm.systems.lock().unwrap().len(), 2);
    assert_eq!(suggestion.agent_trace.len(), 2);
    assert_eq!(suggestion.impact.node_delta, 2);
}

#[tokio::test]
async fn tool_error_is_traced_and_loop_continues() {
    let llm = MockLlm::new(vec![
        tool_reply(&[("add_node", json!({ "label": "no id" }))]),
        text_reply("Nothing changed."),
    ]);
    let suggestion = agent(llm).suggest(request("add")).await.unwrap();
    assert_eq!(suggestion.agent_trace[0].result, "missing required argument `node_id`");
    assert!(suggestion.proposed_text.is_none());
}

#[tokio::test]
async fn template_role_reaches_system_prompt() {
    let llm = MockLlm::new(vec![text_reply("ok")]);
    let mut req = request("go");
    req.context
        .metadata
        .insert("templateId".into(), json!("swot"));
    req.context
        .metadata
        .insert("systemPrompt".into(), json!("You are a strategy consultant."));
    agent(llm.clone()).suggest(req).await.unwrap();
    let system = llm.systems.lock().unwrap()[0].clone();
    assert!(system.contains("(Template: swot)"));
    assert!(system.contains("You are a strategy consultant."));
}

// =========================================================================
// prompts
// =========================================================================

#[test]
fn system_prompt_describes_grammar_and_tools() {
    let prompt = build_system_prompt(&request("x"));
    assert!(prompt.contains("[[id]]"));
    assert!(prompt.contains("((id))"));
    assert!(prompt.contains("replace_flow"));
    assert!(!prompt.contains("Template-Specific Role"));
}

#[test]
fn user_prompt_includes_selection() {
    let mut req = request("rename it");
    req.context.selection = Selection { node_ids: vec!["work".into()], edge_ids: vec!["e-start-work".into()] };
    let prompt = build_user_prompt(&req);
    assert!(prompt.contains("<current_flow_markdown>\n# Plan"));
    assert!(prompt.contains("nodes: work"));
    assert!(prompt.contains("edges: e-start-work"));
    assert!(prompt.contains("<user_request>\nrename it\n</user_request>"));
}

#[test]
fn user_prompt_without_selection() {
    assert!(!build_user_prompt(&request("x")).contains("<selection>"));
}

// =========================================================================
// answer extraction
// =========================================================================

#[test]
fn extract_bare_object() {
    let answer = extract_answer(r#"{"markdown":"m","summary":"s"}"#).unwrap();
    assert_eq!(answer.markdown.as_deref(), Some("m"));
}

#[test]
fn extract_object_in_prose() {
    let answer = extract_answer("Here you go:\n{\"summary\":\"s\"}\nThanks").unwrap();
    assert_eq!(answer.summary.as_deref(), Some("s"));
}

#[test]
fn extract_rejects_non_json() {
    assert!(extract_answer("no braces here").is_none());
    assert!(extract_answer("} backwards {").is_none());
}

// =========================================================================
// execute_tool
// =========================================================================

#[test]
fn tool_add_node_kinds() {
    let mut editor = FlowEditor::default();
    execute_tool(&mut editor, "add_node", &json!({ "node_id": "s", "label": "Start", "node_type": "input" })).unwrap();
    execute_tool(&mut editor, "add_node", &json!({ "node_id": "q", "label": "Ok?", "node_type": "selector" })).unwrap();
    execute_tool(&mut editor, "add_node", &json!({ "node_id": "x" })).unwrap();
    let graph = editor.graph();
    assert_eq!(graph.node("s").unwrap().kind, NodeKind::Entry);
    assert_eq!(graph.node("q").unwrap().kind, NodeKind::Decision);
    assert_eq!(graph.node("x").unwrap().kind, NodeKind::Plain);
    assert_eq!(graph.node("x").unwrap().label, "x");
}

#[test]
fn tool_add_node_unknown_type() {
    let mut editor = FlowEditor::default();
    let err = execute_tool(&mut editor, "add_node", &json!({ "node_id": "a", "node_type": "hexagon" })).unwrap_err();
    assert!(err.to_string().contains("hexagon"));
    assert!(editor.graph().is_empty());
}

#[test]
fn tool_replace_flow_accepts_arrays_and_strings() {
    let mut editor = FlowEditor::default();
    let msg = execute_tool(
        &mut editor,
        "replace_flow",
        &json!({
            "nodes": [{ "id": "a", "label": "A", "type": "output" }],
            "edges": "[{\"source\":\"a\",\"target\":\"b\",\"label\":\"next\"}]"
        }),
    )
    .unwrap();
    assert_eq!(msg, "Replaced flow: 2 nodes, 1 edges.");
    let graph: &Graph = editor.graph();
    assert_eq!(graph.node("a").unwrap().kind, NodeKind::Exit);
    assert_eq!(graph.edges[0].label.as_deref(), Some("next"));
}

#[test]
fn tool_replace_flow_rejects_bad_input() {
    let mut editor = FlowEditor::default();
    assert!(execute_tool(&mut editor, "replace_flow", &json!({ "nodes": 3, "edges": [] })).is_err());
    assert!(execute_tool(&mut editor, "replace_flow", &json!({ "nodes": [] })).is_err());
    assert!(execute_tool(&mut editor, "replace_flow", &json!({ "nodes": [{ "label": "x" }], "edges": [] })).is_err());
}

#[test]
fn tool_unknown_name() {
    let mut editor = FlowEditor::default();
    assert_eq!(execute_tool(&mut editor, "paint", &json!({})).unwrap(), "unknown tool: paint");
}

#[test]
fn node_kind_names() {
    assert_eq!(node_kind("default"), Some(NodeKind::Plain));
    assert_eq!(node_kind("Output"), Some(NodeKind::Exit));
    assert_eq!(node_kind("decision"), Some(NodeKind::Decision));
    assert_eq!(node_kind("circle"), None);
}
