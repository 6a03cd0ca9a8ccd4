//! AI agent suggester: LLM prompt to flow-editor tool calls to suggestion.
//!
//! DESIGN
//! ======
//! The current flow is parsed into a [`FlowEditor`]; the model edits it
//! through the flow-editor tools in a bounded loop and then answers with a
//! JSON object carrying the full proposed document. When the answer is not
//! usable JSON the editor's graph is spliced back into the current document
//! instead. Either way the impact is recomputed from the two graphs, so the
//! model's own counts are never trusted.

use std::fmt::Write;
use std::sync::Arc;
use std::time::Instant;

use serde::Deserialize;
use serde_json::Value;
use tracing::{info, warn};

use super::suggest::{AgentTraceEntry, SuggestError, Suggester, Suggestion, SuggestionRequest};
use crate::config::AgentConfig;
use crate::flow::{Edge, FlowEditor, Node, NodeKind, impact, parse, splice_flow};
use crate::llm::LlmChat;
use crate::llm::tools::flow_editor_tools;
use crate::llm::types::{Content, ContentBlock, Message};

const DEFAULT_SUMMARY: &str = "Updated the flow.";

pub struct AgentSuggester {
    llm: Arc<dyn LlmChat>,
    config: AgentConfig,
}

impl AgentSuggester {
    #[must_use]
    pub fn new(llm: Arc<dyn LlmChat>, config: AgentConfig) -> Self {
        Self { llm, config }
    }
}

#[derive(Debug, thiserror::Error)]
enum ToolError {
    #[error("missing required argument `{0}`")]
    MissingArg(&'static str),
    #[error("invalid argument `{arg}`: {reason}")]
    InvalidArg { arg: &'static str, reason: String },
}

/// The JSON object the model is asked to end with.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AgentAnswer {
    #[serde(default)]
    markdown: Option<String>,
    #[serde(default)]
    summary: Option<String>,
}

// =============================================================================
// MAIN ENTRY POINT
// =============================================================================

#[async_trait::async_trait]
impl Suggester for AgentSuggester {
    async fn suggest(&self, request: SuggestionRequest) -> Result<Suggestion, SuggestError> {
        if request.message.trim().is_empty() {
            return Err(SuggestError::EmptyMessage);
        }
        let started = Instant::now();
        let current_text = request.context.text.as_str();
        let original = parse(current_text);
        info!(
            document_id = request.document_id.as_deref().unwrap_or("-"),
            nodes = original.nodes.len(),
            edges = original.edges.len(),
            template = request.context.template_id().unwrap_or("none"),
            "agent: suggestion requested"
        );

        let mut editor = FlowEditor::new(original.clone());
        let mut trace: Vec<AgentTraceEntry> = Vec::new();
        let system = build_system_prompt(&request);
        let tools = flow_editor_tools();
        let mut messages = vec![Message::user(build_user_prompt(&request))];
        let mut final_text: Option<String> = None;

        for iteration in 0..self.config.max_tool_iterations {
            let response = self
                .llm
                .chat(self.config.max_tokens, &system, &messages, Some(&tools))
                .await?;

            info!(
                iteration,
                stop_reason = %response.stop_reason,
                input_tokens = response.input_tokens,
                output_tokens = response.output_tokens,
                "agent: LLM response"
            );

            if let Some(text) = response.text() {
                final_text = Some(text);
            }

            let tool_calls: Vec<(String, String, Value)> = response
                .content
                .iter()
                .filter_map(|b| match b {
                    ContentBlock::ToolUse { id, name, input } => Some((id.clone(), name.clone(), input.clone())),
                    _ => None,
                })
                .collect();

            if tool_calls.is_empty() {
                break;
            }

            let stop_reason = response.stop_reason.clone();
            messages.push(Message { role: "assistant".into(), content: Content::Blocks(response.content) });

            let mut tool_results = Vec::new();
            for (tool_id, tool_name, input) in tool_calls {
                let t0 = Instant::now();
                let result = execute_tool(&mut editor, &tool_name, &input);
                let (content, is_error) = match result {
                    Ok(msg) => {
                        info!(iteration, tool = %tool_name, "agent: tool ok: {msg}");
                        (msg, None)
                    }
                    Err(e) => {
                        warn!(iteration, tool = %tool_name, error = %e, "agent: tool error");
                        (e.to_string(), Some(true))
                    }
                };
                trace.push(AgentTraceEntry {
                    seq: trace.len() + 1,
                    tool: tool_name,
                    args: input,
                    result: content.clone(),
                    duration_ms: elapsed_ms(t0),
                });
                tool_results.push(ContentBlock::ToolResult { tool_use_id: tool_id, content, is_error });
            }
            messages.push(Message { role: "user".into(), content: Content::Blocks(tool_results) });

            if stop_reason != "tool_use" {
                break;
            }
        }

        let edited = editor.into_graph();
        let answer = final_text.as_deref().and_then(extract_answer);
        let (proposed_text, summary) = match answer {
            Some(answer) => {
                let proposed = answer
                    .markdown
                    .filter(|m| !m.trim().is_empty())
                    .or_else(|| (edited != original).then(|| splice_flow(current_text, &edited)));
                let summary = answer
                    .summary
                    .filter(|s| !s.trim().is_empty())
                    .unwrap_or_else(|| DEFAULT_SUMMARY.to_string());
                (proposed, summary)
            }
            None if edited != original => {
                warn!("agent: no JSON answer; rebuilding document from tool edits");
                (Some(splice_flow(current_text, &edited)), final_text.unwrap_or_else(|| DEFAULT_SUMMARY.to_string()))
            }
            None => match final_text {
                Some(text) => (None, text),
                None => return Err(SuggestError::NoAnswer),
            },
        };

        let mut suggestion = Suggestion::new(proposed_text, summary.trim());
        if let Some(text) = &suggestion.proposed_text {
            suggestion.impact = impact(&original, &parse(text));
        }
        suggestion.agent_trace = trace;
        suggestion.execution_ms = elapsed_ms(started);

        info!(
            suggestion_id = %suggestion.suggestion_id,
            node_delta = suggestion.impact.node_delta,
            edge_delta = suggestion.impact.edge_delta,
            tool_calls = suggestion.agent_trace.len(),
            "agent: suggestion ready"
        );
        Ok(suggestion)
    }
}

fn elapsed_ms(since: Instant) -> u64 {
    u64::try_from(since.elapsed().as_millis()).unwrap_or(u64::MAX)
}

// =============================================================================
// PROMPTS
// =============================================================================

pub(crate) const BASE_SYSTEM_PROMPT: &str = "\
You are a flowchart editing assistant. Documents are Markdown with one ```flow block \
that describes a directed graph, one statement per line.

## Flow syntax
- `[id] Label` declares a default node
- `[[id]] Label` declares a start (input) node
- `((id)) Label` declares an end (output) node
- `{id} Label` declares a decision (selector) node
- `[a] -> [b]` connects a to b; `[a] -> [b] : Yes` adds an edge label
- Node ids are lowercase with no spaces. A node referenced only by an edge is a default node labelled with its id.
- Edge lines always use plain `[id]` brackets, whatever the node's declared shape.
- At most one edge per ordered pair of nodes.

## Tools
- add_node: add a new node
- remove_node: remove a node and its connected edges
- add_edge: connect two nodes with an optional label
- remove_edge: remove a connection
- replace_flow: replace all nodes and edges at once

## Rules
- Keep the whole Markdown document: title, prose, and the ```flow block.
- Only change the content of the ```flow block.

## Output
After applying changes, answer with ONLY this JSON object (no code fences, no extra text):
{\"markdown\": \"<complete updated Markdown document>\", \"summary\": \"<1-2 sentences on what changed>\"}
If the request is unclear or needs no change, return the original markdown unchanged.";

pub(crate) fn build_system_prompt(request: &SuggestionRequest) -> String {
    let mut prompt = String::from(BASE_SYSTEM_PROMPT);
    if let Some(role) = request.context.system_prompt() {
        let template = request.context.template_id().unwrap_or("custom");
        let _ = write!(prompt, "\n\n## Template-Specific Role\n(Template: {template})\n{role}");
    }
    prompt
}

pub(crate) fn build_user_prompt(request: &SuggestionRequest) -> String {
    let mut prompt = format!(
        "<current_flow_markdown>\n{}\n</current_flow_markdown>\n\n",
        request.context.text
    );
    let selection = &request.context.selection;
    if !selection.is_empty() {
        let _ = write!(
            prompt,
            "<selection>\nnodes: {}\nedges: {}\n</selection>\n\n",
            selection.node_ids.join(", "),
            selection.edge_ids.join(", ")
        );
    }
    let _ = write!(
        prompt,
        "<user_request>\n{}\n</user_request>\n\n\
         Apply the requested changes using the tools, then return the result as JSON.",
        request.message.trim()
    );
    prompt
}

// =============================================================================
// ANSWER EXTRACTION
// =============================================================================

/// Find the JSON answer in the model's final text. Accepts a bare object, an
/// object wrapped in a code fence, or an object surrounded by prose.
fn extract_answer(raw: &str) -> Option<AgentAnswer> {
    let trimmed = raw.trim();
    if let Ok(answer) = serde_json::from_str::<AgentAnswer>(trimmed) {
        return Some(answer);
    }
    if let Some(inner) = strip_code_fence(trimmed)
        && let Ok(answer) = serde_json::from_str::<AgentAnswer>(inner)
    {
        return Some(answer);
    }
    let start = trimmed.find('{')?;
    let end = trimmed.rfind('}')?;
    if end <= start {
        return None;
    }
    serde_json::from_str::<AgentAnswer>(&trimmed[start..=end]).ok()
}

fn strip_code_fence(text: &str) -> Option<&str> {
    let rest = text.strip_prefix("```")?;
    let (_, body) = rest.split_once('\n')?;
    Some(body.trim_end().strip_suffix("```")?.trim())
}

// =============================================================================
// TOOL EXECUTION
// =============================================================================

fn execute_tool(editor: &mut FlowEditor, tool_name: &str, input: &Value) -> Result<String, ToolError> {
    match tool_name {
        "add_node" => {
            let id = required_str(input, "node_id")?;
            let label = optional_str(input, "label").unwrap_or(id);
            let kind = match optional_str(input, "node_type") {
                Some(name) => node_kind(name).ok_or_else(|| ToolError::InvalidArg {
                    arg: "node_type",
                    reason: format!("unknown node type '{name}'"),
                })?,
                None => NodeKind::Plain,
            };
            Ok(editor.add_node(id, label, kind))
        }
        "remove_node" => Ok(editor.remove_node(required_str(input, "node_id")?)),
        "add_edge" => {
            let source = required_str(input, "source")?;
            let target = required_str(input, "target")?;
            Ok(editor.add_edge(source, target, optional_str(input, "label")))
        }
        "remove_edge" => {
            let source = required_str(input, "source")?;
            let target = required_str(input, "target")?;
            Ok(editor.remove_edge(source, target))
        }
        "replace_flow" => {
            let (nodes, edges) = replace_flow_args(input)?;
            Ok(editor.replace(nodes, edges))
        }
        _ => Ok(format!("unknown tool: {tool_name}")),
    }
}

/// Map a tool-facing node type name to a kind. Grammar names are accepted too.
pub(crate) fn node_kind(name: &str) -> Option<NodeKind> {
    match name.trim().to_ascii_lowercase().as_str() {
        "default" | "plain" => Some(NodeKind::Plain),
        "input" | "entry" => Some(NodeKind::Entry),
        "output" | "exit" => Some(NodeKind::Exit),
        "selector" | "decision" => Some(NodeKind::Decision),
        _ => None,
    }
}

fn required_str<'a>(input: &'a Value, key: &'static str) -> Result<&'a str, ToolError> {
    optional_str(input, key).ok_or(ToolError::MissingArg(key))
}

fn optional_str<'a>(input: &'a Value, key: &str) -> Option<&'a str> {
    input
        .get(key)
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|v| !v.is_empty())
}

/// Array argument, also accepted as a JSON-encoded string.
fn array_arg(input: &Value, key: &'static str) -> Result<Vec<Value>, ToolError> {
    match input.get(key) {
        Some(Value::Array(items)) => Ok(items.clone()),
        Some(Value::String(raw)) => serde_json::from_str::<Vec<Value>>(raw)
            .map_err(|e| ToolError::InvalidArg { arg: key, reason: e.to_string() }),
        Some(_) => Err(ToolError::InvalidArg { arg: key, reason: "expected an array".into() }),
        None => Err(ToolError::MissingArg(key)),
    }
}

fn replace_flow_args(input: &Value) -> Result<(Vec<Node>, Vec<Edge>), ToolError> {
    let mut nodes = Vec::new();
    for item in array_arg(input, "nodes")? {
        let Some(id) = optional_str(&item, "id") else {
            return Err(ToolError::InvalidArg { arg: "nodes", reason: "node without id".into() });
        };
        let label = optional_str(&item, "label").unwrap_or(id);
        let kind = optional_str(&item, "type")
            .and_then(node_kind)
            .unwrap_or_default();
        nodes.push(Node::new(id, label, kind));
    }

    let mut edges = Vec::new();
    for item in array_arg(input, "edges")? {
        let (Some(source), Some(target)) = (optional_str(&item, "source"), optional_str(&item, "target")) else {
            return Err(ToolError::InvalidArg { arg: "edges", reason: "edge without source or target".into() });
        };
        edges.push(Edge::new(source, target, optional_str(&item, "label").map(str::to_owned)));
    }
    Ok((nodes, edges))
}

#[cfg(test)]
#[path = "agent_test.rs"]
mod tests;
