//! Flow-editing tool definitions for the AI agent.
//!
//! Names and argument keys are what the agent dispatcher in
//! `services::agent` matches on.

use super::types::Tool;

/// Node kinds as the model names them, in the order they are documented.
pub const NODE_TYPES: [&str; 4] = ["default", "input", "output", "selector"];

/// Build the set of tools that edit the current flow.
#[must_use]
pub fn flow_editor_tools() -> Vec<Tool> {
    vec![
        Tool {
            name: "add_node".into(),
            description: "Add a new node to the flow diagram.".into(),
            input_schema: serde_json::json!({
                "type": "object",
                "properties": {
                    "node_id": { "type": "string", "description": "Unique identifier (lowercase, no spaces)." },
                    "label": { "type": "string", "description": "Display label shown inside the node." },
                    "node_type": {
                        "type": "string",
                        "enum": NODE_TYPES,
                        "description": "input = start node, output = end node, selector = decision diamond."
                    }
                },
                "required": ["node_id", "label"]
            }),
        },
        Tool {
            name: "remove_node".into(),
            description: "Remove a node and all edges connected to it.".into(),
            input_schema: serde_json::json!({
                "type": "object",
                "properties": {
                    "node_id": { "type": "string", "description": "ID of the node to remove." }
                },
                "required": ["node_id"]
            }),
        },
        Tool {
            name: "add_edge".into(),
            description: "Add a directed edge between two nodes. Missing nodes are created.".into(),
            input_schema: serde_json::json!({
                "type": "object",
                "properties": {
                    "source": { "type": "string", "description": "Source node ID." },
                    "target": { "type": "string", "description": "Target node ID." },
                    "label": { "type": "string", "description": "Optional label on the edge." }
                },
                "required": ["source", "target"]
            }),
        },
        Tool {
            name: "remove_edge".into(),
            description: "Remove the edge between two nodes.".into(),
            input_schema: serde_json::json!({
                "type": "object",
                "properties": {
                    "source": { "type": "string", "description": "Source node ID." },
                    "target": { "type": "string", "description": "Target node ID." }
                },
                "required": ["source", "target"]
            }),
        },
        Tool {
            name: "replace_flow".into(),
            description: "Completely replace the flow with a new set of nodes and edges.".into(),
            input_schema: serde_json::json!({
                "type": "object",
                "properties": {
                    "nodes": {
                        "type": "array",
                        "items": {
                            "type": "object",
                            "properties": {
                                "id": { "type": "string" },
                                "label": { "type": "string" },
                                "type": { "type": "string", "enum": NODE_TYPES }
                            },
                            "required": ["id"]
                        }
                    },
                    "edges": {
                        "type": "array",
                        "items": {
                            "type": "object",
                            "properties": {
                                "source": { "type": "string" },
                                "target": { "type": "string" },
                                "label": { "type": "string" }
                            },
                            "required": ["source", "target"]
                        }
                    }
                },
                "required": ["nodes", "edges"]
            }),
        },
    ]
}

#[cfg(test)]
#[path = "tools_test.rs"]
mod tests;
