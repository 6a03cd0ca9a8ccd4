//! Flowchart notes: Markdown documents whose ```` ```flow ```` regions are
//! kept in sync with a laid-out node/edge graph.

pub mod config;
pub mod error;
pub mod flow;
pub mod llm;
pub mod services;
pub mod store;
