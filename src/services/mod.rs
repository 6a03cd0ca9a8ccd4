//! External collaborators: storage, AI suggestions, realtime notifications.
//!
//! Each collaborator is a trait (or channel) so the store can run against
//! in-process fakes in tests and HTTP/LLM implementations in production.

pub mod agent;
pub mod api;
pub mod realtime;
pub mod storage;
pub mod suggest;
