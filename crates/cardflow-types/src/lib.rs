//! Shared domain types for cardflow.
//!
//! Cards, prompt-block results, conversation records, run events, LLM
//! request/response shapes, runner configuration, and their error types.
//!
//! Zero infrastructure dependencies -- only serde, uuid, chrono, thiserror.

pub mod agent;
pub mod block;
pub mod config;
pub mod conversation;
pub mod error;
pub mod event;
pub mod llm;
