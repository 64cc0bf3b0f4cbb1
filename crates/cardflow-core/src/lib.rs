//! Business logic and port trait definitions for cardflow.
//!
//! The template engine (default extraction, placeholder resolution, block
//! ordering, batch processing) is synchronous and pure. The run orchestrator
//! drives one model call per resolved block through the `LlmProvider` port
//! and records results through the `ConversationStore` port. This crate
//! depends only on `cardflow-types` -- never on `cardflow-infra` or any
//! database/IO crate.

pub mod conversation;
pub mod event;
pub mod llm;
pub mod run;
pub mod template;
