//! Infrastructure implementations for cardflow.
//!
//! Concrete adapters for the ports defined in `cardflow-core`: SQLite and
//! in-memory conversation stores, the OpenAI-compatible model provider, and
//! the `config.toml` loader.

pub mod config;
pub mod llm;
pub mod memory;
pub mod sqlite;
