//! LlmProvider trait definition.
//!
//! `complete` uses RPITIT; `stream` returns `Pin<Box<dyn Stream>>` so the
//! trait can be wrapped by [`BoxLlmProvider`](super::BoxLlmProvider).

use std::pin::Pin;

use futures_util::Stream;

use cardflow_types::llm::{CompletionRequest, CompletionResponse, LlmError, StreamEvent};

/// A chat-completion backend.
///
/// Implementations live in cardflow-infra (e.g. `OpenAiCompatibleProvider`).
/// The orchestrator only ever sends the full message history plus an
/// optional system prompt; providers are stateless between calls.
pub trait LlmProvider: Send + Sync {
    /// Human-readable provider name (e.g. "openai").
    fn name(&self) -> &str;

    /// Send a completion request and receive the full response.
    fn complete(
        &self,
        request: &CompletionRequest,
    ) -> impl std::future::Future<Output = Result<CompletionResponse, LlmError>> + Send;

    /// Send a streaming completion request.
    ///
    /// Text arrives as `StreamEvent::TextDelta` chunks; the stream ends with
    /// `StreamEvent::Done` or an error item.
    fn stream(
        &self,
        request: CompletionRequest,
    ) -> Pin<Box<dyn Stream<Item = Result<StreamEvent, LlmError>> + Send + 'static>>;
}
