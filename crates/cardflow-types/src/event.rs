//! Event types for the cardflow run event bus.
//!
//! `RunEvent` is broadcast by the run orchestrator as conversation messages
//! are added, updated, or streamed. All variants are Clone + Send + Sync for
//! use with tokio broadcast channels.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::conversation::ConversationMessage;

/// Fire-and-forget notifications emitted during a run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
/// The serialized `type` tag matches [`RunEvent::name`].
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum RunEvent {
    /// A message was appended to the conversation.
    MessageAdded {
        conversation_id: Uuid,
        message_id: Uuid,
        payload: ConversationMessage,
    },

    /// An existing message changed (e.g. updated progress).
    MessageUpdated {
        conversation_id: Uuid,
        message_id: Uuid,
        payload: ConversationMessage,
    },

    /// Partial model output for a message that is still being generated.
    ///
    /// `content` is the cumulative text so far, not a delta.
    MessageStreaming {
        conversation_id: Uuid,
        message_id: Uuid,
        content: String,
    },
}

impl RunEvent {
    /// Wire name of the event.
    pub fn name(&self) -> &'static str {
        match self {
            RunEvent::MessageAdded { .. } => "message-added",
            RunEvent::MessageUpdated { .. } => "message-updated",
            RunEvent::MessageStreaming { .. } => "message-streaming",
        }
    }

    pub fn conversation_id(&self) -> Uuid {
        match self {
            RunEvent::MessageAdded { conversation_id, .. }
            | RunEvent::MessageUpdated { conversation_id, .. }
            | RunEvent::MessageStreaming { conversation_id, .. } => *conversation_id,
        }
    }

    pub fn message_id(&self) -> Uuid {
        match self {
            RunEvent::MessageAdded { message_id, .. }
            | RunEvent::MessageUpdated { message_id, .. }
            | RunEvent::MessageStreaming { message_id, .. } => *message_id,
        }
    }
}
