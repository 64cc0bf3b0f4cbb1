//! Conversation records written by a run.
//!
//! A run appends one "process" message carrying [`ProgressInfo`], then a
//! message per executed block. Messages are addressed by id so they can be
//! updated in place.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::block::{BlockRef, ProgressInfo};
use crate::llm::MessageRole;

/// What a conversation message represents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageKind {
    /// Run announcement; carries progress.
    Process,
    /// A resolved block as submitted to the model.
    Prompt,
    /// The model's answer to a block.
    Response,
    /// A block that failed to execute.
    Error,
}

/// One message of a conversation, addressed by a time-ordered id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversationMessage {
    pub id: Uuid,
    pub role: MessageRole,
    pub kind: MessageKind,
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub block: Option<BlockRef>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub progress: Option<ProgressInfo>,
    pub created_at: DateTime<Utc>,
}

impl ConversationMessage {
    pub fn new(role: MessageRole, kind: MessageKind, content: impl Into<String>) -> Self {
        Self {
            id: Uuid::now_v7(),
            role,
            kind,
            content: content.into(),
            block: None,
            progress: None,
            created_at: Utc::now(),
        }
    }

    pub fn with_block(mut self, block: BlockRef) -> Self {
        self.block = Some(block);
        self
    }

    pub fn with_progress(mut self, progress: ProgressInfo) -> Self {
        self.progress = Some(progress);
        self
    }
}

/// A stored conversation: title plus messages in insertion order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversationRecord {
    pub id: Uuid,
    pub title: Option<String>,
    pub messages: Vec<ConversationMessage>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ConversationRecord {
    pub fn new(id: Uuid) -> Self {
        let now = Utc::now();
        Self {
            id,
            title: None,
            messages: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }

    /// Append `message`, or replace the existing message with the same id.
    pub fn upsert_message(&mut self, message: ConversationMessage) {
        match self.messages.iter_mut().find(|m| m.id == message.id) {
            Some(existing) => *existing = message,
            None => self.messages.push(message),
        }
        self.updated_at = Utc::now();
    }

    pub fn message(&self, id: &Uuid) -> Option<&ConversationMessage> {
        self.messages.iter().find(|m| m.id == *id)
    }

    /// Progress from the most recent process message, if any.
    pub fn latest_progress(&self) -> Option<ProgressInfo> {
        self.messages
            .iter()
            .rev()
            .find(|m| m.kind == MessageKind::Process)
            .and_then(|m| m.progress)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_upsert_appends_then_replaces() {
        let mut record = ConversationRecord::new(Uuid::now_v7());
        let mut msg = ConversationMessage::new(MessageRole::System, MessageKind::Process, "process")
            .with_progress(ProgressInfo::new(2, 0));
        record.upsert_message(msg.clone());
        assert_eq!(record.messages.len(), 1);

        msg.progress.as_mut().unwrap().advance(1);
        record.upsert_message(msg.clone());
        assert_eq!(record.messages.len(), 1);
        assert_eq!(record.latest_progress().unwrap().current, 1);
        assert!(record.message(&msg.id).is_some());
    }

    #[test]
    fn test_message_serde_skips_empty_options() {
        let msg = ConversationMessage::new(MessageRole::Assistant, MessageKind::Response, "ok");
        let json = serde_json::to_value(&msg).unwrap();
        assert!(json.get("block").is_none());
        assert!(json.get("progress").is_none());
        assert_eq!(json["kind"], "response");
        let back: ConversationMessage = serde_json::from_value(json).unwrap();
        assert_eq!(back, msg);
    }
}
