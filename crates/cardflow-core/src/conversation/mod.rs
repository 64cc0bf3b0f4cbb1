//! Conversation persistence port.

pub mod store;

pub use store::ConversationStore;
