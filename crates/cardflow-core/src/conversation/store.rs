//! ConversationStore trait definition.
//!
//! A run reads its conversation once at start, then writes the whole record
//! back after every message change.

use cardflow_types::conversation::ConversationRecord;
use cardflow_types::error::RepositoryError;
use uuid::Uuid;

/// Persistence for conversation records.
///
/// Implementations live in cardflow-infra (`SqliteConversationStore`,
/// `InMemoryConversationStore`). Uses native async fn in traits (RPITIT).
pub trait ConversationStore: Send + Sync {
    /// Load a conversation, `None` when it does not exist.
    fn get_conversation(
        &self,
        id: &Uuid,
    ) -> impl std::future::Future<Output = Result<Option<ConversationRecord>, RepositoryError>> + Send;

    /// Insert or replace the whole record.
    fn save_conversation(
        &self,
        record: &ConversationRecord,
    ) -> impl std::future::Future<Output = Result<(), RepositoryError>> + Send;

    /// All conversations, most recently updated first.
    fn list_conversations(
        &self,
    ) -> impl std::future::Future<Output = Result<Vec<ConversationRecord>, RepositoryError>> + Send;

    /// Delete a conversation. Returns whether it existed.
    fn delete_conversation(
        &self,
        id: &Uuid,
    ) -> impl std::future::Future<Output = Result<bool, RepositoryError>> + Send;
}
