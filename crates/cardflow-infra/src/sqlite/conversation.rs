//! SQLite conversation store.
//!
//! Implements `ConversationStore` from `cardflow-core`. Each conversation is
//! one row; the full record is kept as JSON text and replaced on every save.

use cardflow_core::conversation::ConversationStore;
use cardflow_types::conversation::ConversationRecord;
use cardflow_types::error::RepositoryError;
use sqlx::Row;
use uuid::Uuid;

use super::pool::DatabasePool;

/// SQLite-backed implementation of `ConversationStore`.
pub struct SqliteConversationStore {
    pool: DatabasePool,
}

impl SqliteConversationStore {
    pub fn new(pool: DatabasePool) -> Self {
        Self { pool }
    }
}

fn decode_record(row: &sqlx::sqlite::SqliteRow) -> Result<ConversationRecord, RepositoryError> {
    let json: String = row
        .try_get("record")
        .map_err(|e| RepositoryError::Query(e.to_string()))?;
    serde_json::from_str(&json)
        .map_err(|e| RepositoryError::Serialization(format!("invalid conversation record: {e}")))
}

impl ConversationStore for SqliteConversationStore {
    async fn get_conversation(
        &self,
        id: &Uuid,
    ) -> Result<Option<ConversationRecord>, RepositoryError> {
        let row = sqlx::query("SELECT record FROM conversations WHERE id = ?")
            .bind(id.to_string())
            .fetch_optional(&self.pool.reader)
            .await
            .map_err(|e| RepositoryError::Query(e.to_string()))?;

        row.as_ref().map(decode_record).transpose()
    }

    async fn save_conversation(&self, record: &ConversationRecord) -> Result<(), RepositoryError> {
        let json = serde_json::to_string(record)
            .map_err(|e| RepositoryError::Serialization(e.to_string()))?;

        sqlx::query(
            r#"INSERT INTO conversations (id, title, message_count, record, created_at, updated_at)
               VALUES (?, ?, ?, ?, ?, ?)
               ON CONFLICT (id) DO UPDATE SET
                   title = excluded.title,
                   message_count = excluded.message_count,
                   record = excluded.record,
                   updated_at = excluded.updated_at"#,
        )
        .bind(record.id.to_string())
        .bind(record.title.as_deref())
        .bind(record.messages.len() as i64)
        .bind(&json)
        .bind(record.created_at.to_rfc3339())
        .bind(record.updated_at.to_rfc3339())
        .execute(&self.pool.writer)
        .await
        .map_err(|e| RepositoryError::Query(e.to_string()))?;

        Ok(())
    }

    async fn list_conversations(&self) -> Result<Vec<ConversationRecord>, RepositoryError> {
        let rows = sqlx::query("SELECT record FROM conversations ORDER BY updated_at DESC")
            .fetch_all(&self.pool.reader)
            .await
            .map_err(|e| RepositoryError::Query(e.to_string()))?;

        rows.iter().map(decode_record).collect()
    }

    async fn delete_conversation(&self, id: &Uuid) -> Result<bool, RepositoryError> {
        let result = sqlx::query("DELETE FROM conversations WHERE id = ?")
            .bind(id.to_string())
            .execute(&self.pool.writer)
            .await
            .map_err(|e| RepositoryError::Query(e.to_string()))?;

        Ok(result.rows_affected() > 0)
    }
}
