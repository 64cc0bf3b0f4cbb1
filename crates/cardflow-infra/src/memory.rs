//! In-memory conversation store for tests and ephemeral runs.

use cardflow_core::conversation::ConversationStore;
use cardflow_types::conversation::ConversationRecord;
use cardflow_types::error::RepositoryError;
use dashmap::DashMap;
use uuid::Uuid;

/// `ConversationStore` over a `DashMap`. Nothing survives the process.
#[derive(Debug, Default)]
pub struct InMemoryConversationStore {
    records: DashMap<Uuid, ConversationRecord>,
}

impl InMemoryConversationStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

impl ConversationStore for InMemoryConversationStore {
    async fn get_conversation(
        &self,
        id: &Uuid,
    ) -> Result<Option<ConversationRecord>, RepositoryError> {
        Ok(self.records.get(id).map(|entry| entry.value().clone()))
    }

    async fn save_conversation(&self, record: &ConversationRecord) -> Result<(), RepositoryError> {
        self.records.insert(record.id, record.clone());
        Ok(())
    }

    async fn list_conversations(&self) -> Result<Vec<ConversationRecord>, RepositoryError> {
        let mut records: Vec<ConversationRecord> =
            self.records.iter().map(|entry| entry.value().clone()).collect();
        records.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
        Ok(records)
    }

    async fn delete_conversation(&self, id: &Uuid) -> Result<bool, RepositoryError> {
        Ok(self.records.remove(id).is_some())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::time::Duration;

    use cardflow_core::event::EventBus;
    use cardflow_core::llm::BoxLlmProvider;
    use cardflow_core::run::{RunOptions, RunOrchestrator, RunRequest};
    use cardflow_types::agent::AgentConfig;

    use crate::llm::openai_compat::OpenAiCompatibleProvider;

    #[tokio::test]
    async fn test_save_get_list_delete() {
        let store = InMemoryConversationStore::new();
        let first = ConversationRecord::new(Uuid::now_v7());
        let mut second = ConversationRecord::new(Uuid::now_v7());
        second.updated_at = first.updated_at + chrono::Duration::seconds(1);

        store.save_conversation(&first).await.unwrap();
        store.save_conversation(&second).await.unwrap();
        assert_eq!(store.len(), 2);

        let listed = store.list_conversations().await.unwrap();
        assert_eq!(listed[0].id, second.id);

        assert!(store.get_conversation(&first.id).await.unwrap().is_some());
        assert!(store.delete_conversation(&first.id).await.unwrap());
        assert!(store.get_conversation(&first.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_missing_credential_fails_each_block_but_run_completes() {
        let agent = AgentConfig::parse(
            r#"{"cards":[{"id":"card1","title":"One","adminInputs":{},
                "promptBlocks":{"promptBlock1":"a","promptBlock2":"b"}}]}"#,
        )
        .unwrap();
        let provider = OpenAiCompatibleProvider::openai(String::new().into(), "gpt-4o-mini");
        let store = Arc::new(InMemoryConversationStore::new());
        let orch = RunOrchestrator::new(
            BoxLlmProvider::new(provider),
            store.clone(),
            EventBus::default(),
            RunOptions {
                block_delay: Duration::ZERO,
                ..RunOptions::default()
            },
        );

        let summary = orch.run(RunRequest::new(agent, "Helper")).await.unwrap();
        assert_eq!(summary.failed, 2);
        assert!(
            summary.outcomes[0]
                .error
                .as_deref()
                .unwrap()
                .contains("no API key configured")
        );
        assert_eq!(store.len(), 1);
    }
}
