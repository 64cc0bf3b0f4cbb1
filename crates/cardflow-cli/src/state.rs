//! Application state shared by the commands that touch the data directory.

use std::path::PathBuf;
use std::sync::Arc;

use cardflow_infra::config::{default_data_dir, load_runner_config};
use cardflow_infra::sqlite::conversation::SqliteConversationStore;
use cardflow_infra::sqlite::pool::{DatabasePool, database_url};
use cardflow_types::config::RunnerConfig;

pub struct AppState {
    pub data_dir: PathBuf,
    pub config: RunnerConfig,
    pub store: Arc<SqliteConversationStore>,
}

impl AppState {
    /// Create the data directory if needed, load `config.toml`, open the database.
    pub async fn init(data_dir: Option<PathBuf>) -> anyhow::Result<Self> {
        let data_dir = data_dir.unwrap_or_else(default_data_dir);
        tokio::fs::create_dir_all(&data_dir).await?;

        let config = load_runner_config(&data_dir).await;

        let db_pool = DatabasePool::new(&database_url(&data_dir)).await?;

        tracing::debug!(data_dir = %data_dir.display(), "application state ready");

        Ok(Self {
            data_dir,
            config,
            store: Arc::new(SqliteConversationStore::new(db_pool)),
        })
    }
}
