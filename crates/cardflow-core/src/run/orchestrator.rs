//! Run orchestrator: one model call per resolved block, strictly in order.
//!
//! A run announces itself with a "process" message carrying
//! [`ProgressInfo`], then for each block (card blocks first, then global
//! blocks) advances progress, records the submitted prompt, streams the
//! model's answer and records it. Each successful prompt/response pair is
//! appended to the context sent with every later block. Model errors are
//! recorded per block and never abort the run.

use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use futures_util::StreamExt;
use tracing::{Instrument, debug, info, info_span, warn};
use uuid::Uuid;

use cardflow_types::agent::AgentConfig;
use cardflow_types::block::{ProcessedPromptBlock, ProgressInfo};
use cardflow_types::config::RunnerConfig;
use cardflow_types::conversation::{ConversationMessage, ConversationRecord, MessageKind};
use cardflow_types::error::RepositoryError;
use cardflow_types::event::RunEvent;
use cardflow_types::llm::{CompletionRequest, LlmError, Message, MessageRole, StreamEvent};

use crate::conversation::ConversationStore;
use crate::event::EventBus;
use crate::llm::BoxLlmProvider;
use crate::template::{ControlValues, process_all};

use super::state::RunState;

/// Errors that stop a run before its first block executes.
#[derive(Debug, thiserror::Error)]
pub enum RunError {
    #[error("a run is already in progress ({0})")]
    Busy(RunState),

    #[error("agent has no prompt blocks to run")]
    NothingToRun,

    #[error("failed to load conversation: {0}")]
    Store(#[from] RepositoryError),
}

/// Model parameters and pacing for every block of a run.
#[derive(Debug, Clone)]
pub struct RunOptions {
    /// Empty means "provider default".
    pub model: String,
    pub max_tokens: u32,
    pub temperature: Option<f64>,
    /// Sent as the request's system field, never as a context turn.
    pub system_prompt: Option<String>,
    /// Pause between consecutive blocks.
    pub block_delay: Duration,
    /// Use the provider's streaming endpoint and publish partial text.
    pub stream: bool,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            model: String::new(),
            max_tokens: 4096,
            temperature: None,
            system_prompt: None,
            block_delay: Duration::from_millis(500),
            stream: true,
        }
    }
}

impl RunOptions {
    pub fn from_config(config: &RunnerConfig) -> Self {
        Self {
            model: config.provider.model.clone(),
            max_tokens: config.run.max_tokens,
            temperature: config.run.temperature,
            system_prompt: config.run.system_prompt.clone(),
            block_delay: Duration::from_millis(config.run.block_delay_ms),
            stream: true,
        }
    }
}

/// Input to [`RunOrchestrator::run`].
#[derive(Debug, Clone)]
pub struct RunRequest {
    /// Conversation to append to; a new one is created when `None` or unknown.
    pub conversation_id: Option<Uuid>,
    pub agent: AgentConfig,
    /// Stands in for `{#input}` when `user_input` is empty.
    pub agent_label: String,
    pub user_input: String,
    /// Operator edits layered over admin-input defaults.
    pub control_overrides: Option<ControlValues>,
}

impl RunRequest {
    pub fn new(agent: AgentConfig, agent_label: impl Into<String>) -> Self {
        Self {
            conversation_id: None,
            agent,
            agent_label: agent_label.into(),
            user_input: String::new(),
            control_overrides: None,
        }
    }
}

/// What happened to one block.
#[derive(Debug, Clone)]
pub struct BlockOutcome {
    pub block: ProcessedPromptBlock,
    /// Id of the response (or error) message.
    pub message_id: Uuid,
    pub response: Option<String>,
    pub error: Option<String>,
}

impl BlockOutcome {
    pub fn succeeded(&self) -> bool {
        self.error.is_none()
    }
}

/// Result of a run that got past resolution.
#[derive(Debug, Clone)]
pub struct RunSummary {
    pub conversation_id: Uuid,
    pub outcomes: Vec<BlockOutcome>,
    /// Blocks whose model call failed.
    pub failed: usize,
    /// Conversation writes that failed; the run kept its in-memory record.
    pub persist_failures: usize,
}

/// Drives runs against one model provider and one conversation store.
///
/// An orchestrator executes at most one run at a time; a second `run` call
/// while one is in progress fails with [`RunError::Busy`].
pub struct RunOrchestrator<S: ConversationStore> {
    provider: BoxLlmProvider,
    store: Arc<S>,
    events: EventBus,
    options: RunOptions,
    state: Mutex<RunState>,
}

impl<S: ConversationStore> RunOrchestrator<S> {
    pub fn new(provider: BoxLlmProvider, store: Arc<S>, events: EventBus, options: RunOptions) -> Self {
        Self {
            provider,
            store,
            events,
            options,
            state: Mutex::new(RunState::Idle),
        }
    }

    pub fn state(&self) -> RunState {
        *lock(&self.state)
    }

    pub fn events(&self) -> &EventBus {
        &self.events
    }

    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    pub fn options(&self) -> &RunOptions {
        &self.options
    }

    /// Resolve `request.agent` and execute every block in order.
    pub async fn run(&self, request: RunRequest) -> Result<RunSummary, RunError> {
        let guard = RunGuard::acquire(&self.state)?;

        let overrides = request.control_overrides.unwrap_or_default();
        let batch = process_all(
            &request.agent.cards,
            &request.agent.global_prompt_blocks,
            &overrides,
            &request.agent_label,
            &request.user_input,
        );
        if batch.total() == 0 {
            return Err(RunError::NothingToRun);
        }

        let conversation_id = request.conversation_id.unwrap_or_else(Uuid::now_v7);
        let mut record = match self.store.get_conversation(&conversation_id).await? {
            Some(record) => record,
            None => {
                let mut record = ConversationRecord::new(conversation_id);
                record.title = Some(request.agent_label.clone());
                record
            }
        };

        let mut run = ActiveRun {
            record: &mut record,
            store: self.store.as_ref(),
            events: &self.events,
            persist_failures: 0,
        };

        let mut progress = ProgressInfo::new(batch.card_blocks.len(), batch.global_blocks.len());
        let mut process = ConversationMessage::new(
            MessageRole::System,
            MessageKind::Process,
            format!(
                "Running {} prompt blocks for {}",
                progress.total, request.agent_label
            ),
        )
        .with_progress(progress);
        run.add(process.clone()).await;

        info!(
            conversation_id = %conversation_id,
            card_blocks = progress.card_blocks,
            global_blocks = progress.global_blocks,
            "run started"
        );

        let mut context: Vec<Message> = Vec::new();
        let mut outcomes = Vec::with_capacity(progress.total);

        for (index, block) in batch.iter_all().enumerate() {
            let position = index + 1;
            guard.set(RunState::Running {
                block_index: position,
            });

            progress.advance(position);
            process.progress = Some(progress);
            // The last block's progress goes out with the completion update.
            if position < progress.total {
                run.update(process.clone()).await;
            }

            let prompt = ConversationMessage::new(
                MessageRole::User,
                MessageKind::Prompt,
                block.processed.clone(),
            )
            .with_block(block.block_ref());
            run.add(prompt).await;

            let mut reply = ConversationMessage::new(
                MessageRole::Assistant,
                MessageKind::Response,
                String::new(),
            )
            .with_block(block.block_ref());

            let span = info_span!(
                "cardflow.block",
                conversation_id = %conversation_id,
                card_id = %block.card_id,
                block_id = %block.block_id,
                position,
                total = progress.total,
            );
            let result = self
                .execute_block(conversation_id, reply.id, &context, &block.processed)
                .instrument(span)
                .await;

            let outcome = match result {
                Ok(text) => {
                    reply.content = text.clone();
                    context.push(Message::user(block.processed.clone()));
                    context.push(Message::assistant(text.clone()));
                    BlockOutcome {
                        block: block.clone(),
                        message_id: reply.id,
                        response: Some(text),
                        error: None,
                    }
                }
                Err(e) => {
                    warn!(
                        conversation_id = %conversation_id,
                        card_id = %block.card_id,
                        block_id = %block.block_id,
                        error = %e,
                        "block failed, continuing"
                    );
                    reply.kind = MessageKind::Error;
                    reply.content = format!("Error: {e}");
                    BlockOutcome {
                        block: block.clone(),
                        message_id: reply.id,
                        response: None,
                        error: Some(e.to_string()),
                    }
                }
            };
            run.add(reply).await;
            outcomes.push(outcome);

            if position < progress.total && !self.options.block_delay.is_zero() {
                tokio::time::sleep(self.options.block_delay).await;
            }
        }

        progress.complete();
        process.progress = Some(progress);
        run.update(process).await;

        let failed = outcomes.iter().filter(|o| !o.succeeded()).count();
        let persist_failures = run.persist_failures;
        guard.finish();

        info!(
            conversation_id = %conversation_id,
            blocks = outcomes.len(),
            failed,
            persist_failures,
            "run completed"
        );

        Ok(RunSummary {
            conversation_id,
            outcomes,
            failed,
            persist_failures,
        })
    }

    /// Send one block with the accumulated context and return the full reply.
    async fn execute_block(
        &self,
        conversation_id: Uuid,
        message_id: Uuid,
        context: &[Message],
        prompt: &str,
    ) -> Result<String, LlmError> {
        let mut messages = context.to_vec();
        messages.push(Message::user(prompt));

        let request = CompletionRequest {
            model: self.options.model.clone(),
            messages,
            system: self.options.system_prompt.clone(),
            max_tokens: self.options.max_tokens,
            temperature: self.options.temperature,
            stream: self.options.stream,
        };

        debug!(
            provider = self.provider.name(),
            context_turns = context.len(),
            "sending block"
        );

        if !self.options.stream {
            return self.provider.complete(&request).await.map(|r| r.content);
        }

        let mut stream = self.provider.stream(request);
        let mut text = String::new();
        while let Some(event) = stream.next().await {
            match event? {
                StreamEvent::TextDelta { text: delta } => {
                    text.push_str(&delta);
                    self.events.publish(RunEvent::MessageStreaming {
                        conversation_id,
                        message_id,
                        content: text.clone(),
                    });
                }
                StreamEvent::Done => break,
                _ => {}
            }
        }
        Ok(text)
    }
}

/// The conversation being written by a run.
struct ActiveRun<'a, S: ConversationStore> {
    record: &'a mut ConversationRecord,
    store: &'a S,
    events: &'a EventBus,
    persist_failures: usize,
}

impl<S: ConversationStore> ActiveRun<'_, S> {
    async fn add(&mut self, message: ConversationMessage) {
        let message_id = message.id;
        self.record.upsert_message(message.clone());
        self.persist().await;
        self.events.publish(RunEvent::MessageAdded {
            conversation_id: self.record.id,
            message_id,
            payload: message,
        });
    }

    async fn update(&mut self, message: ConversationMessage) {
        let message_id = message.id;
        self.record.upsert_message(message.clone());
        self.persist().await;
        self.events.publish(RunEvent::MessageUpdated {
            conversation_id: self.record.id,
            message_id,
            payload: message,
        });
    }

    async fn persist(&mut self) {
        if let Err(e) = self.store.save_conversation(self.record).await {
            self.persist_failures += 1;
            warn!(conversation_id = %self.record.id, error = %e, "failed to persist conversation");
        }
    }
}

/// Holds the orchestrator's busy state for the lifetime of one run.
///
/// Dropping the guard before [`RunGuard::finish`] rolls the state back:
/// an announced run returns to the previous state, a running one fails.
struct RunGuard<'a> {
    state: &'a Mutex<RunState>,
    previous: RunState,
    finished: bool,
}

impl<'a> RunGuard<'a> {
    fn acquire(state: &'a Mutex<RunState>) -> Result<Self, RunError> {
        let mut current = lock(state);
        if current.is_busy() {
            return Err(RunError::Busy(*current));
        }
        let previous = *current;
        *current = RunState::Announced;
        Ok(Self {
            state,
            previous,
            finished: false,
        })
    }

    fn set(&self, next: RunState) {
        *lock(self.state) = next;
    }

    fn finish(mut self) {
        self.set(RunState::Completed);
        self.finished = true;
    }
}

impl Drop for RunGuard<'_> {
    fn drop(&mut self) {
        if self.finished {
            return;
        }
        let mut current = lock(self.state);
        *current = match *current {
            RunState::Running { block_index } => RunState::Failed { block_index },
            _ => self.previous,
        };
    }
}

fn lock(state: &Mutex<RunState>) -> MutexGuard<'_, RunState> {
    state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}
