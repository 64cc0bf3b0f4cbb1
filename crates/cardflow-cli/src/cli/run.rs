//! `cardflow run`: execute every prompt block against the configured model.

use anyhow::Result;
use console::style;
use indicatif::{ProgressBar, ProgressStyle};
use tokio::sync::broadcast;
use uuid::Uuid;

use cardflow_core::event::EventBus;
use cardflow_core::run::{RunOptions, RunOrchestrator, RunRequest, RunSummary};
use cardflow_infra::config::resolve_api_key;
use cardflow_infra::llm::create_provider;
use cardflow_types::conversation::{ConversationMessage, MessageKind};
use cardflow_types::event::RunEvent;

use super::AgentArgs;
use super::agent::{load_agent, parse_overrides};
use crate::state::AppState;

pub async fn run(
    state: &AppState,
    args: &AgentArgs,
    input: Option<&str>,
    conversation: Option<Uuid>,
    no_stream: bool,
    json: bool,
    quiet: bool,
) -> Result<()> {
    let agent = load_agent(args).await?;
    let overrides = parse_overrides(&args.set)?;

    let provider = create_provider(
        &state.config.provider,
        resolve_api_key(&state.config.provider),
    );

    let mut options = RunOptions::from_config(&state.config);
    options.stream = !no_stream;

    let events = EventBus::new(state.config.run.event_capacity);
    let receiver = events.subscribe();

    let orchestrator = RunOrchestrator::new(provider, state.store.clone(), events, options);

    let mut request = RunRequest::new(agent, args.label.clone());
    request.conversation_id = conversation;
    request.user_input = input.unwrap_or_default().to_string();
    request.control_overrides = (!overrides.is_empty()).then_some(overrides);

    let renderer = (!json && !quiet).then(|| tokio::spawn(render_events(receiver)));

    let result = orchestrator.run(request).await;

    // Closing the bus ends the renderer once it has drained the channel.
    drop(orchestrator);
    if let Some(handle) = renderer {
        let _ = handle.await;
    }

    let summary = result?;

    if json {
        println!("{}", serde_json::to_string_pretty(&summary_json(&summary))?);
    } else if quiet {
        println!("{}", summary.conversation_id);
    } else {
        print_summary(&summary);
    }

    Ok(())
}

/// Drive a progress bar from run events and print each finished block.
async fn render_events(mut receiver: broadcast::Receiver<RunEvent>) {
    let bar = ProgressBar::new(0);
    bar.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.cyan} [{bar:30.cyan/blue}] {pos}/{len} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("=> "),
    );
    bar.enable_steady_tick(std::time::Duration::from_millis(80));

    loop {
        let event = match receiver.recv().await {
            Ok(event) => event,
            Err(broadcast::error::RecvError::Lagged(skipped)) => {
                tracing::debug!(skipped, "progress renderer lagged behind run events");
                continue;
            }
            Err(broadcast::error::RecvError::Closed) => break,
        };

        match event {
            RunEvent::MessageAdded { payload, .. } | RunEvent::MessageUpdated { payload, .. } => {
                render_message(&bar, &payload);
            }
            RunEvent::MessageStreaming { content, .. } => {
                bar.set_message(format!("receiving ({} chars)", content.chars().count()));
            }
        }
    }

    bar.finish_and_clear();
}

fn render_message(bar: &ProgressBar, message: &ConversationMessage) {
    match message.kind {
        MessageKind::Process => {
            if let Some(progress) = message.progress {
                bar.set_length(progress.total as u64);
                if progress.completed {
                    bar.set_position(progress.total as u64);
                    bar.set_message("done");
                } else if progress.current > 0 {
                    bar.set_message(format!("block {}/{}", progress.current, progress.total));
                }
            }
        }
        MessageKind::Prompt => {}
        MessageKind::Response | MessageKind::Error => {
            let label = message
                .block
                .as_ref()
                .map(|b| format!("{} › {}", b.card_id, b.block_id))
                .unwrap_or_default();
            let marker = if message.kind == MessageKind::Error {
                style("✗").red().bold()
            } else {
                style("✓").green().bold()
            };
            bar.println(format!("\n  {} {}", marker, style(label).cyan()));
            for line in message.content.lines() {
                bar.println(format!("    {line}"));
            }
            bar.inc(1);
        }
    }
}

fn print_summary(summary: &RunSummary) {
    println!();
    let done = summary.outcomes.len() - summary.failed;
    if summary.failed == 0 {
        println!(
            "  {} {} blocks completed",
            style("✓").green().bold(),
            done
        );
    } else {
        println!(
            "  {} {} blocks completed, {} failed",
            style("!").yellow().bold(),
            done,
            style(summary.failed).red()
        );
    }
    if summary.persist_failures > 0 {
        println!(
            "  {} {} conversation writes failed",
            style("!").yellow().bold(),
            summary.persist_failures
        );
    }
    println!(
        "  Conversation: {}",
        style(summary.conversation_id).dim()
    );
    println!();
}

fn summary_json(summary: &RunSummary) -> serde_json::Value {
    let blocks: Vec<serde_json::Value> = summary
        .outcomes
        .iter()
        .map(|outcome| {
            serde_json::json!({
                "cardId": outcome.block.card_id,
                "blockId": outcome.block.block_id,
                "isGlobal": outcome.block.is_global,
                "prompt": outcome.block.processed,
                "messageId": outcome.message_id,
                "response": outcome.response,
                "error": outcome.error,
            })
        })
        .collect();

    serde_json::json!({
        "conversationId": summary.conversation_id,
        "blocks": blocks,
        "failed": summary.failed,
        "persistFailures": summary.persist_failures,
    })
}
