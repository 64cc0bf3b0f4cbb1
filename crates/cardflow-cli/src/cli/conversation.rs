//! Conversation commands: list, show, delete.

use anyhow::{Result, bail};
use chrono::{DateTime, Utc};
use comfy_table::{Cell, Color, ContentArrangement, Table, presets};
use console::style;
use uuid::Uuid;

use cardflow_core::conversation::ConversationStore;
use cardflow_types::conversation::{ConversationMessage, ConversationRecord, MessageKind};

use crate::state::AppState;

pub async fn list_conversations(state: &AppState, json: bool) -> Result<()> {
    let records = state.store.list_conversations().await?;

    if json {
        let rows: Vec<serde_json::Value> = records.iter().map(summary_row).collect();
        println!("{}", serde_json::to_string_pretty(&rows)?);
        return Ok(());
    }

    if records.is_empty() {
        println!();
        println!(
            "  {} No conversations yet. Start one with: {}",
            style("i").blue().bold(),
            style("cardflow run <agent.json>").yellow()
        );
        println!();
        return Ok(());
    }

    let mut table = Table::new();
    table.load_preset(presets::UTF8_FULL_CONDENSED);
    table.set_content_arrangement(ContentArrangement::Dynamic);

    table.set_header(vec![
        Cell::new("Id").fg(Color::White),
        Cell::new("Title").fg(Color::White),
        Cell::new("Messages").fg(Color::White),
        Cell::new("Progress").fg(Color::White),
        Cell::new("Updated").fg(Color::White),
    ]);

    for record in &records {
        let progress = match record.latest_progress() {
            Some(p) if p.completed => Cell::new(format!("● {}/{}", p.current, p.total)).fg(Color::Green),
            Some(p) => Cell::new(format!("○ {}/{}", p.current, p.total)).fg(Color::Yellow),
            None => Cell::new("-").fg(Color::DarkGrey),
        };

        table.add_row(vec![
            Cell::new(record.id).fg(Color::Cyan),
            Cell::new(truncate(record.title.as_deref().unwrap_or("(untitled)"), 40)),
            Cell::new(record.messages.len()),
            progress,
            Cell::new(format_relative_time(&record.updated_at)).fg(Color::DarkGrey),
        ]);
    }

    println!("{table}");
    Ok(())
}

pub async fn show_conversation(state: &AppState, id: Uuid, json: bool) -> Result<()> {
    let Some(record) = state.store.get_conversation(&id).await? else {
        bail!("conversation {id} not found");
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&record)?);
        return Ok(());
    }

    println!();
    println!(
        "  {} {}",
        style(record.title.as_deref().unwrap_or("(untitled)")).cyan().bold(),
        style(record.id).dim()
    );
    if let Some(progress) = record.latest_progress() {
        println!(
            "  {} {}/{} blocks ({} card, {} global){}",
            style("Progress:").dim(),
            progress.current,
            progress.total,
            progress.card_blocks,
            progress.global_blocks,
            if progress.completed { ", completed" } else { "" }
        );
    }
    println!();

    for message in &record.messages {
        print_message(message);
    }

    Ok(())
}

pub async fn delete_conversation(state: &AppState, id: Uuid, json: bool) -> Result<()> {
    let deleted = state.store.delete_conversation(&id).await?;

    if json {
        println!(
            "{}",
            serde_json::to_string_pretty(&serde_json::json!({ "id": id, "deleted": deleted }))?
        );
        return Ok(());
    }

    if deleted {
        println!("  {} Deleted conversation {}", style("✓").green().bold(), id);
    } else {
        println!("  {} No conversation {}", style("i").blue().bold(), id);
    }
    Ok(())
}

fn print_message(message: &ConversationMessage) {
    let header = match message.kind {
        MessageKind::Process => return,
        MessageKind::Prompt => style("prompt").yellow(),
        MessageKind::Response => style("response").green(),
        MessageKind::Error => style("error").red(),
    };
    let block = message
        .block
        .as_ref()
        .map(|b| format!("{}.{}", b.card_id, b.block_id))
        .unwrap_or_default();

    println!("  {} {}", header.bold(), style(block).dim());
    for line in message.content.lines() {
        println!("    {line}");
    }
    println!();
}

fn summary_row(record: &ConversationRecord) -> serde_json::Value {
    serde_json::json!({
        "id": record.id,
        "title": record.title,
        "messageCount": record.messages.len(),
        "progress": record.latest_progress(),
        "createdAt": record.created_at,
        "updatedAt": record.updated_at,
    })
}

fn truncate(text: &str, max_chars: usize) -> String {
    if text.chars().count() > max_chars {
        let cut: String = text.chars().take(max_chars.saturating_sub(3)).collect();
        format!("{cut}...")
    } else {
        text.to_string()
    }
}

fn format_relative_time(dt: &DateTime<Utc>) -> String {
    let seconds = Utc::now().signed_duration_since(*dt).num_seconds();
    match seconds {
        s if s < 60 => "just now".to_string(),
        s if s < 3600 => format!("{}m ago", s / 60),
        s if s < 86_400 => format!("{}h ago", s / 3600),
        s => format!("{}d ago", s / 86_400),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn test_truncate_counts_chars() {
        assert_eq!(truncate("short", 10), "short");
        assert_eq!(truncate("ééééééééééé", 6), "ééé...");
    }

    #[test]
    fn test_relative_time_buckets() {
        let now = Utc::now();
        assert_eq!(format_relative_time(&now), "just now");
        assert_eq!(format_relative_time(&(now - Duration::minutes(5))), "5m ago");
        assert_eq!(format_relative_time(&(now - Duration::hours(3))), "3h ago");
        assert_eq!(format_relative_time(&(now - Duration::days(2))), "2d ago");
    }

    #[test]
    fn test_summary_row_includes_progress() {
        let record = ConversationRecord::new(Uuid::now_v7());
        let row = summary_row(&record);
        assert_eq!(row["messageCount"], 0);
        assert!(row["progress"].is_null());
    }
}
