//! `cardflow config`: print the effective runner configuration.

use anyhow::Result;
use comfy_table::{Cell, Color, ContentArrangement, Table, presets};
use console::style;

use cardflow_types::config::RunnerConfig;

use crate::state::AppState;

pub fn show_config(state: &AppState, json: bool) -> Result<()> {
    let config = &state.config;
    let key_present = std::env::var(&config.provider.api_key_env).is_ok_and(|v| !v.is_empty());

    if json {
        let value = serde_json::json!({
            "dataDir": state.data_dir,
            "config": config,
            "apiKeyPresent": key_present,
        });
        println!("{}", serde_json::to_string_pretty(&value)?);
        return Ok(());
    }

    println!();
    println!(
        "  Configuration from {}",
        style(state.data_dir.join("config.toml").display()).cyan()
    );
    println!();

    let mut table = Table::new();
    table.load_preset(presets::UTF8_FULL_CONDENSED);
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(vec![
        Cell::new("Setting").fg(Color::White),
        Cell::new("Value").fg(Color::White),
    ]);

    for (setting, value) in config_rows(config) {
        table.add_row(vec![Cell::new(setting).fg(Color::Cyan), Cell::new(value)]);
    }

    let key_cell = if key_present {
        Cell::new(format!("● set ({})", config.provider.api_key_env)).fg(Color::Green)
    } else {
        Cell::new(format!("○ missing ({})", config.provider.api_key_env)).fg(Color::Yellow)
    };
    table.add_row(vec![Cell::new("provider.api_key").fg(Color::Cyan), key_cell]);

    println!("{table}");
    println!();
    Ok(())
}

fn config_rows(config: &RunnerConfig) -> Vec<(&'static str, String)> {
    vec![
        ("provider.name", config.provider.name.clone()),
        (
            "provider.base_url",
            config
                .provider
                .base_url
                .clone()
                .unwrap_or_else(|| "(provider default)".to_string()),
        ),
        ("provider.model", config.provider.model.clone()),
        ("run.max_tokens", config.run.max_tokens.to_string()),
        (
            "run.temperature",
            config
                .run
                .temperature
                .map(|t| t.to_string())
                .unwrap_or_else(|| "(model default)".to_string()),
        ),
        (
            "run.system_prompt",
            config
                .run
                .system_prompt
                .clone()
                .unwrap_or_else(|| "(none)".to_string()),
        ),
        ("run.block_delay_ms", config.run.block_delay_ms.to_string()),
        ("run.event_capacity", config.run.event_capacity.to_string()),
    ]
}
