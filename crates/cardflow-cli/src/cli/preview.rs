//! `cardflow preview`: resolve all blocks and print them, no model calls.

use anyhow::Result;
use console::style;

use cardflow_core::template::placeholder::highlight_unreplaced;
use cardflow_core::template::{BatchOutput, process_all};
use cardflow_types::block::ProcessedPromptBlock;

use super::AgentArgs;
use super::agent::{load_agent, parse_overrides};

pub async fn preview(args: &AgentArgs, input: Option<&str>, json: bool) -> Result<()> {
    let agent = load_agent(args).await?;
    let overrides = parse_overrides(&args.set)?;

    let output = process_all(
        &agent.cards,
        &agent.global_prompt_blocks,
        &overrides,
        &args.label,
        input.unwrap_or_default(),
    );

    if json {
        println!("{}", serde_json::to_string_pretty(&preview_json(&output))?);
        return Ok(());
    }

    if output.total() == 0 {
        println!();
        println!(
            "  {} The agent has no prompt blocks.",
            style("i").blue().bold()
        );
        println!();
        return Ok(());
    }

    println!();
    for block in output.iter_all() {
        print_block(block);
    }

    let unreplaced = output.unreplaced_total();
    if unreplaced == 0 {
        println!(
            "  {} {} blocks, all placeholders resolved",
            style("✓").green().bold(),
            output.total()
        );
    } else {
        println!(
            "  {} {} blocks, {} unresolved placeholders",
            style("!").yellow().bold(),
            output.total(),
            style(unreplaced).yellow()
        );
    }
    println!();

    Ok(())
}

fn print_block(block: &ProcessedPromptBlock) {
    let counts = if block.is_fully_resolved() {
        style(format!("{} replaced", block.replaced_count)).dim()
    } else {
        style(format!(
            "{} replaced, {} unresolved",
            block.replaced_count, block.unreplaced_count
        ))
        .yellow()
    };

    println!(
        "  {} {} {}",
        style(&block.card_title).cyan().bold(),
        style(format!("› {}", block.block_id)).cyan(),
        counts
    );

    let text = highlight_unreplaced(&block.processed, |token| {
        style(token).red().underlined().to_string()
    });
    for line in text.lines() {
        println!("    {line}");
    }
    println!();
}

fn preview_json(output: &BatchOutput) -> serde_json::Value {
    serde_json::json!({
        "cardBlocks": output.card_blocks,
        "globalBlocks": output.global_blocks,
        "total": output.total(),
        "unreplacedTotal": output.unreplaced_total(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use cardflow_core::template::ControlValues;
    use cardflow_types::agent::AgentConfig;

    #[test]
    fn test_preview_json_reports_blocks_and_totals() {
        let agent = AgentConfig::parse(
            r#"{
                "cards": [{
                    "id": "card1",
                    "title": "Profile",
                    "adminInputs": {"inputB1": "Name <def>Alice</def>"},
                    "promptBlocks": {"promptBlock1": "Hi {#inputB1} {#nope}"}
                }],
                "globalPromptBlocks": {"wrap": "{#card1.promptBlock1}"}
            }"#,
        )
        .unwrap();
        let output = process_all(
            &agent.cards,
            &agent.global_prompt_blocks,
            &ControlValues::new(),
            "Agent",
            "",
        );

        let json = preview_json(&output);
        assert_eq!(json["total"], 2);
        assert_eq!(json["cardBlocks"][0]["processed"], "Hi Alice {#nope}");
        assert_eq!(json["globalBlocks"][0]["cardId"], "global");
        assert_eq!(json["unreplacedTotal"], 2);
    }
}
