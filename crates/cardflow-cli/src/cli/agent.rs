//! Loading an agent file and its control overrides from CLI arguments.

use anyhow::{Context, Result, bail};

use cardflow_core::template::ControlValues;
use cardflow_types::agent::AgentConfig;

use super::AgentArgs;

/// Read and validate the agent file named by `args`.
pub async fn load_agent(args: &AgentArgs) -> Result<AgentConfig> {
    let text = tokio::fs::read_to_string(&args.file)
        .await
        .with_context(|| format!("failed to read agent file {}", args.file.display()))?;

    let config = if args.from_model_output {
        AgentConfig::from_model_output(&text)
    } else {
        AgentConfig::parse(&text)
    };

    config.with_context(|| format!("invalid agent file {}", args.file.display()))
}

/// Parse the repeated `--set key=value` arguments.
pub fn parse_overrides(assignments: &[String]) -> Result<ControlValues> {
    let mut values = ControlValues::new();
    for assignment in assignments {
        let Some((key, value)) = ControlValues::parse_assignment(assignment) else {
            bail!("invalid --set '{assignment}', expected KEY=VALUE");
        };
        values.set(key, value);
    }
    Ok(values)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn args(file: PathBuf, from_model_output: bool) -> AgentArgs {
        AgentArgs {
            file,
            label: "Agent".to_string(),
            set: Vec::new(),
            from_model_output,
        }
    }

    #[test]
    fn test_parse_overrides_collects_assignments() {
        let values =
            parse_overrides(&["inputB1=Zed".to_string(), "card2.tone=dry".to_string()]).unwrap();
        assert_eq!(values.rendered("inputB1"), Some("Zed".to_string()));
        assert_eq!(values.rendered("card2.tone"), Some("dry".to_string()));
    }

    #[test]
    fn test_parse_overrides_rejects_missing_equals() {
        let err = parse_overrides(&["inputB1".to_string()]).unwrap_err();
        assert!(err.to_string().contains("expected KEY=VALUE"));
    }

    #[tokio::test]
    async fn test_load_agent_reads_plain_and_model_output_files() {
        let dir = tempfile::TempDir::new().unwrap();
        let plain = dir.path().join("agent.json");
        tokio::fs::write(
            &plain,
            r#"{"cards":[{"id":"card1","adminInputs":{},"promptBlocks":{"promptBlock1":"Hi"}}]}"#,
        )
        .await
        .unwrap();
        let config = load_agent(&args(plain, false)).await.unwrap();
        assert_eq!(config.cards.len(), 1);

        let wrapped = dir.path().join("reply.md");
        tokio::fs::write(
            &wrapped,
            "Here you go:\n```json\n{\"cards\":[{\"id\":\"c\",\"adminInputs\":{},\"promptBlocks\":{}}]}\n```\n",
        )
        .await
        .unwrap();
        let config = load_agent(&args(wrapped, true)).await.unwrap();
        assert_eq!(config.cards[0].id, "c");
    }

    #[tokio::test]
    async fn test_load_agent_reports_the_path() {
        let dir = tempfile::TempDir::new().unwrap();
        let missing = dir.path().join("missing.json");
        let err = load_agent(&args(missing, false)).await.unwrap_err();
        assert!(err.to_string().contains("missing.json"));
    }
}
