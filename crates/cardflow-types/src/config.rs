//! Runner configuration types for cardflow.
//!
//! `RunnerConfig` represents the `config.toml` in the data directory that
//! selects the model provider and tunes how runs are executed.

use serde::{Deserialize, Serialize};

/// Top-level configuration. All fields have sensible defaults.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RunnerConfig {
    #[serde(default)]
    pub provider: ProviderConfig,

    #[serde(default)]
    pub run: RunConfig,
}

/// Which OpenAI-compatible endpoint to talk to.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProviderConfig {
    /// Provider name ("openai", "mistral", "gemini", or anything custom).
    #[serde(default = "default_provider_name")]
    pub name: String,

    /// Base URL override. Known providers fill this in when absent.
    #[serde(default)]
    pub base_url: Option<String>,

    #[serde(default = "default_model")]
    pub model: String,

    /// Environment variable holding the API key.
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,
}

fn default_provider_name() -> String {
    "openai".to_string()
}

fn default_model() -> String {
    "gpt-4o-mini".to_string()
}

fn default_api_key_env() -> String {
    "OPENAI_API_KEY".to_string()
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            name: default_provider_name(),
            base_url: None,
            model: default_model(),
            api_key_env: default_api_key_env(),
        }
    }
}

/// Execution tuning for the run orchestrator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunConfig {
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,

    #[serde(default)]
    pub temperature: Option<f64>,

    #[serde(default)]
    pub system_prompt: Option<String>,

    /// Pause between blocks, in milliseconds, to pace UI updates.
    #[serde(default = "default_block_delay_ms")]
    pub block_delay_ms: u64,

    /// Capacity of the run event broadcast channel.
    #[serde(default = "default_event_capacity")]
    pub event_capacity: usize,
}

fn default_max_tokens() -> u32 {
    4096
}

fn default_block_delay_ms() -> u64 {
    500
}

fn default_event_capacity() -> usize {
    1024
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            max_tokens: default_max_tokens(),
            temperature: None,
            system_prompt: None,
            block_delay_ms: default_block_delay_ms(),
            event_capacity: default_event_capacity(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_runner_config_default_values() {
        let config = RunnerConfig::default();
        assert_eq!(config.provider.name, "openai");
        assert_eq!(config.provider.api_key_env, "OPENAI_API_KEY");
        assert_eq!(config.run.max_tokens, 4096);
        assert_eq!(config.run.block_delay_ms, 500);
        assert!(config.run.system_prompt.is_none());
    }

    #[test]
    fn test_runner_config_deserialize_with_defaults() {
        let config: RunnerConfig = toml::from_str("").unwrap();
        assert_eq!(config, RunnerConfig::default());
    }

    #[test]
    fn test_runner_config_deserialize_with_values() {
        let toml_str = r#"
[provider]
name = "mistral"
model = "mistral-large-latest"
api_key_env = "MISTRAL_API_KEY"

[run]
max_tokens = 2048
temperature = 0.2
block_delay_ms = 0
"#;
        let config: RunnerConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.provider.name, "mistral");
        assert_eq!(config.provider.model, "mistral-large-latest");
        assert!(config.provider.base_url.is_none());
        assert_eq!(config.run.max_tokens, 2048);
        assert_eq!(config.run.temperature, Some(0.2));
        assert_eq!(config.run.block_delay_ms, 0);
        assert_eq!(config.run.event_capacity, 1024);
    }
}
