//! LLM provider implementations.
//!
//! Every supported backend speaks the OpenAI chat completions protocol, so a
//! single [`OpenAiCompatibleProvider`] covers them all. [`create_provider`]
//! picks base URL defaults from the configured provider name.

pub mod openai_compat;

use secrecy::SecretString;

use cardflow_core::llm::BoxLlmProvider;
use cardflow_types::config::ProviderConfig;

use self::openai_compat::OpenAiCompatibleProvider;
use self::openai_compat::config::OpenAiCompatConfig;

/// Create a [`BoxLlmProvider`] from a [`ProviderConfig`].
///
/// An explicit `base_url` wins; otherwise well-known names select their
/// endpoint and anything else falls back to OpenAI's. An empty `api_key`
/// is accepted here and reported per request.
pub fn create_provider(config: &ProviderConfig, api_key: SecretString) -> BoxLlmProvider {
    let provider = match config.base_url.as_deref() {
        Some(base_url) => OpenAiCompatibleProvider::new(OpenAiCompatConfig {
            provider_name: config.name.clone(),
            base_url: base_url.to_string(),
            api_key,
            model: config.model.clone(),
        }),
        None => match config.name.as_str() {
            "gemini" => OpenAiCompatibleProvider::gemini(api_key, &config.model),
            "mistral" => OpenAiCompatibleProvider::mistral(api_key, &config.model),
            _ => OpenAiCompatibleProvider::openai(api_key, &config.model),
        },
    };
    BoxLlmProvider::new(provider)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn provider_config(name: &str, base_url: Option<&str>) -> ProviderConfig {
        ProviderConfig {
            name: name.to_string(),
            base_url: base_url.map(str::to_string),
            model: "some-model".to_string(),
            api_key_env: "TEST_KEY".to_string(),
        }
    }

    #[test]
    fn test_create_provider_by_name() {
        for name in ["openai", "gemini", "mistral"] {
            let provider = create_provider(&provider_config(name, None), "key".into());
            assert_eq!(provider.name(), name);
        }
    }

    #[test]
    fn test_create_provider_unknown_name_uses_openai_endpoint() {
        let provider = create_provider(&provider_config("acme", None), "key".into());
        assert_eq!(provider.name(), "openai");
    }

    #[test]
    fn test_create_provider_with_base_url_keeps_name() {
        let provider = create_provider(
            &provider_config("local", Some("http://localhost:11434/v1")),
            "key".into(),
        );
        assert_eq!(provider.name(), "local");
    }
}
