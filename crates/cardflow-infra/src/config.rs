//! Runner configuration loader.
//!
//! Reads `config.toml` from the data directory (`~/.cardflow/` unless
//! `CARDFLOW_DATA_DIR` is set) into [`RunnerConfig`]. Falls back to
//! defaults when the file is missing or malformed.

use std::path::{Path, PathBuf};

use secrecy::SecretString;

use cardflow_types::config::{ProviderConfig, RunnerConfig};

/// Environment variable overriding the data directory.
pub const DATA_DIR_ENV: &str = "CARDFLOW_DATA_DIR";

/// `$CARDFLOW_DATA_DIR`, else `~/.cardflow`, else `./.cardflow`.
pub fn default_data_dir() -> PathBuf {
    if let Some(dir) = std::env::var_os(DATA_DIR_ENV).filter(|d| !d.is_empty()) {
        return PathBuf::from(dir);
    }
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".cardflow")
}

/// Load runner configuration from `{data_dir}/config.toml`.
///
/// - Missing file: [`RunnerConfig::default()`].
/// - Unreadable or unparsable file: a warning, then the default.
pub async fn load_runner_config(data_dir: &Path) -> RunnerConfig {
    let config_path = data_dir.join("config.toml");

    let content = match tokio::fs::read_to_string(&config_path).await {
        Ok(content) => content,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
            tracing::debug!("No config.toml found at {}, using defaults", config_path.display());
            return RunnerConfig::default();
        }
        Err(err) => {
            tracing::warn!("Failed to read {}: {err}, using defaults", config_path.display());
            return RunnerConfig::default();
        }
    };

    match toml::from_str::<RunnerConfig>(&content) {
        Ok(config) => config,
        Err(err) => {
            tracing::warn!(
                "Failed to parse {}: {err}, using defaults",
                config_path.display()
            );
            RunnerConfig::default()
        }
    }
}

/// The API key from the environment variable named by `api_key_env`.
///
/// An unset variable yields an empty secret; the provider then reports a
/// missing credential for each block instead of failing up front.
pub fn resolve_api_key(provider: &ProviderConfig) -> SecretString {
    let key = std::env::var(&provider.api_key_env).unwrap_or_default();
    if key.is_empty() {
        tracing::debug!(env = %provider.api_key_env, "no API key in environment");
    }
    SecretString::from(key)
}
