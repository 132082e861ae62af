//! Agent Configuration
//!
//! Loads and saves the runtime configuration from `~/.automind/automind.json`.

use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::PathBuf;

use anyhow::{Context, Result};

use crate::types::{default_config, AgentConfig};

#[cfg(test)]
use crate::types::LogLevel;

/// Config file name within the agent directory.
const CONFIG_FILENAME: &str = "automind.json";

/// Returns the agent's home directory: `~/.automind`.
pub fn get_agent_dir() -> PathBuf {
    let home = dirs::home_dir().unwrap_or_else(|| PathBuf::from("/root"));
    home.join(".automind")
}

/// Returns the full path to the config file: `~/.automind/automind.json`.
pub fn get_config_path() -> PathBuf {
    get_agent_dir().join(CONFIG_FILENAME)
}

/// Load the agent config from disk.
///
/// Reads `~/.automind/automind.json` and merges missing fields with defaults.
/// Returns `None` if the config file does not exist or cannot be parsed.
pub fn load_config() -> Option<AgentConfig> {
    let config_path = get_config_path();
    if !config_path.exists() {
        return None;
    }

    let contents = fs::read_to_string(&config_path).ok()?;
    let mut config: AgentConfig = serde_json::from_str(&contents).ok()?;

    // Merge defaults for unset fields
    let defaults = default_config();

    if config.name.is_empty() {
        config.name = defaults.name;
    }
    if config.inference_api_url.is_empty() {
        config.inference_api_url = defaults.inference_api_url;
    }
    if config.inference_model.is_empty() {
        config.inference_model = defaults.inference_model;
    }
    if config.max_tokens_per_call == 0 {
        config.max_tokens_per_call = defaults.max_tokens_per_call;
    }
    if config.max_steps == 0 {
        config.max_steps = defaults.max_steps;
    }
    if config.tool_call_limit == 0 {
        config.tool_call_limit = defaults.tool_call_limit;
    }
    if config.sensitive_words_path.is_empty() {
        config.sensitive_words_path = defaults.sensitive_words_path;
    }
    if config.workspace_dir.is_empty() {
        config.workspace_dir = defaults.workspace_dir;
    }
    if config.db_path.is_empty() {
        config.db_path = defaults.db_path;
    }
    if config.version.is_empty() {
        config.version = defaults.version;
    }

    // Fall back to the environment for the API key
    if config.inference_api_key.is_empty() {
        if let Ok(key) = std::env::var("AUTOMIND_API_KEY") {
            config.inference_api_key = key;
        }
    }

    Some(config)
}

/// Save the agent config to disk at `~/.automind/automind.json`.
///
/// Creates the agent directory with mode 0o700 if it does not exist.
/// The config file is written with mode 0o600 since it contains an API key.
pub fn save_config(config: &AgentConfig) -> Result<()> {
    let dir = get_agent_dir();
    if !dir.exists() {
        fs::create_dir_all(&dir).context("Failed to create agent directory")?;
        fs::set_permissions(&dir, fs::Permissions::from_mode(0o700))?;
    }

    let config_path = get_config_path();
    let json = serde_json::to_string_pretty(config).context("Failed to serialize config")?;

    fs::write(&config_path, &json).context("Failed to write config file")?;
    fs::set_permissions(&config_path, fs::Permissions::from_mode(0o600))?;

    Ok(())
}

/// Resolve a path that may start with `~` to an absolute path.
///
/// If the path starts with `~`, the tilde is replaced with the user's home
/// directory. Otherwise the path is returned as-is.
pub fn resolve_path(p: &str) -> String {
    if let Some(rest) = p.strip_prefix('~') {
        let home = dirs::home_dir().unwrap_or_else(|| PathBuf::from("/root"));
        let rest = rest.strip_prefix('/').unwrap_or(rest);
        home.join(rest).to_string_lossy().to_string()
    } else {
        p.to_string()
    }
}
