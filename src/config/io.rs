use super::models::AppConfig;
use super::tables::ConfigTables;
use anyhow::{Context, Result};
use std::env;
use std::fs;
use std::path::Path;
use tracing::{debug, info, warn};

pub const DEFAULT_CONFIG_PATH: &str = "conf/config.toml";

/// Consulted only when the config file leaves `api_key` empty.
const API_KEY_ENV: &str = "CHAPTER_RECAP_API_KEY";

/// Load the config at `path`, falling back to defaults on any problem.
pub fn load_config(path: &Path) -> AppConfig {
    let config = match fs::read_to_string(path) {
        Ok(contents) => match parse_config(&contents) {
            Ok(config) => {
                info!(path = %path.display(), "Loaded config");
                config
            }
            Err(err) => {
                warn!(path = %path.display(), "Invalid config TOML, using defaults: {err:#}");
                AppConfig::default()
            }
        },
        Err(err) => {
            debug!(path = %path.display(), "No config file, using defaults: {err}");
            AppConfig::default()
        }
    };
    apply_env_overrides(config)
}

pub fn parse_config(contents: &str) -> Result<AppConfig> {
    let tables: ConfigTables = toml::from_str(contents).context("Failed to parse config TOML")?;
    Ok(AppConfig::from(tables).clamped())
}

pub fn serialize_config(config: &AppConfig) -> Result<String> {
    let tables = ConfigTables::from(&config.clone().clamped());
    toml::to_string_pretty(&tables).context("Failed to serialize config")
}

/// Persist `config`, clamping out-of-range values first.
pub fn save_config(path: &Path, config: &AppConfig) -> Result<()> {
    let contents = serialize_config(config)?;
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create config dir {}", parent.display()))?;
    }
    fs::write(path, contents)
        .with_context(|| format!("Failed to write config at {}", path.display()))?;
    info!(path = %path.display(), "Saved config");
    Ok(())
}

fn apply_env_overrides(mut config: AppConfig) -> AppConfig {
    if !config.has_api_key() {
        if let Ok(key) = env::var(API_KEY_ENV) {
            if !key.trim().is_empty() {
                debug!(var = API_KEY_ENV, "Using API key from environment");
                config.api_key = key.trim().to_string();
            }
        }
    }
    config
}
