use super::defaults::{self, MAX_RETRY_ATTEMPTS, MAX_SUMMARY_TOKENS, MIN_SUMMARY_TOKENS};
use crate::pagination::{MAX_PAGE_CHARS, MIN_PAGE_CHARS};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Flat view of the sectioned TOML config. Serialization goes through
/// the table layout in `tables.rs`.
#[derive(Debug, Clone, PartialEq)]
pub struct AppConfig {
    pub api_key: String,
    pub endpoint: String,
    pub model: String,
    pub request_timeout_secs: u64,
    pub prompt: String,
    pub max_summary_tokens: u32,
    pub max_input_tokens: usize,
    pub retry_attempts: u32,
    pub retry_delay_ms: u64,
    pub summary_dir: String,
    pub cache_dir: String,
    pub text_page_chars: usize,
    pub log_level: LogLevel,
}

impl Default for AppConfig {
    fn default() -> Self {
        AppConfig {
            api_key: defaults::default_api_key(),
            endpoint: defaults::default_endpoint(),
            model: defaults::default_model(),
            request_timeout_secs: defaults::default_request_timeout_secs(),
            prompt: defaults::default_prompt(),
            max_summary_tokens: defaults::default_max_summary_tokens(),
            max_input_tokens: defaults::default_max_input_tokens(),
            retry_attempts: defaults::default_retry_attempts(),
            retry_delay_ms: defaults::default_retry_delay_ms(),
            summary_dir: defaults::default_summary_dir(),
            cache_dir: defaults::default_cache_dir(),
            text_page_chars: defaults::default_text_page_chars(),
            log_level: defaults::default_log_level(),
        }
    }
}

impl AppConfig {
    /// Pull every numeric setting back into its supported range.
    pub fn clamped(mut self) -> Self {
        self.max_summary_tokens = self
            .max_summary_tokens
            .clamp(MIN_SUMMARY_TOKENS, MAX_SUMMARY_TOKENS);
        self.retry_attempts = self.retry_attempts.clamp(1, MAX_RETRY_ATTEMPTS);
        self.max_input_tokens = self.max_input_tokens.max(1);
        self.request_timeout_secs = self.request_timeout_secs.max(1);
        self.text_page_chars = self.text_page_chars.clamp(MIN_PAGE_CHARS, MAX_PAGE_CHARS);
        self
    }

    pub fn has_api_key(&self) -> bool {
        !self.api_key.trim().is_empty()
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn retry_delay(&self) -> Duration {
        Duration::from_millis(self.retry_delay_ms)
    }

    pub fn summary_dir(&self) -> PathBuf {
        PathBuf::from(&self.summary_dir)
    }

    pub fn cache_dir(&self) -> PathBuf {
        PathBuf::from(&self.cache_dir)
    }
}

/// Supported logging verbosity levels.
#[derive(Debug, Clone, Copy, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Trace,
    Debug,
    #[default]
    Info,
    Warn,
    Error,
}

impl LogLevel {
    pub fn as_filter_str(self) -> &'static str {
        match self {
            LogLevel::Trace => "trace",
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
        }
    }
}

impl std::fmt::Display for LogLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_filter_str())
    }
}
