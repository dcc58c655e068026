use super::defaults;
use super::models::{AppConfig, LogLevel};
use serde::Deserialize;

/// On-disk layout: one TOML table per concern.
#[derive(Debug, Clone, Default, Deserialize, serde::Serialize)]
pub(super) struct ConfigTables {
    #[serde(default)]
    api: ApiConfig,
    #[serde(default)]
    summary: SummaryConfig,
    #[serde(default)]
    retry: RetryConfig,
    #[serde(default)]
    storage: StorageConfig,
    #[serde(default)]
    extraction: ExtractionConfig,
    #[serde(default)]
    logging: LoggingConfig,
}

impl From<ConfigTables> for AppConfig {
    fn from(tables: ConfigTables) -> Self {
        AppConfig {
            api_key: tables.api.api_key,
            endpoint: tables.api.endpoint,
            model: tables.api.model,
            request_timeout_secs: tables.api.request_timeout_secs,
            prompt: tables.summary.prompt,
            max_summary_tokens: tables.summary.max_summary_tokens,
            max_input_tokens: tables.summary.max_input_tokens,
            retry_attempts: tables.retry.max_attempts,
            retry_delay_ms: tables.retry.delay_ms,
            summary_dir: tables.storage.summary_dir,
            cache_dir: tables.storage.cache_dir,
            text_page_chars: tables.extraction.text_page_chars,
            log_level: tables.logging.log_level,
        }
    }
}

impl From<&AppConfig> for ConfigTables {
    fn from(config: &AppConfig) -> Self {
        ConfigTables {
            api: ApiConfig {
                api_key: config.api_key.clone(),
                endpoint: config.endpoint.clone(),
                model: config.model.clone(),
                request_timeout_secs: config.request_timeout_secs,
            },
            summary: SummaryConfig {
                prompt: config.prompt.clone(),
                max_summary_tokens: config.max_summary_tokens,
                max_input_tokens: config.max_input_tokens,
            },
            retry: RetryConfig {
                max_attempts: config.retry_attempts,
                delay_ms: config.retry_delay_ms,
            },
            storage: StorageConfig {
                summary_dir: config.summary_dir.clone(),
                cache_dir: config.cache_dir.clone(),
            },
            extraction: ExtractionConfig {
                text_page_chars: config.text_page_chars,
            },
            logging: LoggingConfig {
                log_level: config.log_level,
            },
        }
    }
}

#[derive(Debug, Clone, Deserialize, serde::Serialize)]
struct ApiConfig {
    #[serde(default = "defaults::default_api_key")]
    api_key: String,
    #[serde(default = "defaults::default_endpoint")]
    endpoint: String,
    #[serde(default = "defaults::default_model")]
    model: String,
    #[serde(default = "defaults::default_request_timeout_secs")]
    request_timeout_secs: u64,
}

impl Default for ApiConfig {
    fn default() -> Self {
        ApiConfig {
            api_key: defaults::default_api_key(),
            endpoint: defaults::default_endpoint(),
            model: defaults::default_model(),
            request_timeout_secs: defaults::default_request_timeout_secs(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, serde::Serialize)]
struct SummaryConfig {
    #[serde(default = "defaults::default_prompt")]
    prompt: String,
    #[serde(default = "defaults::default_max_summary_tokens")]
    max_summary_tokens: u32,
    #[serde(default = "defaults::default_max_input_tokens")]
    max_input_tokens: usize,
}

impl Default for SummaryConfig {
    fn default() -> Self {
        SummaryConfig {
            prompt: defaults::default_prompt(),
            max_summary_tokens: defaults::default_max_summary_tokens(),
            max_input_tokens: defaults::default_max_input_tokens(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, serde::Serialize)]
struct RetryConfig {
    #[serde(default = "defaults::default_retry_attempts")]
    max_attempts: u32,
    #[serde(default = "defaults::default_retry_delay_ms")]
    delay_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        RetryConfig {
            max_attempts: defaults::default_retry_attempts(),
            delay_ms: defaults::default_retry_delay_ms(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, serde::Serialize)]
struct StorageConfig {
    #[serde(default = "defaults::default_summary_dir")]
    summary_dir: String,
    #[serde(default = "defaults::default_cache_dir")]
    cache_dir: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        StorageConfig {
            summary_dir: defaults::default_summary_dir(),
            cache_dir: defaults::default_cache_dir(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, serde::Serialize)]
struct ExtractionConfig {
    #[serde(default = "defaults::default_text_page_chars")]
    text_page_chars: usize,
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        ExtractionConfig {
            text_page_chars: defaults::default_text_page_chars(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, serde::Serialize)]
struct LoggingConfig {
    #[serde(default = "defaults::default_log_level")]
    log_level: LogLevel,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        LoggingConfig {
            log_level: defaults::default_log_level(),
        }
    }
}
