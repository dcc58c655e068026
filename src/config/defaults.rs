pub const MIN_SUMMARY_TOKENS: u32 = 100;
pub const MAX_SUMMARY_TOKENS: u32 = 2000;
pub const MAX_RETRY_ATTEMPTS: u32 = 3;

pub(crate) fn default_api_key() -> String {
    String::new()
}

pub(crate) fn default_endpoint() -> String {
    "https://openrouter.ai/api/v1/chat/completions".to_string()
}

pub(crate) fn default_model() -> String {
    "openai/gpt-4o-mini".to_string()
}

pub(crate) fn default_request_timeout_secs() -> u64 {
    60
}

pub(crate) fn default_prompt() -> String {
    "You are a reading assistant. Summarize the following book chapter for a reader who \
     has just finished it. Cover the main events, characters and ideas in a few short \
     paragraphs. Do not add anything that is not in the text."
        .to_string()
}

pub(crate) fn default_max_summary_tokens() -> u32 {
    500
}

pub(crate) fn default_max_input_tokens() -> usize {
    24_000
}

pub(crate) fn default_retry_attempts() -> u32 {
    MAX_RETRY_ATTEMPTS
}

pub(crate) fn default_retry_delay_ms() -> u64 {
    1_000
}

pub(crate) fn default_summary_dir() -> String {
    "summaries".to_string()
}

pub(crate) fn default_cache_dir() -> String {
    ".cache".to_string()
}

pub(crate) fn default_text_page_chars() -> usize {
    2_000
}

pub(crate) fn default_log_level() -> crate::config::LogLevel {
    crate::config::LogLevel::Info
}
