//! Configuration loading for the chapter summarizer.
//!
//! All user-tunable settings are centralized here and loaded from
//! `conf/config.toml` if present. Missing or invalid entries fall back to
//! defaults so a summary can still be requested. The host owns the loaded
//! [`AppConfig`]; core modules only ever borrow it.

mod defaults;
mod io;
mod models;
mod tables;

pub use defaults::{MAX_RETRY_ATTEMPTS, MAX_SUMMARY_TOKENS, MIN_SUMMARY_TOKENS};
pub use io::{DEFAULT_CONFIG_PATH, load_config, parse_config, save_config, serialize_config};
pub use models::{AppConfig, LogLevel};
