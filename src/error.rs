//! Error taxonomy shared by every stage of the summarization pipeline.
//!
//! Each failure class keeps its own variant so the host can map it to a
//! distinct message; nothing is collapsed into a generic string internally.

use std::path::{Path, PathBuf};

/// Result alias used throughout the core modules.
pub type Result<T, E = RecapError> = std::result::Result<T, E>;

#[derive(Debug, thiserror::Error)]
pub enum RecapError {
    #[error("document has no table of contents")]
    NoTableOfContents,

    #[error("no table of contents entry starts at or before page {page}")]
    ChapterNotDetermined { page: usize },

    #[error("no text could be extracted for chapter '{title}'")]
    ExtractionFailed { title: String },

    #[error("API key was rejected by the summary endpoint")]
    InvalidApiKey,

    #[error("insufficient credits on the summary account")]
    InsufficientCredits,

    #[error("rate limited by the summary endpoint")]
    RateLimited,

    /// Non-200 status (`status` set) or an error object inside a 200 body.
    #[error("summary API error: {message}")]
    Api {
        status: Option<u16>,
        message: String,
    },

    #[error("summary endpoint returned no choices")]
    EmptyResponse,

    #[error("network error: {0}")]
    Network(String),

    #[error("malformed response body: {0}")]
    Decode(String),

    #[error("I/O error at {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("operation cancelled")]
    Cancelled,

    #[error("no API key configured")]
    MissingApiKey,
}

/// Flat, copyable discriminant for UI mapping and assertions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    NoTableOfContents,
    ChapterNotDetermined,
    ExtractionFailed,
    InvalidApiKey,
    InsufficientCredits,
    RateLimited,
    ApiError,
    EmptyResponse,
    NetworkError,
    DecodeError,
    IoError,
    Cancelled,
    MissingApiKey,
}

impl RecapError {
    pub fn io(path: impl AsRef<Path>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.as_ref().to_path_buf(),
            source,
        }
    }

    pub fn api(status: Option<u16>, message: impl Into<String>) -> Self {
        Self::Api {
            status,
            message: message.into(),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            RecapError::NoTableOfContents => ErrorKind::NoTableOfContents,
            RecapError::ChapterNotDetermined { .. } => ErrorKind::ChapterNotDetermined,
            RecapError::ExtractionFailed { .. } => ErrorKind::ExtractionFailed,
            RecapError::InvalidApiKey => ErrorKind::InvalidApiKey,
            RecapError::InsufficientCredits => ErrorKind::InsufficientCredits,
            RecapError::RateLimited => ErrorKind::RateLimited,
            RecapError::Api { .. } => ErrorKind::ApiError,
            RecapError::EmptyResponse => ErrorKind::EmptyResponse,
            RecapError::Network(_) => ErrorKind::NetworkError,
            RecapError::Decode(_) => ErrorKind::DecodeError,
            RecapError::Io { .. } => ErrorKind::IoError,
            RecapError::Cancelled => ErrorKind::Cancelled,
            RecapError::MissingApiKey => ErrorKind::MissingApiKey,
        }
    }

    /// Whether another attempt at the same request may succeed.
    ///
    /// An error object inside a 200 body is a definitive answer from the
    /// endpoint, so only status-bearing API errors are retried.
    pub fn is_retryable(&self) -> bool {
        match self {
            RecapError::RateLimited
            | RecapError::EmptyResponse
            | RecapError::Network(_) => true,
            RecapError::Api { status, .. } => status.is_some(),
            _ => false,
        }
    }

    /// Message suitable for showing to the reader.
    pub fn user_message(&self) -> String {
        match self {
            RecapError::NoTableOfContents => {
                "This book has no table of contents, so the current chapter cannot be found."
                    .to_string()
            }
            RecapError::ChapterNotDetermined { page } => {
                format!("Page {page} comes before the first chapter in the table of contents.")
            }
            RecapError::ExtractionFailed { title } => {
                format!("Could not extract any text from \"{title}\".")
            }
            RecapError::InvalidApiKey => {
                "The API key was rejected. Check the key in your settings.".to_string()
            }
            RecapError::InsufficientCredits => {
                "Your account has run out of credits. Add credits and try again.".to_string()
            }
            RecapError::RateLimited => {
                "Too many requests. Wait a moment before trying again.".to_string()
            }
            RecapError::Api {
                status: Some(status),
                message,
            } => format!("The summary service returned an error ({status}): {message}"),
            RecapError::Api {
                status: None,
                message,
            } => format!("The summary service reported an error: {message}"),
            RecapError::EmptyResponse => "The summary service returned an empty answer.".to_string(),
            RecapError::Network(_) => {
                "Network connection failed. Check your internet connection.".to_string()
            }
            RecapError::Decode(_) => {
                "The summary service sent a response that could not be read.".to_string()
            }
            RecapError::Io { path, .. } => {
                format!("Could not access {}.", path.display())
            }
            RecapError::Cancelled => "Summarization was cancelled.".to_string(),
            RecapError::MissingApiKey => {
                "No API key is configured. Set api_key under [api] in the config file.".to_string()
            }
        }
    }
}
