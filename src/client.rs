//! Chat-completion client for chapter summaries.
//!
//! The HTTP layer sits behind [`Transport`] so retry and classification can
//! be exercised without a network. [`HttpTransport`] runs each blocking
//! request on a worker thread and polls the caller's [`CancellationToken`]
//! while it waits, which makes the network stage the one cancellation point
//! in the pipeline.

use crate::cancellation::{CancellationToken, POLL_INTERVAL};
use crate::config::{AppConfig, MAX_RETRY_ATTEMPTS};
use crate::error::{RecapError, Result};
use serde::Deserialize;
use serde_json::{Value, json};
use std::sync::mpsc::{self, RecvTimeoutError};
use std::thread;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Sampling temperature sent with every request.
pub const TEMPERATURE: f64 = 0.7;

/// Longest slice of an error body echoed into an error message.
const ERROR_BODY_SNIPPET: usize = 200;

#[derive(Debug, Clone, PartialEq)]
pub struct SummaryRequest {
    pub system_prompt: String,
    pub chapter_title: String,
    pub chapter_text: String,
    pub model: String,
    pub max_tokens: u32,
}

impl SummaryRequest {
    pub fn from_config(config: &AppConfig, chapter_title: &str, chapter_text: String) -> Self {
        Self {
            system_prompt: config.prompt.clone(),
            chapter_title: chapter_title.to_string(),
            chapter_text,
            model: config.model.clone(),
            max_tokens: config.max_summary_tokens,
        }
    }

    pub fn user_message(&self) -> String {
        format!("Chapter: {}\n\n{}", self.chapter_title, self.chapter_text)
    }

    pub fn to_body(&self) -> Value {
        json!({
            "model": self.model,
            "messages": [
                { "role": "system", "content": self.system_prompt },
                { "role": "user", "content": self.user_message() },
            ],
            "temperature": TEMPERATURE,
            "max_tokens": self.max_tokens,
        })
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
pub struct Usage {
    #[serde(default)]
    pub prompt_tokens: u64,
    #[serde(default)]
    pub completion_tokens: u64,
    #[serde(default)]
    pub total_tokens: u64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SummaryResponse {
    pub content: String,
    pub usage: Option<Usage>,
}

/// Raw HTTP outcome handed back by a [`Transport`].
#[derive(Debug, Clone)]
pub struct HttpReply {
    pub status: u16,
    pub body: String,
}

pub trait Transport {
    /// POST `body` as JSON with bearer auth. Connection-level failures map to
    /// [`RecapError::Network`]; any HTTP status is returned as a reply.
    fn post_json(
        &self,
        url: &str,
        api_key: &str,
        body: &Value,
        cancel: &CancellationToken,
    ) -> Result<HttpReply>;
}

#[derive(Clone)]
pub struct HttpTransport {
    client: reqwest::blocking::Client,
}

impl HttpTransport {
    pub fn new(timeout: Duration) -> Result<Self> {
        let client = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|err| RecapError::Network(err.to_string()))?;
        Ok(Self { client })
    }
}

impl Transport for HttpTransport {
    fn post_json(
        &self,
        url: &str,
        api_key: &str,
        body: &Value,
        cancel: &CancellationToken,
    ) -> Result<HttpReply> {
        let request = self.client.post(url).bearer_auth(api_key).json(body);
        let (tx, rx) = mpsc::channel();

        // The worker outlives a cancelled wait; the client timeout bounds it.
        thread::spawn(move || {
            let result = request.send().and_then(|response| {
                let status = response.status().as_u16();
                response.text().map(|body| HttpReply { status, body })
            });
            let _ = tx.send(result);
        });

        loop {
            cancel.check_cancelled("http")?;
            match rx.recv_timeout(POLL_INTERVAL) {
                Ok(result) => return result.map_err(|err| RecapError::Network(err.to_string())),
                Err(RecvTimeoutError::Timeout) => continue,
                Err(RecvTimeoutError::Disconnected) => {
                    return Err(RecapError::Network(
                        "HTTP worker exited without a response".to_string(),
                    ));
                }
            }
        }
    }
}

/// Attempt cap and the base delay between attempts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub delay: Duration,
}

impl RetryPolicy {
    /// Linear backoff: the n-th retry waits `n * delay`.
    pub fn delay_before_retry(&self, failed_attempts: u32) -> Duration {
        self.delay.saturating_mul(failed_attempts)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: MAX_RETRY_ATTEMPTS,
            delay: Duration::from_secs(1),
        }
    }
}

pub struct SummaryClient<T: Transport> {
    transport: T,
    endpoint: String,
    api_key: String,
    retry: RetryPolicy,
}

impl SummaryClient<HttpTransport> {
    pub fn from_config(config: &AppConfig) -> Result<Self> {
        let transport = HttpTransport::new(config.request_timeout())?;
        Ok(Self::new(config, transport))
    }
}

impl<T: Transport> SummaryClient<T> {
    pub fn new(config: &AppConfig, transport: T) -> Self {
        Self {
            transport,
            endpoint: config.endpoint.clone(),
            api_key: config.api_key.trim().to_string(),
            retry: RetryPolicy {
                max_attempts: config.retry_attempts.clamp(1, MAX_RETRY_ATTEMPTS),
                delay: config.retry_delay(),
            },
        }
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Request a summary, retrying retryable failures up to the attempt cap.
    /// Policies asking for more than [`MAX_RETRY_ATTEMPTS`] are held to it.
    ///
    /// Non-retryable failures return immediately. When attempts run out the
    /// last observed error is returned.
    pub fn summarize(
        &self,
        request: &SummaryRequest,
        cancel: &CancellationToken,
    ) -> Result<SummaryResponse> {
        if self.api_key.is_empty() {
            return Err(RecapError::MissingApiKey);
        }
        let body = request.to_body();
        let max_attempts = self.retry.max_attempts.clamp(1, MAX_RETRY_ATTEMPTS);

        let mut attempt = 0;
        loop {
            attempt += 1;
            cancel.check_cancelled("summarize")?;
            debug!(
                attempt,
                max_attempts,
                model = %request.model,
                "Requesting chapter summary"
            );

            match self.attempt(&body, cancel) {
                Ok(response) => {
                    info!(
                        attempt,
                        chars = response.content.chars().count(),
                        total_tokens = response.usage.map_or(0, |u| u.total_tokens),
                        "Received chapter summary"
                    );
                    return Ok(response);
                }
                Err(err) if err.is_retryable() && attempt < max_attempts => {
                    let delay = self.retry.delay_before_retry(attempt);
                    warn!(
                        attempt,
                        max_attempts,
                        delay_ms = delay.as_millis() as u64,
                        "Summary attempt failed, retrying: {err}"
                    );
                    cancel.sleep(delay)?;
                }
                Err(err) => {
                    warn!(attempt, "Summary request failed: {err}");
                    return Err(err);
                }
            }
        }
    }

    fn attempt(&self, body: &Value, cancel: &CancellationToken) -> Result<SummaryResponse> {
        let reply = self
            .transport
            .post_json(&self.endpoint, &self.api_key, body, cancel)?;
        classify_reply(reply)
    }
}

#[derive(Debug, Deserialize)]
struct CompletionBody {
    #[serde(default)]
    choices: Vec<Choice>,
    #[serde(default)]
    usage: Option<Usage>,
    #[serde(default)]
    error: Option<Value>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    #[serde(default)]
    message: Option<ChoiceMessage>,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

/// Map an HTTP reply onto a response or a typed error.
fn classify_reply(reply: HttpReply) -> Result<SummaryResponse> {
    match reply.status {
        200 => {}
        401 => return Err(RecapError::InvalidApiKey),
        402 => return Err(RecapError::InsufficientCredits),
        429 => return Err(RecapError::RateLimited),
        status => {
            let message = error_message_from_body(&reply.body)
                .unwrap_or_else(|| format!("HTTP {status}: {}", snippet(&reply.body)));
            return Err(RecapError::api(Some(status), message));
        }
    }

    let parsed: CompletionBody =
        serde_json::from_str(&reply.body).map_err(|err| RecapError::Decode(err.to_string()))?;

    if let Some(error) = parsed.error.as_ref().filter(|value| !value.is_null()) {
        return Err(RecapError::api(None, describe_error_value(error)));
    }

    let content = parsed
        .choices
        .into_iter()
        .next()
        .and_then(|choice| choice.message)
        .and_then(|message| message.content)
        .filter(|content| !content.trim().is_empty())
        .ok_or(RecapError::EmptyResponse)?;

    Ok(SummaryResponse {
        content: content.trim().to_string(),
        usage: parsed.usage,
    })
}

fn error_message_from_body(body: &str) -> Option<String> {
    let value: Value = serde_json::from_str(body).ok()?;
    value.get("error").map(describe_error_value)
}

fn describe_error_value(error: &Value) -> String {
    match error {
        Value::String(message) => message.clone(),
        Value::Object(map) => map
            .get("message")
            .and_then(Value::as_str)
            .map(str::to_string)
            .unwrap_or_else(|| error.to_string()),
        other => other.to_string(),
    }
}

fn snippet(body: &str) -> String {
    body.chars().take(ERROR_BODY_SNIPPET).collect()
}
