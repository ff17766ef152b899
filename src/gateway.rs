//! Model gateway: the single point of access to the chat-completion backend.
//!
//! Every model call in the crate goes through [`ModelGateway::generate`], which
//! pins the calling contract (temperature 0, one system plus one user
//! message) and retries transient backend failures with a fixed delay.

use crate::error::{PaperTaskError, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tracing::{debug, error, warn};

/// Default OpenAI-compatible endpoint
pub const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";

/// Default model identifier
pub const DEFAULT_MODEL: &str = "gpt-4o";

/// Total attempts per call, first try included
const DEFAULT_MAX_ATTEMPTS: u32 = 3;

/// Fixed wait between attempts in seconds
const DEFAULT_RETRY_DELAY_SECS: u64 = 3;

/// Request timeout in seconds
const REQUEST_TIMEOUT_SECS: u64 = 60;

/// Decoding temperature for every call
const DECODING_TEMPERATURE: f32 = 0.0;

/// Gateway configuration, fixed for the lifetime of a run.
#[derive(Clone)]
pub struct GatewayConfig {
    pub api_key: String,
    pub base_url: String,
    pub model: String,
    /// Language the model writes free-text fields in
    pub language: String,
    pub max_attempts: u32,
    pub retry_delay: Duration,
    pub request_timeout: Duration,
}

impl GatewayConfig {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            base_url: DEFAULT_BASE_URL.to_string(),
            model: DEFAULT_MODEL.to_string(),
            language: "English".to_string(),
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            retry_delay: Duration::from_secs(DEFAULT_RETRY_DELAY_SECS),
            request_timeout: Duration::from_secs(REQUEST_TIMEOUT_SECS),
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn with_language(mut self, language: impl Into<String>) -> Self {
        self.language = language.into();
        self
    }

    pub fn with_retry_delay(mut self, delay: Duration) -> Self {
        self.retry_delay = delay;
        self
    }

    /// Reject configurations no call could succeed with.
    pub fn validate(&self) -> Result<()> {
        if self.api_key.trim().is_empty() {
            return Err(PaperTaskError::Config("API key must not be empty".to_string()));
        }
        if self.model.trim().is_empty() {
            return Err(PaperTaskError::Config("model name must not be empty".to_string()));
        }
        if self.max_attempts == 0 {
            return Err(PaperTaskError::Config("max_attempts must be at least 1".to_string()));
        }
        url::Url::parse(&self.base_url).map_err(|e| {
            PaperTaskError::Config(format!("invalid API base URL '{}': {}", self.base_url, e))
        })?;
        Ok(())
    }

    fn completions_url(&self) -> String {
        format!("{}/chat/completions", self.base_url.trim_end_matches('/'))
    }
}

impl fmt::Debug for GatewayConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GatewayConfig")
            .field("api_key", &"<redacted>")
            .field("base_url", &self.base_url)
            .field("model", &self.model)
            .field("language", &self.language)
            .field("max_attempts", &self.max_attempts)
            .field("retry_delay", &self.retry_delay)
            .field("request_timeout", &self.request_timeout)
            .finish()
    }
}

/// Chat message role
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

/// One message of a chat-completion request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }
}

/// Wire shape of a chat-completion request
#[derive(Debug, Clone, Serialize)]
pub struct ChatRequest {
    pub model: String,
    pub temperature: f32,
    pub messages: Vec<ChatMessage>,
}

/// Token usage tracking
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TokenUsage {
    pub prompt_tokens: u64,
    pub completion_tokens: u64,
    pub total_tokens: u64,
}

/// Text and usage of one successful completion
#[derive(Debug, Clone, Default)]
pub struct ChatCompletion {
    pub content: String,
    pub usage: TokenUsage,
}

/// Accumulated token usage with atomic counters
struct AtomicTokenUsage {
    prompt_tokens: AtomicU64,
    completion_tokens: AtomicU64,
    total_tokens: AtomicU64,
}

impl AtomicTokenUsage {
    fn new() -> Self {
        Self {
            prompt_tokens: AtomicU64::new(0),
            completion_tokens: AtomicU64::new(0),
            total_tokens: AtomicU64::new(0),
        }
    }

    fn add(&self, usage: &TokenUsage) {
        self.prompt_tokens.fetch_add(usage.prompt_tokens, Ordering::Relaxed);
        self.completion_tokens.fetch_add(usage.completion_tokens, Ordering::Relaxed);
        self.total_tokens.fetch_add(usage.total_tokens, Ordering::Relaxed);
    }

    fn get(&self) -> TokenUsage {
        TokenUsage {
            prompt_tokens: self.prompt_tokens.load(Ordering::Relaxed),
            completion_tokens: self.completion_tokens.load(Ordering::Relaxed),
            total_tokens: self.total_tokens.load(Ordering::Relaxed),
        }
    }
}

/// A backend able to perform one chat-completion round trip.
#[async_trait]
pub trait ChatBackend: Send + Sync {
    async fn chat(&self, request: &ChatRequest) -> Result<ChatCompletion>;
}

/// OpenAI-compatible API response structures
#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<ChatChoice>,
    usage: Option<ApiUsage>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ApiUsage {
    #[serde(default)]
    prompt_tokens: u64,
    #[serde(default)]
    completion_tokens: u64,
    #[serde(default)]
    total_tokens: u64,
}

/// Backend speaking the OpenAI `/chat/completions` protocol over HTTP.
///
/// Works with any provider that implements the same request/response shape,
/// self-hosted servers included.
pub struct OpenAiCompatibleBackend {
    client: reqwest::Client,
    endpoint: String,
    api_key: String,
}

impl OpenAiCompatibleBackend {
    pub fn new(config: &GatewayConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| PaperTaskError::Config(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            endpoint: config.completions_url(),
            api_key: config.api_key.clone(),
        })
    }
}

#[async_trait]
impl ChatBackend for OpenAiCompatibleBackend {
    async fn chat(&self, request: &ChatRequest) -> Result<ChatCompletion> {
        debug!(endpoint = %self.endpoint, model = %request.model, "Sending chat completion request");

        let response = self
            .client
            .post(&self.endpoint)
            .header("Content-Type", "application/json")
            .header("Authorization", format!("Bearer {}", self.api_key))
            .json(request)
            .send()
            .await
            .map_err(PaperTaskError::Network)?;

        let status = response.status();
        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            let retry_after = response
                .headers()
                .get(reqwest::header::RETRY_AFTER)
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.trim().parse::<u64>().ok())
                .unwrap_or(0);
            return Err(PaperTaskError::RateLimited(retry_after));
        }
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(PaperTaskError::Api {
                code: status.as_u16(),
                message: format!("LLM API error: {} - {}", status, error_text),
            });
        }

        let api_response: ChatCompletionResponse = response
            .json()
            .await
            .map_err(|e| PaperTaskError::Provider(format!("Failed to decode LLM response: {}", e)))?;

        let usage = api_response
            .usage
            .map(|u| TokenUsage {
                prompt_tokens: u.prompt_tokens,
                completion_tokens: u.completion_tokens,
                total_tokens: u.total_tokens,
            })
            .unwrap_or_default();

        let content = api_response
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| PaperTaskError::Provider("LLM response has no choices".to_string()))?
            .message
            .content
            .unwrap_or_default();

        Ok(ChatCompletion { content, usage })
    }
}

/// Configured access point for model calls.
///
/// Built once at startup and passed by reference to whoever needs it; the
/// configuration cannot change afterwards.
pub struct ModelGateway<B = OpenAiCompatibleBackend> {
    config: GatewayConfig,
    backend: B,
    usage: AtomicTokenUsage,
    requests: AtomicU64,
}

impl ModelGateway<OpenAiCompatibleBackend> {
    /// Validate `config` and connect the HTTP backend.
    pub fn connect(config: GatewayConfig) -> Result<Self> {
        config.validate()?;
        let backend = OpenAiCompatibleBackend::new(&config)?;
        Self::with_backend(config, backend)
    }
}

impl<B: ChatBackend> ModelGateway<B> {
    pub fn with_backend(config: GatewayConfig, backend: B) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config,
            backend,
            usage: AtomicTokenUsage::new(),
            requests: AtomicU64::new(0),
        })
    }

    pub fn config(&self) -> &GatewayConfig {
        &self.config
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Token usage summed over all successful calls.
    pub fn token_usage(&self) -> TokenUsage {
        self.usage.get()
    }

    /// Backend round trips made so far, retries included.
    pub fn request_count(&self) -> u64 {
        self.requests.load(Ordering::Relaxed)
    }

    /// Send one system and one user message; return the completion text.
    pub async fn complete(&self, system: &str, user: &str) -> Result<String> {
        self.generate(&[ChatMessage::system(system), ChatMessage::user(user)])
            .await
    }

    /// Run a chat completion with retry.
    ///
    /// `messages` must be exactly one system message followed by one user
    /// message. Transient failures are retried up to `max_attempts` in total
    /// with `retry_delay` between attempts; a successful call is never
    /// retried, whatever its content.
    pub async fn generate(&self, messages: &[ChatMessage]) -> Result<String> {
        check_message_shape(messages)?;

        let request = ChatRequest {
            model: self.config.model.clone(),
            temperature: DECODING_TEMPERATURE,
            messages: messages.to_vec(),
        };
        let max_attempts = self.config.max_attempts;

        let mut attempt = 1;
        loop {
            self.requests.fetch_add(1, Ordering::Relaxed);
            match self.backend.chat(&request).await {
                Ok(completion) => {
                    self.usage.add(&completion.usage);
                    debug!(
                        attempt = attempt,
                        total_tokens = completion.usage.total_tokens,
                        "Model call succeeded"
                    );
                    return Ok(completion.content);
                }
                Err(e) if e.is_transient() && attempt < max_attempts => {
                    warn!(
                        attempt = attempt,
                        max_attempts = max_attempts,
                        wait_secs = self.config.retry_delay.as_secs(),
                        error = %e,
                        "Model call failed, retrying"
                    );
                    tokio::time::sleep(self.config.retry_delay).await;
                    attempt += 1;
                }
                Err(e) => {
                    error!(attempt = attempt, max_attempts = max_attempts, error = %e, "Model call failed");
                    return Err(e);
                }
            }
        }
    }
}

fn check_message_shape(messages: &[ChatMessage]) -> Result<()> {
    match messages {
        [system, user] if system.role == Role::System && user.role == Role::User => Ok(()),
        _ => Err(PaperTaskError::Validation(format!(
            "expected [system, user] messages, got {:?}",
            messages.iter().map(|m| m.role).collect::<Vec<_>>()
        ))),
    }
}

#[cfg(test)]
pub(crate) mod testing {
    //! Scripted in-memory backend for gateway and analyzer tests.

    use super::*;
    use std::collections::VecDeque;
    use std::sync::Mutex;

    #[derive(Default)]
    pub struct ScriptedBackend {
        script: Mutex<VecDeque<Result<ChatCompletion>>>,
        requests: Mutex<Vec<ChatRequest>>,
    }

    impl ScriptedBackend {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn reply(self, content: &str) -> Self {
            self.push(Ok(ChatCompletion {
                content: content.to_string(),
                usage: TokenUsage {
                    prompt_tokens: 10,
                    completion_tokens: 5,
                    total_tokens: 15,
                },
            }))
        }

        pub fn fail(self, error: PaperTaskError) -> Self {
            self.push(Err(error))
        }

        fn push(self, item: Result<ChatCompletion>) -> Self {
            self.script.lock().expect("script lock").push_back(item);
            self
        }

        pub fn requests(&self) -> Vec<ChatRequest> {
            self.requests.lock().expect("requests lock").clone()
        }
    }

    #[async_trait]
    impl ChatBackend for ScriptedBackend {
        async fn chat(&self, request: &ChatRequest) -> Result<ChatCompletion> {
            self.requests.lock().expect("requests lock").push(request.clone());
            self.script
                .lock()
                .expect("script lock")
                .pop_front()
                .unwrap_or_else(|| Err(PaperTaskError::Provider("script exhausted".to_string())))
        }
    }

    pub fn test_config() -> GatewayConfig {
        GatewayConfig::new("sk-test")
            .with_model("test-model")
            .with_retry_delay(Duration::ZERO)
    }
}
