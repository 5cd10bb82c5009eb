//! Ollama LLM Provider
//!
//! Implementation of `LlmProvider` for local Ollama inference. Each prompt is
//! sent as a single user chat message; transient failures are retried with
//! exponential backoff.

use std::time::Duration;

use agent_core::{
    error::{AgentError, Result},
    provider::{GenerationOptions, LlmProvider},
};
use async_trait::async_trait;
use ollama_rs::{
    generation::chat::{request::ChatMessageRequest, ChatMessage},
    models::ModelOptions,
    Ollama,
};

use crate::retry::RetryPolicy;

/// Ollama provider configuration
#[derive(Clone, Debug)]
pub struct OllamaConfig {
    /// Ollama host URL
    pub host: String,

    /// Ollama port
    pub port: u16,

    /// Model and sampling options
    pub generation: GenerationOptions,

    /// Retry behaviour for connection failures
    pub retry: RetryPolicy,
}

impl Default for OllamaConfig {
    fn default() -> Self {
        Self {
            host: "http://localhost".into(),
            port: 11434,
            generation: GenerationOptions::default(),
            retry: RetryPolicy::default(),
        }
    }
}

impl OllamaConfig {
    /// Read `OLLAMA_HOST`, `OLLAMA_PORT`, `OLLAMA_MODEL` and
    /// `OLLAMA_MAX_RETRIES`, falling back to defaults
    pub fn from_env() -> Self {
        let defaults = Self::default();
        let host = std::env::var("OLLAMA_HOST").unwrap_or(defaults.host);
        let port = std::env::var("OLLAMA_PORT")
            .ok()
            .and_then(|p| p.parse().ok())
            .unwrap_or(defaults.port);
        let model = std::env::var("OLLAMA_MODEL").unwrap_or(defaults.generation.model);
        let max_attempts = std::env::var("OLLAMA_MAX_RETRIES")
            .ok()
            .and_then(|n| n.parse().ok())
            .filter(|n| *n >= 1)
            .unwrap_or(defaults.retry.max_attempts);

        Self {
            host,
            port,
            generation: GenerationOptions {
                model,
                ..defaults.generation
            },
            retry: RetryPolicy {
                max_attempts,
                ..defaults.retry
            },
        }
    }

    #[must_use]
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.generation.model = model.into();
        self
    }

    #[must_use]
    pub fn with_backoff(mut self, max_attempts: u32, backoff_factor: Duration) -> Self {
        self.retry = RetryPolicy {
            max_attempts,
            backoff_factor,
        };
        self
    }
}

/// Ollama LLM provider
pub struct OllamaProvider {
    client: Ollama,
    config: OllamaConfig,
}

impl OllamaProvider {
    /// Create a new Ollama provider with custom host/port
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self::from_config(OllamaConfig {
            host: host.into(),
            port,
            ..Default::default()
        })
    }

    /// Create from configuration
    pub fn from_config(config: OllamaConfig) -> Self {
        Self {
            client: Ollama::new(config.host.clone(), config.port),
            config,
        }
    }

    /// Create from environment variables
    pub fn from_env() -> Self {
        Self::from_config(OllamaConfig::from_env())
    }

    /// Create with default localhost settings
    pub fn localhost() -> Self {
        Self::from_config(OllamaConfig::default())
    }

    pub fn config(&self) -> &OllamaConfig {
        &self.config
    }

    /// Build Ollama model options
    fn build_options(opts: &GenerationOptions) -> ModelOptions {
        let options = ModelOptions::default()
            .temperature(opts.temperature)
            .top_p(opts.top_p)
            .num_predict(i32::try_from(opts.max_tokens).unwrap_or(i32::MAX));

        if opts.stop_sequences.is_empty() {
            options
        } else {
            options.stop(opts.stop_sequences.clone())
        }
    }

    async fn chat_once(&self, prompt: &str) -> Result<String> {
        let options = &self.config.generation;
        let request = ChatMessageRequest::new(
            options.model.clone(),
            vec![ChatMessage::user(prompt.to_string())],
        )
        .options(Self::build_options(options));

        let response = self
            .client
            .send_chat_messages(request)
            .await
            .map_err(|e| classify_failure(e.to_string()))?;

        let text = response.message.content.trim();
        if text.is_empty() {
            return Err(AgentError::Provider("No valid text content in response".into()));
        }
        Ok(text.to_string())
    }
}

#[async_trait]
impl LlmProvider for OllamaProvider {
    fn name(&self) -> &str {
        "Ollama"
    }

    async fn generate_response(&self, prompt: &str) -> Result<String> {
        validate_prompt(prompt)?;

        tracing::debug!(
            model = %self.config.generation.model,
            prompt_chars = prompt.len(),
            "Sending prompt to Ollama"
        );
        self.config.retry.run(|| self.chat_once(prompt)).await
    }

    async fn health_check(&self) -> Result<bool> {
        match self.client.list_local_models().await {
            Ok(_) => Ok(true),
            Err(e) => {
                tracing::warn!("Ollama health check failed: {}", e);
                Ok(false)
            }
        }
    }

    async fn list_models(&self) -> Result<Vec<String>> {
        let models = self
            .client
            .list_local_models()
            .await
            .map_err(|e| classify_failure(e.to_string()))?;

        Ok(models.into_iter().map(|m| m.name).collect())
    }
}

/// Sort a client failure into auth, rate limit, timeout or plain transport
fn classify_failure(message: String) -> AgentError {
    let lower = message.to_lowercase();
    let mentions = |needles: &[&str]| needles.iter().any(|n| lower.contains(n));

    if mentions(&["401", "403", "unauthorized", "forbidden"]) {
        AgentError::Auth(message)
    } else if mentions(&["429", "rate limit", "too many requests"]) {
        AgentError::RateLimited(message)
    } else if mentions(&["timed out", "timeout"]) {
        AgentError::Timeout(message)
    } else {
        AgentError::ProviderUnavailable(message)
    }
}

fn validate_prompt(prompt: &str) -> Result<()> {
    if prompt.trim().is_empty() {
        return Err(AgentError::Provider("prompt must be a non-empty string".into()));
    }
    Ok(())
}
