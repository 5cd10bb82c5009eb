//! Error Types

use thiserror::Error;

/// Result type alias for agent operations
pub type Result<T> = std::result::Result<T, AgentError>;

/// Agent error types
///
/// Only configuration and provider failures ever leave `invoke()`. Parse
/// failures and tool failures are turned into observation text inside the
/// loop and fed back to the model.
#[derive(Error, Debug)]
pub enum AgentError {
    /// LLM provider error
    #[error("Provider error: {0}")]
    Provider(String),

    /// Provider unavailable or not responding
    #[error("Provider unavailable: {0}")]
    ProviderUnavailable(String),

    /// A collaborator did not answer in time
    #[error("Timed out: {0}")]
    Timeout(String),

    /// Tool could not be registered
    #[error("Registration error: {0}")]
    Registration(String),

    /// No JSON object could be located in an LLM response
    #[error("Parse error: {0}")]
    Parse(String),

    /// Configuration error (no LLM, no tools, bad limits)
    #[error("Configuration error: {0}")]
    Config(String),

    /// Rate limited
    #[error("Rate limited: {0}")]
    RateLimited(String),

    /// Authentication failed
    #[error("Authentication failed: {0}")]
    Auth(String),

    /// JSON serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl AgentError {
    /// Check if error is retryable
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            AgentError::ProviderUnavailable(_)
                | AgentError::Timeout(_)
                | AgentError::RateLimited(_)
        )
    }

    /// Check if error is a configuration problem raised at `invoke()` entry
    pub fn is_config(&self) -> bool {
        matches!(self, AgentError::Config(_) | AgentError::Registration(_))
    }

    /// Convert to a user-friendly message
    pub fn user_message(&self) -> String {
        match self {
            AgentError::Provider(msg) => format!("The AI service encountered an error: {msg}"),
            AgentError::ProviderUnavailable(_) => {
                "The AI service is currently unavailable. Please try again.".into()
            }
            AgentError::Timeout(_) => "The AI service took too long to respond.".into(),
            AgentError::Registration(msg) => format!("A tool could not be registered: {msg}"),
            AgentError::Config(msg) => format!("The agent is not configured correctly: {msg}"),
            AgentError::RateLimited(_) => {
                "You've made too many requests. Please wait a moment.".into()
            }
            AgentError::Auth(_) => "Authentication failed. Please check your credentials.".into(),
            _ => "An unexpected error occurred.".into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retryable_classification() {
        assert!(AgentError::ProviderUnavailable("down".into()).is_retryable());
        assert!(AgentError::Timeout("llm".into()).is_retryable());
        assert!(AgentError::RateLimited("429".into()).is_retryable());
        assert!(!AgentError::Auth("401".into()).is_retryable());
        assert!(!AgentError::Config("no llm".into()).is_retryable());
        assert!(!AgentError::Provider("bad request".into()).is_retryable());
    }

    #[test]
    fn test_config_errors() {
        assert!(AgentError::Config("No tools added".into()).is_config());
        assert!(AgentError::Registration("empty name".into()).is_config());
        assert!(!AgentError::Parse("no json".into()).is_config());
    }
}
