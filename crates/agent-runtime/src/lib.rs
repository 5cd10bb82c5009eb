//! # agent-runtime
//!
//! Concrete collaborators for `agent-core`.
//!
//! ## Providers
//!
//! - **Ollama** (default): Local LLM inference via Ollama, with retry and
//!   exponential backoff on transient failures
//!
//! ## Tools
//!
//! - `calculator`: arithmetic expression evaluation
//! - `datetime`: current UTC date and time
//!
//! ## Usage
//!
//! ```rust,ignore
//! use agent_runtime::{builtin_tools, OllamaProvider};
//!
//! let agent = Agent::builder(AgentKind::React)
//!     .provider(Arc::new(OllamaProvider::from_env()))
//!     .tool(builtin_tools())
//!     .build()?;
//! let answer = agent.invoke("What is 17 * 23?").await?;
//! ```

#[cfg(feature = "ollama")]
pub mod ollama;
pub mod retry;
pub mod tools;

#[cfg(feature = "ollama")]
pub use ollama::{OllamaConfig, OllamaProvider};
pub use retry::RetryPolicy;
pub use tools::{builtin_tools, BuiltinTools};

// Re-export core types for convenience
pub use agent_core::{
    Agent, AgentError, AgentKind, LlmProvider, LoopOutcome, Result, Tool, ToolRegistry,
};
