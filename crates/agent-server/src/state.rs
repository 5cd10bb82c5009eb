//! Application State

use std::sync::Arc;

use agent_core::{LlmProvider, ToolDispatcher, ToolRegistry};

use crate::config::ServerConfig;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    /// LLM provider (Ollama, etc.)
    pub provider: Arc<dyn LlmProvider>,

    /// Tool registry with all available tools; agents get clones that share
    /// its statistics
    pub tools: Arc<ToolRegistry>,

    /// Dispatcher for direct tool invocation
    pub dispatcher: ToolDispatcher,

    /// Agent defaults from the environment
    pub config: Arc<ServerConfig>,
}

impl AppState {
    pub fn new(provider: Arc<dyn LlmProvider>, tools: ToolRegistry, config: ServerConfig) -> Self {
        let tools = Arc::new(tools);
        Self {
            provider,
            dispatcher: ToolDispatcher::with_config(Arc::clone(&tools), config.dispatch()),
            tools,
            config: Arc::new(config),
        }
    }
}
