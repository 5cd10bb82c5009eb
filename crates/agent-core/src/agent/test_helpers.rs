//! Shared test helpers for agent loop tests.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use serde_json::{json, Value};

use crate::error::{AgentError, Result};
use crate::provider::LlmProvider;
use crate::tool::{FunctionTool, ToolArgs, ToolError};

/// A provider that replays scripted responses and records every prompt.
///
/// The last response repeats once the script runs out.
pub struct ScriptedProvider {
    responses: Vec<String>,
    error: Option<String>,
    prompts: Mutex<Vec<String>>,
}

impl ScriptedProvider {
    pub fn new<I, S>(responses: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            responses: responses.into_iter().map(Into::into).collect(),
            error: None,
            prompts: Mutex::default(),
        }
    }

    /// Answer every prompt with the same text
    pub fn repeating(text: &str) -> Self {
        Self::new([text])
    }

    /// Fail every call with a provider error
    pub fn failing(message: &str) -> Self {
        Self {
            responses: Vec::new(),
            error: Some(message.to_string()),
            prompts: Mutex::default(),
        }
    }

    pub fn call_count(&self) -> usize {
        self.prompts.lock().unwrap().len()
    }

    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap().clone()
    }
}

#[async_trait::async_trait]
impl LlmProvider for ScriptedProvider {
    fn name(&self) -> &str {
        "scripted_mock"
    }

    async fn generate_response(&self, prompt: &str) -> Result<String> {
        let mut prompts = self.prompts.lock().unwrap();
        let index = prompts.len();
        prompts.push(prompt.to_string());

        if let Some(message) = &self.error {
            return Err(AgentError::Provider(message.clone()));
        }

        let response = self
            .responses
            .get(index)
            .or_else(|| self.responses.last())
            .expect("ScriptedProvider needs at least one response");
        Ok(response.clone())
    }
}

/// A provider that never answers within any reasonable timeout
pub struct SlowProvider {
    delay: Duration,
}

impl SlowProvider {
    pub fn new(delay: Duration) -> Self {
        Self { delay }
    }
}

#[async_trait::async_trait]
impl LlmProvider for SlowProvider {
    fn name(&self) -> &str {
        "slow_mock"
    }

    async fn generate_response(&self, _prompt: &str) -> Result<String> {
        tokio::time::sleep(self.delay).await;
        Ok("too late".into())
    }
}

/// A tool that ignores its arguments and returns `value`
pub fn constant_tool(name: &str, value: &'static str) -> FunctionTool {
    FunctionTool::builder(name)
        .description(format!("Returns {value}"))
        .handler(move |_args: ToolArgs| async move { Ok(json!(value)) })
}

/// A tool that always fails, plus a counter of how often it actually ran
pub fn failing_tool(name: &str) -> (FunctionTool, Arc<AtomicUsize>) {
    let calls = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&calls);

    let tool = FunctionTool::builder(name)
        .description("Always fails")
        .parameter("x", "int", "Anything", true)
        .handler(move |_args: ToolArgs| {
            counter.fetch_add(1, Ordering::SeqCst);
            async move { Err::<Value, _>(ToolError::from("deterministic failure")) }
        });

    (tool, calls)
}
