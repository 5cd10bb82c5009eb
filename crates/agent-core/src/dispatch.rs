//! Tool Dispatch
//!
//! Resolves tool names against a [`ToolRegistry`], binds parameters and runs
//! the tool. Every failure is folded into an [`ExecutionResult`] with
//! `status = error` and a readable message; nothing escapes as an error value.

use std::collections::HashMap;
use std::fmt;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::{Duration, Instant};

use futures::FutureExt;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::sync::Semaphore;
use tokio::task::{Id, JoinSet};

use crate::registry::ToolRegistry;
use crate::tool::{ToolArgs, ToolError};

/// Worker bound used when nothing else is configured
pub const DEFAULT_MAX_WORKERS: usize = 50;

/// Per-call limit used when nothing else is configured
pub const DEFAULT_CALL_TIMEOUT: Duration = Duration::from_secs(60);

/// Dispatch limits
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DispatchConfig {
    /// Concurrent tool calls allowed within one batch
    pub max_workers: usize,
    /// Deadline for a single tool call; `None` waits forever
    pub call_timeout: Option<Duration>,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            max_workers: DEFAULT_MAX_WORKERS,
            call_timeout: Some(DEFAULT_CALL_TIMEOUT),
        }
    }
}

/// One requested tool invocation
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ToolCall {
    pub tool: String,
    #[serde(default)]
    pub parameters: Value,
}

impl ToolCall {
    pub fn new(tool: impl Into<String>, parameters: Value) -> Self {
        Self {
            tool: tool.into(),
            parameters,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExecutionStatus {
    Success,
    Error,
}

/// Why a call ended in `status = error`
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FailureKind {
    NotFound,
    /// Parameters were neither absent nor a JSON object
    InvalidFormat,
    /// The tool rejected the keyword arguments it was given
    ParameterMismatch,
    Execution,
    Timeout,
    /// The task running the call failed before producing a result
    Worker,
    /// Not attempted: the same call already failed too often
    Suppressed,
}

/// Normalized outcome of one tool invocation
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ExecutionResult {
    pub tool: String,
    pub status: ExecutionStatus,
    /// Tool output on success, diagnostic string on error
    pub result: Value,
    /// Parameters exactly as supplied
    pub parameters: Value,
    #[serde(skip)]
    failure: Option<FailureKind>,
}

impl ExecutionResult {
    fn success(tool: &str, result: Value, parameters: &Value) -> Self {
        Self {
            tool: tool.to_string(),
            status: ExecutionStatus::Success,
            result,
            parameters: parameters.clone(),
            failure: None,
        }
    }

    fn failure(tool: &str, kind: FailureKind, message: String, parameters: &Value) -> Self {
        Self {
            tool: tool.to_string(),
            status: ExecutionStatus::Error,
            result: Value::String(message),
            parameters: parameters.clone(),
            failure: Some(kind),
        }
    }

    pub(crate) fn suppressed(call: &ToolCall, message: String) -> Self {
        Self::failure(&call.tool, FailureKind::Suppressed, message, &call.parameters)
    }

    /// Extend an error message with extra guidance
    pub(crate) fn append_hint(&mut self, hint: &str) {
        if let Value::String(message) = &mut self.result {
            message.push_str(hint);
        }
    }

    fn worker_failure(call: &ToolCall, err: &dyn fmt::Display) -> Self {
        Self::failure(
            &call.tool,
            FailureKind::Worker,
            format!("Execution error: {err}"),
            &call.parameters,
        )
    }

    pub fn is_success(&self) -> bool {
        self.status == ExecutionStatus::Success
    }

    pub fn failure_kind(&self) -> Option<FailureKind> {
        self.failure
    }

    /// Result as observation text: strings verbatim, anything else as JSON
    pub fn observation(&self) -> String {
        match &self.result {
            Value::String(text) => text.clone(),
            other => other.to_string(),
        }
    }
}

/// Runs tools from a shared registry
#[derive(Clone)]
pub struct ToolDispatcher {
    registry: Arc<ToolRegistry>,
    config: DispatchConfig,
}

impl ToolDispatcher {
    pub fn new(registry: Arc<ToolRegistry>) -> Self {
        Self::with_config(registry, DispatchConfig::default())
    }

    pub fn with_config(registry: Arc<ToolRegistry>, config: DispatchConfig) -> Self {
        Self { registry, config }
    }

    pub fn registry(&self) -> &Arc<ToolRegistry> {
        &self.registry
    }

    pub fn config(&self) -> &DispatchConfig {
        &self.config
    }

    /// Invoke a single tool.
    ///
    /// `parameters` may be absent (`null`, `""`, `"None"`), a JSON object of
    /// keyword arguments, or a string holding such an object.
    pub async fn invoke_one(&self, name: &str, parameters: &Value) -> ExecutionResult {
        let Some(entry) = self.registry.entry(name) else {
            tracing::debug!(tool = %name, "Tool not found");
            return ExecutionResult::failure(
                name,
                FailureKind::NotFound,
                self.not_found_message(name),
                parameters,
            );
        };

        let args = match keyword_arguments(parameters) {
            Ok(args) => args,
            Err(message) => {
                return ExecutionResult::failure(
                    name,
                    FailureKind::InvalidFormat,
                    message,
                    parameters,
                );
            }
        };

        let started = Instant::now();
        let call = AssertUnwindSafe(entry.tool.execute(args)).catch_unwind();
        let outcome = match self.config.call_timeout {
            Some(limit) => tokio::time::timeout(limit, call).await.map_err(|_| limit),
            None => Ok(call.await),
        };
        let elapsed = started.elapsed();

        let result = match outcome {
            Ok(Ok(Ok(value))) => ExecutionResult::success(name, value, parameters),
            Ok(Ok(Err(err @ ToolError::InvalidArguments(_)))) => ExecutionResult::failure(
                name,
                FailureKind::ParameterMismatch,
                format!("Error: Parameter mismatch for tool '{name}'. {err}"),
                parameters,
            ),
            Ok(Ok(Err(err))) => ExecutionResult::failure(
                name,
                FailureKind::Execution,
                format!("Error executing tool '{name}': {err}"),
                parameters,
            ),
            Ok(Err(_panic)) => ExecutionResult::failure(
                name,
                FailureKind::Execution,
                format!("Error executing tool '{name}': tool panicked"),
                parameters,
            ),
            Err(limit) => {
                tracing::warn!(tool = %name, timeout_secs = limit.as_secs_f64(), "Tool call timed out");
                ExecutionResult::failure(
                    name,
                    FailureKind::Timeout,
                    format!("Error: Tool '{name}' timed out after {}s", limit.as_secs_f64()),
                    parameters,
                )
            }
        };

        entry.stats.record(
            result.is_success(),
            result.failure == Some(FailureKind::Timeout),
            elapsed,
        );

        tracing::debug!(
            tool = %name,
            success = result.is_success(),
            elapsed_ms = elapsed.as_millis(),
            result = %log_preview(&result.observation()),
            "Tool call finished"
        );

        result
    }

    /// Invoke several tools.
    ///
    /// One call runs inline. More than one run as concurrent tasks bounded
    /// by `max_workers`; results come back in completion order, one per
    /// call, each tagged with its tool name and parameters.
    pub async fn invoke_many(&self, calls: &[ToolCall]) -> Vec<ExecutionResult> {
        match calls {
            [] => Vec::new(),
            [only] => vec![self.invoke_one(&only.tool, &only.parameters).await],
            _ => self.invoke_concurrent(calls).await,
        }
    }

    async fn invoke_concurrent(&self, calls: &[ToolCall]) -> Vec<ExecutionResult> {
        let permits = Arc::new(Semaphore::new(self.config.max_workers.max(1)));
        // Dropping the set aborts every call still running
        let mut tasks = JoinSet::new();
        let mut spawned = HashMap::with_capacity(calls.len());

        for call in calls {
            let dispatcher = self.clone();
            let permits = Arc::clone(&permits);
            let task_call = call.clone();
            let handle = tasks.spawn(async move {
                let _permit = permits.acquire_owned().await?;
                Ok::<_, tokio::sync::AcquireError>(
                    dispatcher
                        .invoke_one(&task_call.tool, &task_call.parameters)
                        .await,
                )
            });
            spawned.insert(handle.id(), call.clone());
        }

        let mut results = Vec::with_capacity(calls.len());
        while let Some(joined) = tasks.join_next_with_id().await {
            let (id, failure): (Id, Box<dyn fmt::Display + Send>) = match joined {
                Ok((_, Ok(result))) => {
                    results.push(result);
                    continue;
                }
                Ok((id, Err(err))) => (id, Box::new(err)),
                Err(err) => (err.id(), Box::new(err)),
            };
            if let Some(call) = spawned.get(&id) {
                results.push(ExecutionResult::worker_failure(call, &failure));
            }
        }
        results
    }

    fn not_found_message(&self, name: &str) -> String {
        let suggestions = self.registry.similar_names(name);
        if suggestions.is_empty() {
            format!(
                "Error: Tool '{name}' not found. Available tools: {}",
                self.registry.names().join(", ")
            )
        } else {
            format!(
                "Error: Tool '{name}' not found. Did you mean: {}?",
                suggestions.join(", ")
            )
        }
    }
}

const INVALID_FORMAT: &str = "Error: Invalid parameter format. Expected JSON dictionary.";

fn is_absent(text: &str) -> bool {
    matches!(text.trim(), "" | "None" | "null")
}

fn keyword_arguments(parameters: &Value) -> Result<ToolArgs, String> {
    match parameters {
        Value::Null => Ok(ToolArgs::new()),
        Value::Object(map) => Ok(map.clone()),
        Value::String(text) if is_absent(text) => Ok(ToolArgs::new()),
        Value::String(text) => match serde_json::from_str::<Value>(text) {
            Ok(Value::Object(map)) => Ok(map),
            Ok(Value::Null) => Ok(ToolArgs::new()),
            _ => Err(INVALID_FORMAT.to_string()),
        },
        _ => Err(INVALID_FORMAT.to_string()),
    }
}

/// Shorten long text for log output
pub(crate) fn log_preview(text: &str) -> String {
    const LIMIT: usize = 500;
    match text.char_indices().nth(LIMIT) {
        Some((idx, _)) => format!("{}... ({} chars)", &text[..idx], text.chars().count()),
        None => text.to_string(),
    }
}
