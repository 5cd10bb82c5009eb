//! Tool System
//!
//! A tool is a named capability the model can ask for: a description shown
//! in the prompt, an ordered parameter schema, and an async function taking
//! keyword arguments as a JSON object.
//!
//! Implement [`Tool`] directly for stateful tools, or wrap a closure with
//! [`FunctionTool`]. `FunctionTool::from_fn` infers the parameter schema
//! from the argument type, the way a decorator would read a signature.

use std::fmt;
use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;
use futures::future::BoxFuture;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

/// Keyword arguments passed to a tool
pub type ToolArgs = serde_json::Map<String, Value>;

/// Boxed async tool body
pub type ToolFunction =
    Arc<dyn Fn(ToolArgs) -> BoxFuture<'static, Result<Value, ToolError>> + Send + Sync>;

/// Failure raised by a tool body
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ToolError {
    /// Arguments could not be bound to the tool's parameters
    #[error("invalid arguments: {0}")]
    InvalidArguments(String),

    /// The tool ran and failed
    #[error("{0}")]
    Execution(String),
}

impl ToolError {
    pub fn is_binding(&self) -> bool {
        matches!(self, ToolError::InvalidArguments(_))
    }
}

impl From<anyhow::Error> for ToolError {
    fn from(err: anyhow::Error) -> Self {
        ToolError::Execution(err.to_string())
    }
}

impl From<String> for ToolError {
    fn from(msg: String) -> Self {
        ToolError::Execution(msg)
    }
}

impl From<&str> for ToolError {
    fn from(msg: &str) -> Self {
        ToolError::Execution(msg.to_string())
    }
}

impl From<std::io::Error> for ToolError {
    fn from(err: std::io::Error) -> Self {
        ToolError::Execution(err.to_string())
    }
}

impl From<serde_json::Error> for ToolError {
    fn from(err: serde_json::Error) -> Self {
        ToolError::Execution(err.to_string())
    }
}

/// Parameter definition for tool schema
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParameterSchema {
    /// Parameter name
    pub name: String,

    /// Semantic type tag shown to the model (str, int, float, bool, list, dict)
    #[serde(rename = "type")]
    pub param_type: String,

    /// Human-readable description
    pub description: String,

    /// Whether this parameter is required
    #[serde(default)]
    pub required: bool,
}

impl ParameterSchema {
    pub fn new(
        name: impl Into<String>,
        param_type: impl Into<String>,
        description: impl Into<String>,
        required: bool,
    ) -> Self {
        Self {
            name: name.into(),
            param_type: param_type.into(),
            description: description.into(),
            required,
        }
    }

    /// `name (type, required)` as used in prompt listings
    pub fn summary(&self) -> String {
        let req = if self.required { "required" } else { "optional" };
        format!("{} ({}, {})", self.name, self.param_type, req)
    }
}

/// Tool definition schema (rendered into prompts)
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolSchema {
    /// Unique tool identifier, used as the dispatch key
    pub name: String,

    /// Human-readable description (shown to LLM)
    pub description: String,

    /// Parameter definitions, in declaration order
    pub parameters: Vec<ParameterSchema>,

    /// Whether output should bypass further agent processing
    #[serde(default)]
    pub return_direct: bool,
}

impl ToolSchema {
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            parameters: Vec::new(),
            return_direct: false,
        }
    }

    /// Names of the required parameters
    pub fn required_parameters(&self) -> impl Iterator<Item = &str> {
        self.parameters
            .iter()
            .filter(|p| p.required)
            .map(|p| p.name.as_str())
    }

    /// `a (str), b (int)` hint appended to parameter-binding errors
    pub fn parameter_hint(&self) -> String {
        self.parameters
            .iter()
            .map(|p| format!("{} ({})", p.name, p.param_type))
            .collect::<Vec<_>>()
            .join(", ")
    }
}

/// Tool trait - implement to add new capabilities
#[async_trait]
pub trait Tool: Send + Sync {
    /// Get the tool's schema
    fn schema(&self) -> ToolSchema;

    /// Run the tool with keyword arguments exactly as the model supplied them
    async fn execute(&self, args: ToolArgs) -> Result<Value, ToolError>;
}

/// A tool backed by a closure
#[derive(Clone)]
pub struct FunctionTool {
    schema: ToolSchema,
    function: ToolFunction,
}

impl fmt::Debug for FunctionTool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FunctionTool")
            .field("schema", &self.schema)
            .finish_non_exhaustive()
    }
}

impl FunctionTool {
    /// Wrap an already boxed function with an explicit schema
    pub fn new(schema: ToolSchema, function: ToolFunction) -> Self {
        Self { schema, function }
    }

    /// Start a tool with an explicit parameter schema
    pub fn builder(name: impl Into<String>) -> FunctionToolBuilder {
        FunctionToolBuilder {
            schema: ToolSchema::new(name, ""),
        }
    }

    /// Wrap a plain (blocking) function.
    ///
    /// The parameter schema is read from `A::default()` serialized to JSON:
    /// every field becomes a parameter, `Option` fields (serialized as
    /// `null`) are optional and tagged `str`, everything else is required.
    /// Only the first line of `description` is kept.
    ///
    /// The function runs on the blocking thread pool.
    pub fn from_fn<A, R, E, F>(name: impl Into<String>, description: &str, f: F) -> Self
    where
        A: DeserializeOwned + Serialize + Default + Send + 'static,
        R: Serialize + Send + 'static,
        E: Into<ToolError> + Send + 'static,
        F: Fn(A) -> Result<R, E> + Send + Sync + 'static,
    {
        let parameters = infer_parameters::<A>();
        let declared: Vec<String> = parameters.iter().map(|p| p.name.clone()).collect();
        let f = Arc::new(f);

        let function: ToolFunction = Arc::new(
            move |args: ToolArgs| -> BoxFuture<'static, Result<Value, ToolError>> {
                let f = Arc::clone(&f);
                let bound = bind_arguments::<A>(args, &declared);
                Box::pin(async move {
                    let input = bound?;
                    let output = tokio::task::spawn_blocking(move || f(input))
                        .await
                        .map_err(|e| ToolError::Execution(format!("tool panicked: {e}")))?
                        .map_err(Into::<ToolError>::into)?;
                    Ok::<_, ToolError>(serde_json::to_value(output)?)
                })
            },
        );

        Self {
            schema: ToolSchema {
                name: name.into(),
                description: first_line(description),
                parameters,
                return_direct: false,
            },
            function,
        }
    }

    /// Wrap an async function; schema inference as in [`FunctionTool::from_fn`]
    pub fn from_async_fn<A, R, E, F, Fut>(
        name: impl Into<String>,
        description: &str,
        f: F,
    ) -> Self
    where
        A: DeserializeOwned + Serialize + Default + Send + 'static,
        R: Serialize + Send + 'static,
        E: Into<ToolError> + Send + 'static,
        F: Fn(A) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<R, E>> + Send + 'static,
    {
        let parameters = infer_parameters::<A>();
        let declared: Vec<String> = parameters.iter().map(|p| p.name.clone()).collect();
        let f = Arc::new(f);

        let function: ToolFunction = Arc::new(
            move |args: ToolArgs| -> BoxFuture<'static, Result<Value, ToolError>> {
                let f = Arc::clone(&f);
                let bound = bind_arguments::<A>(args, &declared);
                Box::pin(async move {
                    let output = f(bound?).await.map_err(Into::<ToolError>::into)?;
                    Ok::<_, ToolError>(serde_json::to_value(output)?)
                })
            },
        );

        Self {
            schema: ToolSchema {
                name: name.into(),
                description: first_line(description),
                parameters,
                return_direct: false,
            },
            function,
        }
    }

    /// Override a parameter description
    #[must_use]
    pub fn describe(mut self, param: &str, description: impl Into<String>) -> Self {
        if let Some(p) = self.schema.parameters.iter_mut().find(|p| p.name == param) {
            p.description = description.into();
        }
        self
    }

    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.schema.name = name.into();
        self
    }

    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.schema.description = description.into();
        self
    }

    #[must_use]
    pub fn with_return_direct(mut self, return_direct: bool) -> Self {
        self.schema.return_direct = return_direct;
        self
    }

    /// The underlying function, shared with every clone of this tool
    pub fn function(&self) -> &ToolFunction {
        &self.function
    }
}

#[async_trait]
impl Tool for FunctionTool {
    fn schema(&self) -> ToolSchema {
        self.schema.clone()
    }

    async fn execute(&self, args: ToolArgs) -> Result<Value, ToolError> {
        (self.function)(args).await
    }
}

/// Builder for [`FunctionTool`] with a hand-written schema
#[derive(Debug)]
pub struct FunctionToolBuilder {
    schema: ToolSchema,
}

impl FunctionToolBuilder {
    #[must_use]
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.schema.description = description.into();
        self
    }

    #[must_use]
    pub fn parameter(
        mut self,
        name: impl Into<String>,
        param_type: impl Into<String>,
        description: impl Into<String>,
        required: bool,
    ) -> Self {
        self.schema
            .parameters
            .push(ParameterSchema::new(name, param_type, description, required));
        self
    }

    #[must_use]
    pub fn return_direct(mut self, return_direct: bool) -> Self {
        self.schema.return_direct = return_direct;
        self
    }

    /// Finish with an async handler over the raw argument map
    pub fn handler<F, Fut>(self, f: F) -> FunctionTool
    where
        F: Fn(ToolArgs) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Value, ToolError>> + Send + 'static,
    {
        FunctionTool {
            schema: self.schema,
            function: Arc::new(
                move |args: ToolArgs| -> BoxFuture<'static, Result<Value, ToolError>> {
                    Box::pin(f(args))
                },
            ),
        }
    }
}

fn first_line(text: &str) -> String {
    let text = text.trim();
    if text.is_empty() {
        return "No description provided".into();
    }
    text.lines().next().unwrap_or_default().trim().to_string()
}

/// Type tag for a JSON value; `null` has no shape and falls back to `str`
fn type_tag(value: &Value) -> &'static str {
    match value {
        Value::Bool(_) => "bool",
        Value::Number(n) if n.is_f64() => "float",
        Value::Number(_) => "int",
        Value::Array(_) => "list",
        Value::Object(_) => "dict",
        Value::String(_) | Value::Null => "str",
    }
}

fn infer_parameters<A: Serialize + Default>() -> Vec<ParameterSchema> {
    let Ok(Value::Object(fields)) = serde_json::to_value(A::default()) else {
        return Vec::new();
    };

    fields
        .iter()
        .map(|(name, value)| ParameterSchema {
            name: name.clone(),
            param_type: type_tag(value).into(),
            description: format!("The {name} parameter"),
            required: !value.is_null(),
        })
        .collect()
}

fn bind_arguments<A: DeserializeOwned>(args: ToolArgs, declared: &[String]) -> Result<A, ToolError> {
    if let Some(unexpected) = args.keys().find(|k| !declared.iter().any(|d| d == *k)) {
        return Err(ToolError::InvalidArguments(format!(
            "got an unexpected keyword argument '{unexpected}'"
        )));
    }

    let empty = args.is_empty();
    match serde_json::from_value::<A>(Value::Object(args)) {
        Ok(bound) => Ok(bound),
        // Unit-like argument types only deserialize from null
        Err(e) if empty => serde_json::from_value::<A>(Value::Null)
            .map_err(|_| ToolError::InvalidArguments(e.to_string())),
        Err(e) => Err(ToolError::InvalidArguments(e.to_string())),
    }
}
