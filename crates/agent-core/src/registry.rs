//! Tool Registry
//!
//! Insertion-ordered collection of tools keyed by name. Registering a name
//! twice replaces the earlier tool in place (last write wins, position kept).

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use indexmap::IndexMap;
use serde::Serialize;

use crate::error::{AgentError, Result};
use crate::tool::{Tool, ToolSchema};

/// A value that yields several tools at once (a wrapper around a service
/// exposing more than one operation, for example)
pub trait Toolkit {
    fn tools(&self) -> Vec<Arc<dyn Tool>>;
}

/// Anything the registry accepts: one tool, or a collection of them
pub enum ToolSource {
    One(Arc<dyn Tool>),
    Many(Vec<ToolSource>),
}

impl ToolSource {
    /// Unpack a toolkit into its tools
    pub fn toolkit<K: Toolkit + ?Sized>(toolkit: &K) -> Self {
        ToolSource::Many(toolkit.tools().into_iter().map(ToolSource::One).collect())
    }
}

impl<T: Tool + 'static> From<T> for ToolSource {
    fn from(tool: T) -> Self {
        ToolSource::One(Arc::new(tool))
    }
}

impl From<Arc<dyn Tool>> for ToolSource {
    fn from(tool: Arc<dyn Tool>) -> Self {
        ToolSource::One(tool)
    }
}

impl<S: Into<ToolSource>> From<Vec<S>> for ToolSource {
    fn from(items: Vec<S>) -> Self {
        ToolSource::Many(items.into_iter().map(Into::into).collect())
    }
}

/// Per-tool call counters, updated by the dispatcher
#[derive(Debug, Default)]
pub struct ToolStats {
    calls: AtomicU64,
    failures: AtomicU64,
    timeouts: AtomicU64,
    total_micros: AtomicU64,
}

impl ToolStats {
    pub(crate) fn record(&self, success: bool, timed_out: bool, elapsed: Duration) {
        self.calls.fetch_add(1, Ordering::Relaxed);
        if !success {
            self.failures.fetch_add(1, Ordering::Relaxed);
        }
        if timed_out {
            self.timeouts.fetch_add(1, Ordering::Relaxed);
        }
        let micros = u64::try_from(elapsed.as_micros()).unwrap_or(u64::MAX);
        self.total_micros.fetch_add(micros, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> ToolStatsSnapshot {
        let calls = self.calls.load(Ordering::Relaxed);
        let total_micros = self.total_micros.load(Ordering::Relaxed);
        ToolStatsSnapshot {
            calls,
            failures: self.failures.load(Ordering::Relaxed),
            timeouts: self.timeouts.load(Ordering::Relaxed),
            total_ms: total_micros / 1000,
            avg_ms: if calls == 0 { 0 } else { total_micros / calls / 1000 },
        }
    }
}

/// Point-in-time copy of [`ToolStats`]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct ToolStatsSnapshot {
    pub calls: u64,
    pub failures: u64,
    pub timeouts: u64,
    pub total_ms: u64,
    pub avg_ms: u64,
}

/// A registered tool with its schema captured at registration
#[derive(Clone)]
pub struct RegisteredTool {
    pub(crate) tool: Arc<dyn Tool>,
    pub(crate) schema: ToolSchema,
    pub(crate) stats: Arc<ToolStats>,
}

/// How `render_schema_with` lays out the tool listing
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SchemaStyle {
    /// `- name: description` with a `Parameters:` line, indented by `n` spaces
    Indented(usize),
    /// `• name: description` with one `  - param` line per parameter
    Bulleted,
}

/// Registry for available tools
#[derive(Clone, Default)]
pub struct ToolRegistry {
    tools: IndexMap<String, RegisteredTool>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a tool, a `Vec` of tools, or a toolkit.
    ///
    /// Returns how many tools were added. Fails on the first descriptor with
    /// an empty name or duplicate parameter names; tools before it stay
    /// registered.
    pub fn register(&mut self, source: impl Into<ToolSource>) -> Result<usize> {
        match source.into() {
            ToolSource::One(tool) => {
                self.insert(tool)?;
                Ok(1)
            }
            ToolSource::Many(items) => {
                let mut added = 0;
                for item in items {
                    added += self.register(item)?;
                }
                Ok(added)
            }
        }
    }

    /// Register every tool a toolkit exposes
    pub fn register_toolkit<K: Toolkit + ?Sized>(&mut self, toolkit: &K) -> Result<usize> {
        self.register(ToolSource::toolkit(toolkit))
    }

    fn insert(&mut self, tool: Arc<dyn Tool>) -> Result<()> {
        let schema = tool.schema();
        validate_schema(&schema)?;

        let name = schema.name.clone();
        let entry = RegisteredTool {
            tool,
            schema,
            stats: Arc::new(ToolStats::default()),
        };

        if self.tools.insert(name.clone(), entry).is_some() {
            tracing::debug!(tool = %name, "Replaced existing tool");
        } else {
            tracing::info!(tool = %name, "Added tool");
        }
        Ok(())
    }

    /// Exact-match lookup
    pub fn resolve(&self, name: &str) -> Option<Arc<dyn Tool>> {
        self.tools.get(name).map(|entry| Arc::clone(&entry.tool))
    }

    pub(crate) fn entry(&self, name: &str) -> Option<&RegisteredTool> {
        self.tools.get(name)
    }

    /// Schema captured when the tool was registered
    pub fn schema(&self, name: &str) -> Option<&ToolSchema> {
        self.tools.get(name).map(|entry| &entry.schema)
    }

    /// All schemas in registration order
    pub fn schemas(&self) -> impl Iterator<Item = &ToolSchema> {
        self.tools.values().map(|entry| &entry.schema)
    }

    /// Get tool names in registration order
    pub fn names(&self) -> Vec<&str> {
        self.tools.keys().map(String::as_str).collect()
    }

    /// Number of registered tools
    pub fn len(&self) -> usize {
        self.tools.len()
    }

    /// Check if empty
    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    pub fn stats(&self, name: &str) -> Option<ToolStatsSnapshot> {
        self.tools.get(name).map(|entry| entry.stats.snapshot())
    }

    /// Canonical listing: `- name: description` plus a parameter line
    pub fn render_schema(&self) -> String {
        self.render_schema_with(SchemaStyle::Indented(0))
    }

    pub fn render_schema_with(&self, style: SchemaStyle) -> String {
        match style {
            SchemaStyle::Indented(indent) => {
                let pad = " ".repeat(indent);
                self.schemas()
                    .map(|schema| {
                        let mut line = format!("{pad}- {}: {}", schema.name, schema.description);
                        if !schema.parameters.is_empty() {
                            let params: Vec<String> =
                                schema.parameters.iter().map(|p| p.summary()).collect();
                            line.push_str(&format!("\n{pad}  Parameters: {}", params.join(", ")));
                        }
                        line
                    })
                    .collect::<Vec<_>>()
                    .join("\n")
            }
            SchemaStyle::Bulleted => {
                if self.is_empty() {
                    return "No tools available.".into();
                }
                self.schemas()
                    .map(|schema| {
                        let params = if schema.parameters.is_empty() {
                            "  No parameters".to_string()
                        } else {
                            schema
                                .parameters
                                .iter()
                                .map(|p| format!("  - {}", p.summary()))
                                .collect::<Vec<_>>()
                                .join("\n")
                        };
                        format!("• {}: {}\n{}", schema.name, schema.description, params)
                    })
                    .collect::<Vec<_>>()
                    .join("\n\n")
            }
        }
    }

    /// Registered names that contain, or are contained in, `name`
    /// (case-insensitive)
    pub fn similar_names(&self, name: &str) -> Vec<&str> {
        let wanted = name.to_lowercase();
        if wanted.is_empty() {
            return Vec::new();
        }
        self.tools
            .keys()
            .filter(|candidate| {
                let candidate = candidate.to_lowercase();
                candidate.contains(&wanted) || wanted.contains(&candidate)
            })
            .map(String::as_str)
            .collect()
    }
}

fn validate_schema(schema: &ToolSchema) -> Result<()> {
    if schema.name.trim().is_empty() {
        return Err(AgentError::Registration(
            "Tool name must be a non-empty string".into(),
        ));
    }

    for (i, param) in schema.parameters.iter().enumerate() {
        if param.name.trim().is_empty() {
            return Err(AgentError::Registration(format!(
                "Tool '{}' has a parameter with an empty name",
                schema.name
            )));
        }
        if schema.parameters[..i].iter().any(|p| p.name == param.name) {
            return Err(AgentError::Registration(format!(
                "Tool '{}' declares parameter '{}' twice",
                schema.name, param.name
            )));
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tool::{FunctionTool, ToolArgs, ToolError};
    use serde_json::{json, Value};

    fn constant(name: &str, value: &'static str) -> FunctionTool {
        FunctionTool::builder(name)
            .description(format!("Returns {value}"))
            .handler(move |_args: ToolArgs| async move { Ok(json!(value)) })
    }

    fn calculator() -> FunctionTool {
        FunctionTool::builder("calculator")
            .description("Performs mathematical calculations")
            .parameter("expression", "str", "Math expression to evaluate", true)
            .parameter("precision", "int", "Decimal places", false)
            .handler(|_args: ToolArgs| async move { Ok(Value::Null) })
    }

    struct PairKit;

    impl Toolkit for PairKit {
        fn tools(&self) -> Vec<Arc<dyn Tool>> {
            vec![Arc::new(constant("left", "L")), Arc::new(constant("right", "R"))]
        }
    }

    #[test]
    fn test_resolve_returns_registered_function() {
        let tool: Arc<dyn Tool> = Arc::new(calculator());

        let mut registry = ToolRegistry::new();
        registry.register(Arc::clone(&tool)).unwrap();

        let resolved = registry.resolve("calculator").unwrap();
        assert!(Arc::ptr_eq(&resolved, &tool));
        assert!(registry.resolve("Calculator").is_none());
    }

    #[test]
    fn test_register_collections_and_toolkits() {
        let mut registry = ToolRegistry::new();
        let added = registry
            .register(vec![constant("a", "A-done"), constant("b", "B-done")])
            .unwrap();
        assert_eq!(added, 2);

        assert_eq!(registry.register_toolkit(&PairKit).unwrap(), 2);
        assert_eq!(registry.names(), vec!["a", "b", "left", "right"]);
    }

    #[test]
    fn test_duplicate_name_last_write_wins_in_place() {
        let mut registry = ToolRegistry::new();
        registry.register(constant("a", "first")).unwrap();
        registry.register(constant("b", "B")).unwrap();
        registry.register(constant("a", "second")).unwrap();

        assert_eq!(registry.len(), 2);
        assert_eq!(registry.names(), vec!["a", "b"]);
        assert_eq!(registry.schema("a").unwrap().description, "Returns second");
    }

    #[test]
    fn test_empty_name_is_registration_error() {
        let mut registry = ToolRegistry::new();
        let err = registry.register(constant("  ", "x")).unwrap_err();
        assert!(matches!(err, AgentError::Registration(_)));
        assert!(registry.is_empty());
    }

    #[test]
    fn test_duplicate_parameter_is_registration_error() {
        let tool = FunctionTool::builder("dup")
            .parameter("x", "str", "", true)
            .parameter("x", "int", "", false)
            .handler(|_args: ToolArgs| async move { Err::<Value, _>(ToolError::from("unused")) });

        let mut registry = ToolRegistry::new();
        assert!(registry.register(tool).is_err());
    }

    #[test]
    fn test_render_schema_lists_names_and_required_params() {
        let mut registry = ToolRegistry::new();
        registry.register(calculator()).unwrap();
        registry.register(constant("clock", "noon")).unwrap();

        let rendered = registry.render_schema();
        assert_eq!(
            rendered,
            "- calculator: Performs mathematical calculations\n  \
             Parameters: expression (str, required), precision (int, optional)\n\
             - clock: Returns noon"
        );

        let schema = registry.schema("calculator").unwrap();
        for name in schema.required_parameters() {
            assert!(rendered.contains(name));
        }
    }

    #[test]
    fn test_render_schema_bulleted() {
        let mut registry = ToolRegistry::new();
        assert_eq!(registry.render_schema_with(SchemaStyle::Bulleted), "No tools available.");

        registry.register(calculator()).unwrap();
        registry.register(constant("clock", "noon")).unwrap();
        assert_eq!(
            registry.render_schema_with(SchemaStyle::Bulleted),
            "• calculator: Performs mathematical calculations\n  \
             - expression (str, required)\n  \
             - precision (int, optional)\n\n\
             • clock: Returns noon\n  No parameters"
        );
    }

    #[test]
    fn test_similar_names() {
        let mut registry = ToolRegistry::new();
        registry.register(calculator()).unwrap();
        registry.register(constant("clock", "noon")).unwrap();

        assert_eq!(registry.similar_names("calc"), vec!["calculator"]);
        assert_eq!(registry.similar_names("CALCULATOR_V2"), vec!["calculator"]);
        assert!(registry.similar_names("weather").is_empty());
    }

    #[test]
    fn test_stats_snapshot() {
        let stats = ToolStats::default();
        stats.record(true, false, Duration::from_millis(4));
        stats.record(false, true, Duration::from_millis(6));

        let snap = stats.snapshot();
        assert_eq!(snap.calls, 2);
        assert_eq!(snap.failures, 1);
        assert_eq!(snap.timeouts, 1);
        assert_eq!(snap.total_ms, 10);
        assert_eq!(snap.avg_ms, 5);
    }
}
