//! agent-server
//!
//! Axum-based server exposing the four agent loops and direct tool dispatch.

mod config;
mod handlers;
mod state;

use std::sync::Arc;

use axum::{
    routing::{get, post},
    Router,
};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use agent_core::{LlmProvider, ToolRegistry};
use agent_runtime::{builtin_tools, OllamaProvider};

use crate::config::ServerConfig;
use crate::handlers::{health_check, invoke_agent, invoke_tool, list_tools};
use crate::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info,tower_http=debug".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load environment
    dotenvy::dotenv().ok();
    let config = ServerConfig::from_env();

    // Initialize LLM provider
    let provider = Arc::new(OllamaProvider::from_env());
    tracing::info!(model = %provider.config().generation.model, "Using Ollama model");

    match provider.health_check().await {
        Ok(true) => {
            tracing::info!("✓ Connected to Ollama");
            if let Ok(models) = provider.list_models().await {
                for model in models {
                    tracing::info!("  Model: {}", model);
                }
            }
        }
        Ok(false) | Err(_) => {
            tracing::warn!("⚠ Ollama not available - agent calls will fail");
            tracing::warn!("  Make sure Ollama is running: ollama serve");
        }
    }

    // Initialize tools
    let mut tools = ToolRegistry::new();
    tools.register(builtin_tools())?;

    tracing::info!("Registered {} tools:", tools.len());
    for name in tools.names() {
        tracing::info!("  • {}", name);
    }

    let addr = config.bind_addr.clone();
    let app = router(AppState::new(provider, tools, config));

    let listener = tokio::net::TcpListener::bind(&addr).await?;

    tracing::info!("agent-server running on http://{}", addr);
    tracing::info!("Endpoints:");
    tracing::info!("  GET  /health                    - Health check");
    tracing::info!("  GET  /api/tools                 - Tool schemas and statistics");
    tracing::info!("  POST /api/tools/{{name}}/invoke   - Run one tool");
    tracing::info!("  POST /api/agents/{{kind}}/invoke  - Run an agent");

    axum::serve(listener, app).await?;

    Ok(())
}

fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(health_check))
        .route("/api/tools", get(list_tools))
        .route("/api/tools/{name}/invoke", post(invoke_tool))
        .route("/api/agents/{kind}/invoke", post(invoke_agent))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::{to_bytes, Body};
    use axum::http::{Request, StatusCode};
    use serde_json::{json, Value};
    use tower::ServiceExt;

    struct FixedProvider(&'static str);

    #[async_trait::async_trait]
    impl LlmProvider for FixedProvider {
        fn name(&self) -> &str {
            "fixed"
        }

        async fn generate_response(&self, _prompt: &str) -> agent_core::Result<String> {
            Ok(self.0.to_string())
        }
    }

    fn app(reply: &'static str) -> Router {
        let mut tools = ToolRegistry::new();
        tools.register(builtin_tools()).unwrap();
        router(AppState::new(
            Arc::new(FixedProvider(reply)),
            tools,
            ServerConfig::default(),
        ))
    }

    async fn send(app: Router, method: &str, uri: &str, body: Value) -> (StatusCode, Value) {
        let request = Request::builder()
            .method(method)
            .uri(uri)
            .header("content-type", "application/json")
            .body(if body.is_null() {
                Body::empty()
            } else {
                Body::from(body.to_string())
            })
            .unwrap();

        let response = app.oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn test_health_reports_tools() {
        let (status, body) = send(app(""), "GET", "/health", Value::Null).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["tools"], 2);
        assert_eq!(body["provider"], "fixed");
    }

    #[tokio::test]
    async fn test_tool_invocation_updates_stats() {
        let app = app("");
        let (status, body) = send(
            app.clone(),
            "POST",
            "/api/tools/calculator/invoke",
            json!({"expression": "6 * 7"}),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "success");
        assert_eq!(body["result"], 42.0);

        let (_, tools) = send(app, "GET", "/api/tools", Value::Null).await;
        assert_eq!(tools[0]["name"], "calculator");
        assert_eq!(tools[0]["stats"]["calls"], 1);
    }

    #[tokio::test]
    async fn test_unknown_tool_is_not_found() {
        let (status, body) =
            send(app(""), "POST", "/api/tools/calc/invoke", json!({})).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["status"], "error");
        assert!(body["result"]
            .as_str()
            .unwrap()
            .starts_with("Error: Tool 'calc' not found. Did you mean: calculator"));
    }

    #[tokio::test]
    async fn test_reasoning_agent_returns_steps() {
        let reply = "```json\n{\"Reasoning Steps\": [\"add\"], \"Final Answer\": \"4\"}\n```";
        let (status, body) = send(
            app(reply),
            "POST",
            "/api/agents/reasoning/invoke",
            json!({"query": "2 + 2?"}),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["answer"], "4");
        assert_eq!(body["status"], "completed");
        assert_eq!(body["reasoning_steps"], json!(["add"]));
    }

    #[tokio::test]
    async fn test_agent_errors_map_to_status_codes() {
        let (status, body) = send(
            app(""),
            "POST",
            "/api/agents/planner/invoke",
            json!({"query": "hi"}),
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["code"], "UNKNOWN_AGENT");

        let (status, body) = send(
            app(""),
            "POST",
            "/api/agents/react/invoke",
            json!({"query": "hi", "max_iterations": 0}),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["code"], "CONFIG_ERROR");
    }
}
