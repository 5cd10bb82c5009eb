//! HTTP Handlers

use axum::{
    body::Bytes,
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use agent_core::{
    Agent, AgentError, AgentKind, ExecutionResult, FailureKind, LoopStatus, ReasoningOutcome,
    ToolSchema, ToolStatsSnapshot,
};

use crate::state::AppState;

// ============================================================================
// Request / Response Types
// ============================================================================

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
    pub provider: String,
    pub provider_connected: bool,
    pub tools: usize,
}

#[derive(Debug, Serialize)]
pub struct ToolInfo {
    #[serde(flatten)]
    pub schema: ToolSchema,
    pub stats: ToolStatsSnapshot,
}

#[derive(Debug, Deserialize)]
pub struct AgentRequest {
    pub query: String,
    #[serde(default)]
    pub max_iterations: Option<usize>,
    #[serde(default)]
    pub show_reasoning: Option<bool>,
    #[serde(default)]
    pub introduction: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct AgentResponse {
    pub kind: AgentKind,
    pub answer: String,
    pub status: LoopStatus,
    pub iterations: usize,
    pub run_id: Uuid,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reasoning_steps: Option<Vec<String>>,
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: String,
}

type ApiError = (StatusCode, Json<ErrorResponse>);

fn api_error(status: StatusCode, code: &str, error: impl Into<String>) -> ApiError {
    (
        status,
        Json(ErrorResponse {
            error: error.into(),
            code: code.into(),
        }),
    )
}

fn agent_error(err: &AgentError) -> ApiError {
    let (status, code) = match err {
        AgentError::Config(_) | AgentError::Registration(_) => {
            (StatusCode::BAD_REQUEST, "CONFIG_ERROR")
        }
        AgentError::ProviderUnavailable(_) | AgentError::Timeout(_) => {
            (StatusCode::SERVICE_UNAVAILABLE, "PROVIDER_UNAVAILABLE")
        }
        AgentError::RateLimited(_) => (StatusCode::TOO_MANY_REQUESTS, "RATE_LIMITED"),
        _ => (StatusCode::INTERNAL_SERVER_ERROR, "AGENT_ERROR"),
    };
    api_error(status, code, err.user_message())
}

// ============================================================================
// Handlers
// ============================================================================

/// Health check endpoint
pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    let provider_connected = state.provider.health_check().await.unwrap_or(false);

    Json(HealthResponse {
        status: "healthy",
        version: env!("CARGO_PKG_VERSION"),
        provider: state.provider.name().to_string(),
        provider_connected,
        tools: state.tools.len(),
    })
}

/// Tool schemas with call statistics
pub async fn list_tools(State(state): State<AppState>) -> Json<Vec<ToolInfo>> {
    let tools = state
        .tools
        .schemas()
        .map(|schema| ToolInfo {
            stats: state.tools.stats(&schema.name).unwrap_or_default(),
            schema: schema.clone(),
        })
        .collect();
    Json(tools)
}

/// Run one tool directly; the body is the parameter object
///
/// An empty body means no arguments. A body that is not JSON is handed to
/// the dispatcher as a string so it reports the usual format error.
pub async fn invoke_tool(
    State(state): State<AppState>,
    Path(name): Path<String>,
    body: Bytes,
) -> (StatusCode, Json<ExecutionResult>) {
    let parameters = if body.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&body)
            .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&body).into_owned()))
    };
    let result = state.dispatcher.invoke_one(&name, &parameters).await;

    let status = match result.failure_kind() {
        Some(FailureKind::NotFound) => StatusCode::NOT_FOUND,
        _ => StatusCode::OK,
    };
    (status, Json(result))
}

/// Run one agent invocation
pub async fn invoke_agent(
    State(state): State<AppState>,
    Path(kind): Path<String>,
    Json(payload): Json<AgentRequest>,
) -> Result<Json<AgentResponse>, ApiError> {
    let kind: AgentKind = kind
        .parse()
        .map_err(|e: AgentError| api_error(StatusCode::NOT_FOUND, "UNKNOWN_AGENT", e.to_string()))?;

    if payload.query.trim().is_empty() {
        return Err(api_error(StatusCode::BAD_REQUEST, "EMPTY_QUERY", "query must not be empty"));
    }

    let agent = build_agent(&state, kind, &payload).map_err(|e| agent_error(&e))?;

    let outcome = agent.invoke_detailed(&payload.query).await.map_err(|e| {
        tracing::error!(%kind, "Agent error: {}", e);
        agent_error(&e)
    })?;

    let show_reasoning = kind == AgentKind::Reasoning && agent.config().show_reasoning;
    let response = AgentResponse {
        kind,
        answer: outcome.answer.clone(),
        status: outcome.status,
        iterations: outcome.iterations,
        run_id: outcome.run_id,
        reasoning_steps: None,
    };

    if !show_reasoning {
        return Ok(Json(response));
    }
    // Aborted runs carry no steps, matching the library's reasoning outcome
    match ReasoningOutcome::from_outcome(outcome, true) {
        ReasoningOutcome::Bundle(bundle) => Ok(Json(AgentResponse {
            reasoning_steps: Some(bundle.reasoning_steps),
            ..response
        })),
        ReasoningOutcome::Answer(_) => Ok(Json(response)),
    }
}

fn build_agent(
    state: &AppState,
    kind: AgentKind,
    payload: &AgentRequest,
) -> agent_core::Result<Agent> {
    let config = &state.config;
    let mut builder = Agent::builder(kind)
        .provider(state.provider.clone())
        .llm_timeout(config.llm_timeout)
        .max_workers(config.max_workers)
        .tool_timeout(config.tool_timeout);

    if kind.requires_tools() {
        builder = builder.tools(state.tools.as_ref().clone());
    }
    if let Some(max) = payload.max_iterations.or(config.max_iterations) {
        builder = builder.max_iterations(max);
    }
    if let Some(show) = payload.show_reasoning {
        builder = builder.show_reasoning(show);
    }
    if let Some(introduction) = &payload.introduction {
        builder = builder.introduction(introduction.clone());
    }

    builder.build()
}
