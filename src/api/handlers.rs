use axum::extract::{Path, State};
use axum::Json;
use serde::Serialize;
use serde_json::{Map, Value};

use crate::api::error::ApiError;
use crate::api::server::AppState;
use crate::types::DispatchRequest;

#[derive(Serialize)]
pub struct SwarmResponse {
    pub swarm_results: Map<String, Value>,
}

#[derive(Serialize)]
pub struct AgentInfo {
    pub name: String,
    pub command: String,
}

pub async fn health_check() -> Json<Value> {
    Json(serde_json::json!({
        "status": "healthy",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

pub async fn get_config(State(state): State<AppState>) -> Json<Value> {
    Json(serde_json::json!({
        "version": env!("CARGO_PKG_VERSION"),
        "timeout_secs": state.config.timeout_secs,
        "agent_suffix": state.config.agent_suffix,
        "registered_agents": state.dispatcher.registry().len(),
    }))
}

/// The dispatch endpoint. The response covers every requested agent,
/// failures included.
pub async fn run_swarm(
    State(state): State<AppState>,
    Json(request): Json<DispatchRequest>,
) -> Json<SwarmResponse> {
    let outcome = state.dispatcher.dispatch(&request).await;

    Json(SwarmResponse {
        swarm_results: outcome.results_map(),
    })
}

pub async fn list_agents(State(state): State<AppState>) -> Json<Vec<String>> {
    Json(state.dispatcher.registry().names())
}

pub async fn get_agent(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> Result<Json<AgentInfo>, ApiError> {
    match state.dispatcher.registry().resolve(&name) {
        Some(command) => Ok(Json(AgentInfo {
            name,
            command: command.command_line(),
        })),
        None => Err(ApiError::NotFound(format!("agent not found: {}", name))),
    }
}
