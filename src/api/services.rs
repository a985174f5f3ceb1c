use axum::{
    Json,
    body::Body,
    extract::{Path, State},
    http::{HeaderMap, StatusCode, header},
    response::IntoResponse,
};
use tracing::{debug, warn};

use super::{
    error::ApiError,
    models::{HealthResponse, NodeInfo, NodeListResponse, NodeRequest},
    state::AppState,
    utils::{is_blank, parse_content_type},
};
use crate::handlers::Envelope;

/// Node invocation endpoint (POST /nodes/{name})
///
/// Body is `{"inputs": {...}, "config": {...}}`; both keys are optional and
/// an empty body runs the node with neither. The node's result envelope is
/// returned with `200 OK` whether the node succeeded or not.
pub async fn run_node(
    State(state): State<AppState>,
    Path(name): Path<String>,
    headers: HeaderMap,
    body: Body,
) -> Result<Json<Envelope>, ApiError> {
    if !state.registry.has_node(&name) {
        warn!(node = %name, "Unknown node requested over HTTP");
        state.metrics.node_rejected();
        return Err(ApiError::UnknownNode(name));
    }

    let limit = state.config.server.max_body_bytes.as_usize();
    let bytes = axum::body::to_bytes(body, limit)
        .await
        .map_err(|_| ApiError::PayloadTooLarge(limit))?;

    let request = if is_blank(&bytes) {
        NodeRequest::default()
    } else {
        let content_type = headers
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .ok_or_else(|| ApiError::InvalidPayload("missing Content-Type header".into()))?;
        parse_content_type(content_type)?;
        serde_json::from_slice::<NodeRequest>(&bytes)?
    };

    debug!(
        node = %name,
        inputs = request.inputs.len(),
        config = request.config.len(),
        "Dispatching node request"
    );

    let envelope = state
        .registry
        .process(&name, request.inputs, request.config)
        .await;

    Ok(Json(envelope))
}

/// Node catalogue (GET /nodes)
pub async fn list_nodes(State(state): State<AppState>) -> Json<NodeListResponse> {
    let nodes = state.registry.kinds().map(NodeInfo::from).collect();
    Json(NodeListResponse { nodes })
}

/// Call counters (GET /metrics)
pub async fn metrics(State(state): State<AppState>) -> impl IntoResponse {
    Json(state.metrics.snapshot())
}

/// Health check endpoint (GET /health)
pub async fn health(State(state): State<AppState>) -> impl IntoResponse {
    let response = HealthResponse {
        status: "healthy".to_string(),
        nodes: state.registry.kinds().count(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    };

    (StatusCode::OK, Json(response))
}
