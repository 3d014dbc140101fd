use std::sync::Arc;
use std::time::Instant;

use axum::Json;
use axum::extract::{Path, State};
use axum::http::HeaderMap;
use axum::response::{IntoResponse, Response};
use axum::routing::{delete, get, post};
use axum::Router;
use serde::Deserialize;
use tracing::info;

use aigateway_common::RequestContext;
use aigateway_core::{AdminOps, Selector};
use aigateway_protocol::ChatCompletionRequest;

use crate::error::{AdminHttpError, IngressError};

#[derive(Clone)]
pub struct AppState {
    pub selector: Arc<Selector>,
    pub admin: Arc<AdminOps>,
}

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/v1/chat/completions", post(chat_completions))
        .route("/admin/providers", get(list_providers))
        .route("/admin/providers/{id}/credentials", post(set_credential).delete(delete_credential))
        .route("/admin/providers/{id}/healthcheck", post(healthcheck))
        .with_state(state)
}

fn request_context(headers: &HeaderMap) -> RequestContext {
    let request_id = headers.get("x-request-id").and_then(|v| v.to_str().ok()).map(str::to_string);
    let provider_override = headers.get("x-provider-id").and_then(|v| v.to_str().ok()).map(str::to_string);
    RequestContext::new(request_id, provider_override)
}

async fn chat_completions(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(request): Json<ChatCompletionRequest>,
) -> Response {
    let ctx = request_context(&headers);
    let started = Instant::now();
    info!(event = "request_received", request_id = %ctx.request_id, model = %request.model);

    let result = state.selector.chat_completions(request, &ctx).await;
    let mut response = match result {
        Ok(body) => Json(body).into_response(),
        Err(err) => IngressError(err).into_response(),
    };
    response.headers_mut().insert(
        "x-request-id",
        axum::http::HeaderValue::from_str(&ctx.request_id).unwrap_or_else(|_| axum::http::HeaderValue::from_static("")),
    );
    info!(event = "request_completed", request_id = %ctx.request_id, elapsed_ms = started.elapsed().as_millis());
    response
}

async fn list_providers(State(state): State<AppState>) -> Response {
    let rows = state.admin.list_providers().await;
    Json(serde_json::json!({ "providers": rows.iter().map(row_to_json).collect::<Vec<_>>() })).into_response()
}

fn row_to_json(row: &aigateway_core::ProviderDashboardRow) -> serde_json::Value {
    serde_json::json!({
        "id": row.id,
        "name": row.name,
        "priority": row.priority,
        "has_api_key": row.has_api_key,
        "last_error": row.last_error,
        "last_error_at": row.last_error_at,
    })
}

#[derive(Debug, Deserialize)]
struct SetCredentialBody {
    api_key: String,
}

async fn set_credential(
    State(state): State<AppState>,
    Path(provider_id): Path<String>,
    headers: HeaderMap,
    Json(body): Json<SetCredentialBody>,
) -> Response {
    let ctx = request_context(&headers);
    match state.admin.set_credential(&provider_id, &body.api_key, &ctx).await {
        Ok(()) => Json(serde_json::json!({ "status": "ok" })).into_response(),
        Err(err) => AdminHttpError(err).into_response(),
    }
}

async fn delete_credential(State(state): State<AppState>, Path(provider_id): Path<String>) -> Response {
    match state.admin.delete_credential(&provider_id).await {
        Ok(()) => Json(serde_json::json!({ "status": "ok" })).into_response(),
        Err(err) => AdminHttpError(err).into_response(),
    }
}

async fn healthcheck(State(state): State<AppState>, Path(provider_id): Path<String>, headers: HeaderMap) -> Response {
    let ctx = request_context(&headers);
    match state.admin.healthcheck(&provider_id, &ctx).await {
        Ok(()) => Json(serde_json::json!({ "status": "ok" })).into_response(),
        Err(err) => AdminHttpError(err).into_response(),
    }
}
