//! Router and webhook handlers.

use std::{collections::HashMap, time::Instant};

use axum::{
    Json, Router,
    error_handling::HandleErrorLayer,
    extract::{DefaultBodyLimit, OriginalUri, Request, State},
    http::{HeaderMap, Method, StatusCode},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use bytes::Bytes;
use relay_core::SourceSystem;
use relay_webhook::{RouteDecision, WebhookRouter};
use serde_json::{Value, json};
use tower::{ServiceBuilder, timeout::TimeoutLayer};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing::{debug, error};

use crate::{ApiError, AppState};

/// Build the HTTP router.
pub fn build_router(state: AppState) -> Router {
    let body_limit = state.router.config().max_payload_size;
    let request_timeout = state.request_timeout;

    Router::new()
        .route("/webhook", post(webhook))
        .route("/webhook/payments", post(payments_webhook))
        .route("/webhook/board", post(board_webhook))
        .route("/health", get(health))
        .method_not_allowed_fallback(method_not_allowed)
        .fallback(not_found)
        .layer(middleware::from_fn(preflight))
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(
            ServiceBuilder::new()
                .layer(HandleErrorLayer::new(handle_timeout_error))
                .layer(TimeoutLayer::new(request_timeout)),
        )
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

async fn webhook(State(state): State<AppState>, headers: HeaderMap, body: Bytes) -> Response {
    let headers = header_map(&headers);
    let channel = WebhookRouter::channel_for(&headers);
    handle(&state, channel, &headers, &body).await
}

async fn payments_webhook(State(state): State<AppState>, headers: HeaderMap, body: Bytes) -> Response {
    handle(&state, SourceSystem::Payments, &header_map(&headers), &body).await
}

async fn board_webhook(State(state): State<AppState>, headers: HeaderMap, body: Bytes) -> Response {
    handle(&state, SourceSystem::ProjectBoard, &header_map(&headers), &body).await
}

async fn handle(
    state: &AppState,
    channel: SourceSystem,
    headers: &HashMap<String, String>,
    body: &[u8],
) -> Response {
    let started = Instant::now();
    let (status, body) = match state.router.route(channel, headers, body) {
        RouteDecision::Challenge(challenge) => (StatusCode::OK, json!({ "challenge": challenge })),
        RouteDecision::Ignored { event_type, reason } => {
            debug!(%channel, event_type = %event_type, reason, "Acknowledging ignored event");
            (
                StatusCode::OK,
                json!({ "message": "ignored", "eventType": event_type }),
            )
        }
        RouteDecision::Rejected(err) => error_parts(ApiError::from(err)),
        RouteDecision::Dispatch(event) => {
            match state.orchestrator.dispatch(&event, &state.token_secret).await {
                Ok(outcome) => match serde_json::to_value(&outcome) {
                    Ok(mut body) => {
                        if let Value::Object(map) = &mut body {
                            map.insert("received".to_string(), Value::Bool(true));
                        }
                        (StatusCode::OK, body)
                    }
                    Err(err) => {
                        error!(error = %err, "Failed to serialize outcome");
                        error_parts(ApiError::from(relay_core::SyncError::Internal(
                            "outcome serialization failed".to_string(),
                        )))
                    }
                },
                Err(err) => error_parts(ApiError::from(err)),
            }
        }
    };

    relay_telemetry::log_webhook_response(
        channel.as_str(),
        status.as_u16(),
        &body,
        u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX),
        &state.redact_fields,
    );
    (status, Json(body)).into_response()
}

fn error_parts(err: ApiError) -> (StatusCode, Value) {
    (err.status(), err.body())
}

/// Header names are lowercase in `HeaderMap`; non-UTF-8 values are dropped.
fn header_map(headers: &HeaderMap) -> HashMap<String, String> {
    headers
        .iter()
        .filter_map(|(name, value)| {
            value
                .to_str()
                .ok()
                .map(|value| (name.as_str().to_string(), value.to_string()))
        })
        .collect()
}

/// Answer every `OPTIONS` with `200`; `CorsLayer` adds the headers.
async fn preflight(request: Request, next: Next) -> Response {
    if request.method() == Method::OPTIONS {
        return StatusCode::OK.into_response();
    }
    next.run(request).await
}

async fn method_not_allowed() -> ApiError {
    ApiError::method_not_allowed()
}

async fn not_found(uri: OriginalUri) -> ApiError {
    ApiError::not_found(uri.0.path())
}

async fn handle_timeout_error(_err: tower::BoxError) -> ApiError {
    ApiError::timed_out()
}
