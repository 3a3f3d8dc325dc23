//! Inbound HTTP boundary: the axum router and batch endpoint handler.
//!
//! This adapter owns everything the core deliberately does not: routing,
//! body parsing, the JSON content-type gate, and mapping `BatchError` to
//! HTTP 400 responses. The core engine is reached only through
//! [`BatchGateway`].

use std::sync::Arc;

use axum::{
    Json, Router,
    extract::State,
    http::{HeaderMap, StatusCode, header},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use bytes::Bytes;
use tower_http::trace::TraceLayer;

use crate::core::{BatchError, BatchGateway, RawEnvelope};

/// Build the gateway's axum router: the batch endpoint plus a liveness
/// probe, with request tracing.
pub fn build_router(gateway: Arc<BatchGateway>) -> Router {
    let batch_path = gateway.config().batch_path.clone();
    Router::new()
        .route(&batch_path, post(handle_batch))
        .route("/health", get(handle_health))
        .layer(TraceLayer::new_for_http())
        .with_state(gateway)
}

/// Handle one batch envelope: content-type gate, parse, execute, respond.
async fn handle_batch(
    State(gateway): State<Arc<BatchGateway>>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    if !content_type_is_json(&headers) {
        return bad_request(&BatchError::validation(
            "Batch Request will only accept body as json",
        ));
    }

    let raw: RawEnvelope = match serde_json::from_slice(&body) {
        Ok(raw) => raw,
        Err(err) => {
            return bad_request(&BatchError::validation(format!(
                "Malformed batch envelope: {err}"
            )));
        }
    };

    match gateway.execute_batch(&raw, &headers).await {
        Ok(result) => (StatusCode::OK, Json(result)).into_response(),
        Err(err) => bad_request(&err),
    }
}

async fn handle_health() -> Response {
    let body = serde_json::json!({
        "status": "ok",
        "timestamp": chrono::Utc::now().to_rfc3339(),
    });
    (StatusCode::OK, Json(body)).into_response()
}

fn bad_request(err: &BatchError) -> Response {
    (StatusCode::BAD_REQUEST, Json(err.to_json())).into_response()
}

fn content_type_is_json(headers: &HeaderMap) -> bool {
    headers
        .get(header::CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .is_some_and(|value| value.contains("json"))
}
