//! HTTP surface: webhook ingestion and workflow queries.
//!
//! GitHub delivers webhooks either as `application/json` or as a
//! form-encoded body whose `payload` field holds the JSON document.
//! Both are accepted; the decoded object goes to the store verbatim.

use crate::event_store::FileEventStore;
use crate::workflows;
use anyhow::{Context, Result};
use axum::body::Bytes;
use axum::extract::{Path, Query, State};
use axum::http::{header, HeaderMap, StatusCode};
use axum::response::{IntoResponse, Json, Response};
use axum::routing::{get, post};
use axum::Router;
use serde::Deserialize;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;

/// Default for `GET /api/workflows` when `limit` is absent or malformed.
const DEFAULT_WORKFLOW_LIMIT: usize = 10;

#[derive(Deserialize)]
struct WebhookForm {
    payload: String,
}

/// Builds the API router backed by `store`.
pub fn router(store: Arc<FileEventStore>) -> Router {
    Router::new()
        .route("/api/webhook", post(receive_webhook))
        .route("/api/workflows", get(list_workflows))
        .route("/api/events/{id}", get(get_event))
        .with_state(store)
}

/// Binds `addr` and serves the API until the process exits.
///
/// The container is initialized up front so a misconfigured data
/// directory fails the writer at startup instead of on first delivery.
pub async fn serve(store: Arc<FileEventStore>, addr: SocketAddr) -> Result<()> {
    store
        .ensure_initialized()
        .context("failed to initialize event container")?;

    let app = router(store);
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {}", addr))?;
    tracing::info!(%addr, "webhook server listening");
    axum::serve(listener, app)
        .await
        .context("webhook server terminated")?;
    Ok(())
}

async fn receive_webhook(
    State(store): State<Arc<FileEventStore>>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let payload = match decode_payload(&headers, &body) {
        Ok(payload) => payload,
        Err(message) => {
            tracing::warn!(%message, "rejecting webhook delivery");
            return (StatusCode::BAD_REQUEST, Json(json!({ "error": message }))).into_response();
        }
    };

    let record = match payload {
        Value::Object(map) => map,
        _ => {
            tracing::warn!("rejecting non-object webhook payload");
            return (
                StatusCode::BAD_REQUEST,
                Json(json!({ "error": "payload must be a JSON object" })),
            )
                .into_response();
        }
    };

    tracing::info!(
        event_id = record.get("id").and_then(serde_json::Value::as_str).unwrap_or("-"),
        "received webhook"
    );

    match store.save(record) {
        Ok(()) => StatusCode::OK.into_response(),
        Err(e) => {
            tracing::error!(error = %e, "failed to persist webhook event");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "error": "Internal Server Error" })),
            )
                .into_response()
        }
    }
}

/// Decodes the delivery body into a JSON value, honoring both GitHub
/// content types.
fn decode_payload(headers: &HeaderMap, body: &[u8]) -> Result<Value, String> {
    let content_type = headers
        .get(header::CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .unwrap_or("");

    if content_type.starts_with("application/x-www-form-urlencoded") {
        let form: WebhookForm = serde_urlencoded::from_bytes(body)
            .map_err(|e| format!("invalid form body: {}", e))?;
        serde_json::from_str(&form.payload).map_err(|e| format!("invalid payload field: {}", e))
    } else {
        serde_json::from_slice(body).map_err(|e| format!("invalid JSON body: {}", e))
    }
}

async fn list_workflows(
    State(store): State<Arc<FileEventStore>>,
    Query(params): Query<HashMap<String, String>>,
) -> Response {
    let limit = params
        .get("limit")
        .and_then(|raw| raw.parse::<usize>().ok())
        .unwrap_or(DEFAULT_WORKFLOW_LIMIT);

    let summaries = workflows::list_recent_workflows(&store, limit);
    Json(summaries).into_response()
}

async fn get_event(
    State(store): State<Arc<FileEventStore>>,
    Path(id): Path<String>,
) -> Response {
    match store.get(&id) {
        Some(event) => Json(event).into_response(),
        None => (
            StatusCode::NOT_FOUND,
            Json(json!({ "error": "Not Found" })),
        )
            .into_response(),
    }
}
