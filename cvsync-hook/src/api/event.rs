//! Webhook endpoint for event platform notifications

use axum::{extract::State, Json};
use cvsync_common::EventEnvelope;
use serde_json::{json, Value};
use tracing::{debug, info, warn};

use crate::{processing, ApiError, ApiResult, AppState};

/// GET /cvent-event
///
/// Lets the platform verify the configured token; the middleware already
/// rejected a wrong one.
pub async fn check_auth() -> Json<Value> {
    Json(json!({ "message": "Correct auth!" }))
}

/// POST /cvent-event
///
/// Parses the envelope, then applies it to the record store under the store
/// lock. Responds `{"changed": bool}`; event-level problems are 400s.
pub async fn receive_event(
    State(state): State<AppState>,
    Json(body): Json<Value>,
) -> ApiResult<Json<Value>> {
    let event = EventEnvelope::from_value(body.clone()).map_err(|e| reject(&body, e.into()))?;
    info!(
        "Received {} with {} message(s)",
        event.event_type,
        event.message_count()
    );

    let _guard = state.store_lock.lock().await;

    let data_dir = state.data_dir.clone();
    let notifier = state.notifier.clone();
    let pages = state.pages.clone();
    let changed = tokio::task::spawn_blocking(move || {
        processing::apply_event(&data_dir, &event, notifier.as_ref(), pages.as_ref())
    })
    .await
    .map_err(|e| ApiError::Internal(format!("Event task failed: {}", e)))?
    .map_err(|e| reject(&body, e.into()))?;

    Ok(Json(json!({ "changed": changed })))
}

fn reject(body: &Value, err: ApiError) -> ApiError {
    warn!("Failed to process request: {}", err);
    match serde_json::to_string_pretty(body) {
        Ok(text) => {
            for line in text.lines() {
                debug!("{}", line);
            }
        }
        Err(e) => debug!("Request body not printable: {}", e),
    }
    err
}
