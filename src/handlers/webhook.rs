//! Gateway webhook endpoint.
//!
//! The signature is verified against the raw body before anything is
//! parsed. Processing errors return 5xx so the gateway re-delivers;
//! unrecognized event types are acknowledged with 200.

use axum::{
    body::Bytes,
    extract::State,
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
    Json,
};
use serde_json::json;

use crate::error::AppError;
use crate::gateway::types::GatewayEvent;
use crate::gateway::webhook::{verify_signature, SIGNATURE_HEADER};
use crate::AppState;

pub async fn gateway_callback(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<impl IntoResponse, AppError> {
    let signature = headers
        .get(SIGNATURE_HEADER)
        .and_then(|h| h.to_str().ok())
        .ok_or_else(|| AppError::BadRequest("Missing webhook signature".to_string()))?;

    let valid = verify_signature(&body, signature, &state.webhook_secret)
        .map_err(|e| AppError::BadRequest(e.to_string()))?;
    if !valid {
        return Err(AppError::Unauthorized("Invalid webhook signature".to_string()));
    }

    let event: GatewayEvent = serde_json::from_slice(&body)
        .map_err(|e| AppError::BadRequest(format!("Malformed event payload: {e}")))?;

    tracing::debug!(event_id = %event.id, event_type = %event.event_type, "webhook received");
    state.payments.handle_webhook_event(&event).await?;

    Ok((StatusCode::OK, Json(json!({ "received": true }))))
}
