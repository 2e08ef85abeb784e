//! Payment and wallet endpoints.
//!
//! Thin wrappers over the services: expected failure modes come back as
//! result objects with `success: false`, not error statuses.

use axum::{
    extract::{Path, State},
    response::IntoResponse,
    Json,
};

use crate::services::payments::{CreateIntentRequest, RefundRequest};
use crate::services::wallet_debit::DebitRequest;
use crate::AppState;

pub async fn create_intent(
    State(state): State<AppState>,
    Json(request): Json<CreateIntentRequest>,
) -> impl IntoResponse {
    Json(state.payments.create_intent(&request).await)
}

pub async fn confirm_intent(
    State(state): State<AppState>,
    Path(intent_id): Path<String>,
) -> impl IntoResponse {
    Json(state.payments.confirm_intent(&intent_id).await)
}

pub async fn refund_payment(
    State(state): State<AppState>,
    Json(request): Json<RefundRequest>,
) -> impl IntoResponse {
    Json(state.payments.refund_payment(&request).await)
}

pub async fn payment_status(
    State(state): State<AppState>,
    Path(intent_id): Path<String>,
) -> impl IntoResponse {
    Json(state.payments.get_payment_status(&intent_id).await)
}

pub async fn debit_wallet(
    State(state): State<AppState>,
    Json(request): Json<DebitRequest>,
) -> impl IntoResponse {
    Json(state.debits.debit(&request).await)
}
