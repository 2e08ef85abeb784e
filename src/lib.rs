pub mod adapters;
pub mod config;
pub mod domain;
pub mod error;
pub mod gateway;
pub mod handlers;
pub mod metrics;
pub mod ports;
pub mod services;

use std::sync::Arc;

use axum::{
    routing::{get, post},
    Router,
};

use services::{PaymentService, WalletDebitService};

#[derive(Clone)]
pub struct AppState {
    pub payments: Arc<PaymentService>,
    pub debits: Arc<WalletDebitService>,
    pub webhook_secret: String,
}

pub fn create_app(state: AppState) -> Router {
    Router::new()
        .route("/health", get(handlers::health))
        .route("/payments/intents", post(handlers::payments::create_intent))
        .route(
            "/payments/intents/:intent_id/confirm",
            post(handlers::payments::confirm_intent),
        )
        .route("/payments/refunds", post(handlers::payments::refund_payment))
        .route(
            "/payments/:intent_id/status",
            get(handlers::payments::payment_status),
        )
        .route("/wallets/debit", post(handlers::payments::debit_wallet))
        .route("/webhooks/gateway", post(handlers::webhook::gateway_callback))
        .with_state(state)
}
