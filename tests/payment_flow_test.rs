//! Router-level payment and wallet flows.

mod common;

use axum::http::StatusCode;
use serde_json::json;
use tower::ServiceExt;

use common::{body_json, json_request, seed_wallet, test_context};
use paylane_core::create_app;
use paylane_core::domain::{WalletEntryKind, WalletTransaction};
use paylane_core::ports::WalletStore;

#[tokio::test]
async fn test_health_endpoint() {
    let ctx = test_context();
    let request = axum::http::Request::builder()
        .uri("/health")
        .body(axum::body::Body::empty())
        .unwrap();

    let response = create_app(ctx.state.clone()).oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["status"], json!("healthy"));
}

#[tokio::test]
async fn test_create_intent_then_status_round_trip() {
    let ctx = test_context();
    let wallet = seed_wallet(&ctx).await;

    let response = create_app(ctx.state.clone())
        .oneshot(json_request(
            "POST",
            "/payments/intents",
            json!({
                "user_id": "user-1",
                "app_id": "app-1",
                "amount": 5000,
                "currency": "usd",
                "transaction_type": "app_one_time_payment",
                "wallet_id": wallet.id,
                "destination_account_id": null,
                "application_fee": null,
                "round_id": null,
                "investment_id": null,
                "investor_shares": null
            }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["success"], json!(true));
    assert_eq!(body["client_secret"], json!("cs_test"));
    let intent_id = body["intent_id"].as_str().unwrap().to_string();

    let request = axum::http::Request::builder()
        .uri(format!("/payments/{intent_id}/status"))
        .body(axum::body::Body::empty())
        .unwrap();
    let response = create_app(ctx.state.clone()).oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["success"], json!(true));
    assert_eq!(body["local_status"], json!("pending"));
    assert_eq!(body["provider_status"], json!("requires_confirmation"));
}

#[tokio::test]
async fn test_confirm_endpoint_applies_succeeded() {
    let ctx = test_context();
    let wallet = seed_wallet(&ctx).await;

    let response = create_app(ctx.state.clone())
        .oneshot(json_request(
            "POST",
            "/payments/intents",
            json!({
                "user_id": "user-1",
                "app_id": "app-1",
                "amount": 5000,
                "currency": "usd",
                "transaction_type": "payment",
                "wallet_id": wallet.id,
                "destination_account_id": null,
                "application_fee": null,
                "round_id": null,
                "investment_id": null,
                "investor_shares": null
            }),
        ))
        .await
        .unwrap();
    let body = body_json(response).await;
    let intent_id = body["intent_id"].as_str().unwrap().to_string();

    let response = create_app(ctx.state.clone())
        .oneshot(json_request(
            "POST",
            &format!("/payments/intents/{intent_id}/confirm"),
            json!({}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["success"], json!(true));
    assert_eq!(body["status"], json!("succeeded"));

    assert_eq!(ctx.wallets.get(wallet.id).await.unwrap().unwrap().balance, 5000);
    // Client-initiated path emits no economic event.
    assert!(ctx.events.events().await.is_empty());
}

#[tokio::test]
async fn test_refund_endpoint() {
    let ctx = test_context();
    let wallet = seed_wallet(&ctx).await;

    let response = create_app(ctx.state.clone())
        .oneshot(json_request(
            "POST",
            "/payments/intents",
            json!({
                "user_id": "user-1",
                "app_id": "app-1",
                "amount": 5000,
                "currency": "usd",
                "transaction_type": "payment",
                "wallet_id": wallet.id,
                "destination_account_id": null,
                "application_fee": null,
                "round_id": null,
                "investment_id": null,
                "investor_shares": null
            }),
        ))
        .await
        .unwrap();
    let body = body_json(response).await;
    let intent_id = body["intent_id"].as_str().unwrap().to_string();

    // Confirm first so the refund transition is legal.
    create_app(ctx.state.clone())
        .oneshot(json_request(
            "POST",
            &format!("/payments/intents/{intent_id}/confirm"),
            json!({}),
        ))
        .await
        .unwrap();

    let response = create_app(ctx.state.clone())
        .oneshot(json_request(
            "POST",
            "/payments/refunds",
            json!({ "intent_id": intent_id, "amount": 2000 }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["success"], json!(true));
    assert_eq!(body["refund_id"], json!("re_test_1"));

    assert_eq!(ctx.wallets.get(wallet.id).await.unwrap().unwrap().balance, 3000);
}

#[tokio::test]
async fn test_debit_endpoint_success_and_insufficient() {
    let ctx = test_context();
    let wallet = seed_wallet(&ctx).await;
    let credit = WalletTransaction::new(wallet.id, WalletEntryKind::Credited, 5000);
    ctx.wallets.adjust_balance(wallet.id, 5000, &credit).await.unwrap();

    let response = create_app(ctx.state.clone())
        .oneshot(json_request(
            "POST",
            "/wallets/debit",
            json!({
                "user_id": "user-1",
                "wallet_id": wallet.id,
                "amount": 2000,
                "gateway_intent_id": null
            }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["success"], json!(true));
    assert_eq!(body["balance"], json!(3000));

    let response = create_app(ctx.state.clone())
        .oneshot(json_request(
            "POST",
            "/wallets/debit",
            json!({
                "user_id": "user-1",
                "wallet_id": wallet.id,
                "amount": 9000,
                "gateway_intent_id": null
            }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["success"], json!(false));
    assert_eq!(body["error_reason"], json!("InsufficientBalance"));

    assert_eq!(ctx.wallets.get(wallet.id).await.unwrap().unwrap().balance, 3000);
}
