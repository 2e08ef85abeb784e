//! Shared harness for router-level tests: in-memory stores, a scripted
//! gateway double, and webhook signing helpers.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::body::Body;
use axum::http::Request;
use axum::response::Response;
use http_body_util::BodyExt;
use hmac::{Hmac, Mac};
use sha2::Sha256;

use paylane_core::adapters::{
    InMemoryEconomicEventAppender, InMemoryLedgerAppender, InMemoryTransactionStore,
    InMemoryWalletStore,
};
use paylane_core::domain::Wallet;
use paylane_core::gateway::types::{
    CreateIntentParams, PaymentIntent, RefundObject, RefundParams,
};
use paylane_core::gateway::GatewayError;
use paylane_core::ports::{PaymentGateway, WalletStore};
use paylane_core::services::{PaymentService, WalletDebitService};
use paylane_core::AppState;

pub const WEBHOOK_SECRET: &str = "whsec_test123secret456";

/// Gateway double: create hands out sequential intent ids, confirm flips
/// them to succeeded, refunds echo the requested amount.
#[derive(Default)]
pub struct ScriptedGateway {
    intents: Mutex<HashMap<String, PaymentIntent>>,
}

impl ScriptedGateway {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl PaymentGateway for ScriptedGateway {
    async fn create_intent(
        &self,
        params: &CreateIntentParams,
    ) -> Result<PaymentIntent, GatewayError> {
        let mut intents = self.intents.lock().unwrap();
        let intent = PaymentIntent {
            id: format!("pi_{}", intents.len() + 1),
            status: "requires_confirmation".to_string(),
            amount: params.amount,
            currency: params.currency.clone(),
            amount_received: None,
            client_secret: Some("cs_test".to_string()),
        };
        intents.insert(intent.id.clone(), intent.clone());
        Ok(intent)
    }

    async fn get_intent(&self, intent_id: &str) -> Result<PaymentIntent, GatewayError> {
        self.intents
            .lock()
            .unwrap()
            .get(intent_id)
            .cloned()
            .ok_or_else(|| GatewayError::Provider {
                code: "resource_missing".to_string(),
                message: "no such intent".to_string(),
            })
    }

    async fn confirm_intent(&self, intent_id: &str) -> Result<PaymentIntent, GatewayError> {
        let mut intents = self.intents.lock().unwrap();
        let intent = intents
            .get_mut(intent_id)
            .ok_or_else(|| GatewayError::Provider {
                code: "resource_missing".to_string(),
                message: "no such intent".to_string(),
            })?;
        intent.status = "succeeded".to_string();
        intent.amount_received = Some(intent.amount);
        Ok(intent.clone())
    }

    async fn create_refund(&self, params: &RefundParams) -> Result<RefundObject, GatewayError> {
        let intents = self.intents.lock().unwrap();
        let intent = intents
            .get(&params.intent_id)
            .ok_or_else(|| GatewayError::Provider {
                code: "resource_missing".to_string(),
                message: "no such intent".to_string(),
            })?;
        Ok(RefundObject {
            id: "re_test_1".to_string(),
            status: "succeeded".to_string(),
            amount: params.amount.unwrap_or(intent.amount),
            payment_intent: Some(params.intent_id.clone()),
        })
    }
}

pub struct TestContext {
    pub state: AppState,
    pub transactions: Arc<InMemoryTransactionStore>,
    pub wallets: Arc<InMemoryWalletStore>,
    pub ledger: Arc<InMemoryLedgerAppender>,
    pub events: Arc<InMemoryEconomicEventAppender>,
    pub gateway: Arc<ScriptedGateway>,
}

pub fn test_context() -> TestContext {
    let transactions = Arc::new(InMemoryTransactionStore::new());
    let wallets = Arc::new(InMemoryWalletStore::new());
    let ledger = Arc::new(InMemoryLedgerAppender::new());
    let events = Arc::new(InMemoryEconomicEventAppender::new());
    let gateway = Arc::new(ScriptedGateway::new());

    let payments = Arc::new(PaymentService::new(
        transactions.clone(),
        wallets.clone(),
        ledger.clone(),
        events.clone(),
        gateway.clone(),
    ));
    let debits = Arc::new(WalletDebitService::new(wallets.clone()));

    let state = AppState {
        payments,
        debits,
        webhook_secret: WEBHOOK_SECRET.to_string(),
    };

    TestContext {
        state,
        transactions,
        wallets,
        ledger,
        events,
        gateway,
    }
}

pub async fn seed_wallet(ctx: &TestContext) -> Wallet {
    let wallet = Wallet::new("user-1".to_string(), "app-1".to_string());
    ctx.wallets.insert(&wallet).await.unwrap();
    wallet
}

pub fn sign_payload(payload: &[u8]) -> String {
    let timestamp = chrono::Utc::now().timestamp();
    let mut mac = Hmac::<Sha256>::new_from_slice(WEBHOOK_SECRET.as_bytes()).unwrap();
    mac.update(format!("{timestamp}.").as_bytes());
    mac.update(payload);
    format!("t={},v1={}", timestamp, hex::encode(mac.finalize().into_bytes()))
}

pub fn json_request(method: &str, uri: &str, body: serde_json::Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(serde_json::to_vec(&body).unwrap()))
        .unwrap()
}

pub fn webhook_request(payload: &serde_json::Value, signature: Option<String>) -> Request<Body> {
    let bytes = serde_json::to_vec(payload).unwrap();
    let mut builder = Request::builder()
        .method("POST")
        .uri("/webhooks/gateway")
        .header("content-type", "application/json");
    if let Some(signature) = signature {
        builder = builder.header("gateway-signature", signature);
    }
    builder.body(Body::from(bytes)).unwrap()
}

pub async fn body_json(response: Response) -> serde_json::Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}
