//! HTTP client for the external payment gateway.
//!
//! Every call is wrapped in a circuit breaker; provider rejections and
//! transport failures surface as distinct `GatewayError` variants so the
//! orchestrator can match on them instead of catching exceptions.

pub mod types;
pub mod webhook;

use failsafe::futures::CircuitBreaker as FuturesCircuitBreaker;
use failsafe::{backoff, failure_policy, Config, Error as FailsafeError, StateMachine};
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Duration;
use thiserror::Error;

use crate::domain::MajorAmount;
use crate::ports::DisbursementError;
use types::{CreateIntentParams, PaymentIntent, RefundObject, RefundParams};

#[derive(Error, Debug)]
pub enum GatewayError {
    #[error("provider rejected the call: {code}: {message}")]
    Provider { code: String, message: String },
    #[error("gateway request failed: {0}")]
    Transient(String),
    #[error("invalid response from gateway: {0}")]
    InvalidResponse(String),
    #[error("gateway circuit breaker is open")]
    CircuitOpen,
}

/// Provider error codes that mean the destination account can never
/// receive funds.
const INVALID_DESTINATION_CODES: &[&str] =
    &["invalid_destination", "account_invalid", "no_such_destination"];

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    error: ApiErrorDetail,
}

#[derive(Debug, Deserialize)]
struct ApiErrorDetail {
    #[serde(default)]
    code: Option<String>,
    #[serde(rename = "type", default)]
    error_type: Option<String>,
    #[serde(default)]
    message: Option<String>,
}

#[derive(Debug, Serialize)]
struct CreateIntentBody<'a> {
    amount: i64,
    currency: &'a str,
    metadata: &'a HashMap<String, String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    transfer_destination: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    application_fee_amount: Option<i64>,
}

#[derive(Debug, Serialize)]
struct RefundBody<'a> {
    payment_intent: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    amount: Option<i64>,
    metadata: HashMap<&'static str, &'a str>,
}

#[derive(Debug, Serialize)]
struct TransferBody<'a> {
    destination: &'a str,
    amount: String,
    app_id: &'a str,
}

#[derive(Debug, Deserialize)]
struct TransferReceipt {
    #[allow(dead_code)]
    id: String,
}

/// HTTP client for the payment gateway API.
#[derive(Clone)]
pub struct GatewayClient {
    client: Client,
    base_url: String,
    api_key: String,
    circuit_breaker: StateMachine<failure_policy::ConsecutiveFailures<backoff::EqualJittered>, ()>,
}

impl GatewayClient {
    pub fn new(base_url: String, api_key: String) -> Self {
        Self::with_circuit_breaker(base_url, api_key, 3, 60)
    }

    /// Creates a client with custom circuit breaker configuration.
    pub fn with_circuit_breaker(
        base_url: String,
        api_key: String,
        failure_threshold: u32,
        reset_timeout_secs: u64,
    ) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .unwrap_or_default();

        let backoff = backoff::equal_jittered(
            Duration::from_secs(reset_timeout_secs),
            Duration::from_secs(reset_timeout_secs * 2),
        );
        let policy = failure_policy::consecutive_failures(failure_threshold, backoff);
        let circuit_breaker = Config::new().failure_policy(policy).build();

        GatewayClient {
            client,
            base_url,
            api_key,
            circuit_breaker,
        }
    }

    /// Returns the current state of the circuit breaker.
    pub fn circuit_state(&self) -> &'static str {
        if self.circuit_breaker.is_call_permitted() {
            "closed"
        } else {
            "open"
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url.trim_end_matches('/'), path)
    }

    async fn send<T: DeserializeOwned>(
        &self,
        request: reqwest::RequestBuilder,
    ) -> Result<T, GatewayError> {
        let fut = async move {
            let response = request
                .send()
                .await
                .map_err(|e| GatewayError::Transient(e.to_string()))?;
            Self::decode(response).await
        };

        match self.circuit_breaker.call(fut).await {
            Ok(value) => Ok(value),
            Err(FailsafeError::Rejected) => Err(GatewayError::CircuitOpen),
            Err(FailsafeError::Inner(e)) => Err(e),
        }
    }

    async fn decode<T: DeserializeOwned>(response: reqwest::Response) -> Result<T, GatewayError> {
        let status = response.status();
        if status.is_success() {
            return response
                .json::<T>()
                .await
                .map_err(|e| GatewayError::InvalidResponse(e.to_string()));
        }
        if status.is_server_error() {
            return Err(GatewayError::Transient(format!("gateway returned {status}")));
        }

        let body = response.text().await.unwrap_or_default();
        match serde_json::from_str::<ApiErrorBody>(&body) {
            Ok(api_err) => {
                let code = api_err
                    .error
                    .code
                    .or(api_err.error.error_type)
                    .unwrap_or_else(|| status.as_u16().to_string());
                Err(GatewayError::Provider {
                    code,
                    message: api_err.error.message.unwrap_or_default(),
                })
            }
            Err(_) => Err(GatewayError::Provider {
                code: status.as_u16().to_string(),
                message: body,
            }),
        }
    }

    pub async fn create_intent(
        &self,
        params: &CreateIntentParams,
    ) -> Result<PaymentIntent, GatewayError> {
        let body = CreateIntentBody {
            amount: params.amount,
            currency: &params.currency,
            metadata: &params.metadata,
            transfer_destination: params.destination_account_id.as_deref(),
            application_fee_amount: params.application_fee,
        };
        let request = self
            .client
            .post(self.url("/v1/payment_intents"))
            .bearer_auth(&self.api_key)
            .json(&body);
        self.send(request).await
    }

    pub async fn get_intent(&self, intent_id: &str) -> Result<PaymentIntent, GatewayError> {
        let request = self
            .client
            .get(self.url(&format!("/v1/payment_intents/{intent_id}")))
            .bearer_auth(&self.api_key);
        self.send(request).await
    }

    pub async fn confirm_intent(&self, intent_id: &str) -> Result<PaymentIntent, GatewayError> {
        let request = self
            .client
            .post(self.url(&format!("/v1/payment_intents/{intent_id}/confirm")))
            .bearer_auth(&self.api_key);
        self.send(request).await
    }

    pub async fn create_refund(&self, params: &RefundParams) -> Result<RefundObject, GatewayError> {
        let mut metadata = HashMap::new();
        metadata.insert("refund_request_id", params.refund_request_id.as_str());
        let body = RefundBody {
            payment_intent: &params.intent_id,
            amount: params.amount,
            metadata,
        };
        let request = self
            .client
            .post(self.url("/v1/refunds"))
            .bearer_auth(&self.api_key)
            .json(&body);
        self.send(request).await
    }

    /// Pays a major-unit amount out to a destination account.
    pub async fn create_transfer(
        &self,
        destination_account: &str,
        amount: &MajorAmount,
        app_id: &str,
    ) -> Result<(), DisbursementError> {
        let body = TransferBody {
            destination: destination_account,
            amount: amount.to_string(),
            app_id,
        };
        let request = self
            .client
            .post(self.url("/v1/transfers"))
            .bearer_auth(&self.api_key)
            .json(&body);

        match self.send::<TransferReceipt>(request).await {
            Ok(_) => Ok(()),
            Err(GatewayError::Provider { code, message })
                if INVALID_DESTINATION_CODES.contains(&code.as_str()) =>
            {
                Err(DisbursementError::InvalidDestination(format!("{code}: {message}")))
            }
            Err(e) => Err(DisbursementError::Failed(e.to_string())),
        }
    }
}

#[async_trait::async_trait]
impl crate::ports::PaymentGateway for GatewayClient {
    async fn create_intent(
        &self,
        params: &CreateIntentParams,
    ) -> Result<PaymentIntent, GatewayError> {
        GatewayClient::create_intent(self, params).await
    }

    async fn get_intent(&self, intent_id: &str) -> Result<PaymentIntent, GatewayError> {
        GatewayClient::get_intent(self, intent_id).await
    }

    async fn confirm_intent(&self, intent_id: &str) -> Result<PaymentIntent, GatewayError> {
        GatewayClient::confirm_intent(self, intent_id).await
    }

    async fn create_refund(&self, params: &RefundParams) -> Result<RefundObject, GatewayError> {
        GatewayClient::create_refund(self, params).await
    }
}

#[async_trait::async_trait]
impl crate::ports::Disbursements for GatewayClient {
    async fn pay_out(
        &self,
        destination_account: &str,
        amount: &MajorAmount,
        app_id: &str,
    ) -> Result<(), DisbursementError> {
        self.create_transfer(destination_account, amount, app_id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_params() -> CreateIntentParams {
        CreateIntentParams {
            amount: 5000,
            currency: "usd".to_string(),
            metadata: HashMap::new(),
            destination_account_id: None,
            application_fee: None,
        }
    }

    #[test]
    fn test_client_creation() {
        let client = GatewayClient::new("https://gateway.test".to_string(), "sk_test".to_string());
        assert_eq!(client.base_url, "https://gateway.test");
        assert_eq!(client.circuit_state(), "closed");
    }

    #[tokio::test]
    async fn test_create_intent_success() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/v1/payment_intents")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(
                r#"{"id":"pi_1","status":"requires_confirmation","amount":5000,"currency":"usd","client_secret":"pi_1_secret"}"#,
            )
            .create_async()
            .await;

        let client = GatewayClient::new(server.url(), "sk_test".to_string());
        let intent = client.create_intent(&test_params()).await.unwrap();
        assert_eq!(intent.id, "pi_1");
        assert_eq!(intent.client_secret.as_deref(), Some("pi_1_secret"));
    }

    #[tokio::test]
    async fn test_provider_error_surfaces_code() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/v1/payment_intents")
            .with_status(402)
            .with_header("content-type", "application/json")
            .with_body(r#"{"error":{"code":"card_declined","type":"card_error","message":"Your card was declined."}}"#)
            .create_async()
            .await;

        let client = GatewayClient::new(server.url(), "sk_test".to_string());
        let err = client.create_intent(&test_params()).await.unwrap_err();
        match err {
            GatewayError::Provider { code, .. } => assert_eq!(code, "card_declined"),
            other => panic!("expected provider error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_server_error_is_transient() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("GET", "/v1/payment_intents/pi_1")
            .with_status(500)
            .create_async()
            .await;

        let client = GatewayClient::new(server.url(), "sk_test".to_string());
        let err = client.get_intent("pi_1").await.unwrap_err();
        assert!(matches!(err, GatewayError::Transient(_)));
    }

    #[tokio::test]
    async fn test_transfer_invalid_destination() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/v1/transfers")
            .with_status(400)
            .with_header("content-type", "application/json")
            .with_body(r#"{"error":{"code":"invalid_destination","message":"No such account"}}"#)
            .create_async()
            .await;

        let client = GatewayClient::new(server.url(), "sk_test".to_string());
        let amount = crate::domain::MinorUnits(5000).to_major();
        let err = client
            .create_transfer("acct_missing", &amount, "app-1")
            .await
            .unwrap_err();
        assert!(matches!(err, DisbursementError::InvalidDestination(_)));
    }

    #[tokio::test]
    async fn test_circuit_breaker_opens_after_failures() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("GET", mockito::Matcher::Regex(r"/v1/payment_intents/.*".into()))
            .with_status(500)
            .expect_at_least(3)
            .create_async()
            .await;

        let client = GatewayClient::with_circuit_breaker(server.url(), "sk_test".to_string(), 3, 60);
        for _ in 0..3 {
            let _ = client.get_intent("pi_x").await;
        }

        let err = client.get_intent("pi_x").await.unwrap_err();
        assert!(matches!(err, GatewayError::CircuitOpen));
    }
}
