//! Minimal gateway DTOs and call parameters.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Provider statuses the orchestrator reacts to.
pub const STATUS_SUCCEEDED: &str = "succeeded";
pub const STATUS_CANCELED: &str = "canceled";
pub const STATUS_PENDING: &str = "pending";
pub const STATUS_REQUIRES_CONFIRMATION: &str = "requires_confirmation";
pub const STATUS_REQUIRES_ACTION: &str = "requires_action";
pub const STATUS_REQUIRES_PAYMENT_METHOD: &str = "requires_payment_method";

/// Webhook event types the orchestrator dispatches on.
pub const EVENT_INTENT_SUCCEEDED: &str = "payment_intent.succeeded";
pub const EVENT_INTENT_FAILED: &str = "payment_intent.payment_failed";
pub const EVENT_INTENT_CANCELED: &str = "payment_intent.canceled";
pub const EVENT_CHARGE_REFUNDED: &str = "charge.refunded";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentIntent {
    pub id: String,
    pub status: String,
    pub amount: i64,
    pub currency: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub amount_received: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub client_secret: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Charge {
    pub id: String,
    pub amount: i64,
    pub currency: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub amount_refunded: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payment_intent: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RefundObject {
    pub id: String,
    pub status: String,
    pub amount: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payment_intent: Option<String>,
}

/// Provider-pushed webhook envelope. The embedded object is kept raw and
/// decoded per event type.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayEvent {
    pub id: String,
    #[serde(rename = "type")]
    pub event_type: String,
    pub data: GatewayEventData,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created: Option<i64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayEventData {
    pub object: serde_json::Value,
}

impl GatewayEvent {
    pub fn intent(&self) -> Result<PaymentIntent, serde_json::Error> {
        serde_json::from_value(self.data.object.clone())
    }

    pub fn charge(&self) -> Result<Charge, serde_json::Error> {
        serde_json::from_value(self.data.object.clone())
    }
}

#[derive(Debug, Clone)]
pub struct CreateIntentParams {
    pub amount: i64,
    pub currency: String,
    pub metadata: HashMap<String, String>,
    pub destination_account_id: Option<String>,
    pub application_fee: Option<i64>,
}

#[derive(Debug, Clone)]
pub struct RefundParams {
    pub intent_id: String,
    /// Partial refund amount in minor units; full refund when absent.
    pub amount: Option<i64>,
    /// Locally generated correlation id attached to the provider call.
    pub refund_request_id: String,
}
