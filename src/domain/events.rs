//! Economic event envelopes appended to the downstream billing event log.
//!
//! Event ids are deterministic functions of the triggering provider event,
//! so re-delivery of the same webhook produces a duplicate-suppressed
//! append rather than a second effective event.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::transaction::{Transaction, TransactionStatus};

pub const EVENT_PRODUCER: &str = "paylane-core";
pub const EVENT_SERVICE: &str = "billing";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EconomicEventType {
    RevenueInvoicePaid,
    RevenueRefundIssued,
}

impl EconomicEventType {
    pub fn as_str(&self) -> &'static str {
        match self {
            EconomicEventType::RevenueInvoicePaid => "revenue_invoice_paid",
            EconomicEventType::RevenueRefundIssued => "revenue_refund_issued",
        }
    }

    /// Which statuses produce a billing-relevant event at all.
    pub fn for_status(status: TransactionStatus) -> Option<Self> {
        match status {
            TransactionStatus::Succeeded => Some(EconomicEventType::RevenueInvoicePaid),
            TransactionStatus::Refunded => Some(EconomicEventType::RevenueRefundIssued),
            _ => None,
        }
    }
}

impl std::str::FromStr for EconomicEventType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "revenue_invoice_paid" => Ok(EconomicEventType::RevenueInvoicePaid),
            "revenue_refund_issued" => Ok(EconomicEventType::RevenueRefundIssued),
            other => Err(format!("unknown economic event type: {other}")),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventSource {
    pub producer: String,
    pub service: String,
    pub app_id: String,
    pub request_id: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventActor {
    pub actor_type: String,
    pub id: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventCorrelation {
    pub user_id: Option<String>,
    pub transaction_id: Uuid,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EconomicEventEnvelope {
    pub event_id: String,
    pub event_type: EconomicEventType,
    pub occurred_at: DateTime<Utc>,
    pub source: EventSource,
    pub actor: EventActor,
    pub correlation: EventCorrelation,
    pub payload: serde_json::Value,
}

impl EconomicEventEnvelope {
    /// The deterministic idempotency key for a provider-pushed event.
    pub fn deterministic_id(provider_event_id: &str) -> String {
        format!("gateway:{provider_event_id}")
    }

    /// Builds the envelope for a webhook-driven status application.
    pub fn from_provider_event(
        provider_event_id: &str,
        event_type: EconomicEventType,
        tx: &Transaction,
        amount_delta: i64,
    ) -> Self {
        Self {
            event_id: Self::deterministic_id(provider_event_id),
            event_type,
            occurred_at: Utc::now(),
            source: EventSource {
                producer: EVENT_PRODUCER.to_string(),
                service: EVENT_SERVICE.to_string(),
                app_id: tx.app_id.clone(),
                request_id: Uuid::new_v4().to_string(),
            },
            actor: EventActor {
                actor_type: "system".to_string(),
                id: "payment_orchestrator".to_string(),
            },
            correlation: EventCorrelation {
                user_id: tx.metadata.payer_user_id.clone(),
                transaction_id: tx.id,
            },
            payload: serde_json::json!({
                "amount": amount_delta.abs(),
                "currency": tx.currency,
                "gateway_intent_id": tx.gateway_intent_id,
                "transaction_type": tx.transaction_type.as_str(),
            }),
        }
    }
}
