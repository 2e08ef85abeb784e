//! Payment orchestration.
//!
//! Issues and confirms payment intents against the gateway, applies
//! gateway webhook outcomes to local transaction and wallet state, and
//! computes ledger/economic-event side effects. Every public operation
//! returns a plain result object; expected failures never escape as
//! errors.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;

use metrics::{counter, histogram};
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::domain::{
    EconomicEventEnvelope, EconomicEventType, LedgerEntry, LedgerEntryType, Transaction,
    TransactionMetadata, TransactionStatus, TransactionType, WalletEntryKind, WalletTransaction,
};
use crate::gateway::types::{
    CreateIntentParams, GatewayEvent, RefundParams, EVENT_CHARGE_REFUNDED, EVENT_INTENT_CANCELED,
    EVENT_INTENT_FAILED, EVENT_INTENT_SUCCEEDED, STATUS_CANCELED, STATUS_PENDING,
    STATUS_REQUIRES_ACTION, STATUS_REQUIRES_CONFIRMATION, STATUS_REQUIRES_PAYMENT_METHOD,
    STATUS_SUCCEEDED,
};
use crate::gateway::GatewayError;
use crate::ports::{
    EconomicEventAppender, LedgerAppender, PaymentGateway, StoreResult, TransactionStore,
    WalletStore,
};

/// Sentinel for failures that are not provider rejections.
pub const UNEXPECTED_ERROR: &str = "UnexpectedError";

const LEDGER_SOURCE: &str = "payment_orchestrator";

#[derive(Debug, Clone, Deserialize)]
pub struct CreateIntentRequest {
    pub user_id: String,
    pub app_id: String,
    pub amount: i64,
    pub currency: String,
    pub transaction_type: TransactionType,
    pub wallet_id: Option<Uuid>,
    pub destination_account_id: Option<String>,
    pub application_fee: Option<i64>,
    pub round_id: Option<String>,
    pub investment_id: Option<String>,
    pub investor_shares: Option<i64>,
}

#[derive(Debug, Clone, Serialize)]
pub struct CreateIntentResult {
    pub success: bool,
    pub intent_id: Option<String>,
    pub client_secret: Option<String>,
    pub error_reason: Option<String>,
}

impl CreateIntentResult {
    fn failed(reason: impl Into<String>) -> Self {
        Self {
            success: false,
            intent_id: None,
            client_secret: None,
            error_reason: Some(reason.into()),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ConfirmIntentResult {
    pub success: bool,
    pub status: Option<String>,
    pub intent_id: String,
    pub error_reason: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RefundRequest {
    pub intent_id: String,
    /// Partial refund in minor units; full refund when absent.
    pub amount: Option<i64>,
}

#[derive(Debug, Clone, Serialize)]
pub struct RefundResult {
    pub success: bool,
    pub refund_id: Option<String>,
    pub status: Option<String>,
    pub error_reason: Option<String>,
}

impl RefundResult {
    fn failed(reason: impl Into<String>) -> Self {
        Self {
            success: false,
            refund_id: None,
            status: None,
            error_reason: Some(reason.into()),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct PaymentStatusResult {
    pub success: bool,
    pub local_status: Option<TransactionStatus>,
    pub provider_status: Option<String>,
    pub error_reason: Option<String>,
}

pub struct PaymentService {
    transactions: Arc<dyn TransactionStore>,
    wallets: Arc<dyn WalletStore>,
    ledger: Arc<dyn LedgerAppender>,
    events: Arc<dyn EconomicEventAppender>,
    gateway: Arc<dyn PaymentGateway>,
}

impl PaymentService {
    pub fn new(
        transactions: Arc<dyn TransactionStore>,
        wallets: Arc<dyn WalletStore>,
        ledger: Arc<dyn LedgerAppender>,
        events: Arc<dyn EconomicEventAppender>,
        gateway: Arc<dyn PaymentGateway>,
    ) -> Self {
        Self {
            transactions,
            wallets,
            ledger,
            events,
            gateway,
        }
    }

    /// Builds a provider intent and persists the matching local
    /// transaction. Exactly one transaction row is created per call; the
    /// call is never retried automatically.
    pub async fn create_intent(&self, request: &CreateIntentRequest) -> CreateIntentResult {
        let started = Instant::now();
        let correlation_id = Uuid::new_v4().to_string();

        let mut metadata = HashMap::new();
        metadata.insert("user_id".to_string(), request.user_id.clone());
        metadata.insert("app_id".to_string(), request.app_id.clone());
        metadata.insert("correlation_id".to_string(), correlation_id.clone());
        if let Some(round_id) = &request.round_id {
            metadata.insert("round_id".to_string(), round_id.clone());
        }
        if let Some(investment_id) = &request.investment_id {
            metadata.insert("investment_id".to_string(), investment_id.clone());
        }

        let params = CreateIntentParams {
            amount: request.amount,
            currency: request.currency.clone(),
            metadata,
            destination_account_id: request.destination_account_id.clone(),
            application_fee: request.application_fee,
        };

        let intent = match self.gateway.create_intent(&params).await {
            Ok(intent) => intent,
            Err(GatewayError::Provider { code, message }) => {
                warn!(%code, %message, "gateway rejected intent creation");
                return CreateIntentResult::failed(code);
            }
            Err(e) => {
                error!(error = %e, "intent creation failed");
                return CreateIntentResult::failed(UNEXPECTED_ERROR);
            }
        };

        let tx = Transaction::new(
            request.transaction_type,
            request.amount,
            request.currency.clone(),
            request.app_id.clone(),
            request.wallet_id,
            Some(intent.id.clone()),
            TransactionMetadata {
                payer_user_id: Some(request.user_id.clone()),
                destination_account_id: request.destination_account_id.clone(),
                round_id: request.round_id.clone(),
                investor_shares: request.investor_shares,
            },
        );

        if let Err(e) = self.transactions.insert(&tx).await {
            error!(error = %e, intent_id = %intent.id, "failed to persist transaction for intent");
            return CreateIntentResult::failed(UNEXPECTED_ERROR);
        }

        // History marker only; the balance moves when the gateway reports an
        // outcome.
        if let Some(wallet_id) = request.wallet_id {
            let record = WalletTransaction::new(wallet_id, WalletEntryKind::IntentCreated, 0)
                .with_links(Some(tx.id), Some(intent.id.clone()));
            if let Err(e) = self.wallets.append_history(&record).await {
                warn!(error = %e, %wallet_id, "failed to append intent-created wallet record");
            }
        }

        counter!("payment_intents_created_total").increment(1);
        histogram!("payment_intent_create_seconds").record(started.elapsed().as_secs_f64());
        info!(intent_id = %intent.id, transaction_id = %tx.id, %correlation_id, "payment intent created");

        CreateIntentResult {
            success: true,
            intent_id: Some(intent.id),
            client_secret: intent.client_secret,
            error_reason: None,
        }
    }

    /// Fetches the current provider status, confirms when the intent is
    /// waiting on confirmation, and maps terminal provider statuses to
    /// local effects.
    pub async fn confirm_intent(&self, intent_id: &str) -> ConfirmIntentResult {
        let started = Instant::now();

        let fetched = match self.gateway.get_intent(intent_id).await {
            Ok(intent) => intent,
            Err(e) => return self.confirm_failure(intent_id, e),
        };

        let intent = if matches!(
            fetched.status.as_str(),
            STATUS_REQUIRES_CONFIRMATION | STATUS_REQUIRES_ACTION
        ) {
            match self.gateway.confirm_intent(intent_id).await {
                Ok(intent) => intent,
                Err(e) => return self.confirm_failure(intent_id, e),
            }
        } else {
            fetched
        };

        let result = match intent.status.as_str() {
            STATUS_SUCCEEDED => {
                let amount = intent.amount_received.unwrap_or(intent.amount);
                // Client-initiated path: no provider event id, so no
                // economic event is emitted here.
                match self
                    .apply_status(intent_id, TransactionStatus::Succeeded, amount, None)
                    .await
                {
                    Ok(()) => ConfirmIntentResult {
                        success: true,
                        status: Some(intent.status.clone()),
                        intent_id: intent_id.to_string(),
                        error_reason: None,
                    },
                    Err(e) => {
                        error!(error = %e, %intent_id, "failed to apply confirmed status");
                        ConfirmIntentResult {
                            success: false,
                            status: None,
                            intent_id: intent_id.to_string(),
                            error_reason: Some(UNEXPECTED_ERROR.to_string()),
                        }
                    }
                }
            }
            STATUS_CANCELED | STATUS_REQUIRES_PAYMENT_METHOD => {
                match self
                    .apply_status(intent_id, TransactionStatus::Failed, 0, None)
                    .await
                {
                    Ok(()) => ConfirmIntentResult {
                        success: true,
                        status: Some(intent.status.clone()),
                        intent_id: intent_id.to_string(),
                        error_reason: None,
                    },
                    Err(e) => {
                        error!(error = %e, %intent_id, "failed to apply failed status");
                        ConfirmIntentResult {
                            success: false,
                            status: None,
                            intent_id: intent_id.to_string(),
                            error_reason: Some(UNEXPECTED_ERROR.to_string()),
                        }
                    }
                }
            }
            other => {
                counter!("payment_confirm_failures_total", "reason" => other.to_string())
                    .increment(1);
                ConfirmIntentResult {
                    success: false,
                    status: Some(other.to_string()),
                    intent_id: intent_id.to_string(),
                    error_reason: Some(other.to_string()),
                }
            }
        };

        histogram!("payment_intent_confirm_seconds").record(started.elapsed().as_secs_f64());
        result
    }

    fn confirm_failure(&self, intent_id: &str, error: GatewayError) -> ConfirmIntentResult {
        let reason = match error {
            GatewayError::Provider { code, message } => {
                warn!(%code, %message, %intent_id, "gateway rejected confirm");
                code
            }
            e => {
                error!(error = %e, %intent_id, "confirm failed");
                UNEXPECTED_ERROR.to_string()
            }
        };
        counter!("payment_confirm_failures_total", "reason" => reason.clone()).increment(1);
        ConfirmIntentResult {
            success: false,
            status: None,
            intent_id: intent_id.to_string(),
            error_reason: Some(reason),
        }
    }

    /// Requests a provider refund and applies the refunded status locally
    /// once the provider reports the refund as succeeded or pending.
    pub async fn refund_payment(&self, request: &RefundRequest) -> RefundResult {
        let started = Instant::now();
        counter!("refunds_requested_total").increment(1);

        // Local correlation id, attached to the provider call metadata.
        let refund_request_id = Uuid::new_v4().to_string();
        let params = RefundParams {
            intent_id: request.intent_id.clone(),
            amount: request.amount,
            refund_request_id: refund_request_id.clone(),
        };

        let refund = match self.gateway.create_refund(&params).await {
            Ok(refund) => refund,
            Err(GatewayError::Provider { code, message }) => {
                warn!(%code, %message, intent_id = %request.intent_id, "gateway rejected refund");
                counter!("refunds_failed_total").increment(1);
                return RefundResult::failed(code);
            }
            Err(e) => {
                error!(error = %e, intent_id = %request.intent_id, "refund request failed");
                counter!("refunds_failed_total").increment(1);
                return RefundResult::failed(UNEXPECTED_ERROR);
            }
        };

        let result = match refund.status.as_str() {
            STATUS_SUCCEEDED | STATUS_PENDING => {
                match self
                    .apply_status(
                        &request.intent_id,
                        TransactionStatus::Refunded,
                        -refund.amount,
                        None,
                    )
                    .await
                {
                    Ok(()) => {
                        counter!("refunds_completed_total").increment(1);
                        info!(
                            refund_id = %refund.id,
                            intent_id = %request.intent_id,
                            %refund_request_id,
                            "refund accepted"
                        );
                        RefundResult {
                            success: true,
                            refund_id: Some(refund.id),
                            status: Some(refund.status.clone()),
                            error_reason: None,
                        }
                    }
                    Err(e) => {
                        error!(error = %e, intent_id = %request.intent_id, "failed to apply refund status");
                        counter!("refunds_failed_total").increment(1);
                        RefundResult::failed(UNEXPECTED_ERROR)
                    }
                }
            }
            other => {
                warn!(status = %other, intent_id = %request.intent_id, "refund not accepted by provider");
                counter!("refunds_failed_total").increment(1);
                RefundResult {
                    success: false,
                    refund_id: Some(refund.id),
                    status: Some(other.to_string()),
                    error_reason: Some(other.to_string()),
                }
            }
        };

        histogram!("refund_process_seconds").record(started.elapsed().as_secs_f64());
        result
    }

    /// Local status plus the provider's live view of the intent.
    pub async fn get_payment_status(&self, intent_id: &str) -> PaymentStatusResult {
        let local = match self.transactions.get_by_intent_id(intent_id).await {
            Ok(Some(tx)) => tx,
            Ok(None) => {
                return PaymentStatusResult {
                    success: false,
                    local_status: None,
                    provider_status: None,
                    error_reason: Some("NotFound".to_string()),
                }
            }
            Err(e) => {
                error!(error = %e, %intent_id, "failed to load transaction");
                return PaymentStatusResult {
                    success: false,
                    local_status: None,
                    provider_status: None,
                    error_reason: Some(UNEXPECTED_ERROR.to_string()),
                };
            }
        };

        match self.gateway.get_intent(intent_id).await {
            Ok(intent) => PaymentStatusResult {
                success: true,
                local_status: Some(local.status),
                provider_status: Some(intent.status),
                error_reason: None,
            },
            Err(e) => {
                warn!(error = %e, %intent_id, "provider status unavailable");
                PaymentStatusResult {
                    success: false,
                    local_status: Some(local.status),
                    provider_status: None,
                    error_reason: Some(UNEXPECTED_ERROR.to_string()),
                }
            }
        }
    }

    /// Applies a provider-pushed notification. Every branch passes the
    /// provider event id so economic-event emission stays deduplicated;
    /// unrecognized event types are acknowledged and ignored.
    pub async fn handle_webhook_event(&self, event: &GatewayEvent) -> StoreResult<()> {
        match event.event_type.as_str() {
            EVENT_INTENT_SUCCEEDED => {
                let intent = match event.intent() {
                    Ok(intent) => intent,
                    Err(e) => {
                        warn!(error = %e, event_id = %event.id, "malformed intent object in webhook");
                        return Ok(());
                    }
                };
                let amount = intent.amount_received.unwrap_or(intent.amount);
                self.apply_status(
                    &intent.id,
                    TransactionStatus::Succeeded,
                    amount,
                    Some(&event.id),
                )
                .await
            }
            EVENT_INTENT_FAILED => {
                let intent = match event.intent() {
                    Ok(intent) => intent,
                    Err(e) => {
                        warn!(error = %e, event_id = %event.id, "malformed intent object in webhook");
                        return Ok(());
                    }
                };
                self.apply_status(&intent.id, TransactionStatus::Failed, 0, Some(&event.id))
                    .await
            }
            EVENT_INTENT_CANCELED => {
                let intent = match event.intent() {
                    Ok(intent) => intent,
                    Err(e) => {
                        warn!(error = %e, event_id = %event.id, "malformed intent object in webhook");
                        return Ok(());
                    }
                };
                self.apply_status(&intent.id, TransactionStatus::Canceled, 0, Some(&event.id))
                    .await
            }
            EVENT_CHARGE_REFUNDED => {
                let charge = match event.charge() {
                    Ok(charge) => charge,
                    Err(e) => {
                        warn!(error = %e, event_id = %event.id, "malformed charge object in webhook");
                        return Ok(());
                    }
                };
                let Some(intent_id) = charge.payment_intent else {
                    warn!(charge_id = %charge.id, event_id = %event.id, "refunded charge without intent");
                    return Ok(());
                };
                let refunded = charge.amount_refunded.unwrap_or(charge.amount);
                self.apply_status(
                    &intent_id,
                    TransactionStatus::Refunded,
                    -refunded,
                    Some(&event.id),
                )
                .await
            }
            other => {
                debug!(event_type = %other, event_id = %event.id, "ignoring webhook event type");
                Ok(())
            }
        }
    }

    /// The reconciliation routine shared by every entry point.
    ///
    /// Webhooks for intents this service never created are a no-op, as is
    /// re-application of a status already reached (the provider delivers
    /// at least once). Wallet/ledger failures are returned to the caller
    /// without inline retries; re-delivery converges the state.
    pub async fn apply_status(
        &self,
        intent_id: &str,
        status: TransactionStatus,
        amount_delta: i64,
        provider_event_id: Option<&str>,
    ) -> StoreResult<()> {
        let Some(tx) = self.transactions.get_by_intent_id(intent_id).await? else {
            debug!(%intent_id, "ignoring status for unknown intent");
            return Ok(());
        };

        if tx.status == status {
            // Re-delivered outcome (or a webhook trailing a client-driven
            // confirm/refund). No state mutation, but the webhook still
            // carries the billing emission; the event id key keeps it
            // exactly-once.
            debug!(%intent_id, %status, "status already applied");
            if let Some(provider_event_id) = provider_event_id {
                self.emit_economic_event(&tx, status, amount_delta, provider_event_id)
                    .await;
            }
            return Ok(());
        }
        if !tx.status.can_transition_to(status) {
            warn!(%intent_id, from = %tx.status, to = %status, "refusing illegal status transition");
            return Ok(());
        }

        self.transactions.update_status(tx.id, status).await?;

        if let Some(wallet_id) = tx.wallet_id {
            let record =
                WalletTransaction::new(wallet_id, WalletEntryKind::for_status(status), amount_delta)
                    .with_links(Some(tx.id), tx.gateway_intent_id.clone());
            let wallet = self.wallets.adjust_balance(wallet_id, amount_delta, &record).await?;

            if wallet.balance < 0 {
                // Gateway corrections are trusted and may overdraw; flag it
                // for reconciliation instead of rejecting.
                warn!(%wallet_id, balance = wallet.balance, %intent_id, "wallet balance went negative");
                counter!("wallet_negative_balance_total").increment(1);
            }

            let entry = LedgerEntry::new(
                tx.metadata.payer_user_id.clone().unwrap_or_default(),
                tx.app_id.clone(),
                wallet_id,
                tx.id,
                tx.gateway_intent_id.clone(),
                LedgerEntryType::for_status(status),
                LEDGER_SOURCE.to_string(),
                format!("status applied: {status}"),
                amount_delta,
                tx.currency.clone(),
            );
            self.ledger.append(&entry).await?;
        }

        self.emit_status_applied(&tx, status, amount_delta);

        if let Some(provider_event_id) = provider_event_id {
            self.emit_economic_event(&tx, status, amount_delta, provider_event_id)
                .await;
        }

        Ok(())
    }

    /// Best-effort observability emit; runs after the authoritative
    /// mutation commits and can never fail it.
    fn emit_status_applied(&self, tx: &Transaction, status: TransactionStatus, amount_delta: i64) {
        counter!("payment_status_applied_total", "status" => status.as_str()).increment(1);
        info!(
            event = "payment.status_applied",
            transaction_id = %tx.id,
            intent_id = tx.gateway_intent_id.as_deref().unwrap_or(""),
            %status,
            amount_delta,
            "payment status applied"
        );
    }

    /// Idempotent economic-event emission; failures are logged and
    /// swallowed so they never fail the financial state transition.
    async fn emit_economic_event(
        &self,
        tx: &Transaction,
        status: TransactionStatus,
        amount_delta: i64,
        provider_event_id: &str,
    ) {
        if !tx.transaction_type.is_one_time_revenue() {
            return;
        }
        let Some(event_type) = EconomicEventType::for_status(status) else {
            return;
        };

        let envelope =
            EconomicEventEnvelope::from_provider_event(provider_event_id, event_type, tx, amount_delta);

        match self.events.append(&envelope).await {
            Ok(true) => {
                debug!(event_id = %envelope.event_id, "economic event appended");
            }
            Ok(false) => {
                debug!(event_id = %envelope.event_id, "duplicate economic event suppressed");
            }
            Err(e) => {
                warn!(error = %e, event_id = %envelope.event_id, "economic event emission failed");
            }
        }
    }
}
