//! Synchronous, client-initiated wallet debits.
//!
//! Distinct write path from webhook-driven credits: this one enforces the
//! non-negative balance invariant that gateway corrections may bypass.

use std::sync::Arc;
use std::time::Instant;

use metrics::{counter, histogram};
use serde::{Deserialize, Serialize};
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::domain::{WalletEntryKind, WalletTransaction};
use crate::ports::WalletStore;

pub const REASON_WALLET_NOT_FOUND: &str = "WalletNotFound";
pub const REASON_INSUFFICIENT_BALANCE: &str = "InsufficientBalance";
pub const REASON_INVALID_AMOUNT: &str = "InvalidAmount";
pub const REASON_UNEXPECTED: &str = "UnexpectedError";

#[derive(Debug, Clone, Deserialize)]
pub struct DebitRequest {
    pub user_id: String,
    pub wallet_id: Uuid,
    pub amount: i64,
    pub gateway_intent_id: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct DebitResult {
    pub success: bool,
    pub wallet_id: Option<Uuid>,
    pub balance: Option<i64>,
    pub error_reason: Option<String>,
}

impl DebitResult {
    fn failed(reason: &str) -> Self {
        counter!("wallet_debits_failed_total", "reason" => reason.to_string()).increment(1);
        Self {
            success: false,
            wallet_id: None,
            balance: None,
            error_reason: Some(reason.to_string()),
        }
    }
}

pub struct WalletDebitService {
    wallets: Arc<dyn WalletStore>,
}

impl WalletDebitService {
    pub fn new(wallets: Arc<dyn WalletStore>) -> Self {
        Self { wallets }
    }

    pub async fn debit(&self, request: &DebitRequest) -> DebitResult {
        let started = Instant::now();
        counter!("wallet_debits_requested_total").increment(1);

        if request.amount <= 0 {
            warn!(amount = request.amount, wallet_id = %request.wallet_id, "rejecting non-positive debit");
            return DebitResult::failed(REASON_INVALID_AMOUNT);
        }

        let wallet = match self.wallets.get(request.wallet_id).await {
            Ok(Some(wallet)) => wallet,
            Ok(None) => return DebitResult::failed(REASON_WALLET_NOT_FOUND),
            Err(e) => {
                error!(error = %e, wallet_id = %request.wallet_id, "failed to load wallet");
                return DebitResult::failed(REASON_UNEXPECTED);
            }
        };
        if wallet.user_id != request.user_id {
            warn!(wallet_id = %request.wallet_id, "debit attempted by non-owner");
            return DebitResult::failed(REASON_WALLET_NOT_FOUND);
        }

        let record = WalletTransaction::new(
            request.wallet_id,
            WalletEntryKind::Debited,
            -request.amount,
        )
        .with_links(None, request.gateway_intent_id.clone());

        let result = match self
            .wallets
            .debit_checked(request.wallet_id, request.amount, &record)
            .await
        {
            Ok(Some(wallet)) => {
                counter!("wallet_debits_succeeded_total").increment(1);
                info!(
                    wallet_id = %wallet.id,
                    amount = request.amount,
                    balance = wallet.balance,
                    "wallet debited"
                );
                DebitResult {
                    success: true,
                    wallet_id: Some(wallet.id),
                    balance: Some(wallet.balance),
                    error_reason: None,
                }
            }
            Ok(None) => DebitResult::failed(REASON_INSUFFICIENT_BALANCE),
            Err(e) => {
                error!(error = %e, wallet_id = %request.wallet_id, "wallet debit failed");
                DebitResult::failed(REASON_UNEXPECTED)
            }
        };

        histogram!("wallet_debit_seconds").record(started.elapsed().as_secs_f64());
        result
    }
}
