//! Append-only audit ledger entries. Entries are immutable once written.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::transaction::TransactionStatus;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LedgerEntryType {
    Credit,
    Refund,
    Error,
    System,
}

impl LedgerEntryType {
    pub fn as_str(&self) -> &'static str {
        match self {
            LedgerEntryType::Credit => "credit",
            LedgerEntryType::Refund => "refund",
            LedgerEntryType::Error => "error",
            LedgerEntryType::System => "system",
        }
    }

    pub fn for_status(status: TransactionStatus) -> Self {
        match status {
            TransactionStatus::Succeeded => LedgerEntryType::Credit,
            TransactionStatus::Refunded => LedgerEntryType::Refund,
            TransactionStatus::Failed | TransactionStatus::Canceled => LedgerEntryType::Error,
            _ => LedgerEntryType::System,
        }
    }
}

impl std::str::FromStr for LedgerEntryType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "credit" => Ok(LedgerEntryType::Credit),
            "refund" => Ok(LedgerEntryType::Refund),
            "error" => Ok(LedgerEntryType::Error),
            "system" => Ok(LedgerEntryType::System),
            other => Err(format!("unknown ledger entry type: {other}")),
        }
    }
}

/// One audit entry per side-effecting status application. `amount` is the
/// absolute value of the applied delta, in minor units.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LedgerEntry {
    pub id: Uuid,
    pub user_id: String,
    pub app_id: String,
    pub wallet_id: Uuid,
    pub transaction_id: Uuid,
    pub gateway_intent_id: Option<String>,
    pub entry_type: LedgerEntryType,
    pub source: String,
    pub reason: String,
    pub amount: i64,
    pub currency: String,
    pub created_at: DateTime<Utc>,
}

#[allow(clippy::too_many_arguments)]
impl LedgerEntry {
    pub fn new(
        user_id: String,
        app_id: String,
        wallet_id: Uuid,
        transaction_id: Uuid,
        gateway_intent_id: Option<String>,
        entry_type: LedgerEntryType,
        source: String,
        reason: String,
        amount: i64,
        currency: String,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            user_id,
            app_id,
            wallet_id,
            transaction_id,
            gateway_intent_id,
            entry_type,
            source,
            reason,
            amount: amount.abs(),
            currency,
            created_at: Utc::now(),
        }
    }
}
