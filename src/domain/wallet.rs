//! Wallet domain entity and its append-only transaction history.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::transaction::TransactionStatus;

/// Per-user, per-app balance in integer minor currency units.
///
/// The balance is only ever mutated through the store's atomic
/// adjust-by-delta operations; it is never read, modified, and written
/// back in separate steps.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Wallet {
    pub id: Uuid,
    pub user_id: String,
    pub app_id: String,
    pub balance: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Wallet {
    pub fn new(user_id: String, app_id: String) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            user_id,
            app_id,
            balance: 0,
            created_at: now,
            updated_at: now,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WalletEntryKind {
    IntentCreated,
    Credited,
    Debited,
    Refunded,
    Adjustment,
}

impl WalletEntryKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            WalletEntryKind::IntentCreated => "intent_created",
            WalletEntryKind::Credited => "credited",
            WalletEntryKind::Debited => "debited",
            WalletEntryKind::Refunded => "refunded",
            WalletEntryKind::Adjustment => "adjustment",
        }
    }

    /// History tag for a webhook/confirm-driven balance correction.
    pub fn for_status(status: TransactionStatus) -> Self {
        match status {
            TransactionStatus::Succeeded => WalletEntryKind::Credited,
            TransactionStatus::Refunded => WalletEntryKind::Refunded,
            _ => WalletEntryKind::Adjustment,
        }
    }
}

impl std::str::FromStr for WalletEntryKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "intent_created" => Ok(WalletEntryKind::IntentCreated),
            "credited" => Ok(WalletEntryKind::Credited),
            "debited" => Ok(WalletEntryKind::Debited),
            "refunded" => Ok(WalletEntryKind::Refunded),
            "adjustment" => Ok(WalletEntryKind::Adjustment),
            other => Err(format!("unknown wallet entry kind: {other}")),
        }
    }
}

/// One appended history record on a wallet. `amount` is the signed delta
/// in minor units (zero for records that do not move the balance, such as
/// intent-created markers).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WalletTransaction {
    pub id: Uuid,
    pub wallet_id: Uuid,
    pub transaction_id: Option<Uuid>,
    pub gateway_intent_id: Option<String>,
    pub kind: WalletEntryKind,
    pub amount: i64,
    pub created_at: DateTime<Utc>,
}

impl WalletTransaction {
    pub fn new(wallet_id: Uuid, kind: WalletEntryKind, amount: i64) -> Self {
        Self {
            id: Uuid::new_v4(),
            wallet_id,
            transaction_id: None,
            gateway_intent_id: None,
            kind,
            amount,
            created_at: Utc::now(),
        }
    }

    pub fn with_links(mut self, transaction_id: Option<Uuid>, gateway_intent_id: Option<String>) -> Self {
        self.transaction_id = transaction_id;
        self.gateway_intent_id = gateway_intent_id;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_wallet_is_empty() {
        let wallet = Wallet::new("user-1".to_string(), "app-1".to_string());
        assert_eq!(wallet.balance, 0);
    }

    #[test]
    fn test_entry_kind_for_status() {
        assert_eq!(
            WalletEntryKind::for_status(TransactionStatus::Succeeded),
            WalletEntryKind::Credited
        );
        assert_eq!(
            WalletEntryKind::for_status(TransactionStatus::Refunded),
            WalletEntryKind::Refunded
        );
        assert_eq!(
            WalletEntryKind::for_status(TransactionStatus::Failed),
            WalletEntryKind::Adjustment
        );
    }
}
