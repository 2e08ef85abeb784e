//! Transaction domain entity.
//! Framework-agnostic representation of a financial transaction.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransactionType {
    Payment,
    Refund,
    Settlement,
    AppOneTimePayment,
    PlatformOneTimePayment,
}

impl TransactionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionType::Payment => "payment",
            TransactionType::Refund => "refund",
            TransactionType::Settlement => "settlement",
            TransactionType::AppOneTimePayment => "app_one_time_payment",
            TransactionType::PlatformOneTimePayment => "platform_one_time_payment",
        }
    }

    /// Types whose gateway outcomes count as one-time revenue and feed the
    /// economic event log.
    pub fn is_one_time_revenue(&self) -> bool {
        matches!(
            self,
            TransactionType::AppOneTimePayment | TransactionType::PlatformOneTimePayment
        )
    }
}

impl std::str::FromStr for TransactionType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "payment" => Ok(TransactionType::Payment),
            "refund" => Ok(TransactionType::Refund),
            "settlement" => Ok(TransactionType::Settlement),
            "app_one_time_payment" => Ok(TransactionType::AppOneTimePayment),
            "platform_one_time_payment" => Ok(TransactionType::PlatformOneTimePayment),
            other => Err(format!("unknown transaction type: {other}")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransactionStatus {
    Pending,
    Succeeded,
    Failed,
    Canceled,
    Refunded,
    Settled,
    SettlementFailed,
}

impl TransactionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionStatus::Pending => "pending",
            TransactionStatus::Succeeded => "succeeded",
            TransactionStatus::Failed => "failed",
            TransactionStatus::Canceled => "canceled",
            TransactionStatus::Refunded => "refunded",
            TransactionStatus::Settled => "settled",
            TransactionStatus::SettlementFailed => "settlement_failed",
        }
    }

    /// Legal status transitions. Settled/SettlementFailed are reachable only
    /// from Pending (settlement transactions start pending and are finalized
    /// by the settlement worker).
    pub fn can_transition_to(&self, next: TransactionStatus) -> bool {
        use TransactionStatus::*;
        match (self, next) {
            (Pending, Succeeded | Failed | Canceled | Refunded) => true,
            (Pending, Settled | SettlementFailed) => true,
            (Succeeded, Refunded) => true,
            _ => false,
        }
    }
}

impl std::str::FromStr for TransactionStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(TransactionStatus::Pending),
            "succeeded" => Ok(TransactionStatus::Succeeded),
            "failed" => Ok(TransactionStatus::Failed),
            "canceled" => Ok(TransactionStatus::Canceled),
            "refunded" => Ok(TransactionStatus::Refunded),
            "settled" => Ok(TransactionStatus::Settled),
            "settlement_failed" => Ok(TransactionStatus::SettlementFailed),
            other => Err(format!("unknown transaction status: {other}")),
        }
    }
}

impl std::fmt::Display for TransactionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Billing correlation data carried alongside a transaction.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionMetadata {
    pub payer_user_id: Option<String>,
    pub destination_account_id: Option<String>,
    pub round_id: Option<String>,
    pub investor_shares: Option<i64>,
}

/// Domain entity representing a transaction. Amounts are integer minor
/// currency units. Rows are never deleted; terminal statuses are retained
/// for audit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    pub id: Uuid,
    pub transaction_type: TransactionType,
    pub amount: i64,
    pub currency: String,
    pub gateway_intent_id: Option<String>,
    pub wallet_id: Option<Uuid>,
    pub app_id: String,
    pub status: TransactionStatus,
    pub metadata: TransactionMetadata,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Transaction {
    pub fn new(
        transaction_type: TransactionType,
        amount: i64,
        currency: String,
        app_id: String,
        wallet_id: Option<Uuid>,
        gateway_intent_id: Option<String>,
        metadata: TransactionMetadata,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            transaction_type,
            amount,
            currency,
            gateway_intent_id,
            wallet_id,
            app_id,
            status: TransactionStatus::Pending,
            metadata,
            created_at: now,
            updated_at: now,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_transaction_starts_pending() {
        let tx = Transaction::new(
            TransactionType::Payment,
            5000,
            "usd".to_string(),
            "app-1".to_string(),
            None,
            Some("pi_123".to_string()),
            TransactionMetadata::default(),
        );
        assert_eq!(tx.status, TransactionStatus::Pending);
        assert_eq!(tx.amount, 5000);
    }

    #[test]
    fn test_pending_transitions() {
        use TransactionStatus::*;
        for next in [Succeeded, Failed, Canceled, Refunded, Settled, SettlementFailed] {
            assert!(Pending.can_transition_to(next), "pending -> {next}");
        }
    }

    #[test]
    fn test_succeeded_only_refundable() {
        use TransactionStatus::*;
        assert!(Succeeded.can_transition_to(Refunded));
        assert!(!Succeeded.can_transition_to(Failed));
        assert!(!Succeeded.can_transition_to(Pending));
        assert!(!Succeeded.can_transition_to(Settled));
    }

    #[test]
    fn test_terminal_states_are_terminal() {
        use TransactionStatus::*;
        for terminal in [Failed, Canceled, Refunded, Settled, SettlementFailed] {
            for next in [Pending, Succeeded, Failed, Canceled, Refunded, Settled, SettlementFailed]
            {
                assert!(!terminal.can_transition_to(next), "{terminal} -> {next}");
            }
        }
    }

    #[test]
    fn test_status_round_trip() {
        use TransactionStatus::*;
        for status in [Pending, Succeeded, Failed, Canceled, Refunded, Settled, SettlementFailed] {
            let parsed: TransactionStatus = status.as_str().parse().unwrap();
            assert_eq!(parsed, status);
        }
        assert!("bogus".parse::<TransactionStatus>().is_err());
    }

    #[test]
    fn test_one_time_revenue_types() {
        assert!(TransactionType::AppOneTimePayment.is_one_time_revenue());
        assert!(TransactionType::PlatformOneTimePayment.is_one_time_revenue());
        assert!(!TransactionType::Payment.is_one_time_revenue());
        assert!(!TransactionType::Settlement.is_one_time_revenue());
    }
}
