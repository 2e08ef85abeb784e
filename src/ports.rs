//! Store and collaborator ports.
//!
//! All persistence and external calls go through these traits so the
//! orchestrator, debit service, and settlement worker stay pure logic over
//! injected collaborators.

use async_trait::async_trait;
use thiserror::Error;
use uuid::Uuid;

use crate::domain::{
    EconomicEventEnvelope, LedgerEntry, MajorAmount, Transaction, TransactionStatus,
    TransactionType, Wallet, WalletTransaction,
};
use crate::gateway::types::{CreateIntentParams, PaymentIntent, RefundObject, RefundParams};
use crate::gateway::GatewayError;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("not found: {0}")]
    NotFound(String),
    #[error("database error: {0}")]
    Database(String),
}

impl From<sqlx::Error> for StoreError {
    fn from(e: sqlx::Error) -> Self {
        match e {
            sqlx::Error::RowNotFound => StoreError::NotFound(e.to_string()),
            other => StoreError::Database(other.to_string()),
        }
    }
}

pub type StoreResult<T> = Result<T, StoreError>;

#[async_trait]
pub trait TransactionStore: Send + Sync {
    async fn insert(&self, tx: &Transaction) -> StoreResult<()>;
    async fn get_by_id(&self, id: Uuid) -> StoreResult<Option<Transaction>>;
    async fn get_by_intent_id(&self, gateway_intent_id: &str) -> StoreResult<Option<Transaction>>;
    async fn update_status(&self, id: Uuid, status: TransactionStatus) -> StoreResult<()>;
    /// All transactions of the given type still in `Pending`.
    async fn pending_by_type(&self, transaction_type: TransactionType)
        -> StoreResult<Vec<Transaction>>;
    /// Most recently created transaction of the given type.
    async fn latest_by_type(&self, transaction_type: TransactionType)
        -> StoreResult<Option<Transaction>>;
}

#[async_trait]
pub trait WalletStore: Send + Sync {
    async fn insert(&self, wallet: &Wallet) -> StoreResult<()>;
    async fn get(&self, id: Uuid) -> StoreResult<Option<Wallet>>;
    async fn find_for_user(&self, user_id: &str, app_id: &str) -> StoreResult<Option<Wallet>>;
    /// Appends a history record without touching the balance.
    async fn append_history(&self, record: &WalletTransaction) -> StoreResult<()>;
    /// Atomically adjusts the balance by a signed delta and records the
    /// history entry. No balance floor: gateway-driven corrections are
    /// trusted and may drive the balance negative.
    async fn adjust_balance(
        &self,
        wallet_id: Uuid,
        delta: i64,
        record: &WalletTransaction,
    ) -> StoreResult<Wallet>;
    /// Atomically decrements the balance only when it covers `amount`.
    /// Returns `None` when the balance is insufficient; nothing is written
    /// in that case.
    async fn debit_checked(
        &self,
        wallet_id: Uuid,
        amount: i64,
        record: &WalletTransaction,
    ) -> StoreResult<Option<Wallet>>;
    async fn history(&self, wallet_id: Uuid) -> StoreResult<Vec<WalletTransaction>>;
}

#[async_trait]
pub trait LedgerAppender: Send + Sync {
    async fn append(&self, entry: &LedgerEntry) -> StoreResult<()>;
}

#[async_trait]
pub trait EconomicEventAppender: Send + Sync {
    /// Appends keyed by `event_id`. Returns `false` when an event with the
    /// same id already exists (duplicate-suppressed re-delivery).
    async fn append(&self, event: &EconomicEventEnvelope) -> StoreResult<bool>;
}

#[async_trait]
pub trait PaymentGateway: Send + Sync {
    async fn create_intent(&self, params: &CreateIntentParams)
        -> Result<PaymentIntent, GatewayError>;
    async fn get_intent(&self, intent_id: &str) -> Result<PaymentIntent, GatewayError>;
    async fn confirm_intent(&self, intent_id: &str) -> Result<PaymentIntent, GatewayError>;
    async fn create_refund(&self, params: &RefundParams) -> Result<RefundObject, GatewayError>;
}

#[derive(Error, Debug)]
pub enum DisbursementError {
    /// The destination account can never receive funds; retrying is wasted.
    #[error("invalid destination account: {0}")]
    InvalidDestination(String),
    #[error("disbursement failed: {0}")]
    Failed(String),
}

#[async_trait]
pub trait Disbursements: Send + Sync {
    /// Pays `amount` (major units) to a destination account on behalf of an
    /// app.
    async fn pay_out(
        &self,
        destination_account: &str,
        amount: &MajorAmount,
        app_id: &str,
    ) -> Result<(), DisbursementError>;
}
