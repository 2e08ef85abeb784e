//! Thread-safe in-memory store implementations.
//!
//! Back the test suite and small deployments where persistence is not
//! required. All of them use `Arc<RwLock<..>>` for shared concurrent
//! access; the wallet store serializes balance mutations behind a single
//! write lock so adjust/debit are atomic.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::domain::{
    EconomicEventEnvelope, LedgerEntry, Transaction, TransactionStatus, TransactionType, Wallet,
    WalletTransaction,
};
use crate::ports::{
    EconomicEventAppender, LedgerAppender, StoreError, StoreResult, TransactionStore, WalletStore,
};

#[derive(Default, Clone)]
pub struct InMemoryTransactionStore {
    transactions: Arc<RwLock<HashMap<Uuid, Transaction>>>,
}

impl InMemoryTransactionStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl TransactionStore for InMemoryTransactionStore {
    async fn insert(&self, tx: &Transaction) -> StoreResult<()> {
        let mut transactions = self.transactions.write().await;
        transactions.insert(tx.id, tx.clone());
        Ok(())
    }

    async fn get_by_id(&self, id: Uuid) -> StoreResult<Option<Transaction>> {
        let transactions = self.transactions.read().await;
        Ok(transactions.get(&id).cloned())
    }

    async fn get_by_intent_id(&self, gateway_intent_id: &str) -> StoreResult<Option<Transaction>> {
        let transactions = self.transactions.read().await;
        Ok(transactions
            .values()
            .find(|tx| tx.gateway_intent_id.as_deref() == Some(gateway_intent_id))
            .cloned())
    }

    async fn update_status(&self, id: Uuid, status: TransactionStatus) -> StoreResult<()> {
        let mut transactions = self.transactions.write().await;
        let tx = transactions
            .get_mut(&id)
            .ok_or_else(|| StoreError::NotFound(id.to_string()))?;
        tx.status = status;
        tx.updated_at = chrono::Utc::now();
        Ok(())
    }

    async fn pending_by_type(
        &self,
        transaction_type: TransactionType,
    ) -> StoreResult<Vec<Transaction>> {
        let transactions = self.transactions.read().await;
        let mut pending: Vec<Transaction> = transactions
            .values()
            .filter(|tx| {
                tx.transaction_type == transaction_type
                    && tx.status == TransactionStatus::Pending
            })
            .cloned()
            .collect();
        pending.sort_by_key(|tx| tx.created_at);
        Ok(pending)
    }

    async fn latest_by_type(
        &self,
        transaction_type: TransactionType,
    ) -> StoreResult<Option<Transaction>> {
        let transactions = self.transactions.read().await;
        Ok(transactions
            .values()
            .filter(|tx| tx.transaction_type == transaction_type)
            .max_by_key(|tx| tx.created_at)
            .cloned())
    }
}

#[derive(Default)]
struct WalletState {
    wallets: HashMap<Uuid, Wallet>,
    history: HashMap<Uuid, Vec<WalletTransaction>>,
}

#[derive(Default, Clone)]
pub struct InMemoryWalletStore {
    state: Arc<RwLock<WalletState>>,
}

impl InMemoryWalletStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl WalletStore for InMemoryWalletStore {
    async fn insert(&self, wallet: &Wallet) -> StoreResult<()> {
        let mut state = self.state.write().await;
        state.wallets.insert(wallet.id, wallet.clone());
        Ok(())
    }

    async fn get(&self, id: Uuid) -> StoreResult<Option<Wallet>> {
        let state = self.state.read().await;
        Ok(state.wallets.get(&id).cloned())
    }

    async fn find_for_user(&self, user_id: &str, app_id: &str) -> StoreResult<Option<Wallet>> {
        let state = self.state.read().await;
        Ok(state
            .wallets
            .values()
            .find(|w| w.user_id == user_id && w.app_id == app_id)
            .cloned())
    }

    async fn append_history(&self, record: &WalletTransaction) -> StoreResult<()> {
        let mut state = self.state.write().await;
        if !state.wallets.contains_key(&record.wallet_id) {
            return Err(StoreError::NotFound(record.wallet_id.to_string()));
        }
        state
            .history
            .entry(record.wallet_id)
            .or_default()
            .push(record.clone());
        Ok(())
    }

    async fn adjust_balance(
        &self,
        wallet_id: Uuid,
        delta: i64,
        record: &WalletTransaction,
    ) -> StoreResult<Wallet> {
        let mut state = self.state.write().await;
        let wallet = state
            .wallets
            .get_mut(&wallet_id)
            .ok_or_else(|| StoreError::NotFound(wallet_id.to_string()))?;
        wallet.balance += delta;
        wallet.updated_at = chrono::Utc::now();
        let wallet = wallet.clone();
        state.history.entry(wallet_id).or_default().push(record.clone());
        Ok(wallet)
    }

    async fn debit_checked(
        &self,
        wallet_id: Uuid,
        amount: i64,
        record: &WalletTransaction,
    ) -> StoreResult<Option<Wallet>> {
        let mut state = self.state.write().await;
        let wallet = state
            .wallets
            .get_mut(&wallet_id)
            .ok_or_else(|| StoreError::NotFound(wallet_id.to_string()))?;
        if wallet.balance < amount {
            return Ok(None);
        }
        wallet.balance -= amount;
        wallet.updated_at = chrono::Utc::now();
        let wallet = wallet.clone();
        state.history.entry(wallet_id).or_default().push(record.clone());
        Ok(Some(wallet))
    }

    async fn history(&self, wallet_id: Uuid) -> StoreResult<Vec<WalletTransaction>> {
        let state = self.state.read().await;
        Ok(state.history.get(&wallet_id).cloned().unwrap_or_default())
    }
}

#[derive(Default, Clone)]
pub struct InMemoryLedgerAppender {
    entries: Arc<RwLock<Vec<LedgerEntry>>>,
}

impl InMemoryLedgerAppender {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn entries(&self) -> Vec<LedgerEntry> {
        self.entries.read().await.clone()
    }
}

#[async_trait]
impl LedgerAppender for InMemoryLedgerAppender {
    async fn append(&self, entry: &LedgerEntry) -> StoreResult<()> {
        self.entries.write().await.push(entry.clone());
        Ok(())
    }
}

#[derive(Default, Clone)]
pub struct InMemoryEconomicEventAppender {
    events: Arc<RwLock<HashMap<String, EconomicEventEnvelope>>>,
}

impl InMemoryEconomicEventAppender {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn events(&self) -> Vec<EconomicEventEnvelope> {
        self.events.read().await.values().cloned().collect()
    }
}

#[async_trait]
impl EconomicEventAppender for InMemoryEconomicEventAppender {
    async fn append(&self, event: &EconomicEventEnvelope) -> StoreResult<bool> {
        let mut events = self.events.write().await;
        if events.contains_key(&event.event_id) {
            return Ok(false);
        }
        events.insert(event.event_id.clone(), event.clone());
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{
        EconomicEventType, TransactionMetadata, WalletEntryKind,
    };

    fn settlement_tx() -> Transaction {
        Transaction::new(
            TransactionType::Settlement,
            10_000,
            "usd".to_string(),
            "app-1".to_string(),
            None,
            None,
            TransactionMetadata::default(),
        )
    }

    #[tokio::test]
    async fn test_transaction_store_lookup_by_intent() {
        let store = InMemoryTransactionStore::new();
        let mut tx = settlement_tx();
        tx.gateway_intent_id = Some("pi_1".to_string());
        store.insert(&tx).await.unwrap();

        let found = store.get_by_intent_id("pi_1").await.unwrap().unwrap();
        assert_eq!(found.id, tx.id);
        assert!(store.get_by_intent_id("pi_2").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_pending_by_type_filters_status() {
        let store = InMemoryTransactionStore::new();
        let pending = settlement_tx();
        let settled = settlement_tx();
        store.insert(&pending).await.unwrap();
        store.insert(&settled).await.unwrap();
        store
            .update_status(settled.id, TransactionStatus::Settled)
            .await
            .unwrap();

        let found = store
            .pending_by_type(TransactionType::Settlement)
            .await
            .unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].id, pending.id);
    }

    #[tokio::test]
    async fn test_wallet_adjust_and_checked_debit() {
        let store = InMemoryWalletStore::new();
        let wallet = Wallet::new("user-1".to_string(), "app-1".to_string());
        store.insert(&wallet).await.unwrap();

        let credit = WalletTransaction::new(wallet.id, WalletEntryKind::Credited, 5000);
        let after = store.adjust_balance(wallet.id, 5000, &credit).await.unwrap();
        assert_eq!(after.balance, 5000);

        let debit = WalletTransaction::new(wallet.id, WalletEntryKind::Debited, -2000);
        let after = store
            .debit_checked(wallet.id, 2000, &debit)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(after.balance, 3000);

        let too_much = WalletTransaction::new(wallet.id, WalletEntryKind::Debited, -9000);
        let rejected = store.debit_checked(wallet.id, 9000, &too_much).await.unwrap();
        assert!(rejected.is_none());
        assert_eq!(store.get(wallet.id).await.unwrap().unwrap().balance, 3000);

        let history = store.history(wallet.id).await.unwrap();
        assert_eq!(history.len(), 2);
    }

    #[tokio::test]
    async fn test_event_appender_suppresses_duplicates() {
        let appender = InMemoryEconomicEventAppender::new();
        let tx = settlement_tx();
        let event = EconomicEventEnvelope::from_provider_event(
            "evt_1",
            EconomicEventType::RevenueInvoicePaid,
            &tx,
            5000,
        );

        assert!(appender.append(&event).await.unwrap());
        assert!(!appender.append(&event).await.unwrap());
        assert_eq!(appender.events().await.len(), 1);
    }
}
