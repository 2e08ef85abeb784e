//! Postgres implementation of TransactionStore.

use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use crate::domain::{Transaction, TransactionMetadata, TransactionStatus, TransactionType};
use crate::ports::{StoreError, StoreResult, TransactionStore};

/// Postgres-backed transaction store.
#[derive(Clone)]
pub struct PostgresTransactionStore {
    pool: PgPool,
}

impl PostgresTransactionStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl TransactionStore for PostgresTransactionStore {
    async fn insert(&self, tx: &Transaction) -> StoreResult<()> {
        sqlx::query(
            r#"
            INSERT INTO transactions (
                id, transaction_type, amount, currency, gateway_intent_id, wallet_id,
                app_id, status, payer_user_id, destination_account_id, round_id,
                investor_shares, created_at, updated_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14)
            "#,
        )
        .bind(tx.id)
        .bind(tx.transaction_type.as_str())
        .bind(tx.amount)
        .bind(&tx.currency)
        .bind(&tx.gateway_intent_id)
        .bind(tx.wallet_id)
        .bind(&tx.app_id)
        .bind(tx.status.as_str())
        .bind(&tx.metadata.payer_user_id)
        .bind(&tx.metadata.destination_account_id)
        .bind(&tx.metadata.round_id)
        .bind(tx.metadata.investor_shares)
        .bind(tx.created_at)
        .bind(tx.updated_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn get_by_id(&self, id: Uuid) -> StoreResult<Option<Transaction>> {
        let row = sqlx::query_as::<_, TransactionRow>("SELECT * FROM transactions WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        row.map(TransactionRow::into_domain).transpose()
    }

    async fn get_by_intent_id(&self, gateway_intent_id: &str) -> StoreResult<Option<Transaction>> {
        let row = sqlx::query_as::<_, TransactionRow>(
            "SELECT * FROM transactions WHERE gateway_intent_id = $1",
        )
        .bind(gateway_intent_id)
        .fetch_optional(&self.pool)
        .await?;
        row.map(TransactionRow::into_domain).transpose()
    }

    async fn update_status(&self, id: Uuid, status: TransactionStatus) -> StoreResult<()> {
        let result =
            sqlx::query("UPDATE transactions SET status = $1, updated_at = NOW() WHERE id = $2")
                .bind(status.as_str())
                .bind(id)
                .execute(&self.pool)
                .await?;
        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound(id.to_string()));
        }
        Ok(())
    }

    async fn pending_by_type(
        &self,
        transaction_type: TransactionType,
    ) -> StoreResult<Vec<Transaction>> {
        let rows = sqlx::query_as::<_, TransactionRow>(
            r#"
            SELECT * FROM transactions
            WHERE transaction_type = $1 AND status = 'pending'
            ORDER BY created_at ASC
            "#,
        )
        .bind(transaction_type.as_str())
        .fetch_all(&self.pool)
        .await?;
        rows.into_iter().map(TransactionRow::into_domain).collect()
    }

    async fn latest_by_type(
        &self,
        transaction_type: TransactionType,
    ) -> StoreResult<Option<Transaction>> {
        let row = sqlx::query_as::<_, TransactionRow>(
            r#"
            SELECT * FROM transactions
            WHERE transaction_type = $1
            ORDER BY created_at DESC
            LIMIT 1
            "#,
        )
        .bind(transaction_type.as_str())
        .fetch_optional(&self.pool)
        .await?;
        row.map(TransactionRow::into_domain).transpose()
    }
}

/// Internal row type for SQLx. Not exposed outside the adapter.
#[derive(Debug, sqlx::FromRow)]
struct TransactionRow {
    id: Uuid,
    transaction_type: String,
    amount: i64,
    currency: String,
    gateway_intent_id: Option<String>,
    wallet_id: Option<Uuid>,
    app_id: String,
    status: String,
    payer_user_id: Option<String>,
    destination_account_id: Option<String>,
    round_id: Option<String>,
    investor_shares: Option<i64>,
    created_at: chrono::DateTime<chrono::Utc>,
    updated_at: chrono::DateTime<chrono::Utc>,
}

impl TransactionRow {
    fn into_domain(self) -> StoreResult<Transaction> {
        Ok(Transaction {
            id: self.id,
            transaction_type: self
                .transaction_type
                .parse()
                .map_err(StoreError::Database)?,
            amount: self.amount,
            currency: self.currency,
            gateway_intent_id: self.gateway_intent_id,
            wallet_id: self.wallet_id,
            app_id: self.app_id,
            status: self.status.parse().map_err(StoreError::Database)?,
            metadata: TransactionMetadata {
                payer_user_id: self.payer_user_id,
                destination_account_id: self.destination_account_id,
                round_id: self.round_id,
                investor_shares: self.investor_shares,
            },
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}
