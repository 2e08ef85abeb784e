//! Postgres implementation of WalletStore.
//!
//! Balance mutations are single `UPDATE ... SET balance = balance + $n`
//! statements so there is no read-then-write race window; the checked
//! debit adds `AND balance >= $n` to enforce the non-negative invariant in
//! the same statement.

use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use crate::domain::{Wallet, WalletTransaction};
use crate::ports::{StoreError, StoreResult, WalletStore};

#[derive(Clone)]
pub struct PostgresWalletStore {
    pool: PgPool,
}

impl PostgresWalletStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn insert_history(
        executor: &mut sqlx::Transaction<'_, sqlx::Postgres>,
        record: &WalletTransaction,
    ) -> StoreResult<()> {
        sqlx::query(
            r#"
            INSERT INTO wallet_transactions (
                id, wallet_id, transaction_id, gateway_intent_id, kind, amount, created_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(record.id)
        .bind(record.wallet_id)
        .bind(record.transaction_id)
        .bind(&record.gateway_intent_id)
        .bind(record.kind.as_str())
        .bind(record.amount)
        .bind(record.created_at)
        .execute(&mut **executor)
        .await?;
        Ok(())
    }
}

#[async_trait]
impl WalletStore for PostgresWalletStore {
    async fn insert(&self, wallet: &Wallet) -> StoreResult<()> {
        sqlx::query(
            r#"
            INSERT INTO wallets (id, user_id, app_id, balance, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(wallet.id)
        .bind(&wallet.user_id)
        .bind(&wallet.app_id)
        .bind(wallet.balance)
        .bind(wallet.created_at)
        .bind(wallet.updated_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn get(&self, id: Uuid) -> StoreResult<Option<Wallet>> {
        let row = sqlx::query_as::<_, WalletRow>("SELECT * FROM wallets WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(WalletRow::into_domain))
    }

    async fn find_for_user(&self, user_id: &str, app_id: &str) -> StoreResult<Option<Wallet>> {
        let row = sqlx::query_as::<_, WalletRow>(
            "SELECT * FROM wallets WHERE user_id = $1 AND app_id = $2",
        )
        .bind(user_id)
        .bind(app_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(WalletRow::into_domain))
    }

    async fn append_history(&self, record: &WalletTransaction) -> StoreResult<()> {
        let mut tx = self.pool.begin().await?;
        Self::insert_history(&mut tx, record).await?;
        tx.commit().await?;
        Ok(())
    }

    async fn adjust_balance(
        &self,
        wallet_id: Uuid,
        delta: i64,
        record: &WalletTransaction,
    ) -> StoreResult<Wallet> {
        let mut tx = self.pool.begin().await?;

        let row = sqlx::query_as::<_, WalletRow>(
            r#"
            UPDATE wallets
            SET balance = balance + $1, updated_at = NOW()
            WHERE id = $2
            RETURNING *
            "#,
        )
        .bind(delta)
        .bind(wallet_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| StoreError::NotFound(wallet_id.to_string()))?;

        Self::insert_history(&mut tx, record).await?;
        tx.commit().await?;
        Ok(row.into_domain())
    }

    async fn debit_checked(
        &self,
        wallet_id: Uuid,
        amount: i64,
        record: &WalletTransaction,
    ) -> StoreResult<Option<Wallet>> {
        let mut tx = self.pool.begin().await?;

        let row = sqlx::query_as::<_, WalletRow>(
            r#"
            UPDATE wallets
            SET balance = balance - $1, updated_at = NOW()
            WHERE id = $2 AND balance >= $1
            RETURNING *
            "#,
        )
        .bind(amount)
        .bind(wallet_id)
        .fetch_optional(&mut *tx)
        .await?;

        let Some(row) = row else {
            tx.rollback().await?;
            return Ok(None);
        };

        Self::insert_history(&mut tx, record).await?;
        tx.commit().await?;
        Ok(Some(row.into_domain()))
    }

    async fn history(&self, wallet_id: Uuid) -> StoreResult<Vec<WalletTransaction>> {
        let rows = sqlx::query_as::<_, WalletTransactionRow>(
            "SELECT * FROM wallet_transactions WHERE wallet_id = $1 ORDER BY created_at ASC",
        )
        .bind(wallet_id)
        .fetch_all(&self.pool)
        .await?;
        rows.into_iter().map(WalletTransactionRow::into_domain).collect()
    }
}

#[derive(Debug, sqlx::FromRow)]
struct WalletRow {
    id: Uuid,
    user_id: String,
    app_id: String,
    balance: i64,
    created_at: chrono::DateTime<chrono::Utc>,
    updated_at: chrono::DateTime<chrono::Utc>,
}

impl WalletRow {
    fn into_domain(self) -> Wallet {
        Wallet {
            id: self.id,
            user_id: self.user_id,
            app_id: self.app_id,
            balance: self.balance,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct WalletTransactionRow {
    id: Uuid,
    wallet_id: Uuid,
    transaction_id: Option<Uuid>,
    gateway_intent_id: Option<String>,
    kind: String,
    amount: i64,
    created_at: chrono::DateTime<chrono::Utc>,
}

impl WalletTransactionRow {
    fn into_domain(self) -> StoreResult<WalletTransaction> {
        Ok(WalletTransaction {
            id: self.id,
            wallet_id: self.wallet_id,
            transaction_id: self.transaction_id,
            gateway_intent_id: self.gateway_intent_id,
            kind: self.kind.parse().map_err(StoreError::Database)?,
            amount: self.amount,
            created_at: self.created_at,
        })
    }
}
