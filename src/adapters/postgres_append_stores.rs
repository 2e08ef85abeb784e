//! Postgres implementations of the append-only stores.

use async_trait::async_trait;
use sqlx::PgPool;

use crate::domain::{EconomicEventEnvelope, LedgerEntry};
use crate::ports::{EconomicEventAppender, LedgerAppender, StoreResult};

/// Appends immutable audit entries; nothing in this adapter updates or
/// deletes rows.
#[derive(Clone)]
pub struct PostgresLedgerAppender {
    pool: PgPool,
}

impl PostgresLedgerAppender {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl LedgerAppender for PostgresLedgerAppender {
    async fn append(&self, entry: &LedgerEntry) -> StoreResult<()> {
        sqlx::query(
            r#"
            INSERT INTO ledger_entries (
                id, user_id, app_id, wallet_id, transaction_id, gateway_intent_id,
                entry_type, source, reason, amount, currency, created_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
            "#,
        )
        .bind(entry.id)
        .bind(&entry.user_id)
        .bind(&entry.app_id)
        .bind(entry.wallet_id)
        .bind(entry.transaction_id)
        .bind(&entry.gateway_intent_id)
        .bind(entry.entry_type.as_str())
        .bind(&entry.source)
        .bind(&entry.reason)
        .bind(entry.amount)
        .bind(&entry.currency)
        .bind(entry.created_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}

/// Idempotent appender for the economic event log. `event_id` is the
/// primary key, so a re-delivered provider event inserts zero rows.
#[derive(Clone)]
pub struct PostgresEconomicEventAppender {
    pool: PgPool,
}

impl PostgresEconomicEventAppender {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl EconomicEventAppender for PostgresEconomicEventAppender {
    async fn append(&self, event: &EconomicEventEnvelope) -> StoreResult<bool> {
        let result = sqlx::query(
            r#"
            INSERT INTO economic_events (
                event_id, event_type, occurred_at, producer, service, app_id,
                request_id, actor_type, actor_id, user_id, transaction_id, payload
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
            ON CONFLICT (event_id) DO NOTHING
            "#,
        )
        .bind(&event.event_id)
        .bind(event.event_type.as_str())
        .bind(event.occurred_at)
        .bind(&event.source.producer)
        .bind(&event.source.service)
        .bind(&event.source.app_id)
        .bind(&event.source.request_id)
        .bind(&event.actor.actor_type)
        .bind(&event.actor.id)
        .bind(&event.correlation.user_id)
        .bind(event.correlation.transaction_id)
        .bind(&event.payload)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }
}
