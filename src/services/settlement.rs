//! Background settlement worker.
//!
//! Pays out pending settlement transactions on a fixed interval with
//! bounded per-item retries. Items are processed sequentially so one batch
//! never issues concurrent disbursements; one item's failure never aborts
//! the batch. The outer loop and every backoff sleep observe the same
//! shutdown signal, so stopping is prompt even mid-backoff.

use std::sync::Arc;
use std::time::{Duration, Instant};

use metrics::{counter, gauge, histogram};
use tokio::sync::watch;
use tokio::time::sleep;
use tracing::{debug, error, info, warn};

use crate::domain::{MinorUnits, Transaction, TransactionStatus, TransactionType};
use crate::ports::{DisbursementError, Disbursements, TransactionStore};

/// Backoff before the next attempt; three attempts total, so only the
/// first two delays elapse.
const RETRY_DELAYS: [Duration; 3] = [
    Duration::from_secs(1),
    Duration::from_secs(2),
    Duration::from_secs(4),
];
const MAX_ATTEMPTS: usize = 3;

pub struct SettlementWorker {
    transactions: Arc<dyn TransactionStore>,
    disbursements: Arc<dyn Disbursements>,
    interval: Duration,
    shutdown: watch::Receiver<bool>,
}

impl SettlementWorker {
    pub fn new(
        transactions: Arc<dyn TransactionStore>,
        disbursements: Arc<dyn Disbursements>,
        interval: Duration,
        shutdown: watch::Receiver<bool>,
    ) -> Self {
        Self {
            transactions,
            disbursements,
            interval,
            shutdown,
        }
    }

    /// Runs until the shutdown signal flips. A failed tick is logged and
    /// counted; the loop continues with the next scheduled tick.
    pub async fn run(mut self) {
        info!(interval_secs = self.interval.as_secs(), "settlement worker started");

        loop {
            if *self.shutdown.borrow() {
                break;
            }

            if let Err(e) = self.tick().await {
                error!(error = %e, "settlement tick failed");
                counter!("settlement_worker_errors_total").increment(1);
            }

            tokio::select! {
                _ = sleep(self.interval) => {}
                changed = self.shutdown.changed() => {
                    if changed.is_err() || *self.shutdown.borrow() {
                        break;
                    }
                }
            }
        }

        info!("settlement worker stopped");
    }

    async fn tick(&self) -> anyhow::Result<()> {
        counter!("settlement_runs_total").increment(1);

        let pending = self
            .transactions
            .pending_by_type(TransactionType::Settlement)
            .await?;
        gauge!("settlement_pending").set(pending.len() as f64);

        if pending.is_empty() {
            counter!("settlement_idle_total").increment(1);
            debug!("no pending settlements");
            return Ok(());
        }

        info!(count = pending.len(), "processing pending settlements");
        for tx in &pending {
            if *self.shutdown.borrow() {
                break;
            }
            self.process_item(tx).await;
        }

        let remaining = self
            .transactions
            .pending_by_type(TransactionType::Settlement)
            .await?;
        gauge!("settlement_pending").set(remaining.len() as f64);

        Ok(())
    }

    async fn process_item(&self, tx: &Transaction) {
        let started = Instant::now();

        let destination = tx
            .metadata
            .destination_account_id
            .as_deref()
            .map(str::trim)
            .filter(|d| !d.is_empty());

        // Structurally invalid items never enter the retry loop.
        let Some(destination) = destination else {
            warn!(transaction_id = %tx.id, "settlement has no destination account");
            counter!("settlement_invalid_destination_total").increment(1);
            self.mark(tx, TransactionStatus::SettlementFailed).await;
            histogram!("settlement_process_seconds").record(started.elapsed().as_secs_f64());
            return;
        };

        // Single minor-to-major conversion at the disbursement boundary.
        let amount = MinorUnits(tx.amount).to_major();

        for attempt in 1..=MAX_ATTEMPTS {
            match self
                .disbursements
                .pay_out(destination, &amount, &tx.app_id)
                .await
            {
                Ok(()) => {
                    info!(transaction_id = %tx.id, attempt, %amount, "settlement disbursed");
                    self.mark(tx, TransactionStatus::Settled).await;
                    break;
                }
                Err(DisbursementError::InvalidDestination(reason)) => {
                    warn!(transaction_id = %tx.id, %reason, "destination rejected, not retrying");
                    counter!("settlement_invalid_destination_total").increment(1);
                    self.mark(tx, TransactionStatus::SettlementFailed).await;
                    break;
                }
                Err(DisbursementError::Failed(reason)) => {
                    if attempt < MAX_ATTEMPTS {
                        warn!(
                            transaction_id = %tx.id,
                            attempt,
                            %reason,
                            "settlement attempt failed, retrying"
                        );
                        let mut shutdown = self.shutdown.clone();
                        tokio::select! {
                            _ = sleep(RETRY_DELAYS[attempt - 1]) => {}
                            _ = shutdown.changed() => {
                                debug!(transaction_id = %tx.id, "backoff interrupted by shutdown");
                                return;
                            }
                        }
                    } else {
                        error!(
                            transaction_id = %tx.id,
                            attempts = MAX_ATTEMPTS,
                            %reason,
                            "settlement exhausted retries"
                        );
                        counter!("settlements_failed_total").increment(1);
                        self.mark(tx, TransactionStatus::SettlementFailed).await;
                    }
                }
            }
        }

        histogram!("settlement_process_seconds").record(started.elapsed().as_secs_f64());
    }

    async fn mark(&self, tx: &Transaction, status: TransactionStatus) {
        if let Err(e) = self.transactions.update_status(tx.id, status).await {
            error!(error = %e, transaction_id = %tx.id, %status, "failed to update settlement status");
        }
    }
}
