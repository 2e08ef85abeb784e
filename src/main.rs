use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use axum::{routing::get, Router};
use sqlx::migrate::Migrator;
use sqlx::postgres::PgPoolOptions;
use tokio::net::TcpListener;
use tokio::sync::watch;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use paylane_core::adapters::{
    PostgresEconomicEventAppender, PostgresLedgerAppender, PostgresTransactionStore,
    PostgresWalletStore,
};
use paylane_core::config::Config;
use paylane_core::gateway::GatewayClient;
use paylane_core::services::{PaymentService, SettlementWorker, WalletDebitService};
use paylane_core::{create_app, metrics, AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::from_env()?;

    // Setup logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Database pool
    let pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(&config.database_url)
        .await?;

    // Run migrations
    let migrator = Migrator::new(Path::new("./migrations")).await?;
    migrator.run(&pool).await?;
    tracing::info!("Database migrations completed");

    // Payment gateway client
    let gateway = Arc::new(GatewayClient::new(
        config.gateway_api_url.clone(),
        config.gateway_api_key.clone(),
    ));
    tracing::info!("Gateway client initialized with URL: {}", config.gateway_api_url);

    // Metrics
    let metrics_handle = metrics::init_metrics()?;

    // Stores and services
    let transactions = Arc::new(PostgresTransactionStore::new(pool.clone()));
    let wallets = Arc::new(PostgresWalletStore::new(pool.clone()));
    let ledger = Arc::new(PostgresLedgerAppender::new(pool.clone()));
    let events = Arc::new(PostgresEconomicEventAppender::new(pool.clone()));

    let payments = Arc::new(PaymentService::new(
        transactions.clone(),
        wallets.clone(),
        ledger,
        events,
        gateway.clone(),
    ));
    let debits = Arc::new(WalletDebitService::new(wallets));

    // Settlement worker on its own task, stopped through the watch channel.
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let worker = SettlementWorker::new(
        transactions,
        gateway,
        Duration::from_secs(config.settlement_interval_secs),
        shutdown_rx,
    );
    let worker_handle = tokio::spawn(worker.run());

    let state = AppState {
        payments,
        debits,
        webhook_secret: config.gateway_webhook_secret.clone(),
    };

    let metrics_route = Router::new()
        .route("/metrics", get(metrics::metrics_handler))
        .with_state(metrics_handle);

    let app = create_app(state).merge(metrics_route);

    let addr = std::net::SocketAddr::from(([0, 0, 0, 0], config.server_port));
    tracing::info!("listening on {}", addr);

    let listener = TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(shutdown_tx))
        .await?;

    let _ = worker_handle.await;
    Ok(())
}

async fn shutdown_signal(shutdown_tx: watch::Sender<bool>) {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("failed to listen for shutdown signal: {e}");
        return;
    }
    tracing::info!("shutdown signal received");
    let _ = shutdown_tx.send(true);
}
