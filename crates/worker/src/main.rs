//! Hestia alert worker binary.
//!
//! Hosts the alert engine: connects to PostgreSQL, wires the dispatcher
//! to its production collaborators, and polls for published listings
//! until told to stop.

mod config;
mod poller;

use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use config::WorkerConfig;
use hestia_notify::{
    AlertDispatcher, ChannelGateways, ChatConfig, ChatGateway, EmailConfig, EmailGateway,
    PgCriteriaStore, PgDeliveryLog,
};
use poller::AlertWorker;

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    // --- Tracing ---
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "hestia_worker=debug,hestia_notify=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // --- Configuration ---
    let config = WorkerConfig::from_env();
    tracing::info!(
        poll_interval_secs = config.poll_interval.as_secs(),
        send_concurrency = config.send_concurrency,
        "Loaded worker configuration"
    );

    // --- Database ---
    let database_url = std::env::var("DATABASE_URL").expect("DATABASE_URL must be set");

    let pool = hestia_db::create_pool(&database_url)
        .await
        .expect("Failed to connect to database");
    tracing::info!("Database connection pool created");

    hestia_db::health_check(&pool)
        .await
        .expect("Database health check failed");

    hestia_db::run_migrations(&pool)
        .await
        .expect("Failed to run database migrations");
    tracing::info!("Database migrations applied");

    // --- Delivery gateways ---
    let email = EmailConfig::from_env().map(EmailGateway::new);
    if email.is_none() {
        tracing::warn!("SMTP_HOST not set, email channel disabled");
    }
    let chat = ChatGateway::new(ChatConfig::from_env());
    let gateways = Arc::new(ChannelGateways::new(email, chat));

    // --- Dispatcher and worker loop ---
    let dispatcher = AlertDispatcher::new(
        Arc::new(PgCriteriaStore::new(pool.clone())),
        Arc::new(PgDeliveryLog::new(pool.clone())),
        gateways,
        config.dispatcher_config(),
    );

    let worker = AlertWorker::new(pool, dispatcher, config.poll_interval);
    let cancel = CancellationToken::new();

    let worker_handle = tokio::spawn({
        let cancel = cancel.clone();
        async move { worker.run(cancel).await }
    });

    shutdown_signal().await;
    cancel.cancel();
    worker_handle.await.expect("Alert worker task panicked");

    tracing::info!("Graceful shutdown complete");
}

/// Wait for a termination signal to initiate graceful shutdown.
///
/// Handles both SIGINT (Ctrl-C) and SIGTERM (on Unix) so the worker
/// shuts down cleanly whether stopped interactively or by a process
/// manager (e.g. systemd, Docker, Kubernetes).
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl-C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            tracing::info!("Received SIGINT (Ctrl-C), starting graceful shutdown");
        }
        () = terminate => {
            tracing::info!("Received SIGTERM, starting graceful shutdown");
        }
    }
}
