// SPDX-FileCopyrightText: 2026 Tutorlane Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `tutorlane serve` and the one-shot maintenance commands.
//!
//! Serve opens the ledger, wires the configured payment providers into the
//! booking engine, and runs three things until a shutdown signal: the HTTP
//! gateway, the outbox dispatcher and the missed-class sweep.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use tutorlane_booking::{BookingEngine, CommercePolicy};
use tutorlane_config::TutorlaneConfig;
use tutorlane_core::TutorError;
use tutorlane_gateway::{AppState, AuthState, start_server};
use tutorlane_notify::{EventDispatcher, notifier_from_config};
use tutorlane_payments::{ExchangeRateApi, MpesaGateway, PaypalGateway};
use tutorlane_storage::Database;

use crate::shutdown;

/// Open the ledger named in the config, applying pending migrations.
pub async fn open_database(config: &TutorlaneConfig) -> Result<Arc<Database>, TutorError> {
    let db = Database::open(&config.storage.database_path).await?;
    info!(path = %config.storage.database_path, "ledger opened");
    Ok(Arc::new(db))
}

/// Build the engine with every provider the config enables.
pub fn build_engine(
    config: &TutorlaneConfig,
    db: Arc<Database>,
) -> Result<BookingEngine, TutorError> {
    let policy = CommercePolicy::from_config(config)?;
    let rates = Arc::new(ExchangeRateApi::from_config(config)?);
    let mut engine = BookingEngine::new(db, rates, policy);

    match MpesaGateway::from_config(config)? {
        Some(gateway) => {
            engine = engine.with_gateway(Arc::new(gateway));
            info!("push payments enabled");
        }
        None => warn!("mpesa credentials not configured, push payments disabled"),
    }
    match PaypalGateway::from_config(config)? {
        Some(gateway) => {
            engine = engine.with_gateway(Arc::new(gateway));
            info!("redirect payments enabled");
        }
        None => warn!("paypal credentials not configured, redirect payments disabled"),
    }
    Ok(engine)
}

/// Runs the `tutorlane serve` command.
pub async fn run_serve(config: TutorlaneConfig) -> Result<(), TutorError> {
    let db = open_database(&config).await?;
    let engine = Arc::new(build_engine(&config, Arc::clone(&db))?);
    let notifier = notifier_from_config(&config)?;

    let cancel = shutdown::install_signal_handler();

    let dispatcher = EventDispatcher::new(Arc::clone(&db), Arc::clone(&engine), notifier)
        .with_retry_backoff(Duration::from_millis(config.outbox.retry_backoff_ms));
    let poll_interval = Duration::from_millis(config.outbox.poll_interval_ms);
    let dispatcher_task = {
        let cancel = cancel.clone();
        tokio::spawn(async move { dispatcher.run(poll_interval, cancel).await })
    };

    let sweep_task = if config.sweep.enabled {
        let engine = Arc::clone(&engine);
        let cancel = cancel.clone();
        let every = Duration::from_secs(config.sweep.interval_secs);
        info!(interval_secs = config.sweep.interval_secs, "missed-class sweep started");
        Some(tokio::spawn(async move { sweep_loop(engine, every, cancel).await }))
    } else {
        None
    };

    if config.auth.token_secret.is_none() {
        warn!("auth.token_secret is not set, every authenticated route will refuse requests");
    }
    let state = AppState {
        engine,
        auth: AuthState::from_secret(config.auth.token_secret.as_deref()),
    };

    let served = start_server(&config.server, state, cancel.clone()).await;
    if let Err(e) = &served {
        error!(error = %e, "gateway stopped with an error");
    }

    // Stop the background tasks even when the server failed on its own.
    cancel.cancel();
    if dispatcher_task.await.is_err() {
        warn!("dispatcher task panicked");
    }
    if let Some(task) = sweep_task
        && task.await.is_err()
    {
        warn!("sweep task panicked");
    }

    match Arc::try_unwrap(db) {
        Ok(db) => db.close().await?,
        Err(_) => debug!("ledger still shared at shutdown, skipping checkpoint"),
    }

    info!("tutorlane serve shutdown complete");
    served
}

/// Mark missed classes on a fixed interval until cancelled.
async fn sweep_loop(engine: Arc<BookingEngine>, every: Duration, cancel: CancellationToken) {
    let mut interval = tokio::time::interval(every);
    // Skip the first immediate tick.
    interval.tick().await;

    loop {
        tokio::select! {
            _ = interval.tick() => {
                match engine.sweep_unattended(Utc::now()).await {
                    Ok(0) => debug!("sweep found no missed classes"),
                    Ok(count) => info!(count, "bookings marked unattended"),
                    Err(e) => warn!(error = %e, "sweep failed (non-fatal)"),
                }
            }
            _ = cancel.cancelled() => {
                info!("sweep task shutting down");
                break;
            }
        }
    }
}

/// Runs the `tutorlane sweep` command: one pass, then exit.
pub async fn run_sweep(config: TutorlaneConfig) -> Result<usize, TutorError> {
    let db = open_database(&config).await?;
    let engine = build_engine(&config, Arc::clone(&db))?;
    let count = engine.sweep_unattended(Utc::now()).await?;
    drop(engine);
    if let Ok(db) = Arc::try_unwrap(db) {
        db.close().await?;
    }
    Ok(count)
}

/// Runs the `tutorlane migrate` command.
pub async fn run_migrate(config: TutorlaneConfig) -> Result<(), TutorError> {
    let db = Database::open(&config.storage.database_path).await?;
    db.close().await?;
    info!(path = %config.storage.database_path, "migrations applied");
    Ok(())
}

/// Initializes the tracing subscriber with the given log level.
pub fn init_tracing(log_level: &str) {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("tutorlane={log_level},warn")));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_names(false)
        .init();
}
