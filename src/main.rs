//! UploadHub Server: resumable chunked media uploads.
//!
//! Main entry point that wires all crates together and starts the server.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tracing_subscriber::{EnvFilter, fmt};

use uploadhub_api::{AppState, build_app};
use uploadhub_core::config::AppConfig;
use uploadhub_core::error::AppError;
use uploadhub_service::UploadStack;
use uploadhub_worker::{CronScheduler, ExpiryReaper};

#[tokio::main]
async fn main() {
    let env = std::env::var("UPLOADHUB_ENV").unwrap_or_else(|_| "development".to_string());
    let config = match AppConfig::load(&env) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Failed to load configuration: {e}");
            std::process::exit(1);
        }
    };

    init_logging(&config);
    tracing::info!(env = %env, "Configuration loaded");

    if let Err(e) = run(config).await {
        tracing::error!(error = %e, "Server error");
        std::process::exit(1);
    }
}

/// Initialize tracing/logging
fn init_logging(config: &AppConfig) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.logging.level));

    match config.logging.format.as_str() {
        "json" => {
            fmt()
                .json()
                .with_env_filter(filter)
                .with_target(true)
                .with_thread_ids(true)
                .init();
        }
        _ => {
            fmt()
                .pretty()
                .with_env_filter(filter)
                .with_target(true)
                .init();
        }
    }
}

/// Main server run function
async fn run(config: AppConfig) -> Result<(), AppError> {
    tracing::info!("Starting UploadHub v{}", env!("CARGO_PKG_VERSION"));

    // ── Step 1: Session store, chunk store, blob store ───────────
    tracing::info!(provider = %config.database.provider, "Initializing upload stack...");
    let stack = UploadStack::from_config(&config).await?;

    // ── Step 2: Expiry reaper ────────────────────────────────────
    let mut scheduler = if config.worker.enabled {
        tracing::info!("Starting expiry reaper...");
        let reaper = Arc::new(ExpiryReaper::new(
            Arc::clone(&stack.service),
            Arc::clone(&stack.store),
            stack.chunks.clone(),
            config.worker.sweep_batch_limit,
            config.worker.orphan_cleanup,
        ));

        // Reclaim whatever expired while the server was down.
        match reaper.run().await {
            Ok(report) => tracing::info!(
                expired = report.expired,
                orphans_removed = report.orphans_removed,
                failed = report.failed,
                "Startup sweep finished"
            ),
            Err(e) => tracing::warn!(error = %e, "Startup sweep failed"),
        }

        let scheduler = CronScheduler::new(reaper).await?;
        scheduler
            .register_expiry_sweep(&config.worker.expiry_sweep_cron)
            .await?;
        scheduler.start().await?;
        Some(scheduler)
    } else {
        tracing::info!("Expiry reaper disabled");
        None
    };

    // ── Step 3: Build and start HTTP server ──────────────────────
    let addr = format!("{}:{}", config.server.host, config.server.port);
    let grace = Duration::from_secs(config.server.shutdown_grace_seconds);

    let state = AppState {
        config: Arc::new(config),
        session_store: Arc::clone(&stack.store),
        upload_service: Arc::clone(&stack.service),
        metrics: Arc::clone(&stack.metrics),
    };
    let app = build_app(state);

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(|e| AppError::internal(format!("Failed to bind {addr}: {e}")))?;
    tracing::info!(addr = %addr, "HTTP server listening");

    // ── Step 4: Graceful shutdown ────────────────────────────────
    let (shutdown_tx, mut shutdown_rx) = watch::channel(false);
    let server = axum::serve(listener, app).with_graceful_shutdown(async move {
        shutdown_signal().await;
        tracing::info!("Shutdown signal received, starting graceful shutdown...");
        let _ = shutdown_tx.send(true);
    });
    let mut serve = tokio::spawn(async move { server.await });

    let served = tokio::select! {
        joined = &mut serve => match joined {
            Ok(result) => result.map_err(|e| AppError::internal(format!("Server error: {e}"))),
            Err(e) => Err(AppError::internal(format!("Server task failed: {e}"))),
        },
        _ = async {
            let _ = shutdown_rx.wait_for(|stopping| *stopping).await;
            tokio::time::sleep(grace).await;
        } => {
            tracing::warn!(grace_seconds = grace.as_secs(), "In-flight requests exceeded the shutdown grace period");
            serve.abort();
            Ok(())
        }
    };

    // ── Step 5: Stop background tasks ────────────────────────────
    if let Some(scheduler) = scheduler.as_mut() {
        if let Err(e) = scheduler.shutdown().await {
            tracing::warn!(error = %e, "Scheduler shutdown failed");
        }
    }
    if let Some(pool) = &stack.pool {
        pool.close().await;
    }

    tracing::info!("UploadHub server stopped");
    served
}

/// Wait for shutdown signal (Ctrl+C or SIGTERM)
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
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
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
