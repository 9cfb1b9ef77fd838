//! Market stall backend API
//!
//! Back-office service for a market: stall registry, daily rent
//! transactions and staff accounts.

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use tokio::sync::watch;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use market_stall::auth::{JwtService, PasswordHasher};
use market_stall::config::StorageBackend;
use market_stall::domain::SystemClock;
use market_stall::jobs::{JobScheduler, JobSchedulerConfig};
use market_stall::repository::MemoryDatabase;
use market_stall::{api, db, seed, AppState, Config, Repositories};

/// Initialize tracing/logging
fn init_tracing(json: bool) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "market_stall=debug,tower_http=debug".into());

    let registry = tracing_subscriber::registry().with(filter);
    if json {
        registry
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    let config = Config::from_env()?;

    let log_json = std::env::var("LOG_FORMAT")
        .map(|v| v.eq_ignore_ascii_case("json"))
        .unwrap_or(false);
    init_tracing(log_json || config.is_production());
    let addr: SocketAddr = format!("{}:{}", config.host, config.port).parse()?;

    tracing::info!(environment = %config.environment, "Starting market stall server");

    let hasher = PasswordHasher::new(
        config.password_hash_memory_kib,
        config.password_hash_iterations,
    )?;
    let jwt = JwtService::new(&config.jwt_secret, config.token_ttl_hours);
    let clock = Arc::new(SystemClock::with_offset_minutes(
        config.business_utc_offset_minutes,
    ));

    let (repos, pool) = match config.storage {
        StorageBackend::Postgres => {
            let url = config
                .database_url
                .as_deref()
                .context("DATABASE_URL is required for postgres storage")?;

            tracing::info!("Connecting to database...");
            let pool = db::connect(url, config.database_max_connections).await?;
            db::verify_connection(&pool).await?;

            if !db::check_schema(&pool).await? {
                tracing::error!("Database schema is not complete. Please run migrations.");
                return Err(anyhow::anyhow!("Database schema incomplete"));
            }
            tracing::info!("Database connected successfully");

            (Repositories::postgres(pool.clone()), Some(pool))
        }
        StorageBackend::Memory => {
            tracing::warn!("Using in-memory storage; data is lost on exit");
            let repos = Repositories::memory(MemoryDatabase::new());
            let password =
                std::env::var("SEED_ADMIN_PASSWORD").unwrap_or_else(|_| "123456".to_string());
            seed::seed_defaults(&repos, &hasher, &password).await?;
            (repos, None)
        }
    };

    let state = AppState::new(repos, clock, hasher, jwt);

    // Background generation, only when both interval and actor are configured
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let scheduler = match (config.daily_generation_interval, config.job_actor_user_id) {
        (Some(interval), Some(actor)) => {
            let job_config = JobSchedulerConfig::new(actor).with_interval(interval);
            Some(JobScheduler::new(state.transactions.clone(), job_config).start(shutdown_rx))
        }
        _ => None,
    };

    let app = api::create_router(state, config.request_timeout);

    tracing::info!("Listening on http://{}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    // Cleanup
    tracing::info!("Server shutting down...");
    let _ = shutdown_tx.send(true);
    if let Some(handle) = scheduler {
        if let Err(e) = handle.await {
            tracing::warn!(error = %e, "Job scheduler ended abnormally");
        }
    }
    if let Some(pool) = pool {
        pool.close().await;
        tracing::info!("Database connections closed");
    }
    tracing::info!("Goodbye!");

    Ok(())
}

/// Shutdown signal handler for graceful shutdown
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install signal handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received Ctrl+C, initiating graceful shutdown...");
        },
        _ = terminate => {
            tracing::info!("Received SIGTERM, initiating graceful shutdown...");
        },
    }
}
