//! Notify Hub server binary entrypoint.

use std::net::SocketAddr;
use std::sync::Arc;

use tokio::sync::Notify;
use tracing_subscriber::EnvFilter;

use hub_common::config::AppConfig;
use hub_common::db::create_pool;
use hub_common::redis_pool::create_redis_pool;
use hub_engine::{
    DispatchConfig, DispatchEngine, DispatchState, PgMessageStore, ReadView, RedisResultCache,
    TickSchedule, TickScheduler,
};
use hub_notifier::GatewayClient;

use hub_api::routes::{create_router, with_http_layers};
use hub_api::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .json()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new("hub_api=info,hub_engine=info,hub_notifier=info,tower_http=info")
        }))
        .init();

    // Load configuration
    let config = AppConfig::from_env()?;
    tracing::info!(
        environment = %config.service_environment,
        "Starting Notify Hub server..."
    );

    // Message store
    let pool = create_pool(&config.postgres_dsn, config.db_max_connections).await?;
    let store = Arc::new(PgMessageStore::new(pool, config.claim_lease));
    store.ensure_schema().await?;
    if config.seed_sample_messages {
        store.seed_sample_messages().await?;
    }

    // Delivery receipt cache
    let redis = create_redis_pool(config.redis_connection_info()?).await?;
    let cache = Arc::new(RedisResultCache::new(redis, config.redis_expiry));
    tracing::info!("Redis connection established");

    // Gateway client
    let client = Arc::new(GatewayClient::new(
        config.hook_client_url.clone(),
        config.hook_client_secret.clone(),
        config.hook_client_timeout,
    )?);

    // Dispatch engine and its schedule
    let dispatch = DispatchState::default();
    let engine = Arc::new(DispatchEngine::new(
        Arc::clone(&store),
        Arc::clone(&cache),
        client,
        dispatch.clone(),
        DispatchConfig {
            fetch_limit: config.fetch_limit,
            max_chunk_size: config.max_chunk_size,
        },
    ));
    let schedule: TickSchedule = config.sending_message_ticker.parse()?;
    let scheduler = TickScheduler::start(Arc::clone(&engine), &schedule).await?;

    // Build router
    let state = AppState::new(dispatch, Arc::new(ReadView::new(store, cache)));
    let app = with_http_layers(create_router(state), config.http_request_timeout);

    // Start server
    let addr = SocketAddr::from(([0, 0, 0, 0], config.http_port));
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!("API server listening on {}", addr);

    let shutdown = Arc::new(Notify::new());
    let mut server = {
        let shutdown = Arc::clone(&shutdown);
        tokio::spawn(async move {
            axum::serve(listener, app)
                .with_graceful_shutdown(async move { shutdown.notified().await })
                .await
        })
    };

    tokio::select! {
        result = &mut server => {
            result??;
        }
        _ = shutdown_signal() => {
            tracing::info!("Shutdown signal received, draining connections");
            shutdown.notify_one();
            match tokio::time::timeout(config.http_shutdown_timeout, server).await {
                Ok(result) => result??,
                Err(_) => tracing::warn!(
                    timeout = ?config.http_shutdown_timeout,
                    "Graceful shutdown timed out"
                ),
            }
        }
    }

    scheduler.shutdown().await?;
    if tokio::time::timeout(config.http_shutdown_timeout, engine.wait_idle())
        .await
        .is_err()
    {
        tracing::warn!(
            timeout = ?config.http_shutdown_timeout,
            "Dispatch tick still running at shutdown"
        );
    }
    tracing::info!("Server stopped");
    Ok(())
}

/// Wait for Ctrl+C or SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for Ctrl+C");
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
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
