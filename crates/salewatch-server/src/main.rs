mod api;
mod middleware;
mod scheduler;

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use salewatch_pipeline::{DatasetSwap, ReadApi};
use salewatch_scraper::HttpFetcher;
use salewatch_store::{FsBlobStore, PersistentCache};
use tracing_subscriber::EnvFilter;

use crate::{
    api::{build_app, AppState},
    middleware::RateLimitState,
    scheduler::LiveSwap,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let config = Arc::new(salewatch_core::load_app_config()?);
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(config.log_level.clone()))?;
    tracing_subscriber::fmt().with_env_filter(env_filter).init();

    let catalog = salewatch_core::load_catalog(&config.catalog_path)?;
    let fetcher = HttpFetcher::new(
        config.scraper_request_timeout_secs,
        &config.scraper_user_agent,
        config.scraper_max_retries,
        config.scraper_retry_backoff_base_secs,
    )?;
    let cache = PersistentCache::new(FsBlobStore::new(&config.cache_dir));
    let swap = Arc::new(DatasetSwap::new(
        fetcher,
        cache,
        &catalog,
        config.scraper_max_concurrent_fetches,
    ));

    warm_start(&swap).await;

    let _scheduler = scheduler::build_scheduler(Arc::clone(&swap), &config.refresh_cron).await?;

    let state = AppState {
        sales: Arc::new(ReadApi::new(swap)),
    };
    let rate_limit = RateLimitState::new(
        config.rate_limit_max_requests,
        Duration::from_secs(config.rate_limit_window_secs),
    );
    let app = build_app(state, rate_limit);

    let listener = tokio::net::TcpListener::bind(config.bind_addr).await?;
    tracing::info!(
        addr = %config.bind_addr,
        env = %config.env,
        categories = catalog.expected_categories(),
        "salewatch server listening"
    );
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;
    Ok(())
}

/// Publishes the cached snapshots if both exist, otherwise starts a refresh
/// in the background so the listener comes up immediately.
async fn warm_start(swap: &Arc<LiveSwap>) {
    match swap.load_from_cache().await {
        Ok(Some(_)) => return,
        Ok(None) => tracing::info!("no cached snapshots, refreshing in background"),
        Err(e) => tracing::warn!(error = %e, "cached snapshots unreadable, refreshing in background"),
    }

    let swap = Arc::clone(swap);
    tokio::spawn(async move {
        if let Err(e) = swap.refresh().await {
            tracing::warn!(error = %e, "startup refresh failed, serving nothing until the next cycle");
        }
    });
}

async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to listen for ctrl-c");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }

    tracing::info!("received shutdown signal, starting graceful shutdown");
}
