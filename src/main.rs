//! forgefed-node binary entry point

use std::time::Duration;

use forgefed_node::{AppState, config};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

const KEY_CACHE_PRUNE_INTERVAL: Duration = Duration::from_secs(600);

/// Application entry point
///
/// # Setup
/// 1. Initialize tracing/logging
/// 2. Load configuration from file and environment
/// 3. Initialize AppState
/// 4. Build Axum router
/// 5. Start background tasks (key cache pruning)
/// 6. Start HTTP server
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // 1. Initialize tracing/logging
    let log_format =
        std::env::var("FORGEFED__LOGGING__FORMAT").unwrap_or_else(|_| "pretty".to_string());

    if log_format == "json" {
        tracing_subscriber::registry()
            .with(
                tracing_subscriber::EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| "forgefed_node=info,tower_http=debug".into()),
            )
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(
                tracing_subscriber::EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| "forgefed_node=info,tower_http=debug".into()),
            )
            .with(tracing_subscriber::fmt::layer().pretty())
            .init();
    }

    tracing::info!("Starting forgefed-node...");

    // 2. Initialize metrics
    forgefed_node::metrics::init_metrics();

    // 3. Load configuration
    let config = config::AppConfig::load()?;
    tracing::info!(
        domain = %config.server.domain,
        protocol = %config.server.protocol,
        federation = config.federation.enabled,
        "Configuration loaded"
    );

    // 4. Initialize application state
    let state = AppState::new(config.clone()).await?;

    // 5. Build Axum router
    let app = forgefed_node::build_router(state.clone());

    // 6. Start background tasks
    spawn_key_cache_prune_task(state.clone());

    // 7. Start HTTP server
    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    tracing::info!("Server listening on {}", addr);
    tracing::info!("Public URL: {}", config.server.base_url());

    axum::serve(listener, app).await?;

    Ok(())
}

/// Drop expired remote public keys periodically.
fn spawn_key_cache_prune_task(state: AppState) {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(KEY_CACHE_PRUNE_INTERVAL);
        interval.tick().await;

        loop {
            interval.tick().await;
            state.key_cache.prune_expired().await;
            let stats = state.key_cache.stats().await;
            tracing::debug!(
                entries = stats.total_entries,
                valid = stats.valid_entries,
                "Public key cache pruned"
            );
        }
    });
}
