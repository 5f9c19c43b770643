//! Finance Server - account CRUD over PostgreSQL with a Redis cache and an
//! OpenSearch mirror.
//!
//! The stores are connected here and handed to a
//! [`finance_engine::Synchronizer`], which owns the consistency policy. Every
//! account route goes through it.

mod cache;
mod config;
mod db;
mod envelope;
mod error;
mod handlers;
mod routes;
mod search;
mod telemetry;

use crate::cache::RedisCache;
use crate::config::Config;
use crate::db::PgAccountStore;
use crate::search::OpenSearchIndex;
use axum::Router;
use finance_engine::Synchronizer;
use metrics_exporter_prometheus::PrometheusHandle;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState {
    pub sync: Synchronizer,
    /// Renders `/metrics`; absent when no recorder is installed
    pub metrics: Option<PrometheusHandle>,
}

impl AppState {
    pub fn new(sync: Synchronizer, metrics: Option<PrometheusHandle>) -> Self {
        Self { sync, metrics }
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "finance_server=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    dotenvy::dotenv().ok();
    let config = Config::from_env()?;

    tracing::info!(
        app = "finance",
        "Starting Finance Server on {}:{}",
        config.host,
        config.port
    );

    let metrics = telemetry::install()?;

    // Primary store
    let pool = db::create_pool(&config.database_url).await?;
    tracing::info!("Running database migrations...");
    db::run_migrations(&pool).await?;

    // Derived stores; both may be down without stopping the server
    let cache = RedisCache::open(&config.redis_url)?;
    if let Err(e) = cache.warm_up().await {
        tracing::warn!(store = "cache", error = %e, "Redis not reachable yet, continuing");
    }
    let index = OpenSearchIndex::new(&config.opensearch)?;

    let sync = Synchronizer::builder(
        Arc::new(PgAccountStore::new(pool)),
        Arc::new(cache),
        Arc::new(index),
    )
    .keys(config.cache_keys.clone())
    .index_name(config.opensearch.index.clone())
    .build();

    let state = AppState::new(sync, Some(metrics));

    // Build router
    let app = Router::new()
        .merge(routes::create_routes())
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(state);

    // Start server
    let addr = format!("{}:{}", config.host, config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Listening for requests at http://{}", addr);

    axum::serve(listener, app).await?;

    Ok(())
}
