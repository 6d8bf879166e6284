mod billing;
mod config;
mod db;
mod errors;
mod models;
mod orgs;
mod routes;
mod state;

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::billing::plans::PlanCatalog;
use crate::billing::resolver::SubscriptionResolver;
use crate::billing::store::PgSubscriptionStore;
use crate::billing::webhook::{PriceMap, WebhookProcessor};
use crate::config::Config;
use crate::db::create_pool;
use crate::routes::build_router;
use crate::state::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration first (fails on missing required env vars)
    let config = Config::from_env()?;

    // Initialize structured logging
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!("{}={}", env!("CARGO_PKG_NAME"), &config.rust_log))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting AgencyCV API v{}", env!("CARGO_PKG_VERSION"));

    // Initialize PostgreSQL
    let db = create_pool(&config.database_url).await?;

    // Plan catalog: static, immutable for the life of the process
    let catalog = Arc::new(PlanCatalog::new());
    info!("Plan catalog loaded ({} tiers)", catalog.iter().count());

    // Billing store + resolver with its TTL'd entitlement cache
    let store = Arc::new(PgSubscriptionStore::new(db.clone()));
    let resolver = Arc::new(SubscriptionResolver::new(
        store.clone(),
        catalog.clone(),
        config.active_policy,
        Duration::from_secs(config.entitlement_cache_ttl_secs),
    ));
    info!(
        "Entitlement resolver ready (ttl: {}s, policy: {:?})",
        config.entitlement_cache_ttl_secs, config.active_policy
    );

    // Webhook processor shares the store and invalidates through the resolver
    let webhook = Arc::new(WebhookProcessor::new(
        store,
        catalog.clone(),
        resolver.clone(),
        PriceMap::from_config(&config),
    ));

    // Build app state
    let state = AppState {
        db,
        config: config.clone(),
        catalog,
        resolver,
        webhook,
    };

    // Build router
    let app = build_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive()); // TODO: tighten CORS in production

    let addr: SocketAddr = format!("0.0.0.0:{}", config.port).parse()?;
    info!("Listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
