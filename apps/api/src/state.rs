use std::sync::Arc;

use sqlx::PgPool;

use crate::billing::plans::PlanCatalog;
use crate::billing::resolver::SubscriptionResolver;
use crate::billing::webhook::WebhookProcessor;
use crate::config::Config;

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    pub db: PgPool,
    pub config: Config,
    /// Static plan table, built once at startup.
    pub catalog: Arc<PlanCatalog>,
    /// Resolver with its own TTL cache; the webhook processor invalidates
    /// entries through this same instance.
    pub resolver: Arc<SubscriptionResolver>,
    pub webhook: Arc<WebhookProcessor>,
}
